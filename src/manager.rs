//! The Consent Manager: the four operations the rest of the system calls.

use std::sync::Arc;

use crate::consent::Consent;
use crate::errors::CmError;
use crate::identity::salted_hash;
use crate::request::{ConsentRequest, RequestVerifier};
use crate::settings::Policy;
use crate::storage::{ConsentStore, Stores, TicketStore};

/// `None` releases every requested attribute; `Some` lists the released names.
pub type GrantedAttributes = Option<Vec<String>>;

/// Owns the consent lifecycle end to end. Constructed once at startup and
/// handed by reference to whatever serves requests; holds no state beyond
/// its stores and policy.
pub struct ConsentManager {
    consents: Arc<dyn ConsentStore>,
    tickets: Arc<dyn TicketStore>,
    verifier: RequestVerifier,
    ticket_ttl_secs: u64,
    salt: String,
}

impl ConsentManager {
    pub fn new(stores: Stores, verifier: RequestVerifier, policy: &Policy) -> Self {
        Self {
            consents: stores.consents,
            tickets: stores.tickets,
            verifier,
            ticket_ttl_secs: policy.ticket_ttl_secs,
            salt: policy.salt.clone(),
        }
    }

    /// Verify a signed consent request token and issue a single-use ticket
    /// for it. `InvalidSignature` and `InvalidConsentRequest` pass through
    /// unchanged.
    pub async fn submit_consent_request(&self, token: &str) -> Result<String, CmError> {
        let request = self.verifier.verify(token)?;
        self.tickets.issue(token, &request).await
    }

    /// Hand out the pending request for a ticket, exactly once. Unknown,
    /// already consumed, and stale tickets all come back as `None`.
    pub async fn retrieve_consent_request(
        &self,
        ticket: &str,
    ) -> Result<Option<ConsentRequest>, CmError> {
        if self
            .tickets
            .check_expired(ticket, self.ticket_ttl_secs)
            .await?
        {
            return Ok(None);
        }
        self.tickets.redeem(ticket).await
    }

    /// Record a subject's decision to release `attributes` (`None` = all of
    /// them) for `months_valid` months. Overwrites any previous decision.
    pub async fn record_consent(
        &self,
        subject_id: &str,
        attributes: GrantedAttributes,
        months_valid: u32,
    ) -> Result<(), CmError> {
        let subject_key = salted_hash(subject_id, &self.salt);
        self.consents
            .save(&subject_key, Consent::new(attributes, months_valid))
            .await
    }

    /// The attributes a subject has standing consent to release, or `None`
    /// when no unexpired consent exists.
    pub async fn query_consent(
        &self,
        subject_id: &str,
    ) -> Result<Option<GrantedAttributes>, CmError> {
        let subject_key = salted_hash(subject_id, &self.salt);
        let consent = self.consents.get(&subject_key).await?;
        Ok(consent.map(|c| c.attributes))
    }
}
