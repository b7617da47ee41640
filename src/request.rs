//! Signed consent request tokens: payload shape and verification.

use josekit::jws::alg::rsassa::RsassaJwsVerifier;
use josekit::jwt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use url::Url;

use crate::errors::CmError;

/// What a requester asks a subject to approve. Carried inside a signed
/// token on the way in, then verbatim inside a ticket record until the
/// front end picks it up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentRequest {
    /// Subject identifier as known to the requester.
    #[serde(rename = "id")]
    pub subject_id: String,
    /// Requested attributes and the values the requester proposes to
    /// release for each.
    #[serde(rename = "attr")]
    pub attributes: BTreeMap<String, Vec<String>>,
    /// Where the front end sends the subject after the decision.
    pub redirect_endpoint: Url,
    /// Display name of the requester, one entry per language.
    #[serde(default)]
    pub requester_name: Vec<LocalizedName>,
    /// Attributes the subject cannot deselect.
    #[serde(default)]
    pub locked_attrs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizedName {
    pub lang: String,
    pub text: String,
}

/// Checks consent request tokens against the configured trusted keys.
pub struct RequestVerifier {
    verifiers: Vec<RsassaJwsVerifier>,
}

impl RequestVerifier {
    pub fn new(verifiers: Vec<RsassaJwsVerifier>) -> Self {
        Self { verifiers }
    }

    /// Verify the token signature and shape-check the payload.
    ///
    /// A token no trusted key accepts is `InvalidSignature`; a verified
    /// token whose payload is missing a mandatory field (or is otherwise
    /// malformed) is `InvalidConsentRequest`.
    pub fn verify(&self, token: &str) -> Result<ConsentRequest, CmError> {
        let payload = self.check_signature(token)?;
        let claims = serde_json::Value::Object(payload.claims_set().clone());
        serde_json::from_value(claims)
            .map_err(|e| CmError::InvalidConsentRequest(e.to_string()))
    }

    fn check_signature(&self, token: &str) -> Result<jwt::JwtPayload, CmError> {
        for verifier in &self.verifiers {
            if let Ok((payload, _)) = jwt::decode_with_verifier(token, verifier) {
                return Ok(payload);
            }
        }
        Err(CmError::InvalidSignature)
    }
}
