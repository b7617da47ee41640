//! Process-lifetime backend for tests and ephemeral deployments.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;

use super::{is_ticket_expired, ConsentStore, TicketStore};
use crate::consent::Consent;
use crate::errors::CmError;
use crate::identity::{mint_ticket, salted_hash};
use crate::request::ConsentRequest;

pub struct MemoryConsentStore {
    max_months_valid: u32,
    records: Mutex<HashMap<String, Consent>>,
}

impl MemoryConsentStore {
    pub fn new(max_months_valid: u32) -> Self {
        Self {
            max_months_valid,
            records: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl ConsentStore for MemoryConsentStore {
    async fn save(&self, subject_key: &str, consent: Consent) -> Result<(), CmError> {
        self.records
            .lock()
            .await
            .insert(subject_key.to_string(), consent);
        Ok(())
    }

    async fn get(&self, subject_key: &str) -> Result<Option<Consent>, CmError> {
        let mut records = self.records.lock().await;
        let Some(consent) = records.get(subject_key).cloned() else {
            return Ok(None);
        };
        if consent.has_expired(self.max_months_valid)? {
            records.remove(subject_key);
            return Ok(None);
        }
        Ok(Some(consent))
    }

    async fn remove(&self, subject_key: &str) -> Result<(), CmError> {
        self.records.lock().await.remove(subject_key);
        Ok(())
    }

    async fn purge_expired(&self) -> Result<u64, CmError> {
        let mut records = self.records.lock().await;
        let mut expired = Vec::new();
        for (key, consent) in records.iter() {
            if consent.has_expired(self.max_months_valid)? {
                expired.push(key.clone());
            }
        }
        for key in &expired {
            records.remove(key);
        }
        Ok(expired.len() as u64)
    }
}

struct IssuedTicket {
    request: ConsentRequest,
    issued_at: DateTime<Utc>,
}

pub struct MemoryTicketStore {
    salt: String,
    tickets: Mutex<HashMap<String, IssuedTicket>>,
}

impl MemoryTicketStore {
    pub fn new(salt: String) -> Self {
        Self {
            salt,
            tickets: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl TicketStore for MemoryTicketStore {
    async fn issue(
        &self,
        signed_token: &str,
        request: &ConsentRequest,
    ) -> Result<String, CmError> {
        let ticket = mint_ticket(signed_token);
        let key = salted_hash(&ticket, &self.salt);
        self.tickets.lock().await.insert(
            key,
            IssuedTicket {
                request: request.clone(),
                issued_at: Utc::now(),
            },
        );
        Ok(ticket)
    }

    async fn redeem(&self, ticket: &str) -> Result<Option<ConsentRequest>, CmError> {
        let key = salted_hash(ticket, &self.salt);
        // remove() under the lock is the whole atomicity story here
        let won = self.tickets.lock().await.remove(&key);
        Ok(won.map(|issued| issued.request))
    }

    async fn check_expired(&self, ticket: &str, ttl_secs: u64) -> Result<bool, CmError> {
        let key = salted_hash(ticket, &self.salt);
        let mut tickets = self.tickets.lock().await;
        let Some(issued) = tickets.get(&key) else {
            return Ok(false);
        };
        if is_ticket_expired(issued.issued_at, ttl_secs, Utc::now()) {
            tickets.remove(&key);
            return Ok(true);
        }
        Ok(false)
    }

    async fn purge_expired(&self, ttl_secs: u64) -> Result<u64, CmError> {
        let mut tickets = self.tickets.lock().await;
        let now = Utc::now();
        let before = tickets.len();
        tickets.retain(|_, issued| !is_ticket_expired(issued.issued_at, ttl_secs, now));
        Ok((before - tickets.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::BTreeMap;

    fn request() -> ConsentRequest {
        ConsentRequest {
            subject_id: "subject-123".to_string(),
            attributes: BTreeMap::from([(
                "email".to_string(),
                vec!["a@example.com".to_string()],
            )]),
            redirect_endpoint: "https://sp.example.com/return".parse().unwrap(),
            requester_name: Vec::new(),
            locked_attrs: Vec::new(),
        }
    }

    #[tokio::test]
    async fn consent_round_trip() {
        let store = MemoryConsentStore::new(12);
        let consent = Consent::new(Some(vec!["email".to_string()]), 3);

        store.save("key-1", consent.clone()).await.unwrap();
        assert_eq!(store.get("key-1").await.unwrap(), Some(consent));
        assert_eq!(store.get("other").await.unwrap(), None);
    }

    #[tokio::test]
    async fn expired_consent_is_evicted_on_read() {
        let store = MemoryConsentStore::new(12);
        let old = Utc.with_ymd_and_hms(2015, 1, 1, 0, 0, 0).unwrap();
        store
            .save("key-1", Consent::with_created_at(None, 1, old))
            .await
            .unwrap();

        assert_eq!(store.get("key-1").await.unwrap(), None);
        // The read deleted it, so a sweep finds nothing left
        assert_eq!(store.purge_expired().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn future_dated_consent_is_a_clock_error() {
        let store = MemoryConsentStore::new(12);
        let future = Utc::now() + chrono::Duration::days(2);
        store
            .save("key-1", Consent::with_created_at(None, 1, future))
            .await
            .unwrap();

        assert!(matches!(
            store.get("key-1").await,
            Err(CmError::ClockSkew { .. })
        ));
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let store = MemoryConsentStore::new(12);
        store.remove("missing").await.unwrap();
        store
            .save("key-1", Consent::new(None, 1))
            .await
            .unwrap();
        store.remove("key-1").await.unwrap();
        store.remove("key-1").await.unwrap();
        assert_eq!(store.get("key-1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn ticket_redeems_exactly_once() {
        let store = MemoryTicketStore::new("pepper".to_string());
        let ticket = store.issue("signed-token", &request()).await.unwrap();

        assert_eq!(store.redeem(&ticket).await.unwrap(), Some(request()));
        assert_eq!(store.redeem(&ticket).await.unwrap(), None);
    }

    #[tokio::test]
    async fn two_issuances_of_one_token_do_not_collide() {
        let store = MemoryTicketStore::new("pepper".to_string());
        let first = store.issue("signed-token", &request()).await.unwrap();
        let second = store.issue("signed-token", &request()).await.unwrap();

        assert_ne!(first, second);
        assert!(store.redeem(&first).await.unwrap().is_some());
        assert!(store.redeem(&second).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn fresh_ticket_is_not_expired() {
        let store = MemoryTicketStore::new("pepper".to_string());
        let ticket = store.issue("signed-token", &request()).await.unwrap();

        assert!(!store.check_expired(&ticket, 600).await.unwrap());
        assert!(store.redeem(&ticket).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn stale_ticket_is_evicted_by_the_check() {
        let store = MemoryTicketStore::new("pepper".to_string());
        let ticket = store.issue("signed-token", &request()).await.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(1100)).await;
        assert!(store.check_expired(&ticket, 0).await.unwrap());
        assert_eq!(store.redeem(&ticket).await.unwrap(), None);
    }

    #[tokio::test]
    async fn unknown_ticket_is_not_reported_expired() {
        let store = MemoryTicketStore::new("pepper".to_string());
        assert!(!store.check_expired("no-such-ticket", 0).await.unwrap());
    }

    #[tokio::test]
    async fn purge_removes_only_stale_tickets() {
        let store = MemoryTicketStore::new("pepper".to_string());
        let stale = store.issue("token-a", &request()).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(1100)).await;
        let fresh = store.issue("token-b", &request()).await.unwrap();

        assert_eq!(store.purge_expired(0).await.unwrap(), 1);
        assert_eq!(store.redeem(&stale).await.unwrap(), None);
        assert!(store.redeem(&fresh).await.unwrap().is_some());
    }
}
