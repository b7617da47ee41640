//! Storage backends for standing consents and pending consent requests.
//!
//! Two compiled-in backends satisfy the same contracts: a process-lifetime
//! in-memory one and a SeaORM-backed durable one. The Consent Manager never
//! learns which it is talking to.

mod memory;
mod sql;

pub use memory::{MemoryConsentStore, MemoryTicketStore};
pub use sql::{SqlConsentStore, SqlTicketStore};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::Database;
use sea_orm_migration::MigratorTrait;
use std::sync::Arc;

use crate::consent::Consent;
use crate::errors::CmError;
use crate::request::ConsentRequest;
use crate::settings::{Backend, Policy, Storage as StorageCfg};

#[async_trait]
pub trait ConsentStore: Send + Sync {
    /// Upsert by subject key; the last write for a key wins.
    async fn save(&self, subject_key: &str, consent: Consent) -> Result<(), CmError>;

    /// Fetch the standing consent for a subject key. A record found expired
    /// is deleted on the way out and reported as absent; the store is
    /// self-cleaning, but only on access.
    async fn get(&self, subject_key: &str) -> Result<Option<Consent>, CmError>;

    /// Unconditional delete; removing an absent key is not an error.
    async fn remove(&self, subject_key: &str) -> Result<(), CmError>;

    /// Delete every expired record and report how many went. Operator
    /// extra; nothing invokes it implicitly.
    async fn purge_expired(&self) -> Result<u64, CmError>;
}

#[async_trait]
pub trait TicketStore: Send + Sync {
    /// Mint a fresh single-use ticket for a verified request and persist
    /// the payload under the ticket's salted hash. Returns the raw ticket,
    /// which is never stored.
    async fn issue(
        &self,
        signed_token: &str,
        request: &ConsentRequest,
    ) -> Result<String, CmError>;

    /// Atomic fetch-and-delete. Under concurrent redemption of the same
    /// ticket exactly one caller gets the payload; the rest get `None`.
    async fn redeem(&self, ticket: &str) -> Result<Option<ConsentRequest>, CmError>;

    /// True when the ticket has outlived `ttl_secs`; an expired ticket is
    /// evicted as a side effect. Unknown tickets report `false` and are
    /// left for `redeem` to answer.
    async fn check_expired(&self, ticket: &str, ttl_secs: u64) -> Result<bool, CmError>;

    /// Delete every ticket older than `ttl_secs` and report how many went.
    /// Operator extra; nothing invokes it implicitly.
    async fn purge_expired(&self, ttl_secs: u64) -> Result<u64, CmError>;
}

/// A ticket is stale once strictly more than `ttl_secs` have elapsed.
pub(crate) fn is_ticket_expired(
    issued_at: DateTime<Utc>,
    ttl_secs: u64,
    now: DateTime<Utc>,
) -> bool {
    (now - issued_at).num_seconds() > i64::try_from(ttl_secs).unwrap_or(i64::MAX)
}

/// The pair of stores the Consent Manager runs on.
#[derive(Clone)]
pub struct Stores {
    pub consents: Arc<dyn ConsentStore>,
    pub tickets: Arc<dyn TicketStore>,
}

impl Stores {
    /// Build the configured backend. The SQL backend connects and brings
    /// the schema up to date before anything else touches it.
    pub async fn build(storage: &StorageCfg, policy: &Policy) -> Result<Self, CmError> {
        match storage.backend {
            Backend::Memory => Ok(Self {
                consents: Arc::new(MemoryConsentStore::new(policy.max_months_valid)),
                tickets: Arc::new(MemoryTicketStore::new(policy.salt.clone())),
            }),
            Backend::Sql => {
                let db = Database::connect(&storage.url).await?;
                migration::Migrator::up(&db, None).await?;
                Ok(Self {
                    consents: Arc::new(SqlConsentStore::new(
                        db.clone(),
                        policy.max_months_valid,
                    )),
                    tickets: Arc::new(SqlTicketStore::new(db, policy.salt.clone())),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn ticket_expiry_is_strictly_greater_than_ttl() {
        let issued = Utc.with_ymd_and_hms(2015, 1, 1, 12, 0, 0).unwrap();

        let at = |secs: i64| issued + chrono::Duration::seconds(secs);
        assert!(!is_ticket_expired(issued, 600, at(0)));
        assert!(!is_ticket_expired(issued, 600, at(600)));
        assert!(is_ticket_expired(issued, 600, at(601)));
    }

    #[test]
    fn ticket_from_the_future_is_not_expired() {
        let issued = Utc.with_ymd_and_hms(2015, 1, 1, 12, 0, 0).unwrap();
        let earlier = issued - chrono::Duration::seconds(30);

        assert!(!is_ticket_expired(issued, 0, earlier));
    }

    #[test]
    fn absurd_ttl_never_reports_stale() {
        let issued = Utc.with_ymd_and_hms(2015, 1, 1, 12, 0, 0).unwrap();
        let much_later = issued + chrono::Duration::days(365 * 100);

        assert!(!is_ticket_expired(issued, u64::MAX, much_later));
    }

    #[tokio::test]
    async fn factory_builds_the_memory_backend() {
        let storage = StorageCfg {
            backend: Backend::Memory,
            url: String::new(),
        };
        let policy = Policy {
            ticket_ttl_secs: 600,
            max_months_valid: 12,
            salt: "pepper".to_string(),
        };

        let stores = Stores::build(&storage, &policy).await.expect("build");
        let consent = Consent::new(Some(vec!["email".to_string()]), 1);
        stores.consents.save("key", consent).await.expect("save");
        assert!(stores.consents.get("key").await.expect("get").is_some());
    }
}
