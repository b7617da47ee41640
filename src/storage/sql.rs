//! SeaORM-backed durable stores (SQLite or PostgreSQL).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

use super::{is_ticket_expired, ConsentStore, TicketStore};
use crate::consent::{format_timestamp, parse_timestamp, Consent};
use crate::entities;
use crate::errors::CmError;
use crate::identity::{mint_ticket, salted_hash};
use crate::request::ConsentRequest;

pub struct SqlConsentStore {
    db: DatabaseConnection,
    max_months_valid: u32,
}

impl SqlConsentStore {
    pub fn new(db: DatabaseConnection, max_months_valid: u32) -> Self {
        Self {
            db,
            max_months_valid,
        }
    }
}

fn decode_consent(model: &entities::consent::Model) -> Result<Consent, CmError> {
    let attributes = model
        .attributes
        .as_deref()
        .map(serde_json::from_str::<Vec<String>>)
        .transpose()?;
    Ok(Consent {
        attributes,
        months_valid: model.months_valid.clamp(0, i64::from(u32::MAX)) as u32,
        created_at: parse_timestamp(&model.created_at)?,
    })
}

#[async_trait]
impl ConsentStore for SqlConsentStore {
    async fn save(&self, subject_key: &str, consent: Consent) -> Result<(), CmError> {
        use entities::consent::{ActiveModel, Column, Entity};
        use sea_orm::sea_query::OnConflict;

        let attributes = consent
            .attributes
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let row = ActiveModel {
            subject_key: Set(subject_key.to_string()),
            attributes: Set(attributes),
            months_valid: Set(i64::from(consent.months_valid)),
            created_at: Set(format_timestamp(consent.created_at)),
        };

        Entity::insert(row)
            .on_conflict(
                OnConflict::column(Column::SubjectKey)
                    .update_columns([
                        Column::Attributes,
                        Column::MonthsValid,
                        Column::CreatedAt,
                    ])
                    .to_owned(),
            )
            .exec(&self.db)
            .await?;

        Ok(())
    }

    async fn get(&self, subject_key: &str) -> Result<Option<Consent>, CmError> {
        use entities::consent::{Column, Entity};

        if let Some(model) = Entity::find()
            .filter(Column::SubjectKey.eq(subject_key))
            .one(&self.db)
            .await?
        {
            let consent = decode_consent(&model)?;
            if consent.has_expired(self.max_months_valid)? {
                self.remove(subject_key).await?;
                return Ok(None);
            }
            Ok(Some(consent))
        } else {
            Ok(None)
        }
    }

    async fn remove(&self, subject_key: &str) -> Result<(), CmError> {
        use entities::consent::{Column, Entity};

        Entity::delete_many()
            .filter(Column::SubjectKey.eq(subject_key))
            .exec(&self.db)
            .await?;

        Ok(())
    }

    async fn purge_expired(&self) -> Result<u64, CmError> {
        use entities::consent::{Column, Entity};

        let mut expired = Vec::new();
        for model in Entity::find().all(&self.db).await? {
            if decode_consent(&model)?.has_expired(self.max_months_valid)? {
                expired.push(model.subject_key);
            }
        }
        if expired.is_empty() {
            return Ok(0);
        }

        let result = Entity::delete_many()
            .filter(Column::SubjectKey.is_in(expired))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected)
    }
}

pub struct SqlTicketStore {
    db: DatabaseConnection,
    salt: String,
}

impl SqlTicketStore {
    pub fn new(db: DatabaseConnection, salt: String) -> Self {
        Self { db, salt }
    }
}

#[async_trait]
impl TicketStore for SqlTicketStore {
    async fn issue(
        &self,
        signed_token: &str,
        request: &ConsentRequest,
    ) -> Result<String, CmError> {
        use entities::ticket::{ActiveModel, Column, Entity};
        use sea_orm::sea_query::OnConflict;

        let ticket = mint_ticket(signed_token);
        let ticket_key = salted_hash(&ticket, &self.salt);

        let row = ActiveModel {
            ticket_key: Set(ticket_key),
            data: Set(serde_json::to_string(request)?),
            issued_at: Set(format_timestamp(Utc::now())),
        };

        Entity::insert(row)
            .on_conflict(
                OnConflict::column(Column::TicketKey)
                    .update_columns([Column::Data, Column::IssuedAt])
                    .to_owned(),
            )
            .exec(&self.db)
            .await?;

        Ok(ticket)
    }

    async fn redeem(&self, ticket: &str) -> Result<Option<ConsentRequest>, CmError> {
        use entities::ticket::{Column, Entity};

        let key = salted_hash(ticket, &self.salt);

        if let Some(model) = Entity::find()
            .filter(Column::TicketKey.eq(key.as_str()))
            .one(&self.db)
            .await?
        {
            // The keyed delete arbitrates concurrent redemptions: only the
            // caller whose delete removes the row may hand out the payload.
            let result = Entity::delete_many()
                .filter(Column::TicketKey.eq(key.as_str()))
                .exec(&self.db)
                .await?;
            if result.rows_affected == 0 {
                return Ok(None);
            }

            let request = serde_json::from_str(&model.data)?;
            Ok(Some(request))
        } else {
            Ok(None)
        }
    }

    async fn check_expired(&self, ticket: &str, ttl_secs: u64) -> Result<bool, CmError> {
        use entities::ticket::{Column, Entity};

        let key = salted_hash(ticket, &self.salt);

        if let Some(model) = Entity::find()
            .filter(Column::TicketKey.eq(key.as_str()))
            .one(&self.db)
            .await?
        {
            let issued_at = parse_timestamp(&model.issued_at)?;
            if is_ticket_expired(issued_at, ttl_secs, Utc::now()) {
                Entity::delete_many()
                    .filter(Column::TicketKey.eq(key.as_str()))
                    .exec(&self.db)
                    .await?;
                return Ok(true);
            }
        }

        Ok(false)
    }

    async fn purge_expired(&self, ttl_secs: u64) -> Result<u64, CmError> {
        use entities::ticket::{Column, Entity};

        let cutoff_secs = Utc::now().timestamp().saturating_sub_unsigned(ttl_secs);
        let Some(cutoff) = DateTime::from_timestamp(cutoff_secs, 0) else {
            // The cutoff predates the calendar, so no ticket is old enough.
            return Ok(0);
        };

        // The textual pattern sorts chronologically, so a string compare
        // against the cutoff is enough for both SQLite and Postgres.
        let cutoff = format_timestamp(cutoff);
        let result = Entity::delete_many()
            .filter(Column::IssuedAt.lt(cutoff.as_str()))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected)
    }
}
