use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tickets")]
pub struct Model {
    /// Salted hash of the bearer ticket; raw tickets are never stored.
    #[sea_orm(primary_key, auto_increment = false)]
    pub ticket_key: String,
    /// JSON-encoded consent request payload.
    pub data: String,
    /// Issuance time in the shared textual pattern.
    pub issued_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
