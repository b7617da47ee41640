use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "consents")]
pub struct Model {
    /// Salted hash of the subject identifier; raw ids are never stored.
    #[sea_orm(primary_key, auto_increment = false)]
    pub subject_key: String,
    /// JSON-encoded attribute list; NULL means all requested attributes.
    pub attributes: Option<String>,
    pub months_valid: i64,
    /// Creation time in the shared textual pattern.
    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
