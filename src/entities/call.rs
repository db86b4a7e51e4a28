use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Default status for newly logged calls
pub const DEFAULT_CALL_STATUS: &str = "open";

/// A logged service request against a site
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "calls")]
#[schema(as = Call)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Zero-padded sequential number, e.g. `000042`
    #[sea_orm(unique)]
    pub call_number: String,
    pub site_id: Uuid,
    pub system_id: Option<String>,
    pub call_type: Option<String>,
    pub reason: Option<String>,
    pub engineer_id: Option<String>,
    pub deadline: Option<DateTime<Utc>>,
    pub next_action: Option<DateTime<Utc>>,
    pub waiting: bool,
    /// Present iff `waiting` is set
    pub waiting_reason: Option<String>,
    pub status: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::site::Entity",
        from = "Column::SiteId",
        to = "super::site::Column::Id"
    )]
    Site,
    #[sea_orm(has_many = "super::diary_entry::Entity")]
    DiaryEntries,
}

impl Related<super::site::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Site.def()
    }
}

impl Related<super::diary_entry::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DiaryEntries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
