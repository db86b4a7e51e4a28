use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "delivery_challans")]
#[schema(as = DeliveryChallan)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// `DC/<year>/<seq>`
    #[sea_orm(unique)]
    pub challan_number: String,
    pub company_id: Option<String>,
    pub customer_id: String,
    pub site_id: Option<Uuid>,
    pub challan_date: NaiveDate,
    pub notes: Option<String>,
    pub attachment_path: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::delivery_challan_item::Entity")]
    Items,
}

impl Related<super::delivery_challan_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
