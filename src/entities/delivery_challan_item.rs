use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "delivery_challan_items")]
#[schema(as = DeliveryChallanItem)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub delivery_challan_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::delivery_challan::Entity",
        from = "Column::DeliveryChallanId",
        to = "super::delivery_challan::Column::Id"
    )]
    DeliveryChallan,
}

impl Related<super::delivery_challan::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DeliveryChallan.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
