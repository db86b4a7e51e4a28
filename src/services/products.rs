use crate::{
    db::DbPool,
    entities::{
        delivery_challan_item::{self, Entity as DeliveryChallanItem},
        product::{self, Entity as Product},
        purchase_order_item::{self, Entity as PurchaseOrderItem},
        stock_movement::{self, StockReferenceType},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::inventory_ledger::{
        AppliedDelta, InventoryLedger, StockDelta, StockPolicy, StockReference,
    },
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct NewProduct {
    #[validate(length(min = 1, max = 64))]
    pub code: String,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub unit_cost: Decimal,
    pub selling_price: Option<Decimal>,
    /// Initial stock, recorded as an opening movement
    #[validate(range(min = 0))]
    pub opening_stock: Option<i32>,
}

/// Catalog fields only; stock moves through purchase orders and challans
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct ProductChanges {
    #[validate(length(min = 1, max = 64))]
    pub code: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(length(max = 2000))]
    #[serde(
        default,
        deserialize_with = "crate::services::nullable",
        skip_serializing_if = "Option::is_none"
    )]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    pub unit_cost: Option<Decimal>,
    pub selling_price: Option<Decimal>,
}

fn ensure_non_negative(label: &str, value: Option<Decimal>) -> Result<(), ServiceError> {
    match value {
        Some(v) if v.is_sign_negative() => Err(ServiceError::ValidationError(format!(
            "{} cannot be negative",
            label
        ))),
        _ => Ok(()),
    }
}

#[derive(Clone)]
pub struct ProductService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl ProductService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    #[instrument(skip(self, input), fields(code = %input.code))]
    pub async fn create_product(&self, input: NewProduct) -> Result<product::Model, ServiceError> {
        input.validate()?;
        ensure_non_negative("unit cost", Some(input.unit_cost))?;
        ensure_non_negative("selling price", input.selling_price)?;

        let txn = self.db_pool.begin().await.map_err(ServiceError::db_error)?;
        let id = Uuid::new_v4();
        let created = product::ActiveModel {
            id: Set(id),
            code: Set(input.code.trim().to_string()),
            name: Set(input.name),
            description: Set(input.description),
            on_hand: Set(0),
            unit_cost: Set(input.unit_cost),
            selling_price: Set(input.selling_price),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        }
        .insert(&txn)
        .await
        .map_err(ServiceError::db_error)?;

        let reference =
            StockReference::new(StockReferenceType::OpeningStock, id, "opening stock");
        let applied = match input.opening_stock.filter(|q| *q > 0) {
            Some(quantity) => InventoryLedger::apply_batch(
                &txn,
                &[StockDelta::incoming(id, quantity)],
                StockPolicy::AllowNegative,
                &reference,
            )
            .await?,
            None => Vec::new(),
        };
        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(product_id = %id, code = %created.code, "product created");
        self.event_sender
            .send_or_log(Event::ProductCreated(id))
            .await;
        for event in AppliedDelta::events(&applied, &reference) {
            self.event_sender.send_or_log(event).await;
        }

        self.get_product(id).await
    }

    pub async fn get_product(&self, id: Uuid) -> Result<product::Model, ServiceError> {
        Product::find_by_id(id)
            .one(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", id)))
    }

    pub async fn list_products(&self) -> Result<Vec<product::Model>, ServiceError> {
        Product::find()
            .order_by_asc(product::Column::CreatedAt)
            .all(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }

    #[instrument(skip(self, changes))]
    pub async fn update_product(
        &self,
        id: Uuid,
        changes: ProductChanges,
    ) -> Result<product::Model, ServiceError> {
        changes.validate()?;
        ensure_non_negative("unit cost", changes.unit_cost)?;
        ensure_non_negative("selling price", changes.selling_price)?;

        let mut active: product::ActiveModel = self.get_product(id).await?.into();
        if let Some(code) = changes.code {
            active.code = Set(code.trim().to_string());
        }
        if let Some(name) = changes.name {
            active.name = Set(name);
        }
        if let Some(description) = changes.description {
            active.description = Set(description);
        }
        if let Some(unit_cost) = changes.unit_cost {
            active.unit_cost = Set(unit_cost);
        }
        if let Some(selling_price) = changes.selling_price {
            active.selling_price = Set(Some(selling_price));
        }
        active.updated_at = Set(Some(Utc::now()));

        let updated = active
            .update(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?;
        self.event_sender
            .send_or_log(Event::ProductUpdated(id))
            .await;
        Ok(updated)
    }

    /// Refuses to delete products still referenced by stock documents.
    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: Uuid) -> Result<(), ServiceError> {
        let db = self.db_pool.as_ref();
        self.get_product(id).await?;

        let po_lines = PurchaseOrderItem::find()
            .filter(purchase_order_item::Column::ProductId.eq(id))
            .count(db)
            .await
            .map_err(ServiceError::db_error)?;
        let challan_lines = DeliveryChallanItem::find()
            .filter(delivery_challan_item::Column::ProductId.eq(id))
            .count(db)
            .await
            .map_err(ServiceError::db_error)?;
        if po_lines + challan_lines > 0 {
            return Err(ServiceError::Conflict(format!(
                "product {} is used by {} purchase order and {} delivery challan lines",
                id, po_lines, challan_lines
            )));
        }

        Product::delete_by_id(id)
            .exec(db)
            .await
            .map_err(ServiceError::db_error)?;
        self.event_sender
            .send_or_log(Event::ProductDeleted(id))
            .await;
        Ok(())
    }

    pub async fn find_by_code(&self, code: &str) -> Result<product::Model, ServiceError> {
        Product::find()
            .filter(product::Column::Code.eq(code))
            .one(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", code)))
    }

    pub async fn movements(&self, id: Uuid) -> Result<Vec<stock_movement::Model>, ServiceError> {
        self.get_product(id).await?;
        InventoryLedger::movements(self.db_pool.as_ref(), id).await
    }
}
