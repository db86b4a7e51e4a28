use crate::{
    db::DbPool,
    entities::{
        purchase_order::{self, Entity as PurchaseOrder},
        purchase_order_item::{self, Entity as PurchaseOrderItem},
        stock_movement::StockReferenceType,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    files::{discard_attachment, FileStore},
    services::{
        codes::{CodeGenerator, CodeScheme},
        inventory_ledger::{
            replacement_deltas, AppliedDelta, InventoryLedger, StockDelta, StockPolicy,
            StockReference,
        },
    },
};
use chrono::{Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter,
    QueryOrder, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// One ordered product line
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct PurchaseOrderLine {
    pub product_id: Uuid,
    #[validate(range(min = 1, message = "Quantity must be positive"))]
    pub quantity: i32,
    pub unit_price: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct NewPurchaseOrder {
    #[validate(length(min = 1, max = 255))]
    pub supplier: String,
    /// Defaults to today
    pub ordered_date: Option<NaiveDate>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    /// Handle returned by the upload endpoint
    pub attachment: Option<String>,
    pub items: Vec<PurchaseOrderLine>,
}

/// Partial update; `items`, when present, replaces every line
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct PurchaseOrderChanges {
    #[validate(length(min = 1, max = 255))]
    pub supplier: Option<String>,
    pub ordered_date: Option<NaiveDate>,
    #[validate(length(max = 2000))]
    #[serde(
        default,
        deserialize_with = "crate::services::nullable",
        skip_serializing_if = "Option::is_none"
    )]
    #[schema(value_type = Option<String>)]
    pub notes: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "crate::services::nullable",
        skip_serializing_if = "Option::is_none"
    )]
    #[schema(value_type = Option<String>)]
    pub attachment: Option<Option<String>>,
    pub items: Option<Vec<PurchaseOrderLine>>,
}

/// Purchase order header with its lines
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PurchaseOrderDetail {
    #[serde(flatten)]
    pub order: purchase_order::Model,
    pub items: Vec<purchase_order_item::Model>,
}

fn validate_lines(lines: &[PurchaseOrderLine]) -> Result<(), ServiceError> {
    if lines.is_empty() {
        return Err(ServiceError::ValidationError(
            "a purchase order needs at least one item".to_string(),
        ));
    }
    for line in lines {
        line.validate()?;
        if line.unit_price.is_sign_negative() {
            return Err(ServiceError::ValidationError(
                "unit price cannot be negative".to_string(),
            ));
        }
    }
    Ok(())
}

fn incoming(lines: impl IntoIterator<Item = (Uuid, i32)>) -> Vec<StockDelta> {
    lines
        .into_iter()
        .map(|(product_id, quantity)| StockDelta::incoming(product_id, quantity))
        .collect()
}

/// Purchase orders; every line adds its quantity to stock.
#[derive(Clone)]
pub struct PurchaseOrderService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    files: Arc<dyn FileStore>,
}

impl PurchaseOrderService {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        files: Arc<dyn FileStore>,
    ) -> Self {
        Self {
            db_pool,
            event_sender,
            files,
        }
    }

    #[instrument(skip(self, input), fields(supplier = %input.supplier))]
    pub async fn create_purchase_order(
        &self,
        input: NewPurchaseOrder,
        created_by: &str,
    ) -> Result<PurchaseOrderDetail, ServiceError> {
        input.validate()?;
        validate_lines(&input.items)?;

        let today = Utc::now().date_naive();
        let txn = self.db_pool.begin().await.map_err(ServiceError::db_error)?;

        let po_number =
            CodeGenerator::next(&txn, CodeScheme::PurchaseOrder(today.year())).await?;
        let id = Uuid::new_v4();
        let now = Utc::now();

        // stock first: unknown products are reported before any row is written
        let reference = StockReference::new(
            StockReferenceType::PurchaseOrder,
            id,
            format!("purchase order {} created", po_number),
        );
        let applied = InventoryLedger::apply_batch(
            &txn,
            &incoming(input.items.iter().map(|l| (l.product_id, l.quantity))),
            StockPolicy::AllowNegative,
            &reference,
        )
        .await?;

        let order = purchase_order::ActiveModel {
            id: Set(id),
            po_number: Set(po_number.clone()),
            supplier: Set(input.supplier),
            ordered_date: Set(input.ordered_date.unwrap_or(today)),
            total_amount: Set(Decimal::ZERO),
            notes: Set(input.notes),
            attachment_path: Set(input.attachment),
            created_by: Set(created_by.to_string()),
            created_at: Set(now),
            updated_at: Set(None),
        }
        .insert(&txn)
        .await
        .map_err(ServiceError::db_error)?;

        let (items, total) = insert_lines(&txn, id, &input.items).await?;
        let order = set_total(&txn, order, total).await?;

        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(purchase_order_id = %id, %po_number, "purchase order created");
        self.publish(
            Event::PurchaseOrderCreated {
                purchase_order_id: id,
                po_number,
            },
            &applied,
            &reference,
        )
        .await;

        Ok(PurchaseOrderDetail { order, items })
    }

    /// Updates header fields; replacing the lines reverts the old quantities
    /// and applies the new ones in one ledger batch.
    #[instrument(skip(self, changes))]
    pub async fn update_purchase_order(
        &self,
        id: Uuid,
        changes: PurchaseOrderChanges,
    ) -> Result<PurchaseOrderDetail, ServiceError> {
        changes.validate()?;
        if let Some(lines) = &changes.items {
            validate_lines(lines)?;
        }

        let txn = self.db_pool.begin().await.map_err(ServiceError::db_error)?;
        let current = find_order(&txn, id).await?;
        let previous_attachment = current.attachment_path.clone();

        let mut applied = Vec::new();
        let reference = StockReference::new(
            StockReferenceType::PurchaseOrder,
            id,
            format!("purchase order {} updated", current.po_number),
        );

        let mut active: purchase_order::ActiveModel = current.clone().into();
        if let Some(supplier) = changes.supplier {
            active.supplier = Set(supplier);
        }
        if let Some(ordered_date) = changes.ordered_date {
            active.ordered_date = Set(ordered_date);
        }
        if let Some(notes) = changes.notes {
            active.notes = Set(notes);
        }
        if let Some(attachment) = changes.attachment {
            active.attachment_path = Set(attachment);
        }

        if let Some(lines) = &changes.items {
            let old_items = find_items(&txn, id).await?;
            let deltas = replacement_deltas(
                &incoming(old_items.iter().map(|i| (i.product_id, i.quantity))),
                &incoming(lines.iter().map(|l| (l.product_id, l.quantity))),
            );
            applied = InventoryLedger::apply_batch(
                &txn,
                &deltas,
                StockPolicy::AllowNegative,
                &reference,
            )
            .await?;

            PurchaseOrderItem::delete_many()
                .filter(purchase_order_item::Column::PurchaseOrderId.eq(id))
                .exec(&txn)
                .await
                .map_err(ServiceError::db_error)?;
            let (_, total) = insert_lines(&txn, id, lines).await?;
            active.total_amount = Set(total);
        }

        active.updated_at = Set(Some(Utc::now()));
        let order = active.update(&txn).await.map_err(ServiceError::db_error)?;
        let items = find_items(&txn, id).await?;
        txn.commit().await.map_err(ServiceError::db_error)?;

        self.publish(Event::PurchaseOrderUpdated(id), &applied, &reference)
            .await;
        if let Some(old) = previous_attachment.filter(|old| order.attachment_path.as_ref() != Some(old)) {
            discard_attachment(self.files.as_ref(), &self.event_sender, &old).await;
        }

        Ok(PurchaseOrderDetail { order, items })
    }

    /// Deletes the order and takes its quantities back out of stock.
    #[instrument(skip(self))]
    pub async fn delete_purchase_order(&self, id: Uuid) -> Result<(), ServiceError> {
        let txn = self.db_pool.begin().await.map_err(ServiceError::db_error)?;
        let current = find_order(&txn, id).await?;
        let items = find_items(&txn, id).await?;

        let reference = StockReference::new(
            StockReferenceType::PurchaseOrder,
            id,
            format!("purchase order {} deleted", current.po_number),
        );
        let reverts: Vec<StockDelta> = incoming(items.iter().map(|i| (i.product_id, i.quantity)))
            .into_iter()
            .map(StockDelta::reverted)
            .collect();
        let applied =
            InventoryLedger::apply_batch(&txn, &reverts, StockPolicy::AllowNegative, &reference)
                .await?;

        PurchaseOrderItem::delete_many()
            .filter(purchase_order_item::Column::PurchaseOrderId.eq(id))
            .exec(&txn)
            .await
            .map_err(ServiceError::db_error)?;
        PurchaseOrder::delete_by_id(id)
            .exec(&txn)
            .await
            .map_err(ServiceError::db_error)?;
        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(purchase_order_id = %id, po_number = %current.po_number, "purchase order deleted");
        self.publish(Event::PurchaseOrderDeleted(id), &applied, &reference)
            .await;
        if let Some(path) = current.attachment_path {
            discard_attachment(self.files.as_ref(), &self.event_sender, &path).await;
        }
        Ok(())
    }

    pub async fn get_purchase_order(&self, id: Uuid) -> Result<PurchaseOrderDetail, ServiceError> {
        let db = self.db_pool.as_ref();
        let order = find_order(db, id).await?;
        let items = find_items(db, id).await?;
        Ok(PurchaseOrderDetail { order, items })
    }

    pub async fn list_purchase_orders(&self) -> Result<Vec<purchase_order::Model>, ServiceError> {
        PurchaseOrder::find()
            .order_by_asc(purchase_order::Column::CreatedAt)
            .all(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }

    async fn publish(&self, event: Event, applied: &[AppliedDelta], reference: &StockReference) {
        self.event_sender.send_or_log(event).await;
        for stock_event in AppliedDelta::events(applied, reference) {
            self.event_sender.send_or_log(stock_event).await;
        }
    }
}

async fn find_order<C>(conn: &C, id: Uuid) -> Result<purchase_order::Model, ServiceError>
where
    C: ConnectionTrait,
{
    PurchaseOrder::find_by_id(id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::NotFound(format!("Purchase order {} not found", id)))
}

async fn find_items<C>(conn: &C, id: Uuid) -> Result<Vec<purchase_order_item::Model>, ServiceError>
where
    C: ConnectionTrait,
{
    PurchaseOrderItem::find()
        .filter(purchase_order_item::Column::PurchaseOrderId.eq(id))
        .all(conn)
        .await
        .map_err(ServiceError::db_error)
}

async fn insert_lines<C>(
    conn: &C,
    purchase_order_id: Uuid,
    lines: &[PurchaseOrderLine],
) -> Result<(Vec<purchase_order_item::Model>, Decimal), ServiceError>
where
    C: ConnectionTrait,
{
    let mut items = Vec::with_capacity(lines.len());
    let mut total = Decimal::ZERO;
    for line in lines {
        let line_total = line.unit_price * Decimal::from(line.quantity);
        total += line_total;
        let item = purchase_order_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            purchase_order_id: Set(purchase_order_id),
            product_id: Set(line.product_id),
            quantity: Set(line.quantity),
            unit_price: Set(line.unit_price),
            line_total: Set(line_total),
        }
        .insert(conn)
        .await
        .map_err(ServiceError::db_error)?;
        items.push(item);
    }
    Ok((items, total))
}

async fn set_total<C>(
    conn: &C,
    order: purchase_order::Model,
    total: Decimal,
) -> Result<purchase_order::Model, ServiceError>
where
    C: ConnectionTrait,
{
    let mut active: purchase_order::ActiveModel = order.into();
    active.total_amount = Set(total);
    active.update(conn).await.map_err(ServiceError::db_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn line(quantity: i32, unit_price: Decimal) -> PurchaseOrderLine {
        PurchaseOrderLine {
            product_id: Uuid::new_v4(),
            quantity,
            unit_price,
        }
    }

    #[test]
    fn lines_must_be_present_and_positive() {
        assert!(validate_lines(&[]).is_err());
        assert!(validate_lines(&[line(0, dec!(1.00))]).is_err());
        assert!(validate_lines(&[line(2, dec!(-1.00))]).is_err());
        assert!(validate_lines(&[line(2, dec!(12.50))]).is_ok());
    }
}
