use crate::{
    db::DbPool,
    entities::{
        delivery_challan::{self, Entity as DeliveryChallan},
        delivery_challan_item::{self, Entity as DeliveryChallanItem},
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
        sites::ensure_site_exists,
    },
};
use chrono::{Datelike, NaiveDate, Utc};
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

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct ChallanLine {
    pub product_id: Uuid,
    #[validate(range(min = 1, message = "Quantity must be positive"))]
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct NewDeliveryChallan {
    #[validate(length(max = 100))]
    pub company_id: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub customer_id: String,
    pub site_id: Option<Uuid>,
    /// Defaults to today
    pub challan_date: Option<NaiveDate>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    pub attachment: Option<String>,
    pub items: Vec<ChallanLine>,
}

/// Partial update; `items`, when present, replaces every line
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct DeliveryChallanChanges {
    #[validate(length(max = 100))]
    #[serde(
        default,
        deserialize_with = "crate::services::nullable",
        skip_serializing_if = "Option::is_none"
    )]
    #[schema(value_type = Option<String>)]
    pub company_id: Option<Option<String>>,
    #[validate(length(min = 1, max = 100))]
    pub customer_id: Option<String>,
    pub site_id: Option<Uuid>,
    pub challan_date: Option<NaiveDate>,
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
    pub items: Option<Vec<ChallanLine>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeliveryChallanDetail {
    #[serde(flatten)]
    pub challan: delivery_challan::Model,
    pub items: Vec<delivery_challan_item::Model>,
}

fn validate_lines(lines: &[ChallanLine]) -> Result<(), ServiceError> {
    if lines.is_empty() {
        return Err(ServiceError::ValidationError(
            "a delivery challan needs at least one item".to_string(),
        ));
    }
    for line in lines {
        line.validate()?;
    }
    Ok(())
}

fn outgoing(lines: impl IntoIterator<Item = (Uuid, i32)>) -> Vec<StockDelta> {
    lines
        .into_iter()
        .map(|(product_id, quantity)| StockDelta::outgoing(product_id, quantity))
        .collect()
}

/// Delivery challans; every line takes its quantity out of stock and the
/// whole challan is refused if any product would go negative.
#[derive(Clone)]
pub struct DeliveryChallanService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    files: Arc<dyn FileStore>,
}

impl DeliveryChallanService {
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

    #[instrument(skip(self, input), fields(customer_id = %input.customer_id))]
    pub async fn create_delivery_challan(
        &self,
        input: NewDeliveryChallan,
        created_by: &str,
    ) -> Result<DeliveryChallanDetail, ServiceError> {
        input.validate()?;
        validate_lines(&input.items)?;

        let today = Utc::now().date_naive();
        let txn = self.db_pool.begin().await.map_err(ServiceError::db_error)?;
        if let Some(site_id) = input.site_id {
            ensure_site_exists(&txn, site_id).await?;
        }

        let id = Uuid::new_v4();
        let challan_number =
            CodeGenerator::next(&txn, CodeScheme::DeliveryChallan(today.year())).await?;
        let reference = StockReference::new(
            StockReferenceType::DeliveryChallan,
            id,
            format!("delivery challan {} created", challan_number),
        );

        // stock first: an insufficient line aborts before anything is written
        let applied = InventoryLedger::apply_batch(
            &txn,
            &outgoing(input.items.iter().map(|l| (l.product_id, l.quantity))),
            StockPolicy::RequireSufficient,
            &reference,
        )
        .await?;

        let challan = delivery_challan::ActiveModel {
            id: Set(id),
            challan_number: Set(challan_number.clone()),
            company_id: Set(input.company_id),
            customer_id: Set(input.customer_id),
            site_id: Set(input.site_id),
            challan_date: Set(input.challan_date.unwrap_or(today)),
            notes: Set(input.notes),
            attachment_path: Set(input.attachment),
            created_by: Set(created_by.to_string()),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        }
        .insert(&txn)
        .await
        .map_err(ServiceError::db_error)?;
        let items = insert_lines(&txn, id, &input.items).await?;

        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(challan_id = %id, %challan_number, "delivery challan created");
        self.publish(
            Event::DeliveryChallanCreated {
                challan_id: id,
                challan_number,
            },
            &applied,
            &reference,
        )
        .await;

        Ok(DeliveryChallanDetail { challan, items })
    }

    /// Replacing the lines restores the old quantities and deducts the new
    /// ones as a single checked batch.
    #[instrument(skip(self, changes))]
    pub async fn update_delivery_challan(
        &self,
        id: Uuid,
        changes: DeliveryChallanChanges,
    ) -> Result<DeliveryChallanDetail, ServiceError> {
        changes.validate()?;
        if let Some(lines) = &changes.items {
            validate_lines(lines)?;
        }

        let txn = self.db_pool.begin().await.map_err(ServiceError::db_error)?;
        let current = find_challan(&txn, id).await?;
        let previous_attachment = current.attachment_path.clone();
        let reference = StockReference::new(
            StockReferenceType::DeliveryChallan,
            id,
            format!("delivery challan {} updated", current.challan_number),
        );

        let mut applied = Vec::new();
        if let Some(lines) = &changes.items {
            let old_items = find_items(&txn, id).await?;
            let deltas = replacement_deltas(
                &outgoing(old_items.iter().map(|i| (i.product_id, i.quantity))),
                &outgoing(lines.iter().map(|l| (l.product_id, l.quantity))),
            );
            applied = InventoryLedger::apply_batch(
                &txn,
                &deltas,
                StockPolicy::RequireSufficient,
                &reference,
            )
            .await?;

            DeliveryChallanItem::delete_many()
                .filter(delivery_challan_item::Column::DeliveryChallanId.eq(id))
                .exec(&txn)
                .await
                .map_err(ServiceError::db_error)?;
            insert_lines(&txn, id, lines).await?;
        }

        let mut active: delivery_challan::ActiveModel = current.into();
        if let Some(company_id) = changes.company_id {
            active.company_id = Set(company_id);
        }
        if let Some(customer_id) = changes.customer_id {
            active.customer_id = Set(customer_id);
        }
        if let Some(site_id) = changes.site_id {
            ensure_site_exists(&txn, site_id).await?;
            active.site_id = Set(Some(site_id));
        }
        if let Some(challan_date) = changes.challan_date {
            active.challan_date = Set(challan_date);
        }
        if let Some(notes) = changes.notes {
            active.notes = Set(notes);
        }
        if let Some(attachment) = changes.attachment {
            active.attachment_path = Set(attachment);
        }
        active.updated_at = Set(Some(Utc::now()));

        let challan = active.update(&txn).await.map_err(ServiceError::db_error)?;
        let items = find_items(&txn, id).await?;
        txn.commit().await.map_err(ServiceError::db_error)?;

        self.publish(Event::DeliveryChallanUpdated(id), &applied, &reference)
            .await;
        if let Some(old) =
            previous_attachment.filter(|old| challan.attachment_path.as_ref() != Some(old))
        {
            discard_attachment(self.files.as_ref(), &self.event_sender, &old).await;
        }

        Ok(DeliveryChallanDetail { challan, items })
    }

    /// Deletes the challan and returns its quantities to stock.
    #[instrument(skip(self))]
    pub async fn delete_delivery_challan(&self, id: Uuid) -> Result<(), ServiceError> {
        let txn = self.db_pool.begin().await.map_err(ServiceError::db_error)?;
        let current = find_challan(&txn, id).await?;
        let items = find_items(&txn, id).await?;

        let reference = StockReference::new(
            StockReferenceType::DeliveryChallan,
            id,
            format!("delivery challan {} deleted", current.challan_number),
        );
        let restores: Vec<StockDelta> = outgoing(items.iter().map(|i| (i.product_id, i.quantity)))
            .into_iter()
            .map(StockDelta::reverted)
            .collect();
        let applied = InventoryLedger::apply_batch(
            &txn,
            &restores,
            StockPolicy::RequireSufficient,
            &reference,
        )
        .await?;

        DeliveryChallanItem::delete_many()
            .filter(delivery_challan_item::Column::DeliveryChallanId.eq(id))
            .exec(&txn)
            .await
            .map_err(ServiceError::db_error)?;
        DeliveryChallan::delete_by_id(id)
            .exec(&txn)
            .await
            .map_err(ServiceError::db_error)?;
        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(challan_id = %id, challan_number = %current.challan_number, "delivery challan deleted");
        self.publish(Event::DeliveryChallanDeleted(id), &applied, &reference)
            .await;
        if let Some(path) = current.attachment_path {
            discard_attachment(self.files.as_ref(), &self.event_sender, &path).await;
        }
        Ok(())
    }

    pub async fn get_delivery_challan(
        &self,
        id: Uuid,
    ) -> Result<DeliveryChallanDetail, ServiceError> {
        let db = self.db_pool.as_ref();
        let challan = find_challan(db, id).await?;
        let items = find_items(db, id).await?;
        Ok(DeliveryChallanDetail { challan, items })
    }

    pub async fn list_delivery_challans(
        &self,
    ) -> Result<Vec<delivery_challan::Model>, ServiceError> {
        DeliveryChallan::find()
            .order_by_asc(delivery_challan::Column::CreatedAt)
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

async fn find_challan<C>(conn: &C, id: Uuid) -> Result<delivery_challan::Model, ServiceError>
where
    C: ConnectionTrait,
{
    DeliveryChallan::find_by_id(id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::NotFound(format!("Delivery challan {} not found", id)))
}

async fn find_items<C>(
    conn: &C,
    id: Uuid,
) -> Result<Vec<delivery_challan_item::Model>, ServiceError>
where
    C: ConnectionTrait,
{
    DeliveryChallanItem::find()
        .filter(delivery_challan_item::Column::DeliveryChallanId.eq(id))
        .all(conn)
        .await
        .map_err(ServiceError::db_error)
}

async fn insert_lines<C>(
    conn: &C,
    challan_id: Uuid,
    lines: &[ChallanLine],
) -> Result<Vec<delivery_challan_item::Model>, ServiceError>
where
    C: ConnectionTrait,
{
    let mut items = Vec::with_capacity(lines.len());
    for line in lines {
        let item = delivery_challan_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            delivery_challan_id: Set(challan_id),
            product_id: Set(line.product_id),
            quantity: Set(line.quantity),
        }
        .insert(conn)
        .await
        .map_err(ServiceError::db_error)?;
        items.push(item);
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outgoing_lines_are_negative() {
        let p = Uuid::new_v4();
        assert_eq!(outgoing([(p, 4)]), vec![StockDelta::new(p, -4)]);
    }

    #[test]
    fn empty_or_zero_lines_are_rejected() {
        assert!(validate_lines(&[]).is_err());
        assert!(validate_lines(&[ChallanLine {
            product_id: Uuid::new_v4(),
            quantity: 0
        }])
        .is_err());
    }
}
