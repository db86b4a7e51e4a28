use crate::{
    entities::{
        product::{self, Entity as Product},
        stock_movement::{self, Entity as StockMovement, StockReferenceType},
    },
    errors::ServiceError,
    events::Event,
};
use chrono::Utc;
use metrics::counter;
use sea_orm::{
    sea_query::Expr, ActiveEnum, ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait,
    EntityTrait, QueryFilter, QueryOrder,
};
use std::collections::BTreeMap;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

/// Signed change to one product's on-hand count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockDelta {
    pub product_id: Uuid,
    pub quantity: i32,
}

impl StockDelta {
    pub fn new(product_id: Uuid, quantity: i32) -> Self {
        Self {
            product_id,
            quantity,
        }
    }

    /// Stock arriving, e.g. a purchase order line
    pub fn incoming(product_id: Uuid, quantity: i32) -> Self {
        Self::new(product_id, quantity)
    }

    /// Stock leaving, e.g. a delivery challan line
    pub fn outgoing(product_id: Uuid, quantity: i32) -> Self {
        Self::new(product_id, quantity.saturating_neg())
    }

    pub fn reverted(self) -> Self {
        Self::new(self.product_id, self.quantity.saturating_neg())
    }
}

/// Deltas that undo `previous` and then apply `next`, as one batch.
pub fn replacement_deltas(previous: &[StockDelta], next: &[StockDelta]) -> Vec<StockDelta> {
    previous
        .iter()
        .map(|d| d.reverted())
        .chain(next.iter().copied())
        .collect()
}

/// Whether a batch may leave a product below zero
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockPolicy {
    /// Reject the whole batch if any product would go negative
    RequireSufficient,
    /// Apply regardless; negative results are logged
    AllowNegative,
}

/// Document on whose behalf a batch is applied
#[derive(Debug, Clone)]
pub struct StockReference {
    pub reference_type: StockReferenceType,
    pub reference_id: Uuid,
    pub reason: String,
}

impl StockReference {
    pub fn new(
        reference_type: StockReferenceType,
        reference_id: Uuid,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            reference_type,
            reference_id,
            reason: reason.into(),
        }
    }
}

/// Outcome of one applied product delta
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedDelta {
    pub product_id: Uuid,
    pub quantity_delta: i32,
    pub previous_quantity: i32,
    pub new_quantity: i32,
}

impl AppliedDelta {
    /// Events to publish once the batch's transaction has committed
    pub fn events(applied: &[AppliedDelta], reference: &StockReference) -> Vec<Event> {
        let mut events = Vec::with_capacity(applied.len());
        for delta in applied {
            events.push(Event::StockAdjusted {
                product_id: delta.product_id,
                previous_quantity: delta.previous_quantity,
                new_quantity: delta.new_quantity,
                reference_type: reference.reference_type.to_value(),
                reference_id: reference.reference_id,
            });
            if delta.new_quantity < 0 {
                events.push(Event::NegativeStock {
                    product_id: delta.product_id,
                    on_hand: delta.new_quantity,
                });
            }
        }
        events
    }
}

/// Applies stock deltas on a caller-supplied connection, normally the
/// transaction that also saves the originating document.
pub struct InventoryLedger;

impl InventoryLedger {
    /// Applies a single delta; see [`InventoryLedger::apply_batch`].
    pub async fn apply_delta<C>(
        conn: &C,
        delta: StockDelta,
        policy: StockPolicy,
        reference: &StockReference,
    ) -> Result<Option<AppliedDelta>, ServiceError>
    where
        C: ConnectionTrait,
    {
        Ok(Self::apply_batch(conn, &[delta], policy, reference)
            .await?
            .into_iter()
            .next())
    }

    /// Applies all deltas or none of them.
    ///
    /// Deltas are netted per product and applied in product-id order. Every
    /// referenced product must exist. Under [`StockPolicy::RequireSufficient`]
    /// all products are checked before the first write, and each write is
    /// guarded so a concurrent drain fails the batch instead of going negative.
    /// On error the caller must roll back its transaction.
    #[instrument(skip(conn, deltas), fields(reference_type = ?reference.reference_type, reference_id = %reference.reference_id))]
    pub async fn apply_batch<C>(
        conn: &C,
        deltas: &[StockDelta],
        policy: StockPolicy,
        reference: &StockReference,
    ) -> Result<Vec<AppliedDelta>, ServiceError>
    where
        C: ConnectionTrait,
    {
        let net = net_by_product(deltas)?;
        if net.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = net.keys().copied().collect();
        let products: BTreeMap<Uuid, product::Model> = Product::find()
            .filter(product::Column::Id.is_in(ids.clone()))
            .all(conn)
            .await
            .map_err(ServiceError::db_error)?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        if let Some(missing) = ids.iter().find(|id| !products.contains_key(id)) {
            return Err(ServiceError::NotFound(format!(
                "Product {} not found",
                missing
            )));
        }

        for (product_id, quantity) in &net {
            let product = &products[product_id];
            let resulting = i64::from(product.on_hand) + i64::from(*quantity);
            if policy == StockPolicy::RequireSufficient && *quantity < 0 && resulting < 0 {
                counter!("firecrm.ledger.rejections", 1);
                return Err(ServiceError::InsufficientStock(format!(
                    "product {} has {} on hand, {} requested",
                    product.code,
                    product.on_hand,
                    quantity.unsigned_abs()
                )));
            }
            if i32::try_from(resulting).is_err() {
                return Err(ServiceError::BadRequest(format!(
                    "stock of product {} would leave the supported range",
                    product.code
                )));
            }
        }

        let now = Utc::now();
        let mut applied = Vec::with_capacity(net.len());
        for (product_id, quantity) in net {
            if quantity == 0 {
                continue;
            }

            let mut update = Product::update_many()
                .col_expr(
                    product::Column::OnHand,
                    Expr::col(product::Column::OnHand).add(quantity),
                )
                .col_expr(product::Column::UpdatedAt, Expr::value(Some(now)))
                .filter(product::Column::Id.eq(product_id));
            if policy == StockPolicy::RequireSufficient && quantity < 0 {
                update = update.filter(product::Column::OnHand.gte(-quantity));
            }

            let result = update.exec(conn).await.map_err(ServiceError::db_error)?;
            if result.rows_affected == 0 {
                counter!("firecrm.ledger.rejections", 1);
                return Err(ServiceError::InsufficientStock(format!(
                    "product {} no longer has {} on hand",
                    products[&product_id].code,
                    quantity.unsigned_abs()
                )));
            }

            let new_quantity = Self::on_hand(conn, product_id).await?;
            let previous_quantity = new_quantity.checked_sub(quantity).ok_or_else(|| {
                ServiceError::InternalError(format!("stock of product {} overflowed", product_id))
            })?;

            stock_movement::ActiveModel {
                id: Set(Uuid::new_v4()),
                product_id: Set(product_id),
                quantity_delta: Set(quantity),
                previous_quantity: Set(previous_quantity),
                new_quantity: Set(new_quantity),
                reference_type: Set(reference.reference_type),
                reference_id: Set(reference.reference_id),
                reason: Set(reference.reason.clone()),
                created_at: Set(now),
            }
            .insert(conn)
            .await
            .map_err(ServiceError::db_error)?;

            if new_quantity < 0 {
                warn!(
                    %product_id,
                    new_quantity,
                    "stock went negative"
                );
            }
            debug!(%product_id, quantity, previous_quantity, new_quantity, "applied stock delta");

            applied.push(AppliedDelta {
                product_id,
                quantity_delta: quantity,
                previous_quantity,
                new_quantity,
            });
        }

        counter!("firecrm.ledger.batches", 1);
        Ok(applied)
    }

    /// True when the product has at least `requested` on hand.
    pub async fn check_sufficiency<C>(
        conn: &C,
        product_id: Uuid,
        requested: i32,
    ) -> Result<bool, ServiceError>
    where
        C: ConnectionTrait,
    {
        Ok(Self::on_hand(conn, product_id).await? >= requested)
    }

    pub async fn on_hand<C>(conn: &C, product_id: Uuid) -> Result<i32, ServiceError>
    where
        C: ConnectionTrait,
    {
        Product::find_by_id(product_id)
            .one(conn)
            .await
            .map_err(ServiceError::db_error)?
            .map(|p| p.on_hand)
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))
    }

    /// Movement history for a product, newest first
    pub async fn movements<C>(
        conn: &C,
        product_id: Uuid,
    ) -> Result<Vec<stock_movement::Model>, ServiceError>
    where
        C: ConnectionTrait,
    {
        StockMovement::find()
            .filter(stock_movement::Column::ProductId.eq(product_id))
            .order_by_desc(stock_movement::Column::CreatedAt)
            .all(conn)
            .await
            .map_err(ServiceError::db_error)
    }
}

/// Net quantity per product. Totals are kept within `-i32::MAX..=i32::MAX`
/// so every net delta can be negated.
fn net_by_product(deltas: &[StockDelta]) -> Result<BTreeMap<Uuid, i32>, ServiceError> {
    let mut totals: BTreeMap<Uuid, i64> = BTreeMap::new();
    for delta in deltas {
        *totals.entry(delta.product_id).or_default() += i64::from(delta.quantity);
    }
    totals
        .into_iter()
        .map(|(id, total)| match i32::try_from(total) {
            Ok(q) if q != i32::MIN => Ok((id, q)),
            _ => Err(ServiceError::BadRequest(format!(
                "quantity overflow for product {}",
                id
            ))),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn netting_merges_lines_for_the_same_product() {
        let p = Uuid::new_v4();
        let q = Uuid::new_v4();
        let net = net_by_product(&[
            StockDelta::incoming(p, 5),
            StockDelta::outgoing(q, 2),
            StockDelta::incoming(p, 3),
        ])
        .unwrap();
        assert_eq!(net[&p], 8);
        assert_eq!(net[&q], -2);
    }

    #[test]
    fn replacement_reverts_then_applies() {
        let p = Uuid::new_v4();
        let deltas = replacement_deltas(&[StockDelta::incoming(p, 5)], &[StockDelta::incoming(p, 8)]);
        let net = net_by_product(&deltas).unwrap();
        assert_eq!(net[&p], 3);
    }

    #[test]
    fn netting_rejects_overflow() {
        let p = Uuid::new_v4();
        let err = net_by_product(&[StockDelta::incoming(p, i32::MAX), StockDelta::incoming(p, 1)])
            .unwrap_err();
        assert!(matches!(err, ServiceError::BadRequest(_)));
    }

    #[test]
    fn netting_rejects_a_total_that_cannot_be_negated() {
        let p = Uuid::new_v4();
        let half = 1 << 30;
        let err = net_by_product(&[StockDelta::outgoing(p, half), StockDelta::outgoing(p, half)])
            .unwrap_err();
        assert!(matches!(err, ServiceError::BadRequest(_)));

        let net = net_by_product(&[StockDelta::outgoing(p, i32::MAX)]).unwrap();
        assert_eq!(net[&p], -i32::MAX);
    }
}
