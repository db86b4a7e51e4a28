use chrono::NaiveDate;
use metrics::counter;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Sending half of the domain event channel
#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event after the originating change is already committed.
    /// A closed channel is logged rather than surfaced to the caller.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!(error = %e, "dropping domain event");
            counter!("firecrm.events.dropped", 1);
        }
    }
}

/// Creates a bounded event channel
pub fn channel(capacity: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(capacity);
    (EventSender::new(tx), rx)
}

/// Domain events raised by the services once their transaction commits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // Catalog
    ProductCreated(Uuid),
    ProductUpdated(Uuid),
    ProductDeleted(Uuid),
    StockAdjusted {
        product_id: Uuid,
        previous_quantity: i32,
        new_quantity: i32,
        reference_type: String,
        reference_id: Uuid,
    },
    NegativeStock {
        product_id: Uuid,
        on_hand: i32,
    },

    // Sites and calls
    SiteCreated(Uuid),
    SiteUpdated(Uuid),
    SiteDeleted(Uuid),
    CallLogged {
        call_id: Uuid,
        call_number: String,
    },
    CallUpdated(Uuid),
    CallDeleted(Uuid),

    // Diary
    DiaryEntryCreated {
        entry_id: Uuid,
        call_id: Uuid,
        engineer_id: String,
        is_initial_assignment: bool,
    },
    DiaryEntryUpdated {
        entry_id: Uuid,
        engineer_id: String,
    },
    DiaryEntryDeleted {
        entry_id: Uuid,
        call_id: Uuid,
    },
    DiaryConflictRejected {
        engineer_id: String,
        date: NaiveDate,
        start_time: String,
        end_time: String,
    },

    // Stock documents
    PurchaseOrderCreated {
        purchase_order_id: Uuid,
        po_number: String,
    },
    PurchaseOrderUpdated(Uuid),
    PurchaseOrderDeleted(Uuid),
    DeliveryChallanCreated {
        challan_id: Uuid,
        challan_number: String,
    },
    DeliveryChallanUpdated(Uuid),
    DeliveryChallanDeleted(Uuid),

    // Files
    AttachmentOrphaned {
        path: String,
        reason: String,
    },
}

impl Event {
    /// Short stable name used for metrics labels
    pub fn kind(&self) -> &'static str {
        match self {
            Event::ProductCreated(_) => "product_created",
            Event::ProductUpdated(_) => "product_updated",
            Event::ProductDeleted(_) => "product_deleted",
            Event::StockAdjusted { .. } => "stock_adjusted",
            Event::NegativeStock { .. } => "negative_stock",
            Event::SiteCreated(_) => "site_created",
            Event::SiteUpdated(_) => "site_updated",
            Event::SiteDeleted(_) => "site_deleted",
            Event::CallLogged { .. } => "call_logged",
            Event::CallUpdated(_) => "call_updated",
            Event::CallDeleted(_) => "call_deleted",
            Event::DiaryEntryCreated { .. } => "diary_entry_created",
            Event::DiaryEntryUpdated { .. } => "diary_entry_updated",
            Event::DiaryEntryDeleted { .. } => "diary_entry_deleted",
            Event::DiaryConflictRejected { .. } => "diary_conflict_rejected",
            Event::PurchaseOrderCreated { .. } => "purchase_order_created",
            Event::PurchaseOrderUpdated(_) => "purchase_order_updated",
            Event::PurchaseOrderDeleted(_) => "purchase_order_deleted",
            Event::DeliveryChallanCreated { .. } => "delivery_challan_created",
            Event::DeliveryChallanUpdated(_) => "delivery_challan_updated",
            Event::DeliveryChallanDeleted(_) => "delivery_challan_deleted",
            Event::AttachmentOrphaned { .. } => "attachment_orphaned",
        }
    }
}

/// Drains the event channel until every sender is dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        counter!("firecrm.events.processed", 1, "kind" => event.kind());

        match &event {
            Event::StockAdjusted {
                product_id,
                previous_quantity,
                new_quantity,
                reference_type,
                reference_id,
            } => {
                info!(
                    %product_id,
                    previous_quantity,
                    new_quantity,
                    %reference_type,
                    %reference_id,
                    "stock adjusted"
                );
            }
            Event::NegativeStock {
                product_id,
                on_hand,
            } => {
                warn!(%product_id, on_hand, "product stock is negative");
            }
            Event::DiaryConflictRejected {
                engineer_id,
                date,
                start_time,
                end_time,
            } => {
                info!(
                    %engineer_id,
                    %date,
                    %start_time,
                    %end_time,
                    "diary booking rejected for overlap"
                );
            }
            Event::AttachmentOrphaned { path, reason } => {
                error!(%path, %reason, "attachment left on disk; needs manual cleanup");
            }
            other => {
                info!(event = ?other, "domain event");
            }
        }
    }

    warn!("Event processing loop has ended");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_or_log_tolerates_closed_channel() {
        let (sender, rx) = channel(1);
        drop(rx);
        sender.send_or_log(Event::SiteCreated(Uuid::new_v4())).await;
        assert!(sender.send(Event::SiteDeleted(Uuid::new_v4())).await.is_err());
    }

    #[tokio::test]
    async fn events_are_delivered_in_order() {
        let (sender, mut rx) = channel(4);
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        sender.send(Event::CallUpdated(first)).await.unwrap();
        sender.send(Event::CallDeleted(second)).await.unwrap();

        assert_eq!(rx.recv().await, Some(Event::CallUpdated(first)));
        assert_eq!(rx.recv().await.map(|e| e.kind()), Some("call_deleted"));
    }
}
