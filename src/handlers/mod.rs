pub mod calls;
pub mod common;
pub mod delivery_challans;
pub mod diary;
pub mod products;
pub mod purchase_orders;
pub mod sites;
pub mod uploads;

use crate::db::DbPool;
use crate::events::EventSender;
use crate::files::FileStore;
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub products: Arc<crate::services::products::ProductService>,
    pub sites: Arc<crate::services::sites::SiteService>,
    pub calls: Arc<crate::services::calls::CallService>,
    pub diary: Arc<crate::services::diary::DiaryScheduler>,
    pub purchase_orders: Arc<crate::services::purchase_orders::PurchaseOrderService>,
    pub delivery_challans: Arc<crate::services::delivery_challans::DeliveryChallanService>,
}

impl AppServices {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        files: Arc<dyn FileStore>,
    ) -> Self {
        Self {
            products: Arc::new(crate::services::products::ProductService::new(
                db_pool.clone(),
                event_sender.clone(),
            )),
            sites: Arc::new(crate::services::sites::SiteService::new(
                db_pool.clone(),
                event_sender.clone(),
            )),
            calls: Arc::new(crate::services::calls::CallService::new(
                db_pool.clone(),
                event_sender.clone(),
            )),
            diary: Arc::new(crate::services::diary::DiaryScheduler::new(
                db_pool.clone(),
                event_sender.clone(),
            )),
            purchase_orders: Arc::new(
                crate::services::purchase_orders::PurchaseOrderService::new(
                    db_pool.clone(),
                    event_sender.clone(),
                    files.clone(),
                ),
            ),
            delivery_challans: Arc::new(
                crate::services::delivery_challans::DeliveryChallanService::new(
                    db_pool,
                    event_sender,
                    files,
                ),
            ),
        }
    }
}
