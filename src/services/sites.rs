use crate::{
    db::DbPool,
    entities::{
        call::{self, Entity as Call},
        site::{self, Entity as Site},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::codes::{CodeGenerator, CodeScheme},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct NewSite {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(max = 255))]
    pub customer_name: Option<String>,
    #[validate(length(max = 1000))]
    pub address: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct SiteChanges {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(length(max = 255))]
    #[serde(
        default,
        deserialize_with = "crate::services::nullable",
        skip_serializing_if = "Option::is_none"
    )]
    #[schema(value_type = Option<String>)]
    pub customer_name: Option<Option<String>>,
    #[validate(length(max = 1000))]
    #[serde(
        default,
        deserialize_with = "crate::services::nullable",
        skip_serializing_if = "Option::is_none"
    )]
    #[schema(value_type = Option<String>)]
    pub address: Option<Option<String>>,
}

#[derive(Clone)]
pub struct SiteService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl SiteService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Creates a site with the next `SITE-NNNN` code.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_site(&self, input: NewSite) -> Result<site::Model, ServiceError> {
        input.validate()?;

        let txn = self.db_pool.begin().await.map_err(ServiceError::db_error)?;
        let code = CodeGenerator::next(&txn, CodeScheme::Site).await?;
        let site = site::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: Set(code),
            name: Set(input.name),
            customer_name: Set(input.customer_name),
            address: Set(input.address),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        }
        .insert(&txn)
        .await
        .map_err(ServiceError::db_error)?;
        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(site_id = %site.id, code = %site.code, "site created");
        self.event_sender
            .send_or_log(Event::SiteCreated(site.id))
            .await;
        Ok(site)
    }

    pub async fn get_site(&self, id: Uuid) -> Result<site::Model, ServiceError> {
        Site::find_by_id(id)
            .one(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Site {} not found", id)))
    }

    pub async fn list_sites(&self) -> Result<Vec<site::Model>, ServiceError> {
        Site::find()
            .order_by_asc(site::Column::CreatedAt)
            .order_by_asc(site::Column::Code)
            .all(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }

    #[instrument(skip(self, changes))]
    pub async fn update_site(
        &self,
        id: Uuid,
        changes: SiteChanges,
    ) -> Result<site::Model, ServiceError> {
        changes.validate()?;

        let mut active: site::ActiveModel = self.get_site(id).await?.into();
        if let Some(name) = changes.name {
            active.name = Set(name);
        }
        if let Some(customer_name) = changes.customer_name {
            active.customer_name = Set(customer_name);
        }
        if let Some(address) = changes.address {
            active.address = Set(address);
        }
        active.updated_at = Set(Some(Utc::now()));

        let site = active
            .update(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?;
        self.event_sender
            .send_or_log(Event::SiteUpdated(id))
            .await;
        Ok(site)
    }

    /// Sites with logged calls cannot be removed.
    #[instrument(skip(self))]
    pub async fn delete_site(&self, id: Uuid) -> Result<(), ServiceError> {
        let db = self.db_pool.as_ref();
        self.get_site(id).await?;

        let calls = Call::find()
            .filter(call::Column::SiteId.eq(id))
            .count(db)
            .await
            .map_err(ServiceError::db_error)?;
        if calls > 0 {
            return Err(ServiceError::Conflict(format!(
                "site {} still has {} calls",
                id, calls
            )));
        }

        Site::delete_by_id(id)
            .exec(db)
            .await
            .map_err(ServiceError::db_error)?;
        self.event_sender
            .send_or_log(Event::SiteDeleted(id))
            .await;
        Ok(())
    }
}

/// Fails with `NotFound` unless the site exists on `conn`.
pub(crate) async fn ensure_site_exists<C>(conn: &C, site_id: Uuid) -> Result<(), ServiceError>
where
    C: ConnectionTrait,
{
    Site::find_by_id(site_id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .map(|_| ())
        .ok_or_else(|| ServiceError::NotFound(format!("Site {} not found", site_id)))
}
