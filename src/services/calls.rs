use crate::{
    db::DbPool,
    entities::{
        call::{self, Entity as Call, DEFAULT_CALL_STATUS},
        diary_entry::{self, Entity as DiaryEntry},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        codes::{CodeGenerator, CodeScheme},
        sites::ensure_site_exists,
    },
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter, QueryOrder,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct NewCall {
    pub site_id: Uuid,
    #[validate(length(max = 100))]
    pub system_id: Option<String>,
    #[validate(length(max = 100))]
    pub call_type: Option<String>,
    #[validate(length(max = 1000))]
    pub reason: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub engineer_id: Option<String>,
    pub deadline: Option<DateTime<Utc>>,
    pub next_action: Option<DateTime<Utc>>,
    #[serde(default)]
    pub waiting: bool,
    #[validate(length(max = 1000))]
    pub waiting_reason: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct CallChanges {
    pub site_id: Option<Uuid>,
    #[validate(length(max = 100))]
    #[serde(
        default,
        deserialize_with = "crate::services::nullable",
        skip_serializing_if = "Option::is_none"
    )]
    #[schema(value_type = Option<String>)]
    pub system_id: Option<Option<String>>,
    #[validate(length(max = 100))]
    #[serde(
        default,
        deserialize_with = "crate::services::nullable",
        skip_serializing_if = "Option::is_none"
    )]
    #[schema(value_type = Option<String>)]
    pub call_type: Option<Option<String>>,
    #[validate(length(max = 1000))]
    #[serde(
        default,
        deserialize_with = "crate::services::nullable",
        skip_serializing_if = "Option::is_none"
    )]
    #[schema(value_type = Option<String>)]
    pub reason: Option<Option<String>>,
    #[validate(length(min = 1, max = 100))]
    #[serde(
        default,
        deserialize_with = "crate::services::nullable",
        skip_serializing_if = "Option::is_none"
    )]
    #[schema(value_type = Option<String>)]
    pub engineer_id: Option<Option<String>>,
    pub deadline: Option<DateTime<Utc>>,
    pub next_action: Option<DateTime<Utc>>,
    pub waiting: Option<bool>,
    #[validate(length(max = 1000))]
    pub waiting_reason: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub status: Option<String>,
}

/// A waiting call must say why; a call that is not waiting carries no reason.
fn waiting_reason(waiting: bool, reason: Option<String>) -> Result<Option<String>, ServiceError> {
    let reason = reason.filter(|r| !r.trim().is_empty());
    match (waiting, reason) {
        (true, None) => Err(ServiceError::ValidationError(
            "waiting_reason is required when waiting is set".to_string(),
        )),
        (true, Some(reason)) => Ok(Some(reason)),
        (false, _) => Ok(None),
    }
}

#[derive(Clone)]
pub struct CallService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl CallService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Logs a call with the next six-digit call number.
    #[instrument(skip(self, input), fields(site_id = %input.site_id))]
    pub async fn create_call(
        &self,
        input: NewCall,
        created_by: &str,
    ) -> Result<call::Model, ServiceError> {
        input.validate()?;
        let reason = waiting_reason(input.waiting, input.waiting_reason)?;

        let txn = self.db_pool.begin().await.map_err(ServiceError::db_error)?;
        ensure_site_exists(&txn, input.site_id).await?;

        let call_number = CodeGenerator::next(&txn, CodeScheme::Call).await?;
        let call = call::ActiveModel {
            id: Set(Uuid::new_v4()),
            call_number: Set(call_number),
            site_id: Set(input.site_id),
            system_id: Set(input.system_id),
            call_type: Set(input.call_type),
            reason: Set(input.reason),
            engineer_id: Set(input.engineer_id),
            deadline: Set(input.deadline),
            next_action: Set(input.next_action),
            waiting: Set(input.waiting),
            waiting_reason: Set(reason),
            status: Set(input
                .status
                .unwrap_or_else(|| DEFAULT_CALL_STATUS.to_string())),
            created_by: Set(created_by.to_string()),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        }
        .insert(&txn)
        .await
        .map_err(ServiceError::db_error)?;
        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(call_id = %call.id, call_number = %call.call_number, "call logged");
        self.event_sender
            .send_or_log(Event::CallLogged {
                call_id: call.id,
                call_number: call.call_number.clone(),
            })
            .await;
        Ok(call)
    }

    pub async fn get_call(&self, id: Uuid) -> Result<call::Model, ServiceError> {
        Call::find_by_id(id)
            .one(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Call {} not found", id)))
    }

    pub async fn get_call_by_number(&self, call_number: &str) -> Result<call::Model, ServiceError> {
        Call::find()
            .filter(call::Column::CallNumber.eq(call_number))
            .one(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Call {} not found", call_number)))
    }

    pub async fn list_calls(&self) -> Result<Vec<call::Model>, ServiceError> {
        Call::find()
            .order_by_asc(call::Column::CreatedAt)
            .order_by_asc(call::Column::CallNumber)
            .all(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }

    #[instrument(skip(self, changes))]
    pub async fn update_call(
        &self,
        id: Uuid,
        changes: CallChanges,
    ) -> Result<call::Model, ServiceError> {
        changes.validate()?;

        let txn = self.db_pool.begin().await.map_err(ServiceError::db_error)?;
        let current = Call::find_by_id(id)
            .one(&txn)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Call {} not found", id)))?;

        let waiting = changes.waiting.unwrap_or(current.waiting);
        let reason = waiting_reason(
            waiting,
            changes.waiting_reason.or_else(|| current.waiting_reason.clone()),
        )?;

        let mut active: call::ActiveModel = current.into();
        if let Some(site_id) = changes.site_id {
            ensure_site_exists(&txn, site_id).await?;
            active.site_id = Set(site_id);
        }
        if let Some(system_id) = changes.system_id {
            active.system_id = Set(system_id);
        }
        if let Some(call_type) = changes.call_type {
            active.call_type = Set(call_type);
        }
        if let Some(reason) = changes.reason {
            active.reason = Set(reason);
        }
        if let Some(engineer_id) = changes.engineer_id {
            active.engineer_id = Set(engineer_id);
        }
        if let Some(deadline) = changes.deadline {
            active.deadline = Set(Some(deadline));
        }
        if let Some(next_action) = changes.next_action {
            active.next_action = Set(Some(next_action));
        }
        if let Some(status) = changes.status {
            active.status = Set(status);
        }
        active.waiting = Set(waiting);
        active.waiting_reason = Set(reason);
        active.updated_at = Set(Some(Utc::now()));

        let call = active.update(&txn).await.map_err(ServiceError::db_error)?;
        txn.commit().await.map_err(ServiceError::db_error)?;

        self.event_sender
            .send_or_log(Event::CallUpdated(id))
            .await;
        Ok(call)
    }

    /// Deletes a call together with its diary entries.
    #[instrument(skip(self))]
    pub async fn delete_call(&self, id: Uuid) -> Result<(), ServiceError> {
        let txn = self.db_pool.begin().await.map_err(ServiceError::db_error)?;
        Call::find_by_id(id)
            .one(&txn)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Call {} not found", id)))?;

        let entries = DiaryEntry::delete_many()
            .filter(diary_entry::Column::CallId.eq(id))
            .exec(&txn)
            .await
            .map_err(ServiceError::db_error)?;
        Call::delete_by_id(id)
            .exec(&txn)
            .await
            .map_err(ServiceError::db_error)?;
        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(call_id = %id, diary_entries = entries.rows_affected, "call deleted");
        self.event_sender
            .send_or_log(Event::CallDeleted(id))
            .await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn waiting_requires_reason() {
        assert!(waiting_reason(true, None).is_err());
        assert!(waiting_reason(true, Some("  ".into())).is_err());
        assert_eq!(
            waiting_reason(true, Some("parts on order".into())).unwrap(),
            Some("parts on order".to_string())
        );
    }

    #[test]
    fn reason_is_dropped_when_not_waiting() {
        assert_eq!(waiting_reason(false, Some("stale".into())).unwrap(), None);
    }
}
