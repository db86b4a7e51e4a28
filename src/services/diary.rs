use crate::{
    db::DbPool,
    entities::{
        call::{self, Entity as Call},
        diary_entry::{self, DiaryStatus, Entity as DiaryEntry},
        site::{self, Entity as Site},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{scheduling::TimeSlot, sites::ensure_site_exists},
};
use chrono::{NaiveDate, Utc};
use dashmap::DashMap;
use metrics::counter;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseTransaction,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// In-process serialization of diary writes, keyed by engineer and call.
#[derive(Debug, Default)]
pub struct ScheduleLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

/// Locks held by one writer. Dropping it releases them and forgets keys no
/// other writer is holding or waiting on.
pub struct ScheduleGuard<'a> {
    guards: Vec<OwnedMutexGuard<()>>,
    keys: Vec<String>,
    table: &'a ScheduleLocks,
}

impl Drop for ScheduleGuard<'_> {
    fn drop(&mut self) {
        self.guards.clear();
        for key in &self.keys {
            self.table
                .locks
                .remove_if(key, |_, lock| Arc::strong_count(lock) == 1);
        }
    }
}

impl ScheduleLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks every key, in sorted order so overlapping key sets cannot deadlock.
    pub async fn acquire<I>(&self, keys: I) -> ScheduleGuard<'_>
    where
        I: IntoIterator<Item = String>,
    {
        let keys: Vec<String> = keys
            .into_iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        // built up front so a cancelled acquire still prunes on drop
        let mut held = ScheduleGuard {
            guards: Vec::with_capacity(keys.len()),
            keys,
            table: self,
        };
        for i in 0..held.keys.len() {
            let lock = self
                .locks
                .entry(held.keys[i].clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone();
            held.guards.push(lock.lock_owned().await);
        }
        held
    }

    /// Number of keys currently tracked
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

const LOCK_ATTEMPTS: u32 = 3;

fn engineer_key(engineer_id: &str) -> String {
    format!("engineer:{}", engineer_id)
}

fn call_key(call_id: Uuid) -> String {
    format!("call:{}", call_id)
}

/// Request to book an engineer against a call
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct NewDiaryEntry {
    /// Human-readable call number, e.g. `000042`
    #[validate(length(min = 1))]
    pub call_number: String,
    /// Defaults to the call's site
    pub site_id: Option<Uuid>,
    #[validate(length(min = 1, max = 100))]
    pub engineer_id: String,
    pub date: NaiveDate,
    #[schema(example = "09:00")]
    pub start_time: String,
    #[schema(example = "11:15")]
    pub end_time: String,
    pub status: Option<DiaryStatus>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

/// Partial update of a diary entry; absent fields are left unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct DiaryEntryChanges {
    pub site_id: Option<Uuid>,
    #[validate(length(min = 1, max = 100))]
    pub engineer_id: Option<String>,
    pub date: Option<NaiveDate>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub status: Option<DiaryStatus>,
    #[validate(length(max = 2000))]
    #[serde(
        default,
        deserialize_with = "crate::services::nullable",
        skip_serializing_if = "Option::is_none"
    )]
    #[schema(value_type = Option<String>)]
    pub notes: Option<Option<String>>,
}

/// Diary entry with its call number and site name populated
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DiaryEntryView {
    #[serde(flatten)]
    pub entry: diary_entry::Model,
    pub call_number: String,
    pub site_name: Option<String>,
}

/// Result of a read-only overlap check
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ConflictReport {
    pub has_conflict: bool,
    pub conflicts: Vec<diary_entry::Model>,
}

/// Engineer diary: conflict-free bookings per engineer per day, plus
/// protection of each call's initial assignment.
pub struct DiaryScheduler {
    db: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    locks: Arc<ScheduleLocks>,
}

impl DiaryScheduler {
    pub fn new(db: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db,
            event_sender,
            locks: Arc::new(ScheduleLocks::new()),
        }
    }

    /// Books an engineer. The first entry for a call becomes its initial assignment.
    #[instrument(skip(self, input), fields(call_number = %input.call_number, engineer_id = %input.engineer_id))]
    pub async fn create_entry(
        &self,
        input: NewDiaryEntry,
        created_by: &str,
    ) -> Result<DiaryEntryView, ServiceError> {
        input.validate()?;
        let slot = TimeSlot::parse(&input.start_time, &input.end_time)?;

        let today = Utc::now().date_naive();
        if input.date < today {
            return Err(ServiceError::ValidationError(format!(
                "date {} is in the past",
                input.date
            )));
        }

        let call = find_call_by_number(self.db.as_ref(), &input.call_number).await?;
        let _guards = self
            .locks
            .acquire([engineer_key(&input.engineer_id), call_key(call.id)])
            .await;

        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;

        let site_id = input.site_id.unwrap_or(call.site_id);
        ensure_site_exists(&txn, site_id).await?;

        let status = input.status.unwrap_or(DiaryStatus::Scheduled);
        if status.occupies_time() {
            self.reject_overlap(&txn, &input.engineer_id, input.date, &slot, None)
                .await?;
        }

        let existing_for_call = DiaryEntry::find()
            .filter(diary_entry::Column::CallId.eq(call.id))
            .count(&txn)
            .await
            .map_err(ServiceError::db_error)?;

        let now = Utc::now();
        let entry = diary_entry::ActiveModel {
            id: Set(Uuid::new_v4()),
            site_id: Set(site_id),
            call_id: Set(call.id),
            engineer_id: Set(input.engineer_id.clone()),
            date: Set(input.date),
            start_time: Set(slot.start().to_string()),
            end_time: Set(slot.end().to_string()),
            duration: Set(slot.duration_label()),
            status: Set(status),
            notes: Set(input.notes),
            is_initial_assignment: Set(existing_for_call == 0),
            created_by: Set(created_by.to_string()),
            updated_by: Set(None),
            created_at: Set(now),
            updated_at: Set(None),
        }
        .insert(&txn)
        .await
        .map_err(ServiceError::db_error)?;

        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(
            entry_id = %entry.id,
            is_initial_assignment = entry.is_initial_assignment,
            "diary entry created"
        );
        self.event_sender
            .send_or_log(Event::DiaryEntryCreated {
                entry_id: entry.id,
                call_id: entry.call_id,
                engineer_id: entry.engineer_id.clone(),
                is_initial_assignment: entry.is_initial_assignment,
            })
            .await;

        Ok(DiaryEntryView {
            entry,
            call_number: call.call_number,
            site_name: site_name(self.db.as_ref(), site_id).await?,
        })
    }

    /// Applies field changes, re-validating the slot when timing, engineer or
    /// cancellation state changed.
    #[instrument(skip(self, changes))]
    pub async fn update_entry(
        &self,
        id: Uuid,
        changes: DiaryEntryChanges,
        updated_by: &str,
    ) -> Result<DiaryEntryView, ServiceError> {
        changes.validate()?;

        let (_guards, txn, current) = self
            .lock_for_update(id, changes.engineer_id.as_deref())
            .await?;
        let target_engineer = changes
            .engineer_id
            .clone()
            .unwrap_or_else(|| current.engineer_id.clone());

        let engineer_changed = target_engineer != current.engineer_id;
        if engineer_changed
            && current.is_initial_assignment
            && other_entries_for_call(&txn, current.call_id, current.id).await? > 0
        {
            return Err(ServiceError::ValidationError(
                "the engineer of a call's initial assignment cannot be changed while other assignments exist"
                    .to_string(),
            ));
        }

        let date = changes.date.unwrap_or(current.date);
        let slot = TimeSlot::parse(
            changes.start_time.as_deref().unwrap_or(&current.start_time),
            changes.end_time.as_deref().unwrap_or(&current.end_time),
        )?;
        let status = changes.status.unwrap_or(current.status);

        let timing_changed = date != current.date
            || slot.start().to_string() != current.start_time
            || slot.end().to_string() != current.end_time;
        let reactivated = !current.status.occupies_time() && status.occupies_time();
        if status.occupies_time() && (timing_changed || engineer_changed || reactivated) {
            self.reject_overlap(&txn, &target_engineer, date, &slot, Some(current.id))
                .await?;
        }

        if let Some(site_id) = changes.site_id {
            ensure_site_exists(&txn, site_id).await?;
        }

        let mut active: diary_entry::ActiveModel = current.clone().into();
        if let Some(site_id) = changes.site_id {
            active.site_id = Set(site_id);
        }
        if let Some(notes) = changes.notes {
            active.notes = Set(notes);
        }
        active.engineer_id = Set(target_engineer);
        active.date = Set(date);
        active.start_time = Set(slot.start().to_string());
        active.end_time = Set(slot.end().to_string());
        active.duration = Set(slot.duration_label());
        active.status = Set(status);
        active.updated_by = Set(Some(updated_by.to_string()));
        active.updated_at = Set(Some(Utc::now()));

        let entry = active.update(&txn).await.map_err(ServiceError::db_error)?;
        txn.commit().await.map_err(ServiceError::db_error)?;

        self.event_sender
            .send_or_log(Event::DiaryEntryUpdated {
                entry_id: entry.id,
                engineer_id: entry.engineer_id.clone(),
            })
            .await;

        view_of(self.db.as_ref(), entry).await
    }

    /// Locks the entry's engineer, the requested engineer and its call, then
    /// re-reads the entry inside a transaction. If the entry changed engineer
    /// while the locks were awaited, the locked set is stale and it starts over.
    async fn lock_for_update(
        &self,
        id: Uuid,
        requested_engineer: Option<&str>,
    ) -> Result<(ScheduleGuard<'_>, DatabaseTransaction, diary_entry::Model), ServiceError> {
        for attempt in 1..=LOCK_ATTEMPTS {
            let seen = find_entry(self.db.as_ref(), id).await?;
            let target = requested_engineer.unwrap_or(seen.engineer_id.as_str());
            let guards = self
                .locks
                .acquire([
                    engineer_key(&seen.engineer_id),
                    engineer_key(target),
                    call_key(seen.call_id),
                ])
                .await;

            let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
            let current = find_entry(&txn, id).await?;
            if current.engineer_id == seen.engineer_id {
                return Ok((guards, txn, current));
            }
            debug!(
                entry_id = %id,
                attempt,
                from = %seen.engineer_id,
                to = %current.engineer_id,
                "entry reassigned while waiting for locks"
            );
        }

        Err(ServiceError::Conflict(format!(
            "diary entry {} is being reassigned concurrently, retry the update",
            id
        )))
    }

    /// Removes an entry unless it is an initial assignment with siblings.
    #[instrument(skip(self))]
    pub async fn delete_entry(&self, id: Uuid) -> Result<(), ServiceError> {
        let current = find_entry(self.db.as_ref(), id).await?;
        let _guards = self.locks.acquire([call_key(current.call_id)]).await;

        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
        let current = find_entry(&txn, id).await?;

        if current.is_initial_assignment
            && other_entries_for_call(&txn, current.call_id, current.id).await? > 0
        {
            return Err(ServiceError::ValidationError(
                "a call's initial assignment cannot be deleted while other assignments exist"
                    .to_string(),
            ));
        }

        DiaryEntry::delete_by_id(current.id)
            .exec(&txn)
            .await
            .map_err(ServiceError::db_error)?;
        txn.commit().await.map_err(ServiceError::db_error)?;

        info!(entry_id = %current.id, call_id = %current.call_id, "diary entry deleted");
        self.event_sender
            .send_or_log(Event::DiaryEntryDeleted {
                entry_id: current.id,
                call_id: current.call_id,
            })
            .await;
        Ok(())
    }

    /// Read-only overlap check with the same rule as booking.
    #[instrument(skip(self))]
    pub async fn check_conflict(
        &self,
        engineer_id: &str,
        date: NaiveDate,
        start_time: &str,
        end_time: &str,
        exclude_id: Option<Uuid>,
    ) -> Result<ConflictReport, ServiceError> {
        let slot = TimeSlot::parse(start_time, end_time)?;
        let conflicts =
            overlapping_entries(self.db.as_ref(), engineer_id, date, &slot, exclude_id).await?;
        Ok(ConflictReport {
            has_conflict: !conflicts.is_empty(),
            conflicts,
        })
    }

    pub async fn get_entry(&self, id: Uuid) -> Result<DiaryEntryView, ServiceError> {
        let entry = find_entry(self.db.as_ref(), id).await?;
        view_of(self.db.as_ref(), entry).await
    }

    /// Entries of a call ordered by date then start time
    #[instrument(skip(self))]
    pub async fn list_by_call(&self, call_number: &str) -> Result<Vec<DiaryEntryView>, ServiceError> {
        let db = self.db.as_ref();
        let call = find_call_by_number(db, call_number).await?;
        let entries = DiaryEntry::find()
            .filter(diary_entry::Column::CallId.eq(call.id))
            .order_by_asc(diary_entry::Column::Date)
            .order_by_asc(diary_entry::Column::StartTime)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;
        views_of(db, entries).await
    }

    /// An engineer's day, ordered by start time
    #[instrument(skip(self))]
    pub async fn list_by_engineer_and_date(
        &self,
        engineer_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<DiaryEntryView>, ServiceError> {
        let db = self.db.as_ref();
        let entries = DiaryEntry::find()
            .filter(diary_entry::Column::EngineerId.eq(engineer_id))
            .filter(diary_entry::Column::Date.eq(date))
            .order_by_asc(diary_entry::Column::StartTime)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;
        views_of(db, entries).await
    }

    async fn reject_overlap<C>(
        &self,
        conn: &C,
        engineer_id: &str,
        date: NaiveDate,
        slot: &TimeSlot,
        exclude_id: Option<Uuid>,
    ) -> Result<(), ServiceError>
    where
        C: ConnectionTrait,
    {
        let conflicts = overlapping_entries(conn, engineer_id, date, slot, exclude_id).await?;
        let Some(existing) = conflicts.first() else {
            return Ok(());
        };

        counter!("firecrm.diary.conflicts", 1);
        warn!(
            engineer_id,
            %date,
            existing_entry = %existing.id,
            "rejected overlapping diary booking"
        );
        self.event_sender
            .send_or_log(Event::DiaryConflictRejected {
                engineer_id: engineer_id.to_string(),
                date,
                start_time: slot.start().to_string(),
                end_time: slot.end().to_string(),
            })
            .await;

        Err(ServiceError::ValidationError(format!(
            "engineer {} already has an entry from {} to {} on {}",
            engineer_id, existing.start_time, existing.end_time, date
        )))
    }
}

/// Non-cancelled entries of the engineer's day that intersect `slot`.
/// Stored times are zero-padded, so string comparison orders them correctly.
async fn overlapping_entries<C>(
    conn: &C,
    engineer_id: &str,
    date: NaiveDate,
    slot: &TimeSlot,
    exclude_id: Option<Uuid>,
) -> Result<Vec<diary_entry::Model>, ServiceError>
where
    C: ConnectionTrait,
{
    let mut query = DiaryEntry::find()
        .filter(diary_entry::Column::EngineerId.eq(engineer_id))
        .filter(diary_entry::Column::Date.eq(date))
        .filter(diary_entry::Column::Status.ne(DiaryStatus::Cancelled))
        .filter(diary_entry::Column::StartTime.lt(slot.end().to_string()))
        .filter(diary_entry::Column::EndTime.gt(slot.start().to_string()));
    if let Some(exclude_id) = exclude_id {
        query = query.filter(diary_entry::Column::Id.ne(exclude_id));
    }

    query
        .order_by_asc(diary_entry::Column::StartTime)
        .all(conn)
        .await
        .map_err(ServiceError::db_error)
}

async fn other_entries_for_call<C>(conn: &C, call_id: Uuid, entry_id: Uuid) -> Result<u64, ServiceError>
where
    C: ConnectionTrait,
{
    DiaryEntry::find()
        .filter(diary_entry::Column::CallId.eq(call_id))
        .filter(diary_entry::Column::Id.ne(entry_id))
        .count(conn)
        .await
        .map_err(ServiceError::db_error)
}

async fn find_entry<C>(conn: &C, id: Uuid) -> Result<diary_entry::Model, ServiceError>
where
    C: ConnectionTrait,
{
    DiaryEntry::find_by_id(id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::NotFound(format!("Diary entry {} not found", id)))
}

async fn find_call_by_number<C>(conn: &C, call_number: &str) -> Result<call::Model, ServiceError>
where
    C: ConnectionTrait,
{
    Call::find()
        .filter(call::Column::CallNumber.eq(call_number))
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::NotFound(format!("Call {} not found", call_number)))
}

async fn site_name<C>(conn: &C, site_id: Uuid) -> Result<Option<String>, ServiceError>
where
    C: ConnectionTrait,
{
    Ok(Site::find_by_id(site_id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .map(|site| site.name))
}

async fn view_of<C>(conn: &C, entry: diary_entry::Model) -> Result<DiaryEntryView, ServiceError>
where
    C: ConnectionTrait,
{
    views_of(conn, vec![entry])
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| ServiceError::InternalError("diary entry view missing".to_string()))
}

async fn views_of<C>(
    conn: &C,
    entries: Vec<diary_entry::Model>,
) -> Result<Vec<DiaryEntryView>, ServiceError>
where
    C: ConnectionTrait,
{
    if entries.is_empty() {
        return Ok(Vec::new());
    }

    let call_ids: BTreeSet<Uuid> = entries.iter().map(|e| e.call_id).collect();
    let site_ids: BTreeSet<Uuid> = entries.iter().map(|e| e.site_id).collect();

    let call_numbers: HashMap<Uuid, String> = Call::find()
        .filter(call::Column::Id.is_in(call_ids))
        .all(conn)
        .await
        .map_err(ServiceError::db_error)?
        .into_iter()
        .map(|c| (c.id, c.call_number))
        .collect();
    let site_names: HashMap<Uuid, String> = Site::find()
        .filter(site::Column::Id.is_in(site_ids))
        .all(conn)
        .await
        .map_err(ServiceError::db_error)?
        .into_iter()
        .map(|s| (s.id, s.name))
        .collect();

    Ok(entries
        .into_iter()
        .map(|entry| DiaryEntryView {
            call_number: call_numbers.get(&entry.call_id).cloned().unwrap_or_default(),
            site_name: site_names.get(&entry.site_id).cloned(),
            entry,
        })
        .collect())
}
