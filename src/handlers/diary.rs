use super::common::{created_response, no_content_response, success_response, validate_input};
use crate::{
    auth::AuthUser,
    errors::ServiceError,
    handlers::AppState,
    services::diary::{ConflictReport, DiaryEntryChanges, DiaryEntryView, NewDiaryEntry},
};
use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::info;
use utoipa::IntoParams;
use uuid::Uuid;

#[derive(Debug, Deserialize, IntoParams)]
pub struct EngineerDayQuery {
    pub engineer: String,
    pub date: NaiveDate,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ConflictQuery {
    pub engineer: String,
    pub date: NaiveDate,
    /// `HH:MM`
    pub start_time: String,
    /// `HH:MM`
    pub end_time: String,
    /// Entry to ignore, typically the one being edited
    pub exclude_id: Option<Uuid>,
}

/// Book an engineer against a call
///
/// The path segment is the id of the user recording the booking.
#[utoipa::path(
    post,
    path = "/api/diary/entries/{userId}",
    request_body = NewDiaryEntry,
    params(("userId" = String, Path, description = "User recording the entry")),
    responses(
        (status = 201, description = "Entry created", body = DiaryEntryView),
        (status = 400, description = "Invalid times, past date or overlap", body = crate::errors::ErrorResponse),
        (status = 404, description = "Call or site not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "diary"
)]
pub async fn create_entry(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(user_id): Path<String>,
    Json(payload): Json<NewDiaryEntry>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;
    let entry = state.services.diary.create_entry(payload, &user_id).await?;
    info!(entry_id = %entry.entry.id, engineer_id = %entry.entry.engineer_id, "diary entry booked");
    Ok(created_response(entry))
}

/// Fetch a single diary entry
#[utoipa::path(
    get,
    path = "/api/diary/entries/{id}",
    params(("id" = Uuid, Path, description = "Diary entry ID")),
    responses(
        (status = 200, description = "Entry found", body = DiaryEntryView),
        (status = 404, description = "Entry not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "diary"
)]
pub async fn get_entry(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let entry = state.services.diary.get_entry(id).await?;
    Ok(success_response(entry))
}

/// Update a diary entry
#[utoipa::path(
    put,
    path = "/api/diary/entries/{id}",
    request_body = DiaryEntryChanges,
    params(("id" = Uuid, Path, description = "Diary entry ID")),
    responses(
        (status = 200, description = "Entry updated", body = DiaryEntryView),
        (status = 400, description = "Overlap or protected initial assignment", body = crate::errors::ErrorResponse),
        (status = 404, description = "Entry not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "diary"
)]
pub async fn update_entry(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<DiaryEntryChanges>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;
    let entry = state
        .services
        .diary
        .update_entry(id, payload, &user.user_id)
        .await?;
    Ok(success_response(entry))
}

/// Delete a diary entry
#[utoipa::path(
    delete,
    path = "/api/diary/entries/{id}",
    params(("id" = Uuid, Path, description = "Diary entry ID")),
    responses(
        (status = 204, description = "Entry deleted"),
        (status = 400, description = "Protected initial assignment", body = crate::errors::ErrorResponse),
        (status = 404, description = "Entry not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "diary"
)]
pub async fn delete_entry(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.diary.delete_entry(id).await?;
    info!(entry_id = %id, deleted_by = %user.user_id, "diary entry deleted");
    Ok(no_content_response())
}

/// An engineer's bookings for one day
#[utoipa::path(
    get,
    path = "/api/diary/entries",
    params(EngineerDayQuery),
    responses((status = 200, description = "Entries ordered by start time", body = [DiaryEntryView])),
    security(("bearer_auth" = [])),
    tag = "diary"
)]
pub async fn list_engineer_day(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(query): Query<EngineerDayQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let entries = state
        .services
        .diary
        .list_by_engineer_and_date(&query.engineer, query.date)
        .await?;
    Ok(success_response(entries))
}

/// Checks a slot for overlapping bookings without writing anything
#[utoipa::path(
    get,
    path = "/api/diary/check-conflict",
    params(ConflictQuery),
    responses(
        (status = 200, description = "Conflict report", body = ConflictReport),
        (status = 400, description = "Malformed times", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "diary"
)]
pub async fn check_conflict(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(query): Query<ConflictQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let report = state
        .services
        .diary
        .check_conflict(
            &query.engineer,
            query.date,
            &query.start_time,
            &query.end_time,
            query.exclude_id,
        )
        .await?;
    Ok(success_response(report))
}

/// Every booking made against a call
#[utoipa::path(
    get,
    path = "/api/diary/call-log/{callLogId}/assignments",
    params(("callLogId" = String, Path, description = "Call number, e.g. 000042")),
    responses(
        (status = 200, description = "Entries ordered by date and start time", body = [DiaryEntryView]),
        (status = 404, description = "Call not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "diary"
)]
pub async fn list_call_assignments(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(call_number): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let entries = state.services.diary.list_by_call(&call_number).await?;
    Ok(success_response(entries))
}

/// Create diary routes
pub fn diary_routes() -> Router<AppState> {
    Router::new()
        .route("/entries", get(list_engineer_day))
        // POST takes the recording user's id in the same segment the other verbs use for the entry id
        .route(
            "/entries/:id",
            get(get_entry)
                .post(create_entry)
                .put(update_entry)
                .delete(delete_entry),
        )
        .route("/check-conflict", get(check_conflict))
        .route("/call-log/:call_number/assignments", get(list_call_assignments))
}
