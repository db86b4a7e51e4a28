use super::common::{created_response, no_content_response, success_response, validate_input};
use crate::{
    auth::AuthUser,
    entities::call,
    errors::ServiceError,
    handlers::AppState,
    services::calls::{CallChanges, NewCall},
};
use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use tracing::info;
use uuid::Uuid;

/// Log a call against a site
#[utoipa::path(
    post,
    path = "/api/calls",
    request_body = NewCall,
    responses(
        (status = 201, description = "Call logged with the next call number", body = call::Model),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Site not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "calls"
)]
pub async fn create_call(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<NewCall>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;
    let call = state
        .services
        .calls
        .create_call(payload, &user.user_id)
        .await?;
    info!(call_number = %call.call_number, logged_by = %user.user_id, "Call logged");
    Ok(created_response(call))
}

#[utoipa::path(
    get,
    path = "/api/calls",
    responses((status = 200, description = "Calls by creation time", body = [call::Model])),
    security(("bearer_auth" = [])),
    tag = "calls"
)]
pub async fn list_calls(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(success_response(state.services.calls.list_calls().await?))
}

#[utoipa::path(
    get,
    path = "/api/calls/{id}",
    params(("id" = Uuid, Path, description = "Call ID")),
    responses(
        (status = 200, description = "Call found", body = call::Model),
        (status = 404, description = "Call not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "calls"
)]
pub async fn get_call(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(success_response(state.services.calls.get_call(id).await?))
}

#[utoipa::path(
    get,
    path = "/api/calls/by-number/{number}",
    params(("number" = String, Path, description = "Call number, e.g. 000042")),
    responses(
        (status = 200, description = "Call found", body = call::Model),
        (status = 404, description = "Call not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "calls"
)]
pub async fn get_call_by_number(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(number): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(success_response(
        state.services.calls.get_call_by_number(&number).await?,
    ))
}

#[utoipa::path(
    put,
    path = "/api/calls/{id}",
    request_body = CallChanges,
    params(("id" = Uuid, Path, description = "Call ID")),
    responses(
        (status = 200, description = "Call updated", body = call::Model),
        (status = 400, description = "Waiting without a reason", body = crate::errors::ErrorResponse),
        (status = 404, description = "Call not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "calls"
)]
pub async fn update_call(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<CallChanges>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;
    Ok(success_response(
        state.services.calls.update_call(id, payload).await?,
    ))
}

/// Delete a call together with its diary entries
#[utoipa::path(
    delete,
    path = "/api/calls/{id}",
    params(("id" = Uuid, Path, description = "Call ID")),
    responses(
        (status = 204, description = "Call deleted"),
        (status = 404, description = "Call not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "calls"
)]
pub async fn delete_call(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.calls.delete_call(id).await?;
    Ok(no_content_response())
}

pub fn call_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_calls).post(create_call))
        .route("/by-number/:number", get(get_call_by_number))
        .route("/:id", get(get_call).put(update_call).delete(delete_call))
}
