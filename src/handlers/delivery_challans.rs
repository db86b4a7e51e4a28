use super::common::{created_response, no_content_response, success_response, validate_input};
use crate::{
    auth::AuthUser,
    entities::delivery_challan,
    errors::ServiceError,
    handlers::AppState,
    services::delivery_challans::{
        DeliveryChallanChanges, DeliveryChallanDetail, NewDeliveryChallan,
    },
};
use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use tracing::info;
use uuid::Uuid;

/// Create a delivery challan, taking its lines out of stock
#[utoipa::path(
    post,
    path = "/api/delivery-challans",
    request_body = NewDeliveryChallan,
    responses(
        (status = 201, description = "Challan created", body = DeliveryChallanDetail),
        (status = 400, description = "Invalid request or insufficient stock", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown product", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "delivery-challans"
)]
pub async fn create_delivery_challan(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<NewDeliveryChallan>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;
    let challan = state
        .services
        .delivery_challans
        .create_delivery_challan(payload, &user.user_id)
        .await?;
    info!(challan_number = %challan.challan.challan_number, "Delivery challan created");
    Ok(created_response(challan))
}

#[utoipa::path(
    get,
    path = "/api/delivery-challans",
    responses((status = 200, description = "Challans by creation time", body = [delivery_challan::Model])),
    security(("bearer_auth" = [])),
    tag = "delivery-challans"
)]
pub async fn list_delivery_challans(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Result<impl IntoResponse, ServiceError> {
    let challans = state
        .services
        .delivery_challans
        .list_delivery_challans()
        .await?;
    Ok(success_response(challans))
}

#[utoipa::path(
    get,
    path = "/api/delivery-challans/{id}",
    params(("id" = Uuid, Path, description = "Delivery challan ID")),
    responses(
        (status = 200, description = "Challan fetched", body = DeliveryChallanDetail),
        (status = 404, description = "Challan not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "delivery-challans"
)]
pub async fn get_delivery_challan(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let challan = state
        .services
        .delivery_challans
        .get_delivery_challan(id)
        .await?;
    Ok(success_response(challan))
}

/// Update a delivery challan; new lines are checked against stock after
/// the old lines are returned
#[utoipa::path(
    put,
    path = "/api/delivery-challans/{id}",
    request_body = DeliveryChallanChanges,
    params(("id" = Uuid, Path, description = "Delivery challan ID")),
    responses(
        (status = 200, description = "Challan updated", body = DeliveryChallanDetail),
        (status = 400, description = "Invalid request or insufficient stock", body = crate::errors::ErrorResponse),
        (status = 404, description = "Challan not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "delivery-challans"
)]
pub async fn update_delivery_challan(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<DeliveryChallanChanges>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;
    let challan = state
        .services
        .delivery_challans
        .update_delivery_challan(id, payload)
        .await?;
    Ok(success_response(challan))
}

/// Delete a delivery challan and return its lines to stock
#[utoipa::path(
    delete,
    path = "/api/delivery-challans/{id}",
    params(("id" = Uuid, Path, description = "Delivery challan ID")),
    responses(
        (status = 204, description = "Challan deleted"),
        (status = 404, description = "Challan not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "delivery-challans"
)]
pub async fn delete_delivery_challan(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state
        .services
        .delivery_challans
        .delete_delivery_challan(id)
        .await?;
    info!(challan_id = %id, deleted_by = %user.user_id, "Delivery challan deleted");
    Ok(no_content_response())
}

pub fn delivery_challan_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_delivery_challans).post(create_delivery_challan))
        .route(
            "/:id",
            get(get_delivery_challan)
                .put(update_delivery_challan)
                .delete(delete_delivery_challan),
        )
}
