use super::common::{created_response, no_content_response, success_response, validate_input};
use crate::{
    auth::AuthUser,
    entities::purchase_order,
    errors::ServiceError,
    handlers::AppState,
    services::purchase_orders::{NewPurchaseOrder, PurchaseOrderChanges, PurchaseOrderDetail},
};
use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use tracing::info;
use uuid::Uuid;

/// Create a purchase order and book its lines into stock
#[utoipa::path(
    post,
    path = "/api/purchase-order",
    request_body = NewPurchaseOrder,
    responses(
        (status = 201, description = "Purchase order created", body = PurchaseOrderDetail),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown product", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "purchase-orders"
)]
pub async fn create_purchase_order(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<NewPurchaseOrder>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;
    let order = state
        .services
        .purchase_orders
        .create_purchase_order(payload, &user.user_id)
        .await?;
    info!(po_number = %order.order.po_number, "Purchase order created");
    Ok(created_response(order))
}

/// List purchase orders
#[utoipa::path(
    get,
    path = "/api/purchase-order",
    responses((status = 200, description = "Purchase orders by creation time", body = [purchase_order::Model])),
    security(("bearer_auth" = [])),
    tag = "purchase-orders"
)]
pub async fn list_purchase_orders(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Result<impl IntoResponse, ServiceError> {
    let orders = state.services.purchase_orders.list_purchase_orders().await?;
    Ok(success_response(orders))
}

/// Get a purchase order with its lines
#[utoipa::path(
    get,
    path = "/api/purchase-order/{id}",
    params(("id" = Uuid, Path, description = "Purchase order ID")),
    responses(
        (status = 200, description = "Purchase order fetched", body = PurchaseOrderDetail),
        (status = 404, description = "Purchase order not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "purchase-orders"
)]
pub async fn get_purchase_order(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let order = state.services.purchase_orders.get_purchase_order(id).await?;
    Ok(success_response(order))
}

/// Update a purchase order; replacing the lines moves stock by the difference
#[utoipa::path(
    put,
    path = "/api/purchase-order/{id}",
    request_body = PurchaseOrderChanges,
    params(("id" = Uuid, Path, description = "Purchase order ID")),
    responses(
        (status = 200, description = "Purchase order updated", body = PurchaseOrderDetail),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Purchase order not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "purchase-orders"
)]
pub async fn update_purchase_order(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<PurchaseOrderChanges>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;
    let order = state
        .services
        .purchase_orders
        .update_purchase_order(id, payload)
        .await?;
    Ok(success_response(order))
}

/// Delete a purchase order and take its lines back out of stock
#[utoipa::path(
    delete,
    path = "/api/purchase-order/{id}",
    params(("id" = Uuid, Path, description = "Purchase order ID")),
    responses(
        (status = 204, description = "Purchase order deleted"),
        (status = 404, description = "Purchase order not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "purchase-orders"
)]
pub async fn delete_purchase_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state
        .services
        .purchase_orders
        .delete_purchase_order(id)
        .await?;
    info!(purchase_order_id = %id, deleted_by = %user.user_id, "Purchase order deleted");
    Ok(no_content_response())
}

/// Create purchase order routes
pub fn purchase_order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_purchase_orders).post(create_purchase_order))
        .route(
            "/:id",
            get(get_purchase_order)
                .put(update_purchase_order)
                .delete(delete_purchase_order),
        )
}
