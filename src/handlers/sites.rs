use super::common::{created_response, no_content_response, success_response, validate_input};
use crate::{
    auth::AuthUser,
    entities::site,
    errors::ServiceError,
    handlers::AppState,
    services::sites::{NewSite, SiteChanges},
};
use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use uuid::Uuid;

#[utoipa::path(
    post,
    path = "/api/sites",
    request_body = NewSite,
    responses(
        (status = 201, description = "Site created with the next SITE code", body = site::Model),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "sites"
)]
pub async fn create_site(
    State(state): State<AppState>,
    _user: AuthUser,
    Json(payload): Json<NewSite>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;
    Ok(created_response(state.services.sites.create_site(payload).await?))
}

#[utoipa::path(
    get,
    path = "/api/sites",
    responses((status = 200, description = "Sites by creation time", body = [site::Model])),
    security(("bearer_auth" = [])),
    tag = "sites"
)]
pub async fn list_sites(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(success_response(state.services.sites.list_sites().await?))
}

#[utoipa::path(
    get,
    path = "/api/sites/{id}",
    params(("id" = Uuid, Path, description = "Site ID")),
    responses(
        (status = 200, description = "Site found", body = site::Model),
        (status = 404, description = "Site not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "sites"
)]
pub async fn get_site(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(success_response(state.services.sites.get_site(id).await?))
}

#[utoipa::path(
    put,
    path = "/api/sites/{id}",
    request_body = SiteChanges,
    params(("id" = Uuid, Path, description = "Site ID")),
    responses(
        (status = 200, description = "Site updated", body = site::Model),
        (status = 404, description = "Site not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "sites"
)]
pub async fn update_site(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<SiteChanges>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;
    Ok(success_response(
        state.services.sites.update_site(id, payload).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/api/sites/{id}",
    params(("id" = Uuid, Path, description = "Site ID")),
    responses(
        (status = 204, description = "Site deleted"),
        (status = 404, description = "Site not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Site still has calls", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "sites"
)]
pub async fn delete_site(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.sites.delete_site(id).await?;
    Ok(no_content_response())
}

pub fn site_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_sites).post(create_site))
        .route("/:id", get(get_site).put(update_site).delete(delete_site))
}
