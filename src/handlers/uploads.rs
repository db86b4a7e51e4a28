use super::common::created_response;
use crate::{auth::AuthUser, errors::ServiceError, handlers::AppState};
use axum::{
    body::Bytes,
    extract::{Query, State},
    response::IntoResponse,
    routing::post,
    Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Deserialize, IntoParams)]
pub struct UploadQuery {
    /// Original file name; sanitised before it touches the disk
    pub file_name: String,
}

/// Handle to record as `attachment` on a purchase order or challan
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UploadResponse {
    pub path: String,
    pub size: usize,
}

/// Store a raw request body in the attachment store
#[utoipa::path(
    post,
    path = "/api/uploads",
    params(UploadQuery),
    request_body(content = Vec<u8>, content_type = "application/octet-stream"),
    responses(
        (status = 201, description = "File stored", body = UploadResponse),
        (status = 400, description = "Empty body or unusable file name", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "uploads"
)]
pub async fn upload_file(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<UploadQuery>,
    body: Bytes,
) -> Result<impl IntoResponse, ServiceError> {
    if body.is_empty() {
        return Err(ServiceError::BadRequest("upload body is empty".to_string()));
    }
    let path = state.files.save(&query.file_name, &body).await?;
    info!(path = %path, size = body.len(), uploaded_by = %user.user_id, "attachment stored");
    Ok(created_response(UploadResponse {
        path,
        size: body.len(),
    }))
}

pub fn upload_routes() -> Router<AppState> {
    Router::new().route("/", post(upload_file))
}
