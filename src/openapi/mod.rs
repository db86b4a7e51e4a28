use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "FireCRM API",
        version = "0.3.0",
        description = r#"
# FireCRM field-service API

Back office for fire and security engineering work: sites, logged calls,
engineer diary bookings, purchase orders, delivery challans and stock.

## Authentication

Every `/api` endpoint requires an HS256 bearer token:

```
Authorization: Bearer <your-jwt-token>
```

## Error Handling

Failures share one body shape:

```json
{
  "error": "Bad Request",
  "message": "Validation error: engineer eng-7 already has an entry from 09:00 to 10:00 on 2025-03-14",
  "request_id": "req-abc123xyz",
  "timestamp": "2025-03-10T10:30:00Z"
}
```
        "#
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "diary", description = "Engineer diary scheduling"),
        (name = "calls", description = "Call logging"),
        (name = "sites", description = "Customer sites"),
        (name = "products", description = "Product catalog and stock ledger"),
        (name = "purchase-orders", description = "Incoming stock"),
        (name = "delivery-challans", description = "Outgoing stock"),
        (name = "uploads", description = "Attachment storage")
    ),
    paths(
        // Diary
        crate::handlers::diary::create_entry,
        crate::handlers::diary::get_entry,
        crate::handlers::diary::update_entry,
        crate::handlers::diary::delete_entry,
        crate::handlers::diary::list_engineer_day,
        crate::handlers::diary::check_conflict,
        crate::handlers::diary::list_call_assignments,

        // Calls
        crate::handlers::calls::create_call,
        crate::handlers::calls::list_calls,
        crate::handlers::calls::get_call,
        crate::handlers::calls::get_call_by_number,
        crate::handlers::calls::update_call,
        crate::handlers::calls::delete_call,

        // Sites
        crate::handlers::sites::create_site,
        crate::handlers::sites::list_sites,
        crate::handlers::sites::get_site,
        crate::handlers::sites::update_site,
        crate::handlers::sites::delete_site,

        // Products
        crate::handlers::products::create_product,
        crate::handlers::products::list_products,
        crate::handlers::products::get_product,
        crate::handlers::products::update_product,
        crate::handlers::products::delete_product,
        crate::handlers::products::list_movements,

        // Stock documents
        crate::handlers::purchase_orders::create_purchase_order,
        crate::handlers::purchase_orders::list_purchase_orders,
        crate::handlers::purchase_orders::get_purchase_order,
        crate::handlers::purchase_orders::update_purchase_order,
        crate::handlers::purchase_orders::delete_purchase_order,
        crate::handlers::delivery_challans::create_delivery_challan,
        crate::handlers::delivery_challans::list_delivery_challans,
        crate::handlers::delivery_challans::get_delivery_challan,
        crate::handlers::delivery_challans::update_delivery_challan,
        crate::handlers::delivery_challans::delete_delivery_challan,

        // Uploads
        crate::handlers::uploads::upload_file
    ),
    components(
        schemas(
            crate::entities::diary_entry::DiaryStatus,
            crate::entities::stock_movement::StockReferenceType,
            crate::services::diary::NewDiaryEntry,
            crate::services::diary::DiaryEntryChanges,
            crate::services::diary::DiaryEntryView,
            crate::services::diary::ConflictReport,
            crate::services::purchase_orders::PurchaseOrderLine,
            crate::services::delivery_challans::ChallanLine,
            crate::handlers::uploads::UploadResponse,

            // Error types
            crate::errors::ErrorResponse
        )
    ),
    modifiers(&BearerAuth)
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_core_paths() {
        let openapi = ApiDoc::openapi();
        let json = serde_json::to_string_pretty(&openapi).unwrap();
        assert!(json.contains("FireCRM API"));
        assert!(json.contains("/api/diary/check-conflict"));
        assert!(json.contains("/api/delivery-challans/{id}"));
        assert!(json.contains("bearer_auth"));
    }
}
