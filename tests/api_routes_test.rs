mod common;

use axum::http::{Method, StatusCode};
use common::{assert_status, future_date, response_json, token_for, TestApp};
use serde_json::json;

#[tokio::test]
async fn health_reports_database_status() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/health", None, None).await;
    assert_status(&response, StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["checks"]["database"], "healthy");
}

#[tokio::test]
async fn api_requires_a_valid_token() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/api/calls", None, None).await;
    assert_status(&response, StatusCode::UNAUTHORIZED);
    assert!(response.headers().contains_key("x-request-id"));
    let body = response_json(response).await;
    assert_eq!(body["error"], "Unauthorized");
    assert!(body["request_id"].is_string());

    let expired = token_for("dispatcher-1", -120);
    let response = app
        .request(Method::GET, "/api/status", None, Some(&expired))
        .await;
    assert_status(&response, StatusCode::UNAUTHORIZED);

    let response = app
        .request(Method::GET, "/api/status", None, Some("not-a-jwt"))
        .await;
    assert_status(&response, StatusCode::UNAUTHORIZED);

    let response = app
        .request_authenticated(Method::GET, "/api/status", None)
        .await;
    assert_status(&response, StatusCode::OK);
}

#[tokio::test]
async fn request_id_is_echoed_into_error_bodies() {
    let app = TestApp::new().await;

    let request = axum::http::Request::builder()
        .method(Method::GET)
        .uri(format!("/api/diary/entries/{}", uuid::Uuid::new_v4()))
        .header("authorization", format!("Bearer {}", app.token()))
        .header("x-request-id", "trace-abc")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = tower::ServiceExt::oneshot(app_router(&app), request)
        .await
        .unwrap();

    assert_status(&response, StatusCode::NOT_FOUND);
    assert_eq!(response.headers()["x-request-id"], "trace-abc");
    let body = response_json(response).await;
    assert_eq!(body["request_id"], "trace-abc");
}

fn app_router(app: &TestApp) -> axum::Router {
    let cors = firecrm_api::cors_layer(&app.state.config).expect("cors");
    firecrm_api::build_router(app.state.clone(), cors)
}

#[tokio::test]
async fn diary_entry_lifecycle_over_http() {
    let app = TestApp::new().await;
    let site = app.seed_site("Harbour Mall").await;
    let call = app.seed_call(site.id).await;
    let date = future_date(5);

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/diary/entries/planner-7",
            Some(json!({
                "call_number": call.call_number,
                "engineer_id": "eng-1",
                "date": date,
                "start_time": "09:00",
                "end_time": "10:30",
            })),
        )
        .await;
    assert_status(&response, StatusCode::CREATED);
    let created = response_json(response).await;
    assert_eq!(created["duration"], "1h 30m");
    assert_eq!(created["created_by"], "planner-7");
    assert_eq!(created["is_initial_assignment"], true);
    assert_eq!(created["site_name"], "Harbour Mall");
    let id = created["id"].as_str().unwrap().to_string();

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/diary/entries/planner-7",
            Some(json!({
                "call_number": call.call_number,
                "engineer_id": "eng-1",
                "date": date,
                "start_time": "10:00",
                "end_time": "11:00",
            })),
        )
        .await;
    assert_status(&response, StatusCode::BAD_REQUEST);

    let response = app
        .request_authenticated(
            Method::GET,
            &format!(
                "/api/diary/check-conflict?engineer=eng-1&date={}&start_time=10:00&end_time=11:00&exclude_id={}",
                date, id
            ),
            None,
        )
        .await;
    assert_status(&response, StatusCode::OK);
    assert_eq!(response_json(response).await["has_conflict"], false);

    let response = app
        .request_authenticated(
            Method::PUT,
            &format!("/api/diary/entries/{}", id),
            Some(json!({ "end_time": "12:00", "notes": "access via loading bay" })),
        )
        .await;
    assert_status(&response, StatusCode::OK);
    let updated = response_json(response).await;
    assert_eq!(updated["duration"], "3h 0m");
    assert_eq!(updated["updated_by"], "dispatcher-1");
    assert_eq!(updated["notes"], "access via loading bay");

    let response = app
        .request_authenticated(
            Method::PUT,
            &format!("/api/diary/entries/{}", id),
            Some(json!({ "notes": null })),
        )
        .await;
    assert_status(&response, StatusCode::OK);
    let cleared = response_json(response).await;
    assert!(cleared["notes"].is_null());
    assert_eq!(cleared["duration"], "3h 0m");

    let response = app
        .request_authenticated(
            Method::GET,
            &format!("/api/diary/entries?engineer=eng-1&date={}", date),
            None,
        )
        .await;
    assert_status(&response, StatusCode::OK);
    assert_eq!(response_json(response).await.as_array().unwrap().len(), 1);

    let response = app
        .request_authenticated(
            Method::GET,
            &format!("/api/diary/call-log/{}/assignments", call.call_number),
            None,
        )
        .await;
    assert_status(&response, StatusCode::OK);
    let assignments = response_json(response).await;
    assert_eq!(assignments[0]["id"], id.as_str());

    let response = app
        .request_authenticated(Method::DELETE, &format!("/api/diary/entries/{}", id), None)
        .await;
    assert_status(&response, StatusCode::NO_CONTENT);

    let response = app
        .request_authenticated(Method::GET, &format!("/api/diary/entries/{}", id), None)
        .await;
    assert_status(&response, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_diary_payload_is_rejected() {
    let app = TestApp::new().await;
    let site = app.seed_site("Harbour Mall").await;
    let call = app.seed_call(site.id).await;

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/diary/entries/planner-7",
            Some(json!({
                "call_number": call.call_number,
                "engineer_id": "eng-1",
                "date": future_date(1),
                "start_time": "9am",
                "end_time": "10:00",
            })),
        )
        .await;
    assert_status(&response, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn stock_documents_over_http() {
    let app = TestApp::new().await;
    let product = app.seed_product("DET-OPT", 10).await;

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/purchase-order",
            Some(json!({
                "supplier": "Sentinel Fire Supplies",
                "items": [{ "product_id": product.id, "quantity": 5, "unit_price": "12.50" }],
            })),
        )
        .await;
    assert_status(&response, StatusCode::CREATED);
    let po = response_json(response).await;
    assert!(po["po_number"].as_str().unwrap().starts_with("PO/"));
    assert_eq!(po["items"].as_array().unwrap().len(), 1);
    assert_eq!(app.on_hand(product.id).await, 15);

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/delivery-challans",
            Some(json!({
                "customer_id": "CUST-1",
                "items": [{ "product_id": product.id, "quantity": 20 }],
            })),
        )
        .await;
    assert_status(&response, StatusCode::BAD_REQUEST);
    assert_eq!(app.on_hand(product.id).await, 15);

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/delivery-challans",
            Some(json!({
                "customer_id": "CUST-1",
                "items": [{ "product_id": product.id, "quantity": 6 }],
            })),
        )
        .await;
    assert_status(&response, StatusCode::CREATED);
    let dc = response_json(response).await;
    assert_eq!(app.on_hand(product.id).await, 9);

    let response = app
        .request_authenticated(
            Method::GET,
            &format!("/api/products/{}/movements", product.id),
            None,
        )
        .await;
    assert_status(&response, StatusCode::OK);
    assert_eq!(response_json(response).await.as_array().unwrap().len(), 3);

    let response = app
        .request_authenticated(
            Method::DELETE,
            &format!("/api/delivery-challans/{}", dc["id"].as_str().unwrap()),
            None,
        )
        .await;
    assert_status(&response, StatusCode::NO_CONTENT);
    assert_eq!(app.on_hand(product.id).await, 15);

    let response = app
        .request_authenticated(
            Method::DELETE,
            &format!("/api/purchase-order/{}", po["id"].as_str().unwrap()),
            None,
        )
        .await;
    assert_status(&response, StatusCode::NO_CONTENT);
    assert_eq!(app.on_hand(product.id).await, 10);
}

#[tokio::test]
async fn uploads_store_the_body() {
    let app = TestApp::new().await;

    let response = app
        .request_raw(
            Method::POST,
            "/api/uploads?file_name=invoice.pdf",
            b"%PDF-1.4 test".to_vec(),
        )
        .await;
    assert_status(&response, StatusCode::CREATED);
    let body = response_json(response).await;
    assert_eq!(body["size"], 13);
    let path = body["path"].as_str().unwrap();
    assert!(path.ends_with("invoice.pdf"));

    let response = app
        .request_raw(Method::POST, "/api/uploads?file_name=empty.txt", Vec::new())
        .await;
    assert_status(&response, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn openapi_document_is_served() {
    let app = TestApp::new().await;

    let response = app
        .request(Method::GET, "/api-docs/openapi.json", None, None)
        .await;
    assert_status(&response, StatusCode::OK);
    let doc = response_json(response).await;
    assert!(doc["paths"]["/api/diary/check-conflict"].is_object());
}
