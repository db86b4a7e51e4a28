mod common;

use chrono::{Datelike, NaiveDate, Utc};
use common::{TestApp, TEST_USER};
use firecrm_api::services::{
    calls::NewCall,
    codes::{CodeGenerator, CodeScheme},
    sites::NewSite,
};
use sea_orm::TransactionTrait;
use std::{collections::HashSet, sync::Arc};
use uuid::Uuid;

fn site(name: &str) -> NewSite {
    NewSite {
        name: name.to_string(),
        customer_name: None,
        address: None,
    }
}

#[tokio::test]
async fn sites_are_numbered_in_creation_order() {
    let app = TestApp::new().await;

    let mut codes = Vec::new();
    for i in 0..3 {
        let created = app
            .state
            .services
            .sites
            .create_site(site(&format!("Block {}", i)))
            .await
            .unwrap();
        codes.push(created.code);
    }

    assert_eq!(codes, vec!["SITE-0001", "SITE-0002", "SITE-0003"]);
}

#[tokio::test]
async fn call_numbers_are_six_digits() {
    let app = TestApp::new().await;
    let site = app.seed_site("Depot").await;

    let first = app.seed_call(site.id).await;
    let second = app.seed_call(site.id).await;

    assert_eq!(first.call_number, "000001");
    assert_eq!(second.call_number, "000002");
}

#[tokio::test]
async fn failed_call_does_not_burn_a_number() {
    let app = TestApp::new().await;
    let calls = &app.state.services.calls;

    let orphan = NewCall {
        site_id: Uuid::new_v4(),
        system_id: None,
        call_type: None,
        reason: None,
        engineer_id: None,
        deadline: None,
        next_action: None,
        waiting: false,
        waiting_reason: None,
        status: None,
    };
    assert!(calls.create_call(orphan, TEST_USER).await.is_err());

    let site = app.seed_site("Depot").await;
    assert_eq!(app.seed_call(site.id).await.call_number, "000001");
}

#[tokio::test]
async fn peek_does_not_consume() {
    let app = TestApp::new().await;
    let db = app.state.db.as_ref();

    assert_eq!(
        CodeGenerator::peek(db, CodeScheme::Site).await.unwrap(),
        "SITE-0001"
    );
    assert_eq!(
        CodeGenerator::peek(db, CodeScheme::Site).await.unwrap(),
        "SITE-0001"
    );

    app.seed_site("Warehouse").await;
    assert_eq!(
        CodeGenerator::peek(db, CodeScheme::Site).await.unwrap(),
        "SITE-0002"
    );
}

#[tokio::test]
async fn rolled_back_allocation_is_reissued() {
    let app = TestApp::new().await;
    let scheme = CodeScheme::PurchaseOrder(2025);

    let txn = app.state.db.begin().await.unwrap();
    assert_eq!(CodeGenerator::next(&txn, scheme).await.unwrap(), "PO/2025/01");
    txn.rollback().await.unwrap();

    let txn = app.state.db.begin().await.unwrap();
    assert_eq!(CodeGenerator::next(&txn, scheme).await.unwrap(), "PO/2025/01");
    assert_eq!(CodeGenerator::next(&txn, scheme).await.unwrap(), "PO/2025/02");
    txn.commit().await.unwrap();
}

#[tokio::test]
async fn counters_are_scoped_per_scheme_and_period() {
    let app = TestApp::new().await;
    let day = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();

    let txn = app.state.db.begin().await.unwrap();
    let issued = vec![
        CodeGenerator::next(&txn, CodeScheme::PurchaseOrder(2024)).await.unwrap(),
        CodeGenerator::next(&txn, CodeScheme::PurchaseOrder(2025)).await.unwrap(),
        CodeGenerator::next(&txn, CodeScheme::DeliveryChallan(2025)).await.unwrap(),
        CodeGenerator::next(&txn, CodeScheme::Quotation(day)).await.unwrap(),
        CodeGenerator::next(&txn, CodeScheme::Quotation(day)).await.unwrap(),
    ];
    txn.commit().await.unwrap();

    assert_eq!(
        issued,
        vec![
            "PO/2024/01",
            "PO/2025/01",
            "DC/2025/01",
            "QTN-20250314-0001",
            "QTN-20250314-0002",
        ]
    );
}

#[tokio::test]
async fn purchase_orders_use_the_current_year() {
    let app = TestApp::new().await;
    let product = app.seed_product("SPR-68", 0).await;

    let created = app
        .state
        .services
        .purchase_orders
        .create_purchase_order(
            firecrm_api::services::purchase_orders::NewPurchaseOrder {
                supplier: "Sprinkler Co".to_string(),
                ordered_date: None,
                notes: None,
                attachment: None,
                items: vec![firecrm_api::services::purchase_orders::PurchaseOrderLine {
                    product_id: product.id,
                    quantity: 1,
                    unit_price: rust_decimal::Decimal::ONE,
                }],
            },
            TEST_USER,
        )
        .await
        .unwrap();

    assert_eq!(
        created.order.po_number,
        format!("PO/{}/01", Utc::now().year())
    );
}

#[tokio::test]
async fn concurrent_sites_get_distinct_codes() {
    let app = TestApp::new().await;
    let sites = Arc::clone(&app.state.services.sites);

    let mut handles = Vec::new();
    for i in 0..10 {
        let sites = Arc::clone(&sites);
        handles.push(tokio::spawn(async move {
            sites.create_site(site(&format!("Tower {}", i))).await
        }));
    }

    let mut codes = HashSet::new();
    for handle in handles {
        let created = handle.await.unwrap().expect("site created");
        codes.insert(created.code);
    }

    let expected: HashSet<String> = (1..=10).map(|n| format!("SITE-{:04}", n)).collect();
    assert_eq!(codes, expected);
}
