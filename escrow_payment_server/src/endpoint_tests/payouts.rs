use actix_web::{http::StatusCode, test::TestRequest};
use escrow_payment_engine::{
    db_types::OrderStatusType,
    test_utils::seed::{seed_order, with_status},
    GatewayError,
};
use serde_json::json;

use super::helpers::{send_request, test_context};

#[actix_web::test]
async fn request_payout_covers_all_eligible_orders() {
    let (db, gateway) = test_context().await;
    for (oid, total, fee) in [("ord-1", 5500, 500), ("ord-2", 12_600, 600), ("ord-3", 8000, 700)] {
        let order = seed_order(&db, oid, "prov-1", total, Some(fee)).await;
        with_status(&db, &order.order_id, OrderStatusType::Completed).await;
    }

    let req = TestRequest::post().uri("/payout/request").set_json(json!({ "provider_id": "prov-1" }));
    let (status, body) = send_request(&db, &gateway, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["amount"], json!(24_300));
    assert_eq!(body["order_count"], json!(3));
    assert!(body["payout_id"].as_str().is_some());
}

#[actix_web::test]
async fn request_payout_with_nothing_available_is_rejected() {
    let (db, gateway) = test_context().await;
    let req = TestRequest::post().uri("/payout/request").set_json(json!({ "provider_id": "prov-1" }));
    let (status, body) = send_request(&db, &gateway, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["code"], json!("invalid_request"));
}

#[actix_web::test]
async fn available_payout_lists_orders_without_consuming_them() {
    let (db, gateway) = test_context().await;
    let order = seed_order(&db, "ord-1", "prov-1", 5500, Some(500)).await;
    with_status(&db, &order.order_id, OrderStatusType::Completed).await;

    for _ in 0..2 {
        let req = TestRequest::get().uri("/payout/available/prov-1");
        let (status, body) = send_request(&db, &gateway, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], json!(5000));
        assert_eq!(body["orders"].as_array().unwrap().len(), 1);
    }
}

#[actix_web::test]
async fn transient_gateway_failures_are_service_unavailable() {
    let (db, gateway) = test_context().await;
    let order = seed_order(&db, "ord-1", "prov-1", 5500, Some(500)).await;
    with_status(&db, &order.order_id, OrderStatusType::Completed).await;
    gateway.fail_next_payout(GatewayError::transient("rate_limited", "Too many requests"));

    let req = TestRequest::post().uri("/payout/request").set_json(json!({ "provider_id": "prov-1" }));
    let (status, body) = send_request(&db, &gateway, req).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], json!("gateway_unavailable"));

    // the orders were not consumed; a retry succeeds
    let req = TestRequest::post().uri("/payout/request").set_json(json!({ "provider_id": "prov-1" }));
    let (status, body) = send_request(&db, &gateway, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["amount"], json!(5000));
}
