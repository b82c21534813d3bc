use actix_web::{http::StatusCode, test::TestRequest};
use escrow_payment_engine::{
    db_types::OrderStatusType,
    test_utils::seed::{seed_order, with_status},
};
use serde_json::json;

use super::helpers::{send_request, test_context};

#[actix_web::test]
async fn health_check() {
    let (db, gateway) = test_context().await;
    let (status, _body) = send_request(&db, &gateway, TestRequest::get().uri("/health")).await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn completing_a_delivered_order_transfers_the_net() {
    let (db, gateway) = test_context().await;
    let order = seed_order(&db, "ord-1", "prov-1", 200_000, Some(9000)).await;
    with_status(&db, &order.order_id, OrderStatusType::Delivered).await;

    let req = TestRequest::post().uri("/order/ord-1/complete").set_json(json!({ "completed_by": "cust-1" }));
    let (status, body) = send_request(&db, &gateway, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["payout_status"], json!("Transferred"));
    assert!(body["transfer_id"].as_str().is_some());
    assert_eq!(gateway.transfers()[0].amount.value(), 191_000);
}

#[actix_web::test]
async fn completing_an_undelivered_order_names_the_actual_status() {
    let (db, gateway) = test_context().await;
    seed_order(&db, "ord-1", "prov-1", 200_000, Some(9000)).await;

    let req = TestRequest::post().uri("/order/ord-1/complete").set_json(json!({ "completed_by": "cust-1" }));
    let (status, body) = send_request(&db, &gateway, req).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], json!("state_conflict"));
    assert!(body["error"].as_str().unwrap().contains("New"));
}

#[actix_web::test]
async fn both_parties_marking_complete_sets_the_trigger_flag() {
    let (db, gateway) = test_context().await;
    seed_order(&db, "ord-1", "prov-1", 50_000, None).await;

    let req = TestRequest::post().uri("/order/ord-1/mark_complete").set_json(json!({ "party": "customer" }));
    let (status, body) = send_request(&db, &gateway, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["both_parties_complete"], json!(false));

    let req = TestRequest::post().uri("/order/ord-1/mark_complete").set_json(json!({ "party": "provider" }));
    let (status, body) = send_request(&db, &gateway, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["both_parties_complete"], json!(true));
}

#[actix_web::test]
async fn completing_an_unknown_order_is_not_found() {
    let (db, gateway) = test_context().await;
    let req = TestRequest::post().uri("/order/ord-missing/complete").set_json(json!({ "completed_by": "cust-1" }));
    let (status, body) = send_request(&db, &gateway, req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], json!("not_found"));
}
