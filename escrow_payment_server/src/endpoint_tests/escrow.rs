use actix_web::{http::StatusCode, test::TestRequest};
use escrow_payment_engine::{
    db_types::CompletingParty,
    test_utils::seed::{seed_approved_entry, seed_order},
    EscrowLedger,
    GatewayError,
};
use serde_json::json;

use super::helpers::{send_request, test_context};

#[actix_web::test]
async fn authorize_returns_the_fee_split() {
    let (db, gateway) = test_context().await;
    let order = seed_order(&db, "ord-1", "prov-1", 100_000, None).await;
    seed_approved_entry(&db, &order.order_id, "e1", 5000, 2.5).await;
    seed_approved_entry(&db, &order.order_id, "e2", 3000, 1.5).await;

    let req = TestRequest::post()
        .uri("/escrow/authorize")
        .set_json(json!({ "order_id": "ord-1", "entry_ids": ["e1", "e2"] }));
    let (status, body) = send_request(&db, &gateway, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["gross_amount"], json!(8000));
    assert_eq!(body["platform_fee"], json!(360));
    assert_eq!(body["provider_net"], json!(7640));
    assert!(body["hold_id"].as_str().is_some());
}

#[actix_web::test]
async fn authorize_with_a_garbled_body_is_a_bad_request() {
    let (db, gateway) = test_context().await;
    let req = TestRequest::post().uri("/escrow/authorize").set_json(json!({ "order_id": "ord-1" }));
    let (status, _body) = send_request(&db, &gateway, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn reauthorizing_is_a_conflict() {
    let (db, gateway) = test_context().await;
    let order = seed_order(&db, "ord-1", "prov-1", 100_000, None).await;
    seed_approved_entry(&db, &order.order_id, "e1", 5000, 2.0).await;
    seed_approved_entry(&db, &order.order_id, "e2", 3000, 1.0).await;

    let req = TestRequest::post().uri("/escrow/authorize").set_json(json!({ "order_id": "ord-1", "entry_ids": ["e1"] }));
    let (status, _) = send_request(&db, &gateway, req).await;
    assert_eq!(status, StatusCode::OK);

    let req = TestRequest::post()
        .uri("/escrow/authorize")
        .set_json(json!({ "order_id": "ord-1", "entry_ids": ["e1", "e2"] }));
    let (status, body) = send_request(&db, &gateway, req).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["code"], json!("state_conflict"));
}

#[actix_web::test]
async fn gateway_declines_are_payment_required_with_a_coarse_message() {
    let (db, gateway) = test_context().await;
    let order = seed_order(&db, "ord-1", "prov-1", 100_000, None).await;
    seed_approved_entry(&db, &order.order_id, "e1", 5000, 2.0).await;
    gateway.fail_next_authorize(GatewayError::declined("account_invalid", "No such destination account"));

    let req = TestRequest::post().uri("/escrow/authorize").set_json(json!({ "order_id": "ord-1", "entry_ids": ["e1"] }));
    let (status, body) = send_request(&db, &gateway, req).await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(body["code"], json!("gateway_declined"));
    // the gateway detail stays server-side; the user sees a coarse message
    let message = body["error"].as_str().unwrap();
    assert!(!message.contains("account_invalid"), "gateway code leaked to the user: {message}");
}

#[actix_web::test]
async fn release_enumerates_released_and_failed_holds() {
    let (db, gateway) = test_context().await;
    let order = seed_order(&db, "ord-1", "prov-1", 100_000, None).await;
    seed_approved_entry(&db, &order.order_id, "e1", 5000, 2.0).await;
    seed_approved_entry(&db, &order.order_id, "e2", 3000, 1.0).await;

    let req = TestRequest::post().uri("/escrow/authorize").set_json(json!({ "order_id": "ord-1", "entry_ids": ["e1"] }));
    let (_, h1) = send_request(&db, &gateway, req).await;
    let req = TestRequest::post().uri("/escrow/authorize").set_json(json!({ "order_id": "ord-1", "entry_ids": ["e2"] }));
    let (_, h2) = send_request(&db, &gateway, req).await;

    db.record_party_completion(&order.order_id, CompletingParty::Customer).await.unwrap();
    db.record_party_completion(&order.order_id, CompletingParty::Provider).await.unwrap();
    gateway.fail_capture(h2["hold_id"].as_str().unwrap(), GatewayError::declined("authorization_expired", "Expired"));

    let req = TestRequest::post()
        .uri("/escrow/release")
        .set_json(json!({ "order_id": "ord-1", "hold_ids": [h1["hold_id"], h2["hold_id"]] }));
    let (status, body) = send_request(&db, &gateway, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["released"].as_array().unwrap().len(), 1);
    assert_eq!(body["failed"].as_array().unwrap().len(), 1);
    assert_eq!(body["failed"][0]["hold_id"], h2["hold_id"]);
}

#[actix_web::test]
async fn release_before_dual_completion_is_a_conflict() {
    let (db, gateway) = test_context().await;
    let order = seed_order(&db, "ord-1", "prov-1", 100_000, None).await;
    seed_approved_entry(&db, &order.order_id, "e1", 5000, 2.0).await;
    let req = TestRequest::post().uri("/escrow/authorize").set_json(json!({ "order_id": "ord-1", "entry_ids": ["e1"] }));
    let (_, hold) = send_request(&db, &gateway, req).await;

    let req = TestRequest::post()
        .uri("/escrow/release")
        .set_json(json!({ "order_id": "ord-1", "hold_ids": [hold["hold_id"]] }));
    let (status, body) = send_request(&db, &gateway, req).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], json!("state_conflict"));
}
