use epe_common::MinorUnits;
use escrow_payment_engine::{
    db_types::{CompletingParty, OrderStatusType, PayoutStatus},
    events::EventProducers,
    test_utils::{
        memory_gateway::MemoryGateway,
        prepare_env::{prepare_test_env, random_db_path},
        seed::{seed_order, with_status},
    },
    CompletionApi,
    ErrorKind,
    EscrowLedger,
    GatewayError,
    SqliteDatabase,
};

async fn setup() -> (SqliteDatabase, MemoryGateway, CompletionApi<SqliteDatabase, MemoryGateway>) {
    let url = random_db_path();
    prepare_test_env(&url).await;
    let db = SqliteDatabase::new_with_url(&url, 1).await.expect("Error creating database");
    let gateway = MemoryGateway::new();
    let api = CompletionApi::new(db.clone(), gateway.clone(), EventProducers::default());
    (db, gateway, api)
}

#[tokio::test]
async fn completion_state_merges_one_party_at_a_time() {
    let (db, _gateway, api) = setup().await;
    let order = seed_order(&db, "ord-1", "prov-1", 50_000, None).await;

    let state = api.record_party_completion(&order.order_id, CompletingParty::Customer).await.unwrap();
    assert!(state.customer_marked_complete);
    assert!(!state.provider_marked_complete);
    assert!(!state.both_parties_complete);

    // marking the same party again is a pure merge, not an error
    let state = api.record_party_completion(&order.order_id, CompletingParty::Customer).await.unwrap();
    assert!(!state.both_parties_complete);

    let state = api.record_party_completion(&order.order_id, CompletingParty::Provider).await.unwrap();
    assert!(state.both_parties_complete);
}

#[tokio::test]
async fn complete_order_transfers_the_net_amount() {
    let (db, gateway, api) = setup().await;
    let order = seed_order(&db, "ord-1", "prov-1", 200_000, Some(9000)).await;
    with_status(&db, &order.order_id, OrderStatusType::Delivered).await;

    let result = api.complete_order(&order.order_id, "cust-1").await.unwrap();
    assert!(result.transfer_id.is_some());
    assert_eq!(result.payout_status, PayoutStatus::Transferred);

    let transfers = gateway.transfers();
    assert_eq!(transfers.len(), 1);
    assert_eq!(transfers[0].amount, MinorUnits::from(191_000));
    assert_eq!(transfers[0].destination_account, "acct_test_1");

    let order = db.fetch_order(&order.order_id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatusType::Completed);
    assert_eq!(order.payout_status, PayoutStatus::Transferred);
    assert_eq!(order.transfer_id, result.transfer_id);
}

#[tokio::test]
async fn complete_order_falls_back_to_the_legacy_fee_field() {
    let (db, gateway, api) = setup().await;
    let order = seed_order(&db, "ord-1", "prov-1", 80_000, None).await;
    sqlx::query("UPDATE orders SET service_fee = 4000 WHERE order_id = 'ord-1'")
        .execute(db.pool())
        .await
        .unwrap();
    with_status(&db, &order.order_id, OrderStatusType::Delivered).await;

    api.complete_order(&order.order_id, "cust-1").await.unwrap();
    assert_eq!(gateway.transfers()[0].amount, MinorUnits::from(76_000));
}

#[tokio::test]
async fn complete_order_rejects_wrong_status_naming_it() {
    let (db, gateway, api) = setup().await;
    let order = seed_order(&db, "ord-1", "prov-1", 50_000, None).await;

    let err = api.complete_order(&order.order_id, "cust-1").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StateConflict);
    assert!(err.to_string().contains("New"), "the actual status must be named: {err}");
    assert_eq!(gateway.call_count(), 0);
}

#[tokio::test]
async fn complete_order_rejects_the_wrong_customer() {
    let (db, _gateway, api) = setup().await;
    let order = seed_order(&db, "ord-1", "prov-1", 50_000, None).await;
    with_status(&db, &order.order_id, OrderStatusType::Delivered).await;

    let err = api.complete_order(&order.order_id, "someone-else").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn transfer_failure_does_not_abort_completion() {
    let (db, gateway, api) = setup().await;
    let order = seed_order(&db, "ord-1", "prov-1", 50_000, Some(2000)).await;
    with_status(&db, &order.order_id, OrderStatusType::Delivered).await;

    gateway.fail_next_transfer(GatewayError::transient("rate_limited", "Too many requests"));
    let result = api.complete_order(&order.order_id, "cust-1").await.unwrap();
    assert!(result.transfer_id.is_none());
    assert_eq!(result.payout_status, PayoutStatus::Pending);
    assert_eq!(gateway.transfers().len(), 0);

    // the sign-off stands; only the money movement is deferred
    let order = db.fetch_order(&order.order_id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatusType::Completed);
    assert_eq!(order.payout_status, PayoutStatus::Pending);
    assert!(order.transfer_id.is_none());
}
