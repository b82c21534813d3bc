use epe_common::MinorUnits;
use escrow_payment_engine::{
    db_types::{CompletingParty, NewOrder, OrderId, OrderStatusType, PayoutStatus},
    events::EventProducers,
    helpers::FeeSchedule,
    test_utils::{
        memory_gateway::MemoryGateway,
        prepare_env::{prepare_test_env, random_db_path},
        seed::{seed_approved_entry, seed_order, with_status},
    },
    ErrorKind,
    EscrowApi,
    EscrowApiError,
    EscrowLedger,
    GatewayError,
    PayoutApi,
    SqliteDatabase,
};

async fn setup() -> (SqliteDatabase, MemoryGateway, PayoutApi<SqliteDatabase, MemoryGateway>) {
    let url = random_db_path();
    prepare_test_env(&url).await;
    let db = SqliteDatabase::new_with_url(&url, 1).await.expect("Error creating database");
    let gateway = MemoryGateway::new();
    let api = PayoutApi::new(db.clone(), gateway.clone(), EventProducers::default());
    (db, gateway, api)
}

/// Seeds a fully completed order whose earnings are available for payout.
async fn seed_payable_order(db: &SqliteDatabase, order_id: &str, provider: &str, total: i64, fee: i64) -> OrderId {
    let order = seed_order(db, order_id, provider, total, Some(fee)).await;
    with_status(db, &order.order_id, OrderStatusType::Completed).await;
    order.order_id
}

#[tokio::test]
async fn payout_covers_all_eligible_orders() {
    let (db, gateway, api) = setup().await;
    // net amounts 5000, 12000 and 7300
    let o1 = seed_payable_order(&db, "ord-1", "prov-1", 5500, 500).await;
    let o2 = seed_payable_order(&db, "ord-2", "prov-1", 12_600, 600).await;
    let o3 = seed_payable_order(&db, "ord-3", "prov-1", 8000, 700).await;

    let summary = api.request_payout("prov-1", None).await.expect("Error requesting payout");
    assert_eq!(summary.amount, MinorUnits::from(24_300));
    assert_eq!(summary.order_count, 3);
    assert!(summary.order_ids.contains(&o1) && summary.order_ids.contains(&o2) && summary.order_ids.contains(&o3));

    for oid in [&o1, &o2, &o3] {
        let order = db.fetch_order(oid).await.unwrap().unwrap();
        assert_eq!(order.payout_status, PayoutStatus::PayoutRequested);
        assert_eq!(order.payout_id.as_deref(), Some(summary.payout_id.as_str()));
    }
    let batches = db.payout_batches_for_provider("prov-1").await.unwrap();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].payout_id, summary.payout_id);
    assert_eq!(batches[0].total_amount, MinorUnits::from(24_300));
    assert_eq!(batches[0].order_ids.len(), 3);
    assert_eq!(gateway.payouts().len(), 1);
}

#[tokio::test]
async fn available_payout_is_a_pure_read() {
    let (db, _gateway, api) = setup().await;
    seed_payable_order(&db, "ord-1", "prov-1", 5500, 500).await;
    seed_payable_order(&db, "ord-2", "prov-1", 12_600, 600).await;

    let first = api.available_payout("prov-1").await.unwrap();
    let second = api.available_payout("prov-1").await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first.total, MinorUnits::from(17_000));
    assert_eq!(first.orders.len(), 2);

    // nothing was consumed
    let orders = db.payout_eligible_orders("prov-1").await.unwrap();
    assert_eq!(orders.len(), 2);
}

#[tokio::test]
async fn eligibility_excludes_other_statuses_and_providers() {
    let (db, _gateway, api) = setup().await;
    seed_payable_order(&db, "ord-1", "prov-1", 5500, 500).await;
    // wrong lifecycle status
    seed_order(&db, "ord-2", "prov-1", 9000, None).await;
    // already transferred via the direct path
    let o3 = seed_order(&db, "ord-3", "prov-1", 9000, None).await;
    with_status(&db, &o3.order_id, OrderStatusType::Completed).await;
    sqlx::query("UPDATE orders SET payout_status = 'Transferred' WHERE order_id = 'ord-3'")
        .execute(db.pool())
        .await
        .unwrap();
    // someone else's order
    seed_payable_order(&db, "ord-4", "prov-2", 7000, 0).await;

    let available = api.available_payout("prov-1").await.unwrap();
    assert_eq!(available.orders.len(), 1);
    assert_eq!(available.total, MinorUnits::from(5000));
}

#[tokio::test]
async fn requested_amount_is_a_soft_cap() {
    let (db, gateway, api) = setup().await;
    let o1 = seed_payable_order(&db, "ord-1", "prov-1", 5500, 500).await;
    let o2 = seed_payable_order(&db, "ord-2", "prov-1", 12_600, 600).await;

    let summary = api.request_payout("prov-1", Some(MinorUnits::from(10_000))).await.unwrap();
    assert_eq!(summary.amount, MinorUnits::from(10_000));
    // the cap reduces the amount, not the order set
    assert_eq!(summary.order_count, 2);
    for oid in [&o1, &o2] {
        let order = db.fetch_order(oid).await.unwrap().unwrap();
        assert_eq!(order.payout_status, PayoutStatus::PayoutRequested);
    }
    assert_eq!(gateway.payouts()[0].amount, MinorUnits::from(10_000));
}

#[tokio::test]
async fn requesting_more_than_available_pays_the_total() {
    let (db, _gateway, api) = setup().await;
    seed_payable_order(&db, "ord-1", "prov-1", 5500, 500).await;

    let summary = api.request_payout("prov-1", Some(MinorUnits::from(1_000_000))).await.unwrap();
    assert_eq!(summary.amount, MinorUnits::from(5000));
}

#[tokio::test]
async fn no_eligible_orders_is_a_domain_error() {
    let (_db, gateway, api) = setup().await;
    let err = api.request_payout("prov-1", None).await.unwrap_err();
    assert!(matches!(err, EscrowApiError::NoEligibleOrders(_)));
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(gateway.call_count(), 0);
}

#[tokio::test]
async fn missing_payout_account_is_rejected() {
    let (db, gateway, api) = setup().await;
    let order = NewOrder::new("ord-1", "cust-1", "prov-1", MinorUnits::from(9000));
    db.insert_order(order).await.unwrap();
    with_status(&db, &OrderId::from("ord-1"), OrderStatusType::Completed).await;

    let err = api.request_payout("prov-1", None).await.unwrap_err();
    assert!(matches!(err, EscrowApiError::NoPayoutAccount(_)));
    assert_eq!(gateway.call_count(), 0);
}

#[tokio::test]
async fn a_successful_payout_consumes_eligibility() {
    let (db, _gateway, api) = setup().await;
    seed_payable_order(&db, "ord-1", "prov-1", 5500, 500).await;

    api.request_payout("prov-1", None).await.unwrap();
    let err = api.request_payout("prov-1", None).await.unwrap_err();
    assert!(matches!(err, EscrowApiError::NoEligibleOrders(_)));
    assert_eq!(db.payout_batches_for_provider("prov-1").await.unwrap().len(), 1);
}

#[tokio::test]
async fn gateway_failure_leaves_orders_available() {
    let (db, gateway, api) = setup().await;
    let o1 = seed_payable_order(&db, "ord-1", "prov-1", 5500, 500).await;

    gateway.fail_next_payout(GatewayError::transient("rate_limited", "Too many requests"));
    let err = api.request_payout("prov-1", None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::GatewayTransient);
    assert!(err.is_retryable());

    let order = db.fetch_order(&o1).await.unwrap().unwrap();
    assert_eq!(order.payout_status, PayoutStatus::AvailableForPayout);
    assert!(db.payout_batches_for_provider("prov-1").await.unwrap().is_empty());
}

#[tokio::test]
async fn consumed_orders_conflict_and_roll_back_the_batch() {
    let (db, _gateway, _api) = setup().await;
    let o1 = seed_payable_order(&db, "ord-1", "prov-1", 5500, 500).await;
    let o2 = seed_payable_order(&db, "ord-2", "prov-1", 12_600, 600).await;

    // another payout already consumed o2
    db.mark_orders_payout_requested(&[o2.clone()], "po_other").await.unwrap();

    let err = db.mark_orders_payout_requested(&[o1.clone(), o2.clone()], "po_mine").await.unwrap_err();
    assert!(err.to_string().contains("PayoutRequested"), "conflict must name the actual state: {err}");

    // the whole batch rolled back; o1 is still available for the next attempt
    let order = db.fetch_order(&o1).await.unwrap().unwrap();
    assert_eq!(order.payout_status, PayoutStatus::AvailableForPayout);
    assert!(order.payout_id.is_none());
}

#[tokio::test]
async fn released_escrow_earnings_join_the_payout() {
    let (db, _gateway, api) = setup().await;
    let order = seed_order(&db, "ord-1", "prov-1", 5500, Some(500)).await;
    let escrow = EscrowApi::new(db.clone(), MemoryGateway::new(), FeeSchedule::new(450), EventProducers::default());
    let e1 = seed_approved_entry(&db, &order.order_id, "e1", 8000, 4.0).await;
    let hold = escrow.authorize_additional_hours(&order.order_id, &[e1.entry_id.clone()], None).await.unwrap();
    db.record_party_completion(&order.order_id, CompletingParty::Customer).await.unwrap();
    db.record_party_completion(&order.order_id, CompletingParty::Provider).await.unwrap();
    escrow.release_escrow_funds(&order.order_id, &[hold.hold_id.clone()]).await.unwrap();

    // base net 5000 plus the released 7640 supplemental
    let available = api.available_payout("prov-1").await.unwrap();
    assert_eq!(available.total, MinorUnits::from(12_640));
    let summary = api.request_payout("prov-1", None).await.unwrap();
    assert_eq!(summary.amount, MinorUnits::from(12_640));
}
