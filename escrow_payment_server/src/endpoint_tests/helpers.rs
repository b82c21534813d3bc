use actix_web::{http::StatusCode, test, test::TestRequest, web, App};
use escrow_payment_engine::{
    events::EventProducers,
    helpers::FeeSchedule,
    test_utils::{
        memory_gateway::MemoryGateway,
        prepare_env::{prepare_test_env, random_db_path},
    },
    CompletionApi,
    EscrowApi,
    PayoutApi,
    SqliteDatabase,
};

use crate::routes::{
    health,
    AuthorizeEscrowRoute,
    AvailablePayoutRoute,
    CompleteOrderRoute,
    MarkCompleteRoute,
    ReleaseEscrowRoute,
    RequestPayoutRoute,
};

pub async fn test_context() -> (SqliteDatabase, MemoryGateway) {
    let url = random_db_path();
    prepare_test_env(&url).await;
    let db = SqliteDatabase::new_with_url(&url, 1).await.expect("Error creating database");
    (db, MemoryGateway::new())
}

/// Runs one request through the full HTTP stack, backed by the SQLite ledger and the scripted
/// in-memory gateway, and returns the status plus the parsed JSON body.
pub async fn send_request(
    db: &SqliteDatabase,
    gateway: &MemoryGateway,
    req: TestRequest,
) -> (StatusCode, serde_json::Value) {
    let escrow_api = EscrowApi::new(db.clone(), gateway.clone(), FeeSchedule::new(450), EventProducers::default());
    let completion_api = CompletionApi::new(db.clone(), gateway.clone(), EventProducers::default());
    let payout_api = PayoutApi::new(db.clone(), gateway.clone(), EventProducers::default());
    let app = App::new()
        .app_data(web::Data::new(escrow_api))
        .app_data(web::Data::new(completion_api))
        .app_data(web::Data::new(payout_api))
        .route("/health", web::get().to(health))
        .service(AuthorizeEscrowRoute::<SqliteDatabase, MemoryGateway>::new())
        .service(ReleaseEscrowRoute::<SqliteDatabase, MemoryGateway>::new())
        .service(RequestPayoutRoute::<SqliteDatabase, MemoryGateway>::new())
        .service(AvailablePayoutRoute::<SqliteDatabase, MemoryGateway>::new())
        .service(CompleteOrderRoute::<SqliteDatabase, MemoryGateway>::new())
        .service(MarkCompleteRoute::<SqliteDatabase, MemoryGateway>::new());
    let service = test::init_service(app).await;
    let resp = test::call_service(&service, req.to_request()).await;
    let status = resp.status();
    let body = test::read_body(resp).await;
    let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}
