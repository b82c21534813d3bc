use actix_web::{dev::Server, middleware::Logger, web, App, HttpServer};
use escrow_payment_engine::{
    events::EventProducers,
    helpers::FeeSchedule,
    CompletionApi,
    EscrowApi,
    PayoutApi,
    SqliteDatabase,
};
use gateway_tools::GatewayApi;
use log::info;

use crate::{
    config::ServerConfig,
    errors::ServerError,
    routes::{
        health,
        AuthorizeEscrowRoute,
        AvailablePayoutRoute,
        CompleteOrderRoute,
        MarkCompleteRoute,
        ReleaseEscrowRoute,
        RequestPayoutRoute,
    },
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    config.validate()?;
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let gateway = GatewayApi::new(config.gateway.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let srv = create_server_instance(config, db, gateway)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    gateway: GatewayApi,
) -> Result<Server, ServerError> {
    let fees = FeeSchedule::new(config.fee_basis_points);
    info!("💻️ Escrow authorizer running with a fee rate of {} basis points", fees.rate_basis_points());
    let srv = HttpServer::new(move || {
        let escrow_api = EscrowApi::new(db.clone(), gateway.clone(), fees, EventProducers::default());
        let completion_api = CompletionApi::new(db.clone(), gateway.clone(), EventProducers::default());
        let payout_api = PayoutApi::new(db.clone(), gateway.clone(), EventProducers::default());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("eps::access_log"))
            .app_data(web::Data::new(escrow_api))
            .app_data(web::Data::new(completion_api))
            .app_data(web::Data::new(payout_api))
            .route("/health", web::get().to(health))
            .service(AuthorizeEscrowRoute::<SqliteDatabase, GatewayApi>::new())
            .service(ReleaseEscrowRoute::<SqliteDatabase, GatewayApi>::new())
            .service(RequestPayoutRoute::<SqliteDatabase, GatewayApi>::new())
            .service(AvailablePayoutRoute::<SqliteDatabase, GatewayApi>::new())
            .service(CompleteOrderRoute::<SqliteDatabase, GatewayApi>::new())
            .service(MarkCompleteRoute::<SqliteDatabase, GatewayApi>::new())
    })
    .bind((config.host.clone(), config.port))?
    .run();
    Ok(srv)
}
