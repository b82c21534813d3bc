//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module
//! neat and tidy 🙏
//!
//! Handlers are generic over the ledger backend and the gateway client so that the endpoint
//! tests can run the full HTTP stack against the SQLite backend and a scripted in-memory
//! gateway. Actix cannot register generic handlers directly, so registration goes through the
//! `route!` macro.
use actix_web::{web, HttpResponse, Responder};
use escrow_payment_engine::{
    db_types::OrderId,
    CompletionApi,
    EscrowApi,
    EscrowLedger,
    PaymentGateway,
    PayoutApi,
};
use log::*;

use crate::{
    data_objects::{
        AuthorizeEscrowRequest,
        CompleteOrderParams,
        MarkCompleteParams,
        PayoutRequestParams,
        ReleaseEscrowRequest,
        SuccessResponse,
    },
    errors::ServerError,
};

// Actix cannot handle generics in handlers, so registration is implemented manually using the
// `route!` macro.
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! {
            impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
                #[allow(clippy::new_without_default)]
                pub fn new() -> Self {
                    Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
                }
            }
        }
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

route!(authorize_escrow => Post "/escrow/authorize" impl EscrowLedger, PaymentGateway);
/// Route handler for escrow authorization.
///
/// Computes the billable total over the referenced customer-approved entries and requests an
/// authorization-only hold from the gateway. Safe to retry: repeated requests with the same
/// entry set (or the same explicit idempotency key) return the original hold.
pub async fn authorize_escrow<B: EscrowLedger, G: PaymentGateway>(
    api: web::Data<EscrowApi<B, G>>,
    body: web::Json<AuthorizeEscrowRequest>,
) -> Result<HttpResponse, ServerError> {
    let params = body.into_inner();
    debug!("💻️ POST /escrow/authorize for order [{}] covering {} entries", params.order_id, params.entry_ids.len());
    let hold = api.authorize_additional_hours(&params.order_id, &params.entry_ids, params.idempotency_key).await?;
    Ok(HttpResponse::Ok().json(SuccessResponse::new(hold)))
}

route!(release_escrow => Post "/escrow/release" impl EscrowLedger, PaymentGateway);
/// Route handler for escrow release.
///
/// Requires both parties to have signed off. Holds are captured independently; the response
/// enumerates exactly which holds were released and which failed, so partial failures are never
/// silent.
pub async fn release_escrow<B: EscrowLedger, G: PaymentGateway>(
    api: web::Data<EscrowApi<B, G>>,
    body: web::Json<ReleaseEscrowRequest>,
) -> Result<HttpResponse, ServerError> {
    let params = body.into_inner();
    debug!("💻️ POST /escrow/release for order [{}] covering {} holds", params.order_id, params.hold_ids.len());
    let result = api.release_escrow_funds(&params.order_id, &params.hold_ids).await?;
    Ok(HttpResponse::Ok().json(SuccessResponse::new(result)))
}

route!(request_payout => Post "/payout/request" impl EscrowLedger, PaymentGateway);
/// Route handler for payout requests.
///
/// Consolidates every payout-eligible order of the provider into a single gateway payout. The
/// optional `amount` is a soft cap; it never excludes orders from the batch.
pub async fn request_payout<B: EscrowLedger, G: PaymentGateway>(
    api: web::Data<PayoutApi<B, G>>,
    body: web::Json<PayoutRequestParams>,
) -> Result<HttpResponse, ServerError> {
    let params = body.into_inner();
    debug!("💻️ POST /payout/request for provider [{}]", params.provider_id);
    let summary = api.request_payout(&params.provider_id, params.amount).await?;
    Ok(HttpResponse::Ok().json(SuccessResponse::new(summary)))
}

route!(available_payout => Get "/payout/available/{provider_id}" impl EscrowLedger, PaymentGateway);
/// Route handler for the payout availability query. Pure read; mutates nothing.
pub async fn available_payout<B: EscrowLedger, G: PaymentGateway>(
    api: web::Data<PayoutApi<B, G>>,
    path: web::Path<String>,
) -> Result<HttpResponse, ServerError> {
    let provider_id = path.into_inner();
    debug!("💻️ GET /payout/available for provider [{provider_id}]");
    let available = api.available_payout(&provider_id).await?;
    Ok(HttpResponse::Ok().json(SuccessResponse::new(available)))
}

route!(complete_order => Post "/order/{order_id}/complete" impl EscrowLedger, PaymentGateway);
/// Route handler for customer order completion.
///
/// The completion always stands; the immediate transfer of the net amount is best-effort and is
/// reflected in the returned payout status.
pub async fn complete_order<B: EscrowLedger, G: PaymentGateway>(
    api: web::Data<CompletionApi<B, G>>,
    path: web::Path<OrderId>,
    body: web::Json<CompleteOrderParams>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    let params = body.into_inner();
    debug!("💻️ POST /order/{order_id}/complete by [{}]", params.completed_by);
    let result = api.complete_order(&order_id, &params.completed_by).await?;
    Ok(HttpResponse::Ok().json(SuccessResponse::new(result)))
}

route!(mark_complete => Post "/order/{order_id}/mark_complete" impl EscrowLedger, PaymentGateway);
/// Route handler for the dual-confirmation tracker. Records one party's sign-off and returns the
/// merged completion state.
pub async fn mark_complete<B: EscrowLedger, G: PaymentGateway>(
    api: web::Data<CompletionApi<B, G>>,
    path: web::Path<OrderId>,
    body: web::Json<MarkCompleteParams>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    let params = body.into_inner();
    debug!("💻️ POST /order/{order_id}/mark_complete by {}", params.party);
    let state = api.record_party_completion(&order_id, params.party).await?;
    Ok(HttpResponse::Ok().json(SuccessResponse::new(state)))
}
