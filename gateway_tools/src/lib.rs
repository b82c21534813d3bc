//! A thin REST client for the payment gateway.
//!
//! The crate implements the engine's [`escrow_payment_engine::PaymentGateway`] contract over the
//! gateway's HTTP API: authorization-only holds, captures, transfers, payouts and object
//! retrieval. Gateway error codes and messages are preserved verbatim and classified into the
//! engine's declined / transient / unknown taxonomy, so callers can branch on retryability.
mod api;
mod config;
mod data_objects;
mod error;

pub use api::GatewayApi;
pub use config::GatewayConfig;
pub use data_objects::{ErrorBody, ErrorDetail, HoldResource, ObjectResource, PayoutResource, TransferResource};
pub use error::GatewayClientError;
