//! Escrow Payment Engine
//!
//! The engine holds customer funds in escrow for supplemental billable work, releases them once
//! both parties have signed off on an order, and consolidates provider earnings into batched bank
//! payouts. It is the one place in the platform where order state, time-tracking state and
//! gateway-reported money movement have to stay consistent under partial failure.
//!
//! The library is divided into three main sections:
//! 1. Backend traits ([`mod@traits`]). The [`traits::EscrowLedger`] trait is the contract a
//!    storage backend must satisfy (SQLite is the provided implementation, see
//!    [`SqliteDatabase`]), and [`traits::PaymentGateway`] is the contract the engine requires from
//!    the external payment gateway. Gateway clients live in their own crate; the engine never
//!    talks to the network itself.
//! 2. The public API ([`mod@epe_api`]). [`CompletionApi`] tracks dual-party completion and
//!    triggers the immediate-transfer path, [`EscrowApi`] authorizes and releases escrow holds,
//!    and [`PayoutApi`] aggregates eligible orders into a single payout request.
//! 3. Events ([`mod@events`]). A small actor-style hook system that emits events (order
//!    completed, escrow released, payout requested) that notification subsystems can subscribe
//!    to.
pub mod db_types;
pub mod events;
pub mod helpers;

mod epe_api;
mod traits;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use epe_api::{
    completion_api::CompletionApi,
    errors::{ErrorKind, EscrowApiError, PartialBatchError},
    escrow_api::EscrowApi,
    objects,
    payout_api::PayoutApi,
};
pub use traits::{
    CaptureResult,
    EscrowLedger,
    EscrowLedgerError,
    GatewayError,
    GatewayErrorKind,
    GatewayHold,
    GatewayObjectStatus,
    HoldRequest,
    PaymentGateway,
    PayoutRequest,
    TransferRequest,
};
