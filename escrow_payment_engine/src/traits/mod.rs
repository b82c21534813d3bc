//! Contracts the engine requires from its two external collaborators.
//!
//! * [`EscrowLedger`] is the storage backend contract. The ledger is the durable record of
//!   orders, time entries, escrow holds and payout batches. SQLite is the provided
//!   implementation ([`crate::SqliteDatabase`]); any backend offering atomic multi-record writes
//!   and conditional updates can implement it.
//! * [`PaymentGateway`] is the money-movement contract. The gateway authorizes and captures
//!   holds, transfers funds and pays out providers, and is the source of truth for whether money
//!   actually moved. Concrete clients live outside the engine (see the `gateway_tools` crate).
mod escrow_ledger;
mod payment_gateway;

pub use escrow_ledger::{EscrowLedger, EscrowLedgerError};
pub use payment_gateway::{
    CaptureResult,
    GatewayError,
    GatewayErrorKind,
    GatewayHold,
    GatewayObjectStatus,
    HoldRequest,
    PaymentGateway,
    PayoutRequest,
    TransferRequest,
};
