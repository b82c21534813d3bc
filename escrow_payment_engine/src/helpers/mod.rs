//! Small, pure helpers used across the engine: the platform fee split and deterministic
//! idempotency keys for gateway calls.
mod fees;
mod idempotency;

pub use fees::{FeeBreakdown, FeeSchedule};
pub use idempotency::{hold_idempotency_key, payout_idempotency_key};
