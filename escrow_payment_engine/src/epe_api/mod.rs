//! The engine's public API.
//!
//! Each API takes its backends explicitly (a ledger handle and a gateway client); there is no
//! process-wide singleton. Handlers construct them per request — they are cheap clones over a
//! connection pool.
pub mod completion_api;
pub mod errors;
pub mod escrow_api;
pub mod objects;
pub mod payout_api;
