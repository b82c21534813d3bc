//! # Escrow payment server
//!
//! This crate hosts the HTTP surface of the escrow payment engine. It is responsible for:
//! * Accepting escrow authorization and release requests from the order flows.
//! * Accepting payout requests and availability queries from the provider dashboard.
//! * Accepting order completion sign-offs.
//!
//! ## Configuration
//! The server is configured via `EPE_*` environment variables. See [config](config/index.html)
//! for more information.
//!
//! ## Routes
//! * `/health`: a health check route that returns a 200 OK response.
//! * `POST /escrow/authorize`: authorize a hold over approved supplemental time entries.
//! * `POST /escrow/release`: capture outstanding holds after dual completion.
//! * `POST /payout/request`: consolidate a provider's payable orders into one payout.
//! * `GET /payout/available/{provider_id}`: list payable orders without mutating anything.
//! * `POST /order/{order_id}/complete`: customer sign-off with an immediate transfer.
//! * `POST /order/{order_id}/mark_complete`: record one party's completion confirmation.
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
