//! HTTP middleware and extractors for admin.
//!
//! # Layer Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. `TraceLayer` (request span with status and latency)
//!
//! Authentication is not a layer: handlers take `RequireAdmin` or
//! `RequireCustomer`, which reject before the handler body runs.

pub mod auth;

pub use auth::{RequireAdmin, RequireCustomer};
