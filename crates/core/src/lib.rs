//! Larder Core - domain types and rules.
//!
//! This crate provides the types and the pure business rules shared by all
//! Larder components:
//! - `admin` - Back-office HTTP service (customers, orders, catalog)
//! - `cli` - Command-line tools for migrations, seeding and credentials
//!
//! # Architecture
//!
//! The core crate contains only types and rules - no I/O, no database access,
//! no HTTP. Every rule here is a plain function over values, so the service
//! can run it before it writes anything.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, prices, emails, statuses and roles
//! - [`order`] - Order lifecycle state machine and the return-request sub-flow
//! - [`catalog`] - Products, variants, categories and customer visibility
//! - [`coupon`] - Coupon reference data and code resolution
//! - [`listing`] - Pagination, search and status-filter semantics for list views

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod catalog;
pub mod coupon;
pub mod listing;
pub mod order;
pub mod types;

pub use types::*;
