//! Larder admin library.
//!
//! The back-office API for the Larder storefront as a library, so the router
//! can be driven in-process by tests and the CLI can reuse the store layer.
//!
//! # Security
//!
//! Every `/api` route requires a signed credential. Administrator routes
//! require the `admin` role; storefront routes require `customer`.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
