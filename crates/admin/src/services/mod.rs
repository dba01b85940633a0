//! Business logic services for admin.
//!
//! # Services
//!
//! - `auth` - Credential signing and verification
//! - `orders` - Order lifecycle (status changes, return requests)

pub mod auth;
pub mod orders;

pub use auth::{AuthError, Claims, CredentialVerifier};
pub use orders::{OrderError, OrderService};
