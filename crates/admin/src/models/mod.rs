//! Domain models served by the admin API.
//!
//! Core entities (orders, products, categories) come from `larder-core`; the
//! types here add the store-side views the handlers return.

pub mod order;
pub mod product;
pub mod user;

pub use order::{OrderDetail, OrderSummary};
pub use product::{ProductDetail, StoreProduct};
pub use user::{CustomerDetail, User};
