//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use larder_core::{CustomerState, Email, Role, UserId};

/// A registered account (domain type).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: Email,
    pub phone: Option<String>,
    pub role: Role,
    /// Blocked accounts fail authentication on their next request.
    pub is_blocked: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// `active` or `blocked`, as filtered on in the customer listing.
    #[must_use]
    pub const fn state(&self) -> CustomerState {
        CustomerState::from_blocked(self.is_blocked)
    }
}

/// Customer detail view.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDetail {
    #[serde(flatten)]
    pub user: User,
    pub status: CustomerState,
    pub order_count: i64,
}
