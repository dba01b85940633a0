//! The authenticated identity for one request.

use serde::{Deserialize, Serialize};

use super::{Role, UserId};

/// Identity and role decoded from a verified credential.
///
/// Built fresh for every request and never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// The user the credential was issued to.
    pub id: UserId,
    /// The role the credential grants.
    pub role: Role,
}

impl Principal {
    /// Whether this principal holds `role`.
    #[must_use]
    pub fn has_role(&self, role: Role) -> bool {
        self.role == role
    }
}
