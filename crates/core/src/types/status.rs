//! Status enums for the stored entities.
//!
//! Each enum maps to a `PostgreSQL` enum type (with the `postgres` feature) and
//! round-trips through its lowercase wire name via `Display` / `FromStr`, which
//! is also how list views accept them as filters.

use serde::{Deserialize, Serialize};

/// Error returned when a status string does not name a known variant.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {kind}: {value}")]
pub struct ParseStatusError {
    /// Which enum was being parsed.
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

macro_rules! wire_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $wire:literal),+ $(,)? }) => {
        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// The lowercase wire name.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $wire),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = ParseStatusError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($wire => Ok(Self::$variant),)+
                    _ => Err(ParseStatusError {
                        kind: $kind,
                        value: s.to_string(),
                    }),
                }
            }
        }
    };
}

/// Whole-order status.
///
/// See [`crate::order`] for the transitions between these values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "order_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Returned,
    Failed,
}

wire_enum!(OrderStatus, "order status", {
    Processing => "processing",
    Shipped => "shipped",
    Delivered => "delivered",
    Cancelled => "cancelled",
    Returned => "returned",
    Failed => "failed",
});

/// Category status. Inactive categories hide every member product from the
/// storefront.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "category_status", rename_all = "lowercase")
)]
pub enum CategoryStatus {
    #[default]
    Active,
    Inactive,
}

wire_enum!(CategoryStatus, "category status", {
    Active => "active",
    Inactive => "inactive",
});

/// Account role carried in credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "user_role", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Storefront shopper.
    Customer,
    /// Back-office operator.
    Admin,
}

wire_enum!(Role, "role", {
    Customer => "customer",
    Admin => "admin",
});

/// Derived account state used to filter the customer list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CustomerState {
    Active,
    Blocked,
}

wire_enum!(CustomerState, "customer state", {
    Active => "active",
    Blocked => "blocked",
});

impl CustomerState {
    /// State for a given `is_blocked` flag.
    #[must_use]
    pub const fn from_blocked(is_blocked: bool) -> Self {
        if is_blocked { Self::Blocked } else { Self::Active }
    }

    /// The `is_blocked` flag this state corresponds to.
    #[must_use]
    pub const fn is_blocked(self) -> bool {
        matches!(self, Self::Blocked)
    }
}

/// Derived listing state used to filter the admin product list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingState {
    Listed,
    Unlisted,
}

wire_enum!(ListingState, "listing state", {
    Listed => "listed",
    Unlisted => "unlisted",
});

impl ListingState {
    /// State for a given `un_listed` flag.
    #[must_use]
    pub const fn from_unlisted(un_listed: bool) -> Self {
        if un_listed { Self::Unlisted } else { Self::Listed }
    }

    /// The `un_listed` flag this state corresponds to.
    #[must_use]
    pub const fn is_unlisted(self) -> bool {
        matches!(self, Self::Unlisted)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_order_status_round_trips_through_wire_name() {
        for status in OrderStatus::ALL {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), *status);
        }
    }

    #[test]
    fn test_status_parse_is_exact() {
        assert!("Shipped".parse::<OrderStatus>().is_err());
        assert!("shipped ".parse::<OrderStatus>().is_err());
        let err = "owner".parse::<Role>().unwrap_err();
        assert_eq!(err.to_string(), "invalid role: owner");
    }

    #[test]
    fn test_category_status_serializes_capitalized() {
        assert_eq!(
            serde_json::to_string(&CategoryStatus::Inactive).unwrap(),
            "\"Inactive\""
        );
        assert_eq!(CategoryStatus::Inactive.to_string(), "inactive");
    }

    #[test]
    fn test_derived_states() {
        assert_eq!(CustomerState::from_blocked(true), CustomerState::Blocked);
        assert!(!CustomerState::Active.is_blocked());
        assert_eq!(ListingState::from_unlisted(false), ListingState::Listed);
        assert!(ListingState::Unlisted.is_unlisted());
    }
}
