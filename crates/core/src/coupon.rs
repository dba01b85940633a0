//! Coupon reference data.
//!
//! Coupons are static: the set below is the whole catalog. Resolution is an
//! exact, case-sensitive match on the code and returns only the effect;
//! applying it to a cart is the caller's business.

use serde::Serialize;

use crate::listing::{NoStatus, Searchable};

/// Errors raised by coupon resolution.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CouponError {
    /// No coupon has this code.
    #[error("unknown coupon code: {0}")]
    UnknownCoupon(String),
}

/// What a coupon does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum CouponEffect {
    /// Percentage off the cart subtotal.
    PercentOff {
        /// Whole percent, 1-100.
        percent: u8,
    },
    /// Shipping charge waived.
    FreeShipping,
}

/// A coupon code and its effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Coupon {
    pub code: &'static str,
    pub description: &'static str,
    pub effect: CouponEffect,
}

/// Every coupon the shop honours.
pub const COUPONS: &[Coupon] = &[
    Coupon {
        code: "SAVE10",
        description: "10% off your order",
        effect: CouponEffect::PercentOff { percent: 10 },
    },
    Coupon {
        code: "SAVE20",
        description: "20% off your order",
        effect: CouponEffect::PercentOff { percent: 20 },
    },
    Coupon {
        code: "FREESHIP",
        description: "Free shipping on your order",
        effect: CouponEffect::FreeShipping,
    },
];

/// Look a coupon up by its exact code.
///
/// # Errors
///
/// Returns [`CouponError::UnknownCoupon`] if no coupon matches. Matching is
/// case-sensitive and does not trim.
pub fn resolve(code: &str) -> Result<&'static Coupon, CouponError> {
    COUPONS
        .iter()
        .find(|coupon| coupon.code == code)
        .ok_or_else(|| CouponError::UnknownCoupon(code.to_string()))
}

impl Searchable for Coupon {
    type Status = NoStatus;

    fn search_fields(&self) -> Vec<&str> {
        vec![self.code, self.description]
    }

    fn status(&self) -> Option<NoStatus> {
        None
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::listing::{ListRequest, ListView, list_in_memory};

    #[test]
    fn test_resolve_save10() {
        let coupon = resolve("SAVE10").unwrap();
        assert_eq!(coupon.effect, CouponEffect::PercentOff { percent: 10 });
    }

    #[test]
    fn test_resolve_is_case_sensitive() {
        assert_eq!(
            resolve("save10"),
            Err(CouponError::UnknownCoupon("save10".to_string()))
        );
        assert!(resolve(" SAVE10").is_err());
    }

    #[test]
    fn test_free_shipping() {
        assert_eq!(
            resolve("FREESHIP").unwrap().effect,
            CouponEffect::FreeShipping
        );
    }

    #[test]
    fn test_codes_are_unique() {
        for (i, a) in COUPONS.iter().enumerate() {
            assert!(COUPONS.iter().skip(i + 1).all(|b| b.code != a.code));
        }
    }

    #[test]
    fn test_coupon_listing_search() {
        let request = ListRequest::new(ListView::Coupons, None, None, Some("ship"), None).unwrap();
        let page = list_in_memory(COUPONS, &request);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items.first().unwrap().code, "FREESHIP");
    }

    #[test]
    fn test_effect_serialization() {
        let json = serde_json::to_value(CouponEffect::PercentOff { percent: 10 }).unwrap();
        assert_eq!(json, serde_json::json!({"type": "percentOff", "percent": 10}));
    }
}
