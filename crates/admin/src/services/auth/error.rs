//! Authentication error types.

use thiserror::Error;

use larder_core::Role;

/// Errors raised while checking a request's credential.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No credential in the cookie or `Authorization` header.
    #[error("sign in required")]
    MissingCredential,

    /// Credential is not in the expected `v1.<payload>.<signature>` form.
    #[error("malformed credential: {0}")]
    Malformed(String),

    /// Signature does not match the payload.
    #[error("credential signature is invalid")]
    BadSignature,

    /// Credential verified but its expiry has passed.
    #[error("credential has expired")]
    Expired,

    /// Credential is valid but grants the wrong role.
    #[error("{required} role required")]
    Forbidden {
        /// Role the operation needs.
        required: Role,
        /// Role the credential grants.
        actual: Role,
    },

    /// The credential's user no longer exists or is blocked.
    #[error("account is not active")]
    InactiveAccount,

    /// Credential could not be produced.
    #[error("failed to sign credential: {0}")]
    Signing(String),
}
