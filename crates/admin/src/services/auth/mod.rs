//! Credential signing and verification.
//!
//! A credential is a short signed string carried in the session cookie or an
//! `Authorization: Bearer` header:
//!
//! ```text
//! v1.<base64url(claims JSON)>.<hex(HMAC-SHA256(secret, "v1." + payload))>
//! ```
//!
//! Claims hold the user id, the role and an expiry in unix seconds. Checks run
//! in a fixed order: presence, shape, signature, expiry, role. An expired
//! credential is reported as such only after its signature verifies.

mod error;

pub use error::AuthError;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use larder_core::{Principal, Role, UserId};

const VERSION: &str = "v1";

/// Default lifetime of an issued credential.
pub const DEFAULT_TTL: Duration = Duration::hours(8);

/// Signed claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: i32,
    pub role: Role,
    /// Expiry, unix seconds.
    pub exp: i64,
}

impl Claims {
    /// The identity these claims describe.
    #[must_use]
    pub const fn principal(&self) -> Principal {
        Principal {
            id: UserId::new(self.sub),
            role: self.role,
        }
    }
}

/// Signs and verifies credentials with one shared secret.
#[derive(Clone)]
pub struct CredentialVerifier {
    secret: SecretString,
}

impl std::fmt::Debug for CredentialVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialVerifier")
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

impl CredentialVerifier {
    /// Create a verifier for `secret`.
    #[must_use]
    pub const fn new(secret: SecretString) -> Self {
        Self { secret }
    }

    fn mac(&self) -> Result<Hmac<Sha256>, AuthError> {
        Hmac::<Sha256>::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|e| AuthError::Signing(e.to_string()))
    }

    /// Issue a credential for `principal` valid for `ttl` from now.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Signing` if the claims cannot be encoded.
    pub fn issue(&self, principal: Principal, ttl: Duration) -> Result<String, AuthError> {
        self.issue_until(principal, Utc::now() + ttl)
    }

    /// Issue a credential for `principal` expiring at `expires_at`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Signing` if the claims cannot be encoded.
    pub fn issue_until(
        &self,
        principal: Principal,
        expires_at: DateTime<Utc>,
    ) -> Result<String, AuthError> {
        let claims = Claims {
            sub: principal.id.as_i32(),
            role: principal.role,
            exp: expires_at.timestamp(),
        };
        let json = serde_json::to_vec(&claims).map_err(|e| AuthError::Signing(e.to_string()))?;
        let payload = URL_SAFE_NO_PAD.encode(json);

        let mut mac = self.mac()?;
        mac.update(format!("{VERSION}.{payload}").as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());

        Ok(format!("{VERSION}.{payload}.{signature}"))
    }

    /// Verify a credential against the current time.
    ///
    /// # Errors
    ///
    /// See [`CredentialVerifier::verify_at`].
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        self.verify_at(token, Utc::now())
    }

    /// Verify a credential's shape, signature and expiry as of `now`.
    ///
    /// # Errors
    ///
    /// - `AuthError::Malformed` if the token is not `v1.<payload>.<signature>`
    /// - `AuthError::BadSignature` if the signature does not match
    /// - `AuthError::Expired` if `exp` is at or before `now`
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, AuthError> {
        let mut parts = token.trim().splitn(3, '.');
        let (Some(version), Some(payload), Some(signature)) =
            (parts.next(), parts.next(), parts.next())
        else {
            return Err(AuthError::Malformed("expected three segments".to_string()));
        };
        if version != VERSION {
            return Err(AuthError::Malformed(format!(
                "unsupported version {version}"
            )));
        }

        let signature = hex::decode(signature).map_err(|_| AuthError::BadSignature)?;
        let mut mac = self.mac()?;
        mac.update(format!("{VERSION}.{payload}").as_bytes());
        // Constant-time comparison
        mac.verify_slice(&signature)
            .map_err(|_| AuthError::BadSignature)?;

        let json = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|e| AuthError::Malformed(e.to_string()))?;
        let claims: Claims =
            serde_json::from_slice(&json).map_err(|e| AuthError::Malformed(e.to_string()))?;

        if claims.exp <= now.timestamp() {
            return Err(AuthError::Expired);
        }
        Ok(claims)
    }

    /// Resolve the principal for a request that needs `required`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingCredential` when `token` is `None`,
    /// the errors of [`CredentialVerifier::verify`], and
    /// `AuthError::Forbidden` when the role does not match.
    pub fn authorize(&self, token: Option<&str>, required: Role) -> Result<Principal, AuthError> {
        self.authorize_at(token, required, Utc::now())
    }

    /// [`CredentialVerifier::authorize`] as of `now`.
    ///
    /// # Errors
    ///
    /// See [`CredentialVerifier::authorize`].
    pub fn authorize_at(
        &self,
        token: Option<&str>,
        required: Role,
        now: DateTime<Utc>,
    ) -> Result<Principal, AuthError> {
        let token = token
            .filter(|t| !t.trim().is_empty())
            .ok_or(AuthError::MissingCredential)?;
        let principal = self.verify_at(token, now)?.principal();
        if !principal.has_role(required) {
            return Err(AuthError::Forbidden {
                required,
                actual: principal.role,
            });
        }
        Ok(principal)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    const SECRET: &str = "q8Vn2#Lr7!Xp4@Tz9$Kb1^Wm6&Hd3*Js";

    fn verifier() -> CredentialVerifier {
        CredentialVerifier::new(SecretString::from(SECRET))
    }

    fn admin() -> Principal {
        Principal {
            id: UserId::new(1),
            role: Role::Admin,
        }
    }

    fn customer() -> Principal {
        Principal {
            id: UserId::new(42),
            role: Role::Customer,
        }
    }

    #[test]
    fn test_issue_then_authorize() {
        let v = verifier();
        let token = v.issue(admin(), DEFAULT_TTL).unwrap();
        assert!(token.starts_with("v1."));
        assert_eq!(v.authorize(Some(&token), Role::Admin).unwrap(), admin());
    }

    #[test]
    fn test_missing_credential() {
        assert_eq!(
            verifier().authorize(None, Role::Admin),
            Err(AuthError::MissingCredential)
        );
        assert_eq!(
            verifier().authorize(Some("  "), Role::Admin),
            Err(AuthError::MissingCredential)
        );
    }

    #[test]
    fn test_customer_is_forbidden_from_admin() {
        let v = verifier();
        let token = v.issue(customer(), DEFAULT_TTL).unwrap();
        assert_eq!(
            v.authorize(Some(&token), Role::Admin),
            Err(AuthError::Forbidden {
                required: Role::Admin,
                actual: Role::Customer,
            })
        );
    }

    #[test]
    fn test_admin_is_forbidden_from_customer_operations() {
        let v = verifier();
        let token = v.issue(admin(), DEFAULT_TTL).unwrap();
        assert!(matches!(
            v.authorize(Some(&token), Role::Customer),
            Err(AuthError::Forbidden { .. })
        ));
    }

    #[test]
    fn test_expired_is_distinct_from_missing() {
        let v = verifier();
        let issued = Utc::now();
        let token = v.issue_until(admin(), issued + Duration::minutes(5)).unwrap();

        assert!(v.verify_at(&token, issued).is_ok());
        assert_eq!(
            v.verify_at(&token, issued + Duration::minutes(5)),
            Err(AuthError::Expired)
        );
        assert_eq!(
            v.authorize_at(Some(&token), Role::Admin, issued + Duration::hours(1)),
            Err(AuthError::Expired)
        );
    }

    #[test]
    fn test_tampered_payload_is_rejected() {
        let v = verifier();
        let token = v.issue(customer(), DEFAULT_TTL).unwrap();
        let mut parts: Vec<&str> = token.split('.').collect();

        let forged = Claims {
            sub: 42,
            role: Role::Admin,
            exp: (Utc::now() + DEFAULT_TTL).timestamp(),
        };
        let forged_payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged).unwrap());
        parts[1] = &forged_payload;
        let forged_token = parts.join(".");

        assert_eq!(v.verify(&forged_token), Err(AuthError::BadSignature));
    }

    #[test]
    fn test_expired_forgery_reports_bad_signature() {
        let v = verifier();
        let other = CredentialVerifier::new(SecretString::from("Zr5%Gk8!Nw2@Pq7#Ys4^Lc9&Ft1*Hb6$"));
        let token = other
            .issue_until(admin(), Utc::now() - Duration::hours(1))
            .unwrap();
        assert_eq!(v.verify(&token), Err(AuthError::BadSignature));
    }

    #[test]
    fn test_malformed_tokens() {
        let v = verifier();
        assert!(matches!(v.verify("garbage"), Err(AuthError::Malformed(_))));
        assert!(matches!(v.verify("v2.abc.def"), Err(AuthError::Malformed(_))));
        assert_eq!(v.verify("v1.abc.not-hex"), Err(AuthError::BadSignature));
    }

    #[test]
    fn test_unknown_role_is_malformed() {
        let v = verifier();
        let payload = URL_SAFE_NO_PAD.encode(br#"{"sub":1,"role":"root","exp":99999999999}"#);
        let mut mac = v.mac().unwrap();
        mac.update(format!("v1.{payload}").as_bytes());
        let token = format!("v1.{payload}.{}", hex::encode(mac.finalize().into_bytes()));
        assert!(matches!(v.verify(&token), Err(AuthError::Malformed(_))));
    }

    #[test]
    fn test_debug_redacts_secret() {
        assert!(!format!("{:?}", verifier()).contains(SECRET));
    }
}
