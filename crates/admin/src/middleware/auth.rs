//! Authentication extractors.
//!
//! Handlers declare the role they need by taking `RequireAdmin` or
//! `RequireCustomer`. The extractor reads the credential, verifies it, then
//! re-reads the account so a block takes effect on the very next request.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum_extra::extract::CookieJar;

use larder_core::{Principal, Role};

use crate::db::UserRepository;
use crate::error::{AppError, set_sentry_user};
use crate::services::AuthError;
use crate::state::AppState;

/// Extractor that requires an administrator.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(RequireAdmin(admin): RequireAdmin) -> impl IntoResponse {
///     format!("Hello, admin {}!", admin.id)
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RequireAdmin(pub Principal);

/// Extractor that requires a customer.
#[derive(Debug, Clone, Copy)]
pub struct RequireCustomer(pub Principal);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        authenticate(&parts.headers, state, Role::Admin).await.map(Self)
    }
}

impl FromRequestParts<AppState> for RequireCustomer {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        authenticate(&parts.headers, state, Role::Customer).await.map(Self)
    }
}

async fn authenticate(
    headers: &HeaderMap,
    state: &AppState,
    required: Role,
) -> Result<Principal, AppError> {
    let token = credential_from_headers(headers, &state.config().cookie_name);
    let principal = state.verifier().authorize(token.as_deref(), required)?;

    let user = UserRepository::new(state.pool())
        .get_by_id(principal.id)
        .await?
        .filter(|user| !user.is_blocked && user.role == principal.role)
        .ok_or_else(|| {
            tracing::warn!(user_id = %principal.id, "Credential for inactive account rejected");
            AuthError::InactiveAccount
        })?;

    set_sentry_user(user.id.as_i32(), &user.username);
    Ok(principal)
}

/// The credential from the session cookie, or else a bearer token.
///
/// A blank cookie (as left behind by a logout) does not count.
fn credential_from_headers(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let jar = CookieJar::from_headers(headers);
    if let Some(value) = jar
        .get(cookie_name)
        .map(|cookie| cookie.value().trim())
        .filter(|value| !value.is_empty())
    {
        return Some(value.to_string());
    }

    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(ToString::to_string)
}
