//! Credential issuing command.
//!
//! Signs a credential with `LARDER_CREDENTIAL_SECRET`, the same key the admin
//! service verifies with. The account must exist and match the role, or the
//! service will reject the credential on first use.

use chrono::Duration;

use larder_admin::config::load_credential_secret;
use larder_admin::services::CredentialVerifier;
use larder_core::{Principal, Role, UserId};

use super::CliError;

/// Longest lifetime the command will sign.
const MAX_TTL_MINUTES: i64 = 60 * 24 * 30;

/// Print a signed credential to stdout.
///
/// # Errors
///
/// Returns an error for an unknown role, an out-of-range lifetime or a
/// missing or weak secret.
pub fn issue(user_id: i32, role: &str, ttl_minutes: i64) -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let role: Role = role
        .parse()
        .map_err(|e| CliError::Invalid(format!("{e}. Valid roles: admin, customer")))?;
    if !(1..=MAX_TTL_MINUTES).contains(&ttl_minutes) {
        return Err(CliError::Invalid(format!(
            "ttl must be between 1 and {MAX_TTL_MINUTES} minutes"
        )));
    }

    let verifier = CredentialVerifier::new(load_credential_secret("LARDER_CREDENTIAL_SECRET")?);
    let principal = Principal {
        id: UserId::new(user_id),
        role,
    };
    let token = verifier.issue(principal, Duration::minutes(ttl_minutes))?;

    tracing::info!(user_id, role = %role, ttl_minutes, "Credential issued");

    #[allow(clippy::print_stdout)]
    {
        println!("{token}");
    }
    Ok(())
}
