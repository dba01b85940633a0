//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::AdminConfig;
use crate::services::CredentialVerifier;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AdminConfig,
    pool: PgPool,
    verifier: CredentialVerifier,
}

impl AppState {
    /// Build the state. The credential verifier uses the configured secret.
    #[must_use]
    pub fn new(config: AdminConfig, pool: PgPool) -> Self {
        let verifier = CredentialVerifier::new(config.credential_secret.clone());
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                verifier,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &AdminConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    #[must_use]
    pub fn verifier(&self) -> &CredentialVerifier {
        &self.inner.verifier
    }
}
