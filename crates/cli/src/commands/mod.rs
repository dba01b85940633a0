//! Command implementations.
//!
//! # Environment Variables
//!
//! - `LARDER_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `LARDER_CREDENTIAL_SECRET` - HMAC key shared with the admin service

pub mod migrate;
pub mod seed;
pub mod token;

use sqlx::PgPool;
use thiserror::Error;

use larder_admin::config::{ConfigError, get_database_url};
use larder_admin::db::{self, RepositoryError};
use larder_admin::services::{AuthError, OrderError};

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Missing or invalid environment configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// A migration failed.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A repository write failed.
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// An order rule rejected fixture data.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// Credential signing failed.
    #[error("Credential error: {0}")]
    Auth(#[from] AuthError),

    /// The fixture file could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The fixture file is not valid YAML for the expected shape.
    #[error("Invalid fixture: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A value in the arguments or fixture is invalid.
    #[error("Invalid input: {0}")]
    Invalid(String),
}

/// Connect to the configured database.
async fn connect() -> Result<PgPool, CliError> {
    dotenvy::dotenv().ok();
    let database_url = get_database_url("LARDER_DATABASE_URL")?;

    tracing::info!("Connecting to database...");
    Ok(db::create_pool(&database_url).await?)
}
