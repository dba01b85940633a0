//! Larder CLI - database migrations, demo data and credentials.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! larder-cli migrate
//!
//! # Load the demo catalog, customers and orders
//! larder-cli seed crates/cli/fixtures/demo.yaml
//!
//! # Issue a session credential for user 1 as an admin
//! larder-cli token issue --user-id 1 --role admin
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `seed` - Insert fixture data from a YAML file
//! - `token issue` - Sign a session credential for an existing account

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "larder-cli")]
#[command(author, version, about = "Larder CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Insert fixture data from a YAML file
    Seed {
        /// Path to the fixture file
        #[arg(default_value = "crates/cli/fixtures/demo.yaml")]
        file: String,
    },
    /// Manage session credentials
    Token {
        #[command(subcommand)]
        action: TokenAction,
    },
}

#[derive(Subcommand)]
enum TokenAction {
    /// Sign a credential for an existing account
    Issue {
        /// Account ID
        #[arg(short, long)]
        user_id: i32,

        /// Role carried by the credential (`admin` or `customer`)
        #[arg(short, long, default_value = "admin")]
        role: String,

        /// Lifetime in minutes
        #[arg(short, long, default_value_t = 480)]
        ttl_minutes: i64,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CliError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { file } => commands::seed::run(&file).await?,
        Commands::Token { action } => match action {
            TokenAction::Issue {
                user_id,
                role,
                ttl_minutes,
            } => commands::token::issue(user_id, &role, ttl_minutes)?,
        },
    }
    Ok(())
}
