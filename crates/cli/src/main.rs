//! StoreRate CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Apply database migrations
//! sr-cli migrate
//!
//! # Load the demo accounts, stores and ratings
//! sr-cli seed
//!
//! # Bootstrap an administrator
//! sr-cli admin create -e admin@example.com -n "Site Administrator Account" -p 'S3cure!pass'
//! ```
//!
//! # Environment Variables
//!
//! - `STORERATE_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "sr-cli")]
#[command(author, version, about = "StoreRate CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed the database with demo data
    Seed,
    /// Manage administrator accounts
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create a new ADMIN user
    Create {
        /// Email address
        #[arg(short, long)]
        email: String,

        /// Display name (20-60 characters)
        #[arg(short, long)]
        name: String,

        /// Postal address
        #[arg(short, long, default_value = "")]
        address: String,

        /// Initial password (8-16 characters, one uppercase, one special)
        #[arg(short, long)]
        password: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed => commands::seed::run().await?,
        Commands::Admin { action } => match action {
            AdminAction::Create {
                email,
                name,
                address,
                password,
            } => {
                commands::admin::create_user(&email, &name, &address, &password).await?;
            }
        },
    }
    Ok(())
}
