//! Database migration command.
//!
//! Applies the SQL files embedded from `crates/api/migrations/`. Already
//! applied migrations are skipped, so running it twice is harmless.

use storerate_api::db::MIGRATOR;

use super::{CommandError, connect};

/// Run all pending migrations.
///
/// # Errors
///
/// Returns an error if the connection or any migration fails.
pub async fn run() -> Result<(), CommandError> {
    let pool = connect().await?;

    tracing::info!("Running migrations...");
    MIGRATOR.run(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
