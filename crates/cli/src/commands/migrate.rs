//! Database migration command.
//!
//! # Environment Variables
//!
//! - `PACKHOUSE_DATABASE_URL` - `PostgreSQL` connection string

use secrecy::SecretString;
use tracing::info;

use packhouse_engine::create_pool;

/// Run all pending migrations from `crates/engine/migrations/`.
///
/// # Errors
///
/// Returns an error if `PACKHOUSE_DATABASE_URL` is unset, the database is
/// unreachable, or a migration fails.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("PACKHOUSE_DATABASE_URL")
        .map(SecretString::from)
        .map_err(|_| "PACKHOUSE_DATABASE_URL not set")?;

    info!("Connecting to database...");
    let pool = create_pool(&database_url).await?;

    info!("Running migrations...");
    sqlx::migrate!("../engine/migrations").run(&pool).await?;

    info!("Migrations complete!");
    Ok(())
}
