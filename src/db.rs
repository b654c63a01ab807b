//! Database module
//!
//! Pool construction and startup checks. The schema itself lives in
//! `migrations/` as raw SQL.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::config::Config;

/// Tables the gateway reads and writes
const REQUIRED_TABLES: [&str; 4] = ["users", "categories", "bank_accounts", "transactions"];

/// Open the connection pool described by the configuration
pub async fn connect(config: &Config) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .acquire_timeout(config.database_acquire_timeout)
        .connect(&config.database_url)
        .await
}

/// Verify database connectivity
pub async fn verify_connection(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;

    Ok(())
}

/// Check if required tables exist
pub async fn check_schema(pool: &PgPool) -> Result<bool, sqlx::Error> {
    for table in REQUIRED_TABLES {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM information_schema.tables
                WHERE table_schema = 'public' AND table_name = $1
            )
            "#,
        )
        .bind(table)
        .fetch_one(pool)
        .await?;

        if !exists {
            tracing::error!(
                "Required table '{}' does not exist. Apply migrations/0001_initial_schema.sql.",
                table
            );
            return Ok(false);
        }
    }

    tracing::info!("Schema verified: {}", REQUIRED_TABLES.join(", "));
    Ok(true)
}
