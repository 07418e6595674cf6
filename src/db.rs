use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use std::time::Duration;

/// Type alias for the PostgreSQL connection pool
pub type DbPool = PgPool;

/// Creates and configures a PostgreSQL connection pool
///
/// # Arguments
/// * `options` - PostgreSQL connection options from `Config`
///
/// # Returns
/// * `Result<DbPool>` - Configured connection pool or error
pub async fn create_pool(options: PgConnectOptions) -> Result<DbPool, sqlx::Error> {
    tracing::debug!(
        host = options.get_host(),
        port = options.get_port(),
        "Creating database connection pool"
    );

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(3))
        .connect_with(options)
        .await?;

    tracing::info!("Database connection pool created successfully");
    Ok(pool)
}
