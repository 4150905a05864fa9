use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

/// Creates and returns a PostgreSQL connection pool.
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    info!("Connecting to PostgreSQL...");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    info!("PostgreSQL connection pool established");
    Ok(pool)
}

/// Creates the usage table if it does not exist. One row per (user, feature);
/// `period_start` is the first day of the billing month the count belongs to.
pub async fn ensure_schema(pool: &PgPool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS usage_records (
            user_id      UUID   NOT NULL,
            feature      TEXT   NOT NULL,
            count        BIGINT NOT NULL DEFAULT 0,
            period_start DATE   NOT NULL,
            PRIMARY KEY (user_id, feature)
        )
        "#,
    )
    .execute(pool)
    .await?;

    info!("Database schema ready");
    Ok(())
}
