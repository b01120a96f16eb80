//! Database adapters (connection pool, schema bootstrap).

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

const SCHEMA: &str = include_str!("schema.sql");

/// Connect and make sure the document and sequence tables exist.
pub async fn connect(database_url: &str) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;
    bootstrap_schema(&pool).await?;
    Ok(pool)
}

pub async fn bootstrap_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::raw_sql(SCHEMA).execute(pool).await?;
    info!("database schema ready");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::SCHEMA;

    #[test]
    fn schema_declares_unique_keys() {
        for index in ["documents_code_key", "documents_email_key", "documents_phone_key"] {
            assert!(SCHEMA.contains(index), "missing {index}");
        }
        assert!(SCHEMA.contains("CREATE TABLE IF NOT EXISTS code_sequences"));
    }
}
