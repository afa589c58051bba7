use anyhow::{Context, Result};
use log::info;
use sqlx::{Pool, Postgres, postgres::PgPoolOptions};

use crate::config::database_url;

pub async fn connect(database_url: &str) -> Result<Pool<Postgres>> {
    let pool = PgPoolOptions::new()
        .max_connections(8)
        .min_connections(1)
        .acquire_timeout(std::time::Duration::from_secs(30))
        .idle_timeout(std::time::Duration::from_secs(300)) // 5 minute idle timeout
        .max_lifetime(std::time::Duration::from_secs(1800)) // 30 minute max connection lifetime
        .connect(database_url)
        .await
        .context("🔥 Failed to connect to the database")?;
    info!("connected to database");
    Ok(pool)
}

/// Pool for the database named by `SUPABASE_DB_URL`.
pub async fn get_connection() -> Result<Pool<Postgres>> {
    let url = database_url()?;
    connect(&url).await
}
