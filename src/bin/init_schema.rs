/// Create every table used by the ETL jobs, screeners and watchlists.
///
/// Usage:
///   cargo run --bin init_schema
use anyhow::Result;
use stock_warroom::db::ensure_schema;
use stock_warroom::stock_db::get_connection;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let pool = get_connection().await?;
    ensure_schema(&pool).await?;
    println!("✅ Schema ready");
    Ok(())
}
