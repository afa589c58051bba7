/// Daily indicator job: rebuilds `daily_stock_indicators` and scores the most
/// recent trading day.
///
/// Usage:
///   cargo run --release --bin etl_daily_calc
///   cargo run --release --bin etl_daily_calc -- --as-of 2024-06-28
use anyhow::Result;
use clap::Parser;
use stock_warroom::config::{EtlConfig, parse_as_of};
use stock_warroom::pipeline;
use stock_warroom::stock_db::get_connection;

#[derive(Parser, Debug)]
#[command(name = "etl_daily_calc")]
#[command(about = "Compute daily indicators into daily_stock_indicators")]
struct Args {
    /// Last trading date to include (YYYY-MM-DD, default: today)
    #[arg(long)]
    as_of: Option<String>,

    /// Calendar days of price history to load
    #[arg(long, default_value_t = 200)]
    lookback_days: i64,

    /// Compute everything but skip the database write
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut cfg = EtlConfig::daily(parse_as_of(args.as_of.as_deref())?);
    cfg.price_lookback_days = args.lookback_days;

    println!("🚀 開始執行每日指標計算 ({})", cfg.as_of);
    let pool = get_connection().await?;
    let summary = pipeline::run(&pool, &cfg, args.dry_run).await?;
    println!(
        "📊 {} price rows in, {} scored, {} written",
        summary.input_rows, summary.scored_rows, summary.written_rows
    );
    Ok(())
}
