/// Strong-buy scoring job: rebuilds `strongbuy_indicators` for the trailing
/// month of trading days from prices, institutional flows and monthly revenue.
///
/// Usage:
///   cargo run --release --bin etl_strongbuy
///   cargo run --release --bin etl_strongbuy -- --as-of 2024-06-28 --dry-run
use anyhow::Result;
use clap::Parser;
use stock_warroom::config::{EtlConfig, parse_as_of};
use stock_warroom::pipeline;
use stock_warroom::stock_db::get_connection;

#[derive(Parser, Debug)]
#[command(name = "etl_strongbuy")]
#[command(about = "Score strong-buy signals into strongbuy_indicators")]
struct Args {
    /// Last trading date to include (YYYY-MM-DD, default: today)
    #[arg(long)]
    as_of: Option<String>,

    /// Calendar days of price history to load
    #[arg(long, default_value_t = 150)]
    lookback_days: i64,

    /// Calendar days at the end of the range that receive a score
    #[arg(long, default_value_t = 30)]
    score_days: i64,

    /// Compute everything but skip the database write
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut cfg = EtlConfig::strong_buy(parse_as_of(args.as_of.as_deref())?);
    cfg.price_lookback_days = args.lookback_days;
    cfg.score_window_days = Some(args.score_days);

    println!("🚀 開始執行 StrongBuy ETL ({})", cfg.as_of);
    let pool = get_connection().await?;
    let summary = pipeline::run(&pool, &cfg, args.dry_run).await?;

    println!("\n📊 Summary:");
    println!("  Price rows: {}", summary.input_rows);
    println!("  Revenue rows: {}", summary.revenue_rows);
    println!("  Scored rows: {}", summary.scored_rows);
    println!("  Written rows: {}", summary.written_rows);
    Ok(())
}
