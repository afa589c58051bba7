/// Dragon-tail screener over `daily_stock_indicators`: low base, recent
/// volume breakout, stacked moving averages, MA20 pullback and a red candle
/// above the previous high.
///
/// Usage:
///   cargo run --release --bin dragon_tail_scan -- --date 2024-06-28
///   cargo run --release --bin dragon_tail_scan -- --no-ma-stack --output hits.csv
use anyhow::{Result, bail};
use chrono::Duration;
use clap::Parser;
use stock_warroom::config::{Profile, parse_as_of};
use stock_warroom::db::{fetch_indicators, recent_trading_dates};
use stock_warroom::scan::{ScanOptions, dragon_tail};
use stock_warroom::stock_db::get_connection;

#[derive(Parser, Debug)]
#[command(name = "dragon_tail_scan")]
#[command(about = "Screen for low-base breakouts pulling back to MA20")]
struct Args {
    /// Target date (YYYY-MM-DD, default: latest trading day)
    #[arg(long)]
    date: Option<String>,

    /// Minimum volume in sheets
    #[arg(long, default_value_t = 500.0)]
    min_volume: f64,

    /// Skip: close within 30% of the 120-day low
    #[arg(long)]
    no_low_base: bool,

    /// Skip: volume above twice the 20-day average in the last 20 days
    #[arg(long)]
    no_volume_breakout: bool,

    /// Skip: MA5 > MA10 > MA20 > MA60
    #[arg(long)]
    no_ma_stack: bool,

    /// Skip: low touched MA20 in the last 3 days and close back above it
    #[arg(long)]
    no_ma20_pullback: bool,

    /// Skip: red candle closing above the previous high
    #[arg(long)]
    no_red_over_prev_high: bool,

    /// Write matches to this CSV file
    #[arg(long)]
    output: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let pool = get_connection().await?;
    let target = match args.date.as_deref() {
        Some(d) => parse_as_of(Some(d))?,
        None => match recent_trading_dates(&pool, 1).await?.first() {
            Some(d) => *d,
            None => bail!("stock_prices is empty"),
        },
    };

    let opts = ScanOptions {
        min_volume: args.min_volume,
        low_base: !args.no_low_base,
        volume_breakout: !args.no_volume_breakout,
        ma_stack: !args.no_ma_stack,
        ma20_pullback: !args.no_ma20_pullback,
        red_over_prev_high: !args.no_red_over_prev_high,
    };

    println!("🐉 神龍擺尾掃描 {}", target);
    println!("📥 讀取 {} ...", Profile::Daily.table());
    let rows = fetch_indicators(&pool, Profile::Daily, target - Duration::days(200), target).await?;
    println!("   {} rows loaded", rows.len());

    let hits = dragon_tail(&rows, target, &opts);
    println!("\n🎯 {} matches", hits.len());
    println!("{:<8} {:<10} {:>10} {:>8} {:>12}", "symbol", "name", "close", "pct", "vol(張)");
    for h in &hits {
        println!(
            "{:<8} {:<10} {:>10.2} {:>8} {:>12.0}",
            h.symbol,
            h.name.as_deref().unwrap_or("-"),
            h.close,
            h.pct_change.map(|p| format!("{:.2}%", p)).unwrap_or_else(|| "-".into()),
            h.volume_sheets
        );
    }

    if let Some(path) = args.output {
        let mut wtr = csv::Writer::from_path(&path)?;
        for h in &hits {
            wtr.serialize(h)?;
        }
        wtr.flush()?;
        println!("✅ saved to {}", path);
    }
    Ok(())
}
