/// Short-term strength screen on raw prices: MA5 > MA10 > MA20, close above
/// MA5, an up day on rising volume.
///
/// Usage:
///   cargo run --release --bin select_strong_stocks
///   cargo run --release --bin select_strong_stocks -- --days 60 --output strong.csv
use anyhow::{Result, bail};
use clap::Parser;
use stock_warroom::db::{fetch_daily_bars, recent_trading_dates};
use stock_warroom::scan::strong_trend;
use stock_warroom::stock_db::get_connection;

#[derive(Parser, Debug)]
#[command(name = "select_strong_stocks")]
#[command(about = "List stocks in a short-term uptrend on the latest trading day")]
struct Args {
    /// Number of recent trading days to load (MA20 needs at least 20)
    #[arg(long, default_value_t = 40)]
    days: i64,

    /// Write matches to this CSV file
    #[arg(long)]
    output: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    if args.days < 21 {
        bail!("--days must be at least 21, got {}", args.days);
    }

    let pool = get_connection().await?;
    println!("📥 正在讀取近期股價資料...");
    let dates = recent_trading_dates(&pool, args.days).await?;
    let (Some(&latest), Some(&earliest)) = (dates.first(), dates.last()) else {
        bail!("stock_prices is empty");
    };
    println!("   📅 分析範圍: {} ~ {}", earliest, latest);

    let bars = fetch_daily_bars(&pool, earliest, latest, true).await?;
    println!("🔄 正在計算技術指標並篩選 (目標日期: {})...", latest);
    let picks = strong_trend(&bars, latest);

    println!("\n🔥 {} strong stocks", picks.len());
    println!("{:<8} {:<10} {:>10} {:>8} {:>14}", "symbol", "name", "close", "pct", "volume");
    for p in &picks {
        println!(
            "{:<8} {:<10} {:>10.2} {:>7.2}% {:>14.0}",
            p.symbol,
            p.name.as_deref().unwrap_or("-"),
            p.close,
            p.pct_change,
            p.volume
        );
    }

    if let Some(path) = args.output {
        let mut wtr = csv::Writer::from_path(&path)?;
        for p in &picks {
            wtr.serialize(p)?;
        }
        wtr.flush()?;
        println!("✅ saved to {}", path);
    }
    Ok(())
}
