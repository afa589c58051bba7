/// Best-buy momentum screen on raw prices: a 3-6% gain on volume above its
/// 5-day average and the previous day, with stacked short moving averages.
/// Each pick carries how often it passed the same screen in the prior 45 days.
///
/// Usage:
///   cargo run --release --bin best_buy_scan
///   cargo run --release --bin best_buy_scan -- --date 2024-06-28 --sort past-hits
///   cargo run --release --bin best_buy_scan -- --industry 半導體業 --output picks.csv
use anyhow::{Result, bail};
use chrono::Duration;
use clap::{Parser, ValueEnum};
use stock_warroom::config::parse_as_of;
use stock_warroom::db::{fetch_daily_bars, recent_trading_dates};
use stock_warroom::scan::{BestBuyOptions, BestBuySort, best_buy};
use stock_warroom::stock_db::get_connection;

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SortBy {
    /// Percent change, highest first
    Pct,
    /// Hits in the last 45 days, then percent change
    PastHits,
    /// Volume over its 5-day average, highest first
    VolRatio,
    /// Stock symbol, ascending
    Symbol,
}

impl From<SortBy> for BestBuySort {
    fn from(sort: SortBy) -> Self {
        match sort {
            SortBy::Pct => BestBuySort::PctChange,
            SortBy::PastHits => BestBuySort::PastHits,
            SortBy::VolRatio => BestBuySort::VolRatio,
            SortBy::Symbol => BestBuySort::Symbol,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "best_buy_scan")]
#[command(about = "Screen for moderate gains on rising volume with stacked moving averages")]
struct Args {
    /// Target date (YYYY-MM-DD, default: latest trading day)
    #[arg(long)]
    date: Option<String>,

    /// Calendar days of prices to load before the target date
    #[arg(long, default_value_t = 120)]
    lookback_days: i64,

    /// Lowest percent change of the day
    #[arg(long, default_value_t = 3.0)]
    pct_min: f64,

    /// Highest percent change of the day
    #[arg(long, default_value_t = 6.0)]
    pct_max: f64,

    /// Minimum volume over its 5-day average
    #[arg(long, default_value_t = 1.0)]
    vol_ratio_min: f64,

    /// Keep only this industry (repeatable)
    #[arg(long)]
    industry: Vec<String>,

    #[arg(long, value_enum, default_value_t = SortBy::Pct)]
    sort: SortBy,

    /// Write matches to this CSV file
    #[arg(long)]
    output: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    // MA20 must exist 45 days before the target for the hit count
    if args.lookback_days < 80 {
        bail!("--lookback-days must be at least 80, got {}", args.lookback_days);
    }
    if args.pct_min > args.pct_max {
        bail!("--pct-min {} is above --pct-max {}", args.pct_min, args.pct_max);
    }

    let pool = get_connection().await?;
    let target = match args.date.as_deref() {
        Some(d) => parse_as_of(Some(d))?,
        None => match recent_trading_dates(&pool, 1).await?.first() {
            Some(d) => *d,
            None => bail!("stock_prices is empty"),
        },
    };
    let start = target - Duration::days(args.lookback_days);

    println!("📥 正在讀取股價資料: {} ~ {}", start, target);
    let bars = fetch_daily_bars(&pool, start, target, false).await?;
    log::info!("loaded {} bars", bars.len());

    let opts = BestBuyOptions {
        pct_min: args.pct_min,
        pct_max: args.pct_max,
        vol_ratio_min: args.vol_ratio_min,
        industries: args.industry,
    };
    println!("🔄 正在篩選 (目標日期: {}, 排序: {:?})...", target, args.sort);
    let picks = best_buy(&bars, target, &opts, args.sort.into());

    if picks.is_empty() {
        println!("⚠️ {} 在所選條件下無符合股票", target);
        return Ok(());
    }

    println!("\n🎉 {} picks", picks.len());
    println!(
        "{:<8} {:<10} {:<12} {:>10} {:>8} {:>8} {:>6}",
        "symbol", "name", "industry", "close", "pct", "vol", "hits"
    );
    for p in &picks {
        println!(
            "{:<8} {:<10} {:<12} {:>10.2} {:>7.2}% {:>8.2} {:>6}",
            p.symbol,
            p.name.as_deref().unwrap_or("-"),
            p.industry.as_deref().unwrap_or("-"),
            p.close,
            p.pct_change,
            p.vol_ratio,
            p.past_hits
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
