/// Extract / transform / load for the indicator jobs.
use anyhow::Result;
use chrono::Duration;
use log::{info, warn};
use sqlx::PgPool;

use crate::config::{EtlConfig, Profile};
use crate::db;
use crate::features::{Features, compute_all};
use crate::model::{DailyBar, IndicatorRow, RevenueRecord};
use crate::ranking::assign_ranks;
use crate::rolling::to_opt;
use crate::strategy::Strategy;

pub struct Extracted {
    pub bars: Vec<DailyBar>,
    pub revenue: Vec<RevenueRecord>,
}

pub async fn extract(pool: &PgPool, cfg: &EtlConfig) -> Result<Extracted> {
    let bars = db::fetch_daily_bars(pool, cfg.price_start(), cfg.as_of, cfg.keep_unlisted).await?;

    let revenue = if cfg.wants_revenue() {
        match db::fetch_revenue(pool, cfg.revenue_start(), cfg.as_of).await {
            Ok(records) => records,
            Err(e) => {
                // revenue signals are optional; carry on without them
                warn!("⚠️ monthly revenue unavailable, skipping revenue signals: {:#}", e);
                Vec::new()
            }
        }
    } else {
        Vec::new()
    };

    Ok(Extracted { bars, revenue })
}

/// Which rows get ranked and scored.
fn scoring_mask(rows: &[Features], window_days: Option<i64>) -> Vec<bool> {
    let Some(latest) = rows.iter().map(|r| r.bar.date).max() else {
        return Vec::new();
    };
    let cutoff = match window_days {
        Some(days) => latest - Duration::days(days),
        None => latest,
    };
    rows.iter().map(|r| r.bar.date >= cutoff).collect()
}

fn to_row(f: &Features, score: Option<(i32, String)>, profile: Profile) -> IndicatorRow {
    let (total_score, signal_list) = match score {
        Some((s, list)) => (Some(s), Some(list)),
        None => (None, None),
    };
    IndicatorRow {
        date: f.bar.date,
        symbol: f.bar.symbol.clone(),
        name: f.bar.name.clone(),
        industry: f.bar.industry.clone(),
        open: f.bar.open,
        high: f.bar.high,
        low: f.bar.low,
        close: f.bar.close,
        volume: f.bar.volume,
        pct_change: to_opt(f.pct_change),
        foreign_net: f.bar.foreign_net,
        trust_net: f.bar.trust_net,
        yoy_pct: match profile {
            Profile::StrongBuy => Some(f.revenue.yoy_pct),
            Profile::Daily => None,
        },
        ma5: to_opt(f.ma5),
        ma10: to_opt(f.ma10),
        ma20: to_opt(f.ma20),
        ma60: to_opt(f.ma60),
        k: to_opt(f.k),
        d: to_opt(f.d),
        macd_osc: to_opt(f.macd_osc),
        dif: to_opt(f.dif),
        macd: to_opt(f.macd),
        total_score,
        signal_list,
    }
}

/// Pure transform: features, ranks and scores for every input row.
///
/// Rows outside the scoring window keep a NULL score and signal list. Output
/// is ordered by (symbol, date) and depends only on the inputs.
pub fn transform(
    bars: Vec<DailyBar>,
    revenue: &[RevenueRecord],
    profile: Profile,
    score_window_days: Option<i64>,
) -> Vec<IndicatorRow> {
    let strategy = match profile {
        Profile::StrongBuy => Strategy::strong_buy(),
        Profile::Daily => Strategy::daily(),
    };

    let mut rows = compute_all(bars, revenue);
    let mask = scoring_mask(&rows, score_window_days);
    assign_ranks(&mut rows, &mask);

    rows.iter()
        .zip(&mask)
        .map(|(f, &scored)| {
            let score = scored.then(|| {
                let eval = strategy.evaluate(f);
                let list = eval.signal_list();
                (eval.score, list)
            });
            to_row(f, score, profile)
        })
        .collect()
}

/// Replace the profile's table from the earliest row date onward.
pub async fn load(pool: &PgPool, cfg: &EtlConfig, rows: &[IndicatorRow]) -> Result<u64> {
    let written = db::replace_indicators(pool, cfg.profile, rows, cfg.insert_chunk_size).await?;
    info!("wrote {} rows to {}", written, cfg.profile.table());
    Ok(written)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RunSummary {
    pub input_rows: usize,
    pub revenue_rows: usize,
    pub scored_rows: usize,
    pub written_rows: u64,
}

/// Run one job end to end. `dry_run` skips the write.
pub async fn run(pool: &PgPool, cfg: &EtlConfig, dry_run: bool) -> Result<RunSummary> {
    cfg.validate()?;

    println!("📥 [1/4] 撈取股價、籌碼與營收資料 (since {})...", cfg.price_start());
    let extracted = extract(pool, cfg).await?;
    let mut summary = RunSummary {
        input_rows: extracted.bars.len(),
        revenue_rows: extracted.revenue.len(),
        ..RunSummary::default()
    };
    info!("extracted {} price rows, {} revenue rows", summary.input_rows, summary.revenue_rows);

    println!("⚙️ [2/4] 計算均線、技術指標與週K...");
    println!("📊 [3/4] 產生訊號與排名...");
    let rows = transform(extracted.bars, &extracted.revenue, cfg.profile, cfg.score_window_days);
    summary.scored_rows = rows.iter().filter(|r| r.total_score.is_some()).count();

    if dry_run {
        println!("🧪 dry run: {} rows computed, {} scored; nothing written", rows.len(), summary.scored_rows);
        return Ok(summary);
    }

    println!("📤 [4/4] 覆寫 {} 筆資料至 {}...", rows.len(), cfg.profile.table());
    summary.written_rows = load(pool, cfg, &rows).await?;
    println!("✅ 更新完成！");
    Ok(summary)
}
