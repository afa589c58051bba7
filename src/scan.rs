/// Read-only screens over stored prices and indicators.
///
/// `dragon_tail` works on rows of `daily_stock_indicators`; `strong_trend`
/// and `best_buy` work on raw daily bars and derive their own moving averages.
use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use serde::Serialize;

use crate::model::{DailyBar, IndicatorRow};
use crate::rolling::{
    pct_change, rolling_any, rolling_mean, rolling_mean_min_periods, rolling_min_min_periods, shift,
};

/// Raw volumes above this are shares rather than sheets (1 sheet = 1000 shares).
const SHARE_VOLUME_THRESHOLD: f64 = 1_000_000.0;

#[derive(Debug, Clone, Copy)]
pub struct ScanOptions {
    /// Minimum volume in sheets; always applied.
    pub min_volume: f64,
    pub low_base: bool,
    pub volume_breakout: bool,
    pub ma_stack: bool,
    pub ma20_pullback: bool,
    pub red_over_prev_high: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            min_volume: 500.0,
            low_base: true,
            volume_breakout: true,
            ma_stack: true,
            ma20_pullback: true,
            red_over_prev_high: true,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DragonTailHit {
    pub date: NaiveDate,
    pub symbol: String,
    pub name: Option<String>,
    pub industry: Option<String>,
    pub close: f64,
    pub pct_change: Option<f64>,
    pub volume_sheets: f64,
    pub low_120: Option<f64>,
    pub ma20: Option<f64>,
    pub signal_list: Option<String>,
}

/// Divisor that converts stored volumes to sheets.
pub fn sheet_divisor(rows: &[IndicatorRow]) -> f64 {
    let max = rows.iter().map(|r| r.volume).fold(f64::NEG_INFINITY, f64::max);
    if max > SHARE_VOLUME_THRESHOLD { 1000.0 } else { 1.0 }
}

fn nan(v: Option<f64>) -> f64 {
    v.unwrap_or(f64::NAN)
}

fn group_by_symbol<T>(rows: &[T], symbol: impl Fn(&T) -> &str, date: impl Fn(&T) -> NaiveDate) -> BTreeMap<&str, Vec<&T>> {
    let mut groups: BTreeMap<&str, Vec<&T>> = BTreeMap::new();
    for r in rows {
        groups.entry(symbol(r)).or_default().push(r);
    }
    for g in groups.values_mut() {
        g.sort_by_key(|r| date(r));
    }
    groups
}

/// Symbols whose row on `target` passes every enabled condition.
///
/// Only rows dated on or before `target` feed the trailing windows. A symbol
/// without a row on `target` never matches. Results are ordered by symbol.
pub fn dragon_tail(rows: &[IndicatorRow], target: NaiveDate, opts: &ScanOptions) -> Vec<DragonTailHit> {
    let divisor = sheet_divisor(rows);
    let visible: Vec<IndicatorRow> = rows.iter().filter(|r| r.date <= target).cloned().collect();
    let groups = group_by_symbol(&visible, |r| r.symbol.as_str(), |r| r.date);

    let mut hits = Vec::new();
    for (_, history) in groups {
        let Some(today) = history.last() else { continue };
        if today.date != target {
            continue;
        }
        let last = history.len() - 1;

        let sheets: Vec<f64> = history.iter().map(|r| r.volume / divisor).collect();
        let lows: Vec<f64> = history.iter().map(|r| r.low).collect();
        let low_120 = rolling_min_min_periods(&lows, 120, 60);
        let vol_ma20 = rolling_mean_min_periods(&sheets, 20, 10);
        let breakout: Vec<bool> = sheets.iter().zip(&vol_ma20).map(|(v, avg)| *v > avg * 2.0).collect();
        let breakout_20d = rolling_any(&breakout, 20);
        let touched_ma20: Vec<bool> = history.iter().map(|r| r.low <= nan(r.ma20)).collect();
        let touched_ma20_3d = rolling_any(&touched_ma20, 3);
        let prev_high = if last > 0 { history[last - 1].high } else { f64::NAN };

        let ma5 = nan(today.ma5);
        let ma10 = nan(today.ma10);
        let ma20 = nan(today.ma20);
        let ma60 = nan(today.ma60);

        let mut matched = sheets[last] >= opts.min_volume;
        if opts.low_base {
            matched &= today.close <= low_120[last] * 1.3;
        }
        if opts.volume_breakout {
            matched &= breakout_20d[last];
        }
        if opts.ma_stack {
            matched &= ma5 > ma10 && ma10 > ma20 && ma20 > ma60;
        }
        if opts.ma20_pullback {
            matched &= touched_ma20_3d[last] && today.close > ma20;
        }
        if opts.red_over_prev_high {
            matched &= today.close > today.open && today.close > prev_high;
        }

        if matched {
            hits.push(DragonTailHit {
                date: today.date,
                symbol: today.symbol.clone(),
                name: today.name.clone(),
                industry: today.industry.clone(),
                close: today.close,
                pct_change: today.pct_change,
                volume_sheets: sheets[last],
                low_120: Some(low_120[last]).filter(|v| v.is_finite()),
                ma20: today.ma20,
                signal_list: today.signal_list.clone(),
            });
        }
    }
    hits
}

#[derive(Debug, Clone, Serialize)]
pub struct StrongStock {
    pub symbol: String,
    pub name: Option<String>,
    pub industry: Option<String>,
    pub close: f64,
    pub pct_change: f64,
    pub volume: f64,
    pub prev_volume: f64,
    pub ma5: f64,
    pub ma10: f64,
    pub ma20: f64,
}

/// Short-term uptrends on `target`: MA5 > MA10 > MA20, close above MA5, a
/// positive day and rising volume. Sorted by percent change, strongest first.
pub fn strong_trend(bars: &[DailyBar], target: NaiveDate) -> Vec<StrongStock> {
    let groups = group_by_symbol(bars, |b| b.symbol.as_str(), |b| b.date);

    let mut picks = Vec::new();
    for (_, history) in groups {
        let Some(last) = history.iter().rposition(|b| b.date == target) else { continue };
        let history = &history[..=last];

        let close: Vec<f64> = history.iter().map(|b| b.close).collect();
        let volume: Vec<f64> = history.iter().map(|b| b.volume).collect();
        let ma5 = rolling_mean(&close, 5)[last];
        let ma10 = rolling_mean(&close, 10)[last];
        let ma20 = rolling_mean(&close, 20)[last];
        let pct = pct_change(&close, 1)[last] * 100.0;
        let prev_volume = shift(&volume, 1)[last];
        let today = history[last];

        let bull_stack = ma5 > ma10 && ma10 > ma20;
        let strong_price = today.close > ma5 && pct > 0.0;
        let volume_up = today.volume > prev_volume;

        if bull_stack && strong_price && volume_up {
            picks.push(StrongStock {
                symbol: today.symbol.clone(),
                name: today.name.clone(),
                industry: today.industry.clone(),
                close: today.close,
                pct_change: pct,
                volume: today.volume,
                prev_volume,
                ma5,
                ma10,
                ma20,
            });
        }
    }

    picks.sort_by(|a, b| b.pct_change.total_cmp(&a.pct_change).then_with(|| a.symbol.cmp(&b.symbol)));
    picks
}

/// Days before the target searched for earlier best-buy hits.
const PAST_HITS_WINDOW_DAYS: i64 = 45;

#[derive(Debug, Clone)]
pub struct BestBuyOptions {
    /// Inclusive percent-change band for the day.
    pub pct_min: f64,
    pub pct_max: f64,
    /// Minimum volume over its 5-day average.
    pub vol_ratio_min: f64,
    /// Keep only these industries; empty keeps all.
    pub industries: Vec<String>,
}

impl Default for BestBuyOptions {
    fn default() -> Self {
        Self {
            pct_min: 3.0,
            pct_max: 6.0,
            vol_ratio_min: 1.0,
            industries: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BestBuySort {
    /// Percent change, highest first.
    #[default]
    PctChange,
    /// Earlier hits in the last 45 days, then percent change.
    PastHits,
    /// Volume ratio, highest first.
    VolRatio,
    Symbol,
}

#[derive(Debug, Clone, Serialize)]
pub struct BestBuyPick {
    pub symbol: String,
    pub name: Option<String>,
    pub industry: Option<String>,
    pub close: f64,
    pub pct_change: f64,
    pub vol_ratio: f64,
    pub past_hits: usize,
}

/// Per-day best-buy condition for one symbol's sorted history.
fn best_buy_mask(history: &[&DailyBar], opts: &BestBuyOptions) -> Vec<bool> {
    let close: Vec<f64> = history.iter().map(|b| b.close).collect();
    let volume: Vec<f64> = history.iter().map(|b| b.volume).collect();
    let ma5 = rolling_mean(&close, 5);
    let ma10 = rolling_mean(&close, 10);
    let ma20 = rolling_mean(&close, 20);
    let vol_ma5 = rolling_mean(&volume, 5);
    let prev_volume = shift(&volume, 1);
    let change = pct_change(&close, 1);

    (0..history.len())
        .map(|i| {
            let pct = change[i] * 100.0;
            let vol_ratio = volume[i] / vol_ma5[i];
            let stacked = ma5[i] > ma10[i] && ma10[i] > ma20[i];
            let above = close[i] > ma10[i] && ma10[i] > ma20[i];
            pct >= opts.pct_min
                && pct <= opts.pct_max
                && vol_ratio >= opts.vol_ratio_min
                && volume[i] > prev_volume[i]
                && (stacked || above)
                && close[i] >= ma10[i]
        })
        .collect()
}

/// Momentum entries on `target`: a moderate gain on rising, above-average
/// volume with the short moving averages stacked. Each pick also counts how
/// often it passed the same screen in the 45 days before `target`.
pub fn best_buy(bars: &[DailyBar], target: NaiveDate, opts: &BestBuyOptions, sort: BestBuySort) -> Vec<BestBuyPick> {
    let groups = group_by_symbol(bars, |b| b.symbol.as_str(), |b| b.date);
    let since = target - Duration::days(PAST_HITS_WINDOW_DAYS);

    let mut picks = Vec::new();
    for (_, history) in groups {
        let Some(last) = history.iter().rposition(|b| b.date == target) else { continue };
        let history = &history[..=last];
        let today = history[last];

        if !opts.industries.is_empty()
            && !today.industry.as_ref().is_some_and(|ind| opts.industries.contains(ind))
        {
            continue;
        }

        let mask = best_buy_mask(history, opts);
        if !mask[last] {
            continue;
        }

        let past_hits = history[..last]
            .iter()
            .zip(&mask)
            .filter(|(b, hit)| **hit && b.date >= since)
            .count();
        let close: Vec<f64> = history.iter().map(|b| b.close).collect();
        let volume: Vec<f64> = history.iter().map(|b| b.volume).collect();

        picks.push(BestBuyPick {
            symbol: today.symbol.clone(),
            name: today.name.clone(),
            industry: today.industry.clone(),
            close: today.close,
            pct_change: pct_change(&close, 1)[last] * 100.0,
            vol_ratio: today.volume / rolling_mean(&volume, 5)[last],
            past_hits,
        });
    }

    match sort {
        BestBuySort::PctChange => {
            picks.sort_by(|a, b| b.pct_change.total_cmp(&a.pct_change).then_with(|| a.symbol.cmp(&b.symbol)))
        }
        BestBuySort::PastHits => picks.sort_by(|a, b| {
            b.past_hits
                .cmp(&a.past_hits)
                .then_with(|| b.pct_change.total_cmp(&a.pct_change))
                .then_with(|| a.symbol.cmp(&b.symbol))
        }),
        BestBuySort::VolRatio => {
            picks.sort_by(|a, b| b.vol_ratio.total_cmp(&a.vol_ratio).then_with(|| a.symbol.cmp(&b.symbol)))
        }
        BestBuySort::Symbol => picks.sort_by(|a, b| a.symbol.cmp(&b.symbol)),
    }
    picks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(i: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Duration::days(i)
    }

    fn indicator(i: i64, symbol: &str, open: f64, high: f64, low: f64, close: f64, volume: f64) -> IndicatorRow {
        IndicatorRow {
            date: day(i),
            symbol: symbol.to_string(),
            name: None,
            industry: None,
            open,
            high,
            low,
            close,
            volume,
            pct_change: None,
            foreign_net: 0.0,
            trust_net: 0.0,
            yoy_pct: None,
            ma5: Some(104.0),
            ma10: Some(103.0),
            ma20: Some(102.0),
            ma60: Some(101.0),
            k: None,
            d: None,
            macd_osc: None,
            dif: None,
            macd: None,
            total_score: None,
            signal_list: None,
        }
    }

    /// 70 quiet sessions around 100, then a volume spike, a dip to MA20 and a
    /// red candle clearing the previous high.
    fn dragon_history(symbol: &str) -> Vec<IndicatorRow> {
        let mut rows: Vec<IndicatorRow> =
            (0..70).map(|i| indicator(i, symbol, 100.0, 101.0, 99.0, 100.0, 1000.0)).collect();
        rows.push(indicator(70, symbol, 100.0, 103.0, 100.0, 102.5, 5000.0));
        rows.push(indicator(71, symbol, 102.0, 102.5, 101.5, 102.0, 1200.0));
        rows.push(indicator(72, symbol, 102.0, 105.0, 101.8, 104.5, 1500.0));
        rows
    }

    #[test]
    fn test_dragon_tail_matches_full_pattern() {
        let rows = dragon_history("2330");
        let hits = dragon_tail(&rows, day(72), &ScanOptions::default());
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].symbol, "2330");
        assert_eq!(hits[0].low_120, Some(99.0));
        assert_eq!(hits[0].volume_sheets, 1500.0);
    }

    #[test]
    fn test_dragon_tail_requires_row_on_target() {
        let rows = dragon_history("2330");
        assert!(dragon_tail(&rows, day(80), &ScanOptions::default()).is_empty());
    }

    #[test]
    fn test_dragon_tail_ignores_future_rows() {
        let mut rows = dragon_history("2330");
        rows.push(indicator(73, "2330", 104.0, 104.0, 90.0, 91.0, 100.0));
        assert_eq!(dragon_tail(&rows, day(72), &ScanOptions::default()).len(), 1);
    }

    #[test]
    fn test_min_volume_always_applies() {
        let rows = dragon_history("2330");
        let opts = ScanOptions {
            min_volume: 2000.0,
            low_base: false,
            volume_breakout: false,
            ma_stack: false,
            ma20_pullback: false,
            red_over_prev_high: false,
        };
        assert!(dragon_tail(&rows, day(72), &opts).is_empty());
        let opts = ScanOptions { min_volume: 1000.0, ..opts };
        assert_eq!(dragon_tail(&rows, day(72), &opts).len(), 1);
    }

    #[test]
    fn test_no_volume_spike_fails_breakout() {
        let mut rows = dragon_history("2330");
        rows[70].volume = 1100.0;
        assert!(dragon_tail(&rows, day(72), &ScanOptions::default()).is_empty());
        let opts = ScanOptions { volume_breakout: false, ..ScanOptions::default() };
        assert_eq!(dragon_tail(&rows, day(72), &opts).len(), 1);
    }

    #[test]
    fn test_short_history_has_no_low_base() {
        // 53 sessions: below the 60 needed for a 120-day low
        let rows: Vec<IndicatorRow> = dragon_history("2330").into_iter().skip(20).collect();
        assert!(dragon_tail(&rows, day(72), &ScanOptions::default()).is_empty());

        let opts = ScanOptions { low_base: false, ..ScanOptions::default() };
        let hits = dragon_tail(&rows, day(72), &opts);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].low_120, None);
    }

    #[test]
    fn test_share_volumes_are_converted_to_sheets() {
        let mut rows = dragon_history("2330");
        for r in rows.iter_mut() {
            r.volume *= 1000.0;
        }
        assert_eq!(sheet_divisor(&rows), 1000.0);
        let hits = dragon_tail(&rows, day(72), &ScanOptions::default());
        assert_eq!(hits[0].volume_sheets, 1500.0);
    }

    fn bar(i: i64, symbol: &str, close: f64, volume: f64) -> DailyBar {
        DailyBar {
            date: day(i),
            symbol: symbol.to_string(),
            name: None,
            industry: None,
            open: close,
            high: close,
            low: close,
            close,
            volume,
            foreign_net: 0.0,
            trust_net: 0.0,
            dealer_net: 0.0,
        }
    }

    #[test]
    fn test_strong_trend_sorted_by_gain() {
        let mut bars = Vec::new();
        for i in 0..25 {
            bars.push(bar(i, "1101", 100.0 + i as f64, 1000.0 + i as f64));
            bars.push(bar(i, "2330", 100.0 + 2.0 * i as f64, 1000.0 + i as f64));
            // falling: never qualifies
            bars.push(bar(i, "2603", 200.0 - i as f64, 1000.0 + i as f64));
        }
        let picks = strong_trend(&bars, day(24));
        let symbols: Vec<&str> = picks.iter().map(|p| p.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["2330", "1101"]);
        assert!((picks[1].pct_change - 100.0 / 123.0).abs() < 1e-9);
        assert_eq!(picks[1].prev_volume, 1023.0);
    }

    #[test]
    fn test_strong_trend_needs_volume_increase_and_full_windows() {
        let mut bars: Vec<DailyBar> = (0..25).map(|i| bar(i, "1101", 100.0 + i as f64, 1000.0)).collect();
        assert!(strong_trend(&bars, day(24)).is_empty());

        bars = (0..10).map(|i| bar(i, "1101", 100.0 + i as f64, 1000.0 + i as f64)).collect();
        assert!(strong_trend(&bars, day(9)).is_empty());
    }

    /// Days of +1% on volume 1000 + i, except `(day, pct, volume)` jumps.
    fn climb(symbol: &str, industry: &str, days: i64, jumps: &[(i64, f64, f64)]) -> Vec<DailyBar> {
        let mut close = 100.0;
        (0..days)
            .map(|i| {
                let (pct, volume) = match jumps.iter().find(|j| j.0 == i) {
                    Some(&(_, pct, volume)) => (pct, volume),
                    None => (1.0, 1000.0 + i as f64),
                };
                if i > 0 {
                    close *= 1.0 + pct / 100.0;
                }
                let mut b = bar(i, symbol, close, volume);
                b.industry = Some(industry.to_string());
                b
            })
            .collect()
    }

    fn board() -> Vec<DailyBar> {
        let mut bars = climb("2330", "半導體", 40, &[(25, 4.0, 3000.0), (32, 4.0, 3000.0), (39, 3.5, 6000.0)]);
        bars.extend(climb("1101", "水泥", 40, &[(39, 5.0, 3000.0)]));
        bars.extend(climb("2317", "電子", 40, &[(28, 4.0, 3000.0), (39, 4.5, 3000.0)]));
        // too hot: above the 6% cap
        bars.extend(climb("2603", "航運", 40, &[(39, 7.0, 3000.0)]));
        // no jump: a 1% day is below the band
        bars.extend(climb("2412", "電信", 40, &[]));
        bars
    }

    fn symbols(picks: &[BestBuyPick]) -> Vec<&str> {
        picks.iter().map(|p| p.symbol.as_str()).collect()
    }

    #[test]
    fn test_best_buy_sort_orders() {
        let bars = board();
        let opts = BestBuyOptions::default();
        let target = day(39);

        let by_pct = best_buy(&bars, target, &opts, BestBuySort::PctChange);
        assert_eq!(symbols(&by_pct), vec!["1101", "2317", "2330"]);
        assert!((by_pct[0].pct_change - 5.0).abs() < 1e-9);

        let by_hits = best_buy(&bars, target, &opts, BestBuySort::PastHits);
        assert_eq!(symbols(&by_hits), vec!["2330", "2317", "1101"]);
        let hits: Vec<usize> = by_hits.iter().map(|p| p.past_hits).collect();
        assert_eq!(hits, vec![2, 1, 0]);

        // 1101 and 2317 share a ratio, so the symbol breaks the tie
        let by_ratio = best_buy(&bars, target, &opts, BestBuySort::VolRatio);
        assert_eq!(symbols(&by_ratio), vec!["2330", "1101", "2317"]);
        assert!((by_ratio[1].vol_ratio - 3000.0 / 1429.2).abs() < 1e-9);

        let by_symbol = best_buy(&bars, target, &opts, BestBuySort::Symbol);
        assert_eq!(symbols(&by_symbol), vec!["1101", "2317", "2330"]);
    }

    #[test]
    fn test_best_buy_past_hits_window() {
        // day 20 is 46 days back; 26 and 60 fall inside [target - 45, target - 1]
        let jumps = [(20, 4.0, 3000.0), (26, 4.0, 3000.0), (60, 4.0, 3000.0), (66, 4.0, 3000.0)];
        let bars = climb("2330", "半導體", 67, &jumps);
        let picks = best_buy(&bars, day(66), &BestBuyOptions::default(), BestBuySort::PctChange);
        assert_eq!(picks.len(), 1);
        assert_eq!(picks[0].past_hits, 2);
    }

    #[test]
    fn test_best_buy_industry_filter_and_bands() {
        let bars = board();
        let opts = BestBuyOptions {
            industries: vec!["半導體".to_string(), "水泥".to_string()],
            ..Default::default()
        };
        let picks = best_buy(&bars, day(39), &opts, BestBuySort::Symbol);
        assert_eq!(symbols(&picks), vec!["1101", "2330"]);

        let opts = BestBuyOptions { pct_max: 8.0, ..Default::default() };
        let picks = best_buy(&bars, day(39), &opts, BestBuySort::Symbol);
        assert_eq!(symbols(&picks), vec!["1101", "2317", "2330", "2603"]);

        let opts = BestBuyOptions { vol_ratio_min: 2.5, ..Default::default() };
        let picks = best_buy(&bars, day(39), &opts, BestBuySort::Symbol);
        assert_eq!(symbols(&picks), vec!["2330"]);
    }

    #[test]
    fn test_best_buy_needs_target_row_and_ma20() {
        let bars = board();
        assert!(best_buy(&bars, day(45), &BestBuyOptions::default(), BestBuySort::Symbol).is_empty());

        // a jump before 20 sessions exist has no MA20
        let bars = climb("2330", "半導體", 15, &[(14, 4.0, 3000.0)]);
        assert!(best_buy(&bars, day(14), &BestBuyOptions::default(), BestBuySort::Symbol).is_empty());
    }
}
