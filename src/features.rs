/// Per-symbol indicator cascade.
///
/// Bars are grouped by symbol, sorted by date, and every column is computed on
/// that symbol's own history so no window ever crosses symbols. Groups are
/// independent and processed in parallel.
use std::collections::BTreeMap;

use log::{debug, warn};
use rayon::prelude::*;
use ta::Next;

use crate::kdj::KdIndicator;
use crate::macd::MacdIndicator;
use crate::model::{DailyBar, RevenueRecord};
use crate::revenue::{RevenueFacts, facts_asof, monthly_facts};
use crate::rolling::{finite_or_nan, pct_change, rolling_max, rolling_mean, rolling_sum, shift, streak};
use crate::weekly::{red_streak_asof, resample_weekly};

/// Cross-sectional ranks of a row among all symbols on the same date.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Ranks {
    pub pct_1d: Option<u32>,
    pub pct_5d: Option<u32>,
    pub foreign_1d: Option<u32>,
    pub foreign_5d: Option<u32>,
    pub trust_1d: Option<u32>,
    pub trust_5d: Option<u32>,
}

/// Every derived column for one (date, symbol). Missing values are `NaN`.
#[derive(Debug, Clone)]
pub struct Features {
    pub bar: DailyBar,
    pub ma5: f64,
    pub ma10: f64,
    pub ma20: f64,
    pub ma60: f64,
    pub vol_ma5: f64,
    pub vol_ma10: f64,
    pub vol_ma20: f64,
    pub prev_close: f64,
    pub prev_volume: f64,
    pub pct_change: f64,
    pub pct_change_3d: f64,
    pub pct_change_5d: f64,
    pub high_3d: f64,
    pub close_max_3d: f64,
    pub vol_max_3d: f64,
    pub k: f64,
    pub d: f64,
    pub prev_k: f64,
    pub prev_d: f64,
    pub dif: f64,
    pub macd: f64,
    pub macd_osc: f64,
    pub prev_macd_osc: f64,
    pub bias_ma5: f64,
    pub bias_ma20: f64,
    pub bias_ma60: f64,
    pub vol_bias_ma5: f64,
    pub vol_bias_ma10: f64,
    pub vol_bias_ma20: f64,
    pub days_above_ma20: u32,
    pub days_above_ma60: u32,
    /// Closes above MA20 within the trailing 47 sessions.
    pub days_above_ma20_47d: f64,
    pub f_buy_streak: u32,
    pub f_sum_5d: f64,
    pub t_buy_streak: u32,
    pub t_sum_5d: f64,
    pub w_red_streak: u32,
    pub revenue: RevenueFacts,
    pub ranks: Ranks,
}

fn bias(value: f64, base: f64) -> f64 {
    finite_or_nan((value - base) / base * 100.0)
}

fn col(bars: &[DailyBar], f: impl Fn(&DailyBar) -> f64) -> Vec<f64> {
    bars.iter().map(f).collect()
}

/// Compute features for one symbol. `bars` must be sorted by date and
/// `revenue` sorted by report month.
pub fn compute_symbol(bars: &[DailyBar], revenue: &[&RevenueRecord]) -> Vec<Features> {
    let n = bars.len();
    let close = col(bars, |b| b.close);
    let open = col(bars, |b| b.open);
    let high = col(bars, |b| b.high);
    let volume = col(bars, |b| b.volume);
    let foreign = col(bars, |b| b.foreign_net);
    let trust = col(bars, |b| b.trust_net);
    let dates: Vec<_> = bars.iter().map(|b| b.date).collect();

    let ma5 = rolling_mean(&close, 5);
    let ma10 = rolling_mean(&close, 10);
    let ma20 = rolling_mean(&close, 20);
    let ma60 = rolling_mean(&close, 60);
    let vol_ma5 = rolling_mean(&volume, 5);
    let vol_ma10 = rolling_mean(&volume, 10);
    let vol_ma20 = rolling_mean(&volume, 20);

    let prev_close = shift(&close, 1);
    let prev_volume = shift(&volume, 1);
    let pct_3d = pct_change(&close, 3);
    let pct_5d = pct_change(&close, 5);
    let high_3d = rolling_max(&high, 3);
    let close_max_3d = rolling_max(&close, 3);
    let vol_max_3d = rolling_max(&volume, 3);

    let mut kd = KdIndicator::default();
    let mut macd = MacdIndicator::default();
    let mut k = Vec::with_capacity(n);
    let mut d = Vec::with_capacity(n);
    let mut dif = Vec::with_capacity(n);
    let mut signal = Vec::with_capacity(n);
    let mut osc = Vec::with_capacity(n);
    for bar in bars {
        match kd.next(bar) {
            Some(out) => {
                k.push(out.k);
                d.push(out.d);
            }
            None => {
                k.push(f64::NAN);
                d.push(f64::NAN);
            }
        }
        let m = macd.next(bar);
        dif.push(m.dif);
        signal.push(m.macd);
        osc.push(m.osc);
    }
    let prev_k = shift(&k, 1);
    let prev_d = shift(&d, 1);
    let prev_osc = shift(&osc, 1);

    let above_ma20: Vec<bool> = close.iter().zip(&ma20).map(|(c, m)| c > m).collect();
    let above_ma60: Vec<bool> = close.iter().zip(&ma60).map(|(c, m)| c > m).collect();
    let days_above_ma20 = streak(&above_ma20);
    let days_above_ma60 = streak(&above_ma60);
    let above_ma20_count = rolling_sum(
        &above_ma20.iter().map(|&a| if a { 1.0 } else { 0.0 }).collect::<Vec<_>>(),
        47,
    );

    let f_buy_streak = streak(&foreign.iter().map(|&v| v > 0.0).collect::<Vec<_>>());
    let t_buy_streak = streak(&trust.iter().map(|&v| v > 0.0).collect::<Vec<_>>());
    let f_sum_5d = rolling_sum(&foreign, 5);
    let t_sum_5d = rolling_sum(&trust, 5);

    let weeks = resample_weekly(&dates, &open, &close);
    let w_red = red_streak_asof(&dates, &weeks);
    let rev = facts_asof(&dates, &monthly_facts(revenue));

    (0..n)
        .map(|i| Features {
            bar: bars[i].clone(),
            ma5: ma5[i],
            ma10: ma10[i],
            ma20: ma20[i],
            ma60: ma60[i],
            vol_ma5: vol_ma5[i],
            vol_ma10: vol_ma10[i],
            vol_ma20: vol_ma20[i],
            prev_close: prev_close[i],
            prev_volume: prev_volume[i],
            pct_change: bias(close[i], prev_close[i]),
            pct_change_3d: pct_3d[i] * 100.0,
            pct_change_5d: pct_5d[i] * 100.0,
            high_3d: high_3d[i],
            close_max_3d: close_max_3d[i],
            vol_max_3d: vol_max_3d[i],
            k: k[i],
            d: d[i],
            prev_k: prev_k[i],
            prev_d: prev_d[i],
            dif: dif[i],
            macd: signal[i],
            macd_osc: osc[i],
            prev_macd_osc: prev_osc[i],
            bias_ma5: bias(close[i], ma5[i]),
            bias_ma20: bias(close[i], ma20[i]),
            bias_ma60: bias(close[i], ma60[i]),
            vol_bias_ma5: bias(volume[i], vol_ma5[i]),
            vol_bias_ma10: bias(volume[i], vol_ma10[i]),
            vol_bias_ma20: bias(volume[i], vol_ma20[i]),
            days_above_ma20: days_above_ma20[i],
            days_above_ma60: days_above_ma60[i],
            days_above_ma20_47d: above_ma20_count[i],
            f_buy_streak: f_buy_streak[i],
            f_sum_5d: f_sum_5d[i],
            t_buy_streak: t_buy_streak[i],
            t_sum_5d: t_sum_5d[i],
            w_red_streak: w_red[i],
            revenue: rev[i],
            ranks: Ranks::default(),
        })
        .collect()
}

/// Group, sort and compute every symbol. Output is ordered by (symbol, date).
pub fn compute_all(bars: Vec<DailyBar>, revenue: &[RevenueRecord]) -> Vec<Features> {
    let mut grouped: BTreeMap<String, Vec<DailyBar>> = BTreeMap::new();
    for mut bar in bars {
        let symbol = bar.symbol.trim();
        if symbol.len() != bar.symbol.len() {
            bar.symbol = symbol.to_string();
        }
        grouped.entry(bar.symbol.clone()).or_default().push(bar);
    }

    let mut revenue_by_symbol: BTreeMap<&str, Vec<&RevenueRecord>> = BTreeMap::new();
    for record in revenue {
        revenue_by_symbol.entry(record.symbol.trim()).or_default().push(record);
    }
    for records in revenue_by_symbol.values_mut() {
        records.sort_by_key(|r| r.report_month);
    }

    debug!("computing features for {} symbols", grouped.len());
    let groups: Vec<(String, Vec<DailyBar>)> = grouped.into_iter().collect();
    groups
        .into_par_iter()
        .flat_map_iter(|(symbol, mut symbol_bars)| {
            symbol_bars.sort_by_key(|b| b.date);
            let before = symbol_bars.len();
            symbol_bars.dedup_by_key(|b| b.date);
            if symbol_bars.len() != before {
                warn!("{}: dropped {} duplicate trading days", symbol, before - symbol_bars.len());
            }
            let records = revenue_by_symbol.get(symbol.as_str()).map(Vec::as_slice).unwrap_or(&[]);
            compute_symbol(&symbol_bars, records)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn bar(day: u32, symbol: &str, close: f64) -> DailyBar {
        DailyBar {
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            symbol: symbol.to_string(),
            name: None,
            industry: None,
            open: close - 1.0,
            high: close + 1.0,
            low: close - 2.0,
            close,
            volume: 1000.0,
            foreign_net: 10.0,
            trust_net: -5.0,
            dealer_net: 0.0,
        }
    }

    #[test]
    fn windows_stay_inside_a_symbol() {
        let mut bars = Vec::new();
        for day in 1..=6 {
            bars.push(bar(day, "1101", 10.0));
            bars.push(bar(day, " 2330 ", 100.0 + day as f64));
        }
        let out = compute_all(bars, &[]);
        assert_eq!(out.len(), 12);
        assert_eq!(out[0].bar.symbol, "1101");
        assert_eq!(out[6].bar.symbol, "2330");
        assert_eq!(out[4].ma5, 10.0);
        assert!(out[6].ma5.is_nan());
        assert!((out[11].ma5 - 104.0).abs() < 1e-9);
        assert!(out[6].prev_close.is_nan());
    }

    #[test]
    fn percent_changes_and_streaks() {
        let bars: Vec<DailyBar> = (1..=6).map(|d| bar(d, "2330", 100.0 + d as f64)).collect();
        let out = compute_symbol(&bars, &[]);
        assert!((out[1].pct_change - 100.0 / 101.0).abs() < 1e-9);
        assert!((out[5].pct_change_5d - (106.0 / 101.0 - 1.0) * 100.0).abs() < 1e-9);
        assert_eq!(out[5].f_buy_streak, 6);
        assert_eq!(out[5].t_buy_streak, 0);
        assert_eq!(out[4].f_sum_5d, 50.0);
        assert_eq!(out[5].high_3d, 107.0);
    }

    #[test]
    fn duplicate_days_are_collapsed() {
        let bars = vec![bar(2, "2330", 10.0), bar(2, "2330", 11.0), bar(3, "2330", 12.0)];
        assert_eq!(compute_all(bars, &[]).len(), 2);
    }
}
