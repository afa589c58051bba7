/// Weekly candles (weeks ending Friday) and the red-week streak joined back
/// onto daily rows.
use chrono::{Datelike, Duration, NaiveDate, Weekday};

use crate::rolling::streak;

#[derive(Debug, Clone, PartialEq)]
pub struct WeeklyCandle {
    /// The Friday that closes the week.
    pub week_end: NaiveDate,
    pub open: f64,
    pub close: f64,
    pub red_streak: u32,
}

/// Friday on or after `date`.
pub fn week_ending_friday(date: NaiveDate) -> NaiveDate {
    let from_monday = date.weekday().num_days_from_monday() as i64;
    let friday = Weekday::Fri.num_days_from_monday() as i64;
    date + Duration::days((friday - from_monday).rem_euclid(7))
}

/// Resample one symbol's daily bars (sorted by date) into weekly candles.
///
/// Open is the first non-missing open in the week and close the last
/// non-missing close; weeks lacking either are dropped before the streak is
/// counted.
pub fn resample_weekly(dates: &[NaiveDate], opens: &[f64], closes: &[f64]) -> Vec<WeeklyCandle> {
    let mut weeks: Vec<(NaiveDate, f64, f64)> = Vec::new();
    for i in 0..dates.len() {
        let label = week_ending_friday(dates[i]);
        match weeks.last_mut() {
            Some(last) if last.0 == label => {
                if last.1.is_nan() {
                    last.1 = opens[i];
                }
                if !closes[i].is_nan() {
                    last.2 = closes[i];
                }
            }
            _ => weeks.push((label, opens[i], closes[i])),
        }
    }
    weeks.retain(|(_, open, close)| !open.is_nan() && !close.is_nan());

    let red: Vec<bool> = weeks.iter().map(|(_, open, close)| close > open).collect();
    weeks
        .into_iter()
        .zip(streak(&red))
        .map(|((week_end, open, close), red_streak)| WeeklyCandle { week_end, open, close, red_streak })
        .collect()
}

/// Backward as-of lookup: the red streak of the latest week whose Friday is on
/// or before each daily date; 0 when no week has closed yet.
pub fn red_streak_asof(dates: &[NaiveDate], weeks: &[WeeklyCandle]) -> Vec<u32> {
    dates
        .iter()
        .map(|d| {
            let idx = weeks.partition_point(|w| w.week_end <= *d);
            if idx == 0 { 0 } else { weeks[idx - 1].red_streak }
        })
        .collect()
}
