use chrono::NaiveDate;

use crate::model::RevenueRecord;
use crate::rolling::{expanding_max, streak};

/// Monthly revenue facts attached to a daily row.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RevenueFacts {
    /// Revenue matches the running all-time high (and is positive).
    pub is_ath: bool,
    /// Consecutive months of positive YoY growth.
    pub yoy_streak: u32,
    pub yoy_pct: f64,
    pub yoy_accumulated_pct: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RevenueMonth {
    pub report_month: NaiveDate,
    pub facts: RevenueFacts,
}

/// Derive per-month facts for one symbol. Records must be sorted by month.
pub fn monthly_facts(records: &[&RevenueRecord]) -> Vec<RevenueMonth> {
    let revenue: Vec<f64> = records.iter().map(|r| r.rev_current.unwrap_or(f64::NAN)).collect();
    let running_max = expanding_max(&revenue);
    let growing: Vec<bool> = records.iter().map(|r| r.yoy_pct.is_some_and(|y| y > 0.0)).collect();
    let streaks = streak(&growing);

    records
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let rev = revenue[i];
            RevenueMonth {
                report_month: r.report_month,
                facts: RevenueFacts {
                    is_ath: !rev.is_nan() && rev > 0.0 && rev >= running_max[i],
                    yoy_streak: streaks[i],
                    yoy_pct: r.yoy_pct.unwrap_or(0.0),
                    yoy_accumulated_pct: r.yoy_accumulated_pct.unwrap_or(0.0),
                },
            }
        })
        .collect()
}

/// Latest report on or before each daily date; defaults when none exists.
pub fn facts_asof(dates: &[NaiveDate], months: &[RevenueMonth]) -> Vec<RevenueFacts> {
    dates
        .iter()
        .map(|d| {
            let idx = months.partition_point(|m| m.report_month <= *d);
            if idx == 0 { RevenueFacts::default() } else { months[idx - 1].facts }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(month: u32, rev: Option<f64>, yoy: Option<f64>) -> RevenueRecord {
        RevenueRecord {
            report_month: NaiveDate::from_ymd_opt(2024, month, 1).unwrap(),
            symbol: "2330".to_string(),
            rev_current: rev,
            yoy_pct: yoy,
            yoy_accumulated_pct: Some(12.5),
        }
    }

    #[test]
    fn all_time_high_and_growth_streak() {
        let records = [
            rec(1, Some(100.0), Some(5.0)),
            rec(2, Some(90.0), Some(3.0)),
            rec(3, Some(120.0), Some(-1.0)),
            rec(4, None, Some(8.0)),
            rec(5, Some(120.0), Some(2.0)),
        ];
        let refs: Vec<&RevenueRecord> = records.iter().collect();
        let months = monthly_facts(&refs);
        let ath: Vec<bool> = months.iter().map(|m| m.facts.is_ath).collect();
        assert_eq!(ath, vec![true, false, true, false, true]);
        let streaks: Vec<u32> = months.iter().map(|m| m.facts.yoy_streak).collect();
        assert_eq!(streaks, vec![1, 2, 0, 1, 2]);
    }

    #[test]
    fn zero_revenue_is_never_a_high() {
        let records = [rec(1, Some(0.0), None)];
        let refs: Vec<&RevenueRecord> = records.iter().collect();
        assert!(!monthly_facts(&refs)[0].facts.is_ath);
    }

    #[test]
    fn asof_join_backwards() {
        let records = [rec(2, Some(10.0), Some(1.0)), rec(3, Some(5.0), Some(-2.0))];
        let refs: Vec<&RevenueRecord> = records.iter().collect();
        let months = monthly_facts(&refs);
        let dates = [
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 20).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        ];
        let facts = facts_asof(&dates, &months);
        assert_eq!(facts[0], RevenueFacts::default());
        assert_eq!(facts[1].yoy_pct, 1.0);
        assert!(facts[1].is_ath);
        assert_eq!(facts[2].yoy_pct, -2.0);
        assert_eq!(facts[2].yoy_accumulated_pct, 12.5);
    }
}
