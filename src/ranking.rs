use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::features::{Features, Ranks};
use crate::rolling::rank_desc_min;

/// Keep only strictly positive values; the rest are not ranked.
fn positive(v: f64) -> f64 {
    if v > 0.0 { v } else { f64::NAN }
}

/// Rank every selected row against the other selected rows on the same date.
///
/// Price ranks cover every symbol with a value; institutional ranks only cover
/// symbols with net buying (or a positive 5-day sum).
pub fn assign_ranks(rows: &mut [Features], selected: &[bool]) {
    let mut by_date: BTreeMap<NaiveDate, Vec<usize>> = BTreeMap::new();
    for (i, row) in rows.iter().enumerate() {
        if selected[i] {
            by_date.entry(row.bar.date).or_default().push(i);
        }
    }

    for indices in by_date.values() {
        let column = |f: &dyn Fn(&Features) -> f64| -> Vec<Option<u32>> {
            let values: Vec<f64> = indices.iter().map(|&i| f(&rows[i])).collect();
            rank_desc_min(&values)
        };
        let pct_1d = column(&|r| r.pct_change);
        let pct_5d = column(&|r| r.pct_change_5d);
        let foreign_1d = column(&|r| positive(r.bar.foreign_net));
        let foreign_5d = column(&|r| positive(r.f_sum_5d));
        let trust_1d = column(&|r| positive(r.bar.trust_net));
        let trust_5d = column(&|r| positive(r.t_sum_5d));

        for (j, &i) in indices.iter().enumerate() {
            rows[i].ranks = Ranks {
                pct_1d: pct_1d[j],
                pct_5d: pct_5d[j],
                foreign_1d: foreign_1d[j],
                foreign_5d: foreign_5d[j],
                trust_1d: trust_1d[j],
                trust_5d: trust_5d[j],
            };
        }
    }
}
