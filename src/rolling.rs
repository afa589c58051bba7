/// Column kernels for per-symbol time series.
///
/// Every series is a `Vec<f64>` aligned with the symbol's bars, with `NaN`
/// marking a missing value. Window functions only produce a value once the
/// window is full and NaN-free, so warm-up rows stay missing.

/// Rolling aggregate over a fixed window.
fn rolling_by(values: &[f64], window: usize, agg: impl Fn(&[f64]) -> f64) -> Vec<f64> {
    if window == 0 {
        return vec![f64::NAN; values.len()];
    }
    (0..values.len())
        .map(|i| {
            if i + 1 < window {
                return f64::NAN;
            }
            let slice = &values[i + 1 - window..=i];
            if slice.iter().any(|v| v.is_nan()) {
                f64::NAN
            } else {
                agg(slice)
            }
        })
        .collect()
}

/// Simple moving average.
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    rolling_by(values, window, |s| s.iter().sum::<f64>() / s.len() as f64)
}

pub fn rolling_sum(values: &[f64], window: usize) -> Vec<f64> {
    rolling_by(values, window, |s| s.iter().sum())
}

pub fn rolling_max(values: &[f64], window: usize) -> Vec<f64> {
    rolling_by(values, window, |s| s.iter().copied().fold(f64::NEG_INFINITY, f64::max))
}

pub fn rolling_min(values: &[f64], window: usize) -> Vec<f64> {
    rolling_by(values, window, |s| s.iter().copied().fold(f64::INFINITY, f64::min))
}

/// Rolling aggregate that tolerates a partially filled window.
///
/// A value is produced once at least `min_periods` non-missing observations
/// fall inside the trailing window; missing values are skipped.
fn rolling_partial_by(
    values: &[f64],
    window: usize,
    min_periods: usize,
    agg: impl Fn(&[f64]) -> f64,
) -> Vec<f64> {
    (0..values.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(window);
            let observed: Vec<f64> = values[start..=i].iter().copied().filter(|v| !v.is_nan()).collect();
            if observed.is_empty() || observed.len() < min_periods {
                f64::NAN
            } else {
                agg(&observed)
            }
        })
        .collect()
}

pub fn rolling_mean_min_periods(values: &[f64], window: usize, min_periods: usize) -> Vec<f64> {
    rolling_partial_by(values, window, min_periods, |s| s.iter().sum::<f64>() / s.len() as f64)
}

pub fn rolling_min_min_periods(values: &[f64], window: usize, min_periods: usize) -> Vec<f64> {
    rolling_partial_by(values, window, min_periods, |s| {
        s.iter().copied().fold(f64::INFINITY, f64::min)
    })
}

/// Whether any flag in the trailing window (including the current row) is set.
pub fn rolling_any(flags: &[bool], window: usize) -> Vec<bool> {
    (0..flags.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(window);
            flags[start..=i].iter().any(|&f| f)
        })
        .collect()
}

/// Lag a series by `n` rows.
pub fn shift(values: &[f64], n: usize) -> Vec<f64> {
    (0..values.len())
        .map(|i| if i >= n { values[i - n] } else { f64::NAN })
        .collect()
}

/// Fractional change against the value `n` rows earlier.
pub fn pct_change(values: &[f64], n: usize) -> Vec<f64> {
    (0..values.len())
        .map(|i| {
            if i < n {
                return f64::NAN;
            }
            finite_or_nan(values[i] / values[i - n] - 1.0)
        })
        .collect()
}

/// Length of the current run of `true` flags; zero on a `false` row.
pub fn streak(flags: &[bool]) -> Vec<u32> {
    let mut run = 0u32;
    flags
        .iter()
        .map(|&f| {
            run = if f { run + 1 } else { 0 };
            run
        })
        .collect()
}

/// Running maximum, skipping missing values.
pub fn expanding_max(values: &[f64]) -> Vec<f64> {
    let mut best = f64::NAN;
    values
        .iter()
        .map(|&v| {
            if !v.is_nan() && (best.is_nan() || v > best) {
                best = v;
            }
            best
        })
        .collect()
}

/// Descending rank where ties share the lowest rank ("min" method).
///
/// Missing values are not ranked and do not count against other entries.
pub fn rank_desc_min(values: &[f64]) -> Vec<Option<u32>> {
    let mut present: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    present.sort_by(|a, b| b.total_cmp(a));
    values
        .iter()
        .map(|&v| {
            if v.is_nan() {
                return None;
            }
            // entries strictly greater than v come first in the sorted slice
            let greater = present.partition_point(|&p| p > v);
            Some(greater as u32 + 1)
        })
        .collect()
}

/// Map infinities to NaN so a zero divisor reads as "missing".
pub fn finite_or_nan(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        f64::NAN
    }
}

/// Missing-aware optional view of a kernel value.
pub fn to_opt(v: f64) -> Option<f64> {
    if v.is_finite() {
        Some(v)
    } else {
        None
    }
}

/// Exponentially weighted mean with recursive (`adjust = false`) weighting.
///
/// The mean starts at the first observed value. A missing input after that
/// repeats the previous mean but keeps decaying the old weight, so the next
/// observation is blended as `(w * mean + alpha * x) / (w + alpha)` with
/// `w = (1 - alpha)^(gap + 1)`.
#[derive(Debug, Clone)]
pub struct Ewm {
    alpha: f64,
    mean: Option<f64>,
    old_weight: f64,
}

impl Ewm {
    pub fn with_alpha(alpha: f64) -> Self {
        Self { alpha, mean: None, old_weight: 1.0 }
    }

    /// Centre-of-mass parametrisation: `alpha = 1 / (1 + com)`.
    pub fn with_com(com: f64) -> Self {
        Self::with_alpha(1.0 / (1.0 + com))
    }

    /// Span parametrisation: `alpha = 2 / (span + 1)`.
    pub fn with_span(span: f64) -> Self {
        Self::with_alpha(2.0 / (span + 1.0))
    }

    pub fn update(&mut self, x: f64) -> Option<f64> {
        let observed = !x.is_nan();
        match self.mean {
            None => {
                if observed {
                    self.mean = Some(x);
                    self.old_weight = 1.0;
                }
            }
            Some(mean) => {
                self.old_weight *= 1.0 - self.alpha;
                if observed {
                    let blended = (self.old_weight * mean + self.alpha * x) / (self.old_weight + self.alpha);
                    self.mean = Some(blended);
                    self.old_weight = 1.0;
                }
            }
        }
        self.mean
    }

    pub fn value(&self) -> Option<f64> {
        self.mean
    }

    pub fn reset(&mut self) {
        self.mean = None;
        self.old_weight = 1.0;
    }
}
