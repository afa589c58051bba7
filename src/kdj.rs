use std::fmt;

use ta::errors::{Result, TaError};
use ta::{Close, High, Low, Next, Period, Reset};

use crate::rolling::Ewm;

/// Stochastic oscillator (%K / %D), 9-3-3 flavour.
///
/// RSV = (close - lowest low) / (highest high - lowest low) * 100 over `period` bars.
/// %K is an exponentially weighted mean of RSV and %D the same mean of %K, both with
/// centre of mass `smoothing` (2.0 gives the classic 1/3 weight on the new value).
///
/// Output is `None` until the first complete window. A flat window (high == low)
/// produces no RSV; K and D then hold their previous values.
///
/// # Links
///
/// * [Stochastic oscillator, Wikipedia](https://en.wikipedia.org/wiki/Stochastic_oscillator)
///
#[doc(alias = "KD")]
#[derive(Debug, Clone)]
pub struct KdIndicator {
    period: usize,
    smoothing: f64,
    count: usize,
    cur_index: usize,
    high_deque: Box<[f64]>,
    low_deque: Box<[f64]>,
    k: Ewm,
    d: Ewm,
}

#[derive(Debug, Clone, PartialEq, Copy)]
pub struct KdOutput {
    pub rsv: Option<f64>,
    pub k: f64,
    pub d: f64,
}

impl KdIndicator {
    pub fn new(period: usize, smoothing: f64) -> Result<Self> {
        if period == 0 || !(smoothing >= 0.0) {
            return Err(TaError::InvalidParameter);
        }
        Ok(Self {
            period,
            smoothing,
            count: 0,
            cur_index: 0,
            high_deque: vec![f64::NEG_INFINITY; period].into_boxed_slice(),
            low_deque: vec![f64::INFINITY; period].into_boxed_slice(),
            k: Ewm::with_com(smoothing),
            d: Ewm::with_com(smoothing),
        })
    }

    fn highest(&self) -> f64 {
        self.high_deque.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    fn lowest(&self) -> f64 {
        self.low_deque.iter().copied().fold(f64::INFINITY, f64::min)
    }

    /// Feed raw high/low/close values.
    pub fn next_hlc(&mut self, high: f64, low: f64, close: f64) -> Option<KdOutput> {
        self.high_deque[self.cur_index] = high;
        self.low_deque[self.cur_index] = low;
        self.count += 1;
        self.cur_index = if self.cur_index + 1 < self.period { self.cur_index + 1 } else { 0 };

        let rsv = if self.count >= self.period {
            let (hh, ll) = (self.highest(), self.lowest());
            let v = (close - ll) / (hh - ll) * 100.0;
            if v.is_finite() { Some(v) } else { None }
        } else {
            None
        };

        let k = self.k.update(rsv.unwrap_or(f64::NAN))?;
        let d = self.d.update(k)?;
        Some(KdOutput { rsv, k, d })
    }
}

impl Period for KdIndicator {
    fn period(&self) -> usize {
        self.period
    }
}

impl<T: Close + High + Low> Next<&T> for KdIndicator {
    type Output = Option<KdOutput>;

    fn next(&mut self, input: &T) -> Self::Output {
        self.next_hlc(input.high(), input.low(), input.close())
    }
}

impl Reset for KdIndicator {
    fn reset(&mut self) {
        self.cur_index = 0;
        self.count = 0;
        for i in 0..self.period {
            self.high_deque[i] = f64::NEG_INFINITY;
            self.low_deque[i] = f64::INFINITY;
        }
        self.k.reset();
        self.d.reset();
    }
}

impl Default for KdIndicator {
    fn default() -> Self {
        Self {
            period: 9,
            smoothing: 2.0,
            count: 0,
            cur_index: 0,
            high_deque: vec![f64::NEG_INFINITY; 9].into_boxed_slice(),
            low_deque: vec![f64::INFINITY; 9].into_boxed_slice(),
            k: Ewm::with_com(2.0),
            d: Ewm::with_com(2.0),
        }
    }
}

impl fmt::Display for KdIndicator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match (self.k.value(), self.d.value()) {
            (Some(k), Some(d)) => write!(f, "KD({}, {}: K:{:2.2} D:{:2.2})", self.period, self.smoothing, k, d),
            _ => write!(f, "KD({}, {})", self.period, self.smoothing),
        }
    }
}
