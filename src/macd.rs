use std::fmt;

use ta::errors::{Result, TaError};
use ta::{Close, Next, Reset};

use crate::rolling::Ewm;

/// MACD (Moving Average Convergence Divergence)
///
/// # Formula
///
/// DIF = EMA(fast) - EMA(slow)
/// MACD = EMA(signal) of DIF
/// OSC = DIF - MACD
///
/// Each EMA is a span-parametrised [`Ewm`] (`alpha = 2 / (period + 1)`)
/// seeded with its first input, so output is available from the first close.
/// A missing close holds the fast and slow averages, so DIF repeats and the
/// signal line keeps smoothing it.
///
/// # Example
///
/// ```
/// use stock_warroom::macd::MacdIndicator;
/// use ta::Next;
///
/// let mut macd = MacdIndicator::new(12, 26, 9).unwrap();
/// let out = macd.next(10.0);
/// assert_eq!(out.dif, 0.0);
/// ```
///
/// # Links
///
/// * [MACD, Wikipedia](https://en.wikipedia.org/wiki/MACD)
///
#[doc(alias = "MACD")]
#[derive(Debug, Clone)]
pub struct MacdIndicator {
    fast_period: usize,
    slow_period: usize,
    signal_period: usize,
    fast: Ewm,
    slow: Ewm,
    signal: Ewm,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacdOutput {
    pub dif: f64,
    pub macd: f64,
    pub osc: f64,
}

impl MacdIndicator {
    pub fn new(fast_period: usize, slow_period: usize, signal_period: usize) -> Result<Self> {
        if fast_period == 0 || slow_period == 0 || signal_period == 0 {
            return Err(TaError::InvalidParameter);
        }
        if fast_period >= slow_period {
            return Err(TaError::InvalidParameter);
        }
        Ok(Self::with_periods(fast_period, slow_period, signal_period))
    }

    fn with_periods(fast_period: usize, slow_period: usize, signal_period: usize) -> Self {
        Self {
            fast_period,
            slow_period,
            signal_period,
            fast: Ewm::with_span(fast_period as f64),
            slow: Ewm::with_span(slow_period as f64),
            signal: Ewm::with_span(signal_period as f64),
        }
    }
}

impl Next<f64> for MacdIndicator {
    type Output = MacdOutput;

    fn next(&mut self, input: f64) -> Self::Output {
        let fast = self.fast.update(input).unwrap_or(f64::NAN);
        let slow = self.slow.update(input).unwrap_or(f64::NAN);
        let dif = fast - slow;
        let macd = self.signal.update(dif).unwrap_or(f64::NAN);
        MacdOutput {
            dif,
            macd,
            osc: dif - macd,
        }
    }
}

impl<T: Close> Next<&T> for MacdIndicator {
    type Output = MacdOutput;

    fn next(&mut self, input: &T) -> Self::Output {
        self.next(input.close())
    }
}

impl Reset for MacdIndicator {
    fn reset(&mut self) {
        self.fast.reset();
        self.slow.reset();
        self.signal.reset();
    }
}

impl Default for MacdIndicator {
    fn default() -> Self {
        Self::with_periods(12, 26, 9)
    }
}

impl fmt::Display for MacdIndicator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "MACD({}, {}, {})", self.fast_period, self.slow_period, self.signal_period)
    }
}

impl fmt::Display for MacdOutput {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "DIF: {:.4}, MACD: {:.4}, OSC: {:.4}", self.dif, self.macd, self.osc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct TestBar {
        close: f64,
    }

    impl Close for TestBar {
        fn close(&self) -> f64 {
            self.close
        }
    }

    #[test]
    fn test_new() {
        assert!(MacdIndicator::new(12, 26, 9).is_ok());
        assert!(MacdIndicator::new(0, 26, 9).is_err());
        assert!(MacdIndicator::new(12, 0, 9).is_err());
        assert!(MacdIndicator::new(12, 26, 0).is_err());
        assert!(MacdIndicator::new(26, 12, 9).is_err());
    }

    #[test]
    fn test_first_value_is_flat() {
        let mut macd = MacdIndicator::default();
        let out = macd.next(&TestBar { close: 42.0 });
        assert_eq!(out, MacdOutput { dif: 0.0, macd: 0.0, osc: 0.0 });
    }

    #[test]
    fn test_second_value_by_hand() {
        let mut macd = MacdIndicator::new(12, 26, 9).unwrap();
        macd.next(10.0);
        let out = macd.next(11.0);
        let fast = 10.0 + (11.0 - 10.0) * 2.0 / 13.0;
        let slow = 10.0 + (11.0 - 10.0) * 2.0 / 27.0;
        let dif = fast - slow;
        let signal = dif * 0.2;
        assert!((out.dif - dif).abs() < 1e-12);
        assert!((out.macd - signal).abs() < 1e-12);
        assert!((out.osc - (dif - signal)).abs() < 1e-12);
    }

    #[test]
    fn test_uptrend_positive_dif() {
        let mut macd = MacdIndicator::default();
        let mut last = None;
        for i in 0..40 {
            last = Some(macd.next(100.0 + i as f64));
        }
        let out = last.unwrap();
        assert!(out.dif > 0.0);
        assert!(out.macd > 0.0);
    }

    #[test]
    fn test_reset() {
        let mut macd = MacdIndicator::default();
        macd.next(10.0);
        macd.next(20.0);
        macd.reset();
        let out = macd.next(5.0);
        assert_eq!(out.dif, 0.0);
    }

    #[test]
    fn test_matches_span_ewms() {
        let closes = [10.0, 10.5, 9.8, 11.2, 12.0, 11.7, 12.4];
        let mut macd = MacdIndicator::new(3, 6, 4).unwrap();
        let mut fast = Ewm::with_span(3.0);
        let mut slow = Ewm::with_span(6.0);
        let mut signal = Ewm::with_span(4.0);
        for close in closes {
            let out = macd.next(close);
            let dif = fast.update(close).unwrap() - slow.update(close).unwrap();
            let sig = signal.update(dif).unwrap();
            assert!((out.dif - dif).abs() < 1e-12);
            assert!((out.macd - sig).abs() < 1e-12);
            assert!((out.osc - (dif - sig)).abs() < 1e-12);
        }
    }

    #[test]
    fn test_missing_close_holds_dif() {
        let mut macd = MacdIndicator::default();
        macd.next(10.0);
        let before = macd.next(11.0);
        let held = macd.next(f64::NAN);
        assert_eq!(held.dif, before.dif);
        assert!((held.macd - (before.macd + (before.dif - before.macd) * 0.2)).abs() < 1e-12);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", MacdIndicator::default()), "MACD(12, 26, 9)");
        let out = MacdOutput { dif: 1.0, macd: 0.5, osc: 0.5 };
        assert_eq!(format!("{}", out), "DIF: 1.0000, MACD: 0.5000, OSC: 0.5000");
    }
}
