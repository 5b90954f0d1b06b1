//! Average True Range helper
//!
//! Used by callers to size boxes from historical volatility before a chart
//! is constructed; not part of the column state machine.

use crate::errors::ChartError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Daily OHLC row. Adjusted fields use the camelCase names end-of-day
/// feeds deliver, so rows deserialize straight out of the provider payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OhlcBar {
    pub date: String,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    #[serde(rename = "adjOpen")]
    pub adj_open: Decimal,
    #[serde(rename = "adjHigh")]
    pub adj_high: Decimal,
    #[serde(rename = "adjLow")]
    pub adj_low: Decimal,
    #[serde(rename = "adjClose")]
    pub adj_close: Decimal,
}

/// Whether ATR reads the split/dividend-adjusted OHLC fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UseAdjusted {
    No,
    Yes,
}

/// Wilder-style average true range.
///
/// `bars` must be ordered descending by date (most recent first). The true
/// range of row `i` is `max(high - low, |high - prev_close|,
/// |low - prev_close|)` with `prev_close` taken from row `i + 1`; the
/// result is the arithmetic mean of the first `n_days` true ranges.
///
/// Fails with `InsufficientData` unless `bars.len() > n_days`.
pub fn compute_atr(
    bars: &[OhlcBar],
    n_days: usize,
    use_adjusted: UseAdjusted,
) -> Result<Decimal, ChartError> {
    if n_days == 0 || bars.len() <= n_days {
        return Err(ChartError::InsufficientData {
            required: n_days,
            actual: bars.len(),
        });
    }

    let mut total = Decimal::ZERO;
    for i in 0..n_days {
        let (high, low) = match use_adjusted {
            UseAdjusted::Yes => (bars[i].adj_high, bars[i].adj_low),
            UseAdjusted::No => (bars[i].high, bars[i].low),
        };
        let prev_close = match use_adjusted {
            UseAdjusted::Yes => bars[i + 1].adj_close,
            UseAdjusted::No => bars[i + 1].close,
        };

        let true_range = (high - low)
            .max((high - prev_close).abs())
            .max((low - prev_close).abs());
        total += true_range;
    }

    Ok(total / Decimal::from(n_days as u64))
}
