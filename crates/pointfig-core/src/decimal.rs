//! Exact decimal helpers for the column arithmetic
//!
//! All price math in the engine runs on `rust_decimal::Decimal`: a 96-bit
//! scaled integer giving 28 significant digits with no binary rounding.
//! Box-boundary equality and snapshot round-trips depend on this: a price
//! exactly on `top + box_size` must compare equal, and a chart serialized
//! and reloaded must compare equal to the original.
//!
//! This module adds the handful of operations the engine needs beyond the
//! `Decimal` API itself: parsing with a domain error, rescaling to a decimal
//! exponent with banker's rounding, non-negative integer powers, and checked
//! division/remainder that surface a zero divisor as a domain error.

use crate::errors::ChartError;
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

/// Parse a decimal from text, tolerating surrounding whitespace.
///
/// Round-trips with `Decimal::to_string` at the stored precision.
pub fn parse(s: &str) -> Result<Decimal, ChartError> {
    let trimmed = s.trim();
    Decimal::from_str(trimmed).map_err(|_| ChartError::MalformedDecimal {
        value: trimmed.to_string(),
    })
}

/// Decimal exponent of the stored representation.
///
/// A value with `k` fractional digits has exponent `-k`; whole numbers
/// without trailing fraction have exponent 0. Percent-scale columns derive
/// their working precision from `exponent(box_size) - 1`.
pub fn exponent(value: Decimal) -> i32 {
    -(value.scale() as i32)
}

/// Round `value` to the given decimal exponent using round-half-even.
///
/// Banker's rounding keeps the multiplicative percent-scale iteration
/// stable: repeated up/down factor applications land back on the same
/// representation instead of drifting one unit per round trip.
///
/// A non-positive exponent rounds to `-exponent` fractional digits and the
/// result keeps exactly that many digits, so the stored exponent of the
/// output is the requested one. A positive exponent rounds to a multiple of
/// `10^exponent`.
pub fn rescale(value: Decimal, exponent: i32) -> Decimal {
    if exponent <= 0 {
        let dp = (-exponent) as u32;
        let mut out =
            value.round_dp_with_strategy(dp, RoundingStrategy::MidpointNearestEven);
        // Pad trailing zeros so the stored exponent is exact; no further
        // rounding happens here since the scale only grows.
        out.rescale(dp);
        out
    } else {
        let factor = pow10(exponent as u32);
        let scaled =
            (value / factor).round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven);
        scaled * factor
    }
}

/// `base^exp` for a non-negative integer exponent, by repeated
/// multiplication. Exact: never routes through a float.
pub fn pow_int(base: Decimal, exp: u32) -> Decimal {
    let mut result = Decimal::ONE;
    for _ in 0..exp {
        result *= base;
    }
    result
}

/// Division with the zero divisor surfaced as a `DomainError`.
pub fn checked_div(dividend: Decimal, divisor: Decimal) -> Result<Decimal, ChartError> {
    dividend
        .checked_div(divisor)
        .ok_or_else(|| ChartError::domain("division by zero"))
}

/// Truncated modulo: `a - trunc(a / b) * b`, sign following the dividend.
pub fn mod_trunc(dividend: Decimal, divisor: Decimal) -> Result<Decimal, ChartError> {
    dividend
        .checked_rem(divisor)
        .ok_or_else(|| ChartError::domain("modulo by zero"))
}

fn pow10(exp: u32) -> Decimal {
    pow_int(Decimal::TEN, exp)
}
