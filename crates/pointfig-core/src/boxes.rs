//! Box configuration for a chart
//!
//! A `Boxes` value bundles the quantization parameters every column of a
//! chart shares: the box size, whether incoming prices are truncated to
//! whole numbers first, and whether boxes stack additively (linear) or
//! multiplicatively (percent). It is immutable after construction; columns
//! borrow it per operation and never store it.

use crate::decimal;
use crate::errors::ChartError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How box boundaries grow along the price axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoxScale {
    /// Boxes are a fixed price interval
    Linear,
    /// Boxes are a fixed ratio (`1 + box_size`)
    Percent,
}

/// How incoming prices are conditioned before box math
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoxType {
    /// Truncate prices toward zero before use (linear scale only)
    Integral,
    /// Use prices as-is
    Fractional,
}

/// Immutable box configuration shared by all columns of a chart.
///
/// For percent scale the constructor precomputes the multiplicative
/// factors once so every column iterates with identical, deterministically
/// rescaled values:
///
/// - `up_factor = 1 + box_size`
/// - `down_factor = 1 / up_factor`, rescaled to `percent_exponent`
/// - `percent_exponent = exponent(box_size) - 1`
#[derive(Debug, Clone, PartialEq)]
pub struct Boxes {
    box_size: Decimal,
    box_type: BoxType,
    box_scale: BoxScale,
    up_factor: Decimal,
    down_factor: Decimal,
    percent_exponent: i32,
}

impl Boxes {
    /// Build a validated configuration. Fails with a `DomainError` when
    /// `box_size` is not strictly positive.
    pub fn new(box_size: Decimal, box_type: BoxType, box_scale: BoxScale) -> Result<Self, ChartError> {
        if box_size <= Decimal::ZERO {
            return Err(ChartError::domain(format!(
                "box_size must be positive, got {box_size}"
            )));
        }

        let percent_exponent = decimal::exponent(box_size) - 1;
        let up_factor = Decimal::ONE + box_size;
        let down_factor = decimal::rescale(
            decimal::checked_div(Decimal::ONE, up_factor)?,
            percent_exponent,
        );

        Ok(Self {
            box_size,
            box_type,
            box_scale,
            up_factor,
            down_factor,
            percent_exponent,
        })
    }

    pub fn box_size(&self) -> Decimal {
        self.box_size
    }

    pub fn box_type(&self) -> BoxType {
        self.box_type
    }

    pub fn box_scale(&self) -> BoxScale {
        self.box_scale
    }

    pub fn is_percent(&self) -> bool {
        self.box_scale == BoxScale::Percent
    }

    /// Multiplicative one-box-up factor (percent scale)
    pub fn up_factor(&self) -> Decimal {
        self.up_factor
    }

    /// Multiplicative one-box-down factor (percent scale)
    pub fn down_factor(&self) -> Decimal {
        self.down_factor
    }

    /// Working decimal exponent for percent-scale boundary values
    pub fn percent_exponent(&self) -> i32 {
        self.percent_exponent
    }

    /// Condition a price per the box type: truncate toward zero for
    /// integral boxes, pass through for fractional ones.
    pub fn conditioned(&self, value: Decimal) -> Decimal {
        match self.box_type {
            BoxType::Integral => value.trunc(),
            BoxType::Fractional => value,
        }
    }

    /// Round a value down to the nearest box boundary.
    ///
    /// Linear scale: `v - (v mod box_size)` on the conditioned value, the
    /// largest multiple of `box_size` not exceeding it. Percent scale
    /// returns the value unchanged: percent columns seed from the raw
    /// price.
    pub fn round_down_to_box(&self, value: Decimal) -> Decimal {
        match self.box_scale {
            BoxScale::Percent => value,
            BoxScale::Linear => {
                let conditioned = self.conditioned(value);
                // box_size > 0 is a construction invariant, so the modulo
                // cannot fail
                let remainder = decimal::mod_trunc(conditioned, self.box_size)
                    .unwrap_or(Decimal::ZERO);
                conditioned - remainder
            }
        }
    }

    /// Additive distance of an n-box move (linear scale):
    /// `n × box_size`.
    pub fn reversal_distance(&self, reversal_boxes: u32) -> Decimal {
        Decimal::from(reversal_boxes) * self.box_size
    }

    /// `up_factor^n` rescaled to the working exponent: the multiplicative
    /// threshold for an n-box move up.
    pub fn reversal_up_factor(&self, reversal_boxes: u32) -> Decimal {
        decimal::rescale(
            decimal::pow_int(self.up_factor, reversal_boxes),
            self.percent_exponent,
        )
    }

    /// `down_factor^n` rescaled to the working exponent: the multiplicative
    /// threshold for an n-box move down.
    pub fn reversal_down_factor(&self, reversal_boxes: u32) -> Decimal {
        decimal::rescale(
            decimal::pow_int(self.down_factor, reversal_boxes),
            self.percent_exponent,
        )
    }
}

impl fmt::Display for BoxScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoxScale::Linear => write!(f, "linear"),
            BoxScale::Percent => write!(f, "percent"),
        }
    }
}

impl fmt::Display for BoxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoxType::Integral => write!(f, "integral"),
            BoxType::Fractional => write!(f, "fractional"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn rejects_non_positive_box_size() {
        assert!(Boxes::new(dec!(0), BoxType::Integral, BoxScale::Linear).is_err());
        assert!(Boxes::new(dec!(-1), BoxType::Integral, BoxScale::Linear).is_err());
        assert!(Boxes::new(dec!(0.01), BoxType::Fractional, BoxScale::Linear).is_ok());
    }

    #[test]
    fn round_down_integral_unit_box() {
        let boxes = Boxes::new(dec!(1), BoxType::Integral, BoxScale::Linear).unwrap();
        assert_eq!(boxes.round_down_to_box(dec!(10)), dec!(10));
        assert_eq!(boxes.round_down_to_box(dec!(10.7)), dec!(10));
        assert_eq!(boxes.round_down_to_box(dec!(0.9)), dec!(0));
    }

    #[test]
    fn round_down_non_unit_box() {
        let boxes = Boxes::new(dec!(5), BoxType::Integral, BoxScale::Linear).unwrap();
        assert_eq!(boxes.round_down_to_box(dec!(23)), dec!(20));
        assert_eq!(boxes.round_down_to_box(dec!(25)), dec!(25));

        let fractional = Boxes::new(dec!(0.5), BoxType::Fractional, BoxScale::Linear).unwrap();
        assert_eq!(fractional.round_down_to_box(dec!(10.7)), dec!(10.5));
        assert_eq!(fractional.round_down_to_box(dec!(10.5)), dec!(10.5));
    }

    #[test]
    fn percent_round_down_is_identity() {
        let boxes = Boxes::new(dec!(0.04), BoxType::Fractional, BoxScale::Percent).unwrap();
        assert_eq!(boxes.round_down_to_box(dec!(101.37)), dec!(101.37));
    }

    #[test]
    fn percent_factors() {
        let boxes = Boxes::new(dec!(0.04), BoxType::Fractional, BoxScale::Percent).unwrap();
        assert_eq!(boxes.percent_exponent(), -3);
        assert_eq!(boxes.up_factor(), dec!(1.04));
        // 1 / 1.04 = 0.96153..., rescaled to three places
        assert_eq!(boxes.down_factor().to_string(), "0.962");
        assert_eq!(boxes.reversal_up_factor(3).to_string(), "1.125");
        assert_eq!(boxes.reversal_down_factor(3).to_string(), "0.890");
    }

    #[test]
    fn enum_display_matches_snapshot_strings() {
        assert_eq!(BoxScale::Linear.to_string(), "linear");
        assert_eq!(BoxScale::Percent.to_string(), "percent");
        assert_eq!(BoxType::Integral.to_string(), "integral");
        assert_eq!(BoxType::Fractional.to_string(), "fractional");
    }
}
