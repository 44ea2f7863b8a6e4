//! Exchange rates as fixed-point decimals.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    EngineError, Money,
    money::{div_round, parse_decimal, round_scaled, saturate},
};

/// Local currency per USD, stored as an integer number of ten-thousandths.
///
/// Four fractional digits let callers pass rates such as `3.705`; rates kept
/// on the rate store and on new lots are rounded to two digits with
/// [`Rate::rounded`].
///
/// ```rust
/// use engine::{Money, Rate};
///
/// let rate: Rate = "3.75".parse().unwrap();
/// assert_eq!(rate.convert(Money::new(40_00)), Money::new(150_00));
/// assert_eq!("3.705".parse::<Rate>().unwrap().to_string(), "3.705");
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Rate(i64);

impl Rate {
    /// Number of stored units per whole local-currency unit.
    pub const SCALE: i64 = 10_000;

    /// Lots whose rates differ by less than this are merged.
    pub const MERGE_TOLERANCE: Rate = Rate(100);

    /// Largest rate accepted for a trade or stored on the rate store.
    pub const MAX_TRADE: Rate = Rate(10_000 * Self::SCALE);

    /// Creates a rate from raw ten-thousandths.
    #[must_use]
    pub const fn new(units: i64) -> Self {
        Self(units)
    }

    /// Creates a rate from hundredths (`370` is `3.70`).
    #[must_use]
    pub const fn from_cents(cents: i64) -> Self {
        Self(cents * 100)
    }

    /// Raw value in ten-thousandths.
    #[must_use]
    pub const fn units(self) -> i64 {
        self.0
    }

    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Rounds to two decimals, half away from zero.
    #[must_use]
    pub fn rounded(self) -> Rate {
        Rate(saturate(div_round(i128::from(self.0), 100) * 100))
    }

    /// Absolute distance between two rates.
    #[must_use]
    pub fn distance(self, other: Rate) -> Rate {
        Rate((self.0 - other.0).abs())
    }

    /// `true` when both rates fall inside the lot merge tolerance.
    #[must_use]
    pub fn coalesces_with(self, other: Rate) -> bool {
        self.distance(other) < Self::MERGE_TOLERANCE
    }

    /// Converts a USD amount into local currency, rounded to cents.
    #[must_use]
    pub fn convert(self, usd: Money) -> Money {
        round_scaled(self.exact(usd), i128::from(Self::SCALE))
    }

    /// Unrounded `usd * rate`, in units of `1 / (100 * SCALE)`.
    #[must_use]
    pub(crate) fn exact(self, usd: Money) -> i128 {
        i128::from(usd.cents()) * i128::from(self.0)
    }

    /// Weighted average rate of `(amount, rate)` pairs, rounded to the stored
    /// precision. Returns `None` when the amounts sum to zero.
    pub(crate) fn weighted_average<I>(parts: I) -> Option<Rate>
    where
        I: IntoIterator<Item = (Money, Rate)>,
    {
        let (weighted, total) = parts
            .into_iter()
            .fold((0i128, 0i128), |(weighted, total), (amount, rate)| {
                (
                    weighted + rate.exact(amount),
                    total + i128::from(amount.cents()),
                )
            });
        if total == 0 {
            return None;
        }
        Some(Rate(saturate(div_round(weighted, total))))
    }

    /// Converts a float coming from an external feed, rounding to two
    /// decimals.
    #[must_use]
    pub fn from_f64_rounded(value: f64) -> Option<Rate> {
        if !value.is_finite() || value <= 0.0 || value > 1e9 {
            return None;
        }
        Some(Rate::from_cents((value * 100.0).round() as i64))
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let whole = abs / Self::SCALE as u64;
        let fraction = abs % Self::SCALE as u64;
        if fraction % 100 == 0 {
            return write!(f, "{sign}{whole}.{:02}", fraction / 100);
        }
        let digits = format!("{fraction:04}");
        write!(f, "{sign}{whole}.{}", digits.trim_end_matches('0'))
    }
}

impl FromStr for Rate {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (sign, whole, fraction) = parse_decimal(s, 4)?;
        let units = whole
            .checked_mul(Self::SCALE)
            .and_then(|v| v.checked_add(fraction))
            .ok_or_else(|| EngineError::InvalidAmount("rate too large".to_string()))?;
        Ok(Rate(sign * units))
    }
}

impl From<Rate> for String {
    fn from(value: Rate) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for Rate {
    type Error = EngineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rate(s: &str) -> Rate {
        s.parse().unwrap()
    }

    #[test]
    fn parse_and_display() {
        assert_eq!(rate("3.7").units(), 37_000);
        assert_eq!(rate("3,75").units(), 37_500);
        assert_eq!(rate("3.705").units(), 37_050);
        assert_eq!(rate("3.7").to_string(), "3.70");
        assert_eq!(rate("3.705").to_string(), "3.705");
        assert_eq!(rate("4").to_string(), "4.00");
        assert!("3.70001".parse::<Rate>().is_err());
    }

    #[test]
    fn rounded_goes_half_away_from_zero() {
        assert_eq!(rate("3.705").rounded(), rate("3.71"));
        assert_eq!(rate("3.7049").rounded(), rate("3.70"));
        assert_eq!(rate("3.70").rounded(), rate("3.70"));
    }

    #[test]
    fn coalescing_tolerance_is_strict() {
        assert!(rate("3.70").coalesces_with(rate("3.705")));
        assert!(rate("3.70").coalesces_with(rate("3.7099")));
        assert!(!rate("3.70").coalesces_with(rate("3.71")));
    }

    #[test]
    fn convert_rounds_to_cents() {
        assert_eq!(rate("3.75").convert(Money::new(40_00)), Money::new(150_00));
        // 0.01 * 3.705 = 0.03705 -> 0.04
        assert_eq!(rate("3.705").convert(Money::new(1)), Money::new(4));
    }

    #[test]
    fn convert_is_exact_at_the_trade_limits() {
        let pen = Rate::MAX_TRADE.convert(Money::MAX_TRADE);
        assert_eq!(pen.cents(), 1_000_000_000_00 * 10_000);
        // Past the limits the result saturates instead of changing sign.
        assert_eq!(
            Rate::MAX_TRADE.convert(Money::new(i64::MAX)),
            Money::new(i64::MAX)
        );
    }

    #[test]
    fn weighted_average_of_blocks() {
        let avg = Rate::weighted_average([
            (Money::new(50_00), rate("3.60")),
            (Money::new(50_00), rate("3.70")),
        ]);
        assert_eq!(avg, Some(rate("3.65")));
        assert_eq!(Rate::weighted_average(std::iter::empty()), None);
    }

    #[test]
    fn serde_uses_decimal_strings() {
        let json = serde_json::to_string(&rate("3.705")).unwrap();
        assert_eq!(json, "\"3.705\"");
        let back: Rate = serde_json::from_str("\"3.70\"").unwrap();
        assert_eq!(back, rate("3.70"));
    }

    #[test]
    fn feed_floats_are_rounded() {
        assert_eq!(Rate::from_f64_rounded(3.7168), Some(rate("3.72")));
        assert_eq!(Rate::from_f64_rounded(-1.0), None);
        assert_eq!(Rate::from_f64_rounded(f64::INFINITY), None);
    }
}
