use serde::{Deserialize, Serialize};

use crate::{EngineError, Money, Rate};

/// ISO currency codes handled by the desk.
///
/// Operations always trade `USD` against one local currency. The local currency
/// is a deployment setting (Peruvian soles by default); amounts themselves are
/// plain [`Money`] minor units and carry no currency tag.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Usd,
    #[default]
    Pen,
}

impl Currency {
    /// Canonical currency code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Pen => "PEN",
        }
    }

    /// Symbol printed in front of amounts.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Currency::Usd => "$",
            Currency::Pen => "S/ ",
        }
    }

    /// Renders an amount with this currency's symbol, e.g. `S/ 150.00`.
    #[must_use]
    pub fn format(self, amount: Money) -> String {
        format!("{}{amount}", self.symbol())
    }

    /// Renders a rate quoted in this currency, e.g. `S/ 3.705`.
    #[must_use]
    pub fn format_rate(self, rate: Rate) -> String {
        format!("{}{rate}", self.symbol())
    }
}

impl core::fmt::Display for Currency {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.code())
    }
}

impl TryFrom<&str> for Currency {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_uppercase().as_str() {
            "USD" => Ok(Currency::Usd),
            "PEN" => Ok(Currency::Pen),
            other => Err(EngineError::InvalidData(format!(
                "unsupported currency: {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_prefixes_symbol() {
        assert_eq!(Currency::Usd.format(Money::new(40_00)), "$40.00");
        assert_eq!(Currency::Pen.format(Money::new(150_00)), "S/ 150.00");
        assert_eq!(Currency::Pen.format_rate(Rate::new(37_050)), "S/ 3.705");
    }

    #[test]
    fn parses_codes_case_insensitively() {
        assert_eq!(Currency::try_from(" pen ").unwrap(), Currency::Pen);
        assert!(Currency::try_from("EUR").is_err());
    }
}
