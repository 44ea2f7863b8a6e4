//! The rate store of one account: the reference (official) rate and the
//! desk's own buy and sell rates.

use chrono::{DateTime, TimeZone, Timelike, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};

use crate::{EngineError, OperationKind, Rate, ResultEngine};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rates {
    /// Reference rate published by the market feed. Informational.
    pub official: Rate,
    /// Rate the desk pays when buying dollars.
    pub buy: Rate,
    /// Rate the desk charges when selling dollars.
    pub sell: Rate,
    /// When `official` was last refreshed from the feed.
    pub last_update: Option<DateTime<Utc>>,
}

impl Default for Rates {
    fn default() -> Self {
        Self {
            official: Self::DEFAULT_OFFICIAL,
            buy: Self::DEFAULT_BUY,
            sell: Self::DEFAULT_SELL,
            last_update: None,
        }
    }
}

impl Rates {
    pub const DEFAULT_OFFICIAL: Rate = Rate::from_cents(372);
    pub const DEFAULT_BUY: Rate = Rate::from_cents(370);
    pub const DEFAULT_SELL: Rate = Rate::from_cents(375);

    /// Replaces the trading rates. Both must be positive; they are stored
    /// rounded to two decimals.
    pub fn set_trading(&mut self, buy: Rate, sell: Rate) -> ResultEngine<()> {
        let buy = storable(buy, "buy rate")?;
        let sell = storable(sell, "sell rate")?;
        self.buy = buy;
        self.sell = sell;
        Ok(())
    }

    /// Stores a reference rate from the feed, stamped with `at`.
    pub fn set_official(&mut self, official: Rate, at: DateTime<Utc>) -> ResultEngine<()> {
        self.official = storable(official, "official rate")?;
        self.last_update = Some(at);
        Ok(())
    }

    /// The default rate applied to a trade of `kind`.
    #[must_use]
    pub fn for_kind(&self, kind: OperationKind) -> Rate {
        match kind {
            OperationKind::Purchase => self.buy,
            OperationKind::Sale => self.sell,
        }
    }

    pub(crate) fn to_active_model(self, account_id: &str) -> ActiveModel {
        ActiveModel {
            account_id: ActiveValue::Set(account_id.to_string()),
            official_units: ActiveValue::Set(self.official.units()),
            buy_units: ActiveValue::Set(self.buy.units()),
            sell_units: ActiveValue::Set(self.sell.units()),
            last_update: ActiveValue::Set(self.last_update),
        }
    }
}

/// Validates a rate for the store and rounds it to two decimals.
fn storable(rate: Rate, name: &str) -> ResultEngine<Rate> {
    if !rate.is_positive() || rate > Rate::MAX_TRADE {
        return Err(EngineError::InvalidAmount(format!(
            "{name} must be > 0 and <= {}",
            Rate::MAX_TRADE
        )));
    }
    Ok(rate.rounded())
}

/// Hours of the day (local time, `start <= hour < end`) during which the
/// reference rate is refreshed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateWindow {
    pub start_hour: u32,
    pub end_hour: u32,
}

impl Default for UpdateWindow {
    fn default() -> Self {
        Self {
            start_hour: 8,
            end_hour: 20,
        }
    }
}

impl UpdateWindow {
    #[must_use]
    pub fn contains<Tz: TimeZone>(&self, at: &DateTime<Tz>) -> bool {
        let hour = at.hour();
        self.start_hour <= hour && hour < self.end_hour
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "rates")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub account_id: String,
    pub official_units: i64,
    pub buy_units: i64,
    pub sell_units: i64,
    pub last_update: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Rates {
    type Error = EngineError;

    fn try_from(model: Model) -> ResultEngine<Self> {
        let rates = Self {
            official: Rate::new(model.official_units),
            buy: Rate::new(model.buy_units),
            sell: Rate::new(model.sell_units),
            last_update: model.last_update,
        };
        if !rates.buy.is_positive() || !rates.sell.is_positive() {
            return Err(EngineError::InvalidData(format!(
                "rates of account {} are not positive",
                model.account_id
            )));
        }
        Ok(rates)
    }
}

#[cfg(test)]
mod tests {
    use chrono_tz::America::Lima;

    use super::*;

    fn rate(s: &str) -> Rate {
        s.parse().unwrap()
    }

    #[test]
    fn defaults_match_the_desk() {
        let rates = Rates::default();
        assert_eq!(rates.official, rate("3.72"));
        assert_eq!(rates.buy, rate("3.70"));
        assert_eq!(rates.sell, rate("3.75"));
        assert_eq!(rates.last_update, None);
        assert_eq!(rates.for_kind(OperationKind::Purchase), rate("3.70"));
        assert_eq!(rates.for_kind(OperationKind::Sale), rate("3.75"));
    }

    #[test]
    fn trading_rates_are_rounded_and_validated() {
        let mut rates = Rates::default();
        rates.set_trading(rate("3.684"), rate("3.7451")).unwrap();
        assert_eq!(rates.buy, rate("3.68"));
        assert_eq!(rates.sell, rate("3.75"));

        let err = rates.set_trading(Rate::new(0), rate("3.75")).unwrap_err();
        assert!(matches!(err, EngineError::InvalidAmount(_)));
        let err = rates
            .set_trading(rate("3.70"), Rate::new(i64::MAX))
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidAmount(_)));
        assert_eq!(rates.buy, rate("3.68"));
        assert_eq!(rates.sell, rate("3.75"));
    }

    #[test]
    fn official_rate_records_update_time() {
        let mut rates = Rates::default();
        let at = Utc::now();
        rates.set_official(rate("3.7139"), at).unwrap();
        assert_eq!(rates.official, rate("3.71"));
        assert_eq!(rates.last_update, Some(at));

        assert!(rates.set_official(Rate::new(-1), Utc::now()).is_err());
        assert_eq!(rates.last_update, Some(at));
    }

    #[test]
    fn window_is_half_open_in_local_time() {
        let window = UpdateWindow::default();
        let local = |h| Lima.with_ymd_and_hms(2026, 3, 2, h, 30, 0).unwrap();
        assert!(!window.contains(&local(7)));
        assert!(window.contains(&local(8)));
        assert!(window.contains(&local(19)));
        assert!(!window.contains(&local(20)));
        // 14:00 UTC is 09:00 in Lima.
        let utc = Utc.with_ymd_and_hms(2026, 3, 2, 14, 0, 0).unwrap();
        assert!(window.contains(&utc.with_timezone(&Lima)));
    }
}
