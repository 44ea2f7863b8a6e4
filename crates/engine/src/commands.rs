//! Command structs for engine operations.
//!
//! These types group parameters for writes (trades, edits) and listings,
//! keeping call sites readable and avoiding long argument lists.

use chrono::{DateTime, NaiveDate, Utc};

use crate::{Money, OperationKind, Rate};

/// A purchase or a sale of dollars.
///
/// When `rate` is `None` the account's current buy (purchase) or sell (sale)
/// rate from the rate store is applied.
#[derive(Clone, Debug)]
pub struct TradeCmd {
    pub account_id: String,
    pub usd: Money,
    pub rate: Option<Rate>,
    pub occurred_at: DateTime<Utc>,
}

impl TradeCmd {
    #[must_use]
    pub fn new(account_id: impl Into<String>, usd: Money, occurred_at: DateTime<Utc>) -> Self {
        Self {
            account_id: account_id.into(),
            usd,
            rate: None,
            occurred_at,
        }
    }

    #[must_use]
    pub fn rate(mut self, rate: Rate) -> Self {
        self.rate = Some(rate);
        self
    }
}

/// Fields of an operation that can be edited. `None` keeps the stored value.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OperationEdit {
    pub date: Option<DateTime<Utc>>,
    pub kind: Option<OperationKind>,
    pub usd: Option<Money>,
    pub rate: Option<Rate>,
}

impl OperationEdit {
    #[must_use]
    pub fn date(mut self, date: DateTime<Utc>) -> Self {
        self.date = Some(date);
        self
    }

    #[must_use]
    pub fn kind(mut self, kind: OperationKind) -> Self {
        self.kind = Some(kind);
        self
    }

    #[must_use]
    pub fn usd(mut self, usd: Money) -> Self {
        self.usd = Some(usd);
        self
    }

    #[must_use]
    pub fn rate(mut self, rate: Rate) -> Self {
        self.rate = Some(rate);
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Calendar window used to filter the history, evaluated in the caller's
/// time zone.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Period {
    #[default]
    All,
    Day,
    /// Current week, starting on Monday.
    Week,
    Month,
    Year,
    /// A specific calendar day.
    On(NaiveDate),
}

/// Filter for listing operations (newest first).
#[derive(Clone, Debug, Default)]
pub struct OperationFilter {
    pub period: Period,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl OperationFilter {
    #[must_use]
    pub fn period(mut self, period: Period) -> Self {
        self.period = period;
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }
}
