//! Wire types of the HTTP API.
//!
//! Money travels as integer minor units (`*_minor`, cents). Rates travel as
//! decimal strings with up to four decimals (`"3.705"`) so clients never
//! round-trip them through floats.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod rates {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct RatesView {
        pub official: String,
        pub buy: String,
        pub sell: String,
        pub last_update: Option<DateTime<Utc>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct RatesUpdate {
        pub buy: String,
        pub sell: String,
    }
}

pub mod operation {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum OperationKind {
        Purchase,
        Sale,
    }

    /// A purchase or a sale. Without `rate` the account's buy/sell rate is
    /// used; without `occurred_at` the server time is used.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct TradeNew {
        pub usd_minor: i64,
        pub rate: Option<String>,
        pub occurred_at: Option<DateTime<FixedOffset>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SaleQuoteRequest {
        pub usd_minor: i64,
        pub rate: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BlockUsedView {
        pub rate: String,
        pub amount_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct OperationView {
        pub id: Uuid,
        pub date: DateTime<Utc>,
        pub kind: OperationKind,
        pub usd_minor: i64,
        pub pen_minor: i64,
        pub rate: String,
        pub profit_minor: i64,
        pub blocks_used: Vec<BlockUsedView>,
        /// Weighted rate the sold dollars were bought at (sales only).
        pub acquisition_rate: Option<String>,
        pub deleted_at: Option<DateTime<Utc>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SaleQuoteView {
        pub usd_minor: i64,
        pub rate: String,
        pub pen_minor: i64,
        pub cost_minor: i64,
        pub profit_minor: i64,
        /// Dollars the ledger cannot cover.
        pub shortfall_minor: i64,
        pub blocks: Vec<BlockUsedView>,
    }

    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum PeriodKind {
        #[default]
        All,
        Day,
        Week,
        Month,
        Year,
        /// Requires `date`.
        Date,
    }

    /// Query string of the operation listing.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct OperationList {
        pub period: Option<PeriodKind>,
        pub date: Option<NaiveDate>,
        pub limit: Option<u64>,
        pub offset: Option<u64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct OperationListResponse {
        pub operations: Vec<OperationView>,
    }

    /// Partial edit; absent fields keep their stored value.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct OperationUpdate {
        pub date: Option<DateTime<FixedOffset>>,
        pub kind: Option<OperationKind>,
        pub usd_minor: Option<i64>,
        pub rate: Option<String>,
    }
}

pub mod ledger {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct LotView {
        pub amount_minor: i64,
        pub rate: String,
        pub created_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct LedgerView {
        pub lots: Vec<LotView>,
        pub total_minor: i64,
        pub average_rate: Option<String>,
    }
}

pub mod trash {
    use super::*;
    use crate::operation::OperationView;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TrashEntryView {
        pub operation: OperationView,
        pub expires_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TrashListResponse {
        pub entries: Vec<TrashEntryView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TrashEmptied {
        pub purged: u64,
    }
}

pub mod stats {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Statistics {
        pub profit_today_minor: i64,
        pub profit_week_minor: i64,
        pub profit_month_minor: i64,
        pub total_profit_minor: i64,
        pub purchases: u64,
        pub sales: u64,
        pub operations: u64,
        pub average_profit_minor: i64,
        /// Monday first.
        pub profit_by_weekday_minor: [i64; 7],
        pub dollars_available_minor: i64,
    }
}
