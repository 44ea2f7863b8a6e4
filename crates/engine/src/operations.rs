//! Operation primitives.
//!
//! An `Operation` is one buy or sell of dollars. Once settled it is only
//! changed through an explicit edit; deleting moves it to the trash
//! (`deleted_at` set) until it is purged.

use chrono::{DateTime, Duration, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    BlockUsed, EngineError, Money, Rate, ResultEngine,
    ledger::{Allocation, cost_of},
    util::parse_uuid,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// The desk buys dollars from a customer (opens or grows a lot).
    Purchase,
    /// The desk sells dollars to a customer (consumes lots).
    Sale,
}

impl OperationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Purchase => "purchase",
            Self::Sale => "sale",
        }
    }

    /// Human readable label, used on receipts.
    pub fn label(self) -> &'static str {
        match self {
            Self::Purchase => "Dollar purchase",
            Self::Sale => "Dollar sale",
        }
    }
}

impl TryFrom<&str> for OperationKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "purchase" => Ok(Self::Purchase),
            "sale" => Ok(Self::Sale),
            other => Err(EngineError::InvalidData(format!(
                "invalid operation kind: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub id: Uuid,
    pub account_id: String,
    pub date: DateTime<Utc>,
    pub kind: OperationKind,
    /// Traded dollars.
    pub usd: Money,
    /// Local currency paid or received, `usd * rate` rounded to cents.
    pub pen: Money,
    /// Buy or sell rate applied.
    pub rate: Rate,
    /// Always zero for purchases.
    pub profit: Money,
    /// Lots consumed by a sale, cheapest first. Empty for purchases.
    pub blocks_used: Vec<BlockUsed>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Operation {
    pub(crate) fn purchase(account_id: &str, date: DateTime<Utc>, usd: Money, rate: Rate) -> Self {
        Self {
            id: Uuid::new_v4(),
            account_id: account_id.to_string(),
            date,
            kind: OperationKind::Purchase,
            usd,
            pen: rate.convert(usd),
            rate,
            profit: Money::ZERO,
            blocks_used: Vec::new(),
            deleted_at: None,
        }
    }

    pub(crate) fn sale(
        account_id: &str,
        date: DateTime<Utc>,
        usd: Money,
        rate: Rate,
        allocation: Allocation,
    ) -> Self {
        let pen = rate.convert(usd);
        Self {
            id: Uuid::new_v4(),
            account_id: account_id.to_string(),
            date,
            kind: OperationKind::Sale,
            usd,
            pen,
            rate,
            profit: allocation.profit_for(pen),
            blocks_used: allocation.blocks,
            deleted_at: None,
        }
    }

    /// Acquisition cost of the dollars sold, zero for purchases.
    #[must_use]
    pub fn cost_basis(&self) -> Money {
        cost_of(&self.blocks_used)
    }

    /// Weighted average rate the sold dollars were bought at.
    #[must_use]
    pub fn acquisition_rate(&self) -> Option<Rate> {
        Rate::weighted_average(self.blocks_used.iter().map(|b| (b.amount, b.rate)))
    }

    #[must_use]
    pub fn is_trashed(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// When a trashed operation becomes eligible for purging.
    #[must_use]
    pub fn expires_at(&self, retention: Duration) -> Option<DateTime<Utc>> {
        self.deleted_at.map(|deleted_at| deleted_at + retention)
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "operations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub account_id: String,
    pub date: DateTimeUtc,
    pub kind: String,
    pub usd_minor: i64,
    pub pen_minor: i64,
    pub rate_units: i64,
    pub profit_minor: i64,
    /// JSON array of `{rate, amount}`.
    pub blocks_used: String,
    pub deleted_at: Option<DateTimeUtc>,
    /// Insertion order within the account; breaks ties between equal dates.
    pub seq: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<&Operation> for ActiveModel {
    type Error = EngineError;

    fn try_from(op: &Operation) -> ResultEngine<Self> {
        let blocks_used = serde_json::to_string(&op.blocks_used)
            .map_err(|err| EngineError::InvalidData(format!("blocks_used: {err}")))?;
        Ok(Self {
            id: ActiveValue::Set(op.id.to_string()),
            account_id: ActiveValue::Set(op.account_id.clone()),
            date: ActiveValue::Set(op.date),
            kind: ActiveValue::Set(op.kind.as_str().to_string()),
            usd_minor: ActiveValue::Set(op.usd.cents()),
            pen_minor: ActiveValue::Set(op.pen.cents()),
            rate_units: ActiveValue::Set(op.rate.units()),
            profit_minor: ActiveValue::Set(op.profit.cents()),
            blocks_used: ActiveValue::Set(blocks_used),
            deleted_at: ActiveValue::Set(op.deleted_at),
            // Assigned once on insert and never rewritten by edits.
            seq: ActiveValue::NotSet,
        })
    }
}

impl TryFrom<Model> for Operation {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let blocks_used: Vec<BlockUsed> = serde_json::from_str(&model.blocks_used)
            .map_err(|err| {
                EngineError::InvalidData(format!("operation {}: blocks_used: {err}", model.id))
            })?;
        Ok(Self {
            id: parse_uuid(&model.id, "operation")?,
            account_id: model.account_id,
            date: model.date,
            kind: OperationKind::try_from(model.kind.as_str())?,
            usd: Money::new(model.usd_minor),
            pen: Money::new(model.pen_minor),
            rate: Rate::new(model.rate_units),
            profit: Money::new(model.profit_minor),
            blocks_used,
            deleted_at: model.deleted_at,
        })
    }
}
