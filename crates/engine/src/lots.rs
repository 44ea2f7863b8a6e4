//! A `Lot` is an unconsumed slice of purchased dollars.
//!
//! The ledger is persisted as a full snapshot: every write deletes the
//! account's rows and inserts the current lots again.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, Money, Rate, ResultEngine};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lot {
    /// Remaining USD in this lot.
    pub amount: Money,
    /// Acquisition rate, fixed when the lot is created.
    pub rate: Rate,
    /// Informational only, lots are ordered by rate.
    pub created_at: DateTime<Utc>,
}

impl Lot {
    pub(crate) fn to_active_model(&self, account_id: &str) -> ActiveModel {
        ActiveModel {
            id: ActiveValue::Set(Uuid::new_v4().to_string()),
            account_id: ActiveValue::Set(account_id.to_string()),
            amount_minor: ActiveValue::Set(self.amount.cents()),
            rate_units: ActiveValue::Set(self.rate.units()),
            created_at: ActiveValue::Set(self.created_at),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "lots")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub account_id: String,
    pub amount_minor: i64,
    pub rate_units: i64,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Lot {
    type Error = EngineError;

    fn try_from(model: Model) -> ResultEngine<Self> {
        if model.rate_units <= 0 {
            return Err(EngineError::InvalidData(format!(
                "lot {} has a non-positive rate",
                model.id
            )));
        }
        Ok(Self {
            amount: Money::new(model.amount_minor),
            rate: Rate::new(model.rate_units),
            created_at: model.created_at,
        })
    }
}
