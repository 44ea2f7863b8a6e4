use chrono::{DateTime, Utc};
use sea_orm::TransactionTrait;

use crate::{EngineError, ResultEngine, Statistics, util::normalize_account_id};

use super::{Engine, with_tx};

impl Engine {
    /// Desk statistics of an account as seen from `now` in the engine's time
    /// zone.
    pub async fn statistics(&self, account_id: &str, now: DateTime<Utc>) -> ResultEngine<Statistics> {
        let account_id = normalize_account_id(account_id)?;
        let now = now.with_timezone(&self.timezone);
        with_tx!(self, |db_tx| {
            let desk = self.full_desk(&db_tx, &account_id).await?;
            let stats = Statistics::compute(
                desk.history(),
                desk.ledger().total_available(),
                &now,
            );
            Ok::<_, EngineError>(stats)
        })
    }
}
