use chrono::{DateTime, Utc};
use sea_orm::{QueryOrder, QuerySelect, TransactionTrait, prelude::*};

use crate::{EngineError, Rate, Rates, ResultEngine, rates, util::normalize_account_id};

use super::{Engine, with_tx};

impl Engine {
    /// Returns the rates of an account, creating the defaults on first use.
    pub async fn rates(&self, account_id: &str) -> ResultEngine<Rates> {
        let account_id = normalize_account_id(account_id)?;
        with_tx!(self, |db_tx| {
            self.load_rates(&db_tx, &account_id).await
        })
    }

    /// Replaces the buy and sell rates of an account.
    pub async fn set_rates(&self, account_id: &str, buy: Rate, sell: Rate) -> ResultEngine<Rates> {
        let account_id = normalize_account_id(account_id)?;
        with_tx!(self, |db_tx| {
            let mut current = self.load_rates(&db_tx, &account_id).await?;
            current.set_trading(buy, sell)?;
            current.to_active_model(&account_id).update(&db_tx).await?;
            tracing::info!(
                account = %account_id,
                buy = %current.buy,
                sell = %current.sell,
                "trading rates updated"
            );
            Ok(current)
        })
    }

    /// Stores a new reference rate on every account. Returns how many
    /// accounts were updated.
    pub async fn apply_official_rate(&self, official: Rate, at: DateTime<Utc>) -> ResultEngine<u64> {
        with_tx!(self, |db_tx| {
            let models = rates::Entity::find().all(&db_tx).await?;
            let mut updated = 0;
            for model in models {
                let account_id = model.account_id.clone();
                let mut current = Rates::try_from(model)?;
                current.set_official(official, at)?;
                current.to_active_model(&account_id).update(&db_tx).await?;
                updated += 1;
            }
            tracing::info!(
                official = %official.rounded(),
                accounts = updated,
                "official rate applied"
            );
            Ok::<_, EngineError>(updated)
        })
    }

    /// Ids of every opened account, sorted.
    pub async fn accounts(&self) -> ResultEngine<Vec<String>> {
        with_tx!(self, |db_tx| {
            let ids: Vec<String> = rates::Entity::find()
                .select_only()
                .column(rates::Column::AccountId)
                .order_by_asc(rates::Column::AccountId)
                .into_tuple()
                .all(&db_tx)
                .await?;
            Ok::<_, EngineError>(ids)
        })
    }
}
