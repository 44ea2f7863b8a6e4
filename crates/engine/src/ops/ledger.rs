use sea_orm::TransactionTrait;

use crate::{LotLedger, ResultEngine, replay, util::normalize_account_id};

use super::{Engine, with_tx};

impl Engine {
    /// Returns the stored lot snapshot of an account.
    pub async fn ledger(&self, account_id: &str) -> ResultEngine<LotLedger> {
        let account_id = normalize_account_id(account_id)?;
        with_tx!(self, |db_tx| {
            self.load_ledger(&db_tx, &account_id).await
        })
    }

    /// Regenerates the lot snapshot from the live history and stores it.
    ///
    /// Used for consistency repair. Sales the history can no longer cover are
    /// logged and allocated as far as possible.
    pub async fn rebuild_ledger(&self, account_id: &str) -> ResultEngine<LotLedger> {
        let account_id = normalize_account_id(account_id)?;
        with_tx!(self, |db_tx| {
            let mut desk = self.full_desk(&db_tx, &account_id).await?;
            let ledger = desk.rebuild()?.clone();
            self.persist_ledger(&db_tx, &account_id, &ledger).await?;
            tracing::info!(
                account = %account_id,
                lots = ledger.len(),
                available = %ledger.total_available(),
                "ledger rebuilt"
            );
            Ok(ledger)
        })
    }

    /// Opens an account: creates its default rates if missing and reconciles
    /// the stored lot snapshot with a replay of the history.
    pub async fn open_account(&self, account_id: &str) -> ResultEngine<LotLedger> {
        let account_id = normalize_account_id(account_id)?;
        with_tx!(self, |db_tx| {
            self.load_rates(&db_tx, &account_id).await?;

            let stored = self.load_ledger(&db_tx, &account_id).await?;
            let history = self.load_history(&db_tx, &account_id).await?;
            let replayed = replay::rebuild(&history)?;

            if !stored.same_holdings(&replayed) {
                tracing::warn!(
                    account = %account_id,
                    stored = %stored.total_available(),
                    replayed = %replayed.total_available(),
                    "stored ledger differs from history, overwriting"
                );
                self.persist_ledger(&db_tx, &account_id, &replayed)
                    .await?;
            }
            Ok::<_, crate::EngineError>(replayed)
        })
    }
}
