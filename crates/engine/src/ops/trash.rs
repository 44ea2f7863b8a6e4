use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sea_orm::{QueryFilter, QueryOrder, TransactionTrait, prelude::*};

use crate::{EngineError, Operation, ResultEngine, operations, util::normalize_account_id};

use super::{Engine, with_tx};

/// A trashed operation with the instant it becomes eligible for purging.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrashEntry {
    pub operation: Operation,
    pub expires_at: DateTime<Utc>,
}

impl Engine {
    /// Moves an operation to the trash and rebuilds the ledger without it.
    pub async fn trash_operation(
        &self,
        account_id: &str,
        operation_id: Uuid,
        now: DateTime<Utc>,
    ) -> ResultEngine<TrashEntry> {
        let account_id = normalize_account_id(account_id)?;
        with_tx!(self, |db_tx| {
            let mut desk = self.full_desk(&db_tx, &account_id).await?;
            let mut operation = desk.remove(operation_id)?;
            operation.deleted_at = Some(now);

            self.update_operation(&db_tx, &operation).await?;
            self.persist_ledger(&db_tx, &account_id, desk.ledger())
                .await?;
            tracing::info!(account = %account_id, operation = %operation_id, "operation trashed");
            Ok(TrashEntry {
                expires_at: now + self.trash_retention,
                operation,
            })
        })
    }

    /// Brings a trashed operation back into the history and rebuilds the
    /// ledger.
    pub async fn restore_operation(
        &self,
        account_id: &str,
        operation_id: Uuid,
    ) -> ResultEngine<Operation> {
        let account_id = normalize_account_id(account_id)?;
        with_tx!(self, |db_tx| {
            let mut restored = self
                .find_operation(&db_tx, &account_id, operation_id)
                .await?;
            if !restored.is_trashed() {
                return Err(EngineError::KeyNotFound(format!(
                    "operation {operation_id} is not in the trash"
                )));
            }
            restored.deleted_at = None;
            self.update_operation(&db_tx, &restored).await?;

            // Reloaded so the restored row takes its stored (date, seq) slot.
            let mut desk = self.full_desk(&db_tx, &account_id).await?;
            desk.rebuild()?;
            self.persist_ledger(&db_tx, &account_id, desk.ledger())
                .await?;
            tracing::info!(account = %account_id, operation = %operation_id, "operation restored");
            Ok(restored)
        })
    }

    /// Lists the trash of an account, most recently deleted first.
    pub async fn trash(&self, account_id: &str) -> ResultEngine<Vec<TrashEntry>> {
        let account_id = normalize_account_id(account_id)?;
        with_tx!(self, |db_tx| {
            let models = operations::Entity::find()
                .filter(operations::Column::AccountId.eq(account_id.as_str()))
                .filter(operations::Column::DeletedAt.is_not_null())
                .order_by_desc(operations::Column::DeletedAt)
                .all(&db_tx)
                .await?;

            let mut entries = Vec::with_capacity(models.len());
            for model in models {
                let operation = Operation::try_from(model)?;
                if let Some(expires_at) = operation.expires_at(self.trash_retention) {
                    entries.push(TrashEntry {
                        operation,
                        expires_at,
                    });
                }
            }
            Ok::<_, EngineError>(entries)
        })
    }

    /// Permanently deletes one trashed operation.
    pub async fn delete_from_trash(&self, account_id: &str, operation_id: Uuid) -> ResultEngine<()> {
        let account_id = normalize_account_id(account_id)?;
        with_tx!(self, |db_tx| {
            let result = operations::Entity::delete_many()
                .filter(operations::Column::Id.eq(operation_id.to_string()))
                .filter(operations::Column::AccountId.eq(account_id.as_str()))
                .filter(operations::Column::DeletedAt.is_not_null())
                .exec(&db_tx)
                .await?;
            if result.rows_affected == 0 {
                return Err(EngineError::KeyNotFound(format!(
                    "operation {operation_id} is not in the trash"
                )));
            }
            Ok(())
        })
    }

    /// Permanently deletes every trashed operation of an account.
    pub async fn empty_trash(&self, account_id: &str) -> ResultEngine<u64> {
        let account_id = normalize_account_id(account_id)?;
        with_tx!(self, |db_tx| {
            let result = operations::Entity::delete_many()
                .filter(operations::Column::AccountId.eq(account_id.as_str()))
                .filter(operations::Column::DeletedAt.is_not_null())
                .exec(&db_tx)
                .await?;
            tracing::info!(account = %account_id, purged = result.rows_affected, "trash emptied");
            Ok::<_, EngineError>(result.rows_affected)
        })
    }

    /// Permanently deletes, across all accounts, the trashed operations older
    /// than the retention period.
    pub async fn purge_expired_trash(&self, now: DateTime<Utc>) -> ResultEngine<u64> {
        let cutoff = now - self.trash_retention;
        with_tx!(self, |db_tx| {
            let result = operations::Entity::delete_many()
                .filter(operations::Column::DeletedAt.is_not_null())
                .filter(operations::Column::DeletedAt.lt(cutoff))
                .exec(&db_tx)
                .await?;
            if result.rows_affected > 0 {
                tracing::info!(purged = result.rows_affected, "expired trash purged");
            }
            Ok::<_, EngineError>(result.rows_affected)
        })
    }
}
