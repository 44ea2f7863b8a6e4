use chrono::{DateTime, Utc};
use sea_orm::{QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, Money, Operation, OperationEdit, OperationFilter, OperationKind, Rate, Receipt,
    ResultEngine, SaleQuote, TradeCmd, operations, util::normalize_account_id,
};

use super::{Engine, with_tx};

impl Engine {
    /// Records a purchase and grows the ledger.
    ///
    /// Without an explicit rate the account's buy rate is used. The operation
    /// row and the new lot snapshot are committed together. A purchase dated
    /// before the latest live operation is replayed into the history.
    pub async fn register_purchase(&self, cmd: TradeCmd) -> ResultEngine<Operation> {
        let account_id = normalize_account_id(&cmd.account_id)?;
        with_tx!(self, |db_tx| {
            let rates = self.load_rates(&db_tx, &account_id).await?;
            let rate = cmd.rate.unwrap_or(rates.for_kind(OperationKind::Purchase));

            let mut desk = self
                .desk_for_trade(&db_tx, &account_id, cmd.occurred_at)
                .await?;
            let operation = desk.register_purchase(cmd.usd, rate, cmd.occurred_at)?;

            self.insert_operation(&db_tx, &operation).await?;
            self.persist_ledger(&db_tx, &account_id, desk.ledger())
                .await?;
            Ok(operation)
        })
    }

    /// Records a sale, consuming the cheapest lots first.
    ///
    /// Without an explicit rate the account's sell rate is used. Fails with
    /// [`EngineError::InsufficientFunds`] when the ledger cannot cover the
    /// amount; nothing is written in that case. A backdated sale is priced
    /// against the lots held at its date.
    pub async fn register_sale(&self, cmd: TradeCmd) -> ResultEngine<Operation> {
        let account_id = normalize_account_id(&cmd.account_id)?;
        with_tx!(self, |db_tx| {
            let rates = self.load_rates(&db_tx, &account_id).await?;
            let rate = cmd.rate.unwrap_or(rates.for_kind(OperationKind::Sale));

            let mut desk = self
                .desk_for_trade(&db_tx, &account_id, cmd.occurred_at)
                .await?;
            let operation = desk.register_sale(cmd.usd, rate, cmd.occurred_at)?;

            self.insert_operation(&db_tx, &operation).await?;
            self.persist_ledger(&db_tx, &account_id, desk.ledger())
                .await?;
            Ok(operation)
        })
    }

    /// Prices a sale against the current ledger without recording it.
    pub async fn quote_sale(
        &self,
        account_id: &str,
        usd: Money,
        rate: Option<Rate>,
    ) -> ResultEngine<SaleQuote> {
        let account_id = normalize_account_id(account_id)?;
        with_tx!(self, |db_tx| {
            let rates = self.load_rates(&db_tx, &account_id).await?;
            let rate = rate.unwrap_or(rates.for_kind(OperationKind::Sale));
            let desk = self.trading_desk(&db_tx, &account_id).await?;
            desk.quote_sale(usd, rate)
        })
    }

    /// Returns one operation, live or trashed.
    pub async fn operation(&self, account_id: &str, operation_id: Uuid) -> ResultEngine<Operation> {
        let account_id = normalize_account_id(account_id)?;
        with_tx!(self, |db_tx| {
            self.find_operation(&db_tx, &account_id, operation_id)
                .await
        })
    }

    /// Lists live operations, newest first.
    ///
    /// `filter.period` is evaluated in the engine's time zone as seen from
    /// `now`; `limit`/`offset` paginate the filtered result.
    pub async fn list_operations(
        &self,
        account_id: &str,
        filter: &OperationFilter,
        now: DateTime<Utc>,
    ) -> ResultEngine<Vec<Operation>> {
        let account_id = normalize_account_id(account_id)?;
        let now = now.with_timezone(&self.timezone);
        with_tx!(self, |db_tx| {
            let models = operations::Entity::find()
                .filter(operations::Column::AccountId.eq(account_id.as_str()))
                .filter(operations::Column::DeletedAt.is_null())
                .order_by_desc(operations::Column::Date)
                .order_by_desc(operations::Column::Seq)
                .all(&db_tx)
                .await?;

            let offset = usize::try_from(filter.offset.unwrap_or(0)).unwrap_or(usize::MAX);
            let limit = filter
                .limit
                .map_or(usize::MAX, |limit| usize::try_from(limit).unwrap_or(usize::MAX));

            let mut out = Vec::new();
            for model in models {
                let operation = Operation::try_from(model)?;
                if filter.period.contains(operation.date, &now) {
                    out.push(operation);
                }
            }
            Ok::<_, EngineError>(out.into_iter().skip(offset).take(limit).collect())
        })
    }

    /// Edits an operation and replays the account's history.
    ///
    /// The edited operation is re-priced at its chronological position; the
    /// rest of the history keeps its recorded values and the lot snapshot is
    /// replaced by the replay result.
    pub async fn edit_operation(
        &self,
        account_id: &str,
        operation_id: Uuid,
        edit: &OperationEdit,
    ) -> ResultEngine<Operation> {
        let account_id = normalize_account_id(account_id)?;
        if edit.is_empty() {
            return Err(EngineError::InvalidAmount("nothing to edit".to_string()));
        }
        with_tx!(self, |db_tx| {
            let mut desk = self.full_desk(&db_tx, &account_id).await?;
            let edited = desk.edit(operation_id, edit)?;

            self.update_operation(&db_tx, &edited).await?;
            self.persist_ledger(&db_tx, &account_id, desk.ledger())
                .await?;
            Ok(edited)
        })
    }

    /// Renders the printable receipt of an operation.
    pub async fn receipt(&self, account_id: &str, operation_id: Uuid) -> ResultEngine<String> {
        let operation = self.operation(account_id, operation_id).await?;
        Ok(Receipt::new(&operation, &self.timezone).to_string())
    }
}
