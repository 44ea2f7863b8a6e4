use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use sea_orm::{
    ActiveModelTrait, ActiveValue, DatabaseConnection, DatabaseTransaction, QueryFilter,
    QueryOrder, prelude::*,
};
use uuid::Uuid;

use crate::{
    Desk, EngineError, Lot, LotLedger, Operation, Rates, ResultEngine, lots, operations, rates,
};

mod ledger;
mod rate_store;
mod statistics;
mod trading;
mod trash;

pub use trash::TrashEntry;

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

/// Default time operations are kept in the trash before being purged.
pub const DEFAULT_TRASH_RETENTION_DAYS: i64 = 30;

/// Persistent, multi-account front of the engine.
///
/// `Engine` holds no state besides the connection: each call loads the
/// account's ledger and history inside a DB transaction, runs the [`Desk`]
/// logic and writes the operation row together with the full lot snapshot.
#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
    trash_retention: Duration,
    timezone: Tz,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// How long trashed operations survive before purging.
    pub fn trash_retention(&self) -> Duration {
        self.trash_retention
    }

    /// Time zone used for calendar periods and receipts.
    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Loads the stored lot snapshot of `account_id`.
    async fn load_ledger(
        &self,
        db: &DatabaseTransaction,
        account_id: &str,
    ) -> ResultEngine<LotLedger> {
        let models = lots::Entity::find()
            .filter(lots::Column::AccountId.eq(account_id))
            .order_by_asc(lots::Column::RateUnits)
            .order_by_asc(lots::Column::CreatedAt)
            .all(db)
            .await?;
        let lots = models
            .into_iter()
            .map(Lot::try_from)
            .collect::<ResultEngine<Vec<_>>>()?;
        LotLedger::from_lots(lots)
    }

    /// Loads the live (non-trashed) history, oldest first.
    async fn load_history(
        &self,
        db: &DatabaseTransaction,
        account_id: &str,
    ) -> ResultEngine<Vec<Operation>> {
        let models = operations::Entity::find()
            .filter(operations::Column::AccountId.eq(account_id))
            .filter(operations::Column::DeletedAt.is_null())
            .order_by_asc(operations::Column::Date)
            .order_by_asc(operations::Column::Seq)
            .all(db)
            .await?;
        models.into_iter().map(Operation::try_from).collect()
    }

    /// A desk able to trade: stored ledger, no history loaded.
    async fn trading_desk(&self, db: &DatabaseTransaction, account_id: &str) -> ResultEngine<Desk> {
        let ledger = self.load_ledger(db, account_id).await?;
        Ok(Desk::with_state(account_id, ledger, Vec::new()))
    }

    /// The desk for a trade dated `date`.
    ///
    /// The history is only loaded when a live operation is dated after the
    /// trade, since then the trade has to be replayed at its position.
    async fn desk_for_trade(
        &self,
        db: &DatabaseTransaction,
        account_id: &str,
        date: DateTime<Utc>,
    ) -> ResultEngine<Desk> {
        let later = operations::Entity::find()
            .filter(operations::Column::AccountId.eq(account_id))
            .filter(operations::Column::DeletedAt.is_null())
            .filter(operations::Column::Date.gt(date))
            .one(db)
            .await?;
        if later.is_some() {
            tracing::debug!(account = %account_id, %date, "backdated trade, loading history");
            self.full_desk(db, account_id).await
        } else {
            self.trading_desk(db, account_id).await
        }
    }

    /// A desk with the stored ledger and the full live history.
    async fn full_desk(&self, db: &DatabaseTransaction, account_id: &str) -> ResultEngine<Desk> {
        let ledger = self.load_ledger(db, account_id).await?;
        let history = self.load_history(db, account_id).await?;
        Ok(Desk::with_state(account_id, ledger, history))
    }

    /// Overwrites the stored lot snapshot of `account_id`.
    async fn persist_ledger(
        &self,
        db: &DatabaseTransaction,
        account_id: &str,
        ledger: &LotLedger,
    ) -> ResultEngine<()> {
        lots::Entity::delete_many()
            .filter(lots::Column::AccountId.eq(account_id))
            .exec(db)
            .await?;
        if ledger.is_empty() {
            return Ok(());
        }
        let models: Vec<lots::ActiveModel> = ledger
            .lots()
            .iter()
            .map(|lot| lot.to_active_model(account_id))
            .collect();
        lots::Entity::insert_many(models).exec(db).await?;
        Ok(())
    }

    async fn insert_operation(
        &self,
        db: &DatabaseTransaction,
        operation: &Operation,
    ) -> ResultEngine<()> {
        let last = operations::Entity::find()
            .filter(operations::Column::AccountId.eq(operation.account_id.as_str()))
            .order_by_desc(operations::Column::Seq)
            .one(db)
            .await?
            .map_or(0, |model| model.seq);

        let mut model = operations::ActiveModel::try_from(operation)?;
        model.seq = ActiveValue::Set(last + 1);
        model.insert(db).await?;
        Ok(())
    }

    async fn update_operation(
        &self,
        db: &DatabaseTransaction,
        operation: &Operation,
    ) -> ResultEngine<()> {
        let model = operations::ActiveModel::try_from(operation)?;
        model.update(db).await?;
        Ok(())
    }

    /// Finds an operation of `account_id`, live or trashed.
    async fn find_operation(
        &self,
        db: &DatabaseTransaction,
        account_id: &str,
        operation_id: Uuid,
    ) -> ResultEngine<Operation> {
        let model = operations::Entity::find_by_id(operation_id.to_string())
            .filter(operations::Column::AccountId.eq(account_id))
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound(format!("operation {operation_id}")))?;
        Operation::try_from(model)
    }

    /// Returns the rates of `account_id`, creating the defaults on first use.
    async fn load_rates(&self, db: &DatabaseTransaction, account_id: &str) -> ResultEngine<Rates> {
        if let Some(model) = rates::Entity::find_by_id(account_id.to_string())
            .one(db)
            .await?
        {
            return Rates::try_from(model);
        }

        let rates = Rates::default();
        rates.to_active_model(account_id).insert(db).await?;
        tracing::info!(account = %account_id, "account opened with default rates");
        Ok(rates)
    }
}

/// The builder for `Engine`
pub struct EngineBuilder {
    database: DatabaseConnection,
    trash_retention: Duration,
    timezone: Tz,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self {
            database: DatabaseConnection::default(),
            trash_retention: Duration::days(DEFAULT_TRASH_RETENTION_DAYS),
            timezone: Tz::UTC,
        }
    }
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// How long trashed operations are kept (default 30 days).
    pub fn trash_retention(mut self, retention: Duration) -> EngineBuilder {
        self.trash_retention = retention;
        self
    }

    /// Time zone for calendar periods and receipts (default UTC).
    pub fn timezone(mut self, timezone: Tz) -> EngineBuilder {
        self.timezone = timezone;
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        if self.trash_retention < Duration::zero() {
            return Err(EngineError::InvalidAmount(
                "trash retention must not be negative".to_string(),
            ));
        }
        Ok(Engine {
            database: self.database,
            trash_retention: self.trash_retention,
            timezone: self.timezone,
        })
    }
}
