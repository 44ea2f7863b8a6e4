//! The operation recorder of one account.
//!
//! A `Desk` owns the lot ledger and the live (non-trashed) history of a single
//! account. Everything here is synchronous and in-memory: every method either
//! validates and then mutates, or fails without touching anything. The
//! [`Engine`](crate::Engine) loads a desk inside a DB transaction, calls it,
//! and persists the result.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    Allocation, BlockUsed, EngineError, LotLedger, Money, Operation, OperationKind, Rate,
    ResultEngine,
    commands::OperationEdit,
    replay::{self, replay_repricing},
};

/// Preview of a sale against the current ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleQuote {
    pub usd: Money,
    pub rate: Rate,
    pub pen: Money,
    /// Acquisition cost of the dollars that would be sold.
    pub cost: Money,
    pub profit: Money,
    pub blocks: Vec<BlockUsed>,
    /// Dollars the ledger cannot cover. A sale with a shortfall is rejected.
    pub shortfall: Money,
}

#[derive(Clone, Debug, Default)]
pub struct Desk {
    account_id: String,
    ledger: LotLedger,
    history: Vec<Operation>,
}

impl Desk {
    pub fn new(account_id: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            ledger: LotLedger::new(),
            history: Vec::new(),
        }
    }

    /// Restores a desk from a stored ledger snapshot and its history.
    pub fn with_state(
        account_id: impl Into<String>,
        ledger: LotLedger,
        history: Vec<Operation>,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            ledger,
            history,
        }
    }

    pub fn ledger(&self) -> &LotLedger {
        &self.ledger
    }

    pub fn history(&self) -> &[Operation] {
        &self.history
    }

    pub fn operation(&self, id: Uuid) -> ResultEngine<&Operation> {
        self.history
            .iter()
            .find(|op| op.id == id)
            .ok_or_else(|| EngineError::KeyNotFound(format!("operation {id}")))
    }

    /// Records a purchase of `usd` dollars at `rate`.
    ///
    /// A purchase dated before the latest operation in the history is placed
    /// at its position and the ledger is rebuilt from the history.
    pub fn register_purchase(
        &mut self,
        usd: Money,
        rate: Rate,
        date: DateTime<Utc>,
    ) -> ResultEngine<Operation> {
        validate_trade(usd, rate)?;

        let operation = Operation::purchase(&self.account_id, date, usd, rate);
        if self.is_backdated(date) {
            let mut history = self.history.clone();
            history.push(operation.clone());
            let replay = replay::replay(&history)?;
            log_shortfalls(&self.account_id, &replay.shortfalls);
            self.history = history;
            self.ledger = replay.ledger;
        } else {
            self.ledger.add_lot(usd, rate, date)?;
            self.history.push(operation.clone());
        }
        tracing::info!(
            account = %self.account_id,
            usd = %usd,
            rate = %rate,
            "purchase registered"
        );
        Ok(operation)
    }

    /// Records a sale of `usd` dollars at `rate`, consuming the cheapest lots.
    ///
    /// Fails with `InsufficientFunds` when the ledger holds fewer dollars than
    /// requested; the ledger is left unchanged in that case. A backdated sale
    /// is priced against the lots held at its date.
    pub fn register_sale(
        &mut self,
        usd: Money,
        rate: Rate,
        date: DateTime<Utc>,
    ) -> ResultEngine<Operation> {
        validate_trade(usd, rate)?;

        let operation = if self.is_backdated(date) {
            self.insert_backdated_sale(usd, rate, date)?
        } else {
            self.ensure_available(usd)?;
            let allocation = self.ledger.allocate(usd);
            let operation = Operation::sale(&self.account_id, date, usd, rate, allocation);
            self.history.push(operation.clone());
            operation
        };
        tracing::info!(
            account = %self.account_id,
            usd = %usd,
            rate = %rate,
            profit = %operation.profit,
            "sale registered"
        );
        Ok(operation)
    }

    /// Prices a sale without recording it.
    pub fn quote_sale(&self, usd: Money, rate: Rate) -> ResultEngine<SaleQuote> {
        validate_trade(usd, rate)?;

        let allocation = self.ledger.preview(usd);
        let pen = rate.convert(usd);
        Ok(SaleQuote {
            usd,
            rate,
            pen,
            cost: allocation.cost(),
            profit: allocation.profit_for(pen),
            shortfall: allocation.remainder,
            blocks: allocation.blocks,
        })
    }

    /// Applies an edit and replays the history.
    ///
    /// The edited operation is re-priced at its (possibly new) chronological
    /// position: a sale gets fresh `blocks_used` and `profit`, a purchase is
    /// reset to zero profit. Other operations keep their recorded values. If
    /// the edited sale cannot be covered at its position nothing changes.
    pub fn edit(&mut self, id: Uuid, edit: &OperationEdit) -> ResultEngine<Operation> {
        let index = self.position(id)?;

        let mut edited = self.history[index].clone();
        if let Some(date) = edit.date {
            edited.date = date;
        }
        if let Some(kind) = edit.kind {
            edited.kind = kind;
        }
        if let Some(usd) = edit.usd {
            edited.usd = usd;
        }
        if let Some(rate) = edit.rate {
            edited.rate = rate;
        }
        validate_trade(edited.usd, edited.rate)?;
        edited.pen = edited.rate.convert(edited.usd);
        edited.profit = Money::ZERO;
        edited.blocks_used.clear();

        let mut history = self.history.clone();
        history[index] = edited;

        let (replay, allocation) = replay_repricing(&history, id)?;
        if let Some(allocation) = allocation {
            let edited = &mut history[index];
            edited.profit = allocation.profit_for(edited.pen);
            edited.blocks_used = allocation.blocks;
        }
        log_shortfalls(&self.account_id, &replay.shortfalls);

        self.history = history;
        self.ledger = replay.ledger;
        tracing::info!(account = %self.account_id, operation = %id, "operation edited");
        Ok(self.history[index].clone())
    }

    /// Takes an operation out of the live history and rebuilds the ledger.
    pub fn remove(&mut self, id: Uuid) -> ResultEngine<Operation> {
        let index = self.position(id)?;
        let mut history = self.history.clone();
        let operation = history.remove(index);
        let replay = replay::replay(&history)?;
        log_shortfalls(&self.account_id, &replay.shortfalls);
        self.history = history;
        self.ledger = replay.ledger;
        Ok(operation)
    }

    /// Regenerates the ledger from the history (consistency repair).
    pub fn rebuild(&mut self) -> ResultEngine<&LotLedger> {
        let replay = replay::replay(&self.history)?;
        log_shortfalls(&self.account_id, &replay.shortfalls);
        self.ledger = replay.ledger;
        Ok(&self.ledger)
    }

    /// `true` when the history already holds an operation dated after `date`.
    fn is_backdated(&self, date: DateTime<Utc>) -> bool {
        self.history.iter().any(|op| op.date > date)
    }

    /// Inserts a sale before later operations and replays the history.
    ///
    /// The sale must be covered by the lots held at its date, and it must not
    /// leave any later sale less covered than before.
    fn insert_backdated_sale(
        &mut self,
        usd: Money,
        rate: Rate,
        date: DateTime<Utc>,
    ) -> ResultEngine<Operation> {
        let missing_before = missing_total(&replay::replay(&self.history)?.shortfalls);

        let mut sale = Operation::sale(&self.account_id, date, usd, rate, Allocation::default());
        let mut history = self.history.clone();
        history.push(sale.clone());

        let (replay, allocation) = replay_repricing(&history, sale.id)?;
        if missing_total(&replay.shortfalls) > missing_before {
            return Err(EngineError::InsufficientFunds(format!(
                "a sale of {usd} USD at {date} leaves later sales uncovered"
            )));
        }
        if let Some(allocation) = allocation {
            sale.profit = allocation.profit_for(sale.pen);
            sale.blocks_used = allocation.blocks;
        }
        if let Some(last) = history.last_mut() {
            *last = sale.clone();
        }

        self.history = history;
        self.ledger = replay.ledger;
        Ok(sale)
    }

    fn ensure_available(&self, usd: Money) -> ResultEngine<()> {
        let available = self.ledger.total_available();
        if available < usd {
            return Err(EngineError::InsufficientFunds(format!(
                "requested {usd} USD, available {available} USD"
            )));
        }
        Ok(())
    }

    fn position(&self, id: Uuid) -> ResultEngine<usize> {
        self.history
            .iter()
            .position(|op| op.id == id)
            .ok_or_else(|| EngineError::KeyNotFound(format!("operation {id}")))
    }
}

fn validate_trade(usd: Money, rate: Rate) -> ResultEngine<()> {
    if !usd.is_positive() {
        return Err(EngineError::InvalidAmount(
            "usd amount must be > 0".to_string(),
        ));
    }
    if usd > Money::MAX_TRADE {
        return Err(EngineError::InvalidAmount(format!(
            "usd amount must be <= {}",
            Money::MAX_TRADE
        )));
    }
    if !rate.is_positive() {
        return Err(EngineError::InvalidAmount("rate must be > 0".to_string()));
    }
    if rate > Rate::MAX_TRADE {
        return Err(EngineError::InvalidAmount(format!(
            "rate must be <= {}",
            Rate::MAX_TRADE
        )));
    }
    Ok(())
}

fn missing_total(shortfalls: &[replay::Shortfall]) -> Money {
    shortfalls.iter().map(|s| s.missing).sum()
}

fn log_shortfalls(account_id: &str, shortfalls: &[replay::Shortfall]) {
    for shortfall in shortfalls {
        tracing::warn!(
            account = %account_id,
            operation = %shortfall.operation_id,
            missing = %shortfall.missing,
            "sale not covered by the ledger during rebuild"
        );
    }
}
