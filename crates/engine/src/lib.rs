//! Dollar lot accounting for a currency-exchange desk.
//!
//! Purchases open lots at their acquisition rate, sales consume the cheapest
//! lots first and realize `proceeds - cost` as profit. The [`Engine`] keeps
//! one ledger, one history and one rate store per account, persisted with
//! sea-orm; [`Desk`] is the in-memory recorder it drives.

pub use commands::{OperationEdit, OperationFilter, Period, TradeCmd};
pub use currency::Currency;
pub use desk::{Desk, SaleQuote};
pub use error::EngineError;
pub use ledger::{Allocation, BlockUsed, LotLedger};
pub use lots::Lot;
pub use money::Money;
pub use operations::{Operation, OperationKind};
pub use ops::{DEFAULT_TRASH_RETENTION_DAYS, Engine, EngineBuilder, TrashEntry};
pub use rate::Rate;
pub use rates::{Rates, UpdateWindow};
pub use receipt::{RECEIPT_WIDTH, Receipt};
pub use replay::{Replay, Shortfall, rebuild, replay};
pub use stats::Statistics;

mod commands;
mod currency;
mod desk;
mod error;
mod ledger;
mod lots;
mod money;
mod operations;
mod ops;
mod rate;
mod rates;
mod receipt;
mod replay;
mod stats;
mod util;

type ResultEngine<T> = Result<T, EngineError>;
