//! The module contains the errors the engine can throw.
//!
//! - [`InvalidAmount`] thrown when a USD amount or a rate is not positive or
//!   cannot be parsed. Raised before any state is touched.
//! - [`InsufficientFunds`] thrown when a sale asks for more dollars than the
//!   lot ledger holds.
//! - [`KeyNotFound`] thrown when an operation is not found.
//! - [`Database`] thrown when the store fails; the surrounding DB transaction
//!   is rolled back, so durable state is left untouched.
//!
//!  [`InvalidAmount`]: EngineError::InvalidAmount
//!  [`InsufficientFunds`]: EngineError::InsufficientFunds
//!  [`KeyNotFound`]: EngineError::KeyNotFound
//!  [`Database`]: EngineError::Database
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("Invalid stored data: {0}")]
    InvalidData(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::InsufficientFunds(a), Self::InsufficientFunds(b)) => a == b,
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::InvalidData(a), Self::InvalidData(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
