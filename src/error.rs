//! Error types for the analytics core and the ledger stores

use thiserror::Error;

use crate::types::{Money, Symbol};

/// Failures surfaced by the calculators and ledger ingestion
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// A symbol still held after folding the ledger has no price snapshot.
    /// Holdings, summary and performance all need complete price coverage.
    #[error("no current price data for held symbol {symbol}")]
    MissingPriceData { symbol: Symbol },

    #[error("sell of {requested} {symbol} exceeds the {held} shares held")]
    Oversell {
        symbol: Symbol,
        requested: Money,
        held: Money,
    },

    #[error("invalid transaction: {0}")]
    InvalidTransaction(String),

    #[error("recommendation not found: {0}")]
    RecommendationNotFound(i64),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Failures of the persistence layer behind the collaborator traits
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt ledger data: {0}")]
    Corrupt(String),
}

pub type Result<T> = std::result::Result<T, AnalyticsError>;

impl From<rusqlite::Error> for AnalyticsError {
    fn from(err: rusqlite::Error) -> Self {
        AnalyticsError::Ledger(LedgerError::Sqlite(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_price_message_names_symbol() {
        let err = AnalyticsError::MissingPriceData {
            symbol: Symbol::new("NVDA"),
        };
        assert_eq!(err.to_string(), "no current price data for held symbol NVDA");
    }

    #[test]
    fn test_oversell_message() {
        let err = AnalyticsError::Oversell {
            symbol: Symbol::new("TSLA"),
            requested: Money::from_i64(15),
            held: Money::from_i64(10),
        };
        assert_eq!(err.to_string(), "sell of 15 TSLA exceeds the 10 shares held");
    }
}
