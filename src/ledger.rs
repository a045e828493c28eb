//! Collaborator interfaces and an in-memory ledger
//!
//! The calculators never read storage directly. [`crate::portfolio::PortfolioAnalyzer`]
//! pulls records through these traits, which the in-memory ledger here and
//! [`crate::store::SqliteLedger`] both implement.

use chrono::{DateTime, Utc};
use std::cmp::Reverse;
use tracing::debug;

use crate::error::{AnalyticsError, Result};
use crate::recommendations::{Recommendation, RecommendationStatus};
use crate::{CashTransaction, Money, PriceMap, PriceSnapshot, Side, Symbol, Transaction};

/// Source of the stock transaction ledger. Order is unspecified.
pub trait TransactionReader {
    fn transactions(&self) -> Result<Vec<Transaction>>;
}

pub trait CashLedger {
    fn cash_transactions(&self) -> Result<Vec<CashTransaction>>;

    /// Deposits minus withdrawals
    fn cash_balance(&self) -> Result<Money> {
        Ok(crate::summary::cash_balance(&self.cash_transactions()?))
    }
}

/// Latest price snapshot per symbol
pub trait PriceSource {
    fn prices(&self) -> Result<PriceMap>;
}

pub trait RecommendationReader {
    fn recommendations(&self) -> Result<Vec<Recommendation>>;
}

/// Check that recording `tx` keeps every position in its symbol non-negative.
///
/// `tx` is placed after existing transactions with the same timestamp, then
/// the symbol's history is replayed. A backdated sell is rejected both when
/// it oversells at its own timestamp and when it would leave a later sell
/// uncovered.
pub fn check_position(history: &[Transaction], tx: &Transaction) -> Result<()> {
    tx.validate()?;

    let mut timeline: Vec<&Transaction> = history
        .iter()
        .filter(|t| t.symbol == tx.symbol)
        .collect();
    timeline.sort_by_key(|t| t.timestamp);
    let at = timeline.partition_point(|t| t.timestamp <= tx.timestamp);
    timeline.insert(at, tx);

    let mut held = Money::ZERO;
    for t in timeline {
        match t.side {
            Side::Buy => held += t.shares,
            Side::Sell => {
                if t.shares > held {
                    return Err(AnalyticsError::Oversell {
                        symbol: t.symbol.clone(),
                        requested: t.shares,
                        held,
                    });
                }
                held -= t.shares;
            }
        }
    }
    Ok(())
}

/// Apply a status change the way both ledgers do: the `executed` flag
/// follows the status, and execution details are only overwritten when given.
pub(crate) fn apply_status(
    rec: &mut Recommendation,
    status: RecommendationStatus,
    related_transaction_id: Option<i64>,
    executed_at: Option<DateTime<Utc>>,
) {
    rec.status = status;
    rec.executed = status == RecommendationStatus::Executed;
    if related_transaction_id.is_some() {
        rec.related_transaction_id = related_transaction_id;
    }
    if executed_at.is_some() {
        rec.executed_at = executed_at;
    }
}

/// Ledger held entirely in memory. Appends are validated.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedger {
    transactions: Vec<Transaction>,
    cash: Vec<CashTransaction>,
    prices: PriceMap,
    recommendations: Vec<Recommendation>,
    next_id: i64,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    /// Record a transaction and return its id.
    ///
    /// Fails with [`AnalyticsError::InvalidTransaction`] for non-positive
    /// shares or price and with [`AnalyticsError::Oversell`] for a sell not
    /// covered by the shares held.
    pub fn record_transaction(&mut self, mut tx: Transaction) -> Result<i64> {
        check_position(&self.transactions, &tx)?;
        let id = self.allocate_id();
        tx.id = Some(id);
        debug!("Recorded {} {} {} @ {}", tx.side.as_str(), tx.shares, tx.symbol, tx.price);
        self.transactions.push(tx);
        Ok(id)
    }

    pub fn record_cash_transaction(&mut self, mut tx: CashTransaction) -> Result<i64> {
        tx.validate()?;
        let id = self.allocate_id();
        tx.id = Some(id);
        self.cash.push(tx);
        Ok(id)
    }

    /// Insert or replace the snapshot for a symbol
    pub fn upsert_price(&mut self, snapshot: PriceSnapshot) -> Result<()> {
        snapshot.validate()?;
        self.prices.insert(snapshot.symbol.clone(), snapshot);
        Ok(())
    }

    pub fn record_recommendation(&mut self, mut rec: Recommendation) -> Result<i64> {
        rec.validate()?;
        let id = self.allocate_id();
        rec.id = Some(id);
        self.recommendations.push(rec);
        Ok(id)
    }

    pub fn update_recommendation_status(
        &mut self,
        id: i64,
        status: RecommendationStatus,
        related_transaction_id: Option<i64>,
        executed_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let rec = self
            .recommendations
            .iter_mut()
            .find(|r| r.id == Some(id))
            .ok_or(AnalyticsError::RecommendationNotFound(id))?;
        apply_status(rec, status, related_transaction_id, executed_at);
        Ok(())
    }

    /// Up to `limit` transactions, newest first
    pub fn recent_transactions(&self, limit: usize) -> Vec<Transaction> {
        let mut txs = self.transactions.clone();
        txs.sort_by_key(|tx| Reverse(tx.timestamp));
        txs.truncate(limit);
        txs
    }

    /// Up to `limit` cash movements, newest first
    pub fn recent_cash_transactions(&self, limit: usize) -> Vec<CashTransaction> {
        let mut cash = self.cash.clone();
        cash.sort_by_key(|tx| Reverse(tx.timestamp));
        cash.truncate(limit);
        cash
    }

    /// Transactions in one symbol, oldest first
    pub fn transactions_for_symbol(&self, symbol: &Symbol) -> Vec<Transaction> {
        let mut txs: Vec<Transaction> = self
            .transactions
            .iter()
            .filter(|tx| &tx.symbol == symbol)
            .cloned()
            .collect();
        txs.sort_by_key(|tx| tx.timestamp);
        txs
    }
}

impl TransactionReader for InMemoryLedger {
    fn transactions(&self) -> Result<Vec<Transaction>> {
        Ok(self.transactions.clone())
    }
}

impl CashLedger for InMemoryLedger {
    fn cash_transactions(&self) -> Result<Vec<CashTransaction>> {
        Ok(self.cash.clone())
    }
}

impl PriceSource for InMemoryLedger {
    fn prices(&self) -> Result<PriceMap> {
        Ok(self.prices.clone())
    }
}

impl RecommendationReader for InMemoryLedger {
    fn recommendations(&self) -> Result<Vec<Recommendation>> {
        Ok(self.recommendations.clone())
    }
}
