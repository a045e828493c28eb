//! Holdings calculation with weighted-average cost accounting
//!
//! Folds the transaction ledger into one cost-basis accumulator per symbol,
//! then prices every surviving position with its current snapshot.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::error::{AnalyticsError, Result};
use crate::{Money, PriceMap, PriceSnapshot, Side, Symbol, Transaction};

/// Running share count and retained cost for one symbol
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PositionBasis {
    pub shares: Money,
    pub cost: Money,
}

impl PositionBasis {
    /// Apply one transaction.
    ///
    /// A sell releases `cost / shares` per share sold, so the per-share
    /// average of the remaining position is unchanged.
    pub fn apply(&mut self, tx: &Transaction) {
        match tx.side {
            Side::Buy => {
                self.shares += tx.shares;
                self.cost += tx.notional();
            }
            Side::Sell => {
                let released = self.cost / self.shares * tx.shares;
                self.cost -= released;
                self.shares -= tx.shares;
            }
        }
    }

    pub fn average_cost(&self) -> Money {
        self.cost / self.shares
    }
}

/// Fold transactions, in the order given, into per-symbol positions.
///
/// Symbols that net to exactly zero shares are dropped, so a later buy of
/// the same symbol starts from an empty basis. Input must already be in
/// ascending timestamp order; this is an accounting fold and does not sort.
pub fn fold_positions(transactions: &[Transaction]) -> BTreeMap<Symbol, PositionBasis> {
    let mut positions: BTreeMap<Symbol, PositionBasis> = BTreeMap::new();

    for tx in transactions {
        let basis = positions.entry(tx.symbol.clone()).or_default();
        basis.apply(tx);

        if basis.shares.is_zero() {
            positions.remove(&tx.symbol);
        } else if basis.shares.is_negative() {
            warn!(
                "{} position is negative ({} shares) after {} of {}",
                tx.symbol,
                basis.shares,
                tx.side.as_str(),
                tx.shares
            );
        }
    }

    positions
}

/// Current position in a symbol, priced at its latest snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub symbol: Symbol,
    pub display_name: String,
    pub current_price: Money,
    pub total_shares: Money,
    /// Retained cost basis of the position
    pub total_cost: Money,
    pub average_cost: Money,
    pub total_value: Money,
    pub gain_loss: Money,
    pub gain_loss_pct: f64,
}

impl Holding {
    fn from_basis(symbol: Symbol, basis: PositionBasis, snapshot: &PriceSnapshot) -> Self {
        let total_value = basis.shares * snapshot.current_price;
        let gain_loss = total_value - basis.cost;
        let gain_loss_pct = if basis.cost.is_zero() {
            0.0
        } else {
            (gain_loss / basis.cost).to_f64() * 100.0
        };

        Holding {
            symbol,
            display_name: snapshot.display_name.clone(),
            current_price: snapshot.current_price,
            total_shares: basis.shares,
            total_cost: basis.cost,
            average_cost: basis.average_cost(),
            total_value,
            gain_loss,
            gain_loss_pct,
        }
    }
}

/// Derive current holdings from an ordered transaction ledger.
///
/// Holdings come back in ascending symbol order. Fails with
/// [`AnalyticsError::MissingPriceData`] if any symbol still held has no
/// snapshot in `prices`; a partial result would corrupt summary totals.
///
/// A sell larger than the position is not rejected here and leaves a
/// negative share count. Use a validating ledger
/// ([`crate::ledger::InMemoryLedger`], [`crate::store::SqliteLedger`]) to
/// keep that out of the input.
pub fn calculate_holdings(
    transactions: &[Transaction],
    prices: &PriceMap,
) -> Result<Vec<Holding>> {
    let positions = fold_positions(transactions);
    debug!(
        "Folded {} transactions into {} open positions",
        transactions.len(),
        positions.len()
    );

    positions
        .into_iter()
        .map(|(symbol, basis)| {
            let snapshot = prices
                .get(&symbol)
                .ok_or_else(|| AnalyticsError::MissingPriceData {
                    symbol: symbol.clone(),
                })?;
            Ok(Holding::from_basis(symbol, basis, snapshot))
        })
        .collect()
}
