//! Portfolio-level summary over holdings and cash

use serde::{Deserialize, Serialize};

use crate::holdings::Holding;
use crate::{CashTransaction, Money, Side, Transaction};

/// Snapshot of the whole portfolio
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSummary {
    /// Holdings value plus cash balance
    pub total_portfolio_value: Money,
    pub total_gain_loss: Money,
    pub total_gain_loss_pct: f64,
    pub stock_count: usize,
    pub cash_balance: Money,
    /// Cash balance adjusted by all sell proceeds and buy costs ever recorded
    pub available_cash: Money,
}

/// Sum of deposits minus sum of withdrawals
pub fn cash_balance(cash_transactions: &[CashTransaction]) -> Money {
    cash_transactions.iter().map(|tx| tx.signed_amount()).sum()
}

/// Combine holdings, cash and trading activity into a [`PortfolioSummary`].
///
/// `available_cash` is computed over every transaction, including those for
/// positions since closed, so it reflects cumulative cash moved by trading
/// rather than the current holdings.
pub fn summarize(
    holdings: &[Holding],
    cash_balance: Money,
    transactions: &[Transaction],
) -> PortfolioSummary {
    let holdings_value: Money = holdings.iter().map(|h| h.total_value).sum();
    let total_gain_loss: Money = holdings.iter().map(|h| h.gain_loss).sum();
    let total_portfolio_value = holdings_value + cash_balance;

    // Denominator reduces to the cost basis of the current holdings
    let invested = total_portfolio_value - cash_balance - total_gain_loss;
    let total_gain_loss_pct = if invested.is_zero() {
        0.0
    } else {
        (total_gain_loss / invested).to_f64() * 100.0
    };

    let (sell_proceeds, buy_cost) = transactions.iter().fold(
        (Money::ZERO, Money::ZERO),
        |(sells, buys), tx| match tx.side {
            Side::Sell => (sells + tx.notional(), buys),
            Side::Buy => (sells, buys + tx.notional()),
        },
    );

    PortfolioSummary {
        total_portfolio_value,
        total_gain_loss,
        total_gain_loss_pct,
        stock_count: holdings.len(),
        cash_balance,
        available_cash: cash_balance + sell_proceeds - buy_cost,
    }
}
