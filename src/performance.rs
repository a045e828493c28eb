//! Performance and risk analytics
//!
//! Derives a per-transaction value series from the ledger and current
//! prices, then computes return, volatility, drawdown, risk-adjusted ratios
//! and trade-level win/loss statistics.
//!
//! # Valuation model
//!
//! The series values every transaction at the symbol's *current* price, not
//! at its execution price. No historical quotes are involved, so the series
//! tracks exposure changes rather than true historical portfolio value.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use tracing::{debug, warn};

use crate::config::AnalyticsSettings;
use crate::holdings::Holding;
use crate::{Money, PriceMap, Side, Transaction};

/// Annual risk-free rate used by the Sharpe ratio
pub const RISK_FREE_RATE: f64 = 0.02;
/// Annualization factor for volatility
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;
/// Calendar length of a year when converting the ledger timespan
pub const DAYS_PER_YEAR: f64 = 365.25;

/// Portfolio performance statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    /// Buy cost minus sell proceeds over the whole ledger
    pub total_invested: Money,
    /// Market value of current holdings
    pub current_value: Money,
    pub total_return: Money,
    pub total_return_pct: f64,
    /// Compound annual growth as a fraction (0.10 = 10%)
    pub annualized_return: f64,
    /// Annualized standard deviation of series returns, in percent
    pub volatility: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub calmar_ratio: f64,
    /// Largest peak-to-trough decline of the series, in percent
    pub max_drawdown: f64,
    /// Decline of the final point from the series peak, in percent
    pub current_drawdown: f64,
    pub win_rate: f64,
    pub avg_win: Money,
    pub avg_loss: Money,
    pub profit_factor: f64,
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub largest_win: Money,
    /// Most negative trade P&L (zero or below)
    pub largest_loss: Money,
    pub consecutive_wins: usize,
    pub consecutive_losses: usize,
    /// Cash the caller supplied; reported as-is
    pub initial_cash: Money,
}

/// One point of the per-transaction value series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    pub timestamp: DateTime<Utc>,
    pub portfolio_value: Money,
    /// Change relative to the previous point (0 when that value is not positive)
    pub daily_return: f64,
    /// Change relative to the first point (0 when that value is not positive)
    pub cumulative_return: f64,
    /// Decline from the running peak, in percent
    pub drawdown: f64,
}

/// Win/loss classification of every transaction if closed at the current price
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TradeStats {
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub total_win_amount: Money,
    pub total_loss_amount: Money,
    pub largest_win: Money,
    pub largest_loss: Money,
    pub consecutive_wins: usize,
    pub consecutive_losses: usize,
}

impl TradeStats {
    pub fn win_rate(&self) -> f64 {
        if self.total_trades == 0 {
            return 0.0;
        }
        (self.winning_trades as f64 / self.total_trades as f64) * 100.0
    }

    pub fn avg_win(&self) -> Money {
        self.total_win_amount / Money::from_i64(self.winning_trades as i64)
    }

    pub fn avg_loss(&self) -> Money {
        self.total_loss_amount / Money::from_i64(self.losing_trades as i64)
    }

    /// Total win amount over total loss amount; 0 when nothing was lost
    pub fn profit_factor(&self) -> f64 {
        (self.total_win_amount / self.total_loss_amount).to_f64()
    }
}

/// Stateless calculator for [`PerformanceMetrics`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerformanceCalculator {
    pub risk_free_rate: f64,
    pub trading_days_per_year: f64,
    pub days_per_year: f64,
}

impl Default for PerformanceCalculator {
    fn default() -> Self {
        Self {
            risk_free_rate: RISK_FREE_RATE,
            trading_days_per_year: TRADING_DAYS_PER_YEAR,
            days_per_year: DAYS_PER_YEAR,
        }
    }
}

impl From<&AnalyticsSettings> for PerformanceCalculator {
    fn from(settings: &AnalyticsSettings) -> Self {
        Self {
            risk_free_rate: settings.risk_free_rate,
            trading_days_per_year: settings.trading_days_per_year,
            days_per_year: settings.days_per_year,
        }
    }
}

impl PerformanceCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute all metrics.
    ///
    /// Transactions may be in any order; a sorted copy is used. Transactions
    /// whose symbol has no price snapshot are left out of the series and the
    /// trade statistics. An empty ledger yields all-zero metrics.
    pub fn calculate(
        &self,
        transactions: &[Transaction],
        holdings: &[Holding],
        prices: &PriceMap,
        initial_cash: Money,
    ) -> PerformanceMetrics {
        let mut sorted = transactions.to_vec();
        sorted.sort_by_key(|tx| tx.timestamp);

        let total_invested: Money = sorted
            .iter()
            .map(|tx| match tx.side {
                Side::Buy => tx.notional(),
                Side::Sell => -tx.notional(),
            })
            .sum();
        let current_value: Money = holdings
            .iter()
            .map(|h| h.current_price * h.total_shares)
            .sum();
        let total_return = current_value - total_invested;
        let total_return_pct = if total_invested.is_positive() {
            (total_return / total_invested).to_f64() * 100.0
        } else {
            0.0
        };

        let series = self.time_series(&sorted, prices);
        let daily_returns: Vec<f64> = series
            .iter()
            .map(|point| point.daily_return)
            .filter(|r| *r != 0.0)
            .collect();

        let volatility = self.volatility(&daily_returns);
        let max_drawdown = max_drawdown(&series);
        let current_drawdown = current_drawdown(&series);

        let trades = analyze_trades(&sorted, prices);

        let annualized_return =
            annualized_return(total_return_pct, self.timespan_years(&sorted));
        let sharpe_ratio = self.sharpe_ratio(annualized_return, volatility);
        let calmar_ratio = if max_drawdown != 0.0 {
            annualized_return / max_drawdown.abs()
        } else {
            0.0
        };
        let sortino_ratio = sortino_ratio(&daily_returns, annualized_return);

        debug!(
            "Performance over {} transactions: {} series points, return {:.2}%, volatility {:.2}%",
            sorted.len(),
            series.len(),
            total_return_pct,
            volatility
        );

        PerformanceMetrics {
            total_invested,
            current_value,
            total_return,
            total_return_pct,
            annualized_return,
            volatility,
            sharpe_ratio,
            sortino_ratio,
            calmar_ratio,
            max_drawdown,
            current_drawdown,
            win_rate: trades.win_rate(),
            avg_win: trades.avg_win(),
            avg_loss: trades.avg_loss(),
            profit_factor: trades.profit_factor(),
            total_trades: trades.total_trades,
            winning_trades: trades.winning_trades,
            losing_trades: trades.losing_trades,
            largest_win: trades.largest_win,
            largest_loss: trades.largest_loss,
            consecutive_wins: trades.consecutive_wins,
            consecutive_losses: trades.consecutive_losses,
            initial_cash,
        }
    }

    /// Build the value series from transactions already in timestamp order.
    ///
    /// Buys add `shares x current price`, sells subtract it.
    pub fn time_series(&self, sorted: &[Transaction], prices: &PriceMap) -> Vec<TimeSeriesPoint> {
        let mut series: Vec<TimeSeriesPoint> = Vec::with_capacity(sorted.len());
        let mut value = Money::ZERO;
        let mut previous = Money::ZERO;
        let mut first: Option<Money> = None;
        let mut peak = Money::ZERO;

        for tx in sorted {
            let Some(snapshot) = prices.get(&tx.symbol) else {
                warn!(
                    "No price snapshot for {}; {} at {} left out of the value series",
                    tx.symbol,
                    tx.side.as_str(),
                    tx.timestamp
                );
                continue;
            };

            let exposure = tx.shares * snapshot.current_price;
            match tx.side {
                Side::Buy => value += exposure,
                Side::Sell => value -= exposure,
            }

            let base = *first.get_or_insert(value);
            peak = peak.max(value);

            series.push(TimeSeriesPoint {
                timestamp: tx.timestamp,
                portfolio_value: value,
                daily_return: relative_change(value, previous),
                cumulative_return: relative_change(value, base),
                drawdown: drawdown_pct(peak, value),
            });
            previous = value;
        }

        series
    }

    /// Annualized sample standard deviation in percent; 0 below two returns
    fn volatility(&self, returns: &[f64]) -> f64 {
        if returns.len() < 2 {
            return 0.0;
        }
        returns.iter().std_dev() * self.trading_days_per_year.sqrt() * 100.0
    }

    /// Years between first and last transaction; 1 below two transactions
    fn timespan_years(&self, sorted: &[Transaction]) -> f64 {
        match (sorted.first(), sorted.last()) {
            (Some(first), Some(last)) if sorted.len() >= 2 => {
                let seconds = (last.timestamp - first.timestamp).num_seconds() as f64;
                seconds / (self.days_per_year * 24.0 * 3600.0)
            }
            _ => 1.0,
        }
    }

    fn sharpe_ratio(&self, annualized_return: f64, volatility: f64) -> f64 {
        if volatility > 0.0 {
            (annualized_return - self.risk_free_rate) / (volatility / 100.0)
        } else {
            0.0
        }
    }
}

/// Compute metrics with the default constants (2% risk-free rate, 252
/// trading days).
pub fn calculate_metrics(
    transactions: &[Transaction],
    holdings: &[Holding],
    prices: &PriceMap,
    initial_cash: Money,
) -> PerformanceMetrics {
    PerformanceCalculator::default().calculate(transactions, holdings, prices, initial_cash)
}

fn relative_change(value: Money, reference: Money) -> f64 {
    if reference.is_positive() {
        ((value - reference) / reference).to_f64()
    } else {
        0.0
    }
}

fn drawdown_pct(peak: Money, value: Money) -> f64 {
    if peak.is_positive() {
        ((peak - value) / peak).to_f64() * 100.0
    } else {
        0.0
    }
}

/// Largest drawdown observed against the running peak
fn max_drawdown(series: &[TimeSeriesPoint]) -> f64 {
    series.iter().map(|point| point.drawdown).fold(0.0, f64::max)
}

/// Drawdown of the final point from the series' overall peak
fn current_drawdown(series: &[TimeSeriesPoint]) -> f64 {
    let Some(last) = series.last() else {
        return 0.0;
    };
    let peak = series
        .iter()
        .map(|point| point.portfolio_value)
        .max()
        .unwrap_or(Money::ZERO);
    drawdown_pct(peak, last.portfolio_value)
}

/// `(1 + r)^(1/years) - 1`, with `r` a percentage.
///
/// Returns 0 for a non-positive timespan and for results that are not
/// finite (a loss beyond 100% has no real root).
fn annualized_return(total_return_pct: f64, years: f64) -> f64 {
    if years <= 0.0 {
        return 0.0;
    }
    let annualized = (1.0 + total_return_pct / 100.0).powf(1.0 / years) - 1.0;
    if annualized.is_finite() {
        annualized
    } else {
        0.0
    }
}

/// Ratio of the target return to the downside deviation below it
fn sortino_ratio(returns: &[f64], target: f64) -> f64 {
    let downside: Vec<f64> = returns.iter().copied().filter(|r| *r < target).collect();
    if downside.is_empty() {
        return 0.0;
    }

    let downside_deviation =
        (downside.iter().map(|r| (r - target).powi(2)).sum::<f64>() / downside.len() as f64).sqrt();

    if downside_deviation > 0.0 {
        target / downside_deviation
    } else {
        0.0
    }
}

/// Classify each transaction by the P&L it would realize at the current
/// price: buys gain when the price rose, sells gain when it fell.
pub fn analyze_trades(sorted: &[Transaction], prices: &PriceMap) -> TradeStats {
    let mut stats = TradeStats::default();
    let mut win_streak = 0;
    let mut loss_streak = 0;

    for tx in sorted {
        let Some(snapshot) = prices.get(&tx.symbol) else {
            continue;
        };

        stats.total_trades += 1;
        let pnl = match tx.side {
            Side::Buy => tx.shares * (snapshot.current_price - tx.price),
            Side::Sell => tx.shares * (tx.price - snapshot.current_price),
        };

        if pnl.is_positive() {
            stats.winning_trades += 1;
            stats.total_win_amount += pnl;
            stats.largest_win = stats.largest_win.max(pnl);
            win_streak += 1;
            loss_streak = 0;
        } else if pnl.is_negative() {
            stats.losing_trades += 1;
            stats.total_loss_amount += pnl.abs();
            stats.largest_loss = stats.largest_loss.min(pnl);
            loss_streak += 1;
            win_streak = 0;
        } else {
            win_streak = 0;
            loss_streak = 0;
        }

        stats.consecutive_wins = stats.consecutive_wins.max(win_streak);
        stats.consecutive_losses = stats.consecutive_losses.max(loss_streak);
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::holdings::calculate_holdings;
    use crate::{price_map, PriceSnapshot};
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use chrono::{Duration, TimeZone};

    fn m(value: i64) -> Money {
        Money::from_i64(value)
    }

    fn t(day: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap() + Duration::days(day)
    }

    fn scenario() -> (Vec<Transaction>, PriceMap) {
        let txs = vec![
            Transaction::buy("A", m(10), m(100), t(0)),
            Transaction::buy("B", m(20), m(60), t(1)),
            Transaction::sell("A", m(5), m(120), t(2)),
            Transaction::buy("B", m(10), m(45), t(3)),
        ];
        let prices = price_map(vec![
            PriceSnapshot::new("A", "Alpha", m(110)),
            PriceSnapshot::new("B", "Beta", m(50)),
        ]);
        (txs, prices)
    }

    fn metrics_for(txs: &[Transaction], prices: &PriceMap) -> PerformanceMetrics {
        let holdings = calculate_holdings(txs, prices).unwrap();
        calculate_metrics(txs, &holdings, prices, Money::ZERO)
    }

    #[test]
    fn test_empty_inputs_yield_zero_metrics() {
        let metrics = calculate_metrics(&[], &[], &PriceMap::new(), Money::ZERO);
        assert_eq!(metrics, PerformanceMetrics::default());
    }

    #[test]
    fn test_value_series_uses_current_prices() {
        let (txs, prices) = scenario();
        let series = PerformanceCalculator::new().time_series(&txs, &prices);

        let values: Vec<Money> = series.iter().map(|p| p.portfolio_value).collect();
        assert_eq!(values, vec![m(1100), m(2100), m(1550), m(2050)]);

        assert_eq!(series[0].daily_return, 0.0);
        assert_relative_eq!(series[1].daily_return, 1000.0 / 1100.0, epsilon = 1e-12);
        assert_relative_eq!(series[2].daily_return, -550.0 / 2100.0, epsilon = 1e-12);
        assert_relative_eq!(series[3].cumulative_return, 950.0 / 1100.0, epsilon = 1e-12);
        assert_abs_diff_eq!(series[2].drawdown, 550.0 / 2100.0 * 100.0, epsilon = 1e-9);
    }

    #[test]
    fn test_drawdowns() {
        let (txs, prices) = scenario();
        let metrics = metrics_for(&txs, &prices);

        assert_abs_diff_eq!(metrics.max_drawdown, 26.190476, epsilon = 1e-5);
        assert_abs_diff_eq!(metrics.current_drawdown, 2.380952, epsilon = 1e-5);
        assert!(metrics.max_drawdown >= metrics.current_drawdown);
    }

    #[test]
    fn test_volatility_is_annualized_sample_std_dev() {
        let (txs, prices) = scenario();
        let metrics = metrics_for(&txs, &prices);

        let returns = [1000.0 / 1100.0, -550.0 / 2100.0, 500.0 / 1550.0];
        let mean = returns.iter().sum::<f64>() / 3.0;
        let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / 2.0;
        let expected = variance.sqrt() * 252.0_f64.sqrt() * 100.0;

        assert_relative_eq!(metrics.volatility, expected, epsilon = 1e-9);
    }

    #[test]
    fn test_returns_and_ratios() {
        let (txs, prices) = scenario();
        let metrics = metrics_for(&txs, &prices);

        // 1000 + 1200 + 450 - 600
        assert_eq!(metrics.total_invested, m(2050));
        // 5 A @ 110 + 30 B @ 50
        assert_eq!(metrics.current_value, m(2050));
        assert_eq!(metrics.total_return, Money::ZERO);
        assert_eq!(metrics.total_return_pct, 0.0);
        assert_eq!(metrics.annualized_return, 0.0);

        let expected_sharpe = (0.0 - RISK_FREE_RATE) / (metrics.volatility / 100.0);
        assert_relative_eq!(metrics.sharpe_ratio, expected_sharpe, epsilon = 1e-12);
        assert_eq!(metrics.calmar_ratio, 0.0);
        assert_eq!(metrics.sortino_ratio, 0.0);
    }

    #[test]
    fn test_trade_statistics() {
        let (txs, prices) = scenario();
        let metrics = metrics_for(&txs, &prices);

        // A buy +100, B buy -200, A sell +50, B buy +50
        assert_eq!(metrics.total_trades, 4);
        assert_eq!(metrics.winning_trades, 3);
        assert_eq!(metrics.losing_trades, 1);
        assert_eq!(metrics.win_rate, 75.0);
        assert_eq!(metrics.avg_win.round_dp(2).to_f64(), 66.67);
        assert_eq!(metrics.avg_loss, m(200));
        assert_eq!(metrics.profit_factor, 1.0);
        assert_eq!(metrics.largest_win, m(100));
        assert_eq!(metrics.largest_loss, m(-200));
        assert_eq!(metrics.consecutive_wins, 2);
        assert_eq!(metrics.consecutive_losses, 1);
    }

    #[test]
    fn test_profit_factor_zero_without_losses() {
        let txs = vec![Transaction::buy("A", m(1), m(10), t(0))];
        let prices = price_map(vec![PriceSnapshot::new("A", "Alpha", m(12))]);
        let metrics = metrics_for(&txs, &prices);

        assert_eq!(metrics.winning_trades, 1);
        assert_eq!(metrics.profit_factor, 0.0);
        assert_eq!(metrics.avg_loss, Money::ZERO);
    }

    #[test]
    fn test_annualized_return_compounds_over_timespan() {
        let two_years = Duration::hours((2.0 * DAYS_PER_YEAR * 24.0) as i64);
        let start = t(0);
        let txs = vec![
            Transaction::buy("A", m(10), m(100), start),
            Transaction::buy("A", m(10), m(100), start + two_years),
        ];
        let prices = price_map(vec![PriceSnapshot::new("A", "Alpha", m(121))]);
        let metrics = metrics_for(&txs, &prices);

        assert_abs_diff_eq!(metrics.total_return_pct, 21.0, epsilon = 1e-9);
        // 1.21^(1/2) - 1
        assert_abs_diff_eq!(metrics.annualized_return, 0.1, epsilon = 1e-9);
    }

    #[test]
    fn test_single_transaction_uses_one_year_floor() {
        let txs = vec![Transaction::buy("A", m(10), m(100), t(0))];
        let prices = price_map(vec![PriceSnapshot::new("A", "Alpha", m(150))]);
        let metrics = metrics_for(&txs, &prices);

        assert_abs_diff_eq!(metrics.total_return_pct, 50.0, epsilon = 1e-9);
        assert_abs_diff_eq!(metrics.annualized_return, 0.5, epsilon = 1e-9);
        // Single point: no volatility, no drawdown
        assert_eq!(metrics.volatility, 0.0);
        assert_eq!(metrics.sharpe_ratio, 0.0);
        assert_eq!(metrics.max_drawdown, 0.0);
        assert_eq!(metrics.calmar_ratio, 0.0);
    }

    #[test]
    fn test_sortino_uses_downside_below_target() {
        let returns = [0.05, -0.02, 0.01, -0.04];
        let target = 0.02;
        // Below target: -0.02, 0.01, -0.04
        let expected_dd =
            (((-0.04_f64).powi(2) + (-0.01_f64).powi(2) + (-0.06_f64).powi(2)) / 3.0).sqrt();
        assert_relative_eq!(sortino_ratio(&returns, target), target / expected_dd, epsilon = 1e-12);
        assert_eq!(sortino_ratio(&[0.05, 0.03], 0.02), 0.0);
    }

    #[test]
    fn test_unsorted_input_matches_sorted() {
        let (txs, prices) = scenario();
        let mut shuffled = txs.clone();
        shuffled.reverse();

        let holdings = calculate_holdings(&txs, &prices).unwrap();
        let sorted_metrics = calculate_metrics(&txs, &holdings, &prices, m(500));
        let shuffled_metrics = calculate_metrics(&shuffled, &holdings, &prices, m(500));

        assert_eq!(sorted_metrics, shuffled_metrics);
        assert_eq!(sorted_metrics.initial_cash, m(500));
        // Caller's order untouched
        assert_eq!(shuffled[0].timestamp, t(3));
    }

    #[test]
    fn test_unpriced_symbols_are_skipped() {
        let txs = vec![
            Transaction::buy("A", m(10), m(100), t(0)),
            Transaction::buy("GONE", m(5), m(20), t(1)),
            Transaction::sell("GONE", m(5), m(25), t(2)),
        ];
        let prices = price_map(vec![PriceSnapshot::new("A", "Alpha", m(110))]);
        let metrics = metrics_for(&txs, &prices);

        assert_eq!(metrics.total_trades, 1);
        // Invested still counts every transaction: 1000 + 100 - 125
        assert_eq!(metrics.total_invested, m(975));
        assert_eq!(metrics.current_value, m(1100));
    }

    #[test]
    fn test_neutral_trade_breaks_streaks() {
        let txs = vec![
            Transaction::buy("A", m(1), m(90), t(0)),
            Transaction::buy("A", m(1), m(100), t(1)),
            Transaction::buy("A", m(1), m(95), t(2)),
            Transaction::buy("A", m(1), m(99), t(3)),
        ];
        let prices = price_map(vec![PriceSnapshot::new("A", "Alpha", m(100))]);
        let stats = analyze_trades(&txs, &prices);

        assert_eq!(stats.winning_trades, 3);
        assert_eq!(stats.consecutive_wins, 2);
        assert_eq!(stats.consecutive_losses, 0);
    }

    #[test]
    fn test_calculator_uses_configured_risk_free_rate() {
        let (txs, prices) = scenario();
        let holdings = calculate_holdings(&txs, &prices).unwrap();
        let calculator = PerformanceCalculator {
            risk_free_rate: 0.05,
            ..PerformanceCalculator::default()
        };
        let metrics = calculator.calculate(&txs, &holdings, &prices, Money::ZERO);

        let expected = (0.0 - 0.05) / (metrics.volatility / 100.0);
        assert_relative_eq!(metrics.sharpe_ratio, expected, epsilon = 1e-12);
    }
}
