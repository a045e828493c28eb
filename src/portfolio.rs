//! Portfolio report assembly
//!
//! Pulls records through the collaborator traits and runs the calculators
//! in dependency order: holdings, then summary and performance (which both
//! need holdings), with recommendation metrics independent of the rest.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::Config;
use crate::error::Result;
use crate::holdings::{calculate_holdings, Holding};
use crate::ledger::{CashLedger, PriceSource, RecommendationReader, TransactionReader};
use crate::performance::{PerformanceCalculator, PerformanceMetrics};
use crate::recommendations::{AIRecommendationMetrics, RecommendationScorer};
use crate::summary::{summarize, PortfolioSummary};

/// Everything the analytics core derives from the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioReport {
    pub holdings: Vec<Holding>,
    pub summary: PortfolioSummary,
    pub performance: PerformanceMetrics,
    pub ai_metrics: AIRecommendationMetrics,
}

pub struct PortfolioAnalyzer<'a> {
    transactions: &'a dyn TransactionReader,
    cash: &'a dyn CashLedger,
    prices: &'a dyn PriceSource,
    recommendations: &'a dyn RecommendationReader,
    calculator: PerformanceCalculator,
    scorer: RecommendationScorer,
}

impl<'a> PortfolioAnalyzer<'a> {
    /// Analyzer over a single store that provides every collaborator
    pub fn new<L>(ledger: &'a L) -> Self
    where
        L: TransactionReader + CashLedger + PriceSource + RecommendationReader,
    {
        Self::with_collaborators(ledger, ledger, ledger, ledger)
    }

    pub fn with_collaborators(
        transactions: &'a dyn TransactionReader,
        cash: &'a dyn CashLedger,
        prices: &'a dyn PriceSource,
        recommendations: &'a dyn RecommendationReader,
    ) -> Self {
        Self {
            transactions,
            cash,
            prices,
            recommendations,
            calculator: PerformanceCalculator::default(),
            scorer: RecommendationScorer::default(),
        }
    }

    /// Use the analytics constants and scoring settings from `config`
    pub fn with_config(mut self, config: &Config) -> Self {
        self.calculator = PerformanceCalculator::from(&config.analytics);
        self.scorer = RecommendationScorer::from(&config.recommendations);
        self
    }

    pub fn holdings(&self) -> Result<Vec<Holding>> {
        let mut transactions = self.transactions.transactions()?;
        transactions.sort_by_key(|tx| tx.timestamp);
        calculate_holdings(&transactions, &self.prices.prices()?)
    }

    pub fn ai_metrics(&self) -> Result<AIRecommendationMetrics> {
        let recommendations = self.recommendations.recommendations()?;
        Ok(self.scorer.calculate(&recommendations))
    }

    /// Build the full report.
    ///
    /// Fails with [`crate::AnalyticsError::MissingPriceData`] when a held
    /// symbol has no price; no partial report is produced.
    pub fn report(&self) -> Result<PortfolioReport> {
        let mut transactions = self.transactions.transactions()?;
        transactions.sort_by_key(|tx| tx.timestamp);
        let prices = self.prices.prices()?;
        let cash_balance = self.cash.cash_balance()?;
        debug!(
            "Analyzing {} transactions against {} price snapshots",
            transactions.len(),
            prices.len()
        );

        let holdings = calculate_holdings(&transactions, &prices)?;
        let summary = summarize(&holdings, cash_balance, &transactions);
        let performance = self
            .calculator
            .calculate(&transactions, &holdings, &prices, cash_balance);
        let ai_metrics = self.ai_metrics()?;

        info!(
            "Portfolio report: {} holdings, value {}, return {:.2}%",
            holdings.len(),
            summary.total_portfolio_value,
            performance.total_return_pct
        );

        Ok(PortfolioReport {
            holdings,
            summary,
            performance,
            ai_metrics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::InMemoryLedger;
    use crate::recommendations::{Recommendation, RecommendationKind, RecommendationStatus};
    use crate::{AnalyticsError, CashKind, CashTransaction, Money, PriceSnapshot, Transaction};
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn m(value: i64) -> Money {
        Money::from_i64(value)
    }

    fn t(day: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 1, 16, 0, 0).unwrap() + Duration::days(day)
    }

    fn ledger() -> InMemoryLedger {
        let mut ledger = InMemoryLedger::new();
        ledger
            .record_cash_transaction(CashTransaction::new(m(10_000), CashKind::Deposit, t(0)))
            .unwrap();
        ledger.record_transaction(Transaction::buy("X", m(10), m(100), t(1))).unwrap();
        ledger.record_transaction(Transaction::buy("X", m(10), m(120), t(2))).unwrap();
        ledger.record_transaction(Transaction::sell("X", m(5), m(130), t(3))).unwrap();
        ledger.upsert_price(PriceSnapshot::new("X", "X Corp", m(150))).unwrap();
        ledger
    }

    #[test]
    fn test_report_combines_calculators() {
        let ledger = ledger();
        let report = PortfolioAnalyzer::new(&ledger).report().unwrap();

        assert_eq!(report.holdings.len(), 1);
        assert_eq!(report.holdings[0].total_shares, m(15));
        assert_eq!(report.summary.cash_balance, m(10_000));
        assert_eq!(report.summary.total_portfolio_value, m(12_250));
        assert_eq!(report.performance.initial_cash, m(10_000));
        // Invested 1000 + 1200 - 650 = 1550, current value 2250
        assert_eq!(report.performance.total_invested, m(1_550));
        assert_eq!(report.performance.current_value, m(2_250));
        assert_eq!(report.ai_metrics.total_recommendations, 0);
    }

    #[test]
    fn test_missing_price_fails_whole_report() {
        let mut ledger = ledger();
        ledger.record_transaction(Transaction::buy("Y", m(1), m(10), t(4))).unwrap();

        let analyzer = PortfolioAnalyzer::new(&ledger);
        assert!(matches!(
            analyzer.report(),
            Err(AnalyticsError::MissingPriceData { .. })
        ));
        // Recommendation metrics do not depend on prices
        assert!(analyzer.ai_metrics().is_ok());
    }

    #[test]
    fn test_config_selects_scoring_mode() {
        let mut ledger = ledger();
        ledger
            .record_recommendation(
                Recommendation::new("X", RecommendationKind::Buy, 95, m(100), m(140), t(0))
                    .with_status(RecommendationStatus::Executed)
                    .with_realized_price(m(130)),
            )
            .unwrap();

        let proxy = PortfolioAnalyzer::new(&ledger).ai_metrics().unwrap();
        assert_eq!(proxy.successful_recommendations, 1);

        let mut config = Config::default();
        config.recommendations.scoring = crate::recommendations::ScoringMode::RealizedOutcome;
        let realized = PortfolioAnalyzer::new(&ledger)
            .with_config(&config)
            .ai_metrics()
            .unwrap();
        assert_eq!(realized.successful_recommendations, 0);
    }
}
