//! Portfolio Analytics
//!
//! Turns an append-only ledger of stock and cash transactions plus current
//! price snapshots into holdings with weighted-average cost basis, a
//! portfolio summary, performance/risk metrics, and quality metrics for
//! AI-generated stock recommendations.
//!
//! All calculators are pure functions over in-memory data. The ledger,
//! price and recommendation stores are injected through the traits in
//! [`ledger`].

pub mod config;
pub mod data;
pub mod error;
pub mod holdings;
pub mod ledger;
pub mod performance;
pub mod portfolio;
pub mod recommendations;
pub mod store;
pub mod summary;
pub mod types;

pub use config::Config;
pub use error::{AnalyticsError, LedgerError, Result};
pub use holdings::{calculate_holdings, Holding};
pub use performance::{calculate_metrics, PerformanceCalculator, PerformanceMetrics};
pub use portfolio::{PortfolioAnalyzer, PortfolioReport};
pub use recommendations::{
    calculate_ai_metrics, AIRecommendationMetrics, Recommendation, RecommendationKind,
    RecommendationScorer, RecommendationStatus,
};
pub use summary::{cash_balance, summarize, PortfolioSummary};
pub use types::*;
