//! AI recommendation quality metrics
//!
//! Scores AI-generated stock recommendations as a binary classifier:
//! executed recommendations that succeeded are true positives, executed ones
//! that failed are false positives, and rejected ones are false negatives.
//!
//! Two scoring modes are available:
//!
//! - [`ScoringMode::ConfidenceProxy`] treats `confidence > threshold` as
//!   success and `(confidence - 50) / 10` as the return. It needs no outcome
//!   data and is the default.
//! - [`ScoringMode::RealizedOutcome`] compares the recorded realized price
//!   with the target price and reports the realized percentage move.

use chrono::{DateTime, Duration, Utc};
use itertools::Itertools;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::config::RecommendationSettings;
use crate::error::AnalyticsError;
use crate::{Money, Symbol};

/// Recency windows for time-based accuracy, in days
const ACCURACY_WINDOWS: [(&str, i64); 4] = [
    ("1week", 7),
    ("1month", 30),
    ("3months", 90),
    ("6months", 180),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationStatus {
    Pending,
    Executed,
    Rejected,
    Expired,
}

impl RecommendationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Executed => "executed",
            Self::Rejected => "rejected",
            Self::Expired => "expired",
        }
    }
}

impl fmt::Display for RecommendationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecommendationStatus {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "executed" => Ok(Self::Executed),
            "rejected" => Ok(Self::Rejected),
            "expired" => Ok(Self::Expired),
            other => Err(AnalyticsError::InvalidTransaction(format!(
                "unknown recommendation status '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecommendationKind {
    Buy,
    Hold,
    Sell,
}

impl RecommendationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "Buy",
            Self::Hold => "Hold",
            Self::Sell => "Sell",
        }
    }
}

impl FromStr for RecommendationKind {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buy" => Ok(Self::Buy),
            "hold" => Ok(Self::Hold),
            "sell" => Ok(Self::Sell),
            other => Err(AnalyticsError::InvalidTransaction(format!(
                "unknown recommendation kind '{}'",
                other
            ))),
        }
    }
}

/// An AI-generated stock recommendation and its lifecycle state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub symbol: Symbol,
    pub display_name: String,
    pub price_at_creation: Money,
    pub target_price: Money,
    pub kind: RecommendationKind,
    /// 0 to 100
    pub confidence: u8,
    pub holding_period_days: u32,
    pub reasoning: String,
    pub created_at: DateTime<Utc>,
    pub status: RecommendationStatus,
    pub executed: bool,
    pub ai_model: String,
    #[serde(default)]
    pub related_transaction_id: Option<i64>,
    #[serde(default)]
    pub executed_at: Option<DateTime<Utc>>,
    /// Price observed at the end of the holding period, if tracked
    #[serde(default)]
    pub realized_price: Option<Money>,
}

impl Recommendation {
    /// A pending recommendation with empty metadata
    pub fn new(
        symbol: &str,
        kind: RecommendationKind,
        confidence: u8,
        price_at_creation: Money,
        target_price: Money,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: None,
            symbol: Symbol::new(symbol),
            display_name: symbol.to_string(),
            price_at_creation,
            target_price,
            kind,
            confidence,
            holding_period_days: 30,
            reasoning: String::new(),
            created_at,
            status: RecommendationStatus::Pending,
            executed: false,
            ai_model: String::new(),
            related_transaction_id: None,
            executed_at: None,
            realized_price: None,
        }
    }

    /// Set the status; the `executed` flag follows it
    pub fn with_status(mut self, status: RecommendationStatus) -> Self {
        self.status = status;
        self.executed = status == RecommendationStatus::Executed;
        self
    }

    pub fn with_execution(mut self, executed_at: DateTime<Utc>) -> Self {
        self.executed_at = Some(executed_at);
        self.with_status(RecommendationStatus::Executed)
    }

    pub fn with_realized_price(mut self, price: Money) -> Self {
        self.realized_price = Some(price);
        self
    }

    pub fn validate(&self) -> Result<(), AnalyticsError> {
        if self.confidence > 100 {
            return Err(AnalyticsError::InvalidTransaction(format!(
                "recommendation for {}: confidence {} exceeds 100",
                self.symbol, self.confidence
            )));
        }
        if !self.price_at_creation.is_positive() || !self.target_price.is_positive() {
            return Err(AnalyticsError::InvalidTransaction(format!(
                "recommendation for {}: prices must be > 0",
                self.symbol
            )));
        }
        Ok(())
    }

    /// Realized move from the creation price, in percent
    fn realized_move_pct(&self) -> Option<f64> {
        let realized = self.realized_price?;
        if !self.price_at_creation.is_positive() {
            return None;
        }
        Some(((realized - self.price_at_creation) / self.price_at_creation).to_f64() * 100.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringMode {
    #[default]
    ConfidenceProxy,
    RealizedOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceBucket {
    High,
    Medium,
    Low,
}

/// Recommendation counts per confidence bucket
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfidenceDistribution {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

/// Quality metrics for a set of recommendations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AIRecommendationMetrics {
    pub total_recommendations: usize,
    pub executed_recommendations: usize,
    pub successful_recommendations: usize,
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub average_confidence: f64,
    pub high_confidence_accuracy: f64,
    pub medium_confidence_accuracy: f64,
    pub low_confidence_accuracy: f64,
    pub average_return: f64,
    pub best_return: f64,
    pub worst_return: f64,
    pub recommendations_by_status: BTreeMap<RecommendationStatus, usize>,
    pub confidence_distribution: ConfidenceDistribution,
    /// Mean days from creation to execution; `None` when no executed
    /// recommendation records an execution time
    pub average_days_to_execution: Option<f64>,
    /// Accuracy of executed recommendations created within each window
    /// before the newest recommendation; empty windows are omitted
    pub time_based_accuracy: BTreeMap<String, f64>,
}

/// Scores recommendations and aggregates [`AIRecommendationMetrics`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecommendationScorer {
    pub mode: ScoringMode,
    /// Proxy success requires confidence strictly above this
    pub success_threshold: u8,
    /// Largest realized move, in percent, for a Hold to count as success
    pub hold_band_pct: f64,
    pub high_confidence: u8,
    pub medium_confidence: u8,
}

impl Default for RecommendationScorer {
    fn default() -> Self {
        Self {
            mode: ScoringMode::ConfidenceProxy,
            success_threshold: 70,
            hold_band_pct: 5.0,
            high_confidence: 80,
            medium_confidence: 60,
        }
    }
}

impl From<&RecommendationSettings> for RecommendationScorer {
    fn from(settings: &RecommendationSettings) -> Self {
        Self {
            mode: settings.scoring,
            success_threshold: settings.success_confidence_threshold,
            hold_band_pct: settings.hold_band_pct,
            high_confidence: settings.high_confidence,
            medium_confidence: settings.medium_confidence,
        }
    }
}

impl RecommendationScorer {
    pub fn new(mode: ScoringMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn bucket(&self, confidence: u8) -> ConfidenceBucket {
        if confidence >= self.high_confidence {
            ConfidenceBucket::High
        } else if confidence >= self.medium_confidence {
            ConfidenceBucket::Medium
        } else {
            ConfidenceBucket::Low
        }
    }

    pub fn is_successful(&self, rec: &Recommendation) -> bool {
        match self.mode {
            ScoringMode::ConfidenceProxy => rec.confidence > self.success_threshold,
            ScoringMode::RealizedOutcome => {
                let Some(realized) = rec.realized_price else {
                    return false;
                };
                match rec.kind {
                    RecommendationKind::Buy => realized >= rec.target_price,
                    RecommendationKind::Sell => realized <= rec.target_price,
                    RecommendationKind::Hold => rec
                        .realized_move_pct()
                        .is_some_and(|pct| pct.abs() <= self.hold_band_pct),
                }
            }
        }
    }

    /// Return attributed to a recommendation, in percent
    pub fn recommendation_return(&self, rec: &Recommendation) -> Option<f64> {
        match self.mode {
            ScoringMode::ConfidenceProxy => Some((f64::from(rec.confidence) - 50.0) / 10.0),
            ScoringMode::RealizedOutcome => rec.realized_move_pct().map(|pct| match rec.kind {
                RecommendationKind::Sell => -pct,
                RecommendationKind::Buy | RecommendationKind::Hold => pct,
            }),
        }
    }

    fn accuracy(&self, group: &[&Recommendation]) -> f64 {
        if group.is_empty() {
            return 0.0;
        }
        let successful = group.iter().filter(|r| self.is_successful(r)).count();
        (successful as f64 / group.len() as f64) * 100.0
    }

    pub fn calculate(&self, recommendations: &[Recommendation]) -> AIRecommendationMetrics {
        let executed: Vec<&Recommendation> = recommendations
            .iter()
            .filter(|r| r.status == RecommendationStatus::Executed)
            .collect();
        let successful = executed.iter().filter(|r| self.is_successful(r)).count();
        let rejected = recommendations
            .iter()
            .filter(|r| r.status == RecommendationStatus::Rejected)
            .count();

        let true_positives = successful;
        let false_positives = executed.len() - successful;
        let false_negatives = rejected;

        let precision = percentage(true_positives, true_positives + false_positives);
        let recall = percentage(true_positives, true_positives + false_negatives);
        let f1_score = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        let average_confidence = if recommendations.is_empty() {
            0.0
        } else {
            recommendations
                .iter()
                .map(|r| f64::from(r.confidence))
                .mean()
        };

        let mut distribution = ConfidenceDistribution::default();
        for rec in recommendations {
            match self.bucket(rec.confidence) {
                ConfidenceBucket::High => distribution.high += 1,
                ConfidenceBucket::Medium => distribution.medium += 1,
                ConfidenceBucket::Low => distribution.low += 1,
            }
        }

        let in_bucket = |bucket: ConfidenceBucket| -> Vec<&Recommendation> {
            executed
                .iter()
                .copied()
                .filter(|r| self.bucket(r.confidence) == bucket)
                .collect()
        };

        let returns: Vec<f64> = executed
            .iter()
            .filter_map(|r| self.recommendation_return(r))
            .collect();
        let (average_return, best_return, worst_return) = if returns.is_empty() {
            (0.0, 0.0, 0.0)
        } else {
            (
                returns.iter().mean(),
                Iterator::max(returns.iter().copied().map(OrderedFloat)).map_or(0.0, |v| v.0),
                Iterator::min(returns.iter().copied().map(OrderedFloat)).map_or(0.0, |v| v.0),
            )
        };

        let recommendations_by_status: BTreeMap<RecommendationStatus, usize> = recommendations
            .iter()
            .counts_by(|r| r.status)
            .into_iter()
            .collect();

        debug!(
            "Scored {} recommendations ({} executed, {} successful, mode {:?})",
            recommendations.len(),
            executed.len(),
            successful,
            self.mode
        );

        AIRecommendationMetrics {
            total_recommendations: recommendations.len(),
            executed_recommendations: executed.len(),
            successful_recommendations: successful,
            accuracy: self.accuracy(&executed),
            precision,
            recall,
            f1_score,
            average_confidence,
            high_confidence_accuracy: self.accuracy(&in_bucket(ConfidenceBucket::High)),
            medium_confidence_accuracy: self.accuracy(&in_bucket(ConfidenceBucket::Medium)),
            low_confidence_accuracy: self.accuracy(&in_bucket(ConfidenceBucket::Low)),
            average_return,
            best_return,
            worst_return,
            recommendations_by_status,
            confidence_distribution: distribution,
            average_days_to_execution: average_days_to_execution(&executed),
            time_based_accuracy: self.time_based_accuracy(recommendations, &executed),
        }
    }

    fn time_based_accuracy(
        &self,
        all: &[Recommendation],
        executed: &[&Recommendation],
    ) -> BTreeMap<String, f64> {
        let Some(reference) = all.iter().map(|r| r.created_at).max() else {
            return BTreeMap::new();
        };

        ACCURACY_WINDOWS
            .iter()
            .filter_map(|(label, days)| {
                let cutoff = reference - Duration::days(*days);
                let window: Vec<&Recommendation> = executed
                    .iter()
                    .copied()
                    .filter(|r| r.created_at >= cutoff)
                    .collect();
                (!window.is_empty()).then(|| (label.to_string(), self.accuracy(&window)))
            })
            .collect()
    }
}

/// Score recommendations with the default confidence-proxy scorer
pub fn calculate_ai_metrics(recommendations: &[Recommendation]) -> AIRecommendationMetrics {
    RecommendationScorer::default().calculate(recommendations)
}

fn percentage(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    (numerator as f64 / denominator as f64) * 100.0
}

fn average_days_to_execution(executed: &[&Recommendation]) -> Option<f64> {
    let days: Vec<f64> = executed
        .iter()
        .filter_map(|r| {
            r.executed_at
                .map(|at| (at - r.created_at).num_seconds() as f64 / 86_400.0)
        })
        .collect();
    if days.is_empty() {
        None
    } else {
        Some(days.iter().mean())
    }
}

// =============================================================================
// Queries
// =============================================================================

fn newest_first<'a>(recs: impl Iterator<Item = &'a Recommendation>) -> Vec<&'a Recommendation> {
    recs.sorted_by_key(|r| Reverse(r.created_at)).collect()
}

/// Pending or executed recommendations, newest first
pub fn active_recommendations(recs: &[Recommendation]) -> Vec<&Recommendation> {
    newest_first(recs.iter().filter(|r| {
        matches!(
            r.status,
            RecommendationStatus::Pending | RecommendationStatus::Executed
        )
    }))
}

pub fn by_status(recs: &[Recommendation], status: RecommendationStatus) -> Vec<&Recommendation> {
    newest_first(recs.iter().filter(|r| r.status == status))
}

/// Pending recommendations at or above a confidence level, newest first
pub fn with_min_confidence(recs: &[Recommendation], min_confidence: u8) -> Vec<&Recommendation> {
    newest_first(recs.iter().filter(|r| {
        r.status == RecommendationStatus::Pending && r.confidence >= min_confidence
    }))
}

/// Recommendations created within `[start, end]`, newest first
pub fn created_between(
    recs: &[Recommendation],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Vec<&Recommendation> {
    newest_first(
        recs.iter()
            .filter(|r| r.created_at >= start && r.created_at <= end),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use chrono::TimeZone;

    fn t(day: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, 1, 14, 0, 0).unwrap() + Duration::days(day)
    }

    fn rec(confidence: u8, status: RecommendationStatus) -> Recommendation {
        Recommendation::new(
            "AAPL",
            RecommendationKind::Buy,
            confidence,
            Money::from_i64(100),
            Money::from_i64(120),
            t(0),
        )
        .with_status(status)
    }

    #[test]
    fn test_classifier_metrics_with_confidence_proxy() {
        let recs = vec![
            rec(85, RecommendationStatus::Executed),
            rec(90, RecommendationStatus::Executed),
            rec(50, RecommendationStatus::Rejected),
        ];
        let metrics = calculate_ai_metrics(&recs);

        assert_eq!(metrics.total_recommendations, 3);
        assert_eq!(metrics.executed_recommendations, 2);
        assert_eq!(metrics.successful_recommendations, 2);
        assert_eq!(metrics.accuracy, 100.0);
        assert_eq!(metrics.precision, 100.0);
        assert_abs_diff_eq!(metrics.recall, 66.6667, epsilon = 1e-3);
        assert_abs_diff_eq!(metrics.f1_score, 80.0, epsilon = 1e-9);
        assert_abs_diff_eq!(metrics.average_confidence, 75.0, epsilon = 1e-9);
    }

    #[test]
    fn test_empty_set_is_all_zero() {
        let metrics = calculate_ai_metrics(&[]);
        assert_eq!(metrics, AIRecommendationMetrics::default());
    }

    #[test]
    fn test_threshold_is_strict() {
        let recs = vec![
            rec(70, RecommendationStatus::Executed),
            rec(71, RecommendationStatus::Executed),
        ];
        let metrics = calculate_ai_metrics(&recs);
        assert_eq!(metrics.successful_recommendations, 1);
        assert_eq!(metrics.accuracy, 50.0);
    }

    #[test]
    fn test_confidence_buckets() {
        let recs = vec![
            rec(95, RecommendationStatus::Executed),
            rec(80, RecommendationStatus::Pending),
            rec(79, RecommendationStatus::Executed),
            rec(65, RecommendationStatus::Executed),
            rec(60, RecommendationStatus::Expired),
            rec(59, RecommendationStatus::Executed),
            rec(10, RecommendationStatus::Rejected),
        ];
        let metrics = calculate_ai_metrics(&recs);

        assert_eq!(
            metrics.confidence_distribution,
            ConfidenceDistribution {
                high: 2,
                medium: 3,
                low: 2
            }
        );
        assert_eq!(metrics.high_confidence_accuracy, 100.0);
        // 79 succeeds, 65 does not
        assert_eq!(metrics.medium_confidence_accuracy, 50.0);
        assert_eq!(metrics.low_confidence_accuracy, 0.0);
    }

    #[test]
    fn test_proxy_returns_and_status_counts() {
        let recs = vec![
            rec(90, RecommendationStatus::Executed),
            rec(40, RecommendationStatus::Executed),
            rec(75, RecommendationStatus::Pending),
            rec(20, RecommendationStatus::Rejected),
            rec(30, RecommendationStatus::Rejected),
        ];
        let metrics = calculate_ai_metrics(&recs);

        // (90-50)/10 = 4, (40-50)/10 = -1
        assert_abs_diff_eq!(metrics.average_return, 1.5, epsilon = 1e-12);
        assert_eq!(metrics.best_return, 4.0);
        assert_eq!(metrics.worst_return, -1.0);

        assert_eq!(metrics.recommendations_by_status[&RecommendationStatus::Executed], 2);
        assert_eq!(metrics.recommendations_by_status[&RecommendationStatus::Pending], 1);
        assert_eq!(metrics.recommendations_by_status[&RecommendationStatus::Rejected], 2);
        assert!(!metrics
            .recommendations_by_status
            .contains_key(&RecommendationStatus::Expired));
    }

    #[test]
    fn test_days_to_execution_from_timestamps() {
        let recs = vec![
            rec(80, RecommendationStatus::Pending).with_execution(t(2)),
            rec(80, RecommendationStatus::Pending).with_execution(t(4)),
            rec(80, RecommendationStatus::Executed),
        ];
        let metrics = calculate_ai_metrics(&recs);
        assert_eq!(metrics.executed_recommendations, 3);
        assert_abs_diff_eq!(metrics.average_days_to_execution.unwrap(), 3.0, epsilon = 1e-9);

        let without = calculate_ai_metrics(&[rec(80, RecommendationStatus::Executed)]);
        assert_eq!(without.average_days_to_execution, None);
    }

    #[test]
    fn test_time_based_accuracy_windows() {
        let mut old = rec(50, RecommendationStatus::Executed);
        old.created_at = t(-100);
        let mut month = rec(90, RecommendationStatus::Executed);
        month.created_at = t(-20);
        let newest = rec(60, RecommendationStatus::Pending);

        let metrics = calculate_ai_metrics(&[old, month, newest]);
        let windows = &metrics.time_based_accuracy;

        assert!(!windows.contains_key("1week"));
        assert_eq!(windows["1month"], 100.0);
        assert_eq!(windows["3months"], 100.0);
        assert_eq!(windows["6months"], 50.0);
    }

    #[test]
    fn test_realized_outcome_scoring() {
        let scorer = RecommendationScorer::new(ScoringMode::RealizedOutcome);
        let buy_hit =
            rec(40, RecommendationStatus::Executed).with_realized_price(Money::from_i64(125));
        let buy_miss =
            rec(95, RecommendationStatus::Executed).with_realized_price(Money::from_i64(110));
        let mut sell_hit = Recommendation::new(
            "TSLA",
            RecommendationKind::Sell,
            70,
            Money::from_i64(200),
            Money::from_i64(180),
            t(0),
        )
        .with_status(RecommendationStatus::Executed)
        .with_realized_price(Money::from_i64(170));
        sell_hit.reasoning = "overbought".into();
        let untracked = rec(99, RecommendationStatus::Executed);

        let metrics = scorer.calculate(&[buy_hit, buy_miss, sell_hit, untracked]);

        assert_eq!(metrics.executed_recommendations, 4);
        assert_eq!(metrics.successful_recommendations, 2);
        assert_eq!(metrics.accuracy, 50.0);
        // Returns: +25%, +10%, +15% (sell of a 15% drop); untracked has none
        assert_abs_diff_eq!(metrics.average_return, 50.0 / 3.0, epsilon = 1e-9);
        assert_abs_diff_eq!(metrics.best_return, 25.0, epsilon = 1e-9);
        assert_abs_diff_eq!(metrics.worst_return, 10.0, epsilon = 1e-9);
    }

    #[test]
    fn test_hold_band() {
        let scorer = RecommendationScorer::new(ScoringMode::RealizedOutcome);
        let hold = |realized: i64| {
            Recommendation::new(
                "KO",
                RecommendationKind::Hold,
                60,
                Money::from_i64(100),
                Money::from_i64(100),
                t(0),
            )
            .with_realized_price(Money::from_i64(realized))
        };
        assert!(scorer.is_successful(&hold(104)));
        assert!(scorer.is_successful(&hold(95)));
        assert!(!scorer.is_successful(&hold(94)));
    }

    #[test]
    fn test_queries_sort_newest_first() {
        let mut a = rec(90, RecommendationStatus::Pending);
        a.created_at = t(1);
        let mut b = rec(50, RecommendationStatus::Pending);
        b.created_at = t(3);
        let mut c = rec(85, RecommendationStatus::Executed);
        c.created_at = t(2);
        let mut d = rec(95, RecommendationStatus::Expired);
        d.created_at = t(4);
        let recs = vec![a, b, c, d];

        let active: Vec<DateTime<Utc>> =
            active_recommendations(&recs).iter().map(|r| r.created_at).collect();
        assert_eq!(active, vec![t(3), t(2), t(1)]);

        let confident = with_min_confidence(&recs, 80);
        assert_eq!(confident.len(), 1);
        assert_eq!(confident[0].confidence, 90);

        assert_eq!(by_status(&recs, RecommendationStatus::Expired).len(), 1);
        assert_eq!(created_between(&recs, t(2), t(3)).len(), 2);
    }

    #[test]
    fn test_validate_and_parse() {
        let mut bad = rec(50, RecommendationStatus::Pending);
        bad.confidence = 101;
        assert!(bad.validate().is_err());
        assert!(rec(50, RecommendationStatus::Pending).validate().is_ok());

        assert_eq!(
            "Executed".parse::<RecommendationStatus>().unwrap(),
            RecommendationStatus::Executed
        );
        assert_eq!("sell".parse::<RecommendationKind>().unwrap(), RecommendationKind::Sell);
        assert!("maybe".parse::<RecommendationKind>().is_err());
    }
}
