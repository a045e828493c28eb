//! Configuration management
//!
//! Loads the JSON configuration file, applies defaults for missing sections
//! and lets a few settings be overridden from the environment.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::AnalyticsError;
use crate::recommendations::ScoringMode;

pub const STATE_DIR_ENV: &str = "PORTFOLIO_STATE_DIR";
pub const RISK_FREE_RATE_ENV: &str = "PORTFOLIO_RISK_FREE_RATE";

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub analytics: AnalyticsSettings,
    #[serde(default)]
    pub recommendations: RecommendationSettings,
    #[serde(default)]
    pub storage: StorageSettings,
}

impl Config {
    /// Load configuration from a JSON file, then apply environment overrides
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config: Config =
            serde_json::from_str(&contents).context("Failed to parse config JSON")?;

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if given, otherwise use the defaults.
    /// Environment overrides apply either way.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let mut config = Config::default();
                config.apply_env_overrides()?;
                config.validate()?;
                Ok(config)
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(dir) = std::env::var(STATE_DIR_ENV) {
            debug!("{} overrides state_dir with {}", STATE_DIR_ENV, dir);
            self.storage.state_dir = dir;
        }
        if let Ok(rate) = std::env::var(RISK_FREE_RATE_ENV) {
            self.analytics.risk_free_rate = rate
                .trim()
                .parse()
                .with_context(|| format!("{} is not a number: {}", RISK_FREE_RATE_ENV, rate))?;
        }
        Ok(())
    }

    /// Reject settings the calculators cannot work with
    pub fn validate(&self) -> crate::error::Result<()> {
        let invalid = |msg: &str| -> crate::error::Result<()> {
            Err(AnalyticsError::Config(msg.to_string()))
        };

        let analytics = &self.analytics;
        if !analytics.risk_free_rate.is_finite() {
            return invalid("analytics.risk_free_rate must be finite");
        }
        if analytics.trading_days_per_year <= 0.0 || analytics.days_per_year <= 0.0 {
            return invalid("analytics day counts must be > 0");
        }

        let recs = &self.recommendations;
        if recs.success_confidence_threshold > 100 {
            return invalid("recommendations.success_confidence_threshold must be <= 100");
        }
        if recs.medium_confidence > recs.high_confidence || recs.high_confidence > 100 {
            return invalid("recommendations confidence buckets need medium <= high <= 100");
        }
        if recs.hold_band_pct < 0.0 {
            return invalid("recommendations.hold_band_pct must be >= 0");
        }

        if self.storage.database_file.is_empty() {
            return invalid("storage.database_file must not be empty");
        }
        Ok(())
    }

    /// Full path of the SQLite database
    pub fn database_path(&self) -> PathBuf {
        Path::new(&self.storage.state_dir).join(&self.storage.database_file)
    }
}

/// Constants for the performance calculator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsSettings {
    /// Annual risk-free rate used by Sharpe and Sortino
    pub risk_free_rate: f64,
    pub trading_days_per_year: f64,
    /// Calendar year length for annualizing returns
    pub days_per_year: f64,
}

impl Default for AnalyticsSettings {
    fn default() -> Self {
        AnalyticsSettings {
            risk_free_rate: 0.02,
            trading_days_per_year: 252.0,
            days_per_year: 365.25,
        }
    }
}

/// Recommendation scoring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendationSettings {
    pub scoring: ScoringMode,
    pub success_confidence_threshold: u8,
    pub hold_band_pct: f64,
    pub high_confidence: u8,
    pub medium_confidence: u8,
}

impl Default for RecommendationSettings {
    fn default() -> Self {
        RecommendationSettings {
            scoring: ScoringMode::ConfidenceProxy,
            success_confidence_threshold: 70,
            hold_band_pct: 5.0,
            high_confidence: 80,
            medium_confidence: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub state_dir: String,
    pub database_file: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        StorageSettings {
            state_dir: "state".to_string(),
            database_file: "portfolio.db".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_partial_file_uses_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "recommendations": {{ "scoring": "realized_outcome", "hold_band_pct": 2.5 }} }}"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.recommendations.scoring, ScoringMode::RealizedOutcome);
        assert_eq!(config.recommendations.hold_band_pct, 2.5);
        assert_eq!(config.recommendations.success_confidence_threshold, 70);
        assert_eq!(config.analytics, AnalyticsSettings::default());
        assert_eq!(config.storage.database_file, "portfolio.db");
    }

    #[test]
    fn test_invalid_json_fails() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(Config::from_file(file.path()).is_err());
    }

    #[test]
    fn test_missing_file_fails_with_path() {
        let err = Config::from_file("/nonexistent/portfolio.json").unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/portfolio.json"));
    }

    #[test]
    fn test_validate_rejects_inverted_buckets() {
        let mut config = Config::default();
        config.recommendations.medium_confidence = 90;
        assert!(matches!(config.validate(), Err(AnalyticsError::Config(_))));

        let mut config = Config::default();
        config.analytics.trading_days_per_year = 0.0;
        assert!(config.validate().is_err());

        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_database_path() {
        let config = Config::default();
        assert_eq!(config.database_path(), Path::new("state").join("portfolio.db"));
    }
}
