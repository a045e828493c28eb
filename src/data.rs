//! Data loading
//!
//! Reads transactions, cash movements, price snapshots and recommendations
//! from headered CSV files. Rows are validated as they are parsed; ledger
//! rules such as the oversell check apply when the rows are recorded.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::Deserialize;
use std::path::Path;
use tracing::info;

use crate::recommendations::{Recommendation, RecommendationStatus};
use crate::{CashTransaction, Money, PriceSnapshot, Symbol, Transaction};

/// Parse RFC 3339, `YYYY-MM-DD HH:MM:SS` (UTC) or a bare date (UTC midnight)
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .or_else(|_| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map(|date| date.and_time(NaiveTime::MIN).and_utc())
        })
        .with_context(|| format!("Failed to parse timestamp: {}", raw))
}

fn parse_money(raw: &str, column: &str) -> Result<Money> {
    raw.trim()
        .parse::<Money>()
        .with_context(|| format!("Failed to parse {}: {}", column, raw))
}

fn read_rows<T, R>(path: &Path, what: &str, convert: impl Fn(R) -> Result<T>) -> Result<Vec<T>>
where
    R: for<'de> Deserialize<'de>,
{
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("Failed to open {} CSV {}", what, path.display()))?;

    let mut items = Vec::new();
    for (row_idx, result) in reader.deserialize::<R>().enumerate() {
        // Header is line 1
        let line = row_idx + 2;
        let row = result.with_context(|| format!("Failed to read {} line {}", what, line))?;
        let item = convert(row).with_context(|| format!("Invalid {} on line {}", what, line))?;
        items.push(item);
    }

    info!("Loaded {} {} from {}", items.len(), what, path.display());
    Ok(items)
}

#[derive(Debug, Deserialize)]
struct TransactionRow {
    symbol: String,
    side: String,
    shares: String,
    price: String,
    timestamp: String,
}

/// Columns: `symbol,side,shares,price,timestamp`
pub fn load_transactions(path: impl AsRef<Path>) -> Result<Vec<Transaction>> {
    read_rows(path.as_ref(), "transactions", |row: TransactionRow| {
        let tx = Transaction::new(
            Symbol::new(row.symbol.trim()),
            row.side.parse()?,
            parse_money(&row.shares, "shares")?,
            parse_money(&row.price, "price")?,
            parse_timestamp(&row.timestamp)?,
        );
        tx.validate()?;
        Ok(tx)
    })
}

#[derive(Debug, Deserialize)]
struct CashRow {
    kind: String,
    amount: String,
    timestamp: String,
}

/// Columns: `kind,amount,timestamp` where kind is deposit or withdrawal
pub fn load_cash_transactions(path: impl AsRef<Path>) -> Result<Vec<CashTransaction>> {
    read_rows(path.as_ref(), "cash transactions", |row: CashRow| {
        let tx = CashTransaction::new(
            parse_money(&row.amount, "amount")?,
            row.kind.parse()?,
            parse_timestamp(&row.timestamp)?,
        );
        tx.validate()?;
        Ok(tx)
    })
}

#[derive(Debug, Deserialize)]
struct PriceRow {
    symbol: String,
    #[serde(default)]
    display_name: Option<String>,
    current_price: String,
}

/// Columns: `symbol,display_name,current_price`; an empty display name
/// falls back to the symbol
pub fn load_prices(path: impl AsRef<Path>) -> Result<Vec<PriceSnapshot>> {
    read_rows(path.as_ref(), "prices", |row: PriceRow| {
        let display_name = row
            .display_name
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| row.symbol.clone());
        let snapshot = PriceSnapshot::new(
            &row.symbol,
            display_name,
            parse_money(&row.current_price, "current_price")?,
        );
        snapshot.validate()?;
        Ok(snapshot)
    })
}

#[derive(Debug, Deserialize)]
struct RecommendationRow {
    symbol: String,
    #[serde(default)]
    display_name: Option<String>,
    kind: String,
    confidence: u8,
    price_at_creation: String,
    target_price: String,
    #[serde(default)]
    holding_period_days: Option<u32>,
    #[serde(default)]
    reasoning: Option<String>,
    created_at: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    ai_model: Option<String>,
    #[serde(default)]
    executed_at: Option<String>,
    #[serde(default)]
    realized_price: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Columns: `symbol,display_name,kind,confidence,price_at_creation,
/// target_price,holding_period_days,reasoning,created_at,status,ai_model,
/// executed_at,realized_price`. Columns after `created_at` may be empty.
pub fn load_recommendations(path: impl AsRef<Path>) -> Result<Vec<Recommendation>> {
    read_rows(path.as_ref(), "recommendations", |row: RecommendationRow| {
        let status = match non_empty(row.status) {
            Some(status) => status.parse()?,
            None => RecommendationStatus::Pending,
        };

        let mut rec = Recommendation::new(
            &row.symbol,
            row.kind.parse()?,
            row.confidence,
            parse_money(&row.price_at_creation, "price_at_creation")?,
            parse_money(&row.target_price, "target_price")?,
            parse_timestamp(&row.created_at)?,
        )
        .with_status(status);

        if let Some(name) = non_empty(row.display_name) {
            rec.display_name = name;
        }
        if let Some(days) = row.holding_period_days {
            rec.holding_period_days = days;
        }
        rec.reasoning = row.reasoning.unwrap_or_default();
        rec.ai_model = row.ai_model.unwrap_or_default();
        rec.executed_at = non_empty(row.executed_at)
            .map(|raw| parse_timestamp(&raw))
            .transpose()?;
        rec.realized_price = non_empty(row.realized_price)
            .map(|raw| parse_money(&raw, "realized_price"))
            .transpose()?;

        rec.validate()?;
        Ok(rec)
    })
}
