// SQLite-backed portfolio ledger
//
// Persists transactions, cash movements, price snapshots and recommendations,
// with a JSON export of the full ledger.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

use crate::error::{AnalyticsError, LedgerError, Result};
use crate::ledger::{
    check_position, CashLedger, PriceSource, RecommendationReader, TransactionReader,
};
use crate::recommendations::{Recommendation, RecommendationStatus};
use crate::{price_map, CashTransaction, PriceMap, PriceSnapshot, Symbol, Transaction};

// =============================================================================
// Column Codecs
// =============================================================================

/// Fixed-width RFC 3339 so stored timestamps sort lexicographically
fn timestamp_text(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn text_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse::<T>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn optional_text_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        s.parse::<T>()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

const TRANSACTION_COLUMNS: &str = "id, symbol, side, shares, price, timestamp";

fn transaction_from_row(row: &Row<'_>) -> rusqlite::Result<Transaction> {
    Ok(Transaction {
        id: Some(row.get(0)?),
        symbol: Symbol::new(row.get::<_, String>(1)?),
        side: text_column(row, 2)?,
        shares: text_column(row, 3)?,
        price: text_column(row, 4)?,
        timestamp: text_column(row, 5)?,
    })
}

const CASH_COLUMNS: &str = "id, amount, kind, timestamp";

fn cash_from_row(row: &Row<'_>) -> rusqlite::Result<CashTransaction> {
    Ok(CashTransaction {
        id: Some(row.get(0)?),
        amount: text_column(row, 1)?,
        kind: text_column(row, 2)?,
        timestamp: text_column(row, 3)?,
    })
}

const RECOMMENDATION_COLUMNS: &str = "id, symbol, display_name, price_at_creation, target_price, \
     kind, confidence, holding_period_days, reasoning, created_at, status, executed, ai_model, \
     related_transaction_id, executed_at, realized_price";

fn recommendation_from_row(row: &Row<'_>) -> rusqlite::Result<Recommendation> {
    Ok(Recommendation {
        id: Some(row.get(0)?),
        symbol: Symbol::new(row.get::<_, String>(1)?),
        display_name: row.get(2)?,
        price_at_creation: text_column(row, 3)?,
        target_price: text_column(row, 4)?,
        kind: text_column(row, 5)?,
        confidence: row.get(6)?,
        holding_period_days: row.get(7)?,
        reasoning: row.get(8)?,
        created_at: text_column(row, 9)?,
        status: text_column(row, 10)?,
        executed: row.get(11)?,
        ai_model: row.get(12)?,
        related_transaction_id: row.get(13)?,
        executed_at: optional_text_column(row, 14)?,
        realized_price: optional_text_column(row, 15)?,
    })
}

/// Full ledger contents as written by [`SqliteLedger::export_json`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub exported_at: DateTime<Utc>,
    pub transactions: Vec<Transaction>,
    pub cash_transactions: Vec<CashTransaction>,
    pub prices: Vec<PriceSnapshot>,
    pub recommendations: Vec<Recommendation>,
}

// =============================================================================
// Ledger Implementation
// =============================================================================

pub struct SqliteLedger {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteLedger {
    /// Open (or create) the database file, creating parent directories
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(LedgerError::from)?;
        }

        let conn = Connection::open(db_path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        let ledger = Self::from_connection(conn)?;
        info!("SQLite ledger opened at {}", db_path.display());
        Ok(ledger)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        let ledger = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        ledger.create_tables()?;
        Ok(ledger)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| {
            LedgerError::Corrupt("ledger connection mutex poisoned".to_string()).into()
        })
    }

    fn create_tables(&self) -> Result<()> {
        let conn = self.lock()?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS transactions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                symbol TEXT NOT NULL,
                side TEXT NOT NULL,
                shares TEXT NOT NULL,
                price TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                created_at TEXT DEFAULT CURRENT_TIMESTAMP
            );

            CREATE TABLE IF NOT EXISTS cash_transactions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                amount TEXT NOT NULL,
                kind TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                created_at TEXT DEFAULT CURRENT_TIMESTAMP
            );

            CREATE TABLE IF NOT EXISTS prices (
                symbol TEXT PRIMARY KEY,
                display_name TEXT NOT NULL,
                current_price TEXT NOT NULL,
                updated_at TEXT DEFAULT CURRENT_TIMESTAMP
            );

            CREATE TABLE IF NOT EXISTS recommendations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                symbol TEXT NOT NULL,
                display_name TEXT NOT NULL,
                price_at_creation TEXT NOT NULL,
                target_price TEXT NOT NULL,
                kind TEXT NOT NULL,
                confidence INTEGER NOT NULL,
                holding_period_days INTEGER NOT NULL,
                reasoning TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                executed INTEGER NOT NULL DEFAULT 0,
                ai_model TEXT NOT NULL DEFAULT '',
                related_transaction_id INTEGER REFERENCES transactions(id),
                executed_at TEXT,
                realized_price TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_transactions_symbol ON transactions(symbol);
            CREATE INDEX IF NOT EXISTS idx_transactions_timestamp ON transactions(timestamp);
            CREATE INDEX IF NOT EXISTS idx_recommendations_status ON recommendations(status);",
        )?;

        debug!("Ledger schema created/verified");
        Ok(())
    }

    /// Validate and append a stock transaction, returning its row id.
    ///
    /// The oversell check and the insert share one SQLite transaction.
    pub fn record_transaction(&self, tx: &Transaction) -> Result<i64> {
        let mut conn = self.lock()?;
        let db_tx = conn.transaction()?;

        let history = {
            let mut stmt = db_tx.prepare(&format!(
                "SELECT {} FROM transactions WHERE symbol = ?1 ORDER BY timestamp, id",
                TRANSACTION_COLUMNS
            ))?;
            let rows = stmt
                .query_map(params![tx.symbol.as_str()], transaction_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows
        };
        check_position(&history, tx)?;

        db_tx.execute(
            "INSERT INTO transactions (symbol, side, shares, price, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                tx.symbol.as_str(),
                tx.side.as_str(),
                tx.shares.to_string(),
                tx.price.to_string(),
                timestamp_text(&tx.timestamp),
            ],
        )?;
        let id = db_tx.last_insert_rowid();
        db_tx.commit()?;

        debug!(
            "Transaction recorded: #{} {} {} {} @ {}",
            id,
            tx.side.as_str(),
            tx.shares,
            tx.symbol,
            tx.price
        );
        Ok(id)
    }

    pub fn record_cash_transaction(&self, tx: &CashTransaction) -> Result<i64> {
        tx.validate()?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO cash_transactions (amount, kind, timestamp) VALUES (?1, ?2, ?3)",
            params![
                tx.amount.to_string(),
                tx.kind.as_str(),
                timestamp_text(&tx.timestamp)
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Insert or replace the current price of a symbol
    pub fn upsert_price(&self, snapshot: &PriceSnapshot) -> Result<()> {
        snapshot.validate()?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO prices (symbol, display_name, current_price, updated_at)
             VALUES (?1, ?2, ?3, CURRENT_TIMESTAMP)
             ON CONFLICT(symbol) DO UPDATE SET
                display_name = excluded.display_name,
                current_price = excluded.current_price,
                updated_at = CURRENT_TIMESTAMP",
            params![
                snapshot.symbol.as_str(),
                snapshot.display_name,
                snapshot.current_price.to_string()
            ],
        )?;
        Ok(())
    }

    pub fn record_recommendation(&self, rec: &Recommendation) -> Result<i64> {
        rec.validate()?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO recommendations
             (symbol, display_name, price_at_creation, target_price, kind, confidence,
              holding_period_days, reasoning, created_at, status, executed, ai_model,
              related_transaction_id, executed_at, realized_price)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            params![
                rec.symbol.as_str(),
                rec.display_name,
                rec.price_at_creation.to_string(),
                rec.target_price.to_string(),
                rec.kind.as_str(),
                rec.confidence,
                rec.holding_period_days,
                rec.reasoning,
                timestamp_text(&rec.created_at),
                rec.status.as_str(),
                rec.executed,
                rec.ai_model,
                rec.related_transaction_id,
                rec.executed_at.as_ref().map(timestamp_text),
                rec.realized_price.map(|p| p.to_string()),
            ],
        )?;
        let id = conn.last_insert_rowid();
        debug!("Recommendation recorded: #{} {} {}", id, rec.kind.as_str(), rec.symbol);
        Ok(id)
    }

    /// Change a recommendation's status. `executed` follows the status;
    /// the related transaction and execution time are kept unless given.
    pub fn update_recommendation_status(
        &self,
        id: i64,
        status: RecommendationStatus,
        related_transaction_id: Option<i64>,
        executed_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE recommendations SET
                status = ?1,
                executed = ?2,
                related_transaction_id = COALESCE(?3, related_transaction_id),
                executed_at = COALESCE(?4, executed_at)
             WHERE id = ?5",
            params![
                status.as_str(),
                status == RecommendationStatus::Executed,
                related_transaction_id,
                executed_at.as_ref().map(timestamp_text),
                id
            ],
        )?;

        if changed == 0 {
            return Err(AnalyticsError::RecommendationNotFound(id));
        }
        debug!("Recommendation #{} -> {}", id, status);
        Ok(())
    }

    pub fn get_recommendation(&self, id: i64) -> Result<Option<Recommendation>> {
        let conn = self.lock()?;
        let rec = conn
            .query_row(
                &format!(
                    "SELECT {} FROM recommendations WHERE id = ?1",
                    RECOMMENDATION_COLUMNS
                ),
                params![id],
                recommendation_from_row,
            )
            .optional()?;
        Ok(rec)
    }

    /// Up to `limit` transactions, newest first
    pub fn recent_transactions(&self, limit: usize) -> Result<Vec<Transaction>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM transactions ORDER BY timestamp DESC, id DESC LIMIT ?1",
            TRANSACTION_COLUMNS
        ))?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let txs = stmt
            .query_map(params![limit], transaction_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(txs)
    }

    /// Up to `limit` cash movements, newest first
    pub fn recent_cash_transactions(&self, limit: usize) -> Result<Vec<CashTransaction>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM cash_transactions ORDER BY timestamp DESC, id DESC LIMIT ?1",
            CASH_COLUMNS
        ))?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let txs = stmt
            .query_map(params![limit], cash_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(txs)
    }

    /// Transactions in one symbol, oldest first
    pub fn transactions_for_symbol(&self, symbol: &Symbol) -> Result<Vec<Transaction>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM transactions WHERE symbol = ?1 ORDER BY timestamp, id",
            TRANSACTION_COLUMNS
        ))?;
        let txs = stmt
            .query_map(params![symbol.as_str()], transaction_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(txs)
    }

    pub fn snapshot(&self) -> Result<LedgerSnapshot> {
        let mut prices: Vec<PriceSnapshot> = self.prices()?.into_values().collect();
        prices.sort_by(|a, b| a.symbol.cmp(&b.symbol));

        Ok(LedgerSnapshot {
            exported_at: Utc::now(),
            transactions: self.transactions()?,
            cash_transactions: self.cash_transactions()?,
            prices,
            recommendations: self.recommendations()?,
        })
    }

    /// Write the whole ledger as pretty-printed JSON
    pub fn export_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(&self.snapshot()?).map_err(LedgerError::from)?;
        std::fs::write(path, json).map_err(LedgerError::from)?;
        debug!("Ledger exported to: {}", path.display());
        Ok(())
    }
}

impl TransactionReader for SqliteLedger {
    fn transactions(&self) -> Result<Vec<Transaction>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM transactions ORDER BY timestamp, id",
            TRANSACTION_COLUMNS
        ))?;
        let txs = stmt
            .query_map([], transaction_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        debug!("Loaded {} transactions", txs.len());
        Ok(txs)
    }
}

impl CashLedger for SqliteLedger {
    fn cash_transactions(&self) -> Result<Vec<CashTransaction>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM cash_transactions ORDER BY timestamp, id",
            CASH_COLUMNS
        ))?;
        let txs = stmt
            .query_map([], cash_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(txs)
    }
}

impl PriceSource for SqliteLedger {
    fn prices(&self) -> Result<PriceMap> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT symbol, display_name, current_price FROM prices")?;
        let snapshots = stmt
            .query_map([], |row| {
                Ok(PriceSnapshot {
                    symbol: Symbol::new(row.get::<_, String>(0)?),
                    display_name: row.get(1)?,
                    current_price: text_column(row, 2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(price_map(snapshots))
    }
}

impl RecommendationReader for SqliteLedger {
    fn recommendations(&self) -> Result<Vec<Recommendation>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM recommendations ORDER BY created_at, id",
            RECOMMENDATION_COLUMNS
        ))?;
        let recs = stmt
            .query_map([], recommendation_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(recs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recommendations::RecommendationKind;
    use crate::{CashKind, Money};
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    fn m(value: i64) -> Money {
        Money::from_i64(value)
    }

    fn t(day: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 3, 14, 30, 0).unwrap() + Duration::days(day)
    }

    #[test]
    fn test_transactions_round_trip_exact_decimals() {
        let ledger = SqliteLedger::open_in_memory().unwrap();
        let shares = Money::new(dec!(0.123456789));
        let price = Money::new(dec!(1234.5678));
        let id = ledger
            .record_transaction(&Transaction::buy("BRK.B", shares, price, t(0)))
            .unwrap();

        let txs = ledger.transactions().unwrap();
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].id, Some(id));
        assert_eq!(txs[0].shares, shares);
        assert_eq!(txs[0].price, price);
        assert_eq!(txs[0].timestamp, t(0));
    }

    #[test]
    fn test_oversell_is_rejected_and_nothing_written() {
        let ledger = SqliteLedger::open_in_memory().unwrap();
        ledger.record_transaction(&Transaction::buy("AMZN", m(3), m(150), t(0))).unwrap();

        let err = ledger
            .record_transaction(&Transaction::sell("AMZN", m(4), m(160), t(1)))
            .unwrap_err();
        assert!(matches!(err, AnalyticsError::Oversell { .. }));
        assert_eq!(ledger.transactions().unwrap().len(), 1);
    }

    #[test]
    fn test_out_of_range_notional_is_rejected() {
        let ledger = SqliteLedger::open_in_memory().unwrap();
        let huge = m(1_000_000_000_000_000);
        assert!(matches!(
            ledger.record_transaction(&Transaction::buy("X", huge, huge, t(0))),
            Err(AnalyticsError::InvalidTransaction(_))
        ));
        assert!(ledger.transactions().unwrap().is_empty());
    }

    #[test]
    fn test_transactions_come_back_in_time_order() {
        let ledger = SqliteLedger::open_in_memory().unwrap();
        ledger.record_transaction(&Transaction::buy("A", m(1), m(10), t(3))).unwrap();
        ledger.record_transaction(&Transaction::buy("B", m(1), m(10), t(1))).unwrap();
        ledger.record_transaction(&Transaction::buy("A", m(1), m(10), t(2))).unwrap();

        let days: Vec<DateTime<Utc>> = ledger
            .transactions()
            .unwrap()
            .iter()
            .map(|tx| tx.timestamp)
            .collect();
        assert_eq!(days, vec![t(1), t(2), t(3)]);

        let recent = ledger.recent_transactions(1).unwrap();
        assert_eq!(recent[0].timestamp, t(3));
        assert_eq!(ledger.transactions_for_symbol(&Symbol::new("A")).unwrap().len(), 2);
    }

    #[test]
    fn test_cash_and_prices() {
        let ledger = SqliteLedger::open_in_memory().unwrap();
        ledger
            .record_cash_transaction(&CashTransaction::new(m(1_000), CashKind::Deposit, t(0)))
            .unwrap();
        ledger
            .record_cash_transaction(&CashTransaction::new(m(250), CashKind::Withdrawal, t(1)))
            .unwrap();
        assert_eq!(ledger.cash_balance().unwrap(), m(750));
        let recent = ledger.recent_cash_transactions(1).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].kind, CashKind::Withdrawal);
        assert_eq!(recent[0].amount, m(250));

        ledger.upsert_price(&PriceSnapshot::new("GOOG", "Alphabet", m(140))).unwrap();
        ledger.upsert_price(&PriceSnapshot::new("GOOG", "Alphabet Inc", m(142))).unwrap();
        let prices = ledger.prices().unwrap();
        assert_eq!(prices.len(), 1);
        assert_eq!(prices[&Symbol::new("GOOG")].current_price, m(142));
        assert_eq!(prices[&Symbol::new("GOOG")].display_name, "Alphabet Inc");

        assert!(ledger.upsert_price(&PriceSnapshot::new("BAD", "Bad", m(-1))).is_err());
    }

    #[test]
    fn test_recommendation_lifecycle() {
        let ledger = SqliteLedger::open_in_memory().unwrap();
        let mut rec =
            Recommendation::new("NVDA", RecommendationKind::Buy, 88, m(450), m(520), t(0));
        rec.reasoning = "earnings momentum".into();
        rec.ai_model = "gpt-4".into();
        let id = ledger.record_recommendation(&rec).unwrap();
        let tx_id = ledger
            .record_transaction(&Transaction::buy("NVDA", m(2), m(455), t(1)))
            .unwrap();

        ledger
            .update_recommendation_status(
                id,
                RecommendationStatus::Executed,
                Some(tx_id),
                Some(t(1)),
            )
            .unwrap();

        let stored = ledger.get_recommendation(id).unwrap().unwrap();
        assert_eq!(stored.status, RecommendationStatus::Executed);
        assert!(stored.executed);
        assert_eq!(stored.related_transaction_id, Some(tx_id));
        assert_eq!(stored.executed_at, Some(t(1)));
        assert_eq!(stored.reasoning, "earnings momentum");
        assert_eq!(stored.confidence, 88);

        assert!(ledger.get_recommendation(999).unwrap().is_none());
        assert!(matches!(
            ledger.update_recommendation_status(999, RecommendationStatus::Rejected, None, None),
            Err(AnalyticsError::RecommendationNotFound(999))
        ));
    }

    #[test]
    fn test_file_database_and_json_export() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("nested").join("portfolio.db");

        {
            let ledger = SqliteLedger::open(&db_path).unwrap();
            ledger.record_transaction(&Transaction::buy("KO", m(10), m(60), t(0))).unwrap();
            ledger.upsert_price(&PriceSnapshot::new("KO", "Coca-Cola", m(62))).unwrap();
        }

        let reopened = SqliteLedger::open(&db_path).unwrap();
        assert_eq!(reopened.transactions().unwrap().len(), 1);

        let export_path = dir.path().join("ledger.json");
        reopened.export_json(&export_path).unwrap();
        let contents = std::fs::read_to_string(&export_path).unwrap();
        let snapshot: LedgerSnapshot = serde_json::from_str(&contents).unwrap();
        assert_eq!(snapshot.transactions.len(), 1);
        assert_eq!(snapshot.prices[0].current_price, m(62));
    }
}
