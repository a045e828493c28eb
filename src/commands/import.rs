//! Import command implementation

use anyhow::Result;
use portfolio_analytics::data;
use portfolio_analytics::store::SqliteLedger;
use portfolio_analytics::Config;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::open_ledger;

pub struct ImportFiles {
    pub transactions: Option<PathBuf>,
    pub cash: Option<PathBuf>,
    pub prices: Option<PathBuf>,
    pub recommendations: Option<PathBuf>,
}

#[derive(Debug, Default)]
struct ImportCounts {
    imported: usize,
    rejected: usize,
}

impl ImportCounts {
    fn record<T>(&mut self, what: &str, result: portfolio_analytics::Result<T>) {
        match result {
            Ok(_) => self.imported += 1,
            Err(e) => {
                warn!("Rejected {}: {}", what, e);
                self.rejected += 1;
            }
        }
    }
}

pub fn run(config: &Config, files: ImportFiles, export: Option<PathBuf>) -> Result<()> {
    if files.transactions.is_none()
        && files.cash.is_none()
        && files.prices.is_none()
        && files.recommendations.is_none()
    {
        anyhow::bail!(
            "Nothing to import: pass at least one of \
             --transactions, --cash, --prices, --recommendations"
        );
    }

    let ledger = open_ledger(config)?;
    let mut report = Vec::new();

    if let Some(path) = &files.prices {
        let mut counts = ImportCounts::default();
        for snapshot in data::load_prices(path)? {
            let label = format!("price for {}", snapshot.symbol);
            counts.record(&label, ledger.upsert_price(&snapshot));
        }
        report.push(("Prices", counts));
    }

    if let Some(path) = &files.cash {
        let mut counts = ImportCounts::default();
        for tx in data::load_cash_transactions(path)? {
            let what = format!("{} of {} at {}", tx.kind.as_str(), tx.amount, tx.timestamp);
            counts.record(&what, ledger.record_cash_transaction(&tx));
        }
        report.push(("Cash transactions", counts));
    }

    if let Some(path) = &files.transactions {
        report.push(("Transactions", import_transactions(&ledger, path)?));
    }

    if let Some(path) = &files.recommendations {
        let mut counts = ImportCounts::default();
        for rec in data::load_recommendations(path)? {
            let what = format!("{} recommendation for {}", rec.kind.as_str(), rec.symbol);
            counts.record(&what, ledger.record_recommendation(&rec));
        }
        report.push(("Recommendations", counts));
    }

    println!("\n{}", "=".repeat(60));
    println!("IMPORT RESULTS");
    println!("{}", "=".repeat(60));
    for (label, counts) in &report {
        println!("{:<20}{:>8} imported {:>6} rejected", label, counts.imported, counts.rejected);
    }
    println!("Database:           {}", config.database_path().display());
    println!("{}", "=".repeat(60));

    if let Some(path) = export {
        ledger.export_json(&path)?;
        info!("Ledger exported to {}", path.display());
    }

    Ok(())
}

/// Record in timestamp order so each sell is checked against the buys
/// that precede it in the file
fn import_transactions(ledger: &SqliteLedger, path: &Path) -> Result<ImportCounts> {
    let mut transactions = data::load_transactions(path)?;
    transactions.sort_by_key(|tx| tx.timestamp);

    let mut counts = ImportCounts::default();
    for tx in transactions {
        let what = format!(
            "{} {} {} at {}",
            tx.side.as_str(),
            tx.shares,
            tx.symbol,
            tx.timestamp
        );
        counts.record(&what, ledger.record_transaction(&tx));
    }
    Ok(counts)
}
