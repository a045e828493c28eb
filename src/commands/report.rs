//! Report command implementation

use anyhow::Result;
use portfolio_analytics::{AnalyticsError, Config, PortfolioAnalyzer, PortfolioReport};
use tracing::{info, warn};

use super::open_ledger;
use super::recommendations::print_metrics;

pub fn run(config: &Config, json: bool) -> Result<()> {
    let ledger = open_ledger(config)?;
    let analyzer = PortfolioAnalyzer::new(&ledger).with_config(config);

    info!("Building portfolio report...");
    match analyzer.report() {
        Ok(report) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
        }
        Err(AnalyticsError::MissingPriceData { symbol }) => {
            // Recommendation metrics need no prices, so they are still shown
            warn!("Portfolio data is incomplete: no current price for {}", symbol);
            let metrics = analyzer.ai_metrics()?;
            if json {
                let partial = serde_json::json!({
                    "error": format!("missing price data for {}", symbol),
                    "ai_metrics": metrics,
                });
                println!("{}", serde_json::to_string_pretty(&partial)?);
            } else {
                println!("\nWARNING: partial data. No current price for {}.", symbol);
                println!("Holdings, summary and performance are unavailable until it is priced.");
                print_metrics(&metrics);
            }
        }
        Err(e) => return Err(e.into()),
    }

    Ok(())
}

fn print_report(report: &PortfolioReport) {
    println!("\n{}", "=".repeat(60));
    println!("HOLDINGS");
    println!("{}", "=".repeat(60));
    println!(
        "{:<8}{:>10}{:>12}{:>12}{:>14}{:>10}",
        "Symbol", "Shares", "Avg Cost", "Price", "Gain/Loss", "%"
    );
    for h in &report.holdings {
        println!(
            "{:<8}{:>10}{:>12.2}{:>12.2}{:>14.2}{:>9.2}%",
            h.symbol.as_str(),
            h.total_shares.to_string(),
            h.average_cost.to_f64(),
            h.current_price.to_f64(),
            h.gain_loss.to_f64(),
            h.gain_loss_pct
        );
    }

    let s = &report.summary;
    println!("\n{}", "=".repeat(60));
    println!("SUMMARY");
    println!("{}", "=".repeat(60));
    println!("Portfolio Value:    {:.2}", s.total_portfolio_value.to_f64());
    println!(
        "Gain/Loss:          {:.2} ({:.2}%)",
        s.total_gain_loss.to_f64(),
        s.total_gain_loss_pct
    );
    println!("Stocks Held:        {}", s.stock_count);
    println!("Cash Balance:       {:.2}", s.cash_balance.to_f64());
    println!("Available Cash:     {:.2}", s.available_cash.to_f64());

    let p = &report.performance;
    println!("\n{}", "=".repeat(60));
    println!("PERFORMANCE");
    println!("{}", "=".repeat(60));
    println!("Total Invested:     {:.2}", p.total_invested.to_f64());
    println!("Current Value:      {:.2}", p.current_value.to_f64());
    println!("Total Return:       {:.2} ({:.2}%)", p.total_return.to_f64(), p.total_return_pct);
    println!("Annualized Return:  {:.2}%", p.annualized_return * 100.0);
    println!("Volatility:         {:.2}%", p.volatility);
    println!("Sharpe Ratio:       {:.2}", p.sharpe_ratio);
    println!("Sortino Ratio:      {:.2}", p.sortino_ratio);
    println!("Calmar Ratio:       {:.2}", p.calmar_ratio);
    println!("Max Drawdown:       {:.2}%", p.max_drawdown);
    println!("Current Drawdown:   {:.2}%", p.current_drawdown);
    println!("Total Trades:       {}", p.total_trades);
    println!("Win Rate:           {:.2}%", p.win_rate);
    println!("Profit Factor:      {:.2}", p.profit_factor);
    println!("Avg Win / Loss:     {:.2} / {:.2}", p.avg_win.to_f64(), p.avg_loss.to_f64());
    println!("Largest Win / Loss: {:.2} / {:.2}", p.largest_win.to_f64(), p.largest_loss.to_f64());
    println!("Win / Loss Streak:  {} / {}", p.consecutive_wins, p.consecutive_losses);

    print_metrics(&report.ai_metrics);
}
