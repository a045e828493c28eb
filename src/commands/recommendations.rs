//! Recommendations command implementation

use anyhow::Result;
use portfolio_analytics::{AIRecommendationMetrics, PortfolioAnalyzer};
use portfolio_analytics::Config;

use super::open_ledger;

pub fn run(config: &Config, json: bool) -> Result<()> {
    let ledger = open_ledger(config)?;
    let metrics = PortfolioAnalyzer::new(&ledger)
        .with_config(config)
        .ai_metrics()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&metrics)?);
    } else {
        print_metrics(&metrics);
    }
    Ok(())
}

pub fn print_metrics(metrics: &AIRecommendationMetrics) {
    println!("\n{}", "=".repeat(60));
    println!("AI RECOMMENDATION METRICS");
    println!("{}", "=".repeat(60));
    println!("Recommendations:    {}", metrics.total_recommendations);
    println!("Executed:           {}", metrics.executed_recommendations);
    println!("Successful:         {}", metrics.successful_recommendations);
    println!("Accuracy:           {:.2}%", metrics.accuracy);
    println!("Precision:          {:.2}%", metrics.precision);
    println!("Recall:             {:.2}%", metrics.recall);
    println!("F1 Score:           {:.2}", metrics.f1_score);
    println!("Avg Confidence:     {:.1}", metrics.average_confidence);
    println!(
        "Confidence Buckets: high {} / medium {} / low {}",
        metrics.confidence_distribution.high,
        metrics.confidence_distribution.medium,
        metrics.confidence_distribution.low
    );
    println!(
        "Bucket Accuracy:    high {:.2}% / medium {:.2}% / low {:.2}%",
        metrics.high_confidence_accuracy,
        metrics.medium_confidence_accuracy,
        metrics.low_confidence_accuracy
    );
    println!(
        "Returns:            avg {:.2}% / best {:.2}% / worst {:.2}%",
        metrics.average_return, metrics.best_return, metrics.worst_return
    );
    match metrics.average_days_to_execution {
        Some(days) => println!("Days to Execution:  {:.1}", days),
        None => println!("Days to Execution:  n/a"),
    }
    for (status, count) in &metrics.recommendations_by_status {
        println!("  {:<18}{}", status.as_str(), count);
    }
    for (window, accuracy) in &metrics.time_based_accuracy {
        println!("  accuracy {:<9}{:.2}%", window, accuracy);
    }
    println!("{}", "=".repeat(60));
}
