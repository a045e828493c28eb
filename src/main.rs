//! Portfolio analytics - main entry point
//!
//! This binary provides three subcommands:
//! - import: Load CSV files into the SQLite ledger
//! - report: Holdings, summary, performance and recommendation metrics
//! - recommendations: Recommendation quality metrics only

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "portfolio-analytics")]
#[command(
    about = "Holdings, performance and AI recommendation analytics over a transaction ledger",
    long_about = None
)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to JSON configuration file (defaults apply when omitted)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Import CSV files into the ledger database
    Import {
        /// Stock transactions (symbol,side,shares,price,timestamp)
        #[arg(long)]
        transactions: Option<PathBuf>,

        /// Cash movements (kind,amount,timestamp)
        #[arg(long)]
        cash: Option<PathBuf>,

        /// Current prices (symbol,display_name,current_price)
        #[arg(long)]
        prices: Option<PathBuf>,

        /// AI recommendations
        #[arg(long)]
        recommendations: Option<PathBuf>,

        /// Write a JSON export of the ledger after importing
        #[arg(long)]
        export: Option<PathBuf>,
    },

    /// Show the full portfolio report
    Report {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show AI recommendation quality metrics
    Recommendations {
        /// Print the metrics as JSON
        #[arg(long)]
        json: bool,
    },
}

fn setup_logging(verbose: bool, command_name: &str) -> Result<()> {
    std::fs::create_dir_all("logs")?;

    // {command}_{timestamp}.log
    let log_filename = format!(
        "{}_{}.log",
        command_name,
        chrono::Local::now().format("%Y-%m-%d_%H-%M-%S")
    );
    let log_path = PathBuf::from("logs").join(&log_filename);

    let level = if verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let file_appender = tracing_appender::rolling::never("logs", &log_filename);

    // Console goes to stderr so --json output stays clean on stdout
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(true);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(file_appender)
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    info!("Log file: {}", log_path.display());
    Ok(())
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let command_name = match &cli.command {
        Commands::Import { .. } => "import",
        Commands::Report { .. } => "report",
        Commands::Recommendations { .. } => "recommendations",
    };
    setup_logging(cli.verbose, command_name)?;

    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Import {
            transactions,
            cash,
            prices,
            recommendations,
            export,
        } => commands::import::run(
            &config,
            commands::import::ImportFiles {
                transactions,
                cash,
                prices,
                recommendations,
            },
            export,
        ),
        Commands::Report { json } => commands::report::run(&config, json),
        Commands::Recommendations { json } => commands::recommendations::run(&config, json),
    }
}
