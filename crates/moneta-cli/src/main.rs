//! Moneta CLI - Personal finance analytics
//!
//! Usage:
//!   moneta init                 Initialize database
//!   moneta import --file CSV    Import transactions (date,description,amount)
//!   moneta health               Financial health score
//!   moneta budget               Current-month budget vs actual

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (warn)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db),
        Commands::Import { file } => commands::cmd_import(&cli.db, &file),
        Commands::Categorize { description } => commands::cmd_categorize(&cli.db, &description),
        Commands::Correct {
            description,
            category,
        } => commands::cmd_correct(&cli.db, &description, &category),
        Commands::Health => commands::cmd_health(&cli.db),
        Commands::Anomalies { days } => commands::cmd_anomalies(&cli.db, days),
        Commands::Predict { months } => commands::cmd_predict(&cli.db, months),
        Commands::Budget => commands::cmd_budget(&cli.db),
        Commands::Trends { months } => commands::cmd_trends(&cli.db, months),
        Commands::Insights => commands::cmd_insights(&cli.db),
        Commands::Recurring { id, recurring } => commands::cmd_recurring(&cli.db, id, recurring),
    }
}
