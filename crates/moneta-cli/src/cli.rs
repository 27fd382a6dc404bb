//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI
//! arguments. The actual command implementations are in the `commands`
//! module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Moneta - Personal finance analytics from bank statement exports
#[derive(Parser)]
#[command(name = "moneta")]
#[command(about = "Categorize transactions and analyze spending health", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "moneta.db", global = true)]
    pub db: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Import transactions from CSV (date,description,amount)
    Import {
        /// CSV file to import
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Categorize a transaction description
    Categorize {
        /// Transaction description to categorize
        description: String,
    },

    /// Record a category correction (trains the fallback model)
    Correct {
        /// Transaction description
        description: String,

        /// The correct category
        category: String,
    },

    /// Financial health score over the trailing four months
    Health,

    /// Detect unusual spending
    Anomalies {
        /// Lookback window in days
        #[arg(long, default_value = "90")]
        days: i64,
    },

    /// Forecast recurring spending
    Predict {
        /// Months ahead to forecast
        #[arg(long, default_value = "3")]
        months: u32,
    },

    /// Current-month budget vs actual
    Budget,

    /// Per-category spending trends
    Trends {
        /// Months of history to analyze
        #[arg(long, default_value = "3")]
        months: u32,
    },

    /// Prioritized insights over the trailing 90 days
    Insights,

    /// Mark a transaction as recurring (or not)
    Recurring {
        /// Transaction id
        id: i64,

        /// true to mark recurring, false to clear
        recurring: bool,
    },
}
