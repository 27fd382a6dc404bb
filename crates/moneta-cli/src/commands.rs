//! Command implementations
//!
//! Each analytics command builds an [`AnalyticsEngine`] for the run and
//! prints its report as pretty JSON, so output can be piped into `jq` or a
//! dashboard. Today's date is resolved once here and threaded through, which
//! keeps the analytics layer deterministic and testable.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde_json::json;

use moneta_core::db::Database;
use moneta_core::{import_csv, AnalyticsConfig, AnalyticsEngine, Categorizer};

pub fn open_db(db_path: &Path) -> Result<Database> {
    let path_str = db_path.to_str().context("Database path is not UTF-8")?;
    Database::new(path_str).context("Failed to open database")
}

/// The categorizer model artifact lives next to the database file
fn categorizer_for(db_path: &Path) -> Categorizer {
    let model_path = db_path.with_extension("model.json");
    Categorizer::with_model_path(model_path)
}

fn engine_for(db_path: &Path) -> Result<AnalyticsEngine> {
    let db = open_db(db_path)?;
    AnalyticsEngine::new(db, AnalyticsConfig::default())
        .context("Failed to build analytics engine")
}

fn print_json<T: serde::Serialize>(report: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}

pub fn cmd_init(db_path: &Path) -> Result<()> {
    println!("Initializing database at {}...", db_path.display());
    open_db(db_path)?;
    println!("Database initialized.");
    println!();
    println!("Next steps:");
    println!("  1. Import transactions: moneta import --file statement.csv");
    println!("  2. Check your health score: moneta health");
    Ok(())
}

pub fn cmd_import(db_path: &Path, file: &Path) -> Result<()> {
    let db = open_db(db_path)?;
    let categorizer = categorizer_for(db_path);

    let summary = import_csv(&db, &categorizer, file)
        .with_context(|| format!("Failed to import {}", file.display()))?;

    println!(
        "Imported {} transactions ({} categorized, {} rows skipped)",
        summary.imported, summary.categorized, summary.skipped
    );
    Ok(())
}

pub fn cmd_categorize(db_path: &Path, description: &str) -> Result<()> {
    let categorizer = categorizer_for(db_path);
    let (category, confidence) = categorizer.categorize(description);
    print_json(&json!({
        "description": description,
        "category": category,
        "confidence": confidence,
    }))
}

pub fn cmd_correct(db_path: &Path, description: &str, category: &str) -> Result<()> {
    let db = open_db(db_path)?;
    let mut categorizer = categorizer_for(db_path);
    categorizer
        .record_correction(&db, description, category)
        .context("Failed to record correction")?;
    println!("Recorded: \"{}\" -> {}", description, category);
    Ok(())
}

pub fn cmd_recurring(db_path: &Path, id: i64, recurring: bool) -> Result<()> {
    let db = open_db(db_path)?;
    db.set_transaction_recurring(id, recurring)
        .with_context(|| format!("Failed to update transaction {}", id))?;
    println!(
        "Transaction {} marked {}",
        id,
        if recurring { "recurring" } else { "not recurring" }
    );
    Ok(())
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

pub fn cmd_health(db_path: &Path) -> Result<()> {
    let report = engine_for(db_path)?.financial_health(today())?;
    print_json(&report)
}

pub fn cmd_anomalies(db_path: &Path, days: i64) -> Result<()> {
    let report = engine_for(db_path)?.spending_anomalies(today(), days)?;
    print_json(&report)
}

pub fn cmd_predict(db_path: &Path, months: u32) -> Result<()> {
    let report = engine_for(db_path)?.predict_spending(today(), months)?;
    print_json(&report)
}

pub fn cmd_budget(db_path: &Path) -> Result<()> {
    let report = engine_for(db_path)?.budget_analysis(today())?;
    print_json(&report)
}

pub fn cmd_trends(db_path: &Path, months: u32) -> Result<()> {
    let report = engine_for(db_path)?.category_trends(today(), months)?;
    print_json(&report)
}

pub fn cmd_insights(db_path: &Path) -> Result<()> {
    let report = engine_for(db_path)?.spending_insights(today())?;
    print_json(&report)
}
