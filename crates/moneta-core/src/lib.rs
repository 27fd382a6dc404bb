//! Moneta Core Library
//!
//! Shared functionality for the Moneta personal finance analytics tool:
//! - Database access and migrations
//! - CSV transaction import with categorize-on-import
//! - Hybrid keyword/statistical description categorizer
//! - Transaction role classification (income, transfers, spending)
//! - Monthly aggregation with partial-month projection
//! - Analytics: health score, anomalies, forecasts, budget, trends, insights

pub mod aggregate;
pub mod analytics;
pub mod categorize;
pub mod classify;
pub mod config;
pub mod db;
pub mod error;
pub mod import;
pub mod models;

pub use aggregate::{build_month_snapshots, MonthSnapshot, RunContext};
pub use analytics::{
    AnalyticsEngine, AnomalyReport, BudgetAnalysis, HealthReport, InsightReport,
    PredictionReport, Priority, TrendReport,
};
pub use categorize::{BayesModel, Categorizer, FallbackModel, UNCATEGORIZED};
pub use classify::{Classification, Classifier};
pub use config::{AnalyticsConfig, IncomeConfig, LifeEvent};
pub use db::{BudgetLine, BudgetSnapshot, Database};
pub use error::{Error, Result};
pub use import::{import_csv, ImportSummary};
pub use models::{Budget, BudgetItem, Category, NewTransaction, Transaction, TxnRole};
