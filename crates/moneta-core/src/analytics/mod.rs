//! Analytics modules built on the aggregation engine
//!
//! - `health` - Composite financial health score with letter grade
//! - `anomalies` - Large-transaction and life-event spending flags
//! - `predict` - Stationary recurring-spend forecast with confidence bands
//! - `budget` - Current-month budget vs actual with day-of-month projection
//! - `trends` - Per-category month-over-month trend directions
//! - `insights` - Prioritized 90-day insight list
//!
//! Each analytics call is synchronous and request-scoped: it reads from the
//! store, computes in memory, and returns a plain serializable record. The
//! only shared state is the budget cache, valid for the calendar day it was
//! loaded on (a budget edited mid-day shows up the next day).

pub mod anomalies;
pub mod budget;
pub mod health;
pub mod insights;
pub mod predict;
pub mod stats;
pub mod trends;

use std::sync::Mutex;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::aggregate::RunContext;
use crate::classify::Classifier;
use crate::config::AnalyticsConfig;
use crate::db::{BudgetSnapshot, Database};
use crate::error::Result;

pub use anomalies::AnomalyReport;
pub use budget::BudgetAnalysis;
pub use health::HealthReport;
pub use insights::InsightReport;
pub use predict::PredictionReport;
pub use trends::TrendReport;

/// Priority of a recommendation or insight, in fixed sort order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
    Info,
}

impl Priority {
    /// Sort rank (lower sorts first)
    pub fn rank(&self) -> u8 {
        match self {
            Priority::High => 0,
            Priority::Medium => 1,
            Priority::Low => 2,
            Priority::Info => 3,
        }
    }
}

/// Day-scoped budget cache: `(value, valid-for-date)` rather than ambient
/// global state
#[derive(Default)]
struct BudgetCache {
    snapshot: Option<Option<BudgetSnapshot>>,
    loaded_on: Option<NaiveDate>,
}

/// Entry point for all analytics calls
pub struct AnalyticsEngine {
    db: Database,
    classifier: Classifier,
    budget_cache: Mutex<BudgetCache>,
}

impl AnalyticsEngine {
    pub fn new(db: Database, config: AnalyticsConfig) -> Result<Self> {
        Ok(Self {
            db,
            classifier: Classifier::new(config)?,
            budget_cache: Mutex::new(BudgetCache::default()),
        })
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// The active budget, cached for the calendar day
    fn active_budget(&self, today: NaiveDate) -> Result<Option<BudgetSnapshot>> {
        let mut cache = self.budget_cache.lock().expect("budget cache poisoned");
        if cache.loaded_on == Some(today) {
            if let Some(cached) = &cache.snapshot {
                return Ok(cached.clone());
            }
        }

        let snapshot = self.db.active_budget()?;
        debug!(has_budget = snapshot.is_some(), "Loaded active budget");
        cache.snapshot = Some(snapshot.clone());
        cache.loaded_on = Some(today);
        Ok(snapshot)
    }

    fn run_context(&self) -> Result<RunContext> {
        RunContext::load(&self.db, &self.classifier)
    }

    /// Composite financial health over the trailing four months
    pub fn financial_health(&self, today: NaiveDate) -> Result<HealthReport> {
        let ctx = self.run_context()?;
        let budget = self.active_budget(today)?;
        health::financial_health(&self.db, &self.classifier, &ctx, budget.as_ref(), today)
    }

    /// Spending anomalies over the trailing `lookback_days`
    pub fn spending_anomalies(
        &self,
        today: NaiveDate,
        lookback_days: i64,
    ) -> Result<AnomalyReport> {
        let ctx = self.run_context()?;
        let budget = self.active_budget(today)?;
        anomalies::detect(
            &self.db,
            &self.classifier,
            &ctx,
            budget.as_ref(),
            today,
            lookback_days,
        )
    }

    /// Recurring-spend forecast `months_ahead` months out
    pub fn predict_spending(
        &self,
        today: NaiveDate,
        months_ahead: u32,
    ) -> Result<PredictionReport> {
        let ctx = self.run_context()?;
        let budget = self.active_budget(today)?;
        predict::predict(
            &self.db,
            &self.classifier,
            &ctx,
            budget.as_ref(),
            today,
            months_ahead,
        )
    }

    /// Current-month budget vs actual analysis
    pub fn budget_analysis(&self, today: NaiveDate) -> Result<BudgetAnalysis> {
        let ctx = self.run_context()?;
        let budget = self.active_budget(today)?;
        budget::analyze(&self.db, &self.classifier, &ctx, budget.as_ref(), today)
    }

    /// Per-category spending trends over the trailing `months`
    pub fn category_trends(&self, today: NaiveDate, months: u32) -> Result<TrendReport> {
        let ctx = self.run_context()?;
        trends::category_trends(&self.db, &self.classifier, &ctx, today, months)
    }

    /// Prioritized insights over the trailing 90 days
    pub fn spending_insights(&self, today: NaiveDate) -> Result<InsightReport> {
        let ctx = self.run_context()?;
        let budget = self.active_budget(today)?;
        insights::generate(&self.db, &self.classifier, &ctx, budget.as_ref(), today)
    }
}
