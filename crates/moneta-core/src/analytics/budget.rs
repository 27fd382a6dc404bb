//! Current-month budget vs actual
//!
//! For each budgeted category: actual spend so far, a straight-line
//! day-of-month projection to month end, and a status derived from the
//! projected variance. The projection is what makes the statuses useful
//! mid-month; raw variance alone always looks fine on the 5th.

use std::collections::HashMap;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use super::stats::round1;
use crate::aggregate::{days_in_month, RunContext};
use crate::classify::Classifier;
use crate::db::{BudgetSnapshot, Database};
use crate::error::Result;
use crate::models::round_cents;

/// Projected variance above this percent is over budget
const OVER_BUDGET_PCT: f64 = 20.0;
/// Projected variance above this percent is at risk
const AT_RISK_PCT: f64 = 10.0;
/// Projected variance below this (negative) percent is under budget
const UNDER_BUDGET_PCT: f64 = -20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryStatus {
    OnTrack,
    AtRisk,
    OverBudget,
    UnderBudget,
}

impl CategoryStatus {
    fn from_projected_variance_pct(pct: f64) -> Self {
        if pct > OVER_BUDGET_PCT {
            CategoryStatus::OverBudget
        } else if pct > AT_RISK_PCT {
            CategoryStatus::AtRisk
        } else if pct < UNDER_BUDGET_PCT {
            CategoryStatus::UnderBudget
        } else {
            CategoryStatus::OnTrack
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryAnalysis {
    pub category: String,
    pub budgeted: f64,
    pub actual: f64,
    pub projected: f64,
    pub variance: f64,
    pub variance_pct: f64,
    pub projected_variance: f64,
    pub projected_variance_pct: f64,
    pub status: CategoryStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetTotals {
    pub budgeted: f64,
    pub actual: f64,
    pub projected: f64,
    pub remaining: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusCounts {
    pub on_track: usize,
    pub at_risk: usize,
    pub over_budget: usize,
    pub under_budget: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetAnalysis {
    pub has_budget: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<String>,
    pub days_in_month: u32,
    pub days_passed: u32,
    pub completion_pct: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub totals: Option<BudgetTotals>,
    pub categories: Vec<CategoryAnalysis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<StatusCounts>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

pub fn analyze(
    db: &Database,
    classifier: &Classifier,
    ctx: &RunContext,
    budget: Option<&BudgetSnapshot>,
    today: NaiveDate,
) -> Result<BudgetAnalysis> {
    let dim = days_in_month(today.year(), today.month());
    let days_passed = today.day();

    let budget = match budget {
        Some(b) => b,
        None => {
            return Ok(BudgetAnalysis {
                has_budget: false,
                budget_name: None,
                period: None,
                days_in_month: dim,
                days_passed,
                completion_pct: round1(days_passed as f64 / dim as f64 * 100.0),
                totals: None,
                categories: Vec::new(),
                summary: None,
                message: Some("No active budget found".to_string()),
            });
        }
    };

    let month_start =
        NaiveDate::from_ymd_opt(today.year(), today.month(), 1).expect("valid month start");
    let transactions = db.expenses_since(month_start)?;

    let mut category_spending: HashMap<String, f64> = HashMap::new();
    for txn in &transactions {
        if txn.date > today {
            continue;
        }
        if classifier.is_actual_spending(txn, &ctx.excluded_ids) {
            let category = ctx.category_name(txn.category_id);
            *category_spending.entry(category.to_string()).or_default() += txn.amount.abs();
        }
    }

    let project = |actual: f64| {
        if days_passed > 0 {
            actual / days_passed as f64 * dim as f64
        } else {
            actual
        }
    };

    let mut categories: Vec<CategoryAnalysis> = Vec::new();
    let mut total_budgeted = 0.0;
    let mut total_actual = 0.0;

    for line in budget.items.values() {
        let budgeted = line.budgeted_amount;
        let actual = category_spending
            .get(&line.category_name)
            .copied()
            .unwrap_or(0.0);
        total_budgeted += budgeted;
        total_actual += actual;

        let projected = project(actual);
        let variance = actual - budgeted;
        let projected_variance = projected - budgeted;
        let (variance_pct, projected_variance_pct) = if budgeted > 0.0 {
            (
                variance / budgeted * 100.0,
                projected_variance / budgeted * 100.0,
            )
        } else {
            (0.0, 0.0)
        };

        categories.push(CategoryAnalysis {
            category: line.category_name.clone(),
            budgeted: round_cents(budgeted),
            actual: round_cents(actual),
            projected: round_cents(projected),
            variance: round_cents(variance),
            variance_pct: round1(variance_pct),
            projected_variance: round_cents(projected_variance),
            projected_variance_pct: round1(projected_variance_pct),
            status: CategoryStatus::from_projected_variance_pct(projected_variance_pct),
        });
    }

    // Most over budget first
    categories.sort_by(|a, b| {
        b.projected_variance_pct
            .partial_cmp(&a.projected_variance_pct)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut summary = StatusCounts::default();
    for c in &categories {
        match c.status {
            CategoryStatus::OnTrack => summary.on_track += 1,
            CategoryStatus::AtRisk => summary.at_risk += 1,
            CategoryStatus::OverBudget => summary.over_budget += 1,
            CategoryStatus::UnderBudget => summary.under_budget += 1,
        }
    }

    Ok(BudgetAnalysis {
        has_budget: true,
        budget_name: Some(budget.name.clone()),
        period: Some(today.format("%Y-%m").to_string()),
        days_in_month: dim,
        days_passed,
        completion_pct: round1(days_passed as f64 / dim as f64 * 100.0),
        totals: Some(BudgetTotals {
            budgeted: round_cents(total_budgeted),
            actual: round_cents(total_actual),
            projected: round_cents(project(total_actual)),
            remaining: round_cents(total_budgeted - total_actual),
        }),
        categories,
        summary: Some(summary),
        message: None,
    })
}
