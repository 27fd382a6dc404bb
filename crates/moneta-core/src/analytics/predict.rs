//! Recurring-spend forecasting
//!
//! A deliberately simple stationary model: the forecast for every future
//! month is the mean of the last three recurring-spend months, with a 90%
//! confidence band from the filtered history's deviation. Months more than
//! 3x the median are treated as outliers (a furniture month is not a new
//! normal) and dropped before averaging.

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use super::stats::{mean, median, std_dev};
use crate::aggregate::RunContext;
use crate::classify::Classifier;
use crate::db::{BudgetSnapshot, Database};
use crate::error::Result;
use crate::models::round_cents;

/// Days of history consulted
const LOOKBACK_DAYS: i64 = 365;
/// Minimum expense transactions before forecasting
const MIN_TRANSACTIONS: usize = 20;
/// Minimum distinct recurring-spend months
const MIN_MONTHS: usize = 3;
/// Months above `median * OUTLIER_MULTIPLE` are dropped before averaging
const OUTLIER_MULTIPLE: f64 = 3.0;
/// z-value for the 90% confidence band
const Z_90: f64 = 1.645;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthPrediction {
    pub month: String,
    pub predicted_recurring: f64,
    pub confidence_interval: ConfidenceInterval,
    pub confidence_level: u8,
    pub trend: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget_amount: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetStatus {
    OnTrack,
    OverBudget,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetComparison {
    pub total_budgeted: f64,
    pub predicted_vs_budget: f64,
    pub status: BudgetStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionReport {
    pub predictions: Vec<MonthPrediction>,
    pub historical_months: usize,
    pub avg_recurring: f64,
    pub median_recurring: f64,
    pub avg_one_time: f64,
    pub total_investments_tracked: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget_comparison: Option<BudgetComparison>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl PredictionReport {
    fn empty(message: &str) -> Self {
        Self {
            predictions: Vec::new(),
            historical_months: 0,
            avg_recurring: 0.0,
            median_recurring: 0.0,
            avg_one_time: 0.0,
            total_investments_tracked: 0.0,
            budget_comparison: None,
            message: Some(message.to_string()),
        }
    }
}

pub fn predict(
    db: &Database,
    classifier: &Classifier,
    ctx: &RunContext,
    budget: Option<&BudgetSnapshot>,
    today: NaiveDate,
    months_ahead: u32,
) -> Result<PredictionReport> {
    let start = today - Duration::days(LOOKBACK_DAYS);
    let transactions = db.expenses_since(start)?;

    if transactions.len() < MIN_TRANSACTIONS {
        return Ok(PredictionReport::empty("Insufficient data"));
    }

    // BTreeMap keeps month keys chronological
    let mut monthly_recurring: BTreeMap<String, f64> = BTreeMap::new();
    let mut monthly_one_time: BTreeMap<String, f64> = BTreeMap::new();
    let mut total_investments = 0.0;

    for txn in &transactions {
        let category = ctx.category_name(txn.category_id);
        let month_key = txn.date.format("%Y-%m").to_string();
        let amt = txn.amount.abs();

        if classifier.is_investment_transfer(txn) {
            total_investments += amt;
            continue;
        }
        if classifier.is_actual_spending(txn, &ctx.excluded_ids) {
            if classifier.config().is_one_time_category(category) {
                *monthly_one_time.entry(month_key).or_default() += amt;
            } else {
                *monthly_recurring.entry(month_key).or_default() += amt;
            }
        }
    }

    if monthly_recurring.len() < MIN_MONTHS {
        return Ok(PredictionReport::empty("Need 3+ months"));
    }

    let recurring_amounts: Vec<f64> = monthly_recurring.values().copied().collect();
    let median_recurring = median(&recurring_amounts);

    let mut filtered: Vec<f64> = recurring_amounts
        .iter()
        .copied()
        .filter(|a| *a < median_recurring * OUTLIER_MULTIPLE)
        .collect();
    if filtered.len() < MIN_MONTHS {
        filtered = recurring_amounts.clone();
    }

    let avg_recurring = if filtered.len() >= 3 {
        mean(&filtered[filtered.len() - 3..])
    } else {
        mean(&filtered)
    };
    let std_recurring = if filtered.len() > 1 {
        std_dev(&filtered)
    } else {
        avg_recurring * 0.2
    };

    let budget_comparison = budget.map(|b| BudgetComparison {
        total_budgeted: round_cents(b.total_budgeted),
        predicted_vs_budget: if b.total_budgeted > 0.0 {
            ((avg_recurring / b.total_budgeted - 1.0) * 1000.0).round() / 10.0
        } else {
            0.0
        },
        status: if avg_recurring <= b.total_budgeted * 1.1 {
            BudgetStatus::OnTrack
        } else {
            BudgetStatus::OverBudget
        },
    });

    let predictions = (1..=months_ahead)
        .map(|i| {
            let future = today + Duration::days(30 * i as i64);
            MonthPrediction {
                month: format!("{:04}-{:02}", future.year(), future.month()),
                predicted_recurring: round_cents(avg_recurring),
                confidence_interval: ConfidenceInterval {
                    lower: round_cents((avg_recurring - Z_90 * std_recurring).max(0.0)),
                    upper: round_cents(avg_recurring + Z_90 * std_recurring),
                },
                confidence_level: 90,
                trend: "Stable".to_string(),
                budget_amount: budget.map(|b| round_cents(b.total_budgeted)),
            }
        })
        .collect();

    let one_time_amounts: Vec<f64> = monthly_one_time.values().copied().collect();

    Ok(PredictionReport {
        predictions,
        historical_months: recurring_amounts.len(),
        avg_recurring: round_cents(avg_recurring),
        median_recurring: round_cents(median_recurring),
        avg_one_time: round_cents(mean(&one_time_amounts)),
        total_investments_tracked: round_cents(total_investments),
        budget_comparison,
        message: None,
    })
}
