//! Spending anomaly detection
//!
//! Flags the top 5% of spending by amount over a lookback window, with
//! budget context attached when a single transaction eats a large share of
//! a monthly category budget. Life-event spending is pulled out of the
//! percentile population first so a furniture splurge during the house
//! move does not inflate the threshold for everything else.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use super::stats::{mean, percentile};
use crate::aggregate::RunContext;
use crate::classify::Classifier;
use crate::db::{BudgetSnapshot, Database};
use crate::error::Result;
use crate::models::{round_cents, Transaction};

/// Minimum expense transactions before detection is meaningful
const MIN_TRANSACTIONS: usize = 10;
/// Reported anomalies are capped at this many
const MAX_ANOMALIES: usize = 12;
/// Life-event spending below this amount is not worth flagging
const LIFE_EVENT_FLOOR: f64 = 500.0;
/// A single transaction above this share of a monthly category budget gets
/// budget context attached
const BUDGET_SHARE_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    LargeTransaction,
    LifeEvent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Anomaly {
    #[serde(rename = "type")]
    pub kind: AnomalyKind,
    pub date: NaiveDate,
    pub amount: f64,
    pub description: String,
    pub category: String,
    pub severity: Severity,
    pub message: String,
    pub recommendation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget_context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyReport {
    pub anomalies: Vec<Anomaly>,
    pub total_found: usize,
    pub total_analyzed: usize,
    pub budget_integrated: bool,
    pub period: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl AnomalyReport {
    fn empty(period: String, message: &str) -> Self {
        Self {
            anomalies: Vec::new(),
            total_found: 0,
            total_analyzed: 0,
            budget_integrated: false,
            period,
            message: Some(message.to_string()),
        }
    }
}

/// Descriptions are trimmed to keep report rows readable
fn short_description(description: &str) -> String {
    if description.is_empty() {
        "Unknown".to_string()
    } else if description.chars().count() > 40 {
        let truncated: String = description.chars().take(40).collect();
        format!("{}...", truncated)
    } else {
        description.to_string()
    }
}

struct Expense<'a> {
    txn: &'a Transaction,
    category: String,
    life_event: Option<String>,
}

pub fn detect(
    db: &Database,
    classifier: &Classifier,
    ctx: &RunContext,
    budget: Option<&BudgetSnapshot>,
    today: NaiveDate,
    lookback_days: i64,
) -> Result<AnomalyReport> {
    let period = format!("{} days", lookback_days);
    let start = today - Duration::days(lookback_days);
    let transactions = db.expenses_since(start)?;

    if transactions.len() < MIN_TRANSACTIONS {
        return Ok(AnomalyReport::empty(period, "Insufficient data"));
    }

    let expenses: Vec<Expense> = transactions
        .iter()
        .filter(|t| classifier.is_actual_spending(t, &ctx.excluded_ids))
        .map(|t| {
            let category = ctx.category_name(t.category_id).to_string();
            let life_event = classifier
                .config()
                .life_event_context(t.date, &category)
                .map(|e| e.description.clone());
            Expense {
                txn: t,
                category,
                life_event,
            }
        })
        .collect();

    if expenses.is_empty() {
        return Ok(AnomalyReport::empty(period, "No expenses after filtering"));
    }

    let (event_expenses, normal_expenses): (Vec<&Expense>, Vec<&Expense>) =
        expenses.iter().partition(|e| e.life_event.is_some());

    let mut anomalies: Vec<Anomaly> = Vec::new();

    if !normal_expenses.is_empty() {
        let amounts: Vec<f64> = normal_expenses.iter().map(|e| e.txn.amount.abs()).collect();
        let threshold = if amounts.len() > 5 {
            percentile(&amounts, 95.0)
        } else {
            mean(&amounts) * 2.0
        };

        for e in &normal_expenses {
            let amt = e.txn.amount.abs();
            if amt < threshold {
                continue;
            }

            let budget_context = budget
                .and_then(|b| b.line_for(&e.category))
                .filter(|line| amt > line.budgeted_amount * BUDGET_SHARE_THRESHOLD)
                .map(|line| {
                    format!(
                        "This is {:.0}% of your ${:.0} monthly {} budget",
                        amt / line.budgeted_amount * 100.0,
                        line.budgeted_amount,
                        e.category
                    )
                });

            anomalies.push(Anomaly {
                kind: AnomalyKind::LargeTransaction,
                date: e.txn.date,
                amount: round_cents(amt),
                description: short_description(&e.txn.description),
                category: e.category.clone(),
                severity: Severity::Medium,
                message: format!("${:.2} - top 5% spending", amt),
                recommendation: format!("Verify {} expense.", e.category),
                budget_context,
                context: None,
            });
        }
    }

    for e in &event_expenses {
        let amt = e.txn.amount.abs();
        if amt <= LIFE_EVENT_FLOOR {
            continue;
        }
        let event = e.life_event.as_deref().unwrap_or_default().to_string();
        anomalies.push(Anomaly {
            kind: AnomalyKind::LifeEvent,
            date: e.txn.date,
            amount: round_cents(amt),
            description: short_description(&e.txn.description),
            category: e.category.clone(),
            severity: Severity::Low,
            message: format!("${:.2} - {}", amt, event),
            recommendation: "Expected life-event cost.".to_string(),
            budget_context: None,
            context: Some(event),
        });
    }

    anomalies.sort_by(|a, b| {
        a.severity.cmp(&b.severity).then(
            b.amount
                .partial_cmp(&a.amount)
                .unwrap_or(std::cmp::Ordering::Equal),
        )
    });

    let total_found = anomalies.len();
    anomalies.truncate(MAX_ANOMALIES);

    Ok(AnomalyReport {
        anomalies,
        total_found,
        total_analyzed: expenses.len(),
        budget_integrated: budget.is_some(),
        period,
        message: None,
    })
}
