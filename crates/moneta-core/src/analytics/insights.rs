//! Prioritized spending insights over the trailing 90 days
//!
//! A flat scan of the window rather than per-month snapshots: income split
//! by role, spending split into life-event vs recurring, investments
//! totaled, then a handful of rule-driven observations sorted by priority.

use std::collections::HashMap;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use super::Priority;
use crate::aggregate::RunContext;
use crate::classify::Classifier;
use crate::db::{BudgetSnapshot, Database};
use crate::error::Result;
use crate::models::{round_cents, TxnRole};

/// Days of history consulted
const WINDOW_DAYS: i64 = 90;
/// Months the window spans, for scaling monthly budget lines
const WINDOW_MONTHS: f64 = 3.0;
/// Variance beyond +/- this percent of the scaled budget is worth a callout
const BUDGET_VARIANCE_PCT: f64 = 20.0;
/// Investment totals below this are not worth an insight
const MIN_INVESTED: f64 = 100.0;
/// Reported insights are capped at this many
const MAX_INSIGHTS: usize = 8;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Insight {
    #[serde(rename = "type")]
    pub kind: String,
    pub priority: Priority,
    pub title: String,
    pub description: String,
    pub recommendation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsightSummary {
    pub base_income: f64,
    pub commission_income: f64,
    pub total_income: f64,
    pub recurring_expenses: f64,
    pub life_event_expenses: f64,
    pub total_invested: f64,
    pub categories: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsightReport {
    pub insights: Vec<Insight>,
    pub total_insights: usize,
    pub period: String,
    pub budget_integrated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<InsightSummary>,
    pub life_events: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

pub fn generate(
    db: &Database,
    classifier: &Classifier,
    ctx: &RunContext,
    budget: Option<&BudgetSnapshot>,
    today: NaiveDate,
) -> Result<InsightReport> {
    let start = today - Duration::days(WINDOW_DAYS);
    let transactions = db.transactions_in_range(start, today)?;

    if transactions.is_empty() {
        return Ok(InsightReport {
            insights: Vec::new(),
            total_insights: 0,
            period: format!("{} days", WINDOW_DAYS),
            budget_integrated: budget.is_some(),
            budget_name: None,
            summary: None,
            life_events: Vec::new(),
            message: Some("No data".to_string()),
        });
    }

    let mut base_income = 0.0;
    let mut commission_income = 0.0;
    let mut other_income = 0.0;
    let mut total_invested = 0.0;
    let mut investment_count = 0usize;
    let mut recurring_totals: HashMap<String, f64> = HashMap::new();
    let mut total_recurring = 0.0;
    let mut life_event_total = 0.0;
    let mut active_events: Vec<String> = Vec::new();

    for txn in &transactions {
        let category = ctx.category_name(txn.category_id);
        let classification = classifier.classify(txn, category, &ctx.excluded_ids);
        let amt = txn.amount.abs();

        match classification.role {
            TxnRole::BaseIncome => base_income += txn.amount,
            TxnRole::CommissionIncome => commission_income += txn.amount,
            TxnRole::OtherIncome => other_income += txn.amount,
            TxnRole::InvestmentTransfer => {
                total_invested += amt;
                investment_count += 1;
            }
            TxnRole::ExcludedTransfer => {}
            TxnRole::Spending => {
                if let Some(event) = classification.life_event {
                    life_event_total += amt;
                    if !active_events.contains(&event) {
                        active_events.push(event);
                    }
                } else {
                    *recurring_totals.entry(category.to_string()).or_default() += amt;
                    total_recurring += amt;
                }
            }
        }
    }

    let total_income = base_income + commission_income + other_income;
    let mut insights: Vec<Insight> = Vec::new();

    if let Some(budget) = budget {
        let mut over: Vec<(String, f64, f64, f64)> = Vec::new();
        let mut under: Vec<(String, f64, f64, f64)> = Vec::new();

        for (category, actual) in &recurring_totals {
            let line = match budget.line_for(category) {
                Some(line) => line,
                None => continue,
            };
            let budgeted = line.budgeted_amount * WINDOW_MONTHS;
            if budgeted <= 0.0 {
                continue;
            }
            let variance_pct = (actual - budgeted) / budgeted * 100.0;
            if variance_pct > BUDGET_VARIANCE_PCT {
                over.push((category.clone(), *actual, budgeted, variance_pct));
            } else if variance_pct < -BUDGET_VARIANCE_PCT {
                under.push((category.clone(), *actual, budgeted, variance_pct.abs()));
            }
        }

        over.sort_by(|a, b| b.3.partial_cmp(&a.3).unwrap_or(std::cmp::Ordering::Equal));
        under.sort_by(|a, b| b.3.partial_cmp(&a.3).unwrap_or(std::cmp::Ordering::Equal));

        if let Some((category, actual, budgeted, variance_pct)) = over.first() {
            insights.push(Insight {
                kind: "over_budget".to_string(),
                priority: Priority::Medium,
                title: format!("{} over budget by {:.0}%", category, variance_pct),
                description: format!("Spent ${:.0} vs ${:.0} budgeted", actual, budgeted),
                recommendation: format!("Review {} spending or adjust budget.", category),
            });
        }
        if let Some((category, actual, budgeted, variance_pct)) = under.first() {
            insights.push(Insight {
                kind: "under_budget".to_string(),
                priority: Priority::Info,
                title: format!("{} under budget by {:.0}%", category, variance_pct),
                description: format!("Spent ${:.0} vs ${:.0} budgeted", actual, budgeted),
                recommendation: "Great discipline! Consider reallocating savings.".to_string(),
            });
        }
    }

    if commission_income > 0.0 {
        let commission_pct = if total_income > 0.0 {
            commission_income / total_income * 100.0
        } else {
            0.0
        };
        insights.push(Insight {
            kind: "income_breakdown".to_string(),
            priority: Priority::Info,
            title: format!(
                "Commission: ${:.0} ({:.0}%)",
                commission_income, commission_pct
            ),
            description: format!("Base: ${:.0}", base_income),
            recommendation: "Commission variability is normal.".to_string(),
        });
    }

    if life_event_total > 0.0 {
        insights.push(Insight {
            kind: "life_event".to_string(),
            priority: Priority::Info,
            title: format!("Life event costs: ${:.0}", life_event_total),
            description: active_events.join(", "),
            recommendation: "Expected - will normalize.".to_string(),
        });
    }

    if total_invested > MIN_INVESTED {
        // Compare against the budget's savings line when there is one
        let savings_note = budget
            .and_then(|b| b.line_for("Savings"))
            .map(|line| line.budgeted_amount * WINDOW_MONTHS)
            .filter(|goal| total_invested >= *goal)
            .map(|goal| format!(" (exceeds ${:.0} goal!)", goal))
            .unwrap_or_default();

        insights.push(Insight {
            kind: "investments".to_string(),
            priority: Priority::Info,
            title: format!("${:.0} invested{}", total_invested, savings_note),
            description: format!("{} transfers", investment_count),
            recommendation: "Great investing habit!".to_string(),
        });
    }

    if base_income > 0.0 && total_recurring > 0.0 {
        let coverage = base_income / total_recurring * 100.0;
        if coverage >= 100.0 {
            insights.push(Insight {
                kind: "base_coverage".to_string(),
                priority: Priority::Info,
                title: format!("Base covers {:.0}% of recurring", coverage),
                description: "Commission is pure bonus!".to_string(),
                recommendation: "Excellent - invest commission.".to_string(),
            });
        }
    }

    insights.sort_by_key(|i| i.priority.rank());
    let total_insights = insights.len();
    insights.truncate(MAX_INSIGHTS);

    Ok(InsightReport {
        insights,
        total_insights,
        period: format!("{} days", WINDOW_DAYS),
        budget_integrated: budget.is_some(),
        budget_name: budget.map(|b| b.name.clone()),
        summary: Some(InsightSummary {
            base_income: round_cents(base_income),
            commission_income: round_cents(commission_income),
            total_income: round_cents(total_income),
            recurring_expenses: round_cents(total_recurring),
            life_event_expenses: round_cents(life_event_total),
            total_invested: round_cents(total_invested),
            categories: recurring_totals.len(),
        }),
        life_events: active_events,
        message: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalyticsConfig;
    use crate::models::NewTransaction;

    fn setup() -> (Database, Classifier) {
        let db = Database::in_memory().unwrap();
        let classifier = Classifier::new(AnalyticsConfig::default()).unwrap();
        (db, classifier)
    }

    fn insert(db: &Database, date: &str, description: &str, amount: f64, category_id: Option<i64>) {
        db.insert_transaction(&NewTransaction {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            description: description.to_string(),
            amount,
            category_id,
        })
        .unwrap();
    }

    #[test]
    fn test_no_data() {
        let (db, classifier) = setup();
        let ctx = RunContext::load(&db, &classifier).unwrap();
        let today = NaiveDate::from_ymd_opt(2025, 11, 30).unwrap();

        let report = generate(&db, &classifier, &ctx, None, today).unwrap();
        assert!(report.insights.is_empty());
        assert_eq!(report.message.as_deref(), Some("No data"));
    }

    #[test]
    fn test_commission_and_coverage_insights() {
        let (db, classifier) = setup();
        let ctx = RunContext::load(&db, &classifier).unwrap();

        insert(&db, "2025-11-01", "EXAFUNCT DIR DEP", 5500.0, None);
        insert(&db, "2025-11-15", "EXAFUNCT DIR DEP", 15000.0, None);
        insert(&db, "2025-11-10", "GROCERY STORE", -2000.0, None);

        let today = NaiveDate::from_ymd_opt(2025, 11, 30).unwrap();
        let report = generate(&db, &classifier, &ctx, None, today).unwrap();

        assert!(report.insights.iter().any(|i| i.kind == "income_breakdown"));
        // Base 5500 covers 275% of 2000 recurring
        let coverage = report
            .insights
            .iter()
            .find(|i| i.kind == "base_coverage")
            .unwrap();
        assert!(coverage.title.contains("275%"));

        let summary = report.summary.unwrap();
        assert_eq!(summary.base_income, 5500.0);
        assert_eq!(summary.commission_income, 15000.0);
        assert_eq!(summary.recurring_expenses, 2000.0);
    }

    #[test]
    fn test_budget_over_and_under_callouts() {
        let (db, classifier) = setup();
        let coffee = db.upsert_category("Coffee", None).unwrap();
        let gas = db.upsert_category("Gas", None).unwrap();
        let budget_id = db.create_budget("Monthly", true).unwrap();
        db.add_budget_item(budget_id, coffee, 50.0, "2025-11").unwrap();
        db.add_budget_item(budget_id, gas, 200.0, "2025-11").unwrap();
        let ctx = RunContext::load(&db, &classifier).unwrap();

        // Coffee: 300 spent vs 150 budgeted over 3 months (+100%)
        insert(&db, "2025-10-05", "BLUE BOTTLE", -300.0, Some(coffee));
        // Gas: 100 spent vs 600 budgeted (-83%)
        insert(&db, "2025-10-06", "SHELL", -100.0, Some(gas));

        let budget = db.active_budget().unwrap().unwrap();
        let today = NaiveDate::from_ymd_opt(2025, 11, 30).unwrap();
        let report = generate(&db, &classifier, &ctx, Some(&budget), today).unwrap();

        let over = report.insights.iter().find(|i| i.kind == "over_budget").unwrap();
        assert_eq!(over.priority, Priority::Medium);
        assert!(over.title.contains("Coffee"));
        assert!(over.title.contains("100%"));

        let under = report.insights.iter().find(|i| i.kind == "under_budget").unwrap();
        assert!(under.title.contains("Gas"));

        // Medium priority sorts ahead of info
        assert_eq!(report.insights[0].kind, "over_budget");
        assert!(report.budget_integrated);
    }

    #[test]
    fn test_life_event_and_investment_insights() {
        let (db, classifier) = setup();
        let furniture = db.upsert_category("Furniture", None).unwrap();
        let ctx = RunContext::load(&db, &classifier).unwrap();

        insert(&db, "2025-10-15", "WEST ELM SOFA", -4000.0, Some(furniture));
        insert(&db, "2025-10-20", "ROBINHOOD DES:FUNDS", -2000.0, None);
        insert(&db, "2025-11-20", "ROBINHOOD DES:FUNDS", -2000.0, None);

        let today = NaiveDate::from_ymd_opt(2025, 11, 30).unwrap();
        let report = generate(&db, &classifier, &ctx, None, today).unwrap();

        let event = report.insights.iter().find(|i| i.kind == "life_event").unwrap();
        assert!(event.title.contains("4000"));
        assert_eq!(report.life_events, vec!["House purchase".to_string()]);

        let invest = report.insights.iter().find(|i| i.kind == "investments").unwrap();
        assert!(invest.title.contains("4000"));
        assert!(invest.description.contains("2 transfers"));
    }
}
