//! Financial health scoring
//!
//! Five weighted factors over the trailing four calendar months, each
//! normalized to 0-100 and combined by weight into a single score with a
//! letter grade. The scorer is budget-aware and commission-aware: irregular
//! commission income and a known life event (the house purchase) must not
//! tank the score.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::stats::{mean, round1, std_dev};
use super::Priority;
use crate::aggregate::{build_month_snapshots, MonthSnapshot, RunContext};
use crate::classify::Classifier;
use crate::db::{BudgetSnapshot, Database};
use crate::error::Result;
use crate::models::round_cents;

/// Months of history consulted (current + 3 prior)
const TRAILING_MONTHS: u32 = 4;
/// Minimum snapshots needed to score at all
const MIN_MONTHS: usize = 2;
/// Months below this completeness are skipped by per-month factors
const FACTOR_MIN_COMPLETENESS: f64 = 0.5;

const WEIGHT_SAVINGS: f64 = 0.25;
const WEIGHT_COVERAGE: f64 = 0.20;
const WEIGHT_ADHERENCE: f64 = 0.25;
const WEIGHT_COMMISSION: f64 = 0.15;
const WEIGHT_CONSISTENCY: f64 = 0.15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FactorStatus {
    Good,
    Fair,
    Poor,
}

/// One scored factor with its weight and status band
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Factor {
    pub value: f64,
    pub score: f64,
    pub weight: f64,
    pub description: String,
    pub status: FactorStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_budget: Option<bool>,
}

impl Factor {
    fn new(value: f64, score: f64, weight: f64, description: &str, status: FactorStatus) -> Self {
        Self {
            value: round1(value),
            score: round1(score),
            weight,
            description: description.to_string(),
            status,
            has_budget: None,
        }
    }
}

/// The five factors, in weight order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthFactors {
    pub savings_rate: Factor,
    pub base_coverage: Factor,
    pub budget_adherence: Factor,
    pub commission_utilization: Factor,
    pub spending_consistency: Factor,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub priority: Priority,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetInfo {
    pub has_active_budget: bool,
    pub budget_name: Option<String>,
    pub total_budgeted: f64,
    pub categories_tracked: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomeBreakdown {
    pub base_salary: f64,
    pub commission: f64,
    pub other: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifeEventSummary {
    pub active: bool,
    pub house_related_spending: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpendingBreakdown {
    pub recurring_monthly_avg: f64,
    pub one_time_total: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub score: f64,
    pub grade: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub factors: Option<HealthFactors>,
    pub recommendations: Vec<Recommendation>,
    /// "good" | "partial" | "limited" | "insufficient"
    pub data_quality: String,
    pub months_analyzed: usize,
    pub period: String,
    pub calculated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget_info: Option<BudgetInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub income_breakdown: Option<IncomeBreakdown>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub life_events: Option<LifeEventSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spending_breakdown: Option<SpendingBreakdown>,
}

/// A category significantly over budget in one month, used for callouts
#[derive(Debug, Clone)]
struct OverBudgetCategory {
    category: String,
    budgeted: f64,
    actual: f64,
    variance_pct: f64,
}

/// Completeness-weighted average of `(value, weight)` pairs
fn weighted_avg(pairs: &[(f64, f64)]) -> Option<f64> {
    let total_weight: f64 = pairs.iter().map(|(_, w)| w).sum();
    if total_weight <= 0.0 {
        return None;
    }
    Some(pairs.iter().map(|(v, w)| v * w).sum::<f64>() / total_weight)
}

pub fn financial_health(
    db: &Database,
    classifier: &Classifier,
    ctx: &RunContext,
    budget: Option<&BudgetSnapshot>,
    today: NaiveDate,
) -> Result<HealthReport> {
    let months = build_month_snapshots(db, classifier, ctx, today, TRAILING_MONTHS)?;

    if months.len() < MIN_MONTHS {
        return Ok(HealthReport {
            score: 0.0,
            grade: "N/A".to_string(),
            factors: None,
            recommendations: vec![Recommendation {
                priority: Priority::Info,
                message: "Need at least 2 months of data".to_string(),
            }],
            data_quality: "insufficient".to_string(),
            months_analyzed: months.len(),
            period: format!("Trailing {} months", TRAILING_MONTHS),
            calculated_at: today.to_string(),
            budget_info: None,
            income_breakdown: None,
            life_events: None,
            spending_breakdown: None,
        });
    }

    let savings_rate = savings_rate_factor(&months);
    let base_coverage = base_coverage_factor(&months, classifier);
    let (budget_adherence, over_budget) = budget_adherence_factor(&months, budget);
    let commission_utilization = commission_utilization_factor(&months);
    let spending_consistency = spending_consistency_factor(&months);

    let total_score = savings_rate.score * savings_rate.weight
        + base_coverage.score * base_coverage.weight
        + budget_adherence.score * budget_adherence.weight
        + commission_utilization.score * commission_utilization.weight
        + spending_consistency.score * spending_consistency.weight;

    let complete_months = months.iter().filter(|m| m.completeness >= 0.9).count();
    let data_quality = if complete_months >= 3 {
        "good"
    } else if complete_months >= 2 {
        "partial"
    } else {
        "limited"
    };

    let factors = HealthFactors {
        savings_rate,
        base_coverage,
        budget_adherence,
        commission_utilization,
        spending_consistency,
    };

    let recommendations = recommendations(&factors, &months, budget, &over_budget);

    let house_spending: f64 = months
        .iter()
        .filter(|m| m.in_house_event)
        .map(|m| m.house_related)
        .sum();

    Ok(HealthReport {
        score: round1(total_score),
        grade: grade(total_score).to_string(),
        factors: Some(factors),
        recommendations,
        data_quality: data_quality.to_string(),
        months_analyzed: months.len(),
        period: format!("Trailing {} months", TRAILING_MONTHS),
        calculated_at: today.to_string(),
        budget_info: Some(BudgetInfo {
            has_active_budget: budget.is_some(),
            budget_name: budget.map(|b| b.name.clone()),
            total_budgeted: budget.map(|b| round_cents(b.total_budgeted)).unwrap_or(0.0),
            categories_tracked: budget.map(|b| b.items.len()).unwrap_or(0),
        }),
        income_breakdown: Some(IncomeBreakdown {
            base_salary: round_cents(months.iter().map(|m| m.base_income).sum()),
            commission: round_cents(months.iter().map(|m| m.commission_income).sum()),
            other: round_cents(months.iter().map(|m| m.other_income).sum()),
        }),
        life_events: Some(LifeEventSummary {
            active: months.iter().any(|m| m.in_house_event),
            house_related_spending: round_cents(house_spending),
        }),
        spending_breakdown: Some(SpendingBreakdown {
            recurring_monthly_avg: round_cents(mean(
                &months.iter().map(|m| m.recurring_expenses).collect::<Vec<_>>(),
            )),
            one_time_total: round_cents(months.iter().map(|m| m.one_time_expenses).sum()),
        }),
    })
}

/// Savings rate: completeness-weighted average of (income-expenses)/income,
/// clamped to [-50, 70] before scoring
fn savings_rate_factor(months: &[MonthSnapshot]) -> Factor {
    let rates: Vec<(f64, f64)> = months
        .iter()
        .filter(|m| m.total_income > 0.0)
        .map(|m| {
            let rate = (m.total_income - m.total_expenses) / m.total_income * 100.0;
            (rate.clamp(-50.0, 70.0), m.completeness)
        })
        .collect();

    let (value, score) = match weighted_avg(&rates) {
        Some(avg) => (avg, ((avg + 10.0) * 1.8).clamp(0.0, 100.0)),
        None => (0.0, 0.0),
    };

    let status = if score >= 70.0 {
        FactorStatus::Good
    } else if score >= 40.0 {
        FactorStatus::Fair
    } else {
        FactorStatus::Poor
    };
    Factor::new(value, score, WEIGHT_SAVINGS, "Income minus spending", status)
}

/// Base income coverage of recurring expenses, capped at 100 per month
fn base_coverage_factor(months: &[MonthSnapshot], classifier: &Classifier) -> Factor {
    let expected_base = classifier.config().income.expected_base_monthly;

    let scores: Vec<(f64, f64)> = months
        .iter()
        .filter(|m| m.completeness >= FACTOR_MIN_COMPLETENESS && m.recurring_expenses > 0.0)
        .map(|m| {
            let base = if m.base_income > 0.0 {
                m.base_income
            } else {
                expected_base
            };
            (
                (base / m.recurring_expenses * 100.0).min(100.0),
                m.completeness,
            )
        })
        .collect();

    let avg = weighted_avg(&scores).unwrap_or(50.0);

    let status = if avg >= 80.0 {
        FactorStatus::Good
    } else if avg >= 50.0 {
        FactorStatus::Fair
    } else {
        FactorStatus::Poor
    };
    Factor::new(
        avg,
        avg,
        WEIGHT_COVERAGE,
        "Base salary covers recurring expenses",
        status,
    )
}

/// Budget adherence: share of budget-matched categories within +10% of their
/// budgeted amount (on or under budget both count as adherent)
fn budget_adherence_factor(
    months: &[MonthSnapshot],
    budget: Option<&BudgetSnapshot>,
) -> (Factor, Vec<OverBudgetCategory>) {
    let mut adherence_scores: Vec<(f64, f64)> = Vec::new();
    let mut callouts: Vec<OverBudgetCategory> = Vec::new();

    if let Some(budget) = budget {
        for m in months
            .iter()
            .filter(|m| m.completeness >= FACTOR_MIN_COMPLETENESS)
        {
            let mut adherent = 0usize;
            let mut over = 0usize;
            let mut month_callouts: Vec<OverBudgetCategory> = Vec::new();

            for (category, actual) in &m.category_spending {
                let line = match budget.line_for(category) {
                    Some(line) => line,
                    None => continue,
                };

                let variance_pct = if line.budgeted_amount > 0.0 {
                    (actual - line.budgeted_amount) / line.budgeted_amount * 100.0
                } else {
                    0.0
                };

                if variance_pct <= 10.0 {
                    adherent += 1;
                } else {
                    over += 1;
                    if variance_pct > 25.0 {
                        month_callouts.push(OverBudgetCategory {
                            category: category.clone(),
                            budgeted: line.budgeted_amount,
                            actual: *actual,
                            variance_pct,
                        });
                    }
                }
            }

            let total = adherent + over;
            if total > 0 {
                adherence_scores.push((adherent as f64 / total as f64 * 100.0, m.completeness));
                month_callouts.sort_by(|a, b| {
                    b.variance_pct
                        .partial_cmp(&a.variance_pct)
                        .unwrap_or(std::cmp::Ordering::Equal)
                });
                callouts.extend(month_callouts.into_iter().take(3));
            }
        }
    }

    // Neutral when no budget or no budget-matched spending
    let avg = weighted_avg(&adherence_scores).unwrap_or(70.0);

    let status = if avg >= 80.0 {
        FactorStatus::Good
    } else if avg >= 60.0 {
        FactorStatus::Fair
    } else {
        FactorStatus::Poor
    };
    let mut factor = Factor::new(
        avg,
        avg,
        WEIGHT_ADHERENCE,
        "Staying within budget limits",
        status,
    );
    factor.has_budget = Some(budget.is_some());
    (factor, callouts)
}

/// How much of commission income gets invested, for months that have any
fn commission_utilization_factor(months: &[MonthSnapshot]) -> Factor {
    let scores: Vec<(f64, f64)> = months
        .iter()
        .filter(|m| m.commission_income > 0.0 && m.completeness >= FACTOR_MIN_COMPLETENESS)
        .map(|m| {
            let util = 50.0 + m.investments / m.commission_income * 50.0;
            (util.min(100.0), m.completeness)
        })
        .collect();

    let avg = weighted_avg(&scores).unwrap_or(70.0);

    let status = if avg >= 70.0 {
        FactorStatus::Good
    } else if avg >= 50.0 {
        FactorStatus::Fair
    } else {
        FactorStatus::Poor
    };
    Factor::new(
        avg,
        avg,
        WEIGHT_COMMISSION,
        "Commission used for investing",
        status,
    )
}

/// Stability of recurring expenses via coefficient of variation
fn spending_consistency_factor(months: &[MonthSnapshot]) -> Factor {
    let recurring: Vec<f64> = months
        .iter()
        .filter(|m| m.completeness >= FACTOR_MIN_COMPLETENESS)
        .map(|m| m.recurring_expenses)
        .collect();

    let (variability, score) = if recurring.len() >= 2 {
        let m = mean(&recurring);
        let cv = if m > 0.0 { std_dev(&recurring) / m } else { 0.0 };
        (cv, (100.0 - cv * 150.0).clamp(0.0, 100.0))
    } else {
        (0.0, 50.0)
    };

    let status = if score >= 70.0 {
        FactorStatus::Good
    } else if score >= 40.0 {
        FactorStatus::Fair
    } else {
        FactorStatus::Poor
    };
    Factor::new(
        variability * 100.0,
        score,
        WEIGHT_CONSISTENCY,
        "Recurring expense stability",
        status,
    )
}

/// Letter grade in 5-point bands with +/- modifiers
pub fn grade(score: f64) -> &'static str {
    if score >= 90.0 {
        "A+"
    } else if score >= 85.0 {
        "A"
    } else if score >= 80.0 {
        "A-"
    } else if score >= 75.0 {
        "B+"
    } else if score >= 70.0 {
        "B"
    } else if score >= 65.0 {
        "B-"
    } else if score >= 60.0 {
        "C+"
    } else if score >= 55.0 {
        "C"
    } else if score >= 50.0 {
        "C-"
    } else if score >= 45.0 {
        "D+"
    } else if score >= 40.0 {
        "D"
    } else {
        "F"
    }
}

fn recommendations(
    factors: &HealthFactors,
    months: &[MonthSnapshot],
    budget: Option<&BudgetSnapshot>,
    over_budget: &[OverBudgetCategory],
) -> Vec<Recommendation> {
    let mut recs = Vec::new();
    let in_house_event = months.iter().any(|m| m.in_house_event);

    if budget.is_some() {
        match factors.budget_adherence.status {
            FactorStatus::Poor => recs.push(Recommendation {
                priority: Priority::Medium,
                message: "Several categories over budget. Review spending in the budget view."
                    .to_string(),
            }),
            FactorStatus::Good => recs.push(Recommendation {
                priority: Priority::Info,
                message: "Great job staying within your budget!".to_string(),
            }),
            FactorStatus::Fair => {}
        }
    }

    // Top two over-budget categories by variance
    let mut worst: Vec<&OverBudgetCategory> = over_budget.iter().collect();
    worst.sort_by(|a, b| {
        b.variance_pct
            .partial_cmp(&a.variance_pct)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    for item in worst.into_iter().take(2) {
        recs.push(Recommendation {
            priority: Priority::Medium,
            message: format!(
                "{}: ${:.0} vs ${:.0} budget (+{:.0}%)",
                item.category, item.actual, item.budgeted, item.variance_pct
            ),
        });
    }

    match factors.base_coverage.status {
        FactorStatus::Good => recs.push(Recommendation {
            priority: Priority::Info,
            message: "Base salary covers recurring expenses - commission is bonus!".to_string(),
        }),
        FactorStatus::Poor => recs.push(Recommendation {
            priority: Priority::Medium,
            message: "Base salary doesn't cover recurring expenses. Reduce fixed costs."
                .to_string(),
        }),
        FactorStatus::Fair => {}
    }

    if factors.commission_utilization.score >= 70.0 {
        recs.push(Recommendation {
            priority: Priority::Info,
            message: "Great job investing commission income!".to_string(),
        });
    }

    if in_house_event {
        let house_spending: f64 = months
            .iter()
            .filter(|m| m.in_house_event)
            .map(|m| m.house_related)
            .sum();
        if house_spending > 0.0 {
            recs.push(Recommendation {
                priority: Priority::Info,
                message: format!(
                    "House costs: ${:.0} - expected to normalize.",
                    house_spending
                ),
            });
        }
    }

    if factors.savings_rate.value >= 30.0 {
        recs.push(Recommendation {
            priority: Priority::Info,
            message: format!(
                "Excellent {:.0}% savings rate!",
                factors.savings_rate.value
            ),
        });
    }

    recs.sort_by_key(|r| r.priority.rank());
    recs.truncate(6);
    recs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalyticsConfig;
    use crate::models::NewTransaction;

    fn engine_parts() -> (Database, Classifier) {
        let db = Database::in_memory().unwrap();
        let classifier = Classifier::new(AnalyticsConfig::default()).unwrap();
        (db, classifier)
    }

    fn insert(db: &Database, date: &str, description: &str, amount: f64) {
        db.insert_transaction(&NewTransaction {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            description: description.to_string(),
            amount,
            category_id: None,
        })
        .unwrap();
    }

    #[test]
    fn test_grade_bands_cover_all_scores() {
        // Step function with no gaps: every score maps to exactly one grade
        let expected = [
            (95.0, "A+"),
            (90.0, "A+"),
            (89.9, "A"),
            (85.0, "A"),
            (80.0, "A-"),
            (75.0, "B+"),
            (70.0, "B"),
            (65.0, "B-"),
            (60.0, "C+"),
            (55.0, "C"),
            (50.0, "C-"),
            (45.0, "D+"),
            (40.0, "D"),
            (39.9, "F"),
            (0.0, "F"),
        ];
        for (score, want) in expected {
            assert_eq!(grade(score), want, "score {}", score);
        }
    }

    #[test]
    fn test_insufficient_data_sentinel() {
        let (db, classifier) = engine_parts();
        let ctx = RunContext::load(&db, &classifier).unwrap();
        insert(&db, "2025-11-05", "UBER EATS", -40.0);

        let today = NaiveDate::from_ymd_opt(2025, 11, 30).unwrap();
        let report = financial_health(&db, &classifier, &ctx, None, today).unwrap();

        assert_eq!(report.score, 0.0);
        assert_eq!(report.grade, "N/A");
        assert_eq!(report.data_quality, "insufficient");
        assert!(report.factors.is_none());
    }

    #[test]
    fn test_score_bounded_and_weighted() {
        let (db, classifier) = engine_parts();
        let ctx = RunContext::load(&db, &classifier).unwrap();

        for month in ["2025-09", "2025-10", "2025-11"] {
            insert(&db, &format!("{}-01", month), "EXAFUNCT DIR DEP", 5500.0);
            insert(&db, &format!("{}-15", month), "EXAFUNCT DIR DEP", 5500.0);
            insert(&db, &format!("{}-10", month), "GROCERY STORE", -2000.0);
        }

        let today = NaiveDate::from_ymd_opt(2025, 11, 30).unwrap();
        let report = financial_health(&db, &classifier, &ctx, None, today).unwrap();

        assert!(report.score > 0.0 && report.score <= 100.0);
        let factors = report.factors.unwrap();
        // High savings (income 11000, spend 2000) -> good savings factor
        assert_eq!(factors.savings_rate.status, FactorStatus::Good);
        // Base covers recurring comfortably
        assert_eq!(factors.base_coverage.status, FactorStatus::Good);
        // No budget -> neutral adherence with flag
        assert_eq!(factors.budget_adherence.value, 70.0);
        assert_eq!(factors.budget_adherence.has_budget, Some(false));
        // No commission months -> neutral 70
        assert_eq!(factors.commission_utilization.value, 70.0);
        // Identical recurring totals -> perfect consistency
        assert_eq!(factors.spending_consistency.score, 100.0);
    }

    #[test]
    fn test_commission_utilization_rewards_investing() {
        let (db, classifier) = engine_parts();
        let ctx = RunContext::load(&db, &classifier).unwrap();

        for month in ["2025-09", "2025-10"] {
            insert(&db, &format!("{}-01", month), "EXAFUNCT DIR DEP", 5500.0);
            insert(&db, &format!("{}-15", month), "EXAFUNCT DIR DEP", 15000.0);
            insert(&db, &format!("{}-16", month), "ROBINHOOD DES:FUNDS", -15000.0);
            insert(&db, &format!("{}-10", month), "GROCERY STORE", -2000.0);
        }

        let today = NaiveDate::from_ymd_opt(2025, 10, 31).unwrap();
        let report = financial_health(&db, &classifier, &ctx, None, today).unwrap();
        let factors = report.factors.unwrap();

        // Fully invested commission caps the factor at 100
        assert_eq!(factors.commission_utilization.score, 100.0);
        assert_eq!(factors.commission_utilization.status, FactorStatus::Good);
    }

    #[test]
    fn test_budget_adherence_counts_overruns() {
        let (db, classifier) = engine_parts();
        let coffee = db.upsert_category("Coffee", None).unwrap();
        let groceries = db.upsert_category("Groceries", None).unwrap();
        let budget_id = db.create_budget("Monthly", true).unwrap();
        db.add_budget_item(budget_id, coffee, 50.0, "2025-10").unwrap();
        db.add_budget_item(budget_id, groceries, 500.0, "2025-10")
            .unwrap();
        let ctx = RunContext::load(&db, &classifier).unwrap();

        for month in ["2025-09", "2025-10"] {
            insert(&db, &format!("{}-01", month), "EXAFUNCT DIR DEP", 5500.0);
        }
        // Coffee way over, groceries on budget (category resolution via ids)
        let coffee_txn = NewTransaction {
            date: NaiveDate::from_ymd_opt(2025, 10, 5).unwrap(),
            description: "BLUE BOTTLE".to_string(),
            amount: -120.0,
            category_id: Some(coffee),
        };
        let grocery_txn = NewTransaction {
            date: NaiveDate::from_ymd_opt(2025, 10, 6).unwrap(),
            description: "HEB".to_string(),
            amount: -480.0,
            category_id: Some(groceries),
        };
        db.insert_transaction(&coffee_txn).unwrap();
        db.insert_transaction(&grocery_txn).unwrap();

        let budget = db.active_budget().unwrap().unwrap();
        let today = NaiveDate::from_ymd_opt(2025, 10, 31).unwrap();
        let report = financial_health(&db, &classifier, &ctx, Some(&budget), today).unwrap();
        let factors = report.factors.unwrap();

        // One of two categories adherent
        assert_eq!(factors.budget_adherence.value, 50.0);
        assert_eq!(factors.budget_adherence.has_budget, Some(true));
        // Coffee at +140% variance produces a callout recommendation
        assert!(report
            .recommendations
            .iter()
            .any(|r| r.message.contains("Coffee")));
    }
}
