//! Per-category spending trends
//!
//! Groups actual spending by month and category, computes month-over-month
//! change plus a least-squares slope per category, and labels each as
//! increasing, stable, or decreasing. The slope threshold is relative to
//! the category's own average, so a $10 swing in a $40 coffee habit moves
//! the needle while the same swing in rent does not.

use std::collections::{BTreeMap, HashMap};

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use super::stats::{mean, ols_slope, round1};
use crate::aggregate::RunContext;
use crate::classify::Classifier;
use crate::db::Database;
use crate::error::Result;
use crate::models::round_cents;

/// Minimum expense transactions before trends are meaningful
const MIN_TRANSACTIONS: usize = 10;
/// Categories whose peak month is below this are skipped
const MIN_PEAK_SPENDING: f64 = 50.0;
/// Slope relative to the category average beyond which it counts as a trend
const SLOPE_FRACTION: f64 = 0.1;
/// Reported trends are capped at this many categories
const MAX_TRENDS: usize = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Increasing,
    Stable,
    Decreasing,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryTrend {
    pub category: String,
    pub current_month: f64,
    pub previous_month: f64,
    pub change_amount: f64,
    pub change_pct: f64,
    pub average: f64,
    pub trend_direction: TrendDirection,
    pub monthly_amounts: BTreeMap<String, f64>,
    pub slope: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendHighlight {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrendCounts {
    pub increasing: usize,
    pub decreasing: usize,
    pub stable: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendReport {
    pub trends: Vec<CategoryTrend>,
    pub total_categories: usize,
    pub months_analyzed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<String>,
    pub summary: TrendCounts,
    pub highlights: Vec<TrendHighlight>,
    pub total_by_month: BTreeMap<String, f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl TrendReport {
    fn empty(message: &str) -> Self {
        Self {
            trends: Vec::new(),
            total_categories: 0,
            months_analyzed: 0,
            period: None,
            summary: TrendCounts::default(),
            highlights: Vec::new(),
            total_by_month: BTreeMap::new(),
            message: Some(message.to_string()),
        }
    }
}

pub fn category_trends(
    db: &Database,
    classifier: &Classifier,
    ctx: &RunContext,
    today: NaiveDate,
    months: u32,
) -> Result<TrendReport> {
    let start = today - Duration::days(months as i64 * 31);
    let transactions = db.expenses_since(start)?;

    if transactions.len() < MIN_TRANSACTIONS {
        return Ok(TrendReport::empty("Insufficient data"));
    }

    // month -> category -> spending; BTreeMap keeps months chronological
    let mut monthly_category: BTreeMap<String, HashMap<String, f64>> = BTreeMap::new();
    for txn in &transactions {
        if !classifier.is_actual_spending(txn, &ctx.excluded_ids) {
            continue;
        }
        let category = ctx.category_name(txn.category_id);
        let month_key = txn.date.format("%Y-%m").to_string();
        *monthly_category
            .entry(month_key)
            .or_default()
            .entry(category.to_string())
            .or_default() += txn.amount.abs();
    }

    if monthly_category.len() < 2 {
        return Ok(TrendReport::empty("Need at least 2 months of data"));
    }

    let sorted_months: Vec<&String> = monthly_category.keys().collect();
    let mut all_categories: Vec<&String> = monthly_category
        .values()
        .flat_map(|m| m.keys())
        .collect::<std::collections::HashSet<_>>()
        .into_iter()
        .collect();
    all_categories.sort();

    let mut trends: Vec<CategoryTrend> = Vec::new();
    for category in all_categories {
        let amounts: Vec<f64> = sorted_months
            .iter()
            .map(|m| monthly_category[*m].get(category).copied().unwrap_or(0.0))
            .collect();

        if amounts.iter().cloned().fold(0.0, f64::max) < MIN_PEAK_SPENDING {
            continue;
        }

        let recent = *amounts.last().unwrap_or(&0.0);
        let previous = if amounts.len() >= 2 {
            amounts[amounts.len() - 2]
        } else {
            0.0
        };

        let change_pct = if previous > 0.0 {
            (recent - previous) / previous * 100.0
        } else if recent > 0.0 {
            100.0
        } else {
            0.0
        };

        let nonzero: Vec<f64> = amounts.iter().copied().filter(|a| *a > 0.0).collect();
        let average = mean(&nonzero);
        let slope = ols_slope(&amounts);

        let trend_direction = if slope > average * SLOPE_FRACTION {
            TrendDirection::Increasing
        } else if slope < -average * SLOPE_FRACTION {
            TrendDirection::Decreasing
        } else {
            TrendDirection::Stable
        };

        trends.push(CategoryTrend {
            category: category.clone(),
            current_month: round_cents(recent),
            previous_month: round_cents(previous),
            change_amount: round_cents(recent - previous),
            change_pct: round1(change_pct),
            average: round_cents(average),
            trend_direction,
            monthly_amounts: sorted_months
                .iter()
                .map(|m| {
                    (
                        (*m).clone(),
                        round_cents(monthly_category[*m].get(category).copied().unwrap_or(0.0)),
                    )
                })
                .collect(),
            slope: round_cents(slope),
        });
    }

    // Biggest movers first
    trends.sort_by(|a, b| {
        b.change_pct
            .abs()
            .partial_cmp(&a.change_pct.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut summary = TrendCounts::default();
    for t in &trends {
        match t.trend_direction {
            TrendDirection::Increasing => summary.increasing += 1,
            TrendDirection::Decreasing => summary.decreasing += 1,
            TrendDirection::Stable => summary.stable += 1,
        }
    }

    let mut highlights: Vec<TrendHighlight> = Vec::new();
    if let Some(top) = trends
        .iter()
        .find(|t| t.trend_direction == TrendDirection::Increasing)
    {
        highlights.push(TrendHighlight {
            kind: "top_increase".to_string(),
            message: format!(
                "{} up {:.0}% (${:.0} to ${:.0})",
                top.category, top.change_pct, top.previous_month, top.current_month
            ),
        });
    }
    if let Some(top) = trends
        .iter()
        .find(|t| t.trend_direction == TrendDirection::Decreasing)
    {
        highlights.push(TrendHighlight {
            kind: "top_decrease".to_string(),
            message: format!(
                "{} down {:.0}% (${:.0} to ${:.0})",
                top.category,
                top.change_pct.abs(),
                top.previous_month,
                top.current_month
            ),
        });
    }

    let total_by_month: BTreeMap<String, f64> = monthly_category
        .iter()
        .map(|(m, cats)| (m.clone(), round_cents(cats.values().sum())))
        .collect();

    if sorted_months.len() >= 2 {
        let total_recent = total_by_month[sorted_months[sorted_months.len() - 1]];
        let total_previous = total_by_month[sorted_months[sorted_months.len() - 2]];
        if total_previous > 0.0 {
            let pct = (total_recent - total_previous) / total_previous * 100.0;
            highlights.push(TrendHighlight {
                kind: "total_trend".to_string(),
                message: format!(
                    "Total spending {} {:.0}% month-over-month",
                    if pct > 0.0 { "up" } else { "down" },
                    pct.abs()
                ),
            });
        }
    }

    let total_categories = trends.len();
    trends.truncate(MAX_TRENDS);

    Ok(TrendReport {
        trends,
        total_categories,
        months_analyzed: monthly_category.len(),
        period: Some(format!(
            "{} to {}",
            sorted_months.first().map(|s| s.as_str()).unwrap_or(""),
            sorted_months.last().map(|s| s.as_str()).unwrap_or("")
        )),
        summary,
        highlights,
        total_by_month,
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
    fn test_insufficient_data() {
        let (db, classifier) = setup();
        let ctx = RunContext::load(&db, &classifier).unwrap();
        insert(&db, "2025-11-05", "GROCERY STORE", -100.0, None);

        let today = NaiveDate::from_ymd_opt(2025, 11, 30).unwrap();
        let report = category_trends(&db, &classifier, &ctx, today, 3).unwrap();
        assert!(report.trends.is_empty());
        assert_eq!(report.message.as_deref(), Some("Insufficient data"));
    }

    #[test]
    fn test_increasing_trend_detected() {
        let (db, classifier) = setup();
        let eating = db.upsert_category("Eating Out", None).unwrap();
        let ctx = RunContext::load(&db, &classifier).unwrap();

        // Ramping from 200 to 400 to 600 across three months
        for (month, total) in [("2025-09", 200.0), ("2025-10", 400.0), ("2025-11", 600.0)] {
            for day in 1..=4 {
                insert(
                    &db,
                    &format!("{}-{:02}", month, day),
                    "UBER EATS",
                    -(total / 4.0),
                    Some(eating),
                );
            }
        }

        let today = NaiveDate::from_ymd_opt(2025, 11, 30).unwrap();
        let report = category_trends(&db, &classifier, &ctx, today, 3).unwrap();

        let t = report
            .trends
            .iter()
            .find(|t| t.category == "Eating Out")
            .unwrap();
        assert_eq!(t.trend_direction, TrendDirection::Increasing);
        assert_eq!(t.current_month, 600.0);
        assert_eq!(t.previous_month, 400.0);
        assert_eq!(t.change_pct, 50.0);
        // Slope of [200, 400, 600] is exactly 200 per month
        assert_eq!(t.slope, 200.0);
        assert_eq!(report.summary.increasing, 1);
        assert!(report
            .highlights
            .iter()
            .any(|h| h.kind == "top_increase" && h.message.contains("Eating Out")));
    }

    #[test]
    fn test_small_categories_skipped() {
        let (db, classifier) = setup();
        let coffee = db.upsert_category("Coffee", None).unwrap();
        let groceries = db.upsert_category("Groceries", None).unwrap();
        let ctx = RunContext::load(&db, &classifier).unwrap();

        for month in ["2025-10", "2025-11"] {
            for day in 1..=5 {
                // Coffee peaks at 25, below the reporting floor
                insert(&db, &format!("{}-{:02}", month, day), "STARBUCKS", -5.0, Some(coffee));
                insert(&db, &format!("{}-{:02}", month, day), "HEB", -80.0, Some(groceries));
            }
        }

        let today = NaiveDate::from_ymd_opt(2025, 11, 30).unwrap();
        let report = category_trends(&db, &classifier, &ctx, today, 3).unwrap();

        assert!(report.trends.iter().all(|t| t.category != "Coffee"));
        assert!(report.trends.iter().any(|t| t.category == "Groceries"));
    }

    #[test]
    fn test_stable_trend_and_totals() {
        let (db, classifier) = setup();
        let groceries = db.upsert_category("Groceries", None).unwrap();
        let ctx = RunContext::load(&db, &classifier).unwrap();

        for month in ["2025-09", "2025-10", "2025-11"] {
            for day in 1..=5 {
                insert(&db, &format!("{}-{:02}", month, day), "HEB", -100.0, Some(groceries));
            }
        }

        let today = NaiveDate::from_ymd_opt(2025, 11, 30).unwrap();
        let report = category_trends(&db, &classifier, &ctx, today, 3).unwrap();

        let t = &report.trends[0];
        assert_eq!(t.trend_direction, TrendDirection::Stable);
        assert_eq!(t.change_pct, 0.0);
        assert_eq!(report.total_by_month["2025-10"], 500.0);
        assert_eq!(report.months_analyzed, 3);
    }

    #[test]
    fn test_new_spending_is_full_change() {
        let (db, classifier) = setup();
        let travel = db.upsert_category("Entertainment", None).unwrap();
        let groceries = db.upsert_category("Groceries", None).unwrap();
        let ctx = RunContext::load(&db, &classifier).unwrap();

        for month in ["2025-10", "2025-11"] {
            for day in 1..=5 {
                insert(&db, &format!("{}-{:02}", month, day), "HEB", -100.0, Some(groceries));
            }
        }
        // Entertainment only appears in the latest month
        insert(&db, "2025-11-20", "CONCERT TICKETS", -180.0, Some(travel));

        let today = NaiveDate::from_ymd_opt(2025, 11, 30).unwrap();
        let report = category_trends(&db, &classifier, &ctx, today, 3).unwrap();

        let t = report
            .trends
            .iter()
            .find(|t| t.category == "Entertainment")
            .unwrap();
        assert_eq!(t.previous_month, 0.0);
        assert_eq!(t.change_pct, 100.0);
    }
}
