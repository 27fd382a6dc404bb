//! Monthly aggregation of classified transactions
//!
//! Turns a month's transactions into a [`MonthSnapshot`]: income split into
//! base/commission/other, spending split into recurring vs one-time,
//! investment and life-event totals, and a completeness fraction used to
//! project partial months to full-month equivalents.

use std::collections::{HashMap, HashSet};

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::classify::Classifier;
use crate::db::Database;
use crate::error::Result;
use crate::models::TxnRole;

/// The current month is dropped from multi-month analyses below this
/// completeness (too little data to project reliably). Past months are never
/// dropped this way.
pub const MIN_CURRENT_MONTH_COMPLETENESS: f64 = 0.3;

/// Reference data resolved once per analytics run
pub struct RunContext {
    /// Category IDs excluded from spending (the canonical exclusion check)
    pub excluded_ids: HashSet<i64>,
    pub category_names: HashMap<i64, String>,
}

impl RunContext {
    pub fn load(db: &Database, classifier: &Classifier) -> Result<Self> {
        Ok(Self {
            excluded_ids: db.excluded_category_ids(&classifier.config().excluded_categories)?,
            category_names: db.category_names_by_id()?,
        })
    }

    pub fn category_name(&self, category_id: Option<i64>) -> &str {
        category_id
            .and_then(|id| self.category_names.get(&id))
            .map(|s| s.as_str())
            .unwrap_or("Uncategorized")
    }
}

/// One calendar month of classified totals (in-memory only, never persisted)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthSnapshot {
    /// "YYYY-MM"
    pub month: String,
    pub base_income: f64,
    pub commission_income: f64,
    pub other_income: f64,
    pub total_income: f64,
    pub recurring_expenses: f64,
    pub one_time_expenses: f64,
    pub total_expenses: f64,
    pub investments: f64,
    /// Spending tagged with a life-event context
    pub house_related: f64,
    pub category_spending: HashMap<String, f64>,
    /// Fraction of the month elapsed; 1.0 for fully past months
    pub completeness: f64,
    pub in_house_event: bool,
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    next.expect("valid month")
        .signed_duration_since(NaiveDate::from_ymd_opt(year, month, 1).expect("valid month"))
        .num_days() as u32
}

/// First day of the month `back` months before the month containing `today`
fn month_start_back(today: NaiveDate, back: u32) -> NaiveDate {
    let total = today.year() * 12 + today.month0() as i32 - back as i32;
    let year = total.div_euclid(12);
    let month = total.rem_euclid(12) as u32 + 1;
    NaiveDate::from_ymd_opt(year, month, 1).expect("valid month arithmetic")
}

/// Build snapshots for the trailing `months` calendar months (current month
/// first element index may be dropped per the completeness rule), ordered
/// most-recent first. Months without transactions are skipped entirely.
pub fn build_month_snapshots(
    db: &Database,
    classifier: &Classifier,
    ctx: &RunContext,
    today: NaiveDate,
    months: u32,
) -> Result<Vec<MonthSnapshot>> {
    let mut snapshots = Vec::new();

    for back in 0..months {
        let month_start = month_start_back(today, back);
        let dim = days_in_month(month_start.year(), month_start.month());

        let (month_end, completeness) = if back == 0 {
            (today, today.day() as f64 / dim as f64)
        } else {
            (
                NaiveDate::from_ymd_opt(month_start.year(), month_start.month(), dim)
                    .expect("valid month end"),
                1.0,
            )
        };

        let transactions = db.transactions_in_range(month_start, month_end)?;
        if transactions.is_empty() {
            continue;
        }

        // Current month with too little elapsed data is unusable
        if back == 0 && completeness <= MIN_CURRENT_MONTH_COMPLETENESS {
            continue;
        }

        let mut snapshot = MonthSnapshot {
            month: month_start.format("%Y-%m").to_string(),
            base_income: 0.0,
            commission_income: 0.0,
            other_income: 0.0,
            total_income: 0.0,
            recurring_expenses: 0.0,
            one_time_expenses: 0.0,
            total_expenses: 0.0,
            investments: 0.0,
            house_related: 0.0,
            category_spending: HashMap::new(),
            completeness,
            in_house_event: classifier
                .config()
                .life_events
                .iter()
                .any(|e| e.contains(month_start)),
        };

        for txn in &transactions {
            let category_name = ctx.category_name(txn.category_id);
            let classification = classifier.classify(txn, category_name, &ctx.excluded_ids);
            let amt = txn.amount.abs();

            match classification.role {
                TxnRole::BaseIncome => snapshot.base_income += txn.amount,
                TxnRole::CommissionIncome => snapshot.commission_income += txn.amount,
                TxnRole::OtherIncome => snapshot.other_income += txn.amount,
                TxnRole::InvestmentTransfer => snapshot.investments += amt,
                TxnRole::ExcludedTransfer => {}
                TxnRole::Spending => {
                    *snapshot
                        .category_spending
                        .entry(category_name.to_string())
                        .or_default() += amt;

                    if classification.life_event.is_some() {
                        snapshot.house_related += amt;
                    }
                    if classifier.config().is_one_time_category(category_name) {
                        snapshot.one_time_expenses += amt;
                    } else {
                        snapshot.recurring_expenses += amt;
                    }
                }
            }
        }

        snapshot.total_income =
            snapshot.base_income + snapshot.commission_income + snapshot.other_income;

        // Project partial months to full-month equivalents
        if completeness < 1.0 && completeness > MIN_CURRENT_MONTH_COMPLETENESS {
            snapshot.base_income /= completeness;
            snapshot.commission_income /= completeness;
            snapshot.other_income /= completeness;
            snapshot.total_income /= completeness;
            snapshot.recurring_expenses /= completeness;
            snapshot.one_time_expenses /= completeness;
            snapshot.investments /= completeness;
            snapshot.house_related /= completeness;
            for amount in snapshot.category_spending.values_mut() {
                *amount /= completeness;
            }
        }

        snapshot.total_expenses = snapshot.recurring_expenses + snapshot.one_time_expenses;
        snapshots.push(snapshot);
    }

    Ok(snapshots)
}
