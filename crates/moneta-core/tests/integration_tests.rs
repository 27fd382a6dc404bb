//! Integration tests for moneta-core
//!
//! These tests exercise the full import → classify → aggregate → analytics
//! workflow against a throwaway database, with a fixed "today" so every run
//! is deterministic.

use chrono::NaiveDate;
use moneta_core::analytics::trends::TrendDirection;
use moneta_core::db::Database;
use moneta_core::import::import_reader;
use moneta_core::{
    build_month_snapshots, AnalyticsConfig, AnalyticsEngine, Categorizer, Classifier,
    NewTransaction, RunContext, TxnRole,
};

/// A Friday in mid-December 2025: the current month is 20/31 elapsed, and
/// the house-purchase life event (Oct-Dec 2025) is active.
fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 12, 20).unwrap()
}

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

/// Insert a transaction under a named category (upserted on first use)
fn insert(db: &Database, date_str: &str, description: &str, amount: f64, category: Option<&str>) {
    let category_id = category.map(|name| db.upsert_category(name, None).unwrap());
    db.insert_transaction(&NewTransaction {
        date: date(date_str),
        description: description.to_string(),
        amount,
        category_id,
    })
    .unwrap();
}

fn engine(db: &Database) -> AnalyticsEngine {
    AnalyticsEngine::new(db.clone(), AnalyticsConfig::default()).unwrap()
}

/// A typical month: two base paychecks, rent, groceries, eating out
fn seed_normal_month(db: &Database, year: i32, month: u32) {
    let d = |day: u32| format!("{:04}-{:02}-{:02}", year, month, day);
    insert(db, &d(1), "EXAFUNCT PAYROLL DIR DEP", 5500.0, Some("Income"));
    insert(db, &d(15), "EXAFUNCT PAYROLL DIR DEP", 5500.0, Some("Income"));
    insert(db, &d(2), "OAKWOOD PROPERTY MGMT RENT", -2400.0, Some("Rent"));
    insert(db, &d(8), "H-E-B #0452", -180.0, Some("Groceries"));
    insert(db, &d(12), "UBER EATS", -45.0, Some("Eating Out"));
    insert(db, &d(18), "STARBUCKS STORE 123", -6.5, Some("Coffee"));
}

// =============================================================================
// Import Workflow
// =============================================================================

#[test]
fn test_import_categorizes_and_skips_bad_rows() {
    let db = Database::in_memory().unwrap();
    let categorizer = Categorizer::new();

    let csv = "date,description,amount\n\
               2025-11-03,UBER EATS,-42.50\n\
               2025-11-05,STARBUCKS STORE 123,($6.25)\n\
               2025-11-09,ZZZ UNKNOWN MERCHANT,-10.00\n\
               not-a-date,GARBAGE,-1.00\n\
               2025-11-11,BAD AMOUNT ROW,xyz\n";

    let summary = import_reader(&db, &categorizer, csv.as_bytes()).unwrap();
    assert_eq!(summary.imported, 3);
    assert_eq!(summary.skipped, 2);
    assert_eq!(summary.categorized, 2);
    assert_eq!(db.count_transactions().unwrap(), 3);

    // Keyword rules assigned the spec'd categories at import time
    assert!(db.category_id_by_name("Eating Out").unwrap().is_some());
    assert!(db.category_id_by_name("Coffee").unwrap().is_some());
    assert!(db.category_id_by_name("Uncategorized").unwrap().is_some());

    // Parenthesized amount came through negated
    let txns = db
        .transactions_in_range(date("2025-11-05"), date("2025-11-05"))
        .unwrap();
    assert_eq!(txns.len(), 1);
    assert_eq!(txns[0].amount, -6.25);
}

// =============================================================================
// Classification
// =============================================================================

#[test]
fn test_paycheck_income_subclassification() {
    let db = Database::in_memory().unwrap();
    let classifier = Classifier::new(AnalyticsConfig::default()).unwrap();
    let ctx = RunContext::load(&db, &classifier).unwrap();

    let paycheck = |amount: f64| {
        let txn = moneta_core::Transaction {
            id: 1,
            date: date("2025-11-01"),
            description: "EXAFUNCT PAYROLL DIR DEP".to_string(),
            amount,
            category_id: None,
            is_recurring: false,
        };
        classifier.classify(&txn, "Income", &ctx.excluded_ids).role
    };

    // Within 20% of the $5,500 base
    assert_eq!(paycheck(5500.0), TxnRole::BaseIncome);
    // More than 2x base is commission
    assert_eq!(paycheck(15000.0), TxnRole::CommissionIncome);
    // Small paycheck falls back to the conservative base default
    assert_eq!(paycheck(600.0), TxnRole::BaseIncome);
}

#[test]
fn test_transfers_excluded_from_spending() {
    let db = Database::in_memory().unwrap();
    let classifier = Classifier::new(AnalyticsConfig::default()).unwrap();

    insert(&db, "2025-11-04", "UBER EATS", -100.0, Some("Eating Out"));
    insert(
        &db,
        "2025-11-10",
        "PAYMENT - THANK YOU",
        -850.0,
        Some("Credit Card Payment"),
    );
    // Round $500 multiple to an ambiguous brokerage description
    insert(&db, "2025-11-15", "ROBINHOOD DES:FUNDS", -1000.0, None);

    let ctx = RunContext::load(&db, &classifier).unwrap();
    let snapshots = build_month_snapshots(&db, &classifier, &ctx, today(), 4).unwrap();

    assert_eq!(snapshots.len(), 1);
    let nov = &snapshots[0];
    assert_eq!(nov.month, "2025-11");
    // Only the Uber Eats debit is real spending; the CC payment and the
    // investment transfer are excluded (no double counting)
    assert_eq!(nov.recurring_expenses, 100.0);
    assert_eq!(nov.total_expenses, 100.0);
    assert_eq!(nov.investments, 1000.0);
    assert_eq!(nov.category_spending.get("Eating Out"), Some(&100.0));
    assert!(!nov.category_spending.contains_key("Credit Card Payment"));
}

#[test]
fn test_house_event_spending_is_one_time_and_tagged() {
    let db = Database::in_memory().unwrap();
    let classifier = Classifier::new(AnalyticsConfig::default()).unwrap();

    // October 2025 is the first month of the house-purchase window
    insert(
        &db,
        "2025-10-12",
        "ROOM & BOARD FURNITURE",
        -5000.0,
        Some("Furniture"),
    );

    let ctx = RunContext::load(&db, &classifier).unwrap();
    let snapshots = build_month_snapshots(&db, &classifier, &ctx, today(), 4).unwrap();
    let oct = snapshots.iter().find(|s| s.month == "2025-10").unwrap();

    assert!(oct.in_house_event);
    assert_eq!(oct.one_time_expenses, 5000.0);
    assert_eq!(oct.house_related, 5000.0);
    assert_eq!(oct.recurring_expenses, 0.0);

    // The classification itself carries the event description
    let txns = db
        .transactions_in_range(date("2025-10-01"), date("2025-10-31"))
        .unwrap();
    let classification = classifier.classify(&txns[0], "Furniture", &ctx.excluded_ids);
    assert_eq!(classification.role, TxnRole::Spending);
    assert_eq!(classification.life_event.as_deref(), Some("House purchase"));
}

// =============================================================================
// Aggregation
// =============================================================================

#[test]
fn test_partial_month_projection_round_trip() {
    let db = Database::in_memory().unwrap();
    let classifier = Classifier::new(AnalyticsConfig::default()).unwrap();

    insert(&db, "2025-12-05", "UBER EATS", -100.0, Some("Eating Out"));
    insert(&db, "2025-12-10", "H-E-B #0452", -80.0, Some("Groceries"));

    let ctx = RunContext::load(&db, &classifier).unwrap();
    let snapshots = build_month_snapshots(&db, &classifier, &ctx, today(), 1).unwrap();

    assert_eq!(snapshots.len(), 1);
    let dec = &snapshots[0];
    let completeness = 20.0 / 31.0;
    assert!((dec.completeness - completeness).abs() < 1e-9);

    // Every aggregate was scaled to a full-month equivalent: raw amounts are
    // recoverable as projected * completeness
    assert!((dec.recurring_expenses * completeness - 180.0).abs() < 1e-6);
    assert!(
        (dec.category_spending["Eating Out"] * completeness - 100.0).abs() < 1e-6
    );
    assert!((dec.total_expenses - dec.recurring_expenses - dec.one_time_expenses).abs() < 1e-9);
}

#[test]
fn test_barely_started_current_month_dropped() {
    let db = Database::in_memory().unwrap();
    let classifier = Classifier::new(AnalyticsConfig::default()).unwrap();

    insert(&db, "2025-12-02", "UBER EATS", -50.0, Some("Eating Out"));
    insert(&db, "2025-11-10", "UBER EATS", -60.0, Some("Eating Out"));

    // Dec 5: completeness 5/31 ≈ 0.16, below the 0.3 floor
    let early = NaiveDate::from_ymd_opt(2025, 12, 5).unwrap();
    let ctx = RunContext::load(&db, &classifier).unwrap();
    let snapshots = build_month_snapshots(&db, &classifier, &ctx, early, 4).unwrap();

    // Current month dropped; the past month survives untouched
    assert_eq!(snapshots.len(), 1);
    assert_eq!(snapshots[0].month, "2025-11");
    assert_eq!(snapshots[0].completeness, 1.0);
}

// =============================================================================
// Financial Health
// =============================================================================

#[test]
fn test_health_insufficient_with_one_month() {
    let db = Database::in_memory().unwrap();
    seed_normal_month(&db, 2025, 11);

    let report = engine(&db).financial_health(today()).unwrap();
    assert_eq!(report.score, 0.0);
    assert_eq!(report.grade, "N/A");
    assert_eq!(report.data_quality, "insufficient");
    assert!(report.factors.is_none());
}

#[test]
fn test_health_score_bounded_and_idempotent() {
    let db = Database::in_memory().unwrap();
    for month in [9, 10, 11, 12] {
        seed_normal_month(&db, 2025, month);
    }

    let eng = engine(&db);
    let report = eng.financial_health(today()).unwrap();

    assert!(report.score > 0.0 && report.score <= 100.0);
    assert_ne!(report.grade, "N/A");
    assert_eq!(report.months_analyzed, 4);

    let factors = report.factors.as_ref().unwrap();
    for factor in [
        &factors.savings_rate,
        &factors.base_coverage,
        &factors.budget_adherence,
        &factors.commission_utilization,
        &factors.spending_consistency,
    ] {
        assert!(factor.score >= 0.0 && factor.score <= 100.0);
    }
    // No active budget: adherence falls back to the neutral 70
    assert_eq!(factors.budget_adherence.score, 70.0);
    assert!(report.recommendations.len() <= 6);

    // Same call against unchanged store state is byte-identical
    let again = eng.financial_health(today()).unwrap();
    assert_eq!(
        serde_json::to_string(&report).unwrap(),
        serde_json::to_string(&again).unwrap()
    );
}

#[test]
fn test_health_commission_utilization() {
    let db = Database::in_memory().unwrap();
    for month in [9, 10, 11] {
        seed_normal_month(&db, 2025, month);
    }
    // A commission month that invests half of the commission
    insert(&db, "2025-11-20", "EXAFUNCT PAYROLL DIR DEP", 16000.0, Some("Income"));
    insert(&db, "2025-11-21", "FIDELITY FID BKG SVC", -8000.0, Some("Investments"));

    let report = engine(&db).financial_health(today()).unwrap();
    let factors = report.factors.unwrap();

    // 50 + 50 * invested/commission = 75
    assert_eq!(factors.commission_utilization.score, 75.0);
}

// =============================================================================
// Anomalies
// =============================================================================

#[test]
fn test_anomaly_minimum_is_ten_transactions() {
    let db = Database::in_memory().unwrap();
    for day in 1..=9 {
        insert(
            &db,
            &format!("2025-12-{:02}", day),
            "UBER EATS",
            -40.0,
            Some("Eating Out"),
        );
    }

    let report = engine(&db).spending_anomalies(today(), 90).unwrap();
    assert!(report.anomalies.is_empty());
    assert_eq!(report.message.as_deref(), Some("Insufficient data"));
}

#[test]
fn test_anomaly_flags_large_transaction_once() {
    let db = Database::in_memory().unwrap();
    for day in 1..=11 {
        insert(
            &db,
            &format!("2025-12-{:02}", day),
            "UBER EATS",
            -40.0,
            Some("Eating Out"),
        );
    }
    insert(&db, "2025-12-12", "PELOTON", -2000.0, Some("Shopping"));

    let report = engine(&db).spending_anomalies(today(), 90).unwrap();
    assert!(report.message.is_none());

    let flagged: Vec<_> = report
        .anomalies
        .iter()
        .filter(|a| a.description == "PELOTON")
        .collect();
    assert_eq!(flagged.len(), 1);
    assert_eq!(flagged[0].amount, 2000.0);
}

#[test]
fn test_anomaly_house_spending_is_low_severity() {
    let db = Database::in_memory().unwrap();
    for day in 1..=10 {
        insert(
            &db,
            &format!("2025-12-{:02}", day),
            "UBER EATS",
            -40.0,
            Some("Eating Out"),
        );
    }
    // In the house-event window and over the $500 floor
    insert(&db, "2025-12-11", "WEST ELM", -1200.0, Some("Furniture"));

    let report = engine(&db).spending_anomalies(today(), 90).unwrap();
    let house = report
        .anomalies
        .iter()
        .find(|a| a.description == "WEST ELM")
        .unwrap();
    assert_eq!(house.category, "Furniture");
    assert!(house.context.is_some());
}

// =============================================================================
// Prediction
// =============================================================================

#[test]
fn test_prediction_requires_history() {
    let db = Database::in_memory().unwrap();
    seed_normal_month(&db, 2025, 11);

    let report = engine(&db).predict_spending(today(), 3).unwrap();
    assert!(report.predictions.is_empty());
    assert!(report.message.is_some());
}

#[test]
fn test_prediction_is_stationary_with_floored_interval() {
    let db = Database::in_memory().unwrap();
    for month in [7, 8, 9, 10, 11] {
        seed_normal_month(&db, 2025, month);
    }

    let report = engine(&db).predict_spending(today(), 3).unwrap();
    assert!(report.message.is_none());
    assert_eq!(report.predictions.len(), 3);

    let first = &report.predictions[0];
    for p in &report.predictions {
        // Stationary model: every forward month carries the same forecast
        assert_eq!(p.predicted_recurring, first.predicted_recurring);
        assert_eq!(p.confidence_level, 90);
        assert!(p.confidence_interval.lower >= 0.0);
        assert!(p.confidence_interval.upper >= p.predicted_recurring);
    }
}

// =============================================================================
// Budget Analysis
// =============================================================================

#[test]
fn test_budget_analysis_without_budget() {
    let db = Database::in_memory().unwrap();
    seed_normal_month(&db, 2025, 12);

    let report = engine(&db).budget_analysis(today()).unwrap();
    assert!(!report.has_budget);
    assert!(report.message.is_some());
    assert!(report.categories.is_empty());
}

#[test]
fn test_budget_analysis_projects_current_month() {
    let db = Database::in_memory().unwrap();
    let eating_out = db.upsert_category("Eating Out", None).unwrap();
    let groceries = db.upsert_category("Groceries", None).unwrap();

    let budget_id = db.create_budget("Monthly", true).unwrap();
    db.add_budget_item(budget_id, eating_out, 100.0, "2025-12")
        .unwrap();
    db.add_budget_item(budget_id, groceries, 800.0, "2025-12")
        .unwrap();

    // $100 spent by day 20 projects to $155 against a $100 budget
    insert(&db, "2025-12-04", "UBER EATS", -60.0, Some("Eating Out"));
    insert(&db, "2025-12-10", "CHIPOTLE", -40.0, Some("Eating Out"));
    insert(&db, "2025-12-08", "H-E-B #0452", -200.0, Some("Groceries"));

    let report = engine(&db).budget_analysis(today()).unwrap();
    assert!(report.has_budget);
    assert_eq!(report.days_passed, 20);
    assert_eq!(report.days_in_month, 31);

    // Worst overrun sorts first
    assert_eq!(report.categories[0].category, "Eating Out");
    assert_eq!(report.categories[0].actual, 100.0);
    assert_eq!(report.categories[0].projected, 155.0);

    let groceries_row = report
        .categories
        .iter()
        .find(|c| c.category == "Groceries")
        .unwrap();
    // $200/20 days projects to $310 against $800: well under budget
    assert_eq!(groceries_row.projected, 310.0);
}

// =============================================================================
// Trends and Insights
// =============================================================================

#[test]
fn test_category_trends_detects_increase() {
    let db = Database::in_memory().unwrap();
    // Eating Out doubles month over month; Coffee stays flat
    for (month, eats) in [(9, 100.0), (10, 200.0), (11, 400.0)] {
        let d = |day: u32| format!("2025-{:02}-{:02}", month, day);
        for day in [3, 9, 15, 21] {
            insert(&db, &d(day), "UBER EATS", -eats / 4.0, Some("Eating Out"));
        }
        insert(&db, &d(5), "STARBUCKS STORE 123", -60.0, Some("Coffee"));
    }

    let report = engine(&db)
        .category_trends(NaiveDate::from_ymd_opt(2025, 12, 1).unwrap(), 3)
        .unwrap();
    assert!(report.message.is_none());

    let eats = report
        .trends
        .iter()
        .find(|t| t.category == "Eating Out")
        .unwrap();
    assert_eq!(eats.trend_direction, TrendDirection::Increasing);
    assert!(eats.change_pct > 0.0);
    assert!(report.summary.increasing >= 1);
}

#[test]
fn test_insights_generated_and_capped() {
    let db = Database::in_memory().unwrap();
    for month in [10, 11, 12] {
        seed_normal_month(&db, 2025, month);
    }
    insert(&db, "2025-12-02", "WEST ELM", -3000.0, Some("Furniture"));

    let report = engine(&db).spending_insights(today()).unwrap();
    assert!(!report.insights.is_empty());
    assert!(report.insights.len() <= 8);

    // Sorted by priority rank, never ascending in urgency
    let ranks: Vec<u8> = report.insights.iter().map(|i| i.priority.rank()).collect();
    let mut sorted = ranks.clone();
    sorted.sort();
    assert_eq!(ranks, sorted);
}
