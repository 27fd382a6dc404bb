//! Static configuration for the classifier and analytics engine
//!
//! The thresholds here are tuned for one household's data (base salary of
//! $5,500 per paycheck plus variable commission, house purchased Oct 2025).
//! They are plain data with `Default` impls so a caller can override any of
//! them at construction time instead of editing literals in the code.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Income structure for the tracked household
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomeConfig {
    /// Lower-cased substring that identifies the employer in descriptions
    pub employer_keyword: String,
    /// Expected base salary per paycheck
    pub base_per_paycheck: f64,
    pub paychecks_per_month: u32,
    /// Expected base salary per month (used as a coverage fallback)
    pub expected_base_monthly: f64,
    /// A paycheck within this relative tolerance of base is base salary
    pub base_tolerance: f64,
    /// A paycheck above base * this multiple is commission
    pub commission_multiple: f64,
}

impl Default for IncomeConfig {
    fn default() -> Self {
        Self {
            employer_keyword: "exafunct".to_string(),
            base_per_paycheck: 5500.0,
            paychecks_per_month: 2,
            expected_base_monthly: 11000.0,
            base_tolerance: 0.20,
            commission_multiple: 2.0,
        }
    }
}

/// A calendar window during which spending in certain categories is expected
/// to spike and is excluded from normal baselines
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifeEvent {
    /// Short description shown in analytics output (e.g. "House purchase")
    pub description: String,
    pub start: NaiveDate,
    pub impact_months: u32,
    pub categories_affected: Vec<String>,
}

impl LifeEvent {
    /// First day after the impact window
    pub fn impact_end(&self) -> NaiveDate {
        let total = self.start.month0() + self.impact_months;
        let year = self.start.year() + (total / 12) as i32;
        let month = total % 12 + 1;
        NaiveDate::from_ymd_opt(year, month, 1).expect("valid month arithmetic")
    }

    /// Whether the given date falls inside the impact window
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date < self.impact_end()
    }
}

/// Full analytics configuration: income, exclusion lists, life events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    pub income: IncomeConfig,
    /// Category names whose transactions are never counted as spending
    pub excluded_categories: Vec<String>,
    /// Category names treated as lump one-time costs rather than recurring
    pub one_time_categories: Vec<String>,
    /// Ordered: the first matching event wins when windows overlap
    pub life_events: Vec<LifeEvent>,
    /// Minimum round-lot size for the ambiguous-brokerage heuristic
    pub investment_round_lot: f64,
    /// Any transfer at or above this is treated as an investment outright
    pub investment_large_min: f64,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            income: IncomeConfig::default(),
            excluded_categories: [
                "Credit Card Payment",
                "Robinhood CC",
                "Chase CC",
                "Tally",
                "Transfer",
                "Wire Transfer",
                "Investments",
                "Savings",
                "PayPal",
                "Venmo",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            one_time_categories: ["Furniture", "Home", "Vacation", "Travel"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            life_events: vec![LifeEvent {
                description: "House purchase".to_string(),
                start: NaiveDate::from_ymd_opt(2025, 10, 1).expect("valid date"),
                impact_months: 3,
                categories_affected: [
                    "Mortgage",
                    "Furniture",
                    "Home",
                    "Utilities",
                    "Natural Gas",
                ]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            }],
            investment_round_lot: 500.0,
            investment_large_min: 5000.0,
        }
    }
}

impl AnalyticsConfig {
    pub fn is_one_time_category(&self, category_name: &str) -> bool {
        self.one_time_categories.iter().any(|c| c == category_name)
    }

    /// First life event whose window and affected categories match, if any
    pub fn life_event_context(&self, date: NaiveDate, category_name: &str) -> Option<&LifeEvent> {
        self.life_events
            .iter()
            .find(|e| e.contains(date) && e.categories_affected.iter().any(|c| c == category_name))
    }
}
