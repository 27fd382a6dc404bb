//! Domain models for Moneta

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A spending category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    /// Display grouping (e.g. "Essentials", "Lifestyle")
    pub group: Option<String>,
}

/// A financial transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub date: NaiveDate,
    pub description: String,
    /// Positive = inflow, negative = outflow
    pub amount: f64,
    pub category_id: Option<i64>,
    /// User-marked recurring flag (web layer side channel; read-only here)
    pub is_recurring: bool,
}

/// A new transaction to be imported (before DB insertion)
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub date: NaiveDate,
    pub description: String,
    pub amount: f64,
    pub category_id: Option<i64>,
}

/// A budget header row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Budget {
    pub id: i64,
    pub name: String,
    pub is_active: bool,
}

/// One budgeted category line within a budget
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetItem {
    pub id: i64,
    pub budget_id: i64,
    pub category_id: i64,
    pub budgeted_amount: f64,
    /// Budget period as "YYYY-MM"
    pub period: String,
}

/// Semantic role of a transaction, as decided by the classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxnRole {
    /// Paycheck within tolerance of the configured base amount
    BaseIncome,
    /// Paycheck well above base (variable commission)
    CommissionIncome,
    /// Inflow that is not a recognized paycheck
    OtherIncome,
    /// Outflow to a brokerage (not spending)
    InvestmentTransfer,
    /// Internal transfer such as a credit card bill payment (not spending)
    ExcludedTransfer,
    /// Genuine spending
    Spending,
}

impl TxnRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BaseIncome => "base_income",
            Self::CommissionIncome => "commission_income",
            Self::OtherIncome => "other_income",
            Self::InvestmentTransfer => "investment_transfer",
            Self::ExcludedTransfer => "excluded_transfer",
            Self::Spending => "spending",
        }
    }

    /// True for any of the three income roles
    pub fn is_income(&self) -> bool {
        matches!(
            self,
            Self::BaseIncome | Self::CommissionIncome | Self::OtherIncome
        )
    }
}

impl std::str::FromStr for TxnRole {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "base_income" => Ok(Self::BaseIncome),
            "commission_income" => Ok(Self::CommissionIncome),
            "other_income" => Ok(Self::OtherIncome),
            "investment_transfer" => Ok(Self::InvestmentTransfer),
            "excluded_transfer" => Ok(Self::ExcludedTransfer),
            "spending" => Ok(Self::Spending),
            _ => Err(format!("Unknown transaction role: {}", s)),
        }
    }
}

impl std::fmt::Display for TxnRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Round a money amount to cents for presentation
pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}
