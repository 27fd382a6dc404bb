//! Transaction semantic classification
//!
//! Decides what a raw transaction *is*: a paycheck (base or commission),
//! other income, a brokerage transfer, an internal credit-card payment that
//! must be excluded from both income and spending, or genuine spending.
//! Keeping CC payments out of the spending totals is what prevents
//! double-counting when a card bill is paid from the tracked checking
//! account.

use std::collections::HashSet;

use regex::Regex;

use crate::config::AnalyticsConfig;
use crate::error::Result;
use crate::models::{Transaction, TxnRole};

const CC_PAYMENT_PATTERNS: &[&str] = &[
    r"payment.*thank you",
    r"robinhood card.*payment",
    r"chase credit crd",
    r"discover.*e-payment",
];

const INVESTMENT_PATTERNS: &[&str] = &[
    r"robinhood des:funds",
    r"fid bkg svc",
    r"vanguard",
    r"schwab",
];

/// A classified transaction: its role plus any life-event context
#[derive(Debug, Clone)]
pub struct Classification {
    pub role: TxnRole,
    /// Description of the matching life event, for spending during an
    /// event window in an affected category
    pub life_event: Option<String>,
}

/// Stateless classifier built from compiled patterns and the analytics config
pub struct Classifier {
    config: AnalyticsConfig,
    cc_payment_patterns: Vec<Regex>,
    investment_patterns: Vec<Regex>,
}

impl Classifier {
    pub fn new(config: AnalyticsConfig) -> Result<Self> {
        let cc_payment_patterns = CC_PAYMENT_PATTERNS
            .iter()
            .map(|p| Regex::new(p))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let investment_patterns = INVESTMENT_PATTERNS
            .iter()
            .map(|p| Regex::new(p))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Self {
            config,
            cc_payment_patterns,
            investment_patterns,
        })
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    /// Whether the description is a credit card bill payment
    pub fn is_cc_payment(&self, description: &str) -> bool {
        let desc_lower = description.to_lowercase();
        self.cc_payment_patterns
            .iter()
            .any(|p| p.is_match(&desc_lower))
    }

    /// Whether the transaction moves money to a brokerage.
    ///
    /// Besides the known brokerage patterns there is a special case for
    /// ambiguous "robinhood" wording without "card": round-number transfers
    /// (multiples of the round lot at or above it) and anything at or above
    /// the large-transfer floor are investments; card payments are not.
    pub fn is_investment_transfer(&self, txn: &Transaction) -> bool {
        let desc_lower = txn.description.to_lowercase();
        if self.investment_patterns.iter().any(|p| p.is_match(&desc_lower)) {
            return true;
        }

        if desc_lower.contains("robinhood") && !desc_lower.contains("card") {
            let amt = txn.amount.abs();
            let lot = self.config.investment_round_lot;
            if amt >= lot && (amt % lot).abs() < f64::EPSILON {
                return true;
            }
            if amt >= self.config.investment_large_min {
                return true;
            }
        }
        false
    }

    /// Whether the transaction is a paycheck from the configured employer
    pub fn is_paycheck(&self, txn: &Transaction) -> bool {
        if txn.amount <= 0.0 {
            return false;
        }
        txn.description
            .to_lowercase()
            .contains(&self.config.income.employer_keyword)
    }

    /// Base vs commission for a paycheck amount.
    ///
    /// Within tolerance of base is base; above the commission multiple is
    /// commission; anything else defaults to base (conservative, avoids
    /// over-counting variable commission).
    pub fn classify_income(&self, amount: f64) -> TxnRole {
        let base = self.config.income.base_per_paycheck;
        if ((amount - base) / base).abs() < self.config.income.base_tolerance {
            TxnRole::BaseIncome
        } else if amount > base * self.config.income.commission_multiple {
            TxnRole::CommissionIncome
        } else {
            TxnRole::BaseIncome
        }
    }

    /// Whether a transaction counts as real spending: not in an excluded
    /// category, not a CC payment, not an investment transfer
    pub fn is_actual_spending(&self, txn: &Transaction, excluded_ids: &HashSet<i64>) -> bool {
        if let Some(category_id) = txn.category_id {
            if excluded_ids.contains(&category_id) {
                return false;
            }
        }
        if self.is_cc_payment(&txn.description) {
            return false;
        }
        if self.is_investment_transfer(txn) {
            return false;
        }
        true
    }

    /// Full classification of a transaction given its resolved category name
    pub fn classify(
        &self,
        txn: &Transaction,
        category_name: &str,
        excluded_ids: &HashSet<i64>,
    ) -> Classification {
        let life_event = self
            .config
            .life_event_context(txn.date, category_name)
            .map(|e| e.description.clone());

        let role = if txn.amount > 0.0 {
            if self.is_paycheck(txn) {
                self.classify_income(txn.amount)
            } else {
                TxnRole::OtherIncome
            }
        } else if self.is_investment_transfer(txn) {
            TxnRole::InvestmentTransfer
        } else if self.is_actual_spending(txn, excluded_ids) {
            TxnRole::Spending
        } else {
            TxnRole::ExcludedTransfer
        };

        Classification { role, life_event }
    }
}
