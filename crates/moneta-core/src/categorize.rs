//! Transaction description categorization
//!
//! Two layers: an ordered keyword rule table (first match wins, so earlier
//! categories shadow later ones on overlapping keywords), and a statistical
//! fallback model trained on accumulated user corrections. The fallback is
//! behind the narrow [`FallbackModel`] trait so the categorization logic does
//! not depend on any particular modeling approach.
//!
//! The shipped fallback is a multinomial naive Bayes over word tokens,
//! persisted as a JSON artifact. A torn or unreadable artifact loads as
//! "untrained" rather than an error; concurrent retrains are last-writer-wins
//! on the artifact.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::db::Database;
use crate::error::Result;

/// Category assigned when neither rules nor the model produce a label
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Confidence reported for rule hits
const RULE_CONFIDENCE: f64 = 0.9;
/// Confidence reported when the fallback has no trained model
const UNTRAINED_CONFIDENCE: f64 = 0.7;

/// Minimum correction samples before any model can be trained
pub const MIN_TRAIN_SAMPLES: usize = 10;
/// Retrain whenever the accumulated sample count crosses a multiple of this
pub const RETRAIN_INTERVAL: i64 = 50;

/// Narrow interface for the statistical fallback
pub trait FallbackModel: Send {
    /// Train on the full accumulated sample set. Returns false when there are
    /// too few samples to produce a model.
    fn train(&mut self, samples: &[(String, String)]) -> Result<bool>;

    /// Top prediction with its class probability, if a model is trained
    fn predict(&self, text: &str) -> Option<(String, f64)>;

    fn is_trained(&self) -> bool;

    /// Persist the model artifact. No-op by default; a custom model owns its
    /// own persistence.
    fn save(&self, _path: &Path) -> Result<()> {
        Ok(())
    }
}

/// The default keyword rule table, in shadowing order.
///
/// Order is significant: specific categories (Coffee, Uber/Lyft) must come
/// before broad ones (Shopping) that share keywords.
pub fn default_rules() -> Vec<(String, Vec<String>)> {
    let table: &[(&str, &[&str])] = &[
        (
            "Income",
            &[
                "dir dep", "direct dep", "payroll", "salary", "paycheck", "ach credit", "deposit",
            ],
        ),
        (
            "Coffee",
            &[
                "starbucks",
                "coffee",
                "dunkin",
                "peets",
                "blue bottle",
                "la colombe",
                "houndstooth",
            ],
        ),
        (
            "Groceries",
            &[
                "h-e-b",
                "heb",
                "whole foods",
                "trader joe",
                "grocery",
                "central market",
                "kroger",
                "safeway",
                "publix",
                "costco",
            ],
        ),
        (
            "Eating Out",
            &[
                "doordash", "uber eats", "grubhub", "postmates", "tst*", "sq *", "restaurant",
                "cafe", "diner", "grill", "kitchen", "taco", "pizza", "burger", "sushi", "thai",
                "chinese", "mexican", "chipotle", "panera",
            ],
        ),
        ("Uber/Lyft", &["uber *trip", "uber trip", "lyft", "lime*ride"]),
        (
            "Subscriptions",
            &[
                "netflix",
                "spotify",
                "hulu",
                "amazon prime",
                "apple.com/bill",
                "disney+",
                "hbo",
                "youtube premium",
                "microsoft*ultimate",
                "subscription",
            ],
        ),
        (
            "Utilities",
            &[
                "city of austin",
                "electric",
                "water bill",
                "utility",
                "comcast",
                "spectrum",
                "xfinity",
                "one gas",
                "atmos",
            ],
        ),
        ("Rent", &["rent", "apartment", "lease", "property mgmt"]),
        (
            "Investments",
            &[
                "fid bkg svc",
                "moneyline",
                "fidelity",
                "vanguard",
                "schwab",
                "acorns",
                "etrade",
                "td ameritrade",
            ],
        ),
        (
            "Credit Card Payment",
            &[
                "chase credit crd",
                "discover",
                "capital one",
                "amex",
                "credit card payment",
                "cc payment",
            ],
        ),
        ("Venmo", &["venmo"]),
        ("PayPal", &["paypal"]),
        (
            "Shopping",
            &[
                "amazon", "target", "walmart", "best buy", "home depot", "lowes", "ikea", "amz*",
            ],
        ),
        (
            "Gas",
            &[
                "shell",
                "chevron",
                "exxon",
                "gas station",
                "fuel",
                "bp ",
                "mobil",
                "valero",
            ],
        ),
        ("Tolls", &["hctra", "ez tag", "toll"]),
        (
            "Healthcare",
            &[
                "pharmacy", "cvs", "walgreens", "doctor", "medical", "hospital", "clinic",
                "dental",
            ],
        ),
        (
            "Entertainment",
            &[
                "movie",
                "theater",
                "concert",
                "ticket",
                "amc",
                "nintendo",
                "playstation",
                "xbox",
                "steam",
            ],
        ),
        ("Transfer", &["transfer", "zelle"]),
        ("Wire Transfer", &["wire type:", "wire transfer"]),
        ("ATM", &["atm", "withdrwl", "withdrawal", "bkofamerica atm"]),
        ("Robinhood CC", &["robinhood card des:payment"]),
        ("Chase CC", &["chase credit crd"]),
        ("Loan Payment", &["upgrade, inc", "sst ", "loan pmt", "tally"]),
        ("Mortgage", &["truist mortg", "mortgage", "mtgpmt"]),
        (
            "Phone/Internet",
            &["att des:payment", "at&t", "t-mobile", "sprint", "comcast"],
        ),
        ("Natural Gas", &["one gas", "atmos energy", "centerpoint"]),
        (
            "Alcohol",
            &["little woodrow", "bar", "pub", "liquor", "beer", "wine"],
        ),
        ("Gym", &["ymca", "gym", "fitness", "planet fitness", "equinox"]),
        (
            "Travel",
            &[
                "airline",
                "southwest",
                "delta",
                "united",
                "american air",
                "hotel",
                "airbnb",
                "marriott",
                "hilton",
            ],
        ),
    ];

    table
        .iter()
        .map(|(name, keywords)| {
            (
                name.to_string(),
                keywords.iter().map(|k| k.to_string()).collect(),
            )
        })
        .collect()
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() >= 2)
        .map(|t| t.to_string())
        .collect()
}

/// Multinomial naive Bayes over description word tokens
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct BayesModel {
    /// Documents seen per class
    class_counts: HashMap<String, u64>,
    /// Token occurrence counts per class
    token_counts: HashMap<String, HashMap<String, u64>>,
    vocab_size: u64,
    total_docs: u64,
}

impl BayesModel {
    const ALPHA: f64 = 1.0;

    pub fn new() -> Self {
        Self::default()
    }

    /// Load a persisted model, treating any read/parse failure as untrained
    /// (a torn artifact from a racing retrain is not a fatal condition)
    pub fn load(path: &Path) -> Self {
        match std::fs::read(path) {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(model) => model,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Unreadable model artifact, starting untrained");
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    fn class_scores(&self, tokens: &[String]) -> Vec<(String, f64)> {
        let mut scores = Vec::with_capacity(self.class_counts.len());
        for (class, doc_count) in &self.class_counts {
            let prior = (*doc_count as f64 / self.total_docs as f64).ln();
            let counts = &self.token_counts[class];
            let class_total: u64 = counts.values().sum();
            let denom = class_total as f64 + Self::ALPHA * self.vocab_size as f64;

            let mut log_prob = prior;
            for token in tokens {
                let count = counts.get(token).copied().unwrap_or(0);
                log_prob += ((count as f64 + Self::ALPHA) / denom).ln();
            }
            scores.push((class.clone(), log_prob));
        }
        scores
    }
}

impl FallbackModel for BayesModel {
    fn train(&mut self, samples: &[(String, String)]) -> Result<bool> {
        if samples.len() < MIN_TRAIN_SAMPLES {
            debug!(samples = samples.len(), "Too few samples to train model");
            return Ok(false);
        }

        let mut class_counts: HashMap<String, u64> = HashMap::new();
        let mut token_counts: HashMap<String, HashMap<String, u64>> = HashMap::new();
        let mut vocab: std::collections::HashSet<String> = std::collections::HashSet::new();

        for (description, category) in samples {
            *class_counts.entry(category.clone()).or_default() += 1;
            let counts = token_counts.entry(category.clone()).or_default();
            for token in tokenize(description) {
                vocab.insert(token.clone());
                *counts.entry(token).or_default() += 1;
            }
        }

        self.total_docs = samples.len() as u64;
        self.vocab_size = vocab.len() as u64;
        self.class_counts = class_counts;
        self.token_counts = token_counts;
        Ok(true)
    }

    fn predict(&self, text: &str) -> Option<(String, f64)> {
        if !self.is_trained() {
            return None;
        }

        let tokens = tokenize(text);
        if tokens.is_empty() {
            return None;
        }

        let scores = self.class_scores(&tokens);
        let max_lp = scores
            .iter()
            .map(|(_, lp)| *lp)
            .fold(f64::NEG_INFINITY, f64::max);

        // Normalize log probabilities into class probabilities
        let total: f64 = scores.iter().map(|(_, lp)| (lp - max_lp).exp()).sum();
        scores
            .into_iter()
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(class, lp)| (class, (lp - max_lp).exp() / total))
    }

    fn is_trained(&self) -> bool {
        self.total_docs > 0 && !self.class_counts.is_empty()
    }

    /// Persist the model atomically (write to temp file, then rename)
    fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_vec(self)?;
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let tmp = dir.join(".moneta_model.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}

/// Hybrid categorizer: ordered rules first, trained model as fallback
pub struct Categorizer {
    rules: Vec<(String, Vec<String>)>,
    model: Box<dyn FallbackModel>,
    model_path: Option<PathBuf>,
}

impl Categorizer {
    /// Categorizer with the default rule table and an in-memory model
    pub fn new() -> Self {
        Self {
            rules: default_rules(),
            model: Box::new(BayesModel::new()),
            model_path: None,
        }
    }

    /// Categorizer that loads and persists its model artifact at `path`
    pub fn with_model_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            rules: default_rules(),
            model: Box::new(BayesModel::load(&path)),
            model_path: Some(path),
        }
    }

    /// Override the rule table (order preserved) or the fallback model
    pub fn with_rules(mut self, rules: Vec<(String, Vec<String>)>) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_model(mut self, model: Box<dyn FallbackModel>) -> Self {
        self.model = model;
        self
    }

    /// First category whose keyword list contains a substring of the
    /// lower-cased description, honoring table order
    fn rule_match(&self, description: &str) -> Option<&str> {
        let desc_lower = description.to_lowercase();
        self.rules
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| desc_lower.contains(k.as_str())))
            .map(|(name, _)| name.as_str())
    }

    /// Category for a description, with a confidence score
    pub fn categorize(&self, description: &str) -> (String, f64) {
        if let Some(category) = self.rule_match(description) {
            return (category.to_string(), RULE_CONFIDENCE);
        }

        if let Some((category, confidence)) = self.model.predict(description) {
            return (category, confidence);
        }

        (UNCATEGORIZED.to_string(), UNTRAINED_CONFIDENCE)
    }

    /// Record a user correction and retrain when the accumulated sample count
    /// crosses a multiple of [`RETRAIN_INTERVAL`]. Training failures are
    /// logged and leave the model as it was.
    pub fn record_correction(
        &mut self,
        db: &Database,
        description: &str,
        category: &str,
    ) -> Result<()> {
        db.add_correction(description, category)?;
        let count = db.correction_count()?;

        if count >= RETRAIN_INTERVAL && count % RETRAIN_INTERVAL == 0 {
            self.retrain(db)?;
        }
        Ok(())
    }

    /// Retrain the fallback model on the full accumulated correction set
    pub fn retrain(&mut self, db: &Database) -> Result<()> {
        let samples = db.list_corrections()?;
        match self.model.train(&samples) {
            Ok(true) => {
                debug!(samples = samples.len(), "Categorizer model retrained");
                if let Some(path) = &self.model_path {
                    if let Err(e) = self.model.save(path) {
                        warn!(error = %e, "Failed to persist model artifact");
                    }
                }
            }
            Ok(false) => {}
            Err(e) => {
                // Training must never propagate to the caller
                warn!(error = %e, "Categorizer training failed, remaining untrained");
            }
        }
        Ok(())
    }
}

impl Default for Categorizer {
    fn default() -> Self {
        Self::new()
    }
}
