//! CSV transaction import
//!
//! Reads `date,description,amount` rows (header required), categorizes each
//! row at import time, and inserts it. Malformed rows are skipped with a
//! warning and counted; a bad row never aborts the rest of the file.

use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::categorize::Categorizer;
use crate::db::Database;
use crate::error::Result;
use crate::models::NewTransaction;

/// Date formats accepted in the date column, tried in order
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%m/%d/%y"];

#[derive(Debug, Deserialize)]
struct CsvRow {
    date: String,
    description: String,
    amount: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: usize,
    /// Rows whose category came from a keyword rule or the model rather
    /// than the uncategorized fallback
    pub categorized: usize,
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

/// Amounts may carry currency symbols, thousands separators, or
/// parenthesized negatives
fn parse_amount(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    let negated = trimmed.starts_with('(') && trimmed.ends_with(')');
    let cleaned: String = trimmed
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    let value: f64 = cleaned.parse().ok()?;
    Some(if negated { -value } else { value })
}

pub fn import_csv(
    db: &Database,
    categorizer: &Categorizer,
    path: &Path,
) -> Result<ImportSummary> {
    let file = std::fs::File::open(path)?;
    let summary = import_reader(db, categorizer, file)?;
    info!(
        path = %path.display(),
        imported = summary.imported,
        skipped = summary.skipped,
        "Import complete"
    );
    Ok(summary)
}

pub fn import_reader<R: Read>(
    db: &Database,
    categorizer: &Categorizer,
    reader: R,
) -> Result<ImportSummary> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let mut summary = ImportSummary::default();

    for (line, record) in csv_reader.deserialize::<CsvRow>().enumerate() {
        let row = match record {
            Ok(row) => row,
            Err(err) => {
                warn!(line = line + 2, error = %err, "Skipping unreadable row");
                summary.skipped += 1;
                continue;
            }
        };

        let date = match parse_date(&row.date) {
            Some(date) => date,
            None => {
                warn!(line = line + 2, date = %row.date, "Skipping row with bad date");
                summary.skipped += 1;
                continue;
            }
        };
        let amount = match parse_amount(&row.amount) {
            Some(amount) => amount,
            None => {
                warn!(line = line + 2, amount = %row.amount, "Skipping row with bad amount");
                summary.skipped += 1;
                continue;
            }
        };

        let (category, _confidence) = categorizer.categorize(&row.description);
        if category != crate::categorize::UNCATEGORIZED {
            summary.categorized += 1;
        }
        let category_id = db.upsert_category(&category, None)?;

        db.insert_transaction(&NewTransaction {
            date,
            description: row.description,
            amount,
            category_id: Some(category_id),
        })?;
        summary.imported += 1;
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::categorize::UNCATEGORIZED;

    fn setup() -> (Database, Categorizer) {
        let db = Database::in_memory().unwrap();
        let categorizer = Categorizer::new();
        (db, categorizer)
    }

    #[test]
    fn test_import_with_categorization() {
        let (db, categorizer) = setup();
        let csv = "date,description,amount\n\
                   2025-11-01,STARBUCKS #1234,-6.50\n\
                   2025-11-02,EXAFUNCT DIR DEP,5500.00\n";

        let summary = import_reader(&db, &categorizer, csv.as_bytes()).unwrap();
        assert_eq!(summary.imported, 2);
        assert_eq!(summary.skipped, 0);
        assert_eq!(summary.categorized, 2);

        assert_eq!(db.count_transactions().unwrap(), 2);
        assert!(db.category_id_by_name("Coffee").unwrap().is_some());
        assert!(db.category_id_by_name("Income").unwrap().is_some());
    }

    #[test]
    fn test_malformed_rows_skipped_not_fatal() {
        let (db, categorizer) = setup();
        let csv = "date,description,amount\n\
                   not-a-date,STARBUCKS,-6.50\n\
                   2025-11-02,HEB GROCERY,abc\n\
                   2025-11-03,HEB GROCERY,-80.00\n";

        let summary = import_reader(&db, &categorizer, csv.as_bytes()).unwrap();
        assert_eq!(summary.imported, 1);
        assert_eq!(summary.skipped, 2);
        assert_eq!(db.count_transactions().unwrap(), 1);
    }

    #[test]
    fn test_amount_formats() {
        assert_eq!(parse_amount("-6.50"), Some(-6.5));
        assert_eq!(parse_amount("$1,234.56"), Some(1234.56));
        assert_eq!(parse_amount("(45.00)"), Some(-45.0));
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("n/a"), None);
    }

    #[test]
    fn test_date_formats() {
        let want = NaiveDate::from_ymd_opt(2025, 11, 3).unwrap();
        assert_eq!(parse_date("2025-11-03"), Some(want));
        assert_eq!(parse_date("11/03/2025"), Some(want));
        assert_eq!(parse_date("11/03/25"), Some(want));
        assert_eq!(parse_date("3 Nov 2025"), None);
    }

    #[test]
    fn test_unknown_description_lands_uncategorized() {
        let (db, categorizer) = setup();
        let csv = "date,description,amount\n2025-11-01,ZZZZZ MYSTERY VENDOR,-10.00\n";

        let summary = import_reader(&db, &categorizer, csv.as_bytes()).unwrap();
        assert_eq!(summary.imported, 1);
        assert_eq!(summary.categorized, 0);
        assert!(db.category_id_by_name(UNCATEGORIZED).unwrap().is_some());
    }
}
