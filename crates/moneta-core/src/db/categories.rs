//! Category reference data

use std::collections::{HashMap, HashSet};

use rusqlite::{params, OptionalExtension};

use super::Database;
use crate::error::Result;
use crate::models::Category;

impl Database {
    /// Insert a category if it does not exist, returning its ID either way
    pub fn upsert_category(&self, name: &str, group: Option<&str>) -> Result<i64> {
        let conn = self.conn()?;

        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM categories WHERE name = ?",
                params![name],
                |row| row.get(0),
            )
            .optional()?;

        if let Some(id) = existing {
            return Ok(id);
        }

        conn.execute(
            "INSERT INTO categories (name, grp) VALUES (?, ?)",
            params![name, group],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn list_categories(&self) -> Result<Vec<Category>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT id, name, grp FROM categories ORDER BY name")?;
        let rows = stmt.query_map([], |row| {
            Ok(Category {
                id: row.get(0)?,
                name: row.get(1)?,
                group: row.get(2)?,
            })
        })?;

        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn category_id_by_name(&self, name: &str) -> Result<Option<i64>> {
        let conn = self.conn()?;
        Ok(conn
            .query_row(
                "SELECT id FROM categories WHERE name = ?",
                params![name],
                |row| row.get(0),
            )
            .optional()?)
    }

    /// Map of category ID to name, for resolving transactions in one pass
    pub fn category_names_by_id(&self) -> Result<HashMap<i64, String>> {
        Ok(self
            .list_categories()?
            .into_iter()
            .map(|c| (c.id, c.name))
            .collect())
    }

    /// IDs of categories whose name appears in the given excluded list.
    /// Built once per analytics run; the single canonical exclusion check.
    pub fn excluded_category_ids(&self, excluded_names: &[String]) -> Result<HashSet<i64>> {
        let names: HashSet<&str> = excluded_names.iter().map(|s| s.as_str()).collect();
        Ok(self
            .list_categories()?
            .into_iter()
            .filter(|c| names.contains(c.name.as_str()))
            .map(|c| c.id)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_is_idempotent() {
        let db = Database::in_memory().unwrap();
        let a = db.upsert_category("Coffee", None).unwrap();
        let b = db.upsert_category("Coffee", Some("Lifestyle")).unwrap();
        assert_eq!(a, b);
        assert_eq!(db.list_categories().unwrap().len(), 1);
    }

    #[test]
    fn test_excluded_ids() {
        let db = Database::in_memory().unwrap();
        let venmo = db.upsert_category("Venmo", None).unwrap();
        db.upsert_category("Coffee", None).unwrap();

        let excluded = db
            .excluded_category_ids(&["Venmo".to_string(), "Transfer".to_string()])
            .unwrap();
        assert_eq!(excluded.len(), 1);
        assert!(excluded.contains(&venmo));
    }
}
