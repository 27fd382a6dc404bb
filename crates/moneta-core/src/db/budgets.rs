//! Budget lookup and categorizer correction samples

use std::collections::HashMap;

use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};

use super::Database;
use crate::error::Result;
use crate::models::Budget;

/// One budgeted category line, joined with its category name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetLine {
    pub category_id: i64,
    pub category_name: String,
    pub budgeted_amount: f64,
    pub period: String,
}

/// The single active budget, resolved with category names.
/// Cached per calendar day by the analytics engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetSnapshot {
    pub id: i64,
    pub name: String,
    pub total_budgeted: f64,
    /// Keyed by lower-cased category name
    pub items: HashMap<String, BudgetLine>,
    pub items_by_id: HashMap<i64, BudgetLine>,
}

impl BudgetSnapshot {
    pub fn line_for(&self, category_name: &str) -> Option<&BudgetLine> {
        self.items.get(&category_name.to_lowercase())
    }
}

impl Database {
    pub fn create_budget(&self, name: &str, is_active: bool) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO budgets (name, is_active) VALUES (?, ?)",
            params![name, is_active as i64],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn add_budget_item(
        &self,
        budget_id: i64,
        category_id: i64,
        budgeted_amount: f64,
        period: &str,
    ) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO budget_items (budget_id, category_id, budgeted_amount, period)
             VALUES (?, ?, ?, ?)",
            params![budget_id, category_id, budgeted_amount, period],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// The single active budget with its line items, or None
    pub fn active_budget(&self) -> Result<Option<BudgetSnapshot>> {
        let conn = self.conn()?;

        let budget: Option<Budget> = conn
            .query_row(
                "SELECT id, name, is_active FROM budgets WHERE is_active = 1 LIMIT 1",
                [],
                |row| {
                    Ok(Budget {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        is_active: row.get::<_, i64>(2)? != 0,
                    })
                },
            )
            .optional()?;

        let budget = match budget {
            Some(b) => b,
            None => return Ok(None),
        };

        let mut stmt = conn.prepare(
            "SELECT bi.category_id, c.name, bi.budgeted_amount, bi.period
             FROM budget_items bi
             JOIN categories c ON bi.category_id = c.id
             WHERE bi.budget_id = ?",
        )?;
        let lines = stmt
            .query_map(params![budget.id], |row| {
                Ok(BudgetLine {
                    category_id: row.get(0)?,
                    category_name: row.get(1)?,
                    budgeted_amount: row.get(2)?,
                    period: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let total_budgeted = lines.iter().map(|l| l.budgeted_amount).sum();
        let mut items = HashMap::new();
        let mut items_by_id = HashMap::new();
        for line in lines {
            items.insert(line.category_name.to_lowercase(), line.clone());
            items_by_id.insert(line.category_id, line);
        }

        Ok(Some(BudgetSnapshot {
            id: budget.id,
            name: budget.name,
            total_budgeted,
            items,
            items_by_id,
        }))
    }

    /// Record a user correction (description -> category) for model training
    pub fn add_correction(&self, description: &str, category: &str) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO corrections (description, category) VALUES (?, ?)",
            params![description, category],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn correction_count(&self) -> Result<i64> {
        let conn = self.conn()?;
        Ok(conn.query_row("SELECT COUNT(*) FROM corrections", [], |row| row.get(0))?)
    }

    /// All accumulated correction samples, oldest first
    pub fn list_corrections(&self) -> Result<Vec<(String, String)>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT description, category FROM corrections ORDER BY id")?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;

        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}
