//! Transaction operations

use chrono::NaiveDate;
use rusqlite::params;

use super::Database;
use crate::error::{Error, Result};
use crate::models::{NewTransaction, Transaction};

fn row_to_transaction(row: &rusqlite::Row<'_>) -> rusqlite::Result<Transaction> {
    let date_str: String = row.get(1)?;
    let date = NaiveDate::parse_from_str(&date_str, "%Y-%m-%d").map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(Transaction {
        id: row.get(0)?,
        date,
        description: row.get(2)?,
        amount: row.get(3)?,
        category_id: row.get(4)?,
        is_recurring: row.get::<_, i64>(5)? != 0,
    })
}

impl Database {
    /// Insert a transaction, returning its new ID
    pub fn insert_transaction(&self, tx: &NewTransaction) -> Result<i64> {
        let conn = self.conn()?;

        conn.execute(
            "INSERT INTO transactions (date, description, amount, category_id)
             VALUES (?, ?, ?, ?)",
            params![
                tx.date.to_string(),
                tx.description,
                tx.amount,
                tx.category_id
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// Transactions with `from <= date <= to`, in arbitrary order
    /// (callers sort where order matters)
    pub fn transactions_in_range(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, date, description, amount, category_id, is_recurring
             FROM transactions WHERE date >= ? AND date <= ?",
        )?;
        let rows = stmt.query_map(params![from.to_string(), to.to_string()], |row| {
            row_to_transaction(row)
        })?;

        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Expense transactions (amount < 0) with `date >= from`
    pub fn expenses_since(&self, from: NaiveDate) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, date, description, amount, category_id, is_recurring
             FROM transactions WHERE date >= ? AND amount < 0",
        )?;
        let rows = stmt.query_map(params![from.to_string()], |row| row_to_transaction(row))?;

        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Update the user-marked recurring flag (the one external write surface)
    pub fn set_transaction_recurring(&self, id: i64, is_recurring: bool) -> Result<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE transactions SET is_recurring = ? WHERE id = ?",
            params![is_recurring as i64, id],
        )?;

        if updated == 0 {
            return Err(Error::NotFound(format!("transaction {}", id)));
        }
        Ok(())
    }

    pub fn count_transactions(&self) -> Result<i64> {
        let conn = self.conn()?;
        Ok(conn.query_row("SELECT COUNT(*) FROM transactions", [], |row| row.get(0))?)
    }
}
