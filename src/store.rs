//! Read/write access to transactions, categories and accounts.
//!
//! Both categorization engines talk to storage only through [`TransactionStore`].
//! The SQLite implementation is what the CLI uses; the engines never see a
//! `Connection` directly.

use std::path::Path;

use rusqlite::{Connection, OptionalExtension, Row, ToSql};
use tracing::debug;

use crate::db::{get_connection, init_db};
use crate::error::{PennyError, Result};
use crate::models::{Account, CategorizedExample, Category, Transaction, TransactionFilter};

pub trait TransactionStore {
    fn list_transactions(&self, filter: &TransactionFilter) -> Result<Vec<Transaction>>;
    /// Transactions with no category that are not flagged as transfers.
    fn list_uncategorized(&self) -> Result<Vec<Transaction>>;
    fn list_categories(&self) -> Result<Vec<Category>>;
    fn list_accounts(&self) -> Result<Vec<Account>>;
    /// Most recent categorized, non-transfer transactions.
    fn categorized_examples(&self, limit: usize) -> Result<Vec<CategorizedExample>>;
    /// Look a category up by its exact name, creating a regular one if missing.
    fn get_or_create_category(&self, name: &str) -> Result<i64>;
    fn add_category(&self, name: &str, internal: bool) -> Result<i64>;
    fn set_category(&self, transaction_id: &str, category_id: i64) -> Result<()>;
    fn clear_category(&self, transaction_id: &str) -> Result<()>;
    fn set_transfer_flag(&self, transaction_id: &str) -> Result<()>;
    fn clear_transfer_flag(&self, transaction_id: &str) -> Result<()>;
    fn account_display_name(&self, account_id: &str) -> Result<String>;
}

const TXN_COLUMNS: &str =
    "id, account_id, posted, amount, description, is_pending, is_transfer, category_id";

fn row_to_transaction(row: &Row) -> rusqlite::Result<Transaction> {
    Ok(Transaction {
        id: row.get(0)?,
        account_id: row.get(1)?,
        posted: row.get(2)?,
        amount: row.get(3)?,
        description: row.get(4)?,
        is_pending: row.get(5)?,
        is_transfer: row.get(6)?,
        category_id: row.get(7)?,
    })
}

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (and create if needed) the database at `db_path`.
    pub fn open(db_path: &Path) -> Result<Self> {
        let conn = get_connection(db_path)?;
        init_db(&conn)?;
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Insert or update an account. Sync normally owns this; the demo data
    /// loader and tests use it directly.
    pub fn upsert_account(&self, account: &Account) -> Result<()> {
        self.conn.execute(
            "INSERT INTO accounts (id, name, nickname, account_type) VALUES (?1, ?2, ?3, ?4) \
             ON CONFLICT(id) DO UPDATE SET name = excluded.name, nickname = excluded.nickname, \
             account_type = excluded.account_type",
            rusqlite::params![account.id, account.name, account.nickname, account.account_type],
        )?;
        Ok(())
    }

    /// Insert or update a transaction row. Category and transfer state of an
    /// existing row are left alone so a re-sync does not undo categorization.
    pub fn upsert_transaction(&self, txn: &Transaction) -> Result<()> {
        self.conn.execute(
            "INSERT INTO transactions (id, account_id, posted, amount, description, is_pending, is_transfer, category_id) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8) \
             ON CONFLICT(id) DO UPDATE SET account_id = excluded.account_id, posted = excluded.posted, \
             amount = excluded.amount, description = excluded.description, is_pending = excluded.is_pending",
            rusqlite::params![
                txn.id,
                txn.account_id,
                txn.posted,
                txn.amount,
                txn.description,
                txn.is_pending,
                txn.is_transfer,
                txn.category_id,
            ],
        )?;
        Ok(())
    }

    fn update_transaction(
        &self,
        sql: &str,
        params: &[&dyn ToSql],
        transaction_id: &str,
    ) -> Result<()> {
        let changed = self.conn.execute(sql, params)?;
        if changed == 0 {
            return Err(PennyError::UnknownTransaction(transaction_id.to_string()));
        }
        Ok(())
    }
}

impl TransactionStore for SqliteStore {
    fn list_transactions(&self, filter: &TransactionFilter) -> Result<Vec<Transaction>> {
        let mut sql = format!("SELECT {TXN_COLUMNS} FROM transactions WHERE 1=1");
        let mut params: Vec<&dyn ToSql> = Vec::new();
        if let Some(ref account_id) = filter.account_id {
            sql.push_str(" AND account_id = ?");
            params.push(account_id);
        }
        if let Some(ref from) = filter.from {
            sql.push_str(" AND posted >= ?");
            params.push(from);
        }
        if let Some(ref to) = filter.to {
            sql.push_str(" AND posted <= ?");
            params.push(to);
        }
        sql.push_str(" ORDER BY posted DESC, id");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params.as_slice(), row_to_transaction)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn list_uncategorized(&self) -> Result<Vec<Transaction>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TXN_COLUMNS} FROM transactions \
             WHERE category_id IS NULL AND is_transfer = 0 ORDER BY posted DESC, id"
        ))?;
        let rows = stmt
            .query_map([], row_to_transaction)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn list_categories(&self) -> Result<Vec<Category>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, is_internal FROM categories ORDER BY name COLLATE NOCASE, name",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(Category {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    is_internal: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn list_accounts(&self) -> Result<Vec<Account>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, nickname, account_type FROM accounts ORDER BY name")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(Account {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    nickname: row.get(2)?,
                    account_type: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn categorized_examples(&self, limit: usize) -> Result<Vec<CategorizedExample>> {
        let mut stmt = self.conn.prepare(
            "SELECT t.description, t.amount, c.name FROM transactions t \
             JOIN categories c ON t.category_id = c.id \
             WHERE t.is_transfer = 0 ORDER BY t.posted DESC, t.id LIMIT ?1",
        )?;
        let rows = stmt
            .query_map([limit as i64], |row| {
                Ok(CategorizedExample {
                    description: row.get(0)?,
                    amount: row.get(1)?,
                    category: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn get_or_create_category(&self, name: &str) -> Result<i64> {
        let name = name.trim();
        if name.is_empty() {
            return Err(PennyError::Other("Category name cannot be empty".into()));
        }
        let existing: Option<i64> = self
            .conn
            .query_row("SELECT id FROM categories WHERE name = ?1", [name], |r| r.get(0))
            .optional()?;
        match existing {
            Some(id) => Ok(id),
            None => self.add_category(name, false),
        }
    }

    fn add_category(&self, name: &str, internal: bool) -> Result<i64> {
        let name = name.trim();
        if name.is_empty() {
            return Err(PennyError::Other("Category name cannot be empty".into()));
        }
        self.conn.execute(
            "INSERT INTO categories (name, is_internal) VALUES (?1, ?2)",
            rusqlite::params![name, internal],
        )?;
        let id = self.conn.last_insert_rowid();
        debug!(category = name, id, internal, "created category");
        Ok(id)
    }

    fn set_category(&self, transaction_id: &str, category_id: i64) -> Result<()> {
        self.update_transaction(
            "UPDATE transactions SET category_id = ?1 WHERE id = ?2",
            &[&category_id, &transaction_id],
            transaction_id,
        )
    }

    fn clear_category(&self, transaction_id: &str) -> Result<()> {
        self.update_transaction(
            "UPDATE transactions SET category_id = NULL WHERE id = ?1",
            &[&transaction_id],
            transaction_id,
        )
    }

    fn set_transfer_flag(&self, transaction_id: &str) -> Result<()> {
        self.update_transaction(
            "UPDATE transactions SET is_transfer = 1 WHERE id = ?1",
            &[&transaction_id],
            transaction_id,
        )
    }

    fn clear_transfer_flag(&self, transaction_id: &str) -> Result<()> {
        self.update_transaction(
            "UPDATE transactions SET is_transfer = 0 WHERE id = ?1",
            &[&transaction_id],
            transaction_id,
        )
    }

    fn account_display_name(&self, account_id: &str) -> Result<String> {
        let found: Option<(String, Option<String>)> = self
            .conn
            .query_row(
                "SELECT name, nickname FROM accounts WHERE id = ?1",
                [account_id],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .optional()?;
        match found {
            Some((name, nickname)) => Ok(match nickname {
                Some(nick) if !nick.trim().is_empty() => nick,
                _ => name,
            }),
            None => Err(PennyError::UnknownAccount(account_id.to_string())),
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub fn test_store() -> (tempfile::TempDir, SqliteStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(&dir.path().join("test.db")).unwrap();
        (dir, store)
    }

    pub fn add_account(store: &SqliteStore, id: &str, name: &str, nickname: Option<&str>) {
        store
            .upsert_account(&Account {
                id: id.to_string(),
                name: name.to_string(),
                nickname: nickname.map(str::to_string),
                account_type: "checking".to_string(),
            })
            .unwrap();
    }

    pub fn add_txn(
        store: &SqliteStore,
        id: &str,
        account_id: &str,
        posted: &str,
        description: &str,
        amount: i64,
    ) {
        store
            .upsert_transaction(&Transaction {
                id: id.to_string(),
                account_id: account_id.to_string(),
                posted: posted.to_string(),
                amount,
                description: description.to_string(),
                is_pending: false,
                is_transfer: false,
                category_id: None,
            })
            .unwrap();
    }

    pub fn category_of(store: &SqliteStore, txn_id: &str) -> Option<i64> {
        store
            .conn()
            .query_row("SELECT category_id FROM transactions WHERE id = ?1", [txn_id], |r| r.get(0))
            .unwrap()
    }

    pub fn is_transfer(store: &SqliteStore, txn_id: &str) -> bool {
        store
            .conn()
            .query_row("SELECT is_transfer FROM transactions WHERE id = ?1", [txn_id], |r| r.get(0))
            .unwrap()
    }
}
