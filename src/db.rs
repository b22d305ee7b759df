//! Database module for Catalog Viewer
//! Handles SQLite storage for the last fetched snapshot and user preferences

use crate::filter_state::{PreferenceStore, StoreError};
use crate::source::Snapshot;
use crate::types::Product;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create database at the given path
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init_schema()?;
        debug!(path = %path.display(), "Database opened");
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let db = Self {
            conn: Mutex::new(Connection::open_in_memory()?),
        };
        db.init_schema()?;
        Ok(db)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Initialize database schema
    fn init_schema(&self) -> Result<(), StoreError> {
        self.conn()?.execute_batch(
            "CREATE TABLE IF NOT EXISTS products (
                position INTEGER PRIMARY KEY,
                id TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                category TEXT NOT NULL,
                price REAL NOT NULL,
                in_stock INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_products_category ON products(category);

            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS metadata (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )?;
        Ok(())
    }

    /// Replace the cached snapshot. Runs in one transaction so a crash never
    /// leaves half a catalog behind.
    pub fn save_snapshot(&self, snapshot: &Snapshot) -> Result<usize, StoreError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM products", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO products (position, id, name, category, price, in_stock)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for (position, p) in snapshot.products().iter().enumerate() {
                stmt.execute(params![
                    position as i64,
                    p.id,
                    p.name,
                    p.category,
                    p.price,
                    p.in_stock
                ])?;
            }
        }
        let categories = serde_json::to_string(snapshot.categories())?;
        for (key, value) in [
            ("categories", categories),
            ("total", snapshot.total().to_string()),
            ("source", snapshot.source().to_string()),
            ("fetched_at", snapshot.fetched_at().to_rfc3339()),
        ] {
            tx.execute(
                "INSERT INTO metadata (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, value],
            )?;
        }
        tx.commit()?;

        let count = snapshot.products().len();
        debug!(count, "Snapshot cached");
        Ok(count)
    }

    /// Last cached snapshot, if one exists and is still valid
    pub fn load_snapshot(&self) -> Result<Option<Snapshot>, StoreError> {
        let Some(fetched_at) = self.get_metadata("fetched_at")? else {
            return Ok(None);
        };
        let fetched_at = match DateTime::parse_from_rfc3339(&fetched_at) {
            Ok(t) => t.with_timezone(&Utc),
            Err(e) => {
                warn!(error = %e, "Cached snapshot has a bad timestamp, ignoring it");
                return Ok(None);
            }
        };
        let categories: Vec<String> = match self.get_metadata("categories")? {
            Some(json) => serde_json::from_str(&json)?,
            None => Vec::new(),
        };
        let source = self.get_metadata("source")?.unwrap_or_default();

        let products = {
            let conn = self.conn()?;
            let mut stmt = conn.prepare(
                "SELECT id, name, category, price, in_stock FROM products ORDER BY position",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok(Product {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    category: row.get(2)?,
                    price: row.get(3)?,
                    in_stock: row.get(4)?,
                })
            })?;
            rows.collect::<Result<Vec<_>, _>>()?
        };
        let total = self
            .get_metadata("total")?
            .and_then(|t| t.parse().ok())
            .unwrap_or(products.len());

        match Snapshot::restore(products, categories, total, source, fetched_at) {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(e) => {
                warn!(error = %e, "Cached snapshot is invalid, ignoring it");
                Ok(None)
            }
        }
    }

    /// Get product count
    pub fn product_count(&self) -> Result<usize, StoreError> {
        let count: i64 = self
            .conn()?
            .query_row("SELECT COUNT(*) FROM products", [], |r| r.get(0))?;
        Ok(count as usize)
    }

    fn get_metadata(&self, key: &str) -> Result<Option<String>, StoreError> {
        let value = self
            .conn()?
            .query_row(
                "SELECT value FROM metadata WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    /// Get a setting value
    pub fn get_setting(&self, key: &str) -> Result<Option<String>, StoreError> {
        let value = self
            .conn()?
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    /// Set a setting value
    pub fn set_setting(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.conn()?.execute(
            "INSERT INTO settings (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }
}

impl PreferenceStore for Database {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.get_setting(key)
    }

    fn save(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.set_setting(key, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProductPage;

    fn snapshot() -> Snapshot {
        let items = vec![
            Product {
                id: "b".into(),
                name: "Second by id, first by position".into(),
                category: "B".into(),
                price: 10.5,
                in_stock: false,
            },
            Product {
                id: "a".into(),
                name: "Alpha".into(),
                category: "A".into(),
                price: 3.0,
                in_stock: true,
            },
        ];
        Snapshot::new(ProductPage { items, total: 2 }, vec!["A".into(), "B".into()], "test")
            .unwrap()
    }

    #[test]
    fn test_empty_database_has_no_snapshot() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.load_snapshot().unwrap().is_none());
        assert_eq!(db.product_count().unwrap(), 0);
    }

    #[test]
    fn test_snapshot_round_trip_keeps_order() {
        let db = Database::open_in_memory().unwrap();
        let original = snapshot();
        assert_eq!(db.save_snapshot(&original).unwrap(), 2);

        let restored = db.load_snapshot().unwrap().unwrap();
        assert_eq!(restored.products(), original.products());
        assert_eq!(restored.categories(), original.categories());
        assert_eq!(restored.source(), "test");
        assert_eq!(
            restored.fetched_at().timestamp(),
            original.fetched_at().timestamp()
        );
    }

    #[test]
    fn test_saving_replaces_previous_snapshot() {
        let db = Database::open_in_memory().unwrap();
        db.save_snapshot(&snapshot()).unwrap();
        let smaller = Snapshot::new(ProductPage { items: vec![], total: 0 }, vec![], "empty")
            .unwrap();
        db.save_snapshot(&smaller).unwrap();
        assert_eq!(db.product_count().unwrap(), 0);
        assert_eq!(db.load_snapshot().unwrap().unwrap().source(), "empty");
    }

    #[test]
    fn test_settings_upsert() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.get_setting("k").unwrap(), None);
        db.set_setting("k", "1").unwrap();
        db.set_setting("k", "2").unwrap();
        assert_eq!(db.get_setting("k").unwrap().as_deref(), Some("2"));
    }
}
