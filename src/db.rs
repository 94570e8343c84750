//! SQLite database for the app catalog
//!
//! This module provides durable storage for catalog entries. The schema is
//! created idempotently at startup through a versioned migrations table.

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Current schema version for migrations
const SCHEMA_VERSION: i32 = 1;

/// A persisted catalog entry.
///
/// `id` and `created_at` are assigned by the store at insertion and never
/// change for the lifetime of the row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppRecord {
    pub id: i64,
    pub title: String,
    pub url: String,
    pub image: Option<String>,
    pub healthpath: Option<String>,
    pub created_at: String,
}

/// The mutable fields of a catalog entry, as accepted from clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppFields {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub healthpath: Option<String>,
}

/// Database connection wrapper with thread-safe access
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create a database at the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        // Create parent directory if needed
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)
            .context("Failed to open database")?;

        // Enable WAL mode for better concurrency
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.run_migrations()?;

        info!("Database opened at {}", path.display());
        Ok(db)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .context("Failed to open in-memory database")?;

        conn.execute_batch("PRAGMA foreign_keys=ON;")?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.run_migrations()?;
        Ok(db)
    }

    /// Run database migrations
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            )",
            [],
        )?;

        let current_version: i32 = conn
            .query_row(
                "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
                [],
                |row| row.get(0),
            )
            .unwrap_or(0);

        if current_version < SCHEMA_VERSION {
            info!("Running migrations from v{} to v{}", current_version, SCHEMA_VERSION);

            if current_version < 1 {
                self.migrate_v1(&conn)?;
            }
        }

        Ok(())
    }

    /// Migration v1: the apps catalog table
    fn migrate_v1(&self, conn: &Connection) -> Result<()> {
        debug!("Applying migration v1: apps catalog");

        conn.execute_batch(r#"
            -- Catalog entries. AUTOINCREMENT keeps ids strictly increasing
            -- and never reused, even across deletes.
            CREATE TABLE IF NOT EXISTS apps (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                url TEXT NOT NULL,
                image TEXT,
                healthpath TEXT,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX IF NOT EXISTS idx_apps_created ON apps(created_at DESC);

            -- Record migration
            INSERT INTO schema_migrations (version) VALUES (1);
        "#)?;

        Ok(())
    }

    fn row_to_app(row: &rusqlite::Row<'_>) -> rusqlite::Result<AppRecord> {
        Ok(AppRecord {
            id: row.get(0)?,
            title: row.get(1)?,
            url: row.get(2)?,
            image: row.get(3)?,
            healthpath: row.get(4)?,
            created_at: row.get(5)?,
        })
    }

    /// List all apps, newest first. Ties on created_at fall back to id so
    /// same-second inserts still come out newest first.
    pub fn list_apps(&self) -> Result<Vec<AppRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, title, url, image, healthpath, created_at
             FROM apps ORDER BY created_at DESC, id DESC",
        )?;

        let apps = stmt
            .query_map([], Self::row_to_app)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(apps)
    }

    /// Fetch a single app by id
    pub fn get_app(&self, id: i64) -> Result<Option<AppRecord>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT id, title, url, image, healthpath, created_at
             FROM apps WHERE id = ?1",
            params![id],
            Self::row_to_app,
        )
        .optional()
        .context("Failed to get app")
    }

    /// Insert a new app and return the created row, including the generated
    /// id and created_at.
    pub fn create_app(&self, fields: &AppFields) -> Result<AppRecord> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO apps (title, url, image, healthpath) VALUES (?1, ?2, ?3, ?4)",
            params![fields.title, fields.url, fields.image, fields.healthpath],
        )?;

        let id = conn.last_insert_rowid();
        conn.query_row(
            "SELECT id, title, url, image, healthpath, created_at
             FROM apps WHERE id = ?1",
            params![id],
            Self::row_to_app,
        )
        .context("Failed to read back created app")
    }

    /// Update an app in place. Returns the updated row, or None when the id
    /// is unknown. id and created_at are never touched.
    pub fn update_app(&self, id: i64, fields: &AppFields) -> Result<Option<AppRecord>> {
        let conn = self.conn.lock().unwrap();
        let rows = conn.execute(
            "UPDATE apps SET title = ?1, url = ?2, image = ?3, healthpath = ?4 WHERE id = ?5",
            params![fields.title, fields.url, fields.image, fields.healthpath, id],
        )?;

        if rows == 0 {
            return Ok(None);
        }

        conn.query_row(
            "SELECT id, title, url, image, healthpath, created_at
             FROM apps WHERE id = ?1",
            params![id],
            Self::row_to_app,
        )
        .optional()
        .context("Failed to read back updated app")
    }

    /// Delete an app. Returns the removed row, or None when the id is
    /// unknown.
    pub fn delete_app(&self, id: i64) -> Result<Option<AppRecord>> {
        let conn = self.conn.lock().unwrap();
        let removed = conn
            .query_row(
                "SELECT id, title, url, image, healthpath, created_at
                 FROM apps WHERE id = ?1",
                params![id],
                Self::row_to_app,
            )
            .optional()?;

        if removed.is_some() {
            conn.execute("DELETE FROM apps WHERE id = ?1", params![id])?;
        }

        Ok(removed)
    }
}
