use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::Connection;
use tracing::{debug, info};

use crate::error::AppResult;

pub mod migrations;

pub mod repositories;

const SCHEMA_SQL: &str = include_str!("schema.sql");
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle to the plant database file.
///
/// The schema and migrations are applied once when the pool is created;
/// afterwards every unit of work opens its own configured connection and
/// SQLite handles the cross-connection locking.
#[derive(Clone, Debug)]
pub struct DbPool {
    path: PathBuf,
    schema_version: i32,
}

impl DbPool {
    pub fn new<P: Into<PathBuf>>(path: P) -> AppResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let conn = open_configured(&path)?;
        let schema_version = initialize(&conn)?;
        info!(
            target: "app::db",
            db_path = %path.display(),
            schema_version,
            "production database ready"
        );

        Ok(Self {
            path,
            schema_version,
        })
    }

    /// Opens a connection with the plant pragmas applied; no schema work.
    pub fn get_connection(&self) -> AppResult<Connection> {
        let conn = open_configured(&self.path)?;
        debug!(target: "app::db", db_path = %self.path.display(), "connection opened");
        Ok(conn)
    }

    pub fn with_connection<F, T>(&self, callback: F) -> AppResult<T>
    where
        F: FnOnce(&Connection) -> AppResult<T>,
    {
        let conn = self.get_connection()?;
        callback(&conn)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `user_version` reached when the pool was opened.
    pub fn schema_version(&self) -> i32 {
        self.schema_version
    }
}

fn open_configured(path: &Path) -> AppResult<Connection> {
    let conn = Connection::open(path)?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    // Record rows must outlive deleted machines (ON DELETE SET NULL) and
    // detail rows must go with their record (ON DELETE CASCADE).
    conn.pragma_update(None, "foreign_keys", 1)?;
    conn.pragma_update(None, "journal_mode", "WAL")?;
    Ok(conn)
}

/// Creates the plant tables and brings `user_version` up to date.
fn initialize(conn: &Connection) -> AppResult<i32> {
    conn.execute_batch(SCHEMA_SQL)?;
    migrations::run(conn)?;
    migrations::current_version(conn)
}
