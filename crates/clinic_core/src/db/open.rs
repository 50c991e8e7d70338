//! Storage handle and connection bootstrap.
//!
//! # Responsibility
//! - Create the database file, enable WAL and apply migrations once.
//! - Hand out configured connections, one per repository unit of work.
//!
//! # Invariants
//! - Returned connections have `foreign_keys=ON` and the configured busy
//!   timeout, so writers queue on the SQLite lock instead of failing fast.
//! - A `Database` value only exists for a fully migrated file.

use super::migrations::apply_migrations;
use super::{DbError, DbResult};
use crate::config::DatabaseConfig;
use log::{debug, error, info};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Cloneable handle to one migrated SQLite database.
///
/// Owned by the wiring layer and passed into each repository constructor.
#[derive(Debug, Clone)]
pub struct Database {
    inner: Arc<DatabaseSettings>,
}

#[derive(Debug)]
struct DatabaseSettings {
    path: PathBuf,
    busy_timeout: Duration,
}

impl Database {
    /// Opens (creating when missing) the configured database and migrates it.
    ///
    /// # Side effects
    /// - Creates the parent directory of the database file.
    /// - Switches the file to WAL journal mode.
    /// - Emits `db_open` logging events with duration and status.
    pub fn open(config: &DatabaseConfig) -> DbResult<Self> {
        let started_at = Instant::now();
        info!("event=db_open module=db status=start");

        let database = Self {
            inner: Arc::new(DatabaseSettings {
                path: config.path.clone(),
                busy_timeout: config.busy_timeout(),
            }),
        };

        match database.bootstrap() {
            Ok(()) => {
                info!(
                    "event=db_open module=db status=ok duration_ms={}",
                    started_at.elapsed().as_millis()
                );
                Ok(database)
            }
            Err(err) => {
                error!(
                    "event=db_open module=db status=error duration_ms={} error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }

    /// Opens a new configured connection to the migrated database.
    pub fn connect(&self) -> DbResult<Connection> {
        let conn = Connection::open(&self.inner.path)?;
        configure_connection(&conn, self.inner.busy_timeout)?;
        Ok(conn)
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    fn bootstrap(&self) -> DbResult<()> {
        if let Some(parent) = self.inner.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|source| DbError::CreateDir {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        let mut conn = self.connect()?;
        let journal_mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        debug!("event=db_open module=db status=configured journal_mode={journal_mode}");
        apply_migrations(&mut conn)
    }
}

fn configure_connection(conn: &Connection, busy_timeout: Duration) -> DbResult<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(busy_timeout)?;
    Ok(())
}
