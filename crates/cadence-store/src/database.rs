// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background
//! thread. Do NOT create additional Connection instances for writes.

use std::path::Path;

use cadence_core::CadenceError;
use tracing::debug;

use crate::migrations;

/// Handle to the single SQLite connection for the bot.
///
/// Opening runs PRAGMA setup and all pending migrations. Query modules
/// accept `&Database` and go through [`Database::connection`].
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (creating if needed) the database at `path`, enable WAL mode,
    /// and run migrations.
    pub async fn open(path: &str) -> Result<Self, CadenceError> {
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| CadenceError::Storage {
                source: Box::new(e),
            })?;
        }

        // Migrations run on a short-lived synchronous connection before the
        // single async writer opens. This happens once at process start.
        {
            let mut migration_conn = rusqlite::Connection::open(path).map_err(map_tr_err)?;
            migrations::run_migrations(&mut migration_conn)?;
        }

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(map_tr_err)?;

        conn.call(|conn| {
            conn.execute_batch(
                "PRAGMA journal_mode = WAL;
                 PRAGMA synchronous = NORMAL;
                 PRAGMA foreign_keys = ON;
                 PRAGMA busy_timeout = 5000;",
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err::<tokio_rusqlite::Error>)?;

        debug!(path, "database opened, migrations applied");
        Ok(Self { conn })
    }

    /// The underlying tokio-rusqlite connection.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Checkpoint the WAL and close the connection.
    pub async fn close(&self) -> Result<(), CadenceError> {
        self.conn
            .call(|conn| {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err::<tokio_rusqlite::Error>)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}

/// Map any backend error into the workspace storage error.
pub fn map_tr_err<E>(e: E) -> CadenceError
where
    E: std::error::Error + Send + Sync + 'static,
{
    CadenceError::Storage {
        source: Box::new(e),
    }
}
