// SPDX-FileCopyrightText: 2026 Styleforge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background
//! thread. Do NOT create additional Connection instances for writes.

use styleforge_core::StyleforgeError;
use tracing::debug;

use crate::migrations;

/// Convert a tokio-rusqlite error into StyleforgeError::Storage.
pub fn map_tr_err<E>(e: tokio_rusqlite::Error<E>) -> StyleforgeError
where
    E: std::error::Error + Send + Sync + 'static,
{
    StyleforgeError::Storage {
        source: Box::new(e),
    }
}

/// SQLite database handle shared by all query modules.
///
/// Opening applies PRAGMAs and runs embedded migrations. The wrapped
/// tokio-rusqlite connection owns a single background thread; every `call`
/// runs to completion on that thread before the next starts, which is what
/// makes multi-statement closures atomic with respect to each other.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (or create) the database at `path`, apply PRAGMAs, and run
    /// migrations.
    pub async fn open(path: &str, wal_mode: bool) -> Result<Self, StyleforgeError> {
        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| StyleforgeError::Storage {
                source: Box::new(e),
            })?;

        let journal = if wal_mode { "WAL" } else { "DELETE" };
        let pragmas = format!(
            "PRAGMA journal_mode = {journal};
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;"
        );
        conn.call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute_batch(&pragmas)?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        conn.call(|conn| migrations::run_migrations(conn))
            .await
            .map_err(map_tr_err)?;

        debug!(path, wal_mode, "database opened, migrations applied");
        Ok(Self { conn })
    }

    /// Open an in-memory database with migrations applied (tests, dry runs).
    pub async fn open_in_memory() -> Result<Self, StyleforgeError> {
        let conn = tokio_rusqlite::Connection::open_in_memory()
            .await
            .map_err(|e| StyleforgeError::Storage {
                source: Box::new(e),
            })?;
        conn.call(|conn| migrations::run_migrations(conn))
            .await
            .map_err(map_tr_err)?;
        Ok(Self { conn })
    }

    /// Returns the underlying tokio-rusqlite connection.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Checkpoint the WAL and flush pending writes.
    pub async fn close(&self) -> Result<(), StyleforgeError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}
