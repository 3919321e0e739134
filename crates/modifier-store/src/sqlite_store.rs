//! SQLite-backed modifier audit log.
//!
//! All DB operations are dispatched via `tokio::task::spawn_blocking` so the
//! Tokio worker thread is never stalled by synchronous SQLite I/O. Each
//! `append` is its own transaction; the autoincrement rowid records append
//! order and breaks timestamp ties at resolution time.

use async_trait::async_trait;
use fluxgate_core::{ColumnModifier, ModifierKind};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::{Arc, Mutex};

use super::{ModifierStore, StoreError, StoreResult};

// ---------------------------------------------------------------------------
// Helper macro for spawn_blocking dispatch.
// ---------------------------------------------------------------------------

/// Spawn a blocking closure that receives a locked `&Connection`.
/// Returns `StoreResult<T>` where `T: Send + 'static`.
macro_rules! db {
    ($conn:expr, $body:expr) => {{
        let conn = Arc::clone(&$conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock().unwrap();
            ($body)(&*guard)
        })
        .await
        .map_err(|e| StoreError::Database(format!("spawn_blocking panic: {e}")))?
    }};
}

fn db_err(e: rusqlite::Error) -> StoreError {
    StoreError::Database(e.to_string())
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Durable modifier log on a single SQLite file.
///
/// The connection lives behind an `Arc<Mutex<Connection>>` so it can be sent
/// into blocking tasks; concurrent async callers queue on the mutex while
/// SQLite's WAL keeps readers cheap.
pub struct SqliteModifierStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteModifierStore {
    /// Create or open the store at a file path.
    pub fn new(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path.as_ref()).map_err(db_err)?;
        Self::init(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create an in-memory store (for testing).
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        Self::init(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn init(conn: &Connection) -> StoreResult<()> {
        conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
            PRAGMA busy_timeout=5000;

            CREATE TABLE IF NOT EXISTS column_modifiers (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                event_type  TEXT    NOT NULL,
                column_name TEXT    NOT NULL,
                kind        TEXT    NOT NULL,
                ts_ms       INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_modifier_key_ts
                ON column_modifiers(event_type, column_name, ts_ms DESC);
            "#,
        )
        .map_err(db_err)?;
        Ok(())
    }
}

fn parse_kind(raw: &str) -> StoreResult<ModifierKind> {
    ModifierKind::parse(raw).ok_or_else(|| {
        StoreError::Data(format!("unknown modifier kind in log: {raw}"))
    })
}

// ---------------------------------------------------------------------------
// ModifierStore impl
// ---------------------------------------------------------------------------

#[async_trait]
impl ModifierStore for SqliteModifierStore {
    async fn append(&self, modifier: &ColumnModifier) -> StoreResult<()> {
        let m = modifier.clone();
        db!(self.conn, move |conn: &Connection| {
            conn.execute(
                "INSERT INTO column_modifiers \
                 (event_type, column_name, kind, ts_ms) \
                 VALUES (?1, ?2, ?3, ?4)",
                params![m.event_type, m.column, m.kind.as_str(), m.ts_ms],
            )
            .map_err(db_err)?;
            Ok(())
        })
    }

    async fn resolve_effective(
        &self,
        event_type: &str,
        column: &str,
    ) -> StoreResult<Option<ModifierKind>> {
        let (event_type, column) = (event_type.to_owned(), column.to_owned());
        let raw: Option<String> = db!(self.conn, move |conn: &Connection| {
            conn.query_row(
                "SELECT kind FROM column_modifiers \
                 WHERE event_type = ?1 AND column_name = ?2 \
                 ORDER BY ts_ms DESC, id DESC LIMIT 1",
                params![event_type, column],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_err)
        })?;

        raw.map(|r| parse_kind(&r)).transpose()
    }

    async fn history(
        &self,
        event_type: &str,
        column: &str,
    ) -> StoreResult<Vec<ColumnModifier>> {
        let (event_type, column) = (event_type.to_owned(), column.to_owned());
        let rows: Vec<(String, String, String, i64)> =
            db!(self.conn, move |conn: &Connection| -> StoreResult<
                Vec<(String, String, String, i64)>,
            > {
                let mut stmt = conn
                    .prepare(
                        "SELECT event_type, column_name, kind, ts_ms \
                         FROM column_modifiers \
                         WHERE event_type = ?1 AND column_name = ?2 \
                         ORDER BY ts_ms DESC, id DESC",
                    )
                    .map_err(db_err)?;
                let rows = stmt
                    .query_map(params![event_type, column], |row| {
                        Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
                    })
                    .map_err(db_err)?;
                rows.map(|r| r.map_err(db_err)).collect()
            })?;

        rows.into_iter()
            .map(|(event_type, column, kind, ts_ms)| {
                Ok(ColumnModifier::new(
                    event_type,
                    column,
                    parse_kind(&kind)?,
                    ts_ms,
                ))
            })
            .collect()
    }

    async fn event_types(&self) -> StoreResult<Vec<String>> {
        db!(self.conn, move |conn: &Connection| {
            let mut stmt = conn
                .prepare(
                    "SELECT DISTINCT event_type FROM column_modifiers \
                     ORDER BY event_type",
                )
                .map_err(db_err)?;
            let rows = stmt.query_map([], |row| row.get(0)).map_err(db_err)?;
            rows.map(|r| r.map_err(db_err)).collect()
        })
    }

    async fn columns(&self, event_type: &str) -> StoreResult<Vec<String>> {
        let event_type = event_type.to_owned();
        db!(self.conn, move |conn: &Connection| {
            let mut stmt = conn
                .prepare(
                    "SELECT DISTINCT column_name FROM column_modifiers \
                     WHERE event_type = ?1 ORDER BY column_name",
                )
                .map_err(db_err)?;
            let rows = stmt
                .query_map(params![event_type], |row| row.get(0))
                .map_err(db_err)?;
            rows.map(|r| r.map_err(db_err)).collect()
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
