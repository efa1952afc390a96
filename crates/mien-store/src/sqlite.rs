//! SQLite-backed document store.

use std::path::Path;

use async_trait::async_trait;
use rusqlite::types::{Value, ValueRef};
use rusqlite::OptionalExtension;
use tokio_rusqlite::Connection;

use crate::store::{DocumentStore, RawDocument, RawStoredValue, StoreError};

// The payload column deliberately has no declared type: SQLite then stores
// TEXT and BLOB values as-is per row, which is exactly the heterogeneity the
// two legacy clients left behind.
const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS faces (
    name TEXT PRIMARY KEY,
    payload NOT NULL,
    registered_at TEXT
)";

/// Face record store over a single SQLite database.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `path`.
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| StoreError::Unavailable(e.to_string()))?;
            }
        }
        let conn = Connection::open(path.to_owned()).await?;
        Self::init(conn).await
    }

    /// In-memory database, for tests.
    pub async fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().await?;
        Self::init(conn).await
    }

    async fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.call(|conn| {
            conn.execute(SCHEMA, [])?;
            Ok(())
        })
        .await?;
        Ok(Self { conn })
    }
}

fn to_sql_value(value: RawStoredValue) -> Value {
    match value {
        RawStoredValue::Binary(bytes) => Value::Blob(bytes),
        RawStoredValue::Text(text) => Value::Text(text),
    }
}

fn from_sql_ref(value: ValueRef<'_>) -> RawStoredValue {
    match value {
        ValueRef::Text(text) => {
            RawStoredValue::Text(String::from_utf8_lossy(text).into_owned())
        }
        ValueRef::Blob(bytes) => RawStoredValue::Binary(bytes.to_vec()),
        // Unreachable through this store's own writes; surface it as an
        // undecodable payload rather than failing the whole fetch.
        _ => RawStoredValue::Binary(Vec::new()),
    }
}

fn is_constraint_violation(err: &tokio_rusqlite::Error) -> bool {
    matches!(
        err,
        tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(failure, _))
            if failure.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn fetch_all(&self) -> Result<Vec<RawDocument>, StoreError> {
        let docs = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT name, payload, registered_at FROM faces ORDER BY rowid",
                )?;
                let rows = stmt.query_map([], |row| {
                    Ok(RawDocument {
                        name: row.get(0)?,
                        value: from_sql_ref(row.get_ref(1)?),
                        registered_at: row.get(2)?,
                    })
                })?;
                Ok(rows.collect::<Result<Vec<_>, _>>()?)
            })
            .await?;
        Ok(docs)
    }

    async fn fetch_one(&self, name: &str) -> Result<Option<RawStoredValue>, StoreError> {
        let name = name.to_owned();
        let value = self
            .conn
            .call(move |conn| {
                let value = conn
                    .query_row(
                        "SELECT payload FROM faces WHERE name = ?1",
                        [&name],
                        |row| Ok(from_sql_ref(row.get_ref(0)?)),
                    )
                    .optional()?;
                Ok(value)
            })
            .await?;
        Ok(value)
    }

    async fn insert(&self, name: &str, value: RawStoredValue) -> Result<(), StoreError> {
        let key = name.to_owned();
        let registered_at = chrono::Utc::now().to_rfc3339();
        let result = self
            .conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO faces (name, payload, registered_at) VALUES (?1, ?2, ?3)",
                    rusqlite::params![key, to_sql_value(value), registered_at],
                )?;
                Ok(())
            })
            .await;
        result.map_err(|err| {
            if is_constraint_violation(&err) {
                StoreError::DuplicateName(name.to_owned())
            } else {
                err.into()
            }
        })
    }

    async fn update(&self, name: &str, value: RawStoredValue) -> Result<(), StoreError> {
        let key = name.to_owned();
        let changed = self
            .conn
            .call(move |conn| {
                let changed = conn.execute(
                    "UPDATE faces SET payload = ?2 WHERE name = ?1",
                    rusqlite::params![key, to_sql_value(value)],
                )?;
                Ok(changed)
            })
            .await?;
        if changed == 0 {
            return Err(StoreError::NotFound(name.to_owned()));
        }
        Ok(())
    }

    async fn remove(&self, name: &str) -> Result<bool, StoreError> {
        let key = name.to_owned();
        let deleted = self
            .conn
            .call(move |conn| {
                let deleted = conn.execute("DELETE FROM faces WHERE name = ?1", [&key])?;
                Ok(deleted)
            })
            .await?;
        Ok(deleted > 0)
    }
}
