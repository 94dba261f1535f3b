//! Execution Engine
//!
//! Runs the final query against the store and normalizes the rows into a
//! [`TabularResult`]. The store connection lives for the whole process and is
//! serialized behind a mutex; statements run on tokio's blocking pool.

use crate::error::{Result, Text2SqlError};
use async_trait::async_trait;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, info};

pub type Row = serde_json::Map<String, serde_json::Value>;

/// Column names plus rows keyed by column name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TabularResult {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    pub row_count: usize,
}

impl TabularResult {
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        let row_count = rows.len();
        Self {
            columns,
            rows,
            row_count,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }
}

/// Relational store the pipeline executes against.
#[async_trait]
pub trait QueryStore: Send + Sync {
    /// Execute one statement and collect every row.
    async fn execute(&self, sql: &str) -> Result<TabularResult>;

    /// Whether a trivial query currently succeeds.
    async fn ping(&self) -> bool;

    /// Where the data lives, for health reporting.
    fn location(&self) -> String;
}

pub struct SqliteStore {
    path: PathBuf,
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open the database file at `path`.
    pub fn open(path: impl AsRef<Path>, read_only: bool) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let flags = if read_only {
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX
        } else {
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX
        };
        let conn = Connection::open_with_flags(&path, flags).map_err(|e| {
            Text2SqlError::Store(format!("Failed to open {}: {}", path.display(), e))
        })?;
        info!("Opened SQLite store at {} (read_only={})", path.display(), read_only);
        Ok(Self::from_connection(conn, path))
    }

    /// Wrap an already open connection, e.g. an in-memory database.
    pub fn from_connection(conn: Connection, path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    fn run_blocking(conn: &Mutex<Connection>, sql: &str) -> Result<TabularResult> {
        let conn = conn
            .lock()
            .map_err(|_| Text2SqlError::Internal("store connection lock poisoned".to_string()))?;
        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| Text2SqlError::Execution(e.to_string()))?;

        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
        let mut rows = Vec::new();
        let mut cursor = stmt
            .query([])
            .map_err(|e| Text2SqlError::Execution(e.to_string()))?;

        while let Some(row) = cursor
            .next()
            .map_err(|e| Text2SqlError::Execution(e.to_string()))?
        {
            let mut record = Row::new();
            for (idx, name) in columns.iter().enumerate() {
                let value = row
                    .get_ref(idx)
                    .map_err(|e| Text2SqlError::Execution(e.to_string()))?;
                record.insert(name.clone(), value_to_json(value));
            }
            rows.push(record);
        }

        Ok(TabularResult::new(columns, rows))
    }
}

#[async_trait]
impl QueryStore for SqliteStore {
    async fn execute(&self, sql: &str) -> Result<TabularResult> {
        let conn = Arc::clone(&self.conn);
        let sql = sql.to_string();
        let started = Instant::now();

        let result = tokio::task::spawn_blocking(move || Self::run_blocking(&conn, &sql))
            .await
            .map_err(task_failure)??;

        debug!(
            "Query returned {} rows in {}ms",
            result.row_count,
            started.elapsed().as_millis()
        );
        Ok(result)
    }

    async fn ping(&self) -> bool {
        self.execute("SELECT 1;").await.is_ok()
    }

    fn location(&self) -> String {
        std::fs::canonicalize(&self.path)
            .or_else(|_| std::env::current_dir().map(|cwd| cwd.join(&self.path)))
            .unwrap_or_else(|_| self.path.clone())
            .display()
            .to_string()
    }
}

fn task_failure(err: tokio::task::JoinError) -> Text2SqlError {
    Text2SqlError::Internal(format!("execution task failed: {}", err))
}

fn value_to_json(value: ValueRef<'_>) -> serde_json::Value {
    match value {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Integer(i) => serde_json::Value::Number(i.into()),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        ValueRef::Text(bytes) => {
            serde_json::Value::String(String::from_utf8_lossy(bytes).into_owned())
        }
        ValueRef::Blob(bytes) => {
            serde_json::Value::String(bytes.iter().map(|b| format!("{:02x}", b)).collect())
        }
    }
}
