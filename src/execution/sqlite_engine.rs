//! SQLite Engine
//!
//! Opens a fresh `query_only` connection for every call on the blocking pool. The
//! connection is dropped when the closure returns, on success or failure.

use crate::error::{FinderError, Result};
use crate::execution::engine::ExecutionEngine;
use crate::execution::result::{sqlite_value_to_json, ResultRow};
use crate::sql::ReadOnlySql;
use async_trait::async_trait;
use rusqlite::{params_from_iter, Connection, OpenFlags};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// SQLite caps bound parameters per statement; stay well below it.
const IMAGE_LOOKUP_CHUNK: usize = 500;

#[derive(Debug, Clone)]
pub struct SqliteEngine {
    db_path: PathBuf,
}

impl SqliteEngine {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
        }
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn connect(db_path: &Path) -> Result<Connection> {
        if !db_path.exists() {
            return Err(FinderError::Execution(format!(
                "DB not found at {}. Run `recipe-finder init-db` first.",
                db_path.display()
            )));
        }
        // Read-write open without CREATE so WAL databases stay readable; writes are
        // blocked by `query_only` and the per-statement readonly check.
        let conn = Connection::open_with_flags(
            db_path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| FinderError::Execution(format!("Failed to open database: {}", e)))?;
        conn.pragma_update(None, "query_only", true)
            .map_err(|e| FinderError::Execution(format!("Failed to set query_only: {}", e)))?;
        Ok(conn)
    }

    async fn run_blocking<T, F>(&self, work: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let conn = Self::connect(&db_path)?;
            work(&conn)
        })
        .await
        .map_err(|e| FinderError::Execution(format!("Query task failed: {}", e)))?
    }
}

/// Run one statement and collect every row, keeping projection order.
fn query_rows(conn: &Connection, sql: &str) -> Result<Vec<ResultRow>> {
    let mut stmt = conn
        .prepare(sql)
        .map_err(|e| FinderError::Execution(e.to_string()))?;

    if !stmt.readonly() {
        return Err(FinderError::Execution(format!(
            "Statement is not read-only: {}",
            sql
        )));
    }

    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let mut rows = stmt
        .query([])
        .map_err(|e| FinderError::Execution(e.to_string()))?;

    let mut out = Vec::new();
    while let Some(row) = rows
        .next()
        .map_err(|e| FinderError::Execution(e.to_string()))?
    {
        let mut record = ResultRow::new();
        for (idx, name) in columns.iter().enumerate() {
            let value = row
                .get_ref(idx)
                .map_err(|e| FinderError::Execution(e.to_string()))?;
            record.insert(name.clone(), sqlite_value_to_json(value));
        }
        out.push(record);
    }
    Ok(out)
}

fn lookup_images(conn: &Connection, ids: &[i64]) -> Result<HashMap<i64, Value>> {
    let mut images = HashMap::new();
    for chunk in ids.chunks(IMAGE_LOOKUP_CHUNK) {
        let placeholders = vec!["?"; chunk.len()].join(", ");
        let sql = format!("SELECT id, image FROM recipes WHERE id IN ({})", placeholders);
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| FinderError::Execution(e.to_string()))?;
        let mut rows = stmt
            .query(params_from_iter(chunk.iter()))
            .map_err(|e| FinderError::Execution(e.to_string()))?;
        while let Some(row) = rows
            .next()
            .map_err(|e| FinderError::Execution(e.to_string()))?
        {
            let id: i64 = row.get(0).map_err(|e| FinderError::Execution(e.to_string()))?;
            let image = row
                .get_ref(1)
                .map(sqlite_value_to_json)
                .map_err(|e| FinderError::Execution(e.to_string()))?;
            images.insert(id, image);
        }
    }
    Ok(images)
}

#[async_trait]
impl ExecutionEngine for SqliteEngine {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn execute(&self, query: &dyn ReadOnlySql) -> Result<Vec<ResultRow>> {
        let sql = query.sql().to_string();
        let start = Instant::now();
        debug!(sql = %sql, "Executing query");

        let rows = self.run_blocking(move |conn| query_rows(conn, &sql)).await?;

        info!(
            rows = rows.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Query executed"
        );
        Ok(rows)
    }

    async fn images_by_id(&self, ids: &[i64]) -> Result<HashMap<i64, Value>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let ids = ids.to_vec();
        self.run_blocking(move |conn| lookup_images(conn, &ids)).await
    }
}
