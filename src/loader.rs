//! Recipe Loader - creates the SQLite schema and bulk-imports a JSON recipe dump
//!
//! The import only runs against an empty table, so re-running it is a no-op unless
//! `force` clears the table first.

use crate::error::{FinderError, Result};
use crate::schema::{create_table_sql, INDEX_SQL};
use rusqlite::{named_params, Connection};
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Outcome of `RecipeLoader::import`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    /// Rows present before the import (after clearing, when forced).
    pub existing: i64,
    /// Rows actually added.
    pub inserted: i64,
    /// Rows present afterwards.
    pub total: i64,
    /// Whether existing rows were deleted first.
    pub cleared: bool,
}

/// One recipe normalized to the table's column types.
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeRecord {
    pub title: Option<String>,
    pub cook_time: Option<i64>,
    pub prep_time: Option<i64>,
    pub ratings: Option<f64>,
    pub cuisine: Option<String>,
    pub category: Option<String>,
    pub author: Option<String>,
    pub image: Option<String>,
    pub ingredients_json: String,
}

pub struct RecipeLoader {
    db_path: PathBuf,
    conn: Connection,
}

impl RecipeLoader {
    /// Open (or create) the database and make sure the schema exists.
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref().to_path_buf();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(&db_path)
            .map_err(|e| FinderError::Loader(format!("Failed to open database: {}", e)))?;
        let mode: String = conn
            .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))
            .map_err(|e| FinderError::Loader(format!("Failed to enable WAL: {}", e)))?;
        debug!(journal_mode = %mode, "Opened recipe database");
        conn.pragma_update(None, "foreign_keys", "ON")
            .map_err(|e| FinderError::Loader(format!("Failed to enable foreign keys: {}", e)))?;

        let loader = Self { db_path, conn };
        loader.create_schema()?;
        Ok(loader)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn create_schema(&self) -> Result<()> {
        self.conn
            .execute(&create_table_sql(), [])
            .map_err(|e| FinderError::Loader(format!("Failed to create table: {}", e)))?;
        for sql in INDEX_SQL {
            self.conn
                .execute(sql, [])
                .map_err(|e| FinderError::Loader(format!("Failed to create index: {}", e)))?;
        }
        Ok(())
    }

    pub fn row_count(&self) -> Result<i64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM recipes", [], |row| row.get(0))
            .map_err(|e| FinderError::Loader(format!("Failed to count rows: {}", e)))
    }

    /// Import `json_path` unless the table already has rows; `force` clears it first.
    pub fn import(&mut self, json_path: impl AsRef<Path>, force: bool) -> Result<ImportReport> {
        let mut existing = self.row_count()?;
        let mut cleared = false;

        if force && existing > 0 {
            self.conn
                .execute("DELETE FROM recipes", [])
                .map_err(|e| FinderError::Loader(format!("Failed to clear table: {}", e)))?;
            warn!(rows = existing, "Cleared existing rows (force mode)");
            existing = 0;
            cleared = true;
        }

        if existing > 0 {
            info!(rows = existing, "Table already populated, nothing to do");
            return Ok(ImportReport {
                existing,
                inserted: 0,
                total: existing,
                cleared,
            });
        }

        let records = read_recipes(json_path.as_ref())?;
        self.insert_all(&records)?;

        let total = self.row_count()?;
        let report = ImportReport {
            existing,
            inserted: total - existing,
            total,
            cleared,
        };
        info!(
            inserted = report.inserted,
            total = report.total,
            db = %self.db_path.display(),
            "Imported recipes"
        );
        Ok(report)
    }

    /// `INSERT OR IGNORE` every record in one transaction; duplicate titles are skipped.
    pub fn insert_all(&mut self, records: &[RecipeRecord]) -> Result<()> {
        let tx = self
            .conn
            .transaction()
            .map_err(|e| FinderError::Loader(format!("Failed to start transaction: {}", e)))?;
        {
            let mut stmt = tx
                .prepare(
                    r#"
                    INSERT OR IGNORE INTO recipes
                    (title, cook_time, prep_time, ratings, cuisine, category, author, image, ingredients_json)
                    VALUES
                    (:title, :cook_time, :prep_time, :ratings, :cuisine, :category, :author, :image, :ingredients_json)
                    "#,
                )
                .map_err(|e| FinderError::Loader(format!("Failed to prepare insert: {}", e)))?;

            for record in records {
                stmt.execute(named_params! {
                    ":title": record.title,
                    ":cook_time": record.cook_time,
                    ":prep_time": record.prep_time,
                    ":ratings": record.ratings,
                    ":cuisine": record.cuisine,
                    ":category": record.category,
                    ":author": record.author,
                    ":image": record.image,
                    ":ingredients_json": record.ingredients_json,
                })
                .map_err(|e| FinderError::Loader(format!("Failed to insert recipe: {}", e)))?;
            }
        }
        tx.commit()
            .map_err(|e| FinderError::Loader(format!("Failed to commit transaction: {}", e)))?;
        Ok(())
    }
}

/// Read a JSON array of recipe objects and normalize each one.
pub fn read_recipes(json_path: &Path) -> Result<Vec<RecipeRecord>> {
    if !json_path.exists() {
        return Err(FinderError::Loader(format!(
            "JSON file not found at: {}",
            json_path.display()
        )));
    }
    let content = std::fs::read_to_string(json_path)?;
    let data: Value = serde_json::from_str(&content)?;
    let items = data.as_array().ok_or_else(|| {
        FinderError::Loader("Expected a JSON array of recipe objects.".to_string())
    })?;
    Ok(items.iter().map(normalize).collect())
}

/// Map a raw recipe object onto the table's column types.
pub fn normalize(recipe: &Value) -> RecipeRecord {
    let ingredients = recipe
        .get("ingredients")
        .cloned()
        .unwrap_or_else(|| Value::Array(Vec::new()));

    RecipeRecord {
        title: as_text(recipe.get("title")),
        cook_time: as_int(recipe.get("cook_time")),
        prep_time: as_int(recipe.get("prep_time")),
        ratings: as_float(recipe.get("ratings")),
        cuisine: as_text(recipe.get("cuisine")),
        category: as_text(recipe.get("category")),
        author: as_text(recipe.get("author")),
        image: as_text(recipe.get("image")),
        ingredients_json: ingredients.to_string(),
    }
}

fn as_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Integers, integral floats and numeric strings; blank or invalid becomes `None`.
fn as_int(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_float(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}
