//! Recipe table contract
//!
//! Single source for the `recipes` table: the oracle prompt and the loader DDL are
//! both generated from `RECIPE_COLUMNS`.

/// Name of the only queryable table.
pub const TABLE_NAME: &str = "recipes";

/// A column of the `recipes` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub sql_type: &'static str,
    /// Constraint text as it appears in the contract (`PRIMARY KEY`, `NOT NULL`, or empty).
    pub constraint: &'static str,
}

pub const RECIPE_COLUMNS: &[Column] = &[
    Column { name: "id", sql_type: "INTEGER", constraint: "PRIMARY KEY" },
    Column { name: "title", sql_type: "TEXT", constraint: "NOT NULL" },
    Column { name: "cook_time", sql_type: "INTEGER", constraint: "" },
    Column { name: "prep_time", sql_type: "INTEGER", constraint: "" },
    Column { name: "ratings", sql_type: "REAL", constraint: "" },
    Column { name: "cuisine", sql_type: "TEXT", constraint: "" },
    Column { name: "category", sql_type: "TEXT", constraint: "" },
    Column { name: "author", sql_type: "TEXT", constraint: "" },
    Column { name: "image", sql_type: "TEXT", constraint: "" },
    Column { name: "ingredients_json", sql_type: "TEXT", constraint: "NOT NULL" },
];

/// Text columns the model may compare case-insensitively.
pub const TEXT_FILTER_COLUMNS: &[&str] = &["title", "cuisine", "category", "author"];

/// Schema description embedded in the oracle's system prompt.
pub fn describe_table() -> String {
    let columns: Vec<String> = RECIPE_COLUMNS
        .iter()
        .map(|c| {
            if c.constraint.is_empty() {
                format!("  {} {}", c.name, c.sql_type)
            } else {
                format!("  {} {} {}", c.name, c.sql_type, c.constraint)
            }
        })
        .collect();
    format!("Table: {}(\n{}\n)", TABLE_NAME, columns.join(",\n"))
}

/// DDL used by the loader. Adds `AUTOINCREMENT` and a unique title so repeated
/// imports do not duplicate rows.
pub fn create_table_sql() -> String {
    let columns: Vec<String> = RECIPE_COLUMNS
        .iter()
        .map(|c| match c.name {
            "id" => "  id INTEGER PRIMARY KEY AUTOINCREMENT".to_string(),
            "title" => "  title TEXT NOT NULL UNIQUE".to_string(),
            _ if c.constraint.is_empty() => format!("  {} {}", c.name, c.sql_type),
            _ => format!("  {} {} {}", c.name, c.sql_type, c.constraint),
        })
        .collect();
    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n{}\n)",
        TABLE_NAME,
        columns.join(",\n")
    )
}

/// Secondary indexes created alongside the table.
pub const INDEX_SQL: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_recipes_title ON recipes(title)",
    "CREATE INDEX IF NOT EXISTS idx_recipes_category ON recipes(category)",
    "CREATE INDEX IF NOT EXISTS idx_recipes_cuisine ON recipes(cuisine)",
];
