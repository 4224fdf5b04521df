//! Count Query Rewriter
//!
//! Derives `SELECT COUNT(*) AS total_count FROM (<inner>) AS sub` from a `SafeQuery`
//! by peeling pagination and ordering clauses off the end of the statement.
//!
//! This is pattern matching, not parsing. Comments are dropped first. A clause is only
//! removed when it starts at parenthesis depth zero outside any quoted literal, so a
//! `LIMIT` or `ORDER BY` belonging to a trailing subquery or window is left in place.
//! Statements whose parentheses or quotes do not balance are refused.

use super::scan::{scan, strip_comments};
use super::{sealed, ReadOnlySql, SafeQuery};
use crate::error::{FinderError, Result};
use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;
use tracing::debug;

lazy_static! {
    // Pagination suffixes, peeled in this order before ORDER BY.
    static ref TRAILING_LIMIT: Regex =
        Regex::new(r"(?is)\s+limit\s+\S+(?:\s+offset\s+\S+|\s*,\s*\S+)?$").unwrap();
    static ref TRAILING_FETCH_FIRST: Regex =
        Regex::new(r"(?is)\s+fetch\s+first\s+\S+\s+rows\s+only$").unwrap();
    static ref TRAILING_OFFSET_ROWS: Regex =
        Regex::new(r"(?is)\s+offset\s+\S+\s+rows(?:\s+fetch\s+next\s+\S+\s+rows\s+only)?$").unwrap();
    // ORDER BY runs to the end of the statement once found at top level.
    static ref ORDER_BY: Regex = Regex::new(r"(?is)\s+order\s+by\s+").unwrap();
}

/// Total-count companion of a `SafeQuery`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountQuery {
    text: String,
}

impl CountQuery {
    /// Rewrite `query` into its count form.
    ///
    /// # Errors
    ///
    /// Returns `FinderError::CountRewrite` when the statement has unbalanced
    /// parentheses or an unterminated quote, since no trailing clause can then be
    /// isolated reliably.
    pub fn from_safe(query: &SafeQuery) -> Result<Self> {
        let uncommented = strip_comments(query.as_str().trim().trim_end_matches(';'));
        let body = uncommented.trim().trim_end_matches(';').trim_end();

        if !scan(body).is_top_level() {
            return Err(FinderError::CountRewrite(format!(
                "unbalanced parentheses or quotes in: {}",
                body
            )));
        }

        let mut inner = body.to_string();
        for pattern in [&*TRAILING_LIMIT, &*TRAILING_FETCH_FIRST, &*TRAILING_OFFSET_ROWS] {
            inner = strip_anchored(&inner, pattern);
        }
        inner = strip_order_by(&inner);

        debug!(inner = %inner, "Derived count query body");

        Ok(Self {
            text: format!("SELECT COUNT(*) AS total_count FROM ({}) AS sub", inner),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for CountQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl sealed::Sealed for CountQuery {}

impl ReadOnlySql for CountQuery {
    fn sql(&self) -> &str {
        &self.text
    }
}

/// Free-function form of `CountQuery::from_safe`.
pub fn to_count_query(query: &SafeQuery) -> Result<CountQuery> {
    CountQuery::from_safe(query)
}

fn is_top_level_at(sql: &str, position: usize) -> bool {
    scan(&sql[..position]).is_top_level()
}

/// Remove an end-anchored clause if it starts at top level.
fn strip_anchored(sql: &str, pattern: &Regex) -> String {
    match pattern.find(sql) {
        Some(m) if is_top_level_at(sql, m.start()) => sql[..m.start()].trim_end().to_string(),
        _ => sql.to_string(),
    }
}

/// Cut at the first top-level `ORDER BY`.
fn strip_order_by(sql: &str) -> String {
    ORDER_BY
        .find_iter(sql)
        .find(|m| is_top_level_at(sql, m.start()))
        .map(|m| sql[..m.start()].trim_end().to_string())
        .unwrap_or_else(|| sql.to_string())
}
