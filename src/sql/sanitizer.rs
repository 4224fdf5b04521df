//! SQL Sanitizer
//!
//! Turns raw model output into a `SafeQuery`: one statement, starting with `SELECT`,
//! terminated by exactly one semicolon.
//!
//! Known gap: the statement is cut at the first `;` even when that semicolon sits
//! inside a string literal. The cut can only shorten the text, never let a second
//! statement through.

use super::{sealed, ReadOnlySql};
use crate::error::{FinderError, Result};
use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;

lazy_static! {
    static ref FENCED_BLOCK: Regex = Regex::new(r"(?is)```(?:sql)?\s*(.*?)\s*```").unwrap();
}

/// A single read-only statement that passed `sanitize`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafeQuery {
    text: String,
}

impl SafeQuery {
    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

impl fmt::Display for SafeQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl sealed::Sealed for SafeQuery {}

impl ReadOnlySql for SafeQuery {
    fn sql(&self) -> &str {
        &self.text
    }
}

/// Extract one candidate statement from `text` and accept it only if it is a SELECT.
pub fn sanitize(text: &str) -> Result<SafeQuery> {
    let trimmed = text.trim();

    // Only the first fenced block counts; anything around it is commentary.
    let candidate = FENCED_BLOCK
        .captures(trimmed)
        .and_then(|caps| caps.get(1))
        .map(|inner| inner.as_str().trim())
        .unwrap_or(trimmed);

    let unquoted = candidate.replace('`', "");
    let (statement, terminated) = match unquoted.find(';') {
        Some(end) => (unquoted[..end].trim(), true),
        None => (unquoted.trim(), false),
    };

    if !starts_with_select(statement) {
        // Report the statement as it was cut from the input.
        let rejected = if terminated {
            format!("{};", statement)
        } else {
            statement.to_string()
        };
        return Err(FinderError::UnsafeQuery(rejected));
    }

    Ok(SafeQuery {
        text: format!("{};", statement),
    })
}

fn starts_with_select(statement: &str) -> bool {
    statement
        .get(..6)
        .map(|prefix| prefix.eq_ignore_ascii_case("SELECT"))
        .unwrap_or(false)
}
