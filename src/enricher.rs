//! Result Enricher
//!
//! Best-effort post-processing of result rows. Nothing here can fail a request:
//! every problem degrades to a null image or an empty preview and is logged.

use crate::execution::{ExecutionEngine, ResultRow};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Number of ingredients kept in `ingredients_preview`.
pub const INGREDIENT_PREVIEW_LEN: usize = 8;

pub struct ResultEnricher {
    engine: Arc<dyn ExecutionEngine>,
}

impl ResultEnricher {
    pub fn new(engine: Arc<dyn ExecutionEngine>) -> Self {
        Self { engine }
    }

    /// Fill in `image` and `ingredients_preview` in place.
    pub async fn enrich(&self, rows: &mut [ResultRow]) {
        self.attach_images(rows).await;
        attach_ingredient_previews(rows);
    }

    /// One batched lookup when the projection has `id` but no `image`. Decided on the
    /// first row only; rows of a result set share their columns.
    async fn attach_images(&self, rows: &mut [ResultRow]) {
        let needs_images = rows
            .first()
            .map(|row| row.contains_key("id") && !row.contains_key("image"))
            .unwrap_or(false);
        if !needs_images {
            return;
        }

        let mut ids: Vec<i64> = rows
            .iter()
            .filter_map(|row| row.get("id").and_then(id_as_i64))
            .collect();
        ids.sort_unstable();
        ids.dedup();

        let images = match self.engine.images_by_id(&ids).await {
            Ok(images) => images,
            Err(e) => {
                warn!(error = %e, ids = ids.len(), "Image lookup failed, images left empty");
                HashMap::new()
            }
        };
        debug!(requested = ids.len(), found = images.len(), "Attached images");

        for row in rows.iter_mut() {
            let image = row
                .get("id")
                .and_then(id_as_i64)
                .and_then(|id| images.get(&id).cloned())
                .unwrap_or(Value::Null);
            row.insert("image".to_string(), image);
        }
    }
}

/// Expand `ingredients_json` into a bounded `ingredients_preview` on every row that has one.
pub fn attach_ingredient_previews(rows: &mut [ResultRow]) {
    for row in rows.iter_mut() {
        let preview = match row.get("ingredients_json") {
            None | Some(Value::Null) => continue,
            Some(Value::String(raw)) if raw.is_empty() => continue,
            Some(raw) => ingredient_preview(raw).unwrap_or_else(|| {
                warn!(id = ?row.get("id"), "Unparseable ingredients_json, using empty preview");
                Vec::new()
            }),
        };
        row.insert("ingredients_preview".to_string(), Value::Array(preview));
    }
}

/// First `INGREDIENT_PREVIEW_LEN` entries of a serialized JSON array, or `None` if
/// the value is not a JSON array string.
pub fn ingredient_preview(raw: &Value) -> Option<Vec<Value>> {
    let text = raw.as_str()?;
    let items: Vec<Value> = serde_json::from_str(text).ok()?;
    Some(items.into_iter().take(INGREDIENT_PREVIEW_LEN).collect())
}

fn id_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
