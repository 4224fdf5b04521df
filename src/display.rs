//! Plain-text table rendering for the CLI.

use crate::execution::ResultRow;
use serde_json::Value;

/// Ingredients shown inline per row.
const INLINE_INGREDIENTS: usize = 6;

/// Render rows as a fixed-width table with a `-+-` separator line.
pub fn render_table(rows: &[ResultRow], max_rows: usize) -> String {
    let Some(first) = rows.first() else {
        return "(no results)".to_string();
    };

    let columns: Vec<&String> = first.keys().collect();
    let shown = &rows[..rows.len().min(max_rows)];

    let cells: Vec<Vec<String>> = shown
        .iter()
        .map(|row| {
            columns
                .iter()
                .map(|col| format_cell(col, row.get(col.as_str()).unwrap_or(&Value::Null)))
                .collect()
        })
        .collect();

    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, col)| {
            cells
                .iter()
                .map(|row| row[i].chars().count())
                .chain(std::iter::once(col.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut lines = Vec::with_capacity(cells.len() + 3);
    lines.push(join_padded(columns.iter().map(|c| c.as_str()), &widths));
    lines.push(
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-"),
    );
    for row in &cells {
        lines.push(join_padded(row.iter().map(String::as_str), &widths));
    }
    if rows.len() > max_rows {
        lines.push(format!("... ({} more rows)", rows.len() - max_rows));
    }
    lines.join("\n")
}

fn join_padded<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    cells
        .zip(widths)
        .map(|(cell, width)| {
            let pad = width.saturating_sub(cell.chars().count());
            format!("{}{}", cell, " ".repeat(pad))
        })
        .collect::<Vec<_>>()
        .join(" | ")
}

fn format_cell(column: &str, value: &Value) -> String {
    if column == "ingredients_json" {
        if let Some(text) = value.as_str() {
            if let Ok(items) = serde_json::from_str::<Vec<Value>>(text) {
                return inline_ingredients(&items);
            }
        }
    }
    match value {
        Value::Null => "None".to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) => inline_ingredients(items),
        other => other.to_string(),
    }
}

fn inline_ingredients(items: &[Value]) -> String {
    let names: Vec<String> = items
        .iter()
        .take(INLINE_INGREDIENTS)
        .map(|item| match item {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect();
    let mut text = names.join(", ");
    if items.len() > INLINE_INGREDIENTS {
        text.push_str(" …");
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> ResultRow {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_empty() {
        assert_eq!(render_table(&[], 10), "(no results)");
    }

    #[test]
    fn test_layout() {
        let rows = vec![
            row(json!({"id": 1, "title": "Soup", "ratings": null})),
            row(json!({"id": 22, "title": "Pad Thai", "ratings": 4.5})),
        ];
        let table = render_table(&rows, 10);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "id | title    | ratings");
        assert_eq!(lines[1], "---+----------+--------");
        assert_eq!(lines[2], "1  | Soup     | None   ");
        assert_eq!(lines[3], "22 | Pad Thai | 4.5    ");
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn test_truncation_footer() {
        let rows: Vec<ResultRow> = (0..5).map(|i| row(json!({"id": i}))).collect();
        let table = render_table(&rows, 2);
        assert!(table.ends_with("... (3 more rows)"));
        assert_eq!(table.lines().count(), 5);
    }

    #[test]
    fn test_ingredients_are_inlined() {
        let rows = vec![row(json!({
            "ingredients_json": r#"["a","b","c","d","e","f","g"]"#
        }))];
        let table = render_table(&rows, 10);
        assert!(table.contains("a, b, c, d, e, f …"));
    }
}
