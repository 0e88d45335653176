//! Text table rendering for `show_query`.

use rusqlite::types::Value;

use crate::raw::RawRow;

#[derive(Debug, Default)]
pub struct QueryResultBuilder;

impl QueryResultBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Render rows as a bordered table. Column headers come from the first row;
    /// an empty row set renders as an empty string.
    pub fn build(&self, rows: &[RawRow]) -> String {
        let Some(first) = rows.first() else {
            return String::new();
        };

        let headers: Vec<String> = first.columns().map(String::from).collect();
        let cells: Vec<Vec<String>> = rows
            .iter()
            .map(|row| row.values().map(render_value).collect())
            .collect();

        let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
        for line in &cells {
            for (width, cell) in widths.iter_mut().zip(line) {
                *width = (*width).max(cell.chars().count());
            }
        }

        let border = border(&widths);
        let mut out = String::new();
        out.push_str(&border);
        out.push_str(&line(&headers, &widths));
        out.push_str(&border);
        for cell_line in &cells {
            out.push_str(&line(cell_line, &widths));
        }
        out.push_str(&border);
        out
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Real(f) => f.to_string(),
        Value::Text(s) => s.clone(),
        Value::Blob(b) => format!("<blob {} bytes>", b.len()),
    }
}

fn border(widths: &[usize]) -> String {
    let mut out = String::from("+");
    for width in widths {
        out.push_str(&"-".repeat(width + 2));
        out.push('+');
    }
    out.push('\n');
    out
}

fn line(cells: &[String], widths: &[usize]) -> String {
    let mut out = String::from("|");
    for (cell, width) in cells.iter().zip(widths) {
        let pad = width - cell.chars().count();
        out.push(' ');
        out.push_str(cell);
        out.push_str(&" ".repeat(pad + 1));
        out.push('|');
    }
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_renders_bordered_table() {
        let rows = vec![
            RawRow::new(vec![
                ("ID".to_string(), Value::Integer(1)),
                ("NAME".to_string(), Value::Text("alice".to_string())),
            ]),
            RawRow::new(vec![
                ("ID".to_string(), Value::Integer(20)),
                ("NAME".to_string(), Value::Null),
            ]),
        ];

        let expected = "\
+----+-------+
| ID | NAME  |
+----+-------+
| 1  | alice |
| 20 | NULL  |
+----+-------+
";
        assert_eq!(QueryResultBuilder::new().build(&rows), expected);
    }

    #[test]
    fn test_build_empty_rowset() {
        assert_eq!(QueryResultBuilder::new().build(&[]), "");
    }

    #[test]
    fn test_blob_and_real_cells() {
        let rows = vec![RawRow::new(vec![
            ("b".to_string(), Value::Blob(vec![1, 2, 3])),
            ("r".to_string(), Value::Real(0.25)),
        ])];
        let out = QueryResultBuilder::new().build(&rows);
        assert!(out.contains("| <blob 3 bytes> | 0.25 |"), "{out}");
    }
}
