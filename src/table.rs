//! Plain-text rendering for dataset previews and schema summaries.

use std::fmt::Write as _;

use crate::{dataset::Dataset, schema::Schema};

const MAX_CELL_WIDTH: usize = 40;

pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let cleaned: Vec<Vec<String>> = rows
        .iter()
        .map(|row| row.iter().map(|cell| clean_cell(cell)).collect())
        .collect();
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in &cleaned {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut output = String::new();
    push_line(&mut output, headers, &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat((*w).max(3))).collect();
    push_line(&mut output, &rule, &widths);
    for row in &cleaned {
        push_line(&mut output, row, &widths);
    }
    output
}

fn push_line(output: &mut String, cells: &[String], widths: &[usize]) {
    let line = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join("  ");
    let _ = writeln!(output, "{}", line.trim_end());
}

fn clean_cell(value: &str) -> String {
    let flattened: String = value
        .chars()
        .map(|ch| if matches!(ch, '\n' | '\r' | '\t') { ' ' } else { ch })
        .collect();
    if flattened.chars().count() > MAX_CELL_WIDTH {
        let mut truncated: String = flattened.chars().take(MAX_CELL_WIDTH - 1).collect();
        truncated.push('…');
        truncated
    } else {
        flattened
    }
}

/// First `limit` rows of a dataset, headed by `name:type` labels.
pub fn render_dataset(dataset: &Dataset, limit: usize) -> String {
    let headers = dataset
        .columns()
        .iter()
        .map(|column| format!("{}:{}", column.name(), column.datatype()))
        .collect::<Vec<_>>();
    let rows = (0..dataset.row_count().min(limit))
        .map(|row| {
            dataset
                .columns()
                .iter()
                .map(|column| column.cells()[row].as_display())
                .collect()
        })
        .collect::<Vec<Vec<String>>>();
    render_table(&headers, &rows)
}

pub fn render_schema(schema: &Schema) -> String {
    let headers = ["#", "name", "type", "nulls"].map(String::from).to_vec();
    let rows = schema
        .columns
        .iter()
        .enumerate()
        .map(|(idx, column)| {
            vec![
                (idx + 1).to_string(),
                column.name.clone(),
                column.datatype.to_string(),
                column.null_count.to_string(),
            ]
        })
        .collect::<Vec<_>>();
    render_table(&headers, &rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_table_pads_columns_and_trims_line_ends() {
        let rendered = render_table(
            &["a".to_string(), "long".to_string()],
            &[vec!["value".to_string(), "x".to_string()]],
        );
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "a      long");
        assert_eq!(lines[1], "-----  ----");
        assert_eq!(lines[2], "value  x");
    }

    #[test]
    fn long_and_multiline_cells_are_flattened() {
        let long = "x".repeat(60);
        assert_eq!(clean_cell("a\nb").as_str(), "a b");
        assert_eq!(clean_cell(&long).chars().count(), MAX_CELL_WIDTH);
    }
}
