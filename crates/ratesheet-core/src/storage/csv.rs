//! CSV import of a single sheet

use crate::error::Result;
use ratesheet_engine::engine::{Cell, CellRef, CellValue, Grid, parse_number};
use std::path::Path;

/// Parse a CSV file into a grid named `sheet`. Row 1 is the first line.
pub fn parse_csv(path: &Path, sheet: &str) -> Result<Grid> {
    let content = std::fs::read_to_string(path)?;
    Ok(parse_csv_content(&content, sheet))
}

pub fn parse_csv_content(content: &str, sheet: &str) -> Grid {
    let mut grid = Grid::new(sheet);
    for (row_idx, line) in content.lines().enumerate() {
        for (col_idx, field) in parse_csv_line(line).into_iter().enumerate() {
            grid.insert(CellRef::new(col_idx + 1, row_idx + 1), parse_csv_field(&field));
        }
    }
    grid
}

/// Parse a single CSV line, handling quoted fields
pub(crate) fn parse_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut field_was_quoted = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                current.push(c);
            }
        } else {
            match c {
                '"' => {
                    in_quotes = true;
                    field_was_quoted = true;
                }
                ',' => {
                    let field = std::mem::take(&mut current);
                    fields.push(if field_was_quoted { field } else { field.trim().to_string() });
                    field_was_quoted = false;
                }
                _ => current.push(c),
            }
        }
    }
    if field_was_quoted {
        fields.push(current);
    } else {
        fields.push(current.trim().to_string());
    }
    fields
}

/// Parse a CSV field into a Cell
/// - Empty string -> Empty
/// - `=...` -> formula with no cached value
/// - Valid number -> Number (unless it has leading zeros like "007")
/// - Otherwise -> Text
pub(crate) fn parse_csv_field(field: &str) -> Cell {
    if field.is_empty() {
        return Cell::new_empty();
    }

    // Quoted fields keep their surrounding whitespace
    let trimmed = field.trim();
    if field != trimmed {
        return Cell::new_text(field);
    }

    if trimmed.starts_with('=') {
        return Cell::new_formula(trimmed, CellValue::Empty);
    }

    // Codes such as "007" stay text
    if trimmed.starts_with('0')
        && trimmed.len() > 1
        && !trimmed.starts_with("0.")
        && trimmed.chars().nth(1).is_some_and(|c| c.is_ascii_digit())
    {
        return Cell::new_text(trimmed);
    }

    if let Some(n) = parse_number(trimmed) {
        return Cell::new_number(n);
    }

    Cell::new_text(trimmed)
}
