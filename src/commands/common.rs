//! Shared helpers for command output

use chrono::{DateTime, Local, Utc};

/// Width of each column: the longest cell, header included.
pub fn column_widths(titles: &[&str], rows: &[Vec<String>]) -> Vec<usize> {
    let mut widths: Vec<usize> = titles.iter().map(|title| title.chars().count()).collect();
    for row in rows {
        for (col, cell) in row.iter().enumerate() {
            if col < widths.len() {
                widths[col] = widths[col].max(cell.chars().count());
            }
        }
    }
    widths
}

/// Print a plain table: header row, dash separator, then the data rows.
pub fn render_table(titles: &[&str], rows: &[Vec<String>]) {
    let widths = column_widths(titles, rows);

    let header: Vec<String> = titles
        .iter()
        .enumerate()
        .map(|(col, title)| format!("{title:<width$}", width = widths[col]))
        .collect();
    println!("{}", header.join(" | "));

    let separator: Vec<String> = widths.iter().map(|width| "-".repeat(*width)).collect();
    println!("{}", separator.join("-+-"));

    for row in rows {
        let cells: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(col, cell)| format!("{cell:<width$}", width = widths[col]))
            .collect();
        println!("{}", cells.join(" | ").trim_end());
    }
}

/// Local wall-clock rendering of an optional timestamp; "-" when absent.
pub fn format_timestamp(when: Option<DateTime<Utc>>) -> String {
    match when {
        Some(when) => when
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
        None => "-".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_widths_take_the_longest_cell() {
        let rows = vec![
            vec!["1".to_string(), "a-long-name".to_string()],
            vec!["12345".to_string(), "x".to_string()],
        ];
        assert_eq!(column_widths(&["PID", "Name"], &rows), vec![5, 11]);
    }

    #[test]
    fn test_format_timestamp_absent() {
        assert_eq!(format_timestamp(None), "-");
    }
}
