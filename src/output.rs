//! Output formatting and table rendering
//!
//! `inspect` and `verify` print either a human-readable table or JSON.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// How command results are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!(
                "Unknown output format: {s}. Valid formats: text, json"
            )),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutputFormat::Text => "text",
            OutputFormat::Json => "json",
        })
    }
}

/// A formatted table for terminal output
#[derive(Debug, Clone)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    column_widths: Vec<usize>,
}

impl Table {
    /// Render the table as a string.
    pub fn render(&self) -> String {
        if self.headers.is_empty() {
            return String::new();
        }

        let mut output = String::new();
        output.push_str(&self.render_border('┌', '┬', '┐'));
        output.push_str(&self.render_row(&self.headers));
        output.push_str(&self.render_border('├', '┼', '┤'));
        for row in &self.rows {
            output.push_str(&self.render_row(row));
        }
        output.push_str(&self.render_border('└', '┴', '┘'));
        output
    }

    fn render_border(&self, left: char, mid: char, right: char) -> String {
        let mut line = String::new();
        line.push(left);
        for (i, width) in self.column_widths.iter().enumerate() {
            line.push_str(&"─".repeat(*width + 2));
            if i < self.column_widths.len() - 1 {
                line.push(mid);
            }
        }
        line.push(right);
        line.push('\n');
        line
    }

    fn render_row(&self, values: &[String]) -> String {
        let mut line = String::new();
        line.push('│');
        for (i, width) in self.column_widths.iter().enumerate() {
            let value = values.get(i).map(String::as_str).unwrap_or("");
            line.push(' ');
            line.push_str(&format!("{value:width$}", width = *width));
            line.push(' ');
            if i < self.column_widths.len() - 1 {
                line.push('│');
            }
        }
        line.push('│');
        line.push('\n');
        line
    }
}

/// Builder for creating tables
#[derive(Debug, Default)]
pub struct TableBuilder {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn headers(mut self, headers: Vec<impl Into<String>>) -> Self {
        self.headers = headers.into_iter().map(Into::into).collect();
        self
    }

    pub fn row(mut self, row: Vec<impl Into<String>>) -> Self {
        self.rows.push(row.into_iter().map(Into::into).collect());
        self
    }

    pub fn build(self) -> Table {
        let mut column_widths: Vec<usize> =
            self.headers.iter().map(|h| h.chars().count()).collect();

        for row in &self.rows {
            for (i, cell) in row.iter().enumerate() {
                if i < column_widths.len() {
                    column_widths[i] = column_widths[i].max(cell.chars().count());
                }
            }
        }

        Table {
            headers: self.headers,
            rows: self.rows,
            column_widths,
        }
    }
}

/// Format bytes as human-readable size.
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}

/// Format a large number with commas.
pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

/// Pretty JSON for any serializable value
pub fn to_json<T: Serialize>(value: &T) -> crate::Result<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| crate::Error::Serialization(format!("JSON output failed: {e}")))
}
