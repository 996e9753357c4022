//! Styled terminal output helpers.

use std::io::{self, Write};

use console::style;

// ============================================================================
// Styled output helpers
// ============================================================================

/// Print an info message to stderr.
pub fn info(message: &str) {
    eprintln!("{} {}", style("→").cyan(), message);
}

/// Print a success message to stderr.
pub fn success(message: &str) {
    eprintln!("{} {}", style("✓").green().bold(), message);
}

/// Print an error message to stderr.
pub fn error(message: &str) {
    eprintln!("{} {}", style("✗").red().bold(), message);
}

/// Print a warning message to stderr.
pub fn warning(message: &str) {
    eprintln!("{} {}", style("!").yellow().bold(), message);
}

/// Print a dimmed, indented message to stderr.
pub fn dim(message: &str) {
    eprintln!("  {}", style(message).dim());
}

/// Print a path output (like "-> /path/to/file").
pub fn path_output(path: &std::path::Path) {
    eprintln!("  {} {}", style("→").dim(), style(path.display()).dim());
}

// ============================================================================
// Table output
// ============================================================================

/// Column alignment.
#[derive(Clone, Copy, Default)]
pub enum Alignment {
    #[default]
    Left,
    Right,
}

/// A markdown table builder.
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    alignments: Vec<Alignment>,
}

impl Table {
    pub fn new(headers: &[&str]) -> Self {
        Self {
            headers: headers.iter().map(|h| (*h).to_string()).collect(),
            rows: Vec::new(),
            alignments: vec![Alignment::Left; headers.len()],
        }
    }

    pub fn with_alignments(mut self, alignments: Vec<Alignment>) -> Self {
        self.alignments = alignments;
        self
    }

    pub fn add_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    /// Render as a markdown table.
    pub fn render(&self) -> String {
        if self.headers.is_empty() {
            return String::new();
        }

        let mut widths: Vec<usize> = self.headers.iter().map(String::len).collect();
        for row in &self.rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.len());
            }
        }

        let mut output = String::new();

        output.push('|');
        for (header, &w) in self.headers.iter().zip(&widths) {
            output.push_str(&format!(" {header:^w$} |"));
        }
        output.push('\n');

        output.push('|');
        for (i, &width) in widths.iter().enumerate() {
            let sep = match self.alignments.get(i).copied().unwrap_or_default() {
                Alignment::Left => format!(":{:-<w$}|", "", w = width + 1),
                Alignment::Right => format!("{:-<w$}:|", "", w = width + 1),
            };
            output.push_str(&sep);
        }
        output.push('\n');

        for row in &self.rows {
            output.push('|');
            for (i, (cell, &w)) in row.iter().zip(&widths).enumerate() {
                let formatted = match self.alignments.get(i).copied().unwrap_or_default() {
                    Alignment::Left => format!(" {cell:<w$} |"),
                    Alignment::Right => format!(" {cell:>w$} |"),
                };
                output.push_str(&formatted);
            }
            output.push('\n');
        }

        output
    }

    /// Print the table to stdout.
    pub fn print(&self) {
        print!("{}", self.render());
        let _ = io::stdout().flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_render() {
        let mut table = Table::new(&["segment", "edges"])
            .with_alignments(vec![Alignment::Left, Alignment::Right]);
        table.add_row(vec!["1".to_string(), "120".to_string()]);

        assert_eq!(
            table.render(),
            "| segment | edges |\n\
             |:--------|------:|\n\
             | 1       |   120 |\n"
        );
    }
}
