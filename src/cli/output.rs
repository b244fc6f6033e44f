//! Output formatting for the netform CLI
//!
//! Human output is colored text; JSON mode prints one object per message.
//! Colors are switched globally through `colored`'s override, so the printing
//! code below never branches on them.

use colored::{ColoredString, Colorize};
use serde_json::{json, Value};
use std::io::{self, Write};
use std::time::{Duration, Instant};

/// Outcome of checking one stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackStatus {
    Ok,
    Failed,
}

impl StackStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StackStatus::Ok => "ok",
            StackStatus::Failed => "failed",
        }
    }

    fn painted(&self) -> ColoredString {
        match self {
            StackStatus::Ok => self.as_str().green(),
            StackStatus::Failed => self.as_str().red().bold(),
        }
    }
}

/// Stderr notices, printed as `LABEL: message`.
#[derive(Debug, Clone, Copy)]
enum Notice {
    Error,
    Hint,
}

impl Notice {
    fn kind(self) -> &'static str {
        match self {
            Notice::Error => "error",
            Notice::Hint => "hint",
        }
    }

    fn label(self) -> ColoredString {
        match self {
            Notice::Error => "ERROR:".red().bold(),
            Notice::Hint => "HINT:".cyan().bold(),
        }
    }
}

/// Output formatter for human and JSON modes
pub struct OutputFormatter {
    json_mode: bool,
    verbosity: u8,
    start_time: Instant,
}

impl OutputFormatter {
    /// Create a formatter. `NO_COLOR` in the environment wins over `use_color`.
    pub fn new(use_color: bool, json_mode: bool, verbosity: u8) -> Self {
        let use_color = use_color && std::env::var_os("NO_COLOR").is_none();
        colored::control::set_override(use_color);

        Self {
            json_mode,
            verbosity,
            start_time: Instant::now(),
        }
    }

    pub fn is_json(&self) -> bool {
        self.json_mode
    }

    /// Print a pretty JSON document (JSON mode payloads)
    pub fn document(&self, value: &Value) {
        println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
    }

    fn json_line(&self, value: Value) -> String {
        serde_json::to_string(&value).unwrap_or_default()
    }

    /// Print an underlined section header. Silent in JSON mode.
    pub fn section(&self, title: &str) {
        if self.json_mode {
            return;
        }
        println!("\n{}", title.cyan().bold());
        println!("{}", "-".repeat(title.len()).cyan());
    }

    /// Print one stack's status line, `ok: [Stack] => message`.
    pub fn stack_result(&self, stack: &str, status: StackStatus, message: Option<&str>) {
        if self.json_mode {
            println!(
                "{}",
                self.json_line(json!({
                    "type": "stack",
                    "stack": stack,
                    "status": status.as_str(),
                    "message": message,
                }))
            );
            return;
        }

        match message {
            Some(msg) => println!("{}: [{}] => {}", status.painted(), stack, msg),
            None => println!("{}: [{}]", status.painted(), stack),
        }
    }

    fn notice(&self, notice: Notice, message: &str) {
        if self.json_mode {
            eprintln!(
                "{}",
                self.json_line(json!({ "type": notice.kind(), "message": message }))
            );
        } else {
            eprintln!("{} {}", notice.label(), message);
        }
    }

    pub fn error(&self, message: &str) {
        self.notice(Notice::Error, message);
    }

    pub fn hint(&self, message: &str) {
        self.notice(Notice::Hint, message);
    }

    /// Progress message on stderr, shown from `-v` up.
    pub fn info(&self, message: &str) {
        if self.verbosity == 0 {
            return;
        }
        if self.json_mode {
            eprintln!(
                "{}",
                self.json_line(json!({ "type": "info", "message": message }))
            );
        } else {
            eprintln!("{} {}", "INFO:".blue(), message);
        }
    }

    /// Print a titled bullet list
    pub fn list(&self, title: &str, items: &[String]) {
        if self.json_mode {
            self.document(&json!({ "type": "list", "title": title, "items": items }));
            return;
        }

        println!("\n{}:", title.bright_white().bold());
        for item in items {
            println!("  {} {}", "-".bright_black(), item);
        }
    }

    /// Print rows under a header, columns padded to their widest cell
    pub fn table(&self, headers: &[&str], rows: &[Vec<String>]) {
        if self.json_mode {
            self.document(&json!({ "type": "table", "headers": headers, "rows": rows }));
            return;
        }

        let widths = column_widths(headers, rows);
        println!(
            "{}",
            format_row(headers.iter().copied(), &widths).bright_white().bold()
        );
        let rule = widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-");
        println!("{}", rule.bright_black());
        for row in rows {
            println!("{}", format_row(row.iter().map(String::as_str), &widths));
        }
    }

    /// Time since the formatter was created
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn flush(&self) {
        let _ = io::stdout().flush();
    }
}

fn column_widths(headers: &[&str], rows: &[Vec<String>]) -> Vec<usize> {
    headers
        .iter()
        .enumerate()
        .map(|(i, header)| {
            rows.iter()
                .filter_map(|row| row.get(i))
                .map(String::len)
                .fold(header.len(), usize::max)
        })
        .collect()
}

fn format_row<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    cells
        .zip(widths)
        .map(|(cell, width)| format!("{:width$}", cell, width = *width))
        .collect::<Vec<_>>()
        .join(" | ")
}

/// Human-readable duration: milliseconds below a second, minutes above one.
pub fn format_duration(duration: Duration) -> String {
    match duration.as_secs() {
        0 => format!("{}ms", duration.as_millis()),
        secs if secs < 60 => format!("{:.2}s", duration.as_secs_f64()),
        secs => format!("{}m {}s", secs / 60, secs % 60),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stack_status_strings() {
        assert_eq!(StackStatus::Ok.as_str(), "ok");
        assert_eq!(StackStatus::Failed.as_str(), "failed");
        assert!(StackStatus::Failed.painted().to_string().contains("failed"));
    }

    #[test]
    fn test_column_widths() {
        let rows = vec![
            vec!["VpcAlbLeanStack".to_string(), "1".to_string()],
            vec!["Short".to_string()],
        ];
        assert_eq!(column_widths(&["Stack", "Resources"], &rows), vec![15, 9]);
        assert_eq!(format_row(["a", "b"].into_iter(), &[3, 1]), "a   | b");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(250)), "250ms");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 5s");
    }
}
