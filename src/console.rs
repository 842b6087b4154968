//! Terminal output for the CLI: status lines and the run summary.
//!
//! Colors are used only when stdout is a terminal and `NO_COLOR` is unset.

use std::io::{self, IsTerminal};

/// ANSI style codes.
#[derive(Debug, Clone, Copy)]
pub enum Style {
    Bold,
    Dim,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
}

impl Style {
    fn code(self) -> &'static str {
        match self {
            Style::Bold => "1",
            Style::Dim => "2",
            Style::Red => "31",
            Style::Green => "32",
            Style::Yellow => "33",
            Style::Blue => "34",
            Style::Magenta => "35",
            Style::Cyan => "36",
        }
    }
}

/// Kind of status line, which decides its tag and color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Step,
    Ok,
    Info,
    Warn,
    Error,
}

impl Status {
    fn tag(self) -> &'static str {
        match self {
            Status::Step => "STEP",
            Status::Ok => "OK",
            Status::Info => "INFO",
            Status::Warn => "WARN",
            Status::Error => "ERROR",
        }
    }

    fn color(self) -> Style {
        match self {
            Status::Step => Style::Cyan,
            Status::Ok => Style::Green,
            Status::Info => Style::Blue,
            Status::Warn => Style::Yellow,
            Status::Error => Style::Red,
        }
    }
}

/// Writes styled status lines.
#[derive(Debug)]
pub struct Console {
    colors_enabled: bool,
}

impl Default for Console {
    fn default() -> Self {
        Self::new()
    }
}

impl Console {
    pub fn new() -> Self {
        let colors_enabled = std::env::var("NO_COLOR").is_err() && io::stdout().is_terminal();
        Self { colors_enabled }
    }

    pub fn with_colors(enabled: bool) -> Self {
        Self {
            colors_enabled: enabled,
        }
    }

    pub fn style(&self, text: &str, styles: &[Style]) -> String {
        if !self.colors_enabled || styles.is_empty() {
            return text.to_string();
        }

        let codes: Vec<&str> = styles.iter().map(|s| s.code()).collect();
        format!("\x1b[{}m{}\x1b[0m", codes.join(";"), text)
    }

    /// Formats `[TAG] message`.
    pub fn status_line(&self, status: Status, message: &str) -> String {
        let tag = self.style(status.tag(), &[status.color(), Style::Bold]);
        format!("[{}] {}", tag, message)
    }

    /// Prints a status line. Errors go to stderr.
    pub fn status(&self, status: Status, message: &str) {
        let line = self.status_line(status, message);
        if status == Status::Error {
            eprintln!("{}", line);
        } else {
            println!("{}", line);
        }
    }

    pub fn step(&self, message: &str) {
        self.status(Status::Step, message);
    }

    pub fn success(&self, message: &str) {
        self.status(Status::Ok, message);
    }

    pub fn info(&self, message: &str) {
        self.status(Status::Info, message);
    }

    pub fn warning(&self, message: &str) {
        self.status(Status::Warn, message);
    }

    pub fn error(&self, message: &str) {
        self.status(Status::Error, message);
    }

    /// Prints a blank line and a bold heading.
    pub fn section(&self, title: &str) {
        println!();
        println!("{}", self.style(title, &[Style::Magenta, Style::Bold]));
    }

    pub fn count(&self, n: usize) -> String {
        self.style(&n.to_string(), &[Style::Green, Style::Bold])
    }

    /// `present/total`, with the count in yellow when some are missing.
    pub fn ratio(&self, present: usize, total: usize) -> String {
        let color = if present < total {
            Style::Yellow
        } else {
            Style::Green
        };
        format!(
            "{}/{}",
            self.style(&present.to_string(), &[color, Style::Bold]),
            total
        )
    }

    /// One summary row: aligned name, ratio, and a dim breakdown.
    pub fn summary_row(&self, name: &str, present: usize, total: usize, detail: &str) {
        println!(
            "  {:<18} {} {}",
            name,
            self.ratio(present, total),
            self.style(&format!("({})", detail), &[Style::Dim])
        );
    }
}
