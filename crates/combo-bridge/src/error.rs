//! Error types for widget construction, configuration, and script execution.

use std::{
    cmp::{max, min},
    fmt::Write as _,
    result::Result as StdResult,
};

use thiserror::Error;

/// Convenient result type used throughout this crate.
pub type Result<T> = StdResult<T, Error>;

/// Reasons an item registry refuses a widget.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    /// Another item already uses the name.
    #[error("item '{0}' already exists")]
    DuplicateName(String),
    /// The requested parent is not a registered container.
    #[error("parent '{0}' is not a registered container")]
    UnknownParent(String),
    /// The requested `before` sibling does not exist under the parent.
    #[error("item '{0}' not found for 'before' placement")]
    UnknownBefore(String),
}

#[derive(Debug, Error, Clone)]
/// Errors produced while building, configuring, or scripting combo widgets.
pub enum Error {
    /// The required item name is empty or malformed.
    #[error("invalid item name {0:?}")]
    InvalidName(String),
    /// A recognized configuration key carried a value of the wrong type.
    #[error("invalid value for '{key}': {message}")]
    InvalidValue {
        /// Offending configuration key.
        key: String,
        /// Human-readable reason.
        message: String,
    },
    /// No item is registered under the name.
    #[error("no item named '{0}'")]
    UnknownItem(String),
    /// The registry refused the widget.
    #[error(transparent)]
    Registration(#[from] RegistrationError),
    /// A script failed to compile or run.
    #[error("{message}")]
    Script {
        /// Optional 1-based line number.
        line: Option<usize>,
        /// Optional 1-based column number.
        col: Option<usize>,
        /// Human-readable error message.
        message: String,
        /// Optional excerpt including a caret at the error location.
        excerpt: Option<String>,
    },
}

impl Error {
    /// Render a human-friendly message including location and excerpt when available.
    pub fn pretty(&self) -> String {
        match self {
            Self::Script {
                line,
                col,
                message,
                excerpt,
            } => {
                let loc = match (line, col) {
                    (Some(l), Some(c)) => format!(" at {}:{}", l, c),
                    (Some(l), None) => format!(" at line {}", l),
                    _ => String::new(),
                };
                match excerpt {
                    Some(ex) => format!("Script error{}\n{}\n{}", loc, message, ex),
                    None => format!("Script error{}\n{}", loc, message),
                }
            }
            other => other.to_string(),
        }
    }
}

/// Build a small 2-3 line excerpt with a caret at `(line_no, col_no)`.
pub fn excerpt_at(source: &str, line_no: usize, col_no: usize) -> String {
    let lines: Vec<&str> = source.lines().collect();
    let total = lines.len();
    let start = max(1usize, line_no.saturating_sub(2));
    let end = min(total, line_no + 1);

    let mut out = String::new();
    for n in start..=end {
        let text = lines.get(n - 1).copied().unwrap_or("");
        let _ignored = writeln!(out, " {:>4} | {}", n, text);
        if n == line_no {
            let prefix = format!(" {:>4} | ", n);
            let _ignored = writeln!(
                out,
                "{}{}^",
                " ".repeat(prefix.len()),
                " ".repeat(col_no.saturating_sub(1))
            );
        }
    }
    out
}
