//! # Formatter Module
//!
//! Turns a [`LogRecord`] into the plain string stored in the `message`
//! column.
//!
//! [`LineFormatter`] does the template work (placeholder substitution and
//! context/extra serialization). [`DbFormatter`] wraps one and applies the
//! storage policy on top: surrounding whitespace is trimmed and the result is
//! capped at a maximum length so it always fits the column.

pub mod line;

pub use line::LineFormatter;

use crate::record::LogRecord;

pub const DB_FORMAT_DEFAULT: &str = "%message% %context% %extra%";
pub const MAX_LENGTH_DEFAULT: usize = 65535;

const ELLIPSIS: &str = "...";

/// Anything that can turn a record into a single string
pub trait Formatter: Send + Sync {
    fn format(&self, record: &LogRecord) -> String;
}

///////////////////////////////////////////////////////////////////////////////
//****                         Public Structs                            ****//
///////////////////////////////////////////////////////////////////////////////

/// Formatter used by the database handler
#[derive(Debug, Clone)]
pub struct DbFormatter {
    line: LineFormatter,
    max_length: Option<usize>,
}

impl Default for DbFormatter {
    fn default() -> Self {
        Self::new(None, true, true, Some(MAX_LENGTH_DEFAULT))
    }
}

impl DbFormatter {
    /// Create a formatter.
    ///
    /// `format` falls back to [`DB_FORMAT_DEFAULT`] when `None` or empty.
    /// `max_length = None` disables truncation.
    pub fn new(
        format: Option<&str>,
        allow_inline_line_breaks: bool,
        ignore_empty_context_and_extra: bool,
        max_length: Option<usize>,
    ) -> Self {
        let format = format.filter(|f| !f.is_empty()).unwrap_or(DB_FORMAT_DEFAULT);
        let line = LineFormatter::new(format)
            .allow_inline_line_breaks(allow_inline_line_breaks)
            .ignore_empty_context_and_extra(ignore_empty_context_and_extra);

        Self { line, max_length }
    }

    /// Same defaults as [`DbFormatter::default`] with a different length cap
    pub fn with_max_length(max_length: Option<usize>) -> Self {
        Self::new(None, true, true, max_length)
    }

    pub fn max_length(&self) -> Option<usize> {
        self.max_length
    }

    pub fn line_formatter(&self) -> &LineFormatter {
        &self.line
    }
}

impl Formatter for DbFormatter {
    fn format(&self, record: &LogRecord) -> String {
        let output = self.line.render(record).trim_matches(is_trimmed).to_string();

        match self.max_length {
            Some(max) => truncate(output, max),
            None => output,
        }
    }
}

/// ASCII whitespace and NUL; other Unicode spaces are kept
fn is_trimmed(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r' | '\0' | '\x0B')
}

/// Cap `text` at `max` characters, marking the cut with an ellipsis
fn truncate(text: String, max: usize) -> String {
    if text.chars().count() <= max {
        return text;
    }
    if max <= ELLIPSIS.len() {
        return ELLIPSIS[..max].to_string();
    }

    let mut cut: String = text.chars().take(max - ELLIPSIS.len()).collect();
    cut.push_str(ELLIPSIS);
    cut
}

///////////////////////////////////////////////////////////////////////////////
//****                              Tests                                ****//
///////////////////////////////////////////////////////////////////////////////
