//! Template based single-line rendering of a [`LogRecord`].
//!
//! Supported placeholders:
//!
//! - `%message%`, `%channel%`, `%level_name%`, `%datetime%`
//! - `%context%`, `%extra%`: the whole map as compact JSON
//! - `%context.KEY%`, `%extra.KEY%`: a single value; the key is removed from
//!   the map before the map itself is rendered
//!
//! Unknown placeholders are left untouched.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::fmt::Write;

use super::Formatter;
use crate::record::{Fields, LogRecord};

pub const SIMPLE_FORMAT: &str = "[%datetime%] %channel%.%level_name%: %message% %context% %extra%";
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%:z";

/// Renders records through a `%placeholder%` template
#[derive(Debug, Clone)]
pub struct LineFormatter {
    format: String,
    date_format: String,
    allow_inline_line_breaks: bool,
    ignore_empty_context_and_extra: bool,
}

impl Default for LineFormatter {
    fn default() -> Self {
        Self::new(SIMPLE_FORMAT)
    }
}

impl LineFormatter {
    pub fn new(format: impl Into<String>) -> Self {
        Self {
            format: format.into(),
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            allow_inline_line_breaks: false,
            ignore_empty_context_and_extra: false,
        }
    }

    /// Set the chrono format string used for `%datetime%`
    pub fn with_date_format(mut self, date_format: impl Into<String>) -> Self {
        self.date_format = date_format.into();
        self
    }

    pub fn allow_inline_line_breaks(mut self, allow: bool) -> Self {
        self.allow_inline_line_breaks = allow;
        self
    }

    pub fn ignore_empty_context_and_extra(mut self, ignore: bool) -> Self {
        self.ignore_empty_context_and_extra = ignore;
        self
    }

    pub fn template(&self) -> &str {
        &self.format
    }

    /// Render the record through the template
    pub fn render(&self, record: &LogRecord) -> String {
        let mut context = record.context.clone();
        let mut extra = record.extra.clone();

        // Pull out single-key placeholders first so they never show up twice.
        let mut picked_context = Fields::new();
        let mut picked_extra = Fields::new();
        for name in placeholders(&self.format) {
            if let Some(key) = name.strip_prefix("context.") {
                if let Some(value) = context.shift_remove(key) {
                    picked_context.insert(key.to_string(), value);
                }
            } else if let Some(key) = name.strip_prefix("extra.") {
                if let Some(value) = extra.shift_remove(key) {
                    picked_extra.insert(key.to_string(), value);
                }
            }
        }

        let mut output = String::with_capacity(self.format.len() + record.message.len());
        let mut rest = self.format.as_str();

        while let Some(start) = rest.find('%') {
            output.push_str(&rest[..start]);
            let after = &rest[start + 1..];
            let Some(end) = after.find('%') else {
                rest = &rest[start..];
                break;
            };
            let name = &after[..end];

            let replacement = match name {
                "message" => Some(self.replace_newlines(&record.message)),
                "channel" => Some(self.replace_newlines(&record.channel)),
                "level_name" => Some(record.level_name().to_string()),
                "datetime" => Some(self.format_date(&record.datetime)),
                "context" => Some(self.render_fields(&context)),
                "extra" => Some(self.render_fields(&extra)),
                _ => {
                    if let Some(key) = name.strip_prefix("context.") {
                        Some(picked_context.get(key).map(|v| self.stringify(v)).unwrap_or_default())
                    } else if let Some(key) = name.strip_prefix("extra.") {
                        Some(picked_extra.get(key).map(|v| self.stringify(v)).unwrap_or_default())
                    } else {
                        None
                    }
                }
            };

            match replacement {
                Some(text) => {
                    output.push_str(&text);
                    rest = &after[end + 1..];
                }
                None => {
                    // Not a placeholder; the closing '%' may open the next one.
                    output.push('%');
                    rest = after;
                }
            }
        }
        output.push_str(rest);

        output
    }

    fn render_fields(&self, fields: &Fields) -> String {
        if fields.is_empty() && self.ignore_empty_context_and_extra {
            return String::new();
        }
        if fields.is_empty() {
            return "[]".to_string();
        }
        let json = Value::Object(fields.clone()).to_string();
        self.replace_newlines(&json)
    }

    /// Convert a single value to its inline string form
    fn stringify(&self, value: &Value) -> String {
        let text = match value {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Array(_) | Value::Object(_) => value.to_string(),
        };
        self.replace_newlines(&text)
    }

    fn replace_newlines(&self, text: &str) -> String {
        if self.allow_inline_line_breaks {
            if text.starts_with('{') {
                return text.replace("\\r", "\r").replace("\\n", "\n");
            }
            return text.to_string();
        }
        text.replace("\r\n", " ").replace(['\r', '\n'], " ")
    }

    fn format_date(&self, datetime: &DateTime<Utc>) -> String {
        let mut out = String::new();
        if write!(out, "{}", datetime.format(&self.date_format)).is_err() {
            return datetime.to_rfc3339();
        }
        out
    }
}

impl Formatter for LineFormatter {
    fn format(&self, record: &LogRecord) -> String {
        self.render(record)
    }
}

/// Names of all `%name%` tokens in a template, in order of appearance
fn placeholders(template: &str) -> Vec<&str> {
    let mut names = Vec::new();
    let mut rest = template;
    while let Some(start) = rest.find('%') {
        let after = &rest[start + 1..];
        let Some(end) = after.find('%') else { break };
        let name = &after[..end];
        if is_placeholder(name) {
            if name.starts_with("context.") || name.starts_with("extra.") {
                names.push(name);
            }
            rest = &after[end + 1..];
        } else {
            rest = after;
        }
    }
    names
}

fn is_placeholder(name: &str) -> bool {
    matches!(name, "message" | "channel" | "level_name" | "datetime" | "context" | "extra")
        || name.starts_with("context.")
        || name.starts_with("extra.")
}

///////////////////////////////////////////////////////////////////////////////
//****                              Tests                                ****//
///////////////////////////////////////////////////////////////////////////////
