//! Value normalization and remapping
//!
//! Extracted values arrive as text. [`ValueConverter`] optionally maps status
//! words to numeric strings, then [`sanitize_value`] turns the text into a
//! finite `f64`.

use std::collections::HashMap;

use crate::error::ValueError;

/// Convert extracted text into a finite float
///
/// Surrounding whitespace and one pair of matching quotes are ignored.
/// Besides float literals, the boolean words understood by Go's
/// `strconv.ParseBool` map to 1 and 0. NaN and infinities are rejected.
pub fn sanitize_value(text: &str) -> Result<f64, ValueError> {
    let trimmed = strip_quotes(text.trim());

    if let Ok(value) = trimmed.parse::<f64>() {
        if value.is_finite() {
            return Ok(value);
        }
        return Err(ValueError::NonFinite(text.to_string()));
    }

    match trimmed {
        "t" | "T" | "TRUE" | "true" | "True" => Ok(1.0),
        "f" | "F" | "FALSE" | "false" | "False" => Ok(0.0),
        _ => Err(ValueError::NotNumeric(text.to_string())),
    }
}

/// Convert extracted text into an integer (epoch timestamps)
///
/// Float literals are truncated towards zero.
pub fn sanitize_int_value(text: &str) -> Result<i64, ValueError> {
    let trimmed = strip_quotes(text.trim());

    if let Ok(value) = trimmed.parse::<i64>() {
        return Ok(value);
    }

    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value.trunc() as i64),
        _ => Err(ValueError::NotInteger(text.to_string())),
    }
}

fn strip_quotes(text: &str) -> &str {
    for quote in ['"', '\''] {
        if text.len() >= 2 && text.starts_with(quote) && text.ends_with(quote) {
            return text[1..text.len() - 1].trim();
        }
    }
    text
}

/// Per-metric value remapping tables
///
/// Keyed by value path, then by the lowercased extracted value. Table keys
/// are lowercased on construction so lookups are case-insensitive on both
/// sides; replacements are kept verbatim.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueConverter {
    tables: HashMap<String, HashMap<String, String>>,
}

impl ValueConverter {
    /// Build a converter from configured tables
    pub fn new(tables: HashMap<String, HashMap<String, String>>) -> Self {
        let tables = tables
            .into_iter()
            .map(|(path, mappings)| {
                let mappings = mappings
                    .into_iter()
                    .map(|(from, to)| (from.to_lowercase(), to))
                    .collect();
                (path, mappings)
            })
            .collect();

        Self { tables }
    }

    /// True when no table is configured
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Remap `raw` if the table for `value_path` has an entry for it
    ///
    /// A miss returns `raw` untouched, original case included.
    pub fn convert<'a>(&'a self, value_path: &str, raw: &'a str) -> &'a str {
        let Some(mappings) = self.tables.get(value_path) else {
            return raw;
        };

        match mappings.get(&raw.to_lowercase()) {
            Some(replacement) => replacement.as_str(),
            None => raw,
        }
    }
}
