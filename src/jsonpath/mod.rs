//! Path expressions over JSON documents
//!
//! Implements the Kubernetes-style JSONPath dialect used in metric mappings:
//! `{.a.b}`, `$.a[0]`, `{.items[*]}`, `{.values[?(@.state == "ACTIVE")]}`,
//! and templates mixing literal text with expressions (`planet-{.location}`).
//!
//! # Example
//!
//! ```ignore
//! use rjson_exporter::jsonpath::{extract, OutputMode};
//!
//! let doc = serde_json::json!({"counter": 42});
//! assert_eq!(extract(&doc, "{.counter}", OutputMode::Text)?, "42");
//! ```

mod eval;
mod parser;

pub use parser::{CmpOp, FilterExpr, JsonPath, Literal, Segment, Template, TemplatePart};

use serde_json::Value;

use crate::error::PathError;

/// How matches are rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Plain scalar text, JSON strings unquoted
    Text,
    /// JSON array of the matched sub-documents
    Json,
}

/// Evaluate `expression` against an already parsed document
pub fn extract(document: &Value, expression: &str, mode: OutputMode) -> Result<String, PathError> {
    Template::parse(expression)?.render(document, mode)
}

/// Evaluate `expression` and return the matched sub-documents
///
/// Same selection as [`OutputMode::Json`], without the serialization step.
pub fn extract_values(document: &Value, expression: &str) -> Result<Vec<Value>, PathError> {
    Template::parse(expression)?.select_values(document)
}

/// Evaluate `expression` against a raw JSON buffer
///
/// A malformed buffer is reported as [`PathError::InvalidDocument`].
pub fn extract_from_slice(
    data: &[u8],
    expression: &str,
    mode: OutputMode,
) -> Result<String, PathError> {
    let document: Value = serde_json::from_slice(data)?;
    extract(&document, expression, mode)
}
