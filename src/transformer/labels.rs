//! Label resolution with root / current scope selection

use serde_json::Value;
use tracing::{debug, error};

use crate::jsonpath::{extract, OutputMode};

/// The two documents a path may be evaluated against
///
/// For value scrapes both point at the root document. For object scrapes
/// `current` is the array element being visited.
#[derive(Debug, Clone, Copy)]
pub struct Scopes<'a> {
    /// Whole fetched document
    pub root: &'a Value,
    /// Element currently being visited
    pub current: &'a Value,
}

impl<'a> Scopes<'a> {
    /// Scopes for a top-level (value) scrape
    pub fn root(root: &'a Value) -> Self {
        Self {
            root,
            current: root,
        }
    }

    /// Scopes for an element of an object scrape
    pub fn nested(root: &'a Value, current: &'a Value) -> Self {
        Self { root, current }
    }

    /// Pick the document `path` should be evaluated against
    pub fn select(&self, path: &str) -> &'a Value {
        if is_root_anchored(path) {
            debug!(path = %path, "Using JSON data from the root");
            self.root
        } else {
            debug!(path = %path, "Using JSON data from the current element");
            self.current
        }
    }
}

/// Whether `path` starts with the root anchor
///
/// Spaces are removed first and only the first four characters are
/// inspected, so `$.a`, `{$.a}` and `{ $.a }` all qualify while a `$`
/// deeper in the expression does not.
pub fn is_root_anchored(path: &str) -> bool {
    path.chars().filter(|c| *c != ' ').take(4).any(|c| c == '$')
}

/// Resolve one label value per path
///
/// Failures are logged and yield an empty string so the result always has
/// the same length as `paths`.
pub fn resolve_labels(metric: &str, paths: &[String], scopes: &Scopes<'_>) -> Vec<String> {
    paths
        .iter()
        .map(|path| match extract(scopes.select(path), path, OutputMode::Text) {
            Ok(value) => value,
            Err(e) => {
                error!(
                    metric = %metric,
                    path = %path,
                    error = %e,
                    "Failed to extract label value"
                );
                String::new()
            }
        })
        .collect()
}
