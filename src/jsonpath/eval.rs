//! Path evaluation against `serde_json::Value` trees

use std::cmp::Ordering;

use serde_json::Value;

use super::parser::{CmpOp, FilterExpr, JsonPath, Literal, Segment, Template, TemplatePart};
use super::OutputMode;
use crate::error::PathError;

impl JsonPath {
    /// Select every node addressed by this path, in document order
    pub fn select<'v>(&self, scope: &'v Value) -> Result<Vec<&'v Value>, PathError> {
        select_segments(&self.source, &self.segments, scope)
    }
}

impl Template {
    /// Every match of every path part, as owned values
    ///
    /// A definite path (children and indexes only) that addresses one array
    /// yields that array's items. Wildcards, slices, filters and recursive
    /// descent keep each match as one item, even when a match is an array.
    pub fn select_values(&self, document: &Value) -> Result<Vec<Value>, PathError> {
        let mut matches: Vec<&Value> = Vec::new();
        let mut definite = true;
        for part in &self.parts {
            if let TemplatePart::Path(path) = part {
                definite &= path.is_definite();
                matches.extend(path.select(document)?);
            }
        }

        if let [Value::Array(items)] = matches.as_slice() {
            if definite {
                return Ok(items.clone());
            }
        }
        Ok(matches.into_iter().cloned().collect())
    }

    /// Render the template against a document
    ///
    /// `Text` renders each match as plain text (strings unquoted, several
    /// matches joined by a space). `Json` renders [`Template::select_values`]
    /// as a JSON array.
    pub fn render(&self, document: &Value, mode: OutputMode) -> Result<String, PathError> {
        match mode {
            OutputMode::Json => Ok(Value::Array(self.select_values(document)?).to_string()),
            OutputMode::Text => {
                let mut out = String::new();
                for part in &self.parts {
                    match part {
                        TemplatePart::Text(text) => out.push_str(text),
                        TemplatePart::Path(path) => {
                            let rendered: Vec<String> = path
                                .select(document)?
                                .into_iter()
                                .map(render_text)
                                .collect();
                            out.push_str(&rendered.join(" "));
                        }
                    }
                }
                Ok(unquote(out))
            }
        }
    }
}

fn render_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Strip one level of quoting when the whole result is a quoted literal
fn unquote(text: String) -> String {
    if text.len() >= 2 {
        if text.starts_with('"') && text.ends_with('"') {
            if let Ok(unquoted) = serde_json::from_str::<String>(&text) {
                return unquoted;
            }
        }
        if text.starts_with('\'') && text.ends_with('\'') {
            return text[1..text.len() - 1].to_string();
        }
    }
    text
}

fn select_segments<'v>(
    source: &str,
    segments: &[Segment],
    scope: &'v Value,
) -> Result<Vec<&'v Value>, PathError> {
    let mut nodes = vec![scope];
    for segment in segments {
        nodes = apply_segment(source, segment, nodes)?;
    }
    Ok(nodes)
}

fn apply_segment<'v>(
    source: &str,
    segment: &Segment,
    nodes: Vec<&'v Value>,
) -> Result<Vec<&'v Value>, PathError> {
    let had_input = !nodes.is_empty();
    let mut out = Vec::new();

    match segment {
        Segment::Child(name) => {
            for node in nodes {
                if let Some(child) = node.as_object().and_then(|map| map.get(name)) {
                    out.push(child);
                }
            }
            if out.is_empty() && had_input {
                return Err(PathError::NotFound {
                    path: source.to_string(),
                    segment: name.clone(),
                });
            }
        }
        Segment::Wildcard => {
            for node in nodes {
                push_children(node, &mut out);
            }
        }
        Segment::Descendant(name) => {
            let mut all = Vec::new();
            for node in nodes {
                collect_descendants(node, &mut all);
            }
            out.extend(
                all.into_iter()
                    .filter_map(|node| node.as_object().and_then(|map| map.get(name))),
            );
        }
        Segment::DescendantWildcard => {
            let mut all = Vec::new();
            for node in nodes {
                collect_descendants(node, &mut all);
            }
            for node in all {
                push_children(node, &mut out);
            }
        }
        Segment::Index(index) => {
            let mut saw_array = false;
            for node in nodes {
                if let Value::Array(items) = node {
                    saw_array = true;
                    if let Some(item) = resolve_index(*index, items.len()).and_then(|i| items.get(i))
                    {
                        out.push(item);
                    }
                }
            }
            if out.is_empty() && had_input {
                if !saw_array {
                    return Err(PathError::Evaluation {
                        path: source.to_string(),
                        reason: format!("index [{}] applied to a non-array value", index),
                    });
                }
                return Err(PathError::NotFound {
                    path: source.to_string(),
                    segment: format!("[{}]", index),
                });
            }
        }
        Segment::Slice { start, end, step } => {
            let step = step.unwrap_or(1);
            if step <= 0 {
                return Err(PathError::Evaluation {
                    path: source.to_string(),
                    reason: format!("slice step must be positive, got {}", step),
                });
            }
            for node in nodes {
                if let Value::Array(items) = node {
                    let len = items.len();
                    let from = clamp_index(start.unwrap_or(0), len);
                    let to = clamp_index(end.unwrap_or(len as i64), len);
                    if from < to {
                        out.extend(items[from..to].iter().step_by(step as usize));
                    }
                }
            }
        }
        Segment::Filter(filter) => {
            for node in nodes {
                let mut candidates = Vec::new();
                push_children(node, &mut candidates);
                out.extend(
                    candidates
                        .into_iter()
                        .filter(|candidate| filter_matches(source, filter, candidate)),
                );
            }
        }
    }

    Ok(out)
}

fn push_children<'v>(node: &'v Value, out: &mut Vec<&'v Value>) {
    match node {
        Value::Array(items) => out.extend(items.iter()),
        Value::Object(map) => out.extend(map.values()),
        _ => {}
    }
}

/// Pre-order walk including the node itself
fn collect_descendants<'v>(node: &'v Value, out: &mut Vec<&'v Value>) {
    out.push(node);
    match node {
        Value::Array(items) => {
            for item in items {
                collect_descendants(item, out);
            }
        }
        Value::Object(map) => {
            for child in map.values() {
                collect_descendants(child, out);
            }
        }
        _ => {}
    }
}

fn resolve_index(index: i64, len: usize) -> Option<usize> {
    if index < 0 {
        let back = index.unsigned_abs() as usize;
        len.checked_sub(back)
    } else {
        Some(index as usize)
    }
}

fn clamp_index(index: i64, len: usize) -> usize {
    let len_i = len as i64;
    let resolved = if index < 0 { index + len_i } else { index };
    resolved.clamp(0, len_i) as usize
}

fn filter_matches(source: &str, filter: &FilterExpr, candidate: &Value) -> bool {
    let Ok(results) = select_segments(source, &filter.path, candidate) else {
        return false;
    };

    match &filter.condition {
        None => !results.is_empty(),
        Some((op, literal)) => results.into_iter().any(|value| compare(value, *op, literal)),
    }
}

fn compare(value: &Value, op: CmpOp, literal: &Literal) -> bool {
    let ordering = match (value, literal) {
        (Value::Number(n), Literal::Number(l)) => n.as_f64().and_then(|n| n.partial_cmp(l)),
        (Value::String(s), Literal::String(l)) => Some(s.as_str().cmp(l.as_str())),
        (Value::Bool(b), Literal::Bool(l)) => return equality(op, b == l),
        (Value::Null, Literal::Null) => return equality(op, true),
        _ => return op == CmpOp::Ne,
    };

    match ordering {
        Some(ordering) => match op {
            CmpOp::Eq => ordering == Ordering::Equal,
            CmpOp::Ne => ordering != Ordering::Equal,
            CmpOp::Lt => ordering == Ordering::Less,
            CmpOp::Le => ordering != Ordering::Greater,
            CmpOp::Gt => ordering == Ordering::Greater,
            CmpOp::Ge => ordering != Ordering::Less,
        },
        None => op == CmpOp::Ne,
    }
}

fn equality(op: CmpOp, equal: bool) -> bool {
    match op {
        CmpOp::Eq => equal,
        CmpOp::Ne => !equal,
        _ => false,
    }
}
