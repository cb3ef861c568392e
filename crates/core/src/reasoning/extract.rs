//! # Contract Extractor
//!
//! Recovers a well-formed JSON value from the free-form text the
//! reasoning service returns. Two strategies, in order:
//!
//! 1. a fenced code block (``` with optional language tag) — take the
//!    enclosed text;
//! 2. the first top-level bracket or brace matching the expected shape —
//!    take the minimal balanced span from there.
//!
//! The recovered span is parsed strictly; anything else is a
//! `MalformedOutput` for the orchestrator. Never a best-effort repair.

use crate::error::ExtractError;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Top-level shape a stage expects back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedShape {
    Array,
    Object,
}

impl ExpectedShape {
    fn opener(&self) -> char {
        match self {
            ExpectedShape::Array => '[',
            ExpectedShape::Object => '{',
        }
    }

    fn closer(&self) -> char {
        match self {
            ExpectedShape::Array => ']',
            ExpectedShape::Object => '}',
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            ExpectedShape::Array => "array",
            ExpectedShape::Object => "object",
        }
    }
}

/// Extract a JSON value of the expected shape from raw response text.
pub fn extract(raw: &str, shape: ExpectedShape) -> Result<Value, ExtractError> {
    let span = match fenced_block(raw) {
        Some(inner) => inner.trim().to_string(),
        None => balanced_span(raw, shape).ok_or_else(|| {
            ExtractError::new(format!(
                "no fenced block or top-level JSON {} found",
                shape.describe()
            ))
        })?,
    };

    let value: Value = serde_json::from_str(&span)
        .map_err(|e| ExtractError::new(format!("recovered span is not valid JSON: {}", e)))?;

    let matches = match shape {
        ExpectedShape::Array => value.is_array(),
        ExpectedShape::Object => value.is_object(),
    };
    if !matches {
        return Err(ExtractError::new(format!(
            "expected a JSON {}, got {}",
            shape.describe(),
            json_kind(&value)
        )));
    }

    Ok(value)
}

/// Decode an extracted value into a typed payload.
pub fn decode<T: DeserializeOwned>(value: &Value) -> Result<T, ExtractError> {
    serde_json::from_value(value.clone())
        .map_err(|e| ExtractError::new(format!("payload does not match expected schema: {}", e)))
}

/// Contents of the first complete fenced code block, if any.
/// The opening fence may carry a language tag; it is skipped.
fn fenced_block(text: &str) -> Option<&str> {
    let open = text.find("```")?;
    let after = &text[open + 3..];
    let body_start = after.find('\n')? + 1;
    let body = &after[body_start..];
    let end = body.find("```")?;
    Some(&body[..end])
}

/// Minimal balanced span starting at the first opener of the expected
/// shape. String literals (including escapes) are skipped so brackets
/// inside them do not affect the depth count.
fn balanced_span(text: &str, shape: ExpectedShape) -> Option<String> {
    let open = shape.opener();
    let close = shape.closer();
    let start = text.find(open)?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (idx, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        if ch == '"' {
            in_string = true;
        } else if ch == open {
            depth += 1;
        } else if ch == close {
            depth = depth.checked_sub(1)?;
            if depth == 0 {
                let end = start + idx + ch.len_utf8();
                return Some(text[start..end].to_string());
            }
        }
    }
    None
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
