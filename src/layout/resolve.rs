//! Text resolution: turning a data row and an element descriptor into the
//! element's display string, and composing QR payloads.
//!
//! Resolution never fails. Missing keys, `null`s, and non-string values all
//! collapse to (stringified, trimmed) text; the engine upstream decides what
//! an empty result means.

use serde_json::Value;

use crate::layout::DataRow;
use crate::schema::{Element, FieldSource, QrDef, TextSource};

/// Stringify a JSON value the way a label field expects: `null` is empty,
/// strings pass through, numbers and booleans use their display form.
fn value_to_string(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// Look up `key` in the row and return its trimmed string form.
fn row_value(row: &DataRow, key: &str) -> String {
    row.get(key)
        .map(value_to_string)
        .unwrap_or_default()
        .trim()
        .to_string()
}

/// Resolve the display text for an element.
///
/// - `staticText` is returned stringified, independent of the row.
/// - `resolveKeys` scans the chain in order and returns the first non-empty
///   value, prefixed.
/// - `key` looks up a single value; a conditional element with an empty
///   value resolves to `""` (the elision signal), while a non-conditional
///   one still returns the bare prefix. Non-conditional elements always
///   occupy their slot, so a visible prefix marks the empty field rather
///   than vanishing.
pub fn resolve_text(row: &DataRow, element: &Element) -> String {
    let prefix = element.prefix.as_deref().unwrap_or("");

    match &element.source {
        TextSource::StaticText(v) => value_to_string(v),

        TextSource::ResolveKeys(keys) => {
            for key in keys {
                let v = row_value(row, key);
                if !v.is_empty() {
                    return format!("{prefix}{v}");
                }
            }
            String::new()
        }

        TextSource::Key(key) => {
            let raw = row_value(row, key);
            if raw.is_empty() && element.conditional {
                return String::new();
            }
            format!("{prefix}{raw}")
        }
    }
}

/// Compose the multi-line QR payload for a row.
///
/// Fields resolve in order; empty results are dropped; survivors are joined
/// with newlines. Fallback-chain fields contribute the bare value, single-key
/// fields contribute `prefix + value`. Both render adapters encode exactly
/// this string, so payload composition lives here and nowhere else.
pub fn qr_payload(def: &QrDef, row: &DataRow) -> String {
    let mut lines: Vec<String> = Vec::new();

    for field in &def.payload_fields {
        match &field.source {
            FieldSource::ResolveKeys(keys) => {
                for key in keys {
                    let v = row_value(row, key);
                    if !v.is_empty() {
                        lines.push(v);
                        break;
                    }
                }
            }
            FieldSource::Key(key) => {
                let v = row_value(row, key);
                if !v.is_empty() {
                    let prefix = field.prefix.as_deref().unwrap_or("");
                    lines.push(format!("{prefix}{v}"));
                }
            }
        }
    }

    lines.join("\n")
}
