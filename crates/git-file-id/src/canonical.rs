// Copyright 2026 Oxide Computer Company

//! Canonical JSON serialization.
//!
//! The output of [`to_canonical_string`] is the exact byte sequence that
//! identifiers are computed over, so its grammar is fixed here rather than
//! delegated to a general-purpose formatter:
//!
//! - Object keys are sorted by Unicode code point, recursively.
//! - `,` separates members and elements; `:` separates keys from values.
//!   No other whitespace is emitted.
//! - Strings escape `"` and `\` with a backslash; `\n`, `\r`, `\t`, `\b`
//!   and `\f` use their two-character escapes; other control characters
//!   below U+0020 and every non-ASCII code point use `\uXXXX` with
//!   lowercase hex digits (UTF-16 surrogate pairs above U+FFFF).
//! - Numbers, booleans and `null` are written as JSON literals.

use serde_json::Value;
use std::fmt::Write;

/// Serializes `value` in canonical form.
pub fn to_canonical_string(value: &Value) -> String {
    let mut out = String::new();
    write_value(&mut out, value);
    out
}

fn write_value(out: &mut String, value: &Value) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => {
            let _ = write!(out, "{n}");
        }
        Value::String(s) => write_string(out, s),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(out, item);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(out, key);
                out.push(':');
                write_value(out, item);
            }
            out.push('}');
        }
    }
}

fn write_string(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0c}' => out.push_str("\\f"),
            ' '..='~' => out.push(c),
            _ => {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    let _ = write!(out, "\\u{unit:04x}");
                }
            }
        }
    }
    out.push('"');
}
