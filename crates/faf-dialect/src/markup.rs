//! Tag-markup encoding
//!
//! Mapping keys become open/close tag pairs around the converted value,
//! sequence elements become repeated `<item>` tags, and null values are
//! omitted entirely.

use serde_json::Value;

/// Root element wrapping every converted document
pub const ROOT_TAG: &str = "dna";

/// Tag used for sequence elements
pub const ITEM_TAG: &str = "item";

const DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;
const INDENT: &str = "  ";

/// Convert a value into a complete markup document under [`ROOT_TAG`]
#[must_use]
pub fn to_markup(value: &Value) -> String {
    let mut out = String::with_capacity(256);
    out.push_str(DECLARATION);
    out.push('\n');
    write_element(&mut out, ROOT_TAG, value, 0);
    if !out.ends_with('\n') {
        out.push('\n');
    }
    out
}

fn write_element(out: &mut String, tag: &str, value: &Value, depth: usize) {
    let tag = sanitize_tag(tag);
    let pad = INDENT.repeat(depth);
    match value {
        Value::Null => {}
        Value::Object(map) => {
            open_line(out, &pad, &tag);
            for (key, child) in map {
                write_element(out, key, child, depth + 1);
            }
            close_line(out, &pad, &tag);
        }
        Value::Array(items) => {
            open_line(out, &pad, &tag);
            for item in items {
                write_element(out, ITEM_TAG, item, depth + 1);
            }
            close_line(out, &pad, &tag);
        }
        Value::String(s) => leaf_line(out, &pad, &tag, &escape_text(s)),
        Value::Bool(b) => leaf_line(out, &pad, &tag, if *b { "true" } else { "false" }),
        Value::Number(n) => leaf_line(out, &pad, &tag, &n.to_string()),
    }
}

fn open_line(out: &mut String, pad: &str, tag: &str) {
    out.push_str(pad);
    out.push('<');
    out.push_str(tag);
    out.push_str(">\n");
}

fn close_line(out: &mut String, pad: &str, tag: &str) {
    out.push_str(pad);
    out.push_str("</");
    out.push_str(tag);
    out.push_str(">\n");
}

fn leaf_line(out: &mut String, pad: &str, tag: &str, text: &str) {
    out.push_str(pad);
    out.push('<');
    out.push_str(tag);
    out.push('>');
    out.push_str(text);
    close_line(out, "", tag);
}

/// Escape character data
fn escape_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Coerce an arbitrary key into a valid element name
///
/// Disallowed characters become `_`; names that cannot start an element
/// (digits, `-`, `.`, empty) get a leading `_`.
fn sanitize_tag(key: &str) -> String {
    let mut name: String = key
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '_' | '-' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let starts_ok = name
        .chars()
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_');
    if !starts_ok {
        name.insert(0, '_');
    }
    name
}
