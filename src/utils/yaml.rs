//! YAML codec for [`Document`] trees.
//!
//! Parsing goes through `serde_yaml`; serialization is done here so that
//! mapping order is kept verbatim and sequences flagged as flow style are
//! rendered inline.

use std::fs;
use std::path::Path;

use lazy_static::lazy_static;
use regex::Regex;
use serde_yaml::Value;

use crate::error::{ProxySubError, Result};
use crate::models::{Document, Mapping, Sequence};

const INDENT: usize = 2;

lazy_static! {
    static ref NUMBER_LIKE: Regex = Regex::new(
        r"^(?:[-+]?(?:[0-9][0-9_]*(?:\.[0-9_]*)?|\.[0-9]+)(?:[eE][-+]?[0-9]+)?|[-+]?0x[0-9a-fA-F_]+|[-+]?0o[0-7_]+|[-+]?0b[01_]+|[-+]?[0-9]+(?::[0-5]?[0-9])+(?:\.[0-9_]*)?|[-+]?\.(?:inf|Inf|INF)|\.(?:nan|NaN|NAN))$"
    )
    .unwrap();
}

/// Words a YAML 1.1 reader would not load as strings.
const RESERVED_WORDS: &[&str] = &[
    "y", "yes", "n", "no", "true", "false", "on", "off", "null", "~",
];

/// Parse UTF-8 YAML bytes into a document.
pub fn parse(bytes: &[u8]) -> Result<Document> {
    let content = std::str::from_utf8(bytes)
        .map_err(|e| ProxySubError::Format(format!("YAML input is not valid UTF-8: {}", e)))?;
    parse_str(content)
}

/// Parse YAML text into a document. An empty document yields [`Document::Null`].
///
/// Merge keys (`<<: *anchor`) are resolved; keys written next to them win.
pub fn parse_str(content: &str) -> Result<Document> {
    let mut value: Value = serde_yaml::from_str(content)
        .map_err(|e| ProxySubError::Format(format!("Failed to parse YAML: {}", e)))?;
    value
        .apply_merge()
        .map_err(|e| ProxySubError::Format(format!("Failed to apply YAML merge keys: {}", e)))?;
    from_yaml_value(value)
}

/// Read and parse a YAML file.
pub fn load_yaml_file<P: AsRef<Path>>(path: P) -> Result<Document> {
    let content = fs::read_to_string(path.as_ref())?;
    parse_str(&content)
}

fn from_yaml_value(value: Value) -> Result<Document> {
    Ok(match value {
        Value::Null => Document::Null,
        Value::Bool(b) => Document::Bool(b),
        Value::Number(n) => match n.as_i64().map(i128::from).or(n.as_u64().map(i128::from)) {
            Some(i) => Document::Integer(i),
            None => Document::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => Document::String(s),
        Value::Sequence(items) => Document::Sequence(Sequence::new(
            items
                .into_iter()
                .map(from_yaml_value)
                .collect::<Result<Vec<_>>>()?,
        )),
        Value::Mapping(entries) => {
            let mut mapping = Mapping::new();
            for (key, value) in entries {
                mapping.insert(mapping_key(key)?, from_yaml_value(value)?);
            }
            Document::Mapping(mapping)
        }
        // Tags carry no meaning for Clash configs; keep the tagged value.
        Value::Tagged(tagged) => from_yaml_value(tagged.value)?,
    })
}

fn mapping_key(key: Value) -> Result<String> {
    match key {
        Value::String(s) => Ok(s),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok("null".to_string()),
        Value::Tagged(tagged) => mapping_key(tagged.value),
        other => Err(ProxySubError::Format(format!(
            "Unsupported mapping key: {:?}",
            other
        ))),
    }
}

/// Serialize a document as block-style YAML.
///
/// Output is deterministic: mapping keys keep their insertion order and
/// sequences with `flow` set are written as `[a, b, c]`.
pub fn serialize(doc: &Document) -> String {
    let mut out = String::new();
    match doc {
        Document::Mapping(map) if !map.is_empty() => write_mapping(&mut out, map, 0, false),
        Document::Sequence(seq) if !seq.is_empty() && !seq.flow => {
            write_sequence(&mut out, seq, 0, false)
        }
        other => {
            out.push_str(&render_inline(other, false));
            out.push('\n');
        }
    }
    out
}

fn push_indent(out: &mut String, indent: usize) {
    out.extend(std::iter::repeat(' ').take(indent));
}

fn write_mapping(out: &mut String, map: &Mapping, indent: usize, inline_first: bool) {
    for (i, (key, value)) in map.iter().enumerate() {
        if !(inline_first && i == 0) {
            push_indent(out, indent);
        }
        out.push_str(&render_string(key, false));
        out.push(':');
        write_child(out, value, indent, false);
    }
}

fn write_sequence(out: &mut String, seq: &Sequence, indent: usize, inline_first: bool) {
    for (i, item) in seq.iter().enumerate() {
        if !(inline_first && i == 0) {
            push_indent(out, indent);
        }
        out.push('-');
        write_child(out, item, indent, true);
    }
}

/// Write `value` after a `key:` or `-` that sits at `indent`.
fn write_child(out: &mut String, value: &Document, indent: usize, in_sequence: bool) {
    match value {
        Document::Mapping(map) if !map.is_empty() => {
            if in_sequence {
                out.push(' ');
                write_mapping(out, map, indent + INDENT, true);
            } else {
                out.push('\n');
                write_mapping(out, map, indent + INDENT, false);
            }
        }
        Document::Sequence(seq) if !seq.is_empty() && !seq.flow => {
            if in_sequence {
                out.push(' ');
                write_sequence(out, seq, indent + INDENT, true);
            } else {
                // Sequences under a mapping key are not indented further.
                out.push('\n');
                write_sequence(out, seq, indent, false);
            }
        }
        other => {
            out.push(' ');
            out.push_str(&render_inline(other, false));
            out.push('\n');
        }
    }
}

/// Single-line rendering of scalars, flow sequences and empty collections.
fn render_inline(doc: &Document, in_flow: bool) -> String {
    match doc {
        Document::Null => "null".to_string(),
        Document::Bool(b) => b.to_string(),
        Document::Integer(i) => i.to_string(),
        Document::Float(f) => render_float(*f),
        Document::String(s) => render_string(s, in_flow),
        Document::Sequence(seq) => {
            let items: Vec<String> = seq.iter().map(|item| render_inline(item, true)).collect();
            format!("[{}]", items.join(", "))
        }
        Document::Mapping(map) => {
            let entries: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{}: {}", render_string(k, true), render_inline(v, true)))
                .collect();
            format!("{{{}}}", entries.join(", "))
        }
    }
}

fn render_float(f: f64) -> String {
    if f.is_nan() {
        ".nan".to_string()
    } else if f.is_infinite() {
        let inf = if f > 0.0 { ".inf" } else { "-.inf" };
        inf.to_string()
    } else {
        format!("{:?}", f)
    }
}

/// Characters a YAML reader treats as line breaks or a byte order mark.
fn is_break_like(c: char) -> bool {
    matches!(c, '\u{2028}' | '\u{2029}' | '\u{feff}')
}

fn render_string(s: &str, in_flow: bool) -> String {
    if s.chars().any(|c| c.is_control() || is_break_like(c)) {
        double_quoted(s)
    } else if is_plain_safe(s, in_flow) {
        s.to_string()
    } else {
        format!("'{}'", s.replace('\'', "''"))
    }
}

fn double_quoted(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{2028}' => out.push_str("\\L"),
            '\u{2029}' => out.push_str("\\P"),
            '\u{feff}' => out.push_str("\\uFEFF"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Whether `s` reads back as the same string when written without quotes.
fn is_plain_safe(s: &str, in_flow: bool) -> bool {
    let Some(first) = s.chars().next() else {
        return false;
    };
    if s.trim() != s {
        return false;
    }
    if "-?:,[]{}#&*!|>'\"%@`".contains(first) {
        return false;
    }
    if s.contains(": ") || s.contains(" #") || s.ends_with(':') {
        return false;
    }
    if in_flow && s.contains([',', '[', ']', '{', '}', ':']) {
        return false;
    }
    if RESERVED_WORDS.contains(&s.to_ascii_lowercase().as_str()) || NUMBER_LIKE.is_match(s) {
        return false;
    }
    matches!(serde_yaml::from_str::<Value>(s), Ok(Value::String(ref parsed)) if parsed == s)
}
