//! Digest header validation.
//!
//! Checks the YAML header against the content collection schema and
//! cross-checks it with the computed period. Structural failures stop early;
//! field-level problems accumulate so a single pass reports everything.

use serde_yaml::{Mapping, Value};

use crate::core::frontmatter::{DELIMITER, split_header};
use crate::core::period::PeriodDescriptor;

pub const MIN_HIGHLIGHTS: usize = 3;
pub const MAX_HIGHLIGHTS: usize = 5;
pub const MAX_HIGHLIGHT_CHARS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldType {
    String,
    StringOrDate,
    Integer,
    Sequence,
    Bool,
}

impl FieldType {
    fn label(self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::StringOrDate => "string or date",
            FieldType::Integer => "integer",
            FieldType::Sequence => "sequence",
            FieldType::Bool => "boolean",
        }
    }

    fn accepts(self, value: &Value) -> bool {
        match self {
            FieldType::String => value.is_string(),
            FieldType::StringOrDate => match value {
                Value::String(_) => true,
                Value::Tagged(tagged) => tagged.value.is_string(),
                _ => false,
            },
            FieldType::Integer => value.is_i64() || value.is_u64(),
            FieldType::Sequence => value.is_sequence(),
            FieldType::Bool => value.is_bool(),
        }
    }
}

const REQUIRED_FIELDS: &[(&str, FieldType)] = &[
    ("title", FieldType::String),
    ("description", FieldType::String),
    ("pubDate", FieldType::StringOrDate),
    ("weekNumber", FieldType::Integer),
    ("year", FieldType::Integer),
    ("highlights", FieldType::Sequence),
    ("draft", FieldType::Bool),
];

/// Validate a digest's header. Returns stable error messages (empty on success).
pub fn validate_header(document: &str, period: &PeriodDescriptor) -> Vec<String> {
    let header = match parse_header(document) {
        Ok(header) => header,
        Err(err) => return vec![err],
    };

    let mut errors = Vec::new();
    check_required_fields(&header, &mut errors);
    check_period(&header, period, &mut errors);
    check_highlights(&header, &mut errors);
    check_draft(&header, &mut errors);
    errors
}

/// Parse the header block into a YAML mapping, or return the single
/// structural error that prevents further checks.
pub fn parse_header(document: &str) -> Result<Mapping, String> {
    if !document.starts_with(DELIMITER) {
        return Err(format!(
            "document does not start with header delimiter '{DELIMITER}'"
        ));
    }
    let Some((header, _)) = split_header(document) else {
        return Err(format!(
            "could not find closing header delimiter '{DELIMITER}'"
        ));
    };
    let value: Value =
        serde_yaml::from_str(header).map_err(|err| format!("YAML parse error: {err}"))?;
    match value {
        Value::Mapping(mapping) => Ok(mapping),
        _ => Err("header is not a YAML mapping".to_string()),
    }
}

fn check_required_fields(header: &Mapping, errors: &mut Vec<String>) {
    for (field, expected) in REQUIRED_FIELDS {
        match header.get(*field) {
            None => errors.push(format!("missing required field: {field}")),
            Some(value) if !expected.accepts(value) => errors.push(format!(
                "field '{field}' has wrong type: expected {}, got {}",
                expected.label(),
                type_name(value)
            )),
            Some(_) => {}
        }
    }
}

fn check_period(header: &Mapping, period: &PeriodDescriptor, errors: &mut Vec<String>) {
    check_matches(header, "weekNumber", i64::from(period.week_number), errors);
    check_matches(header, "year", i64::from(period.year), errors);
}

/// Any value other than the expected integer, absent included, is a mismatch.
fn check_matches(header: &Mapping, field: &str, expected: i64, errors: &mut Vec<String>) {
    let value = header.get(field);
    if value.and_then(Value::as_i64) != Some(expected) {
        errors.push(format!(
            "{field} mismatch: expected {expected}, got {}",
            describe(value)
        ));
    }
}

fn check_highlights(header: &Mapping, errors: &mut Vec<String>) {
    let Some(Value::Sequence(highlights)) = header.get("highlights") else {
        return;
    };
    if highlights.len() < MIN_HIGHLIGHTS {
        errors.push(format!(
            "need at least {MIN_HIGHLIGHTS} highlights, got {}",
            highlights.len()
        ));
    }
    if highlights.len() > MAX_HIGHLIGHTS {
        errors.push(format!(
            "maximum {MAX_HIGHLIGHTS} highlights, got {}",
            highlights.len()
        ));
    }
    for (index, item) in highlights.iter().enumerate() {
        match item.as_str() {
            None => errors.push(format!("highlight {index} is not a string")),
            Some(text) => {
                let len = text.chars().count();
                if len > MAX_HIGHLIGHT_CHARS {
                    errors.push(format!(
                        "highlight {index} exceeds {MAX_HIGHLIGHT_CHARS} chars ({len})"
                    ));
                }
            }
        }
    }
}

fn check_draft(header: &Mapping, errors: &mut Vec<String>) {
    let draft = header.get("draft");
    if draft != Some(&Value::Bool(false)) {
        errors.push(format!("draft must be false, got {}", describe(draft)));
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Sequence(_) => "sequence",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}

fn describe(value: Option<&Value>) -> String {
    match value {
        None => "none".to_string(),
        Some(Value::Null) => "null".to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) => format!("'{s}'"),
        Some(other) => type_name(other).to_string(),
    }
}
