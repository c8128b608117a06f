//! Lenient JSON extraction from model output
//!
//! Models wrap answers in code fences or prose, and sometimes return an
//! array where an object was asked for. Everything that cannot be read
//! degrades to a "no suggestion" value carrying the raw text.

use serde_json::Value;

/// Why a response could not be used
#[derive(Debug, Clone, PartialEq)]
pub struct FormatFailure {
    pub reason: String,
    pub raw: String,
}

impl FormatFailure {
    fn new(reason: impl Into<String>, raw: &str) -> Self {
        Self {
            reason: reason.into(),
            raw: raw.to_string(),
        }
    }
}

/// Result of asking for code suggestions
#[derive(Debug, Clone, PartialEq)]
pub enum CodeSuggestion {
    Codes(Vec<String>),
    NoSuggestion { raw: String },
}

const MIN_CODE_LEN: usize = 2;
const MAX_CODE_LEN: usize = 10;

/// Parse the first JSON value found in `text`
pub fn extract_json(text: &str) -> Option<Value> {
    let cleaned = strip_code_fences(text);
    let cleaned = cleaned.trim();

    if let Ok(value) = serde_json::from_str::<Value>(cleaned) {
        return Some(value);
    }

    // Try whichever bracket opens first, then the other one
    let object = span(cleaned, '{', '}');
    let array = span(cleaned, '[', ']');
    let mut candidates = [object, array];
    candidates.sort_by_key(|c| c.map_or(usize::MAX, |(start, _)| start));

    candidates
        .into_iter()
        .flatten()
        .find_map(|(start, end)| serde_json::from_str::<Value>(&cleaned[start..=end]).ok())
}

fn strip_code_fences(text: &str) -> String {
    text.replace("```json", "").replace("```JSON", "").replace("```", "")
}

fn span(text: &str, open: char, close: char) -> Option<(usize, usize)> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    (end > start).then_some((start, end))
}

/// SQL from `{"sql_query": "..."}`, also accepting an array of such objects
/// or of plain strings
pub fn parse_sql_suggestion(text: &str) -> Result<String, FormatFailure> {
    let value = extract_json(text).ok_or_else(|| FormatFailure::new("response is not JSON", text))?;

    let sql = match &value {
        Value::Object(map) => map.get("sql_query").and_then(Value::as_str),
        Value::Array(items) => items.iter().find_map(|item| match item {
            Value::String(s) => Some(s.as_str()),
            Value::Object(map) => map.get("sql_query").and_then(Value::as_str),
            _ => None,
        }),
        Value::String(s) => Some(s.as_str()),
        _ => None,
    };

    match sql.map(str::trim) {
        Some(sql) if !sql.is_empty() => Ok(sql.to_string()),
        _ => Err(FormatFailure::new("no sql_query in response", text)),
    }
}

/// Codes from a bare array, `{"codes": [...]}`, or either wrapped in prose
pub fn parse_code_suggestions(text: &str) -> CodeSuggestion {
    let no_suggestion = || CodeSuggestion::NoSuggestion {
        raw: text.to_string(),
    };

    let Some(value) = extract_json(text) else {
        return no_suggestion();
    };
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("codes") {
            Some(Value::Array(items)) => items,
            _ => return no_suggestion(),
        },
        _ => return no_suggestion(),
    };

    let mut codes: Vec<String> = Vec::new();
    for item in items {
        let Some(code) = normalize_code(&item) else {
            continue;
        };
        if !codes.contains(&code) {
            codes.push(code);
        }
    }

    if codes.is_empty() {
        no_suggestion()
    } else {
        CodeSuggestion::Codes(codes)
    }
}

fn normalize_code(item: &Value) -> Option<String> {
    let raw = match item {
        Value::String(s) => s.clone(),
        Value::Number(n) if n.is_u64() => n.to_string(),
        Value::Object(map) => return map.get("code").and_then(normalize_code),
        _ => return None,
    };
    let code: String = raw.chars().filter(|c| !matches!(c, ' ' | '.')).collect();
    let valid = (MIN_CODE_LEN..=MAX_CODE_LEN).contains(&code.len())
        && code.chars().all(|c| c.is_ascii_digit());
    valid.then_some(code)
}
