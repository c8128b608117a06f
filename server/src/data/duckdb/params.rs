//! Named placeholder binding
//!
//! Predicates carry `@name` placeholders; DuckDB binds positionally, so each
//! occurrence is rewritten to `?` and its value appended in order.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

use super::error::DuckdbError;
use crate::domain::filters::{BoundParam, SqlValue};

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"@([A-Za-z_][A-Za-z0-9_]*)").expect("Invalid regex"))
}

/// Rewrite `@name` placeholders to `?` and return values in placeholder order.
///
/// Statements without bindings pass through untouched.
pub fn rewrite_placeholders<'a>(
    sql: &str,
    params: &'a [BoundParam],
) -> Result<(String, Vec<&'a SqlValue>), DuckdbError> {
    if params.is_empty() {
        return Ok((sql.to_string(), Vec::new()));
    }

    let by_name: HashMap<&str, &SqlValue> = params
        .iter()
        .map(|p| (p.name.as_str(), &p.value))
        .collect();

    let mut out = String::with_capacity(sql.len());
    let mut ordered = Vec::with_capacity(params.len());
    let mut last = 0;
    for caps in placeholder_regex().captures_iter(sql) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let value = by_name
            .get(name.as_str())
            .ok_or_else(|| DuckdbError::UnboundParameter(name.as_str().to_string()))?;
        out.push_str(&sql[last..whole.start()]);
        out.push('?');
        ordered.push(*value);
        last = whole.end();
    }
    out.push_str(&sql[last..]);
    Ok((out, ordered))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn param(name: &str, value: impl Into<SqlValue>) -> BoundParam {
        BoundParam {
            name: name.to_string(),
            value: value.into(),
        }
    }

    #[test]
    fn test_rewrite_in_occurrence_order() {
        let params = vec![param("d0", "Імпорт"), param("y0", 2024_i64), param("y1", 2023_i64)];
        let (sql, values) = rewrite_placeholders(
            "napryamok IN (@d0) AND EXTRACT(YEAR FROM data_deklaracii) IN (@y1, @y0)",
            &params,
        )
        .unwrap();

        assert_eq!(
            sql,
            "napryamok IN (?) AND EXTRACT(YEAR FROM data_deklaracii) IN (?, ?)"
        );
        assert_eq!(
            values,
            vec![
                &SqlValue::from("Імпорт"),
                &SqlValue::Integer(2023),
                &SqlValue::Integer(2024)
            ]
        );
    }

    #[test]
    fn test_unbound_placeholder_is_an_error() {
        let params = vec![param("d0", "x")];
        let err = rewrite_placeholders("a = @d0 AND b = @d1", &params).unwrap_err();
        assert!(matches!(err, DuckdbError::UnboundParameter(name) if name == "d1"));
    }

    #[test]
    fn test_no_params_passes_through() {
        let sql = "SELECT '@home' AS x";
        let (out, values) = rewrite_placeholders(sql, &[]).unwrap();
        assert_eq!(out, sql);
        assert!(values.is_empty());
    }
}
