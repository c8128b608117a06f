//! Parameterized predicate fragments
//!
//! A [`Predicate`] can only be produced through a [`PredicateWriter`], whose
//! text input is restricted to `&'static str` (catalog column expressions and
//! SQL keywords). Every runtime value goes through [`PredicateWriter::bind`],
//! which emits a named placeholder and records the value separately.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Scalar value bound to a placeholder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum SqlValue {
    Integer(i64),
    Number(f64),
    Text(String),
}

impl SqlValue {
    /// Declared scalar type reported to the query engine
    pub fn type_name(&self) -> &'static str {
        match self {
            SqlValue::Integer(_) => "INT64",
            SqlValue::Number(_) => "FLOAT64",
            SqlValue::Text(_) => "STRING",
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Integer(v) => write!(f, "{v}"),
            SqlValue::Number(v) => write!(f, "{v}"),
            SqlValue::Text(v) => f.write_str(v),
        }
    }
}

impl From<&str> for SqlValue {
    fn from(s: &str) -> Self {
        SqlValue::Text(s.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(s: String) -> Self {
        SqlValue::Text(s)
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Integer(v)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Number(v)
    }
}

/// Named parameter (name without the `@` sigil)
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct BoundParam {
    pub name: String,
    pub value: SqlValue,
}

/// One SQL condition plus the parameters it references, in placeholder order
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    sql: String,
    params: Vec<BoundParam>,
}

impl Predicate {
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[BoundParam] {
        &self.params
    }

    pub(crate) fn into_parts(self) -> (String, Vec<BoundParam>) {
        (self.sql, self.params)
    }
}

/// Hands out placeholder names unique within one compiled query
///
/// Names are `<prefix><n>` with `n` counting from 0 per prefix.
#[derive(Debug, Default)]
pub struct ParamBinder {
    counters: HashMap<char, usize>,
}

impl ParamBinder {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_name(&mut self, prefix: char) -> String {
        let n = self.counters.entry(prefix).or_insert(0);
        let name = format!("{prefix}{n}");
        *n += 1;
        name
    }

    /// Start writing a new predicate
    pub fn predicate(&mut self) -> PredicateWriter<'_> {
        PredicateWriter {
            binder: self,
            sql: String::new(),
            params: Vec::new(),
        }
    }
}

pub struct PredicateWriter<'a> {
    binder: &'a mut ParamBinder,
    sql: String,
    params: Vec<BoundParam>,
}

impl PredicateWriter<'_> {
    /// Append static SQL text
    pub fn sql(&mut self, text: &'static str) -> &mut Self {
        self.sql.push_str(text);
        self
    }

    /// Append a fresh placeholder bound to `value`
    pub fn bind(&mut self, prefix: char, value: SqlValue) -> &mut Self {
        let name = self.binder.next_name(prefix);
        self.sql.push('@');
        self.sql.push_str(&name);
        self.params.push(BoundParam { name, value });
        self
    }

    /// Append `@a, @b, ...` for each value
    pub fn bind_list<I>(&mut self, prefix: char, values: I) -> &mut Self
    where
        I: IntoIterator<Item = SqlValue>,
    {
        for (i, value) in values.into_iter().enumerate() {
            if i > 0 {
                self.sql(", ");
            }
            self.bind(prefix, value);
        }
        self
    }

    pub fn finish(self) -> Predicate {
        Predicate {
            sql: self.sql,
            params: self.params,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders_count_per_prefix() {
        let mut binder = ParamBinder::new();

        let mut w = binder.predicate();
        w.sql("a IN (").bind_list('d', ["x".into(), "y".into()]).sql(")");
        let first = w.finish();

        let mut w = binder.predicate();
        w.sql("b = ").bind('d', "z".into()).sql(" AND c = ").bind('y', 1.into());
        let second = w.finish();

        assert_eq!(first.sql(), "a IN (@d0, @d1)");
        assert_eq!(second.sql(), "b = @d2 AND c = @y0");
        assert_eq!(second.params()[1].name, "y0");
        assert_eq!(second.params()[1].value, SqlValue::Integer(1));
    }

    #[test]
    fn test_bound_text_never_reaches_sql() {
        let mut binder = ParamBinder::new();
        let mut w = binder.predicate();
        w.sql("col = ").bind('n', "'; DROP TABLE declarations; --".into());
        let p = w.finish();

        assert_eq!(p.sql(), "col = @n0");
        assert!(!p.sql().contains("DROP"));
    }

    #[test]
    fn test_type_names() {
        assert_eq!(SqlValue::from("a").type_name(), "STRING");
        assert_eq!(SqlValue::from(2024).type_name(), "INT64");
        assert_eq!(SqlValue::from(1.5).type_name(), "FLOAT64");
    }

    #[test]
    fn test_untagged_deserialize() {
        let v: Vec<SqlValue> = serde_json::from_str(r#"[2023, 1.5, "Імпорт"]"#).unwrap();
        assert_eq!(
            v,
            vec![
                SqlValue::Integer(2023),
                SqlValue::Number(1.5),
                SqlValue::Text("Імпорт".into())
            ]
        );
    }
}
