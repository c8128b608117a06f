//! Filter values
//!
//! "Unset" is always explicit: an empty selection, a range with both bounds
//! `None`, or an empty token list. Inactive values produce no predicate.

use serde::Serialize;
use utoipa::ToSchema;

use super::predicate::SqlValue;
use super::spec::FilterKind;

/// Delimiter for free-text token lists
pub const TOKEN_DELIMITER: char = ',';

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FilterValue {
    /// Selected options (categorical filters)
    Selection { values: Vec<SqlValue> },
    /// Numeric bounds, both inclusive
    Range { from: Option<f64>, to: Option<f64> },
    /// Parsed free-text list
    Tokens { tokens: Vec<String> },
}

impl FilterValue {
    /// Default value for a filter kind
    pub fn inactive(kind: FilterKind) -> Self {
        match kind {
            FilterKind::CategoricalMulti | FilterKind::CategoricalSingle => {
                FilterValue::Selection { values: Vec::new() }
            }
            FilterKind::NumericRange => FilterValue::Range {
                from: None,
                to: None,
            },
            FilterKind::TextListPrefix
            | FilterKind::TextListContains
            | FilterKind::TextListExact => FilterValue::Tokens { tokens: Vec::new() },
        }
    }

    /// Selection with duplicates removed, first occurrence kept
    pub fn selection(values: Vec<SqlValue>) -> Self {
        let mut unique: Vec<SqlValue> = Vec::with_capacity(values.len());
        for v in values {
            if !unique.contains(&v) {
                unique.push(v);
            }
        }
        FilterValue::Selection { values: unique }
    }

    /// Range where zero, negative and non-finite bounds mean unset
    pub fn range(from: Option<f64>, to: Option<f64>) -> Self {
        FilterValue::Range {
            from: normalize_bound(from),
            to: normalize_bound(to),
        }
    }

    /// Token list parsed from comma-separated text
    pub fn tokens(text: &str) -> Self {
        FilterValue::Tokens {
            tokens: parse_tokens(text),
        }
    }

    pub fn is_active(&self) -> bool {
        match self {
            FilterValue::Selection { values } => !values.is_empty(),
            FilterValue::Range { from, to } => from.is_some() || to.is_some(),
            FilterValue::Tokens { tokens } => !tokens.is_empty(),
        }
    }

    /// Bounds that actually constrain the query
    ///
    /// When both bounds are set and `to < from`, the upper bound is dropped
    /// and the range becomes `>= from`.
    pub fn effective_bounds(&self) -> (Option<f64>, Option<f64>) {
        match *self {
            FilterValue::Range {
                from: Some(from),
                to: Some(to),
            } if to < from => (Some(from), None),
            FilterValue::Range { from, to } => (from, to),
            _ => (None, None),
        }
    }
}

fn normalize_bound(v: Option<f64>) -> Option<f64> {
    v.filter(|x| x.is_finite() && *x > 0.0)
}

/// Split on the delimiter, trim, drop blanks and repeats (order kept)
pub fn parse_tokens(text: &str) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    for token in text.split(TOKEN_DELIMITER).map(str::trim) {
        if !token.is_empty() && !tokens.iter().any(|t| t == token) {
            tokens.push(token.to_string());
        }
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tokens() {
        assert_eq!(
            parse_tokens(" 8471, ,8471,  8528 ,,"),
            vec!["8471".to_string(), "8528".to_string()]
        );
        assert!(parse_tokens("").is_empty());
        assert!(parse_tokens(" , , ").is_empty());
    }

    #[test]
    fn test_range_sentinels_become_none() {
        assert_eq!(
            FilterValue::range(Some(0.0), Some(-5.0)),
            FilterValue::Range {
                from: None,
                to: None
            }
        );
        assert_eq!(
            FilterValue::range(Some(f64::NAN), Some(10.0)),
            FilterValue::Range {
                from: None,
                to: Some(10.0)
            }
        );
    }

    #[test]
    fn test_inactive_defaults() {
        for kind in [
            FilterKind::CategoricalMulti,
            FilterKind::CategoricalSingle,
            FilterKind::NumericRange,
            FilterKind::TextListPrefix,
            FilterKind::TextListContains,
            FilterKind::TextListExact,
        ] {
            let v = FilterValue::inactive(kind);
            assert!(!v.is_active());
        }
    }

    #[test]
    fn test_selection_dedup() {
        let v = FilterValue::selection(vec!["a".into(), "b".into(), "a".into()]);
        assert_eq!(
            v,
            FilterValue::Selection {
                values: vec!["a".into(), "b".into()]
            }
        );
    }

    #[test]
    fn test_effective_bounds_drops_inverted_upper() {
        assert_eq!(
            FilterValue::range(Some(500.0), Some(100.0)).effective_bounds(),
            (Some(500.0), None)
        );
        assert_eq!(
            FilterValue::range(Some(100.0), Some(500.0)).effective_bounds(),
            (Some(100.0), Some(500.0))
        );
        assert_eq!(
            FilterValue::range(None, Some(100.0)).effective_bounds(),
            (None, Some(100.0))
        );
    }
}
