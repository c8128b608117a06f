//! Predicate builder
//!
//! Turns the active filters of a [`FilterState`] into predicates, in catalog
//! order. Inactive filters emit nothing.

use std::collections::HashMap;

use super::predicate::{ParamBinder, Predicate, PredicateWriter, SqlValue};
use super::spec::{FilterKind, FilterSpec};
use super::state::FilterState;
use super::value::FilterValue;
use crate::utils::sql::escape_like_pattern;

const LIKE_ESCAPE: &str = " ESCAPE '\\'";

/// Build predicates for every active filter
///
/// On a drill-down axis only the most specific active level is emitted; a
/// 4-digit position selection replaces the 2-digit group selection. Choosing
/// a group drops positions outside it (see [`FilterState::set_value`]), so a
/// position that survives here always agrees with the latest group.
pub fn build_predicates(state: &FilterState, binder: &mut ParamBinder) -> Vec<Predicate> {
    let winners = most_specific_levels(state);

    let mut predicates = Vec::new();
    for (spec, value) in state.entries() {
        if !value.is_active() {
            continue;
        }
        if let Some(h) = spec.hierarchy
            && winners.get(h.axis).is_some_and(|&top| top > h.level)
        {
            tracing::trace!(filter = spec.key, axis = h.axis, "Superseded by a more specific level");
            continue;
        }
        predicates.extend(build_for(spec, value, binder));
    }
    predicates
}

fn most_specific_levels(state: &FilterState) -> HashMap<&'static str, u8> {
    let mut levels: HashMap<&'static str, u8> = HashMap::new();
    for (spec, value) in state.entries() {
        if let Some(h) = spec.hierarchy
            && value.is_active()
        {
            let top = levels.entry(h.axis).or_insert(h.level);
            *top = (*top).max(h.level);
        }
    }
    levels
}

/// Predicates for one filter value (zero, one, or two for ranges)
pub fn build_for(spec: &FilterSpec, value: &FilterValue, binder: &mut ParamBinder) -> Vec<Predicate> {
    match (spec.kind, value) {
        (FilterKind::CategoricalMulti | FilterKind::CategoricalSingle, FilterValue::Selection { values })
            if !values.is_empty() =>
        {
            vec![categorical(spec, values, binder)]
        }
        (FilterKind::NumericRange, range @ FilterValue::Range { .. }) => {
            numeric_range(spec, range, binder)
        }
        (FilterKind::TextListPrefix, FilterValue::Tokens { tokens }) if !tokens.is_empty() => {
            let patterns = tokens
                .iter()
                .map(|t| format!("{}%", escape_like_pattern(t)));
            vec![like_any(spec, patterns, false, binder)]
        }
        (FilterKind::TextListContains, FilterValue::Tokens { tokens }) if !tokens.is_empty() => {
            let patterns = tokens
                .iter()
                .map(|t| format!("%{}%", escape_like_pattern(&t.to_uppercase())));
            vec![like_any(spec, patterns, true, binder)]
        }
        (FilterKind::TextListExact, FilterValue::Tokens { tokens }) if !tokens.is_empty() => {
            let mut w = binder.predicate();
            w.sql(spec.column)
                .sql(" IN (")
                .bind_list(spec.param_prefix, tokens.iter().cloned().map(SqlValue::Text))
                .sql(")");
            vec![w.finish()]
        }
        _ => Vec::new(),
    }
}

fn write_column(w: &mut PredicateWriter<'_>, spec: &FilterSpec, upper: bool) {
    if upper {
        w.sql("UPPER(").sql(spec.column).sql(")");
    } else {
        w.sql(spec.column);
    }
}

fn categorical(spec: &FilterSpec, values: &[SqlValue], binder: &mut ParamBinder) -> Predicate {
    let upper = !spec.case_sensitive;
    let bound = values.iter().map(|v| match v {
        SqlValue::Text(s) if upper => SqlValue::Text(s.to_uppercase()),
        other => other.clone(),
    });

    let mut w = binder.predicate();
    write_column(&mut w, spec, upper);
    if spec.kind == FilterKind::CategoricalSingle {
        // Single-select holds at most one value
        if let Some(v) = bound.into_iter().next() {
            w.sql(" = ").bind(spec.param_prefix, v);
        }
    } else {
        w.sql(" IN (").bind_list(spec.param_prefix, bound).sql(")");
    }
    w.finish()
}

fn numeric_range(spec: &FilterSpec, value: &FilterValue, binder: &mut ParamBinder) -> Vec<Predicate> {
    let (from, to) = value.effective_bounds();
    let mut out = Vec::with_capacity(2);

    if let Some(from) = from {
        let mut w = binder.predicate();
        w.sql("CAST(")
            .sql(spec.column)
            .sql(" AS numeric) >= ")
            .bind(spec.param_prefix, SqlValue::Number(from));
        out.push(w.finish());
    }
    if let Some(to) = to {
        let mut w = binder.predicate();
        w.sql("CAST(")
            .sql(spec.column)
            .sql(" AS numeric) <= ")
            .bind(spec.param_prefix, SqlValue::Number(to));
        out.push(w.finish());
    }
    out
}

fn like_any<I>(spec: &FilterSpec, patterns: I, upper: bool, binder: &mut ParamBinder) -> Predicate
where
    I: IntoIterator<Item = String>,
{
    let mut w = binder.predicate();
    w.sql("(");
    for (i, pattern) in patterns.into_iter().enumerate() {
        if i > 0 {
            w.sql(" OR ");
        }
        write_column(&mut w, spec, upper);
        w.sql(" LIKE ")
            .bind(spec.param_prefix, SqlValue::Text(pattern))
            .sql(LIKE_ESCAPE);
    }
    w.sql(")");
    w.finish()
}
