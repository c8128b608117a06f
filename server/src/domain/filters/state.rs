//! Per-session filter values

use thiserror::Error;

use super::predicate::SqlValue;
use super::spec::{CATALOG, FilterKind, FilterSpec, Hierarchy, ScalarType};
use super::value::FilterValue;

#[derive(Error, Debug, PartialEq)]
pub enum FilterError {
    #[error("Unknown filter: {0}")]
    UnknownFilter(String),

    #[error("Invalid value for filter '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Invalid table name: {0}")]
    InvalidTable(String),
}

impl FilterError {
    fn invalid(spec: &FilterSpec, reason: impl Into<String>) -> Self {
        FilterError::InvalidValue {
            key: spec.key.to_string(),
            reason: reason.into(),
        }
    }
}

/// Raw value as captured at the input boundary
#[derive(Debug, Clone, PartialEq)]
pub enum FilterInput {
    Selection(Vec<SqlValue>),
    Range { from: Option<f64>, to: Option<f64> },
    Text(String),
}

/// Current value of every catalog filter
#[derive(Debug, Clone)]
pub struct FilterState {
    catalog: &'static [FilterSpec],
    values: Vec<FilterValue>,
    generation: u64,
}

impl Default for FilterState {
    fn default() -> Self {
        Self::new(CATALOG)
    }
}

impl FilterState {
    pub fn new(catalog: &'static [FilterSpec]) -> Self {
        let values = catalog
            .iter()
            .map(|spec| FilterValue::inactive(spec.kind))
            .collect();
        Self {
            catalog,
            values,
            generation: 0,
        }
    }

    /// Bumped on every successful change
    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn index_of(&self, key: &str) -> Result<usize, FilterError> {
        self.catalog
            .iter()
            .position(|spec| spec.key == key)
            .ok_or_else(|| FilterError::UnknownFilter(key.to_string()))
    }

    /// Validate and store a value; no query building happens here
    pub fn set_value(&mut self, key: &str, input: FilterInput) -> Result<(), FilterError> {
        let idx = self.index_of(key)?;
        let spec = &self.catalog[idx];
        let value = to_value(spec, input)?;
        self.values[idx] = value;
        if let Some(h) = spec.hierarchy {
            self.narrow_deeper_levels(idx, h);
        }
        self.generation += 1;
        Ok(())
    }

    /// Drop deeper selections on the axis that fall outside the new one
    ///
    /// Levels of an axis are prefixes of the same code, so a position is kept
    /// only while it starts with one of the selected groups.
    fn narrow_deeper_levels(&mut self, idx: usize, hierarchy: Hierarchy) {
        let FilterValue::Selection { values } = &self.values[idx] else {
            return;
        };
        if values.is_empty() {
            return;
        }
        let prefixes: Vec<String> = values.iter().map(ToString::to_string).collect();

        for (spec, value) in self.catalog.iter().zip(self.values.iter_mut()) {
            let Some(h) = spec.hierarchy else { continue };
            if h.axis != hierarchy.axis || h.level <= hierarchy.level {
                continue;
            }
            if let FilterValue::Selection { values } = value {
                let before = values.len();
                values.retain(|v| {
                    let code = v.to_string();
                    prefixes.iter().any(|p| code.starts_with(p.as_str()))
                });
                if values.len() != before {
                    tracing::debug!(filter = spec.key, dropped = before - values.len(), "Narrowed by a broader level");
                }
            }
        }
    }

    pub fn reset(&mut self, key: &str) -> Result<(), FilterError> {
        let idx = self.index_of(key)?;
        self.values[idx] = FilterValue::inactive(self.catalog[idx].kind);
        self.generation += 1;
        Ok(())
    }

    pub fn reset_all(&mut self) {
        for (value, spec) in self.values.iter_mut().zip(self.catalog) {
            *value = FilterValue::inactive(spec.kind);
        }
        self.generation += 1;
    }

    pub fn is_active(&self, key: &str) -> Result<bool, FilterError> {
        let idx = self.index_of(key)?;
        Ok(self.values[idx].is_active())
    }

    pub fn value(&self, key: &str) -> Result<&FilterValue, FilterError> {
        let idx = self.index_of(key)?;
        Ok(&self.values[idx])
    }

    pub fn any_active(&self) -> bool {
        self.values.iter().any(FilterValue::is_active)
    }

    /// (spec, value) pairs in catalog order
    pub fn entries(&self) -> impl Iterator<Item = (&'static FilterSpec, &FilterValue)> {
        self.catalog.iter().zip(self.values.iter())
    }
}

fn to_value(spec: &FilterSpec, input: FilterInput) -> Result<FilterValue, FilterError> {
    match (spec.kind, input) {
        (kind, FilterInput::Selection(values)) if kind.is_categorical() => {
            let values = values
                .into_iter()
                .map(|v| coerce(spec, v))
                .collect::<Result<Vec<_>, _>>()?;
            let value = FilterValue::selection(values);
            if kind == FilterKind::CategoricalSingle
                && let FilterValue::Selection { values } = &value
                && values.len() > 1
            {
                return Err(FilterError::invalid(spec, "accepts a single value"));
            }
            Ok(value)
        }
        (FilterKind::NumericRange, FilterInput::Range { from, to }) => {
            Ok(FilterValue::range(from, to))
        }
        (kind, FilterInput::Text(text)) if kind.is_text_list() => Ok(FilterValue::tokens(&text)),
        (kind, _) => Err(FilterError::invalid(
            spec,
            format!("value shape does not match {}", kind_name(kind)),
        )),
    }
}

fn kind_name(kind: FilterKind) -> &'static str {
    match kind {
        FilterKind::CategoricalMulti => "categorical_multi",
        FilterKind::CategoricalSingle => "categorical_single",
        FilterKind::NumericRange => "numeric_range",
        FilterKind::TextListPrefix => "text_list_prefix",
        FilterKind::TextListContains => "text_list_contains",
        FilterKind::TextListExact => "text_list_exact",
    }
}

fn coerce(spec: &FilterSpec, value: SqlValue) -> Result<SqlValue, FilterError> {
    match (spec.value_type, value) {
        (ScalarType::Integer, SqlValue::Integer(v)) => Ok(SqlValue::Integer(v)),
        (ScalarType::Integer, SqlValue::Number(v)) if v.fract() == 0.0 && v.is_finite() => {
            Ok(SqlValue::Integer(v as i64))
        }
        (ScalarType::Integer, SqlValue::Text(s)) => s
            .trim()
            .parse::<i64>()
            .map(SqlValue::Integer)
            .map_err(|_| FilterError::invalid(spec, format!("'{s}' is not an integer"))),
        (ScalarType::Integer, SqlValue::Number(v)) => Err(FilterError::invalid(
            spec,
            format!("{v} is not an integer"),
        )),
        (ScalarType::Number, SqlValue::Integer(v)) => Ok(SqlValue::Number(v as f64)),
        (ScalarType::Number, SqlValue::Number(v)) => Ok(SqlValue::Number(v)),
        (ScalarType::Number, SqlValue::Text(s)) => s
            .trim()
            .parse::<f64>()
            .map(SqlValue::Number)
            .map_err(|_| FilterError::invalid(spec, format!("'{s}' is not a number"))),
        (ScalarType::Text, SqlValue::Text(s)) => Ok(SqlValue::Text(s)),
        (ScalarType::Text, other) => Ok(SqlValue::Text(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_read_value() {
        let mut state = FilterState::default();
        state
            .set_value("direction", FilterInput::Selection(vec!["Імпорт".into()]))
            .unwrap();

        assert!(state.is_active("direction").unwrap());
        assert!(!state.is_active("countries").unwrap());
        assert!(state.any_active());
    }

    #[test]
    fn test_years_coerced_to_integers() {
        let mut state = FilterState::default();
        state
            .set_value(
                "years",
                FilterInput::Selection(vec!["2023".into(), SqlValue::Number(2024.0)]),
            )
            .unwrap();

        assert_eq!(
            state.value("years").unwrap(),
            &FilterValue::Selection {
                values: vec![SqlValue::Integer(2023), SqlValue::Integer(2024)]
            }
        );
    }

    #[test]
    fn test_years_rejects_text() {
        let mut state = FilterState::default();
        let err = state
            .set_value("years", FilterInput::Selection(vec!["двадцять".into()]))
            .unwrap_err();
        assert!(matches!(err, FilterError::InvalidValue { .. }));
    }

    #[test]
    fn test_single_select_rejects_many() {
        let mut state = FilterState::default();
        let err = state
            .set_value(
                "customs_office",
                FilterInput::Selection(vec!["Київська".into(), "Одеська".into()]),
            )
            .unwrap_err();
        assert!(matches!(err, FilterError::InvalidValue { .. }));
        assert!(!state.is_active("customs_office").unwrap());
    }

    #[test]
    fn test_shape_mismatch() {
        let mut state = FilterState::default();
        let err = state
            .set_value("weight", FilterInput::Text("100".into()))
            .unwrap_err();
        assert!(err.to_string().contains("numeric_range"));
    }

    #[test]
    fn test_unknown_filter() {
        let mut state = FilterState::default();
        assert_eq!(
            state.reset("nope"),
            Err(FilterError::UnknownFilter("nope".into()))
        );
    }

    #[test]
    fn test_reset_single() {
        let mut state = FilterState::default();
        state
            .set_value("companies", FilterInput::Text("ТОВ Ромашка".into()))
            .unwrap();
        state
            .set_value("edrpou", FilterInput::Text("12345678".into()))
            .unwrap();

        state.reset("companies").unwrap();

        assert!(!state.is_active("companies").unwrap());
        assert!(state.is_active("edrpou").unwrap());
    }

    #[test]
    fn test_reset_all_restores_every_default() {
        let mut state = FilterState::default();
        state
            .set_value("direction", FilterInput::Selection(vec!["Експорт".into()]))
            .unwrap();
        state
            .set_value(
                "weight",
                FilterInput::Range {
                    from: Some(1.0),
                    to: Some(2.0),
                },
            )
            .unwrap();
        state
            .set_value("goods", FilterInput::Text("кава".into()))
            .unwrap();

        state.reset_all();

        for (spec, value) in state.entries() {
            assert_eq!(value, &FilterValue::inactive(spec.kind), "{}", spec.key);
        }
        assert!(!state.any_active());
    }

    #[test]
    fn test_generation_tracks_changes() {
        let mut state = FilterState::default();
        assert_eq!(state.generation(), 0);

        state
            .set_value("direction", FilterInput::Selection(vec!["Імпорт".into()]))
            .unwrap();
        assert_eq!(state.generation(), 1);

        state
            .set_value("years", FilterInput::Selection(vec!["двадцять".into()]))
            .unwrap_err();
        assert_eq!(state.generation(), 1);

        state.reset("direction").unwrap();
        state.reset_all();
        assert_eq!(state.generation(), 3);
    }

    #[test]
    fn test_group_change_drops_foreign_positions() {
        let mut state = FilterState::default();
        state
            .set_value(
                "uktzed_position",
                FilterInput::Selection(vec!["8471".into(), "8528".into()]),
            )
            .unwrap();

        state
            .set_value("uktzed_group", FilterInput::Selection(vec!["85".into()]))
            .unwrap();
        assert_eq!(
            state.value("uktzed_position").unwrap(),
            &FilterValue::Selection {
                values: vec!["8528".into()]
            }
        );

        state
            .set_value("uktzed_group", FilterInput::Selection(vec!["90".into()]))
            .unwrap();
        assert!(!state.is_active("uktzed_position").unwrap());
        assert!(state.is_active("uktzed_group").unwrap());
    }

    #[test]
    fn test_position_does_not_touch_group() {
        let mut state = FilterState::default();
        state
            .set_value("uktzed_group", FilterInput::Selection(vec!["84".into()]))
            .unwrap();
        state
            .set_value("uktzed_position", FilterInput::Selection(vec!["8528".into()]))
            .unwrap();

        assert!(state.is_active("uktzed_group").unwrap());
        assert!(state.is_active("uktzed_position").unwrap());
    }
}
