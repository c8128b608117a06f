//! Query assembler

use std::fmt;

use serde::Serialize;

use super::builder::build_predicates;
use super::predicate::{BoundParam, ParamBinder};
use super::spec::FilterSpec;
use super::state::{FilterError, FilterState};
use crate::utils::sql::is_valid_table_name;

/// Columns returned by a filtered search, in display order
pub const RESULT_COLUMNS: &[&str] = &[
    "napryamok",
    "data_deklaracii",
    "kraina_partner",
    "kod_uktzed",
    "opis_tovaru",
    "nazva_kompanii",
    "kod_edrpou",
    "torgova_marka",
    "mytnytsia",
    "mytna_vartist_hrn",
    "vaha_netto_kg",
];

const ORDER_BY: &str = "data_deklaracii DESC";

/// Validated `table` or `schema.table` identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableName(String);

impl TableName {
    pub fn parse(name: &str) -> Result<Self, FilterError> {
        if is_valid_table_name(name) {
            Ok(Self(name.to_string()))
        } else {
            Err(FilterError::InvalidTable(name.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Executable statement with its bindings in placeholder order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledQuery {
    pub sql: String,
    pub params: Vec<BoundParam>,
    pub limit: u32,
}

/// Outcome of compiling a filter state
#[derive(Debug, Clone, PartialEq)]
pub enum SearchPlan {
    Query(CompiledQuery),
    /// No active filter; no query must be issued
    NothingToSearch,
}

#[derive(Debug, Clone)]
pub struct QueryAssembler {
    table: TableName,
    limit: u32,
}

impl QueryAssembler {
    pub fn new(table: TableName, limit: u32) -> Self {
        Self { table, limit }
    }

    pub fn table(&self) -> &TableName {
        &self.table
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Combine all active predicates with AND under a hard row cap
    pub fn compile(&self, state: &FilterState) -> SearchPlan {
        let mut binder = ParamBinder::new();
        let predicates = build_predicates(state, &mut binder);
        if predicates.is_empty() {
            return SearchPlan::NothingToSearch;
        }

        let mut clauses = Vec::with_capacity(predicates.len());
        let mut params = Vec::new();
        for predicate in predicates {
            let (sql, bound) = predicate.into_parts();
            clauses.push(sql);
            params.extend(bound);
        }

        let sql = format!(
            "SELECT {} FROM {} WHERE {} ORDER BY {} LIMIT {}",
            RESULT_COLUMNS.join(", "),
            self.table,
            clauses.join(" AND "),
            ORDER_BY,
            self.limit
        );
        tracing::debug!(sql = %sql, params = params.len(), "Compiled search query");
        tracing::trace!(?params, "Bound parameters");

        SearchPlan::Query(CompiledQuery {
            sql,
            params,
            limit: self.limit,
        })
    }

    /// Distinct-values query for a categorical filter
    pub fn options_query(&self, spec: &FilterSpec) -> Option<String> {
        if !spec.kind.is_categorical() {
            return None;
        }
        Some(format!(
            "SELECT DISTINCT {col} AS value FROM {table} WHERE {col} IS NOT NULL ORDER BY value",
            col = spec.column,
            table = self.table
        ))
    }

    /// Cap an already-guarded statement at the configured row limit
    pub fn bounded(&self, sql: &str) -> String {
        let inner = sql.trim().trim_end_matches(';').trim_end();
        format!("SELECT * FROM ({inner}) AS q LIMIT {}", self.limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::filters::predicate::SqlValue;
    use crate::domain::filters::spec::{CATALOG, find};
    use crate::domain::filters::state::FilterInput;
    use crate::domain::filters::value::FilterValue;

    fn assembler() -> QueryAssembler {
        QueryAssembler::new(TableName::parse("declarations").unwrap(), 2000)
    }

    fn compiled(state: &FilterState) -> CompiledQuery {
        match assembler().compile(state) {
            SearchPlan::Query(q) => q,
            SearchPlan::NothingToSearch => panic!("expected a query"),
        }
    }

    fn where_clause(q: &CompiledQuery) -> &str {
        let start = q.sql.find(" WHERE ").unwrap() + " WHERE ".len();
        let end = q.sql.find(" ORDER BY ").unwrap();
        &q.sql[start..end]
    }

    fn params(q: &CompiledQuery) -> Vec<(&str, &SqlValue)> {
        q.params.iter().map(|p| (p.name.as_str(), &p.value)).collect()
    }

    #[test]
    fn test_table_name_validation() {
        assert!(TableName::parse("customs.declarations").is_ok());
        assert_eq!(
            TableName::parse("declarations; DROP TABLE x"),
            Err(FilterError::InvalidTable("declarations; DROP TABLE x".into()))
        );
    }

    #[test]
    fn test_scenario_direction_years_weight() {
        let mut state = FilterState::default();
        state
            .set_value("direction", FilterInput::Selection(vec!["Імпорт".into()]))
            .unwrap();
        state
            .set_value(
                "years",
                FilterInput::Selection(vec![2023.into(), 2024.into()]),
            )
            .unwrap();
        state
            .set_value(
                "weight",
                FilterInput::Range {
                    from: Some(100.0),
                    to: Some(0.0),
                },
            )
            .unwrap();

        let q = compiled(&state);

        assert_eq!(
            where_clause(&q),
            "napryamok IN (@d0) AND EXTRACT(YEAR FROM data_deklaracii) IN (@y0, @y1) \
             AND CAST(vaha_netto_kg AS numeric) >= @w0"
        );
        assert!(!q.sql.contains("<="));
        assert!(q.sql.ends_with(" LIMIT 2000"));
        assert_eq!(q.limit, 2000);
        assert_eq!(
            params(&q),
            vec![
                ("d0", &SqlValue::Text("Імпорт".into())),
                ("y0", &SqlValue::Integer(2023)),
                ("y1", &SqlValue::Integer(2024)),
                ("w0", &SqlValue::Number(100.0)),
            ]
        );
    }

    #[test]
    fn test_injection_values_only_in_params() {
        let hostile = [
            "O'Brien' OR 1=1--",
            "\\'; DROP TABLE declarations; --",
            "%_\\\"`",
        ];
        let keys = ["countries", "companies", "uktzed_codes", "edrpou", "customs_office"];

        for value in hostile {
            let mut state = FilterState::default();
            for key in keys {
                let spec = find(key).unwrap();
                let input = if spec.kind.is_categorical() {
                    FilterInput::Selection(vec![value.into()])
                } else {
                    FilterInput::Text(value.to_string())
                };
                state.set_value(key, input).unwrap();
            }

            let hostile_q = compiled(&state);

            let mut benign = FilterState::default();
            for key in keys {
                let spec = find(key).unwrap();
                let input = if spec.kind.is_categorical() {
                    FilterInput::Selection(vec!["x".into()])
                } else {
                    FilterInput::Text("x".to_string())
                };
                benign.set_value(key, input).unwrap();
            }

            assert_eq!(hostile_q.sql, compiled(&benign).sql);
            assert!(!hostile_q.sql.contains("O'Brien"));
            assert!(!hostile_q.sql.contains("DROP"));
            assert!(!hostile_q.sql.contains("1=1"));
            assert!(
                hostile_q
                    .params
                    .iter()
                    .any(|p| p.value.to_string().contains(&value.to_uppercase())
                        || p.value.to_string().contains(value))
            );
        }
    }

    #[test]
    fn test_inactive_filter_is_transparent() {
        let mut base = FilterState::default();
        base.set_value("direction", FilterInput::Selection(vec!["Експорт".into()]))
            .unwrap();
        let expected = compiled(&base);

        for spec in CATALOG.iter().filter(|s| s.key != "direction") {
            let mut state = base.clone();
            let inactive = match FilterValue::inactive(spec.kind) {
                FilterValue::Selection { .. } => FilterInput::Selection(Vec::new()),
                FilterValue::Range { .. } => FilterInput::Range {
                    from: Some(0.0),
                    to: Some(0.0),
                },
                FilterValue::Tokens { .. } => FilterInput::Text(" , ".into()),
            };
            state.set_value(spec.key, inactive).unwrap();

            let q = compiled(&state);
            assert_eq!(q.sql, expected.sql, "{}", spec.key);
            assert_eq!(q.params, expected.params, "{}", spec.key);
        }
    }

    #[test]
    fn test_and_across_or_within() {
        let mut state = FilterState::default();
        state
            .set_value("goods", FilterInput::Text("кава, чай".into()))
            .unwrap();
        state
            .set_value("countries", FilterInput::Selection(vec!["Кенія".into()]))
            .unwrap();

        let q = compiled(&state);
        let clauses: Vec<&str> = where_clause(&q).split(" AND ").collect();

        assert_eq!(clauses.len(), 2);
        assert_eq!(clauses[0], "kraina_partner IN (@c0)");
        assert_eq!(
            clauses[1],
            "(UPPER(opis_tovaru) LIKE @o0 ESCAPE '\\' OR UPPER(opis_tovaru) LIKE @o1 ESCAPE '\\')"
        );
    }

    #[test]
    fn test_no_active_filter_means_nothing_to_search() {
        let mut state = FilterState::default();
        assert_eq!(assembler().compile(&state), SearchPlan::NothingToSearch);

        state
            .set_value(
                "weight",
                FilterInput::Range {
                    from: Some(-1.0),
                    to: None,
                },
            )
            .unwrap();
        assert_eq!(assembler().compile(&state), SearchPlan::NothingToSearch);
    }

    #[test]
    fn test_inverted_range_compiles_to_lower_bound() {
        let mut state = FilterState::default();
        state
            .set_value(
                "weight",
                FilterInput::Range {
                    from: Some(500.0),
                    to: Some(100.0),
                },
            )
            .unwrap();

        let q = compiled(&state);
        assert_eq!(where_clause(&q), "CAST(vaha_netto_kg AS numeric) >= @w0");
        assert_eq!(params(&q), vec![("w0", &SqlValue::Number(500.0))]);
    }

    #[test]
    fn test_output_order_follows_catalog() {
        let mut a = FilterState::default();
        a.set_value("edrpou", FilterInput::Text("1".into())).unwrap();
        a.set_value("direction", FilterInput::Selection(vec!["Імпорт".into()]))
            .unwrap();

        let mut b = FilterState::default();
        b.set_value("direction", FilterInput::Selection(vec!["Імпорт".into()]))
            .unwrap();
        b.set_value("edrpou", FilterInput::Text("1".into())).unwrap();

        assert_eq!(compiled(&a), compiled(&b));
    }

    #[test]
    fn test_options_query() {
        let sql = assembler().options_query(find("years").unwrap()).unwrap();
        assert_eq!(
            sql,
            "SELECT DISTINCT EXTRACT(YEAR FROM data_deklaracii) AS value FROM declarations \
             WHERE EXTRACT(YEAR FROM data_deklaracii) IS NOT NULL ORDER BY value"
        );
        assert!(assembler().options_query(find("weight").unwrap()).is_none());
    }

    #[test]
    fn test_bounded() {
        assert_eq!(
            assembler().bounded("SELECT kod_uktzed FROM declarations LIMIT 100;"),
            "SELECT * FROM (SELECT kod_uktzed FROM declarations LIMIT 100) AS q LIMIT 2000"
        );
    }
}
