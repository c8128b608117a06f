//! Search orchestration
//!
//! Turns a filter state or a question into a processed result table. Every
//! failure below the HTTP layer ends up as a [`SearchStatus`] with an empty
//! table, never as an error.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use super::filters::{
    BoundParam, CompiledQuery, FilterError, FilterInput, FilterState, QueryAssembler, SearchPlan,
    SqlValue, find,
};
use super::oracle::{Oracle, OracleOutcome};
use super::results::{Cell, ResultTable};
use crate::data::cache::{CacheKey, CacheService};
use crate::data::duckdb::sql_types::cell_to_sql_value;
use crate::data::{DataError, QueryEngine};

/// Filter that receives applied code suggestions
pub const CODES_FILTER_KEY: &str = "uktzed_codes";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SearchStatus {
    Ok,
    NothingToSearch,
    ExecutionFailed,
    OracleFormatFailure,
    OracleUnavailable,
    /// Filters changed while the run was in flight; nothing was stored
    Superseded,
}

/// Result of a search or question
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    pub status: SearchStatus,
    pub message: Option<String>,
    /// Raw model output when the oracle answer was unusable
    pub raw: Option<String>,
    /// Statement that was executed, if any
    pub sql: Option<String>,
    pub table: ResultTable,
}

impl SearchOutcome {
    fn empty(status: SearchStatus, message: Option<String>) -> Self {
        Self {
            status,
            message,
            raw: None,
            sql: None,
            table: ResultTable::default(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == SearchStatus::Ok
    }
}

/// Result of a code suggestion request
#[derive(Debug, Clone, PartialEq)]
pub struct CodesOutcome {
    pub status: SearchStatus,
    pub codes: Vec<String>,
    pub message: Option<String>,
    pub raw: Option<String>,
}

#[derive(Error, Debug)]
pub enum OptionsError {
    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error("Filter '{0}' has no option list")]
    NotCategorical(String),

    #[error(transparent)]
    Data(#[from] DataError),
}

#[derive(Clone)]
pub struct SearchService {
    engine: Arc<dyn QueryEngine>,
    assembler: QueryAssembler,
    cache: Arc<CacheService>,
    oracle: Oracle,
    reference_ttl: Duration,
}

impl SearchService {
    pub fn new(
        engine: Arc<dyn QueryEngine>,
        assembler: QueryAssembler,
        cache: Arc<CacheService>,
        oracle: Oracle,
        reference_ttl: Duration,
    ) -> Self {
        Self {
            engine,
            assembler,
            cache,
            oracle,
            reference_ttl,
        }
    }

    pub fn assembler(&self) -> &QueryAssembler {
        &self.assembler
    }

    pub fn oracle_enabled(&self) -> bool {
        self.oracle.is_enabled()
    }

    /// Compiled statement for the current filters, without executing it
    pub fn preview(&self, state: &FilterState) -> SearchPlan {
        self.assembler.compile(state)
    }

    /// Compile and execute the filter state
    pub async fn run(&self, state: &FilterState) -> SearchOutcome {
        match self.assembler.compile(state) {
            SearchPlan::NothingToSearch => {
                tracing::debug!("Search skipped: no active filter");
                SearchOutcome::empty(SearchStatus::NothingToSearch, None)
            }
            SearchPlan::Query(CompiledQuery { sql, params, .. }) => {
                self.execute(sql, &params).await
            }
        }
    }

    /// Answer a natural-language question through the oracle
    pub async fn ask(&self, question: &str) -> SearchOutcome {
        let question = question.trim();
        if question.is_empty() {
            return SearchOutcome::empty(SearchStatus::NothingToSearch, None);
        }

        match self.oracle.sql_for(question).await {
            OracleOutcome::Ready(sql) => {
                let bounded = self.assembler.bounded(&sql);
                self.execute(bounded, &[]).await
            }
            OracleOutcome::Unavailable(message) => {
                SearchOutcome::empty(SearchStatus::OracleUnavailable, Some(message))
            }
            OracleOutcome::FormatFailure(failure) => SearchOutcome {
                raw: Some(failure.raw),
                ..SearchOutcome::empty(SearchStatus::OracleFormatFailure, Some(failure.reason))
            },
        }
    }

    async fn execute(&self, sql: String, params: &[BoundParam]) -> SearchOutcome {
        let start = Instant::now();
        match self.engine.execute(&sql, params).await {
            Ok(table) => {
                let table = table.post_process();
                tracing::debug!(
                    rows = table.len(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    backend = self.engine.backend_name(),
                    "Search executed"
                );
                SearchOutcome {
                    status: SearchStatus::Ok,
                    message: None,
                    raw: None,
                    sql: Some(sql),
                    table,
                }
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Search execution failed"
                );
                SearchOutcome {
                    sql: Some(sql),
                    ..SearchOutcome::empty(SearchStatus::ExecutionFailed, Some(e.to_string()))
                }
            }
        }
    }

    /// Distinct values for a categorical filter, cached by query text
    pub async fn options(&self, key: &str) -> Result<Vec<SqlValue>, OptionsError> {
        let spec = find(key).ok_or_else(|| FilterError::UnknownFilter(key.to_string()))?;
        let sql = self
            .assembler
            .options_query(spec)
            .ok_or_else(|| OptionsError::NotCategorical(key.to_string()))?;
        let cache_key = CacheKey::filter_options(&sql);

        match self.cache.get::<Vec<SqlValue>>(&cache_key).await {
            Ok(Some(values)) => {
                tracing::trace!(filter = key, "Filter options cache hit");
                return Ok(values);
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, filter = key, "Filter options cache read failed"),
        }

        let table = self.engine.execute(&sql, &[]).await?;
        let values: Vec<SqlValue> = table
            .rows
            .into_iter()
            .filter_map(|row| row.into_iter().next())
            .filter_map(|cell| match cell {
                Cell::Missing => None,
                cell => cell_to_sql_value(cell),
            })
            .collect();

        if let Err(e) = self
            .cache
            .set(&cache_key, &values, Some(self.reference_ttl))
            .await
        {
            tracing::warn!(error = %e, filter = key, "Filter options cache write failed");
        }
        tracing::debug!(filter = key, count = values.len(), "Filter options loaded");
        Ok(values)
    }

    /// Ask the oracle for УКТЗЕД codes matching a goods description
    pub async fn suggest_codes(&self, description: &str) -> CodesOutcome {
        let description = description.trim();
        if description.is_empty() {
            return CodesOutcome {
                status: SearchStatus::NothingToSearch,
                codes: Vec::new(),
                message: None,
                raw: None,
            };
        }

        match self.oracle.suggest_codes(description).await {
            OracleOutcome::Ready(codes) => CodesOutcome {
                status: SearchStatus::Ok,
                codes,
                message: None,
                raw: None,
            },
            OracleOutcome::Unavailable(message) => CodesOutcome {
                status: SearchStatus::OracleUnavailable,
                codes: Vec::new(),
                message: Some(message),
                raw: None,
            },
            OracleOutcome::FormatFailure(failure) => CodesOutcome {
                status: SearchStatus::OracleFormatFailure,
                codes: Vec::new(),
                message: Some(failure.reason),
                raw: Some(failure.raw),
            },
        }
    }
}

/// Put suggested codes into the code filter
pub fn apply_codes(state: &mut FilterState, codes: &[String]) -> Result<(), FilterError> {
    state.set_value(CODES_FILTER_KEY, FilterInput::Text(codes.join(", ")))
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use parking_lot::Mutex;

    use super::*;
    use crate::core::config::CacheConfig;
    use crate::data::duckdb::{DuckdbService, FileAccess};
    use crate::domain::filters::{FilterValue, TableName};
    use crate::domain::oracle::OracleClient;
    use crate::domain::oracle::testing::ScriptedOracle;

    /// Records calls and returns a fixed answer
    struct StubEngine {
        calls: Mutex<Vec<(String, Vec<BoundParam>)>>,
        result: Result<ResultTable, String>,
    }

    impl StubEngine {
        fn returning(table: ResultTable) -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                result: Ok(table),
            })
        }

        fn failing(message: &str) -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                result: Err(message.to_string()),
            })
        }

        fn calls(&self) -> Vec<(String, Vec<BoundParam>)> {
            self.calls.lock().clone()
        }
    }

    #[async_trait]
    impl QueryEngine for StubEngine {
        async fn execute(
            &self,
            sql: &str,
            params: &[BoundParam],
        ) -> Result<ResultTable, DataError> {
            self.calls.lock().push((sql.to_string(), params.to_vec()));
            self.result
                .clone()
                .map_err(|reason| DataError::backend_unavailable("stub", reason))
        }

        fn backend_name(&self) -> &'static str {
            "stub"
        }
    }

    fn cache() -> Arc<CacheService> {
        Arc::new(CacheService::new(&CacheConfig::default()).unwrap())
    }

    fn assembler() -> QueryAssembler {
        QueryAssembler::new(TableName::parse("declarations").unwrap(), 2000)
    }

    fn service(engine: Arc<dyn QueryEngine>, oracle: Oracle) -> SearchService {
        SearchService::new(engine, assembler(), cache(), oracle, Duration::from_secs(3600))
    }

    fn no_oracle() -> Oracle {
        Oracle::new(None, "declarations", 100)
    }

    fn scripted(reply: &str) -> Oracle {
        Oracle::new(
            Some(Arc::new(ScriptedOracle::replying(reply)) as Arc<dyn OracleClient>),
            "declarations",
            100,
        )
    }

    fn raw_table() -> ResultTable {
        ResultTable::new(
            vec!["napryamok".to_string(), "mytna_vartist_hrn".to_string()],
            vec![
                vec![Cell::Text("Імпорт".into()), Cell::Text("1 500,50".into())],
                vec![Cell::Text("Імпорт".into()), Cell::Text("n/a".into())],
            ],
        )
    }

    async fn warehouse() -> Arc<DuckdbService> {
        let db = DuckdbService::init(
            None,
            TableName::parse("declarations").unwrap(),
            30,
            FileAccess::Disabled,
        )
        .await
        .unwrap();
        db.conn()
            .unwrap()
            .execute_batch(
                "INSERT INTO declarations VALUES
                 ('Імпорт', DATE '2024-03-15', 'Китай', '8471300000', 'Ноутбук', 'ТОВ Альфа', '12345678', 'Lenovo', 'Київська', 1500.5, 150),
                 ('Імпорт', DATE '2023-06-01', 'Китай', '8471410000', 'Ноутбук O''Brien', 'ТОВ Гамма', '11112222', NULL, 'Львівська', 900, 50),
                 ('Експорт', DATE '2023-01-02', 'Польща', '1001990000', 'Пшениця', 'ТОВ Бета', '87654321', NULL, 'Одеська', NULL, 20000)",
            )
            .unwrap();
        Arc::new(db)
    }

    #[tokio::test]
    async fn test_run_without_filters_issues_no_query() {
        let engine = StubEngine::returning(raw_table());
        let svc = service(engine.clone(), no_oracle());

        let outcome = svc.run(&FilterState::default()).await;

        assert_eq!(outcome.status, SearchStatus::NothingToSearch);
        assert!(outcome.table.is_empty());
        assert!(engine.calls().is_empty());
    }

    #[tokio::test]
    async fn test_run_post_processes_results() {
        let engine = StubEngine::returning(raw_table());
        let svc = service(engine.clone(), no_oracle());
        let mut state = FilterState::default();
        state
            .set_value("direction", FilterInput::Selection(vec![SqlValue::from("Імпорт")]))
            .unwrap();

        let outcome = svc.run(&state).await;

        assert!(outcome.is_ok());
        assert_eq!(outcome.table.columns[1].label, "Митна вартість, грн");
        assert_eq!(outcome.table.rows[0][1], Cell::Number(1500.5));
        assert_eq!(outcome.table.rows[1][1], Cell::Missing);
        let calls = engine.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].0.contains("napryamok IN (@d0)"));
    }

    #[tokio::test]
    async fn test_run_execution_failure_is_status() {
        let engine = StubEngine::failing("boom");
        let svc = service(engine, no_oracle());
        let mut state = FilterState::default();
        state
            .set_value("weight", FilterInput::Range { from: Some(1.0), to: None })
            .unwrap();

        let outcome = svc.run(&state).await;

        assert_eq!(outcome.status, SearchStatus::ExecutionFailed);
        assert!(outcome.message.unwrap().contains("boom"));
        assert!(outcome.table.is_empty());
    }

    #[tokio::test]
    async fn test_run_against_warehouse_binds_hostile_text() {
        let svc = service(Arc::new(warehouse().await), no_oracle());
        let mut state = FilterState::default();
        state
            .set_value("goods", FilterInput::Text("o'brien".into()))
            .unwrap();

        let outcome = svc.run(&state).await;
        assert!(outcome.is_ok(), "{:?}", outcome.message);
        assert_eq!(outcome.table.len(), 1);

        state
            .set_value("goods", FilterInput::Text("' OR 1=1--".into()))
            .unwrap();
        let outcome = svc.run(&state).await;
        assert!(outcome.is_ok());
        assert!(outcome.table.is_empty());
    }

    #[tokio::test]
    async fn test_run_against_warehouse_scenario() {
        let svc = service(Arc::new(warehouse().await), no_oracle());
        let mut state = FilterState::default();
        state
            .set_value("direction", FilterInput::Selection(vec![SqlValue::from("Імпорт")]))
            .unwrap();
        state
            .set_value(
                "years",
                FilterInput::Selection(vec![SqlValue::Integer(2023), SqlValue::Integer(2024)]),
            )
            .unwrap();
        state
            .set_value("weight", FilterInput::Range { from: Some(100.0), to: Some(0.0) })
            .unwrap();

        let outcome = svc.run(&state).await;

        assert!(outcome.is_ok(), "{:?}", outcome.message);
        assert_eq!(outcome.table.len(), 1);
        assert_eq!(outcome.table.summary().total_weight, 150.0);
    }

    #[tokio::test]
    async fn test_ask_empty_question() {
        let engine = StubEngine::returning(raw_table());
        let svc = service(engine.clone(), scripted("{}"));
        let outcome = svc.ask("   ").await;
        assert_eq!(outcome.status, SearchStatus::NothingToSearch);
        assert!(engine.calls().is_empty());
    }

    #[tokio::test]
    async fn test_ask_wraps_generated_sql() {
        let engine = StubEngine::returning(raw_table());
        let svc = service(
            engine.clone(),
            scripted(r#"{"sql_query": "SELECT napryamok FROM declarations LIMIT 100;"}"#),
        );

        let outcome = svc.ask("що імпортували?").await;

        assert!(outcome.is_ok());
        let calls = engine.calls();
        assert_eq!(
            calls[0].0,
            "SELECT * FROM (SELECT napryamok FROM declarations LIMIT 100) AS q LIMIT 2000"
        );
        assert!(calls[0].1.is_empty());
    }

    #[tokio::test]
    async fn test_ask_statuses() {
        let engine = StubEngine::returning(raw_table());

        let outcome = service(engine.clone(), no_oracle()).ask("кава").await;
        assert_eq!(outcome.status, SearchStatus::OracleUnavailable);

        let outcome = service(engine.clone(), scripted("not json at all"))
            .ask("кава")
            .await;
        assert_eq!(outcome.status, SearchStatus::OracleFormatFailure);
        assert_eq!(outcome.raw.as_deref(), Some("not json at all"));

        let outcome = service(engine.clone(), scripted(r#"{"sql_query": "DELETE FROM declarations"}"#))
            .ask("кава")
            .await;
        assert_eq!(outcome.status, SearchStatus::OracleFormatFailure);
        assert!(engine.calls().is_empty());
    }

    #[tokio::test]
    async fn test_options_are_cached() {
        let engine = StubEngine::returning(ResultTable::new(
            vec!["value".to_string()],
            vec![
                vec![Cell::Text("Експорт".into())],
                vec![Cell::Text("Імпорт".into())],
                vec![Cell::Missing],
            ],
        ));
        let svc = service(engine.clone(), no_oracle());

        let first = svc.options("direction").await.unwrap();
        let second = svc.options("direction").await.unwrap();

        assert_eq!(first, vec![SqlValue::from("Експорт"), SqlValue::from("Імпорт")]);
        assert_eq!(first, second);
        assert_eq!(engine.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_options_against_warehouse() {
        let svc = service(Arc::new(warehouse().await), no_oracle());
        assert_eq!(
            svc.options("years").await.unwrap(),
            vec![SqlValue::Integer(2023), SqlValue::Integer(2024)]
        );
        assert_eq!(
            svc.options("uktzed_group").await.unwrap(),
            vec![SqlValue::from("10"), SqlValue::from("84")]
        );
    }

    #[tokio::test]
    async fn test_options_errors() {
        let svc = service(StubEngine::returning(ResultTable::default()), no_oracle());
        assert!(matches!(
            svc.options("weight").await,
            Err(OptionsError::NotCategorical(_))
        ));
        assert!(matches!(
            svc.options("nope").await,
            Err(OptionsError::Filter(FilterError::UnknownFilter(_)))
        ));
    }

    #[tokio::test]
    async fn test_suggest_codes_and_apply() {
        let svc = service(
            StubEngine::returning(ResultTable::default()),
            scripted(r#"{"codes": ["8471 30", "8471.41"]}"#),
        );

        let outcome = svc.suggest_codes("ноутбуки").await;
        assert_eq!(outcome.status, SearchStatus::Ok);
        assert_eq!(outcome.codes, vec!["847130", "847141"]);

        let mut state = FilterState::default();
        apply_codes(&mut state, &outcome.codes).unwrap();
        assert_eq!(
            state.value(CODES_FILTER_KEY).unwrap(),
            &FilterValue::tokens("847130, 847141")
        );
    }
}
