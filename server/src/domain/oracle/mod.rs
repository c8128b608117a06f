//! Natural-language oracle
//!
//! The model is a black box: prompt in, text out. This module builds the
//! prompts, reads whatever comes back, and turns every failure into an
//! [`OracleOutcome`] instead of an error.

mod client;
mod extract;
mod guard;
mod prompt;

use std::sync::Arc;

pub use client::{GeminiClient, OracleClient, OracleError};
pub use extract::{CodeSuggestion, FormatFailure, extract_json, parse_code_suggestions, parse_sql_suggestion};
pub use guard::guard_sql;

use crate::core::config::OracleConfig;

#[derive(Debug, Clone, PartialEq)]
pub enum OracleOutcome<T> {
    Ready(T),
    /// Oracle disabled or unreachable
    Unavailable(String),
    /// Response could not be used
    FormatFailure(FormatFailure),
}

#[derive(Clone)]
pub struct Oracle {
    client: Option<Arc<dyn OracleClient>>,
    table: String,
    max_items: u32,
}

impl Oracle {
    pub fn new(client: Option<Arc<dyn OracleClient>>, table: &str, max_items: u32) -> Self {
        Self {
            client,
            table: table.to_string(),
            max_items,
        }
    }

    pub fn from_config(config: &OracleConfig, table: &str) -> Result<Self, OracleError> {
        let client: Option<Arc<dyn OracleClient>> = if config.enabled {
            Some(Arc::new(GeminiClient::from_config(config)?))
        } else {
            None
        };
        Ok(Self::new(client, table, config.max_items))
    }

    pub fn is_enabled(&self) -> bool {
        self.client.is_some()
    }

    async fn generate(&self, prompt: &str) -> Result<String, String> {
        let Some(client) = &self.client else {
            return Err(OracleError::NotConfigured.to_string());
        };
        let start = std::time::Instant::now();
        let result = client.generate(prompt).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;
        match result {
            Ok(text) => {
                tracing::debug!(model = client.model(), elapsed_ms, chars = text.len(), "Oracle responded");
                Ok(text)
            }
            Err(e) => {
                tracing::warn!(model = client.model(), elapsed_ms, error = %e, "Oracle request failed");
                Err(e.to_string())
            }
        }
    }

    /// Read-only SQL for a question
    pub async fn sql_for(&self, question: &str) -> OracleOutcome<String> {
        let prompt = prompt::ask_prompt(&self.table, self.max_items, question);
        let text = match self.generate(&prompt).await {
            Ok(text) => text,
            Err(message) => return OracleOutcome::Unavailable(message),
        };

        let sql = match parse_sql_suggestion(&text) {
            Ok(sql) => sql,
            Err(failure) => return OracleOutcome::FormatFailure(failure),
        };

        match guard_sql(&sql) {
            Ok(sql) => OracleOutcome::Ready(sql),
            Err(reason) => {
                tracing::warn!(reason = %reason, "Generated SQL rejected");
                OracleOutcome::FormatFailure(FormatFailure {
                    reason: format!("generated SQL rejected: {reason}"),
                    raw: sql,
                })
            }
        }
    }

    /// Likely УКТЗЕД codes for a goods description
    pub async fn suggest_codes(&self, description: &str) -> OracleOutcome<Vec<String>> {
        let prompt = prompt::codes_prompt(description);
        let text = match self.generate(&prompt).await {
            Ok(text) => text,
            Err(message) => return OracleOutcome::Unavailable(message),
        };

        match parse_code_suggestions(&text) {
            CodeSuggestion::Codes(codes) => OracleOutcome::Ready(codes),
            CodeSuggestion::NoSuggestion { raw } => OracleOutcome::FormatFailure(FormatFailure {
                reason: "no code suggestion in response".to_string(),
                raw,
            }),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;

    use async_trait::async_trait;
    use parking_lot::Mutex;

    use super::{OracleClient, OracleError};

    /// Replays canned responses in order
    pub struct ScriptedOracle {
        responses: Mutex<VecDeque<Result<String, OracleError>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedOracle {
        pub fn new(responses: Vec<Result<String, OracleError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub fn replying(text: &str) -> Self {
            Self::new(vec![Ok(text.to_string())])
        }

        pub fn prompts(&self) -> Vec<String> {
            self.prompts.lock().clone()
        }
    }

    #[async_trait]
    impl OracleClient for ScriptedOracle {
        async fn generate(&self, prompt: &str) -> Result<String, OracleError> {
            self.prompts.lock().push(prompt.to_string());
            self.responses
                .lock()
                .pop_front()
                .unwrap_or(Err(OracleError::EmptyResponse))
        }

        fn model(&self) -> &str {
            "scripted"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::ScriptedOracle;
    use super::*;

    fn oracle(client: ScriptedOracle) -> (Oracle, Arc<ScriptedOracle>) {
        let client = Arc::new(client);
        (
            Oracle::new(Some(client.clone() as Arc<dyn OracleClient>), "declarations", 100),
            client,
        )
    }

    #[tokio::test]
    async fn test_sql_for_ready() {
        let (oracle, client) = oracle(ScriptedOracle::replying(
            r#"{"sql_query": "SELECT opis_tovaru FROM declarations LIMIT 100"}"#,
        ));
        assert_eq!(
            oracle.sql_for("кава").await,
            OracleOutcome::Ready("SELECT opis_tovaru FROM declarations LIMIT 100".into())
        );
        assert!(client.prompts()[0].contains("User request: кава"));
    }

    #[tokio::test]
    async fn test_sql_for_rejects_mutation() {
        let (oracle, _) = oracle(ScriptedOracle::replying(
            r#"{"sql_query": "DROP TABLE declarations"}"#,
        ));
        match oracle.sql_for("видали все").await {
            OracleOutcome::FormatFailure(f) => {
                assert!(f.reason.contains("rejected"));
                assert_eq!(f.raw, "DROP TABLE declarations");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_sql_for_format_failure_keeps_raw() {
        let (oracle, _) = oracle(ScriptedOracle::replying("Sorry, no."));
        match oracle.sql_for("?").await {
            OracleOutcome::FormatFailure(f) => assert_eq!(f.raw, "Sorry, no."),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_transport_failure_is_unavailable() {
        let (oracle, _) = oracle(ScriptedOracle::new(vec![Err(OracleError::Timeout)]));
        assert_eq!(
            oracle.suggest_codes("ноутбуки").await,
            OracleOutcome::Unavailable("Oracle request timed out".into())
        );
    }

    #[tokio::test]
    async fn test_disabled_oracle() {
        let oracle = Oracle::new(None, "declarations", 100);
        assert!(!oracle.is_enabled());
        assert!(matches!(
            oracle.sql_for("кава").await,
            OracleOutcome::Unavailable(_)
        ));
    }

    #[tokio::test]
    async fn test_suggest_codes() {
        let (oracle, _) = oracle(ScriptedOracle::replying("Коди: [\"8471\", \"847130\"]"));
        assert_eq!(
            oracle.suggest_codes("ноутбуки").await,
            OracleOutcome::Ready(vec!["8471".into(), "847130".into()])
        );
    }

    #[test]
    fn test_from_config_disabled() {
        let oracle = Oracle::from_config(&OracleConfig::default(), "declarations").unwrap();
        assert!(!oracle.is_enabled());
    }
}
