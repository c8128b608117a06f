//! Generative language model client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderValue;
use serde::Deserialize;
use thiserror::Error;

use crate::core::config::OracleConfig;

#[derive(Error, Debug)]
pub enum OracleError {
    #[error("Oracle is not configured")]
    NotConfigured,

    #[error("Oracle API key contains characters not allowed in a header")]
    InvalidApiKey,

    #[error("Oracle request timed out")]
    Timeout,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Oracle returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Oracle returned an empty response")]
    EmptyResponse,
}

/// Text in, text out
#[async_trait]
pub trait OracleClient: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, OracleError>;

    fn model(&self) -> &str;
}

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Client for the `generateContent` endpoint
#[derive(Debug)]
pub struct GeminiClient {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: HeaderValue,
}

impl GeminiClient {
    pub fn from_config(config: &OracleConfig) -> Result<Self, OracleError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or(OracleError::NotConfigured)?;
        let mut api_key =
            HeaderValue::from_str(&api_key).map_err(|_| OracleError::InvalidApiKey)?;
        api_key.set_sensitive(true);

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(format!("Deklarant/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        tracing::debug!(model = %config.model, endpoint = %config.endpoint, "Oracle client initialized");
        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
        })
    }

    /// {endpoint}/{model}:generateContent
    fn generate_url(&self) -> String {
        format!("{}/{}:generateContent", self.endpoint, self.model)
    }

    /// POST request with the API key in a header, not the URL
    fn build_request(&self, prompt: &str) -> Result<reqwest::Request, OracleError> {
        let payload = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
        });
        Ok(self
            .client
            .post(self.generate_url())
            .header(API_KEY_HEADER, self.api_key.clone())
            .json(&payload)
            .build()?)
    }
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    text: Option<String>,
}

#[async_trait]
impl OracleClient for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, OracleError> {
        let request = self.build_request(prompt)?;
        let resp = self
            .client
            .execute(request)
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    OracleError::Timeout
                } else {
                    OracleError::Http(e)
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(OracleError::Status {
                status: status.as_u16(),
                message: message.chars().take(500).collect(),
            });
        }

        let body: GenerateResponse = resp.json().await?;
        let text: String = body
            .candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .filter_map(|p| p.text)
            .collect();

        if text.trim().is_empty() {
            return Err(OracleError::EmptyResponse);
        }
        Ok(text)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(api_key: Option<&str>) -> OracleConfig {
        OracleConfig {
            enabled: true,
            api_key: api_key.map(str::to_string),
            endpoint: "https://example.test/v1beta/".to_string(),
            ..OracleConfig::default()
        }
    }

    #[test]
    fn test_requires_api_key() {
        assert!(matches!(
            GeminiClient::from_config(&config(None)),
            Err(OracleError::NotConfigured)
        ));
        assert!(matches!(
            GeminiClient::from_config(&config(Some(""))),
            Err(OracleError::NotConfigured)
        ));
    }

    #[test]
    fn test_generate_url() {
        let client = GeminiClient::from_config(&config(Some("k"))).unwrap();
        assert_eq!(
            client.generate_url(),
            "https://example.test/v1beta/models/gemini-pro-latest:generateContent"
        );
    }

    #[test]
    fn test_api_key_sent_as_header() {
        let client = GeminiClient::from_config(&config(Some("secret-key"))).unwrap();
        let request = client.build_request("SELECT?").unwrap();

        assert_eq!(request.url().query(), None);
        let key = request.headers().get(API_KEY_HEADER).unwrap();
        assert_eq!(key.to_str().unwrap(), "secret-key");
        assert!(key.is_sensitive());
        assert!(!format!("{client:?}").contains("secret-key"));
    }

    #[test]
    fn test_api_key_with_newline_rejected() {
        assert!(matches!(
            GeminiClient::from_config(&config(Some("bad\nkey"))),
            Err(OracleError::InvalidApiKey)
        ));
    }

    #[test]
    fn test_response_text_joined() {
        let body: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"{\"sql_query\":"},{"text":"\"SELECT 1\"}"}]}}]}"#,
        )
        .unwrap();
        let text: String = body
            .candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .filter_map(|p| p.text)
            .collect();
        assert_eq!(text, r#"{"sql_query":"SELECT 1"}"#);
    }
}
