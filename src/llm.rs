use crate::config::LlmConfig;
use crate::error::{FinderError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

/// Text-in/text-out language model used to translate questions into SQL.
///
/// Implementations make no promise about the shape of the returned text; callers
/// must treat it as untrusted.
#[async_trait]
pub trait Oracle: Send + Sync {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;
}

/// OpenAI chat completion response (only the fields we read).
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Client for any OpenAI-compatible `/chat/completions` endpoint.
#[derive(Clone)]
pub struct LlmClient {
    api_key: String,
    base_url: String,
    model: String,
    http: reqwest::Client,
}

impl LlmClient {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| FinderError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            http,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl Oracle for LlmClient {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_prompt}
            ],
            "temperature": 0
        });

        info!(model = %self.model, "Calling LLM for SQL generation");

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| FinderError::Oracle(format!("LLM API call failed: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| FinderError::Oracle(format!("Failed to read LLM response: {}", e)))?;

        if !status.is_success() {
            return Err(FinderError::Oracle(format!("LLM API error {}: {}", status, text)));
        }

        parse_completion(&text)
    }
}

/// Pull the first choice's message content out of a chat completion body.
fn parse_completion(body: &str) -> Result<String> {
    let parsed: ChatCompletionResponse = serde_json::from_str(body)
        .map_err(|e| FinderError::Oracle(format!("Failed to parse LLM response: {}", e)))?;

    let content = parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| FinderError::Oracle("No content in LLM response".to_string()))?;

    debug!(raw = %content, "LLM raw response");
    Ok(content.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_completion_takes_first_choice() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"  SELECT 1;\n"}},{"message":{"content":"SELECT 2;"}}]}"#;
        assert_eq!(parse_completion(body).unwrap(), "SELECT 1;");
    }

    #[test]
    fn test_parse_completion_errors() {
        assert!(matches!(parse_completion("not json"), Err(FinderError::Oracle(_))));
        assert!(matches!(parse_completion(r#"{"choices":[]}"#), Err(FinderError::Oracle(_))));
        assert!(matches!(
            parse_completion(r#"{"choices":[{"message":{"content":null}}]}"#),
            Err(FinderError::Oracle(_))
        ));
    }

    #[test]
    fn test_client_normalizes_base_url() {
        let mut config = LlmConfig::new("sk-test");
        config.base_url = "http://localhost:8000/v1/".to_string();
        let client = LlmClient::new(&config).unwrap();
        assert_eq!(client.base_url, "http://localhost:8000/v1");
        assert_eq!(client.model(), "gpt-4o");
    }
}
