use super::{ChatMessage, ChatModel, ChatResponse};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::config::{LlmConfig, ProviderKind};
use crate::error::StageError;

#[derive(Debug, Serialize)]
struct CompletionRequest {
    // Azure routes the model through the deployment in the URL
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<String>,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
    usage: Option<CompletionUsage>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionUsage {
    total_tokens: u32,
}

fn classify_status(status: reqwest::StatusCode, detail: &str) -> StageError {
    let code = status.as_u16();
    if code == 408 || code == 429 || status.is_server_error() {
        StageError::Transient(format!("LLM API error {}: {}", status, detail))
    } else {
        StageError::Formatting(format!("LLM API error {}: {}", status, detail))
    }
}

fn classify_send_error(e: reqwest::Error) -> StageError {
    if e.is_timeout() || e.is_connect() || e.is_request() {
        StageError::Transient(format!("LLM request failed: {}", e))
    } else {
        StageError::Formatting(format!("LLM response unreadable: {}", e))
    }
}

async fn dispatch(
    builder: reqwest::RequestBuilder,
    request: &CompletionRequest,
) -> Result<ChatResponse, StageError> {
    let response = builder
        .json(request)
        .send()
        .await
        .map_err(classify_send_error)?;

    if !response.status().is_success() {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        return Err(classify_status(status, &text));
    }

    let completion: CompletionResponse = response.json().await.map_err(classify_send_error)?;

    let content = completion
        .choices
        .first()
        .map(|c| c.message.content.clone())
        .ok_or_else(|| StageError::Formatting("no choices in LLM response".to_string()))?;

    Ok(ChatResponse {
        content,
        tokens_used: completion.usage.map(|u| u.total_tokens),
    })
}

/// OpenAI-compatible chat provider (base URL + bearer key)
pub struct OpenAiChat {
    config: LlmConfig,
    client: reqwest::Client,
}

impl OpenAiChat {
    pub fn new(config: LlmConfig) -> Result<Self> {
        if config.endpoint.is_none() {
            return Err(anyhow!("LLM endpoint not configured"));
        }
        if config.api_key.is_none() {
            return Err(anyhow!("LLM API key not configured"));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self { config, client })
    }

    fn url(&self) -> String {
        let base = self.config.endpoint.as_deref().unwrap_or_default();
        format!("{}/chat/completions", base.trim_end_matches('/'))
    }
}

#[async_trait]
impl ChatModel for OpenAiChat {
    async fn chat(&self, messages: Vec<ChatMessage>) -> Result<ChatResponse, StageError> {
        let request = CompletionRequest {
            model: Some(self.config.model.clone()),
            messages,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let url = self.url();
        debug!("Sending chat completion request to {}", url);

        let api_key = self.config.api_key.as_deref().unwrap_or_default();
        let builder = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", api_key));

        dispatch(builder, &request).await
    }

    fn provider(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }
}

/// Azure OpenAI chat provider (deployment URL + api-key header)
pub struct AzureChat {
    config: LlmConfig,
    client: reqwest::Client,
}

impl AzureChat {
    pub fn new(config: LlmConfig) -> Result<Self> {
        if config.endpoint.is_none() {
            return Err(anyhow!("Azure endpoint not configured"));
        }
        if config.api_key.is_none() {
            return Err(anyhow!("Azure API key not configured"));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self { config, client })
    }

    fn url(&self) -> String {
        let endpoint = self.config.endpoint.as_deref().unwrap_or_default();
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            endpoint.trim_end_matches('/'),
            self.config.model,
            self.config.api_version
        )
    }
}

#[async_trait]
impl ChatModel for AzureChat {
    async fn chat(&self, messages: Vec<ChatMessage>) -> Result<ChatResponse, StageError> {
        let request = CompletionRequest {
            model: None,
            messages,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let url = self.url();
        debug!("Sending chat completion request to Azure deployment {}", self.config.model);

        let api_key = self.config.api_key.as_deref().unwrap_or_default();
        let builder = self.client.post(&url).header("api-key", api_key);

        dispatch(builder, &request).await
    }

    fn provider(&self) -> ProviderKind {
        ProviderKind::Azure
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> LlmConfig {
        LlmConfig {
            provider: ProviderKind::OpenAi,
            endpoint: Some("https://api.example.com/v1/".to_string()),
            api_key: Some("key".to_string()),
            model: "gpt-4o-mini".to_string(),
            api_version: "2024-12-01-preview".to_string(),
            max_tokens: 1024,
            temperature: 0.7,
            max_attempts: 3,
            retry_delay_ms: 1,
            timeout_seconds: 30,
        }
    }

    #[test]
    fn test_openai_url_strips_trailing_slash() {
        let chat = OpenAiChat::new(test_config()).unwrap();
        assert_eq!(chat.url(), "https://api.example.com/v1/chat/completions");
    }

    #[test]
    fn test_azure_url_includes_deployment_and_version() {
        let mut config = test_config();
        config.provider = ProviderKind::Azure;
        config.endpoint = Some("https://res.openai.azure.com".to_string());
        config.model = "gpt-4-1".to_string();

        let chat = AzureChat::new(config).unwrap();
        assert_eq!(
            chat.url(),
            "https://res.openai.azure.com/openai/deployments/gpt-4-1/chat/completions?api-version=2024-12-01-preview"
        );
    }

    #[test]
    fn test_status_classification() {
        let transient = classify_status(reqwest::StatusCode::TOO_MANY_REQUESTS, "slow down");
        assert!(transient.is_transient());

        let transient = classify_status(reqwest::StatusCode::BAD_GATEWAY, "upstream");
        assert!(transient.is_transient());

        let permanent = classify_status(reqwest::StatusCode::UNAUTHORIZED, "bad key");
        assert!(matches!(permanent, StageError::Formatting(_)));
    }

    #[test]
    fn test_construction_requires_credentials() {
        let mut config = test_config();
        config.api_key = None;
        assert!(OpenAiChat::new(config).is_err());
    }
}
