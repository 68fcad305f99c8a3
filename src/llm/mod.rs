pub mod providers;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::{LlmConfig, ProviderKind};
use crate::error::StageError;

/// Chat message for LLM communication
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// LLM response
#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub content: String,
    pub tokens_used: Option<u32>,
}

/// Trait for remote text-generation providers
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn chat(&self, messages: Vec<ChatMessage>) -> Result<ChatResponse, StageError>;
    fn provider(&self) -> ProviderKind;
}

/// Create a chat model instance based on configuration
pub fn create_chat_model(config: &LlmConfig) -> anyhow::Result<Arc<dyn ChatModel>> {
    match config.provider {
        ProviderKind::OpenAi => Ok(Arc::new(providers::OpenAiChat::new(config.clone())?)),
        ProviderKind::Azure => Ok(Arc::new(providers::AzureChat::new(config.clone())?)),
    }
}
