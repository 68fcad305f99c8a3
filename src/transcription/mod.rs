pub mod providers;

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

use crate::config::{ProviderKind, TranscriptionConfig};
use crate::error::StageError;
use crate::retry::RetryPolicy;

/// Trait for remote speech-to-text providers
#[async_trait]
pub trait SpeechToText: Send + Sync {
    /// Upload one audio chunk and return its transcript text
    async fn transcribe(&self, audio_path: &Path) -> Result<String, StageError>;
    fn provider(&self) -> ProviderKind;
}

/// Create a speech-to-text instance based on configuration
pub fn create_transcriber(config: &TranscriptionConfig) -> anyhow::Result<Arc<dyn SpeechToText>> {
    match config.provider {
        ProviderKind::OpenAi => Ok(Arc::new(providers::OpenAiTranscriber::new(config.clone())?)),
        ProviderKind::Azure => Ok(Arc::new(providers::AzureTranscriber::new(config.clone())?)),
    }
}

/// Retry-wrapped transcription entry point used by the pipeline.
///
/// Every retry reuses the same chunk artifact; results are only ever
/// handed back to the caller, which owns the single write into its
/// record's transcript slot.
#[derive(Clone)]
pub struct TranscriptionClient {
    provider: Arc<dyn SpeechToText>,
    retry: RetryPolicy,
}

impl TranscriptionClient {
    pub fn new(provider: Arc<dyn SpeechToText>, retry: RetryPolicy) -> Self {
        Self { provider, retry }
    }

    pub async fn transcribe(&self, chunk_path: &Path) -> Result<String, StageError> {
        self.retry
            .run("transcription", || {
                let provider = Arc::clone(&self.provider);
                let path = chunk_path.to_path_buf();
                async move { provider.transcribe(&path).await }
            })
            .await
    }
}
