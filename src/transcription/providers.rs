use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use super::SpeechToText;
use crate::config::{ProviderKind, TranscriptionConfig};
use crate::error::StageError;

fn classify_status(status: reqwest::StatusCode, detail: &str) -> StageError {
    let code = status.as_u16();
    if code == 408 || code == 429 || status.is_server_error() {
        StageError::Transient(format!("transcription API error {}: {}", status, detail))
    } else {
        StageError::Transcription(format!("transcription API error {}: {}", status, detail))
    }
}

fn classify_send_error(e: reqwest::Error) -> StageError {
    if e.is_timeout() || e.is_connect() || e.is_request() {
        StageError::Transient(format!("transcription request failed: {}", e))
    } else {
        StageError::Transcription(format!("transcription response unreadable: {}", e))
    }
}

fn mime_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("wav") => "audio/wav",
        Some("m4a") => "audio/mp4",
        _ => "audio/mpeg",
    }
}

/// Build the multipart body for one chunk upload
async fn chunk_form(audio_path: &Path, model: &str) -> Result<Form, StageError> {
    let bytes = tokio::fs::read(audio_path).await?;
    let file_name = audio_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "chunk.mp3".to_string());

    let part = Part::bytes(bytes)
        .file_name(file_name)
        .mime_str(mime_for(audio_path))
        .map_err(|e| StageError::Transcription(format!("invalid upload part: {}", e)))?;

    Ok(Form::new()
        .part("file", part)
        .text("model", model.to_string())
        .text("response_format", "text")
        .text("temperature", "0"))
}

async fn dispatch(builder: reqwest::RequestBuilder, form: Form) -> Result<String, StageError> {
    let response = builder
        .multipart(form)
        .send()
        .await
        .map_err(classify_send_error)?;

    if !response.status().is_success() {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        return Err(classify_status(status, &text));
    }

    let transcript = response.text().await.map_err(classify_send_error)?;
    Ok(transcript)
}

/// OpenAI-compatible transcription provider (base URL + bearer key)
pub struct OpenAiTranscriber {
    config: TranscriptionConfig,
    client: reqwest::Client,
}

impl OpenAiTranscriber {
    pub fn new(config: TranscriptionConfig) -> Result<Self> {
        if config.endpoint.is_none() {
            return Err(anyhow!("transcription endpoint not configured"));
        }
        if config.api_key.is_none() {
            return Err(anyhow!("transcription API key not configured"));
        }

        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self { config, client })
    }

    fn url(&self) -> String {
        let base = self.config.endpoint.as_deref().unwrap_or_default();
        format!("{}/audio/transcriptions", base.trim_end_matches('/'))
    }
}

#[async_trait]
impl SpeechToText for OpenAiTranscriber {
    async fn transcribe(&self, audio_path: &Path) -> Result<String, StageError> {
        let url = self.url();
        debug!("Uploading {} to {}", audio_path.display(), url);

        let form = chunk_form(audio_path, &self.config.model).await?;
        let api_key = self.config.api_key.as_deref().unwrap_or_default();
        let builder = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", api_key));

        let transcript = dispatch(builder, form).await?;
        debug!(
            "Transcribed {} ({} chars)",
            audio_path.display(),
            transcript.len()
        );
        Ok(transcript)
    }

    fn provider(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }
}

/// Azure OpenAI transcription provider (deployment URL + api-key header)
pub struct AzureTranscriber {
    config: TranscriptionConfig,
    client: reqwest::Client,
}

impl AzureTranscriber {
    pub fn new(config: TranscriptionConfig) -> Result<Self> {
        if config.endpoint.is_none() {
            return Err(anyhow!("Azure endpoint not configured"));
        }
        if config.api_key.is_none() {
            return Err(anyhow!("Azure API key not configured"));
        }

        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self { config, client })
    }

    fn url(&self) -> String {
        let endpoint = self.config.endpoint.as_deref().unwrap_or_default();
        format!(
            "{}/openai/deployments/{}/audio/transcriptions?api-version={}",
            endpoint.trim_end_matches('/'),
            self.config.model,
            self.config.api_version
        )
    }
}

#[async_trait]
impl SpeechToText for AzureTranscriber {
    async fn transcribe(&self, audio_path: &Path) -> Result<String, StageError> {
        debug!(
            "Uploading {} to Azure deployment {}",
            audio_path.display(),
            self.config.model
        );

        let form = chunk_form(audio_path, &self.config.model).await?;
        let api_key = self.config.api_key.as_deref().unwrap_or_default();
        let builder = self.client.post(self.url()).header("api-key", api_key);

        dispatch(builder, form).await
    }

    fn provider(&self) -> ProviderKind {
        ProviderKind::Azure
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> TranscriptionConfig {
        TranscriptionConfig {
            provider: ProviderKind::OpenAi,
            endpoint: Some("https://api.example.com/v1".to_string()),
            api_key: Some("key".to_string()),
            model: "whisper-1".to_string(),
            api_version: "2024-12-01-preview".to_string(),
            max_attempts: 3,
            retry_delay_ms: 1,
            timeout_seconds: 60,
        }
    }

    #[test]
    fn test_openai_url() {
        let transcriber = OpenAiTranscriber::new(test_config()).unwrap();
        assert_eq!(transcriber.url(), "https://api.example.com/v1/audio/transcriptions");
    }

    #[test]
    fn test_azure_url() {
        let mut config = test_config();
        config.provider = ProviderKind::Azure;
        config.endpoint = Some("https://res.openai.azure.com/".to_string());
        config.model = "whisper".to_string();

        let transcriber = AzureTranscriber::new(config).unwrap();
        assert_eq!(
            transcriber.url(),
            "https://res.openai.azure.com/openai/deployments/whisper/audio/transcriptions?api-version=2024-12-01-preview"
        );
    }

    #[test]
    fn test_status_classification_split() {
        assert!(classify_status(reqwest::StatusCode::SERVICE_UNAVAILABLE, "down").is_transient());
        assert!(classify_status(reqwest::StatusCode::TOO_MANY_REQUESTS, "throttled").is_transient());
        assert!(matches!(
            classify_status(reqwest::StatusCode::UNSUPPORTED_MEDIA_TYPE, "bad codec"),
            StageError::Transcription(_)
        ));
        assert!(matches!(
            classify_status(reqwest::StatusCode::PAYLOAD_TOO_LARGE, "chunk too big"),
            StageError::Transcription(_)
        ));
    }

    #[test]
    fn test_mime_for_extension() {
        assert_eq!(mime_for(Path::new("a.mp3")), "audio/mpeg");
        assert_eq!(mime_for(Path::new("a.wav")), "audio/wav");
        assert_eq!(mime_for(Path::new("a.m4a")), "audio/mp4");
    }

    #[test]
    fn test_construction_requires_endpoint() {
        let mut config = test_config();
        config.endpoint = None;
        assert!(OpenAiTranscriber::new(config).is_err());
    }
}
