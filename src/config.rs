use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Remote provider flavor, selected once at construction time.
///
/// The pipeline never branches on this; the factories in `transcription`
/// and `llm` pick the implementation and hand back a trait object.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Any OpenAI-compatible endpoint (base URL + bearer key).
    OpenAi,
    /// Azure OpenAI deployments (endpoint + api-key header + api-version).
    Azure,
}

/// Configuration for the lecture-scribe pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Input discovery settings
    pub processing: ProcessingConfig,

    /// Audio extraction and chunking settings
    pub audio: AudioConfig,

    /// Remote speech-to-text settings
    pub transcription: TranscriptionConfig,

    /// Remote text-generation settings
    pub llm: LlmConfig,

    /// Output and storage settings
    pub output: OutputConfig,

    /// Performance and resource settings
    pub performance: PerformanceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingConfig {
    /// Supported video file extensions
    pub video_extensions: Vec<String>,

    /// Extensions treated as ready-made audio: no extraction pass, and the
    /// file stays caller-owned (cleanup will not touch it)
    pub audio_extensions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Audio codec handed to ffmpeg for the extraction pass
    pub codec: String,

    /// Sample rate for extracted audio
    pub sample_rate: u32,

    /// Channel count for extracted audio
    pub channels: u32,

    /// Bitrate for extracted audio (ffmpeg syntax, e.g. "192k")
    pub bitrate: String,

    /// Per-chunk upload limit of the transcription provider, in bytes.
    /// Chunk count is derived from this; realized chunk sizes may still
    /// exceed it under variable bitrate, which is warned, not fatal.
    pub max_chunk_bytes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionConfig {
    /// Provider flavor
    pub provider: ProviderKind,

    /// Base URL (OpenAI-compatible) or resource endpoint (Azure)
    pub endpoint: Option<String>,

    /// API key
    pub api_key: Option<String>,

    /// Model name (OpenAI-compatible) or deployment name (Azure)
    pub model: String,

    /// Azure api-version query parameter
    pub api_version: String,

    /// Maximum attempts for transient failures
    pub max_attempts: u32,

    /// Base delay between retries in milliseconds (grows linearly)
    pub retry_delay_ms: u64,

    /// Per-request timeout in seconds
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider flavor
    pub provider: ProviderKind,

    /// Base URL (OpenAI-compatible) or resource endpoint (Azure)
    pub endpoint: Option<String>,

    /// API key
    pub api_key: Option<String>,

    /// Model name (OpenAI-compatible) or deployment name (Azure)
    pub model: String,

    /// Azure api-version query parameter
    pub api_version: String,

    /// Maximum tokens to generate
    pub max_tokens: u32,

    /// Sampling temperature
    pub temperature: f32,

    /// Maximum attempts for transient failures
    pub max_attempts: u32,

    /// Base delay between retries in milliseconds (grows linearly)
    pub retry_delay_ms: u64,

    /// Per-request timeout in seconds
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory for generated notes
    pub base_dir: PathBuf,

    /// File name of the batch report written next to the notes
    pub report_file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceConfig {
    /// Maximum number of files processed concurrently
    pub max_workers: usize,

    /// Scratch directory for extracted audio and chunk files.
    /// Defaults to a per-run temporary directory when unset.
    pub scratch_dir: Option<PathBuf>,
}

impl Config {
    /// Load configuration from file, falling back to environment overrides
    pub fn load() -> Result<Self> {
        let config_paths = [
            "lecture-scribe.toml",
            "config/lecture-scribe.toml",
            "~/.config/lecture-scribe/config.toml",
        ];

        for path in &config_paths {
            if let Ok(config_str) = std::fs::read_to_string(path) {
                match toml::from_str(&config_str) {
                    Ok(config) => {
                        tracing::info!("📄 Loaded configuration from: {}", path);
                        return Ok(config);
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse config file {}: {}", path, e);
                    }
                }
            }
        }

        Ok(Self::from_env())
    }

    /// Apply environment overrides on top of defaults
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(workers) = std::env::var("LECTURE_SCRIBE_WORKERS") {
            config.performance.max_workers = workers.parse().unwrap_or(config.performance.max_workers);
        }

        if let Ok(limit) = std::env::var("LECTURE_SCRIBE_MAX_CHUNK_BYTES") {
            config.audio.max_chunk_bytes = limit.parse().unwrap_or(config.audio.max_chunk_bytes);
        }

        if let Ok(output_dir) = std::env::var("LECTURE_SCRIBE_OUTPUT_DIR") {
            config.output.base_dir = PathBuf::from(output_dir);
        }

        if let Ok(api_key) = std::env::var("OPENAI_API_KEY") {
            config.transcription.api_key = Some(api_key.clone());
            config.llm.api_key = Some(api_key);
        }

        if let Ok(base_url) = std::env::var("OPENAI_BASE_URL") {
            config.transcription.endpoint = Some(base_url.clone());
            config.llm.endpoint = Some(base_url);
        }

        if let Ok(api_key) = std::env::var("AZURE_OPENAI_API_KEY") {
            config.transcription.provider = ProviderKind::Azure;
            config.llm.provider = ProviderKind::Azure;
            config.transcription.api_key = Some(api_key.clone());
            config.llm.api_key = Some(api_key);
        }

        if let Ok(endpoint) = std::env::var("AZURE_OPENAI_ENDPOINT") {
            config.transcription.endpoint = Some(endpoint.clone());
            config.llm.endpoint = Some(endpoint);
        }

        config
    }

    /// Save configuration to file
    pub fn save(&self, path: &str) -> Result<()> {
        let config_str = toml::to_string_pretty(self)?;
        std::fs::write(path, config_str)?;
        tracing::info!("💾 Configuration saved to: {}", path);
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.performance.max_workers == 0 {
            return Err(anyhow!("max_workers must be greater than 0"));
        }

        if self.audio.max_chunk_bytes == 0 {
            return Err(anyhow!("max_chunk_bytes must be greater than 0"));
        }

        if self.audio.sample_rate == 0 || self.audio.channels == 0 {
            return Err(anyhow!("audio sample_rate and channels must be greater than 0"));
        }

        for (label, endpoint, api_key) in [
            ("transcription", &self.transcription.endpoint, &self.transcription.api_key),
            ("llm", &self.llm.endpoint, &self.llm.api_key),
        ] {
            if endpoint.is_none() {
                return Err(anyhow!("{} endpoint is required", label));
            }
            if api_key.is_none() {
                return Err(anyhow!("{} api_key is required", label));
            }
        }

        tracing::info!("✅ Configuration validation passed");
        Ok(())
    }

    /// Get runtime configuration summary
    pub fn summary(&self) -> String {
        format!(
            "Lecture Scribe Configuration:\n\
            - Workers: {}\n\
            - Chunk limit: {:.1} MB\n\
            - Transcription: {:?} / {}\n\
            - LLM: {:?} / {}\n\
            - Output Directory: {}",
            self.performance.max_workers,
            self.audio.max_chunk_bytes as f64 / (1024.0 * 1024.0),
            self.transcription.provider,
            self.transcription.model,
            self.llm.provider,
            self.llm.model,
            self.output.base_dir.display()
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            processing: ProcessingConfig {
                video_extensions: vec![
                    "mp4".to_string(),
                    "mkv".to_string(),
                    "avi".to_string(),
                    "mov".to_string(),
                    "webm".to_string(),
                    "m4v".to_string(),
                ],
                audio_extensions: vec![
                    "mp3".to_string(),
                    "wav".to_string(),
                    "m4a".to_string(),
                ],
            },
            audio: AudioConfig {
                codec: "libmp3lame".to_string(),
                sample_rate: 44100,
                channels: 2,
                bitrate: "192k".to_string(),
                max_chunk_bytes: 25 * 1024 * 1024, // typical Whisper per-file limit
            },
            transcription: TranscriptionConfig {
                provider: ProviderKind::OpenAi,
                endpoint: None,
                api_key: None,
                model: "whisper-1".to_string(),
                api_version: "2024-12-01-preview".to_string(),
                max_attempts: 3,
                retry_delay_ms: 1500,
                timeout_seconds: 300,
            },
            llm: LlmConfig {
                provider: ProviderKind::OpenAi,
                endpoint: None,
                api_key: None,
                model: "gpt-4o-mini".to_string(),
                api_version: "2024-12-01-preview".to_string(),
                max_tokens: 8192,
                temperature: 0.7,
                max_attempts: 3,
                retry_delay_ms: 1500,
                timeout_seconds: 120,
            },
            output: OutputConfig {
                base_dir: PathBuf::from("./notes"),
                report_file: "batch_report.json".to_string(),
            },
            performance: PerformanceConfig {
                max_workers: num_cpus::get().min(4),
                scratch_dir: None,
            },
        }
    }
}

/// Configuration builder for programmatic config creation
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.config.performance.max_workers = workers;
        self
    }

    pub fn with_max_chunk_bytes(mut self, limit: u64) -> Self {
        self.config.audio.max_chunk_bytes = limit;
        self
    }

    pub fn with_output_dir(mut self, dir: PathBuf) -> Self {
        self.config.output.base_dir = dir;
        self
    }

    pub fn with_scratch_dir(mut self, dir: PathBuf) -> Self {
        self.config.performance.scratch_dir = Some(dir);
        self
    }

    pub fn with_transcription(mut self, provider: ProviderKind, endpoint: String, api_key: String) -> Self {
        self.config.transcription.provider = provider;
        self.config.transcription.endpoint = Some(endpoint);
        self.config.transcription.api_key = Some(api_key);
        self
    }

    pub fn with_llm(mut self, provider: ProviderKind, endpoint: String, api_key: String) -> Self {
        self.config.llm.provider = provider;
        self.config.llm.endpoint = Some(endpoint);
        self.config.llm.api_key = Some(api_key);
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
