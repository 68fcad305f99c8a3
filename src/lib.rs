/// Lecture Scribe
///
/// Batch pipeline that turns recorded lectures into polished Markdown
/// notes: ffmpeg audio extraction, size-aware chunked transcription
/// against a remote speech-to-text service, ordered transcript assembly,
/// and LLM-based reformatting.

pub mod assembler;
pub mod audio;
pub mod chunker;
pub mod config;
pub mod error;
pub mod formatter;
pub mod llm;
pub mod pipeline;
pub mod probe;
pub mod retry;
pub mod transcription;

// Re-export main types for easy access
pub use crate::audio::{AudioArtifact, AudioExtractor};
pub use crate::chunker::{ChunkSource, ChunkSpan, ChunkSpec, Chunker};
pub use crate::config::{Config, ConfigBuilder, ProviderKind};
pub use crate::error::StageError;
pub use crate::formatter::Formatter;
pub use crate::llm::{create_chat_model, ChatMessage, ChatModel, ChatResponse};
pub use crate::pipeline::{BatchSummary, PipelineRunner, RecordOutcome, RecordStatus, WorkRecord};
pub use crate::probe::{MediaInfo, MediaProbe};
pub use crate::retry::RetryPolicy;
pub use crate::transcription::{create_transcriber, SpeechToText, TranscriptionClient};
