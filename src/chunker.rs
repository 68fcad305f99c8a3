use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::audio::AudioArtifact;
use crate::error::StageError;

/// Who owns a chunk's backing file.
///
/// `Original` means the chunk aliases the record's audio artifact (the
/// single-chunk case); cleanup must not delete it independently of that
/// artifact's own ownership flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkSource {
    Original,
    Generated,
}

/// Time span of one planned chunk, before physical extraction
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkSpan {
    pub index: usize,
    pub start_seconds: f64,
    pub duration_seconds: f64,
}

/// One extracted chunk, ready for upload
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkSpec {
    pub index: usize,
    pub start_seconds: f64,
    pub duration_seconds: f64,
    pub path: PathBuf,
    pub source: ChunkSource,
}

/// Compute the chunk plan from size/duration constraints.
///
/// `num_chunks = ceil(size_bytes / max_chunk_bytes)`, minimum 1. Spans
/// partition `[0, duration_seconds]` contiguously; the final span absorbs
/// floating-point remainder so the total never overshoots the duration.
pub fn plan_spans(size_bytes: u64, duration_seconds: f64, max_chunk_bytes: u64) -> Vec<ChunkSpan> {
    let num_chunks = (size_bytes.div_ceil(max_chunk_bytes)).max(1) as usize;
    let chunk_duration = duration_seconds / num_chunks as f64;

    (0..num_chunks)
        .map(|index| {
            let start_seconds = index as f64 * chunk_duration;
            let duration_seconds = if index == num_chunks - 1 {
                duration_seconds - start_seconds
            } else {
                chunk_duration
            };
            ChunkSpan {
                index,
                start_seconds,
                duration_seconds,
            }
        })
        .collect()
}

/// Splits an audio artifact into upload-sized chunks via ffmpeg stream copy
#[derive(Debug, Clone)]
pub struct Chunker {
    max_chunk_bytes: u64,
}

impl Chunker {
    pub fn new(max_chunk_bytes: u64) -> Self {
        Self { max_chunk_bytes }
    }

    /// Split the audio artifact per the computed plan.
    ///
    /// A single-chunk plan reuses the artifact itself instead of copying
    /// it. Extraction is `-acodec copy` only: re-encoding would change
    /// chunk sizes unpredictably and invalidate the size estimate.
    pub async fn split(
        &self,
        audio: &AudioArtifact,
        size_bytes: u64,
        duration_seconds: f64,
    ) -> Result<Vec<ChunkSpec>, StageError> {
        let spans = plan_spans(size_bytes, duration_seconds, self.max_chunk_bytes);

        if spans.len() == 1 {
            debug!("✂️ Single chunk (size under limit), reusing {}", audio.path.display());
            let span = &spans[0];
            return Ok(vec![ChunkSpec {
                index: span.index,
                start_seconds: span.start_seconds,
                duration_seconds: span.duration_seconds,
                path: audio.path.clone(),
                source: ChunkSource::Original,
            }]);
        }

        info!(
            "✂️ Splitting {} into {} chunks of ~{:.1}s each",
            audio.path.display(),
            spans.len(),
            spans[0].duration_seconds
        );

        let mut chunks = Vec::with_capacity(spans.len());
        for span in spans {
            let chunk_path = self.chunk_path(&audio.path, span.index);

            let output = tokio::process::Command::new("ffmpeg")
                .arg("-y")
                .arg("-i")
                .arg(&audio.path)
                .args(["-ss", &span.start_seconds.to_string()])
                .args(["-t", &span.duration_seconds.to_string()])
                .args(["-acodec", "copy"])
                .arg(&chunk_path)
                .output()
                .await
                .map_err(|e| StageError::Extraction {
                    path: audio.path.clone(),
                    reason: format!("failed to run ffmpeg: {}", e),
                })?;

            if !output.status.success() {
                return Err(StageError::Extraction {
                    path: chunk_path,
                    reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
                });
            }

            // Time-proportional splitting only approximates size under
            // variable bitrate; an oversized chunk is a warning, the remote
            // side gets the final say.
            let realized = tokio::fs::metadata(&chunk_path).await?.len();
            if realized > self.max_chunk_bytes {
                warn!(
                    "⚠️ Chunk {} is {:.1} MB, over the {:.1} MB limit",
                    chunk_path.display(),
                    realized as f64 / (1024.0 * 1024.0),
                    self.max_chunk_bytes as f64 / (1024.0 * 1024.0)
                );
            }

            chunks.push(ChunkSpec {
                index: span.index,
                start_seconds: span.start_seconds,
                duration_seconds: span.duration_seconds,
                path: chunk_path,
                source: ChunkSource::Generated,
            });
        }

        Ok(chunks)
    }

    fn chunk_path(&self, audio_path: &PathBuf, index: usize) -> PathBuf {
        let stem = audio_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "chunk".to_string());
        let ext = audio_path
            .extension()
            .map(|e| e.to_string_lossy().to_string())
            .unwrap_or_else(|| "mp3".to_string());
        audio_path.with_file_name(format!("{}_part{:03}.{}", stem, index, ext))
    }
}
