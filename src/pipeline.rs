use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::assembler;
use crate::audio::{AudioArtifact, AudioExtractor};
use crate::chunker::{ChunkSource, ChunkSpec, Chunker};
use crate::config::Config;
use crate::error::StageError;
use crate::formatter::Formatter;
use crate::llm::create_chat_model;
use crate::probe::MediaProbe;
use crate::retry::RetryPolicy;
use crate::transcription::{create_transcriber, TranscriptionClient};

/// Pipeline position of a work record.
///
/// Progression is strictly forward; `Failed` is reachable from any
/// non-terminal state and, like `Persisted`, triggers cleanup exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    Pending,
    Probed,
    Chunked,
    Transcribing,
    Merged,
    Formatted,
    Persisted,
    Failed,
}

impl RecordStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, RecordStatus::Persisted | RecordStatus::Failed)
    }

    fn rank(self) -> u8 {
        match self {
            RecordStatus::Pending => 0,
            RecordStatus::Probed => 1,
            RecordStatus::Chunked => 2,
            RecordStatus::Transcribing => 3,
            RecordStatus::Merged => 4,
            RecordStatus::Formatted => 5,
            RecordStatus::Persisted => 6,
            RecordStatus::Failed => 7,
        }
    }
}

/// Failure context reported per record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureInfo {
    pub stage: String,
    pub reason: String,
}

/// The unit of state threaded through the pipeline for one input file.
///
/// Mutated exclusively by the single worker processing that file; no two
/// records share state beyond the scratch directory namespace, and artifact
/// names embed `record_id` to keep that namespace collision-free.
#[derive(Debug)]
pub struct WorkRecord {
    pub source_path: PathBuf,
    pub base_name: String,
    pub record_id: String,
    pub audio: Option<AudioArtifact>,
    pub duration_seconds: f64,
    pub size_bytes: u64,
    pub chunk_plan: Vec<ChunkSpec>,
    pub transcripts: Vec<Option<String>>,
    pub merged_transcript: Option<String>,
    pub formatted_document: Option<String>,
    pub output_path: Option<PathBuf>,
    pub status: RecordStatus,
    pub failure: Option<FailureInfo>,
    cleaned: bool,
}

impl WorkRecord {
    pub fn new(source_path: PathBuf) -> Self {
        let base_name = source_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "input".to_string());

        let mut record_id = Uuid::new_v4().simple().to_string();
        record_id.truncate(8);

        Self {
            source_path,
            base_name,
            record_id,
            audio: None,
            duration_seconds: 0.0,
            size_bytes: 0,
            chunk_plan: Vec::new(),
            transcripts: Vec::new(),
            merged_transcript: None,
            formatted_document: None,
            output_path: None,
            status: RecordStatus::Pending,
            failure: None,
            cleaned: false,
        }
    }

    fn advance(&mut self, next: RecordStatus) {
        debug_assert!(
            next.rank() > self.status.rank() && !self.status.is_terminal(),
            "status may only move forward ({:?} -> {:?})",
            self.status,
            next
        );
        self.status = next;
    }

    fn fail(&mut self, stage: &str, reason: String) {
        debug_assert!(!self.status.is_terminal());
        self.status = RecordStatus::Failed;
        self.failure = Some(FailureInfo {
            stage: stage.to_string(),
            reason,
        });
    }
}

/// Delete every temporary artifact the record exclusively owns.
///
/// Generated chunk files and generated audio go; caller-owned originals
/// (and chunks aliasing them) stay. Safe to invoke repeatedly or on a
/// partially-populated record.
pub async fn cleanup_record(record: &mut WorkRecord) {
    if record.cleaned {
        return;
    }

    for chunk in &record.chunk_plan {
        if chunk.source == ChunkSource::Generated {
            remove_quiet(&chunk.path).await;
        }
    }

    if let Some(audio) = &record.audio {
        if audio.generated {
            remove_quiet(&audio.path).await;
        }
    }

    record.cleaned = true;
    debug!("🧹 Cleaned temporary artifacts for {}", record.base_name);
}

async fn remove_quiet(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!("Removed temp file {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove temp file {}: {}", path.display(), e),
    }
}

/// Transcribe every chunk of a record, writing each result into its own
/// `transcripts[index]` slot.
///
/// Chunk uploads run concurrently but slot assignment is by chunk index,
/// never completion order. The first permanent failure drops the remaining
/// in-flight calls for this record and surfaces as the record's error.
pub(crate) async fn transcribe_chunks(
    client: &TranscriptionClient,
    record: &mut WorkRecord,
) -> Result<(), StageError> {
    let uploads: Vec<_> = record
        .chunk_plan
        .iter()
        .map(|chunk| {
            let client = client.clone();
            let path = chunk.path.clone();
            let index = chunk.index;
            async move {
                let text = client.transcribe(&path).await?;
                Ok::<(usize, String), StageError>((index, text))
            }
        })
        .collect();

    for (index, text) in futures::future::try_join_all(uploads).await? {
        match record.transcripts.get_mut(index) {
            Some(slot) if slot.is_none() => *slot = Some(text),
            Some(_) => {
                return Err(StageError::Invariant(format!(
                    "transcript slot {} written twice",
                    index
                )))
            }
            None => {
                return Err(StageError::Invariant(format!(
                    "chunk index {} outside transcript slots",
                    index
                )))
            }
        }
    }

    Ok(())
}

/// Per-record outcome recorded in the batch report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordOutcome {
    pub source: PathBuf,
    pub status: RecordStatus,
    pub chunks: usize,
    pub output_path: Option<PathBuf>,
    pub failure: Option<FailureInfo>,
    pub processing_time: Duration,
}

impl RecordOutcome {
    fn from_record(record: &WorkRecord, processing_time: Duration) -> Self {
        Self {
            source: record.source_path.clone(),
            status: record.status,
            chunks: record.chunk_plan.len(),
            output_path: record.output_path.clone(),
            failure: record.failure.clone(),
            processing_time,
        }
    }
}

/// Overall batch results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub total_time: Duration,
    pub generated_at: DateTime<Utc>,
    pub outcomes: Vec<RecordOutcome>,
}

enum ScratchDir {
    Fixed(PathBuf),
    PerRun(tempfile::TempDir),
}

impl ScratchDir {
    fn path(&self) -> &Path {
        match self {
            ScratchDir::Fixed(path) => path,
            ScratchDir::PerRun(dir) => dir.path(),
        }
    }
}

/// Drives each work record through the stage sequence and isolates
/// failures per file
#[derive(Clone)]
pub struct PipelineRunner {
    config: Config,
    probe: MediaProbe,
    extractor: AudioExtractor,
    chunker: Chunker,
    transcription: TranscriptionClient,
    formatter: Arc<Formatter>,
    worker_semaphore: Arc<Semaphore>,
}

impl PipelineRunner {
    pub fn new(config: Config) -> Result<Self> {
        let transcriber = create_transcriber(&config.transcription)?;
        let transcription = TranscriptionClient::new(
            transcriber,
            RetryPolicy::new(
                config.transcription.max_attempts,
                Duration::from_millis(config.transcription.retry_delay_ms),
            ),
        );

        let chat = create_chat_model(&config.llm)?;
        let formatter = Arc::new(Formatter::new(
            chat,
            RetryPolicy::new(
                config.llm.max_attempts,
                Duration::from_millis(config.llm.retry_delay_ms),
            ),
        ));

        Ok(Self {
            probe: MediaProbe::new(&config.processing),
            extractor: AudioExtractor::new(&config.audio),
            chunker: Chunker::new(config.audio.max_chunk_bytes),
            transcription,
            formatter,
            worker_semaphore: Arc::new(Semaphore::new(config.performance.max_workers)),
            config,
        })
    }

    /// Process every media file under `input_dir`, one notes document per
    /// file, continuing past per-file failures
    pub async fn process_directory(&self, input_dir: &Path, output_dir: &Path) -> Result<BatchSummary> {
        let start = Instant::now();

        info!("🚀 Starting batch processing");
        info!("📁 Input: {}", input_dir.display());
        info!("📂 Output: {}", output_dir.display());

        tokio::fs::create_dir_all(output_dir).await?;

        let scratch = match &self.config.performance.scratch_dir {
            Some(dir) => {
                tokio::fs::create_dir_all(dir).await?;
                ScratchDir::Fixed(dir.clone())
            }
            None => ScratchDir::PerRun(tempfile::tempdir()?),
        };

        let media = self.probe.discover(input_dir)?;
        if media.is_empty() {
            warn!("No media files found in {}", input_dir.display());
            return Ok(BatchSummary {
                total: 0,
                successful: 0,
                failed: 0,
                total_time: start.elapsed(),
                generated_at: Utc::now(),
                outcomes: Vec::new(),
            });
        }

        let outcomes = self.process_batch(media, scratch.path(), output_dir).await;

        let successful = outcomes
            .iter()
            .filter(|o| o.status == RecordStatus::Persisted)
            .count();
        let summary = BatchSummary {
            total: outcomes.len(),
            successful,
            failed: outcomes.len() - successful,
            total_time: start.elapsed(),
            generated_at: Utc::now(),
            outcomes,
        };

        let report_path = output_dir.join(&self.config.output.report_file);
        let report = serde_json::to_string_pretty(&summary)?;
        tokio::fs::write(&report_path, report).await?;
        info!("💾 Batch report saved to {}", report_path.display());

        Ok(summary)
    }

    /// Fan records out to the worker pool and collect their outcomes
    async fn process_batch(
        &self,
        media: Vec<PathBuf>,
        scratch: &Path,
        output_dir: &Path,
    ) -> Vec<RecordOutcome> {
        let (tx, mut rx) = mpsc::channel(self.config.performance.max_workers.max(1));
        let total = media.len();

        for (index, source) in media.into_iter().enumerate() {
            let runner = self.clone();
            let scratch = scratch.to_path_buf();
            let output_dir = output_dir.to_path_buf();
            let tx = tx.clone();
            let semaphore = Arc::clone(&self.worker_semaphore);

            tokio::spawn(async move {
                let _permit = semaphore.acquire().await.unwrap();

                info!("📹 Processing file {}/{}: {}", index + 1, total, source.display());

                let outcome = runner.process_single(&source, &scratch, &output_dir).await;
                if let Err(e) = tx.send(outcome).await {
                    error!("Failed to send outcome: {}", e);
                }
            });
        }

        drop(tx);

        let mut outcomes = Vec::new();
        while let Some(outcome) = rx.recv().await {
            match outcome.status {
                RecordStatus::Persisted => {
                    info!(
                        "✅ Completed {} in {:.1}s ({} chunks)",
                        outcome.source.display(),
                        outcome.processing_time.as_secs_f64(),
                        outcome.chunks
                    );
                }
                RecordStatus::Failed => {
                    let failure = outcome.failure.as_ref();
                    warn!(
                        "❌ Failed {} at {} stage: {}",
                        outcome.source.display(),
                        failure.map(|f| f.stage.as_str()).unwrap_or("unknown"),
                        failure.map(|f| f.reason.as_str()).unwrap_or("unknown")
                    );
                }
                _ => {}
            }
            outcomes.push(outcome);
        }

        outcomes.sort_by(|a, b| a.source.cmp(&b.source));
        outcomes
    }

    /// Run one file through the full stage sequence, catching every stage
    /// error at the record boundary. Cleanup runs at the terminal state no
    /// matter the outcome.
    async fn process_single(&self, source: &Path, scratch: &Path, output_dir: &Path) -> RecordOutcome {
        let started = Instant::now();
        let mut record = WorkRecord::new(source.to_path_buf());

        match self.run_stages(&mut record, scratch, output_dir).await {
            Ok(()) => {
                debug!("Record {} persisted", record.base_name);
            }
            Err(e) => {
                let stage = stage_label(record.status, &e);
                record.fail(stage, e.to_string());
            }
        }

        cleanup_record(&mut record).await;
        RecordOutcome::from_record(&record, started.elapsed())
    }

    async fn run_stages(
        &self,
        record: &mut WorkRecord,
        scratch: &Path,
        output_dir: &Path,
    ) -> Result<(), StageError> {
        // pending → probed: derive the audio artifact, then measure it
        let audio = if self.probe.is_audio_source(&record.source_path) {
            self.extractor.passthrough(&record.source_path)
        } else {
            self.extractor
                .extract(&record.source_path, scratch, &record.record_id)
                .await?
        };

        let info = self.probe.probe(&audio.path).await?;
        record.duration_seconds = info.duration_seconds;
        record.size_bytes = info.size_bytes;
        record.audio = Some(audio);
        record.advance(RecordStatus::Probed);

        // probed → chunked
        let audio = record
            .audio
            .as_ref()
            .ok_or_else(|| StageError::Invariant("audio artifact missing after probe".into()))?;
        let chunks = self
            .chunker
            .split(audio, record.size_bytes, record.duration_seconds)
            .await?;
        record.transcripts = vec![None; chunks.len()];
        record.chunk_plan = chunks;
        record.advance(RecordStatus::Chunked);

        // chunked → transcribing → merged
        record.advance(RecordStatus::Transcribing);
        transcribe_chunks(&self.transcription, record).await?;
        record.merged_transcript = Some(assembler::merge(&record.transcripts)?);
        record.advance(RecordStatus::Merged);

        // merged → formatted
        let merged = record
            .merged_transcript
            .as_deref()
            .ok_or_else(|| StageError::Invariant("merged transcript missing".into()))?;
        let document = self.formatter.format(&record.base_name, merged).await?;
        record.formatted_document = Some(document);
        record.advance(RecordStatus::Formatted);

        // formatted → persisted
        let output_path = output_dir.join(format!("{}.md", record.base_name));
        let document = record
            .formatted_document
            .as_deref()
            .ok_or_else(|| StageError::Invariant("formatted document missing".into()))?;
        tokio::fs::write(&output_path, document).await?;
        info!("💾 Notes saved to {}", output_path.display());
        record.output_path = Some(output_path);
        record.advance(RecordStatus::Persisted);

        Ok(())
    }
}

/// Map a stage error back to the stage it interrupted, based on how far
/// the record had advanced
fn stage_label(status: RecordStatus, error: &StageError) -> &'static str {
    match (status, error) {
        (_, StageError::Probe { .. }) => "probe",
        (RecordStatus::Pending, _) => "extract",
        (RecordStatus::Probed, _) => "chunk",
        (RecordStatus::Transcribing, StageError::Invariant(_)) => "merge",
        (RecordStatus::Chunked | RecordStatus::Transcribing, _) => "transcribe",
        (RecordStatus::Merged, _) => "format",
        (RecordStatus::Formatted, _) => "persist",
        _ => "pipeline",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigBuilder, ProviderKind};
    use crate::transcription::SpeechToText;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tempfile::TempDir;

    fn test_config(output_dir: PathBuf) -> Config {
        ConfigBuilder::new()
            .with_workers(2)
            .with_output_dir(output_dir)
            .with_transcription(
                ProviderKind::OpenAi,
                "https://api.invalid.example/v1".into(),
                "test-key".into(),
            )
            .with_llm(
                ProviderKind::OpenAi,
                "https://api.invalid.example/v1".into(),
                "test-key".into(),
            )
            .build()
    }

    fn chunk(index: usize, path: PathBuf, source: ChunkSource) -> ChunkSpec {
        ChunkSpec {
            index,
            start_seconds: index as f64 * 10.0,
            duration_seconds: 10.0,
            path,
            source,
        }
    }

    /// Resolves chunks in reverse index order: index 2 first, index 0 last
    struct ReversedTranscriber;

    #[async_trait]
    impl SpeechToText for ReversedTranscriber {
        async fn transcribe(&self, audio_path: &Path) -> Result<String, StageError> {
            let name = audio_path.file_stem().unwrap().to_string_lossy().to_string();
            let index: u64 = name.parse().unwrap();
            tokio::time::sleep(Duration::from_millis((3 - index) * 20)).await;
            Ok(match index {
                0 => "A ".to_string(),
                1 => "B ".to_string(),
                _ => "C ".to_string(),
            })
        }

        fn provider(&self) -> ProviderKind {
            ProviderKind::OpenAi
        }
    }

    /// Rejects one chunk permanently, succeeds on the rest
    struct PoisonedTranscriber {
        poisoned_index: u64,
        calls: AtomicU32,
    }

    #[async_trait]
    impl SpeechToText for PoisonedTranscriber {
        async fn transcribe(&self, audio_path: &Path) -> Result<String, StageError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let name = audio_path.file_stem().unwrap().to_string_lossy().to_string();
            let index: u64 = name.parse().unwrap();
            if index == self.poisoned_index {
                Err(StageError::Transcription("unsupported operation".into()))
            } else {
                Ok(format!("chunk {} ", index))
            }
        }

        fn provider(&self) -> ProviderKind {
            ProviderKind::OpenAi
        }
    }

    fn client_with(provider: Arc<dyn SpeechToText>) -> TranscriptionClient {
        TranscriptionClient::new(provider, RetryPolicy::new(2, Duration::from_millis(1)))
    }

    #[test]
    fn test_status_progression_is_monotonic() {
        let mut record = WorkRecord::new(PathBuf::from("lecture.mp4"));
        assert_eq!(record.status, RecordStatus::Pending);

        record.advance(RecordStatus::Probed);
        record.advance(RecordStatus::Chunked);
        assert_eq!(record.status, RecordStatus::Chunked);
        assert!(!record.status.is_terminal());

        record.fail("transcribe", "retries exhausted".into());
        assert_eq!(record.status, RecordStatus::Failed);
        assert!(record.status.is_terminal());
        assert_eq!(record.failure.as_ref().unwrap().stage, "transcribe");
    }

    #[tokio::test]
    async fn test_out_of_order_completion_merges_by_index() {
        let mut record = WorkRecord::new(PathBuf::from("lecture.mp4"));
        record.chunk_plan = vec![
            chunk(0, PathBuf::from("0.mp3"), ChunkSource::Generated),
            chunk(1, PathBuf::from("1.mp3"), ChunkSource::Generated),
            chunk(2, PathBuf::from("2.mp3"), ChunkSource::Generated),
        ];
        record.transcripts = vec![None, None, None];

        let client = client_with(Arc::new(ReversedTranscriber));
        transcribe_chunks(&client, &mut record).await.unwrap();

        let merged = assembler::merge(&record.transcripts).unwrap();
        assert_eq!(merged, "A B C ");
    }

    #[tokio::test]
    async fn test_permanent_chunk_failure_leaves_no_temp_files() {
        let temp = TempDir::new().unwrap();
        let mut paths = Vec::new();
        for i in 0..3 {
            let path = temp.path().join(format!("{}.mp3", i));
            tokio::fs::write(&path, b"audio").await.unwrap();
            paths.push(path);
        }

        let audio_path = temp.path().join("full.mp3");
        tokio::fs::write(&audio_path, b"audio").await.unwrap();

        let mut record = WorkRecord::new(PathBuf::from("lecture.mp4"));
        record.audio = Some(AudioArtifact {
            path: audio_path.clone(),
            generated: true,
        });
        record.chunk_plan = paths
            .iter()
            .enumerate()
            .map(|(i, p)| chunk(i, p.clone(), ChunkSource::Generated))
            .collect();
        record.transcripts = vec![None, None, None];
        record.status = RecordStatus::Transcribing;

        let provider = Arc::new(PoisonedTranscriber {
            poisoned_index: 1,
            calls: AtomicU32::new(0),
        });
        let client = client_with(Arc::clone(&provider) as Arc<dyn SpeechToText>);

        let err = transcribe_chunks(&client, &mut record).await.unwrap_err();
        assert!(matches!(err, StageError::Transcription(_)));

        record.fail(stage_label(record.status, &err), err.to_string());
        cleanup_record(&mut record).await;

        assert_eq!(record.status, RecordStatus::Failed);
        assert_eq!(record.failure.as_ref().unwrap().stage, "transcribe");
        for path in paths.iter().chain([&audio_path]) {
            assert!(!path.exists(), "{} should be cleaned", path.display());
        }
    }

    #[tokio::test]
    async fn test_cleanup_keeps_caller_owned_audio() {
        let temp = TempDir::new().unwrap();
        let original = temp.path().join("talk.mp3");
        tokio::fs::write(&original, b"audio").await.unwrap();

        let mut record = WorkRecord::new(original.clone());
        record.audio = Some(AudioArtifact {
            path: original.clone(),
            generated: false,
        });
        record.chunk_plan = vec![chunk(0, original.clone(), ChunkSource::Original)];
        record.transcripts = vec![Some("text".into())];
        record.status = RecordStatus::Persisted;

        cleanup_record(&mut record).await;
        assert!(original.exists(), "caller-owned original must survive cleanup");
    }

    #[tokio::test]
    async fn test_cleanup_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let chunk_path = temp.path().join("0.mp3");
        tokio::fs::write(&chunk_path, b"audio").await.unwrap();

        let mut record = WorkRecord::new(PathBuf::from("lecture.mp4"));
        record.chunk_plan = vec![chunk(0, chunk_path.clone(), ChunkSource::Generated)];
        record.status = RecordStatus::Failed;

        cleanup_record(&mut record).await;
        assert!(!chunk_path.exists());

        // second invocation is a no-op, not an error
        cleanup_record(&mut record).await;

        // even forcing a re-scan past the guard must tolerate missing files
        record.cleaned = false;
        cleanup_record(&mut record).await;
    }

    #[tokio::test]
    async fn test_empty_directory_processing() {
        let temp = TempDir::new().unwrap();
        let input_dir = temp.path().join("input");
        let output_dir = temp.path().join("output");
        tokio::fs::create_dir_all(&input_dir).await.unwrap();

        let runner = PipelineRunner::new(test_config(output_dir.clone())).unwrap();
        let summary = runner.process_directory(&input_dir, &output_dir).await.unwrap();

        assert_eq!(summary.total, 0);
        assert_eq!(summary.successful, 0);
        assert_eq!(summary.failed, 0);
    }

    #[tokio::test]
    async fn test_batch_isolates_per_file_failures() {
        // Both "videos" are bogus, so extraction fails for each; the batch
        // must still visit both and report both outcomes.
        let temp = TempDir::new().unwrap();
        let input_dir = temp.path().join("input");
        let output_dir = temp.path().join("output");
        tokio::fs::create_dir_all(&input_dir).await.unwrap();
        tokio::fs::write(input_dir.join("a.mp4"), b"not a real video").await.unwrap();
        tokio::fs::write(input_dir.join("b.mp4"), b"not a real video").await.unwrap();

        let runner = PipelineRunner::new(test_config(output_dir.clone())).unwrap();
        let summary = runner.process_directory(&input_dir, &output_dir).await.unwrap();

        assert_eq!(summary.total, 2);
        assert_eq!(summary.successful, 0);
        assert_eq!(summary.failed, 2);
        for outcome in &summary.outcomes {
            assert_eq!(outcome.status, RecordStatus::Failed);
            assert!(outcome.failure.is_some());
        }

        assert!(output_dir.join("batch_report.json").exists());
    }

    #[test]
    fn test_stage_labels() {
        let probe_err = StageError::Probe {
            path: PathBuf::from("x"),
            reason: "no duration".into(),
        };
        assert_eq!(stage_label(RecordStatus::Pending, &probe_err), "probe");

        let extract_err = StageError::Extraction {
            path: PathBuf::from("x"),
            reason: "ffmpeg".into(),
        };
        assert_eq!(stage_label(RecordStatus::Pending, &extract_err), "extract");

        let transient = StageError::Transient("timeout".into());
        assert_eq!(stage_label(RecordStatus::Transcribing, &transient), "transcribe");
        assert_eq!(stage_label(RecordStatus::Merged, &transient), "format");

        let invariant = StageError::Invariant("slot unfilled".into());
        assert_eq!(stage_label(RecordStatus::Transcribing, &invariant), "merge");
    }
}
