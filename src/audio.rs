use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::AudioConfig;
use crate::error::StageError;

/// Derived audio artifact with ownership tracking.
///
/// `generated` decides cleanup behavior: extracted temp files are deleted at
/// the record's terminal state, caller-owned originals never are.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioArtifact {
    pub path: PathBuf,
    pub generated: bool,
}

/// Audio extraction via ffmpeg
#[derive(Debug, Clone)]
pub struct AudioExtractor {
    codec: String,
    sample_rate: u32,
    channels: u32,
    bitrate: String,
}

impl AudioExtractor {
    pub fn new(config: &AudioConfig) -> Self {
        Self {
            codec: config.codec.clone(),
            sample_rate: config.sample_rate,
            channels: config.channels,
            bitrate: config.bitrate.clone(),
        }
    }

    /// Extract the audio stream of a video into the scratch directory.
    ///
    /// The output name embeds `record_id` so concurrent records sharing one
    /// scratch directory cannot collide.
    pub async fn extract(
        &self,
        source: &Path,
        scratch_dir: &Path,
        record_id: &str,
    ) -> Result<AudioArtifact, StageError> {
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "audio".to_string());
        let audio_path = scratch_dir.join(format!("{}_{}.mp3", stem, record_id));

        tokio::fs::create_dir_all(scratch_dir).await?;

        info!("🎵 Extracting audio from {}", source.display());

        let output = tokio::process::Command::new("ffmpeg")
            .arg("-y")
            .arg("-i")
            .arg(source)
            .args(["-vn", "-acodec", &self.codec])
            .args(["-ar", &self.sample_rate.to_string()])
            .args(["-ac", &self.channels.to_string()])
            .args(["-b:a", &self.bitrate])
            .arg(&audio_path)
            .output()
            .await
            .map_err(|e| StageError::Extraction {
                path: source.to_path_buf(),
                reason: format!("failed to run ffmpeg: {}", e),
            })?;

        if !output.status.success() {
            return Err(StageError::Extraction {
                path: source.to_path_buf(),
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        debug!("✅ Audio extracted: {}", audio_path.display());

        Ok(AudioArtifact {
            path: audio_path,
            generated: true,
        })
    }

    /// Wrap an input that is already audio; no ffmpeg pass, caller keeps
    /// ownership
    pub fn passthrough(&self, source: &Path) -> AudioArtifact {
        debug!("🎧 Using caller-owned audio as-is: {}", source.display());
        AudioArtifact {
            path: source.to_path_buf(),
            generated: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_passthrough_is_caller_owned() {
        let extractor = AudioExtractor::new(&Config::default().audio);
        let artifact = extractor.passthrough(Path::new("talk.mp3"));
        assert!(!artifact.generated);
        assert_eq!(artifact.path, PathBuf::from("talk.mp3"));
    }
}
