use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::config::ProcessingConfig;
use crate::error::StageError;

/// Probed metrics for one media file
#[derive(Debug, Clone, PartialEq)]
pub struct MediaInfo {
    pub path: PathBuf,
    pub duration_seconds: f64,
    pub size_bytes: u64,
}

/// Duration/size probing and input discovery via ffprobe
#[derive(Debug, Clone)]
pub struct MediaProbe {
    video_extensions: Vec<String>,
    audio_extensions: Vec<String>,
}

impl MediaProbe {
    pub fn new(config: &ProcessingConfig) -> Self {
        Self {
            video_extensions: config.video_extensions.clone(),
            audio_extensions: config.audio_extensions.clone(),
        }
    }

    /// Discover all supported media files under a directory, sorted for a
    /// stable batch order
    pub fn discover(&self, dir: &Path) -> Result<Vec<PathBuf>, StageError> {
        let mut media = Vec::new();

        for entry in WalkDir::new(dir).follow_links(true) {
            let entry = entry.map_err(|e| StageError::Probe {
                path: dir.to_path_buf(),
                reason: e.to_string(),
            })?;

            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
                let ext = ext.to_lowercase();
                if self.video_extensions.contains(&ext) || self.audio_extensions.contains(&ext) {
                    media.push(path.to_path_buf());
                }
            }
        }

        media.sort();
        info!("🔍 Discovered {} media files in {}", media.len(), dir.display());
        Ok(media)
    }

    /// True when the path is a ready-made audio file that needs no
    /// extraction pass
    pub fn is_audio_source(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|ext| self.audio_extensions.contains(&ext.to_lowercase()))
            .unwrap_or(false)
    }

    /// Probe duration via ffprobe and size via file metadata
    pub async fn probe(&self, path: &Path) -> Result<MediaInfo, StageError> {
        let output = tokio::process::Command::new("ffprobe")
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
            ])
            .arg(path)
            .output()
            .await
            .map_err(|e| StageError::Probe {
                path: path.to_path_buf(),
                reason: format!("failed to run ffprobe: {}", e),
            })?;

        if !output.status.success() {
            return Err(StageError::Probe {
                path: path.to_path_buf(),
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let duration_seconds: f64 = stdout.trim().parse().map_err(|_| StageError::Probe {
            path: path.to_path_buf(),
            reason: format!("unparseable duration: {:?}", stdout.trim()),
        })?;

        if duration_seconds <= 0.0 {
            return Err(StageError::Probe {
                path: path.to_path_buf(),
                reason: "non-positive duration".to_string(),
            });
        }

        let size_bytes = tokio::fs::metadata(path)
            .await
            .map_err(|e| StageError::Probe {
                path: path.to_path_buf(),
                reason: format!("metadata unavailable: {}", e),
            })?
            .len();

        debug!(
            "📊 Probed {}: {:.2}s, {:.2} MB",
            path.display(),
            duration_seconds,
            size_bytes as f64 / (1024.0 * 1024.0)
        );

        Ok(MediaInfo {
            path: path.to_path_buf(),
            duration_seconds,
            size_bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_discovery_filters_extensions() {
        let temp = tempfile::tempdir().unwrap();
        std::fs::write(temp.path().join("lecture.mp4"), b"x").unwrap();
        std::fs::write(temp.path().join("slides.pdf"), b"x").unwrap();
        std::fs::write(temp.path().join("audio.mp3"), b"x").unwrap();

        let probe = MediaProbe::new(&Config::default().processing);
        let found = probe.discover(temp.path()).unwrap();

        let names: Vec<_> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["audio.mp3", "lecture.mp4"]);
    }

    #[test]
    fn test_audio_source_detection() {
        let probe = MediaProbe::new(&Config::default().processing);
        assert!(probe.is_audio_source(Path::new("talk.mp3")));
        assert!(probe.is_audio_source(Path::new("talk.WAV")));
        assert!(!probe.is_audio_source(Path::new("talk.mp4")));
        assert!(!probe.is_audio_source(Path::new("talk")));
    }
}
