use std::ffi::OsString;
use std::path::Path;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::dialog::Interval;
use crate::error::{DialogError, Result};

use super::Transcoder;

/// ffmpeg input number of the source file in every command we build.
const INPUT_NUMBER: usize = 0;

/// Check if FFmpeg is installed and accessible.
pub async fn check_ffmpeg() -> Result<()> {
    let output = Command::new("ffmpeg")
        .arg("-version")
        .output()
        .await
        .map_err(|e| {
            DialogError::AudioExtraction(format!(
                "FFmpeg not found. Please install FFmpeg and ensure it's in your PATH. Error: {e}"
            ))
        })?;

    if !output.status.success() {
        return Err(DialogError::AudioExtraction(
            "FFmpeg check failed".to_string(),
        ));
    }

    debug!("FFmpeg is available");
    Ok(())
}

/// [`Transcoder`] backed by the `ffmpeg` binary.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    /// LAME VBR quality passed as `-q:a` (0 is best, 9 is smallest).
    audio_quality: u8,
}

impl Default for FfmpegTranscoder {
    fn default() -> Self {
        Self::new(0)
    }
}

impl FfmpegTranscoder {
    pub fn new(audio_quality: u8) -> Self {
        Self { audio_quality }
    }

    fn quality_arg(&self) -> String {
        self.audio_quality.to_string()
    }
}

/// Run ffmpeg with `args`, reporting the command line and its output on failure.
async fn run_ffmpeg(args: Vec<OsString>) -> Result<()> {
    let command_line = args
        .iter()
        .map(|a| a.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ");
    debug!("Running: ffmpeg {}", command_line);

    let output = Command::new("ffmpeg")
        .args(&args)
        .output()
        .await
        .map_err(|e| DialogError::AudioExtraction(format!("Failed to run FFmpeg: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        warn!("Failed executing command: ffmpeg {}", command_line);
        return Err(DialogError::AudioExtraction(format!(
            "ffmpeg {command_line} exited with {}: {}",
            output.status,
            stderr.trim()
        )));
    }

    Ok(())
}

fn stream_map(stream_index: usize) -> String {
    format!("{INPUT_NUMBER}:{stream_index}")
}

fn ensure_exists(path: &Path) -> Result<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(DialogError::FileNotFound(path.display().to_string()))
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn extract_subtitles(
        &self,
        input: &Path,
        stream_index: usize,
        output: &Path,
    ) -> Result<()> {
        ensure_exists(input)?;
        run_ffmpeg(vec![
            "-y".into(),
            "-i".into(),
            input.into(),
            "-map".into(),
            stream_map(stream_index).into(),
            output.into(),
        ])
        .await
    }

    async fn extract_audio(&self, input: &Path, stream_index: usize, output: &Path) -> Result<()> {
        ensure_exists(input)?;
        run_ffmpeg(vec![
            "-y".into(),
            "-i".into(),
            input.into(),
            "-q:a".into(),
            self.quality_arg().into(),
            "-map".into(),
            stream_map(stream_index).into(),
            output.into(),
        ])
        .await
    }

    async fn extract_interval(
        &self,
        source: &Path,
        interval: &Interval,
        output: &Path,
    ) -> Result<()> {
        ensure_exists(source)?;
        if interval.is_empty() {
            return Err(DialogError::AudioExtraction(format!(
                "Segment {interval} has zero duration"
            )));
        }
        run_ffmpeg(vec![
            "-y".into(),
            "-i".into(),
            source.into(),
            "-ss".into(),
            interval.start.to_string().into(),
            "-to".into(),
            interval.end.to_string().into(),
            "-q:a".into(),
            self.quality_arg().into(),
            "-map".into(),
            "a".into(),
            output.into(),
        ])
        .await
    }

    async fn concatenate(&self, list_file: &Path, output: &Path) -> Result<()> {
        ensure_exists(list_file)?;
        run_ffmpeg(vec![
            "-y".into(),
            "-f".into(),
            "concat".into(),
            "-safe".into(),
            "0".into(),
            "-i".into(),
            list_file.into(),
            "-c".into(),
            "copy".into(),
            output.into(),
        ])
        .await
    }

    async fn reencode(&self, input: &Path, output: &Path) -> Result<()> {
        ensure_exists(input)?;
        run_ffmpeg(vec![
            "-y".into(),
            "-i".into(),
            input.into(),
            "-q:a".into(),
            self.quality_arg().into(),
            output.into(),
        ])
        .await?;

        if !output.exists() {
            return Err(DialogError::AudioExtraction(
                "Output file was not created".to_string(),
            ));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "FFmpeg"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ffmpeg_available() -> bool {
        std::process::Command::new("ffmpeg")
            .arg("-version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    #[tokio::test]
    async fn test_check_ffmpeg() {
        let result = check_ffmpeg().await;
        if !ffmpeg_available() {
            eprintln!("Skipping test: FFmpeg not available or broken");
            return;
        }
        assert!(result.is_ok(), "FFmpeg check failed: {:?}", result.err());
    }

    #[test]
    fn test_stream_map() {
        assert_eq!(stream_map(3), "0:3");
    }

    #[test]
    fn test_default_quality() {
        let transcoder = FfmpegTranscoder::default();
        assert_eq!(transcoder.quality_arg(), "0");
        assert_eq!(FfmpegTranscoder::new(4).quality_arg(), "4");
        assert_eq!(transcoder.name(), "FFmpeg");
    }

    #[tokio::test]
    async fn test_extract_audio_file_not_found() {
        let transcoder = FfmpegTranscoder::default();
        let result = transcoder
            .extract_audio(Path::new("/nonexistent/file.mkv"), 1, Path::new("/tmp/out.mp3"))
            .await;
        match &result {
            Err(DialogError::FileNotFound(path)) => {
                assert!(path.contains("nonexistent"));
            }
            Err(other) => {
                panic!("Expected FileNotFound error, got: {other}");
            }
            Ok(_) => {
                panic!("Expected error but got Ok");
            }
        }
    }

    #[tokio::test]
    async fn test_extract_interval_rejects_empty_segment() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("full_audio.mp3");
        std::fs::write(&source, b"").unwrap();

        let interval = Interval::parse("00:00:05.000", "00:00:05.000").unwrap();
        let result = FfmpegTranscoder::default()
            .extract_interval(&source, &interval, &dir.path().join("shard-0.mp3"))
            .await;
        assert!(matches!(result, Err(DialogError::AudioExtraction(_))));
    }
}
