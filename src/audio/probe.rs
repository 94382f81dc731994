use std::path::Path;

use tokio::process::Command;
use tracing::debug;

use crate::error::{DialogError, Result};

use super::VideoInfo;

/// Check if FFprobe is installed and accessible.
pub async fn check_ffprobe() -> Result<()> {
    let output = Command::new("ffprobe")
        .arg("-version")
        .output()
        .await
        .map_err(|e| {
            DialogError::Probe(format!(
                "FFprobe not found. Please install FFmpeg (includes FFprobe). Error: {e}"
            ))
        })?;

    if !output.status.success() {
        return Err(DialogError::Probe("FFprobe check failed".to_string()));
    }

    debug!("FFprobe is available");
    Ok(())
}

/// Read the streams and chapters of a media file.
pub async fn probe_video(input: &Path) -> Result<VideoInfo> {
    if !input.exists() {
        return Err(DialogError::FileNotFound(input.display().to_string()));
    }

    let output = Command::new("ffprobe")
        .arg(input)
        .args([
            "-show_streams",
            "-show_chapters",
            "-v",
            "quiet",
            "-print_format",
            "json",
        ])
        .output()
        .await
        .map_err(|e| DialogError::Probe(format!("Failed to run FFprobe: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(DialogError::Probe(format!(
            "FFprobe failed on {}: {stderr}",
            input.display()
        )));
    }

    let info = parse_video_info(&String::from_utf8_lossy(&output.stdout))?;
    debug!(
        "Probed {}: {} streams, {} chapters",
        input.display(),
        info.streams.len(),
        info.chapters.len()
    );
    Ok(info)
}

/// Parse ffprobe's `-print_format json` output.
pub fn parse_video_info(json: &str) -> Result<VideoInfo> {
    Ok(serde_json::from_str(json)?)
}

/// The human readable ffprobe report for a file.
///
/// FFprobe writes this banner to stderr.
pub async fn describe_video(input: &Path) -> Result<String> {
    let output = Command::new("ffprobe")
        .arg("-hide_banner")
        .arg(input)
        .output()
        .await
        .map_err(|e| DialogError::Probe(format!("Failed to run FFprobe: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(DialogError::Probe(format!("FFprobe failed: {stderr}")));
    }

    Ok(String::from_utf8_lossy(&output.stderr).into_owned())
}
