pub mod extract;
pub mod probe;

pub use extract::{check_ffmpeg, FfmpegTranscoder};
pub use probe::{check_ffprobe, describe_video, parse_video_info, probe_video};

use crate::dialog::{Interval, Timestamp};
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Subtitle codecs that are images and cannot be converted to SRT.
const BITMAP_SUBTITLE_CODECS: &[&str] = &[
    "hdmv_pgs_subtitle",
    "dvd_subtitle",
    "dvb_subtitle",
    "xsub",
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tags {
    pub title: Option<String>,
    pub language: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Disposition {
    pub default: u8,
    pub forced: u8,
}

/// A single stream as reported by ffprobe.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Stream {
    /// Absolute stream index within the container.
    pub index: usize,
    pub codec_name: Option<String>,
    pub codec_long_name: Option<String>,
    pub codec_type: Option<String>,
    pub disposition: Disposition,
    pub tags: Tags,
}

impl Stream {
    pub fn is_audio(&self) -> bool {
        self.codec_type.as_deref() == Some("audio")
    }

    pub fn is_subtitle(&self) -> bool {
        self.codec_type.as_deref() == Some("subtitle")
    }

    pub fn is_default(&self) -> bool {
        self.disposition.default != 0
    }

    /// Forced tracks usually carry only signs and foreign-language lines.
    pub fn is_forced(&self) -> bool {
        self.disposition.forced != 0
    }

    /// Whether ffmpeg can render this subtitle stream as SRT text.
    pub fn is_text_subtitle(&self) -> bool {
        self.is_subtitle()
            && !self
                .codec_name
                .as_deref()
                .is_some_and(|codec| BITMAP_SUBTITLE_CODECS.contains(&codec))
    }

    pub fn title(&self) -> &str {
        self.tags.title.as_deref().unwrap_or("untitled")
    }

    pub fn language(&self) -> &str {
        self.tags.language.as_deref().unwrap_or("und")
    }
}

/// A named time range from the container's chapter table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Chapter {
    pub id: i64,
    pub time_base: Option<String>,
    /// Fractional seconds, e.g. `"125.400000"`.
    pub start_time: String,
    pub end_time: String,
    pub tags: Tags,
}

impl Chapter {
    pub fn title(&self) -> &str {
        self.tags.title.as_deref().unwrap_or("")
    }

    /// Convert to an interval labelled with the chapter title.
    pub fn to_interval(&self) -> Result<Interval> {
        Ok(Interval::new(
            Timestamp::from_seconds(&self.start_time)?,
            Timestamp::from_seconds(&self.end_time)?,
        )
        .with_title(self.title()))
    }
}

/// Streams and chapters of a media file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoInfo {
    pub streams: Vec<Stream>,
    pub chapters: Vec<Chapter>,
}

impl VideoInfo {
    pub fn audio_streams(&self) -> Vec<Stream> {
        self.streams.iter().filter(|s| s.is_audio()).cloned().collect()
    }

    pub fn subtitle_streams(&self) -> Vec<Stream> {
        self.streams
            .iter()
            .filter(|s| s.is_subtitle())
            .cloned()
            .collect()
    }
}

/// The external transcoder used to cut and join audio.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Write subtitle stream `stream_index` of `input` to `output` as SRT.
    async fn extract_subtitles(&self, input: &Path, stream_index: usize, output: &Path)
        -> Result<()>;

    /// Write audio stream `stream_index` of `input` to `output`.
    async fn extract_audio(&self, input: &Path, stream_index: usize, output: &Path) -> Result<()>;

    /// Cut `interval` out of `source` into `output`.
    async fn extract_interval(&self, source: &Path, interval: &Interval, output: &Path)
        -> Result<()>;

    /// Join the files named in a concat list into `output`.
    async fn concatenate(&self, list_file: &Path, output: &Path) -> Result<()>;

    /// Re-encode `input` into `output`.
    async fn reencode(&self, input: &Path, output: &Path) -> Result<()>;

    fn name(&self) -> &'static str;
}
