pub mod srt;

pub use srt::parse_cue_timings;

use crate::dialog::Interval;
use crate::error::{DialogError, Result};
use std::path::Path;

/// File name used for the extracted subtitle track inside a work directory.
pub const SUBTITLE_FILE_NAME: &str = "subs.srt";

/// Read an SRT file and return the timing of each cue.
pub fn read_cues(path: &Path) -> Result<Vec<Interval>> {
    if !path.exists() {
        return Err(DialogError::FileNotFound(path.display().to_string()));
    }
    let content = std::fs::read_to_string(path)?;
    parse_cue_timings(&content)
}
