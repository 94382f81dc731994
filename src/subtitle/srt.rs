// SRT cue timing reader
use regex::Regex;
use std::sync::LazyLock;

use crate::dialog::{Interval, Timestamp};
use crate::error::{DialogError, Result};

static TIMING_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{2}:\d{2}:\d{2})[,.](\d{3})\s*-->\s*(\d{2}:\d{2}:\d{2})[,.](\d{3})(?:\s.*)?$")
        .expect("Invalid regex")
});

/// Collect the start/end pair of every cue in an SRT document.
///
/// Cue numbers and text are ignored. Any line containing `-->` must be a
/// well-formed timing line.
pub fn parse_cue_timings(content: &str) -> Result<Vec<Interval>> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);

    content
        .lines()
        .map(str::trim)
        .filter(|line| line.contains("-->"))
        .map(parse_timing_line)
        .collect()
}

fn parse_timing_line(line: &str) -> Result<Interval> {
    let caps = TIMING_LINE
        .captures(line)
        .ok_or_else(|| DialogError::MalformedTimestamp(line.to_string()))?;

    let start: Timestamp = format!("{}.{}", &caps[1], &caps[2]).parse()?;
    let end: Timestamp = format!("{}.{}", &caps[3], &caps[4]).parse()?;
    Ok(Interval::new(start, end))
}
