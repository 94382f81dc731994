pub mod consolidate;
pub mod subtract;
pub mod timestamp;

pub use consolidate::consolidate;
pub use subtract::subtract;
pub use timestamp::Timestamp;

use crate::error::Result;
use std::fmt;
use std::time::Duration;

/// A span of the source timeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interval {
    pub start: Timestamp,
    pub end: Timestamp,
    /// Display label, set when the interval came from a chapter.
    pub title: Option<String>,
}

impl Interval {
    pub fn new(start: Timestamp, end: Timestamp) -> Self {
        Self {
            start,
            end,
            title: None,
        }
    }

    /// Build an interval from two `HH:MM:SS.mmm` strings.
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        Ok(Self::new(start.parse()?, end.parse()?))
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Length of the interval; zero when degenerate.
    pub fn duration(&self) -> Duration {
        self.end.saturating_since(self.start)
    }

    /// True when the interval covers no time (`start >= end`).
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.title {
            Some(title) => write!(f, "{} ({} - {})", title, self.start, self.end),
            None => write!(f, "{} - {}", self.start, self.end),
        }
    }
}

/// Sum of the durations of `intervals`.
pub fn total_duration(intervals: &[Interval]) -> Duration {
    intervals.iter().map(Interval::duration).sum()
}

/// Turn raw cue timings into the final list of spans to extract.
///
/// Cues are consolidated with `threshold`, then every exclusion is removed.
pub fn plan_dialog(
    cues: &[Interval],
    threshold: Duration,
    exclusions: &[Interval],
) -> Result<Vec<Interval>> {
    let consolidated = consolidate(cues, threshold)?;
    Ok(subtract(&consolidated, exclusions))
}
