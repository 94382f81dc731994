use std::collections::HashMap;

use crate::audio::{Chapter, VideoInfo};
use crate::dialog::{Interval, Timestamp};
use crate::error::Result;
use tracing::warn;

/// A chapter title seen across a batch of videos.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterSummary {
    pub title: String,
    /// Number of chapters with this title across all videos.
    pub count: usize,
    pub median_start: Timestamp,
    pub median_end: Timestamp,
}

impl ChapterSummary {
    pub fn description(&self) -> String {
        format!(
            "({} - {}) found in {} videos",
            self.median_start, self.median_end, self.count
        )
    }
}

/// Group chapters by title over `videos`, sorted by median start.
///
/// Chapters whose times cannot be read are left out with a warning.
pub fn summarize_chapters(videos: &[VideoInfo]) -> Vec<ChapterSummary> {
    let mut grouped: HashMap<String, (Vec<Timestamp>, Vec<Timestamp>)> = HashMap::new();

    for chapter in videos.iter().flat_map(|v| &v.chapters) {
        let interval = match chapter.to_interval() {
            Ok(interval) => interval,
            Err(e) => {
                warn!("Ignoring chapter '{}': {}", chapter.title(), e);
                continue;
            }
        };
        let (starts, ends) = grouped.entry(chapter.title().to_string()).or_default();
        starts.push(interval.start);
        ends.push(interval.end);
    }

    let mut summaries: Vec<ChapterSummary> = grouped
        .into_iter()
        .map(|(title, (mut starts, mut ends))| ChapterSummary {
            count: starts.len(),
            median_start: upper_median(&mut starts),
            median_end: upper_median(&mut ends),
            title,
        })
        .collect();

    summaries.sort_by(|a, b| {
        a.median_start
            .cmp(&b.median_start)
            .then_with(|| a.title.cmp(&b.title))
    });
    summaries
}

/// Middle element after sorting; the upper one for even lengths.
fn upper_median(values: &mut [Timestamp]) -> Timestamp {
    values.sort();
    values[values.len() / 2]
}

/// The chapters whose title is one of `titles`, as titled intervals.
pub fn chapters_with_titles(chapters: &[Chapter], titles: &[String]) -> Result<Vec<Interval>> {
    chapters
        .iter()
        .filter(|c| titles.iter().any(|t| t == c.title()))
        .map(Chapter::to_interval)
        .collect()
}
