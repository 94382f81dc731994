use crate::audio::{Chapter, Stream};
use crate::chapters::{chapters_with_titles, ChapterSummary};
use crate::dialog::Interval;
use crate::error::DialogError;
use crate::pipeline::ExtractionJob;
use anyhow::Context;
use console::style;
use dialoguer::{Confirm, MultiSelect, Select};
use tracing::{info, warn};

/// Which streams of a given kind to offer and report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Audio,
    Subtitle,
}

impl std::fmt::Display for StreamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamKind::Audio => write!(f, "audio"),
            StreamKind::Subtitle => write!(f, "subtitle"),
        }
    }
}

pub fn print_header() {
    println!();
    println!(
        "{}",
        style("╔═══════════════════════════════════════════════════╗").cyan()
    );
    println!(
        "{}",
        style("║      extract-dialog - Subtitle Dialog Extractor   ║").cyan()
    );
    println!(
        "{}",
        style("╚═══════════════════════════════════════════════════╝").cyan()
    );
    println!();
}

/// `Title (lang) - codec`, with a `[forced]` marker where set.
pub fn stream_label(stream: &Stream) -> String {
    let codec = stream
        .codec_long_name
        .as_deref()
        .or(stream.codec_name.as_deref())
        .unwrap_or("unknown codec");
    let label = format!("{} ({}) - {}", stream.title(), stream.language(), codec);
    if stream.is_forced() {
        format!("{label} [forced]")
    } else {
        label
    }
}

/// Position of the default-disposition stream, or 0.
pub fn default_stream_position(streams: &[Stream]) -> usize {
    streams.iter().position(Stream::is_default).unwrap_or(0)
}

/// Pick one stream of `kind`.
///
/// An explicit `requested` index wins; a single candidate is taken as is;
/// otherwise the user is asked, or the default stream is used when not
/// running interactively.
pub fn choose_stream(
    kind: StreamKind,
    streams: &[Stream],
    requested: Option<usize>,
    interactive: bool,
) -> anyhow::Result<Stream> {
    let candidates: Vec<Stream> = match kind {
        StreamKind::Audio => streams.iter().filter(|s| s.is_audio()).cloned().collect(),
        StreamKind::Subtitle => {
            let (text, bitmap): (Vec<Stream>, Vec<Stream>) = streams
                .iter()
                .filter(|s| s.is_subtitle())
                .cloned()
                .partition(Stream::is_text_subtitle);
            for s in &bitmap {
                warn!("Ignoring image-based subtitle track {}", stream_label(s));
            }
            text
        }
    };

    if candidates.is_empty() {
        return Err(DialogError::NoTracks(kind.to_string()).into());
    }

    if let Some(index) = requested {
        return candidates
            .iter()
            .find(|s| s.index == index)
            .cloned()
            .with_context(|| format!("stream {index} is not a usable {kind} track"));
    }

    if candidates.len() == 1 {
        let only = &candidates[0];
        info!(
            "Found one {} track: {} ({})",
            kind,
            only.title(),
            only.language()
        );
        return Ok(only.clone());
    }

    let default = default_stream_position(&candidates);
    if !interactive {
        let chosen = &candidates[default];
        info!("Using {} track: {}", kind, stream_label(chosen));
        return Ok(chosen.clone());
    }

    let items: Vec<String> = candidates.iter().map(stream_label).collect();
    let selection = Select::new()
        .with_prompt(format!("Select the {kind} track to use"))
        .items(&items)
        .default(default)
        .interact()?;

    Ok(candidates[selection].clone())
}

/// Chapters of a single video to remove.
///
/// Titles given on the command line are used directly; otherwise the
/// user picks from the chapter list.
pub fn choose_skipped_chapters(
    chapters: &[Chapter],
    requested_titles: &[String],
    interactive: bool,
) -> anyhow::Result<Vec<Interval>> {
    if chapters.is_empty() {
        info!("No chapters found, skipping step");
        return Ok(Vec::new());
    }

    if !requested_titles.is_empty() || !interactive {
        return Ok(chapters_with_titles(chapters, requested_titles)?);
    }

    let intervals: Vec<Interval> = chapters
        .iter()
        .map(Chapter::to_interval)
        .collect::<crate::error::Result<_>>()?;
    let items: Vec<String> = intervals.iter().map(Interval::to_string).collect();

    let selection = MultiSelect::new()
        .with_prompt("Choose chapters that should be ignored (space to toggle)")
        .items(&items)
        .interact()?;

    Ok(selection
        .into_iter()
        .map(|i| intervals[i].clone())
        .collect())
}

/// Chapter titles to remove from every video in a batch.
pub fn choose_chapter_titles(
    summaries: &[ChapterSummary],
    requested_titles: &[String],
    interactive: bool,
) -> anyhow::Result<Vec<String>> {
    if !requested_titles.is_empty() || !interactive || summaries.is_empty() {
        return Ok(requested_titles.to_vec());
    }

    let items: Vec<String> = summaries
        .iter()
        .map(|s| format!("{}\t{}", s.title, style(s.description()).dim()))
        .collect();

    let selection = MultiSelect::new()
        .with_prompt("Select chapter titles to ignore in all videos (space to toggle)")
        .items(&items)
        .interact()?;

    Ok(selection
        .into_iter()
        .map(|i| summaries[i].title.clone())
        .collect())
}

/// Show the planned jobs and ask for confirmation.
pub fn confirm_jobs(jobs: &[ExtractionJob]) -> anyhow::Result<bool> {
    println!("\n{}", style("═══ Summary ═══").bold());
    for job in jobs {
        println!("  {}", style(job.input.display()).cyan());
        println!(
            "    audio stream {}, subtitle stream {}",
            job.audio_stream, job.subtitle_stream
        );
        for chapter in &job.skipped_chapters {
            println!("    skip {}", chapter);
        }
    }
    println!();

    Ok(Confirm::new()
        .with_prompt("Proceed with these settings?")
        .default(true)
        .interact()?)
}
