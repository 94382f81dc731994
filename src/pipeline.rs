use crate::audio::Transcoder;
use crate::config::Config;
use crate::dialog::{plan_dialog, total_duration, Interval};
use crate::error::{DialogError, Result};
use crate::subtitle::{read_cues, SUBTITLE_FILE_NAME};
use futures::stream::{FuturesUnordered, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

const FULL_AUDIO_FILE_NAME: &str = "full_audio.mp3";
const CONCAT_LIST_FILE_NAME: &str = "output.txt";
const OUTPUT_EXTENSION: &str = "mp3";

/// One video and the choices made for it.
#[derive(Debug, Clone)]
pub struct ExtractionJob {
    pub input: PathBuf,
    /// Absolute index of the audio stream to cut.
    pub audio_stream: usize,
    /// Absolute index of the subtitle stream providing the timing.
    pub subtitle_stream: usize,
    /// Chapter ranges to remove from the dialog.
    pub skipped_chapters: Vec<Interval>,
}

/// Configuration for the extraction pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Gap threshold for merging cues.
    pub threshold: Duration,
    /// Directory the final audio file is written to.
    pub output_dir: PathBuf,
    /// Number of fragments cut concurrently.
    pub concurrency: usize,
    /// Show progress bars.
    pub show_progress: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Config::default().into()
    }
}

impl From<Config> for PipelineConfig {
    fn from(config: Config) -> Self {
        Self {
            threshold: config.threshold,
            output_dir: config.output_dir,
            concurrency: config.concurrency,
            show_progress: true,
        }
    }
}

/// Statistics from one extraction.
#[derive(Debug, Clone)]
pub struct PipelineStats {
    /// Total time taken for the entire pipeline.
    pub total_time: Duration,
    /// Time spent cutting and joining audio.
    pub extraction_time: Duration,
    /// Number of subtitle cues read.
    pub cue_count: usize,
    /// Number of fragments extracted.
    pub interval_count: usize,
    /// Total duration of dialog kept.
    pub dialog_duration: Duration,
}

/// Result of extracting dialog from one video.
#[derive(Debug)]
pub struct PipelineResult {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    /// The spans that were extracted, in output order.
    pub intervals: Vec<Interval>,
    pub stats: PipelineStats,
}

/// `<output_dir>/<input stem>.mp3`
pub fn derive_output_path(input: &Path, output_dir: &Path) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default();
    output_dir.join(format!("{}.{}", stem.to_string_lossy(), OUTPUT_EXTENSION))
}

/// Contents of an ffmpeg concat-demuxer list, one line per fragment.
pub fn concat_list<S: AsRef<str>>(fragment_names: &[S]) -> String {
    fragment_names
        .iter()
        .map(|name| format!("file '{}'\n", name.as_ref()))
        .collect()
}

fn fragment_name(index: usize) -> String {
    format!("shard-{index}.{OUTPUT_EXTENSION}")
}

fn check_cancelled(cancelled: &AtomicBool) -> Result<()> {
    if cancelled.load(Ordering::Relaxed) {
        Err(DialogError::Cancelled)
    } else {
        Ok(())
    }
}

/// Leave the progress bar marked as failed when `result` is an error.
fn abandon_on_error<T>(
    progress_bar: Option<&ProgressBar>,
    result: Result<T>,
    temp_path: &Path,
) -> Result<T> {
    if let Err(e) = &result {
        if let Some(pb) = progress_bar {
            pb.abandon_with_message("Extraction failed");
        }
        if matches!(e, DialogError::Cancelled) {
            warn!("Extraction cancelled, cleaning up temp files: {:?}", temp_path);
        }
    }
    result
}

/// Cut every interval out of `source`, at most `concurrency` at a time.
#[allow(clippy::too_many_arguments)]
async fn extract_fragments(
    transcoder: Arc<dyn Transcoder>,
    source: &Path,
    intervals: &[Interval],
    fragment_names: &[String],
    work_dir: &Path,
    concurrency: usize,
    progress_bar: Option<&ProgressBar>,
    cancelled: &Arc<AtomicBool>,
) -> Result<()> {
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let total = intervals.len();
    let mut futures = FuturesUnordered::new();

    for (index, (interval, name)) in intervals.iter().zip(fragment_names).enumerate() {
        let sem = semaphore.clone();
        let transcoder = transcoder.clone();
        let output = work_dir.join(name);

        futures.push(async move {
            let _permit = sem.acquire().await.map_err(|_| DialogError::Cancelled)?;
            check_cancelled(cancelled)?;

            debug!("Extracting fragment {}: {}", index, interval);
            transcoder.extract_interval(source, interval, &output).await?;

            if let Some(pb) = progress_bar {
                pb.set_message(format!("Splitting audio ({}/{})", index + 1, total));
                pb.inc(1);
            }
            Ok::<(), DialogError>(())
        });
    }

    while let Some(result) = futures.next().await {
        result?;
    }
    Ok(())
}

/// Extract the dialog of one video into a single audio file.
pub async fn extract_dialog(
    job: &ExtractionJob,
    transcoder: Arc<dyn Transcoder>,
    config: &PipelineConfig,
) -> Result<PipelineResult> {
    let cancelled = Arc::new(AtomicBool::new(false));
    extract_dialog_with_cancel(job, transcoder, config, cancelled).await
}

/// Extract dialog with cancellation support.
pub async fn extract_dialog_with_cancel(
    job: &ExtractionJob,
    transcoder: Arc<dyn Transcoder>,
    config: &PipelineConfig,
    cancelled: Arc<AtomicBool>,
) -> Result<PipelineResult> {
    let start_time = Instant::now();

    if !job.input.exists() {
        return Err(DialogError::FileNotFound(job.input.display().to_string()));
    }

    // Dropped on every exit path, which removes the scratch files.
    let temp_dir = tempfile::Builder::new()
        .prefix("extract-dialog")
        .tempdir()?;
    let temp_path = temp_dir.path();
    debug!("Using temp directory: {:?}", temp_path);

    fs::create_dir_all(&config.output_dir)?;

    check_cancelled(&cancelled)?;

    // ═══════════════════════════════════════════════════════════════════════
    // Stage 1: Subtitle timing
    // ═══════════════════════════════════════════════════════════════════════
    info!("Stage 1/4: Reading subtitle timing from {:?}", job.input);

    let subtitle_path = temp_path.join(SUBTITLE_FILE_NAME);
    transcoder
        .extract_subtitles(&job.input, job.subtitle_stream, &subtitle_path)
        .await?;
    let cues = read_cues(&subtitle_path)?;
    debug!("Read {} cues", cues.len());

    let intervals = plan_dialog(&cues, config.threshold, &job.skipped_chapters)?;
    if intervals.is_empty() {
        return Err(DialogError::NoDialog);
    }
    let dialog_duration = total_duration(&intervals);
    info!(
        "{} cues merged into {} dialog segments ({:.1}s)",
        cues.len(),
        intervals.len(),
        dialog_duration.as_secs_f64()
    );
    for chapter in &job.skipped_chapters {
        debug!("Skipping chapter {}", chapter);
    }

    check_cancelled(&cancelled)?;

    // ═══════════════════════════════════════════════════════════════════════
    // Stage 2: Full audio track
    // ═══════════════════════════════════════════════════════════════════════
    info!("Stage 2/4: Copying audio stream {}", job.audio_stream);
    let extraction_start = Instant::now();

    let progress_bar = if config.show_progress {
        let pb = ProgressBar::new(intervals.len() as u64 + 3);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{msg:.green} [{bar:40.cyan/blue}] {percent}%")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb.set_message("Copying audio");
        Some(pb)
    } else {
        None
    };

    let full_audio = temp_path.join(FULL_AUDIO_FILE_NAME);
    let output_path = derive_output_path(&job.input, &config.output_dir);

    let cut_and_join = async {
        transcoder
            .extract_audio(&job.input, job.audio_stream, &full_audio)
            .await?;
        if let Some(pb) = &progress_bar {
            pb.inc(1);
        }

        check_cancelled(&cancelled)?;

        // ═══════════════════════════════════════════════════════════════════
        // Stage 3: Fragments
        // ═══════════════════════════════════════════════════════════════════
        info!(
            "Stage 3/4: Splitting audio into {} fragments (concurrency: {})",
            intervals.len(),
            config.concurrency
        );

        let fragment_names: Vec<String> = (0..intervals.len()).map(fragment_name).collect();
        extract_fragments(
            transcoder.clone(),
            &full_audio,
            &intervals,
            &fragment_names,
            temp_path,
            config.concurrency,
            progress_bar.as_ref(),
            &cancelled,
        )
        .await?;

        check_cancelled(&cancelled)?;

        // ═══════════════════════════════════════════════════════════════════
        // Stage 4: Join and re-encode
        // ═══════════════════════════════════════════════════════════════════
        info!("Stage 4/4: Joining {} fragments", fragment_names.len());

        let list_path = temp_path.join(CONCAT_LIST_FILE_NAME);
        fs::write(&list_path, concat_list(&fragment_names))?;

        if let Some(pb) = &progress_bar {
            pb.set_message("Joining audio fragments");
        }
        let joined = temp_path.join(
            output_path
                .file_name()
                .unwrap_or_else(|| std::ffi::OsStr::new("joined.mp3")),
        );
        transcoder.concatenate(&list_path, &joined).await?;
        if let Some(pb) = &progress_bar {
            pb.inc(1);
            pb.set_message("Re-encoding audio");
        }

        check_cancelled(&cancelled)?;

        transcoder.reencode(&joined, &output_path).await
    };
    abandon_on_error(progress_bar.as_ref(), cut_and_join.await, temp_path)?;

    if let Some(pb) = &progress_bar {
        pb.inc(1);
        pb.finish_with_message("✓ Dialog extracted");
    }

    let extraction_time = extraction_start.elapsed();
    info!("Created file {}", output_path.display());

    let stats = PipelineStats {
        total_time: start_time.elapsed(),
        extraction_time,
        cue_count: cues.len(),
        interval_count: intervals.len(),
        dialog_duration,
    };

    Ok(PipelineResult {
        input_path: job.input.clone(),
        output_path,
        intervals,
        stats,
    })
}

/// Print a summary of the pipeline results.
pub fn print_summary(result: &PipelineResult) {
    println!();
    println!("═══════════════════════════════════════════════════════════════");
    println!("                    Dialog Extraction Complete                 ");
    println!("═══════════════════════════════════════════════════════════════");
    println!();
    println!("  Input:      {}", result.input_path.display());
    println!("  Output:     {}", result.output_path.display());
    println!("  Cues:       {}", result.stats.cue_count);
    println!("  Segments:   {}", result.stats.interval_count);
    println!(
        "  Dialog:     {:.1}s audio",
        result.stats.dialog_duration.as_secs_f64()
    );
    println!();
    println!("  Timing:");
    println!(
        "    Extract:     {:.2}s",
        result.stats.extraction_time.as_secs_f64()
    );
    println!(
        "    Total:       {:.2}s",
        result.stats.total_time.as_secs_f64()
    );
    println!();
    println!("═══════════════════════════════════════════════════════════════");
}
