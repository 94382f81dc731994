use anyhow::{Context, Result};
use clap::Parser;
use extract_dialog::audio::{
    check_ffmpeg, check_ffprobe, describe_video, probe_video, FfmpegTranscoder, Transcoder,
    VideoInfo,
};
use extract_dialog::chapters::{chapters_with_titles, summarize_chapters};
use extract_dialog::config::{parse_duration, Config};
use extract_dialog::interactive::{
    choose_chapter_titles, choose_skipped_chapters, choose_stream, confirm_jobs, print_header,
    StreamKind,
};
use extract_dialog::pipeline::{
    extract_dialog_with_cancel, print_summary, ExtractionJob, PipelineConfig,
};
use extract_dialog::DialogError;
use std::fs::File;
use std::future::Future;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

const SUPPORTED_EXTENSIONS: &[&str] = &["mkv", "mp4"];

#[derive(Parser)]
#[command(name = "extract-dialog")]
#[command(version, about = "Extract spoken dialog from videos using subtitle timing")]
#[command(
    long_about = "Cut the audio of a video down to the parts covered by subtitles, optionally skipping chapters such as openings and endings."
)]
struct Cli {
    /// Input video file, or a directory of videos
    input: PathBuf,

    /// Directory for the extracted audio
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Merge cues separated by a gap no larger than this (e.g. 1.5s, 800ms)
    #[arg(short, long)]
    threshold: Option<String>,

    /// Number of audio fragments cut in parallel
    #[arg(short, long)]
    concurrency: Option<usize>,

    /// Stream index of the audio track to use
    #[arg(long)]
    audio_track: Option<usize>,

    /// Stream index of the subtitle track to use
    #[arg(long)]
    subtitle_track: Option<usize>,

    /// Chapter title to skip (repeatable)
    #[arg(long = "skip-chapter", value_name = "TITLE")]
    skip_chapters: Vec<String>,

    /// Never prompt; use defaults for anything not given on the command line
    #[arg(short, long)]
    yes: bool,

    /// Also write the log to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let console = fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact();

    let file_layer = match log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create log file {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_target(false),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .init();
    Ok(())
}

fn apply_cli_overrides(config: &mut Config, cli: &Cli) -> Result<()> {
    if let Some(ref threshold) = cli.threshold {
        config.threshold = parse_duration(threshold)?;
    }
    if let Some(ref dir) = cli.output_dir {
        config.output_dir = dir.clone();
    }
    if let Some(concurrency) = cli.concurrency {
        config.concurrency = concurrency;
    }
    if let Some(ref path) = cli.log_file {
        config.log_file = Some(path.clone());
    }
    Ok(())
}

fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}

/// The videos to process: the input itself, or the supported files in it.
fn collect_videos(input: &Path) -> Result<Vec<PathBuf>> {
    if !input.exists() {
        anyhow::bail!("Input not found: {}", input.display());
    }
    if !input.is_dir() {
        return Ok(vec![input.to_path_buf()]);
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(input)? {
        let path = entry?.path();
        if path.is_file() && is_supported(&path) {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

fn plan_job(
    path: &Path,
    info: &VideoInfo,
    cli: &Cli,
    batch_titles: Option<&[String]>,
    interactive: bool,
) -> Result<ExtractionJob> {
    let skipped_chapters = match batch_titles {
        Some(titles) => chapters_with_titles(&info.chapters, titles)?,
        None => choose_skipped_chapters(&info.chapters, &cli.skip_chapters, interactive)?,
    };
    let audio = choose_stream(StreamKind::Audio, &info.streams, cli.audio_track, interactive)?;
    let subtitles = choose_stream(
        StreamKind::Subtitle,
        &info.streams,
        cli.subtitle_track,
        interactive,
    )?;

    Ok(ExtractionJob {
        input: path.to_path_buf(),
        audio_stream: audio.index,
        subtitle_stream: subtitles.index,
        skipped_chapters,
    })
}

/// Probe every video with `probe`, leaving out the ones that fail.
///
/// Returns the readable videos with their info, and the number of failures.
async fn probe_videos<F, Fut>(
    videos: &[PathBuf],
    probe: F,
) -> (Vec<(PathBuf, VideoInfo)>, usize)
where
    F: Fn(PathBuf) -> Fut,
    Fut: Future<Output = extract_dialog::Result<VideoInfo>>,
{
    let mut probed = Vec::with_capacity(videos.len());
    let mut failures = 0usize;
    for path in videos {
        match probe(path.clone()).await {
            Ok(info) => probed.push((path.clone(), info)),
            Err(e) => {
                error!("Skipping {}: {}", path.display(), e);
                failures += 1;
            }
        }
    }
    (probed, failures)
}

async fn probe_with_report(path: PathBuf) -> extract_dialog::Result<VideoInfo> {
    let info = probe_video(&path).await?;
    match describe_video(&path).await {
        Ok(report) => debug!("{}", report),
        Err(e) => warn!("Could not describe {}: {}", path.display(), e),
    }
    Ok(info)
}

/// One job per probed video; videos that cannot be planned are counted.
fn plan_jobs(
    probed: &[(PathBuf, VideoInfo)],
    cli: &Cli,
    batch_titles: Option<&[String]>,
    interactive: bool,
) -> (Vec<ExtractionJob>, usize) {
    let mut failures = 0usize;
    let mut jobs = Vec::with_capacity(probed.len());
    for (path, info) in probed {
        info!("Configuring {}", path.display());
        match plan_job(path, info, cli, batch_titles, interactive) {
            Ok(job) => jobs.push(job),
            Err(e) => {
                error!("Skipping {}: {:#}", path.display(), e);
                failures += 1;
            }
        }
    }
    (jobs, failures)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (mut config, rejected_overrides) =
        Config::load().context("Failed to load configuration")?;
    apply_cli_overrides(&mut config, &cli)?;
    config.validate().context("Configuration validation failed")?;

    init_logging(cli.verbose, config.log_file.as_deref())?;
    for message in &rejected_overrides {
        warn!("{}", message);
    }

    let interactive = !cli.yes && std::io::stdin().is_terminal();
    if interactive {
        print_header();
    }

    check_ffmpeg().await?;
    check_ffprobe().await?;

    let videos = collect_videos(&cli.input)?;
    if videos.is_empty() {
        anyhow::bail!("No supported video files found in {}", cli.input.display());
    }

    info!("Input:     {}", cli.input.display());
    info!("Output:    {}", config.output_dir.display());
    info!(
        "Threshold: {}",
        extract_dialog::config::format_duration(config.threshold)
    );

    let (probed, mut failures) = probe_videos(&videos, probe_with_report).await;

    let batch_titles = if cli.input.is_dir() {
        let infos: Vec<VideoInfo> = probed.iter().map(|(_, info)| info.clone()).collect();
        let summaries = summarize_chapters(&infos);
        Some(choose_chapter_titles(
            &summaries,
            &cli.skip_chapters,
            interactive,
        )?)
    } else {
        None
    };

    let (jobs, planning_failures) =
        plan_jobs(&probed, &cli, batch_titles.as_deref(), interactive);
    failures += planning_failures;

    if interactive && !jobs.is_empty() && !confirm_jobs(&jobs)? {
        anyhow::bail!("Cancelled by user");
    }

    let cancelled = Arc::new(AtomicBool::new(false));
    let handler_flag = cancelled.clone();
    ctrlc::set_handler(move || {
        handler_flag.store(true, Ordering::Relaxed);
    })
    .context("Failed to install Ctrl+C handler")?;

    let transcoder: Arc<dyn Transcoder> = Arc::new(FfmpegTranscoder::new(config.audio_quality));
    let pipeline_config = PipelineConfig::from(config);

    for job in &jobs {
        match extract_dialog_with_cancel(
            job,
            transcoder.clone(),
            &pipeline_config,
            cancelled.clone(),
        )
        .await
        {
            Ok(result) => print_summary(&result),
            Err(DialogError::Cancelled) => {
                warn!("Cancelled while processing {}", job.input.display());
                anyhow::bail!("Cancelled");
            }
            Err(e) => {
                error!("Failed to extract dialog from {}: {}", job.input.display(), e);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} of {} videos failed", failures, videos.len());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use extract_dialog::audio::parse_video_info;

    const EPISODE_JSON: &str = r#"{
        "streams": [
            { "index": 0, "codec_type": "video", "codec_name": "h264" },
            { "index": 1, "codec_type": "audio", "codec_name": "flac",
              "disposition": { "default": 1 } },
            { "index": 2, "codec_type": "subtitle", "codec_name": "subrip" }
        ],
        "chapters": [
            { "id": 0, "start_time": "0.000000", "end_time": "90.000000",
              "tags": { "title": "Opening" } },
            { "id": 1, "start_time": "N/A", "end_time": "N/A",
              "tags": { "title": "Broken" } }
        ]
    }"#;

    async fn fake_probe(path: PathBuf) -> extract_dialog::Result<VideoInfo> {
        if path.ends_with("02.mkv") {
            return Err(DialogError::Probe("ffprobe exited with status 1".to_string()));
        }
        parse_video_info(EPISODE_JSON)
    }

    #[tokio::test]
    async fn test_unreadable_video_does_not_stop_batch() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["01.mkv", "02.mkv", "03.mkv"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        let videos = collect_videos(dir.path()).unwrap();

        let (probed, probe_failures) = probe_videos(&videos, fake_probe).await;
        assert_eq!(probe_failures, 1);
        assert_eq!(probed.len(), 2);

        let infos: Vec<VideoInfo> = probed.iter().map(|(_, info)| info.clone()).collect();
        let summaries = summarize_chapters(&infos);
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].count, 2);

        let input = dir.path().to_string_lossy().into_owned();
        let cli = Cli::parse_from(["extract-dialog", input.as_str(), "--yes"]);
        let titles = vec!["Opening".to_string()];
        let (jobs, planning_failures) = plan_jobs(&probed, &cli, Some(&titles), false);

        assert_eq!(planning_failures, 0);
        let planned: Vec<PathBuf> = jobs.iter().map(|j| j.input.clone()).collect();
        assert_eq!(
            planned,
            vec![dir.path().join("01.mkv"), dir.path().join("03.mkv")]
        );
        for job in &jobs {
            assert_eq!(job.audio_stream, 1);
            assert_eq!(job.subtitle_stream, 2);
            assert_eq!(job.skipped_chapters.len(), 1);
        }
    }

    #[test]
    fn test_unplannable_video_is_counted() {
        let mut no_subtitles = parse_video_info(EPISODE_JSON).unwrap();
        no_subtitles.streams.retain(|s| !s.is_subtitle());
        let probed = vec![
            (PathBuf::from("01.mkv"), parse_video_info(EPISODE_JSON).unwrap()),
            (PathBuf::from("02.mkv"), no_subtitles),
        ];

        let cli = Cli::parse_from(["extract-dialog", ".", "--yes"]);
        let (jobs, failures) = plan_jobs(&probed, &cli, None, false);
        assert_eq!(failures, 1);
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].input, PathBuf::from("01.mkv"));
    }

    #[test]
    fn test_is_supported() {
        assert!(is_supported(Path::new("/videos/a.mkv")));
        assert!(is_supported(Path::new("/videos/a.MKV")));
        assert!(is_supported(Path::new("/videos/a.mp4")));
        assert!(!is_supported(Path::new("/videos/a.srt")));
        assert!(!is_supported(Path::new("/videos/mkv")));
    }

    #[test]
    fn test_collect_videos_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["02.mkv", "01.mkv", "notes.txt", "03.mp4"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        std::fs::create_dir(dir.path().join("extras.mkv")).unwrap();

        let videos = collect_videos(dir.path()).unwrap();
        let names: Vec<String> = videos
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["01.mkv", "02.mkv", "03.mp4"]);
    }

    #[test]
    fn test_collect_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("episode.mkv");
        std::fs::write(&path, b"").unwrap();
        assert_eq!(collect_videos(&path).unwrap(), vec![path]);
    }

    #[test]
    fn test_collect_missing_input() {
        assert!(collect_videos(Path::new("/nonexistent/videos")).is_err());
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::parse_from([
            "extract-dialog",
            "video.mkv",
            "--threshold",
            "800ms",
            "--output-dir",
            "/tmp/out",
            "--skip-chapter",
            "Opening",
            "--skip-chapter",
            "Ending",
        ]);
        let mut config = Config::default();
        apply_cli_overrides(&mut config, &cli).unwrap();

        assert_eq!(config.threshold, std::time::Duration::from_millis(800));
        assert_eq!(config.output_dir, PathBuf::from("/tmp/out"));
        assert_eq!(cli.skip_chapters, vec!["Opening", "Ending"]);
    }
}
