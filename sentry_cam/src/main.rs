// THEORY:
// `sentry_cam` is the webcam front-end for the `motion_sentry` library. It owns
// everything the library deliberately leaves outside: OpenCV capture, encoding
// and preview windows, the audio device, the command line, and process-level
// logging. The capture loop itself stays synchronous on the main thread; a
// small tokio runtime exists only to turn Ctrl-C into the same cooperative quit
// the preview window's `q` key produces.

mod audio;
mod camera;
mod convert;
mod preview;
mod video;
mod wav;

use anyhow::{Context, Result};
use audio::CpalAudioSink;
use camera::{CameraSource, Input};
use clap::{crate_authors, crate_version, Arg, ArgMatches, Command};
use motion_sentry::config::ENV_PREFIX;
use motion_sentry::{
    AlertingReaction, FsImageSink, Headless, Monitor, MotionConfig, MotionPipeline, Reaction, ReactionKind,
    RecordingReaction, SnapshotReaction,
};
use preview::PreviewWindow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use video::OpenCvVideoSink;

const WINDOW_TITLE: &str = "Motion Detector";

/// CLI flags that map one-to-one onto `MotionConfig` fields.
const CONFIG_FLAGS: &[(&str, &str, &str)] = &[
    ("reaction", "REACTION", "snapshot, recording or alert"),
    ("sensitivity", "SENSITIVITY", "Per-pixel intensity change (0-255) counted as motion"),
    ("min-area", "MIN_CONTOUR_AREA", "Smallest contour area, in square pixels, treated as motion"),
    ("stabilization", "STABILIZATION_TICKS", "Frames used to settle the background"),
    ("dilation", "DILATION_ITERATIONS", "Dilation passes applied to the motion mask"),
    ("blur-kernel", "BLUR_KERNEL", "Odd Gaussian kernel size"),
    ("fps", "RECORDING_FPS", "Frame rate written into recordings"),
    ("codec", "CODEC", "Four-character video codec"),
    ("photo-dir", "PHOTO_DIR", "Directory for captured stills"),
    ("video-dir", "VIDEO_DIR", "Directory for recordings"),
    ("alert-sound", "ALERT_SOUND", "WAV file looped while recording with alert"),
    ("on-sink-failure", "SINK_FAILURE", "continue or abort when a capture cannot be written"),
];

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let matches = cli().get_matches();
    let config = build_config(&matches)?;
    let input = Input::parse(matches.value_of("input").unwrap_or("0"));
    log::debug!("{config:?}");

    // --- 1. Ctrl-C watcher ---
    let interrupted = Arc::new(AtomicBool::new(false));
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .context("failed to start signal runtime")?;
    {
        let interrupted = interrupted.clone();
        runtime.spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::info!("Interrupt received, finishing the current frame.");
                interrupted.store(true, Ordering::Relaxed);
            }
        });
    }

    // --- 2. Pipeline ---
    let reaction = build_reaction(&config);
    log::info!("Reacting to motion with {:?}.", reaction.kind());
    let mut pipeline: MotionPipeline =
        MotionPipeline::new(config, reaction).context("invalid motion configuration")?;

    // --- 3. Source & monitor ---
    let mut source = CameraSource::new(input);
    let mut monitor: Box<dyn Monitor> = if matches.is_present("headless") {
        let interrupted = interrupted.clone();
        Box::new(Headless::new(move || interrupted.load(Ordering::Relaxed)))
    } else {
        Box::new(PreviewWindow::new(WINDOW_TITLE, interrupted.clone()).context("failed to open preview window")?)
    };

    // --- 4. Run ---
    match pipeline.run(&mut source, monitor.as_mut()) {
        Ok(summary) => {
            log::info!(
                "Processed {} frames: {} with motion, {} reaction(s) triggered, {} skipped, {} sink failure(s).",
                summary.ticks,
                summary.detections,
                summary.activations,
                summary.skipped_ticks,
                summary.sink_failures
            );
            Ok(())
        }
        Err(e) => {
            log::error!("{e}");
            Err(e).context("motion capture stopped")
        }
    }
}

fn cli() -> Command<'static> {
    let mut command = Command::new("sentry_cam")
        .version(crate_version!())
        .author(crate_authors!())
        .about("Watches a camera or video file and reacts to motion.")
        .arg(
            Arg::new("input")
                .help("Camera index or video file path")
                .takes_value(true)
                .default_value("0"),
        )
        .arg(
            Arg::new("headless")
                .long("headless")
                .help("Run without a preview window; stop with Ctrl-C"),
        );

    for &(long, _, help) in CONFIG_FLAGS {
        command = command.arg(Arg::new(long).long(long).takes_value(true).help(help));
    }
    command
}

/// Defaults, then `MOTION_SENTRY_*` environment overrides, then CLI flags.
fn build_config(matches: &ArgMatches) -> Result<MotionConfig> {
    let mut config = MotionConfig::from_env().context("invalid MOTION_SENTRY_* environment override")?;

    let flags = CONFIG_FLAGS.iter().filter_map(|&(long, field, _)| {
        matches
            .value_of(long)
            .map(|value| (format!("{ENV_PREFIX}{field}"), value.to_string()))
    });
    config.apply_overrides(flags).context("invalid command line option")?;
    config.validate().context("invalid motion configuration")?;
    Ok(config)
}

fn build_reaction(config: &MotionConfig) -> Box<dyn Reaction> {
    match config.reaction {
        ReactionKind::Snapshot => Box::new(SnapshotReaction::new(FsImageSink::new(), config)),
        ReactionKind::Recording => Box::new(RecordingReaction::new(OpenCvVideoSink::new(), config)),
        ReactionKind::RecordingWithAlert => Box::new(AlertingReaction::new(
            RecordingReaction::new(OpenCvVideoSink::new(), config),
            CpalAudioSink::new(),
            config,
        )),
    }
}
