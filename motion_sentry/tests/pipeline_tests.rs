use motion_sentry::core_modules::naming::{parse_capture_file_name, CaptureKind};
use motion_sentry::core_modules::preprocessor::Preprocessor;
use motion_sentry::{
    AlertingReaction, AudioSink, FourCc, Frame, FrameSource, FsImageSink, Headless, Monitor, MotionConfig,
    MotionError, MotionPipeline, Reaction, ReactionState, RecordingReaction, Result, SinkFailurePolicy,
    SnapshotReaction, StopReason, VideoSink,
};
use image::{Rgb, RgbImage};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::Path;
use std::rc::Rc;

type Journal = Rc<RefCell<Vec<String>>>;

const WIDTH: u32 = 160;
const HEIGHT: u32 = 120;

fn quiet() -> Frame {
    Frame::from_image(RgbImage::from_pixel(WIDTH, HEIGHT, Rgb([20, 20, 20]))).unwrap()
}

/// A quiet frame with a bright 60x60 block whose top-left corner is at `(x, y)`.
fn block_at(x: u32, y: u32) -> Frame {
    let mut image = RgbImage::from_pixel(WIDTH, HEIGHT, Rgb([20, 20, 20]));
    for py in y..y + 60 {
        for px in x..x + 60 {
            image.put_pixel(px, py, Rgb([220, 220, 220]));
        }
    }
    Frame::from_image(image).unwrap()
}

fn config(window: u32) -> MotionConfig {
    MotionConfig {
        stabilization_ticks: window,
        ..MotionConfig::default()
    }
}

fn entries(journal: &Journal, prefix: &str) -> usize {
    journal.borrow().iter().filter(|e| e.starts_with(prefix)).count()
}

enum Step {
    Frame(Frame),
    Garbled,
    Fail,
}

struct ScriptedSource {
    steps: VecDeque<Step>,
    journal: Journal,
    refuse_open: bool,
}

impl ScriptedSource {
    fn new(frames: Vec<Frame>, journal: &Journal) -> Self {
        Self {
            steps: frames.into_iter().map(Step::Frame).collect(),
            journal: journal.clone(),
            refuse_open: false,
        }
    }

    fn then_fail(mut self) -> Self {
        self.steps.push_back(Step::Fail);
        self
    }

    fn then_garbled(mut self, count: usize) -> Self {
        self.steps.extend((0..count).map(|_| Step::Garbled));
        self
    }
}

impl FrameSource for ScriptedSource {
    fn open(&mut self) -> Result<()> {
        if self.refuse_open {
            return Err(MotionError::SourceUnavailable("camera 0 is busy".into()));
        }
        self.journal.borrow_mut().push("source.open".into());
        Ok(())
    }

    fn read(&mut self) -> Result<Option<Frame>> {
        match self.steps.pop_front() {
            Some(Step::Frame(frame)) => Ok(Some(frame)),
            Some(Step::Garbled) => Err(MotionError::InvalidFrame("corrupt JPEG data".into())),
            Some(Step::Fail) => Err(MotionError::FrameReadFailure("device unplugged".into())),
            None => Ok(None),
        }
    }

    fn release(&mut self) {
        self.journal.borrow_mut().push("source.release".into());
    }
}

struct MockVideo {
    journal: Journal,
    fail_writes: bool,
}

impl MockVideo {
    fn new(journal: &Journal) -> Self {
        Self {
            journal: journal.clone(),
            fail_writes: false,
        }
    }
}

impl VideoSink for MockVideo {
    type Handle = String;

    fn open(&mut self, path: &Path, width: u32, height: u32, fps: f64, codec: FourCc) -> Result<String> {
        self.journal
            .borrow_mut()
            .push(format!("video.open {width}x{height}@{fps} {codec}"));
        Ok(path.display().to_string())
    }

    fn write_frame(&mut self, handle: &mut String, _frame: &Frame) -> Result<()> {
        if self.fail_writes {
            return Err(MotionError::sink_write(handle.as_str(), "disk full"));
        }
        self.journal.borrow_mut().push("video.write".into());
        Ok(())
    }

    fn close(&mut self, _handle: String) -> Result<()> {
        self.journal.borrow_mut().push("video.close".into());
        Ok(())
    }
}

struct MockAudio {
    journal: Journal,
    playing: bool,
}

impl AudioSink for MockAudio {
    fn play_looped(&mut self, asset: &Path) -> Result<()> {
        self.journal.borrow_mut().push(format!("audio.play {}", asset.display()));
        self.playing = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.journal.borrow_mut().push("audio.stop".into());
        self.playing = false;
        Ok(())
    }

    fn is_playing(&self) -> bool {
        self.playing
    }
}

/// Requests a quit after `limit` presented frames.
struct QuitAfter {
    presented: usize,
    limit: usize,
}

impl Monitor for QuitAfter {
    fn present(&mut self, _frame: &Frame) -> Result<bool> {
        self.presented += 1;
        Ok(self.presented >= self.limit)
    }
}

fn never_quit() -> Headless<impl FnMut() -> bool> {
    Headless::new(|| false)
}

#[test]
fn baseline_tracks_every_warming_tick() {
    let journal = Journal::default();
    let reaction = RecordingReaction::new(MockVideo::new(&journal), &MotionConfig::default());
    let mut pipeline = MotionPipeline::new(MotionConfig::default(), reaction).unwrap();
    let preprocessor = Preprocessor::new(21).unwrap();

    for i in 0..30u32 {
        // Every warming frame differs wildly from the previous one.
        let frame = if i % 2 == 0 { quiet() } else { block_at(i, i) };
        let expected = preprocessor.process(&frame).unwrap();

        let report = pipeline.tick(&mut frame.clone()).unwrap();

        assert!(!report.detected(), "tick {i} ran detection");
        assert_eq!(pipeline.background().baseline(), Some(&expected));
    }
    assert!(pipeline.background().is_stable());
    assert_eq!(entries(&journal, "video."), 0);
}

#[test]
fn recording_follows_motion_episode() {
    let journal = Journal::default();
    let cfg = config(2);
    let reaction = RecordingReaction::new(MockVideo::new(&journal), &cfg);
    let mut pipeline = MotionPipeline::new(cfg, reaction).unwrap();

    // Warm, idle, motion (baseline becomes block A), block B still differs, block A again is quiet.
    let frames = vec![quiet(), quiet(), quiet(), block_at(10, 10), block_at(90, 50), block_at(10, 10)];
    let mut source = ScriptedSource::new(frames, &journal);

    let summary = pipeline.run(&mut source, &mut never_quit()).unwrap();

    assert_eq!(
        *journal.borrow(),
        vec![
            "source.open",
            "video.open 160x120@20 XVID",
            "video.write",
            "video.write",
            "video.close",
            "source.release",
        ]
    );
    assert_eq!(summary.ticks, 6);
    assert_eq!(summary.warming_ticks, 2);
    assert_eq!(summary.detections, 2);
    assert_eq!(summary.activations, 1);
    assert_eq!(summary.stop_reason, Some(StopReason::EndOfStream));
}

#[test]
fn reset_baseline_absorbs_the_trigger() {
    let journal = Journal::default();
    let cfg = config(1);
    let reaction = RecordingReaction::new(MockVideo::new(&journal), &cfg);
    let mut pipeline = MotionPipeline::new(cfg, reaction).unwrap();

    pipeline.tick(&mut quiet()).unwrap();
    let trigger = pipeline.tick(&mut block_at(40, 30)).unwrap();
    assert!(trigger.detected() && trigger.baseline_reset);

    let expected = Preprocessor::new(21).unwrap().process(&block_at(40, 30)).unwrap();
    assert_eq!(pipeline.background().baseline(), Some(&expected));

    let next = pipeline.tick(&mut block_at(40, 30)).unwrap();
    assert!(!next.detected());
    assert_eq!(next.state, ReactionState::Idle);
}

#[test]
fn alert_runs_for_the_length_of_the_recording() {
    let journal = Journal::default();
    let cfg = MotionConfig {
        reaction: motion_sentry::ReactionKind::RecordingWithAlert,
        ..config(1)
    };
    let audio = MockAudio {
        journal: journal.clone(),
        playing: false,
    };
    let reaction: Box<dyn Reaction> = Box::new(AlertingReaction::new(
        RecordingReaction::new(MockVideo::new(&journal), &cfg),
        audio,
        &cfg,
    ));
    let mut pipeline: MotionPipeline = MotionPipeline::new(cfg, reaction).unwrap();

    let frames = vec![quiet(), block_at(10, 10), block_at(90, 50), block_at(10, 10)];
    let mut source = ScriptedSource::new(frames, &journal);
    pipeline.run(&mut source, &mut never_quit()).unwrap();

    let log = journal.borrow();
    let open = log.iter().position(|e| e.starts_with("video.open")).unwrap();
    let play = log.iter().position(|e| e.starts_with("audio.play")).unwrap();
    let close = log.iter().position(|e| e == "video.close").unwrap();
    let stop = log.iter().position(|e| e == "audio.stop").unwrap();
    assert!(open < play && play < close && close < stop);
    assert_eq!(log[play], "audio.play assets/sounds/siren-fire-alert.wav");
    assert_eq!(entries(&journal, "audio.play"), 1);
    assert_eq!(entries(&journal, "audio.stop"), 1);
}

#[test]
fn read_failure_releases_everything() {
    let journal = Journal::default();
    let cfg = config(1);
    let audio = MockAudio {
        journal: journal.clone(),
        playing: false,
    };
    let reaction = AlertingReaction::new(RecordingReaction::new(MockVideo::new(&journal), &cfg), audio, &cfg);
    let mut pipeline = MotionPipeline::new(cfg, reaction).unwrap();

    let mut source = ScriptedSource::new(vec![quiet(), block_at(10, 10)], &journal).then_fail();
    let err = pipeline.run(&mut source, &mut never_quit()).unwrap_err();

    assert!(matches!(err, MotionError::FrameReadFailure(_)));
    assert_eq!(entries(&journal, "video.close"), 1);
    assert_eq!(entries(&journal, "audio.stop"), 1);
    assert_eq!(journal.borrow().last().map(String::as_str), Some("source.release"));
    assert_eq!(pipeline.reaction().state(), ReactionState::Idle);
}

#[test]
fn unavailable_source_never_starts() {
    let journal = Journal::default();
    let cfg = config(1);
    let reaction = RecordingReaction::new(MockVideo::new(&journal), &cfg);
    let mut pipeline = MotionPipeline::new(cfg, reaction).unwrap();
    let mut source = ScriptedSource {
        refuse_open: true,
        ..ScriptedSource::new(vec![quiet()], &journal)
    };
    let mut monitor = QuitAfter { presented: 0, limit: 1 };

    let err = pipeline.run(&mut source, &mut monitor).unwrap_err();

    assert!(matches!(err, MotionError::SourceUnavailable(_)));
    assert_eq!(monitor.presented, 0);
    assert_eq!(pipeline.summary().ticks, 0);
}

#[test]
fn quit_request_closes_open_recording() {
    let journal = Journal::default();
    let cfg = config(1);
    let reaction = RecordingReaction::new(MockVideo::new(&journal), &cfg);
    let mut pipeline = MotionPipeline::new(cfg, reaction).unwrap();

    let frames = vec![quiet(), block_at(10, 10), block_at(90, 50), quiet(), quiet()];
    let mut source = ScriptedSource::new(frames, &journal);
    let mut monitor = QuitAfter { presented: 0, limit: 2 };

    let summary = pipeline.run(&mut source, &mut monitor).unwrap();

    assert_eq!(summary.stop_reason, Some(StopReason::QuitRequested));
    assert_eq!(summary.ticks, 2);
    assert_eq!(entries(&journal, "video.open"), 1);
    assert_eq!(entries(&journal, "video.close"), 1);
    assert_eq!(journal.borrow().last().map(String::as_str), Some("source.release"));
}

#[test]
fn sink_failures_follow_policy() {
    let frames = || vec![quiet(), block_at(10, 10), block_at(90, 50), block_at(10, 10)];

    let journal = Journal::default();
    let cfg = config(1);
    let video = MockVideo {
        fail_writes: true,
        ..MockVideo::new(&journal)
    };
    let mut tolerant = MotionPipeline::new(cfg.clone(), RecordingReaction::new(video, &cfg)).unwrap();
    let summary = tolerant
        .run(&mut ScriptedSource::new(frames(), &journal), &mut never_quit())
        .unwrap();
    assert_eq!(summary.ticks, 4);
    assert_eq!(summary.sink_failures, 2);
    assert_eq!(summary.activations, 1);
    assert_eq!(entries(&journal, "video.close"), 1);

    let journal = Journal::default();
    let cfg = MotionConfig {
        sink_failure: SinkFailurePolicy::Abort,
        ..config(1)
    };
    let video = MockVideo {
        fail_writes: true,
        ..MockVideo::new(&journal)
    };
    let mut strict = MotionPipeline::new(cfg.clone(), RecordingReaction::new(video, &cfg)).unwrap();
    let err = strict
        .run(&mut ScriptedSource::new(frames(), &journal), &mut never_quit())
        .unwrap_err();
    assert!(matches!(err, MotionError::SinkWrite { .. }));
    assert_eq!(strict.summary().ticks, 2);
    assert_eq!(entries(&journal, "video.close"), 1);
    assert_eq!(journal.borrow().last().map(String::as_str), Some("source.release"));
}

#[test]
fn mismatched_frames_are_skipped() {
    let journal = Journal::default();
    let cfg = config(1);
    let reaction = RecordingReaction::new(MockVideo::new(&journal), &cfg);
    let mut pipeline = MotionPipeline::new(cfg, reaction).unwrap();
    let small = Frame::from_image(RgbImage::new(40, 30)).unwrap();

    let frames = vec![quiet(), small, quiet()];
    let summary = pipeline
        .run(&mut ScriptedSource::new(frames, &journal), &mut never_quit())
        .unwrap();

    assert_eq!(summary.skipped_ticks, 1);
    assert_eq!(summary.ticks, 2);
    assert_eq!(summary.detections, 0);
}

#[test]
fn quit_is_honoured_while_frames_are_undecodable() {
    let journal = Journal::default();
    let cfg = config(1);
    let reaction = RecordingReaction::new(MockVideo::new(&journal), &cfg);
    let mut pipeline = MotionPipeline::new(cfg, reaction).unwrap();
    let mut source = ScriptedSource::new(vec![quiet()], &journal).then_garbled(1000);

    let mut checks = 0;
    let mut monitor = Headless::new(|| {
        checks += 1;
        checks > 3
    });
    let summary = pipeline.run(&mut source, &mut monitor).unwrap();

    assert_eq!(summary.stop_reason, Some(StopReason::QuitRequested));
    assert_eq!(summary.ticks, 1);
    assert_eq!(summary.skipped_ticks, 3);
    assert_eq!(source.steps.len(), 997);
    assert_eq!(journal.borrow().last().map(String::as_str), Some("source.release"));
}

#[test]
fn quit_is_honoured_while_frames_mismatch_the_baseline() {
    let journal = Journal::default();
    let cfg = config(1);
    let reaction = RecordingReaction::new(MockVideo::new(&journal), &cfg);
    let mut pipeline = MotionPipeline::new(cfg, reaction).unwrap();
    let small = || Frame::from_image(RgbImage::new(40, 30)).unwrap();
    let frames = std::iter::once(quiet()).chain((0..50).map(|_| small())).collect();

    // The monitor only overrides `present`; skipped ticks re-present the last good frame.
    let mut monitor = QuitAfter { presented: 0, limit: 3 };
    let summary = pipeline
        .run(&mut ScriptedSource::new(frames, &journal), &mut monitor)
        .unwrap();

    assert_eq!(summary.stop_reason, Some(StopReason::QuitRequested));
    assert_eq!(summary.ticks, 1);
    assert_eq!(summary.skipped_ticks, 2);
    assert_eq!(monitor.presented, 3);
}

#[test]
fn snapshots_land_on_disk_once_per_motion_tick() {
    let dir = tempfile::tempdir().unwrap();
    let journal = Journal::default();
    let cfg = MotionConfig {
        photo_dir: dir.path().join("captured_photos"),
        ..config(1)
    };
    let reaction = SnapshotReaction::new(FsImageSink::new(), &cfg);
    let mut pipeline = MotionPipeline::new(cfg, reaction).unwrap();

    // Each snapshot resets the baseline, so alternating frames keep triggering.
    let frames = vec![quiet(), block_at(10, 10), quiet(), block_at(10, 10)];
    let summary = pipeline
        .run(&mut ScriptedSource::new(frames, &journal), &mut never_quit())
        .unwrap();

    assert_eq!(summary.detections, 3);
    assert_eq!(pipeline.reaction().snapshots_written(), 3);
    let sink = pipeline.reaction().sink();
    assert_eq!(sink.written(), 3);
    let last = sink.last_written().unwrap();
    let name = last.file_name().unwrap().to_str().unwrap();
    let (kind, _) = parse_capture_file_name(name).unwrap();
    assert_eq!(kind, CaptureKind::Photo);
    assert!(last.exists());
}
