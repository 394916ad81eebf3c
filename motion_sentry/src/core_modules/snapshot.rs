use crate::config::{MotionConfig, ReactionKind};
use crate::core_modules::frame::Frame;
use crate::core_modules::motion_detector::MotionEvent;
use crate::core_modules::naming::{capture_path, local_now, CaptureKind, Clock};
use crate::core_modules::reaction::{Reaction, ReactionState, Transition};
use crate::error::Result;
use crate::sinks::ImageSink;
use std::path::PathBuf;

/// Writes one annotated still for every tick that reports motion.
///
/// There is no session and no cooldown: a sustained motion episode produces one
/// image per tick. Stills taken within the same second share a file name, so the
/// last one wins.
pub struct SnapshotReaction<I: ImageSink> {
    sink: I,
    dir: PathBuf,
    extension: String,
    clock: Clock,
    snapshots_written: u64,
}

impl<I: ImageSink> SnapshotReaction<I> {
    pub fn new(sink: I, config: &MotionConfig) -> Self {
        Self {
            sink,
            dir: config.photo_dir.clone(),
            extension: config.photo_extension.clone(),
            clock: local_now,
            snapshots_written: 0,
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn sink(&self) -> &I {
        &self.sink
    }

    pub fn snapshots_written(&self) -> u64 {
        self.snapshots_written
    }
}

impl<I: ImageSink> Reaction for SnapshotReaction<I> {
    fn kind(&self) -> ReactionKind {
        ReactionKind::Snapshot
    }

    fn state(&self) -> ReactionState {
        ReactionState::Idle
    }

    fn on_event(&mut self, event: &MotionEvent, frame: &Frame) -> Result<Transition> {
        if !event.detected {
            return Ok(Transition::Unchanged);
        }

        let path = capture_path(&self.dir, CaptureKind::Photo, (self.clock)(), &self.extension);
        self.sink.write(frame, &path)?;
        self.snapshots_written += 1;
        log::info!("Photo captured: {}", path.display());
        Ok(Transition::Pulsed)
    }

    fn shutdown(&mut self) -> Result<()> {
        Ok(())
    }
}
