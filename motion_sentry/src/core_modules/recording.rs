// THEORY:
// The `RecordingReaction` keeps at most one video file open, in lockstep with
// detected motion:
// - Idle + motion     -> open a session sized to the frame, write the frame.
// - Active + motion   -> write the frame.
// - Active + no motion -> flush and close the session. One quiet tick is enough;
//   there is no hysteresis, so flickering detections give many short files.
// - Idle + no motion  -> nothing.
// The reaction is Active exactly when a session exists, so the state is derived
// from `session` rather than stored next to it.

use crate::config::{FourCc, MotionConfig, ReactionKind};
use crate::core_modules::frame::Frame;
use crate::core_modules::motion_detector::MotionEvent;
use crate::core_modules::naming::{capture_path, local_now, CaptureKind, Clock};
use crate::core_modules::reaction::{Reaction, ReactionState, Transition};
use crate::error::Result;
use crate::sinks::VideoSink;
use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};

/// An open recording.
pub struct RecordingSession<H> {
    path: PathBuf,
    started_at: NaiveDateTime,
    frames_written: u64,
    handle: H,
}

impl<H> RecordingSession<H> {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn started_at(&self) -> NaiveDateTime {
        self.started_at
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }
}

pub struct RecordingReaction<V: VideoSink> {
    sink: V,
    session: Option<RecordingSession<V::Handle>>,
    dir: PathBuf,
    extension: String,
    fps: f64,
    codec: FourCc,
    clock: Clock,
    sessions_opened: u64,
}

impl<V: VideoSink> RecordingReaction<V> {
    pub fn new(sink: V, config: &MotionConfig) -> Self {
        Self {
            sink,
            session: None,
            dir: config.video_dir.clone(),
            extension: config.video_extension.clone(),
            fps: config.recording_fps,
            codec: config.codec,
            clock: local_now,
            sessions_opened: 0,
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn session(&self) -> Option<&RecordingSession<V::Handle>> {
        self.session.as_ref()
    }

    pub fn sink(&self) -> &V {
        &self.sink
    }

    pub fn sessions_opened(&self) -> u64 {
        self.sessions_opened
    }

    fn open_session(&mut self, frame: &Frame) -> Result<()> {
        let started_at = (self.clock)();
        let path = capture_path(&self.dir, CaptureKind::Video, started_at, &self.extension);
        let handle = self.sink.open(&path, frame.width(), frame.height(), self.fps, self.codec)?;
        log::info!("Recording started: {}", path.display());
        self.sessions_opened += 1;
        self.session = Some(RecordingSession {
            path,
            started_at,
            frames_written: 0,
            handle,
        });
        Ok(())
    }

    fn write(&mut self, frame: &Frame) -> Result<()> {
        if let Some(session) = self.session.as_mut() {
            self.sink.write_frame(&mut session.handle, frame)?;
            session.frames_written += 1;
        }
        Ok(())
    }

    fn close_session(&mut self) -> Result<()> {
        let Some(session) = self.session.take() else {
            return Ok(());
        };
        log::info!(
            "Recording stopped: {} ({} frames)",
            session.path.display(),
            session.frames_written
        );
        self.sink.close(session.handle)
    }
}

impl<V: VideoSink> Reaction for RecordingReaction<V> {
    fn kind(&self) -> ReactionKind {
        ReactionKind::Recording
    }

    fn state(&self) -> ReactionState {
        if self.session.is_some() {
            ReactionState::Active
        } else {
            ReactionState::Idle
        }
    }

    fn on_event(&mut self, event: &MotionEvent, frame: &Frame) -> Result<Transition> {
        match (self.state(), event.detected) {
            (ReactionState::Idle, true) => {
                self.open_session(frame)?;
                self.write(frame)?;
                Ok(Transition::Activated)
            }
            (ReactionState::Active, true) => {
                self.write(frame)?;
                Ok(Transition::Unchanged)
            }
            (ReactionState::Active, false) => {
                self.close_session()?;
                Ok(Transition::Deactivated)
            }
            (ReactionState::Idle, false) => Ok(Transition::Unchanged),
        }
    }

    fn shutdown(&mut self) -> Result<()> {
        self.close_session()
    }
}

impl<V: VideoSink> Drop for RecordingReaction<V> {
    fn drop(&mut self) {
        // Best effort close if the owner never called `shutdown`.
        if let Err(e) = self.close_session() {
            log::warn!("Failed to close recording on drop: {e}");
        }
    }
}
