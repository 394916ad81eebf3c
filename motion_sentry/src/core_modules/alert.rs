// THEORY:
// The alert is a looping sound that plays for as long as a recording is open.
// Two pieces cooperate here:
// - `AlertController` owns the audio sink and makes start/stop idempotent. Audio
//   trouble is logged and swallowed: a missing speaker must never stop the
//   camera from recording.
// - `AlertingReaction` decorates any other reaction (in practice the recording
//   reaction) and follows its Idle/Active edges. Edges are read from the inner
//   state before and after each event, so a recording that opened but then failed
//   its first write still gets its alert.

use crate::config::{MotionConfig, ReactionKind};
use crate::core_modules::frame::Frame;
use crate::core_modules::motion_detector::MotionEvent;
use crate::core_modules::reaction::{Reaction, ReactionState, Transition};
use crate::error::Result;
use crate::sinks::AudioSink;
use std::path::{Path, PathBuf};

/// Starts and stops the looped alert sound.
pub struct AlertController<A: AudioSink> {
    sink: A,
    asset: PathBuf,
    /// Our own view of playback, independent of what the device reports.
    playing: bool,
}

impl<A: AudioSink> AlertController<A> {
    pub fn new(sink: A, asset: impl Into<PathBuf>) -> Self {
        Self {
            sink,
            asset: asset.into(),
            playing: false,
        }
    }

    pub fn asset(&self) -> &Path {
        &self.asset
    }

    pub fn sink(&self) -> &A {
        &self.sink
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Starts the loop unless it is already running.
    pub fn start(&mut self) {
        if self.playing {
            return;
        }
        match self.sink.play_looped(&self.asset) {
            Ok(()) => {
                log::info!("Alert sound started.");
                self.playing = true;
            }
            Err(e) => log::warn!("Could not play sound: {e}"),
        }
    }

    /// Stops the loop if it is running.
    pub fn stop(&mut self) {
        if !self.playing {
            return;
        }
        self.playing = false;
        match self.sink.stop() {
            Ok(()) => log::info!("Alert sound stopped."),
            Err(e) => log::warn!("Could not stop sound: {e}"),
        }
    }
}

impl<A: AudioSink> Drop for AlertController<A> {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Wraps a reaction and keeps the alert sound playing while it is Active.
pub struct AlertingReaction<R: Reaction, A: AudioSink> {
    inner: R,
    alert: AlertController<A>,
}

impl<R: Reaction, A: AudioSink> AlertingReaction<R, A> {
    pub fn new(inner: R, audio: A, config: &MotionConfig) -> Self {
        Self {
            inner,
            alert: AlertController::new(audio, config.alert_sound.clone()),
        }
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    pub fn alert(&self) -> &AlertController<A> {
        &self.alert
    }

    fn follow(&mut self, before: ReactionState) {
        match (before, self.inner.state()) {
            (ReactionState::Idle, ReactionState::Active) => self.alert.start(),
            (ReactionState::Active, ReactionState::Idle) => self.alert.stop(),
            _ => {}
        }
    }
}

impl<R: Reaction, A: AudioSink> Reaction for AlertingReaction<R, A> {
    fn kind(&self) -> ReactionKind {
        ReactionKind::RecordingWithAlert
    }

    fn state(&self) -> ReactionState {
        self.inner.state()
    }

    fn on_event(&mut self, event: &MotionEvent, frame: &Frame) -> Result<Transition> {
        let before = self.inner.state();
        let outcome = self.inner.on_event(event, frame);
        self.follow(before);
        outcome
    }

    fn shutdown(&mut self) -> Result<()> {
        let outcome = self.inner.shutdown();
        self.alert.stop();
        outcome
    }
}
