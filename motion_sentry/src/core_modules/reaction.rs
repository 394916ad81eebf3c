// THEORY:
// A `Reaction` is the pluggable strategy that turns per-tick `MotionEvent`s into
// side effects: stills, video files, alert sounds. Every reaction is an
// Idle/Active state machine (the snapshot reaction passes through Active within
// a single tick). The pipeline only cares about the edge the reaction reports,
// because entering Active is what resets the background baseline.

use crate::config::ReactionKind;
use crate::core_modules::frame::Frame;
use crate::core_modules::motion_detector::MotionEvent;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionState {
    Idle,
    Active,
}

/// The state edge a reaction took while handling one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// No state change.
    Unchanged,
    /// Idle -> Active.
    Activated,
    /// Active -> Idle.
    Deactivated,
    /// Idle -> Active -> Idle within the same tick.
    Pulsed,
}

impl Transition {
    /// Whether the tick entered Active, which resets the background baseline.
    pub fn entered_active(self) -> bool {
        matches!(self, Self::Activated | Self::Pulsed)
    }
}

pub trait Reaction {
    fn kind(&self) -> ReactionKind;

    fn state(&self) -> ReactionState;

    /// Handles one tick's event. `frame` is already annotated with the event's regions.
    ///
    /// On error the reaction is left in whatever state it reached; callers compare
    /// `state()` before and after to learn about partial transitions.
    fn on_event(&mut self, event: &MotionEvent, frame: &Frame) -> Result<Transition>;

    /// Releases every resource the reaction holds. Safe to call more than once.
    fn shutdown(&mut self) -> Result<()>;
}

impl<R: Reaction + ?Sized> Reaction for Box<R> {
    fn kind(&self) -> ReactionKind {
        (**self).kind()
    }

    fn state(&self) -> ReactionState {
        (**self).state()
    }

    fn on_event(&mut self, event: &MotionEvent, frame: &Frame) -> Result<Transition> {
        (**self).on_event(event, frame)
    }

    fn shutdown(&mut self) -> Result<()> {
        (**self).shutdown()
    }
}
