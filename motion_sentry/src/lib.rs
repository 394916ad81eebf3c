// THEORY:
// This file is the entry point for the `motion_sentry` library crate. It exposes
// the `MotionPipeline` driver, its configuration, and the narrow collaborator
// traits (`FrameSource`, `ImageSink`, `VideoSink`, `AudioSink`, `Monitor`)
// that front-ends implement to plug in a camera, encoders, speakers and a
// preview window.
//
// The detection internals live under `core_modules` and stay usable on their
// own, but most consumers only need what is re-exported below.

pub mod config;
pub mod core_modules;
pub mod error;
pub mod pipeline;
pub mod sinks;

pub use config::{FourCc, MotionConfig, ReactionKind, SinkFailurePolicy};
pub use core_modules::alert::{AlertController, AlertingReaction};
pub use core_modules::frame::{BoundingBox, Frame, IntensityImage};
pub use core_modules::motion_detector::MotionEvent;
pub use core_modules::reaction::{Reaction, ReactionState, Transition};
pub use core_modules::recording::RecordingReaction;
pub use core_modules::snapshot::SnapshotReaction;
pub use error::{MotionError, Result};
pub use pipeline::{MotionPipeline, RunSummary, StopReason, TickReport};
pub use sinks::{AudioSink, FrameSource, FsImageSink, Headless, ImageSink, Monitor, VideoSink};
