// THEORY:
// The `pipeline` module is the top-level API of the capture engine. It wires the
// per-tick stages together and owns the driver loop around them.
//
// One tick is strictly sequential:
// 1.  Preprocess the raw frame into a smoothed intensity image.
// 2.  Feed it to the background model. While warming, the image simply becomes
//     the baseline and the tick ends there.
// 3.  Otherwise run the detector against the baseline and draw the surviving
//     regions onto the frame.
// 4.  Hand the event and the annotated frame to the reaction. If the reaction
//     just entered Active, the current image becomes the new baseline.
//
// `run` repeats ticks until the source ends, the monitor asks to quit or a
// fatal error occurs. The monitor is asked about quitting once per tick, even
// when the tick is skipped for an invalid frame. Whatever happens, the reaction is shut down and the source
// released before `run` returns, so no recording or alert outlives the loop.

use crate::config::{MotionConfig, SinkFailurePolicy};
use crate::core_modules::annotate::draw_regions;
use crate::core_modules::background_model::{BackgroundModel, BackgroundPhase, Observation};
use crate::core_modules::frame::Frame;
use crate::core_modules::motion_detector::{MotionDetector, MotionEvent};
use crate::core_modules::preprocessor::Preprocessor;
use crate::core_modules::reaction::{Reaction, ReactionState, Transition};
use crate::error::{MotionError, Result};
use crate::sinks::{FrameSource, Monitor};

/// What happened during a single tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    /// Zero-based index of the tick since the pipeline was created.
    pub index: u64,
    /// Phase of the background model *before* this tick's image was observed.
    pub phase: BackgroundPhase,
    /// Detection result. Always empty while warming.
    pub event: MotionEvent,
    pub transition: Transition,
    /// Reaction state after the tick.
    pub state: ReactionState,
    pub baseline_reset: bool,
}

impl TickReport {
    pub fn detected(&self) -> bool {
        self.event.detected
    }
}

/// Why `run` stopped without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    EndOfStream,
    QuitRequested,
}

/// Counters for one pipeline's lifetime.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    /// Ticks that completed, including warming ticks.
    pub ticks: u64,
    pub warming_ticks: u64,
    /// Ticks whose event reported motion.
    pub detections: u64,
    /// Ticks on which the reaction entered Active.
    pub activations: u64,
    /// Ticks dropped because of an invalid frame.
    pub skipped_ticks: u64,
    /// Sink failures tolerated under `SinkFailurePolicy::LogAndContinue`.
    pub sink_failures: u64,
    pub stop_reason: Option<StopReason>,
}

/// The motion capture engine.
pub struct MotionPipeline<R: Reaction = Box<dyn Reaction>> {
    config: MotionConfig,
    preprocessor: Preprocessor,
    background: BackgroundModel,
    detector: MotionDetector,
    reaction: R,
    tick_index: u64,
    summary: RunSummary,
}

impl<R: Reaction> MotionPipeline<R> {
    pub fn new(config: MotionConfig, reaction: R) -> Result<Self> {
        config.validate()?;
        let preprocessor = Preprocessor::new(config.blur_kernel)?;
        Ok(Self {
            background: BackgroundModel::new(config.stabilization_ticks),
            detector: MotionDetector::from_config(&config),
            preprocessor,
            reaction,
            config,
            tick_index: 0,
            summary: RunSummary::default(),
        })
    }

    pub fn config(&self) -> &MotionConfig {
        &self.config
    }

    pub fn reaction(&self) -> &R {
        &self.reaction
    }

    pub fn reaction_mut(&mut self) -> &mut R {
        &mut self.reaction
    }

    pub fn background(&self) -> &BackgroundModel {
        &self.background
    }

    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    /// Runs one pass of the pipeline over `frame`, annotating it in place.
    ///
    /// Returns `MotionError::InvalidFrame` without touching any state when the
    /// frame cannot be compared against the baseline. Reaction errors are
    /// returned after the baseline has been reset for any Idle -> Active edge
    /// the reaction did take.
    pub fn tick(&mut self, frame: &mut Frame) -> Result<TickReport> {
        // --- 1. Preprocess ---
        let image = self.preprocessor.process(frame)?;
        if let Some(baseline) = self.background.baseline() {
            if self.background.is_stable() && baseline.dimensions() != image.dimensions() {
                return Err(MotionError::InvalidFrame(format!(
                    "frame is {}x{} but the baseline is {}x{}",
                    image.width(),
                    image.height(),
                    baseline.width(),
                    baseline.height()
                )));
            }
        }

        let index = self.tick_index;
        self.tick_index += 1;
        self.summary.ticks += 1;
        let phase = self.background.phase();

        // --- 2. Background ---
        if self.background.observe(&image) == Observation::Absorbed {
            if matches!(phase, BackgroundPhase::Warming { .. }) {
                self.summary.warming_ticks += 1;
            }
            log::debug!("tick {index}: baseline absorbed ({phase:?})");
            return Ok(TickReport {
                index,
                phase,
                event: MotionEvent::none(),
                transition: Transition::Unchanged,
                state: self.reaction.state(),
                baseline_reset: false,
            });
        }

        // --- 3. Detect & annotate ---
        let event = match self.background.baseline() {
            Some(baseline) => self.detector.detect(&image, baseline),
            None => MotionEvent::none(),
        };
        if event.detected {
            self.summary.detections += 1;
            draw_regions(frame, &event.regions);
        }

        // --- 4. React ---
        let before = self.reaction.state();
        let outcome = self.reaction.on_event(&event, frame);
        let entered_active = match &outcome {
            Ok(transition) => transition.entered_active(),
            Err(_) => before == ReactionState::Idle && self.reaction.state() == ReactionState::Active,
        };
        if entered_active {
            self.summary.activations += 1;
            self.background.reset(image);
        }
        let transition = outcome?;

        log::debug!(
            "tick {index}: {} region(s), {transition:?}, reaction {:?}",
            event.regions.len(),
            self.reaction.state()
        );
        Ok(TickReport {
            index,
            phase,
            event,
            transition,
            state: self.reaction.state(),
            baseline_reset: entered_active,
        })
    }

    /// Drives the pipeline from `source` until it ends, `monitor` requests a quit,
    /// or a fatal error occurs.
    ///
    /// The reaction is shut down and the source released on every path out of the
    /// loop, including errors.
    pub fn run<S, M>(&mut self, source: &mut S, monitor: &mut M) -> Result<RunSummary>
    where
        S: FrameSource + ?Sized,
        M: Monitor + ?Sized,
    {
        source.open()?;
        log::info!("Frame source opened. Press 'q' to quit.");

        let outcome = self.drive(source, monitor);
        let shutdown = self.reaction.shutdown();
        source.release();
        log::info!("Exiting.");

        let stop_reason = match outcome {
            Ok(reason) => reason,
            Err(e) => {
                if let Err(shutdown_error) = shutdown {
                    log::warn!("Shutdown after failure also failed: {shutdown_error}");
                }
                return Err(e);
            }
        };
        if let Err(e) = shutdown {
            self.sink_failure(e)?;
        }
        self.summary.stop_reason = Some(stop_reason);
        Ok(self.summary.clone())
    }

    fn drive<S, M>(&mut self, source: &mut S, monitor: &mut M) -> Result<StopReason>
    where
        S: FrameSource + ?Sized,
        M: Monitor + ?Sized,
    {
        let mut shown: Option<Frame> = None;
        loop {
            let mut frame = match source.read() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    log::info!("Frame source exhausted.");
                    return Ok(StopReason::EndOfStream);
                }
                Err(MotionError::InvalidFrame(reason)) => {
                    if self.skip_tick(&reason, monitor, shown.as_ref())? {
                        return Ok(StopReason::QuitRequested);
                    }
                    continue;
                }
                Err(e) => return Err(e),
            };

            match self.tick(&mut frame) {
                Ok(_) => {}
                Err(MotionError::InvalidFrame(reason)) => {
                    if self.skip_tick(&reason, monitor, shown.as_ref())? {
                        return Ok(StopReason::QuitRequested);
                    }
                    continue;
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => self.sink_failure(e)?,
            }

            if monitor.present(&frame)? {
                log::info!("Quit requested.");
                return Ok(StopReason::QuitRequested);
            }
            shown = Some(frame);
        }
    }

    /// Counts a dropped tick and still gives the monitor its once-per-tick quit check.
    fn skip_tick<M>(&mut self, reason: &str, monitor: &mut M, shown: Option<&Frame>) -> Result<bool>
    where
        M: Monitor + ?Sized,
    {
        self.summary.skipped_ticks += 1;
        log::warn!("Skipping tick: invalid frame: {reason}");
        let quit = monitor.poll_quit(shown)?;
        if quit {
            log::info!("Quit requested.");
        }
        Ok(quit)
    }

    /// Applies the configured policy to a non-fatal sink error.
    fn sink_failure(&mut self, error: MotionError) -> Result<()> {
        match self.config.sink_failure {
            SinkFailurePolicy::LogAndContinue => {
                self.summary.sink_failures += 1;
                log::warn!("{error}; continuing");
                Ok(())
            }
            SinkFailurePolicy::Abort => Err(error),
        }
    }
}
