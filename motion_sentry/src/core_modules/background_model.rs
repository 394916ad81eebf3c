// THEORY:
// The `BackgroundModel` owns the baseline every detection is measured against.
// It lives in one of two phases:
// - `Warming`: a fixed calibration window. Each incoming image replaces the
//   baseline outright and no detection is attempted.
// - `Stable`: entered once the window has been consumed and never left. The
//   baseline only changes when the reaction layer reports that it just went
//   Idle -> Active; the object that triggered the reset becomes background.

use crate::core_modules::frame::IntensityImage;

/// Phase of the background model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackgroundPhase {
    /// Still calibrating; `remaining` more ticks will replace the baseline.
    Warming { remaining: u32 },
    Stable,
}

/// What the model did with the image handed to `observe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// The image became the baseline; the tick must not run detection.
    Absorbed,
    /// The model is stable; the image should be compared against the baseline.
    Compare,
}

pub struct BackgroundModel {
    window: u32,
    ticks_observed: u64,
    baseline: Option<IntensityImage>,
}

impl BackgroundModel {
    pub fn new(window: u32) -> Self {
        Self {
            window,
            ticks_observed: 0,
            baseline: None,
        }
    }

    pub fn phase(&self) -> BackgroundPhase {
        if self.ticks_observed < self.window as u64 {
            BackgroundPhase::Warming {
                remaining: self.window - self.ticks_observed as u32,
            }
        } else {
            BackgroundPhase::Stable
        }
    }

    pub fn is_stable(&self) -> bool {
        self.phase() == BackgroundPhase::Stable
    }

    /// Feeds one tick's image to the model.
    ///
    /// While warming the image replaces the baseline and `Observation::Absorbed` is returned.
    /// A stable model without a baseline (an empty window) adopts the first image the same way.
    pub fn observe(&mut self, image: &IntensityImage) -> Observation {
        let warming = !self.is_stable();
        self.ticks_observed += 1;

        if warming || self.baseline.is_none() {
            self.baseline = Some(image.clone());
            return Observation::Absorbed;
        }
        Observation::Compare
    }

    /// The current reference image, if one has been captured.
    pub fn baseline(&self) -> Option<&IntensityImage> {
        self.baseline.as_ref()
    }

    /// Replaces the baseline after a motion-triggered transition.
    pub fn reset(&mut self, image: IntensityImage) {
        log::debug!("baseline reset at tick {}", self.ticks_observed);
        self.baseline = Some(image);
    }

    pub fn ticks_observed(&self) -> u64 {
        self.ticks_observed
    }
}
