// THEORY:
// The `MotionDetector` is a stateless per-tick comparison between the current
// intensity image and the baseline:
// 1.  absolute difference per pixel,
// 2.  binarize against the sensitivity threshold,
// 3.  dilate the mask so fragments of one object merge,
// 4.  extract external contours,
// 5.  drop contours whose area is under the minimum.
// Whatever survives becomes the regions of a `MotionEvent`.

use crate::config::MotionConfig;
use crate::core_modules::contour::find_external_contours;
use crate::core_modules::frame::{BoundingBox, IntensityImage};
use image::GrayImage;

const MASK_SET: u8 = 255;

/// The per-tick detection result.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MotionEvent {
    pub detected: bool,
    /// Surviving regions in discovery order.
    pub regions: Vec<BoundingBox>,
}

impl MotionEvent {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn from_regions(regions: Vec<BoundingBox>) -> Self {
        Self {
            detected: !regions.is_empty(),
            regions,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MotionDetector {
    sensitivity: u8,
    dilation_iterations: u32,
    min_contour_area: f64,
}

impl MotionDetector {
    pub fn new(sensitivity: u8, dilation_iterations: u32, min_contour_area: f64) -> Self {
        Self {
            sensitivity,
            dilation_iterations,
            min_contour_area,
        }
    }

    pub fn from_config(config: &MotionConfig) -> Self {
        Self::new(
            config.sensitivity,
            config.dilation_iterations,
            config.min_contour_area,
        )
    }

    /// Compares `image` against `baseline`.
    ///
    /// # Panics
    ///
    /// Panics if the two images differ in size; the background model guarantees they never do.
    pub fn detect(&self, image: &IntensityImage, baseline: &IntensityImage) -> MotionEvent {
        let mask = self.motion_mask(image, baseline);

        let regions: Vec<BoundingBox> = find_external_contours(&mask)
            .into_iter()
            .filter(|contour| contour.area >= self.min_contour_area)
            .map(|contour| contour.bounding_box)
            .collect();

        MotionEvent::from_regions(regions)
    }

    /// The dilated binary mask of pixels that changed by more than the sensitivity.
    pub fn motion_mask(&self, image: &IntensityImage, baseline: &IntensityImage) -> GrayImage {
        assert_eq!(
            image.dimensions(),
            baseline.dimensions(),
            "intensity image and baseline must share dimensions"
        );
        let delta = absolute_difference(image.as_luma(), baseline.as_luma());
        let binary = threshold(&delta, self.sensitivity);
        dilate(&binary, self.dilation_iterations)
    }
}

pub fn absolute_difference(a: &GrayImage, b: &GrayImage) -> GrayImage {
    let data = a
        .as_raw()
        .iter()
        .zip(b.as_raw())
        .map(|(&x, &y)| x.abs_diff(y))
        .collect();
    GrayImage::from_raw(a.width(), a.height(), data).unwrap_or_else(|| GrayImage::new(a.width(), a.height()))
}

/// Sets every pixel strictly above `level`.
pub fn threshold(delta: &GrayImage, level: u8) -> GrayImage {
    let data = delta
        .as_raw()
        .iter()
        .map(|&d| if d > level { MASK_SET } else { 0 })
        .collect();
    GrayImage::from_raw(delta.width(), delta.height(), data)
        .unwrap_or_else(|| GrayImage::new(delta.width(), delta.height()))
}

/// Grows the set pixels with a 3x3 square element, `iterations` times.
pub fn dilate(mask: &GrayImage, iterations: u32) -> GrayImage {
    let (width, height) = mask.dimensions();
    let (w, h) = (width as usize, height as usize);
    let mut current = mask.as_raw().clone();
    let mut rows = vec![0u8; current.len()];

    for _ in 0..iterations {
        // Separable max: horizontal then vertical.
        for y in 0..h {
            let row = &current[y * w..(y + 1) * w];
            for x in 0..w {
                let lo = x.saturating_sub(1);
                let hi = (x + 1).min(w - 1);
                rows[y * w + x] = row[lo..=hi].iter().copied().max().unwrap_or(0);
            }
        }
        for y in 0..h {
            let lo = y.saturating_sub(1);
            let hi = (y + 1).min(h - 1);
            for x in 0..w {
                current[y * w + x] = (lo..=hi).map(|yy| rows[yy * w + x]).max().unwrap_or(0);
            }
        }
    }

    GrayImage::from_raw(width, height, current).unwrap_or_else(|| GrayImage::new(width, height))
}
