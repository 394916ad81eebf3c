// THEORY:
// The `frame` module holds the "dumb" data containers that flow through a tick:
// the raw camera `Frame`, its smoothed single-channel `IntensityImage`, and the
// `BoundingBox` regions a detection reports. None of them know how to compare
// themselves to anything; the analysis lives in the preprocessor and detector.

use crate::error::{MotionError, Result};
use image::{GrayImage, RgbImage};

const RGB_CHANNELS: usize = 3;

/// One raw camera image, 3 channels in RGB order.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    image: RgbImage,
}

impl Frame {
    /// Wraps a packed RGB buffer, rejecting empty or truncated data.
    pub fn from_rgb(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        check_dimensions(width, height)?;
        let expected = width as usize * height as usize * RGB_CHANNELS;
        if data.len() != expected {
            return Err(MotionError::InvalidFrame(format!(
                "{width}x{height} frame needs {expected} bytes, got {}",
                data.len()
            )));
        }
        RgbImage::from_raw(width, height, data)
            .map(|image| Self { image })
            .ok_or_else(|| MotionError::InvalidFrame("buffer does not fit frame".into()))
    }

    pub fn from_image(image: RgbImage) -> Result<Self> {
        check_dimensions(image.width(), image.height())?;
        Ok(Self { image })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn as_image(&self) -> &RgbImage {
        &self.image
    }

    pub fn as_image_mut(&mut self) -> &mut RgbImage {
        &mut self.image
    }

    /// The packed RGB bytes, row-major.
    pub fn as_raw(&self) -> &[u8] {
        self.image.as_raw()
    }

    pub fn into_image(self) -> RgbImage {
        self.image
    }
}

/// A smoothed single-channel derivative of a `Frame`, 8 bits per sample.
#[derive(Debug, Clone, PartialEq)]
pub struct IntensityImage {
    samples: GrayImage,
}

impl IntensityImage {
    pub fn from_luma(samples: GrayImage) -> Result<Self> {
        check_dimensions(samples.width(), samples.height())?;
        Ok(Self { samples })
    }

    /// An image with every sample set to `value`.
    pub fn uniform(width: u32, height: u32, value: u8) -> Result<Self> {
        Self::from_luma(GrayImage::from_pixel(width, height, image::Luma([value])))
    }

    pub fn width(&self) -> u32 {
        self.samples.width()
    }

    pub fn height(&self) -> u32 {
        self.samples.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.samples.dimensions()
    }

    pub fn sample(&self, x: u32, y: u32) -> u8 {
        self.samples.get_pixel(x, y).0[0]
    }

    pub fn as_luma(&self) -> &GrayImage {
        &self.samples
    }

    pub fn as_luma_mut(&mut self) -> &mut GrayImage {
        &mut self.samples
    }

    pub fn as_raw(&self) -> &[u8] {
        self.samples.as_raw()
    }
}

/// An axis-aligned region of interest in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Builds the box spanning two inclusive corner points.
    pub fn from_corners(min_x: u32, min_y: u32, max_x: u32, max_y: u32) -> Self {
        Self {
            x: min_x,
            y: min_y,
            width: max_x - min_x + 1,
            height: max_y - min_y + 1,
        }
    }

    /// One past the last column covered by the box.
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    /// One past the last row covered by the box.
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    /// Whether `other` lies entirely inside this box.
    pub fn encloses(&self, other: &BoundingBox) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }
}

fn check_dimensions(width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(MotionError::InvalidFrame(format!(
            "zero-sized image {width}x{height}"
        )));
    }
    Ok(())
}
