// THEORY:
// The `Preprocessor` turns a raw frame into the smoothed intensity image every
// later stage compares against. Two steps, both stateless:
// 1.  **Intensity**: Rec.601 luma in 14-bit fixed point, the same weights and
//     rounding a BGR->GRAY conversion uses.
// 2.  **Smoothing**: a separable Gaussian blur with a wide fixed span (21 by
//     default). Sensor noise and small lighting flicker spread out below the
//     sensitivity threshold instead of showing up as motion.
//
// The Gaussian taps are computed once in the constructor and reused per frame.

use crate::core_modules::frame::{Frame, IntensityImage};
use crate::error::{MotionError, Result};
use image::GrayImage;

const LUMA_SHIFT: u32 = 14;
const LUMA_RED: u32 = 4899;
const LUMA_GREEN: u32 = 9617;
const LUMA_BLUE: u32 = 1868;

/// Converts frames to blurred single-channel intensity images.
#[derive(Debug, Clone)]
pub struct Preprocessor {
    span: u32,
    taps: Vec<f32>,
}

impl Preprocessor {
    /// Creates a preprocessor with a `span`x`span` Gaussian kernel. `span` must be odd.
    pub fn new(span: u32) -> Result<Self> {
        if span == 0 || span % 2 == 0 {
            return Err(MotionError::Config(format!(
                "blur kernel span must be odd and positive, got {span}"
            )));
        }
        Ok(Self {
            span,
            taps: gaussian_taps(span),
        })
    }

    pub fn span(&self) -> u32 {
        self.span
    }

    pub fn taps(&self) -> &[f32] {
        &self.taps
    }

    /// Produces the intensity image for `frame`.
    pub fn process(&self, frame: &Frame) -> Result<IntensityImage> {
        let gray = to_intensity(frame);
        IntensityImage::from_luma(self.blur(&gray))
    }

    fn blur(&self, gray: &GrayImage) -> GrayImage {
        if self.span == 1 {
            return gray.clone();
        }

        let (width, height) = gray.dimensions();
        let (w, h) = (width as usize, height as usize);
        let radius = (self.span / 2) as i64;
        let src = gray.as_raw();

        // --- Horizontal pass ---
        let mut horizontal = vec![0f32; w * h];
        for y in 0..h {
            let row = &src[y * w..(y + 1) * w];
            for x in 0..w {
                let mut acc = 0f32;
                for (k, tap) in self.taps.iter().enumerate() {
                    let sx = reflect_101(x as i64 + k as i64 - radius, w as i64);
                    acc += tap * row[sx] as f32;
                }
                horizontal[y * w + x] = acc;
            }
        }

        // --- Vertical pass ---
        let mut out = vec![0u8; w * h];
        for y in 0..h {
            for x in 0..w {
                let mut acc = 0f32;
                for (k, tap) in self.taps.iter().enumerate() {
                    let sy = reflect_101(y as i64 + k as i64 - radius, h as i64);
                    acc += tap * horizontal[sy * w + x];
                }
                out[y * w + x] = acc.round().clamp(0.0, 255.0) as u8;
            }
        }

        GrayImage::from_raw(width, height, out).unwrap_or_else(|| GrayImage::new(width, height))
    }
}

/// Weighted single-channel intensity of every pixel in `frame`.
pub fn to_intensity(frame: &Frame) -> GrayImage {
    let (width, height) = frame.dimensions();
    let data: Vec<u8> = frame
        .as_raw()
        .chunks_exact(3)
        .map(|rgb| {
            let weighted = rgb[0] as u32 * LUMA_RED
                + rgb[1] as u32 * LUMA_GREEN
                + rgb[2] as u32 * LUMA_BLUE
                + (1 << (LUMA_SHIFT - 1));
            (weighted >> LUMA_SHIFT).min(255) as u8
        })
        .collect();
    GrayImage::from_raw(width, height, data).unwrap_or_else(|| GrayImage::new(width, height))
}

/// Standard deviation used for a kernel of `span` taps when none is given.
pub fn sigma_for_span(span: u32) -> f32 {
    0.3 * ((span as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

fn gaussian_taps(span: u32) -> Vec<f32> {
    let sigma = sigma_for_span(span);
    let center = (span as f32 - 1.0) / 2.0;
    let denom = 2.0 * sigma * sigma;
    let raw: Vec<f32> = (0..span)
        .map(|i| {
            let d = i as f32 - center;
            (-(d * d) / denom).exp()
        })
        .collect();
    let sum: f32 = raw.iter().sum();
    raw.into_iter().map(|v| v / sum).collect()
}

/// Mirrors an out-of-range index back into `0..len` without repeating the edge sample.
fn reflect_101(mut index: i64, len: i64) -> usize {
    if len == 1 {
        return 0;
    }
    loop {
        if index < 0 {
            index = -index;
        } else if index >= len {
            index = 2 * (len - 1) - index;
        } else {
            return index as usize;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn solid(width: u32, height: u32, rgb: [u8; 3]) -> Frame {
        Frame::from_image(RgbImage::from_pixel(width, height, Rgb(rgb))).unwrap()
    }

    #[test]
    fn rejects_even_or_zero_spans() {
        assert!(Preprocessor::new(0).is_err());
        assert!(Preprocessor::new(20).is_err());
        assert!(Preprocessor::new(21).is_ok());
    }

    #[test]
    fn default_span_uses_sigma_three_and_a_half() {
        assert!((sigma_for_span(21) - 3.5).abs() < 1e-6);

        let pre = Preprocessor::new(21).unwrap();
        let taps = pre.taps();
        assert_eq!(taps.len(), 21);
        assert!((taps.iter().sum::<f32>() - 1.0).abs() < 1e-5);
        for i in 0..10 {
            assert!((taps[i] - taps[20 - i]).abs() < 1e-7);
            assert!(taps[i] < taps[i + 1]);
        }
    }

    #[test]
    fn luma_weights_match_rec601() {
        let px = |rgb| to_intensity(&solid(1, 1, rgb)).get_pixel(0, 0).0[0];
        assert_eq!(px([255, 0, 0]), 76);
        assert_eq!(px([0, 255, 0]), 150);
        assert_eq!(px([0, 0, 255]), 29);
        assert_eq!(px([255, 255, 255]), 255);
        assert_eq!(px([0, 0, 0]), 0);
    }

    #[test]
    fn uniform_frames_stay_uniform() {
        let pre = Preprocessor::new(21).unwrap();
        let out = pre.process(&solid(40, 30, [90, 90, 90])).unwrap();
        assert_eq!(out.dimensions(), (40, 30));
        assert!(out.as_raw().iter().all(|&v| v == 90));
    }

    #[test]
    fn blur_softens_edges_but_not_flat_regions() {
        let mut img = RgbImage::from_pixel(80, 20, Rgb([0, 0, 0]));
        for y in 0..20 {
            for x in 40..80 {
                img.put_pixel(x, y, Rgb([200, 200, 200]));
            }
        }
        let pre = Preprocessor::new(21).unwrap();
        let out = pre.process(&Frame::from_image(img).unwrap()).unwrap();

        assert_eq!(out.sample(5, 10), 0);
        assert_eq!(out.sample(75, 10), 200);
        let edge = out.sample(40, 10);
        assert!(edge > 0 && edge < 200, "edge sample {edge} was not smoothed");
    }

    #[test]
    fn handles_images_smaller_than_the_kernel() {
        let pre = Preprocessor::new(21).unwrap();
        let out = pre.process(&solid(3, 2, [10, 20, 30])).unwrap();
        assert_eq!(out.dimensions(), (3, 2));
        assert_eq!(reflect_101(-3, 1), 0);
        assert_eq!(reflect_101(-1, 4), 1);
        assert_eq!(reflect_101(4, 4), 2);
        assert_eq!(reflect_101(9, 3), 1);
    }
}
