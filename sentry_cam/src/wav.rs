// THEORY:
// The alert asset is a WAV file. `hound` does the container and sample
// decoding; this module normalises whatever it yields into interleaved `f32`
// samples in [-1, 1] and reshapes them for the stream configuration the output
// device prefers.

use hound::{SampleFormat, WavReader};
use motion_sentry::{MotionError, Result};
use std::io::Read;
use std::path::Path;

/// Decoded audio, interleaved by channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Pcm {
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<f32>,
}

impl Pcm {
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    /// Converts to `rate` Hz and `channels` channels.
    ///
    /// Resampling interpolates linearly between neighbouring source frames. A
    /// mono target averages the source channels; otherwise each target channel
    /// copies the matching source channel, reusing the last one when the source
    /// has fewer.
    pub fn convert(&self, rate: u32, channels: u16) -> Vec<f32> {
        let src_channels = self.channels as usize;
        let dst_channels = channels as usize;
        let src_frames = self.frames();
        if src_channels == 0 || dst_channels == 0 || rate == 0 || self.sample_rate == 0 || src_frames == 0 {
            return Vec::new();
        }

        let dst_frames = (src_frames as u64 * rate as u64 / self.sample_rate as u64) as usize;
        let step = self.sample_rate as f64 / rate as f64;
        let sample = |frame: usize, channel: usize| self.samples[frame * src_channels + channel];
        let mut out = Vec::with_capacity(dst_frames * dst_channels);

        for i in 0..dst_frames {
            let position = i as f64 * step;
            let at = (position.floor() as usize).min(src_frames - 1);
            let next = (at + 1).min(src_frames - 1);
            let frac = (position - at as f64).clamp(0.0, 1.0) as f32;
            let lerp = |c: usize| sample(at, c) + (sample(next, c) - sample(at, c)) * frac;

            if dst_channels == 1 {
                out.push((0..src_channels).map(lerp).sum::<f32>() / src_channels as f32);
            } else {
                for c in 0..dst_channels {
                    out.push(lerp(c.min(src_channels - 1)));
                }
            }
        }
        out
    }
}

pub fn read(path: &Path) -> Result<Pcm> {
    let reader = WavReader::open(path)
        .map_err(|e| MotionError::Audio(format!("cannot read {}: {e}", path.display())))?;
    collect(reader)
}

pub fn decode<R: Read>(source: R) -> Result<Pcm> {
    collect(WavReader::new(source).map_err(malformed)?)
}

fn collect<R: Read>(mut reader: WavReader<R>) -> Result<Pcm> {
    let spec = reader.spec();
    if spec.channels == 0 || spec.sample_rate == 0 {
        return Err(MotionError::Audio("malformed wav: zero channels or sample rate".into()));
    }

    let mut samples = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Float, 32) => reader.samples::<f32>().collect::<std::result::Result<Vec<_>, _>>(),
        (SampleFormat::Int, bits @ 8..=32) => {
            let scale = (1u64 << (bits - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|s| s as f32 / scale))
                .collect()
        }
        (format, bits) => {
            return Err(MotionError::Audio(format!(
                "unsupported wav encoding ({format:?}, {bits} bits)"
            )));
        }
    }
    .map_err(malformed)?;

    let whole = samples.len() - samples.len() % spec.channels as usize;
    samples.truncate(whole);

    Ok(Pcm {
        sample_rate: spec.sample_rate,
        channels: spec.channels,
        samples,
    })
}

fn malformed(err: hound::Error) -> MotionError {
    MotionError::Audio(format!("malformed wav: {err}"))
}
