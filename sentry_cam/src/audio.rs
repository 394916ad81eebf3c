use crate::wav;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, SizedSample, Stream, StreamConfig};
use motion_sentry::{AudioSink, MotionError, Result};
use std::fmt::Display;
use std::path::Path;

/// Loops a WAV file on the default output device.
///
/// Holding the `Stream` keeps the sound playing; dropping it stops playback.
#[derive(Default)]
pub struct CpalAudioSink {
    stream: Option<Stream>,
}

impl CpalAudioSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AudioSink for CpalAudioSink {
    fn play_looped(&mut self, asset: &Path) -> Result<()> {
        let pcm = wav::read(asset)?;

        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| MotionError::Audio("no default output device".into()))?;
        let supported = device.default_output_config().map_err(audio)?;
        let config: StreamConfig = supported.config();
        let samples = pcm.convert(config.sample_rate.0, config.channels);
        log::debug!(
            "looping {} ({} samples at {} Hz, {} channels, {:?})",
            asset.display(),
            samples.len(),
            config.sample_rate.0,
            config.channels,
            supported.sample_format()
        );

        let stream = match supported.sample_format() {
            SampleFormat::F32 => build_loop::<f32>(&device, &config, samples),
            SampleFormat::I16 => build_loop::<i16>(&device, &config, samples),
            SampleFormat::U16 => build_loop::<u16>(&device, &config, samples),
            SampleFormat::I32 => build_loop::<i32>(&device, &config, samples),
            other => Err(MotionError::Audio(format!("unsupported output sample format {other:?}"))),
        }?;
        stream.play().map_err(audio)?;
        self.stream = Some(stream);
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        match self.stream.take() {
            Some(stream) => stream.pause().map_err(audio),
            None => Ok(()),
        }
    }

    fn is_playing(&self) -> bool {
        self.stream.is_some()
    }
}

fn build_loop<T>(device: &cpal::Device, config: &StreamConfig, samples: Vec<f32>) -> Result<Stream>
where
    T: SizedSample + FromSample<f32>,
{
    let mut cursor = 0usize;
    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                for out in data.iter_mut() {
                    let value = match samples.get(cursor) {
                        Some(&s) => {
                            cursor = (cursor + 1) % samples.len();
                            s
                        }
                        None => 0.0,
                    };
                    *out = T::from_sample(value);
                }
            },
            |err| log::warn!("Audio stream error: {err}"),
            None,
        )
        .map_err(audio)
}

fn audio(err: impl Display) -> MotionError {
    MotionError::Audio(err.to_string())
}
