use crate::convert::frame_from_bgr;
use motion_sentry::{Frame, FrameSource, MotionError, Result};
use opencv::{
    core::Mat,
    prelude::*,
    videoio::{self, VideoCapture},
};
use std::fmt;
use std::path::PathBuf;

/// Where frames come from.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    /// A camera by device index. A failed read ends the run with an error.
    Device(i32),
    /// A video file. Running out of frames ends the run normally.
    File(PathBuf),
}

impl Input {
    /// Bare integers select a camera; anything else is a file path.
    pub fn parse(value: &str) -> Self {
        match value.parse::<i32>() {
            Ok(index) => Self::Device(index),
            Err(_) => Self::File(PathBuf::from(value)),
        }
    }
}

impl fmt::Display for Input {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Device(index) => write!(f, "camera {index}"),
            Self::File(path) => write!(f, "video file {}", path.display()),
        }
    }
}

pub struct CameraSource {
    input: Input,
    capture: Option<VideoCapture>,
    bgr: Mat,
    rgb: Mat,
}

impl CameraSource {
    pub fn new(input: Input) -> Self {
        Self {
            input,
            capture: None,
            bgr: Mat::default(),
            rgb: Mat::default(),
        }
    }
}

impl FrameSource for CameraSource {
    fn open(&mut self) -> Result<()> {
        let unavailable = |reason: String| MotionError::SourceUnavailable(format!("{}: {reason}", self.input));
        let capture = match &self.input {
            Input::Device(index) => VideoCapture::new(*index, videoio::CAP_ANY),
            Input::File(path) => VideoCapture::from_file(&path.to_string_lossy(), videoio::CAP_ANY),
        }
        .map_err(|e| unavailable(e.to_string()))?;

        if !capture.is_opened().map_err(|e| unavailable(e.to_string()))? {
            return Err(unavailable("unable to access the device".into()));
        }
        log::info!("{} accessed successfully.", self.input);
        self.capture = Some(capture);
        Ok(())
    }

    fn read(&mut self) -> Result<Option<Frame>> {
        let capture = self
            .capture
            .as_mut()
            .ok_or_else(|| MotionError::FrameReadFailure("source is not open".into()))?;
        let grabbed = capture
            .read(&mut self.bgr)
            .map_err(|e| MotionError::FrameReadFailure(e.to_string()))?;

        if !grabbed || self.bgr.empty() {
            return match self.input {
                Input::File(_) => Ok(None),
                Input::Device(_) => Err(MotionError::FrameReadFailure(format!(
                    "unable to read from {}",
                    self.input
                ))),
            };
        }

        frame_from_bgr(&self.bgr, &mut self.rgb)
            .map_err(|e| MotionError::InvalidFrame(e.to_string()))?
            .map(Some)
    }

    fn release(&mut self) {
        if let Some(mut capture) = self.capture.take() {
            if let Err(e) = capture.release() {
                log::warn!("Failed to release {}: {e}", self.input);
            }
        }
    }
}

impl Drop for CameraSource {
    fn drop(&mut self) {
        self.release();
    }
}
