// THEORY:
// The capture pipeline only talks to the outside world through the narrow traits
// in this module. Camera drivers, video encoders, sound devices and preview
// windows all live behind them, so the pipeline can be driven by an OpenCV
// webcam in production and by in-memory fakes in tests.

use crate::config::FourCc;
use crate::core_modules::frame::Frame;
use crate::error::{MotionError, Result};
use std::path::{Path, PathBuf};

/// Yields frames on demand.
pub trait FrameSource {
    /// Opens the device. Failure maps to `MotionError::SourceUnavailable`.
    fn open(&mut self) -> Result<()>;

    /// Blocks until the next frame. `Ok(None)` signals end of stream.
    fn read(&mut self) -> Result<Option<Frame>>;

    /// Releases the device. Called once on every exit path.
    fn release(&mut self);
}

/// Writes still images.
pub trait ImageSink {
    fn write(&mut self, frame: &Frame, path: &Path) -> Result<()>;
}

/// Writes video files one frame at a time.
pub trait VideoSink {
    /// An open recording.
    type Handle;

    /// Starts a recording at `path`, creating its directory if needed.
    fn open(&mut self, path: &Path, width: u32, height: u32, fps: f64, codec: FourCc) -> Result<Self::Handle>;

    fn write_frame(&mut self, handle: &mut Self::Handle, frame: &Frame) -> Result<()>;

    /// Flushes and closes the recording.
    fn close(&mut self, handle: Self::Handle) -> Result<()>;
}

/// Plays the looped alert sound.
pub trait AudioSink {
    fn play_looped(&mut self, asset: &Path) -> Result<()>;

    fn stop(&mut self) -> Result<()>;

    fn is_playing(&self) -> bool;
}

/// Receives each annotated frame and reports whether the operator asked to quit.
pub trait Monitor {
    fn present(&mut self, frame: &Frame) -> Result<bool>;

    /// Checks for a quit request on a tick that had no frame to show.
    /// `last` is the most recently presented frame, if any.
    fn poll_quit(&mut self, last: Option<&Frame>) -> Result<bool> {
        match last {
            Some(frame) => self.present(frame),
            None => Ok(false),
        }
    }
}

/// A monitor without a display; quits when `quit` returns true.
pub struct Headless<F: FnMut() -> bool> {
    quit: F,
}

impl<F: FnMut() -> bool> Headless<F> {
    pub fn new(quit: F) -> Self {
        Self { quit }
    }
}

impl<F: FnMut() -> bool> Monitor for Headless<F> {
    fn present(&mut self, _frame: &Frame) -> Result<bool> {
        Ok((self.quit)())
    }

    fn poll_quit(&mut self, _last: Option<&Frame>) -> Result<bool> {
        Ok((self.quit)())
    }
}

/// Encodes still images to disk with the `image` crate, format chosen by extension.
#[derive(Debug, Default)]
pub struct FsImageSink {
    written: u64,
    last_written: Option<PathBuf>,
}

impl FsImageSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stills saved so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn last_written(&self) -> Option<&Path> {
        self.last_written.as_deref()
    }
}

impl ImageSink for FsImageSink {
    fn write(&mut self, frame: &Frame, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|e| MotionError::sink_write(path, e))?;
        }
        frame
            .as_image()
            .save(path)
            .map_err(|e| MotionError::sink_write(path, e))?;
        self.written += 1;
        self.last_written = Some(path.to_path_buf());
        Ok(())
    }
}
