use crate::convert::frame_to_bgr;
use motion_sentry::{FourCc, Frame, MotionError, Result, VideoSink};
use opencv::{
    core::{self, Mat},
    prelude::*,
    videoio::VideoWriter,
};
use std::path::{Path, PathBuf};

/// An open `VideoWriter` and the frame size it was created for.
pub struct Recording {
    writer: VideoWriter,
    path: PathBuf,
    size: (u32, u32),
}

/// Encodes recordings with OpenCV's `VideoWriter`.
#[derive(Default)]
pub struct OpenCvVideoSink {
    bgr: Mat,
}

impl OpenCvVideoSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl VideoSink for OpenCvVideoSink {
    type Handle = Recording;

    fn open(&mut self, path: &Path, width: u32, height: u32, fps: f64, codec: FourCc) -> Result<Recording> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|e| MotionError::sink_write(path, e))?;
        }

        let [a, b, c, d] = codec.chars();
        let fourcc = VideoWriter::fourcc(a, b, c, d).map_err(|e| MotionError::sink_write(path, e))?;
        let writer = VideoWriter::new(
            &path.to_string_lossy(),
            fourcc,
            fps,
            core::Size::new(width as i32, height as i32),
            true,
        )
        .map_err(|e| MotionError::sink_write(path, e))?;

        if !writer.is_opened().map_err(|e| MotionError::sink_write(path, e))? {
            return Err(MotionError::sink_write(path, format!("no encoder accepted codec {codec}")));
        }
        Ok(Recording {
            writer,
            path: path.to_path_buf(),
            size: (width, height),
        })
    }

    fn write_frame(&mut self, handle: &mut Recording, frame: &Frame) -> Result<()> {
        if frame.dimensions() != handle.size {
            return Err(MotionError::sink_write(
                &handle.path,
                format!(
                    "frame is {}x{} but the recording is {}x{}",
                    frame.width(),
                    frame.height(),
                    handle.size.0,
                    handle.size.1
                ),
            ));
        }
        frame_to_bgr(frame, &mut self.bgr).map_err(|e| MotionError::sink_write(&handle.path, e))?;
        handle
            .writer
            .write(&self.bgr)
            .map_err(|e| MotionError::sink_write(&handle.path, e))
    }

    fn close(&mut self, mut handle: Recording) -> Result<()> {
        handle
            .writer
            .release()
            .map_err(|e| MotionError::sink_write(&handle.path, e))
    }
}
