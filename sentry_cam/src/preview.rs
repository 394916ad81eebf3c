use crate::convert::frame_to_bgr;
use motion_sentry::{Frame, Monitor, MotionError, Result};
use opencv::{core::Mat, highgui};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

const QUIT_KEY: i32 = b'q' as i32;

/// Shows each annotated frame in a HighGUI window and polls for the quit key.
pub struct PreviewWindow {
    title: String,
    bgr: Mat,
    interrupted: Arc<AtomicBool>,
}

impl PreviewWindow {
    pub fn new(title: &str, interrupted: Arc<AtomicBool>) -> opencv::Result<Self> {
        highgui::named_window(title, highgui::WINDOW_AUTOSIZE)?;
        Ok(Self {
            title: title.to_string(),
            bgr: Mat::default(),
            interrupted,
        })
    }
}

impl Monitor for PreviewWindow {
    fn present(&mut self, frame: &Frame) -> Result<bool> {
        if self.interrupted.load(Ordering::Relaxed) {
            return Ok(true);
        }
        frame_to_bgr(frame, &mut self.bgr).map_err(display)?;
        highgui::imshow(&self.title, &self.bgr).map_err(display)?;
        quit_key_pressed()
    }

    /// Keeps the last image on screen and only services the event loop.
    fn poll_quit(&mut self, _last: Option<&Frame>) -> Result<bool> {
        if self.interrupted.load(Ordering::Relaxed) {
            return Ok(true);
        }
        quit_key_pressed()
    }
}

fn quit_key_pressed() -> Result<bool> {
    // ~1 ms poll; -1 when no key was pressed.
    let key = highgui::wait_key(1).map_err(display)?;
    Ok(key >= 0 && key & 0xFF == QUIT_KEY)
}

fn display(e: opencv::Error) -> MotionError {
    MotionError::Io(std::io::Error::other(e.to_string()))
}

impl Drop for PreviewWindow {
    fn drop(&mut self) {
        if let Err(e) = highgui::destroy_window(&self.title) {
            log::warn!("Failed to close preview window: {e}");
        }
    }
}
