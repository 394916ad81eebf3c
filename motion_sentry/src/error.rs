// THEORY:
// Every failure the capture pipeline can observe is one variant of `MotionError`.
// The driver loop only needs one question answered about an error: does it end
// the run? `is_fatal` answers that for the source-side kinds; sink failures are
// routed through the configured `SinkFailurePolicy` and audio failures never
// leave the alert controller.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Errors produced by the motion capture pipeline and its collaborators.
#[derive(Debug)]
pub enum MotionError {
    /// The frame source could not be opened. Nothing has started yet.
    SourceUnavailable(String),
    /// A frame read failed mid-stream.
    FrameReadFailure(String),
    /// A frame was empty, truncated, or did not match the baseline shape.
    InvalidFrame(String),
    /// A recording or still-image sink failed to open, write or close.
    SinkWrite { path: PathBuf, reason: String },
    /// The alert sound could not be loaded, played or stopped.
    Audio(String),
    /// A configuration value was out of range or unparsable.
    Config(String),
    Io(io::Error),
}

impl MotionError {
    pub fn sink_write(path: impl Into<PathBuf>, reason: impl fmt::Display) -> Self {
        Self::SinkWrite {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether the error must terminate the tick loop regardless of policy.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::SourceUnavailable(_) | Self::FrameReadFailure(_) | Self::Config(_) | Self::Io(_)
        )
    }
}

impl fmt::Display for MotionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SourceUnavailable(msg) => write!(f, "frame source unavailable: {msg}"),
            Self::FrameReadFailure(msg) => write!(f, "failed to read frame: {msg}"),
            Self::InvalidFrame(msg) => write!(f, "invalid frame: {msg}"),
            Self::SinkWrite { path, reason } => {
                write!(f, "sink write to {} failed: {reason}", path.display())
            }
            Self::Audio(msg) => write!(f, "audio failure: {msg}"),
            Self::Config(msg) => write!(f, "invalid configuration: {msg}"),
            Self::Io(err) => write!(f, "i/o error: {err}"),
        }
    }
}

impl std::error::Error for MotionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for MotionError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

pub type Result<T, E = MotionError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatality_follows_error_kind() {
        assert!(MotionError::SourceUnavailable("cam0".into()).is_fatal());
        assert!(MotionError::FrameReadFailure("eof".into()).is_fatal());
        assert!(!MotionError::InvalidFrame("0x0".into()).is_fatal());
        assert!(!MotionError::sink_write("a.avi", "disk full").is_fatal());
        assert!(!MotionError::Audio("no device".into()).is_fatal());
    }

    #[test]
    fn sink_write_message_names_path() {
        let err = MotionError::sink_write("captured_videos/video_20240101_000000.avi", "denied");
        assert_eq!(
            err.to_string(),
            "sink write to captured_videos/video_20240101_000000.avi failed: denied"
        );
    }
}
