// THEORY:
// `MotionConfig` is the single explicit value that carries every tunable of the
// capture pipeline. Defaults reproduce the stock webcam behaviour; each field can
// be overridden from `MOTION_SENTRY_*` environment pairs and then by the caller
// (the `sentry_cam` CLI does this last).

use crate::error::{MotionError, Result};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

pub const ENV_PREFIX: &str = "MOTION_SENTRY_";

/// Which reaction the pipeline drives when motion is detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionKind {
    /// One annotated still per tick with motion.
    Snapshot,
    /// A video file per motion episode.
    Recording,
    /// A video file per motion episode plus a looped alert sound.
    RecordingWithAlert,
}

impl FromStr for ReactionKind {
    type Err = MotionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "snapshot" | "photo" => Ok(Self::Snapshot),
            "recording" | "video" => Ok(Self::Recording),
            "alert" | "recording-with-alert" => Ok(Self::RecordingWithAlert),
            other => Err(MotionError::Config(format!("unknown reaction '{other}'"))),
        }
    }
}

/// What the loop does when an image or video sink fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SinkFailurePolicy {
    /// Log a warning and keep processing ticks.
    #[default]
    LogAndContinue,
    /// Release resources and end the run with the error.
    Abort,
}

impl FromStr for SinkFailurePolicy {
    type Err = MotionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "continue" | "log" | "log-and-continue" => Ok(Self::LogAndContinue),
            "abort" => Ok(Self::Abort),
            other => Err(MotionError::Config(format!("unknown sink failure policy '{other}'"))),
        }
    }
}

/// A four-character video codec code such as `XVID`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FourCc([u8; 4]);

impl FourCc {
    pub const XVID: FourCc = FourCc(*b"XVID");

    pub fn chars(&self) -> [char; 4] {
        self.0.map(char::from)
    }

    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl FromStr for FourCc {
    type Err = MotionError;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = s.as_bytes();
        if bytes.len() != 4 || !bytes.iter().all(|b| b.is_ascii_graphic() || *b == b' ') {
            return Err(MotionError::Config(format!(
                "codec must be four printable ASCII characters, got '{s}'"
            )));
        }
        Ok(Self([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }
}

impl fmt::Display for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.chars().iter().try_for_each(|c| write!(f, "{c}"))
    }
}

/// Configuration for the capture pipeline.
#[derive(Debug, Clone)]
pub struct MotionConfig {
    /// Number of initial ticks whose image simply replaces the baseline.
    pub stabilization_ticks: u32,
    /// Minimum per-pixel intensity difference (0-255) counted as change.
    pub sensitivity: u8,
    /// Contours with a smaller area (square pixels) are treated as noise.
    pub min_contour_area: f64,
    pub dilation_iterations: u32,
    /// Side length of the square Gaussian kernel. Must be odd.
    pub blur_kernel: u32,
    pub recording_fps: f64,
    pub codec: FourCc,
    pub photo_dir: PathBuf,
    pub video_dir: PathBuf,
    pub alert_sound: PathBuf,
    pub photo_extension: String,
    pub video_extension: String,
    pub reaction: ReactionKind,
    pub sink_failure: SinkFailurePolicy,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            stabilization_ticks: 30,
            sensitivity: 25,
            min_contour_area: 2000.0,
            dilation_iterations: 2,
            blur_kernel: 21,
            recording_fps: 20.0,
            codec: FourCc::XVID,
            photo_dir: PathBuf::from("captured_photos"),
            video_dir: PathBuf::from("captured_videos"),
            alert_sound: PathBuf::from("assets/sounds/siren-fire-alert.wav"),
            photo_extension: "jpg".to_string(),
            video_extension: "avi".to_string(),
            reaction: ReactionKind::Recording,
            sink_failure: SinkFailurePolicy::LogAndContinue,
        }
    }
}

impl MotionConfig {
    /// Defaults overridden by any `MOTION_SENTRY_*` variables in the process environment.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_overrides(std::env::vars())?;
        config.validate()?;
        Ok(config)
    }

    /// Applies `MOTION_SENTRY_<FIELD>=value` pairs. Keys without the prefix are ignored.
    pub fn apply_overrides<I, K, V>(&mut self, pairs: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in pairs {
            let Some(field) = key.as_ref().strip_prefix(ENV_PREFIX) else {
                continue;
            };
            self.set(field, value.as_ref())?;
        }
        Ok(())
    }

    fn set(&mut self, field: &str, value: &str) -> Result<()> {
        let value = value.trim();
        match field {
            "STABILIZATION_TICKS" => self.stabilization_ticks = parse(field, value)?,
            "SENSITIVITY" => self.sensitivity = parse(field, value)?,
            "MIN_CONTOUR_AREA" => self.min_contour_area = parse(field, value)?,
            "DILATION_ITERATIONS" => self.dilation_iterations = parse(field, value)?,
            "BLUR_KERNEL" => self.blur_kernel = parse(field, value)?,
            "RECORDING_FPS" => self.recording_fps = parse(field, value)?,
            "CODEC" => self.codec = value.parse()?,
            "PHOTO_DIR" => self.photo_dir = PathBuf::from(value),
            "VIDEO_DIR" => self.video_dir = PathBuf::from(value),
            "ALERT_SOUND" => self.alert_sound = PathBuf::from(value),
            "PHOTO_EXTENSION" => self.photo_extension = value.to_string(),
            "VIDEO_EXTENSION" => self.video_extension = value.to_string(),
            "REACTION" => self.reaction = value.parse()?,
            "SINK_FAILURE" => self.sink_failure = value.parse()?,
            other => {
                return Err(MotionError::Config(format!(
                    "unknown setting {ENV_PREFIX}{other}"
                )));
            }
        }
        Ok(())
    }

    /// Rejects values the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.blur_kernel == 0 || self.blur_kernel % 2 == 0 {
            return Err(MotionError::Config(format!(
                "blur kernel must be odd and positive, got {}",
                self.blur_kernel
            )));
        }
        if !self.recording_fps.is_finite() || self.recording_fps <= 0.0 {
            return Err(MotionError::Config(format!(
                "recording fps must be positive, got {}",
                self.recording_fps
            )));
        }
        if !self.min_contour_area.is_finite() || self.min_contour_area < 0.0 {
            return Err(MotionError::Config(format!(
                "minimum contour area must be non-negative, got {}",
                self.min_contour_area
            )));
        }
        if self.photo_extension.is_empty() || self.video_extension.is_empty() {
            return Err(MotionError::Config("file extensions must not be empty".into()));
        }
        Ok(())
    }
}

fn parse<T: FromStr>(field: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| MotionError::Config(format!("{ENV_PREFIX}{field}: cannot parse '{value}'")))
}
