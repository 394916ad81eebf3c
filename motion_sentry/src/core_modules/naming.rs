//! Capture file naming: `<kind>_<YYYYMMDD_HHMMSS>.<ext>`, one-second granularity.

use chrono::{Local, NaiveDateTime};
use std::path::{Path, PathBuf};

pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Source of "now" for timestamped file names.
pub type Clock = fn() -> NaiveDateTime;

/// The local wall-clock time.
pub fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureKind {
    Photo,
    Video,
}

impl CaptureKind {
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Photo => "photo",
            Self::Video => "video",
        }
    }

    fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "photo" => Some(Self::Photo),
            "video" => Some(Self::Video),
            _ => None,
        }
    }
}

pub fn capture_file_name(kind: CaptureKind, at: NaiveDateTime, extension: &str) -> String {
    format!("{}_{}.{}", kind.prefix(), at.format(TIMESTAMP_FORMAT), extension)
}

pub fn capture_path(dir: &Path, kind: CaptureKind, at: NaiveDateTime, extension: &str) -> PathBuf {
    dir.join(capture_file_name(kind, at, extension))
}

/// Recovers the kind and timestamp from a name produced by [`capture_file_name`].
pub fn parse_capture_file_name(name: &str) -> Option<(CaptureKind, NaiveDateTime)> {
    let (stem, _extension) = name.rsplit_once('.')?;
    let (prefix, stamp) = stem.split_once('_')?;
    let kind = CaptureKind::from_prefix(prefix)?;
    let at = NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).ok()?;
    Some((kind, at))
}
