use std::path::PathBuf;

use thiserror::Error;

/// Failures while reading pixels out of the target window.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("target window is gone")]
    WindowGone,
    #[error("window geometry query failed")]
    BadGeometry,
    #[error("capture rect {0}x{1} is empty or out of bounds")]
    BadRect(i32, i32),
    #[error("bit blit failed")]
    BlitFailed,
    #[error("pixel readback failed")]
    ReadbackFailed,
}

/// Failures in the match engines. Absence of a match is not an error;
/// these cover broken inputs and internal faults.
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("reference image {path:?} unreadable: {source}")]
    ReferenceUnreadable {
        path: PathBuf,
        source: image::ImageError,
    },
    #[error("no keypoints in {0}")]
    NoKeypoints(&'static str),
    #[error("wait for \"{0}\" timed out")]
    Timeout(String),
}

/// Failures while injecting input.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("target window is gone")]
    WindowGone,
    #[error("coordinate mapping failed")]
    MappingFailed,
    #[error("posting input message failed")]
    PostFailed,
    #[error("device input command failed: {0}")]
    DeviceCommand(#[from] std::io::Error),
}
