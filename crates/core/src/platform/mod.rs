pub mod hotkey;
pub mod stub;

#[cfg(target_os = "windows")]
pub mod windows;

use crate::error::{CaptureError, InputError};
use crate::logger;
use crate::types::*;

/// Raw blitted pixel data (BGRA, top-down rows).
#[derive(Debug)]
pub struct RawCapture {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub bytes_per_row: u32,
}

/// Mouse messages that can be posted to a window without the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseMessage {
    Move,
    LeftDown,
    LeftUp,
}

/// Handle to a specific OS window, providing the primitive operations
/// the capture and input layers build on.
pub trait WindowBackend: Send {
    fn id(&self) -> WindowId;
    fn is_valid(&self) -> bool;
    fn geometry(&mut self) -> Result<WindowGeometry, CaptureError>;

    /// Blit the whole client area. Implementations keep a persistent
    /// blit surface for this path; `reset_capture` tears it down so the
    /// next call rebuilds it. `y_shift` moves the blit source down to
    /// skip an embedded title strip.
    fn capture_full(&mut self, y_shift: i32) -> Result<RawCapture, CaptureError>;

    /// Blit one client-area sub-rectangle with per-call resources.
    fn capture_region(&mut self, rect: Rect, y_shift: i32) -> Result<RawCapture, CaptureError>;

    fn reset_capture(&mut self);

    fn client_to_screen(&self, p: Point) -> Result<Point, InputError>;
    fn screen_size(&self) -> (i32, i32);

    /// Move the hardware cursor to a screen coordinate.
    fn set_cursor(&self, screen: Point) -> Result<(), InputError>;
    /// Press or release the left button at the current cursor position.
    fn mouse_button(&self, down: bool) -> Result<(), InputError>;
    /// Move the cursor via normalized absolute coordinates (0..=65535).
    fn mouse_move_absolute(&self, nx: i32, ny: i32) -> Result<(), InputError>;
    /// Post a mouse message straight to the window, cursor untouched.
    fn post_mouse(&self, msg: MouseMessage, p: Point) -> Result<(), InputError>;

    fn activate(&mut self);
}

/// Platform-level operations (window lookup, backend factory).
pub trait Platform: Send + Sync {
    /// All windows whose title matches the regex `pattern`.
    fn find_windows(&self, pattern: &str) -> Vec<(WindowId, String)>;
    fn open(&self, window_id: WindowId) -> Box<dyn WindowBackend>;
}

/// Create the platform appropriate for the current OS.
pub fn create_platform(force_stub: bool) -> std::sync::Arc<dyn Platform> {
    if force_stub {
        logger::register_prefix("stub", logger::COLOR_GRAY);
        return std::sync::Arc::new(stub::StubPlatform::new());
    }
    #[cfg(target_os = "windows")]
    {
        return std::sync::Arc::new(windows::WindowsPlatform::new());
    }
    #[cfg(not(target_os = "windows"))]
    {
        logger::register_prefix("stub", logger::COLOR_GRAY);
        std::sync::Arc::new(stub::StubPlatform::new())
    }
}
