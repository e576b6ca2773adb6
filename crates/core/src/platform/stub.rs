use std::sync::{Arc, Mutex};

use image::RgbImage;

use crate::error::{CaptureError, InputError};
use crate::logger;
use crate::types::*;
use super::{MouseMessage, Platform, RawCapture, WindowBackend};

/// Everything the stub injected, in order. Tests assert against this.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    CursorMoved(Point),
    AbsoluteMove { nx: i32, ny: i32 },
    ButtonDown,
    ButtonUp,
    Posted(MouseMessage, Point),
    Activated(WindowId),
}

/// In-memory platform backed by a settable synthetic screen. Used by
/// `--stub` runs and by the integration tests.
pub struct StubPlatform {
    screen: Arc<Mutex<RgbImage>>,
    events: Arc<Mutex<Vec<InputEvent>>>,
}

impl StubPlatform {
    pub fn new() -> Self {
        Self::with_screen(RgbImage::new(1280, 720))
    }

    pub fn with_screen(screen: RgbImage) -> Self {
        Self {
            screen: Arc::new(Mutex::new(screen)),
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Replace the synthetic screen all open backends blit from.
    pub fn set_screen(&self, screen: RgbImage) {
        *self.screen.lock().unwrap() = screen;
    }

    pub fn events(&self) -> Vec<InputEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn clear_events(&self) {
        self.events.lock().unwrap().clear();
    }
}

impl Default for StubPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl Platform for StubPlatform {
    fn find_windows(&self, pattern: &str) -> Vec<(WindowId, String)> {
        logger::info_p("stub", &format!("find_windows(\"{}\")", pattern));
        vec![(10001, format!("Window<{}>", pattern))]
    }

    fn open(&self, window_id: WindowId) -> Box<dyn WindowBackend> {
        Box::new(StubWindow {
            window_id,
            screen: Arc::clone(&self.screen),
            events: Arc::clone(&self.events),
        })
    }
}

pub struct StubWindow {
    window_id: WindowId,
    screen: Arc<Mutex<RgbImage>>,
    events: Arc<Mutex<Vec<InputEvent>>>,
}

impl StubWindow {
    fn record(&self, ev: InputEvent) {
        self.events.lock().unwrap().push(ev);
    }

    fn blit(&self, rect: Rect, y_shift: i32) -> Result<RawCapture, CaptureError> {
        let screen = self.screen.lock().unwrap();
        if rect.w <= 0 || rect.h <= 0 {
            return Err(CaptureError::BadRect(rect.w, rect.h));
        }
        let (w, h) = (rect.w as u32, rect.h as u32);
        let mut data = vec![0u8; (w * h * 4) as usize];
        for y in 0..h {
            for x in 0..w {
                let sx = rect.l + x as i32;
                let sy = rect.t + y as i32 + y_shift;
                let i = ((y * w + x) * 4) as usize;
                if sx >= 0
                    && sy >= 0
                    && (sx as u32) < screen.width()
                    && (sy as u32) < screen.height()
                {
                    let p = screen.get_pixel(sx as u32, sy as u32).0;
                    data[i] = p[2];
                    data[i + 1] = p[1];
                    data[i + 2] = p[0];
                    data[i + 3] = 255;
                }
            }
        }
        Ok(RawCapture {
            data,
            width: w,
            height: h,
            bytes_per_row: w * 4,
        })
    }
}

impl WindowBackend for StubWindow {
    fn id(&self) -> WindowId {
        self.window_id
    }

    fn is_valid(&self) -> bool {
        true
    }

    fn geometry(&mut self) -> Result<WindowGeometry, CaptureError> {
        let screen = self.screen.lock().unwrap();
        let (cw, ch) = (screen.width() as i32, screen.height() as i32);
        Ok(WindowGeometry::with_borders(
            (100, 100, cw + 16, ch + 47),
            (cw, ch),
        ))
    }

    fn capture_full(&mut self, y_shift: i32) -> Result<RawCapture, CaptureError> {
        let rect = {
            let screen = self.screen.lock().unwrap();
            Rect::new(0, 0, screen.width() as i32, screen.height() as i32)
        };
        self.blit(rect, y_shift)
    }

    fn capture_region(&mut self, rect: Rect, y_shift: i32) -> Result<RawCapture, CaptureError> {
        self.blit(rect, y_shift)
    }

    fn reset_capture(&mut self) {}

    fn client_to_screen(&self, p: Point) -> Result<Point, InputError> {
        let screen = self.screen.lock().unwrap();
        let (cw, ch) = (screen.width() as i32, screen.height() as i32);
        let g = WindowGeometry::with_borders((100, 100, cw + 16, ch + 47), (cw, ch));
        Ok(Point::new(
            g.outer_l + g.border_l + p.x,
            g.outer_t + g.border_t + p.y,
        ))
    }

    fn screen_size(&self) -> (i32, i32) {
        (1920, 1080)
    }

    fn set_cursor(&self, screen: Point) -> Result<(), InputError> {
        self.record(InputEvent::CursorMoved(screen));
        Ok(())
    }

    fn mouse_button(&self, down: bool) -> Result<(), InputError> {
        self.record(if down {
            InputEvent::ButtonDown
        } else {
            InputEvent::ButtonUp
        });
        Ok(())
    }

    fn mouse_move_absolute(&self, nx: i32, ny: i32) -> Result<(), InputError> {
        self.record(InputEvent::AbsoluteMove { nx, ny });
        Ok(())
    }

    fn post_mouse(&self, msg: MouseMessage, p: Point) -> Result<(), InputError> {
        self.record(InputEvent::Posted(msg, p));
        Ok(())
    }

    fn activate(&mut self) {
        let id = self.window_id;
        self.record(InputEvent::Activated(id));
    }
}
