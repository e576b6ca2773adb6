use std::process::Command;
use std::time::Duration;

use rand::Rng;

use crate::error::InputError;
use crate::platform::{MouseMessage, WindowBackend};
use crate::sleep;
use crate::types::{Point, Rect};

/// Number of intermediate positions a drag is interpolated over.
pub const DRAG_STEPS: usize = 20;
/// Per-step pacing of a foreground drag.
const DRAG_STEP_MS: u64 = 10;
/// Default per-step pacing of a background drag.
pub const BACKGROUND_DRAG_STEP: Duration = Duration::from_millis(40);

/// Where injected input lands.
#[derive(Debug, Clone)]
pub enum InputTarget {
    /// The window itself, via cursor events or posted messages.
    Window,
    /// A remote device over the device bridge.
    Device { serial: Option<String> },
}

/// Evenly spaced points from `from` to `to`, endpoints included.
/// A zero-length path yields `steps` copies of the same point.
pub fn interpolate(from: Point, to: Point, steps: usize) -> Vec<Point> {
    if steps <= 1 {
        return vec![to];
    }
    (0..steps)
        .map(|i| {
            let t = i as f64 / (steps - 1) as f64;
            Point::new(
                (from.x as f64 + (to.x - from.x) as f64 * t).round() as i32,
                (from.y as f64 + (to.y - from.y) as f64 * t).round() as i32,
            )
        })
        .collect()
}

fn random_in(rect: Rect) -> Point {
    let mut rng = rand::thread_rng();
    let x = if rect.w > 0 {
        rng.gen_range(rect.l..rect.l + rect.w)
    } else {
        rect.l
    };
    let y = if rect.h > 0 {
        rng.gen_range(rect.t..rect.t + rect.h)
    } else {
        rect.t
    };
    Point::new(x, y)
}

/// Synthesizes mouse input against one window (or a remote device).
/// All coordinates are client-relative; mapping to the screen happens
/// here.
pub struct InputInjector {
    backend: Box<dyn WindowBackend>,
    target: InputTarget,
}

impl InputInjector {
    pub fn new(backend: Box<dyn WindowBackend>, target: InputTarget) -> Self {
        Self { backend, target }
    }

    pub fn activate(&mut self) {
        self.backend.activate();
    }

    /// Park the cursor on a client point.
    pub fn move_to(&self, p: Point) -> Result<(), InputError> {
        let screen = self.backend.client_to_screen(p)?;
        self.backend.set_cursor(screen)
    }

    /// Press, hold 20-80 ms, release at the current cursor position.
    pub fn click(&self) -> Result<(), InputError> {
        self.backend.mouse_button(true)?;
        sleep::sleep_range_ms(20, 80);
        self.backend.mouse_button(false)
    }

    /// Foreground tap at a random point inside `rect`.
    pub fn tap_within(&self, rect: Rect) -> Result<(), InputError> {
        self.tap(random_in(rect))
    }

    pub fn tap(&self, p: Point) -> Result<(), InputError> {
        if let InputTarget::Device { serial } = &self.target {
            return device_tap(serial.as_deref(), p);
        }
        self.move_to(p)?;
        self.click()
    }

    /// Foreground drag through interpolated absolute cursor positions.
    pub fn drag(&self, from: Point, to: Point) -> Result<(), InputError> {
        if let InputTarget::Device { serial } = &self.target {
            return device_swipe(serial.as_deref(), from, to, Duration::from_millis(300));
        }
        let (sw, sh) = self.backend.screen_size();
        let a = self.backend.client_to_screen(from)?;
        let b = self.backend.client_to_screen(to)?;
        self.backend.mouse_button(true)?;
        for p in interpolate(a, b, DRAG_STEPS) {
            self.backend
                .mouse_move_absolute(p.x * 65535 / sw.max(1), p.y * 65535 / sh.max(1))?;
            sleep::sleep_ms(DRAG_STEP_MS);
        }
        self.backend.mouse_button(false)
    }

    /// Background tap: posted messages, cursor untouched.
    pub fn tap_background(&self, p: Point) -> Result<(), InputError> {
        if let InputTarget::Device { serial } = &self.target {
            return device_tap(serial.as_deref(), p);
        }
        self.backend.post_mouse(MouseMessage::Move, p)?;
        self.backend.post_mouse(MouseMessage::LeftDown, p)?;
        sleep::sleep_range_ms(20, 80);
        self.backend.post_mouse(MouseMessage::LeftUp, p)
    }

    pub fn tap_background_within(&self, rect: Rect) -> Result<(), InputError> {
        self.tap_background(random_in(rect))
    }

    /// Background drag: interpolated posted moves between a posted
    /// press and release, paced by `step_delay`.
    pub fn drag_background(
        &self,
        from: Point,
        to: Point,
        step_delay: Duration,
    ) -> Result<(), InputError> {
        if let InputTarget::Device { serial } = &self.target {
            return device_swipe(
                serial.as_deref(),
                from,
                to,
                step_delay * DRAG_STEPS as u32,
            );
        }
        self.backend.post_mouse(MouseMessage::Move, from)?;
        self.backend.post_mouse(MouseMessage::LeftDown, from)?;
        for p in interpolate(from, to, DRAG_STEPS) {
            self.backend.post_mouse(MouseMessage::Move, p)?;
            sleep::sleep_ms(step_delay.as_millis() as u64);
        }
        self.backend.post_mouse(MouseMessage::LeftUp, to)
    }
}

fn device_command(serial: Option<&str>, args: &[String]) -> Result<(), InputError> {
    let mut cmd = Command::new("adb");
    if let Some(s) = serial {
        cmd.arg("-s").arg(s);
    }
    cmd.arg("shell").arg("input").args(args);
    let status = cmd.status()?;
    if status.success() {
        Ok(())
    } else {
        Err(InputError::PostFailed)
    }
}

fn device_tap(serial: Option<&str>, p: Point) -> Result<(), InputError> {
    device_command(serial, &["tap".into(), p.x.to_string(), p.y.to_string()])
}

fn device_swipe(
    serial: Option<&str>,
    from: Point,
    to: Point,
    duration: Duration,
) -> Result<(), InputError> {
    device_command(
        serial,
        &[
            "swipe".into(),
            from.x.to_string(),
            from.y.to_string(),
            to.x.to_string(),
            to.y.to_string(),
            duration.as_millis().to_string(),
        ],
    )
}
