use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::Local;
use image::{GrayImage, RgbImage};

use crate::logger;
use crate::platform::{RawCapture, WindowBackend};
use crate::types::*;

/// Vertical blit correction for windows that embed the game inside a
/// client area with its own title strip. Positive: the blit source
/// starts below the strip.
pub const NESTED_CLIENT_Y_SHIFT: i32 = 35;

/// Produces frames from one window. Owns the backend's blit surface
/// lifecycle: any capture failure is logged, the surface is torn down
/// so the next call rebuilds it, and the caller gets no frame.
pub struct FrameSource {
    backend: Box<dyn WindowBackend>,
    y_shift: i32,
    prefix: String,
}

impl FrameSource {
    pub fn new(backend: Box<dyn WindowBackend>, nested_client: bool, prefix: &str) -> Self {
        Self {
            backend,
            y_shift: if nested_client { NESTED_CLIENT_Y_SHIFT } else { 0 },
            prefix: prefix.to_string(),
        }
    }

    pub fn geometry(&mut self) -> Option<WindowGeometry> {
        match self.backend.geometry() {
            Ok(g) => Some(g),
            Err(e) => {
                logger::warn_p(&self.prefix, &format!("geometry query failed: {}", e));
                None
            }
        }
    }

    /// Whole client area. `None` means this frame is lost; the source
    /// has already reset itself for the next attempt.
    pub fn capture_full(&mut self, grayscale: bool) -> Option<Frame> {
        match self.backend.capture_full(self.y_shift) {
            Ok(raw) => Some(Frame::new(decode(raw, grayscale), Point::ZERO)),
            Err(e) => {
                logger::warn_p(&self.prefix, &format!("full capture failed: {}", e));
                self.backend.reset_capture();
                None
            }
        }
    }

    /// One sub-rectangle of the client area. The frame keeps the rect
    /// origin so matches map back to window coordinates.
    pub fn capture_region(&mut self, rect: Rect, grayscale: bool) -> Option<Frame> {
        match self.backend.capture_region(rect, self.y_shift) {
            Ok(raw) => Some(Frame::new(decode(raw, grayscale), rect.origin())),
            Err(e) => {
                logger::warn_p(&self.prefix, &format!("region capture failed: {}", e));
                self.backend.reset_capture();
                None
            }
        }
    }

    /// Save a full color frame as `%Y-%m-%d_%H-%M-%S.png` under `dir`.
    pub fn save_screenshot(&mut self, dir: &Path) -> anyhow::Result<PathBuf> {
        let frame = self
            .capture_full(false)
            .context("no frame to save")?;
        std::fs::create_dir_all(dir)?;
        let name = Local::now().format("%Y-%m-%d_%H-%M-%S.png").to_string();
        let path = dir.join(name);
        match frame.pixels {
            Pixels::Color(img) => img.save(&path)?,
            Pixels::Gray(img) => img.save(&path)?,
        }
        Ok(path)
    }

    pub fn backend(&self) -> &dyn WindowBackend {
        self.backend.as_ref()
    }
}

/// BGRA with stride to packed RGB or luma.
fn decode(raw: RawCapture, grayscale: bool) -> Pixels {
    let (w, h) = (raw.width, raw.height);
    let stride = raw.bytes_per_row as usize;
    if grayscale {
        let mut img = GrayImage::new(w, h);
        for y in 0..h {
            let row = &raw.data[y as usize * stride..];
            for x in 0..w {
                let i = x as usize * 4;
                let (b, g, r) = (row[i] as u32, row[i + 1] as u32, row[i + 2] as u32);
                // ITU-R BT.601 integer luma
                let l = (299 * r + 587 * g + 114 * b) / 1000;
                img.put_pixel(x, y, image::Luma([l as u8]));
            }
        }
        Pixels::Gray(img)
    } else {
        let mut img = RgbImage::new(w, h);
        for y in 0..h {
            let row = &raw.data[y as usize * stride..];
            for x in 0..w {
                let i = x as usize * 4;
                img.put_pixel(x, y, image::Rgb([row[i + 2], row[i + 1], row[i]]));
            }
        }
        Pixels::Color(img)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::stub::StubPlatform;
    use crate::platform::Platform;

    fn checker_screen() -> RgbImage {
        RgbImage::from_fn(64, 64, |x, y| {
            if (x + y) % 2 == 0 {
                image::Rgb([255, 0, 0])
            } else {
                image::Rgb([0, 0, 255])
            }
        })
    }

    #[test]
    fn full_capture_roundtrips_colors() {
        let platform = StubPlatform::with_screen(checker_screen());
        let mut source = FrameSource::new(platform.open(1), false, "t");
        let frame = source.capture_full(false).unwrap();
        assert_eq!(frame.origin, Point::ZERO);
        assert_eq!(frame.rgb(0, 0), (255, 0, 0));
        assert_eq!(frame.rgb(1, 0), (0, 0, 255));
    }

    #[test]
    fn region_capture_keeps_origin() {
        let platform = StubPlatform::with_screen(checker_screen());
        let mut source = FrameSource::new(platform.open(1), false, "t");
        let frame = source.capture_region(Rect::new(10, 20, 8, 4), false).unwrap();
        assert_eq!(frame.origin, Point::new(10, 20));
        assert_eq!(frame.pixels.width(), 8);
        assert_eq!(frame.pixels.height(), 4);
        // (10+20) even, so the region corner is red
        assert_eq!(frame.rgb(0, 0), (255, 0, 0));
    }

    #[test]
    fn grayscale_capture_is_single_channel() {
        let platform = StubPlatform::with_screen(checker_screen());
        let mut source = FrameSource::new(platform.open(1), false, "t");
        let frame = source.capture_full(true).unwrap();
        assert_eq!(frame.pixels.channels(), 1);
    }

    #[test]
    fn screenshot_lands_in_the_configured_dir_with_a_timestamp_name() {
        let platform = StubPlatform::with_screen(checker_screen());
        let mut source = FrameSource::new(platform.open(1), false, "t");
        let dir = std::env::temp_dir().join(format!("shots-{}", std::process::id()));
        let path = source.save_screenshot(&dir).unwrap();
        assert_eq!(path.parent(), Some(dir.as_path()));
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        let stamp = regex::Regex::new(r"^\d{4}-\d{2}-\d{2}_\d{2}-\d{2}-\d{2}\.png$").unwrap();
        assert!(stamp.is_match(&name), "unexpected name {}", name);
        assert!(path.exists());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn nested_client_capture_skips_the_title_strip() {
        // 35 rows of embedded title strip above the game content
        let screen = RgbImage::from_fn(64, 99, |_, y| {
            if y < NESTED_CLIENT_Y_SHIFT as u32 {
                image::Rgb([255, 255, 255])
            } else {
                image::Rgb([10, 20, 30])
            }
        });
        let platform = StubPlatform::with_screen(screen);
        let mut source = FrameSource::new(platform.open(1), true, "t");
        let frame = source.capture_full(false).unwrap();
        assert_eq!(frame.rgb(0, 0), (10, 20, 30));
    }

    #[test]
    fn empty_region_yields_no_frame() {
        let platform = StubPlatform::with_screen(checker_screen());
        let mut source = FrameSource::new(platform.open(1), false, "t");
        assert!(source.capture_region(Rect::new(0, 0, 0, 5), false).is_none());
    }
}
