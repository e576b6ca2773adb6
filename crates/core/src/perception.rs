use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::capture::FrameSource;
use crate::catalog::Catalog;
use crate::error::MatchError;
use crate::features;
use crate::matching::{self, Correlation};
use crate::sleep;
use crate::types::*;

/// How a trigger is scored against a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MatchMode {
    Correlation { threshold: f32 },
    Feature { min_matches: usize },
}

/// One thing to look for: a reference, where to look, and how.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trigger {
    pub reference: &'static str,
    pub region: Option<Rect>,
    pub grayscale: bool,
    pub mode: MatchMode,
    /// Report the reference center rather than its top-left.
    pub centered: bool,
}

impl Trigger {
    pub fn correlation(reference: &'static str, threshold: f32) -> Self {
        Self {
            reference,
            region: None,
            grayscale: false,
            mode: MatchMode::Correlation { threshold },
            centered: true,
        }
    }

    pub fn feature(reference: &'static str, min_matches: usize) -> Self {
        Self {
            reference,
            region: None,
            grayscale: true,
            mode: MatchMode::Feature { min_matches },
            centered: false,
        }
    }

    pub fn in_region(mut self, region: Rect) -> Self {
        self.region = Some(region);
        self
    }

    pub fn gray(mut self) -> Self {
        self.grayscale = true;
        self
    }

    pub fn uncentered(mut self) -> Self {
        self.centered = false;
        self
    }
}

/// Policy when a wait exhausts its budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnTimeout {
    /// Report not-found and let the caller carry on.
    Carry,
    /// Surface a hard timeout error.
    GiveUp,
}

/// Capture plus match engines behind one lookup surface. All returned
/// points are window-relative regardless of the capture region.
pub struct Perception {
    frames: FrameSource,
    catalog: Catalog,
    cache: HashMap<(String, bool), ReferenceImage>,
}

impl Perception {
    pub fn new(frames: FrameSource, catalog: Catalog) -> Self {
        Self {
            frames,
            catalog,
            cache: HashMap::new(),
        }
    }

    /// Seed the reference cache directly, bypassing the catalog files.
    pub fn insert_reference(&mut self, name: &str, grayscale: bool, reference: ReferenceImage) {
        self.cache.insert((name.to_string(), grayscale), reference);
    }

    fn reference(&mut self, name: &str, grayscale: bool) -> Result<&ReferenceImage, MatchError> {
        let key = (name.to_string(), grayscale);
        if !self.cache.contains_key(&key) {
            let loaded = matching::load_reference(&self.catalog.path(name), grayscale)?;
            self.cache.insert(key.clone(), loaded);
        }
        Ok(&self.cache[&key])
    }

    fn grab(&mut self, trigger: &Trigger) -> Option<Frame> {
        match trigger.region {
            Some(rect) => self.frames.capture_region(rect, trigger.grayscale),
            None => self.frames.capture_full(trigger.grayscale),
        }
    }

    /// One capture, one match. `Ok(None)` covers both "not on screen"
    /// and a lost frame (the source already logged and self-healed).
    pub fn locate(&mut self, trigger: &Trigger) -> Result<Option<Point>, MatchError> {
        self.reference(trigger.reference, trigger.grayscale)?;
        let Some(frame) = self.grab(trigger) else {
            return Ok(None);
        };
        let key = (trigger.reference.to_string(), trigger.grayscale);
        let reference = &self.cache[&key];
        match trigger.mode {
            MatchMode::Correlation { threshold } => {
                let m = matching::correlate(&reference.pixels, &frame.pixels);
                if m.score < threshold {
                    return Ok(None);
                }
                let p = if trigger.centered {
                    m.centered(reference)
                } else {
                    m.location
                };
                Ok(Some(Point::new(p.x + frame.origin.x, p.y + frame.origin.y)))
            }
            MatchMode::Feature { min_matches } => {
                let found = features::locate(
                    &reference.pixels.to_gray(),
                    &frame.pixels.to_gray(),
                    min_matches,
                )?;
                Ok(found.map(|p| Point::new(p.x + frame.origin.x, p.y + frame.origin.y)))
            }
        }
    }

    /// Poll until the trigger shows up or `timeout` runs out. Slow
    /// 1 s polling for long budgets, 100 ms for short ones.
    pub fn wait_until_visible(
        &mut self,
        trigger: &Trigger,
        timeout: Duration,
        on_timeout: OnTimeout,
    ) -> Result<Option<Point>, MatchError> {
        let poll = if timeout > Duration::from_secs(5) {
            Duration::from_secs(1)
        } else {
            Duration::from_millis(100)
        };
        let start = Instant::now();
        loop {
            if let Some(p) = self.locate(trigger)? {
                return Ok(Some(p));
            }
            if start.elapsed() >= timeout {
                break;
            }
            sleep::sleep_ms(poll.as_millis() as u64);
        }
        match on_timeout {
            OnTimeout::Carry => Ok(None),
            OnTimeout::GiveUp => Err(MatchError::Timeout(trigger.reference.to_string())),
        }
    }

    /// Score several references against one shared full-frame capture.
    /// A lost frame scores everything as the zero sentinel.
    pub fn best_of(
        &mut self,
        names: &[&'static str],
        grayscale: bool,
    ) -> Result<Vec<(f32, Point)>, MatchError> {
        for name in names {
            self.reference(name, grayscale)?;
        }
        let Some(frame) = self.frames.capture_full(grayscale) else {
            return Ok(names.iter().map(|_| (0.0, Point::ZERO)).collect());
        };
        Ok(names
            .iter()
            .map(|name| {
                let reference = &self.cache[&(name.to_string(), grayscale)];
                let m = matching::correlate(&reference.pixels, &frame.pixels);
                if m == Correlation::NONE {
                    (0.0, Point::ZERO)
                } else {
                    (m.score, m.centered(reference))
                }
            })
            .collect())
    }

    /// First pixel in `region` within `tolerance` of `rgb`, per channel.
    pub fn find_color(&mut self, region: Rect, rgb: (u8, u8, u8), tolerance: u8) -> Option<Point> {
        let frame = self.frames.capture_region(region, false)?;
        let (w, h) = (frame.pixels.width(), frame.pixels.height());
        for y in 0..h {
            for x in 0..w {
                if color_close(frame.rgb(x, y), rgb, tolerance) {
                    return Some(Point::new(
                        region.l + x as i32,
                        region.t + y as i32,
                    ));
                }
            }
        }
        None
    }

    pub fn check_color(&mut self, p: Point, rgb: (u8, u8, u8), tolerance: u8) -> bool {
        match self.frames.capture_region(Rect::new(p.x, p.y, 1, 1), false) {
            Some(frame) => color_close(frame.rgb(0, 0), rgb, tolerance),
            None => false,
        }
    }

    pub fn wait_until_color(
        &mut self,
        p: Point,
        rgb: (u8, u8, u8),
        tolerance: u8,
        timeout: Duration,
    ) -> bool {
        let start = Instant::now();
        loop {
            if self.check_color(p, rgb, tolerance) {
                return true;
            }
            if start.elapsed() >= timeout {
                return false;
            }
            sleep::sleep_ms(100);
        }
    }

    pub fn frames_mut(&mut self) -> &mut FrameSource {
        &mut self.frames
    }
}

fn color_close(a: (u8, u8, u8), b: (u8, u8, u8), tolerance: u8) -> bool {
    a.0.abs_diff(b.0) <= tolerance && a.1.abs_diff(b.1) <= tolerance && a.2.abs_diff(b.2) <= tolerance
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::stub::StubPlatform;
    use crate::platform::Platform;
    use image::RgbImage;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn noise_screen(seed: u64) -> RgbImage {
        let mut rng = StdRng::seed_from_u64(seed);
        RgbImage::from_fn(100, 100, |_, _| {
            image::Rgb([rng.gen(), rng.gen(), rng.gen()])
        })
    }

    fn perception_over(screen: RgbImage) -> Perception {
        let platform = StubPlatform::with_screen(screen);
        let frames = FrameSource::new(platform.open(1), false, "t");
        Perception::new(frames, Catalog::new("/nonexistent"))
    }

    fn block_reference() -> ReferenceImage {
        ReferenceImage {
            name: "block".into(),
            pixels: Pixels::Color(RgbImage::from_fn(10, 10, |x, y| {
                image::Rgb([((x * 25) % 256) as u8, ((y * 25) % 256) as u8, 200])
            })),
        }
    }

    fn screen_with_block() -> RgbImage {
        let mut screen = noise_screen(42);
        let block = block_reference();
        if let Pixels::Color(img) = &block.pixels {
            for y in 0..10 {
                for x in 0..10 {
                    screen.put_pixel(40 + x, 30 + y, *img.get_pixel(x, y));
                }
            }
        }
        screen
    }

    #[test]
    fn locates_block_centered_and_uncentered() {
        let mut p = perception_over(screen_with_block());
        p.insert_reference("block", false, block_reference());
        let trigger = Trigger::correlation("block", 0.9);
        assert_eq!(p.locate(&trigger).unwrap(), Some(Point::new(45, 35)));
        let raw = trigger.uncentered();
        assert_eq!(p.locate(&raw).unwrap(), Some(Point::new(40, 30)));
    }

    #[test]
    fn region_matches_map_back_to_window_coordinates() {
        let mut p = perception_over(screen_with_block());
        p.insert_reference("block", false, block_reference());
        let trigger = Trigger::correlation("block", 0.9)
            .in_region(Rect::new(20, 20, 60, 60))
            .uncentered();
        assert_eq!(p.locate(&trigger).unwrap(), Some(Point::new(40, 30)));
    }

    #[test]
    fn absent_reference_is_not_found_not_an_error() {
        let mut p = perception_over(noise_screen(43));
        p.insert_reference("block", false, block_reference());
        let trigger = Trigger::correlation("block", 0.9);
        assert_eq!(p.locate(&trigger).unwrap(), None);
    }

    #[test]
    fn short_wait_times_out_at_or_after_its_budget() {
        let mut p = perception_over(noise_screen(44));
        p.insert_reference("block", false, block_reference());
        let trigger = Trigger::correlation("block", 0.9);
        let start = Instant::now();
        let r = p.wait_until_visible(&trigger, Duration::from_secs(2), OnTimeout::Carry);
        assert_eq!(r.unwrap(), None);
        assert!(start.elapsed() >= Duration::from_secs(2));
    }

    #[test]
    fn give_up_policy_surfaces_a_timeout_error() {
        let mut p = perception_over(noise_screen(45));
        p.insert_reference("block", false, block_reference());
        let trigger = Trigger::correlation("block", 0.9);
        let r = p.wait_until_visible(&trigger, Duration::from_millis(200), OnTimeout::GiveUp);
        assert!(matches!(r, Err(MatchError::Timeout(_))));
    }

    fn stripe_reference() -> ReferenceImage {
        ReferenceImage {
            name: "stripe".into(),
            pixels: Pixels::Color(RgbImage::from_fn(10, 10, |x, _| {
                image::Rgb([30, ((x * 25) % 256) as u8, 60])
            })),
        }
    }

    #[test]
    fn best_of_scores_every_reference_against_one_frame() {
        let mut screen = screen_with_block();
        let stripe = stripe_reference();
        if let Pixels::Color(img) = &stripe.pixels {
            for y in 0..10 {
                for x in 0..10 {
                    screen.put_pixel(10 + x, 70 + y, *img.get_pixel(x, y));
                }
            }
        }
        let mut p = perception_over(screen);
        p.insert_reference("block", false, block_reference());
        p.insert_reference("stripe", false, stripe_reference());
        let scored = p.best_of(&["block", "stripe"], false).unwrap();
        assert_eq!(scored.len(), 2);
        assert!(scored[0].0 > 0.99, "block scored {}", scored[0].0);
        assert!(scored[1].0 > 0.99, "stripe scored {}", scored[1].0);
        assert_eq!(scored[0].1, Point::new(45, 35));
        assert_eq!(scored[1].1, Point::new(15, 75));
    }

    #[test]
    fn color_wait_returns_once_the_pixel_changes() {
        use std::sync::Arc;

        let mut screen = noise_screen(47);
        screen.put_pixel(5, 5, image::Rgb([0, 0, 0]));
        let platform = Arc::new(StubPlatform::with_screen(screen));
        let frames = FrameSource::new(platform.open(1), false, "t");
        let mut p = Perception::new(frames, Catalog::new("/nonexistent"));

        // misses while the pixel is still black
        assert!(!p.wait_until_color(
            Point::new(5, 5),
            (250, 10, 10),
            0,
            Duration::from_millis(300),
        ));

        let writer = Arc::clone(&platform);
        let swap = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(300));
            let mut screen = noise_screen(47);
            screen.put_pixel(5, 5, image::Rgb([250, 10, 10]));
            writer.set_screen(screen);
        });
        let start = Instant::now();
        assert!(p.wait_until_color(
            Point::new(5, 5),
            (250, 10, 10),
            0,
            Duration::from_secs(3),
        ));
        assert!(start.elapsed() >= Duration::from_millis(250));
        swap.join().unwrap();
    }

    #[test]
    fn color_probes_see_the_screen() {
        let mut screen = noise_screen(46);
        screen.put_pixel(70, 80, image::Rgb([10, 200, 30]));
        let mut p = perception_over(screen);
        let found = p.find_color(Rect::new(60, 70, 30, 30), (10, 200, 30), 0);
        assert_eq!(found, Some(Point::new(70, 80)));
        assert!(p.check_color(Point::new(70, 80), (12, 198, 32), 5));
        assert!(!p.check_color(Point::new(0, 0), (10, 200, 30), 0));
    }
}
