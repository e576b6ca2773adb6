use std::path::Path;

use rayon::prelude::*;

use crate::error::MatchError;
use crate::types::*;

/// Correlation scan result. `location` is the template's top-left in
/// frame coordinates; a zero score with a zero location is the sentinel
/// for "nothing usable", which no threshold accepts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Correlation {
    pub score: f32,
    pub location: Point,
}

impl Correlation {
    pub const NONE: Correlation = Correlation {
        score: 0.0,
        location: Point::ZERO,
    };

    /// Shift the raw top-left to the template center.
    pub fn centered(&self, reference: &ReferenceImage) -> Point {
        let c = reference.center_offset();
        Point::new(self.location.x + c.x, self.location.y + c.y)
    }
}

/// Load a reference image from disk, decoded to the channel layout the
/// caller matches in.
pub fn load_reference(path: &Path, grayscale: bool) -> Result<ReferenceImage, MatchError> {
    let img = image::open(path).map_err(|source| MatchError::ReferenceUnreadable {
        path: path.to_path_buf(),
        source,
    })?;
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let pixels = if grayscale {
        Pixels::Gray(img.into_luma8())
    } else {
        Pixels::Color(img.into_rgb8())
    };
    Ok(ReferenceImage { name, pixels })
}

/// Normalized cross-correlation scan of `template` over `scene`, both
/// mean-subtracted per window (channels scored jointly). Degenerate
/// inputs (size or channel mismatch, flat template) yield the sentinel.
pub fn correlate(template: &Pixels, scene: &Pixels) -> Correlation {
    let (tw, th, tc) = (template.width(), template.height(), template.channels());
    let (sw, sh, sc) = (scene.width(), scene.height(), scene.channels());
    if tc != sc || tw == 0 || th == 0 || tw > sw || th > sh {
        return Correlation::NONE;
    }

    let t = template.samples();
    let s = scene.samples();
    let n = (tw * th * tc) as f64;

    let t_mean = t.iter().map(|&v| v as f64).sum::<f64>() / n;
    let t_zm: Vec<f64> = t.iter().map(|&v| v as f64 - t_mean).collect();
    let t_norm_sq: f64 = t_zm.iter().map(|v| v * v).sum();
    if t_norm_sq <= f64::EPSILON {
        return Correlation::NONE;
    }

    let scene_stride = (sw * sc) as usize;
    let t_stride = (tw * tc) as usize;
    let row_len = t_stride;

    let best = (0..=(sh - th))
        .into_par_iter()
        .map(|y| {
            let mut row_best = (f64::NEG_INFINITY, 0u32);
            for x in 0..=(sw - tw) {
                let mut dot = 0.0f64;
                let mut sum = 0.0f64;
                let mut sum_sq = 0.0f64;
                for ty in 0..th {
                    let srow =
                        &s[(y + ty) as usize * scene_stride + (x * sc) as usize..][..row_len];
                    let trow = &t_zm[(ty as usize) * t_stride..][..row_len];
                    for (sv, tv) in srow.iter().zip(trow) {
                        let sv = *sv as f64;
                        dot += sv * tv;
                        sum += sv;
                        sum_sq += sv * sv;
                    }
                }
                let window_var = sum_sq - sum * sum / n;
                if window_var <= f64::EPSILON {
                    continue;
                }
                let score = dot / (window_var * t_norm_sq).sqrt();
                if score > row_best.0 {
                    row_best = (score, x);
                }
            }
            (row_best.0, row_best.1, y)
        })
        .reduce(
            || (f64::NEG_INFINITY, 0, 0),
            |a, b| {
                // strict comparison keeps the topmost row on ties
                if b.0 > a.0 || (b.0 == a.0 && b.2 < a.2) {
                    b
                } else {
                    a
                }
            },
        );

    if best.0.is_finite() {
        Correlation {
            score: best.0 as f32,
            location: Point::new(best.1 as i32, best.2 as i32),
        }
    } else {
        Correlation::NONE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, RgbImage};
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn noise_gray(w: u32, h: u32, seed: u64) -> GrayImage {
        let mut rng = StdRng::seed_from_u64(seed);
        GrayImage::from_fn(w, h, |_, _| image::Luma([rng.gen()]))
    }

    fn crop(img: &GrayImage, l: u32, t: u32, w: u32, h: u32) -> GrayImage {
        GrayImage::from_fn(w, h, |x, y| *img.get_pixel(l + x, t + y))
    }

    #[test]
    fn exact_crop_scores_near_one_at_its_offset() {
        let scene = noise_gray(60, 40, 7);
        let template = crop(&scene, 17, 9, 12, 8);
        let m = correlate(&Pixels::Gray(template), &Pixels::Gray(scene));
        assert_eq!(m.location, Point::new(17, 9));
        assert!(m.score > 0.99, "score {}", m.score);
    }

    #[test]
    fn color_crop_matches_jointly_across_channels() {
        let mut rng = StdRng::seed_from_u64(11);
        let scene = RgbImage::from_fn(50, 30, |_, _| image::Rgb([rng.gen(), rng.gen(), rng.gen()]));
        let template = RgbImage::from_fn(10, 6, |x, y| *scene.get_pixel(23 + x, 14 + y));
        let m = correlate(&Pixels::Color(template), &Pixels::Color(scene));
        assert_eq!(m.location, Point::new(23, 14));
        assert!(m.score > 0.99);
    }

    #[test]
    fn oversized_template_degrades_to_sentinel() {
        let scene = noise_gray(20, 20, 1);
        let template = noise_gray(30, 10, 2);
        assert_eq!(
            correlate(&Pixels::Gray(template), &Pixels::Gray(scene)),
            Correlation::NONE
        );
    }

    #[test]
    fn channel_mismatch_degrades_to_sentinel() {
        let scene = noise_gray(20, 20, 1);
        let template = RgbImage::new(5, 5);
        assert_eq!(
            correlate(&Pixels::Color(template), &Pixels::Gray(scene)),
            Correlation::NONE
        );
    }

    #[test]
    fn flat_template_degrades_to_sentinel() {
        let scene = noise_gray(20, 20, 3);
        let template = GrayImage::from_pixel(5, 5, image::Luma([128]));
        assert_eq!(
            correlate(&Pixels::Gray(template), &Pixels::Gray(scene)),
            Correlation::NONE
        );
    }

    #[test]
    fn centering_adds_half_template_size_truncated() {
        let reference = ReferenceImage {
            name: "r".into(),
            pixels: Pixels::Gray(GrayImage::new(11, 7)),
        };
        let m = Correlation {
            score: 1.0,
            location: Point::new(40, 30),
        };
        assert_eq!(m.centered(&reference), Point::new(45, 33));
    }
}
