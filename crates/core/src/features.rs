use image::GrayImage;
use imageproc::corners::{corners_fast9, Corner};
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::error::MatchError;
use crate::types::Point;

const FAST_THRESHOLD: u8 = 20;
const PATCH_RADIUS: i32 = 15;
const DESCRIPTOR_BITS: usize = 256;

/// Nearest-to-second-nearest distance ratio below which a match is
/// considered unambiguous.
pub const MATCH_RATIO: f32 = 0.7;

/// Binary intensity-comparison descriptor anchored at a keypoint.
#[derive(Debug, Clone, Copy)]
pub struct Descriptor {
    pub bits: [u64; 4],
    pub at: Point,
}

fn hamming(a: &Descriptor, b: &Descriptor) -> u32 {
    a.bits
        .iter()
        .zip(&b.bits)
        .map(|(x, y)| (x ^ y).count_ones())
        .sum()
}

/// Fixed pseudo-random comparison pattern, shared by both sides of a
/// match so their bit layouts line up.
fn sampling_pattern() -> Vec<(i32, i32, i32, i32)> {
    let mut rng = StdRng::seed_from_u64(0x9e3779b97f4a7c15);
    (0..DESCRIPTOR_BITS)
        .map(|_| {
            (
                rng.gen_range(-PATCH_RADIUS..=PATCH_RADIUS),
                rng.gen_range(-PATCH_RADIUS..=PATCH_RADIUS),
                rng.gen_range(-PATCH_RADIUS..=PATCH_RADIUS),
                rng.gen_range(-PATCH_RADIUS..=PATCH_RADIUS),
            )
        })
        .collect()
}

/// Describe every corner far enough from the border for a full patch.
fn describe(img: &GrayImage, corners: &[Corner], pattern: &[(i32, i32, i32, i32)]) -> Vec<Descriptor> {
    let (w, h) = (img.width() as i32, img.height() as i32);
    corners
        .iter()
        .filter(|c| {
            let (x, y) = (c.x as i32, c.y as i32);
            x >= PATCH_RADIUS && y >= PATCH_RADIUS && x < w - PATCH_RADIUS && y < h - PATCH_RADIUS
        })
        .map(|c| {
            let (cx, cy) = (c.x as i32, c.y as i32);
            let mut bits = [0u64; 4];
            for (i, &(x1, y1, x2, y2)) in pattern.iter().enumerate() {
                let a = img.get_pixel((cx + x1) as u32, (cy + y1) as u32).0[0];
                let b = img.get_pixel((cx + x2) as u32, (cy + y2) as u32).0[0];
                if a < b {
                    bits[i / 64] |= 1 << (i % 64);
                }
            }
            Descriptor {
                bits,
                at: Point::new(cx, cy),
            }
        })
        .collect()
}

/// Two-nearest-neighbor matching with the ratio test: a query keeps its
/// best train descriptor only when clearly closer than the runner-up.
/// Returns accepted pairs sorted by distance, best first. Needs at
/// least two train descriptors to form a ratio.
pub fn ratio_matches(
    query: &[Descriptor],
    train: &[Descriptor],
    ratio: f32,
) -> Vec<(u32, Point)> {
    if train.len() < 2 {
        return Vec::new();
    }
    let mut accepted: Vec<(u32, Point)> = query
        .iter()
        .filter_map(|q| {
            let mut best = (u32::MAX, Point::ZERO);
            let mut second = u32::MAX;
            for t in train {
                let d = hamming(q, t);
                if d < best.0 {
                    second = best.0;
                    best = (d, t.at);
                } else if d < second {
                    second = d;
                }
            }
            if (best.0 as f32) < ratio * (second as f32) {
                Some(best)
            } else {
                None
            }
        })
        .collect();
    accepted.sort_by_key(|&(d, _)| d);
    accepted
}

/// Locate `reference` inside `frame` by keypoint matching. `Ok(None)`
/// means the evidence was too thin; `Err` means the inputs gave the
/// detector nothing to work with.
pub fn locate(
    reference: &GrayImage,
    frame: &GrayImage,
    min_matches: usize,
) -> Result<Option<Point>, MatchError> {
    let pattern = sampling_pattern();
    let ref_corners = corners_fast9(reference, FAST_THRESHOLD);
    let frame_corners = corners_fast9(frame, FAST_THRESHOLD);
    let ref_desc = describe(reference, &ref_corners, &pattern);
    let frame_desc = describe(frame, &frame_corners, &pattern);
    if ref_desc.is_empty() {
        return Err(MatchError::NoKeypoints("reference"));
    }
    if frame_desc.is_empty() {
        return Err(MatchError::NoKeypoints("frame"));
    }
    let accepted = ratio_matches(&ref_desc, &frame_desc, MATCH_RATIO);
    if accepted.len() > min_matches {
        Ok(Some(accepted[0].1))
    } else {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Rect;

    fn descriptor(ones: u32, at: Point) -> Descriptor {
        let mut bits = [0u64; 4];
        for i in 0..ones {
            bits[(i / 64) as usize] |= 1 << (i % 64);
        }
        Descriptor { bits, at }
    }

    #[test]
    fn weakening_the_ratio_never_drops_matches() {
        let query: Vec<Descriptor> = (0..8)
            .map(|i| descriptor(i * 3, Point::new(i as i32, 0)))
            .collect();
        let train: Vec<Descriptor> = (0..8)
            .map(|i| descriptor(i * 5 + 1, Point::new(0, i as i32)))
            .collect();
        let mut previous = 0;
        for ratio in [0.3, 0.5, 0.7, 0.9, 1.0] {
            let n = ratio_matches(&query, &train, ratio).len();
            assert!(n >= previous, "ratio {} gave {} < {}", ratio, n, previous);
            previous = n;
        }
    }

    #[test]
    fn accepted_matches_come_back_best_first() {
        let query = vec![descriptor(0, Point::ZERO), descriptor(40, Point::ZERO)];
        let train = vec![
            descriptor(0, Point::new(1, 1)),
            descriptor(40, Point::new(2, 2)),
            descriptor(200, Point::new(3, 3)),
        ];
        let accepted = ratio_matches(&query, &train, 0.7);
        assert_eq!(accepted.len(), 2);
        assert!(accepted[0].0 <= accepted[1].0);
        assert_eq!(accepted[0].1, Point::new(1, 1));
    }

    #[test]
    fn single_train_descriptor_cannot_form_a_ratio() {
        let query = vec![descriptor(0, Point::ZERO)];
        let train = vec![descriptor(0, Point::new(1, 1))];
        assert!(ratio_matches(&query, &train, 0.7).is_empty());
    }

    #[test]
    fn locates_a_pasted_patch_inside_noise() {
        use rand::{rngs::StdRng, Rng, SeedableRng};
        let mut rng = StdRng::seed_from_u64(99);
        let frame = GrayImage::from_fn(200, 150, |_, _| image::Luma([rng.gen()]));
        let reference = GrayImage::from_fn(60, 60, |x, y| *frame.get_pixel(80 + x, 60 + y));
        let found = locate(&reference, &frame, 3).unwrap();
        let p = found.expect("patch should be found");
        assert!(
            Rect::new(80, 60, 60, 60).contains(p),
            "matched at {:?}",
            p
        );
    }

    #[test]
    fn blank_reference_is_an_error() {
        let reference = GrayImage::new(64, 64);
        let mut rng = rand::rngs::StdRng::seed_from_u64(5);
        let frame = GrayImage::from_fn(100, 100, |_, _| image::Luma([rng.gen()]));
        assert!(matches!(
            locate(&reference, &frame, 3),
            Err(MatchError::NoKeypoints("reference"))
        ));
    }
}
