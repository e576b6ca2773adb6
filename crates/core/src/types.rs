use image::{GrayImage, RgbImage};

/// Window identifier (HWND on Windows)
pub type WindowId = u64;

/// A point in window-relative client coordinates unless noted otherwise.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const ZERO: Point = Point { x: 0, y: 0 };

    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Rectangle in client coordinates, `l/t` inclusive with explicit size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub l: i32,
    pub t: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub fn new(l: i32, t: i32, w: i32, h: i32) -> Self {
        Self { l, t, w, h }
    }

    /// Build from two corner points.
    pub fn span(a: Point, b: Point) -> Self {
        Self {
            l: a.x.min(b.x),
            t: a.y.min(b.y),
            w: (b.x - a.x).abs(),
            h: (b.y - a.y).abs(),
        }
    }

    pub fn origin(&self) -> Point {
        Point::new(self.l, self.t)
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.l && p.x < self.l + self.w && p.y >= self.t && p.y < self.t + self.h
    }
}

/// Outer and client geometry of the target window, with the border
/// offsets that map client coordinates onto the outer frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowGeometry {
    /// Outer frame in screen coordinates.
    pub outer_l: i32,
    pub outer_t: i32,
    pub outer_w: i32,
    pub outer_h: i32,
    /// Client area size.
    pub client_w: i32,
    pub client_h: i32,
    /// Border thickness: left/right/bottom share `border_l`, the rest
    /// of the vertical slack (title bar) is `border_t`.
    pub border_l: i32,
    pub border_t: i32,
}

impl WindowGeometry {
    /// Derive border offsets from outer and client sizes. The side
    /// borders are assumed symmetric; the remainder sits on top.
    pub fn with_borders(outer: (i32, i32, i32, i32), client: (i32, i32)) -> Self {
        let (outer_l, outer_t, outer_w, outer_h) = outer;
        let (client_w, client_h) = client;
        let border_l = (outer_w - client_w) / 2;
        let border_t = (outer_h - client_h) - border_l;
        Self {
            outer_l,
            outer_t,
            outer_w,
            outer_h,
            client_w,
            client_h,
            border_l,
            border_t,
        }
    }

    pub fn client_rect(&self) -> Rect {
        Rect::new(0, 0, self.client_w, self.client_h)
    }
}

/// Decoded pixel data, one or three channels.
#[derive(Debug, Clone)]
pub enum Pixels {
    Gray(GrayImage),
    Color(RgbImage),
}

impl Pixels {
    pub fn width(&self) -> u32 {
        match self {
            Pixels::Gray(img) => img.width(),
            Pixels::Color(img) => img.width(),
        }
    }

    pub fn height(&self) -> u32 {
        match self {
            Pixels::Gray(img) => img.height(),
            Pixels::Color(img) => img.height(),
        }
    }

    pub fn channels(&self) -> u32 {
        match self {
            Pixels::Gray(_) => 1,
            Pixels::Color(_) => 3,
        }
    }

    /// Raw samples in row-major interleaved order.
    pub fn samples(&self) -> &[u8] {
        match self {
            Pixels::Gray(img) => img.as_raw(),
            Pixels::Color(img) => img.as_raw(),
        }
    }

    pub fn to_gray(&self) -> GrayImage {
        match self {
            Pixels::Gray(img) => img.clone(),
            Pixels::Color(img) => image::DynamicImage::ImageRgb8(img.clone()).into_luma8(),
        }
    }
}

/// One captured frame, tagged with the client-area rectangle it came from
/// so coordinates found in it can be mapped back to the window.
#[derive(Debug, Clone)]
pub struct Frame {
    pub pixels: Pixels,
    pub origin: Point,
}

impl Frame {
    pub fn new(pixels: Pixels, origin: Point) -> Self {
        Self { pixels, origin }
    }

    pub fn rgb(&self, x: u32, y: u32) -> (u8, u8, u8) {
        match &self.pixels {
            Pixels::Gray(img) => {
                let v = img.get_pixel(x, y).0[0];
                (v, v, v)
            }
            Pixels::Color(img) => {
                let p = img.get_pixel(x, y).0;
                (p[0], p[1], p[2])
            }
        }
    }
}

/// A reference image the bot looks for inside frames.
#[derive(Debug, Clone)]
pub struct ReferenceImage {
    pub name: String,
    pub pixels: Pixels,
}

impl ReferenceImage {
    /// Center offset added to a raw top-left match location.
    pub fn center_offset(&self) -> Point {
        Point::new(
            (self.pixels.width() / 2) as i32,
            (self.pixels.height() / 2) as i32,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn borders_split_outer_client_difference() {
        // 1000x800 outer around a 980x760 client: 10 px sides, 30 px top.
        let g = WindowGeometry::with_borders((50, 60, 1000, 800), (980, 760));
        assert_eq!(g.border_l, 10);
        assert_eq!(g.border_t, 30);
    }

    #[test]
    fn rect_span_normalizes_corners() {
        let r = Rect::span(Point::new(40, 90), Point::new(10, 20));
        assert_eq!(r, Rect::new(10, 20, 30, 70));
        assert!(r.contains(Point::new(10, 20)));
        assert!(!r.contains(Point::new(40, 90)));
    }

    #[test]
    fn center_offset_truncates() {
        let reference = ReferenceImage {
            name: "x".into(),
            pixels: Pixels::Gray(GrayImage::new(9, 5)),
        };
        assert_eq!(reference.center_offset(), Point::new(4, 2));
    }
}
