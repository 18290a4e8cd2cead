//! Core geometry types in image coordinates.

use serde::{Deserialize, Serialize};

/// A 2D point in image (or device) coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Calculate distance to another point.
    pub fn distance_to(&self, other: &Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Check that both coordinates are finite numbers.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// An axis-aligned rectangle: top-left corner plus size.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Create the rectangle spanned by two corner points, in any order.
    pub fn from_corners(p1: Point, p2: Point) -> Self {
        Self {
            left: p1.x.min(p2.x),
            top: p1.y.min(p2.y),
            width: (p1.x - p2.x).abs(),
            height: (p1.y - p2.y).abs(),
        }
    }

    pub fn right(&self) -> f32 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.top + self.height
    }

    pub fn top_left(&self) -> Point {
        Point::new(self.left, self.top)
    }

    pub fn top_right(&self) -> Point {
        Point::new(self.right(), self.top)
    }

    pub fn bottom_left(&self) -> Point {
        Point::new(self.left, self.bottom())
    }

    pub fn bottom_right(&self) -> Point {
        Point::new(self.right(), self.bottom())
    }

    /// Get the center point of the rectangle.
    pub fn center(&self) -> Point {
        Point::new(self.left + self.width / 2.0, self.top + self.height / 2.0)
    }

    /// Check if a point is inside the rectangle (edges inclusive).
    pub fn contains(&self, point: &Point) -> bool {
        point.x >= self.left
            && point.x <= self.right()
            && point.y >= self.top
            && point.y <= self.bottom()
    }

    /// True if the rectangle satisfies the minimum size and lies inside the image.
    pub fn is_valid_within(&self, bounds: ImageSize, min_size: f32) -> bool {
        let (w, h) = bounds.extent();
        self.width >= min_size
            && self.height >= min_size
            && self.left >= 0.0
            && self.top >= 0.0
            && self.right() <= w
            && self.bottom() <= h
    }
}

/// Pixel dimensions of an image.
///
/// Zero dimensions mean "not known yet". Geometry that needs an extent falls back to a
/// 1x1 space instead of failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Whether real dimensions have arrived from the image loader.
    pub fn is_known(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Width and height as floats, with the degenerate 1x1 fallback.
    pub fn extent(&self) -> (f32, f32) {
        if self.is_known() {
            (self.width as f32, self.height as f32)
        } else {
            (1.0, 1.0)
        }
    }
}
