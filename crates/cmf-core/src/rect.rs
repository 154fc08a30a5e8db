//! Floating-point rectangle used for region-of-interest negotiation.
//!
//! Every pixel request travelling through a filter graph carries a
//! [`Rectangle`] describing which part of an image it is about. Nodes that
//! change image dimensions rescale the rectangle before delegating upstream,
//! fan-out nodes intersect it with their per-branch regions.
//!
//! # Units
//!
//! A rectangle is expressed either in absolute pixels of a specific image or
//! in relative units (0..1 per axis). Conversion is always explicit:
//!
//! ```rust
//! use cmf_core::Rectangle;
//!
//! let rel = Rectangle::new(0.25, 0.5, 0.5, 0.5);
//! let abs = rel.to_absolute(200.0, 100.0);
//! assert_eq!(abs, Rectangle::new(50.0, 50.0, 100.0, 50.0));
//! assert_eq!(abs.to_relative(200.0, 100.0), rel);
//! ```
//!
//! # Coordinate System
//!
//! ```text
//! (0,0) ────────► X
//!   │
//!   │   ┌──────────┐
//!   │   │   ROI    │
//!   │   └──────────┘
//!   ▼
//!   Y
//! ```
//!
//! # Emptiness
//!
//! [`Rectangle::count_points`] rounds both dimensions and multiplies them.
//! A result `<= 0` means "no pixels": recursion on such a region stops
//! without touching the producer.

use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in floating-point coordinates.
///
/// Width and height may be negative only to signal a flipped axis.
/// Rectangles are `Copy`; every computation owns its working copy.
///
/// # Example
///
/// ```rust
/// use cmf_core::Rectangle;
///
/// let mut roi = Rectangle::new(10.0, 10.0, 100.0, 100.0);
/// roi.trim(&Rectangle::new(0.0, 0.0, 50.0, 50.0));
/// assert_eq!(roi, Rectangle::new(10.0, 10.0, 40.0, 40.0));
/// assert_eq!(roi.count_points(), 1600);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rectangle {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Width, negative for a horizontally flipped region.
    pub width: f64,
    /// Height, negative for a vertically flipped region.
    pub height: f64,
}

impl Rectangle {
    /// Creates a rectangle from origin and size.
    #[inline]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle anchored at the origin.
    #[inline]
    pub const fn from_size(width: f64, height: f64) -> Self {
        Self::new(0.0, 0.0, width, height)
    }

    /// Rectangle covering a `width` x `height` pixel grid.
    #[inline]
    pub fn from_pixels(width: u32, height: u32) -> Self {
        Self::from_size(width as f64, height as f64)
    }

    /// Overwrites all four fields.
    #[inline]
    pub fn set_geo(&mut self, x: f64, y: f64, width: f64, height: f64) {
        *self = Self::new(x, y, width, height);
    }

    /// Copies geometry from another rectangle.
    #[inline]
    pub fn set_by(&mut self, other: &Rectangle) {
        *self = *other;
    }

    /// Right edge (exclusive).
    #[inline]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Bottom edge (exclusive).
    #[inline]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Same area with positive width and height.
    pub fn normalized(&self) -> Rectangle {
        let (x, width) = if self.width < 0.0 {
            (self.x + self.width, -self.width)
        } else {
            (self.x, self.width)
        };
        let (y, height) = if self.height < 0.0 {
            (self.y + self.height, -self.height)
        } else {
            (self.y, self.height)
        };
        Rectangle::new(x, y, width, height)
    }

    /// Clips `self` so that it lies within `boundary`.
    ///
    /// A rectangle that does not overlap the boundary collapses to zero
    /// width and/or height at the nearest boundary edge.
    pub fn trim(&mut self, boundary: &Rectangle) {
        let b = boundary.normalized();
        let s = self.normalized();

        let x0 = s.x.clamp(b.x, b.right());
        let y0 = s.y.clamp(b.y, b.bottom());
        let x1 = s.right().clamp(b.x, b.right());
        let y1 = s.bottom().clamp(b.y, b.bottom());

        self.set_geo(x0, y0, (x1 - x0).max(0.0), (y1 - y0).max(0.0));
    }

    /// Returns the overlap of both rectangles, empty when disjoint.
    pub fn intersection(&self, other: &Rectangle) -> Rectangle {
        let mut r = *self;
        r.trim(other);
        r
    }

    /// Smallest rectangle containing both. Empty inputs are ignored.
    pub fn union(&self, other: &Rectangle) -> Rectangle {
        if self.is_empty() {
            return other.normalized();
        }
        if other.is_empty() {
            return self.normalized();
        }
        let a = self.normalized();
        let b = other.normalized();
        let x = a.x.min(b.x);
        let y = a.y.min(b.y);
        Rectangle::new(x, y, a.right().max(b.right()) - x, a.bottom().max(b.bottom()) - y)
    }

    /// Number of pixels covered: `round(width) * round(height)`.
    ///
    /// Zero or negative means the region holds no work.
    #[inline]
    pub fn count_points(&self) -> i64 {
        self.width.round() as i64 * self.height.round() as i64
    }

    /// `true` if the rectangle has no pixels.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count_points() <= 0
    }

    /// `true` if the point lies inside (left/top inclusive).
    #[inline]
    pub fn contains(&self, px: f64, py: f64) -> bool {
        let r = self.normalized();
        px >= r.x && px < r.right() && py >= r.y && py < r.bottom()
    }

    /// Scales origin and size by the same factor.
    #[inline]
    pub fn scale(&mut self, factor: f64) {
        self.scale_xy(factor, factor);
    }

    /// Scales the horizontal and vertical axes independently.
    #[inline]
    pub fn scale_xy(&mut self, fx: f64, fy: f64) {
        self.x *= fx;
        self.width *= fx;
        self.y *= fy;
        self.height *= fy;
    }

    /// Returns a scaled copy.
    #[inline]
    pub fn scaled(&self, fx: f64, fy: f64) -> Rectangle {
        let mut r = *self;
        r.scale_xy(fx, fy);
        r
    }

    /// Snaps edges to the integer pixel grid.
    pub fn round(&mut self) {
        let x0 = self.x.round();
        let y0 = self.y.round();
        let x1 = self.right().round();
        let y1 = self.bottom().round();
        self.set_geo(x0, y0, x1 - x0, y1 - y0);
    }

    /// Smallest pixel-aligned rectangle containing this one.
    ///
    /// Edges within `1e-9` of a grid line count as on it, so integral
    /// rectangles come back unchanged.
    pub fn expanded_to_grid(&self) -> Rectangle {
        const EPS: f64 = 1e-9;
        let r = self.normalized();
        let x0 = (r.x + EPS).floor();
        let y0 = (r.y + EPS).floor();
        let x1 = (r.right() - EPS).ceil().max(x0);
        let y1 = (r.bottom() - EPS).ceil().max(y0);
        Rectangle::new(x0, y0, x1 - x0, y1 - y0)
    }

    /// Translates the origin.
    #[inline]
    pub fn translate(&self, dx: f64, dy: f64) -> Rectangle {
        Rectangle::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    /// Converts relative (0..1) units to absolute pixels of an image.
    #[inline]
    pub fn to_absolute(&self, image_width: f64, image_height: f64) -> Rectangle {
        self.scaled(image_width, image_height)
    }

    /// Converts absolute pixels of an image to relative (0..1) units.
    ///
    /// A zero-sized image yields an empty rectangle.
    pub fn to_relative(&self, image_width: f64, image_height: f64) -> Rectangle {
        if image_width == 0.0 || image_height == 0.0 {
            return Rectangle::default();
        }
        self.scaled(1.0 / image_width, 1.0 / image_height)
    }

    /// Integer pixel bounds `(x0, y0, x1, y1)` with exclusive end, after
    /// normalising and rounding.
    pub fn pixel_span(&self) -> (i64, i64, i64, i64) {
        let mut r = self.normalized();
        r.round();
        (
            r.x as i64,
            r.y as i64,
            (r.x + r.width) as i64,
            (r.y + r.height) as i64,
        )
    }
}

impl std::fmt::Display for Rectangle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Rectangle({}, {}, {}x{})",
            self.x, self.y, self.width, self.height
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_set_geo_and_copy() {
        let mut r = Rectangle::default();
        r.set_geo(1.0, 2.0, 3.0, 4.0);
        let mut c = Rectangle::default();
        c.set_by(&r);
        assert_eq!(c, Rectangle::new(1.0, 2.0, 3.0, 4.0));
    }

    #[test]
    fn test_trim_inside() {
        let mut r = Rectangle::new(10.0, 10.0, 20.0, 20.0);
        r.trim(&Rectangle::from_size(100.0, 100.0));
        assert_eq!(r, Rectangle::new(10.0, 10.0, 20.0, 20.0));
    }

    #[test]
    fn test_trim_partial() {
        let mut r = Rectangle::new(40.0, -10.0, 100.0, 50.0);
        r.trim(&Rectangle::new(50.0, 0.0, 50.0, 100.0));
        assert_eq!(r, Rectangle::new(50.0, 0.0, 50.0, 40.0));
    }

    #[test]
    fn test_trim_disjoint_is_empty() {
        let mut r = Rectangle::new(60.0, 0.0, 10.0, 10.0);
        r.trim(&Rectangle::new(0.0, 0.0, 50.0, 100.0));
        assert_eq!(r.count_points(), 0);
        assert!(r.is_empty());
    }

    #[test]
    fn test_count_points_rounds() {
        assert_eq!(Rectangle::new(0.0, 0.0, 2.4, 3.6).count_points(), 8);
        assert_eq!(Rectangle::new(0.0, 0.0, 0.4, 10.0).count_points(), 0);
        assert!(Rectangle::new(0.0, 0.0, -3.0, 2.0).count_points() < 0);
    }

    #[test]
    fn test_scale() {
        let mut r = Rectangle::new(10.0, 20.0, 30.0, 40.0);
        r.scale(0.5);
        assert_eq!(r, Rectangle::new(5.0, 10.0, 15.0, 20.0));
        let s = r.scaled(2.0, 3.0);
        assert_relative_eq!(s.width, 30.0);
        assert_relative_eq!(s.height, 60.0);
    }

    #[test]
    fn test_round() {
        let mut r = Rectangle::new(0.4, 0.6, 9.2, 9.8);
        r.round();
        assert_eq!(r, Rectangle::new(0.0, 1.0, 10.0, 9.0));
    }

    #[test]
    fn test_union() {
        let a = Rectangle::new(0.0, 0.0, 50.0, 100.0);
        let b = Rectangle::new(50.0, 0.0, 50.0, 100.0);
        assert_eq!(a.union(&b), Rectangle::from_size(100.0, 100.0));
        assert_eq!(a.union(&Rectangle::default()), a);
    }

    #[test]
    fn test_flipped_normalizes() {
        let r = Rectangle::new(10.0, 10.0, -10.0, -5.0);
        assert_eq!(r.normalized(), Rectangle::new(0.0, 5.0, 10.0, 5.0));
        assert!(r.contains(5.0, 7.0));
    }

    #[test]
    fn test_relative_roundtrip() {
        let abs = Rectangle::new(25.0, 10.0, 50.0, 20.0);
        let rel = abs.to_relative(100.0, 40.0);
        assert_relative_eq!(rel.x, 0.25);
        assert_relative_eq!(rel.height, 0.5);
        assert_eq!(Rectangle::new(1.0, 1.0, 1.0, 1.0).to_relative(0.0, 5.0), Rectangle::default());
    }

    #[test]
    fn test_pixel_span() {
        let r = Rectangle::new(1.2, 2.0, 3.6, 2.0);
        assert_eq!(r.pixel_span(), (1, 2, 5, 4));
    }

    #[test]
    fn test_expanded_to_grid() {
        let r = Rectangle::new(0.75, 0.75, 0.5, 0.5).expanded_to_grid();
        assert_eq!(r, Rectangle::new(0.0, 0.0, 1.0, 1.0));
        assert!(!r.is_empty());

        let exact = Rectangle::new(20.0, 20.0, 40.0, 20.0);
        assert_eq!(exact.expanded_to_grid(), exact);
        // float noise on an integral edge
        let noisy = Rectangle::new(0.1 * 3.0 * 10.0, 0.0, 3.0000000000004, 1.0);
        assert_eq!(noisy.expanded_to_grid(), Rectangle::new(3.0, 0.0, 3.0, 1.0));
    }
}
