//! Pixel access tickets.
//!
//! A [`PixelAccess`] describes one pull request: which rectangle of the
//! output image is wanted and where the fill cursor stands. The pixels
//! themselves go into a separate [`PixelArray`](cmf_core::PixelArray) that
//! is passed beside the ticket by `&mut`, in the grid of the ticket's
//! output image.
//!
//! # Protocol
//!
//! A node's `run`:
//!
//! 1. maps the cursor into its native grid with [`PixelAccess::native_start`]
//!    and takes the pixels to produce from [`PixelAccess::work_roi`];
//! 2. a leaf serves a single point directly when the ticket steps one pixel
//!    at a time and the cursor lies inside its native bounds;
//! 3. otherwise the work rectangle is filled in bulk. Single-producer nodes
//!    forward it, rescaled by `producer / local` size. Fan-out nodes
//!    [`fork`](PixelAccess::fork) the ticket per branch, trim each branch
//!    region against the request and skip branches without points.
//!
//! The output node advances the cursor with
//! [`PixelAccess::calculate_next_start_pixel`] after each pull. Once past
//! the end of the region, further runs report
//! [`Status::Terminal`](crate::Status::Terminal).
//!
//! ```rust
//! use std::sync::Arc;
//! use cmf_core::{Image, Rectangle};
//! use cmf_graph::{AccessMode, NodeId, PixelAccess, PlugRef};
//!
//! let out = Arc::new(Image::descriptor(4, 2, 3));
//! let mut t = PixelAccess::new(0.0, 0.0, PlugRef::new(NodeId(1), 0), AccessMode::Pixels(2), out);
//! assert_eq!(t.work_roi(), Rectangle::new(0.0, 0.0, 2.0, 1.0));
//! t.calculate_next_start_pixel();
//! t.calculate_next_start_pixel();
//! assert_eq!(t.start_xy(), (0.0, 1.0));
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use cmf_core::{Image, Rectangle};
use tracing::trace;

use crate::node::PlugRef;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn next_id() -> u64 {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

/// How a ticket walks its region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// The whole region in one pull.
    Region,
    /// `n` pixels along the current scanline per pull.
    Pixels(usize),
}

/// Per-request state threaded through `run` calls.
///
/// Cloning keeps the identity; [`PixelAccess::fork`] makes a new one.
#[derive(Debug, Clone)]
pub struct PixelAccess {
    id: u64,
    start_x: f64,
    start_y: f64,
    mode: AccessMode,
    anchor: PlugRef,
    output_image: Arc<Image>,
    output_image_roi: Rectangle,
    pub(crate) depth: usize,
    exhausted: bool,
}

impl PixelAccess {
    /// Ticket over the whole output image, cursor at `(start_x, start_y)`.
    ///
    /// `Pixels(0)` is treated as `Pixels(1)`.
    pub fn new(
        start_x: f64,
        start_y: f64,
        anchor: PlugRef,
        mode: AccessMode,
        output_image: Arc<Image>,
    ) -> Self {
        let mode = match mode {
            AccessMode::Pixels(0) => AccessMode::Pixels(1),
            m => m,
        };
        Self {
            id: next_id(),
            start_x,
            start_y,
            mode,
            anchor,
            output_image_roi: output_image.bounds(),
            output_image,
            depth: 0,
            exhausted: false,
        }
    }

    /// Builder: restricts the request to `roi` and moves the cursor to its origin.
    pub fn with_roi(mut self, roi: Rectangle) -> Self {
        self.set_roi(roi);
        self.rewind();
        self
    }

    /// Ticket identity.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Cursor in output image pixels.
    pub fn start_xy(&self) -> (f64, f64) {
        (self.start_x, self.start_y)
    }

    /// Moves the cursor.
    pub fn set_start(&mut self, x: f64, y: f64) {
        self.start_x = x;
        self.start_y = y;
    }

    /// Pixels requested per pull: `n` when stepping, the region size otherwise.
    pub fn pixels_n(&self) -> usize {
        match self.mode {
            AccessMode::Pixels(n) => n,
            AccessMode::Region => self.output_image_roi.count_points().max(0) as usize,
        }
    }

    /// Iteration mode.
    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    /// Plug the request was issued for.
    pub fn anchor(&self) -> PlugRef {
        self.anchor
    }

    /// Image whose grid the region and array use.
    pub fn output_image(&self) -> &Arc<Image> {
        &self.output_image
    }

    /// Requested region in the output image grid.
    pub fn output_image_roi(&self) -> Rectangle {
        self.output_image_roi
    }

    /// Replaces the requested region. The cursor is left alone.
    pub fn set_roi(&mut self, roi: Rectangle) {
        self.output_image_roi = roi;
    }

    /// Current nesting depth.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Whether the cursor has passed the end of the region.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Moves the cursor back to the region origin.
    pub fn rewind(&mut self) {
        let r = self.output_image_roi.normalized();
        self.start_x = r.x;
        self.start_y = r.y;
        self.exhausted = false;
    }

    /// Copy with a new identity and region `roi`, same output image.
    pub fn fork(&self, roi: Rectangle) -> Self {
        let mut t = self.clone();
        t.id = next_id();
        t.output_image_roi = roi;
        trace!(parent = self.id, child = t.id, %roi, "ticket forked");
        t
    }

    /// Region-mode copy addressing another image grid, for nodes that
    /// change size. The cursor moves to the origin of `roi`.
    pub fn fork_into(&self, output_image: Arc<Image>, roi: Rectangle) -> Self {
        let mut t = self.fork(roi);
        t.output_image = output_image;
        t.mode = AccessMode::Region;
        t.rewind();
        t
    }

    /// Pixels the current pull has to produce.
    ///
    /// The whole region in [`AccessMode::Region`], otherwise the next `n`
    /// pixels of the current scanline clipped to the region.
    pub fn work_roi(&self) -> Rectangle {
        match self.mode {
            AccessMode::Region => self.output_image_roi,
            AccessMode::Pixels(n) => Rectangle::new(
                self.start_x.floor(),
                self.start_y.floor(),
                n as f64,
                1.0,
            )
            .intersection(&self.output_image_roi),
        }
    }

    /// Cursor mapped into a `width` x `height` native grid.
    pub fn native_start(&self, width: u32, height: u32) -> (i64, i64) {
        let ow = self.output_image.width().max(1) as f64;
        let oh = self.output_image.height().max(1) as f64;
        (
            (self.start_x * width as f64 / ow).floor() as i64,
            (self.start_y * height as f64 / oh).floor() as i64,
        )
    }

    /// Advances the cursor past the pixels of the current pull.
    ///
    /// Steps `n` pixels along the scanline and wraps to the next row at the
    /// right edge. Region tickets, and stepping tickets leaving the last
    /// row, become exhausted.
    pub fn calculate_next_start_pixel(&mut self) {
        let r = self.output_image_roi.normalized();
        match self.mode {
            AccessMode::Region => self.exhausted = true,
            AccessMode::Pixels(n) => {
                self.start_x += n as f64;
                if self.start_x >= r.right() {
                    self.start_x = r.x;
                    self.start_y += 1.0;
                }
                if self.start_y >= r.bottom() {
                    self.exhausted = true;
                }
            }
        }
        trace!(
            ticket = self.id,
            x = self.start_x,
            y = self.start_y,
            exhausted = self.exhausted,
            "next start pixel"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeId;

    fn ticket(mode: AccessMode) -> PixelAccess {
        let out = Arc::new(Image::descriptor(10, 4, 3));
        PixelAccess::new(0.0, 0.0, PlugRef::new(NodeId(0), 0), mode, out)
    }

    #[test]
    fn test_defaults_cover_output() {
        let t = ticket(AccessMode::Region);
        assert_eq!(t.output_image_roi(), Rectangle::from_size(10.0, 4.0));
        assert_eq!(t.pixels_n(), 40);
        assert_eq!(ticket(AccessMode::Pixels(0)).mode(), AccessMode::Pixels(1));
    }

    #[test]
    fn test_fork_is_independent() {
        let t = ticket(AccessMode::Region);
        let mut a = t.fork(Rectangle::new(0.0, 0.0, 5.0, 4.0));
        let b = t.fork(Rectangle::new(5.0, 0.0, 5.0, 4.0));
        a.set_roi(Rectangle::default());
        assert_ne!(a.id(), t.id());
        assert_ne!(a.id(), b.id());
        assert_eq!(t.output_image_roi(), Rectangle::from_size(10.0, 4.0));
        assert_eq!(b.output_image_roi(), Rectangle::new(5.0, 0.0, 5.0, 4.0));
    }

    #[test]
    fn test_scanline_stepping_wraps() {
        let mut t = ticket(AccessMode::Pixels(4)).with_roi(Rectangle::new(2.0, 1.0, 6.0, 2.0));
        assert_eq!(t.work_roi(), Rectangle::new(2.0, 1.0, 4.0, 1.0));
        t.calculate_next_start_pixel();
        // clipped at the right edge
        assert_eq!(t.work_roi(), Rectangle::new(6.0, 1.0, 2.0, 1.0));
        t.calculate_next_start_pixel();
        assert_eq!(t.start_xy(), (2.0, 2.0));
        t.calculate_next_start_pixel();
        t.calculate_next_start_pixel();
        assert!(t.is_exhausted());
    }

    #[test]
    fn test_region_mode_exhausts_after_one_pull() {
        let mut t = ticket(AccessMode::Region);
        assert!(!t.is_exhausted());
        t.calculate_next_start_pixel();
        assert!(t.is_exhausted());
        t.rewind();
        assert!(!t.is_exhausted());
    }

    #[test]
    fn test_native_start_scales() {
        let mut t = ticket(AccessMode::Pixels(1));
        t.set_start(5.0, 2.0);
        assert_eq!(t.native_start(20, 8), (10, 4));
        assert_eq!(t.native_start(5, 2), (2, 1));
    }

    #[test]
    fn test_fork_into_switches_grid() {
        let t = ticket(AccessMode::Pixels(1));
        let big = Arc::new(Image::descriptor(20, 8, 3));
        let f = t.fork_into(big, Rectangle::new(4.0, 2.0, 2.0, 2.0));
        assert_eq!(f.mode(), AccessMode::Region);
        assert_eq!(f.start_xy(), (4.0, 2.0));
        assert_eq!(f.output_image().width(), 20);
    }
}
