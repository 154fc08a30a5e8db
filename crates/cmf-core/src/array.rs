//! Backing pixel buffer filled by graph requests.
//!
//! A [`PixelArray`] covers a rectangle of some image's pixel grid and holds
//! interleaved `f32` samples. Graph nodes write into it at absolute grid
//! coordinates; writes outside the covered rectangle are dropped.
//!
//! Storage is allocated on first write, so an array that no request touched
//! stays unallocated and can be told apart from a zero-filled one.
//!
//! # Focus window
//!
//! The focus is a bookkeeping view: it names the sub-block currently being
//! addressed without moving or copying samples.
//!
//! ```rust
//! use cmf_core::{PixelArray, Rectangle};
//!
//! let mut array = PixelArray::new(Rectangle::from_size(8.0, 8.0), 3);
//! array.set_focus(Rectangle::new(4.0, 0.0, 4.0, 8.0));
//! assert_eq!(array.focus_offset(), (4, 0));
//! array.reset_focus();
//! assert_eq!(array.focus(), array.bounds());
//! assert!(!array.is_allocated());
//! ```

use crate::{DataType, Error, Image, Rectangle, Result};

/// Interleaved `f32` sample buffer over a rectangle of a pixel grid.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelArray {
    origin_x: i64,
    origin_y: i64,
    width: u32,
    height: u32,
    channels: u32,
    data: Vec<f32>,
    focus: Rectangle,
    written: u64,
}

impl PixelArray {
    /// Creates an unallocated array covering `bounds` (rounded to pixels).
    pub fn new(bounds: Rectangle, channels: u32) -> Self {
        let (x0, y0, x1, y1) = bounds.pixel_span();
        let width = (x1 - x0).max(0) as u32;
        let height = (y1 - y0).max(0) as u32;
        Self {
            origin_x: x0,
            origin_y: y0,
            width,
            height,
            channels,
            data: Vec::new(),
            focus: Rectangle::new(x0 as f64, y0 as f64, width as f64, height as f64),
            written: 0,
        }
    }

    /// Covered rectangle in grid coordinates.
    #[inline]
    pub fn bounds(&self) -> Rectangle {
        Rectangle::new(
            self.origin_x as f64,
            self.origin_y as f64,
            self.width as f64,
            self.height as f64,
        )
    }

    /// Array width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Array height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Samples per pixel.
    #[inline]
    pub fn channels(&self) -> u32 {
        self.channels
    }

    /// Whether any write has allocated storage yet.
    #[inline]
    pub fn is_allocated(&self) -> bool {
        !self.data.is_empty()
    }

    /// Number of pixel writes accepted so far (overlaps counted again).
    #[inline]
    pub fn written_points(&self) -> u64 {
        self.written
    }

    /// Raw samples, empty while unallocated.
    #[inline]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Current view window.
    #[inline]
    pub fn focus(&self) -> Rectangle {
        self.focus
    }

    /// Narrows the view window to `rect`, clipped to the array bounds.
    pub fn set_focus(&mut self, rect: Rectangle) {
        let mut f = rect;
        f.trim(&self.bounds());
        self.focus = f;
    }

    /// Restores the view window to the whole array.
    pub fn reset_focus(&mut self) {
        self.focus = self.bounds();
    }

    /// Offset of the focus origin inside the buffer, in pixels.
    pub fn focus_offset(&self) -> (i64, i64) {
        let (fx, fy, _, _) = self.focus.pixel_span();
        (fx - self.origin_x, fy - self.origin_y)
    }

    fn ensure_allocated(&mut self) {
        if self.data.is_empty() {
            let len = self.width as usize * self.height as usize * self.channels as usize;
            self.data = vec![0.0; len];
        }
    }

    fn index(&self, x: i64, y: i64) -> Option<usize> {
        let lx = x - self.origin_x;
        let ly = y - self.origin_y;
        if lx < 0 || ly < 0 || lx >= self.width as i64 || ly >= self.height as i64 {
            return None;
        }
        Some((ly as usize * self.width as usize + lx as usize) * self.channels as usize)
    }

    /// Pixel at grid coordinates, `None` outside or while unallocated.
    pub fn get(&self, x: i64, y: i64) -> Option<&[f32]> {
        let idx = self.index(x, y)?;
        self.data.get(idx..idx + self.channels as usize)
    }

    /// Writes a pixel at grid coordinates. Missing channels stay untouched.
    ///
    /// Returns `false` if the point lies outside the array.
    pub fn set(&mut self, x: i64, y: i64, pixel: &[f32]) -> bool {
        let Some(idx) = self.index(x, y) else {
            return false;
        };
        self.ensure_allocated();
        let n = pixel.len().min(self.channels as usize);
        self.data[idx..idx + n].copy_from_slice(&pixel[..n]);
        self.written += 1;
        true
    }

    /// Mutable samples of the pixels in `region` (clipped), row by row.
    ///
    /// The closure receives grid `y`, grid `x0` and the row slice.
    pub fn for_each_row_mut<F>(&mut self, region: &Rectangle, mut f: F) -> u64
    where
        F: FnMut(i64, i64, &mut [f32]),
    {
        let clipped = region.intersection(&self.bounds());
        if clipped.is_empty() {
            return 0;
        }
        self.ensure_allocated();
        let (x0, y0, x1, y1) = clipped.pixel_span();
        let ch = self.channels as usize;
        let row_len = self.width as usize * ch;
        for y in y0..y1 {
            let ly = (y - self.origin_y) as usize;
            let start = ly * row_len + (x0 - self.origin_x) as usize * ch;
            let end = start + (x1 - x0) as usize * ch;
            f(y, x0, &mut self.data[start..end]);
        }
        let count = ((x1 - x0) * (y1 - y0)) as u64;
        self.written += count;
        count
    }

    /// Origin, row length in samples and the whole buffer, for parallel fills.
    pub(crate) fn rows_mut(&mut self) -> (i64, i64, usize, &mut [f32]) {
        self.ensure_allocated();
        let row_len = self.width as usize * self.channels as usize;
        (self.origin_x, self.origin_y, row_len, &mut self.data)
    }

    pub(crate) fn add_written(&mut self, n: u64) {
        self.written += n;
    }

    /// Sets every sample of every pixel to `value`.
    pub fn fill(&mut self, value: f32) {
        self.ensure_allocated();
        self.data.iter_mut().for_each(|s| *s = value);
        self.written += self.width as u64 * self.height as u64;
    }

    /// Copies the array into an image of its own size.
    pub fn to_image(&self, data_type: DataType) -> Result<Image> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::InvalidRegion(self.bounds()));
        }
        let data = if self.is_allocated() {
            self.data.clone()
        } else {
            vec![0.0; self.width as usize * self.height as usize * self.channels as usize]
        };
        Ok(Image::from_data(self.width, self.height, self.channels, data)?.with_data_type(data_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lazy_allocation() {
        let mut a = PixelArray::new(Rectangle::new(10.0, 10.0, 4.0, 4.0), 3);
        assert!(!a.is_allocated());
        assert!(a.get(10, 10).is_none());
        assert!(a.set(11, 12, &[1.0, 2.0, 3.0]));
        assert!(a.is_allocated());
        assert_eq!(a.get(11, 12), Some(&[1.0, 2.0, 3.0][..]));
        assert_eq!(a.get(10, 10), Some(&[0.0, 0.0, 0.0][..]));
        assert!(!a.set(0, 0, &[1.0, 1.0, 1.0]));
        assert_eq!(a.written_points(), 1);
    }

    #[test]
    fn test_row_iteration_clips() {
        let mut a = PixelArray::new(Rectangle::from_size(4.0, 4.0), 1);
        let n = a.for_each_row_mut(&Rectangle::new(2.0, 2.0, 10.0, 10.0), |_, _, row| {
            row.iter_mut().for_each(|s| *s = 7.0);
        });
        assert_eq!(n, 4);
        assert_eq!(a.get(3, 3), Some(&[7.0][..]));
        assert_eq!(a.get(1, 3), Some(&[0.0][..]));
    }

    #[test]
    fn test_focus_is_clipped() {
        let mut a = PixelArray::new(Rectangle::from_size(4.0, 4.0), 1);
        a.set_focus(Rectangle::new(2.0, 2.0, 10.0, 10.0));
        assert_eq!(a.focus(), Rectangle::new(2.0, 2.0, 2.0, 2.0));
        assert_eq!(a.focus_offset(), (2, 2));
    }

    #[test]
    fn test_to_image() {
        let mut a = PixelArray::new(Rectangle::from_size(2.0, 1.0), 2);
        a.set(1, 0, &[0.5, 0.25]);
        let img = a.to_image(DataType::Float).unwrap();
        assert_eq!(img.point(1, 0), Some(&[0.5, 0.25][..]));

        let empty = PixelArray::new(Rectangle::new(3.0, 3.0, 0.0, 5.0), 1);
        assert!(matches!(
            empty.to_image(DataType::Float),
            Err(Error::InvalidRegion(_))
        ));
    }
}
