//! Image descriptors and sample storage.
//!
//! An [`Image`] always knows its dimensions, channel count and native
//! [`DataType`]. Samples are optional:
//!
//! - in-memory images carry normalised `f32` samples,
//! - file-backed images ([`Image::open`]) read only the header up front
//!   and load the raster on first access,
//! - descriptors ([`Image::descriptor`]) never hold samples. Conversions
//!   use them to describe the geometry of an output.
//!
//! # Memory Layout
//!
//! Samples are stored **row-major**, top-to-bottom, channels interleaved:
//!
//! ```text
//! [R G B R G B R G B ...]  <- Row 0
//! [R G B R G B R G B ...]  <- Row 1
//! ```
//!
//! # Usage
//!
//! ```rust
//! use cmf_core::{Image, PixelArray, Rectangle};
//!
//! let img = Image::filled(4, 4, &[0.25, 0.5, 1.0]);
//! assert_eq!(img.point(3, 3), Some(&[0.25, 0.5, 1.0][..]));
//!
//! let mut array = PixelArray::new(Rectangle::from_size(2.0, 2.0), 3);
//! let written = img.fill_array(&array.bounds(), 2.0, 2.0, &mut array).unwrap();
//! assert_eq!(written, 4);
//! ```

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use half::f16;
use rayon::prelude::*;
use tracing::{debug, trace};

use crate::{netpbm, DataType, Error, PixelArray, Rectangle, Result};

/// Raster image with optional, possibly deferred, samples.
#[derive(Debug, Clone)]
pub struct Image {
    width: u32,
    height: u32,
    channels: u32,
    data_type: DataType,
    profile: Option<String>,
    source: Option<PathBuf>,
    samples: OnceLock<Vec<f32>>,
}

impl Image {
    fn with_parts(width: u32, height: u32, channels: u32) -> Self {
        Self {
            width,
            height,
            channels,
            data_type: DataType::Float,
            profile: None,
            source: None,
            samples: OnceLock::new(),
        }
    }

    /// Zero-filled in-memory image.
    pub fn new(width: u32, height: u32, channels: u32) -> Self {
        let img = Self::with_parts(width, height, channels);
        let _ = img.samples.set(vec![0.0; img.sample_count()]);
        img
    }

    /// Image with every pixel set to `pixel`.
    pub fn filled(width: u32, height: u32, pixel: &[f32]) -> Self {
        let channels = pixel.len() as u32;
        let mut data = Vec::with_capacity(width as usize * height as usize * pixel.len());
        for _ in 0..(width as usize * height as usize) {
            data.extend_from_slice(pixel);
        }
        let img = Self::with_parts(width, height, channels);
        let _ = img.samples.set(data);
        img
    }

    /// Wraps interleaved samples.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidDimensions`] if `data` does not hold exactly
    /// `width * height * channels` samples.
    pub fn from_data(width: u32, height: u32, channels: u32, data: Vec<f32>) -> Result<Self> {
        let img = Self::with_parts(width, height, channels);
        if data.len() != img.sample_count() {
            return Err(Error::invalid_dimensions(
                width,
                height,
                format!("expected {} samples, got {}", img.sample_count(), data.len()),
            ));
        }
        let _ = img.samples.set(data);
        Ok(img)
    }

    /// Wraps half-float samples, widening them to `f32`.
    pub fn from_f16(width: u32, height: u32, channels: u32, data: &[f16]) -> Result<Self> {
        let wide = data.iter().map(|h| h.to_f32()).collect();
        Ok(Self::from_data(width, height, channels, wide)?.with_data_type(DataType::Half))
    }

    /// Geometry-only image: never holds samples.
    pub fn descriptor(width: u32, height: u32, channels: u32) -> Self {
        Self::with_parts(width, height, channels)
    }

    /// Opens a netpbm file, reading only its header.
    ///
    /// The raster is decoded on the first call to [`Image::load`].
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let header = netpbm::read_header(path)?;
        debug!(path = %path.display(), width = header.width, height = header.height, "image opened");
        let mut img = Self::with_parts(header.width, header.height, header.channels);
        img.data_type = header.data_type;
        img.source = Some(path.to_path_buf());
        Ok(img)
    }

    /// Sets the native data type tag.
    pub fn with_data_type(mut self, data_type: DataType) -> Self {
        self.data_type = data_type;
        self
    }

    /// Tags the image with a colour profile name.
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    /// Width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Samples per pixel.
    #[inline]
    pub fn channels(&self) -> u32 {
        self.channels
    }

    /// Native sample type.
    #[inline]
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Colour profile tag, if any.
    pub fn profile(&self) -> Option<&str> {
        self.profile.as_deref()
    }

    /// Backing file of a deferred image.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Full image rectangle in its own pixels.
    #[inline]
    pub fn bounds(&self) -> Rectangle {
        Rectangle::from_pixels(self.width, self.height)
    }

    #[inline]
    fn sample_count(&self) -> usize {
        (self.width as usize)
            .saturating_mul(self.height as usize)
            .saturating_mul(self.channels as usize)
    }

    /// Samples if already resident.
    pub fn data(&self) -> Option<&[f32]> {
        self.samples.get().map(Vec::as_slice)
    }

    /// Returns the samples, decoding the backing file if needed.
    ///
    /// # Errors
    ///
    /// [`Error::NoData`] for descriptors, I/O or decode errors for files.
    pub fn load(&self) -> Result<&[f32]> {
        if let Some(data) = self.samples.get() {
            return Ok(data);
        }
        let Some(path) = &self.source else {
            return Err(Error::NoData);
        };
        let decoded = netpbm::read(path)?;
        if decoded.width() != self.width || decoded.height() != self.height {
            return Err(Error::decode(format!(
                "{} changed size since it was opened",
                path.display()
            )));
        }
        let data = decoded.samples.into_inner().ok_or(Error::NoData)?;
        debug!(path = %path.display(), samples = data.len(), "image loaded");
        // A concurrent loader may have won; either copy is identical.
        let _ = self.samples.set(data);
        self.samples.get().map(Vec::as_slice).ok_or(Error::NoData)
    }

    /// Pixel at integer coordinates if samples are resident.
    pub fn point(&self, x: u32, y: u32) -> Option<&[f32]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let ch = self.channels as usize;
        let idx = (y as usize * self.width as usize + x as usize) * ch;
        self.data()?.get(idx..idx + ch)
    }

    /// Writes one pixel of an in-memory image.
    pub fn set_pixel(&mut self, x: u32, y: u32, pixel: &[f32]) -> Result<()> {
        if x >= self.width || y >= self.height {
            return Err(Error::out_of_bounds(x, y, self.width, self.height));
        }
        if pixel.len() != self.channels as usize {
            return Err(Error::ChannelMismatch {
                expected: self.channels,
                got: pixel.len() as u32,
            });
        }
        let ch = self.channels as usize;
        let idx = (y as usize * self.width as usize + x as usize) * ch;
        let data = self.samples.get_mut().ok_or(Error::NoData)?;
        data[idx..idx + ch].copy_from_slice(pixel);
        Ok(())
    }

    /// Samples as half floats.
    pub fn to_f16(&self) -> Result<Vec<f16>> {
        Ok(self.load()?.iter().map(|&v| f16::from_f32(v)).collect())
    }

    /// Fills `target` of `array` by nearest-neighbour sampling.
    ///
    /// `target` is in the array's grid. `scale_x`/`scale_y` give the number
    /// of native pixels per grid pixel, so grid pixel `(gx, gy)` reads the
    /// native pixel at `((gx + 0.5) * scale_x, (gy + 0.5) * scale_y)`,
    /// clamped to the image. Rows are filled in parallel.
    ///
    /// Returns the number of pixels written.
    pub fn fill_array(
        &self,
        target: &Rectangle,
        scale_x: f64,
        scale_y: f64,
        array: &mut PixelArray,
    ) -> Result<u64> {
        let clipped = target.intersection(&array.bounds());
        if clipped.is_empty() {
            return Ok(0);
        }
        let src = self.load()?;
        if self.width == 0 || self.height == 0 {
            return Ok(0);
        }

        let (x0, y0, x1, y1) = clipped.pixel_span();
        let src_ch = self.channels as usize;
        let dst_ch = array.channels() as usize;
        let copy_ch = src_ch.min(dst_ch);
        let (w, h) = (self.width as usize, self.height as usize);
        trace!(%clipped, scale_x, scale_y, "fill array");

        let (ox, oy, row_len, data) = array.rows_mut();
        data.par_chunks_mut(row_len)
            .enumerate()
            .for_each(|(row, out)| {
                let gy = oy + row as i64;
                if gy < y0 || gy >= y1 {
                    return;
                }
                let ny = (((gy as f64 + 0.5) * scale_y).floor().max(0.0) as usize).min(h - 1);
                for gx in x0..x1 {
                    let nx = (((gx as f64 + 0.5) * scale_x).floor().max(0.0) as usize).min(w - 1);
                    let s = (ny * w + nx) * src_ch;
                    let d = (gx - ox) as usize * dst_ch;
                    out[d..d + copy_ch].copy_from_slice(&src[s..s + copy_ch]);
                }
            });

        let count = ((x1 - x0) * (y1 - y0)) as u64;
        array.add_written(count);
        Ok(count)
    }

    /// Writes the image as binary netpbm (P5/P6 by channel count).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        netpbm::write(self, path.as_ref())
    }
}
