//! Errors of the leaf image types.
//!
//! [`Error::is_io_error`] separates failures to obtain samples from
//! storage from misuse of the image types.
//!
//! ```rust
//! use cmf_core::{Error, Image};
//!
//! let err = Image::descriptor(4, 4, 1).load().unwrap_err();
//! assert!(matches!(err, Error::NoData));
//! assert!(err.is_io_error());
//! ```

use thiserror::Error;

use crate::Rectangle;

/// Result alias for this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures of images, pixel arrays and netpbm I/O.
#[derive(Debug, Error)]
pub enum Error {
    /// A pixel address lies outside the image.
    #[error("({x}, {y}) lies outside the {width}x{height} image")]
    OutOfBounds {
        /// Column.
        x: u32,
        /// Row.
        y: u32,
        /// Image width.
        width: u32,
        /// Image height.
        height: u32,
    },

    /// A region that covers no pixels where pixels are required.
    #[error("region {0} covers no pixels")]
    InvalidRegion(Rectangle),

    /// The image is a descriptor or its raster was never decoded.
    #[error("image has no pixel data")]
    NoData,

    /// Size and sample count disagree.
    #[error("bad image size {width}x{height}: {reason}")]
    InvalidDimensions {
        /// Width.
        width: u32,
        /// Height.
        height: u32,
        /// What is wrong.
        reason: String,
    },

    /// Pixel length differs from the image's channel count.
    #[error("pixel has {got} channels, image has {expected}")]
    ChannelMismatch {
        /// Channels of the image.
        expected: u32,
        /// Channels supplied.
        got: u32,
    },

    /// Format variant or channel layout not handled.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Malformed raster file.
    #[error("decode error: {0}")]
    Decode(String),

    /// Underlying file error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// [`Error::OutOfBounds`] for `(x, y)` in a `width` x `height` image.
    pub fn out_of_bounds(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self::OutOfBounds {
            x,
            y,
            width,
            height,
        }
    }

    /// [`Error::InvalidDimensions`] with a reason.
    pub fn invalid_dimensions(width: u32, height: u32, reason: impl Into<String>) -> Self {
        Self::InvalidDimensions {
            width,
            height,
            reason: reason.into(),
        }
    }

    /// [`Error::Decode`] with a message.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// `true` when samples could not be obtained from storage.
    pub fn is_io_error(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Decode(_) | Self::NoData)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_image() {
        let msg = Error::out_of_bounds(100, 50, 80, 60).to_string();
        assert!(msg.contains("(100, 50)"));
        assert!(msg.contains("80x60"));
    }

    #[test]
    fn test_storage_failures() {
        let err: Error = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(err.is_io_error());
        assert!(Error::decode("short raster").is_io_error());
        assert!(!Error::invalid_dimensions(0, 0, "zero").is_io_error());
        assert!(!Error::InvalidRegion(Rectangle::default()).is_io_error());
    }
}
