//! # cmf-core
//!
//! Core types shared by the CMF colour filter graph.
//!
//! - [`Rectangle`] - Floating-point region of interest with clip/scale algebra
//! - [`DataType`] - Native sample type tag
//! - [`Image`] - Image descriptor with in-memory, file-backed or absent samples
//! - [`PixelArray`] - Backing buffer that graph requests write into
//! - [`netpbm`] - Minimal PGM/PPM/PFM reader and writer
//!
//! ## Crate Structure
//!
//! ```text
//! cmf-core (this crate)
//!    ^
//!    |
//!    +-- cmf-icc (lcms2 profile/transform wrappers)
//!    +-- cmf-graph (nodes, plugs, sockets, pixel tickets)
//! ```
//!
//! ## Example
//!
//! ```rust
//! use cmf_core::prelude::*;
//!
//! let img = Image::filled(16, 16, &[1.0, 0.0, 0.0]);
//! let mut array = PixelArray::new(Rectangle::from_size(16.0, 16.0), 3);
//! img.fill_array(&Rectangle::new(0.0, 0.0, 8.0, 16.0), 1.0, 1.0, &mut array)?;
//! assert_eq!(array.get(7, 0), Some(&[1.0, 0.0, 0.0][..]));
//! # Ok::<(), cmf_core::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod array;
pub mod error;
pub mod format;
pub mod image;
pub mod netpbm;
pub mod rect;

pub use array::PixelArray;
pub use error::{Error, Result};
pub use format::DataType;
pub use image::Image;
pub use rect::Rectangle;

/// Prelude module for convenient imports.
///
/// ```
/// use cmf_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::array::PixelArray;
    pub use crate::error::{Error, Result};
    pub use crate::format::DataType;
    pub use crate::image::Image;
    pub use crate::rect::Rectangle;
}
