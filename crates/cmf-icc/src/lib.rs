//! # cmf-icc
//!
//! ICC profile resolution and colour transforms backing the colour
//! conversion node of the CMF filter graph.
//!
//! Built on Little CMS 2 via the `lcms2` crate.
//!
//! # Features
//!
//! - Resolve profiles by built-in name (`"srgb"`, `"linear-srgb"`, ...) or file path
//! - Rendering intents parseable from option strings
//! - Transforms over interleaved `f32` buffers of any channel count >= 3
//!
//! # Example
//!
//! ```rust
//! use cmf_icc::{Intent, Profile, Transform};
//!
//! let src = Profile::resolve("srgb").unwrap();
//! let dst = Profile::resolve("linear-srgb").unwrap();
//! let transform = Transform::new(&src, &dst, "relative".parse::<Intent>().unwrap()).unwrap();
//!
//! // RGBA, alpha untouched
//! let mut pixels = vec![0.5f32, 0.5, 0.5, 1.0];
//! transform.apply_interleaved(&mut pixels, 4).unwrap();
//! assert!(pixels[0] < 0.5);
//! assert_eq!(pixels[3], 1.0);
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod error;
mod profile;
mod standard;
mod transform;

pub use error::{IccError, IccResult};
pub use profile::Profile;
pub use standard::StandardProfile;
pub use transform::Transform;

use serde::{Deserialize, Serialize};

/// Rendering intent for colour transformations.
///
/// Determines how out-of-gamut colours are handled during conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Intent {
    /// Compresses the source gamut to fit the destination.
    #[default]
    Perceptual,

    /// Clips out-of-gamut colours, maps media white to media white.
    RelativeColorimetric,

    /// Maintains saturation at the expense of hue accuracy.
    Saturation,

    /// Like relative colorimetric without white point adaptation.
    AbsoluteColorimetric,
}

impl Intent {
    /// Canonical option name.
    pub const fn name(&self) -> &'static str {
        match self {
            Intent::Perceptual => "perceptual",
            Intent::RelativeColorimetric => "relative-colorimetric",
            Intent::Saturation => "saturation",
            Intent::AbsoluteColorimetric => "absolute-colorimetric",
        }
    }

    /// Intent from its ICC number (0..=3).
    pub fn from_index(index: i64) -> Option<Self> {
        match index {
            0 => Some(Intent::Perceptual),
            1 => Some(Intent::RelativeColorimetric),
            2 => Some(Intent::Saturation),
            3 => Some(Intent::AbsoluteColorimetric),
            _ => None,
        }
    }
}

impl std::str::FromStr for Intent {
    type Err = IccError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "perceptual" | "0" => Ok(Intent::Perceptual),
            "relative" | "relative-colorimetric" | "1" => Ok(Intent::RelativeColorimetric),
            "saturation" | "2" => Ok(Intent::Saturation),
            "absolute" | "absolute-colorimetric" | "3" => Ok(Intent::AbsoluteColorimetric),
            _ => Err(IccError::UnknownIntent(s.to_string())),
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl From<Intent> for lcms2::Intent {
    fn from(intent: Intent) -> Self {
        match intent {
            Intent::Perceptual => lcms2::Intent::Perceptual,
            Intent::RelativeColorimetric => lcms2::Intent::RelativeColorimetric,
            Intent::Saturation => lcms2::Intent::Saturation,
            Intent::AbsoluteColorimetric => lcms2::Intent::AbsoluteColorimetric,
        }
    }
}
