//! Colour transforms between ICC profiles.

use crate::{IccError, IccResult, Intent, Profile};
use lcms2::Transform as LcmsTransform;
use tracing::debug;

/// Pixels handed to lcms2 per call when walking interleaved buffers.
const BATCH: usize = 256;

/// RGB float transform between two profiles.
///
/// # Example
///
/// ```rust
/// use cmf_icc::{Intent, Profile, Transform};
///
/// let t = Transform::new(&Profile::srgb(), &Profile::srgb(), Intent::Perceptual).unwrap();
/// let mut px = [0.5f32, 0.3, 0.2];
/// t.apply_pixel(&mut px);
/// assert!((px[0] - 0.5).abs() < 0.01);
/// ```
pub struct Transform {
    inner: LcmsTransform<[f32; 3], [f32; 3]>,
    source: String,
    dest: String,
    intent: Intent,
}

impl Transform {
    /// Creates a transform using 32-bit float RGB on both sides.
    pub fn new(source: &Profile, dest: &Profile, intent: Intent) -> IccResult<Self> {
        let inner = LcmsTransform::new(
            &source.inner,
            lcms2::PixelFormat::RGB_FLT,
            &dest.inner,
            lcms2::PixelFormat::RGB_FLT,
            intent.into(),
        )
        .map_err(|e| IccError::TransformFailed(e.to_string()))?;
        debug!(source = source.name(), dest = dest.name(), %intent, "icc transform created");

        Ok(Self {
            inner,
            source: source.name().to_string(),
            dest: dest.name().to_string(),
            intent,
        })
    }

    /// Rendering intent in use.
    pub fn intent(&self) -> Intent {
        self.intent
    }

    /// Applies the transform to RGB triplets in place.
    pub fn apply(&self, pixels: &mut [[f32; 3]]) {
        self.inner.transform_in_place(pixels);
    }

    /// Applies the transform to one RGB pixel in place.
    pub fn apply_pixel(&self, rgb: &mut [f32; 3]) {
        self.inner.transform_in_place(std::slice::from_mut(rgb));
    }

    /// Transforms the first three channels of every pixel of an
    /// interleaved buffer. Extra channels (alpha, spot) are left alone.
    ///
    /// # Errors
    ///
    /// [`IccError::UnsupportedChannels`] when `channels < 3`.
    pub fn apply_interleaved(&self, data: &mut [f32], channels: u32) -> IccResult<()> {
        if channels < 3 {
            return Err(IccError::UnsupportedChannels(channels));
        }
        let stride = channels as usize;
        let mut batch = [[0.0f32; 3]; BATCH];
        for chunk in data.chunks_mut(stride * BATCH) {
            let n = chunk.len() / stride;
            for (dst, px) in batch.iter_mut().zip(chunk.chunks_exact(stride)) {
                dst.copy_from_slice(&px[..3]);
            }
            self.inner.transform_in_place(&mut batch[..n]);
            for (src, px) in batch.iter().zip(chunk.chunks_exact_mut(stride)) {
                px[..3].copy_from_slice(src);
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for Transform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transform")
            .field("source", &self.source)
            .field("dest", &self.dest)
            .field("intent", &self.intent)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StandardProfile;
    use approx::assert_abs_diff_eq;

    fn linearize() -> Transform {
        let lin = StandardProfile::LinearSrgb.to_profile().unwrap();
        Transform::new(&Profile::srgb(), &lin, Intent::Perceptual).unwrap()
    }

    #[test]
    fn test_identity() {
        let srgb = Profile::srgb();
        let t = Transform::new(&srgb, &srgb, Intent::Perceptual).unwrap();
        let mut pixels = [[0.5f32, 0.3, 0.2]];
        t.apply(&mut pixels);
        assert_abs_diff_eq!(pixels[0][0], 0.5, epsilon = 0.01);
        assert_abs_diff_eq!(pixels[0][2], 0.2, epsilon = 0.01);
    }

    #[test]
    fn test_linearize_pixel() {
        let mut px = [0.5f32, 0.5, 0.5];
        linearize().apply_pixel(&mut px);
        assert!(px[0] < 0.5);
    }

    #[test]
    fn test_interleaved_keeps_alpha() {
        let t = linearize();
        // more than one batch, RGBA
        let mut data: Vec<f32> = (0..BATCH + 3).flat_map(|_| [0.5, 0.5, 0.5, 0.75]).collect();
        t.apply_interleaved(&mut data, 4).unwrap();
        for px in data.chunks_exact(4) {
            assert!(px[0] < 0.5);
            assert_eq!(px[3], 0.75);
        }
    }

    #[test]
    fn test_interleaved_rejects_grey() {
        let mut data = vec![0.5f32; 4];
        let err = linearize().apply_interleaved(&mut data, 1).unwrap_err();
        assert!(matches!(err, IccError::UnsupportedChannels(1)));
    }
}
