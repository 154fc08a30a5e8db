//! ICC profile wrapper.

use crate::{IccError, IccResult, StandardProfile};
use lcms2::{ColorSpaceSignature, Profile as LcmsProfile};
use std::path::Path;
use tracing::debug;

/// An ICC colour profile plus the name it was resolved from.
///
/// # Example
///
/// ```rust
/// use cmf_icc::Profile;
///
/// let p = Profile::resolve("display-p3").unwrap();
/// assert!(p.is_rgb());
/// assert_eq!(p.name(), "display-p3");
/// ```
pub struct Profile {
    pub(crate) inner: LcmsProfile,
    name: String,
}

impl Profile {
    pub(crate) fn from_lcms(inner: LcmsProfile, name: impl Into<String>) -> Self {
        Self {
            inner,
            name: name.into(),
        }
    }

    /// Resolves a profile option value.
    ///
    /// Built-in names win over files; anything else is read as a path.
    ///
    /// # Errors
    ///
    /// [`IccError::UnknownProfile`] if the name is neither built-in nor an
    /// existing file, [`IccError::LoadFailed`] if the file is not a profile.
    pub fn resolve(name: &str) -> IccResult<Self> {
        if let Some(std) = StandardProfile::from_name(name) {
            return std.to_profile();
        }
        let path = Path::new(name);
        if !path.is_file() {
            return Err(IccError::UnknownProfile(name.to_string()));
        }
        Self::from_file(path)
    }

    /// Loads a profile from an ICC file.
    pub fn from_file(path: &Path) -> IccResult<Self> {
        let inner = LcmsProfile::new_file(path)
            .map_err(|e| IccError::LoadFailed(format!("{}: {}", path.display(), e)))?;
        debug!(path = %path.display(), "icc profile loaded");
        Ok(Self::from_lcms(inner, path.display().to_string()))
    }

    /// Parses raw ICC bytes.
    pub fn from_icc(data: &[u8]) -> IccResult<Self> {
        let inner =
            LcmsProfile::new_icc(data).map_err(|e| IccError::LoadFailed(e.to_string()))?;
        Ok(Self::from_lcms(inner, "embedded"))
    }

    /// The sRGB profile.
    pub fn srgb() -> Self {
        Self::from_lcms(LcmsProfile::new_srgb(), StandardProfile::Srgb.name())
    }

    /// Grey profile with the given gamma.
    pub fn gray(gamma: f64) -> IccResult<Self> {
        let curve = lcms2::ToneCurve::new(gamma);
        let inner = LcmsProfile::new_gray(&lcms2::CIExyY::d50(), &curve)
            .map_err(|e| IccError::CreateFailed(e.to_string()))?;
        Ok(Self::from_lcms(inner, format!("gray-{gamma}")))
    }

    /// Name or path this profile was resolved from.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Embedded description tag.
    pub fn description(&self) -> String {
        self.inner
            .info(lcms2::InfoType::Description, lcms2::Locale::none())
            .unwrap_or_default()
    }

    /// Returns true if this is an RGB profile.
    pub fn is_rgb(&self) -> bool {
        matches!(self.inner.color_space(), ColorSpaceSignature::RgbData)
    }

    /// Returns true if this is a grayscale profile.
    pub fn is_gray(&self) -> bool {
        matches!(self.inner.color_space(), ColorSpaceSignature::GrayData)
    }

    /// Serialises the profile to ICC bytes.
    pub fn to_icc(&self) -> IccResult<Vec<u8>> {
        self.inner
            .icc()
            .map_err(|e| IccError::CreateFailed(e.to_string()))
    }
}

impl std::fmt::Debug for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Profile")
            .field("name", &self.name)
            .field("description", &self.description())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_builtin() {
        let p = Profile::resolve("SRGB").unwrap();
        assert!(p.is_rgb());
        assert!(!p.description().is_empty());
    }

    #[test]
    fn test_resolve_unknown() {
        let err = Profile::resolve("/no/such/profile.icc").unwrap_err();
        assert!(matches!(err, IccError::UnknownProfile(_)));
    }

    #[test]
    fn test_resolve_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("srgb.icc");
        std::fs::write(&path, Profile::srgb().to_icc().unwrap()).unwrap();
        let p = Profile::resolve(path.to_str().unwrap()).unwrap();
        assert!(p.is_rgb());
    }

    #[test]
    fn test_resolve_garbage_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("junk.icc");
        std::fs::write(&path, b"not a profile").unwrap();
        let err = Profile::resolve(path.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, IccError::LoadFailed(_)));
    }

    #[test]
    fn test_gray() {
        assert!(Profile::gray(2.2).unwrap().is_gray());
    }
}
