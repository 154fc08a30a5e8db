//! Built-in RGB profiles addressable by name.

use crate::{IccError, IccResult, Profile};
use lcms2::{CIExyY, CIExyYTRIPLE, Profile as LcmsProfile, ToneCurve};

/// Built-in colour spaces, synthesised from primaries and a tone curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandardProfile {
    /// IEC 61966-2-1 sRGB.
    Srgb,
    /// sRGB primaries, gamma 1.0.
    LinearSrgb,
    /// Adobe RGB (1998).
    AdobeRgb,
    /// Display P3.
    DisplayP3,
    /// ITU-R BT.2020, simplified gamma 2.4.
    Rec2020,
}

impl StandardProfile {
    /// Every built-in profile.
    pub const ALL: [StandardProfile; 5] = [
        StandardProfile::Srgb,
        StandardProfile::LinearSrgb,
        StandardProfile::AdobeRgb,
        StandardProfile::DisplayP3,
        StandardProfile::Rec2020,
    ];

    /// Lookup name.
    pub const fn name(&self) -> &'static str {
        match self {
            StandardProfile::Srgb => "srgb",
            StandardProfile::LinearSrgb => "linear-srgb",
            StandardProfile::AdobeRgb => "adobe-rgb",
            StandardProfile::DisplayP3 => "display-p3",
            StandardProfile::Rec2020 => "rec2020",
        }
    }

    /// Case-insensitive lookup; `_` and `-` are interchangeable.
    pub fn from_name(name: &str) -> Option<Self> {
        let key = name.to_ascii_lowercase().replace('_', "-");
        Self::ALL.into_iter().find(|p| p.name() == key)
    }

    /// Builds the lcms2 profile.
    pub fn to_profile(self) -> IccResult<Profile> {
        let inner = match self {
            StandardProfile::Srgb => LcmsProfile::new_srgb(),
            StandardProfile::LinearSrgb => rgb(&D65, &SRGB_PRIMARIES, 1.0)?,
            StandardProfile::AdobeRgb => rgb(&D65, &ADOBE_PRIMARIES, 2.2)?,
            StandardProfile::DisplayP3 => rgb(&D65, &P3_PRIMARIES, 2.2)?,
            StandardProfile::Rec2020 => rgb(&D65, &REC2020_PRIMARIES, 2.4)?,
        };
        Ok(Profile::from_lcms(inner, self.name()))
    }
}

fn rgb(white: &CIExyY, primaries: &CIExyYTRIPLE, gamma: f64) -> IccResult<LcmsProfile> {
    let curve = ToneCurve::new(gamma);
    let curves = [&curve, &curve, &curve];
    LcmsProfile::new_rgb(white, primaries, &curves)
        .map_err(|e| IccError::CreateFailed(e.to_string()))
}

const fn xy(x: f64, y: f64) -> CIExyY {
    CIExyY { x, y, Y: 1.0 }
}

const D65: CIExyY = xy(0.3127, 0.3290);

const SRGB_PRIMARIES: CIExyYTRIPLE = CIExyYTRIPLE {
    Red: xy(0.6400, 0.3300),
    Green: xy(0.3000, 0.6000),
    Blue: xy(0.1500, 0.0600),
};

const ADOBE_PRIMARIES: CIExyYTRIPLE = CIExyYTRIPLE {
    Red: xy(0.6400, 0.3300),
    Green: xy(0.2100, 0.7100),
    Blue: xy(0.1500, 0.0600),
};

const P3_PRIMARIES: CIExyYTRIPLE = CIExyYTRIPLE {
    Red: xy(0.680, 0.320),
    Green: xy(0.265, 0.690),
    Blue: xy(0.150, 0.060),
};

const REC2020_PRIMARIES: CIExyYTRIPLE = CIExyYTRIPLE {
    Red: xy(0.708, 0.292),
    Green: xy(0.170, 0.797),
    Blue: xy(0.131, 0.046),
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_standards_are_rgb() {
        for std in StandardProfile::ALL {
            let profile = std.to_profile().unwrap();
            assert!(profile.is_rgb(), "{:?} should be RGB", std);
            assert_eq!(StandardProfile::from_name(std.name()), Some(std));
        }
    }

    #[test]
    fn test_name_aliases() {
        assert_eq!(StandardProfile::from_name("Linear_sRGB"), Some(StandardProfile::LinearSrgb));
        assert_eq!(StandardProfile::from_name("cmyk"), None);
    }
}
