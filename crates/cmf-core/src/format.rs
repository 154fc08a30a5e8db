//! Pixel sample data types.
//!
//! [`DataType`] is the runtime tag describing how samples of an image are
//! stored natively. Connectors list the data types they accept, and the graph
//! refuses to connect endpoints without a common type.
//!
//! ```rust
//! use cmf_core::DataType;
//!
//! assert_eq!(DataType::U16.bytes_per_sample(), 2);
//! assert!(DataType::Half.is_float());
//! assert_eq!(DataType::from_name("float"), Some(DataType::Float));
//! ```

use serde::{Deserialize, Serialize};

/// Storage type of one channel sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// 8-bit unsigned integer.
    U8,
    /// 16-bit unsigned integer.
    U16,
    /// 32-bit unsigned integer.
    U32,
    /// 16-bit IEEE half float.
    Half,
    /// 32-bit float.
    #[default]
    Float,
    /// 64-bit float.
    Double,
}

impl DataType {
    /// Every supported type, in declaration order.
    pub const ALL: [DataType; 6] = [
        DataType::U8,
        DataType::U16,
        DataType::U32,
        DataType::Half,
        DataType::Float,
        DataType::Double,
    ];

    /// Bytes occupied by one sample.
    #[inline]
    pub const fn bytes_per_sample(&self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U16 | Self::Half => 2,
            Self::U32 | Self::Float => 4,
            Self::Double => 8,
        }
    }

    /// Whether samples are floating point.
    #[inline]
    pub const fn is_float(&self) -> bool {
        matches!(self, Self::Half | Self::Float | Self::Double)
    }

    /// Largest integer code value, `1.0` for float types.
    #[inline]
    pub fn max_value(&self) -> f64 {
        match self {
            Self::U8 => u8::MAX as f64,
            Self::U16 => u16::MAX as f64,
            Self::U32 => u32::MAX as f64,
            Self::Half | Self::Float | Self::Double => 1.0,
        }
    }

    /// Short lowercase name.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::Half => "half",
            Self::Float => "float",
            Self::Double => "double",
        }
    }

    /// Parses a name as produced by [`DataType::name`].
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "u8" | "uint8" => Some(Self::U8),
            "u16" | "uint16" => Some(Self::U16),
            "u32" | "uint32" => Some(Self::U32),
            "half" | "f16" => Some(Self::Half),
            "float" | "f32" => Some(Self::Float),
            "double" | "f64" => Some(Self::Double),
            _ => None,
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sizes() {
        assert_eq!(DataType::U8.bytes_per_sample(), 1);
        assert_eq!(DataType::Half.bytes_per_sample(), 2);
        assert_eq!(DataType::Double.bytes_per_sample(), 8);
    }

    #[test]
    fn test_names_roundtrip() {
        for dt in DataType::ALL {
            assert_eq!(DataType::from_name(dt.name()), Some(dt));
        }
        assert_eq!(DataType::from_name("rgb"), None);
    }
}
