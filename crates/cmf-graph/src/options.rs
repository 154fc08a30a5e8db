//! Node option bags.
//!
//! Options are string-keyed values stored in a sorted map, so serialised
//! output is stable. Fan-out nodes store their per-branch regions under the
//! keys `"0"`, `"1"`, ... .
//!
//! ```rust
//! use cmf_core::Rectangle;
//! use cmf_graph::Options;
//!
//! let opts = Options::new()
//!     .with("0", Rectangle::new(0.0, 0.0, 50.0, 100.0))
//!     .with("1", Rectangle::new(50.0, 0.0, 50.0, 100.0))
//!     .with("label", "split");
//! assert_eq!(opts.region_count(), 2);
//! assert_eq!(opts.get_str("label"), Some("split"));
//! ```

use std::collections::BTreeMap;

use cmf_core::Rectangle;
use serde::{Deserialize, Serialize};

use crate::GraphResult;

/// A single option value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    /// Flag.
    Bool(bool),
    /// Integer.
    Int(i64),
    /// Floating point.
    Double(f64),
    /// Text.
    String(String),
    /// Rectangle, e.g. a branch region.
    Region(Rectangle),
}

impl From<bool> for OptionValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for OptionValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for OptionValue {
    fn from(v: i32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<u32> for OptionValue {
    fn from(v: u32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<f64> for OptionValue {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<&str> for OptionValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<Rectangle> for OptionValue {
    fn from(v: Rectangle) -> Self {
        Self::Region(v)
    }
}

/// Sorted option map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Options {
    values: BTreeMap<String, OptionValue>,
}

impl Options {
    /// Empty bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Options::set`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        self.set(key, value);
        self
    }

    /// Inserts or replaces a value, returning the previous one.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<OptionValue>) -> Option<OptionValue> {
        self.values.insert(key.into(), value.into())
    }

    /// Removes a value.
    pub fn remove(&mut self, key: &str) -> Option<OptionValue> {
        self.values.remove(key)
    }

    /// Raw value.
    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        self.values.get(key)
    }

    /// Integer value. Doubles with no fraction are accepted.
    pub fn get_int(&self, key: &str) -> Option<i64> {
        match self.get(key)? {
            OptionValue::Int(v) => Some(*v),
            OptionValue::Double(v) if v.fract() == 0.0 => Some(*v as i64),
            _ => None,
        }
    }

    /// Floating point value. Integers are widened.
    pub fn get_double(&self, key: &str) -> Option<f64> {
        match self.get(key)? {
            OptionValue::Double(v) => Some(*v),
            OptionValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Text value.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self.get(key)? {
            OptionValue::String(v) => Some(v),
            _ => None,
        }
    }

    /// Flag value.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.get(key)? {
            OptionValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Rectangle value.
    pub fn get_region(&self, key: &str) -> Option<Rectangle> {
        match self.get(key)? {
            OptionValue::Region(v) => Some(*v),
            _ => None,
        }
    }

    /// Region stored under the decimal key `index`.
    pub fn region(&self, index: usize) -> Option<Rectangle> {
        self.get_region(&index.to_string())
    }

    /// Number of consecutive regions stored from key `"0"` on.
    pub fn region_count(&self) -> usize {
        (0..).take_while(|i| self.region(*i).is_some()).count()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// `true` without entries.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// YAML text of the bag.
    pub fn to_yaml(&self) -> GraphResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Parses YAML text.
    pub fn from_yaml_str(text: &str) -> GraphResult<Self> {
        Ok(serde_yaml::from_str(text)?)
    }
}
