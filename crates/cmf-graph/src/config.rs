//! Engine configuration.
//!
//! ```yaml
//! strict_upstream_count: true
//! max_depth: 32
//! ```
//!
//! Missing keys take their defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{GraphError, GraphResult};

/// Knobs affecting graph execution policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Fail fan-out runs whose plug count differs from their region count.
    ///
    /// Off by default: the mismatch is logged and the smaller count is used.
    pub strict_upstream_count: bool,
    /// Maximum request nesting before [`GraphError::RecursionLimit`].
    pub max_depth: usize,
    /// Pixels per step for scanline tickets created by a conversion.
    pub default_pixels_n: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            strict_upstream_count: false,
            max_depth: 64,
            default_pixels_n: 1,
        }
    }
}

impl GraphConfig {
    /// Parses YAML text.
    pub fn from_yaml_str(text: &str) -> GraphResult<Self> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> GraphResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| GraphError::Config(format!("{}: {e}", path.display())))?;
        let config = Self::from_yaml_str(&text)?;
        debug!(path = %path.display(), ?config, "graph config loaded");
        Ok(config)
    }

    /// Serialises to YAML.
    pub fn to_yaml(&self) -> GraphResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Sets [`GraphConfig::strict_upstream_count`].
    pub fn with_strict_upstream_count(mut self, strict: bool) -> Self {
        self.strict_upstream_count = strict;
        self
    }

    /// Sets [`GraphConfig::max_depth`].
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Sets [`GraphConfig::default_pixels_n`].
    pub fn with_default_pixels_n(mut self, n: usize) -> Self {
        self.default_pixels_n = n;
        self
    }

    fn validate(&self) -> GraphResult<()> {
        if self.max_depth == 0 {
            return Err(GraphError::Config("max_depth must be at least 1".into()));
        }
        if self.default_pixels_n == 0 {
            return Err(GraphError::Config("default_pixels_n must be at least 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let cfg = GraphConfig::from_yaml_str("strict_upstream_count: true\n").unwrap();
        assert!(cfg.strict_upstream_count);
        assert_eq!(cfg.max_depth, 64);
        assert_eq!(cfg.default_pixels_n, 1);
    }

    #[test]
    fn test_rejects_zero_depth() {
        assert!(matches!(
            GraphConfig::from_yaml_str("max_depth: 0"),
            Err(GraphError::Config(_))
        ));
    }

    #[test]
    fn test_yaml_roundtrip() {
        let cfg = GraphConfig::default().with_max_depth(8).with_default_pixels_n(16);
        let back = GraphConfig::from_yaml_str(&cfg.to_yaml().unwrap()).unwrap();
        assert_eq!(back, cfg);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.yaml");
        std::fs::write(&path, "max_depth: 5\n").unwrap();
        assert_eq!(GraphConfig::from_file(&path).unwrap().max_depth, 5);
        assert!(GraphConfig::from_file(dir.path().join("missing.yaml")).is_err());
    }
}
