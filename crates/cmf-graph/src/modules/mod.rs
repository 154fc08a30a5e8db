//! Built-in node kinds.
//!
//! | registration            | plugs          | sockets | role |
//! |-------------------------|----------------|---------|------|
//! | `org/cmf/image/root`    | 0              | 1       | image source |
//! | `org/cmf/image/output`  | 1              | 0       | pass-through terminal |
//! | `org/cmf/image/regions` | 1 + unlimited  | 1       | fan-out splitter |
//! | `org/cmf/image/scale`   | 1              | 1       | nearest-neighbour resample |
//! | `org/cmf/colour/icc`    | 1              | 1       | ICC conversion (feature `icc`) |

use std::sync::Arc;

use crate::api::Registry;

#[cfg(feature = "icc")]
pub mod icc;
pub mod output;
pub mod regions;
pub mod root;
pub mod scale;

/// Registers every built-in node kind.
pub fn register_builtins(registry: &Registry) {
    registry.register(Arc::new(root::RootImage::new()));
    registry.register(Arc::new(output::Output::new()));
    registry.register(Arc::new(regions::Regions::new()));
    registry.register(Arc::new(scale::Scale::new()));
    #[cfg(feature = "icc")]
    registry.register(Arc::new(icc::IccConvert::new()));
}
