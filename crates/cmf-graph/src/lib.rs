//! # cmf-graph
//!
//! Pull-based filter graph for colour management.
//!
//! Nodes are instantiated from registered backends ([`FilterApi`]) and
//! linked socket → plug inside a [`Pipeline`]. A consumer asks for pixels
//! by running a [`PixelAccess`] ticket against the output node; every node
//! maps the requested region into its producers' grids and recurses until
//! an image source fills the caller's [`PixelArray`](cmf_core::PixelArray).
//!
//! ## Modules
//!
//! - [`connector`] - Endpoint descriptors and compatibility checks
//! - [`api`] - Backend trait, status codes, registry
//! - [`pipeline`] - Node arena: connect, disconnect, run
//! - [`ticket`] - Pixel requests and cursor stepping
//! - [`graph`] - Traversal snapshots
//! - [`modules`] - Built-in node kinds
//! - [`conversion`] - Input/output driver
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use cmf_core::{Image, Rectangle};
//! use cmf_graph::modules::root;
//! use cmf_graph::prelude::*;
//!
//! let mut p = Pipeline::new();
//! let left = root::create(&mut p, Arc::new(Image::filled(4, 2, &[1.0])))?;
//! let right = root::create(&mut p, Arc::new(Image::filled(4, 2, &[2.0])))?;
//! let split = p.create_node(
//!     "//image/regions",
//!     Options::new()
//!         .with("0", Rectangle::new(0.0, 0.0, 2.0, 2.0))
//!         .with("1", Rectangle::new(2.0, 0.0, 2.0, 2.0)),
//! )?;
//! let out = p.create_node("//image/output", Options::new())?;
//! p.connect(left, Selector::Next, split, Selector::Next, ConnectFlags::default())?;
//! p.connect(right, Selector::Next, split, Selector::Next, ConnectFlags::default())?;
//! p.connect(split, Selector::Next, out, Selector::Next, ConnectFlags::default())?;
//!
//! let conv = Conversion::new(p, left, out);
//! let array = conv.render(None)?;
//! assert_eq!(array.get(0, 0), Some(&[1.0][..]));
//! assert_eq!(array.get(3, 1), Some(&[2.0][..]));
//! # Ok::<(), cmf_graph::GraphError>(())
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod api;
pub mod config;
pub mod connector;
pub mod conversion;
pub mod error;
pub mod filter;
pub mod graph;
pub mod modules;
pub mod node;
pub mod options;
pub mod pipeline;
pub mod registration;
pub mod ticket;

pub use api::{BackendContext, FilterApi, Geometry, Registry, SocketEvent, Status};
pub use config::GraphConfig;
pub use connector::{Capabilities, Connector};
pub use conversion::Conversion;
pub use error::{GraphError, GraphResult};
pub use filter::FilterCore;
pub use graph::{Edge, FilterGraph};
pub use node::{
    ConnectFlags, Connection, Direction, Edges, FilterNode, FilterPlug, FilterSocket, NodeId,
    NodeState, PlugRef, Release, Selector, SocketRef,
};
pub use options::{OptionValue, Options};
pub use pipeline::Pipeline;
pub use ticket::{AccessMode, PixelAccess};

/// Prelude module for convenient imports.
///
/// ```
/// use cmf_graph::prelude::*;
/// ```
pub mod prelude {
    pub use crate::api::{FilterApi, Geometry, Registry, SocketEvent, Status};
    pub use crate::conversion::Conversion;
    pub use crate::error::{GraphError, GraphResult};
    pub use crate::node::{
        ConnectFlags, Direction, Edges, NodeId, PlugRef, Release, Selector, SocketRef,
    };
    pub use crate::options::Options;
    pub use crate::pipeline::Pipeline;
    pub use crate::ticket::{AccessMode, PixelAccess};
}
