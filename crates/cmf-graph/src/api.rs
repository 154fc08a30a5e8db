//! Backend interface and registry.
//!
//! Every node kind implements [`FilterApi`]. The [`Registry`] maps
//! registration patterns to backends; [`Pipeline::create_node`] resolves
//! through it.
//!
//! # Adding a node kind
//!
//! ```rust
//! use std::sync::Arc;
//! use cmf_core::PixelArray;
//! use cmf_graph::prelude::*;
//! use cmf_graph::connector::Connector;
//!
//! #[derive(Debug)]
//! struct Fill {
//!     sockets: Vec<Connector>,
//! }
//!
//! impl FilterApi for Fill {
//!     fn registration(&self) -> &str { "org/example/image/fill" }
//!     fn plugs(&self) -> &[Connector] { &[] }
//!     fn sockets(&self) -> &[Connector] { &self.sockets }
//!     fn output_geometry(&self, _: &Pipeline, _: NodeId) -> GraphResult<Geometry> {
//!         Ok(Geometry::new(4, 4, 1))
//!     }
//!     fn run(
//!         &self,
//!         _: &Pipeline,
//!         _: NodeId,
//!         _: PlugRef,
//!         ticket: &mut PixelAccess,
//!         array: &mut PixelArray,
//!     ) -> GraphResult<Status> {
//!         array.for_each_row_mut(&ticket.work_roi(), |_, _, row| row.fill(1.0));
//!         Ok(Status::Success)
//!     }
//! }
//!
//! let registry = Registry::with_builtins();
//! registry.register(Arc::new(Fill { sockets: vec![Connector::image("Img")] }));
//! let mut pipeline = Pipeline::with_registry(Arc::new(registry));
//! let fill = pipeline.create_node("//example/fill", Options::new()).unwrap();
//! let out = pipeline.create_node("//image/output", Options::new()).unwrap();
//! pipeline.connect(fill, Selector::Next, out, Selector::Next, ConnectFlags::default()).unwrap();
//! ```
//!
//! [`Pipeline::create_node`]: crate::Pipeline::create_node

use std::any::Any;
use std::fmt;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use cmf_core::PixelArray;
use tracing::debug;

use crate::connector::Connector;
use crate::filter::FilterCore;
use crate::node::{NodeId, PlugRef};
use crate::pipeline::Pipeline;
use crate::ticket::PixelAccess;
use crate::{modules, registration, GraphError, GraphResult};

/// Opaque, lazily built per-node state such as a compiled transform.
pub type BackendContext = Arc<dyn Any + Send + Sync>;

/// Outcome of a successful `run`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Pixels were produced (or nothing was needed).
    Success,
    /// End of stream: the ticket has no more pixels to deliver.
    Terminal,
}

impl Status {
    /// Numeric status: `0` for success, `-1` for end of stream.
    pub const fn code(&self) -> i32 {
        match self {
            Status::Success => 0,
            Status::Terminal => -1,
        }
    }
}

/// Notification sent from a socket to each dependent plug.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketEvent {
    /// The plug was linked to the socket.
    Connected,
    /// The link was removed.
    Disconnected,
    /// The producing node is being removed.
    Released,
    /// The socket's output data was replaced.
    DataChanged,
}

/// Dimensions of a node's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Samples per pixel.
    pub channels: u32,
}

impl Geometry {
    /// Creates a geometry.
    pub const fn new(width: u32, height: u32, channels: u32) -> Self {
        Self {
            width,
            height,
            channels,
        }
    }
}

/// Implementation of one node kind.
///
/// Only [`registration`](FilterApi::registration), the connector lists and
/// [`run`](FilterApi::run) are required.
pub trait FilterApi: Send + Sync + fmt::Debug {
    /// Slash-delimited registration, e.g. `org/cmf/image/root`.
    fn registration(&self) -> &str;

    /// Short display name.
    fn name(&self) -> &str {
        registration::short_name(self.registration())
    }

    /// Declared input connectors.
    fn plugs(&self) -> &[Connector];

    /// How many extra copies of the last plug may be added on demand.
    fn plugs_last_add(&self) -> usize {
        0
    }

    /// Declared output connectors.
    fn sockets(&self) -> &[Connector];

    /// Checks an option bag before it is stored on a core.
    fn validate_options(&self, _options: &crate::Options) -> GraphResult<()> {
        Ok(())
    }

    /// Serialises the node configuration. Defaults to YAML of the options.
    fn context_to_mem(&self, core: &FilterCore) -> GraphResult<String> {
        core.options().to_yaml()
    }

    /// Builds the backend context. Defaults to the serialised configuration.
    fn build_context(&self, pipeline: &Pipeline, node: NodeId) -> GraphResult<BackendContext> {
        let core = pipeline.node(node)?.core();
        Ok(Arc::new(self.context_to_mem(core)?))
    }

    /// Reacts to an event on the socket `plug` reads from.
    ///
    /// The default drops the consumer's cached context.
    fn plug_event(&self, pipeline: &Pipeline, plug: PlugRef, event: SocketEvent) {
        debug!(node = %plug.node, plug = plug.index, ?event, "plug event");
        pipeline.invalidate_context(plug.node);
    }

    /// Output dimensions. Defaults to those of the producer on plug 0.
    fn output_geometry(&self, pipeline: &Pipeline, node: NodeId) -> GraphResult<Geometry> {
        pipeline.upstream_geometry(PlugRef::new(node, 0))
    }

    /// Serves a pixel request for `node` on behalf of `requestor`.
    /// See [`crate::ticket`] for the protocol.
    fn run(
        &self,
        pipeline: &Pipeline,
        node: NodeId,
        requestor: PlugRef,
        ticket: &mut PixelAccess,
        array: &mut PixelArray,
    ) -> GraphResult<Status>;
}

/// Registration pattern → backend lookup table.
///
/// Later registrations shadow earlier ones matching the same pattern.
#[derive(Debug, Default)]
pub struct Registry {
    apis: RwLock<Vec<Arc<dyn FilterApi>>>,
}

impl Registry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in node kinds.
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        modules::register_builtins(&registry);
        registry
    }

    /// Process-wide registry with the built-in node kinds.
    pub fn global() -> Arc<Registry> {
        static INSTANCE: OnceLock<Arc<Registry>> = OnceLock::new();
        INSTANCE
            .get_or_init(|| Arc::new(Registry::with_builtins()))
            .clone()
    }

    /// Adds a backend.
    pub fn register(&self, api: Arc<dyn FilterApi>) {
        debug!(registration = api.registration(), "filter registered");
        self.apis
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(api);
    }

    /// Most recently registered backend matching `pattern`.
    pub fn resolve(&self, pattern: &str) -> Option<Arc<dyn FilterApi>> {
        self.apis
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .rev()
            .find(|api| registration::matches(api.registration(), pattern))
            .cloned()
    }

    /// Like [`Registry::resolve`] but failing with
    /// [`GraphError::BackendUnresolved`].
    pub fn require(&self, pattern: &str) -> GraphResult<Arc<dyn FilterApi>> {
        self.resolve(pattern)
            .ok_or_else(|| GraphError::BackendUnresolved(pattern.to_string()))
    }

    /// Registrations in registration order.
    pub fn registrations(&self) -> Vec<String> {
        self.apis
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|api| api.registration().to_string())
            .collect()
    }
}
