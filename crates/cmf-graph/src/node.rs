//! Nodes, plugs and sockets.
//!
//! Nodes live in a [`Pipeline`](crate::Pipeline) arena and are addressed by
//! [`NodeId`]. Plugs and sockets refer to each other through
//! [`SocketRef`]/[`PlugRef`] indices, never through owning pointers, so the
//! plug → socket → dependents cycle holds no strong references.
//!
//! ```text
//!  producer                      consumer
//! ┌────────┐ socket 0    plug 0 ┌────────┐
//! │  root  │──────────────────▶│ output │
//! └────────┘  dependents: [..]  └────────┘
//! ```

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use cmf_core::Image;

use crate::api::BackendContext;
use crate::connector::Connector;
use crate::filter::FilterCore;

/// Arena index of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Input endpoint address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlugRef {
    /// Owning node.
    pub node: NodeId,
    /// Plug index.
    pub index: usize,
}

impl PlugRef {
    /// Creates a plug address.
    pub const fn new(node: NodeId, index: usize) -> Self {
        Self { node, index }
    }
}

/// Output endpoint address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SocketRef {
    /// Owning node.
    pub node: NodeId,
    /// Socket index.
    pub index: usize,
}

impl SocketRef {
    /// Creates a socket address.
    pub const fn new(node: NodeId, index: usize) -> Self {
        Self { node, index }
    }
}

/// Endpoint selector used by [`Pipeline::connect`](crate::Pipeline::connect).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector<'a> {
    /// Position.
    Index(usize),
    /// Connector nick.
    Name(&'a str),
    /// First free plug, growing the plug list if the backend allows it.
    /// For sockets: the first socket.
    Next,
}

impl From<usize> for Selector<'_> {
    fn from(i: usize) -> Self {
        Selector::Index(i)
    }
}

impl<'a> From<&'a str> for Selector<'a> {
    fn from(name: &'a str) -> Self {
        Selector::Name(name)
    }
}

impl fmt::Display for Selector<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Index(i) => write!(f, "{i}"),
            Selector::Name(n) => write!(f, "{n:?}"),
            Selector::Next => f.write_str("<next>"),
        }
    }
}

/// Traversal / counting direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Towards producers (through plugs).
    Input,
    /// Towards consumers (through sockets).
    Output,
    /// Both ways.
    Both,
}

/// Which endpoints to count or list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Edges {
    /// Only linked endpoints.
    #[default]
    Connected,
    /// Every endpoint.
    All,
}

/// Options for [`Pipeline::connect`](crate::Pipeline::connect).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConnectFlags {
    /// Drop an existing link on the plug instead of failing.
    pub replace: bool,
}

impl ConnectFlags {
    /// Replace an existing link.
    pub const REPLACE: Self = Self { replace: true };
}

/// What happens to a producer left without dependents on disconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Release {
    /// Keep it in the pipeline.
    #[default]
    Keep,
    /// Remove it and continue upstream.
    Cascade,
}

/// Connection progress of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connection {
    /// No endpoint linked.
    Unconnected,
    /// Some endpoints linked.
    PartiallyConnected,
    /// Every endpoint linked.
    FullyConnected,
}

/// Observable node state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeState {
    /// Link progress.
    pub connection: Connection,
    /// Whether a backend context is cached.
    pub context_built: bool,
}

/// Input endpoint.
#[derive(Debug, Clone)]
pub struct FilterPlug {
    pub(crate) connector: Connector,
    pub(crate) remote: Option<SocketRef>,
}

impl FilterPlug {
    pub(crate) fn new(connector: Connector) -> Self {
        Self {
            connector,
            remote: None,
        }
    }

    /// Connector descriptor.
    pub fn connector(&self) -> &Connector {
        &self.connector
    }

    /// Socket this plug reads from.
    pub fn remote(&self) -> Option<SocketRef> {
        self.remote
    }

    /// Whether the plug is linked.
    pub fn is_connected(&self) -> bool {
        self.remote.is_some()
    }
}

/// Output endpoint.
#[derive(Debug, Clone)]
pub struct FilterSocket {
    pub(crate) connector: Connector,
    pub(crate) data: Option<Arc<Image>>,
    pub(crate) dependents: Vec<PlugRef>,
}

impl FilterSocket {
    pub(crate) fn new(connector: Connector) -> Self {
        Self {
            connector,
            data: None,
            dependents: Vec::new(),
        }
    }

    /// Connector descriptor.
    pub fn connector(&self) -> &Connector {
        &self.connector
    }

    /// Output data handle.
    pub fn data(&self) -> Option<&Arc<Image>> {
        self.data.as_ref()
    }

    /// Plugs reading from this socket, in connection order.
    pub fn dependents(&self) -> &[PlugRef] {
        &self.dependents
    }
}

/// A graph vertex: a filter core plus concrete endpoints and cached context.
pub struct FilterNode {
    pub(crate) id: NodeId,
    pub(crate) core: Arc<FilterCore>,
    pub(crate) plugs: Vec<FilterPlug>,
    pub(crate) sockets: Vec<FilterSocket>,
    pub(crate) context: RwLock<Option<BackendContext>>,
}

impl FilterNode {
    pub(crate) fn new(id: NodeId, core: Arc<FilterCore>) -> Self {
        let api = core.api();
        let plugs = api
            .plugs()
            .iter()
            .cloned()
            .map(|mut c| {
                c.set_is_plug(true);
                FilterPlug::new(c)
            })
            .collect();
        let sockets = api
            .sockets()
            .iter()
            .cloned()
            .map(|mut c| {
                c.set_is_plug(false);
                FilterSocket::new(c)
            })
            .collect();
        Self {
            id,
            core,
            plugs,
            sockets,
            context: RwLock::new(None),
        }
    }

    /// Arena id.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Shared filter core.
    pub fn core(&self) -> &Arc<FilterCore> {
        &self.core
    }

    /// Backend registration.
    pub fn registration(&self) -> &str {
        self.core.registration()
    }

    /// Input endpoints.
    pub fn plugs(&self) -> &[FilterPlug] {
        &self.plugs
    }

    /// Output endpoints.
    pub fn sockets(&self) -> &[FilterSocket] {
        &self.sockets
    }

    /// Link progress over all plugs and sockets.
    pub fn connection(&self) -> Connection {
        let total = self.plugs.len() + self.sockets.len();
        let linked = self.plugs.iter().filter(|p| p.is_connected()).count()
            + self.sockets.iter().filter(|s| !s.dependents.is_empty()).count();
        match linked {
            0 if total > 0 => Connection::Unconnected,
            n if n == total => Connection::FullyConnected,
            _ => Connection::PartiallyConnected,
        }
    }

    /// Cached backend context, if built.
    pub fn cached_context(&self) -> Option<BackendContext> {
        self.context
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn store_context(&self, ctx: Option<BackendContext>) {
        *self.context.write().unwrap_or_else(PoisonError::into_inner) = ctx;
    }
}

impl fmt::Debug for FilterNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterNode")
            .field("id", &self.id)
            .field("registration", &self.registration())
            .field("plugs", &self.plugs.len())
            .field("sockets", &self.sockets.len())
            .field("context_built", &self.cached_context().is_some())
            .finish()
    }
}
