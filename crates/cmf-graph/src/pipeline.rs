//! Node arena: graph assembly and run dispatch.
//!
//! A [`Pipeline`] owns every node of a graph together with their plugs and
//! sockets. Links are index pairs, so the whole graph is released at once
//! when the pipeline drops.
//!
//! # Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use cmf_core::{Image, PixelArray};
//! use cmf_graph::prelude::*;
//!
//! let mut p = Pipeline::new();
//! let root = p.create_node("//image/root", Options::new())?;
//! p.set_socket_data(SocketRef::new(root, 0), Some(Arc::new(Image::filled(8, 8, &[0.5]))))?;
//! let out = p.create_node("//image/output", Options::new())?;
//! p.connect(root, Selector::Next, out, Selector::Next, ConnectFlags::default())?;
//!
//! let image = Arc::new(Image::descriptor(8, 8, 1));
//! let mut ticket = PixelAccess::new(0.0, 0.0, PlugRef::new(out, 0), AccessMode::Region, image.clone());
//! let mut array = PixelArray::new(image.bounds(), 1);
//! assert_eq!(p.run(out, PlugRef::new(out, 0), &mut ticket, &mut array)?, Status::Success);
//! assert_eq!(array.get(7, 7), Some(&[0.5][..]));
//! # Ok::<(), cmf_graph::GraphError>(())
//! ```

use std::sync::Arc;

use cmf_core::{Image, PixelArray};
use tracing::{debug, trace, warn};

use crate::api::{BackendContext, Geometry, Registry, SocketEvent, Status};
use crate::config::GraphConfig;
use crate::connector::{self, Connector};
use crate::filter::FilterCore;
use crate::node::{
    ConnectFlags, Direction, Edges, FilterNode, FilterPlug, NodeId, NodeState, PlugRef, Release,
    Selector, SocketRef,
};
use crate::options::{OptionValue, Options};
use crate::ticket::PixelAccess;
use crate::{GraphError, GraphResult};

/// Owner of all nodes of one filter graph.
#[derive(Debug)]
pub struct Pipeline {
    registry: Arc<Registry>,
    config: GraphConfig,
    nodes: Vec<Option<FilterNode>>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipeline {
    /// Empty pipeline using the global registry and default config.
    pub fn new() -> Self {
        Self::with_registry(Registry::global())
    }

    /// Empty pipeline resolving backends through `registry`.
    pub fn with_registry(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            config: GraphConfig::default(),
            nodes: Vec::new(),
        }
    }

    /// Builder: replaces the configuration.
    pub fn with_config(mut self, config: GraphConfig) -> Self {
        self.config = config;
        self
    }

    /// Execution configuration.
    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Backend registry.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    // ---------------------------------------------------------------
    // Nodes
    // ---------------------------------------------------------------

    /// Resolves `pattern`, validates `options` and adds a node.
    ///
    /// # Errors
    ///
    /// [`GraphError::BackendUnresolved`] when no backend matches,
    /// [`GraphError::InvalidOptions`] when the backend rejects the options.
    pub fn create_node(&mut self, pattern: &str, options: Options) -> GraphResult<NodeId> {
        let api = self.registry.require(pattern)?;
        let core = FilterCore::new(api, options)?;
        Ok(self.create_node_from_core(Arc::new(core)))
    }

    /// Adds a node sharing an existing core.
    pub fn create_node_from_core(&mut self, core: Arc<FilterCore>) -> NodeId {
        let id = NodeId(self.nodes.len());
        let node = FilterNode::new(id, core);
        debug!(
            node = %id,
            registration = node.registration(),
            plugs = node.plugs.len(),
            sockets = node.sockets.len(),
            "node created"
        );
        self.nodes.push(Some(node));
        id
    }

    /// Live node by id.
    pub fn node(&self, id: NodeId) -> GraphResult<&FilterNode> {
        self.nodes
            .get(id.0)
            .and_then(Option::as_ref)
            .ok_or(GraphError::NoSuchNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> GraphResult<&mut FilterNode> {
        self.nodes
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(GraphError::NoSuchNode(id))
    }

    /// Ids of all live nodes in creation order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.iter().flatten().map(|n| n.id)
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.nodes.iter().flatten().count()
    }

    /// `true` without live nodes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes a node.
    ///
    /// Dependents of its sockets receive [`SocketEvent::Released`] and are
    /// unlinked; its own plugs are disconnected without cascading.
    pub fn remove_node(&mut self, id: NodeId) -> GraphResult<()> {
        let node = self.node(id)?;
        let dependents: Vec<PlugRef> = node
            .sockets
            .iter()
            .flat_map(|s| s.dependents.iter().copied())
            .collect();
        let own: Vec<PlugRef> = node
            .plugs
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_connected())
            .map(|(i, _)| PlugRef::new(id, i))
            .collect();

        for plug in dependents {
            if let Some(p) = self.plug_mut(plug) {
                p.remote = None;
            }
            self.notify(plug, SocketEvent::Released);
        }
        for plug in own {
            self.disconnect(plug, Release::Keep)?;
        }
        self.nodes[id.0] = None;
        debug!(node = %id, "node removed");
        Ok(())
    }

    /// Connection and context state of a node.
    pub fn node_state(&self, id: NodeId) -> GraphResult<NodeState> {
        let node = self.node(id)?;
        Ok(NodeState {
            connection: node.connection(),
            context_built: node.cached_context().is_some(),
        })
    }

    // ---------------------------------------------------------------
    // Options and contexts
    // ---------------------------------------------------------------

    /// Sets one option, validating the result and dropping the cached context.
    pub fn set_option(
        &mut self,
        id: NodeId,
        key: &str,
        value: impl Into<OptionValue>,
    ) -> GraphResult<()> {
        let mut options = self.node(id)?.core.options().clone();
        options.set(key, value);
        self.set_options(id, options)
    }

    /// Replaces all options of a node.
    ///
    /// A core shared with other nodes is copied first, so they keep theirs.
    pub fn set_options(&mut self, id: NodeId, options: Options) -> GraphResult<()> {
        let node = self.node_mut(id)?;
        node.core.api().validate_options(&options)?;
        *Arc::make_mut(&mut node.core).options_mut() = options;
        node.store_context(None);
        debug!(node = %id, "options changed, context invalidated");
        Ok(())
    }

    /// Drops the cached backend context of a node.
    pub fn invalidate_context(&self, id: NodeId) {
        if let Ok(node) = self.node(id) {
            node.store_context(None);
            trace!(node = %id, "context invalidated");
        }
    }

    /// Cached or freshly built backend context.
    pub fn context(&self, id: NodeId) -> GraphResult<BackendContext> {
        let node = self.node(id)?;
        if let Some(ctx) = node.cached_context() {
            return Ok(ctx);
        }
        let api = node.core.api().clone();
        let ctx = api.build_context(self, id)?;
        node.store_context(Some(ctx.clone()));
        debug!(node = %id, registration = node.registration(), "context built");
        Ok(ctx)
    }

    // ---------------------------------------------------------------
    // Endpoints
    // ---------------------------------------------------------------

    fn plug_mut(&mut self, plug: PlugRef) -> Option<&mut FilterPlug> {
        self.nodes
            .get_mut(plug.node.0)?
            .as_mut()?
            .plugs
            .get_mut(plug.index)
    }

    /// Plug descriptor.
    pub fn plug(&self, plug: PlugRef) -> GraphResult<&FilterPlug> {
        self.node(plug.node)?
            .plugs
            .get(plug.index)
            .ok_or_else(|| GraphError::NoSuchPlug {
                node: plug.node,
                selector: plug.index.to_string(),
            })
    }

    /// Socket a plug reads from.
    pub fn remote_socket(&self, plug: PlugRef) -> GraphResult<SocketRef> {
        self.plug(plug)?.remote.ok_or(GraphError::NotConnected {
            node: plug.node,
            index: plug.index,
        })
    }

    /// Replaces a socket's output data and notifies its dependents.
    pub fn set_socket_data(&mut self, socket: SocketRef, data: Option<Arc<Image>>) -> GraphResult<()> {
        let node = self.node_mut(socket.node)?;
        let s = node
            .sockets
            .get_mut(socket.index)
            .ok_or_else(|| GraphError::NoSuchSocket {
                node: socket.node,
                selector: socket.index.to_string(),
            })?;
        s.data = data;
        let dependents = s.dependents.clone();
        node.store_context(None);
        for plug in dependents {
            self.notify(plug, SocketEvent::DataChanged);
        }
        Ok(())
    }

    /// Output data of a socket.
    pub fn socket_data(&self, socket: SocketRef) -> GraphResult<Option<Arc<Image>>> {
        let node = self.node(socket.node)?;
        let s = node
            .sockets
            .get(socket.index)
            .ok_or_else(|| GraphError::NoSuchSocket {
                node: socket.node,
                selector: socket.index.to_string(),
            })?;
        Ok(s.data.clone())
    }

    fn notify(&self, plug: PlugRef, event: SocketEvent) {
        if let Ok(node) = self.node(plug.node) {
            let api = node.core.api().clone();
            api.plug_event(self, plug, event);
        }
    }

    fn resolve_socket(&self, id: NodeId, sel: Selector<'_>) -> GraphResult<usize> {
        let node = self.node(id)?;
        let found = match sel {
            Selector::Index(i) => (i < node.sockets.len()).then_some(i),
            Selector::Name(n) => node.sockets.iter().position(|s| s.connector.nick() == n),
            Selector::Next => (!node.sockets.is_empty()).then_some(0),
        };
        found.ok_or_else(|| GraphError::NoSuchSocket {
            node: id,
            selector: sel.to_string(),
        })
    }

    /// Resolves a plug selector to an index and connector, without growing.
    fn resolve_plug(&self, id: NodeId, sel: Selector<'_>) -> GraphResult<(usize, Connector)> {
        let node = self.node(id)?;
        let declared = node.core.api().plugs().len();
        let limit = declared.saturating_add(node.core.api().plugs_last_add());
        let template = || node.core.api().plugs().last().cloned();
        let existing = |i: usize| node.plugs.get(i).map(|p| p.connector.clone());

        let found = match sel {
            Selector::Index(i) if i < node.plugs.len() => existing(i).map(|c| (i, c)),
            Selector::Index(i) if i < limit => template().map(|c| (i, c)),
            Selector::Index(_) => None,
            Selector::Name(n) => node
                .plugs
                .iter()
                .position(|p| p.connector.nick() == n)
                .and_then(|i| existing(i).map(|c| (i, c))),
            Selector::Next => match node.plugs.iter().position(|p| !p.is_connected()) {
                Some(i) => existing(i).map(|c| (i, c)),
                None if node.plugs.len() < limit => template().map(|c| (node.plugs.len(), c)),
                None => None,
            },
        };
        found.ok_or_else(|| GraphError::NoSuchPlug {
            node: id,
            selector: sel.to_string(),
        })
    }

    /// `true` if `target` can be reached from `from` walking upstream.
    fn is_upstream(&self, from: NodeId, target: NodeId) -> bool {
        let mut stack = vec![from];
        let mut seen = vec![false; self.nodes.len()];
        while let Some(id) = stack.pop() {
            if id == target {
                return true;
            }
            if std::mem::replace(&mut seen[id.0], true) {
                continue;
            }
            if let Ok(node) = self.node(id) {
                stack.extend(node.plugs.iter().filter_map(|p| p.remote).map(|s| s.node));
            }
        }
        false
    }

    /// Links `source`'s socket to `target`'s plug.
    ///
    /// Checks run before anything changes, so a failed connect leaves both
    /// endpoints as they were.
    ///
    /// # Errors
    ///
    /// - [`GraphError::NoSuchSocket`] / [`GraphError::NoSuchPlug`] for bad selectors
    /// - [`GraphError::Cycle`] if `target` already feeds `source`
    /// - [`GraphError::AlreadyConnected`] for a linked plug without
    ///   [`ConnectFlags::replace`]
    /// - [`GraphError::ConnectorMismatch`] for incompatible connectors
    pub fn connect<'a, 'b>(
        &mut self,
        source: NodeId,
        socket: impl Into<Selector<'a>>,
        target: NodeId,
        plug: impl Into<Selector<'b>>,
        flags: ConnectFlags,
    ) -> GraphResult<()> {
        let (socket, plug) = (socket.into(), plug.into());
        trace!(%source, %socket, %target, %plug, "connect");

        let socket_idx = self.resolve_socket(source, socket)?;
        let (plug_idx, plug_connector) = self.resolve_plug(target, plug)?;

        if self.is_upstream(source, target) {
            return Err(GraphError::Cycle {
                from: source,
                to: target,
            });
        }

        let target_ref = PlugRef::new(target, plug_idx);
        let existing = self
            .node(target)?
            .plugs
            .get(plug_idx)
            .and_then(|p| p.remote);
        if existing.is_some() && !flags.replace {
            return Err(GraphError::AlreadyConnected {
                node: target,
                index: plug_idx,
            });
        }

        let socket_connector = &self.node(source)?.sockets[socket_idx].connector;
        connector::check(socket_connector, &plug_connector).map_err(|reason| {
            GraphError::ConnectorMismatch {
                socket: socket_connector.nick().to_string(),
                plug: plug_connector.nick().to_string(),
                reason,
            }
        })?;

        if existing.is_some() {
            self.disconnect(target_ref, Release::Keep)?;
        }

        let node = self.node_mut(target)?;
        while node.plugs.len() <= plug_idx {
            let mut grown = plug_connector.clone();
            grown.set_is_plug(true);
            node.plugs.push(FilterPlug::new(grown));
        }
        node.plugs[plug_idx].remote = Some(SocketRef::new(source, socket_idx));
        self.node_mut(source)?.sockets[socket_idx]
            .dependents
            .push(target_ref);

        debug!(%source, socket = socket_idx, %target, plug = plug_idx, "connected");
        self.notify(target_ref, SocketEvent::Connected);
        Ok(())
    }

    /// Unlinks a plug.
    ///
    /// With [`Release::Cascade`], a producer left without any dependents is
    /// removed and the release continues through its own plugs.
    pub fn disconnect(&mut self, plug: PlugRef, release: Release) -> GraphResult<()> {
        let remote = self.remote_socket(plug)?;
        if let Some(p) = self.plug_mut(plug) {
            p.remote = None;
        }

        let producer = self.node_mut(remote.node)?;
        if let Some(s) = producer.sockets.get_mut(remote.index) {
            s.dependents.retain(|d| *d != plug);
        }
        let orphaned = producer.sockets.iter().all(|s| s.dependents.is_empty());
        debug!(node = %plug.node, plug = plug.index, producer = %remote.node, "disconnected");
        self.notify(plug, SocketEvent::Disconnected);

        if release == Release::Cascade && orphaned {
            let upstream: Vec<PlugRef> = self
                .node(remote.node)?
                .plugs
                .iter()
                .enumerate()
                .filter(|(_, p)| p.is_connected())
                .map(|(i, _)| PlugRef::new(remote.node, i))
                .collect();
            for p in upstream {
                self.disconnect(p, Release::Cascade)?;
            }
            self.nodes[remote.node.0] = None;
            debug!(node = %remote.node, "producer released");
        }
        Ok(())
    }

    /// Counts plugs (`Input`) or socket links (`Output`) of a node.
    ///
    /// With [`Edges::All`], `Output` counts sockets rather than links.
    pub fn edge_count(&self, id: NodeId, direction: Direction, edges: Edges) -> GraphResult<usize> {
        let node = self.node(id)?;
        let inputs = match edges {
            Edges::All => node.plugs.len(),
            Edges::Connected => node.plugs.iter().filter(|p| p.is_connected()).count(),
        };
        let outputs = match edges {
            Edges::All => node.sockets.len(),
            Edges::Connected => node.sockets.iter().map(|s| s.dependents.len()).sum(),
        };
        Ok(match direction {
            Direction::Input => inputs,
            Direction::Output => outputs,
            Direction::Both => inputs + outputs,
        })
    }

    // ---------------------------------------------------------------
    // Execution
    // ---------------------------------------------------------------

    /// Output dimensions of a node.
    pub fn output_geometry(&self, id: NodeId) -> GraphResult<Geometry> {
        let api = self.node(id)?.core.api().clone();
        api.output_geometry(self, id)
    }

    /// Output dimensions of the producer feeding `plug`.
    pub fn upstream_geometry(&self, plug: PlugRef) -> GraphResult<Geometry> {
        let remote = self.remote_socket(plug)?;
        self.output_geometry(remote.node)
    }

    /// Dispatches a request to `node`'s backend on behalf of `requestor`.
    ///
    /// Exhausted tickets return [`Status::Terminal`] without calling the
    /// backend.
    ///
    /// # Errors
    ///
    /// [`GraphError::RecursionLimit`] once nesting exceeds
    /// [`GraphConfig::max_depth`], [`GraphError::NotConnected`] while a
    /// mandatory plug is open, otherwise whatever the backend reports.
    pub fn run(
        &self,
        id: NodeId,
        requestor: PlugRef,
        ticket: &mut PixelAccess,
        array: &mut PixelArray,
    ) -> GraphResult<Status> {
        let node = self.node(id)?;
        trace!(
            node = %id,
            registration = node.registration(),
            ticket = ticket.id(),
            roi = %ticket.output_image_roi(),
            depth = ticket.depth,
            "run"
        );
        if ticket.is_exhausted() {
            return Ok(Status::Terminal);
        }
        if ticket.depth >= self.config.max_depth {
            return Err(GraphError::RecursionLimit(self.config.max_depth));
        }
        if let Some(index) = node
            .plugs
            .iter()
            .position(|p| p.connector.is_mandatory() && !p.is_connected())
        {
            debug!(node = %id, index, "mandatory plug open");
            return Err(GraphError::NotConnected { node: id, index });
        }

        let api = node.core.api().clone();
        ticket.depth += 1;
        let result = api.run(self, id, requestor, ticket, array);
        ticket.depth -= 1;
        result
    }

    /// Pulls through a plug: runs the producer behind its socket with the
    /// plug as requestor.
    ///
    /// # Errors
    ///
    /// [`GraphError::NotConnected`] for an unlinked plug.
    pub fn run_plug(
        &self,
        plug: PlugRef,
        ticket: &mut PixelAccess,
        array: &mut PixelArray,
    ) -> GraphResult<Status> {
        let remote = self.remote_socket(plug)?;
        self.run(remote.node, plug, ticket, array)
    }

    /// Checks a fan-out node's connected plug count against `regions`.
    ///
    /// Returns how many leading plug indices pair with a region. Plugs in
    /// that range may still be open after a disconnect.
    pub fn check_upstream_count(&self, id: NodeId, regions: usize) -> GraphResult<usize> {
        let plugs = self.edge_count(id, Direction::Input, Edges::Connected)?;
        if plugs != regions {
            if self.config.strict_upstream_count {
                return Err(GraphError::UpstreamCountMismatch {
                    node: id,
                    plugs,
                    regions,
                });
            }
            warn!(node = %id, plugs, regions, "plugs!=regions, using the smaller count");
        }
        Ok(self.node(id)?.plugs.len().min(regions))
    }
}
