//! Traversal snapshots of a pipeline.
//!
//! A [`FilterGraph`] lists the nodes and links reachable from one node. It
//! copies ids only and is rebuilt whenever the topology matters again.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt::Write as _;

use tracing::debug;

use crate::node::{Direction, Edges, NodeId, PlugRef, SocketRef};
use crate::pipeline::Pipeline;
use crate::{registration, GraphResult};

/// A socket → plug link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Edge {
    /// Producing end.
    pub socket: SocketRef,
    /// Consuming end.
    pub plug: PlugRef,
}

/// Nodes and links reachable from a start node.
#[derive(Debug, Clone, Default)]
pub struct FilterGraph {
    nodes: Vec<NodeId>,
    edges: Vec<Edge>,
    open_plugs: Vec<PlugRef>,
}

impl FilterGraph {
    /// Walks the pipeline breadth first from `start`.
    ///
    /// `Input` follows plugs to their producers, `Output` follows socket
    /// dependents. Neighbours are visited in ascending plug order. With
    /// [`Edges::All`] unlinked plugs of visited nodes are recorded too.
    pub fn build(
        pipeline: &Pipeline,
        start: NodeId,
        direction: Direction,
        flags: Edges,
    ) -> GraphResult<Self> {
        let mut graph = Self::default();
        let mut seen = BTreeSet::new();
        let mut edges = BTreeSet::new();
        let mut queue = VecDeque::from([start]);
        seen.insert(start);

        while let Some(id) = queue.pop_front() {
            let node = pipeline.node(id)?;
            graph.nodes.push(id);

            if matches!(direction, Direction::Input | Direction::Both) {
                for (index, plug) in node.plugs().iter().enumerate() {
                    let plug_ref = PlugRef::new(id, index);
                    match plug.remote() {
                        Some(socket) => {
                            edges.insert(Edge {
                                socket,
                                plug: plug_ref,
                            });
                            if seen.insert(socket.node) {
                                queue.push_back(socket.node);
                            }
                        }
                        None if flags == Edges::All => graph.open_plugs.push(plug_ref),
                        None => {}
                    }
                }
            }

            if matches!(direction, Direction::Output | Direction::Both) {
                for (index, socket) in node.sockets().iter().enumerate() {
                    let mut dependents = socket.dependents().to_vec();
                    dependents.sort();
                    for plug in dependents {
                        edges.insert(Edge {
                            socket: SocketRef::new(id, index),
                            plug,
                        });
                        if seen.insert(plug.node) {
                            queue.push_back(plug.node);
                        }
                    }
                }
            }
        }

        graph.edges = edges.into_iter().collect();
        debug!(
            %start,
            nodes = graph.nodes.len(),
            edges = graph.edges.len(),
            "graph built"
        );
        Ok(graph)
    }

    /// Number of links.
    pub fn count_edges(&self) -> usize {
        self.edges.len()
    }

    /// Visited nodes in discovery order.
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    /// Links, sorted by socket then plug.
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Unlinked plugs, only collected with [`Edges::All`].
    pub fn open_plugs(&self) -> &[PlugRef] {
        &self.open_plugs
    }

    /// The `index`-th visited node whose registration matches `pattern`.
    ///
    /// An empty pattern matches every node.
    pub fn node(&self, pipeline: &Pipeline, index: usize, pattern: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .copied()
            .filter(|id| {
                pipeline
                    .node(*id)
                    .is_ok_and(|n| registration::matches(n.registration(), pattern))
            })
            .nth(index)
    }

    /// Visited nodes ordered so every producer precedes its consumers.
    ///
    /// Ties keep visiting order. Holds for snapshots in any direction.
    pub fn producers_first(&self) -> Vec<NodeId> {
        let mut pending: BTreeMap<NodeId, usize> = self.nodes.iter().map(|id| (*id, 0)).collect();
        let linked: Vec<&Edge> = self
            .edges
            .iter()
            .filter(|e| {
                pending.contains_key(&e.socket.node) && pending.contains_key(&e.plug.node)
            })
            .collect();
        for e in &linked {
            *pending.entry(e.plug.node).or_default() += 1;
        }

        let mut ready: VecDeque<NodeId> = self
            .nodes
            .iter()
            .copied()
            .filter(|id| pending.get(id) == Some(&0))
            .collect();
        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(id) = ready.pop_front() {
            order.push(id);
            for e in linked.iter().filter(|e| e.socket.node == id) {
                if let Some(n) = pending.get_mut(&e.plug.node) {
                    *n -= 1;
                    if *n == 0 {
                        ready.push_back(e.plug.node);
                    }
                }
            }
        }
        // pipelines reject cycles; keep any leftovers rather than drop them
        for id in &self.nodes {
            if !order.contains(id) {
                order.push(*id);
            }
        }
        order
    }

    /// Builds the backend context of every visited node, producers first.
    pub fn prepare_contexts(&self, pipeline: &Pipeline) -> GraphResult<()> {
        for id in self.producers_first() {
            pipeline.context(id)?;
        }
        Ok(())
    }

    /// Graphviz rendering of the snapshot.
    pub fn to_dot(&self, pipeline: &Pipeline) -> String {
        let mut out = String::from("digraph filters {\n  rankdir=LR;\n");
        for id in &self.nodes {
            let label = pipeline
                .node(*id)
                .map(|n| n.core().api().name().to_string())
                .unwrap_or_default();
            let _ = writeln!(out, "  n{} [label=\"{} {}\"];", id.0, id, label);
        }
        for e in &self.edges {
            let _ = writeln!(
                out,
                "  n{} -> n{} [taillabel=\"{}\", headlabel=\"{}\"];",
                e.socket.node.0, e.plug.node.0, e.socket.index, e.plug.index
            );
        }
        for p in &self.open_plugs {
            let _ = writeln!(out, "  open{0}_{1} [shape=point];", p.node.0, p.index);
            let _ = writeln!(out, "  open{0}_{1} -> n{0} [style=dashed];", p.node.0, p.index);
        }
        out.push_str("}\n");
        out
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use cmf_core::{Image, Rectangle};

    use super::*;
    use crate::node::{ConnectFlags, Selector};
    use crate::options::Options;

    fn split_pipeline() -> (Pipeline, NodeId, NodeId, NodeId, NodeId) {
        let mut p = Pipeline::new();
        let a = p.create_node("//image/root", Options::new()).unwrap();
        let b = p.create_node("//image/root", Options::new()).unwrap();
        for id in [a, b] {
            p.set_socket_data(SocketRef::new(id, 0), Some(Arc::new(Image::new(4, 4, 1))))
                .unwrap();
        }
        let opts = Options::new()
            .with("0", Rectangle::new(0.0, 0.0, 2.0, 4.0))
            .with("1", Rectangle::new(2.0, 0.0, 2.0, 4.0));
        let split = p.create_node("//image/regions", opts).unwrap();
        let out = p.create_node("//image/output", Options::new()).unwrap();
        p.connect(a, Selector::Next, split, Selector::Next, ConnectFlags::default())
            .unwrap();
        p.connect(b, Selector::Next, split, Selector::Next, ConnectFlags::default())
            .unwrap();
        p.connect(split, 0usize, out, 0usize, ConnectFlags::default()).unwrap();
        (p, a, b, split, out)
    }

    #[test]
    fn test_input_walk() {
        let (p, a, b, split, out) = split_pipeline();
        let g = FilterGraph::build(&p, out, Direction::Input, Edges::Connected).unwrap();
        assert_eq!(g.nodes(), &[out, split, a, b]);
        assert_eq!(g.count_edges(), 3);
        assert!(g.open_plugs().is_empty());
    }

    #[test]
    fn test_output_walk_from_leaf() {
        let (p, a, _, split, out) = split_pipeline();
        let g = FilterGraph::build(&p, a, Direction::Output, Edges::Connected).unwrap();
        assert_eq!(g.nodes(), &[a, split, out]);
        assert_eq!(g.count_edges(), 2);
    }

    #[test]
    fn test_producers_first_in_every_direction() {
        let (p, a, b, split, out) = split_pipeline();
        let g = FilterGraph::build(&p, a, Direction::Output, Edges::Connected).unwrap();
        assert_eq!(g.producers_first(), vec![a, split, out]);

        let g = FilterGraph::build(&p, out, Direction::Input, Edges::Connected).unwrap();
        assert_eq!(g.producers_first(), vec![a, b, split, out]);

        let g = FilterGraph::build(&p, split, Direction::Both, Edges::Connected).unwrap();
        let order = g.producers_first();
        assert_eq!(order.len(), 4);
        let pos = |id| order.iter().position(|n| *n == id).unwrap();
        assert!(pos(a) < pos(split) && pos(b) < pos(split) && pos(split) < pos(out));
    }

    #[test]
    fn test_node_lookup_by_pattern() {
        let (p, a, b, split, out) = split_pipeline();
        let g = FilterGraph::build(&p, out, Direction::Input, Edges::All).unwrap();
        assert_eq!(g.node(&p, 0, "//image/root"), Some(a));
        assert_eq!(g.node(&p, 1, "//image/root"), Some(b));
        assert_eq!(g.node(&p, 2, "//image/root"), None);
        assert_eq!(g.node(&p, 0, "regions"), Some(split));
        assert_eq!(g.node(&p, 0, ""), Some(out));
    }

    #[test]
    fn test_contexts_and_dot() {
        let (p, _, _, split, out) = split_pipeline();
        let g = FilterGraph::build(&p, out, Direction::Both, Edges::Connected).unwrap();
        g.prepare_contexts(&p).unwrap();
        assert!(p.node_state(split).unwrap().context_built);

        let dot = g.to_dot(&p);
        assert!(dot.starts_with("digraph filters"));
        assert!(dot.contains(&format!("n{} -> n{}", split.0, out.0)));
    }
}
