//! Directed dependency-graph container used by `remora`.
//!
//! The graph keeps two mirrored adjacency indices (outgoing and incoming) so
//! that successor and predecessor queries are both O(1)-amortized. Nodes and
//! the edges of each adjacency set iterate in insertion order; the ordering
//! algorithms in `remora` rely on that for deterministic output.

use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;
use std::fmt;
use std::hash::Hash;

type OrderedMap<K, V> = IndexMap<K, V, FxBuildHasher>;

pub type Result<T> = std::result::Result<T, GraphError>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("node {node} is not in the graph")]
    NodeNotFound { node: String },

    #[error("no edge from {origin} to {destination}")]
    EdgeNotFound { origin: String, destination: String },
}

impl GraphError {
    fn node_not_found(node: &impl fmt::Debug) -> Self {
        Self::NodeNotFound {
            node: format!("{node:?}"),
        }
    }

    fn edge_not_found(origin: &impl fmt::Debug, destination: &impl fmt::Debug) -> Self {
        Self::EdgeNotFound {
            origin: format!("{origin:?}"),
            destination: format!("{destination:?}"),
        }
    }
}

/// A mutable directed graph with at most one labeled edge per ordered node
/// pair.
///
/// An edge `origin -> destination` reads as "origin depends on destination".
/// Node identity is opaque: the graph only hashes and compares nodes, it never
/// inspects them. Edge labels are stored and returned untouched; re-adding an
/// edge overwrites its label.
#[derive(Debug, Clone)]
pub struct DirectedGraph<N, E> {
    out_edges: OrderedMap<N, OrderedMap<N, E>>,
    in_edges: OrderedMap<N, OrderedMap<N, E>>,
}

impl<N, E> Default for DirectedGraph<N, E> {
    fn default() -> Self {
        Self {
            out_edges: OrderedMap::default(),
            in_edges: OrderedMap::default(),
        }
    }
}

impl<N, E> DirectedGraph<N, E>
where
    N: Eq + Hash + Clone + fmt::Debug,
    E: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_count(&self) -> usize {
        self.out_edges.len()
    }

    pub fn edge_count(&self) -> usize {
        self.out_edges.values().map(|out| out.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.out_edges.is_empty()
    }

    pub fn has_node(&self, node: &N) -> bool {
        self.out_edges.contains_key(node)
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &N> {
        self.out_edges.keys()
    }

    /// All `(origin, destination, label)` triples, grouped by origin in node
    /// insertion order and by destination in edge insertion order.
    pub fn edges(&self) -> impl Iterator<Item = (&N, &N, &E)> {
        self.out_edges.iter().flat_map(|(origin, out)| {
            out.iter()
                .map(move |(destination, label)| (origin, destination, label))
        })
    }

    /// Inserts `node` with empty adjacency sets. No-op if already present.
    pub fn add_node(&mut self, node: N) {
        if self.out_edges.contains_key(&node) {
            return;
        }
        self.out_edges.insert(node.clone(), OrderedMap::default());
        self.in_edges.insert(node, OrderedMap::default());
    }

    /// Sets the edge `origin -> destination`, overwriting any existing label.
    ///
    /// Both endpoints must already be nodes of the graph. The check happens
    /// before either index is touched, so a failed add leaves both indices
    /// unchanged.
    pub fn add_edge(&mut self, origin: &N, destination: &N, label: E) -> Result<()> {
        if !self.out_edges.contains_key(origin) {
            return Err(GraphError::node_not_found(origin));
        }
        if !self.in_edges.contains_key(destination) {
            return Err(GraphError::node_not_found(destination));
        }

        if let Some(out) = self.out_edges.get_mut(origin) {
            out.insert(destination.clone(), label.clone());
        }
        if let Some(incoming) = self.in_edges.get_mut(destination) {
            incoming.insert(origin.clone(), label);
        }
        Ok(())
    }

    /// Removes `node` and every edge touching it.
    ///
    /// Taking the node's own adjacency sets out first also covers a self-loop:
    /// its mirrored entries disappear with the node, and the loops below find
    /// the node already gone.
    pub fn remove_node(&mut self, node: &N) -> Result<()> {
        let Some(successors) = self.out_edges.shift_remove(node) else {
            return Err(GraphError::node_not_found(node));
        };
        let predecessors = self.in_edges.shift_remove(node).unwrap_or_default();

        for destination in successors.keys() {
            if let Some(incoming) = self.in_edges.get_mut(destination) {
                incoming.shift_remove(node);
            }
        }
        for origin in predecessors.keys() {
            if let Some(out) = self.out_edges.get_mut(origin) {
                out.shift_remove(node);
            }
        }
        Ok(())
    }

    /// Removes the edge `origin -> destination` if present.
    ///
    /// A missing edge is a no-op; a missing *node* is still an error. Cycle
    /// breaking relies on the distinction: it deletes edges that may or may
    /// not exist, always between nodes known to be present.
    pub fn remove_edge(&mut self, origin: &N, destination: &N) -> Result<()> {
        if !self.out_edges.contains_key(origin) {
            return Err(GraphError::node_not_found(origin));
        }
        if !self.in_edges.contains_key(destination) {
            return Err(GraphError::node_not_found(destination));
        }

        if let Some(out) = self.out_edges.get_mut(origin) {
            out.shift_remove(destination);
        }
        if let Some(incoming) = self.in_edges.get_mut(destination) {
            incoming.shift_remove(origin);
        }
        Ok(())
    }

    pub fn has_edge(&self, origin: &N, destination: &N) -> bool {
        self.out_edges
            .get(origin)
            .is_some_and(|out| out.contains_key(destination))
    }

    /// The label of the edge `origin -> destination`.
    pub fn edge(&self, origin: &N, destination: &N) -> Result<&E> {
        let Some(out) = self.out_edges.get(origin) else {
            return Err(GraphError::node_not_found(origin));
        };
        if !self.in_edges.contains_key(destination) {
            return Err(GraphError::node_not_found(destination));
        }
        out.get(destination)
            .ok_or_else(|| GraphError::edge_not_found(origin, destination))
    }

    /// Nodes that `node` depends on, in edge insertion order.
    pub fn successors(&self, node: &N) -> Result<impl Iterator<Item = &N>> {
        self.out_edges
            .get(node)
            .map(|out| out.keys())
            .ok_or_else(|| GraphError::node_not_found(node))
    }

    /// Nodes that depend on `node`, in edge insertion order.
    pub fn predecessors(&self, node: &N) -> Result<impl Iterator<Item = &N>> {
        self.in_edges
            .get(node)
            .map(|incoming| incoming.keys())
            .ok_or_else(|| GraphError::node_not_found(node))
    }

    /// Merges `other`'s nodes and edges into this graph. Edges present in both
    /// graphs take `other`'s label; nothing is removed.
    pub fn update(&mut self, other: &Self) {
        for node in other.out_edges.keys() {
            self.add_node(node.clone());
        }
        for (origin, out) in &other.out_edges {
            if let Some(mine) = self.out_edges.get_mut(origin) {
                for (destination, label) in out {
                    mine.insert(destination.clone(), label.clone());
                }
            }
        }
        for (destination, incoming) in &other.in_edges {
            if let Some(mine) = self.in_edges.get_mut(destination) {
                for (origin, label) in incoming {
                    mine.insert(origin.clone(), label.clone());
                }
            }
        }
    }
}
