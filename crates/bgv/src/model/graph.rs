//! Node/edge graph aggregate.

use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::LookupError;
use crate::model::{NodeClass, Props, Value};

/// Node identifier, unique within one graph.
pub type NodeId = i32;

/// Index of an edge in its graph's edge list.
///
/// Edge ids are invalidated by structural removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(pub usize);

/// Presentation category of a node, set by annotators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Control,
    Memory,
    Calc,
    Input,
    Info,
    Virtual,
    Alloc,
    Other,
}

/// Presentation category of an edge, set by annotators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    Control,
    Data,
    Info,
    Other,
}

/// Spotlight emphasis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emphasis {
    Lit,
    Shaded,
}

/// Presentation attributes of a node.
///
/// These are written by annotators and read by the serializer. They are
/// not part of the decoded data and are ignored by [`Graph::diff`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeDisplay {
    pub label: Option<String>,
    /// Label before any stamp text was appended.
    pub base_label: Option<String>,
    pub kind: Option<NodeKind>,
    /// Drawn as a small copy next to each user instead of on its own.
    pub inlined: bool,
    pub emphasis: Option<Emphasis>,
}

/// Presentation attributes of an edge.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EdgeDisplay {
    pub label: Option<String>,
    pub kind: Option<EdgeKind>,
    /// Stands in for a collapsed chain or fan of edges.
    pub reduced: bool,
    /// A loop back edge. Does not constrain layout.
    pub back_edge: bool,
    pub emphasis: Option<Emphasis>,
}

/// A graph node.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub class: Option<Arc<NodeClass>>,
    /// Fixed nodes have a control predecessor.
    pub has_predecessor: bool,
    pub props: Props,
    pub display: NodeDisplay,
    inputs: Vec<EdgeId>,
    outputs: Vec<EdgeId>,
}

impl Node {
    fn new(id: NodeId, class: Option<Arc<NodeClass>>, props: Props) -> Self {
        Self {
            id,
            class,
            has_predecessor: false,
            props,
            display: NodeDisplay::default(),
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    /// Incoming edges, in input-ordinal order.
    pub fn inputs(&self) -> &[EdgeId] {
        &self.inputs
    }

    /// Outgoing edges, in creation order.
    pub fn outputs(&self) -> &[EdgeId] {
        &self.outputs
    }

    /// Returns a property by key.
    pub fn prop(&self, key: &str) -> Option<&Value> {
        self.props.get(key)
    }

    /// Returns a string property by key.
    pub fn prop_str(&self, key: &str) -> Option<&str> {
        self.props.get(key).and_then(Value::as_str)
    }

    /// Simple class name, if the node has a class.
    pub fn class_name(&self) -> Option<&str> {
        self.class.as_deref().map(NodeClass::simple_name)
    }

    /// Display label, falling back to the id.
    pub fn label(&self) -> String {
        self.display
            .label
            .clone()
            .unwrap_or_else(|| self.id.to_string())
    }
}

/// A directed edge between two nodes of the same graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
    /// Position on the target node's input list when the edge was created.
    pub ordinal: usize,
    /// Port metadata: `name`, `type`, `index` and `direct`.
    pub props: Props,
    pub display: EdgeDisplay,
}

impl Edge {
    pub fn prop_str(&self, key: &str) -> Option<&str> {
        self.props.get(key).and_then(Value::as_str)
    }

    /// Port name the edge was decoded from.
    pub fn port_name(&self) -> Option<&str> {
        self.prop_str("name")
    }

    /// Port type, `Successor` for control successor edges.
    pub fn port_type(&self) -> Option<&str> {
        self.prop_str("type")
    }
}

/// A control-flow block.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub id: i32,
    pub nodes: Vec<NodeId>,
    pub successors: Vec<i32>,
}

/// A decoded graph.
///
/// Nodes iterate in insertion order. The graph owns its edges; nodes hold
/// edge ids only.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Graph {
    pub props: Props,
    pub blocks: Vec<Block>,
    nodes: Vec<Node>,
    index: FxHashMap<NodeId, usize>,
    edges: Vec<Edge>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Construction
    // =========================================================================

    /// Adds a node.
    pub fn create_node(
        &mut self,
        id: NodeId,
        class: Option<Arc<NodeClass>>,
        props: Props,
    ) -> Result<&mut Node, LookupError> {
        if self.index.contains_key(&id) {
            return Err(LookupError::DuplicateNode { id });
        }
        let slot = self.nodes.len();
        self.index.insert(id, slot);
        self.nodes.push(Node::new(id, class, props));
        Ok(&mut self.nodes[slot])
    }

    /// Adds an edge between two existing nodes.
    ///
    /// The edge's ordinal is the number of inputs `to` already has.
    pub fn create_edge(&mut self, from: NodeId, to: NodeId, props: Props) -> Result<EdgeId, LookupError> {
        let ordinal = self.node(to).ok_or(LookupError::NodeNotFound { id: to })?.inputs.len();
        self.push_edge(Edge {
            from,
            to,
            ordinal,
            props,
            display: EdgeDisplay::default(),
        })
    }

    /// Adds a fully built edge, keeping its ordinal.
    pub fn push_edge(&mut self, edge: Edge) -> Result<EdgeId, LookupError> {
        let from = *self
            .index
            .get(&edge.from)
            .ok_or(LookupError::NodeNotFound { id: edge.from })?;
        let to = *self
            .index
            .get(&edge.to)
            .ok_or(LookupError::NodeNotFound { id: edge.to })?;
        let id = EdgeId(self.edges.len());
        self.nodes[from].outputs.push(id);
        self.nodes[to].inputs.push(id);
        self.edges.push(edge);
        Ok(id)
    }

    // =========================================================================
    // Access
    // =========================================================================

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.index.get(&id).map(|&slot| &self.nodes[slot])
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.index.get(&id).map(|&slot| &mut self.nodes[slot])
    }

    /// Returns the node or a [`LookupError::NodeNotFound`].
    pub fn try_node(&self, id: NodeId) -> Result<&Node, LookupError> {
        self.node(id).ok_or(LookupError::NodeNotFound { id })
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    pub fn nodes_mut(&mut self) -> impl Iterator<Item = &mut Node> {
        self.nodes.iter_mut()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.iter().map(|node| node.id)
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(id.0)
    }

    pub fn edge_mut(&mut self, id: EdgeId) -> Option<&mut Edge> {
        self.edges.get_mut(id.0)
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter()
    }

    pub fn edges_mut(&mut self) -> impl Iterator<Item = &mut Edge> {
        self.edges.iter_mut()
    }

    /// Edges with their ids.
    pub fn edge_entries(&self) -> impl Iterator<Item = (EdgeId, &Edge)> {
        self.edges.iter().enumerate().map(|(i, edge)| (EdgeId(i), edge))
    }

    /// Incoming edges of a node; empty if the node does not exist.
    pub fn incoming(&self, id: NodeId) -> impl Iterator<Item = &Edge> {
        self.node(id)
            .map(|node| node.inputs.as_slice())
            .unwrap_or_default()
            .iter()
            .map(|edge| &self.edges[edge.0])
    }

    /// Outgoing edges of a node; empty if the node does not exist.
    pub fn outgoing(&self, id: NodeId) -> impl Iterator<Item = &Edge> {
        self.node(id)
            .map(|node| node.outputs.as_slice())
            .unwrap_or_default()
            .iter()
            .map(|edge| &self.edges[edge.0])
    }

    /// Ids of all edges from `from` to `to`.
    pub fn edges_between(&self, from: NodeId, to: NodeId) -> Vec<EdgeId> {
        self.node(from)
            .map(|node| {
                node.outputs
                    .iter()
                    .copied()
                    .filter(|edge| self.edges[edge.0].to == to)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Returns the first edge from `from` to `to`.
    pub fn find_edge(&self, from: NodeId, to: NodeId) -> Result<&Edge, LookupError> {
        self.edges_between(from, to)
            .first()
            .map(|edge| &self.edges[edge.0])
            .ok_or(LookupError::EdgeNotFound { from, to })
    }

    // =========================================================================
    // Structural removal
    // =========================================================================

    /// Removes nodes and every edge touching them.
    pub fn remove_nodes(&mut self, ids: &FxHashSet<NodeId>) {
        if ids.is_empty() {
            return;
        }
        self.nodes.retain(|node| !ids.contains(&node.id));
        self.edges
            .retain(|edge| !ids.contains(&edge.from) && !ids.contains(&edge.to));
        self.reindex();
    }

    /// Removes edges by id. All edge ids are renumbered afterwards.
    pub fn remove_edges(&mut self, ids: &FxHashSet<EdgeId>) {
        if ids.is_empty() {
            return;
        }
        let mut i = 0;
        self.edges.retain(|_| {
            let keep = !ids.contains(&EdgeId(i));
            i += 1;
            keep
        });
        self.reindex();
    }

    fn reindex(&mut self) {
        self.index.clear();
        for (slot, node) in self.nodes.iter_mut().enumerate() {
            node.inputs.clear();
            node.outputs.clear();
            self.index.insert(node.id, slot);
        }
        for (i, edge) in self.edges.iter().enumerate() {
            let from = self.index[&edge.from];
            self.nodes[from].outputs.push(EdgeId(i));
            let to = self.index[&edge.to];
            self.nodes[to].inputs.push(EdgeId(i));
        }
    }
}
