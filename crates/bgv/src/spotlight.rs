//! Spotlight: emphasize a few nodes and shade everything far from them.
//!
//! Lit nodes are the seeds. [`Spotlight::shade`] walks edges in both
//! directions from the seeds, up to an optional radius, and marks every
//! node it does not reach as shaded. Edges touching a shaded node are
//! shaded too. Seeds are never shaded.

use std::collections::BTreeSet;
use std::collections::VecDeque;

use rustc_hash::FxHashSet;
use tracing::debug;

use crate::error::LookupError;
use crate::model::{Emphasis, Graph, NodeId};

/// Exclusive access to a graph while seeds are lit and the rest shaded.
#[derive(Debug)]
pub struct Spotlight<'g> {
    graph: &'g mut Graph,
    lit: BTreeSet<NodeId>,
    radius: Option<usize>,
}

impl<'g> Spotlight<'g> {
    pub fn new(graph: &'g mut Graph) -> Self {
        Self {
            graph,
            lit: BTreeSet::new(),
            radius: None,
        }
    }

    /// Limits shading to nodes more than `radius` edges from every seed.
    pub fn with_radius(mut self, radius: usize) -> Self {
        self.radius = Some(radius);
        self
    }

    /// Marks a node as a seed.
    pub fn light(&mut self, id: NodeId) -> Result<(), LookupError> {
        let node = self.graph.node_mut(id).ok_or(LookupError::NodeNotFound { id })?;
        node.display.emphasis = Some(Emphasis::Lit);
        self.lit.insert(id);
        Ok(())
    }

    /// Seeds lit so far.
    pub fn lit(&self) -> &BTreeSet<NodeId> {
        &self.lit
    }

    /// Shades every node and edge outside the seeds' neighborhood.
    ///
    /// Does nothing if no node is lit.
    pub fn shade(self) {
        if self.lit.is_empty() {
            return;
        }
        let reached = self.reach();
        debug!(lit = self.lit.len(), reached = reached.len(), "spotlight");

        for node in self.graph.nodes_mut() {
            if self.lit.contains(&node.id) {
                continue;
            }
            node.display.emphasis = if reached.contains(&node.id) {
                None
            } else {
                Some(Emphasis::Shaded)
            };
        }
        for edge in self.graph.edges_mut() {
            let shaded = !reached.contains(&edge.from) || !reached.contains(&edge.to);
            edge.display.emphasis = shaded.then_some(Emphasis::Shaded);
        }
    }

    /// Nodes within the radius of a seed, walking edges both ways.
    fn reach(&self) -> FxHashSet<NodeId> {
        let mut reached: FxHashSet<NodeId> = self.lit.iter().copied().collect();
        let mut queue: VecDeque<(NodeId, usize)> = self.lit.iter().map(|&id| (id, 0)).collect();
        while let Some((id, depth)) = queue.pop_front() {
            if self.radius.is_some_and(|radius| depth >= radius) {
                continue;
            }
            let neighbors = self
                .graph
                .outgoing(id)
                .map(|edge| edge.to)
                .chain(self.graph.incoming(id).map(|edge| edge.from));
            for next in neighbors {
                if reached.insert(next) {
                    queue.push_back((next, depth + 1));
                }
            }
        }
        reached
    }
}
