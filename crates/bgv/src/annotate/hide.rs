//! Structural hiding of frame states and floating nodes.
//!
//! Both hiders delete nodes through [`Graph::remove_nodes`], which drops
//! every incident edge, so no edge is left pointing at a hidden node.

use rustc_hash::FxHashSet;
use tracing::debug;

use crate::annotate::{is_control_edge, Annotator, AnnotatorOptions};
use crate::error::AnnotateError;
use crate::model::{Graph, Node, NodeId};

const FRAME_STATE_CLASSES: &[&str] = &["FrameState", "VirtualObjectState", "MaterializedObjectState"];

/// A node pinned in control flow: it has a predecessor or successors.
fn is_fixed(node: &Node, graph: &Graph) -> bool {
    node.has_predecessor || graph.outgoing(node.id).any(is_control_edge)
}

/// Removes frame states and values only they use.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameStateHider;

impl Annotator for FrameStateHider {
    fn name(&self) -> &'static str {
        "frame state"
    }

    fn applies(&self, _graph: &Graph) -> bool {
        true
    }

    fn annotate(&self, graph: &mut Graph, options: &AnnotatorOptions) -> Result<(), AnnotateError> {
        if !options.hide_frame_state {
            return Ok(());
        }

        let mut hidden: FxHashSet<NodeId> = graph
            .nodes()
            .filter(|node| {
                node.class_name().is_some_and(|name| FRAME_STATE_CLASSES.contains(&name))
                    && !options.is_spotlit(node.id)
            })
            .map(|node| node.id)
            .collect();
        if hidden.is_empty() {
            return Ok(());
        }

        // Values feeding only hidden nodes are hidden too, until nothing changes.
        loop {
            let orphaned: Vec<NodeId> = graph
                .nodes()
                .filter(|node| !hidden.contains(&node.id) && !options.is_spotlit(node.id))
                .filter(|node| !is_fixed(node, graph))
                .filter(|node| {
                    let mut uses = graph.outgoing(node.id).peekable();
                    uses.peek().is_some() && uses.all(|edge| hidden.contains(&edge.to))
                })
                .map(|node| node.id)
                .collect();
            if orphaned.is_empty() {
                break;
            }
            hidden.extend(orphaned);
        }

        debug!(hidden = hidden.len(), "hiding frame states");
        graph.remove_nodes(&hidden);
        Ok(())
    }
}

/// Removes nodes with no control edges.
#[derive(Debug, Clone, Copy, Default)]
pub struct FloatingHider;

impl Annotator for FloatingHider {
    fn name(&self) -> &'static str {
        "floating"
    }

    fn applies(&self, _graph: &Graph) -> bool {
        true
    }

    fn annotate(&self, graph: &mut Graph, options: &AnnotatorOptions) -> Result<(), AnnotateError> {
        if !options.hide_floating {
            return Ok(());
        }
        let floating: FxHashSet<NodeId> = graph
            .nodes()
            .filter(|node| !options.is_spotlit(node.id))
            .filter(|node| {
                !graph.incoming(node.id).any(is_control_edge) && !graph.outgoing(node.id).any(is_control_edge)
            })
            .map(|node| node.id)
            .collect();
        if !floating.is_empty() {
            debug!(hidden = floating.len(), "hiding floating nodes");
            graph.remove_nodes(&floating);
        }
        Ok(())
    }
}
