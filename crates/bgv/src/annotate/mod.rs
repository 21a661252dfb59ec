//! Presentation annotators.
//!
//! An annotator mutates one graph in place to make it readable: it sets
//! labels and kinds, hides bookkeeping nodes, or collapses edges. The
//! pipeline runs a fixed, ordered list of annotators; each runs only when
//! its [`Annotator::applies`] holds for the graph.
//!
//! Annotation takes `&mut Graph` for the whole run, so no other pass can
//! touch the graph meanwhile. A failing annotator leaves the graph
//! partially mutated; callers must discard it.

mod fallback;
mod graal;
mod hide;
mod reduce;
mod stamp;

use std::collections::BTreeSet;

use tracing::debug;

pub use fallback::FallbackAnnotator;
pub use graal::GraalAnnotator;
pub use hide::{FloatingHider, FrameStateHider};
pub use reduce::EdgeReducer;
pub use stamp::StampAnnotator;

use crate::codec::token::SUCCESSOR_PORT_TYPE;
use crate::error::AnnotateError;
use crate::model::{Edge, EdgeKind, Graph, NodeId};
use crate::spotlight::Spotlight;

/// A graph presentation pass.
pub trait Annotator {
    /// Name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Whether this annotator understands the graph.
    fn applies(&self, graph: &Graph) -> bool;

    fn annotate(&self, graph: &mut Graph, options: &AnnotatorOptions) -> Result<(), AnnotateError>;
}

/// Options controlling the annotator pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotatorOptions {
    /// Remove frame-state nodes and values used only by them.
    pub hide_frame_state: bool,
    /// Remove nodes not attached to control flow.
    pub hide_floating: bool,
    /// Inline constants, merge parallel edges and splice control chains.
    pub reduce_edges: bool,
    /// Append each node's stamp to its label.
    pub show_stamps: bool,
    /// Nodes to light; everything outside their neighborhood is shaded.
    pub spotlight_nodes: Option<BTreeSet<NodeId>>,
}

impl Default for AnnotatorOptions {
    fn default() -> Self {
        Self {
            hide_frame_state: true,
            hide_floating: false,
            reduce_edges: true,
            show_stamps: false,
            spotlight_nodes: None,
        }
    }
}

impl AnnotatorOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hide_frame_state(mut self, hide: bool) -> Self {
        self.hide_frame_state = hide;
        self
    }

    pub fn hide_floating(mut self, hide: bool) -> Self {
        self.hide_floating = hide;
        self
    }

    pub fn reduce_edges(mut self, reduce: bool) -> Self {
        self.reduce_edges = reduce;
        self
    }

    pub fn show_stamps(mut self, show: bool) -> Self {
        self.show_stamps = show;
        self
    }

    pub fn spotlight(mut self, nodes: impl IntoIterator<Item = NodeId>) -> Self {
        self.spotlight_nodes = Some(nodes.into_iter().collect());
        self
    }

    /// Whether `id` is a spotlight seed. Seeds are never hidden or spliced.
    pub fn is_spotlit(&self, id: NodeId) -> bool {
        self.spotlight_nodes.as_ref().is_some_and(|nodes| nodes.contains(&id))
    }
}

/// The annotator pipeline.
pub struct Annotators {
    annotators: Vec<Box<dyn Annotator>>,
}

impl Default for Annotators {
    fn default() -> Self {
        Self::new()
    }
}

impl Annotators {
    /// The built-in pipeline, in order: Graal labels and kinds, fallback
    /// labels, stamps, frame-state hiding, floating-node hiding, edge
    /// reduction.
    pub fn new() -> Self {
        Self {
            annotators: vec![
                Box::new(GraalAnnotator),
                Box::new(FallbackAnnotator),
                Box::new(StampAnnotator),
                Box::new(FrameStateHider),
                Box::new(FloatingHider),
                Box::new(EdgeReducer),
            ],
        }
    }

    /// Names of the annotators, in run order.
    pub fn names(&self) -> Vec<&'static str> {
        self.annotators.iter().map(|a| a.name()).collect()
    }

    /// Runs every applicable annotator, then lights the spotlight seeds.
    pub fn apply(&self, graph: &mut Graph, options: &AnnotatorOptions) -> Result<(), AnnotateError> {
        for annotator in &self.annotators {
            if !annotator.applies(graph) {
                continue;
            }
            debug!(annotator = annotator.name(), nodes = graph.node_count(), "annotating");
            annotator.annotate(graph, options)?;
        }

        if let Some(seeds) = &options.spotlight_nodes {
            let mut spotlight = Spotlight::new(graph);
            for &id in seeds {
                spotlight.light(id)?;
            }
            spotlight.shade();
        }
        Ok(())
    }
}

/// Whether an edge carries control flow, by port type or annotated kind.
pub(crate) fn is_control_edge(edge: &Edge) -> bool {
    edge.port_type() == Some(SUCCESSOR_PORT_TYPE) || edge.display.kind == Some(EdgeKind::Control)
}

/// Convenience for running the built-in pipeline once.
pub fn apply(graph: &mut Graph, options: &AnnotatorOptions) -> Result<(), AnnotateError> {
    Annotators::new().apply(graph, options)
}
