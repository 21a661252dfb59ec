//! Labels for anything the producer-specific annotators left unlabeled.

use crate::annotate::{Annotator, AnnotatorOptions};
use crate::error::AnnotateError;
use crate::model::{EdgeKind, Graph, NodeKind};

/// Fills in missing node and edge labels and kinds from generic props.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackAnnotator;

impl Annotator for FallbackAnnotator {
    fn name(&self) -> &'static str {
        "fallback"
    }

    fn applies(&self, _graph: &Graph) -> bool {
        true
    }

    fn annotate(&self, graph: &mut Graph, _options: &AnnotatorOptions) -> Result<(), AnnotateError> {
        for node in graph.nodes_mut() {
            if node.display.label.is_none() {
                let label = node
                    .prop_str("label")
                    .or_else(|| node.prop_str("name"))
                    .or_else(|| node.class_name())
                    .map_or_else(|| node.id.to_string(), str::to_string);
                node.display.label = Some(label);
            }
            if node.display.kind.is_none() {
                node.display.kind = Some(NodeKind::Other);
            }
        }

        for edge in graph.edges_mut() {
            if edge.display.kind.is_none() {
                edge.display.kind = Some(EdgeKind::Other);
                edge.display.label = edge.port_name().filter(|name| !name.is_empty()).map(str::to_string);
            }
        }
        Ok(())
    }
}
