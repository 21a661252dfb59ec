//! Edge reduction.
//!
//! Three passes, in order:
//!
//! 1. Input nodes (constants, parameters) with no inputs of their own are
//!    marked inlined, so the serializer draws a copy beside each user.
//! 2. Pass-through control nodes (one control edge in, one control edge
//!    out, nothing else) are spliced out; the chain `a -> n1 -> .. -> b`
//!    becomes one reduced edge `a -> b`.
//! 3. Parallel edges of the same kind between one node pair are merged
//!    into the first, with their labels joined.
//!
//! No pass adds an out-edge to a node or connects two nodes that had no
//! path between them.

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use crate::annotate::{is_control_edge, Annotator, AnnotatorOptions};
use crate::error::AnnotateError;
use crate::model::{Edge, EdgeDisplay, EdgeId, EdgeKind, Graph, Node, NodeId, NodeKind};

#[derive(Debug, Clone, Copy, Default)]
pub struct EdgeReducer;

impl Annotator for EdgeReducer {
    fn name(&self) -> &'static str {
        "edge reduction"
    }

    fn applies(&self, _graph: &Graph) -> bool {
        true
    }

    fn annotate(&self, graph: &mut Graph, options: &AnnotatorOptions) -> Result<(), AnnotateError> {
        if !options.reduce_edges {
            return Ok(());
        }
        inline_inputs(graph, options);
        splice_pass_through(graph, options)?;
        merge_parallel(graph);
        Ok(())
    }
}

fn inline_inputs(graph: &mut Graph, options: &AnnotatorOptions) {
    for node in graph.nodes_mut() {
        if node.display.kind == Some(NodeKind::Input) && node.inputs().is_empty() && !options.is_spotlit(node.id) {
            node.display.inlined = true;
        }
    }
}

fn is_pass_through(node: &Node, graph: &Graph, options: &AnnotatorOptions) -> bool {
    if node.display.inlined || options.is_spotlit(node.id) {
        return false;
    }
    let mut inputs = graph.incoming(node.id);
    let mut outputs = graph.outgoing(node.id);
    match (inputs.next(), inputs.next(), outputs.next(), outputs.next()) {
        (Some(input), None, Some(output), None) => {
            is_control_edge(input) && is_control_edge(output) && input.from != node.id && output.to != node.id
        }
        _ => false,
    }
}

fn splice_pass_through(graph: &mut Graph, options: &AnnotatorOptions) -> Result<(), AnnotateError> {
    let spliced: FxHashSet<NodeId> = graph
        .nodes()
        .filter(|node| is_pass_through(node, graph, options))
        .map(|node| node.id)
        .collect();
    if spliced.is_empty() {
        return Ok(());
    }

    let mut replacements = Vec::new();
    for entry in graph.edges() {
        if spliced.contains(&entry.from) || !spliced.contains(&entry.to) {
            continue;
        }
        // Every spliced node has exactly one out-edge; a walk longer than
        // the spliced set is a cycle with no exit.
        let mut exit = entry;
        let mut steps = 0;
        while spliced.contains(&exit.to) && steps <= spliced.len() {
            let Some(next) = graph.outgoing(exit.to).next() else {
                break;
            };
            exit = next;
            steps += 1;
        }
        if spliced.contains(&exit.to) || exit.to == entry.from {
            continue;
        }
        replacements.push(Edge {
            from: entry.from,
            to: exit.to,
            ordinal: exit.ordinal,
            props: exit.props.clone(),
            display: EdgeDisplay {
                reduced: true,
                emphasis: None,
                ..entry.display.clone()
            },
        });
    }

    debug!(nodes = spliced.len(), edges = replacements.len(), "splicing pass-through nodes");
    graph.remove_nodes(&spliced);
    for edge in replacements {
        graph.push_edge(edge)?;
    }
    Ok(())
}

fn merge_parallel(graph: &mut Graph) {
    let mut groups: Vec<Vec<EdgeId>> = Vec::new();
    let mut slots: FxHashMap<(NodeId, NodeId, Option<EdgeKind>), usize> = FxHashMap::default();
    for (id, edge) in graph.edge_entries() {
        let slot = *slots.entry((edge.from, edge.to, edge.display.kind)).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[slot].push(id);
    }

    let mut merged = FxHashSet::default();
    for group in groups.iter().filter(|group| group.len() > 1) {
        let labels: Vec<String> = group
            .iter()
            .filter_map(|&id| graph.edge(id).and_then(|edge| edge.display.label.clone()))
            .collect();
        if let Some(first) = graph.edge_mut(group[0]) {
            first.display.reduced = true;
            first.display.label = (!labels.is_empty()).then(|| labels.join(", "));
        }
        merged.extend(group[1..].iter().copied());
    }
    if !merged.is_empty() {
        debug!(edges = merged.len(), "merging parallel edges");
        graph.remove_edges(&merged);
    }
}
