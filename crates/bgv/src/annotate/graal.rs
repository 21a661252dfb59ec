//! Labels and kinds for graphs produced by the Graal compiler.

use lazy_static::lazy_static;
use rustc_hash::FxHashMap;

use crate::annotate::{Annotator, AnnotatorOptions};
use crate::codec::token::SUCCESSOR_PORT_TYPE;
use crate::error::AnnotateError;
use crate::model::{simple_class_name, Edge, EdgeKind, Graph, Node, NodeKind, Value};

/// Package prefixes of Graal node classes across releases.
const GRAAL_PACKAGES: &[&str] = &["org.graalvm.compiler.", "jdk.graal.compiler.", "com.oracle.graal."];

/// Input types drawn as informational edges.
const INFO_INPUT_TYPES: &[&str] = &["State", "Association", "Guard", "Anchor"];

lazy_static! {
    /// Node kind by simple class name.
    static ref NODE_KINDS: FxHashMap<&'static str, NodeKind> = {
        let mut m = FxHashMap::default();
        for name in [
            "StartNode", "BeginNode", "EndNode", "MergeNode", "LoopBeginNode", "LoopEndNode",
            "LoopExitNode", "IfNode", "IntegerSwitchNode", "ReturnNode", "UnwindNode",
            "DeoptimizeNode", "FixedGuardNode", "KillingBeginNode", "InvokeNode",
            "InvokeWithExceptionNode", "ExceptionObjectNode", "SafepointNode",
        ] {
            m.insert(name, NodeKind::Control);
        }
        for name in [
            "LoadFieldNode", "StoreFieldNode", "LoadIndexedNode", "StoreIndexedNode", "ReadNode",
            "WriteNode", "MemoryPhiNode", "ArrayLengthNode", "RawLoadNode", "RawStoreNode",
        ] {
            m.insert(name, NodeKind::Memory);
        }
        for name in ["ConstantNode", "ParameterNode"] {
            m.insert(name, NodeKind::Input);
        }
        for name in [
            "FrameState", "VirtualObjectState", "MaterializedObjectState", "MethodCallTargetNode",
        ] {
            m.insert(name, NodeKind::Info);
        }
        for name in ["VirtualInstanceNode", "VirtualArrayNode"] {
            m.insert(name, NodeKind::Virtual);
        }
        for name in ["NewInstanceNode", "NewArrayNode", "CommitAllocationNode", "AllocatedObjectNode"] {
            m.insert(name, NodeKind::Alloc);
        }
        m
    };

    /// Label templates replacing the producer's, by simple class name.
    static ref NAME_TEMPLATES: FxHashMap<&'static str, &'static str> = {
        let mut m = FxHashMap::default();
        m.insert("ConstantNode", "C({p#rawvalue})");
        m.insert("ParameterNode", "P({p#index})");
        m.insert("FixedGuardNode", "Guard, else {p#reason/s}");
        m.insert("GuardNode", "Guard, else {p#reason/s}");
        m.insert("InvokeNode", "Call {p#targetMethod/s}");
        m.insert("InvokeWithExceptionNode", "Call {p#targetMethod/s}");
        m.insert("MethodCallTargetNode", "Call target {p#targetMethod/s}");
        m.insert("NewInstanceNode", "New {p#instanceClass/s}");
        m.insert("NewArrayNode", "New {p#elementType/s}[]");
        m.insert("VirtualInstanceNode", "Virtual {p#type/s}");
        m.insert("AllocatedObjectNode", "Alloc {i#virtualObject}");
        m.insert("LoadFieldNode", "LoadField {p#field/s}");
        m.insert("StoreFieldNode", "StoreField {p#field/s}");
        m.insert("AddNode", "+");
        m.insert("SubNode", "-");
        m.insert("MulNode", "*");
        m.insert("NegateNode", "-");
        m.insert("AndNode", "&");
        m.insert("OrNode", "|");
        m.insert("XorNode", "^");
        m.insert("NotNode", "~");
        m.insert("LeftShiftNode", "<<");
        m.insert("RightShiftNode", ">>");
        m.insert("UnsignedRightShiftNode", ">>>");
        m.insert("IntegerEqualsNode", "==");
        m.insert("ObjectEqualsNode", "==");
        m.insert("IntegerLessThanNode", "<");
        m.insert("IntegerBelowNode", "|<|");
        m.insert("IsNullNode", "IsNull");
        m
    };
}

/// Labels nodes from their class templates and classifies nodes and edges.
#[derive(Debug, Clone, Copy, Default)]
pub struct GraalAnnotator;

impl Annotator for GraalAnnotator {
    fn name(&self) -> &'static str {
        "graal"
    }

    fn applies(&self, graph: &Graph) -> bool {
        graph.nodes().any(|node| {
            node.class
                .as_ref()
                .is_some_and(|class| GRAAL_PACKAGES.iter().any(|p| class.class_name.starts_with(p)))
        })
    }

    fn annotate(&self, graph: &mut Graph, _options: &AnnotatorOptions) -> Result<(), AnnotateError> {
        let mut labels = Vec::with_capacity(graph.node_count());
        for node in graph.nodes() {
            let class = node.class.as_ref().ok_or(AnnotateError::MissingNodeClass { id: node.id })?;
            let simple = class.simple_name();
            let template = NAME_TEMPLATES
                .get(simple)
                .copied()
                .unwrap_or(class.name_template.as_str());
            let label = if template.is_empty() {
                simple.strip_suffix("Node").unwrap_or(simple).to_string()
            } else {
                render_template(template, node, graph)
            };
            labels.push((label, node_kind(node, graph)));
        }

        for (node, (label, kind)) in graph.nodes_mut().zip(labels) {
            node.display.label = Some(label);
            node.display.base_label = None;
            node.display.kind = Some(kind);
        }

        let mut edges = Vec::with_capacity(graph.edge_count());
        for edge in graph.edges() {
            let target = graph.node(edge.to).and_then(Node::class_name);
            edges.push(classify_edge(edge, target));
        }
        for (edge, (kind, label, back_edge)) in graph.edges_mut().zip(edges) {
            edge.display.kind = Some(kind);
            edge.display.label = label;
            edge.display.back_edge = back_edge;
        }
        Ok(())
    }
}

fn node_kind(node: &Node, graph: &Graph) -> NodeKind {
    let simple = node.class_name().unwrap_or_default();
    if let Some(&kind) = NODE_KINDS.get(simple) {
        return kind;
    }
    if simple.ends_with("State") {
        NodeKind::Info
    } else if simple.starts_with("Virtual") {
        NodeKind::Virtual
    } else if node.has_predecessor
        || graph
            .outgoing(node.id)
            .any(|edge| edge.port_type() == Some(SUCCESSOR_PORT_TYPE))
    {
        NodeKind::Control
    } else {
        NodeKind::Calc
    }
}

fn classify_edge(edge: &Edge, target: Option<&str>) -> (EdgeKind, Option<String>, bool) {
    let name = edge.port_name().unwrap_or_default();
    match edge.port_type() {
        Some(SUCCESSOR_PORT_TYPE) => {
            let label = match name {
                "trueSuccessor" => Some("T".to_string()),
                "falseSuccessor" => Some("F".to_string()),
                "next" | "" => None,
                other => Some(other.to_string()),
            };
            (EdgeKind::Control, label, false)
        }
        Some(t) if INFO_INPUT_TYPES.contains(&t) => {
            let back_edge = target == Some("LoopEndNode") && name == "loopBegin";
            (EdgeKind::Info, non_empty(name), back_edge)
        }
        _ => (EdgeKind::Data, non_empty(name), false),
    }
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}

/// Expands `{p#prop}`, `{p#prop/s}` and `{i#input}` placeholders.
///
/// `/s` strips package prefixes. Unresolvable placeholders become `?`.
fn render_template(template: &str, node: &Node, graph: &Graph) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            out.push_str(&rest[open..]);
            return out;
        };
        let spec = &after[..close];
        match expand(spec, node, graph) {
            Some(text) => out.push_str(&text),
            None => {
                out.push('{');
                out.push_str(spec);
                out.push('}');
            }
        }
        rest = &after[close + 1..];
    }
    out.push_str(rest);
    out
}

/// Returns `None` if `spec` is not a placeholder at all.
fn expand(spec: &str, node: &Node, graph: &Graph) -> Option<String> {
    let (source, name) = spec.split_once('#')?;
    let (name, simple) = match name.strip_suffix("/s") {
        Some(name) => (name, true),
        None => (name, false),
    };
    let text = match source {
        "p" => node.prop(name).map(|value| render_value(value, simple)),
        "i" => graph
            .incoming(node.id)
            .find(|edge| edge.port_name() == Some(name))
            .map(|edge| edge.from.to_string()),
        _ => return None,
    };
    Some(text.unwrap_or_else(|| "?".to_string()))
}

fn render_value(value: &Value, simple: bool) -> String {
    match value {
        Value::Ref(object) if simple => object.simple_name(),
        Value::Str(s) if simple => simple_class_name(s).to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::annotate::tests::build;
    use crate::model::{MethodInfo, PoolObject};

    #[test]
    fn test_applies_only_to_graal_classes() {
        let graph = build(&[(0, "StartNode", false)], &[]);
        assert!(GraalAnnotator.applies(&graph));
        assert!(!GraalAnnotator.applies(&Graph::new()));
    }

    #[test]
    fn test_labels_and_kinds() {
        let mut graph = build(
            &[
                (0, "StartNode", false),
                (1, "IfNode", true),
                (2, "ReturnNode", true),
                (3, "ReturnNode", true),
                (4, "ConstantNode", false),
                (5, "IntegerLessThanNode", false),
                (6, "FrameState", false),
                (7, "PiNode", false),
            ],
            &[
                (0, 1, "next", "Successor"),
                (1, 2, "trueSuccessor", "Successor"),
                (1, 3, "falseSuccessor", "Successor"),
                (5, 1, "condition", "Condition"),
                (4, 5, "x", "Value"),
                (6, 0, "stateAfter", "State"),
            ],
        );
        graph
            .node_mut(4)
            .unwrap()
            .props
            .insert("rawvalue".to_string(), Value::Str("42".to_string()));
        GraalAnnotator.annotate(&mut graph, &AnnotatorOptions::default()).unwrap();

        let label = |id| graph.node(id).unwrap().display.label.clone().unwrap();
        let kind = |id| graph.node(id).unwrap().display.kind.unwrap();
        assert_eq!(label(0), "Start");
        assert_eq!(label(4), "C(42)");
        assert_eq!(label(5), "<");
        assert_eq!(kind(0), NodeKind::Control);
        assert_eq!(kind(4), NodeKind::Input);
        assert_eq!(kind(6), NodeKind::Info);
        assert_eq!(kind(7), NodeKind::Calc);

        let edge = |from, to| graph.find_edge(from, to).unwrap().display.clone();
        assert_eq!(edge(0, 1).kind, Some(EdgeKind::Control));
        assert_eq!(edge(0, 1).label, None);
        assert_eq!(edge(1, 2).label.as_deref(), Some("T"));
        assert_eq!(edge(1, 3).label.as_deref(), Some("F"));
        assert_eq!(edge(5, 1).kind, Some(EdgeKind::Data));
        assert_eq!(edge(6, 0).kind, Some(EdgeKind::Info));
    }

    #[test]
    fn test_template_placeholders() {
        let mut graph = build(
            &[(0, "InvokeNode", true), (1, "AllocatedObjectNode", false), (2, "VirtualInstanceNode", false)],
            &[(2, 1, "virtualObject", "Extension")],
        );
        graph.node_mut(0).unwrap().props.insert(
            "targetMethod".to_string(),
            Value::Ref(PoolObject::Method(Arc::new(MethodInfo {
                class_name: "java.lang.Math".to_string(),
                name: "abs".to_string(),
                signature: None,
                modifiers: 0,
            }))),
        );
        GraalAnnotator.annotate(&mut graph, &AnnotatorOptions::default()).unwrap();
        assert_eq!(graph.node(0).unwrap().display.label.as_deref(), Some("Call Math.abs"));
        assert_eq!(graph.node(1).unwrap().display.label.as_deref(), Some("Alloc 2"));
        assert_eq!(graph.node(2).unwrap().display.label.as_deref(), Some("Virtual ?"));
    }

    #[test]
    fn test_loop_end_back_edge() {
        let mut graph = build(
            &[(0, "LoopBeginNode", true), (1, "LoopEndNode", true)],
            &[(0, 1, "loopBegin", "Association")],
        );
        GraalAnnotator.annotate(&mut graph, &AnnotatorOptions::default()).unwrap();
        let display = &graph.find_edge(0, 1).unwrap().display;
        assert!(display.back_edge);
        assert_eq!(display.kind, Some(EdgeKind::Info));
    }

    #[test]
    fn test_missing_class_fails() {
        let mut graph = build(&[(0, "StartNode", false)], &[]);
        graph.create_node(1, None, Default::default()).unwrap();
        let err = GraalAnnotator.annotate(&mut graph, &AnnotatorOptions::default()).unwrap_err();
        assert_eq!(err, AnnotateError::MissingNodeClass { id: 1 });
    }

    #[test]
    fn test_render_template_literal_braces() {
        let graph = build(&[(0, "PiNode", false)], &[]);
        let node = graph.node(0).unwrap();
        assert_eq!(render_template("a {b} {p#x} {", node, &graph), "a {b} ? {");
    }
}
