//! Graphviz DOT serializer.
//!
//! Output is a pure function of the graph and the `hidpi` flag: nodes are
//! written in node order, then edges in edge order, and attribute lists
//! are emitted in a fixed order.

use std::io::{self, Write};

use rustc_hash::FxHashSet;

use crate::model::{Edge, EdgeKind, Emphasis, Graph, Node, NodeId, NodeKind};

const FONT: &str = "Helvetica";
const SHADED_COLOR: &str = "#c0c0c0";
const SHADED_FILL: &str = "#f4f4f4";
const SHADED_FONT_COLOR: &str = "#a0a0a0";
const HIDPI_DPI: u32 = 200;

/// Fill color and shape for a node kind.
fn node_style(kind: Option<NodeKind>) -> (&'static str, &'static str) {
    match kind {
        Some(NodeKind::Control) => ("#ffc0c0", "box"),
        Some(NodeKind::Memory) => ("#c0d8ff", "box"),
        Some(NodeKind::Calc) => ("#ffffc0", "ellipse"),
        Some(NodeKind::Input) => ("#d0f0d0", "ellipse"),
        Some(NodeKind::Info) => ("#e8e8e8", "note"),
        Some(NodeKind::Virtual) => ("#e8d0ff", "box"),
        Some(NodeKind::Alloc) => ("#ffe0c0", "box"),
        Some(NodeKind::Other) | None => ("#ffffff", "box"),
    }
}

fn edge_line_style(edge: &Edge) -> &'static str {
    if edge.display.reduced {
        return "dotted";
    }
    match edge.display.kind {
        Some(EdgeKind::Control) => "bold",
        Some(EdgeKind::Info) => "dashed",
        Some(EdgeKind::Data) | Some(EdgeKind::Other) | None => "solid",
    }
}

/// Quotes a DOT string, escaping backslashes and quotes. Newlines become
/// DOT line breaks.
fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Writes graphs as DOT text.
pub struct GraphvizWriter<W: Write> {
    out: W,
}

impl<W: Write> GraphvizWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Writes one `digraph`.
    ///
    /// `hidpi` raises the raster resolution and doubles stroke widths and
    /// font sizes.
    pub fn write_graph(&mut self, graph: &Graph, hidpi: bool) -> io::Result<()> {
        let scale = if hidpi { 2 } else { 1 };

        writeln!(self.out, "digraph G {{")?;
        write!(self.out, "  graph [fontname={}, rankdir=TB, ranksep=0.4", quote(FONT))?;
        if hidpi {
            write!(self.out, ", dpi={HIDPI_DPI}")?;
        }
        writeln!(self.out, "];")?;
        writeln!(
            self.out,
            "  node [style=\"rounded,filled\", fontname={}, fontsize={}, penwidth={}];",
            quote(FONT),
            10 * scale,
            scale
        )?;
        writeln!(
            self.out,
            "  edge [fontname={}, fontsize={}, penwidth={}, arrowsize={}];",
            quote(FONT),
            8 * scale,
            scale,
            0.6 * f64::from(scale)
        )?;

        for node in graph.nodes().filter(|node| !node.display.inlined) {
            self.write_node(node, scale)?;
        }

        let inlined: FxHashSet<NodeId> = graph
            .nodes()
            .filter(|node| node.display.inlined)
            .map(|node| node.id)
            .collect();
        let mut copies = FxHashSet::default();
        for edge in graph.edges() {
            if inlined.contains(&edge.from) {
                let copy = format!("inline{}x{}", edge.from, edge.to);
                if copies.insert(copy.clone()) {
                    if let Some(node) = graph.node(edge.from) {
                        self.write_inline_copy(&copy, node, scale)?;
                    }
                }
                self.write_edge(&copy, edge)?;
            } else {
                self.write_edge(&format!("node{}", edge.from), edge)?;
            }
        }

        writeln!(self.out, "}}")?;
        Ok(())
    }

    fn write_node(&mut self, node: &Node, scale: u32) -> io::Result<()> {
        let (fill, shape) = node_style(node.display.kind);
        write!(self.out, "  node{} [label={}, shape={shape}", node.id, quote(&node.label()))?;
        match node.display.emphasis {
            Some(Emphasis::Shaded) => write!(
                self.out,
                ", fillcolor={}, color={}, fontcolor={}",
                quote(SHADED_FILL),
                quote(SHADED_COLOR),
                quote(SHADED_FONT_COLOR)
            )?,
            Some(Emphasis::Lit) => write!(self.out, ", fillcolor={}, penwidth={}", quote(fill), 3 * scale)?,
            None => write!(self.out, ", fillcolor={}", quote(fill))?,
        }
        writeln!(self.out, "];")
    }

    fn write_inline_copy(&mut self, name: &str, node: &Node, scale: u32) -> io::Result<()> {
        let (fill, _) = node_style(node.display.kind);
        write!(
            self.out,
            "  {name} [label={}, shape=plaintext, fontsize={}",
            quote(&node.label()),
            8 * scale
        )?;
        if node.display.emphasis == Some(Emphasis::Shaded) {
            write!(self.out, ", fontcolor={}", quote(SHADED_FONT_COLOR))?;
        } else {
            write!(self.out, ", fillcolor={}", quote(fill))?;
        }
        writeln!(self.out, "];")
    }

    fn write_edge(&mut self, from: &str, edge: &Edge) -> io::Result<()> {
        write!(self.out, "  {from} -> node{} [style={}", edge.to, edge_line_style(edge))?;
        if let Some(label) = &edge.display.label {
            write!(self.out, ", label={}", quote(label))?;
        }
        if edge.display.back_edge {
            write!(self.out, ", constraint=false")?;
        }
        if edge.display.emphasis == Some(Emphasis::Shaded) {
            write!(self.out, ", color={}, fontcolor={}", quote(SHADED_COLOR), quote(SHADED_FONT_COLOR))?;
        }
        writeln!(self.out, "];")
    }
}

/// Renders one graph to a DOT string.
pub fn render(graph: &Graph, hidpi: bool) -> io::Result<String> {
    let mut writer = GraphvizWriter::new(Vec::new());
    writer.write_graph(graph, hidpi)?;
    String::from_utf8(writer.into_inner()).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}
