//! Renders one graph of a BGV dump as Graphviz DOT on stdout.
//!
//! Usage: cargo run --example render_graph -- <dump.bgv[.zst]> <index> [node ids to spotlight...]
//!
//! Pipe the output through `dot -Tsvg` to draw it.

use std::env;
use std::io::{self, BufWriter, Write};
use std::process;

use bgv::{annotate, read_source, AnnotatorOptions, BgvDecoder, GraphvizWriter, NodeId, UnpackReader};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().skip(1).collect();
    if args.len() < 2 {
        eprintln!("usage: render_graph <dump.bgv[.zst]> <index> [node ids...]");
        process::exit(2);
    }
    let index: usize = args[1].parse()?;
    let seeds = args[2..]
        .iter()
        .map(|arg| arg.parse::<NodeId>())
        .collect::<Result<Vec<_>, _>>()?;

    let mut decoder = BgvDecoder::new(UnpackReader::new(read_source(&args[0])?));
    decoder.read_file_header(false)?;
    decoder.skip_document_props()?;
    decoder.skip_to_graph(index)?;
    let header = decoder.read_graph_header()?;
    let mut graph = decoder.read_graph()?;
    eprintln!("{}: {} nodes", header.name(), graph.node_count());

    let mut options = AnnotatorOptions::new();
    if !seeds.is_empty() {
        options = options.spotlight(seeds);
    }
    annotate::apply(&mut graph, &options)?;

    let stdout = io::stdout();
    let mut writer = GraphvizWriter::new(BufWriter::new(stdout.lock()));
    writer.write_graph(&graph, false)?;
    writer.into_inner().flush()?;
    Ok(())
}
