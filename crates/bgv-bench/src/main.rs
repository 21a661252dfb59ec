//! Benchmark for BGV decoding and rendering.
//!
//! Usage: bgv-bench [dump.bgv[.zst]] [--json]
//!
//! Without a path a synthetic dump is generated with the crate's encoder.
//! Measures full reads against skip-only seeks on every reader backend,
//! annotate+render time, and one cold decode+render pass. Log verbosity
//! follows `RUST_LOG` (default `info`).

use std::env;
use std::error::Error;
use std::io::Cursor;
use std::time::{Duration, Instant};

use bgv::codec::{NodeClassSpec, NodeRecord, PortSpec, PropValue};
use bgv::{
    annotate, graphviz, read_source, AnnotatorOptions, BgvDecoder, BgvWriter, BinaryReader, EncodeError, Graph,
    SliceReader, StreamReader, UnpackReader,
};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

const ITERS: u32 = 10;
const WARMUP: u32 = 3;

const SYNTHETIC_GRAPHS: usize = 200;
const SYNTHETIC_NODES: usize = 400;

const PHASES: &[&str] = &[
    "org.graalvm.compiler.phases.common.CanonicalizerPhase",
    "org.graalvm.compiler.loop.phases.LoopPeelingPhase",
    "org.graalvm.compiler.phases.common.inlining.InliningPhase",
    "org.graalvm.compiler.phases.common.LoweringPhase",
];

// =============================================================================
// Synthetic input
// =============================================================================

fn node_class(package: &str, simple: &str) -> NodeClassSpec {
    NodeClassSpec::new(&format!("org.graalvm.compiler.nodes.{package}{simple}"), "")
}

/// A straight control chain of `chain` begin nodes, fed by a chain of
/// additions over constants.
fn synthetic_graph(chain: usize, seed: usize) -> Vec<NodeRecord> {
    let start = node_class("", "StartNode").successor(PortSpec::direct("next"));
    let begin = node_class("", "BeginNode").successor(PortSpec::direct("next"));
    let ret = node_class("", "ReturnNode").input(PortSpec::direct("result").typed("Value"));
    let constant = node_class("", "ConstantNode");
    let add = node_class("calc.", "AddNode")
        .input(PortSpec::direct("x").typed("Value"))
        .input(PortSpec::direct("y").typed("Value"));

    let chain = chain.max(1) as i32;
    let ret_id = chain + 1;
    let constant_id = |j: i32| chain + 2 + j;
    let add_id = |j: i32| chain + 2 + chain + j;

    let mut nodes = vec![NodeRecord::new(0, start).successors(vec![vec![1]])];
    for i in 1..=chain {
        nodes.push(
            NodeRecord::new(i, begin.clone())
                .predecessor(true)
                .successors(vec![vec![i + 1]]),
        );
    }
    nodes.push(
        NodeRecord::new(ret_id, ret)
            .predecessor(true)
            .inputs(vec![vec![add_id(chain - 1)]]),
    );
    for j in 0..chain {
        let value = (j as usize + seed) as i32;
        nodes.push(
            NodeRecord::new(constant_id(j), constant.clone())
                .prop("rawvalue", value)
                .prop("stamp", format!("i32 [{value}]")),
        );
    }
    for j in 0..chain {
        let x = if j == 0 { constant_id(0) } else { add_id(j - 1) };
        nodes.push(
            NodeRecord::new(add_id(j), add.clone())
                .inputs(vec![vec![x], vec![constant_id(j)]])
                .prop("stamp", "i32"),
        );
    }
    nodes
}

fn synthetic_dump(graphs: usize, nodes: usize) -> Result<Vec<u8>, EncodeError> {
    let mut writer = BgvWriter::new();
    writer.write_header();
    writer.write_document(&[("origin", PropValue::from("bgv-bench"))])?;
    writer.begin_group("Bench.run()", "Bench.run", Some(("com.example.Bench", "run")), -1)?;
    for i in 0..graphs {
        let phase = PHASES[i % PHASES.len()];
        writer.write_graph(
            i as i32,
            "After phase %s",
            &[PropValue::from(phase)],
            &[("index", PropValue::Int(i as i32))],
            &synthetic_graph(nodes / 3, i),
            &[],
        )?;
    }
    writer.close_group();
    Ok(writer.into_bytes())
}

// =============================================================================
// Measurements
// =============================================================================

#[derive(Debug, Serialize)]
struct Measurement {
    name: String,
    backend: Option<&'static str>,
    iterations: u32,
    avg_micros: f64,
    throughput_mb_s: f64,
}

#[derive(Debug, Serialize)]
struct Report {
    source: String,
    bytes: usize,
    graphs: usize,
    nodes: usize,
    results: Vec<Measurement>,
}

/// Decodes every graph, or skips every graph body when `skip` is set.
/// Returns the graph and node counts.
fn decode_all<R: BinaryReader>(reader: R, skip: bool) -> Result<(usize, usize), bgv::Error> {
    let mut decoder = BgvDecoder::new(reader);
    decoder.read_file_header(false)?;
    decoder.skip_document_props()?;
    let (mut graphs, mut nodes) = (0, 0);
    while decoder.read_graph_preheader()?.is_some() {
        if skip {
            decoder.skip_graph_header()?;
            decoder.skip_graph()?;
        } else {
            decoder.read_graph_header()?;
            nodes += decoder.read_graph()?.node_count();
        }
        graphs += 1;
    }
    Ok((graphs, nodes))
}

fn decode_graphs(data: &[u8]) -> Result<Vec<Graph>, bgv::Error> {
    let mut decoder = BgvDecoder::new(SliceReader::new(data));
    decoder.read_file_header(false)?;
    decoder.skip_document_props()?;
    let mut graphs = Vec::new();
    while decoder.read_graph_preheader()?.is_some() {
        decoder.skip_graph_header()?;
        graphs.push(decoder.read_graph()?);
    }
    Ok(graphs)
}

fn render_all(graphs: &[Graph]) -> Result<usize, Box<dyn Error>> {
    let options = AnnotatorOptions::default();
    let mut total = 0;
    for graph in graphs {
        let mut graph = graph.clone();
        annotate::apply(&mut graph, &options)?;
        total += graphviz::render(&graph, false)?.len();
    }
    Ok(total)
}

/// Runs `f` after a warmup and returns the average duration.
fn time<T, E>(mut f: impl FnMut() -> Result<T, E>) -> Result<Duration, E> {
    for _ in 0..WARMUP {
        f()?;
    }
    let start = Instant::now();
    for _ in 0..ITERS {
        f()?;
    }
    Ok(start.elapsed() / ITERS)
}

fn measurement(name: &str, backend: Option<&'static str>, iterations: u32, elapsed: Duration, bytes: usize) -> Measurement {
    let measurement = Measurement {
        name: name.to_string(),
        backend,
        iterations,
        avg_micros: elapsed.as_secs_f64() * 1_000_000.0,
        throughput_mb_s: (bytes as f64 / 1_000_000.0) / elapsed.as_secs_f64(),
    };
    info!(
        name,
        backend = backend.unwrap_or("-"),
        avg = ?elapsed,
        mb_per_s = measurement.throughput_mb_s,
        "measured"
    );
    measurement
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let mut json = false;
    let mut path = None;
    for arg in env::args().skip(1) {
        if arg == "--json" {
            json = true;
        } else {
            path = Some(arg);
        }
    }

    let (source, data) = match path {
        Some(path) => {
            let data = read_source(&path)?;
            (path, data)
        }
        None => {
            info!(graphs = SYNTHETIC_GRAPHS, nodes = SYNTHETIC_NODES, "generating synthetic dump");
            ("synthetic".to_string(), synthetic_dump(SYNTHETIC_GRAPHS, SYNTHETIC_NODES)?)
        }
    };
    let len = data.len();
    let (graphs, nodes) = decode_all(SliceReader::new(&data), false)?;
    info!(source = %source, bytes = len, graphs, nodes, "loaded");

    let mut results = Vec::new();
    let shared: std::sync::Arc<[u8]> = data.as_slice().into();
    for (mode, skip) in [("read", false), ("seek", true)] {
        let elapsed = time(|| decode_all(StreamReader::new(Cursor::new(&data[..]), len as u64), skip))?;
        results.push(measurement(mode, Some("stream"), ITERS, elapsed, len));
        let elapsed = time(|| decode_all(SliceReader::new(&data), skip))?;
        results.push(measurement(mode, Some("slice"), ITERS, elapsed, len));
        let elapsed = time(|| decode_all(UnpackReader::new(shared.clone()), skip))?;
        results.push(measurement(mode, Some("unpack"), ITERS, elapsed, len));
    }

    let decoded = decode_graphs(&data)?;
    let elapsed = time(|| render_all(&decoded))?;
    results.push(measurement("render", None, ITERS, elapsed, len));

    let start = Instant::now();
    render_all(&decode_graphs(&data)?)?;
    results.push(measurement("cold", None, 1, start.elapsed(), len));

    let report = Report {
        source,
        bytes: len,
        graphs,
        nodes,
        results,
    };
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("\n=== {} ({} bytes, {} graphs, {} nodes) ===", report.source, report.bytes, report.graphs, report.nodes);
        for m in &report.results {
            println!(
                "{:<8} {:<8} {:>12.1} us  {:>10.2} MB/s  (avg of {})",
                m.name,
                m.backend.unwrap_or("-"),
                m.avg_micros,
                m.throughput_mb_s,
                m.iterations
            );
        }
    }
    Ok(())
}
