//! Decode, annotate and render dumps built with the crate's own encoder.

use std::io::Cursor;

use bgv::codec::{NodeClassSpec, NodeRecord, PortSpec, PropValue};
use bgv::model::Block;
use bgv::search::Location;
use bgv::{
    annotate, graphviz, AnnotatorOptions, BgvDecoder, BgvWriter, BinaryReader, DecodeError, DecoderState, Error,
    ErrorKind, PhaseChanges, Search, SliceReader, StreamReader, UnpackReader,
};

const NODES: &str = "org.graalvm.compiler.nodes";

fn class(simple: &str) -> NodeClassSpec {
    NodeClassSpec::new(&format!("{NODES}.{simple}"), "")
}

fn start() -> NodeClassSpec {
    class("StartNode").successor(PortSpec::direct("next"))
}

fn ret() -> NodeClassSpec {
    class("ReturnNode").input(PortSpec::direct("result").typed("Value"))
}

fn constant() -> NodeClassSpec {
    class("ConstantNode")
}

/// Start -> Return, the smallest meaningful graph.
fn two_nodes() -> Vec<NodeRecord> {
    vec![
        NodeRecord::new(0, start()).successors(vec![vec![1]]),
        NodeRecord::new(1, ret()).predecessor(true),
    ]
}

/// Start -> Return with a constant result; `value` varies between phases.
fn returning(value: i32) -> Vec<NodeRecord> {
    vec![
        NodeRecord::new(0, start()).successors(vec![vec![1]]),
        NodeRecord::new(1, ret()).predecessor(true).inputs(vec![vec![2]]),
        NodeRecord::new(2, constant())
            .prop("rawvalue", value)
            .prop("stamp", format!("i32 [{value}]")),
    ]
}

fn dump(graphs: usize) -> Vec<u8> {
    let values: Vec<i32> = (0..graphs as i32).collect();
    dump_values(&values)
}

/// One graph per value, each returning that constant.
fn dump_values(values: &[i32]) -> Vec<u8> {
    let mut writer = BgvWriter::new();
    writer.write_header();
    writer
        .write_document(&[("vm", PropValue::from("graal")), ("pid", PropValue::Long(4242))])
        .unwrap();
    writer
        .begin_group("Test.run()", "Test.run", Some(("com.example.Test", "run")), -1)
        .unwrap();
    for (i, &value) in values.iter().enumerate() {
        let blocks = [Block {
            id: 0,
            nodes: vec![0, 1],
            successors: vec![],
        }];
        writer
            .write_graph(
                i as i32,
                "After phase %s",
                &[PropValue::from("org.graalvm.compiler.phases.common.CanonicalizerPhase")],
                &[("scope", PropValue::from("main")), ("dims", PropValue::IntArray(vec![1, 2]))],
                &returning(value),
                &blocks,
            )
            .unwrap();
    }
    writer.close_group();
    writer.into_bytes()
}

fn decoder(bytes: &[u8]) -> BgvDecoder<SliceReader<'_>> {
    let mut decoder = BgvDecoder::new(SliceReader::new(bytes));
    decoder.read_file_header(true).unwrap();
    decoder.read_document_props().unwrap();
    decoder
}

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn test_two_node_graph_renders() {
    let mut writer = BgvWriter::new();
    writer.write_header();
    writer.write_document(&[]).unwrap();
    writer.write_graph(0, "Initial", &[], &[], &two_nodes(), &[]).unwrap();
    let bytes = writer.into_bytes();

    let mut decoder = decoder(&bytes);
    assert_eq!(decoder.read_graph_preheader().unwrap(), Some((0, 0)));
    decoder.read_graph_header().unwrap();
    let mut graph = decoder.read_graph().unwrap();
    assert_eq!(decoder.read_graph_preheader().unwrap(), None);

    annotate::apply(&mut graph, &AnnotatorOptions::default()).unwrap();
    let dot = graphviz::render(&graph, false).unwrap();

    let declarations = dot
        .lines()
        .filter(|line| line.trim_start().starts_with("node") && !line.contains("->") && !line.contains("node ["))
        .count();
    assert_eq!(declarations, 2);
    let edges: Vec<&str> = dot.lines().filter(|line| line.contains("->")).collect();
    assert_eq!(edges.len(), 1);
    assert!(edges[0].trim_start().starts_with("node0 -> node1 "));
}

#[test]
fn test_unsupported_version_rejected() {
    let mut writer = BgvWriter::new().with_version(9, 9);
    writer.write_header();
    writer.write_document(&[]).unwrap();
    writer.write_graph(0, "g", &[], &[], &two_nodes(), &[]).unwrap();
    let bytes = writer.into_bytes();

    let mut decoder = BgvDecoder::new(SliceReader::new(&bytes));
    let err = decoder.read_file_header(true).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Format);
    assert!(matches!(
        err,
        Error::Format(DecodeError::UnsupportedVersion { major: 9, minor: 9 })
    ));
    assert_eq!(decoder.state(), DecoderState::Failed);
    assert_eq!(decoder.read_document_props().unwrap_err().kind(), ErrorKind::Usage);

    let mut lenient = BgvDecoder::new(SliceReader::new(&bytes));
    assert_eq!(lenient.read_file_header(false).unwrap(), (9, 9));
}

#[test]
fn test_graph_count_then_none() {
    let bytes = dump(5);
    let mut decoder = decoder(&bytes);
    for expected in 0..5 {
        let (index, id) = decoder.read_graph_preheader().unwrap().unwrap();
        assert_eq!((index, id), (expected, expected as i32));
        let header = decoder.read_graph_header().unwrap();
        assert_eq!(header.name(), "Test.run/After phase org.graalvm.compiler.phases.common.CanonicalizerPhase");
        assert_eq!(header.phase(), Some("CanonicalizerPhase"));
        decoder.skip_graph().unwrap();
    }
    assert_eq!(decoder.read_graph_preheader().unwrap(), None);
    assert_eq!(decoder.state(), DecoderState::Exhausted);
    assert_eq!(decoder.read_graph_preheader().unwrap_err().kind(), ErrorKind::Usage);
}

#[test]
fn test_document_props() {
    let bytes = dump(1);
    let mut decoder = BgvDecoder::new(SliceReader::new(&bytes));
    decoder.read_file_header(true).unwrap();
    let props = decoder.read_document_props().unwrap().unwrap();
    assert_eq!(props.get("vm").and_then(|v| v.as_str()), Some("graal"));
    assert_eq!(props.get("pid").and_then(|v| v.as_int()), Some(4242));
}

/// Positions after each structural step when reading everything.
fn read_positions<R: BinaryReader>(mut decoder: BgvDecoder<R>) -> Vec<u64> {
    decoder.read_file_header(true).unwrap();
    decoder.read_document_props().unwrap();
    let mut positions = vec![decoder.position()];
    while decoder.read_graph_preheader().unwrap().is_some() {
        decoder.read_graph_header().unwrap();
        positions.push(decoder.position());
        decoder.read_graph().unwrap();
        positions.push(decoder.position());
    }
    positions
}

/// Positions after each structural step when skipping everything.
fn skip_positions<R: BinaryReader>(mut decoder: BgvDecoder<R>) -> Vec<u64> {
    decoder.read_file_header(true).unwrap();
    decoder.skip_document_props().unwrap();
    let mut positions = vec![decoder.position()];
    while decoder.read_graph_preheader().unwrap().is_some() {
        decoder.skip_graph_header().unwrap();
        positions.push(decoder.position());
        decoder.skip_graph().unwrap();
        positions.push(decoder.position());
    }
    positions
}

#[test]
fn test_read_and_skip_agree_on_every_backend() {
    let bytes = dump(4);
    let len = bytes.len() as u64;

    let expected = read_positions(BgvDecoder::new(SliceReader::new(&bytes)));
    assert_eq!(expected.len(), 9);
    assert_eq!(expected.last().copied(), Some(len - 1));

    assert_eq!(skip_positions(BgvDecoder::new(SliceReader::new(&bytes))), expected);
    assert_eq!(
        read_positions(BgvDecoder::new(StreamReader::new(Cursor::new(bytes.clone()), len))),
        expected
    );
    assert_eq!(
        skip_positions(BgvDecoder::new(StreamReader::new(Cursor::new(bytes.clone()), len))),
        expected
    );
    assert_eq!(read_positions(BgvDecoder::new(UnpackReader::new(bytes.clone()))), expected);
    assert_eq!(skip_positions(BgvDecoder::new(UnpackReader::new(bytes))), expected);
}

#[test]
fn test_skip_to_graph() {
    let bytes = dump(6);
    let mut decoder = decoder(&bytes);
    assert_eq!(decoder.skip_to_graph(4).unwrap(), 4);
    decoder.read_graph_header().unwrap();
    let graph = decoder.read_graph().unwrap();
    assert_eq!(graph.node(2).unwrap().prop("rawvalue").and_then(|v| v.as_int()), Some(4));

    let err = decoder.skip_to_graph(1).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Lookup);
    let err = decoder.skip_to_graph(10).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Lookup);
}

#[test]
fn test_consecutive_phases_diff() {
    let bytes = dump(3);
    let mut decoder = decoder(&bytes);
    let mut graphs = Vec::new();
    while decoder.read_graph_preheader().unwrap().is_some() {
        decoder.skip_graph_header().unwrap();
        graphs.push(decoder.read_graph().unwrap());
    }
    assert_eq!(graphs.len(), 3);
    assert_eq!(graphs[0].diff(None).len(), 3);
    // Only the constant's value changes between phases.
    assert_eq!(graphs[1].diff(Some(&graphs[0])).into_iter().collect::<Vec<_>>(), vec![2]);
    assert!(graphs[1].diff(Some(&graphs[1])).is_empty());
}

#[test]
fn test_annotated_render_with_stamps() {
    let bytes = dump(1);
    let mut decoder = decoder(&bytes);
    decoder.read_graph_preheader().unwrap();
    decoder.skip_graph_header().unwrap();
    let mut graph = decoder.read_graph().unwrap();

    let options = AnnotatorOptions::new().show_stamps(true).reduce_edges(false);
    annotate::apply(&mut graph, &options).unwrap();
    let dot = graphviz::render(&graph, true).unwrap();
    assert!(dot.contains("label=\"C(0)\\ni32 [0]\""));
    assert!(dot.contains("dpi=200"));
    assert_eq!(graphviz::render(&graph, true).unwrap(), dot);

    // With reduction the constant is drawn beside its user.
    let mut reduced = decoder_graph(&bytes);
    annotate::apply(&mut reduced, &AnnotatorOptions::default()).unwrap();
    let dot = graphviz::render(&reduced, false).unwrap();
    assert!(dot.contains("inline2x1 -> node1"));
}

fn decoder_graph(bytes: &[u8]) -> bgv::Graph {
    let mut decoder = decoder(bytes);
    decoder.read_graph_preheader().unwrap();
    decoder.skip_graph_header().unwrap();
    decoder.read_graph().unwrap()
}

#[test]
fn test_compressed_source() {
    let bytes = dump(2);
    let compressed = zstd::encode_all(bytes.as_slice(), 3).unwrap();
    let path = std::env::temp_dir().join(format!("bgv-end-to-end-{}.bgv.zst", std::process::id()));
    std::fs::write(&path, &compressed).unwrap();

    let loaded = bgv::read_source(&path);
    std::fs::remove_file(&path).unwrap();
    assert_eq!(loaded.unwrap(), bytes);
}

#[test]
fn test_changed_phases_render_with_spotlight() {
    let bytes = dump_values(&[7, 7, 8, 8]);
    let mut decoder = decoder(&bytes);
    let changes = PhaseChanges::new(&mut decoder).collect::<Result<Vec<_>, _>>().unwrap();
    assert_eq!(changes.iter().map(|c| c.index).collect::<Vec<_>>(), vec![0, 2]);
    assert_eq!(changes[0].modified.len(), 3);
    assert_eq!(changes[1].seeds(), vec![2]);
    assert_eq!(changes[1].file_stem(), "1_CanonicalizerPhase");
    assert_eq!(decoder.state(), DecoderState::Exhausted);

    let mut graph = changes[1].graph.clone();
    let options = AnnotatorOptions::new().spotlight(changes[1].seeds());
    annotate::apply(&mut graph, &options).unwrap();
    let dot = graphviz::render(&graph, false).unwrap();
    let lit: Vec<&str> = dot.lines().filter(|line| line.contains("penwidth=3")).collect();
    assert_eq!(lit.len(), 1);
    assert!(lit[0].trim_start().starts_with("node2 ["));
}

#[test]
fn test_search_across_dump() {
    let bytes = dump(3);
    let mut all = decoder(&bytes);
    let hits = Search::new(["canonicalizer"]).decoder(&mut all, None).unwrap();
    assert_eq!(hits.iter().map(|hit| hit.graph).collect::<Vec<_>>(), vec![0, 1, 2]);
    assert!(hits.iter().all(|hit| hit.location == Location::Header));

    let mut one = decoder(&bytes);
    let hits = Search::new(["I32 [1]"]).decoder(&mut one, Some(1)).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].location, Location::Node(2));
    assert!(hits[0].to_string().starts_with("1:2  ..."));
    assert_eq!(one.state(), DecoderState::Exhausted);

    let mut edges = decoder(&bytes);
    let hits = Search::new(["result"]).decoder(&mut edges, Some(0)).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].location, Location::Edge { from: 2, to: 1 });
}
