//! BGV: decoder, graph model and renderer for compiler graph dumps.
//!
//! BGV ("binary graph visualization") is the dump format the Graal compiler
//! writes while it compiles a method: a stream of graphs, one per phase,
//! nested in groups. This crate reads those dumps, models each graph,
//! annotates it for presentation and writes it as Graphviz DOT.
//!
//! # Quick Start
//!
//! ```rust
//! use bgv::codec::{BgvDecoder, BgvWriter, NodeClassSpec, NodeRecord, PortSpec};
//! use bgv::reader::SliceReader;
//! use bgv::{annotate, graphviz, AnnotatorOptions};
//!
//! // Build a one-graph dump.
//! let start = NodeClassSpec::new("org.graalvm.compiler.nodes.StartNode", "")
//!     .successor(PortSpec::direct("next"));
//! let ret = NodeClassSpec::new("org.graalvm.compiler.nodes.ReturnNode", "");
//! let mut writer = BgvWriter::new();
//! writer.write_header();
//! writer.write_document(&[]).unwrap();
//! writer
//!     .write_graph(
//!         7,
//!         "Initial graph",
//!         &[],
//!         &[],
//!         &[
//!             NodeRecord::new(0, start).successors(vec![vec![1]]),
//!             NodeRecord::new(1, ret).predecessor(true),
//!         ],
//!         &[],
//!     )
//!     .unwrap();
//! let bytes = writer.into_bytes();
//!
//! // Decode it.
//! let mut decoder = BgvDecoder::new(SliceReader::new(&bytes));
//! decoder.read_file_header(true).unwrap();
//! decoder.read_document_props().unwrap();
//! let (index, id) = decoder.read_graph_preheader().unwrap().unwrap();
//! assert_eq!((index, id), (0, 7));
//! let header = decoder.read_graph_header().unwrap();
//! assert_eq!(header.name(), "Initial graph");
//! let mut graph = decoder.read_graph().unwrap();
//!
//! // Annotate and render.
//! annotate::apply(&mut graph, &AnnotatorOptions::default()).unwrap();
//! let dot = graphviz::render(&graph, false).unwrap();
//! assert!(dot.contains("node0 -> node1"));
//! ```
//!
//! # Modules
//!
//! - [`reader`]: Byte sources (buffered stream, slice, shared buffer)
//! - [`codec`]: BGV decoder state machine and fixture encoder
//! - [`model`]: Graph, node, edge and property types, structural diff
//! - [`annotate`]: Presentation annotators
//! - [`spotlight`]: Emphasis around selected nodes
//! - [`phases`]: Walking only the phases that changed the graph
//! - [`search`]: Text search over headers and properties
//! - [`graphviz`]: DOT serializer
//! - [`error`]: Error types
//! - [`limits`]: Format constants and decode limits
//!
//! # Security
//!
//! The decoder is meant for dumps from arbitrary producers:
//! - Lengths and counts are checked against [`limits`] before allocating
//! - Nested values are bounded in depth
//! - Pool references to unknown ids are rejected, never defaulted

pub mod annotate;
pub mod codec;
pub mod error;
pub mod graphviz;
pub mod limits;
pub mod model;
pub mod phases;
pub mod reader;
pub mod search;
pub mod spotlight;

// Re-export commonly used types at crate root
pub use annotate::{Annotator, AnnotatorOptions, Annotators};
pub use codec::{BgvDecoder, BgvWriter, DecoderState, GraphHeader, Group};
pub use error::{AnnotateError, DecodeError, EncodeError, Error, ErrorKind, LookupError, UsageError};
pub use graphviz::GraphvizWriter;
pub use model::{Edge, EdgeId, Graph, Node, NodeId, PoolObject, Props, Value};
pub use phases::{PhaseChange, PhaseChanges};
pub use reader::{read_source, BinaryReader, SliceReader, StreamReader, UnpackReader};
pub use search::{Search, SearchHit};
pub use spotlight::Spotlight;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
