//! Streaming BGV decoder.
//!
//! The caller drives the decoder through the file in order:
//!
//! ```text
//! read_file_header
//! read_document_props | skip_document_props
//! loop {
//!     read_graph_preheader          (None ends the loop)
//!     read_graph_header | skip_graph_header
//!     read_graph        | skip_graph
//! }
//! ```
//!
//! Calls out of this order fail with [`UsageError`]. A format error
//! leaves the cursor mid-structure, so the decoder refuses every call
//! after one.

use tracing::{debug, warn};

use crate::codec::token::*;
use crate::codec::{Pool, ValueReader};
use crate::error::{DecodeError, Error, LookupError, UsageError};
use crate::limits::{DOCUMENT_PROPS_MAJOR, MAGIC, SUPPORTED_VERSIONS};
use crate::model::{Graph, PoolObject, Props, Value};
use crate::reader::BinaryReader;

/// Where the decoder is in the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderState {
    Unstarted,
    HeaderRead,
    DocumentPropsRead,
    GraphPreheaderRead,
    GraphHeaderRead,
    GraphBodyRead,
    /// The stream has no more graphs.
    Exhausted,
    /// A format error occurred. The decoder must be discarded.
    Failed,
}

/// A group enclosing the graphs that follow it, such as one compilation.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub name: String,
    pub short_name: String,
    pub method: Option<PoolObject>,
    pub bci: i32,
    pub props: Props,
}

/// Per-graph metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphHeader {
    /// Groups open when the graph was read, outermost first.
    pub groups: Vec<Group>,
    /// Title format with `%s`/`%d` placeholders filled from `args`.
    pub format: String,
    pub args: Vec<Value>,
    pub props: Props,
}

impl GraphHeader {
    /// Formatted graph title.
    pub fn title(&self) -> String {
        let mut out = String::with_capacity(self.format.len());
        let mut args = self.args.iter();
        let mut chars = self.format.chars().peekable();
        while let Some(c) = chars.next() {
            if c == '%' && matches!(chars.peek(), Some('s' | 'd')) {
                if let Some(arg) = args.next() {
                    chars.next();
                    out.push_str(&arg.to_string());
                    continue;
                }
            }
            out.push(c);
        }
        out
    }

    /// Group short names and the title, joined with `/`.
    pub fn name(&self) -> String {
        let mut parts: Vec<String> = self.groups.iter().map(|g| g.short_name.clone()).collect();
        parts.push(self.title());
        parts.join("/")
    }

    /// Last dot-separated segment of the first argument, usually the
    /// phase class name.
    pub fn phase(&self) -> Option<&str> {
        let first = self.args.first()?.as_str()?;
        first.rsplit('.').next()
    }
}

/// Decoder over any [`BinaryReader`].
#[derive(Debug)]
pub struct BgvDecoder<R> {
    reader: R,
    pool: Pool,
    state: DecoderState,
    version: Option<(i8, i8)>,
    groups: Vec<Group>,
    next_index: usize,
}

impl<R: BinaryReader> BgvDecoder<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            pool: Pool::new(),
            state: DecoderState::Unstarted,
            version: None,
            groups: Vec::new(),
            next_index: 0,
        }
    }

    pub fn state(&self) -> DecoderState {
        self.state
    }

    /// Version read from the file header.
    pub fn version(&self) -> Option<(i8, i8)> {
        self.version
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    /// Current cursor offset.
    pub fn position(&self) -> u64 {
        self.reader.position()
    }

    pub fn into_reader(self) -> R {
        self.reader
    }

    fn expect_state(&self, operation: &'static str, allowed: &[DecoderState]) -> Result<(), UsageError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(UsageError {
                operation,
                state: self.state,
            })
        }
    }

    /// Runs one structural step, moving to `Failed` on a format error.
    fn step<T>(
        &mut self,
        operation: &'static str,
        f: impl FnOnce(&mut Self) -> Result<T, DecodeError>,
    ) -> Result<T, Error> {
        match f(self) {
            Ok(value) => Ok(value),
            Err(err) => {
                warn!(operation, offset = ?err.offset(), error = %err, "BGV decode failed");
                self.state = DecoderState::Failed;
                Err(err.into())
            }
        }
    }

    fn values(&mut self) -> ValueReader<'_, R> {
        ValueReader::new(&mut self.reader, &mut self.pool)
    }

    // =========================================================================
    // File header and document
    // =========================================================================

    /// Validates the magic and reads the version.
    ///
    /// With `version_check` set, versions this crate was not built for are
    /// rejected before anything else is read.
    pub fn read_file_header(&mut self, version_check: bool) -> Result<(i8, i8), Error> {
        self.expect_state("read file header", &[DecoderState::Unstarted])?;
        let version = self.step("read file header", |d| {
            let magic: [u8; 4] = d.reader.read_array("magic")?;
            if &magic != MAGIC {
                return Err(DecodeError::InvalidMagic { found: magic });
            }
            let major = d.reader.read_i8("major version")?;
            let minor = d.reader.read_i8("minor version")?;
            if version_check && !SUPPORTED_VERSIONS.contains(&(major, minor)) {
                return Err(DecodeError::UnsupportedVersion { major, minor });
            }
            Ok((major, minor))
        })?;
        debug!(major = version.0, minor = version.1, "read BGV header");
        self.version = Some(version);
        self.state = DecoderState::HeaderRead;
        Ok(version)
    }

    fn has_document(&mut self) -> Result<bool, DecodeError> {
        let major = self.version.map_or(0, |(major, _)| major);
        if major < DOCUMENT_PROPS_MAJOR || self.reader.is_eof() {
            return Ok(false);
        }
        if self.reader.peek_u8("document token")? != BEGIN_DOCUMENT {
            return Ok(false);
        }
        self.reader.skip(1, "document token")?;
        Ok(true)
    }

    /// Reads the document property block, if the file has one.
    pub fn read_document_props(&mut self) -> Result<Option<Props>, Error> {
        self.expect_state("read document props", &[DecoderState::HeaderRead])?;
        let props = self.step("read document props", |d| {
            if !d.has_document()? {
                return Ok(None);
            }
            d.values().read_props().map(Some)
        })?;
        debug!(present = props.is_some(), "read document props");
        self.state = DecoderState::DocumentPropsRead;
        Ok(props)
    }

    pub fn skip_document_props(&mut self) -> Result<(), Error> {
        self.expect_state("skip document props", &[DecoderState::HeaderRead])?;
        self.step("skip document props", |d| {
            if d.has_document()? {
                d.values().skip_props()?;
            }
            Ok(())
        })?;
        self.state = DecoderState::DocumentPropsRead;
        Ok(())
    }

    // =========================================================================
    // Graphs
    // =========================================================================

    /// Advances to the next graph, returning its sequence index and id.
    ///
    /// Group records before the graph are consumed along the way. Returns
    /// `None` once the stream is exhausted.
    pub fn read_graph_preheader(&mut self) -> Result<Option<(usize, i32)>, Error> {
        self.expect_state(
            "read graph preheader",
            &[DecoderState::DocumentPropsRead, DecoderState::GraphBodyRead],
        )?;
        let id = self.step("read graph preheader", Self::next_graph_id)?;
        let Some(id) = id else {
            debug!(graphs = self.next_index, "BGV stream exhausted");
            self.state = DecoderState::Exhausted;
            return Ok(None);
        };
        let index = self.next_index;
        self.next_index += 1;
        debug!(index, id, "read graph preheader");
        self.state = DecoderState::GraphPreheaderRead;
        Ok(Some((index, id)))
    }

    fn next_graph_id(&mut self) -> Result<Option<i32>, DecodeError> {
        loop {
            if self.reader.is_eof() {
                return Ok(None);
            }
            let offset = self.reader.position();
            match self.reader.read_u8("stream token")? {
                BEGIN_GRAPH => return self.reader.read_i32("graph id").map(Some),
                BEGIN_GROUP => {
                    let group = self.read_group()?;
                    self.groups.push(group);
                }
                CLOSE_GROUP => {
                    if self.groups.pop().is_none() {
                        return Err(DecodeError::UnbalancedGroup { offset });
                    }
                }
                BEGIN_DOCUMENT => self.values().skip_props()?,
                token => {
                    return Err(DecodeError::UnknownToken {
                        offset,
                        context: "stream token",
                        token,
                    });
                }
            }
        }
    }

    fn read_group(&mut self) -> Result<Group, DecodeError> {
        let mut values = self.values();
        let name = values.read_pool_object()?.map(|n| n.to_string()).unwrap_or_default();
        let short_name = values
            .read_pool_object()?
            .map(|n| n.to_string())
            .unwrap_or_default();
        let method = values.read_pool_object()?;
        let bci = values.reader.read_i32("group bci")?;
        let props = values.read_props()?;
        Ok(Group {
            name,
            short_name,
            method,
            bci,
            props,
        })
    }

    pub fn read_graph_header(&mut self) -> Result<GraphHeader, Error> {
        self.expect_state("read graph header", &[DecoderState::GraphPreheaderRead])?;
        let header = self.step("read graph header", |d| {
            let groups = d.groups.clone();
            let mut values = d.values();
            let format = values.read_string("graph format")?;
            let args = values.read_args()?;
            let props = values.read_props()?;
            Ok(GraphHeader {
                groups,
                format,
                args,
                props,
            })
        })?;
        self.state = DecoderState::GraphHeaderRead;
        Ok(header)
    }

    pub fn skip_graph_header(&mut self) -> Result<(), Error> {
        self.expect_state("skip graph header", &[DecoderState::GraphPreheaderRead])?;
        self.step("skip graph header", |d| {
            let mut values = d.values();
            values.skip_string("graph format")?;
            values.skip_args()?;
            values.skip_props()
        })?;
        self.state = DecoderState::GraphHeaderRead;
        Ok(())
    }

    /// Reads the body of the current graph.
    pub fn read_graph(&mut self) -> Result<Graph, Error> {
        self.expect_state("read graph", &[DecoderState::GraphHeaderRead])?;
        let graph = self.step("read graph", |d| d.values().read_graph_body())?;
        debug!(nodes = graph.node_count(), edges = graph.edge_count(), "read graph");
        self.state = DecoderState::GraphBodyRead;
        Ok(graph)
    }

    pub fn skip_graph(&mut self) -> Result<(), Error> {
        self.expect_state("skip graph", &[DecoderState::GraphHeaderRead])?;
        self.step("skip graph", |d| d.values().skip_graph_body())?;
        self.state = DecoderState::GraphBodyRead;
        Ok(())
    }

    /// Skips forward to the graph with sequence index `index` and reads its
    /// preheader, leaving the decoder ready for its header.
    ///
    /// Fails with [`LookupError::GraphNotFound`] if the stream ends first or
    /// the graph was already passed. A graph already passed is reported
    /// without consuming any input.
    pub fn skip_to_graph(&mut self, index: usize) -> Result<i32, Error> {
        self.expect_state(
            "skip to graph",
            &[DecoderState::DocumentPropsRead, DecoderState::GraphBodyRead],
        )?;
        if index < self.next_index {
            return Err(LookupError::GraphNotFound { index }.into());
        }
        loop {
            let Some((current, id)) = self.read_graph_preheader()? else {
                return Err(LookupError::GraphNotFound { index }.into());
            };
            if current == index {
                return Ok(id);
            }
            self.skip_graph_header()?;
            self.skip_graph()?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{BgvWriter, NodeClassSpec, NodeRecord, PortSpec, PropValue};
    use crate::error::ErrorKind;
    use crate::reader::SliceReader;

    fn start() -> NodeClassSpec {
        NodeClassSpec::new("org.graalvm.compiler.nodes.StartNode", "Start").successor(PortSpec::direct("next"))
    }

    fn end() -> NodeClassSpec {
        NodeClassSpec::new("org.graalvm.compiler.nodes.ReturnNode", "Return")
    }

    fn sample(graphs: usize) -> Vec<u8> {
        let mut writer = BgvWriter::new();
        writer.write_header();
        writer.write_document(&[("vm", PropValue::from("graal"))]).unwrap();
        writer
            .begin_group("Fib.fib(int)", "Fib.fib", Some(("com.example.Fib", "fib")), -1)
            .unwrap();
        for i in 0..graphs {
            writer
                .write_graph(
                    i as i32,
                    "After phase %s",
                    &[PropValue::from("org.graalvm.compiler.phases.common.CanonicalizerPhase")],
                    &[("scope", PropValue::from("main"))],
                    &[
                        NodeRecord::new(0, start()).successors(vec![vec![1]]),
                        NodeRecord::new(1, end()).predecessor(true),
                    ],
                    &[],
                )
                .unwrap();
        }
        writer.close_group();
        writer.into_bytes()
    }

    fn opened(bytes: &[u8]) -> BgvDecoder<SliceReader<'_>> {
        let mut decoder = BgvDecoder::new(SliceReader::new(bytes));
        decoder.read_file_header(true).unwrap();
        decoder.read_document_props().unwrap();
        decoder
    }

    #[test]
    fn test_full_read() {
        let bytes = sample(1);
        let mut decoder = BgvDecoder::new(SliceReader::new(&bytes));
        assert_eq!(decoder.read_file_header(true).unwrap(), (7, 0));
        let document = decoder.read_document_props().unwrap().unwrap();
        assert_eq!(document.get("vm").and_then(Value::as_str), Some("graal"));

        assert_eq!(decoder.read_graph_preheader().unwrap(), Some((0, 0)));
        let header = decoder.read_graph_header().unwrap();
        assert_eq!(header.name(), "Fib.fib/After phase org.graalvm.compiler.phases.common.CanonicalizerPhase");
        assert_eq!(header.phase(), Some("CanonicalizerPhase"));
        assert_eq!(header.groups[0].method.as_ref().map(PoolObject::simple_name), Some("Fib.fib".to_string()));

        let graph = decoder.read_graph().unwrap();
        assert_eq!(graph.node_count(), 2);
        assert!(graph.node(1).unwrap().has_predecessor);
        assert_eq!(decoder.read_graph_preheader().unwrap(), None);
        assert_eq!(decoder.state(), DecoderState::Exhausted);
    }

    #[test]
    fn test_out_of_order_is_usage_error() {
        let bytes = sample(1);
        let mut decoder = BgvDecoder::new(SliceReader::new(&bytes));
        let err = decoder.read_graph().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Usage);
        assert_eq!(decoder.position(), 0);

        let mut decoder = opened(&bytes);
        decoder.read_graph_preheader().unwrap();
        assert!(matches!(
            decoder.read_graph(),
            Err(Error::Usage(UsageError { state: DecoderState::GraphPreheaderRead, .. }))
        ));
    }

    #[test]
    fn test_exhausted_decoder_refuses_further_reads() {
        let bytes = sample(0);
        let mut decoder = opened(&bytes);
        assert_eq!(decoder.read_graph_preheader().unwrap(), None);
        assert_eq!(decoder.read_graph_preheader().unwrap_err().kind(), ErrorKind::Usage);
    }

    #[test]
    fn test_failure_is_terminal() {
        let mut bytes = sample(1);
        bytes.push(0x7e);
        let mut decoder = opened(&bytes);
        decoder.skip_to_graph(0).unwrap();
        decoder.skip_graph_header().unwrap();
        decoder.skip_graph().unwrap();
        let err = decoder.read_graph_preheader().unwrap_err();
        assert!(matches!(
            err,
            Error::Format(DecodeError::UnknownToken { token: 0x7e, context: "stream token", .. })
        ));
        assert_eq!(decoder.state(), DecoderState::Failed);
        assert_eq!(decoder.read_graph_preheader().unwrap_err().kind(), ErrorKind::Usage);
    }

    #[test]
    fn test_bad_magic() {
        let mut decoder = BgvDecoder::new(SliceReader::new(b"BIGX\x07\x00"));
        let err = decoder.read_file_header(false).unwrap_err();
        assert!(matches!(err, Error::Format(DecodeError::InvalidMagic { found }) if &found == b"BIGX"));
    }

    #[test]
    fn test_version_check_optional() {
        let mut writer = BgvWriter::new().with_version(9, 3);
        writer.write_header();
        let bytes = writer.into_bytes();

        let mut decoder = BgvDecoder::new(SliceReader::new(&bytes));
        assert!(matches!(
            decoder.read_file_header(true),
            Err(Error::Format(DecodeError::UnsupportedVersion { major: 9, minor: 3 }))
        ));

        let mut decoder = BgvDecoder::new(SliceReader::new(&bytes));
        assert_eq!(decoder.read_file_header(false).unwrap(), (9, 3));
    }

    #[test]
    fn test_no_document_before_version_7() {
        let mut writer = BgvWriter::new().with_version(6, 1);
        writer.write_header();
        writer.write_graph(0, "g", &[], &[], &[], &[]).unwrap();
        let bytes = writer.into_bytes();

        let mut decoder = BgvDecoder::new(SliceReader::new(&bytes));
        decoder.read_file_header(true).unwrap();
        assert_eq!(decoder.read_document_props().unwrap(), None);
        assert_eq!(decoder.read_graph_preheader().unwrap(), Some((0, 0)));
    }

    #[test]
    fn test_skip_to_graph() {
        let bytes = sample(3);
        let mut decoder = opened(&bytes);
        assert_eq!(decoder.skip_to_graph(2).unwrap(), 2);
        assert_eq!(decoder.read_graph_header().unwrap().phase(), Some("CanonicalizerPhase"));
        decoder.read_graph().unwrap();

        let position = decoder.position();
        let err = decoder.skip_to_graph(1).unwrap_err();
        assert!(matches!(err, Error::Lookup(LookupError::GraphNotFound { index: 1 })));
        assert_eq!(decoder.position(), position);

        assert!(matches!(
            decoder.skip_to_graph(7),
            Err(Error::Lookup(LookupError::GraphNotFound { index: 7 }))
        ));
    }

    #[test]
    fn test_close_without_group() {
        let mut writer = BgvWriter::new();
        writer.write_header();
        writer.write_document(&[]).unwrap();
        writer.close_group();
        let bytes = writer.into_bytes();
        let mut decoder = opened(&bytes);
        assert!(matches!(
            decoder.read_graph_preheader(),
            Err(Error::Format(DecodeError::UnbalancedGroup { .. }))
        ));
    }

    #[test]
    fn test_title_placeholders() {
        let header = GraphHeader {
            groups: vec![],
            format: "%s at %d (100%)".to_string(),
            args: vec![Value::Str("x".into()), Value::Int(4)],
            props: Props::new(),
        };
        assert_eq!(header.title(), "x at 4 (100%)");

        let header = GraphHeader {
            format: "%s %s".to_string(),
            args: vec![Value::Str("only".into())],
            ..header
        };
        assert_eq!(header.title(), "only %s");
        assert_eq!(header.phase(), Some("only"));
    }
}
