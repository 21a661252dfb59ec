//! Case-insensitive text search over graph headers and properties.
//!
//! Each searchable object (a graph header, a node's properties, an edge's
//! properties) is rendered to one line of text and scanned for every term.
//! A hit records where it was found and up to [`CONTEXT_CHARS`] characters
//! of text on either side of the match.
//!
//! Matching folds ASCII case only.

use std::fmt;

use crate::codec::{BgvDecoder, GraphHeader};
use crate::error::Error;
use crate::model::{Graph, NodeId, Props};
use crate::reader::BinaryReader;

/// Characters of context kept on each side of a match.
pub const CONTEXT_CHARS: usize = 40;

/// What a hit was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    Header,
    Node(NodeId),
    Edge { from: NodeId, to: NodeId },
}

/// One occurrence of a term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    /// Index of the graph in the file.
    pub graph: usize,
    pub location: Location,
    pub before: String,
    /// The matched text, in its original case.
    pub matched: String,
    pub after: String,
}

impl fmt::Display for SearchHit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.graph)?;
        match self.location {
            Location::Header => {}
            Location::Node(id) => write!(f, ":{id}")?,
            Location::Edge { from, to } => write!(f, ":{from}-{to}")?,
        }
        write!(f, "  ...{}{}{}...", self.before, self.matched, self.after)
    }
}

/// A set of search terms.
#[derive(Debug, Clone)]
pub struct Search {
    terms: Vec<String>,
}

impl Search {
    /// Empty terms are dropped.
    pub fn new<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let terms = terms
            .into_iter()
            .map(|t| t.as_ref().to_ascii_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        Self { terms }
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Searches a graph's name and header properties.
    pub fn header(&self, index: usize, header: &GraphHeader) -> Vec<SearchHit> {
        let text = format!("{} {}", header.name(), props_text(&header.props));
        self.scan(index, Location::Header, &text)
    }

    /// Searches the properties of every node, then of every edge.
    pub fn graph(&self, index: usize, graph: &Graph) -> Vec<SearchHit> {
        let mut hits = Vec::new();
        for node in graph.nodes() {
            hits.extend(self.scan(index, Location::Node(node.id), &props_text(&node.props)));
        }
        for edge in graph.edges() {
            let location = Location::Edge {
                from: edge.from,
                to: edge.to,
            };
            hits.extend(self.scan(index, location, &props_text(&edge.props)));
        }
        hits
    }

    /// Searches the remaining graphs of a decoder positioned after the
    /// document properties. With `only` set, other graphs are skipped
    /// without decoding.
    pub fn decoder<R: BinaryReader>(
        &self,
        decoder: &mut BgvDecoder<R>,
        only: Option<usize>,
    ) -> Result<Vec<SearchHit>, Error> {
        let mut hits = Vec::new();
        while let Some((index, _)) = decoder.read_graph_preheader()? {
            if only.is_some_and(|wanted| wanted != index) {
                decoder.skip_graph_header()?;
                decoder.skip_graph()?;
                continue;
            }
            let header = decoder.read_graph_header()?;
            hits.extend(self.header(index, &header));
            let graph = decoder.read_graph()?;
            hits.extend(self.graph(index, &graph));
        }
        Ok(hits)
    }

    fn scan(&self, graph: usize, location: Location, text: &str) -> Vec<SearchHit> {
        let folded = text.to_ascii_lowercase();
        let mut hits = Vec::new();
        for term in &self.terms {
            let mut from = 0;
            while let Some(found) = folded[from..].find(term.as_str()) {
                let start = from + found;
                let end = start + term.len();
                hits.push(SearchHit {
                    graph,
                    location,
                    before: tail(&text[..start], CONTEXT_CHARS).to_string(),
                    matched: text[start..end].to_string(),
                    after: head(&text[end..], CONTEXT_CHARS).to_string(),
                });
                from = end;
            }
        }
        hits
    }
}

/// Renders properties as `key=value` pairs in key order.
fn props_text(props: &Props) -> String {
    props
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn head(s: &str, chars: usize) -> &str {
    s.char_indices().nth(chars).map_or(s, |(i, _)| &s[..i])
}

fn tail(s: &str, chars: usize) -> &str {
    match chars.checked_sub(1) {
        Some(n) => s.char_indices().rev().nth(n).map_or(s, |(i, _)| &s[i..]),
        None => "",
    }
}
