//! Phases that changed the graph.
//!
//! [`PhaseChanges`] walks the remaining graphs of a decoder in order and
//! yields only those that differ from the last graph it yielded. The first
//! graph always counts as a change. Each change carries the set of modified
//! nodes, ready to seed a spotlight.

use std::collections::BTreeSet;

use tracing::debug;

use crate::codec::{BgvDecoder, GraphHeader};
use crate::error::Error;
use crate::model::{Graph, NodeId};
use crate::reader::BinaryReader;

/// A graph that differs from the previous changed graph.
#[derive(Debug, Clone)]
pub struct PhaseChange {
    /// Index of the graph in the file.
    pub index: usize,
    /// Position among the changed graphs, from 0.
    pub number: usize,
    pub header: GraphHeader,
    pub graph: Graph,
    /// Nodes added, removed or modified relative to the previous change.
    pub modified: BTreeSet<NodeId>,
}

impl PhaseChange {
    /// Modified nodes still present in this graph. Removed nodes cannot
    /// be drawn, so they are left out.
    pub fn seeds(&self) -> Vec<NodeId> {
        self.modified
            .iter()
            .copied()
            .filter(|&id| self.graph.contains_node(id))
            .collect()
    }

    /// `<number>_<phase>`, for naming one output file per change.
    pub fn file_stem(&self) -> String {
        format!("{}_{}", self.number, self.header.phase().unwrap_or("graph"))
    }
}

/// Iterator over [`PhaseChange`]s. Stops after the first error.
#[derive(Debug)]
pub struct PhaseChanges<'d, R> {
    decoder: &'d mut BgvDecoder<R>,
    last: Option<Graph>,
    changed: usize,
    done: bool,
}

impl<'d, R: BinaryReader> PhaseChanges<'d, R> {
    /// `decoder` must be positioned after the document properties.
    pub fn new(decoder: &'d mut BgvDecoder<R>) -> Self {
        Self {
            decoder,
            last: None,
            changed: 0,
            done: false,
        }
    }

    fn advance(&mut self) -> Result<Option<PhaseChange>, Error> {
        while let Some((index, _)) = self.decoder.read_graph_preheader()? {
            let header = self.decoder.read_graph_header()?;
            let graph = self.decoder.read_graph()?;
            let modified = graph.diff(self.last.as_ref());
            if modified.is_empty() {
                debug!(index, "phase left the graph unchanged");
                continue;
            }

            let number = self.changed;
            self.changed += 1;
            self.last = Some(graph.clone());
            return Ok(Some(PhaseChange {
                index,
                number,
                header,
                graph,
                modified,
            }));
        }
        Ok(None)
    }
}

impl<R: BinaryReader> Iterator for PhaseChanges<'_, R> {
    type Item = Result<PhaseChange, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let result = self.advance();
        if !matches!(result, Ok(Some(_))) {
            self.done = true;
        }
        result.transpose()
    }
}
