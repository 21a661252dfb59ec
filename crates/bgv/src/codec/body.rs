//! Graph bodies: node records followed by control-flow blocks.

use crate::codec::ValueReader;
use crate::codec::token::SUCCESSOR_PORT_TYPE;
use crate::error::DecodeError;
use crate::limits::{MAX_ARRAY_LEN, MAX_BLOCKS, MAX_NODES};
use crate::model::{Block, Graph, NodeId, Port, Props, Value};
use crate::reader::BinaryReader;

/// An edge read from a port, created once every node exists.
struct PendingEdge {
    from: NodeId,
    to: NodeId,
    props: Props,
}

impl PendingEdge {
    fn new(port: &Port, node: NodeId, other: NodeId, index: Option<usize>, successor: bool) -> Self {
        let mut props = Props::new();
        props.insert("name".to_string(), Value::Str(port.name.clone()));
        let port_type = if successor {
            Some(SUCCESSOR_PORT_TYPE.to_string())
        } else {
            port.input_type.clone()
        };
        if let Some(port_type) = port_type {
            props.insert("type".to_string(), Value::Str(port_type));
        }
        match index {
            Some(index) => props.insert("index".to_string(), Value::Int(index as i64)),
            None => props.insert("direct".to_string(), Value::Bool(true)),
        };
        let (from, to) = if successor { (node, other) } else { (other, node) };
        Self { from, to, props }
    }
}

impl<R: BinaryReader> ValueReader<'_, R> {
    // =========================================================================
    // DECODING
    // =========================================================================

    pub(crate) fn read_graph_body(&mut self) -> Result<Graph, DecodeError> {
        let count = self.read_len("nodes", MAX_NODES)?;
        let mut graph = Graph::new();
        let mut pending = Vec::new();

        for _ in 0..count {
            let offset = self.reader.position();
            let id = self.reader.read_i32("node id")?;
            let class = self.read_node_class()?;
            let has_predecessor = self.reader.read_u8("node predecessor flag")? != 0;
            let props = self.read_props()?;
            graph
                .create_node(id, Some(class.clone()), props)
                .map_err(|_| DecodeError::DuplicateNode { offset, id })?
                .has_predecessor = has_predecessor;

            for port in &class.inputs {
                self.read_port(port, id, false, &mut pending)?;
            }
            for port in &class.outputs {
                self.read_port(port, id, true, &mut pending)?;
            }
        }

        let offset = self.reader.position();
        for edge in pending {
            let (from, to) = (edge.from, edge.to);
            graph
                .create_edge(from, to, edge.props)
                .map_err(|_| DecodeError::DanglingEdge { offset, from, to })?;
        }

        graph.blocks = self.read_blocks()?;
        Ok(graph)
    }

    fn read_port(
        &mut self,
        port: &Port,
        node: NodeId,
        successor: bool,
        pending: &mut Vec<PendingEdge>,
    ) -> Result<(), DecodeError> {
        if port.direct {
            let other = self.reader.read_i32("edge")?;
            if other >= 0 {
                pending.push(PendingEdge::new(port, node, other, None, successor));
            }
        } else {
            let count = self.read_count16("edge list")?;
            for index in 0..count {
                let other = self.reader.read_i32("edge")?;
                if other >= 0 {
                    pending.push(PendingEdge::new(port, node, other, Some(index), successor));
                }
            }
        }
        Ok(())
    }

    fn read_blocks(&mut self) -> Result<Vec<Block>, DecodeError> {
        let count = self.read_len("blocks", MAX_BLOCKS)?;
        let mut blocks = Vec::with_capacity(count);
        for _ in 0..count {
            let id = self.reader.read_i32("block id")?;
            let nodes = self.read_i32_list("block nodes")?;
            let successors = self.read_i32_list("block successors")?;
            blocks.push(Block { id, nodes, successors });
        }
        Ok(blocks)
    }

    fn read_i32_list(&mut self, field: &'static str) -> Result<Vec<i32>, DecodeError> {
        let count = self.read_len(field, MAX_ARRAY_LEN)?;
        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            values.push(self.reader.read_i32(field)?);
        }
        Ok(values)
    }

    pub(crate) fn read_subgraph(&mut self) -> Result<Graph, DecodeError> {
        let props = self.read_props()?;
        let mut graph = self.read_graph_body()?;
        graph.props = props;
        Ok(graph)
    }

    // =========================================================================
    // SKIPPING
    // =========================================================================

    /// Skips a graph body. Node classes are still resolved, since they
    /// determine how many port entries follow each node.
    pub(crate) fn skip_graph_body(&mut self) -> Result<(), DecodeError> {
        let count = self.read_len("nodes", MAX_NODES)?;
        for _ in 0..count {
            self.reader.skip_i32(1, "node id")?;
            let class = self.read_node_class()?;
            self.reader.skip_i8(1, "node predecessor flag")?;
            self.skip_props()?;
            for port in class.inputs.iter().chain(&class.outputs) {
                if port.direct {
                    self.reader.skip_i32(1, "edge")?;
                } else {
                    let count = self.read_count16("edge list")?;
                    self.reader.skip_i32(count as u64, "edge")?;
                }
            }
        }

        let blocks = self.read_len("blocks", MAX_BLOCKS)?;
        for _ in 0..blocks {
            self.reader.skip_i32(1, "block id")?;
            let nodes = self.read_len("block nodes", MAX_ARRAY_LEN)?;
            self.reader.skip_i32(nodes as u64, "block nodes")?;
            let successors = self.read_len("block successors", MAX_ARRAY_LEN)?;
            self.reader.skip_i32(successors as u64, "block successors")?;
        }
        Ok(())
    }

    pub(crate) fn skip_subgraph(&mut self) -> Result<(), DecodeError> {
        self.skip_props()?;
        self.skip_graph_body()
    }
}
