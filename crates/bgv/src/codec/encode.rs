//! BGV encoder.
//!
//! Produces byte streams the decoder accepts: test fixtures, synthetic
//! benchmark input and demo files. The writer keeps its own pool, so the
//! first occurrence of a string, class or node class is written in full
//! under a fresh id and every later occurrence is a two-byte reference.
//!
//! # Example
//!
//! ```rust
//! use bgv::codec::{BgvWriter, NodeClassSpec, NodeRecord, PortSpec};
//!
//! let start = NodeClassSpec::new("org.graalvm.compiler.nodes.StartNode", "Start")
//!     .successor(PortSpec::direct("next"));
//! let ret = NodeClassSpec::new("org.graalvm.compiler.nodes.ReturnNode", "Return");
//!
//! let mut writer = BgvWriter::new();
//! writer.write_header();
//! writer.write_document(&[]).unwrap();
//! writer
//!     .write_graph(
//!         0,
//!         "After phase %s",
//!         &["org.graalvm.compiler.phases.Canonicalizer".into()],
//!         &[],
//!         &[
//!             NodeRecord::new(0, start).successors(vec![vec![1]]),
//!             NodeRecord::new(1, ret),
//!         ],
//!         &[],
//!     )
//!     .unwrap();
//! let bytes = writer.into_bytes();
//! assert!(bytes.starts_with(b"BIGV"));
//! ```

use rustc_hash::FxHashMap;

use crate::codec::token::*;
use crate::error::EncodeError;
use crate::limits::{DEFAULT_VERSION, MAGIC, MAX_ARRAY_LEN, MAX_STRING_LEN};
use crate::model::{Block, PoolObject, Value};

/// A property value as written to the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum PropValue {
    Null,
    Bool(bool),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    /// Written as a pooled string.
    Str(String),
    IntArray(Vec<i32>),
    DoubleArray(Vec<f64>),
    StrArray(Vec<String>),
}

impl From<bool> for PropValue {
    fn from(v: bool) -> Self {
        PropValue::Bool(v)
    }
}

impl From<i32> for PropValue {
    fn from(v: i32) -> Self {
        PropValue::Int(v)
    }
}

impl From<i64> for PropValue {
    fn from(v: i64) -> Self {
        PropValue::Long(v)
    }
}

impl From<f64> for PropValue {
    fn from(v: f64) -> Self {
        PropValue::Double(v)
    }
}

impl From<&str> for PropValue {
    fn from(v: &str) -> Self {
        PropValue::Str(v.to_string())
    }
}

impl From<String> for PropValue {
    fn from(v: String) -> Self {
        PropValue::Str(v)
    }
}

impl TryFrom<&Value> for PropValue {
    type Error = EncodeError;

    /// Converts a decoded value back to a writable one.
    ///
    /// Integers are written as longs. Lists must be homogeneous.
    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        Ok(match value {
            Value::Null => PropValue::Null,
            Value::Bool(v) => PropValue::Bool(*v),
            Value::Int(v) => PropValue::Long(*v),
            Value::Float(v) => PropValue::Double(*v),
            Value::Str(s) => PropValue::Str(s.clone()),
            Value::Ref(PoolObject::String(s)) => PropValue::Str(s.to_string()),
            Value::List(items) => list_value(items)?,
            other => {
                return Err(EncodeError::UnsupportedValue {
                    kind: other.kind_name(),
                });
            }
        })
    }
}

fn list_value(items: &[Value]) -> Result<PropValue, EncodeError> {
    if let Some(ints) = items
        .iter()
        .map(|v| v.as_int().and_then(|i| i32::try_from(i).ok()))
        .collect::<Option<Vec<_>>>()
    {
        return Ok(PropValue::IntArray(ints));
    }
    if let Some(doubles) = items
        .iter()
        .map(|v| match v {
            Value::Float(f) => Some(*f),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()
    {
        return Ok(PropValue::DoubleArray(doubles));
    }
    if let Some(strings) = items
        .iter()
        .map(|v| v.as_str().map(str::to_string))
        .collect::<Option<Vec<_>>>()
    {
        return Ok(PropValue::StrArray(strings));
    }
    Err(EncodeError::UnsupportedValue { kind: "mixed list" })
}

/// A port of a node class.
#[derive(Debug, Clone, PartialEq)]
pub struct PortSpec {
    pub name: String,
    pub list: bool,
    pub input_type: Option<String>,
}

impl PortSpec {
    /// A port holding exactly one node id.
    pub fn direct(name: &str) -> Self {
        Self {
            name: name.to_string(),
            list: false,
            input_type: None,
        }
    }

    /// A port holding a counted list of node ids.
    pub fn list(name: &str) -> Self {
        Self {
            name: name.to_string(),
            list: true,
            input_type: None,
        }
    }

    /// Sets the input type (`Value`, `State`, `Guard`, ...).
    pub fn typed(mut self, input_type: &str) -> Self {
        self.input_type = Some(input_type.to_string());
        self
    }
}

/// The shape of a node class.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeClassSpec {
    pub class_name: String,
    pub name_template: String,
    pub inputs: Vec<PortSpec>,
    pub successors: Vec<PortSpec>,
}

impl NodeClassSpec {
    pub fn new(class_name: &str, name_template: &str) -> Self {
        Self {
            class_name: class_name.to_string(),
            name_template: name_template.to_string(),
            inputs: Vec::new(),
            successors: Vec::new(),
        }
    }

    pub fn input(mut self, port: PortSpec) -> Self {
        self.inputs.push(port);
        self
    }

    pub fn successor(mut self, port: PortSpec) -> Self {
        self.successors.push(port);
        self
    }
}

/// One node of a graph body.
///
/// `inputs` and `successors` hold one id list per port of the class.
/// Missing lists are written empty (`-1` for direct ports).
#[derive(Debug, Clone, PartialEq)]
pub struct NodeRecord {
    pub id: i32,
    pub class: NodeClassSpec,
    pub has_predecessor: bool,
    pub props: Vec<(String, PropValue)>,
    pub inputs: Vec<Vec<i32>>,
    pub successors: Vec<Vec<i32>>,
}

impl NodeRecord {
    pub fn new(id: i32, class: NodeClassSpec) -> Self {
        Self {
            id,
            class,
            has_predecessor: false,
            props: Vec::new(),
            inputs: Vec::new(),
            successors: Vec::new(),
        }
    }

    pub fn inputs(mut self, inputs: Vec<Vec<i32>>) -> Self {
        self.inputs = inputs;
        self
    }

    pub fn successors(mut self, successors: Vec<Vec<i32>>) -> Self {
        self.successors = successors;
        self
    }

    pub fn predecessor(mut self, has_predecessor: bool) -> Self {
        self.has_predecessor = has_predecessor;
        self
    }

    pub fn prop(mut self, key: &str, value: impl Into<PropValue>) -> Self {
        self.props.push((key.to_string(), value.into()));
        self
    }
}

/// Pool identity of a written object.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum PoolKey {
    String(String),
    Class(String),
    EnumClass(String),
    Enum(String, i32),
    NodeClass(String),
    Signature(String),
    Method(String, String),
}

/// Writer for BGV streams.
#[derive(Debug, Clone)]
pub struct BgvWriter {
    buf: Vec<u8>,
    version: (i8, i8),
    pool: FxHashMap<PoolKey, u16>,
    next_id: u16,
}

impl Default for BgvWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl BgvWriter {
    /// Creates a writer for the default version. Pool ids start at 1.
    pub fn new() -> Self {
        Self {
            buf: Vec::new(),
            version: DEFAULT_VERSION,
            pool: FxHashMap::default(),
            next_id: 1,
        }
    }

    /// Sets the version written by [`write_header`](Self::write_header).
    pub fn with_version(mut self, major: i8, minor: i8) -> Self {
        self.version = (major, minor);
        self
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    // =========================================================================
    // Primitives
    // =========================================================================

    #[inline]
    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    #[inline]
    pub fn write_u16(&mut self, value: u16) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    #[inline]
    pub fn write_i32(&mut self, value: i32) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    #[inline]
    pub fn write_i64(&mut self, value: i64) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    #[inline]
    pub fn write_f32(&mut self, value: f32) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    #[inline]
    pub fn write_f64(&mut self, value: f64) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    /// Writes an i32 length and UTF-8 bytes, outside the pool.
    pub fn write_string(&mut self, s: &str) -> Result<(), EncodeError> {
        let len = check_len("string", s.len(), MAX_STRING_LEN)?;
        self.write_i32(len);
        self.buf.extend_from_slice(s.as_bytes());
        Ok(())
    }

    // =========================================================================
    // Pool
    // =========================================================================

    /// Writes a reference if `key` was already pooled; otherwise allocates
    /// an id, writes the `POOL_NEW` prefix and returns `true` so the caller
    /// writes the payload.
    fn pool_prefix(&mut self, key: PoolKey, tag: u8) -> Result<bool, EncodeError> {
        if let Some(&id) = self.pool.get(&key) {
            self.write_u8(tag);
            self.write_u16(id);
            return Ok(false);
        }
        let id = self.next_id;
        self.next_id = self.next_id.checked_add(1).ok_or(EncodeError::PoolExhausted)?;
        self.pool.insert(key, id);
        self.write_u8(POOL_NEW);
        self.write_u16(id);
        self.write_u8(tag);
        Ok(true)
    }

    pub fn write_pool_null(&mut self) {
        self.write_u8(POOL_NULL);
    }

    pub fn write_pool_string(&mut self, s: &str) -> Result<(), EncodeError> {
        if self.pool_prefix(PoolKey::String(s.to_string()), POOL_STRING)? {
            self.write_string(s)?;
        }
        Ok(())
    }

    pub fn write_class(&mut self, name: &str) -> Result<(), EncodeError> {
        if self.pool_prefix(PoolKey::Class(name.to_string()), POOL_CLASS)? {
            self.write_string(name)?;
            self.write_u8(KLASS);
        }
        Ok(())
    }

    fn write_enum_class(&mut self, name: &str, values: &[&str]) -> Result<(), EncodeError> {
        if self.pool_prefix(PoolKey::EnumClass(name.to_string()), POOL_CLASS)? {
            self.write_string(name)?;
            self.write_u8(ENUM_KLASS);
            self.write_i32(check_len("enum values", values.len(), MAX_ARRAY_LEN)?);
            for value in values {
                self.write_pool_string(value)?;
            }
        }
        Ok(())
    }

    /// Writes an enum constant by ordinal. The ordinal is not checked.
    pub fn write_enum(&mut self, class: &str, values: &[&str], ordinal: i32) -> Result<(), EncodeError> {
        if self.pool_prefix(PoolKey::Enum(class.to_string(), ordinal), POOL_ENUM)? {
            self.write_enum_class(class, values)?;
            self.write_i32(ordinal);
        }
        Ok(())
    }

    fn write_signature(&mut self, params: &[&str], ret: &str) -> Result<(), EncodeError> {
        let key = PoolKey::Signature(format!("({}){}", params.join(","), ret));
        if self.pool_prefix(key, POOL_SIGNATURE)? {
            let count = check_len("signature parameters", params.len(), u16::MAX as usize)?;
            self.write_u16(count as u16);
            for param in params {
                self.write_pool_string(param)?;
            }
            self.write_pool_string(ret)?;
        }
        Ok(())
    }

    /// Writes a method with a `()V` signature and the given bytecode.
    pub fn write_method(&mut self, class: &str, name: &str, bytecode: Option<&[u8]>) -> Result<(), EncodeError> {
        if self.pool_prefix(PoolKey::Method(class.to_string(), name.to_string()), POOL_METHOD)? {
            self.write_class(class)?;
            self.write_pool_string(name)?;
            self.write_signature(&[], "void")?;
            self.write_i32(0);
            match bytecode {
                Some(bytes) => {
                    self.write_i32(check_len("method bytecode", bytes.len(), i32::MAX as usize)?);
                    self.buf.extend_from_slice(bytes);
                }
                None => self.write_i32(-1),
            }
        }
        Ok(())
    }

    pub fn write_node_class(&mut self, class: &NodeClassSpec) -> Result<(), EncodeError> {
        if !self.pool_prefix(PoolKey::NodeClass(class.class_name.clone()), POOL_NODE_CLASS)? {
            return Ok(());
        }
        self.write_class(&class.class_name)?;
        self.write_string(&class.name_template)?;
        self.write_ports(&class.inputs, true)?;
        self.write_ports(&class.successors, false)
    }

    fn write_ports(&mut self, ports: &[PortSpec], with_type: bool) -> Result<(), EncodeError> {
        let count = check_len("ports", ports.len(), u16::MAX as usize)?;
        self.write_u16(count as u16);
        for port in ports {
            self.write_u8(u8::from(port.list));
            self.write_pool_string(&port.name)?;
            if with_type {
                match &port.input_type {
                    Some(input_type) => self.write_pool_string(input_type)?,
                    None => self.write_pool_null(),
                }
            }
        }
        Ok(())
    }

    // =========================================================================
    // Properties
    // =========================================================================

    pub fn write_prop_value(&mut self, value: &PropValue) -> Result<(), EncodeError> {
        match value {
            PropValue::Null => {
                self.write_u8(PROPERTY_POOL);
                self.write_pool_null();
            }
            PropValue::Bool(true) => self.write_u8(PROPERTY_TRUE),
            PropValue::Bool(false) => self.write_u8(PROPERTY_FALSE),
            PropValue::Int(v) => {
                self.write_u8(PROPERTY_INT);
                self.write_i32(*v);
            }
            PropValue::Long(v) => {
                self.write_u8(PROPERTY_LONG);
                self.write_i64(*v);
            }
            PropValue::Float(v) => {
                self.write_u8(PROPERTY_FLOAT);
                self.write_f32(*v);
            }
            PropValue::Double(v) => {
                self.write_u8(PROPERTY_DOUBLE);
                self.write_f64(*v);
            }
            PropValue::Str(s) => {
                self.write_u8(PROPERTY_POOL);
                self.write_pool_string(s)?;
            }
            PropValue::IntArray(values) => {
                self.write_array_prefix(PROPERTY_INT, values.len())?;
                for v in values {
                    self.write_i32(*v);
                }
            }
            PropValue::DoubleArray(values) => {
                self.write_array_prefix(PROPERTY_DOUBLE, values.len())?;
                for v in values {
                    self.write_f64(*v);
                }
            }
            PropValue::StrArray(values) => {
                self.write_array_prefix(PROPERTY_POOL, values.len())?;
                for v in values {
                    self.write_pool_string(v)?;
                }
            }
        }
        Ok(())
    }

    fn write_array_prefix(&mut self, element: u8, len: usize) -> Result<(), EncodeError> {
        let len = check_len("array", len, MAX_ARRAY_LEN)?;
        self.write_u8(PROPERTY_ARRAY);
        self.write_u8(element);
        self.write_i32(len);
        Ok(())
    }

    pub fn write_props<K: AsRef<str>>(&mut self, props: &[(K, PropValue)]) -> Result<(), EncodeError> {
        let count = check_len("properties", props.len(), u16::MAX as usize)?;
        self.write_u16(count as u16);
        for (key, value) in props {
            self.write_pool_string(key.as_ref())?;
            self.write_prop_value(value)?;
        }
        Ok(())
    }

    // =========================================================================
    // Stream structure
    // =========================================================================

    /// Writes the magic and version.
    pub fn write_header(&mut self) {
        self.buf.extend_from_slice(MAGIC);
        let (major, minor) = self.version;
        self.buf.extend_from_slice(&major.to_be_bytes());
        self.buf.extend_from_slice(&minor.to_be_bytes());
    }

    /// Writes the document property block.
    pub fn write_document(&mut self, props: &[(&str, PropValue)]) -> Result<(), EncodeError> {
        self.write_u8(BEGIN_DOCUMENT);
        self.write_props(props)
    }

    /// Opens a group. Groups nest until closed.
    pub fn begin_group(
        &mut self,
        name: &str,
        short_name: &str,
        method: Option<(&str, &str)>,
        bci: i32,
    ) -> Result<(), EncodeError> {
        self.write_u8(BEGIN_GROUP);
        self.write_pool_string(name)?;
        self.write_pool_string(short_name)?;
        match method {
            Some((class, method)) => self.write_method(class, method, None)?,
            None => self.write_pool_null(),
        }
        self.write_i32(bci);
        self.write_props::<&str>(&[])
    }

    pub fn close_group(&mut self) {
        self.write_u8(CLOSE_GROUP);
    }

    /// Writes a complete graph unit: token, id, header and body.
    pub fn write_graph(
        &mut self,
        id: i32,
        format: &str,
        args: &[PropValue],
        props: &[(&str, PropValue)],
        nodes: &[NodeRecord],
        blocks: &[Block],
    ) -> Result<(), EncodeError> {
        self.write_u8(BEGIN_GRAPH);
        self.write_i32(id);
        self.write_string(format)?;
        self.write_i32(check_len("arguments", args.len(), MAX_ARRAY_LEN)?);
        for arg in args {
            self.write_prop_value(arg)?;
        }
        self.write_props(props)?;
        self.write_graph_body_with_blocks(nodes, blocks)
    }

    /// Writes a graph body with no blocks.
    pub fn write_graph_body(&mut self, nodes: &[NodeRecord]) -> Result<(), EncodeError> {
        self.write_graph_body_with_blocks(nodes, &[])
    }

    pub fn write_graph_body_with_blocks(&mut self, nodes: &[NodeRecord], blocks: &[Block]) -> Result<(), EncodeError> {
        self.write_i32(check_len("nodes", nodes.len(), MAX_ARRAY_LEN)?);
        for node in nodes {
            self.write_i32(node.id);
            self.write_node_class(&node.class)?;
            self.write_u8(u8::from(node.has_predecessor));
            self.write_props(&node.props)?;
            self.write_port_values(&node.class.inputs, &node.inputs)?;
            self.write_port_values(&node.class.successors, &node.successors)?;
        }
        self.write_blocks(blocks)
    }

    fn write_port_values(&mut self, ports: &[PortSpec], values: &[Vec<i32>]) -> Result<(), EncodeError> {
        for (i, port) in ports.iter().enumerate() {
            let ids = values.get(i).map(Vec::as_slice).unwrap_or_default();
            if port.list {
                let count = check_len("edge list", ids.len(), u16::MAX as usize)?;
                self.write_u16(count as u16);
                for &id in ids {
                    self.write_i32(id);
                }
            } else {
                self.write_i32(ids.first().copied().unwrap_or(-1));
            }
        }
        Ok(())
    }

    pub fn write_blocks(&mut self, blocks: &[Block]) -> Result<(), EncodeError> {
        self.write_i32(check_len("blocks", blocks.len(), MAX_ARRAY_LEN)?);
        for block in blocks {
            self.write_i32(block.id);
            self.write_i32(check_len("block nodes", block.nodes.len(), MAX_ARRAY_LEN)?);
            for &node in &block.nodes {
                self.write_i32(node);
            }
            self.write_i32(check_len("block successors", block.successors.len(), MAX_ARRAY_LEN)?);
            for &successor in &block.successors {
                self.write_i32(successor);
            }
        }
        Ok(())
    }
}

fn check_len(field: &'static str, len: usize, max: usize) -> Result<i32, EncodeError> {
    if len > max {
        return Err(EncodeError::LengthExceedsLimit { field, len, max });
    }
    i32::try_from(len).map_err(|_| EncodeError::LengthExceedsLimit {
        field,
        len,
        max: i32::MAX as usize,
    })
}
