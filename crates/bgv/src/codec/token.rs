//! Wire tokens.

// Stream records between graphs.
pub const BEGIN_GROUP: u8 = 0x00;
pub const BEGIN_GRAPH: u8 = 0x01;
pub const CLOSE_GROUP: u8 = 0x02;
pub const BEGIN_DOCUMENT: u8 = 0x03;

// Pool object tags.
pub const POOL_NEW: u8 = 0x00;
pub const POOL_STRING: u8 = 0x01;
pub const POOL_ENUM: u8 = 0x02;
pub const POOL_CLASS: u8 = 0x03;
pub const POOL_METHOD: u8 = 0x04;
pub const POOL_NULL: u8 = 0x05;
pub const POOL_NODE_CLASS: u8 = 0x06;
pub const POOL_FIELD: u8 = 0x07;
pub const POOL_SIGNATURE: u8 = 0x08;
pub const POOL_NODE_SOURCE_POSITION: u8 = 0x09;
pub const POOL_NODE: u8 = 0x0a;

// Property value tags.
pub const PROPERTY_POOL: u8 = 0x00;
pub const PROPERTY_INT: u8 = 0x01;
pub const PROPERTY_LONG: u8 = 0x02;
pub const PROPERTY_DOUBLE: u8 = 0x03;
pub const PROPERTY_FLOAT: u8 = 0x04;
pub const PROPERTY_TRUE: u8 = 0x05;
pub const PROPERTY_FALSE: u8 = 0x06;
pub const PROPERTY_ARRAY: u8 = 0x07;
pub const PROPERTY_SUBGRAPH: u8 = 0x08;

// Class kinds.
pub const KLASS: u8 = 0x00;
pub const ENUM_KLASS: u8 = 0x01;

/// Port type recorded on successor edges.
pub const SUCCESSOR_PORT_TYPE: &str = "Successor";
