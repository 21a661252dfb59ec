//! Data model for decoded BGV graphs.

mod diff;
mod graph;
mod object;
mod value;

pub use graph::{Block, Edge, EdgeDisplay, EdgeId, EdgeKind, Emphasis, Graph, Node, NodeDisplay, NodeId, NodeKind};
pub use object::{
    simple_class_name, ClassInfo, EnumValue, FieldInfo, MethodInfo, NodeClass, NodeRef, PoolObject, Port,
    Signature, SourceLocation, SourcePosition,
};
pub use value::{Props, Value};
