//! Values that live in the decoder's object pool.
//!
//! Anything the producer may emit more than once (strings, classes,
//! methods, node classes) is pooled. Pooled objects are immutable once
//! decoded and shared by reference count, so every node that points at a
//! node class shares one copy.

use std::fmt;
use std::sync::Arc;

/// A decoded pool entry.
#[derive(Debug, Clone, PartialEq)]
pub enum PoolObject {
    String(Arc<str>),
    Enum(Arc<EnumValue>),
    Class(Arc<ClassInfo>),
    Method(Arc<MethodInfo>),
    NodeClass(Arc<NodeClass>),
    Field(Arc<FieldInfo>),
    Signature(Arc<Signature>),
    NodeSourcePosition(Arc<SourcePosition>),
    Node(Arc<NodeRef>),
}

impl PoolObject {
    /// Short name of the variant, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            PoolObject::String(_) => "string",
            PoolObject::Enum(_) => "enum",
            PoolObject::Class(_) => "class",
            PoolObject::Method(_) => "method",
            PoolObject::NodeClass(_) => "node class",
            PoolObject::Field(_) => "field",
            PoolObject::Signature(_) => "signature",
            PoolObject::NodeSourcePosition(_) => "node source position",
            PoolObject::Node(_) => "node",
        }
    }

    /// Returns the text if this is a pooled string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PoolObject::String(s) => Some(s),
            _ => None,
        }
    }

    /// Rendering with package prefixes stripped from class names.
    pub fn simple_name(&self) -> String {
        match self {
            PoolObject::Class(class) => class.simple_name().to_string(),
            PoolObject::NodeClass(node_class) => simple_class_name(&node_class.class_name).to_string(),
            PoolObject::Method(method) => method.simple_name(),
            PoolObject::Field(field) => format!("{}.{}", simple_class_name(&field.class_name), field.name),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for PoolObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolObject::String(s) => f.write_str(s),
            PoolObject::Enum(value) => f.write_str(&value.name),
            PoolObject::Class(class) => f.write_str(&class.name),
            PoolObject::Method(method) => write!(f, "{}.{}", method.class_name, method.name),
            PoolObject::NodeClass(node_class) => f.write_str(&node_class.class_name),
            PoolObject::Field(field) => write!(f, "{}.{}", field.class_name, field.name),
            PoolObject::Signature(signature) => signature.fmt(f),
            PoolObject::NodeSourcePosition(position) => {
                write!(f, "{}@{}", position.method, position.bci)
            }
            PoolObject::Node(node) => write!(f, "{}", node.id),
        }
    }
}

/// Strips the package prefix from a dotted class name.
pub fn simple_class_name(name: &str) -> &str {
    name.rsplit_once('.').map_or(name, |(_, simple)| simple)
}

/// A class, optionally an enum class with its constant names.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassInfo {
    pub name: String,
    pub enum_values: Option<Vec<String>>,
}

impl ClassInfo {
    pub fn simple_name(&self) -> &str {
        simple_class_name(&self.name)
    }
}

/// One constant of an enum class.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumValue {
    pub class_name: String,
    pub ordinal: i32,
    pub name: String,
}

/// A method reference.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodInfo {
    pub class_name: String,
    pub name: String,
    pub signature: Option<Arc<Signature>>,
    pub modifiers: i32,
}

impl MethodInfo {
    /// `Class.method` with the package stripped.
    pub fn simple_name(&self) -> String {
        format!("{}.{}", simple_class_name(&self.class_name), self.name)
    }
}

/// A field reference.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldInfo {
    pub class_name: String,
    pub name: String,
    pub type_name: String,
    pub modifiers: i32,
}

/// A method signature.
#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    pub params: Vec<String>,
    pub ret: String,
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}){}", self.params.join(", "), self.ret)
    }
}

/// A source location within a node source position chain.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceLocation {
    pub uri: String,
    pub location: String,
    pub line: i32,
    pub start: i32,
    pub end: i32,
}

/// Where in the compiled program a node came from.
#[derive(Debug, Clone, PartialEq)]
pub struct SourcePosition {
    pub method: String,
    pub bci: i32,
    pub locations: Vec<SourceLocation>,
    pub caller: Option<Arc<SourcePosition>>,
}

/// A reference to a node of another graph.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeRef {
    pub id: i32,
    pub class_name: Option<String>,
}

/// The shape of a node: its class, label template and edge ports.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeClass {
    /// Fully qualified class name of the node.
    pub class_name: String,
    /// Label template with `{p#prop}` and `{i#input}` placeholders.
    pub name_template: String,
    pub inputs: Vec<Port>,
    pub outputs: Vec<Port>,
}

impl NodeClass {
    pub fn simple_name(&self) -> &str {
        simple_class_name(&self.class_name)
    }
}

/// An input or successor port of a node class.
#[derive(Debug, Clone, PartialEq)]
pub struct Port {
    /// Direct ports carry exactly one node id; list ports carry a count.
    pub direct: bool,
    pub name: String,
    /// Input type such as `Value` or `State`; `None` for successor ports.
    pub input_type: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_simple_names() {
        let class = PoolObject::Class(Arc::new(ClassInfo {
            name: "java.lang.String".to_string(),
            enum_values: None,
        }));
        assert_eq!(class.to_string(), "java.lang.String");
        assert_eq!(class.simple_name(), "String");

        let method = PoolObject::Method(Arc::new(MethodInfo {
            class_name: "com.example.Fib".to_string(),
            name: "fib".to_string(),
            signature: None,
            modifiers: 9,
        }));
        assert_eq!(method.to_string(), "com.example.Fib.fib");
        assert_eq!(method.simple_name(), "Fib.fib");

        let signature = Signature {
            params: vec!["int".to_string(), "long".to_string()],
            ret: "void".to_string(),
        };
        assert_eq!(signature.to_string(), "(int, long)void");
    }

    #[test]
    fn test_simple_class_name_without_package() {
        assert_eq!(simple_class_name("Node"), "Node");
        assert_eq!(simple_class_name("a.b.Node"), "Node");
    }
}
