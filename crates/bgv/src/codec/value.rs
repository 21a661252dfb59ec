//! Pool objects, strings and property values.
//!
//! Every `read_*` here has a `skip_*` twin that leaves the cursor at the
//! same offset. Skipping still registers `POOL_NEW` entries, because later
//! records may refer back to them by id.

use std::sync::Arc;

use crate::codec::Pool;
use crate::codec::token::*;
use crate::error::DecodeError;
use crate::limits::{MAX_ARRAY_LEN, MAX_BYTES_LEN, MAX_ENUM_VALUES, MAX_NESTING_DEPTH, MAX_STRING_LEN};
use crate::model::{
    ClassInfo, EnumValue, FieldInfo, MethodInfo, NodeClass, NodeRef, PoolObject, Port, Props, Signature,
    SourceLocation, SourcePosition, Value,
};
use crate::reader::BinaryReader;

/// Decodes values against a borrowed cursor and pool.
pub(crate) struct ValueReader<'a, R> {
    pub(crate) reader: &'a mut R,
    pub(crate) pool: &'a mut Pool,
    depth: usize,
}

impl<'a, R: BinaryReader> ValueReader<'a, R> {
    pub(crate) fn new(reader: &'a mut R, pool: &'a mut Pool) -> Self {
        Self {
            reader,
            pool,
            depth: 0,
        }
    }

    // =========================================================================
    // Lengths and nesting
    // =========================================================================

    /// Reads an i32 length, rejecting negative and oversized values.
    pub(crate) fn read_len(&mut self, field: &'static str, max: usize) -> Result<usize, DecodeError> {
        let offset = self.reader.position();
        let len = self.reader.read_i32(field)?;
        check_len(offset, field, len.into(), max)
    }

    /// Reads a u16 count.
    pub(crate) fn read_count16(&mut self, field: &'static str) -> Result<usize, DecodeError> {
        Ok(self.reader.read_u16(field)? as usize)
    }

    pub(crate) fn enter(&mut self) -> Result<(), DecodeError> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(DecodeError::NestingTooDeep {
                offset: self.reader.position(),
                max: MAX_NESTING_DEPTH,
            });
        }
        self.depth += 1;
        Ok(())
    }

    pub(crate) fn leave(&mut self) {
        self.depth -= 1;
    }

    // =========================================================================
    // Strings
    // =========================================================================

    pub(crate) fn read_string(&mut self, context: &'static str) -> Result<String, DecodeError> {
        let len = self.read_len(context, MAX_STRING_LEN)?;
        self.reader.read_utf8(len, context)
    }

    pub(crate) fn skip_string(&mut self, context: &'static str) -> Result<(), DecodeError> {
        let len = self.read_len(context, MAX_STRING_LEN)?;
        self.reader.skip_utf8(len, context)
    }

    // =========================================================================
    // Pool objects
    // =========================================================================

    /// Reads a pool object. `POOL_NULL` decodes to `None`.
    pub(crate) fn read_pool_object(&mut self) -> Result<Option<PoolObject>, DecodeError> {
        let offset = self.reader.position();
        let token = self.reader.read_u8("pool object")?;
        match token {
            POOL_NULL => Ok(None),
            POOL_NEW => {
                self.enter()?;
                let result = self.read_pool_entry();
                self.leave();
                result.map(Some)
            }
            POOL_STRING | POOL_ENUM | POOL_CLASS | POOL_METHOD | POOL_NODE_CLASS | POOL_FIELD
            | POOL_SIGNATURE | POOL_NODE_SOURCE_POSITION | POOL_NODE => {
                let id = self.reader.read_u16("pool id")?;
                self.pool
                    .get(id)
                    .cloned()
                    .map(Some)
                    .ok_or(DecodeError::UnknownPoolId { offset, token, id })
            }
            _ => Err(DecodeError::UnknownToken {
                offset,
                context: "pool object",
                token,
            }),
        }
    }

    /// Skips a pool object, still registering any new entry it defines.
    pub(crate) fn skip_pool_object(&mut self) -> Result<(), DecodeError> {
        let offset = self.reader.position();
        let token = self.reader.peek_u8("pool object")?;
        match token {
            POOL_STRING | POOL_ENUM | POOL_CLASS | POOL_METHOD | POOL_NODE_CLASS | POOL_FIELD
            | POOL_SIGNATURE | POOL_NODE_SOURCE_POSITION | POOL_NODE => {
                self.reader.skip(1, "pool object")?;
                let id = self.reader.read_u16("pool id")?;
                if !self.pool.contains(id) {
                    return Err(DecodeError::UnknownPoolId { offset, token, id });
                }
                Ok(())
            }
            _ => self.read_pool_object().map(drop),
        }
    }

    /// Reads a pool object that must not be null.
    pub(crate) fn read_required(&mut self, expected: &'static str) -> Result<PoolObject, DecodeError> {
        let offset = self.reader.position();
        self.read_pool_object()?.ok_or(DecodeError::UnexpectedPoolObject {
            offset,
            expected,
            found: "null",
        })
    }

    /// Reads a non-null pool object and renders it as text.
    fn read_name(&mut self, expected: &'static str) -> Result<String, DecodeError> {
        Ok(self.read_required(expected)?.to_string())
    }

    /// Reads a node class reference.
    pub(crate) fn read_node_class(&mut self) -> Result<Arc<NodeClass>, DecodeError> {
        let offset = self.reader.position();
        match self.read_required("node class")? {
            PoolObject::NodeClass(node_class) => Ok(node_class),
            other => Err(DecodeError::UnexpectedPoolObject {
                offset,
                expected: "node class",
                found: other.kind_name(),
            }),
        }
    }

    fn read_pool_entry(&mut self) -> Result<PoolObject, DecodeError> {
        let id = self.reader.read_u16("pool id")?;
        let offset = self.reader.position();
        let kind = self.reader.read_u8("pool entry type")?;
        let object = match kind {
            POOL_STRING => PoolObject::String(self.read_string("pool string")?.into()),
            POOL_ENUM => PoolObject::Enum(Arc::new(self.read_enum_value()?)),
            POOL_CLASS => PoolObject::Class(Arc::new(self.read_class()?)),
            POOL_METHOD => PoolObject::Method(Arc::new(self.read_method()?)),
            POOL_NODE_CLASS => PoolObject::NodeClass(Arc::new(self.read_node_class_entry()?)),
            POOL_FIELD => PoolObject::Field(Arc::new(FieldInfo {
                class_name: self.read_name("field class")?,
                name: self.read_name("field name")?,
                type_name: self.read_name("field type")?,
                modifiers: self.reader.read_i32("field modifiers")?,
            })),
            POOL_SIGNATURE => PoolObject::Signature(Arc::new(self.read_signature()?)),
            POOL_NODE_SOURCE_POSITION => PoolObject::NodeSourcePosition(Arc::new(self.read_source_position()?)),
            POOL_NODE => PoolObject::Node(Arc::new(NodeRef {
                id: self.reader.read_i32("node reference id")?,
                class_name: self.read_pool_object()?.map(|class| class.to_string()),
            })),
            token => {
                return Err(DecodeError::UnknownToken {
                    offset,
                    context: "pool entry type",
                    token,
                });
            }
        };
        self.pool.insert(id, object.clone());
        Ok(object)
    }

    fn read_enum_value(&mut self) -> Result<EnumValue, DecodeError> {
        let offset = self.reader.position();
        let class = match self.read_required("enum class")? {
            PoolObject::Class(class) => class,
            other => {
                return Err(DecodeError::UnexpectedPoolObject {
                    offset,
                    expected: "enum class",
                    found: other.kind_name(),
                });
            }
        };
        let ordinal_offset = self.reader.position();
        let ordinal = self.reader.read_i32("enum ordinal")?;
        let values = class.enum_values.as_deref().unwrap_or_default();
        let name = usize::try_from(ordinal)
            .ok()
            .and_then(|i| values.get(i))
            .ok_or_else(|| DecodeError::InvalidEnumOrdinal {
                offset: ordinal_offset,
                class: class.name.clone(),
                ordinal,
                count: values.len(),
            })?;
        Ok(EnumValue {
            class_name: class.name.clone(),
            ordinal,
            name: name.clone(),
        })
    }

    fn read_class(&mut self) -> Result<ClassInfo, DecodeError> {
        let name = self.read_string("class name")?;
        let offset = self.reader.position();
        let enum_values = match self.reader.read_u8("class kind")? {
            KLASS => None,
            ENUM_KLASS => {
                let count = self.read_len("enum values", MAX_ENUM_VALUES)?;
                let mut values = Vec::with_capacity(count);
                for _ in 0..count {
                    values.push(self.read_name("enum value")?);
                }
                Some(values)
            }
            token => {
                return Err(DecodeError::UnknownToken {
                    offset,
                    context: "class kind",
                    token,
                });
            }
        };
        Ok(ClassInfo { name, enum_values })
    }

    fn read_method(&mut self) -> Result<MethodInfo, DecodeError> {
        let class_name = self.read_name("method class")?;
        let name = self.read_name("method name")?;
        let offset = self.reader.position();
        let signature = match self.read_pool_object()? {
            None => None,
            Some(PoolObject::Signature(signature)) => Some(signature),
            Some(other) => {
                return Err(DecodeError::UnexpectedPoolObject {
                    offset,
                    expected: "signature",
                    found: other.kind_name(),
                });
            }
        };
        let modifiers = self.reader.read_i32("method modifiers")?;
        let offset = self.reader.position();
        let bytes_len = self.reader.read_i32("method bytecode")?;
        if bytes_len != -1 {
            let len = check_len(offset, "method bytecode", bytes_len.into(), MAX_BYTES_LEN)?;
            self.reader.skip(len as u64, "method bytecode")?;
        }
        Ok(MethodInfo {
            class_name,
            name,
            signature,
            modifiers,
        })
    }

    fn read_node_class_entry(&mut self) -> Result<NodeClass, DecodeError> {
        let class_name = self.read_name("node class type")?;
        let name_template = self.read_string("node class template")?;
        let inputs = self.read_ports(true)?;
        let outputs = self.read_ports(false)?;
        Ok(NodeClass {
            class_name,
            name_template,
            inputs,
            outputs,
        })
    }

    fn read_ports(&mut self, with_type: bool) -> Result<Vec<Port>, DecodeError> {
        let count = self.read_count16("ports")?;
        let mut ports = Vec::with_capacity(count);
        for _ in 0..count {
            let is_list = self.reader.read_u8("port kind")? != 0;
            let name = self.read_name("port name")?;
            let input_type = if with_type {
                self.read_pool_object()?.map(|t| t.to_string())
            } else {
                None
            };
            ports.push(Port {
                direct: !is_list,
                name,
                input_type,
            });
        }
        Ok(ports)
    }

    fn read_signature(&mut self) -> Result<Signature, DecodeError> {
        let count = self.read_count16("signature parameters")?;
        let mut params = Vec::with_capacity(count);
        for _ in 0..count {
            params.push(self.read_name("signature parameter")?);
        }
        let ret = self.read_name("signature return type")?;
        Ok(Signature { params, ret })
    }

    fn read_source_position(&mut self) -> Result<SourcePosition, DecodeError> {
        let method = self.read_name("source position method")?;
        let bci = self.reader.read_i32("source position bci")?;
        let mut locations = Vec::new();
        while let Some(uri) = self.read_pool_object()? {
            locations.push(SourceLocation {
                uri: uri.to_string(),
                location: self.read_string("source location")?,
                line: self.reader.read_i32("source line")?,
                start: self.reader.read_i32("source start")?,
                end: self.reader.read_i32("source end")?,
            });
        }
        let offset = self.reader.position();
        let caller = match self.read_pool_object()? {
            None => None,
            Some(PoolObject::NodeSourcePosition(caller)) => Some(caller),
            Some(other) => {
                return Err(DecodeError::UnexpectedPoolObject {
                    offset,
                    expected: "node source position",
                    found: other.kind_name(),
                });
            }
        };
        Ok(SourcePosition {
            method,
            bci,
            locations,
            caller,
        })
    }

    // =========================================================================
    // Properties
    // =========================================================================

    pub(crate) fn read_prop_value(&mut self) -> Result<Value, DecodeError> {
        let offset = self.reader.position();
        let token = self.reader.read_u8("property")?;
        let value = match token {
            PROPERTY_POOL => pool_value(self.read_pool_object()?),
            PROPERTY_INT => Value::Int(self.reader.read_i32("int property")?.into()),
            PROPERTY_LONG => Value::Int(self.reader.read_i64("long property")?),
            PROPERTY_DOUBLE => Value::Float(self.reader.read_f64("double property")?),
            PROPERTY_FLOAT => Value::Float(self.reader.read_f32("float property")?.into()),
            PROPERTY_TRUE => Value::Bool(true),
            PROPERTY_FALSE => Value::Bool(false),
            PROPERTY_ARRAY => Value::List(self.read_array()?),
            PROPERTY_SUBGRAPH => {
                self.enter()?;
                let result = self.read_subgraph();
                self.leave();
                Value::Graph(Box::new(result?))
            }
            _ => {
                return Err(DecodeError::UnknownToken {
                    offset,
                    context: "property",
                    token,
                });
            }
        };
        Ok(value)
    }

    pub(crate) fn skip_prop_value(&mut self) -> Result<(), DecodeError> {
        let offset = self.reader.position();
        let token = self.reader.read_u8("property")?;
        match token {
            PROPERTY_POOL => self.skip_pool_object(),
            PROPERTY_INT => self.reader.skip_i32(1, "int property"),
            PROPERTY_LONG => self.reader.skip_i64(1, "long property"),
            PROPERTY_DOUBLE => self.reader.skip_f64(1, "double property"),
            PROPERTY_FLOAT => self.reader.skip_f32(1, "float property"),
            PROPERTY_TRUE | PROPERTY_FALSE => Ok(()),
            PROPERTY_ARRAY => self.skip_array(),
            PROPERTY_SUBGRAPH => {
                self.enter()?;
                let result = self.skip_subgraph();
                self.leave();
                result
            }
            _ => Err(DecodeError::UnknownToken {
                offset,
                context: "property",
                token,
            }),
        }
    }

    fn read_array(&mut self) -> Result<Vec<Value>, DecodeError> {
        let offset = self.reader.position();
        let element = self.reader.read_u8("array element type")?;
        let count = self.read_len("array", MAX_ARRAY_LEN)?;
        let mut values = Vec::with_capacity(count);
        match element {
            PROPERTY_POOL => {
                for _ in 0..count {
                    values.push(pool_value(self.read_pool_object()?));
                }
            }
            PROPERTY_INT => {
                for _ in 0..count {
                    values.push(Value::Int(self.reader.read_i32("int array")?.into()));
                }
            }
            PROPERTY_DOUBLE => {
                for _ in 0..count {
                    values.push(Value::Float(self.reader.read_f64("double array")?));
                }
            }
            token => {
                return Err(DecodeError::UnknownToken {
                    offset,
                    context: "array element type",
                    token,
                });
            }
        }
        Ok(values)
    }

    fn skip_array(&mut self) -> Result<(), DecodeError> {
        let offset = self.reader.position();
        let element = self.reader.read_u8("array element type")?;
        let count = self.read_len("array", MAX_ARRAY_LEN)?;
        match element {
            PROPERTY_POOL => {
                for _ in 0..count {
                    self.skip_pool_object()?;
                }
                Ok(())
            }
            PROPERTY_INT => self.reader.skip_i32(count as u64, "int array"),
            PROPERTY_DOUBLE => self.reader.skip_f64(count as u64, "double array"),
            token => Err(DecodeError::UnknownToken {
                offset,
                context: "array element type",
                token,
            }),
        }
    }

    /// Reads a property map: a u16 count of key/value pairs.
    pub(crate) fn read_props(&mut self) -> Result<Props, DecodeError> {
        let count = self.read_count16("properties")?;
        let mut props = Props::new();
        for _ in 0..count {
            let key = self.read_name("property key")?;
            let value = self.read_prop_value()?;
            props.insert(key, value);
        }
        Ok(props)
    }

    pub(crate) fn skip_props(&mut self) -> Result<(), DecodeError> {
        let count = self.read_count16("properties")?;
        for _ in 0..count {
            self.skip_pool_object()?;
            self.skip_prop_value()?;
        }
        Ok(())
    }

    /// Reads graph title arguments: an i32 count of property values.
    pub(crate) fn read_args(&mut self) -> Result<Vec<Value>, DecodeError> {
        let count = self.read_len("arguments", MAX_ARRAY_LEN)?;
        let mut args = Vec::with_capacity(count);
        for _ in 0..count {
            args.push(self.read_prop_value()?);
        }
        Ok(args)
    }

    pub(crate) fn skip_args(&mut self) -> Result<(), DecodeError> {
        let count = self.read_len("arguments", MAX_ARRAY_LEN)?;
        for _ in 0..count {
            self.skip_prop_value()?;
        }
        Ok(())
    }
}

/// Validates a length read from the wire.
pub(crate) fn check_len(offset: u64, field: &'static str, len: i64, max: usize) -> Result<usize, DecodeError> {
    let len = usize::try_from(len).map_err(|_| DecodeError::NegativeLength { offset, field, len })?;
    if len > max {
        return Err(DecodeError::LengthExceedsLimit {
            offset,
            field,
            len,
            max,
        });
    }
    Ok(len)
}

/// Pooled strings become plain strings; other objects stay references.
fn pool_value(object: Option<PoolObject>) -> Value {
    match object {
        None => Value::Null,
        Some(PoolObject::String(s)) => Value::Str(s.to_string()),
        Some(other) => Value::Ref(other),
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::codec::{BgvWriter, PropValue};
    use crate::reader::SliceReader;

    fn decode<T>(
        bytes: &[u8],
        f: impl FnOnce(&mut ValueReader<'_, SliceReader<'_>>) -> Result<T, DecodeError>,
    ) -> (Result<T, DecodeError>, u64, Pool) {
        let mut reader = SliceReader::new(bytes);
        let mut pool = Pool::new();
        let result = f(&mut ValueReader::new(&mut reader, &mut pool));
        (result, reader.position(), pool)
    }

    #[test]
    fn test_pool_backreference_consumes_no_payload() {
        let mut writer = BgvWriter::new();
        writer.write_pool_string("foo").unwrap();
        let first_len = writer.len();
        writer.write_pool_string("foo").unwrap();
        let bytes = writer.into_bytes();
        // NEW token, u16 id, STRING type, i32 length, "foo"
        assert_eq!(first_len, 1 + 2 + 1 + 4 + 3);
        // STRING reference token and u16 id only
        assert_eq!(bytes.len() - first_len, 3);

        let mut reader = SliceReader::new(&bytes);
        let mut pool = Pool::new();
        let mut values = ValueReader::new(&mut reader, &mut pool);
        let first = values.read_pool_object().unwrap().unwrap();
        assert_eq!(values.reader.position(), first_len as u64);
        let second = values.read_pool_object().unwrap().unwrap();
        assert_eq!(first.as_str(), Some("foo"));
        assert_eq!(second.as_str(), Some("foo"));
        assert!(reader.is_eof());
        assert_eq!(bytes[first_len + 1..], [0, 1]);
    }

    #[test]
    fn test_unknown_pool_id() {
        let bytes = [POOL_STRING, 0x00, 0x07];
        let (result, _, _) = decode(&bytes, |v| v.read_pool_object());
        assert!(matches!(
            result,
            Err(DecodeError::UnknownPoolId { offset: 0, token: POOL_STRING, id: 7 })
        ));

        let (result, _, _) = decode(&bytes, |v| v.skip_pool_object());
        assert!(matches!(result, Err(DecodeError::UnknownPoolId { id: 7, .. })));
    }

    #[test]
    fn test_unknown_property_token() {
        let bytes = [0x00, 0x01, POOL_NEW, 0x00, 0x01, POOL_STRING, 0, 0, 0, 1, b'k', 0x4f];
        let (result, _, _) = decode(&bytes, |v| v.read_props());
        assert!(matches!(
            result,
            Err(DecodeError::UnknownToken { offset: 11, context: "property", token: 0x4f })
        ));
    }

    #[test]
    fn test_skip_registers_new_entries() {
        let mut writer = BgvWriter::new();
        writer.write_pool_string("foo").unwrap();
        writer.write_pool_string("foo").unwrap();
        let bytes = writer.into_bytes();

        let mut reader = SliceReader::new(&bytes);
        let mut pool = Pool::new();
        let mut values = ValueReader::new(&mut reader, &mut pool);
        values.skip_pool_object().unwrap();
        values.skip_pool_object().unwrap();
        assert!(reader.is_eof());
        assert_eq!(pool.get(1).and_then(PoolObject::as_str), Some("foo"));
    }

    #[test]
    fn test_enum_ordinal_out_of_range() {
        let mut writer = BgvWriter::new();
        writer.write_enum("Color", &["RED", "GREEN"], 5).unwrap();
        let bytes = writer.into_bytes();
        let (result, _, _) = decode(&bytes, |v| v.read_pool_object());
        assert!(matches!(
            result,
            Err(DecodeError::InvalidEnumOrdinal { ordinal: 5, count: 2, .. })
        ));
    }

    #[test]
    fn test_enum_resolves_name() {
        let mut writer = BgvWriter::new();
        writer.write_enum("Color", &["RED", "GREEN"], 1).unwrap();
        let bytes = writer.into_bytes();
        let (result, _, _) = decode(&bytes, |v| v.read_pool_object());
        match result.unwrap() {
            Some(PoolObject::Enum(value)) => {
                assert_eq!(value.name, "GREEN");
                assert_eq!(value.class_name, "Color");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_negative_string_length() {
        let bytes = [0xff, 0xff, 0xff, 0xfe];
        let (result, _, _) = decode(&bytes, |v| v.read_string("name"));
        assert!(matches!(
            result,
            Err(DecodeError::NegativeLength { offset: 0, field: "name", len: -2 })
        ));
    }

    #[test]
    fn test_nesting_limit() {
        // A chain of subgraph properties deeper than the limit.
        let mut bytes = Vec::new();
        for _ in 0..=MAX_NESTING_DEPTH {
            bytes.push(PROPERTY_SUBGRAPH);
            bytes.extend_from_slice(&[0x00, 0x01]);
            bytes.extend_from_slice(&[POOL_NEW, 0x00, 0x01, POOL_STRING, 0, 0, 0, 1, b'g']);
        }
        let (result, _, _) = decode(&bytes, |v| v.read_prop_value());
        assert!(matches!(result, Err(DecodeError::NestingTooDeep { .. })));
    }

    fn prop_value_strategy() -> impl Strategy<Value = PropValue> {
        let leaf = prop_oneof![
            any::<i32>().prop_map(PropValue::Int),
            any::<i64>().prop_map(PropValue::Long),
            prop_oneof![any::<f64>(), Just(f64::NAN)].prop_map(PropValue::Double),
            prop_oneof![any::<f32>(), Just(f32::NAN)].prop_map(PropValue::Float),
            any::<bool>().prop_map(PropValue::Bool),
            "[a-c]{0,3}".prop_map(PropValue::Str),
            Just(PropValue::Null),
            prop::collection::vec(any::<i32>(), 0..4).prop_map(PropValue::IntArray),
            prop::collection::vec(prop_oneof![any::<f64>(), Just(f64::NAN)], 0..4).prop_map(PropValue::DoubleArray),
            prop::collection::vec("[a-c]{0,2}", 0..4).prop_map(PropValue::StrArray),
        ];
        leaf
    }

    proptest! {
        #[test]
        fn test_read_and_skip_end_at_same_offset(
            entries in prop::collection::vec(("[a-e]{1,3}", prop_value_strategy()), 0..12),
        ) {
            let mut writer = BgvWriter::new();
            writer.write_props(&entries).unwrap();
            let bytes = writer.into_bytes();

            let (read, read_end, read_pool) = decode(&bytes, |v| v.read_props());
            let (skipped, skip_end, skip_pool) = decode(&bytes, |v| v.skip_props());
            prop_assert!(read.is_ok());
            prop_assert!(skipped.is_ok());
            prop_assert_eq!(read_end, bytes.len() as u64);
            prop_assert_eq!(read_end, skip_end);
            prop_assert_eq!(read_pool.len(), skip_pool.len());

            let (again, _, _) = decode(&bytes, |v| v.read_props());
            prop_assert_eq!(read.ok(), again.ok());
        }
    }
}
