//! The generic, mid-level value model: an in-memory tree that can represent
//! any message/struct/list/set/map/scalar without a compile-time type for it.
//! Decoding materializes a [`Value`] by walking iterator tokens; encoding
//! walks a `Value` and emits stream tokens. See [`crate::generic`] for the
//! walk itself.

use crate::ttype::{FieldId, MsgType, TType};

/// A single decoded Thrift value, tagged by its wire category.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
	Bool(bool),
	I8(i8),
	I16(i16),
	I32(i32),
	I64(i64),
	Double(f64),
	/// Byte sequence; UTF-8 is not enforced. Covers both the `String` and
	/// `Binary` caller-level interpretations of the shared wire tag.
	Bytes(Vec<u8>),
	List { elem_type: TType, items: Vec<Value> },
	/// On-the-wire ordering is preserved; set-ness (uniqueness) is not enforced.
	Set { elem_type: TType, items: Vec<Value> },
	/// Key uniqueness is the caller's responsibility.
	Map { key_type: TType, value_type: TType, entries: Vec<(Value, Value)> },
	Struct(StructValue),
}

impl Value {
	/// The [`TType`] this value would be written with.
	pub fn ttype(&self) -> TType {
		match self {
			Self::Bool(_) => TType::Bool,
			Self::I8(_) => TType::I8,
			Self::I16(_) => TType::I16,
			Self::I32(_) => TType::I32,
			Self::I64(_) => TType::I64,
			Self::Double(_) => TType::Double,
			Self::Bytes(_) => TType::String,
			Self::List { .. } => TType::List,
			Self::Set { .. } => TType::Set,
			Self::Map { .. } => TType::Map,
			Self::Struct(_) => TType::Struct,
		}
	}
}

/// Mapping from [`FieldId`] to `(TType, Value)`, preserving the field order
/// observed on the wire. A union is represented identically to a struct;
/// validating "exactly one field set" is the caller's responsibility.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StructValue {
	fields: Vec<(FieldId, TType, Value)>,
}

impl StructValue {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn push(&mut self, id: FieldId, ty: TType, value: Value) {
		self.fields.push((id, ty, value));
	}

	pub fn fields(&self) -> &[(FieldId, TType, Value)] {
		&self.fields
	}

	pub fn get(&self, id: FieldId) -> Option<&Value> {
		self.fields.iter().find(|(fid, ..)| *fid == id).map(|(_, _, v)| v)
	}

	pub fn len(&self) -> usize {
		self.fields.len()
	}

	pub fn is_empty(&self) -> bool {
		self.fields.is_empty()
	}
}

impl FromIterator<(FieldId, TType, Value)> for StructValue {
	fn from_iter<T: IntoIterator<Item = (FieldId, TType, Value)>>(iter: T) -> Self {
		Self { fields: iter.into_iter().collect() }
	}
}

/// `(message name, message type, sequence id)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageHeader {
	pub name: String,
	pub kind: MsgType,
	pub seq_id: i32,
}

/// A full message: header plus its struct payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
	pub header: MessageHeader,
	pub body: StructValue,
}

/// A field captured verbatim by [`crate::generic::skip`] rather than
/// materialized: its declared type plus the exact bytes it occupied on the
/// wire. Re-encoding writes the field header followed by these bytes as-is.
/// This is the fast path for proxies that only touch a few known fields and
/// must forward the rest byte-for-byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
	pub ttype: TType,
	pub bytes: Vec<u8>,
}
