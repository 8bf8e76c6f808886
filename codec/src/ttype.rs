use thrift_codec_derive::FromRepr;

/// On-the-wire value-category tag. `Stop` only ever appears as a field-list
/// terminator; `String` and `Binary` share a single wire tag and are
/// distinguished only by caller interpretation.
#[repr(u8)]
#[derive(FromRepr, Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum TType {
	Stop = 0,
	Bool = 2,
	I8 = 3,
	I16 = 6,
	I32 = 8,
	I64 = 10,
	Double = 4,
	/// Also used for binary blobs; the wire tag does not distinguish
	/// `String` from `Binary` (see `read_string`/`read_binary` in
	/// [`crate::iter`], which share this tag and differ only in how the
	/// caller interprets the returned bytes).
	String = 11,
	Struct = 12,
	Map = 13,
	Set = 14,
	List = 15,
}

/// 16-bit struct-field identifier. Uniqueness within an encoded struct is a
/// caller convention; nothing in this crate enforces it.
#[repr(transparent)]
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct FieldId(pub i16);

impl From<i16> for FieldId {
	#[inline]
	fn from(value: i16) -> Self {
		Self(value)
	}
}

impl From<FieldId> for i16 {
	#[inline]
	fn from(value: FieldId) -> Self {
		value.0
	}
}

/// Message kind, carried in every message header.
#[repr(u8)]
#[derive(FromRepr, Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum MsgType {
	Call = 1,
	Reply = 2,
	Exception = 3,
	OneWay = 4,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn ttype_from_repr_round_trips() {
		for t in [
			TType::Stop, TType::Bool, TType::I8, TType::I16, TType::I32, TType::I64,
			TType::Double, TType::String, TType::Struct, TType::Map, TType::Set, TType::List,
		] {
			assert_eq!(TType::from_repr(t as u8), Some(t));
		}
	}

	#[test]
	fn msg_type_from_repr() {
		assert_eq!(MsgType::from_repr(1), Some(MsgType::Call));
		assert_eq!(MsgType::from_repr(0), None);
		assert_eq!(MsgType::from_repr(5), None);
	}
}
