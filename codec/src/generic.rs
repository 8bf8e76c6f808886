//! Walks [`crate::iter::TokenIterator`]/[`crate::stream::TokenStream`] tokens
//! into and out of the mid-level [`Value`] tree. This is the layer a caller
//! reaches for when it doesn't have (or doesn't want) a concrete Rust type to
//! decode into.

use crate::error::Error;
use crate::iter::TokenIterator;
use crate::stream::TokenStream;
use crate::ttype::{FieldId, TType};
use crate::value::{Message, MessageHeader, RawMessage, StructValue, Value};

pub fn decode_message(iter: &mut dyn TokenIterator) -> Result<Message, Error> {
	let header = iter.read_message_header()?;
	let body = decode_struct(iter)?;
	Ok(Message { header, body })
}

pub fn encode_message(stream: &mut dyn TokenStream, message: &Message) -> Result<(), Error> {
	stream.write_message_header(&message.header)?;
	encode_struct(stream, &message.body)
}

pub fn decode_struct(iter: &mut dyn TokenIterator) -> Result<StructValue, Error> {
	iter.read_struct_header()?;
	let mut fields = StructValue::new();
	loop {
		let (ty, id) = iter.read_struct_field()?;
		if ty == TType::Stop {
			return Ok(fields);
		}
		let value = decode_value(iter, ty)?;
		fields.push(id, ty, value);
	}
}

pub fn encode_struct(stream: &mut dyn TokenStream, fields: &StructValue) -> Result<(), Error> {
	stream.write_struct_header()?;
	for (id, ty, value) in fields.fields() {
		stream.write_struct_field(*ty, *id)?;
		encode_value(stream, value)?;
	}
	stream.write_struct_field_stop()
}

pub fn decode_value(iter: &mut dyn TokenIterator, ty: TType) -> Result<Value, Error> {
	match ty {
		TType::Stop => Err(Error::UnexpectedTag { expected: TType::Struct, found: TType::Stop }),
		TType::Bool => Ok(Value::Bool(iter.read_bool()?)),
		TType::I8 => Ok(Value::I8(iter.read_i8()?)),
		TType::I16 => Ok(Value::I16(iter.read_i16()?)),
		TType::I32 => Ok(Value::I32(iter.read_i32()?)),
		TType::I64 => Ok(Value::I64(iter.read_i64()?)),
		TType::Double => Ok(Value::Double(iter.read_double()?)),
		TType::String => Ok(Value::Bytes(iter.read_binary()?)),
		TType::Struct => Ok(Value::Struct(decode_struct(iter)?)),
		TType::List => {
			let (elem_type, count) = iter.read_list_header()?;
			let mut items = Vec::with_capacity(count.min(4096));
			for _ in 0..count {
				items.push(decode_value(iter, elem_type)?);
			}
			Ok(Value::List { elem_type, items })
		},
		TType::Set => {
			let (elem_type, count) = iter.read_set_header()?;
			let mut items = Vec::with_capacity(count.min(4096));
			for _ in 0..count {
				items.push(decode_value(iter, elem_type)?);
			}
			Ok(Value::Set { elem_type, items })
		},
		TType::Map => {
			let (key_type, value_type, count) = iter.read_map_header()?;
			let mut entries = Vec::with_capacity(count.min(4096));
			for _ in 0..count {
				let key = decode_value(iter, key_type)?;
				let val = decode_value(iter, value_type)?;
				entries.push((key, val));
			}
			Ok(Value::Map { key_type, value_type, entries })
		},
	}
}

pub fn encode_value(stream: &mut dyn TokenStream, value: &Value) -> Result<(), Error> {
	match value {
		Value::Bool(v) => stream.write_bool(*v),
		Value::I8(v) => stream.write_i8(*v),
		Value::I16(v) => stream.write_i16(*v),
		Value::I32(v) => stream.write_i32(*v),
		Value::I64(v) => stream.write_i64(*v),
		Value::Double(v) => stream.write_double(*v),
		Value::Bytes(bytes) => stream.write_binary(bytes),
		Value::Struct(fields) => encode_struct(stream, fields),
		Value::List { elem_type, items } => {
			stream.write_list_header(*elem_type, items.len())?;
			for item in items {
				encode_value(stream, item)?;
			}
			Ok(())
		},
		Value::Set { elem_type, items } => {
			stream.write_set_header(*elem_type, items.len())?;
			for item in items {
				encode_value(stream, item)?;
			}
			Ok(())
		},
		Value::Map { key_type, value_type, entries } => {
			stream.write_map_header(*key_type, *value_type, entries.len())?;
			for (key, val) in entries {
				encode_value(stream, key)?;
				encode_value(stream, val)?;
			}
			Ok(())
		},
	}
}

/// Decodes a struct's fields into `(FieldId, RawMessage)` pairs, capturing
/// each field's exact payload bytes rather than materializing a [`Value`].
/// The fast path for proxies that inspect a handful of fields and must
/// forward everything else byte-for-byte.
pub fn decode_struct_raw(iter: &mut dyn TokenIterator) -> Result<Vec<(FieldId, RawMessage)>, Error> {
	iter.read_struct_header()?;
	let mut fields = Vec::new();
	loop {
		let (ty, id) = iter.read_struct_field()?;
		if ty == TType::Stop {
			return Ok(fields);
		}
		let mut bytes = Vec::new();
		iter.skip(ty, Some(&mut bytes))?;
		fields.push((id, RawMessage { ttype: ty, bytes }));
	}
}

/// Re-encodes fields captured by [`decode_struct_raw`], writing each field's
/// payload verbatim instead of re-serializing it.
pub fn encode_struct_raw(stream: &mut dyn TokenStream, fields: &[(FieldId, RawMessage)]) -> Result<(), Error> {
	stream.write_struct_header()?;
	for (id, raw) in fields {
		stream.write_struct_field(raw.ttype, *id)?;
		stream.write_raw(&raw.bytes)?;
	}
	stream.write_struct_field_stop()
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::iter::binary::BufferIterator;
	use crate::stream::binary::BufferStream;
	use crate::ttype::MsgType;

	fn sample() -> StructValue {
		let mut fields = StructValue::new();
		fields.push(FieldId(1), TType::I32, Value::I32(42));
		fields.push(
			FieldId(2),
			TType::List,
			Value::List { elem_type: TType::String, items: vec![Value::Bytes(b"a".to_vec()), Value::Bytes(b"bb".to_vec())] },
		);
		fields
	}

	#[test]
	fn struct_round_trips_through_binary_tokens() {
		let fields = sample();
		let mut stream = BufferStream::new();
		encode_struct(&mut stream, &fields).unwrap();
		let mut iter = BufferIterator::new(stream.buffer());
		let decoded = decode_struct(&mut iter).unwrap();
		assert_eq!(decoded, fields);
	}

	#[test]
	fn message_round_trips() {
		let header = MessageHeader { name: "fetch".into(), kind: MsgType::Call, seq_id: 3 };
		let message = Message { header, body: sample() };
		let mut stream = BufferStream::new();
		encode_message(&mut stream, &message).unwrap();
		let mut iter = BufferIterator::new(stream.buffer());
		let decoded = decode_message(&mut iter).unwrap();
		assert_eq!(decoded, message);
	}

	#[test]
	fn raw_struct_round_trips_verbatim() {
		let fields = sample();
		let mut stream = BufferStream::new();
		encode_struct(&mut stream, &fields).unwrap();
		let original_bytes = stream.buffer().to_vec();

		let mut iter = BufferIterator::new(&original_bytes);
		let raw = decode_struct_raw(&mut iter).unwrap();
		let mut out = BufferStream::new();
		encode_struct_raw(&mut out, &raw).unwrap();
		assert_eq!(out.buffer(), original_bytes.as_slice());
	}
}
