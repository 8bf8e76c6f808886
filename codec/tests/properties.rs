//! Property-based tests for the round-trip laws in the generic value model.
//! Deliberately skips mechanical encode-then-decode grids in favor of a
//! handful of laws that would catch a broken implementation either way.

use proptest::prelude::*;

use thrift_codec::iter::binary::BufferIterator as BinaryIterator;
use thrift_codec::iter::compact::BufferIterator as CompactIterator;
use thrift_codec::iter::TokenIterator;
use thrift_codec::stream::binary::BufferStream as BinaryStream;
use thrift_codec::stream::compact::BufferStream as CompactStream;
use thrift_codec::{generic, FieldId, StructValue, TType, Value};

fn arb_scalar() -> impl Strategy<Value = Value> {
	prop_oneof![
		any::<bool>().prop_map(Value::Bool),
		any::<i8>().prop_map(Value::I8),
		any::<i16>().prop_map(Value::I16),
		any::<i32>().prop_map(Value::I32),
		any::<i64>().prop_map(Value::I64),
		any::<f64>().prop_filter("NaN does not compare equal to itself", |v| !v.is_nan()).prop_map(Value::Double),
		proptest::collection::vec(any::<u8>(), 0..16).prop_map(Value::Bytes),
	]
}

/// A vector of values all drawn from the same scalar strategy, paired with
/// the `TType` they all share — a list/set's `elem_type` must match every
/// item's actual type, so containers can't be built out of `arb_scalar()`
/// directly (that draws each item independently, any one of which might
/// mismatch the header's declared element type).
fn arb_homogeneous_items() -> impl Strategy<Value = (TType, Vec<Value>)> {
	prop_oneof![
		proptest::collection::vec(any::<bool>(), 0..4)
			.prop_map(|v| (TType::Bool, v.into_iter().map(Value::Bool).collect())),
		proptest::collection::vec(any::<i8>(), 0..4)
			.prop_map(|v| (TType::I8, v.into_iter().map(Value::I8).collect())),
		proptest::collection::vec(any::<i16>(), 0..4)
			.prop_map(|v| (TType::I16, v.into_iter().map(Value::I16).collect())),
		proptest::collection::vec(any::<i32>(), 0..4)
			.prop_map(|v| (TType::I32, v.into_iter().map(Value::I32).collect())),
		proptest::collection::vec(any::<i64>(), 0..4)
			.prop_map(|v| (TType::I64, v.into_iter().map(Value::I64).collect())),
		proptest::collection::vec(proptest::collection::vec(any::<u8>(), 0..8), 0..4)
			.prop_map(|v| (TType::String, v.into_iter().map(Value::Bytes).collect())),
	]
}

fn arb_value(depth: u32) -> impl Strategy<Value = Value> {
	let leaf = arb_scalar();
	if depth == 0 {
		leaf.boxed()
	} else {
		prop_oneof![
			leaf,
			arb_homogeneous_items().prop_map(|(elem_type, items)| Value::List { elem_type, items }),
			arb_homogeneous_items().prop_map(|(elem_type, items)| Value::Set { elem_type, items }),
		]
		.boxed()
	}
}

fn arb_struct() -> impl Strategy<Value = StructValue> {
	proptest::collection::vec((any::<i16>(), arb_scalar()), 0..6).prop_map(|pairs| {
		let mut fields = StructValue::new();
		for (id, value) in pairs {
			fields.push(FieldId(id), value.ttype(), value);
		}
		fields
	})
}

proptest! {
	// Law 2: value round-trip, binary protocol.
	#[test]
	fn value_round_trips_binary(value in arb_value(2)) {
		let mut stream = BinaryStream::new();
		generic::encode_value(&mut stream, &value).unwrap();
		let mut iter = BinaryIterator::new(stream.buffer());
		let decoded = generic::decode_value(&mut iter, value.ttype()).unwrap();
		prop_assert_eq!(decoded, value);
	}

	// Law 2, compact protocol.
	#[test]
	fn value_round_trips_compact(value in arb_value(2)) {
		let mut stream = CompactStream::new();
		generic::encode_value(&mut stream, &value).unwrap();
		let mut iter = CompactIterator::new(stream.buffer());
		let decoded = generic::decode_value(&mut iter, value.ttype()).unwrap();
		prop_assert_eq!(decoded, value);
	}

	// Law 1/2 composed over a struct: binary.
	#[test]
	fn struct_round_trips_binary(fields in arb_struct()) {
		let mut stream = BinaryStream::new();
		generic::encode_struct(&mut stream, &fields).unwrap();
		let mut iter = BinaryIterator::new(stream.buffer());
		let decoded = generic::decode_struct(&mut iter).unwrap();
		prop_assert_eq!(decoded, fields);
	}

	// Compact field-id delta/absolute choice must still round-trip for any id sequence.
	#[test]
	fn struct_round_trips_compact(fields in arb_struct()) {
		let mut stream = CompactStream::new();
		generic::encode_struct(&mut stream, &fields).unwrap();
		let mut iter = CompactIterator::new(stream.buffer());
		let decoded = generic::decode_struct(&mut iter).unwrap();
		prop_assert_eq!(decoded, fields);
	}

	// Law 3: skip equals parse — skip's captured bytes re-decode to the same struct.
	#[test]
	fn skip_capture_reparses_to_same_struct(fields in arb_struct()) {
		let mut stream = BinaryStream::new();
		generic::encode_struct(&mut stream, &fields).unwrap();
		let bytes = stream.buffer().to_vec();

		let mut iter = BinaryIterator::new(&bytes);
		let mut captured = Vec::new();
		iter.skip(TType::Struct, Some(&mut captured)).unwrap();
		prop_assert_eq!(&captured, &bytes);

		let mut reparsed = BinaryIterator::new(&captured);
		let decoded = generic::decode_struct(&mut reparsed).unwrap();
		prop_assert_eq!(decoded, fields);
	}
}
