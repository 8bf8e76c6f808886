//! Integration tests exercising the public facade end to end, including the
//! literal seed scenarios used to pin down exact wire bytes.

use std::sync::Barrier;
use std::thread;

use thrift_codec::iter::binary::BufferIterator as BinaryIterator;
use thrift_codec::iter::compact::BufferIterator as CompactIterator;
use thrift_codec::iter::TokenIterator;
use thrift_codec::stream::binary::BufferStream as BinaryStream;
use thrift_codec::stream::compact::BufferStream as CompactStream;
use thrift_codec::stream::TokenStream;
use thrift_codec::{Config, DispatchStrategy, Error, FieldId, Protocol, StructValue, TType, Value};

// (a) Binary, single i64 field = 1024.
#[test]
fn seed_a_binary_i64_field() {
	let mut stream = BinaryStream::new();
	stream.write_struct_header().unwrap();
	stream.write_struct_field(TType::I64, FieldId(1)).unwrap();
	stream.write_i64(1024).unwrap();
	stream.write_struct_field_stop().unwrap();

	let expected = [0x0A, 0x00, 0x01, 0, 0, 0, 0, 0, 0, 0x04, 0x00, 0x00];
	assert_eq!(stream.buffer(), &expected[..]);

	let mut iter = BinaryIterator::new(stream.buffer());
	let decoded = thrift_codec::generic::decode_struct(&mut iter).unwrap();
	let mut expected_struct = StructValue::new();
	expected_struct.push(FieldId(1), TType::I64, Value::I64(1024));
	assert_eq!(decoded, expected_struct);
}

// (b) Binary, single bool field = true.
#[test]
fn seed_b_binary_bool_field() {
	let mut stream = BinaryStream::new();
	stream.write_struct_header().unwrap();
	stream.write_struct_field(TType::Bool, FieldId(1)).unwrap();
	stream.write_bool(true).unwrap();
	stream.write_struct_field_stop().unwrap();
	assert_eq!(stream.buffer(), &[0x02, 0x00, 0x01, 0x01, 0x00]);
}

// (c) Framed binary, i64=1024; truncating the trailing Stop byte is PrematureEOF.
#[test]
fn seed_c_framed_binary_i64() {
	let cfg = Config::new().protocol(Protocol::Binary).framed(true).freeze().unwrap();
	let mut fields = StructValue::new();
	fields.push(FieldId(1), TType::I64, Value::I64(1024));

	let mut body_stream = BinaryStream::new();
	thrift_codec::generic::encode_struct(&mut body_stream, &fields).unwrap();
	let mut framed = Vec::new();
	thrift_codec::framing::write_frame(&mut framed, body_stream.buffer()).unwrap();
	let expected = [0x00, 0x00, 0x00, 0x0C, 0x0A, 0x00, 0x01, 0, 0, 0, 0, 0, 0, 0x04, 0x00, 0x00];
	assert_eq!(framed, &expected[..]);

	let (frame, _rest) = thrift_codec::framing::split_frame(&framed, cfg.config().max_frame_len).unwrap();
	let mut iter = BinaryIterator::new(frame);
	let decoded = thrift_codec::generic::decode_struct(&mut iter).unwrap();
	assert_eq!(decoded, fields);

	let truncated = &framed[..framed.len() - 1];
	let mut iter = BinaryIterator::new(&truncated[4..]);
	let err = thrift_codec::generic::decode_struct(&mut iter).unwrap_err();
	assert!(matches!(err, Error::PrematureEOF));
}

// (d) Compact, field id delta + zigzag.
#[test]
fn seed_d_compact_delta_and_zigzag() {
	let mut fields = StructValue::new();
	fields.push(FieldId(1), TType::I32, Value::I32(-1));
	fields.push(FieldId(3), TType::I32, Value::I32(1));

	let mut stream = CompactStream::new();
	thrift_codec::generic::encode_struct(&mut stream, &fields).unwrap();
	assert_eq!(stream.buffer(), &[0x15, 0x01, 0x25, 0x02, 0x00]);

	let mut iter = CompactIterator::new(stream.buffer());
	let decoded = thrift_codec::generic::decode_struct(&mut iter).unwrap();
	assert_eq!(decoded, fields);
}

// (e) Skip nested: struct{1: list<i32>[3,-1,7], 2: string "hi"}.
#[test]
fn seed_e_skip_nested_captures_verbatim() {
	let mut fields = StructValue::new();
	fields.push(
		FieldId(1),
		TType::List,
		Value::List { elem_type: TType::I32, items: vec![Value::I32(3), Value::I32(-1), Value::I32(7)] },
	);
	fields.push(FieldId(2), TType::String, Value::Bytes(b"hi".to_vec()));

	let mut stream = BinaryStream::new();
	thrift_codec::generic::encode_struct(&mut stream, &fields).unwrap();
	let original = stream.buffer().to_vec();

	let mut iter = BinaryIterator::new(&original);
	let mut captured = Vec::new();
	iter.skip(TType::Struct, Some(&mut captured)).unwrap();
	assert_eq!(captured, original);

	let mut reparsed = BinaryIterator::new(&captured);
	let decoded = thrift_codec::generic::decode_struct(&mut reparsed).unwrap();
	assert_eq!(decoded, fields);
}

// (f) Concurrent cache warm-up: 32 callers unmarshal the same new type at once.
#[test]
fn seed_f_concurrent_cache_warm_up() {
	let cfg = Config::new().dispatch(DispatchStrategy::Reflective).freeze().unwrap();
	let sample = cfg.marshal(&4096i64).unwrap();

	let threads = 32;
	let barrier = std::sync::Arc::new(Barrier::new(threads));
	let handles: Vec<_> = (0..threads)
		.map(|_| {
			let cfg = cfg.clone();
			let sample = sample.clone();
			let barrier = barrier.clone();
			thread::spawn(move || {
				barrier.wait();
				cfg.unmarshal::<i64>(&sample)
			})
		})
		.collect();

	for handle in handles {
		assert_eq!(handle.join().unwrap().unwrap(), 4096);
	}
	assert!(cfg.cache().contains::<i64>());
}

#[test]
fn unframed_compact_config_is_rejected_at_freeze_time() {
	let err = Config::new().protocol(Protocol::Compact).framed(false).freeze().unwrap_err();
	assert!(matches!(err, Error::ConfigConflict(_)));
}

#[test]
fn message_round_trips_through_the_facade() {
	let cfg = Config::new().freeze().unwrap();
	let mut fields = StructValue::new();
	fields.push(FieldId(1), TType::I32, Value::I32(7));
	let message = thrift_codec::Message {
		header: thrift_codec::MessageHeader { name: "op".into(), kind: thrift_codec::MsgType::Call, seq_id: 1 },
		body: fields,
	};
	let bytes = cfg.marshal_message(&message).unwrap();
	let decoded = cfg.unmarshal_message(&bytes).unwrap();
	assert_eq!(decoded, message);
}

// Property 6: a typed `StructValue` round trip through `unmarshal`/`marshal`
// agrees with reading the same bytes generically via `decode_struct`.
#[test]
fn generic_and_typed_struct_decode_agree() {
	let cfg = Config::new().freeze().unwrap();
	let mut fields = StructValue::new();
	fields.push(FieldId(1), TType::I32, Value::I32(7));
	fields.push(FieldId(2), TType::String, Value::Bytes(b"payload".to_vec()));

	let bytes = cfg.marshal(&fields).unwrap();
	let typed: StructValue = cfg.unmarshal(&bytes).unwrap();

	let mut iter = BinaryIterator::new(&bytes);
	let generic = thrift_codec::generic::decode_struct(&mut iter).unwrap();

	assert_eq!(typed, fields);
	assert_eq!(generic, fields);
}
