//! The low-level, token-level pull API. An iterator's only job is to turn
//! bytes into a strict sequence of tokens (headers, field headers, scalars,
//! container headers, stop markers) — it never materializes a [`crate::value::Value`]
//! itself; [`crate::generic`] does that on top.

pub mod binary;
pub mod compact;

use crate::error::Error;
use crate::ttype::{FieldId, TType};
use crate::value::MessageHeader;

/// Object-safe token source. One logical consumer per instance; not `Sync`
/// across threads (see the crate-level concurrency notes).
pub trait TokenIterator {
	fn read_message_header(&mut self) -> Result<MessageHeader, Error>;

	/// No-op for binary; resets the per-struct field-id delta state for compact.
	fn read_struct_header(&mut self) -> Result<(), Error>;

	/// Returns `(TType::Stop, FieldId(0))` when the struct's field list ends.
	fn read_struct_field(&mut self) -> Result<(TType, FieldId), Error>;

	/// `(element type, declared count)`.
	fn read_list_header(&mut self) -> Result<(TType, usize), Error>;

	/// Same wire encoding as a list header.
	fn read_set_header(&mut self) -> Result<(TType, usize), Error>;

	/// `(key type, value type, declared count)`.
	fn read_map_header(&mut self) -> Result<(TType, TType, usize), Error>;

	fn read_bool(&mut self) -> Result<bool, Error>;
	fn read_i8(&mut self) -> Result<i8, Error>;
	fn read_i16(&mut self) -> Result<i16, Error>;
	fn read_i32(&mut self) -> Result<i32, Error>;
	fn read_i64(&mut self) -> Result<i64, Error>;
	fn read_double(&mut self) -> Result<f64, Error>;

	/// Length-prefixed bytes, interpreted (but not validated) as UTF-8.
	fn read_string(&mut self) -> Result<String, Error>;

	/// Length-prefixed bytes, returned verbatim.
	fn read_binary(&mut self) -> Result<Vec<u8>, Error>;

	/// Advances past a length-prefixed string/binary payload without
	/// allocating it. Used by [`skip_via_reads`] so that skipping a field
	/// nobody asked to capture costs only the length prefix's parse, not a
	/// copy of its payload.
	fn skip_string(&mut self) -> Result<(), Error>;

	/// Advances past exactly one value of `category` without materializing
	/// it. When `capture` is `Some`, the exact bytes consumed are appended to
	/// it, verbatim, so the caller can re-emit them without re-encoding.
	fn skip(&mut self, category: TType, capture: Option<&mut Vec<u8>>) -> Result<(), Error>;

	/// The first sticky error this iterator produced, if any. Once set,
	/// further reads are no-ops that immediately return the same error.
	fn error(&self) -> Option<&Error>;
}

/// Generic, trait-object-driven variant-type skip shared by every concrete
/// iterator's [`TokenIterator::skip`] body: reads exactly the tokens that
/// belong to `category` (recursing into structs/containers), discarding
/// materialized scalars and advancing past string/binary payloads via
/// [`TokenIterator::skip_string`] rather than allocating them — the caller
/// only pays for tag/length parsing, never for a copy of the skipped payload
/// (besides optional capture, which is a plain byte copy of the range
/// [`TokenIterator::skip`] already walked).
pub(crate) fn skip_via_reads(iter: &mut dyn TokenIterator, category: TType) -> Result<(), Error> {
	match category {
		TType::Stop => Ok(()),
		TType::Bool => iter.read_bool().map(|_| ()),
		TType::I8 => iter.read_i8().map(|_| ()),
		TType::I16 => iter.read_i16().map(|_| ()),
		TType::I32 => iter.read_i32().map(|_| ()),
		TType::I64 => iter.read_i64().map(|_| ()),
		TType::Double => iter.read_double().map(|_| ()),
		TType::String => iter.skip_string(),
		TType::Struct => {
			iter.read_struct_header()?;
			loop {
				let (ty, _id) = iter.read_struct_field()?;
				if ty == TType::Stop {
					return Ok(());
				}
				skip_via_reads(iter, ty)?;
			}
		},
		TType::List => {
			let (elem_ty, count) = iter.read_list_header()?;
			for _ in 0..count {
				skip_via_reads(iter, elem_ty)?;
			}
			Ok(())
		},
		TType::Set => {
			let (elem_ty, count) = iter.read_set_header()?;
			for _ in 0..count {
				skip_via_reads(iter, elem_ty)?;
			}
			Ok(())
		},
		TType::Map => {
			let (key_ty, val_ty, count) = iter.read_map_header()?;
			for _ in 0..count {
				skip_via_reads(iter, key_ty)?;
				skip_via_reads(iter, val_ty)?;
			}
			Ok(())
		},
	}
}
