//! The low-level, token-level push API — the write-side mirror of
//! [`crate::iter`]. A stream's only job is to turn a strict sequence of
//! tokens into bytes.

pub mod binary;
pub mod compact;

use crate::error::Error;
use crate::ttype::{FieldId, TType};
use crate::value::MessageHeader;

/// Object-safe token sink, paired one-to-one with [`crate::iter::TokenIterator`].
pub trait TokenStream {
	fn write_message_header(&mut self, header: &MessageHeader) -> Result<(), Error>;

	/// No-op for binary; pushes a new field-id delta frame for compact.
	fn write_struct_header(&mut self) -> Result<(), Error>;

	fn write_struct_field(&mut self, ty: TType, id: FieldId) -> Result<(), Error>;

	/// Terminates the current struct's field list.
	fn write_struct_field_stop(&mut self) -> Result<(), Error>;

	fn write_list_header(&mut self, elem_type: TType, count: usize) -> Result<(), Error>;
	fn write_set_header(&mut self, elem_type: TType, count: usize) -> Result<(), Error>;
	fn write_map_header(&mut self, key_type: TType, value_type: TType, count: usize) -> Result<(), Error>;

	fn write_bool(&mut self, value: bool) -> Result<(), Error>;
	fn write_i8(&mut self, value: i8) -> Result<(), Error>;
	fn write_i16(&mut self, value: i16) -> Result<(), Error>;
	fn write_i32(&mut self, value: i32) -> Result<(), Error>;
	fn write_i64(&mut self, value: i64) -> Result<(), Error>;
	fn write_double(&mut self, value: f64) -> Result<(), Error>;
	fn write_string(&mut self, value: &str) -> Result<(), Error>;
	fn write_binary(&mut self, value: &[u8]) -> Result<(), Error>;

	/// Appends bytes verbatim; used to re-emit a [`crate::value::RawMessage`]
	/// payload without re-encoding it.
	fn write_raw(&mut self, bytes: &[u8]) -> Result<(), Error>;

	/// The bytes written so far.
	fn buffer(&self) -> &[u8];

	/// Clears the buffer and any per-struct delta state, for reuse across messages.
	fn reset(&mut self);

	/// The first sticky error this stream produced, if any.
	fn error(&self) -> Option<&Error>;
}
