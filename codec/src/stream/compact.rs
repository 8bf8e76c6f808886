use crate::error::Error;
use crate::stream::TokenStream;
use crate::ttype::{FieldId, TType};
use crate::value::MessageHeader;
use crate::wire;

const PROTOCOL_ID: u8 = 0x82;
const VERSION: u8 = 1;

const CT_BOOLEAN_TRUE: u8 = 1;
const CT_BOOLEAN_FALSE: u8 = 2;
const CT_BYTE: u8 = 3;
const CT_I16: u8 = 4;
const CT_I32: u8 = 5;
const CT_I64: u8 = 6;
const CT_DOUBLE: u8 = 7;
const CT_BINARY: u8 = 8;
const CT_LIST: u8 = 9;
const CT_SET: u8 = 10;
const CT_MAP: u8 = 11;
const CT_STRUCT: u8 = 12;

/// Generic (non-bool-value-aware) type code, used for container element tags
/// and map key/value tags. `Bool` has no neutral code; `BOOLEAN_TRUE` stands
/// in, matching the reference encoding.
fn ttype_to_compact(ty: TType) -> u8 {
	match ty {
		TType::Stop => 0,
		TType::Bool => CT_BOOLEAN_TRUE,
		TType::I8 => CT_BYTE,
		TType::I16 => CT_I16,
		TType::I32 => CT_I32,
		TType::I64 => CT_I64,
		TType::Double => CT_DOUBLE,
		TType::String => CT_BINARY,
		TType::List => CT_LIST,
		TType::Set => CT_SET,
		TType::Map => CT_MAP,
		TType::Struct => CT_STRUCT,
	}
}

fn write_double_le(out: &mut Vec<u8>, value: f64) {
	out.extend_from_slice(&value.to_bits().to_le_bytes());
}

/// Pushes compact-protocol tokens into an owned, growable buffer. A bool
/// field's value is deferred: [`TokenStream::write_struct_field`] just
/// remembers the pending field id, and the following
/// [`TokenStream::write_bool`] call folds true/false into the field header's
/// type nibble instead of emitting a separate value byte.
#[derive(Default)]
pub struct BufferStream {
	buf: Vec<u8>,
	err: Option<Error>,
	last_id_stack: Vec<i16>,
	pending_bool_field: Option<FieldId>,
}

impl BufferStream {
	pub fn new() -> Self {
		Self::default()
	}

	#[inline]
	fn fail(&mut self, err: Error) -> Result<(), Error> {
		let clone = err.clone();
		self.err = Some(err);
		Err(clone)
	}

	#[inline]
	fn check(&self) -> Result<(), Error> {
		match &self.err {
			Some(err) => Err(err.clone()),
			None => Ok(()),
		}
	}

	fn write_field_header(&mut self, id: FieldId, type_code: u8) {
		let last = *self.last_id_stack.last().unwrap_or(&0);
		let delta = id.0.wrapping_sub(last);
		if delta > 0 && delta <= 15 {
			wire::write_u8(&mut self.buf, ((delta as u8) << 4) | type_code);
		} else {
			wire::write_u8(&mut self.buf, type_code);
			wire::write_varint(&mut self.buf, wire::zigzag_encode(id.0 as i64));
		}
		if let Some(top) = self.last_id_stack.last_mut() {
			*top = id.0;
		}
	}

	fn write_binary_bytes(&mut self, bytes: &[u8]) -> Result<(), Error> {
		self.check()?;
		wire::write_varint(&mut self.buf, bytes.len() as u64);
		self.buf.extend_from_slice(bytes);
		Ok(())
	}
}

impl TokenStream for BufferStream {
	fn write_message_header(&mut self, header: &MessageHeader) -> Result<(), Error> {
		self.check()?;
		wire::write_u8(&mut self.buf, PROTOCOL_ID);
		wire::write_u8(&mut self.buf, VERSION | ((header.kind as u8) << 5));
		wire::write_varint(&mut self.buf, header.seq_id as u32 as u64);
		self.write_binary_bytes(header.name.as_bytes())
	}

	fn write_struct_header(&mut self) -> Result<(), Error> {
		self.check()?;
		self.last_id_stack.push(0);
		Ok(())
	}

	fn write_struct_field(&mut self, ty: TType, id: FieldId) -> Result<(), Error> {
		self.check()?;
		if ty == TType::Stop {
			return self.fail(Error::UnexpectedTag { expected: TType::Bool, found: TType::Stop });
		}
		if ty == TType::Bool {
			self.pending_bool_field = Some(id);
			return Ok(());
		}
		self.write_field_header(id, ttype_to_compact(ty));
		Ok(())
	}

	fn write_struct_field_stop(&mut self) -> Result<(), Error> {
		self.check()?;
		wire::write_u8(&mut self.buf, 0);
		self.last_id_stack.pop();
		Ok(())
	}

	fn write_list_header(&mut self, elem_type: TType, count: usize) -> Result<(), Error> {
		self.check()?;
		let type_code = ttype_to_compact(elem_type);
		if count < 15 {
			wire::write_u8(&mut self.buf, ((count as u8) << 4) | type_code);
		} else {
			wire::write_u8(&mut self.buf, 0xF0 | type_code);
			wire::write_varint(&mut self.buf, count as u64);
		}
		Ok(())
	}

	fn write_set_header(&mut self, elem_type: TType, count: usize) -> Result<(), Error> {
		self.write_list_header(elem_type, count)
	}

	fn write_map_header(&mut self, key_type: TType, value_type: TType, count: usize) -> Result<(), Error> {
		self.check()?;
		wire::write_varint(&mut self.buf, count as u64);
		if count > 0 {
			wire::write_u8(&mut self.buf, (ttype_to_compact(key_type) << 4) | ttype_to_compact(value_type));
		}
		Ok(())
	}

	fn write_bool(&mut self, value: bool) -> Result<(), Error> {
		self.check()?;
		let type_code = if value { CT_BOOLEAN_TRUE } else { CT_BOOLEAN_FALSE };
		match self.pending_bool_field.take() {
			Some(id) => self.write_field_header(id, type_code),
			None => wire::write_u8(&mut self.buf, type_code),
		}
		Ok(())
	}

	fn write_i8(&mut self, value: i8) -> Result<(), Error> {
		self.check()?;
		wire::write_u8(&mut self.buf, value as u8);
		Ok(())
	}

	fn write_i16(&mut self, value: i16) -> Result<(), Error> {
		self.check()?;
		wire::write_varint(&mut self.buf, wire::zigzag_encode(value as i64));
		Ok(())
	}

	fn write_i32(&mut self, value: i32) -> Result<(), Error> {
		self.check()?;
		wire::write_varint(&mut self.buf, wire::zigzag_encode(value as i64));
		Ok(())
	}

	fn write_i64(&mut self, value: i64) -> Result<(), Error> {
		self.check()?;
		wire::write_varint(&mut self.buf, wire::zigzag_encode(value));
		Ok(())
	}

	fn write_double(&mut self, value: f64) -> Result<(), Error> {
		self.check()?;
		write_double_le(&mut self.buf, value);
		Ok(())
	}

	fn write_string(&mut self, value: &str) -> Result<(), Error> {
		self.write_binary_bytes(value.as_bytes())
	}

	fn write_binary(&mut self, value: &[u8]) -> Result<(), Error> {
		self.write_binary_bytes(value)
	}

	fn write_raw(&mut self, bytes: &[u8]) -> Result<(), Error> {
		self.check()?;
		self.buf.extend_from_slice(bytes);
		Ok(())
	}

	fn buffer(&self) -> &[u8] {
		&self.buf
	}

	fn reset(&mut self) {
		self.buf.clear();
		self.err = None;
		self.last_id_stack.clear();
		self.pending_bool_field = None;
	}

	fn error(&self) -> Option<&Error> {
		self.err.as_ref()
	}
}
