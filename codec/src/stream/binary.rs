use crate::error::Error;
use crate::stream::TokenStream;
use crate::ttype::{FieldId, TType};
use crate::value::MessageHeader;
use crate::wire;

const VERSION_1: u32 = 0x8001_0000;

/// Pushes binary-protocol tokens into an owned, growable buffer.
#[derive(Default)]
pub struct BufferStream {
	buf: Vec<u8>,
	err: Option<Error>,
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

	fn write_length_prefixed(&mut self, bytes: &[u8]) -> Result<(), Error> {
		self.check()?;
		wire::write_i32(&mut self.buf, bytes.len() as i32);
		self.buf.extend_from_slice(bytes);
		Ok(())
	}
}

impl TokenStream for BufferStream {
	fn write_message_header(&mut self, header: &MessageHeader) -> Result<(), Error> {
		self.check()?;
		let word = VERSION_1 | (header.kind as u8 as u32);
		wire::write_u32(&mut self.buf, word);
		self.write_length_prefixed(header.name.as_bytes())?;
		wire::write_i32(&mut self.buf, header.seq_id);
		Ok(())
	}

	fn write_struct_header(&mut self) -> Result<(), Error> {
		self.check()
	}

	fn write_struct_field(&mut self, ty: TType, id: FieldId) -> Result<(), Error> {
		self.check()?;
		if ty == TType::Stop {
			return self.fail(Error::UnexpectedTag { expected: TType::Bool, found: TType::Stop });
		}
		wire::write_u8(&mut self.buf, ty as u8);
		wire::write_i16(&mut self.buf, id.0);
		Ok(())
	}

	fn write_struct_field_stop(&mut self) -> Result<(), Error> {
		self.check()?;
		wire::write_u8(&mut self.buf, TType::Stop as u8);
		Ok(())
	}

	fn write_list_header(&mut self, elem_type: TType, count: usize) -> Result<(), Error> {
		self.check()?;
		wire::write_u8(&mut self.buf, elem_type as u8);
		wire::write_i32(&mut self.buf, count as i32);
		Ok(())
	}

	fn write_set_header(&mut self, elem_type: TType, count: usize) -> Result<(), Error> {
		self.write_list_header(elem_type, count)
	}

	fn write_map_header(&mut self, key_type: TType, value_type: TType, count: usize) -> Result<(), Error> {
		self.check()?;
		wire::write_u8(&mut self.buf, key_type as u8);
		wire::write_u8(&mut self.buf, value_type as u8);
		wire::write_i32(&mut self.buf, count as i32);
		Ok(())
	}

	fn write_bool(&mut self, value: bool) -> Result<(), Error> {
		self.check()?;
		wire::write_u8(&mut self.buf, value as u8);
		Ok(())
	}

	fn write_i8(&mut self, value: i8) -> Result<(), Error> {
		self.check()?;
		wire::write_u8(&mut self.buf, value as u8);
		Ok(())
	}

	fn write_i16(&mut self, value: i16) -> Result<(), Error> {
		self.check()?;
		wire::write_i16(&mut self.buf, value);
		Ok(())
	}

	fn write_i32(&mut self, value: i32) -> Result<(), Error> {
		self.check()?;
		wire::write_i32(&mut self.buf, value);
		Ok(())
	}

	fn write_i64(&mut self, value: i64) -> Result<(), Error> {
		self.check()?;
		wire::write_i64(&mut self.buf, value);
		Ok(())
	}

	fn write_double(&mut self, value: f64) -> Result<(), Error> {
		self.check()?;
		wire::write_double(&mut self.buf, value);
		Ok(())
	}

	fn write_string(&mut self, value: &str) -> Result<(), Error> {
		self.write_length_prefixed(value.as_bytes())
	}

	fn write_binary(&mut self, value: &[u8]) -> Result<(), Error> {
		self.write_length_prefixed(value)
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
	}

	fn error(&self) -> Option<&Error> {
		self.err.as_ref()
	}
}
