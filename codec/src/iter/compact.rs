use crate::error::Error;
use crate::iter::{skip_via_reads, TokenIterator};
use crate::ttype::{FieldId, MsgType, TType};
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

fn compact_to_ttype(code: u8) -> Option<TType> {
	match code {
		0 => Some(TType::Stop),
		CT_BOOLEAN_TRUE | CT_BOOLEAN_FALSE => Some(TType::Bool),
		CT_BYTE => Some(TType::I8),
		CT_I16 => Some(TType::I16),
		CT_I32 => Some(TType::I32),
		CT_I64 => Some(TType::I64),
		CT_DOUBLE => Some(TType::Double),
		CT_BINARY => Some(TType::String),
		CT_LIST => Some(TType::List),
		CT_SET => Some(TType::Set),
		CT_MAP => Some(TType::Map),
		CT_STRUCT => Some(TType::Struct),
		_ => None,
	}
}

fn read_double_le(buf: &[u8], pos: &mut usize) -> Result<f64, Error> {
	let bytes = buf.get(*pos..*pos + 8).ok_or(Error::PrematureEOF)?;
	*pos += 8;
	Ok(f64::from_bits(u64::from_le_bytes(bytes.try_into().unwrap())))
}

/// Pull-parses compact-protocol tokens from a borrowed byte slice. Tracks the
/// last field id written at each struct-nesting depth for delta decoding, and
/// a pending bool value when a field header's type nibble already carried it.
pub struct BufferIterator<'a> {
	data: &'a [u8],
	pos: usize,
	err: Option<Error>,
	last_id_stack: Vec<i16>,
	pending_bool: Option<bool>,
}

impl<'a> BufferIterator<'a> {
	pub fn new(data: &'a [u8]) -> Self {
		Self { data, pos: 0, err: None, last_id_stack: Vec::new(), pending_bool: None }
	}

	#[inline]
	fn fail<T>(&mut self, err: Error) -> Result<T, Error> {
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

	fn read_binary_bytes(&mut self) -> Result<Vec<u8>, Error> {
		self.check()?;
		let len = wire::read_varint(self.data, &mut self.pos)? as usize;
		let end = self.pos + len;
		match self.data.get(self.pos..end) {
			Some(bytes) => {
				self.pos = end;
				Ok(bytes.to_vec())
			},
			None => self.fail(Error::PrematureEOF),
		}
	}
}

impl<'a> TokenIterator for BufferIterator<'a> {
	fn read_message_header(&mut self) -> Result<MessageHeader, Error> {
		self.check()?;
		let protocol_id = wire::read_u8(self.data, &mut self.pos)?;
		if protocol_id != PROTOCOL_ID {
			return self.fail(Error::UnsupportedProtocol("unrecognized compact protocol id"));
		}
		let version_and_type = wire::read_u8(self.data, &mut self.pos)?;
		if version_and_type & 0x1F != VERSION {
			return self.fail(Error::UnsupportedProtocol("unrecognized compact protocol version"));
		}
		let kind = match MsgType::from_repr((version_and_type >> 5) & 0x07) {
			Some(kind) => kind,
			None => return self.fail(Error::UnsupportedProtocol("unrecognized message type")),
		};
		let seq_id = wire::read_varint(self.data, &mut self.pos)? as u32 as i32;
		let name = self.read_binary_bytes()?;
		let name = String::from_utf8_lossy(&name).into_owned();
		Ok(MessageHeader { name, kind, seq_id })
	}

	fn read_struct_header(&mut self) -> Result<(), Error> {
		self.check()?;
		self.last_id_stack.push(0);
		Ok(())
	}

	fn read_struct_field(&mut self) -> Result<(TType, FieldId), Error> {
		self.check()?;
		let byte = wire::read_u8(self.data, &mut self.pos)?;
		if byte == 0 {
			self.last_id_stack.pop();
			return Ok((TType::Stop, FieldId(0)));
		}
		let type_nibble = byte & 0x0F;
		let delta = (byte >> 4) & 0x0F;
		let ttype = match compact_to_ttype(type_nibble) {
			Some(ttype) => ttype,
			None => return self.fail(Error::UnsupportedProtocol("unrecognized compact field type")),
		};
		let last = *self.last_id_stack.last().unwrap_or(&0);
		let id = if delta != 0 {
			last.wrapping_add(delta as i16)
		} else {
			wire::zigzag_decode(wire::read_varint(self.data, &mut self.pos)?) as i16
		};
		if let Some(top) = self.last_id_stack.last_mut() {
			*top = id;
		}
		self.pending_bool = match type_nibble {
			CT_BOOLEAN_TRUE => Some(true),
			CT_BOOLEAN_FALSE => Some(false),
			_ => None,
		};
		Ok((ttype, FieldId(id)))
	}

	fn read_list_header(&mut self) -> Result<(TType, usize), Error> {
		self.check()?;
		let byte = wire::read_u8(self.data, &mut self.pos)?;
		let size_nibble = (byte >> 4) & 0x0F;
		let type_nibble = byte & 0x0F;
		let ttype = match compact_to_ttype(type_nibble) {
			Some(ttype) => ttype,
			None => return self.fail(Error::UnsupportedProtocol("unrecognized compact element type")),
		};
		let count = if size_nibble == 0x0F {
			wire::read_varint(self.data, &mut self.pos)? as usize
		} else {
			size_nibble as usize
		};
		Ok((ttype, count))
	}

	fn read_set_header(&mut self) -> Result<(TType, usize), Error> {
		self.read_list_header()
	}

	fn read_map_header(&mut self) -> Result<(TType, TType, usize), Error> {
		self.check()?;
		let count = wire::read_varint(self.data, &mut self.pos)? as usize;
		if count == 0 {
			return Ok((TType::Stop, TType::Stop, 0));
		}
		let byte = wire::read_u8(self.data, &mut self.pos)?;
		let key_ty = match compact_to_ttype((byte >> 4) & 0x0F) {
			Some(ty) => ty,
			None => return self.fail(Error::UnsupportedProtocol("unrecognized compact map key type")),
		};
		let val_ty = match compact_to_ttype(byte & 0x0F) {
			Some(ty) => ty,
			None => return self.fail(Error::UnsupportedProtocol("unrecognized compact map value type")),
		};
		Ok((key_ty, val_ty, count))
	}

	fn read_bool(&mut self) -> Result<bool, Error> {
		self.check()?;
		if let Some(value) = self.pending_bool.take() {
			return Ok(value);
		}
		match wire::read_u8(self.data, &mut self.pos)? {
			CT_BOOLEAN_TRUE => Ok(true),
			CT_BOOLEAN_FALSE => Ok(false),
			_ => self.fail(Error::UnsupportedProtocol("unrecognized compact bool byte")),
		}
	}

	fn read_i8(&mut self) -> Result<i8, Error> {
		self.check()?;
		Ok(wire::read_u8(self.data, &mut self.pos)? as i8)
	}

	fn read_i16(&mut self) -> Result<i16, Error> {
		self.check()?;
		Ok(wire::zigzag_decode(wire::read_varint(self.data, &mut self.pos)?) as i16)
	}

	fn read_i32(&mut self) -> Result<i32, Error> {
		self.check()?;
		Ok(wire::zigzag_decode(wire::read_varint(self.data, &mut self.pos)?) as i32)
	}

	fn read_i64(&mut self) -> Result<i64, Error> {
		self.check()?;
		Ok(wire::zigzag_decode(wire::read_varint(self.data, &mut self.pos)?))
	}

	fn read_double(&mut self) -> Result<f64, Error> {
		self.check()?;
		read_double_le(self.data, &mut self.pos)
	}

	fn read_string(&mut self) -> Result<String, Error> {
		let bytes = self.read_binary_bytes()?;
		Ok(String::from_utf8_lossy(&bytes).into_owned())
	}

	fn read_binary(&mut self) -> Result<Vec<u8>, Error> {
		self.read_binary_bytes()
	}

	fn skip_string(&mut self) -> Result<(), Error> {
		self.check()?;
		let len = wire::read_varint(self.data, &mut self.pos)? as usize;
		let end = self.pos + len;
		if end > self.data.len() {
			return self.fail(Error::PrematureEOF);
		}
		self.pos = end;
		Ok(())
	}

	fn skip(&mut self, category: TType, capture: Option<&mut Vec<u8>>) -> Result<(), Error> {
		self.check()?;
		let start = self.pos;
		let result = skip_via_reads(self, category);
		if let Some(buf) = capture {
			buf.extend_from_slice(&self.data[start..self.pos]);
		}
		result
	}

	fn error(&self) -> Option<&Error> {
		self.err.as_ref()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::stream::compact::BufferStream;
	use crate::stream::TokenStream;

	#[test]
	fn seed_field_delta_then_explicit() {
		let mut stream = BufferStream::new();
		stream.write_struct_header().unwrap();
		stream.write_struct_field(TType::I32, FieldId(1)).unwrap();
		stream.write_i32(7).unwrap();
		stream.write_struct_field(TType::I32, FieldId(20)).unwrap();
		stream.write_i32(8).unwrap();
		stream.write_struct_field_stop().unwrap();

		let mut iter = BufferIterator::new(stream.buffer());
		iter.read_struct_header().unwrap();
		let (ty, id) = iter.read_struct_field().unwrap();
		assert_eq!((ty, id), (TType::I32, FieldId(1)));
		assert_eq!(iter.read_i32().unwrap(), 7);
		let (ty, id) = iter.read_struct_field().unwrap();
		assert_eq!((ty, id), (TType::I32, FieldId(20)));
		assert_eq!(iter.read_i32().unwrap(), 8);
		let (ty, _) = iter.read_struct_field().unwrap();
		assert_eq!(ty, TType::Stop);
	}

	#[test]
	fn seed_bool_field_packs_into_header() {
		let mut stream = BufferStream::new();
		stream.write_struct_header().unwrap();
		stream.write_struct_field(TType::Bool, FieldId(1)).unwrap();
		stream.write_bool(true).unwrap();
		stream.write_struct_field_stop().unwrap();
		assert_eq!(stream.buffer(), &[0x11, 0x00]);
	}
}
