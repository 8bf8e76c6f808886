use std::io::Read;

use crate::error::Error;
use crate::iter::{skip_via_reads, TokenIterator};
use crate::ttype::{FieldId, MsgType, TType};
use crate::value::MessageHeader;
use crate::wire;

const VERSION_MASK: u32 = 0xFFFF_0000;
const VERSION_1: u32 = 0x8001_0000;

#[inline]
fn count_from_i32(n: i32) -> Result<usize, Error> {
	if n < 0 {
		return Err(Error::ContainerCountInvalid(n as i64));
	}
	Ok(n as usize)
}

#[inline]
fn ttype_from_byte(b: u8) -> Result<TType, Error> {
	TType::from_repr(b).ok_or(Error::UnsupportedProtocol("unrecognized binary type tag"))
}

/// Pull-parses binary-protocol tokens from a borrowed byte slice. Zero
/// allocation beyond what the caller asks for (strings/binary/skip-capture).
pub struct BufferIterator<'a> {
	data: &'a [u8],
	pos: usize,
	err: Option<Error>,
}

impl<'a> BufferIterator<'a> {
	pub fn new(data: &'a [u8]) -> Self {
		Self { data, pos: 0, err: None }
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

	fn read_string_bytes(&mut self) -> Result<Vec<u8>, Error> {
		self.check()?;
		let len = count_from_i32(wire::read_i32(self.data, &mut self.pos)?)?;
		let end = self.pos + len;
		let bytes = self.data.get(self.pos..end).ok_or(Error::PrematureEOF);
		match bytes {
			Ok(bytes) => {
				self.pos = end;
				Ok(bytes.to_vec())
			},
			Err(err) => self.fail(err),
		}
	}
}

impl<'a> TokenIterator for BufferIterator<'a> {
	fn read_message_header(&mut self) -> Result<MessageHeader, Error> {
		self.check()?;
		let first = wire::read_u32(self.data, &mut self.pos)?;
		let (kind, name) = if first & 0x8000_0000 != 0 {
			if first & VERSION_MASK != VERSION_1 {
				return self.fail(Error::UnsupportedProtocol("unrecognized binary message version"));
			}
			let kind = MsgType::from_repr((first & 0xFF) as u8)
				.ok_or(Error::UnsupportedProtocol("unrecognized message type"));
			let kind = match kind {
				Ok(kind) => kind,
				Err(err) => return self.fail(err),
			};
			let name = match self.read_string_bytes() {
				Ok(bytes) => bytes,
				Err(err) => return Err(err),
			};
			(kind, name)
		} else {
			let len = match count_from_i32(first as i32) {
				Ok(len) => len,
				Err(err) => return self.fail(err),
			};
			let end = self.pos + len;
			let name = match self.data.get(self.pos..end) {
				Some(bytes) => {
					self.pos = end;
					bytes.to_vec()
				},
				None => return self.fail(Error::PrematureEOF),
			};
			let kind_byte = wire::read_u8(self.data, &mut self.pos)?;
			let kind = match MsgType::from_repr(kind_byte) {
				Some(kind) => kind,
				None => return self.fail(Error::UnsupportedProtocol("unrecognized message type")),
			};
			(kind, name)
		};
		let seq_id = wire::read_i32(self.data, &mut self.pos)?;
		let name = String::from_utf8_lossy(&name).into_owned();
		Ok(MessageHeader { name, kind, seq_id })
	}

	fn read_struct_header(&mut self) -> Result<(), Error> {
		self.check()
	}

	fn read_struct_field(&mut self) -> Result<(TType, FieldId), Error> {
		self.check()?;
		let tag = wire::read_u8(self.data, &mut self.pos)?;
		if tag == 0 {
			return Ok((TType::Stop, FieldId(0)));
		}
		let ttype = match ttype_from_byte(tag) {
			Ok(ttype) => ttype,
			Err(err) => return self.fail(err),
		};
		let id = wire::read_i16(self.data, &mut self.pos)?;
		Ok((ttype, FieldId(id)))
	}

	fn read_list_header(&mut self) -> Result<(TType, usize), Error> {
		self.check()?;
		let tag = wire::read_u8(self.data, &mut self.pos)?;
		let ttype = match ttype_from_byte(tag) {
			Ok(ttype) => ttype,
			Err(err) => return self.fail(err),
		};
		let count = count_from_i32(wire::read_i32(self.data, &mut self.pos)?)?;
		Ok((ttype, count))
	}

	fn read_set_header(&mut self) -> Result<(TType, usize), Error> {
		self.read_list_header()
	}

	fn read_map_header(&mut self) -> Result<(TType, TType, usize), Error> {
		self.check()?;
		let key_tag = wire::read_u8(self.data, &mut self.pos)?;
		let val_tag = wire::read_u8(self.data, &mut self.pos)?;
		let key_ty = match ttype_from_byte(key_tag) {
			Ok(ty) => ty,
			Err(err) => return self.fail(err),
		};
		let val_ty = match ttype_from_byte(val_tag) {
			Ok(ty) => ty,
			Err(err) => return self.fail(err),
		};
		let count = count_from_i32(wire::read_i32(self.data, &mut self.pos)?)?;
		Ok((key_ty, val_ty, count))
	}

	fn read_bool(&mut self) -> Result<bool, Error> {
		self.check()?;
		Ok(wire::read_u8(self.data, &mut self.pos)? != 0)
	}

	fn read_i8(&mut self) -> Result<i8, Error> {
		self.check()?;
		Ok(wire::read_u8(self.data, &mut self.pos)? as i8)
	}

	fn read_i16(&mut self) -> Result<i16, Error> {
		self.check()?;
		wire::read_i16(self.data, &mut self.pos)
	}

	fn read_i32(&mut self) -> Result<i32, Error> {
		self.check()?;
		wire::read_i32(self.data, &mut self.pos)
	}

	fn read_i64(&mut self) -> Result<i64, Error> {
		self.check()?;
		wire::read_i64(self.data, &mut self.pos)
	}

	fn read_double(&mut self) -> Result<f64, Error> {
		self.check()?;
		wire::read_double(self.data, &mut self.pos)
	}

	fn read_string(&mut self) -> Result<String, Error> {
		let bytes = self.read_string_bytes()?;
		Ok(String::from_utf8_lossy(&bytes).into_owned())
	}

	fn read_binary(&mut self) -> Result<Vec<u8>, Error> {
		self.read_string_bytes()
	}

	fn skip_string(&mut self) -> Result<(), Error> {
		self.check()?;
		let len = count_from_i32(wire::read_i32(self.data, &mut self.pos)?)?;
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

/// Pull-parses binary-protocol tokens from an unbounded [`Read`] source,
/// refilling an internal buffer on demand. Before each fixed-width token it
/// ensures the buffer holds that token's worst-case byte count; for
/// variable-length payloads it reads the length, then draws further bytes as
/// needed. The buffer is compacted (its consumed prefix dropped) only at
/// `read_message_header`, since nothing spans a skip/read across a message
/// boundary — this bounds memory to roughly one message's worth of bytes
/// while still letting [`TokenIterator::skip`]'s capture slice a contiguous,
/// byte-exact range out of the buffer the same way the buffer iterator does.
pub struct StreamingIterator<R> {
	reader: R,
	buf: Vec<u8>,
	pos: usize,
	err: Option<Error>,
}

impl<R: Read> StreamingIterator<R> {
	pub fn new(reader: R, buf: Vec<u8>) -> Self {
		Self { reader, buf, pos: 0, err: None }
	}

	pub fn reset(&mut self, reader: R, buf: Vec<u8>) {
		self.reader = reader;
		self.buf = buf;
		self.pos = 0;
		self.err = None;
	}

	fn compact(&mut self) {
		if self.pos > 0 {
			self.buf.drain(..self.pos);
			self.pos = 0;
		}
	}

	/// Ensures at least `n` unconsumed bytes are buffered, reading from the
	/// underlying source as needed.
	fn ensure(&mut self, n: usize) -> Result<(), Error> {
		while self.buf.len() - self.pos < n {
			let mut chunk = [0u8; 4096];
			let read = self.reader.read(&mut chunk)?;
			if read == 0 {
				return Err(Error::PrematureEOF);
			}
			self.buf.extend_from_slice(&chunk[..read]);
		}
		Ok(())
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

	fn read_string_bytes(&mut self) -> Result<Vec<u8>, Error> {
		self.check()?;
		self.ensure(4)?;
		let len = count_from_i32(wire::read_i32(&self.buf, &mut self.pos)?)?;
		self.ensure(len)?;
		let bytes = self.buf[self.pos..self.pos + len].to_vec();
		self.pos += len;
		Ok(bytes)
	}
}

impl<R: Read> TokenIterator for StreamingIterator<R> {
	fn read_message_header(&mut self) -> Result<MessageHeader, Error> {
		self.check()?;
		self.compact();
		self.ensure(4)?;
		let first = wire::read_u32(&self.buf, &mut self.pos)?;
		let (kind, name) = if first & 0x8000_0000 != 0 {
			if first & VERSION_MASK != VERSION_1 {
				return self.fail(Error::UnsupportedProtocol("unrecognized binary message version"));
			}
			let kind = match MsgType::from_repr((first & 0xFF) as u8) {
				Some(kind) => kind,
				None => return self.fail(Error::UnsupportedProtocol("unrecognized message type")),
			};
			let name = self.read_string_bytes()?;
			(kind, name)
		} else {
			let len = match count_from_i32(first as i32) {
				Ok(len) => len,
				Err(err) => return self.fail(err),
			};
			self.ensure(len)?;
			let name = self.buf[self.pos..self.pos + len].to_vec();
			self.pos += len;
			self.ensure(1)?;
			let kind_byte = wire::read_u8(&self.buf, &mut self.pos)?;
			let kind = match MsgType::from_repr(kind_byte) {
				Some(kind) => kind,
				None => return self.fail(Error::UnsupportedProtocol("unrecognized message type")),
			};
			(kind, name)
		};
		self.ensure(4)?;
		let seq_id = wire::read_i32(&self.buf, &mut self.pos)?;
		let name = String::from_utf8_lossy(&name).into_owned();
		Ok(MessageHeader { name, kind, seq_id })
	}

	fn read_struct_header(&mut self) -> Result<(), Error> {
		self.check()
	}

	fn read_struct_field(&mut self) -> Result<(TType, FieldId), Error> {
		self.check()?;
		self.ensure(1)?;
		let tag = wire::read_u8(&self.buf, &mut self.pos)?;
		if tag == 0 {
			return Ok((TType::Stop, FieldId(0)));
		}
		let ttype = match ttype_from_byte(tag) {
			Ok(ttype) => ttype,
			Err(err) => return self.fail(err),
		};
		self.ensure(2)?;
		let id = wire::read_i16(&self.buf, &mut self.pos)?;
		Ok((ttype, FieldId(id)))
	}

	fn read_list_header(&mut self) -> Result<(TType, usize), Error> {
		self.check()?;
		self.ensure(5)?;
		let tag = wire::read_u8(&self.buf, &mut self.pos)?;
		let ttype = match ttype_from_byte(tag) {
			Ok(ttype) => ttype,
			Err(err) => return self.fail(err),
		};
		let count = count_from_i32(wire::read_i32(&self.buf, &mut self.pos)?)?;
		Ok((ttype, count))
	}

	fn read_set_header(&mut self) -> Result<(TType, usize), Error> {
		self.read_list_header()
	}

	fn read_map_header(&mut self) -> Result<(TType, TType, usize), Error> {
		self.check()?;
		self.ensure(6)?;
		let key_tag = wire::read_u8(&self.buf, &mut self.pos)?;
		let val_tag = wire::read_u8(&self.buf, &mut self.pos)?;
		let key_ty = match ttype_from_byte(key_tag) {
			Ok(ty) => ty,
			Err(err) => return self.fail(err),
		};
		let val_ty = match ttype_from_byte(val_tag) {
			Ok(ty) => ty,
			Err(err) => return self.fail(err),
		};
		let count = count_from_i32(wire::read_i32(&self.buf, &mut self.pos)?)?;
		Ok((key_ty, val_ty, count))
	}

	fn read_bool(&mut self) -> Result<bool, Error> {
		self.check()?;
		self.ensure(1)?;
		Ok(wire::read_u8(&self.buf, &mut self.pos)? != 0)
	}

	fn read_i8(&mut self) -> Result<i8, Error> {
		self.check()?;
		self.ensure(1)?;
		Ok(wire::read_u8(&self.buf, &mut self.pos)? as i8)
	}

	fn read_i16(&mut self) -> Result<i16, Error> {
		self.check()?;
		self.ensure(2)?;
		wire::read_i16(&self.buf, &mut self.pos)
	}

	fn read_i32(&mut self) -> Result<i32, Error> {
		self.check()?;
		self.ensure(4)?;
		wire::read_i32(&self.buf, &mut self.pos)
	}

	fn read_i64(&mut self) -> Result<i64, Error> {
		self.check()?;
		self.ensure(8)?;
		wire::read_i64(&self.buf, &mut self.pos)
	}

	fn read_double(&mut self) -> Result<f64, Error> {
		self.check()?;
		self.ensure(8)?;
		wire::read_double(&self.buf, &mut self.pos)
	}

	fn read_string(&mut self) -> Result<String, Error> {
		let bytes = self.read_string_bytes()?;
		Ok(String::from_utf8_lossy(&bytes).into_owned())
	}

	fn read_binary(&mut self) -> Result<Vec<u8>, Error> {
		self.read_string_bytes()
	}

	fn skip_string(&mut self) -> Result<(), Error> {
		self.check()?;
		self.ensure(4)?;
		let len = count_from_i32(wire::read_i32(&self.buf, &mut self.pos)?)?;
		self.ensure(len)?;
		self.pos += len;
		Ok(())
	}

	fn skip(&mut self, category: TType, capture: Option<&mut Vec<u8>>) -> Result<(), Error> {
		self.check()?;
		let start = self.pos;
		let result = skip_via_reads(self, category);
		if let Some(buf) = capture {
			buf.extend_from_slice(&self.buf[start..self.pos]);
		}
		result
	}

	fn error(&self) -> Option<&Error> {
		self.err.as_ref()
	}
}
