//! Per-message encoding onto a [`Write`] sink, mirroring [`crate::decoder`].

use std::io::Write;

use crate::codec::{ThriftDecode, ThriftEncode};
use crate::config::FrozenConfig;
use crate::error::Error;
use crate::framing;
use crate::generic;
use crate::value::Message;

/// Encodes one value into a scratch stream, then flushes it as a single
/// length-prefixed frame.
pub struct FramedEncoder<W> {
	writer: W,
	cfg: FrozenConfig,
}

impl<W: Write> FramedEncoder<W> {
	pub fn new(writer: W, cfg: FrozenConfig) -> Self {
		Self { writer, cfg }
	}

	pub fn encode_next<T>(&mut self, value: &T) -> Result<(), Error>
	where
		T: ThriftDecode + ThriftEncode + Send + Sync + 'static,
	{
		self.cfg.require_registered::<T>()?;
		let mut stream = self.cfg.new_stream();
		self.cfg.cache().encode(value, &mut *stream)?;
		framing::write_frame(&mut self.writer, stream.buffer())
	}

	pub fn encode_next_message(&mut self, message: &Message) -> Result<(), Error> {
		let mut stream = self.cfg.new_stream();
		generic::encode_message(&mut *stream, message)?;
		framing::write_frame(&mut self.writer, stream.buffer())
	}
}

/// Encodes directly onto `writer` with no intermediate framing.
pub struct UnframedEncoder<W> {
	writer: W,
	cfg: FrozenConfig,
}

impl<W: Write> UnframedEncoder<W> {
	pub fn new(writer: W, cfg: FrozenConfig) -> Self {
		Self { writer, cfg }
	}

	pub fn encode_next<T>(&mut self, value: &T) -> Result<(), Error>
	where
		T: ThriftDecode + ThriftEncode + Send + Sync + 'static,
	{
		self.cfg.require_registered::<T>()?;
		let mut stream = self.cfg.new_stream();
		self.cfg.cache().encode(value, &mut *stream)?;
		self.writer.write_all(stream.buffer())?;
		Ok(())
	}

	pub fn encode_next_message(&mut self, message: &Message) -> Result<(), Error> {
		let mut stream = self.cfg.new_stream();
		generic::encode_message(&mut *stream, message)?;
		self.writer.write_all(stream.buffer())?;
		Ok(())
	}
}

/// Dispatches to whichever framing mode [`Config::framed`] selected.
pub enum Encoder<W> {
	Framed(FramedEncoder<W>),
	Unframed(UnframedEncoder<W>),
}

impl<W: Write> Encoder<W> {
	pub fn encode_next<T>(&mut self, value: &T) -> Result<(), Error>
	where
		T: ThriftDecode + ThriftEncode + Send + Sync + 'static,
	{
		match self {
			Self::Framed(inner) => inner.encode_next(value),
			Self::Unframed(inner) => inner.encode_next(value),
		}
	}

	pub fn encode_next_message(&mut self, message: &Message) -> Result<(), Error> {
		match self {
			Self::Framed(inner) => inner.encode_next_message(message),
			Self::Unframed(inner) => inner.encode_next_message(message),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::{Config, DispatchStrategy};

	#[test]
	fn framed_encoder_then_decoder_round_trips() {
		let cfg = Config::new().framed(true).freeze().unwrap();
		let mut buf = Vec::new();
		{
			let mut encoder = cfg.new_encoder(&mut buf);
			encoder.encode_next(&5i32).unwrap();
			encoder.encode_next(&6i32).unwrap();
		}
		let mut decoder = cfg.new_decoder(std::io::Cursor::new(buf));
		assert_eq!(decoder.decode_next::<i32>().unwrap(), 5);
		assert_eq!(decoder.decode_next::<i32>().unwrap(), 6);
	}

	#[test]
	fn precompiled_encoder_requires_prewarm() {
		let cfg = Config::new().framed(true).dispatch(DispatchStrategy::Precompiled).freeze().unwrap();
		let mut buf = Vec::new();
		{
			let mut encoder = cfg.new_encoder(&mut buf);
			assert!(matches!(encoder.encode_next(&9i32), Err(Error::ConfigConflict(_))));
		}
		cfg.prewarm::<i32>();
		{
			let mut encoder = cfg.new_encoder(&mut buf);
			encoder.encode_next(&9i32).unwrap();
		}
	}
}
