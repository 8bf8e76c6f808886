//! Per-message decoding off a [`Read`] source. [`Config::framed`] selects
//! which variant [`FrozenConfig::new_decoder`] hands back; both read exactly
//! one value (or one [`Message`]) per call and leave the source positioned at
//! the start of the next one.

use std::io::Read;

use crate::codec::{ThriftDecode, ThriftEncode};
use crate::config::FrozenConfig;
use crate::error::Error;
use crate::framing;
use crate::generic;
use crate::iter::binary::StreamingIterator;
use crate::value::Message;

/// A length-prefixed-frame decoder: reads the 4-byte length, then a
/// fresh buffer-backed iterator over exactly that many bytes, so a short or
/// malformed value can never read into the next frame.
pub struct FramedDecoder<R> {
	reader: R,
	cfg: FrozenConfig,
}

impl<R: Read> FramedDecoder<R> {
	pub fn new(reader: R, cfg: FrozenConfig) -> Self {
		Self { reader, cfg }
	}

	pub fn decode_next<T>(&mut self) -> Result<T, Error>
	where
		T: ThriftDecode + ThriftEncode + Send + Sync + 'static,
	{
		self.cfg.require_registered::<T>()?;
		let payload = framing::read_frame(&mut self.reader, self.cfg.config().max_frame_len)?;
		let mut iter = self.cfg.new_iterator(&payload);
		self.cfg.cache().decode(&mut *iter)
	}

	pub fn decode_next_message(&mut self) -> Result<Message, Error> {
		let payload = framing::read_frame(&mut self.reader, self.cfg.config().max_frame_len)?;
		let mut iter = self.cfg.new_iterator(&payload);
		generic::decode_message(&mut *iter)
	}
}

/// An unframed decoder: message boundaries are implicit in the protocol's
/// own token grammar, so the same [`StreamingIterator`] is reused across
/// every call, refilling from `reader` as needed.
pub struct UnframedDecoder<R> {
	iter: StreamingIterator<R>,
	cfg: FrozenConfig,
}

impl<R: Read> UnframedDecoder<R> {
	pub fn new(reader: R, cfg: FrozenConfig) -> Self {
		Self { iter: StreamingIterator::new(reader, Vec::new()), cfg }
	}

	pub fn decode_next<T>(&mut self) -> Result<T, Error>
	where
		T: ThriftDecode + ThriftEncode + Send + Sync + 'static,
	{
		self.cfg.require_registered::<T>()?;
		self.cfg.cache().decode(&mut self.iter)
	}

	pub fn decode_next_message(&mut self) -> Result<Message, Error> {
		generic::decode_message(&mut self.iter)
	}
}

/// Dispatches to whichever framing mode [`Config::framed`] selected.
pub enum Decoder<R> {
	Framed(FramedDecoder<R>),
	Unframed(UnframedDecoder<R>),
}

impl<R: Read> Decoder<R> {
	pub fn decode_next<T>(&mut self) -> Result<T, Error>
	where
		T: ThriftDecode + ThriftEncode + Send + Sync + 'static,
	{
		match self {
			Self::Framed(inner) => inner.decode_next(),
			Self::Unframed(inner) => inner.decode_next(),
		}
	}

	pub fn decode_next_message(&mut self) -> Result<Message, Error> {
		match self {
			Self::Framed(inner) => inner.decode_next_message(),
			Self::Unframed(inner) => inner.decode_next_message(),
		}
	}
}
