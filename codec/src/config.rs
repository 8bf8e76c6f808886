//! The public facade: a [`Config`] is built once, frozen into a
//! [`FrozenConfig`], and from then on every `unmarshal`/`marshal`/iterator/
//! stream/decoder/encoder it hands out shares the same [`CodecCache`]. This
//! is the only entry point most callers need.

use std::io::{Read, Write};
use std::sync::Arc;

use crate::codec::CodecCache;
use crate::decoder::{Decoder, FramedDecoder, UnframedDecoder};
use crate::encoder::{Encoder, FramedEncoder, UnframedEncoder};
use crate::error::Error;
use crate::framing;
use crate::generic;
use crate::iter::binary::BufferIterator as BinaryBufferIterator;
use crate::iter::binary::StreamingIterator as BinaryStreamingIterator;
use crate::iter::compact::BufferIterator as CompactBufferIterator;
use crate::iter::TokenIterator;
use crate::stream::binary::BufferStream as BinaryBufferStream;
use crate::stream::compact::BufferStream as CompactBufferStream;
use crate::stream::TokenStream;
use crate::value::Message;

/// Wire protocol. The compact protocol has no [`StreamingIterator`]-style
/// reader in this crate (see [`DispatchStrategy`] and the unframed+compact
/// rejection in [`Config::freeze`]); every caller that needs unframed compact
/// reads must buffer the message itself first.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Protocol {
	Binary,
	Compact,
}

/// Which mechanism resolves a Rust type to its codec. Both end up sharing one
/// [`CodecCache`]; the difference is only whether a lookup is allowed to
/// populate the cache lazily (`Reflective`) or must find an entry someone
/// already registered via [`FrozenConfig::prewarm`] (`Precompiled`).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum DispatchStrategy {
	#[default]
	Reflective,
	Precompiled,
}

/// Builder for a [`FrozenConfig`]. Mutating a `Config` after freezing it has
/// no effect on configs already frozen from it — each [`Config::freeze`] call
/// produces an independent, immutable snapshot.
#[derive(Debug, Clone)]
pub struct Config {
	pub protocol: Protocol,
	pub framed: bool,
	pub dispatch: DispatchStrategy,
	/// Upper bound on a single frame's declared length, enforced before the
	/// payload is allocated.
	pub max_frame_len: usize,
}

impl Default for Config {
	fn default() -> Self {
		Self { protocol: Protocol::Binary, framed: false, dispatch: DispatchStrategy::Reflective, max_frame_len: 16 * 1024 * 1024 }
	}
}

impl Config {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn protocol(mut self, protocol: Protocol) -> Self {
		self.protocol = protocol;
		self
	}

	pub fn framed(mut self, framed: bool) -> Self {
		self.framed = framed;
		self
	}

	pub fn dispatch(mut self, dispatch: DispatchStrategy) -> Self {
		self.dispatch = dispatch;
		self
	}

	pub fn max_frame_len(mut self, max_frame_len: usize) -> Self {
		self.max_frame_len = max_frame_len;
		self
	}

	/// Validates the combination and produces an immutable, shareable config.
	/// Unframed compact reads require the whole message resident up front
	/// (the compact protocol's delta-encoded field ids can only be decoded in
	/// the forward direction this crate's streaming reader doesn't support
	/// for them), so that combination is rejected here rather than failing
	/// confusingly on first use.
	pub fn freeze(self) -> Result<FrozenConfig, Error> {
		if !self.framed && self.protocol == Protocol::Compact {
			return Err(Error::ConfigConflict("unframed transport is not supported for the compact protocol"));
		}
		Ok(FrozenConfig { inner: Arc::new(Inner { config: self, cache: CodecCache::new() }) })
	}
}

#[derive(Debug)]
struct Inner {
	config: Config,
	cache: CodecCache,
}

/// Cheaply `Clone`-able handle sharing one [`CodecCache`] and one validated
/// [`Config`]. Safe to hand to multiple threads: every read goes through
/// `ArcSwap` inside the cache, and nothing here is mutated after `freeze`.
#[derive(Debug, Clone)]
pub struct FrozenConfig {
	inner: Arc<Inner>,
}

impl FrozenConfig {
	pub fn config(&self) -> &Config {
		&self.inner.config
	}

	pub fn cache(&self) -> &CodecCache {
		&self.inner.cache
	}

	/// Registers `T`'s codec ahead of time. Required before
	/// [`DispatchStrategy::Precompiled`] configs can decode/encode `T`; a
	/// no-op (besides the registration itself) under
	/// [`DispatchStrategy::Reflective`], which would have populated the same
	/// entry lazily on first use anyway.
	pub fn prewarm<T>(&self)
	where
		T: crate::codec::ThriftDecode + crate::codec::ThriftEncode + Send + Sync + 'static,
	{
		self.inner.cache.prewarm::<T>();
	}

	pub(crate) fn require_registered<T: 'static>(&self) -> Result<(), Error> {
		if self.inner.config.dispatch == DispatchStrategy::Precompiled && !self.inner.cache.contains::<T>() {
			return Err(Error::ConfigConflict("type has no precompiled codec registered; call FrozenConfig::prewarm first"));
		}
		Ok(())
	}

	/// Rejects callers that try to declare a precompiled codec against a
	/// config that will happily build one reflectively anyway.
	fn require_precompiled(&self) -> Result<(), Error> {
		if self.inner.config.dispatch != DispatchStrategy::Precompiled {
			return Err(Error::ConfigConflict("prewarm declarations require a precompiled-dispatch config"));
		}
		Ok(())
	}

	/// Decodes one value of `T` out of `buf`, honoring `framed`.
	#[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
	pub fn unmarshal<T>(&self, buf: &[u8]) -> Result<T, Error>
	where
		T: crate::codec::ThriftDecode + crate::codec::ThriftEncode + Send + Sync + 'static,
	{
		if buf.is_empty() {
			return Err(Error::EmptyInput);
		}
		self.require_registered::<T>()?;
		let payload;
		let body = if self.inner.config.framed {
			let (frame, _rest) = framing::split_frame(buf, self.inner.config.max_frame_len)?;
			payload = frame;
			payload
		} else {
			buf
		};
		let mut iter = self.new_iterator(body);
		self.inner.cache.decode(&mut *iter)
	}

	/// Encodes `value` into a fresh buffer, honoring `framed`.
	#[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
	pub fn marshal<T>(&self, value: &T) -> Result<Vec<u8>, Error>
	where
		T: crate::codec::ThriftDecode + crate::codec::ThriftEncode + Send + Sync + 'static,
	{
		self.require_registered::<T>()?;
		let mut stream = self.new_stream();
		self.inner.cache.encode(value, &mut *stream)?;
		if self.inner.config.framed {
			let mut framed = Vec::with_capacity(stream.buffer().len() + 4);
			framing::write_frame(&mut framed, stream.buffer())?;
			Ok(framed)
		} else {
			Ok(stream.buffer().to_vec())
		}
	}

	/// A borrowed-buffer token iterator over `data` for the configured protocol.
	pub fn new_iterator<'a>(&self, data: &'a [u8]) -> Box<dyn TokenIterator + 'a> {
		match self.inner.config.protocol {
			Protocol::Binary => Box::new(BinaryBufferIterator::new(data)),
			Protocol::Compact => Box::new(CompactBufferIterator::new(data)),
		}
	}

	/// A growable-buffer token stream for the configured protocol.
	pub fn new_stream(&self) -> Box<dyn TokenStream> {
		match self.inner.config.protocol {
			Protocol::Binary => Box::new(BinaryBufferStream::new()),
			Protocol::Compact => Box::new(CompactBufferStream::new()),
		}
	}

	/// A reader-backed token iterator. Only the binary protocol supports
	/// unframed streaming reads (see [`Config::freeze`]); this is unreachable
	/// for compact configs since `freeze` already rejected unframed compact.
	pub fn new_reader_iterator<R: Read>(&self, reader: R, read_buf: Vec<u8>) -> BinaryStreamingIterator<R> {
		debug_assert_eq!(self.inner.config.protocol, Protocol::Binary);
		BinaryStreamingIterator::new(reader, read_buf)
	}

	/// A message-framing decoder over `reader`: one call per message.
	pub fn new_decoder<R: Read>(&self, reader: R) -> Decoder<R> {
		if self.inner.config.framed {
			Decoder::Framed(FramedDecoder::new(reader, self.clone()))
		} else {
			Decoder::Unframed(UnframedDecoder::new(reader, self.clone()))
		}
	}

	/// A message-framing encoder over `writer`: one call per message.
	pub fn new_encoder<W: Write>(&self, writer: W) -> Encoder<W> {
		if self.inner.config.framed {
			Encoder::Framed(FramedEncoder::new(writer, self.clone()))
		} else {
			Encoder::Unframed(UnframedEncoder::new(writer, self.clone()))
		}
	}

	/// Decodes a full [`Message`] (header + struct body) from `buf`.
	pub fn unmarshal_message(&self, buf: &[u8]) -> Result<Message, Error> {
		if buf.is_empty() {
			return Err(Error::EmptyInput);
		}
		let payload;
		let body = if self.inner.config.framed {
			let (frame, _rest) = framing::split_frame(buf, self.inner.config.max_frame_len)?;
			payload = frame;
			payload
		} else {
			buf
		};
		let mut iter = self.new_iterator(body);
		generic::decode_message(&mut *iter)
	}

	/// Encodes a full [`Message`] into a fresh buffer.
	pub fn marshal_message(&self, message: &Message) -> Result<Vec<u8>, Error> {
		let mut stream = self.new_stream();
		generic::encode_message(&mut *stream, message)?;
		if self.inner.config.framed {
			let mut framed = Vec::with_capacity(stream.buffer().len() + 4);
			framing::write_frame(&mut framed, stream.buffer())?;
			Ok(framed)
		} else {
			Ok(stream.buffer().to_vec())
		}
	}

	/// Pre-registers `T` for buffer-backed decoding. Only meaningful for a
	/// [`DispatchStrategy::Precompiled`] config, since a reflective one would
	/// populate the same entry lazily on first use; calling this against a
	/// reflective config is a [`Error::ConfigConflict`].
	pub fn will_decode_from_buffer<T>(&self) -> Result<(), Error>
	where
		T: crate::codec::ThriftDecode + crate::codec::ThriftEncode + Send + Sync + 'static,
	{
		self.require_precompiled()?;
		self.inner.cache.prewarm::<T>();
		Ok(())
	}

	/// Same as [`FrozenConfig::will_decode_from_buffer`] but documents intent
	/// for reader-backed sources; both share the same cache so there is no
	/// behavioral difference today.
	pub fn will_decode_from_reader<T>(&self) -> Result<(), Error>
	where
		T: crate::codec::ThriftDecode + crate::codec::ThriftEncode + Send + Sync + 'static,
	{
		self.will_decode_from_buffer::<T>()
	}

	/// Pre-registers `T` for encoding. See
	/// [`FrozenConfig::will_decode_from_buffer`]; same precompiled-only rule.
	pub fn will_encode<T>(&self) -> Result<(), Error>
	where
		T: crate::codec::ThriftDecode + crate::codec::ThriftEncode + Send + Sync + 'static,
	{
		self.require_precompiled()?;
		self.inner.cache.prewarm::<T>();
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn unframed_compact_is_rejected() {
		let err = Config::new().protocol(Protocol::Compact).framed(false).freeze().unwrap_err();
		assert!(matches!(err, Error::ConfigConflict(_)));
	}

	#[test]
	fn framed_compact_round_trips() {
		let cfg = Config::new().protocol(Protocol::Compact).framed(true).freeze().unwrap();
		let bytes = cfg.marshal(&99i32).unwrap();
		let decoded: i32 = cfg.unmarshal(&bytes).unwrap();
		assert_eq!(decoded, 99);
	}

	#[test]
	fn unframed_binary_round_trips() {
		let cfg = Config::new().freeze().unwrap();
		let bytes = cfg.marshal(&"hello".to_string()).unwrap();
		let decoded: String = cfg.unmarshal(&bytes).unwrap();
		assert_eq!(decoded, "hello");
	}

	#[test]
	fn empty_input_is_rejected() {
		let cfg = Config::new().freeze().unwrap();
		let err = cfg.unmarshal::<i32>(&[]).unwrap_err();
		assert!(matches!(err, Error::EmptyInput));
	}

	#[test]
	fn precompiled_requires_prewarm() {
		let cfg = Config::new().dispatch(DispatchStrategy::Precompiled).freeze().unwrap();
		let bytes = Config::new().freeze().unwrap().marshal(&7i32).unwrap();
		assert!(matches!(cfg.unmarshal::<i32>(&bytes), Err(Error::ConfigConflict(_))));
		cfg.prewarm::<i32>();
		assert_eq!(cfg.unmarshal::<i32>(&bytes).unwrap(), 7);
	}

	#[test]
	fn will_declarations_reject_reflective_config() {
		let cfg = Config::new().freeze().unwrap();
		assert!(matches!(cfg.will_decode_from_buffer::<i32>(), Err(Error::ConfigConflict(_))));
		assert!(matches!(cfg.will_decode_from_reader::<i32>(), Err(Error::ConfigConflict(_))));
		assert!(matches!(cfg.will_encode::<i32>(), Err(Error::ConfigConflict(_))));
	}

	#[test]
	fn will_declarations_prewarm_precompiled_config() {
		let cfg = Config::new().dispatch(DispatchStrategy::Precompiled).freeze().unwrap();
		cfg.will_decode_from_buffer::<i32>().unwrap();
		cfg.will_encode::<i32>().unwrap();
		assert!(cfg.cache().contains::<i32>());
	}
}
