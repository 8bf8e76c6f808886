//! The mapped-object layer: [`ThriftDecode`]/[`ThriftEncode`] are the traits a
//! codegen'd struct would implement (generating that code is out of scope
//! here; this crate only consumes the interface). [`CodecCache`] is the
//! concurrent type-keyed dispatch table shared by both the reflective and
//! precompiled strategies described in [`crate::config`].

use std::any::{Any, TypeId};
use std::sync::Arc;

use arc_swap::ArcSwap;
use derivative::Derivative;
use fxhash::{FxHashMap, FxHashSet};

use crate::error::Error;
use crate::generic;
use crate::iter::TokenIterator;
use crate::stream::TokenStream;
use crate::ttype::TType;
use crate::value::StructValue;

/// A type whose values can be pulled out of a token stream without the
/// caller naming its wire shape at the call site.
pub trait ThriftDecode: Sized {
	const TTYPE: TType;
	fn decode(iter: &mut dyn TokenIterator) -> Result<Self, Error>;
}

/// The write-side mirror of [`ThriftDecode`].
pub trait ThriftEncode {
	const TTYPE: TType;
	fn encode(&self, stream: &mut dyn TokenStream) -> Result<(), Error>;
}

macro_rules! impl_scalar_codec {
	($ty: ty, $ttype: expr, $read: ident, $write: ident) => {
		impl ThriftDecode for $ty {
			const TTYPE: TType = $ttype;
			fn decode(iter: &mut dyn TokenIterator) -> Result<Self, Error> {
				iter.$read()
			}
		}

		impl ThriftEncode for $ty {
			const TTYPE: TType = $ttype;
			fn encode(&self, stream: &mut dyn TokenStream) -> Result<(), Error> {
				stream.$write(*self)
			}
		}
	};
}

impl_scalar_codec!(bool, TType::Bool, read_bool, write_bool);
impl_scalar_codec!(i8, TType::I8, read_i8, write_i8);
impl_scalar_codec!(i16, TType::I16, read_i16, write_i16);
impl_scalar_codec!(i32, TType::I32, read_i32, write_i32);
impl_scalar_codec!(i64, TType::I64, read_i64, write_i64);
impl_scalar_codec!(f64, TType::Double, read_double, write_double);

impl ThriftDecode for String {
	const TTYPE: TType = TType::String;
	fn decode(iter: &mut dyn TokenIterator) -> Result<Self, Error> {
		iter.read_string()
	}
}

impl ThriftEncode for String {
	const TTYPE: TType = TType::String;
	fn encode(&self, stream: &mut dyn TokenStream) -> Result<(), Error> {
		stream.write_string(self)
	}
}

/// Newtype around a byte blob, so it can carry its own `ThriftDecode`/
/// `ThriftEncode` impl without colliding with the blanket `Vec<T>` impl
/// below (`u8` itself is not `ThriftDecode`, so that collision can't
/// actually happen, but the distinct wire meaning — one length-prefixed
/// blob vs. a list of bytes — still deserves its own type).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Binary(pub Vec<u8>);

impl ThriftDecode for Binary {
	const TTYPE: TType = TType::String;
	fn decode(iter: &mut dyn TokenIterator) -> Result<Self, Error> {
		Ok(Binary(iter.read_binary()?))
	}
}

impl ThriftEncode for Binary {
	const TTYPE: TType = TType::String;
	fn encode(&self, stream: &mut dyn TokenStream) -> Result<(), Error> {
		stream.write_binary(&self.0)
	}
}

impl<T: ThriftDecode> ThriftDecode for Vec<T> {
	const TTYPE: TType = TType::List;
	fn decode(iter: &mut dyn TokenIterator) -> Result<Self, Error> {
		let (_elem_ty, count) = iter.read_list_header()?;
		let mut out = Vec::with_capacity(count.min(4096));
		for _ in 0..count {
			out.push(T::decode(iter)?);
		}
		Ok(out)
	}
}

impl<T: ThriftEncode> ThriftEncode for Vec<T> {
	const TTYPE: TType = TType::List;
	fn encode(&self, stream: &mut dyn TokenStream) -> Result<(), Error> {
		stream.write_list_header(T::TTYPE, self.len())?;
		for item in self {
			item.encode(stream)?;
		}
		Ok(())
	}
}

impl<T: ThriftDecode + Eq + std::hash::Hash> ThriftDecode for FxHashSet<T> {
	const TTYPE: TType = TType::Set;
	fn decode(iter: &mut dyn TokenIterator) -> Result<Self, Error> {
		let (_elem_ty, count) = iter.read_set_header()?;
		let mut out = FxHashSet::with_capacity_and_hasher(count.min(4096), Default::default());
		for _ in 0..count {
			out.insert(T::decode(iter)?);
		}
		Ok(out)
	}
}

impl<T: ThriftEncode> ThriftEncode for FxHashSet<T> {
	const TTYPE: TType = TType::Set;
	fn encode(&self, stream: &mut dyn TokenStream) -> Result<(), Error> {
		stream.write_set_header(T::TTYPE, self.len())?;
		for item in self {
			item.encode(stream)?;
		}
		Ok(())
	}
}

impl<K: ThriftDecode + Eq + std::hash::Hash, V: ThriftDecode> ThriftDecode for FxHashMap<K, V> {
	const TTYPE: TType = TType::Map;
	fn decode(iter: &mut dyn TokenIterator) -> Result<Self, Error> {
		let (_key_ty, _val_ty, count) = iter.read_map_header()?;
		let mut out = FxHashMap::with_capacity_and_hasher(count.min(4096), Default::default());
		for _ in 0..count {
			let key = K::decode(iter)?;
			let val = V::decode(iter)?;
			out.insert(key, val);
		}
		Ok(out)
	}
}

impl<K: ThriftEncode, V: ThriftEncode> ThriftEncode for FxHashMap<K, V> {
	const TTYPE: TType = TType::Map;
	fn encode(&self, stream: &mut dyn TokenStream) -> Result<(), Error> {
		stream.write_map_header(K::TTYPE, V::TTYPE, self.len())?;
		for (key, val) in self {
			key.encode(stream)?;
			val.encode(stream)?;
		}
		Ok(())
	}
}

impl ThriftDecode for StructValue {
	const TTYPE: TType = TType::Struct;
	fn decode(iter: &mut dyn TokenIterator) -> Result<Self, Error> {
		generic::decode_struct(iter)
	}
}

impl ThriftEncode for StructValue {
	const TTYPE: TType = TType::Struct;
	fn encode(&self, stream: &mut dyn TokenStream) -> Result<(), Error> {
		generic::encode_struct(stream, self)
	}
}

type BoxedAny = Box<dyn Any + Send + Sync>;
type DecodeThunk = Arc<dyn Fn(&mut dyn TokenIterator) -> Result<BoxedAny, Error> + Send + Sync>;
type EncodeThunk = Arc<dyn Fn(&(dyn Any + Send + Sync), &mut dyn TokenStream) -> Result<(), Error> + Send + Sync>;

fn decode_thunk<T: ThriftDecode + Send + Sync + 'static>() -> DecodeThunk {
	Arc::new(|iter| T::decode(iter).map(|v| Box::new(v) as BoxedAny))
}

fn encode_thunk<T: ThriftEncode + Send + Sync + 'static>() -> EncodeThunk {
	Arc::new(|value, stream| {
		let value = value.downcast_ref::<T>().expect("codec cache keyed by TypeId; downcast cannot fail");
		value.encode(stream)
	})
}

#[derive(Default, Clone)]
struct CacheSnapshot {
	decoders: FxHashMap<TypeId, DecodeThunk>,
	encoders: FxHashMap<TypeId, EncodeThunk>,
}

/// Lock-free, copy-on-write type -> codec dispatch table. Reads never block
/// writers and never block each other; a miss builds one new snapshot and
/// publishes it with a single compare-and-swap, so concurrent misses for
/// distinct types race to publish but never corrupt or lose an entry (see
/// [`arc_swap::ArcSwap::rcu`]).
///
/// This is what both dispatch strategies in [`crate::config::Config`] share:
/// reflective dispatch populates it lazily from the caller's static type
/// (the type parameter substitutes for the runtime type lookup a dynamic
/// host language would do here); precompiled dispatch populates it eagerly
/// via [`CodecCache::prewarm`] and then only ever reads.
#[derive(Derivative, Default)]
#[derivative(Debug)]
pub struct CodecCache {
	#[derivative(Debug = "ignore")]
	snapshot: ArcSwap<CacheSnapshot>,
}

impl CodecCache {
	pub fn new() -> Self {
		Self { snapshot: ArcSwap::from_pointee(CacheSnapshot::default()) }
	}

	/// Registers `T`'s codec ahead of time, so a later `decode_boxed`/
	/// `encode_boxed` on a precompiled-only config never has to build one.
	pub fn prewarm<T: ThriftDecode + ThriftEncode + Send + Sync + 'static>(&self) {
		let id = TypeId::of::<T>();
		self.snapshot.rcu(|current| {
			let mut next = (**current).clone();
			next.decoders.entry(id).or_insert_with(decode_thunk::<T>);
			next.encoders.entry(id).or_insert_with(encode_thunk::<T>);
			next
		});
	}

	pub fn contains<T: 'static>(&self) -> bool {
		let id = TypeId::of::<T>();
		let snapshot = self.snapshot.load();
		snapshot.decoders.contains_key(&id) && snapshot.encoders.contains_key(&id)
	}

	/// Looks up (lazily registering if absent) `T`'s decode thunk and runs it.
	pub fn decode<T: ThriftDecode + Send + Sync + 'static>(&self, iter: &mut dyn TokenIterator) -> Result<T, Error> {
		let id = TypeId::of::<T>();
		let thunk = match self.snapshot.load().decoders.get(&id) {
			Some(thunk) => thunk.clone(),
			None => {
				self.prewarm_decode_only::<T>();
				self.snapshot.load().decoders.get(&id).expect("just inserted").clone()
			},
		};
		let boxed = thunk(iter)?;
		Ok(*boxed.downcast::<T>().expect("codec cache keyed by TypeId; downcast cannot fail"))
	}

	/// Looks up (lazily registering if absent) `T`'s encode thunk and runs it.
	pub fn encode<T: ThriftEncode + Send + Sync + 'static>(&self, value: &T, stream: &mut dyn TokenStream) -> Result<(), Error> {
		let id = TypeId::of::<T>();
		let thunk = match self.snapshot.load().encoders.get(&id) {
			Some(thunk) => thunk.clone(),
			None => {
				let thunk = encode_thunk::<T>();
				self.snapshot.rcu(|current| {
					let mut next = (**current).clone();
					next.encoders.entry(id).or_insert_with(|| thunk.clone());
					next
				});
				self.snapshot.load().encoders.get(&id).expect("just inserted").clone()
			},
		};
		thunk(value, stream)
	}

	fn prewarm_decode_only<T: ThriftDecode + Send + Sync + 'static>(&self) {
		let id = TypeId::of::<T>();
		self.snapshot.rcu(|current| {
			let mut next = (**current).clone();
			next.decoders.entry(id).or_insert_with(decode_thunk::<T>);
			next
		});
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::iter::binary::BufferIterator;
	use crate::stream::binary::BufferStream;

	#[test]
	fn scalar_round_trips_through_cache() {
		let cache = CodecCache::new();
		let mut stream = BufferStream::new();
		cache.encode(&42i32, &mut stream).unwrap();
		let mut iter = BufferIterator::new(stream.buffer());
		let decoded: i32 = cache.decode(&mut iter).unwrap();
		assert_eq!(decoded, 42);
		assert!(cache.contains::<i32>());
	}

	#[test]
	fn prewarm_is_idempotent() {
		let cache = CodecCache::new();
		cache.prewarm::<i64>();
		cache.prewarm::<i64>();
		assert!(cache.contains::<i64>());
	}

	#[test]
	fn vec_and_map_compose() {
		let cache = CodecCache::new();
		let mut stream = BufferStream::new();
		let values: Vec<i32> = vec![1, 2, 3];
		cache.encode(&values, &mut stream).unwrap();
		let mut iter = BufferIterator::new(stream.buffer());
		let decoded: Vec<i32> = cache.decode(&mut iter).unwrap();
		assert_eq!(decoded, values);
	}
}
