//! A Thrift wire-protocol codec: token-level iterators/streams for the
//! binary and compact protocols, a generic [`value::Value`] tree for
//! callers without a compile-time shape, and a mapped-object layer
//! ([`codec::ThriftDecode`]/[`codec::ThriftEncode`]) for callers with one.
//! [`config::Config`]/[`config::FrozenConfig`] wire all of it together behind
//! a single facade.

pub mod codec;
pub mod config;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod framing;
pub mod generic;
pub mod iter;
pub mod stream;
pub mod ttype;
pub mod value;

mod wire;

pub use codec::{Binary, ThriftDecode, ThriftEncode};
pub use config::{Config, DispatchStrategy, FrozenConfig, Protocol};
pub use decoder::Decoder;
pub use encoder::Encoder;
pub use error::Error;
pub use ttype::{FieldId, MsgType, TType};
pub use value::{Message, MessageHeader, RawMessage, StructValue, Value};
