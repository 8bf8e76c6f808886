use std::fmt::{Debug, Display, Formatter};

use crate::ttype::TType;

/// Tag-level error taxonomy for the protocol engine.
///
/// Every token-level operation returns `Result<T, Error>`; the iterators and
/// streams additionally latch the first error they produce into a sticky
/// internal field (see [`crate::iter::TokenIterator::error`] and
/// [`crate::stream::TokenStream::error`]) so callers driving a generic decode
/// need not check after every single token.
#[derive(Debug)]
pub enum Error {
	/// Input exhausted mid-token.
	PrematureEOF,
	/// Header magic or version byte unrecognized.
	UnsupportedProtocol(&'static str),
	/// A token's type tag did not match the caller's expectation.
	UnexpectedTag { expected: TType, found: TType },
	/// A container's declared length was negative or exceeded the remaining input.
	ContainerCountInvalid(i64),
	/// A framed length exceeded the configured cap.
	FrameTooLarge { declared: usize, cap: usize },
	/// The underlying reader/writer failed.
	IOError(std::io::Error),
	/// Both the reflective and precompiled dispatch strategies were requested at once.
	ConfigConflict(&'static str),
	/// `unmarshal` was called with no input bytes.
	EmptyInput,
}

impl Display for Error {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::PrematureEOF => write!(f, "premature end of input"),
			Self::UnsupportedProtocol(why) => write!(f, "unsupported protocol: {why}"),
			Self::UnexpectedTag { expected, found } => {
				write!(f, "unexpected tag: expected {expected:?}, found {found:?}")
			},
			Self::ContainerCountInvalid(n) => write!(f, "invalid container count: {n}"),
			Self::FrameTooLarge { declared, cap } => {
				write!(f, "frame length {declared} exceeds cap of {cap} bytes")
			},
			Self::IOError(err) => write!(f, "io error: {err}"),
			Self::ConfigConflict(why) => write!(f, "config conflict: {why}"),
			Self::EmptyInput => write!(f, "empty input"),
		}
	}
}

impl std::error::Error for Error {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		match self {
			Self::IOError(err) => Some(err),
			_ => None,
		}
	}
}

impl From<std::io::Error> for Error {
	fn from(value: std::io::Error) -> Self {
		match value.kind() {
			std::io::ErrorKind::UnexpectedEof => Self::PrematureEOF,
			_ => Self::IOError(value),
		}
	}
}

impl Clone for Error {
	fn clone(&self) -> Self {
		match self {
			Self::PrematureEOF => Self::PrematureEOF,
			Self::UnsupportedProtocol(why) => Self::UnsupportedProtocol(why),
			Self::UnexpectedTag { expected, found } => Self::UnexpectedTag { expected: *expected, found: *found },
			Self::ContainerCountInvalid(n) => Self::ContainerCountInvalid(*n),
			Self::FrameTooLarge { declared, cap } => Self::FrameTooLarge { declared: *declared, cap: *cap },
			Self::IOError(err) => Self::IOError(std::io::Error::new(err.kind(), err.to_string())),
			Self::ConfigConflict(why) => Self::ConfigConflict(why),
			Self::EmptyInput => Self::EmptyInput,
		}
	}
}
