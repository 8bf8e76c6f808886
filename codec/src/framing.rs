//! Length-prefixed framing: a 4-byte big-endian byte count in front of an
//! otherwise-ordinary message. Used when [`crate::config::Config::framed`] is
//! set; both protocols frame identically since framing wraps the whole
//! message rather than any protocol-specific token.

use std::io::{Read, Write};

use crate::error::Error;

/// Reads one frame's length prefix and payload from `reader`, rejecting a
/// declared length over `cap` before any allocation happens.
#[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
pub fn read_frame<R: Read>(reader: &mut R, cap: usize) -> Result<Vec<u8>, Error> {
	let mut len_buf = [0u8; 4];
	reader.read_exact(&mut len_buf)?;
	let len = u32::from_be_bytes(len_buf) as usize;
	if len == 0 {
		return Err(Error::UnsupportedProtocol("zero-length frame"));
	}
	if len > cap {
		return Err(Error::FrameTooLarge { declared: len, cap });
	}
	let mut payload = vec![0u8; len];
	reader.read_exact(&mut payload)?;
	Ok(payload)
}

/// Splits a single frame off the front of `buf`, returning `(payload, rest)`.
/// Used by the buffer-oriented decode path, which never touches [`Read`].
pub fn split_frame(buf: &[u8], cap: usize) -> Result<(&[u8], &[u8]), Error> {
	if buf.len() < 4 {
		return Err(Error::PrematureEOF);
	}
	let len = u32::from_be_bytes(buf[..4].try_into().unwrap()) as usize;
	if len == 0 {
		return Err(Error::UnsupportedProtocol("zero-length frame"));
	}
	if len > cap {
		return Err(Error::FrameTooLarge { declared: len, cap });
	}
	let end = 4 + len;
	let framed = buf.get(4..end).ok_or(Error::PrematureEOF)?;
	Ok((framed, &buf[end..]))
}

/// Writes a frame's length prefix followed by `payload`.
#[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
pub fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> Result<(), Error> {
	let len = u32::try_from(payload.len())
		.map_err(|_| Error::FrameTooLarge { declared: payload.len(), cap: u32::MAX as usize })?;
	writer.write_all(&len.to_be_bytes())?;
	writer.write_all(payload)?;
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn split_frame_round_trips() {
		let mut buf = Vec::new();
		write_frame(&mut buf, b"hello").unwrap();
		buf.extend_from_slice(b"trailing");
		let (frame, rest) = split_frame(&buf, 1024).unwrap();
		assert_eq!(frame, b"hello");
		assert_eq!(rest, b"trailing");
	}

	#[test]
	fn oversized_frame_rejected_before_allocation() {
		let mut buf = Vec::new();
		buf.extend_from_slice(&1_000_000u32.to_be_bytes());
		let err = split_frame(&buf, 16).unwrap_err();
		assert!(matches!(err, Error::FrameTooLarge { declared: 1_000_000, cap: 16 }));
	}

	#[test]
	fn zero_length_frame_rejected() {
		let mut buf = Vec::new();
		buf.extend_from_slice(&0u32.to_be_bytes());
		assert!(matches!(split_frame(&buf, 16), Err(Error::UnsupportedProtocol(_))));
	}
}
