use std::io::Read;

use tracing::debug;

use crate::marshal::{MarshalError, Result};

const MAX_DECOMPRESSED_BYTES: usize = 512 * 1024 * 1024;
/// zstd frame magic.
pub const ZSTD_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];

/// Compression mode of a value file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
	/// Raw serialized bytes.
	#[default]
	None,
	/// zstd-compressed serialized bytes.
	Zstd,
}

impl Compression {
	/// Render compression mode as a stable lowercase label.
	pub fn as_str(self) -> &'static str {
		match self {
			Self::None => "none",
			Self::Zstd => "zstd",
		}
	}
}

/// Detect and decode compression, returning `(mode, decoded_bytes)`.
///
/// Raw values may start with the zstd magic too, so bytes that carry it but do
/// not decode as a frame are returned unchanged.
pub fn decode_bytes(raw: Vec<u8>) -> Result<(Compression, Vec<u8>)> {
	if raw.starts_with(&ZSTD_MAGIC) {
		match decode_zstd(&raw) {
			Ok(out) => return Ok((Compression::Zstd, out)),
			Err(MarshalError::Io(err)) => debug!(error = %err, len = raw.len(), "zstd magic without a valid frame, reading raw bytes"),
			Err(err) => return Err(err),
		}
	}
	Ok((Compression::None, raw))
}

/// Encode serialized bytes with `compression`.
pub fn encode_bytes(bytes: Vec<u8>, compression: Compression, level: i32) -> Result<Vec<u8>> {
	match compression {
		Compression::None => Ok(bytes),
		Compression::Zstd => Ok(zstd::stream::encode_all(bytes.as_slice(), level)?),
	}
}

fn decode_zstd(raw: &[u8]) -> Result<Vec<u8>> {
	let mut decoder = zstd::stream::read::Decoder::new(raw)?;
	let mut out = Vec::new();
	let mut buf = [0_u8; 8192];

	loop {
		let read = decoder.read(&mut buf)?;
		if read == 0 {
			break;
		}

		if out.len() + read > MAX_DECOMPRESSED_BYTES {
			return Err(MarshalError::DecompressedTooLarge { limit: MAX_DECOMPRESSED_BYTES });
		}

		out.extend_from_slice(&buf[..read]);
	}

	Ok(out)
}

#[cfg(test)]
mod tests {
	use super::{Compression, ZSTD_MAGIC, decode_bytes, encode_bytes};

	#[test]
	fn raw_bytes_pass_through() {
		let (mode, bytes) = decode_bytes(vec![1, 2, 3]).expect("raw");
		assert_eq!(mode, Compression::None);
		assert_eq!(bytes, vec![1, 2, 3]);
	}

	#[test]
	fn zstd_frames_are_detected() {
		let payload = vec![7_u8; 4096];
		let packed = encode_bytes(payload.clone(), Compression::Zstd, 3).expect("compress");
		assert!(packed.starts_with(&ZSTD_MAGIC));
		assert!(packed.len() < payload.len());

		let (mode, bytes) = decode_bytes(packed).expect("decompress");
		assert_eq!(mode, Compression::Zstd);
		assert_eq!(bytes, payload);
	}

	#[test]
	fn magic_without_a_frame_is_read_raw() {
		let raw = 0xFD2F_B528_u32.to_le_bytes().to_vec();
		assert!(raw.starts_with(&ZSTD_MAGIC));
		let (mode, bytes) = decode_bytes(raw.clone()).expect("raw fallback");
		assert_eq!(mode, Compression::None);
		assert_eq!(bytes, raw);

		let mut packed = encode_bytes(vec![1_u8; 1024], Compression::Zstd, 3).expect("compress");
		packed.truncate(packed.len() / 2);
		let (mode, bytes) = decode_bytes(packed.clone()).expect("truncated frame read raw");
		assert_eq!(mode, Compression::None);
		assert_eq!(bytes, packed);
	}
}
