use std::fs;
use std::path::Path;

use crate::marshal::compression::{decode_bytes, encode_bytes};
use crate::marshal::{Compression, LoadOptions, Result, TypeRef, Value};

/// Serialized form of one value as stored on disk.
pub struct ValueFile {
	/// Compression detected when the file was read.
	pub compression: Compression,
	bytes: Vec<u8>,
}

/// Settings for [`ValueFile::write`].
#[derive(Debug, Clone, Copy)]
pub struct WriteOptions {
	/// Output compression.
	pub compression: Compression,
	/// zstd level, ignored for uncompressed output.
	pub level: i32,
}

impl Default for WriteOptions {
	fn default() -> Self {
		Self {
			compression: Compression::None,
			level: 3,
		}
	}
}

impl WriteOptions {
	/// zstd output at the default level.
	pub fn zstd() -> Self {
		Self {
			compression: Compression::Zstd,
			..Self::default()
		}
	}
}

impl ValueFile {
	/// Read a file, decompressing zstd frames.
	pub fn open(path: impl AsRef<Path>) -> Result<Self> {
		let raw = fs::read(path)?;
		Self::from_raw(raw)
	}

	/// Wrap raw file contents, decompressing zstd frames.
	pub fn from_raw(raw: Vec<u8>) -> Result<Self> {
		let (compression, bytes) = decode_bytes(raw)?;
		Ok(Self { compression, bytes })
	}

	/// Decoded serialized bytes.
	pub fn bytes(&self) -> &[u8] {
		&self.bytes
	}

	/// Load the stored value as `ty`.
	pub fn load(&self, ty: &TypeRef, opt: &LoadOptions) -> Result<Value> {
		Value::from_bytes_with(ty, &self.bytes, opt)
	}

	/// Serialize `value` to `path`.
	pub fn write(path: impl AsRef<Path>, value: &Value, opt: WriteOptions) -> Result<()> {
		let bytes = encode_bytes(value.to_bytes()?, opt.compression, opt.level)?;
		fs::write(path, bytes)?;
		Ok(())
	}
}
