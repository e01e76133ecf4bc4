use serde::{Deserialize, Serialize};

use crate::marshal::{Buffer, MarshalError, NativeValue, Result};

/// Byte order of multi-byte scalars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endianness {
	/// Least significant byte first.
	Little,
	/// Most significant byte first.
	Big,
}

impl Endianness {
	/// Byte order of the host.
	pub fn native() -> Self {
		if cfg!(target_endian = "big") { Self::Big } else { Self::Little }
	}

	/// Stable lowercase label.
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Little => "little",
			Self::Big => "big",
		}
	}
}

/// Interpretation of a numeric type's bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumericCategory {
	/// Two's-complement signed integer.
	Sint,
	/// Unsigned integer.
	Uint,
	/// IEEE-754 floating point.
	Float,
}

impl NumericCategory {
	/// Stable lowercase label.
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Sint => "sint",
			Self::Uint => "uint",
			Self::Float => "float",
		}
	}
}

/// Resolved binary codec of a scalar: width, category, and byte order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PackCode {
	width: usize,
	category: NumericCategory,
	endianness: Endianness,
}

impl PackCode {
	/// Select the codec for a scalar description, rejecting combinations without one.
	pub fn resolve(type_name: &str, size: usize, category: NumericCategory, endianness: Endianness) -> Result<Self> {
		let supported = match category {
			NumericCategory::Sint | NumericCategory::Uint => matches!(size, 1 | 2 | 4 | 8),
			NumericCategory::Float => matches!(size, 4 | 8),
		};
		if !supported {
			return Err(MarshalError::UnsupportedEncoding {
				type_name: type_name.to_owned(),
				size,
				category: category.as_str(),
			});
		}
		Ok(Self { width: size, category, endianness })
	}

	/// Encoded width in bytes.
	pub fn width(self) -> usize {
		self.width
	}

	/// Numeric interpretation.
	pub fn category(self) -> NumericCategory {
		self.category
	}

	/// Byte order.
	pub fn endianness(self) -> Endianness {
		self.endianness
	}

	/// Decode the scalar stored at `offset`.
	pub fn decode(self, buffer: &Buffer, offset: usize) -> Result<NativeValue> {
		let raw = buffer.read_uint(offset, self.width, self.endianness)?;
		Ok(match self.category {
			NumericCategory::Sint => NativeValue::I64(sign_extend(raw, self.width)),
			NumericCategory::Uint => NativeValue::U64(raw),
			NumericCategory::Float if self.width == 4 => NativeValue::F64(f64::from(f32::from_bits(raw as u32))),
			NumericCategory::Float => NativeValue::F64(f64::from_bits(raw)),
		})
	}

	/// Decode the scalar at `offset` as a signed integer, as enums store their values.
	pub(crate) fn decode_i64(self, buffer: &Buffer, offset: usize) -> Result<i64> {
		let raw = buffer.read_uint(offset, self.width, self.endianness)?;
		Ok(match self.category {
			NumericCategory::Uint => raw as i64,
			_ => sign_extend(raw, self.width),
		})
	}

	/// Encode `value` at `offset`, checking that it fits the width first.
	pub fn encode(self, type_name: &str, buffer: &Buffer, offset: usize, value: &NativeValue) -> Result<()> {
		buffer.check(offset, self.width)?;
		let raw = match self.category {
			NumericCategory::Float => {
				let float = match value {
					NativeValue::F64(v) => *v,
					NativeValue::I64(v) => *v as f64,
					NativeValue::U64(v) => *v as f64,
					other => return Err(mismatch(type_name, "a number", other)),
				};
				if self.width == 4 {
					u64::from((float as f32).to_bits())
				} else {
					float.to_bits()
				}
			}
			NumericCategory::Sint | NumericCategory::Uint => {
				let int = match value {
					NativeValue::I64(v) => i128::from(*v),
					NativeValue::U64(v) => i128::from(*v),
					NativeValue::Bool(v) => i128::from(*v),
					other => return Err(mismatch(type_name, "an integer", other)),
				};
				self.check_range(type_name, int)?;
				int as u64
			}
		};
		buffer.write_uint(offset, self.width, raw, self.endianness)
	}

	pub(crate) fn check_range(self, type_name: &str, value: i128) -> Result<()> {
		let bits = (self.width * 8) as u32;
		let (min, max) = match self.category {
			NumericCategory::Sint => (-(1_i128 << (bits - 1)), (1_i128 << (bits - 1)) - 1),
			_ => (0, (1_i128 << bits) - 1),
		};
		if value < min || value > max {
			return Err(MarshalError::ValueOutOfRange {
				type_name: type_name.to_owned(),
				value: value.to_string(),
			});
		}
		Ok(())
	}
}

/// Static description of a numeric type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NumericType {
	pack: PackCode,
}

impl NumericType {
	/// Describe a numeric type; fails when no codec exists for the combination.
	pub fn new(type_name: &str, category: NumericCategory, size: usize, endianness: Endianness) -> Result<Self> {
		Ok(Self {
			pack: PackCode::resolve(type_name, size, category, endianness)?,
		})
	}

	/// Resolved codec.
	pub fn pack_code(&self) -> PackCode {
		self.pack
	}

	/// Byte width.
	pub fn size(&self) -> usize {
		self.pack.width
	}

	/// Numeric interpretation.
	pub fn category(&self) -> NumericCategory {
		self.pack.category
	}
}

fn sign_extend(raw: u64, width: usize) -> i64 {
	let shift = 64 - (width as u32) * 8;
	((raw << shift) as i64) >> shift
}

fn mismatch(type_name: &str, expected: &'static str, got: &NativeValue) -> MarshalError {
	MarshalError::NativeMismatch {
		type_name: type_name.to_owned(),
		expected,
		got: got.kind_name().to_owned(),
	}
}
