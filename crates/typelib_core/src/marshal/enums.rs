use std::collections::HashMap;

use crate::marshal::{Buffer, Endianness, MarshalError, NativeValue, NumericCategory, PackCode, Result};

/// Static description of an enumeration: a signed integer plus a symbol table.
///
/// The symbol table is metadata only. On the wire an enum is its integer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumType {
	pack: PackCode,
	symbols: Vec<(Box<str>, i64)>,
	by_symbol: HashMap<Box<str>, i64>,
	by_value: HashMap<i64, Box<str>>,
}

impl EnumType {
	/// Build the two lookup tables; symbols and values must both be unique and fit `size`.
	pub fn new<S: Into<Box<str>>>(type_name: &str, size: usize, endianness: Endianness, symbols: impl IntoIterator<Item = (S, i64)>) -> Result<Self> {
		let pack = PackCode::resolve(type_name, size, NumericCategory::Sint, endianness)?;
		let mut out = Self {
			pack,
			symbols: Vec::new(),
			by_symbol: HashMap::new(),
			by_value: HashMap::new(),
		};

		for (symbol, value) in symbols {
			let symbol = symbol.into();
			pack.check_range(type_name, i128::from(value))?;
			if out.by_symbol.contains_key(&symbol) {
				return Err(invalid(type_name, format!("duplicate symbol {symbol}")));
			}
			if let Some(previous) = out.by_value.get(&value) {
				return Err(invalid(type_name, format!("{symbol} and {previous} share value {value}")));
			}
			out.by_symbol.insert(symbol.clone(), value);
			out.by_value.insert(value, symbol.clone());
			out.symbols.push((symbol, value));
		}

		Ok(out)
	}

	/// Resolved integer codec.
	pub fn pack_code(&self) -> PackCode {
		self.pack
	}

	/// Byte width.
	pub fn size(&self) -> usize {
		self.pack.width()
	}

	/// Declared `(symbol, value)` pairs in declaration order.
	pub fn symbols(&self) -> &[(Box<str>, i64)] {
		&self.symbols
	}

	/// Integer for `symbol`.
	pub fn value_of(&self, symbol: &str) -> Option<i64> {
		self.by_symbol.get(symbol).copied()
	}

	/// Symbol for `value`.
	pub fn symbol_of(&self, value: i64) -> Option<&str> {
		self.by_value.get(&value).map(AsRef::as_ref)
	}

	/// Decode the symbol stored at `offset`.
	pub fn decode(&self, type_name: &str, buffer: &Buffer, offset: usize) -> Result<NativeValue> {
		let value = self.pack.decode_i64(buffer, offset)?;
		let symbol = self.symbol_of(value).ok_or_else(|| MarshalError::InvalidEnumValue {
			type_name: type_name.to_owned(),
			value: i128::from(value),
		})?;
		Ok(NativeValue::Symbol(symbol.into()))
	}

	/// Encode a symbol, or a declared integer, at `offset`.
	pub fn encode(&self, type_name: &str, buffer: &Buffer, offset: usize, value: &NativeValue) -> Result<()> {
		let raw = match value {
			NativeValue::Symbol(symbol) => self.value_of(symbol).ok_or_else(|| MarshalError::InvalidEnumSymbol {
				type_name: type_name.to_owned(),
				symbol: symbol.to_string(),
			})?,
			NativeValue::I64(v) => self.declared(type_name, *v)?,
			NativeValue::U64(v) => match i64::try_from(*v) {
				Ok(v) => self.declared(type_name, v)?,
				Err(_) => {
					return Err(MarshalError::InvalidEnumValue {
						type_name: type_name.to_owned(),
						value: i128::from(*v),
					});
				}
			},
			other => {
				return Err(MarshalError::NativeMismatch {
					type_name: type_name.to_owned(),
					expected: "a symbol",
					got: other.kind_name().to_owned(),
				});
			}
		};
		self.pack.encode(type_name, buffer, offset, &NativeValue::I64(raw))
	}

	fn declared(&self, type_name: &str, value: i64) -> Result<i64> {
		if self.by_value.contains_key(&value) {
			Ok(value)
		} else {
			Err(MarshalError::InvalidEnumValue {
				type_name: type_name.to_owned(),
				value: i128::from(value),
			})
		}
	}
}

fn invalid(type_name: &str, reason: String) -> MarshalError {
	MarshalError::InvalidDefinition {
		type_name: type_name.to_owned(),
		reason,
	}
}
