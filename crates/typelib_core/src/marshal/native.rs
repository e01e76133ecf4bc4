use serde_json::{Map, Number, Value as JsonValue};

/// Native (host-side) form of a typed value.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeValue {
	/// Explicit null marker.
	Null,
	/// Boolean scalar.
	Bool(bool),
	/// Signed integer scalar.
	I64(i64),
	/// Unsigned integer scalar.
	U64(u64),
	/// Floating point scalar.
	F64(f64),
	/// Enumeration symbol.
	Symbol(Box<str>),
	/// Opaque byte payload.
	Bytes(Vec<u8>),
	/// Array or container elements.
	List(Vec<NativeValue>),
	/// Compound fields.
	Record(Record),
}

/// Compound value with field names preserved.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
	/// Compound type name, empty when unknown.
	pub type_name: Box<str>,
	/// Fields in declaration order.
	pub fields: Vec<NativeField>,
}

/// Named record field.
#[derive(Debug, Clone, PartialEq)]
pub struct NativeField {
	/// Field identifier.
	pub name: Box<str>,
	/// Field payload.
	pub value: NativeValue,
}

impl Record {
	/// Empty record without a type name.
	pub fn new() -> Self {
		Self::default()
	}

	/// Append a field, builder style.
	pub fn with(mut self, name: &str, value: impl Into<NativeValue>) -> Self {
		self.fields.push(NativeField {
			name: name.into(),
			value: value.into(),
		});
		self
	}

	/// Field payload by name.
	pub fn get(&self, name: &str) -> Option<&NativeValue> {
		self.fields.iter().find(|field| &*field.name == name).map(|field| &field.value)
	}
}

impl NativeValue {
	/// Stable label of the variant, used in error messages.
	pub fn kind_name(&self) -> &'static str {
		match self {
			Self::Null => "null",
			Self::Bool(_) => "bool",
			Self::I64(_) => "signed integer",
			Self::U64(_) => "unsigned integer",
			Self::F64(_) => "float",
			Self::Symbol(_) => "symbol",
			Self::Bytes(_) => "bytes",
			Self::List(_) => "list",
			Self::Record(_) => "record",
		}
	}

	/// Integer view, when lossless.
	pub fn as_i64(&self) -> Option<i64> {
		match self {
			Self::I64(v) => Some(*v),
			Self::U64(v) => i64::try_from(*v).ok(),
			_ => None,
		}
	}

	/// Float view of any number.
	pub fn as_f64(&self) -> Option<f64> {
		match self {
			Self::F64(v) => Some(*v),
			Self::I64(v) => Some(*v as f64),
			Self::U64(v) => Some(*v as f64),
			_ => None,
		}
	}

	/// Symbol text.
	pub fn as_symbol(&self) -> Option<&str> {
		match self {
			Self::Symbol(v) => Some(v),
			_ => None,
		}
	}

	/// List items.
	pub fn as_list(&self) -> Option<&[NativeValue]> {
		match self {
			Self::List(v) => Some(v),
			_ => None,
		}
	}

	/// Record fields.
	pub fn as_record(&self) -> Option<&Record> {
		match self {
			Self::Record(v) => Some(v),
			_ => None,
		}
	}

	/// Render as JSON. Records become objects, symbols strings, bytes integer arrays.
	pub fn to_json(&self) -> JsonValue {
		match self {
			Self::Null => JsonValue::Null,
			Self::Bool(v) => JsonValue::Bool(*v),
			Self::I64(v) => JsonValue::from(*v),
			Self::U64(v) => JsonValue::from(*v),
			Self::F64(v) => Number::from_f64(*v).map_or(JsonValue::Null, JsonValue::Number),
			Self::Symbol(v) => JsonValue::String(v.to_string()),
			Self::Bytes(v) => JsonValue::Array(v.iter().map(|byte| JsonValue::from(*byte)).collect()),
			Self::List(items) => JsonValue::Array(items.iter().map(Self::to_json).collect()),
			Self::Record(record) => {
				let mut out = Map::new();
				for field in &record.fields {
					out.insert(field.name.to_string(), field.value.to_json());
				}
				JsonValue::Object(out)
			}
		}
	}

	/// Parse a JSON document into the closest native shape.
	pub fn from_json(json: &JsonValue) -> Self {
		match json {
			JsonValue::Null => Self::Null,
			JsonValue::Bool(v) => Self::Bool(*v),
			JsonValue::Number(n) => {
				if let Some(v) = n.as_i64() {
					Self::I64(v)
				} else if let Some(v) = n.as_u64() {
					Self::U64(v)
				} else {
					Self::F64(n.as_f64().unwrap_or(f64::NAN))
				}
			}
			JsonValue::String(v) => Self::Symbol(v.as_str().into()),
			JsonValue::Array(items) => Self::List(items.iter().map(Self::from_json).collect()),
			JsonValue::Object(map) => Self::Record(Record {
				type_name: "".into(),
				fields: map
					.iter()
					.map(|(name, value)| NativeField {
						name: name.as_str().into(),
						value: Self::from_json(value),
					})
					.collect(),
			}),
		}
	}
}

impl From<i64> for NativeValue {
	fn from(value: i64) -> Self {
		Self::I64(value)
	}
}

impl From<i32> for NativeValue {
	fn from(value: i32) -> Self {
		Self::I64(i64::from(value))
	}
}

impl From<u64> for NativeValue {
	fn from(value: u64) -> Self {
		Self::U64(value)
	}
}

impl From<f64> for NativeValue {
	fn from(value: f64) -> Self {
		Self::F64(value)
	}
}

impl From<bool> for NativeValue {
	fn from(value: bool) -> Self {
		Self::Bool(value)
	}
}

impl From<&str> for NativeValue {
	fn from(value: &str) -> Self {
		Self::Symbol(value.into())
	}
}

impl From<Record> for NativeValue {
	fn from(value: Record) -> Self {
		Self::Record(value)
	}
}

impl<T: Into<NativeValue>> From<Vec<T>> for NativeValue {
	fn from(value: Vec<T>) -> Self {
		Self::List(value.into_iter().map(Into::into).collect())
	}
}
