use thiserror::Error;

/// Crate-local result type.
pub type Result<T> = std::result::Result<T, MarshalError>;

/// Errors produced while describing types and reading, writing, or relaying out values.
#[derive(Debug, Error)]
pub enum MarshalError {
	/// Filesystem or stream IO failure.
	#[error("io: {0}")]
	Io(#[from] std::io::Error),
	/// Schema document could not be parsed.
	#[error("schema: {0}")]
	Schema(#[from] serde_json::Error),
	/// Byte range falls outside a buffer.
	#[error("buffer range out of bounds: offset={offset}, size={size}, len={len}")]
	OutOfBounds {
		/// Requested start offset.
		offset: usize,
		/// Requested byte count.
		size: usize,
		/// Size of the addressed buffer.
		len: usize,
	},
	/// Element index falls outside a sequence.
	#[error("index {index} out of range for length {len}")]
	IndexOutOfRange {
		/// Requested element index.
		index: usize,
		/// Current element count.
		len: usize,
	},
	/// Copy or assignment between values of different types.
	#[error("type mismatch: expected {expected}, got {got}")]
	TypeMismatch {
		/// Destination type name.
		expected: String,
		/// Source type name.
		got: String,
	},
	/// Operation is not defined for the value's kind.
	#[error("{op} is not supported on {kind} values")]
	WrongKind {
		/// Requested operation.
		op: &'static str,
		/// Kind of the value the operation was applied to.
		kind: &'static str,
	},
	/// No casting relationship exists between two types.
	#[error("cannot cast {from} to {to}")]
	InvalidCast {
		/// Source type name.
		from: String,
		/// Target type name.
		to: String,
	},
	/// Compound field lookup by an undeclared name.
	#[error("{type_name} has no field named {field}")]
	UnknownField {
		/// Compound type name.
		type_name: String,
		/// Requested field name.
		field: String,
	},
	/// Enum encode of an undeclared symbol.
	#[error("{symbol} is not a symbol of {type_name}")]
	InvalidEnumSymbol {
		/// Enum type name.
		type_name: String,
		/// Offending symbol.
		symbol: String,
	},
	/// Enum decode of an integer with no matching symbol.
	#[error("{value} is not a value of {type_name}")]
	InvalidEnumValue {
		/// Enum type name.
		type_name: String,
		/// Offending integer value.
		value: i128,
	},
	/// Numeric description has no binary codec.
	#[error("no binary codec for {type_name}: size={size}, category={category}")]
	UnsupportedEncoding {
		/// Type name.
		type_name: String,
		/// Declared byte width.
		size: usize,
		/// Declared numeric category.
		category: &'static str,
	},
	/// Type lacks the static metadata needed to build a value.
	#[error("cannot instantiate abstract type {type_name}")]
	AbstractType {
		/// Type name.
		type_name: String,
	},
	/// Type description is internally inconsistent.
	#[error("invalid definition of {type_name}: {reason}")]
	InvalidDefinition {
		/// Type name.
		type_name: String,
		/// What is wrong with it.
		reason: String,
	},
	/// Native value shape does not fit the type.
	#[error("{type_name} expects {expected}, got {got}")]
	NativeMismatch {
		/// Type name.
		type_name: String,
		/// Expected native shape.
		expected: &'static str,
		/// Provided native shape.
		got: String,
	},
	/// Native list length differs from a fixed array length.
	#[error("{type_name} expects {expected} elements, got {got}")]
	LengthMismatch {
		/// Type name.
		type_name: String,
		/// Static array length.
		expected: usize,
		/// Provided element count.
		got: usize,
	},
	/// Native number does not fit the numeric width.
	#[error("{value} does not fit in {type_name}")]
	ValueOutOfRange {
		/// Type name.
		type_name: String,
		/// Rendered offending value.
		value: String,
	},
	/// Strict load found bytes after the value.
	#[error("trailing bytes after {type_name}: leftover={leftover}")]
	TrailingBytes {
		/// Type name.
		type_name: String,
		/// Unconsumed bytes.
		leftover: usize,
	},
	/// Container count header exceeds the configured limit.
	#[error("container too large: count={count}, max={max}")]
	ContainerTooLarge {
		/// Count read from the header.
		count: u64,
		/// Maximum accepted count.
		max: usize,
	},
	/// Registry lookup by an unknown name.
	#[error("unknown type {name}")]
	UnknownType {
		/// Requested type name.
		name: String,
	},
	/// Decompression output exceeded configured safety limit.
	#[error("decompressed output exceeded limit {limit} bytes")]
	DecompressedTooLarge {
		/// Maximum allowed output bytes.
		limit: usize,
	},
}
