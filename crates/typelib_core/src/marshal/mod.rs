mod array;
mod buffer;
mod compound;
mod compression;
mod container;
mod enums;
mod error;
mod file;
mod native;
mod numeric;
mod schema;
mod sequence;
mod types;
mod value;

/// Shared byte buffer and window type.
pub use buffer::Buffer;
/// Per-field layout record returned by compound lookups.
pub use compound::FieldSlot;
/// Compression detection result.
pub use compression::Compression;
/// Enumeration descriptor.
pub use enums::EnumType;
/// Error and result aliases.
pub use error::{MarshalError, Result};
/// Value file container and options.
pub use file::{ValueFile, WriteOptions};
/// Native value tree.
pub use native::{NativeField, NativeValue, Record};
/// Numeric descriptors and codecs.
pub use numeric::{Endianness, NumericCategory, NumericType, PackCode};
/// Type registry and JSON schema documents.
pub use schema::{ByteOrder, FieldDef, Registry, SchemaDoc, TypeDef};
/// Type descriptors and builders.
pub use types::{
	ArrayType, COUNT_HEADER_SIZE, CompoundBuilder, CompoundType, ContainerType, Field, OpaqueType, Type, TypeKind, TypeRef, VECTOR_CONTAINER, read_element_count,
};
/// Typed values and load options.
pub use value::{LoadOptions, Value, ValueKind};
