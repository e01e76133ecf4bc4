use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::marshal::{Buffer, Endianness, EnumType, MarshalError, NumericCategory, NumericType, Result};

/// Shared handle to an immutable type description.
pub type TypeRef = Rc<Type>;

/// Size of the element count header that prefixes every container.
pub const COUNT_HEADER_SIZE: usize = 8;

/// Default container template name.
pub const VECTOR_CONTAINER: &str = "/std/vector";

/// Immutable description of one type: its name, kind, and static layout metadata.
#[derive(Debug, PartialEq)]
pub struct Type {
	name: Box<str>,
	kind: TypeKind,
	size: Option<usize>,
	min_size: usize,
}

/// Kind-specific part of a [`Type`].
#[derive(Debug, PartialEq)]
pub enum TypeKind {
	/// Integer or floating point scalar.
	Numeric(NumericType),
	/// Enumeration stored as a signed integer.
	Enum(EnumType),
	/// Uninterpreted bytes.
	Opaque(OpaqueType),
	/// Fixed-length sequence.
	Array(ArrayType),
	/// Length-prefixed dynamic sequence.
	Container(ContainerType),
	/// Struct or union.
	Compound(CompoundType),
}

/// Uninterpreted blob; without a size the type is abstract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpaqueType {
	/// Byte size, `None` when unknown.
	pub size: Option<usize>,
}

/// Fixed-length array description.
#[derive(Debug, PartialEq)]
pub struct ArrayType {
	/// Element type.
	pub element: TypeRef,
	/// Static element count.
	pub length: usize,
}

/// Dynamic container description.
#[derive(Debug, PartialEq)]
pub struct ContainerType {
	/// Element type.
	pub element: TypeRef,
	/// Template name, such as `/std/vector`.
	pub container_name: Box<str>,
}

/// Struct or union description.
#[derive(Debug, PartialEq)]
pub struct CompoundType {
	fields: Vec<Field>,
	by_name: HashMap<Box<str>, usize>,
	is_union: bool,
}

/// One compound field.
#[derive(Debug, PartialEq)]
pub struct Field {
	/// Field identifier.
	pub name: Box<str>,
	/// Field type.
	pub ty: TypeRef,
	/// Declared offset in a freshly built value.
	pub offset: usize,
	/// Padding bytes that follow the field.
	pub skip: usize,
}

impl CompoundType {
	/// Fields in declaration order.
	pub fn fields(&self) -> &[Field] {
		&self.fields
	}

	/// Declaration index of a field.
	pub fn field_index(&self, name: &str) -> Option<usize> {
		self.by_name.get(name).copied()
	}

	/// Field by name.
	pub fn field(&self, name: &str) -> Option<&Field> {
		self.field_index(name).map(|index| &self.fields[index])
	}

	/// Whether every field starts at offset zero.
	pub fn is_union(&self) -> bool {
		self.is_union
	}
}

impl Type {
	/// Describe a numeric scalar.
	pub fn numeric(name: impl Into<Box<str>>, category: NumericCategory, size: usize, endianness: Endianness) -> Result<TypeRef> {
		let name = name.into();
		let numeric = NumericType::new(&name, category, size, endianness)?;
		Ok(Self::scalar(name, TypeKind::Numeric(numeric), size))
	}

	/// Describe an enumeration.
	pub fn enumeration(name: impl Into<Box<str>>, enumeration: EnumType) -> TypeRef {
		let size = enumeration.size();
		Self::scalar(name.into(), TypeKind::Enum(enumeration), size)
	}

	/// Describe an opaque blob; `None` yields an abstract type.
	pub fn opaque(name: impl Into<Box<str>>, size: Option<usize>) -> TypeRef {
		Rc::new(Self {
			name: name.into(),
			kind: TypeKind::Opaque(OpaqueType { size }),
			size,
			min_size: size.unwrap_or(0),
		})
	}

	/// Describe `element[length]`, named after its element.
	pub fn array(element: &TypeRef, length: usize) -> Result<TypeRef> {
		Self::named_array(format!("{}[{}]", element.name, length), element, length)
	}

	/// Describe a fixed-length array under an explicit name.
	///
	/// A zero-length array is fixed-size even when its element is not.
	pub fn named_array(name: impl Into<Box<str>>, element: &TypeRef, length: usize) -> Result<TypeRef> {
		let name = name.into();
		let min_size = element
			.min_size
			.checked_mul(length)
			.ok_or_else(|| invalid(&name, "array byte size overflows".to_owned()))?;
		let size = if length == 0 { Some(0) } else { element.size.map(|_| min_size) };
		Ok(Rc::new(Self {
			name,
			kind: TypeKind::Array(ArrayType {
				element: Rc::clone(element),
				length,
			}),
			size,
			min_size,
		}))
	}

	/// Describe `/std/vector<element>`.
	pub fn container(element: &TypeRef) -> TypeRef {
		Self::named_container(format!("{VECTOR_CONTAINER}<{}>", element.name), VECTOR_CONTAINER, element)
	}

	/// Describe a container under an explicit name and template.
	pub fn named_container(name: impl Into<Box<str>>, container_name: impl Into<Box<str>>, element: &TypeRef) -> TypeRef {
		Rc::new(Self {
			name: name.into(),
			kind: TypeKind::Container(ContainerType {
				element: Rc::clone(element),
				container_name: container_name.into(),
			}),
			size: None,
			min_size: COUNT_HEADER_SIZE,
		})
	}

	fn scalar(name: Box<str>, kind: TypeKind, size: usize) -> TypeRef {
		Rc::new(Self {
			name,
			kind,
			size: Some(size),
			min_size: size,
		})
	}

	/// Type name.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Kind-specific description.
	pub fn kind(&self) -> &TypeKind {
		&self.kind
	}

	/// Stable lowercase kind label.
	pub fn kind_name(&self) -> &'static str {
		match self.kind {
			TypeKind::Numeric(_) => "numeric",
			TypeKind::Enum(_) => "enum",
			TypeKind::Opaque(_) => "opaque",
			TypeKind::Array(_) => "array",
			TypeKind::Container(_) => "container",
			TypeKind::Compound(ref compound) if compound.is_union => "union",
			TypeKind::Compound(_) => "compound",
		}
	}

	/// Static byte size, `None` for variable-size types.
	pub fn byte_size(&self) -> Option<usize> {
		self.size
	}

	/// Whether the serialized length is fully determined by the type.
	pub fn is_fixed_size(&self) -> bool {
		self.size.is_some()
	}

	/// Serialized size of a freshly built value.
	pub fn min_size(&self) -> usize {
		self.min_size
	}

	/// Whether values can be instantiated from this type.
	pub fn is_abstract(&self) -> bool {
		matches!(self.kind, TypeKind::Opaque(OpaqueType { size: None }))
	}

	/// Element type of arrays and containers.
	pub fn element_type(&self) -> Option<&TypeRef> {
		match &self.kind {
			TypeKind::Array(array) => Some(&array.element),
			TypeKind::Container(container) => Some(&container.element),
			_ => None,
		}
	}

	/// Static length of arrays.
	pub fn length(&self) -> Option<usize> {
		match &self.kind {
			TypeKind::Array(array) => Some(array.length),
			_ => None,
		}
	}

	/// Compound description, if any.
	pub fn as_compound(&self) -> Option<&CompoundType> {
		match &self.kind {
			TypeKind::Compound(compound) => Some(compound),
			_ => None,
		}
	}

	/// Identity or structural equality.
	pub fn is_same(&self, other: &Type) -> bool {
		std::ptr::eq(self, other) || self == other
	}

	/// Whether a value of this type may be reinterpreted as `to`.
	///
	/// Defined for identical types, numerics sharing a codec, a compound whose
	/// first field sits at offset zero and casts to `to`, and a non-empty array
	/// whose element casts to `to`.
	pub fn can_cast_to(&self, to: &Type) -> bool {
		if self.is_same(to) {
			return true;
		}
		match (&self.kind, &to.kind) {
			(TypeKind::Numeric(from), TypeKind::Numeric(target)) => from.pack_code() == target.pack_code(),
			(TypeKind::Compound(compound), _) => compound
				.fields
				.first()
				.is_some_and(|field| field.offset == 0 && field.ty.can_cast_to(to)),
			(TypeKind::Array(array), _) => array.length > 0 && array.element.can_cast_to(to),
			_ => false,
		}
	}

	/// Serialized size of one value of this type starting at `offset` in `buffer`.
	///
	/// O(1) for fixed-size types. Variable-size types decode container count
	/// headers and walk their parts.
	pub fn buffer_size_at(&self, buffer: &Buffer, offset: usize) -> Result<usize> {
		self.measure(buffer, offset, usize::MAX)
	}

	/// [`Type::buffer_size_at`] that also rejects container counts above `max_elements`.
	pub(crate) fn measure(&self, buffer: &Buffer, offset: usize, max_elements: usize) -> Result<usize> {
		if let Some(size) = self.size {
			buffer.check(offset, size)?;
			return Ok(size);
		}

		let end = match &self.kind {
			TypeKind::Array(array) => walk(&array.element, array.length, buffer, offset, max_elements)?,
			TypeKind::Container(container) => {
				let count = read_element_count(buffer, offset)?;
				if count > max_elements {
					return Err(MarshalError::ContainerTooLarge {
						count: count as u64,
						max: max_elements,
					});
				}
				let data = offset + COUNT_HEADER_SIZE;
				match container.element.size {
					Some(element_size) => count
						.checked_mul(element_size)
						.and_then(|len| len.checked_add(data))
						.ok_or(MarshalError::OutOfBounds {
							offset: data,
							size: usize::MAX,
							len: buffer.len(),
						})?,
					None => walk(&container.element, count, buffer, data, max_elements)?,
				}
			}
			TypeKind::Compound(compound) => {
				let mut cursor = offset;
				for field in &compound.fields {
					cursor += field.ty.measure(buffer, cursor, max_elements)? + field.skip;
				}
				cursor
			}
			_ => {
				return Err(MarshalError::AbstractType {
					type_name: self.name.to_string(),
				});
			}
		};

		buffer.check(offset, end - offset)?;
		Ok(end - offset)
	}
}

impl fmt::Display for Type {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.name)
	}
}

/// Read a container's big-endian element count at `offset`.
pub fn read_element_count(buffer: &Buffer, offset: usize) -> Result<usize> {
	let count = buffer.read_uint(offset, COUNT_HEADER_SIZE, Endianness::Big)?;
	usize::try_from(count).map_err(|_| MarshalError::OutOfBounds {
		offset,
		size: usize::MAX,
		len: buffer.len(),
	})
}

fn walk(element: &TypeRef, count: usize, buffer: &Buffer, start: usize, max_elements: usize) -> Result<usize> {
	let mut cursor = start;
	for _ in 0..count {
		cursor += element.measure(buffer, cursor, max_elements)?;
	}
	Ok(cursor)
}

/// Incremental builder for struct and union types.
#[derive(Debug)]
pub struct CompoundBuilder {
	name: Box<str>,
	fields: Vec<(Box<str>, TypeRef, Option<usize>)>,
	size: Option<usize>,
	is_union: bool,
}

impl CompoundBuilder {
	/// Start a struct description.
	pub fn new(name: impl Into<Box<str>>) -> Self {
		Self {
			name: name.into(),
			fields: Vec::new(),
			size: None,
			is_union: false,
		}
	}

	/// Start a union description; every field lives at offset zero.
	pub fn union(name: impl Into<Box<str>>) -> Self {
		Self {
			is_union: true,
			..Self::new(name)
		}
	}

	/// Append a field right after the previous one.
	pub fn field(mut self, name: impl Into<Box<str>>, ty: &TypeRef) -> Self {
		self.fields.push((name.into(), Rc::clone(ty), None));
		self
	}

	/// Append a field at an explicit offset; the gap becomes the previous field's skip.
	pub fn field_at(mut self, name: impl Into<Box<str>>, ty: &TypeRef, offset: usize) -> Self {
		self.fields.push((name.into(), Rc::clone(ty), Some(offset)));
		self
	}

	/// Declare the total size; the remainder becomes the last field's skip.
	pub fn size(mut self, size: usize) -> Self {
		self.size = Some(size);
		self
	}

	/// Validate the layout and produce the type.
	pub fn build(self) -> Result<TypeRef> {
		let name = self.name;
		let mut by_name = HashMap::with_capacity(self.fields.len());
		let mut fields: Vec<Field> = Vec::with_capacity(self.fields.len());
		let mut cursor = 0_usize;

		for (index, (field_name, ty, offset)) in self.fields.into_iter().enumerate() {
			if by_name.insert(field_name.clone(), index).is_some() {
				return Err(invalid(&name, format!("duplicate field {field_name}")));
			}
			if ty.is_abstract() {
				return Err(invalid(&name, format!("field {field_name} has abstract type {}", ty.name)));
			}

			let offset = if self.is_union {
				if ty.size.is_none() {
					return Err(invalid(&name, format!("union field {field_name} is variable-size")));
				}
				if offset.is_some_and(|at| at != 0) {
					return Err(invalid(&name, format!("union field {field_name} must sit at offset 0")));
				}
				cursor = cursor.max(ty.min_size);
				0
			} else {
				let at = offset.unwrap_or(cursor);
				if index == 0 && at != 0 {
					return Err(invalid(&name, format!("first field {field_name} must sit at offset 0")));
				}
				if at < cursor {
					return Err(invalid(&name, format!("field {field_name} at {at} overlaps the previous field ending at {cursor}")));
				}
				if let Some(previous) = fields.last_mut() {
					previous.skip = at - cursor;
				}
				cursor = at + ty.min_size;
				at
			};

			fields.push(Field {
				name: field_name,
				ty,
				offset,
				skip: 0,
			});
		}

		let total = match self.size {
			Some(size) if size < cursor => {
				return Err(invalid(&name, format!("declared size {size} is smaller than the layout ({cursor} bytes)")));
			}
			Some(size) => size,
			None => cursor,
		};
		if !self.is_union {
			if let Some(last) = fields.last_mut() {
				last.skip = total - cursor;
			}
		}

		let fixed = fields.iter().all(|field| field.ty.size.is_some());
		Ok(Rc::new(Type {
			name,
			kind: TypeKind::Compound(CompoundType {
				fields,
				by_name,
				is_union: self.is_union,
			}),
			size: fixed.then_some(total),
			min_size: total,
		}))
	}
}

fn invalid(type_name: &str, reason: String) -> MarshalError {
	MarshalError::InvalidDefinition {
		type_name: type_name.to_owned(),
		reason,
	}
}
