use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::marshal::compound::FieldCache;
use crate::marshal::sequence::ValueSequence;
use crate::marshal::types::{COUNT_HEADER_SIZE, read_element_count};
use crate::marshal::{Buffer, CompoundType, MarshalError, NativeValue, Result, TypeKind, TypeRef};

/// Limits and switches for loading values from untrusted bytes.
#[derive(Debug, Clone)]
pub struct LoadOptions {
	/// Reject bytes left over after the value.
	pub strict: bool,
	/// Largest container element count accepted in any count header.
	pub max_elements: usize,
}

impl Default for LoadOptions {
	fn default() -> Self {
		Self {
			strict: false,
			max_elements: 1 << 24,
		}
	}
}

impl LoadOptions {
	/// Preset that requires the input to hold exactly one value.
	pub fn strict() -> Self {
		Self {
			strict: true,
			..Self::default()
		}
	}
}

/// Kind tag of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
	/// Numeric scalar.
	Numeric,
	/// Enumeration scalar.
	Enum,
	/// Opaque bytes.
	Opaque,
	/// Fixed-length array.
	Array,
	/// Length-prefixed container.
	Container,
	/// Struct or union.
	Compound,
}

impl ValueKind {
	/// Stable lowercase label.
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Numeric => "numeric",
			Self::Enum => "enum",
			Self::Opaque => "opaque",
			Self::Array => "array",
			Self::Container => "container",
			Self::Compound => "compound",
		}
	}
}

/// Typed value stored in a [`Buffer`] with the exact layout of its type.
///
/// `Value` is a handle: cloning it shares the same value object. Fixed-size
/// sub-values returned by field or element access are views into the parent
/// buffer, so writes through them land in the parent immediately.
/// Variable-size sub-values are private copies; their changes reach the parent
/// on the parent's [`Value::apply_changes`]. Sub-values obtained before an
/// operation that can resize the parent must be fetched again afterwards.
#[derive(Clone)]
pub struct Value(Rc<RefCell<ValueInner>>);

pub(crate) struct ValueInner {
	pub(crate) ty: TypeRef,
	pub(crate) buffer: Buffer,
	pub(crate) state: ValueState,
}

pub(crate) enum ValueState {
	Scalar,
	Array(ValueSequence),
	Container(ValueSequence),
	Compound(FieldCache),
}

impl ValueState {
	fn init(ty: &TypeRef, buffer: Buffer) -> Result<(Buffer, Self)> {
		if ty.is_abstract() {
			return Err(MarshalError::AbstractType {
				type_name: ty.name().to_owned(),
			});
		}

		Ok(match ty.kind() {
			TypeKind::Numeric(_) | TypeKind::Enum(_) | TypeKind::Opaque(_) => (buffer, Self::Scalar),
			TypeKind::Array(array) => (buffer, Self::Array(ValueSequence::new(&array.element, 0, array.length))),
			TypeKind::Container(container) => {
				let buffer = if buffer.is_empty() { Buffer::new(COUNT_HEADER_SIZE) } else { buffer };
				let count = read_element_count(&buffer, 0)?;
				(buffer, Self::Container(ValueSequence::new(&container.element, COUNT_HEADER_SIZE, count)))
			}
			TypeKind::Compound(compound) => (buffer, Self::Compound(FieldCache::new(compound))),
		})
	}
}

impl Value {
	/// Wrap an existing buffer without validating its contents.
	///
	/// An empty buffer given to a container becomes an empty container.
	pub fn wrap(ty: &TypeRef, buffer: Buffer) -> Result<Self> {
		let (buffer, state) = ValueState::init(ty, buffer)?;
		Ok(Self(Rc::new(RefCell::new(ValueInner {
			ty: Rc::clone(ty),
			buffer,
			state,
		}))))
	}

	/// Build a fresh zero-initialized value.
	pub fn new(ty: &TypeRef) -> Result<Self> {
		Self::wrap(ty, Buffer::new(ty.min_size()))
	}

	/// Load a private copy of `bytes` using default [`LoadOptions`].
	pub fn from_bytes(ty: &TypeRef, bytes: &[u8]) -> Result<Self> {
		Self::from_bytes_with(ty, bytes, &LoadOptions::default())
	}

	/// Load a private copy of `bytes`, validating its layout first.
	///
	/// Bytes after the value are ignored unless `opt.strict` is set.
	pub fn from_bytes_with(ty: &TypeRef, bytes: &[u8], opt: &LoadOptions) -> Result<Self> {
		if ty.is_abstract() {
			return Err(MarshalError::AbstractType {
				type_name: ty.name().to_owned(),
			});
		}
		let incoming = Buffer::from_slice(bytes);
		let size = ty.measure(&incoming, 0, opt.max_elements)?;
		if size < bytes.len() {
			if opt.strict {
				return Err(MarshalError::TrailingBytes {
					type_name: ty.name().to_owned(),
					leftover: bytes.len() - size,
				});
			}
			return Self::wrap(ty, Buffer::from_slice(&bytes[..size]));
		}
		Self::wrap(ty, incoming)
	}

	/// Build a fresh value and fill it from its native form.
	pub fn from_native(ty: &TypeRef, native: &NativeValue) -> Result<Self> {
		let value = Self::new(ty)?;
		value.set_native(native)?;
		Ok(value)
	}

	/// Type of this value.
	pub fn ty(&self) -> TypeRef {
		Rc::clone(&self.0.borrow().ty)
	}

	/// Kind tag of this value.
	pub fn kind(&self) -> ValueKind {
		match self.0.borrow().state {
			ValueState::Array(_) => ValueKind::Array,
			ValueState::Container(_) => ValueKind::Container,
			ValueState::Compound(_) => ValueKind::Compound,
			ValueState::Scalar => match self.0.borrow().ty.kind() {
				TypeKind::Numeric(_) => ValueKind::Numeric,
				TypeKind::Enum(_) => ValueKind::Enum,
				_ => ValueKind::Opaque,
			},
		}
	}

	/// Handle to the buffer currently backing this value.
	pub fn buffer(&self) -> Buffer {
		self.0.borrow().buffer.clone()
	}

	/// Whether both handles refer to the same value object.
	pub fn ptr_eq(&self, other: &Value) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}

	/// Swap in a new buffer and drop every cached offset and sub-value.
	pub fn reset_buffer(&self, buffer: Buffer) -> Result<()> {
		let ty = self.ty();
		let (buffer, state) = ValueState::init(&ty, buffer)?;
		let mut inner = self.0.borrow_mut();
		inner.buffer = buffer;
		inner.state = state;
		Ok(())
	}

	/// Reconcile pending changes of variable-size parts into this value's buffer.
	pub fn apply_changes(&self) -> Result<()> {
		match self.kind() {
			ValueKind::Array => self.apply_array_changes(),
			ValueKind::Container => self.apply_container_changes(),
			ValueKind::Compound => self.apply_compound_changes(),
			_ => Ok(()),
		}
	}

	/// Serialized form, after applying pending changes.
	pub fn to_bytes(&self) -> Result<Vec<u8>> {
		self.apply_changes()?;
		Ok(self.0.borrow().buffer.to_vec())
	}

	/// Current serialized size, after applying pending changes.
	pub fn byte_size(&self) -> Result<usize> {
		self.apply_changes()?;
		Ok(self.0.borrow().buffer.len())
	}

	/// Replace the serialized form.
	///
	/// Fixed-size values are overwritten in place, so views keep aliasing them.
	/// Variable-size values validate `bytes` and take a private copy.
	pub fn set_bytes(&self, bytes: &[u8]) -> Result<()> {
		let ty = self.ty();
		if ty.is_fixed_size() {
			return Buffer::from_slice(bytes).copy_to(&self.buffer());
		}
		let incoming = Buffer::from_slice(bytes);
		let size = ty.measure(&incoming, 0, LoadOptions::default().max_elements)?;
		if size != bytes.len() {
			return Err(MarshalError::TrailingBytes {
				type_name: ty.name().to_owned(),
				leftover: bytes.len() - size,
			});
		}
		self.reset_buffer(incoming)
	}

	/// Copy `source` onto this value; both must have the same type.
	pub fn assign(&self, source: &Value) -> Result<()> {
		if self.ptr_eq(source) {
			return Ok(());
		}
		let ty = self.ty();
		let source_ty = source.ty();
		if !ty.is_same(&source_ty) {
			return Err(MarshalError::TypeMismatch {
				expected: ty.name().to_owned(),
				got: source_ty.name().to_owned(),
			});
		}

		let bytes = source.to_bytes()?;
		if ty.is_fixed_size() {
			self.buffer().write(0, &bytes)
		} else {
			self.reset_buffer(Buffer::from_vec(bytes))
		}
	}

	/// Independent value with a private copy of the serialized form.
	pub fn deep_copy(&self) -> Result<Value> {
		let bytes = self.to_bytes()?;
		Self::wrap(&self.ty(), Buffer::from_vec(bytes))
	}

	/// Reinterpret this value as `to`, sharing the same bytes.
	pub fn cast(&self, to: &TypeRef) -> Result<Value> {
		let ty = self.ty();
		if !ty.can_cast_to(to) {
			return Err(MarshalError::InvalidCast {
				from: ty.name().to_owned(),
				to: to.name().to_owned(),
			});
		}
		self.apply_changes()?;
		let buffer = self.buffer();
		let size = to.measure(&buffer, 0, LoadOptions::default().max_elements)?;
		Self::wrap(to, buffer.view(0, size)?)
	}

	/// Same type and byte-identical serialized forms.
	pub fn equals(&self, other: &Value) -> Result<bool> {
		if self.ptr_eq(other) {
			return Ok(true);
		}
		if !self.ty().is_same(&other.ty()) {
			return Ok(false);
		}
		Ok(self.to_bytes()? == other.to_bytes()?)
	}

	/// Reset to the freshly built form.
	pub fn zero(&self) -> Result<()> {
		let ty = self.ty();
		if ty.is_fixed_size() {
			self.buffer().zero();
			return Ok(());
		}
		self.reset_buffer(Buffer::new(ty.min_size()))
	}

	/// Convert to the native form.
	pub fn to_native(&self) -> Result<NativeValue> {
		let ty = self.ty();
		match ty.kind() {
			TypeKind::Numeric(numeric) => numeric.pack_code().decode(&self.buffer(), 0),
			TypeKind::Enum(enumeration) => enumeration.decode(ty.name(), &self.buffer(), 0),
			TypeKind::Opaque(_) => Ok(NativeValue::Bytes(self.buffer().to_vec())),
			TypeKind::Array(_) | TypeKind::Container(_) => self.sequence_to_native(),
			TypeKind::Compound(compound) => self.compound_to_native(compound),
		}
	}

	/// Overwrite from the native form; validation happens before any byte changes.
	pub fn set_native(&self, native: &NativeValue) -> Result<()> {
		let ty = self.ty();
		match ty.kind() {
			TypeKind::Numeric(numeric) => numeric.pack_code().encode(ty.name(), &self.buffer(), 0, native),
			TypeKind::Enum(enumeration) => enumeration.encode(ty.name(), &self.buffer(), 0, native),
			TypeKind::Opaque(_) => {
				let bytes = opaque_bytes(ty.name(), native)?;
				self.set_bytes(&bytes)
			}
			TypeKind::Array(_) => {
				let scratch = Value::new(&ty)?;
				scratch.fill_array(native)?;
				self.assign(&scratch)
			}
			TypeKind::Container(_) => {
				let scratch = Value::new(&ty)?;
				scratch.fill_container(native)?;
				self.assign(&scratch)
			}
			TypeKind::Compound(compound) => {
				let scratch = self.deep_copy()?;
				scratch.fill_compound(compound, native)?;
				self.assign(&scratch)
			}
		}
	}

	/// Re-point a fixed-size value at `buffer`, keeping its caches and moving cached children along.
	///
	/// Variable-size values are reset instead.
	pub(crate) fn rebind(&self, buffer: Buffer) -> Result<()> {
		if !self.ty().is_fixed_size() {
			return self.reset_buffer(buffer);
		}

		let children = {
			let mut inner = self.0.borrow_mut();
			let ValueInner { ty, buffer: own, state } = &mut *inner;
			*own = buffer.clone();
			match state {
				ValueState::Scalar | ValueState::Container(_) => Vec::new(),
				ValueState::Array(sequence) => sequence.cached_views(&buffer)?,
				ValueState::Compound(cache) => match ty.as_compound() {
					Some(compound) => cache.cached_views(compound, &buffer)?,
					None => Vec::new(),
				},
			}
		};

		for (child, view) in children {
			child.rebind(view)?;
		}
		Ok(())
	}

	pub(crate) fn wrong_kind(&self, op: &'static str) -> MarshalError {
		MarshalError::WrongKind {
			op,
			kind: self.kind().as_str(),
		}
	}

	/// Run `f` on the element cache of an array or container.
	pub(crate) fn with_sequence<R>(&self, op: &'static str, f: impl FnOnce(&TypeRef, &mut Buffer, &mut ValueSequence) -> Result<R>) -> Result<R> {
		let mut inner = self.0.borrow_mut();
		let ValueInner { ty, buffer, state } = &mut *inner;
		match state {
			ValueState::Array(sequence) | ValueState::Container(sequence) => f(ty, buffer, sequence),
			_ => {
				drop(inner);
				Err(self.wrong_kind(op))
			}
		}
	}

	/// Run `f` on the element cache of a container.
	pub(crate) fn with_container<R>(&self, op: &'static str, f: impl FnOnce(&TypeRef, &mut Buffer, &mut ValueSequence) -> Result<R>) -> Result<R> {
		let mut inner = self.0.borrow_mut();
		let ValueInner { ty, buffer, state } = &mut *inner;
		match state {
			ValueState::Container(sequence) => f(ty, buffer, sequence),
			_ => {
				drop(inner);
				Err(self.wrong_kind(op))
			}
		}
	}

	/// Run `f` on the field cache of a compound.
	pub(crate) fn with_compound<R>(&self, op: &'static str, f: impl FnOnce(&CompoundType, &mut Buffer, &mut FieldCache) -> Result<R>) -> Result<R> {
		let mut inner = self.0.borrow_mut();
		let ValueInner { ty, buffer, state } = &mut *inner;
		match (state, ty.as_compound()) {
			(ValueState::Compound(cache), Some(compound)) => f(compound, buffer, cache),
			_ => {
				drop(inner);
				Err(self.wrong_kind(op))
			}
		}
	}
}

impl PartialEq for Value {
	fn eq(&self, other: &Self) -> bool {
		self.equals(other).unwrap_or(false)
	}
}

impl fmt::Debug for Value {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let inner = self.0.borrow();
		f.debug_struct("Value")
			.field("type", &inner.ty.name())
			.field("buffer", &inner.buffer)
			.finish()
	}
}

fn opaque_bytes(type_name: &str, native: &NativeValue) -> Result<Vec<u8>> {
	let mismatch = || MarshalError::NativeMismatch {
		type_name: type_name.to_owned(),
		expected: "bytes",
		got: native.kind_name().to_owned(),
	};
	match native {
		NativeValue::Bytes(bytes) => Ok(bytes.clone()),
		NativeValue::List(items) => items
			.iter()
			.map(|item| item.as_i64().and_then(|byte| u8::try_from(byte).ok()).ok_or_else(mismatch))
			.collect(),
		_ => Err(mismatch()),
	}
}
