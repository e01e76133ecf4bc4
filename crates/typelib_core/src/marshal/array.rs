use tracing::debug;

use crate::marshal::{MarshalError, NativeValue, Result, Value};

/// Element access shared by arrays and containers.
impl Value {
	/// Current element count.
	pub fn len(&self) -> Result<usize> {
		self.with_sequence("len", |_, _, sequence| Ok(sequence.len()))
	}

	/// Whether the sequence holds no elements.
	pub fn is_empty(&self) -> Result<bool> {
		Ok(self.len()? == 0)
	}

	/// Element at `index`; repeated calls return the same value object.
	pub fn element(&self, index: usize) -> Result<Value> {
		self.with_sequence("element", |_, buffer, sequence| sequence.get(buffer, index))
	}

	/// Overwrite the element at `index` with a copy of `value`.
	///
	/// Fixed-size elements are written in place; variable-size elements are
	/// replaced by a private copy that reaches the buffer on [`Value::apply_changes`].
	pub fn set_element(&self, index: usize, value: &Value) -> Result<()> {
		let element_ty = self.with_sequence("set_element", |_, _, sequence| Ok(sequence.element().clone()))?;
		let value_ty = value.ty();
		if !element_ty.is_same(&value_ty) {
			return Err(MarshalError::TypeMismatch {
				expected: element_ty.name().to_owned(),
				got: value_ty.name().to_owned(),
			});
		}

		if element_ty.is_fixed_size() {
			return self.element(index)?.assign(value);
		}
		let copy = value.deep_copy()?;
		self.with_sequence("set_element", |_, _, sequence| sequence.set_cached(index, copy))
	}

	/// Iterate the current elements in index order.
	pub fn elements(&self) -> impl Iterator<Item = Result<Value>> + '_ {
		let len = self.len();
		let (len, first_error) = match len {
			Ok(len) => (len, None),
			Err(err) => (0, Some(err)),
		};
		first_error.map(Err).into_iter().chain((0..len).map(move |index| self.element(index)))
	}

	pub(crate) fn sequence_to_native(&self) -> Result<NativeValue> {
		self.elements().map(|element| element?.to_native()).collect::<Result<Vec<_>>>().map(NativeValue::List)
	}

	pub(crate) fn fill_array(&self, native: &NativeValue) -> Result<()> {
		let ty = self.ty();
		let Some(items) = native.as_list() else {
			return Err(MarshalError::NativeMismatch {
				type_name: ty.name().to_owned(),
				expected: "list",
				got: native.kind_name().to_owned(),
			});
		};
		let length = self.len()?;
		if items.len() != length {
			return Err(MarshalError::LengthMismatch {
				type_name: ty.name().to_owned(),
				expected: length,
				got: items.len(),
			});
		}

		for (index, item) in items.iter().enumerate() {
			self.element(index)?.set_native(item)?;
		}
		Ok(())
	}

	pub(crate) fn apply_array_changes(&self) -> Result<()> {
		let rebuilt = self.with_sequence("apply_changes", |ty, buffer, sequence| {
			if sequence.element().is_fixed_size() {
				return Ok(None);
			}
			let old_size = buffer.len();
			let Some(rebuilt) = sequence.rebuild_variable(buffer)? else {
				return Ok(None);
			};
			*buffer = rebuilt;
			Ok(Some((ty.name().to_owned(), old_size, buffer.len(), sequence.len())))
		})?;

		if let Some((type_name, old_size, new_size, elements)) = rebuilt {
			debug!(type_name = %type_name, old_size, new_size, elements, "rebuilt array buffer");
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use crate::marshal::{CompoundBuilder, Endianness, MarshalError, NativeValue, NumericCategory, Type, TypeRef, Value};

	fn int32() -> TypeRef {
		Type::numeric("/int32_t", NumericCategory::Sint, 4, Endianness::Little).expect("int32")
	}

	#[test]
	fn fixed_arrays_hand_out_views() {
		let ty = Type::array(&int32(), 3).expect("array");
		let value = Value::from_native(&ty, &NativeValue::from(vec![1_i64, 2, 3])).expect("array value");

		let second = value.element(1).expect("element");
		assert!(second.ptr_eq(&value.element(1).expect("element again")));
		second.set_native(&NativeValue::I64(-1)).expect("write");
		assert_eq!(value.to_bytes().expect("bytes")[4..8], (-1_i32).to_le_bytes());
	}

	#[test]
	fn array_bounds_are_checked_at_both_ends() {
		let ty = Type::array(&int32(), 2).expect("array");
		let value = Value::new(&ty).expect("array value");
		let item = Value::new(&int32()).expect("item");

		assert!(matches!(value.element(2), Err(MarshalError::IndexOutOfRange { index: 2, len: 2 })));
		assert!(matches!(value.element(usize::MAX), Err(MarshalError::IndexOutOfRange { .. })));
		assert!(matches!(value.set_element(2, &item), Err(MarshalError::IndexOutOfRange { .. })));
		assert!(matches!(value.set_element(usize::MAX, &item), Err(MarshalError::IndexOutOfRange { .. })));
	}

	#[test]
	fn array_length_is_enforced_on_native_input() {
		let ty = Type::array(&int32(), 2).expect("array");
		let value = Value::new(&ty).expect("array value");
		let err = value.set_native(&NativeValue::from(vec![1_i64, 2, 3])).expect_err("too long");
		assert!(matches!(err, MarshalError::LengthMismatch { expected: 2, got: 3, .. }));
		assert_eq!(value.to_bytes().expect("bytes"), vec![0; 8]);
	}

	#[test]
	fn set_element_rejects_other_types() {
		let ty = Type::array(&int32(), 2).expect("array");
		let value = Value::new(&ty).expect("array value");
		let float = Value::new(&Type::numeric("/float", NumericCategory::Float, 4, Endianness::Little).expect("float")).expect("float value");
		assert!(matches!(value.set_element(0, &float), Err(MarshalError::TypeMismatch { .. })));
	}

	#[test]
	fn variable_arrays_rebuild_from_their_elements() {
		let vector = Type::container(&int32());
		let ty = Type::array(&vector, 2).expect("array of vectors");
		let value = Value::new(&ty).expect("value");
		assert_eq!(value.byte_size().expect("size"), 16);

		let first = value.element(0).expect("first");
		first.push(&Value::from_native(&int32(), &NativeValue::I64(7)).expect("seven")).expect("push");
		assert_eq!(value.buffer().len(), 16);

		value.apply_changes().expect("apply");
		let mut expected = 1_u64.to_be_bytes().to_vec();
		expected.extend_from_slice(&7_i32.to_le_bytes());
		expected.extend_from_slice(&0_u64.to_be_bytes());
		assert_eq!(value.to_bytes().expect("bytes"), expected);
		assert_eq!(value.to_native().expect("native"), NativeValue::List(vec![NativeValue::from(vec![7_i64]), NativeValue::List(Vec::new())]));
	}

	#[test]
	fn arrays_of_compounds_keep_nested_views_live() {
		let point = CompoundBuilder::new("/Point").field("x", &int32()).field("y", &int32()).build().expect("point");
		let ty = Type::array(&point, 2).expect("points");
		let value = Value::new(&ty).expect("value");

		value.element(1).expect("second").field("y").expect("y").set_native(&NativeValue::I64(9)).expect("write");
		assert_eq!(value.to_bytes().expect("bytes")[12..16], 9_i32.to_le_bytes());
	}
}
