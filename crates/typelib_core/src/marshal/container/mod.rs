use tracing::debug;

use crate::marshal::sequence::write_count;
use crate::marshal::types::COUNT_HEADER_SIZE;
use crate::marshal::{MarshalError, NativeValue, Result, Value};

/// Container operations.
///
/// Elements added by `push`/`resize` live in memory until the next
/// [`Value::apply_changes`] (or `to_bytes`) serializes them after the count header.
impl Value {
	/// Append a private copy of `value`.
	pub fn push(&self, value: &Value) -> Result<()> {
		self.check_element_type("push", value)?;
		let copy = value.deep_copy()?;
		self.push_owned(copy)
	}

	/// Remove the last element and return a copy of it.
	pub fn pop(&self) -> Result<Option<Value>> {
		let len = self.container_len("pop")?;
		if len == 0 {
			return Ok(None);
		}
		let last = self.element(len - 1)?.deep_copy()?;
		self.delete_at(len - 1)?;
		Ok(Some(last))
	}

	/// Grow with freshly built elements or drop elements from the end.
	pub fn resize(&self, len: usize) -> Result<()> {
		let (element, current) = self.with_container("resize", |_, _, sequence| Ok((sequence.element().clone(), sequence.len())))?;
		if len <= current {
			return self.with_container("resize", |_, _, sequence| {
				sequence.truncate(len);
				Ok(())
			});
		}
		for _ in current..len {
			self.push_owned(Value::new(&element)?)?;
		}
		Ok(())
	}

	/// Remove every element.
	pub fn clear(&self) -> Result<()> {
		self.resize(0)
	}

	/// Append copies of `values`; every value is type-checked before any is appended.
	pub fn extend_from(&self, values: &[Value]) -> Result<()> {
		for value in values {
			self.check_element_type("extend_from", value)?;
		}
		for value in values {
			self.push_owned(value.deep_copy()?)?;
		}
		Ok(())
	}

	/// Remove the element at `index`, shifting later elements down.
	///
	/// Cached fixed-size elements after `index` stay valid and keep reading the
	/// same logical element.
	pub fn delete_at(&self, index: usize) -> Result<()> {
		let moved = self.with_container("delete_at", |ty, buffer, sequence| {
			let moved = sequence.delete_at(buffer, index)?;
			write_count(buffer, COUNT_HEADER_SIZE, sequence.loaded())?;
			debug!(type_name = ty.name(), index, remaining = sequence.len(), "deleted container element");
			Ok(moved)
		})?;
		for (value, view) in moved {
			value.rebind(view)?;
		}
		Ok(())
	}

	/// Remove every element for which `predicate` returns true; returns how many were removed.
	///
	/// Each element is visited once, in index order.
	pub fn delete_if(&self, mut predicate: impl FnMut(&Value) -> Result<bool>) -> Result<usize> {
		let mut removed = 0;
		let mut index = 0;
		while index < self.container_len("delete_if")? {
			let element = self.element(index)?;
			if predicate(&element)? {
				self.delete_at(index)?;
				removed += 1;
			} else {
				index += 1;
			}
		}
		Ok(removed)
	}

	/// Serialized form without the count header.
	pub fn to_bytes_data_only(&self) -> Result<Vec<u8>> {
		self.container_len("to_bytes_data_only")?;
		let mut bytes = self.to_bytes()?;
		bytes.drain(..COUNT_HEADER_SIZE);
		Ok(bytes)
	}

	pub(crate) fn push_owned(&self, value: Value) -> Result<()> {
		self.with_container("push", |_, _, sequence| {
			sequence.push(value);
			Ok(())
		})
	}

	fn container_len(&self, op: &'static str) -> Result<usize> {
		self.with_container(op, |_, _, sequence| Ok(sequence.len()))
	}

	fn check_element_type(&self, op: &'static str, value: &Value) -> Result<()> {
		let element = self.with_container(op, |_, _, sequence| Ok(sequence.element().clone()))?;
		let value_ty = value.ty();
		if !element.is_same(&value_ty) {
			return Err(MarshalError::TypeMismatch {
				expected: element.name().to_owned(),
				got: value_ty.name().to_owned(),
			});
		}
		Ok(())
	}

	pub(crate) fn fill_container(&self, native: &NativeValue) -> Result<()> {
		let element = self.with_container("set_native", |_, _, sequence| Ok(sequence.element().clone()))?;
		let Some(items) = native.as_list() else {
			return Err(MarshalError::NativeMismatch {
				type_name: self.ty().name().to_owned(),
				expected: "list",
				got: native.kind_name().to_owned(),
			});
		};
		self.clear()?;
		for item in items {
			self.push_owned(Value::from_native(&element, item)?)?;
		}
		Ok(())
	}

	pub(crate) fn apply_container_changes(&self) -> Result<()> {
		let (moved, rebuilt) = self.with_container("apply_changes", |ty, buffer, sequence| {
			let old_size = buffer.len();
			let (rebuilt, moved) = if sequence.element().is_fixed_size() {
				match sequence.rebuild_fixed(buffer)? {
					Some((rebuilt, moved)) => (rebuilt, moved),
					None => return Ok((Vec::new(), None)),
				}
			} else {
				match sequence.rebuild_variable(buffer)? {
					Some(rebuilt) => (rebuilt, Vec::new()),
					None => return Ok((Vec::new(), None)),
				}
			};
			*buffer = rebuilt;
			Ok((moved, Some((ty.name().to_owned(), old_size, buffer.len(), sequence.len()))))
		})?;

		for (value, view) in moved {
			value.rebind(view)?;
		}
		if let Some((type_name, old_size, new_size, elements)) = rebuilt {
			debug!(type_name = %type_name, old_size, new_size, elements, "rebuilt container buffer");
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests;
