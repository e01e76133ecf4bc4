use tracing::{debug, trace};

use crate::marshal::{Buffer, CompoundType, MarshalError, NativeField, NativeValue, Record, Result, TypeRef, Value};

/// Live location of one field inside a compound value's buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSlot {
	/// Declaration index.
	pub index: usize,
	/// Byte offset from the start of the compound.
	pub offset: usize,
	/// Serialized size of the field, padding excluded.
	pub size: usize,
}

/// Per-value field layout and sub-value cache.
///
/// Fields before the first variable-size field sit at their declared offsets.
/// From there on, offsets are found by a left-to-right scan that stops at the
/// requested field and remembers everything it measured.
pub(crate) struct FieldCache {
	first_variable: usize,
	offsets: Vec<usize>,
	slots: Vec<Option<FieldSlot>>,
	values: Vec<Option<Value>>,
	scans: usize,
}

impl FieldCache {
	pub(crate) fn new(compound: &CompoundType) -> Self {
		let fields = compound.fields();
		let first_variable = fields.iter().position(|field| !field.ty.is_fixed_size()).unwrap_or(fields.len());
		Self {
			first_variable,
			offsets: fields.iter().take(first_variable + 1).map(|field| field.offset).collect(),
			slots: vec![None; fields.len()],
			values: vec![None; fields.len()],
			scans: 0,
		}
	}

	pub(crate) fn scans(&self) -> usize {
		self.scans
	}

	pub(crate) fn slot(&mut self, compound: &CompoundType, buffer: &Buffer, index: usize) -> Result<FieldSlot> {
		if let Some(slot) = self.slots[index] {
			return Ok(slot);
		}

		let fields = compound.fields();
		if index < self.first_variable {
			let field = &fields[index];
			let slot = FieldSlot {
				index,
				offset: field.offset,
				size: field.ty.min_size(),
			};
			self.slots[index] = Some(slot);
			return Ok(slot);
		}

		while self.slots[index].is_none() {
			let position = self.offsets.len() - 1;
			let field = &fields[position];
			let start = self.offsets[position];
			let size = field.ty.buffer_size_at(buffer, start)?;
			trace!(field = %field.name, offset = start, size, "scanned field");
			self.slots[position] = Some(FieldSlot {
				index: position,
				offset: start,
				size,
			});
			self.offsets.push(start + size + field.skip);
			self.scans += 1;
		}
		self.slots[index].ok_or(MarshalError::IndexOutOfRange { index, len: fields.len() })
	}

	/// Cached field value, or a new view (fixed-size) or private copy (variable-size).
	pub(crate) fn field(&mut self, compound: &CompoundType, buffer: &Buffer, index: usize) -> Result<Value> {
		if let Some(value) = &self.values[index] {
			return Ok(value.clone());
		}

		let slot = self.slot(compound, buffer, index)?;
		let ty = &compound.fields()[index].ty;
		let value = if ty.is_fixed_size() {
			Value::wrap(ty, buffer.view(slot.offset, slot.size)?)?
		} else {
			Value::wrap(ty, Buffer::from_vec(buffer.read(slot.offset, slot.size)?))?
		};
		self.values[index] = Some(value.clone());
		Ok(value)
	}

	/// Cached fields of a fixed-size compound paired with their views in `buffer`.
	pub(crate) fn cached_views(&self, compound: &CompoundType, buffer: &Buffer) -> Result<Vec<(Value, Buffer)>> {
		let fields = compound.fields();
		self.values
			.iter()
			.enumerate()
			.filter_map(|(index, value)| value.as_ref().map(|value| (&fields[index], value)))
			.map(|(field, value)| Ok((value.clone(), buffer.view(field.offset, field.ty.min_size())?)))
			.collect()
	}

	/// Splice the current form of every cached variable-size field into a copy of `buffer`.
	pub(crate) fn rebuild(&mut self, compound: &CompoundType, buffer: &Buffer) -> Result<Option<Buffer>> {
		let fields = compound.fields();
		let changed: Vec<usize> = (0..fields.len())
			.filter(|&index| self.values[index].is_some() && !fields[index].ty.is_fixed_size())
			.collect();
		if changed.is_empty() {
			return Ok(None);
		}

		let mut out = Vec::with_capacity(buffer.len());
		let mut cursor = 0;
		for index in changed {
			let slot = self.slot(compound, buffer, index)?;
			let skip = fields[index].skip;
			out.extend_from_slice(&buffer.read(cursor, slot.offset - cursor)?);
			if let Some(value) = &self.values[index] {
				out.extend_from_slice(&value.to_bytes()?);
			}
			out.resize(out.len() + skip, 0);
			cursor = slot.offset + slot.size + skip;
		}
		out.extend_from_slice(&buffer.read(cursor, buffer.len() - cursor)?);
		Ok(Some(Buffer::from_vec(out)))
	}
}

/// Compound field access.
impl Value {
	/// Sub-value for the field `name`; repeated calls return the same object until the layout is rebuilt.
	///
	/// Fixed-size fields are views into this value's buffer. Variable-size
	/// fields are private copies whose changes land on [`Value::apply_changes`],
	/// which also drops every cached field.
	pub fn field(&self, name: &str) -> Result<Value> {
		let index = self.field_index(name)?;
		self.with_compound("field", |compound, buffer, cache| cache.field(compound, buffer, index))
	}

	/// Copy `value` onto the field `name`; the field's type must match.
	pub fn set_field(&self, name: &str, value: &Value) -> Result<()> {
		self.field(name)?.assign(value)
	}

	/// Whether the compound declares `name`.
	pub fn has_field(&self, name: &str) -> Result<bool> {
		self.with_compound("has_field", |compound, _, _| Ok(compound.field_index(name).is_some()))
	}

	/// Declared field names in order.
	pub fn field_names(&self) -> Result<Vec<String>> {
		self.with_compound("field_names", |compound, _, _| Ok(compound.fields().iter().map(|field| field.name.to_string()).collect()))
	}

	/// Live offset and size of the field `name`, with its type.
	pub fn field_offset_and_size(&self, name: &str) -> Result<(FieldSlot, TypeRef)> {
		let index = self.field_index(name)?;
		self.with_compound("field_offset_and_size", |compound, buffer, cache| {
			let slot = cache.slot(compound, buffer, index)?;
			Ok((slot, compound.fields()[index].ty.clone()))
		})
	}

	/// Number of buffer measurements performed by lazy offset scans so far.
	pub fn scan_count(&self) -> Result<usize> {
		match self.with_compound("scan_count", |_, _, cache| Ok(cache.scans())) {
			Err(MarshalError::WrongKind { .. }) => self.with_sequence("scan_count", |_, _, sequence| Ok(sequence.scans())),
			other => other,
		}
	}

	fn field_index(&self, name: &str) -> Result<usize> {
		self.with_compound("field", |compound, _, _| Ok(compound.field_index(name)))?
			.ok_or_else(|| MarshalError::UnknownField {
				type_name: self.ty().name().to_owned(),
				field: name.to_owned(),
			})
	}

	pub(crate) fn compound_to_native(&self, compound: &CompoundType) -> Result<NativeValue> {
		let fields = compound
			.fields()
			.iter()
			.map(|field| {
				Ok(NativeField {
					name: field.name.clone(),
					value: self.field(&field.name)?.to_native()?,
				})
			})
			.collect::<Result<Vec<_>>>()?;
		Ok(NativeValue::Record(Record {
			type_name: self.ty().name().into(),
			fields,
		}))
	}

	pub(crate) fn fill_compound(&self, compound: &CompoundType, native: &NativeValue) -> Result<()> {
		let Some(record) = native.as_record() else {
			return Err(MarshalError::NativeMismatch {
				type_name: self.ty().name().to_owned(),
				expected: "record",
				got: native.kind_name().to_owned(),
			});
		};
		if let Some(unknown) = record.fields.iter().find(|field| compound.field_index(&field.name).is_none()) {
			return Err(MarshalError::UnknownField {
				type_name: self.ty().name().to_owned(),
				field: unknown.name.to_string(),
			});
		}

		for field in &record.fields {
			self.field(&field.name)?.set_native(&field.value)?;
		}
		Ok(())
	}

	pub(crate) fn apply_compound_changes(&self) -> Result<()> {
		let old_size = self.buffer().len();
		let rebuilt = self.with_compound("apply_changes", |compound, buffer, cache| cache.rebuild(compound, buffer))?;
		if let Some(rebuilt) = rebuilt {
			let ty = self.ty();
			debug!(type_name = ty.name(), old_size, new_size = rebuilt.len(), "rebuilt compound buffer");
			self.reset_buffer(rebuilt)?;
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests;
