use std::collections::BTreeMap;
use std::rc::Rc;

use tracing::trace;

use crate::marshal::{Buffer, Endianness, MarshalError, Result, TypeRef, Value};

/// Lazy element cache shared by arrays and containers.
///
/// Elements `0..loaded` have their bytes in the owning value's buffer, starting
/// at `data_start`. Elements `loaded..size` were added in memory and exist only
/// as cached values until the owner applies its changes. Byte offsets of
/// variable-size elements are discovered by a forward scan and kept as a known
/// prefix in `offsets` (relative to `data_start`, `offsets[0] == 0`).
pub(crate) struct ValueSequence {
	element: TypeRef,
	data_start: usize,
	size: usize,
	loaded: usize,
	offsets: Vec<usize>,
	elements: BTreeMap<usize, Value>,
	dirty: bool,
	scans: usize,
}

impl ValueSequence {
	pub(crate) fn new(element: &TypeRef, data_start: usize, count: usize) -> Self {
		Self {
			element: Rc::clone(element),
			data_start,
			size: count,
			loaded: count,
			offsets: vec![0],
			elements: BTreeMap::new(),
			dirty: false,
			scans: 0,
		}
	}

	pub(crate) fn element(&self) -> &TypeRef {
		&self.element
	}

	pub(crate) fn len(&self) -> usize {
		self.size
	}

	pub(crate) fn loaded(&self) -> usize {
		self.loaded
	}

	pub(crate) fn scans(&self) -> usize {
		self.scans
	}

	fn check_index(&self, index: usize) -> Result<()> {
		if index >= self.size {
			return Err(MarshalError::IndexOutOfRange { index, len: self.size });
		}
		Ok(())
	}

	/// Absolute offset and size of a loaded element inside `buffer`.
	pub(crate) fn offset_and_size(&mut self, buffer: &Buffer, index: usize) -> Result<(usize, usize)> {
		if index >= self.loaded {
			return Err(MarshalError::IndexOutOfRange { index, len: self.loaded });
		}
		if let Some(size) = self.element.byte_size() {
			return Ok((self.data_start + index * size, size));
		}

		while self.offsets.len() <= index + 1 {
			let position = self.offsets.len() - 1;
			let start = self.offsets[position];
			let size = self.element.buffer_size_at(buffer, self.data_start + start)?;
			trace!(element = self.element.name(), index = position, offset = start, size, "scanned element");
			self.offsets.push(start + size);
			self.scans += 1;
		}
		let start = self.offsets[index];
		Ok((self.data_start + start, self.offsets[index + 1] - start))
	}

	/// Cached element, or a freshly materialized one: a view for fixed-size elements, a private copy otherwise.
	pub(crate) fn get(&mut self, buffer: &Buffer, index: usize) -> Result<Value> {
		self.check_index(index)?;
		if let Some(value) = self.elements.get(&index) {
			return Ok(value.clone());
		}

		let (offset, size) = self.offset_and_size(buffer, index)?;
		let value = if self.element.is_fixed_size() {
			Value::wrap(&self.element, buffer.view(offset, size)?)?
		} else {
			Value::wrap(&self.element, Buffer::from_vec(buffer.read(offset, size)?))?
		};
		self.elements.insert(index, value.clone());
		Ok(value)
	}

	/// Replace the cached element at `index`; its bytes reach the buffer on the next rebuild.
	pub(crate) fn set_cached(&mut self, index: usize, value: Value) -> Result<()> {
		self.check_index(index)?;
		self.elements.insert(index, value);
		self.dirty = true;
		Ok(())
	}

	pub(crate) fn push(&mut self, value: Value) {
		self.elements.insert(self.size, value);
		self.size += 1;
		self.dirty = true;
	}

	/// Drop every element at `len` and above.
	pub(crate) fn truncate(&mut self, len: usize) {
		if len >= self.size {
			return;
		}
		self.elements.split_off(&len);
		self.size = len;
		if len < self.loaded {
			self.loaded = len;
			self.offsets.truncate(len + 1);
		}
		self.dirty = true;
	}

	/// Remove one element.
	///
	/// A loaded element's bytes are dropped by swapping `buffer` for a fresh
	/// copy without them, so other windows over the old backing array stay
	/// intact. Cached values above `index` move down one slot; every cached
	/// fixed-size element is returned with the view it must be re-pointed at.
	pub(crate) fn delete_at(&mut self, buffer: &mut Buffer, index: usize) -> Result<Vec<(Value, Buffer)>> {
		self.check_index(index)?;

		if index >= self.loaded {
			self.remove_cached(index);
			self.size -= 1;
			return Ok(Vec::new());
		}

		let (offset, size) = self.offset_and_size(buffer, index)?;
		let mut bytes = buffer.to_vec();
		bytes.drain(offset..offset + size);
		*buffer = Buffer::from_vec(bytes);
		self.remove_cached(index);
		if !self.element.is_fixed_size() {
			self.offsets.remove(index + 1);
			for later in &mut self.offsets[index + 1..] {
				*later -= size;
			}
		}
		self.loaded -= 1;
		self.size -= 1;
		self.cached_views(buffer)
	}

	fn remove_cached(&mut self, index: usize) {
		self.elements.remove(&index);
		let shifted = self.elements.split_off(&index);
		self.elements.extend(shifted.into_iter().map(|(slot, value)| (slot - 1, value)));
	}

	/// Views for every cached loaded element of a fixed-size sequence re-pointed at `buffer`.
	pub(crate) fn cached_views(&self, buffer: &Buffer) -> Result<Vec<(Value, Buffer)>> {
		let Some(element_size) = self.element.byte_size() else {
			return Ok(Vec::new());
		};
		self.elements
			.range(..self.loaded)
			.map(|(&slot, value)| Ok((value.clone(), buffer.view(self.data_start + slot * element_size, element_size)?)))
			.collect()
	}

	/// Rebuild a container of fixed-size elements when its element count or pending set changed.
	///
	/// Returns the new buffer and every cached element paired with its view in it.
	pub(crate) fn rebuild_fixed(&mut self, buffer: &Buffer) -> Result<Option<(Buffer, Vec<(Value, Buffer)>)>> {
		if !self.dirty {
			return Ok(None);
		}
		let Some(element_size) = self.element.byte_size() else {
			return Ok(None);
		};

		let mut out = Vec::with_capacity(self.data_start + self.size * element_size);
		out.extend_from_slice(&buffer.read(0, self.data_start)?);
		out.extend_from_slice(&buffer.read(self.data_start, self.loaded * element_size)?);
		for slot in self.loaded..self.size {
			let bytes = match self.elements.get(&slot) {
				Some(value) => value.to_bytes()?,
				None => vec![0_u8; element_size],
			};
			out.extend_from_slice(&bytes);
		}

		let rebuilt = Buffer::from_vec(out);
		write_count(&rebuilt, self.data_start, self.size)?;
		self.loaded = self.size;
		self.dirty = false;
		let views = self.cached_views(&rebuilt)?;
		Ok(Some((rebuilt, views)))
	}

	/// Rebuild a sequence of variable-size elements by concatenating every element's current form.
	///
	/// Cached elements keep their private buffers, which now equal their region of the result.
	pub(crate) fn rebuild_variable(&mut self, buffer: &Buffer) -> Result<Option<Buffer>> {
		if !self.dirty && self.elements.is_empty() {
			return Ok(None);
		}

		let mut out = buffer.read(0, self.data_start)?;
		let mut offsets = Vec::with_capacity(self.size + 1);
		offsets.push(0);
		for slot in 0..self.size {
			let bytes = match self.elements.get(&slot) {
				Some(value) => value.to_bytes()?,
				None => {
					let (offset, size) = self.offset_and_size(buffer, slot)?;
					buffer.read(offset, size)?
				}
			};
			out.extend_from_slice(&bytes);
			offsets.push(out.len() - self.data_start);
		}

		let rebuilt = Buffer::from_vec(out);
		write_count(&rebuilt, self.data_start, self.size)?;
		self.offsets = offsets;
		self.loaded = self.size;
		self.dirty = false;
		Ok(Some(rebuilt))
	}
}

/// Containers carry their count in the header that precedes the data; arrays have none.
pub(crate) fn write_count(buffer: &Buffer, data_start: usize, count: usize) -> Result<()> {
	if data_start == 0 {
		return Ok(());
	}
	buffer.write_uint(0, data_start, count as u64, Endianness::Big)
}
