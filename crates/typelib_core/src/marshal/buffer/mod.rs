use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::marshal::{Endianness, MarshalError, Result};

/// Bounds-checked window over a shared, mutable byte array.
///
/// Cloning a buffer or carving a [`Buffer::view`] never copies bytes: every
/// window aliases the same backing array, so a write through one window is
/// visible through all others that cover the same bytes. All offsets taken by
/// the methods below are relative to the window start.
///
/// The backing array is not synchronized. One logical owner is expected to
/// drive a buffer graph at a time.
#[derive(Clone)]
pub struct Buffer {
	backing: Rc<RefCell<Vec<u8>>>,
	offset: usize,
	size: usize,
}

impl Buffer {
	/// Allocate a zero-filled buffer of `size` bytes.
	pub fn new(size: usize) -> Self {
		Self::from_vec(vec![0_u8; size])
	}

	/// Wrap owned bytes as a whole buffer.
	pub fn from_vec(bytes: Vec<u8>) -> Self {
		let size = bytes.len();
		Self {
			backing: Rc::new(RefCell::new(bytes)),
			offset: 0,
			size,
		}
	}

	/// Copy a byte slice into a fresh whole buffer.
	pub fn from_slice(bytes: &[u8]) -> Self {
		Self::from_vec(bytes.to_vec())
	}

	/// Number of addressable bytes in this window.
	pub fn len(&self) -> usize {
		self.size
	}

	/// Whether the window addresses no bytes.
	pub fn is_empty(&self) -> bool {
		self.size == 0
	}

	/// Start of this window inside the backing array.
	pub fn offset(&self) -> usize {
		self.offset
	}

	/// Current length of the backing array.
	pub fn backing_len(&self) -> usize {
		self.backing.borrow().len()
	}

	/// Whether this window covers the entire backing array.
	pub fn is_whole(&self) -> bool {
		self.offset == 0 && self.size == self.backing_len()
	}

	/// Whether both windows alias the same backing array.
	pub fn same_backing(&self, other: &Buffer) -> bool {
		Rc::ptr_eq(&self.backing, &other.backing)
	}

	/// Validate that `offset..offset + size` lies inside this window.
	///
	/// A window left reaching past the end of a shrunk backing array only
	/// addresses the bytes still present.
	pub fn check(&self, offset: usize, size: usize) -> Result<()> {
		let live = self.live_len();
		match offset.checked_add(size) {
			Some(end) if end <= live => Ok(()),
			_ => Err(MarshalError::OutOfBounds { offset, size, len: live }),
		}
	}

	fn live_len(&self) -> usize {
		self.backing_len().saturating_sub(self.offset).min(self.size)
	}

	fn live_range(&self, backing_len: usize) -> std::ops::Range<usize> {
		let end = (self.offset + self.size).min(backing_len);
		self.offset.min(end)..end
	}

	/// Carve a sub-window sharing the same backing array.
	pub fn view(&self, offset: usize, size: usize) -> Result<Buffer> {
		self.check(offset, size)?;
		Ok(Buffer {
			backing: Rc::clone(&self.backing),
			offset: self.offset + offset,
			size,
		})
	}

	/// Run `f` over the bytes of this window without copying them.
	pub fn with_bytes<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
		let backing = self.backing.borrow();
		f(&backing[self.live_range(backing.len())])
	}

	/// Copy `size` bytes starting at `offset`.
	pub fn read(&self, offset: usize, size: usize) -> Result<Vec<u8>> {
		self.check(offset, size)?;
		let start = self.offset + offset;
		Ok(self.backing.borrow()[start..start + size].to_vec())
	}

	/// Copy the full window into an owned vector.
	pub fn to_vec(&self) -> Vec<u8> {
		self.with_bytes(<[u8]>::to_vec)
	}

	/// Read exactly `N` bytes at `offset`.
	pub fn read_array<const N: usize>(&self, offset: usize) -> Result<[u8; N]> {
		self.check(offset, N)?;
		let start = self.offset + offset;
		let mut out = [0_u8; N];
		out.copy_from_slice(&self.backing.borrow()[start..start + N]);
		Ok(out)
	}

	/// Overwrite bytes at `offset` in place, visible to every aliasing window.
	pub fn write(&self, offset: usize, bytes: &[u8]) -> Result<()> {
		self.check(offset, bytes.len())?;
		let start = self.offset + offset;
		self.backing.borrow_mut()[start..start + bytes.len()].copy_from_slice(bytes);
		Ok(())
	}

	/// Set every byte of the window to zero.
	pub fn zero(&self) {
		let mut backing = self.backing.borrow_mut();
		let range = self.live_range(backing.len());
		backing[range].fill(0);
	}

	/// Copy this window's bytes onto `other`'s window.
	pub fn copy_to(&self, other: &Buffer) -> Result<()> {
		if self.size != other.size {
			return Err(MarshalError::OutOfBounds {
				offset: 0,
				size: self.size,
				len: other.size,
			});
		}
		let bytes = self.to_vec();
		other.write(0, &bytes)
	}

	/// Physically remove `size` bytes at `offset` from the backing array and shrink this window.
	///
	/// Other windows over the same backing array that start after the removed
	/// range now address shifted bytes; callers owning such windows must
	/// re-point them.
	pub fn delete_range(&mut self, offset: usize, size: usize) -> Result<()> {
		self.check(offset, size)?;
		let start = self.offset + offset;
		self.backing.borrow_mut().drain(start..start + size);
		self.size -= size;
		Ok(())
	}

	/// Read an unsigned integer of `width` bytes (1, 2, 4 or 8).
	pub fn read_uint(&self, offset: usize, width: usize, endianness: Endianness) -> Result<u64> {
		let raw = self.read(offset, width)?;
		let mut wide = [0_u8; 8];
		match endianness {
			Endianness::Little => {
				wide[..width].copy_from_slice(&raw);
				Ok(u64::from_le_bytes(wide))
			}
			Endianness::Big => {
				wide[8 - width..].copy_from_slice(&raw);
				Ok(u64::from_be_bytes(wide))
			}
		}
	}

	/// Write the low `width` bytes of `value` (1, 2, 4 or 8 bytes).
	pub fn write_uint(&self, offset: usize, width: usize, value: u64, endianness: Endianness) -> Result<()> {
		match endianness {
			Endianness::Little => self.write(offset, &value.to_le_bytes()[..width]),
			Endianness::Big => self.write(offset, &value.to_be_bytes()[8 - width..]),
		}
	}
}

impl PartialEq for Buffer {
	fn eq(&self, other: &Self) -> bool {
		if self.size != other.size {
			return false;
		}
		self.with_bytes(|left| other.with_bytes(|right| left == right))
	}
}

impl Eq for Buffer {}

impl fmt::Debug for Buffer {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Buffer")
			.field("offset", &self.offset)
			.field("size", &self.size)
			.field("backing_len", &self.backing_len())
			.finish()
	}
}
