//! Runtime type descriptors and buffer-backed binary values laid out like C data.

/// Byte buffers, type descriptors, typed values, and their (de)serialization.
pub mod marshal;
