/// Value file decoding command.
pub mod decode;
/// Native JSON encoding command.
pub mod encode;
/// Native value tree renderer.
pub mod print;
/// Schema type inspection command.
pub mod types;
/// Shared command helpers.
pub mod util;

#[cfg(test)]
pub(crate) mod test_support;
