use std::path::Path;

use serde::Serialize;
use typelib::marshal::{Registry, Result, TypeRef};

/// Load a schema document and resolve one type from it.
pub(crate) fn load_type(schema: &Path, type_name: &str) -> Result<(Registry, TypeRef)> {
	let registry = Registry::from_json_file(schema)?;
	let ty = registry.resolve(type_name)?;
	Ok((registry, ty))
}

/// Render a static size, or `variable`.
pub(crate) fn size_label(size: Option<usize>) -> String {
	size.map_or_else(|| "variable".to_owned(), |size| size.to_string())
}

/// Print a serializable payload as pretty JSON on stdout.
pub(crate) fn emit_json<T: Serialize>(payload: &T) {
	match serde_json::to_string_pretty(payload) {
		Ok(text) => println!("{text}"),
		Err(err) => eprintln!("error: json encode: {err}"),
	}
}
