use std::fmt::Write;

use typelib::marshal::NativeValue;

/// Output truncation and formatting limits for native value trees.
#[derive(Debug, Clone, Copy)]
pub struct PrintOptions {
	/// Maximum number of fields printed for a single record.
	pub max_fields_per_record: usize,
	/// Maximum number of elements printed for lists and byte blobs.
	pub max_list_items: usize,
	/// Maximum recursive print depth for nested lists/records.
	pub max_print_depth: u32,
}

impl Default for PrintOptions {
	fn default() -> Self {
		Self {
			max_fields_per_record: 80,
			max_list_items: 16,
			max_print_depth: 6,
		}
	}
}

impl PrintOptions {
	/// Preset for one-screen summaries.
	pub fn compact() -> Self {
		Self {
			max_fields_per_record: 20,
			max_list_items: 8,
			max_print_depth: 3,
		}
	}
}

/// Print one native value tree.
pub fn print_native(value: &NativeValue, indent: usize, depth: u32, options: PrintOptions) {
	print!("{}", render_native(value, indent, depth, options));
}

/// Render one native value tree as indented text.
pub fn render_native(value: &NativeValue, indent: usize, depth: u32, options: PrintOptions) -> String {
	let mut out = String::new();
	write_native(&mut out, value, indent, depth, options);
	out
}

fn write_native(out: &mut String, value: &NativeValue, indent: usize, depth: u32, options: PrintOptions) {
	let pad = " ".repeat(indent);
	match value {
		NativeValue::Null => line(out, &pad, "null"),
		NativeValue::Bool(v) => line(out, &pad, &v.to_string()),
		NativeValue::I64(v) => line(out, &pad, &v.to_string()),
		NativeValue::U64(v) => line(out, &pad, &v.to_string()),
		NativeValue::F64(v) => line(out, &pad, &v.to_string()),
		NativeValue::Symbol(v) => line(out, &pad, v),
		NativeValue::Bytes(v) => line(out, &pad, &render_bytes(v, options.max_list_items)),
		NativeValue::List(items) => {
			if depth >= options.max_print_depth {
				line(out, &pad, &format!("[... {} items]", items.len()));
				return;
			}
			line(out, &pad, "[");
			for item in items.iter().take(options.max_list_items) {
				write_native(out, item, indent + 2, depth + 1, options);
			}
			if items.len() > options.max_list_items {
				line(out, &pad, &format!("  ... {} more", items.len() - options.max_list_items));
			}
			line(out, &pad, "]");
		}
		NativeValue::Record(record) => {
			let head = if record.type_name.is_empty() { "{".to_owned() } else { format!("{} {{", record.type_name) };
			if depth >= options.max_print_depth {
				line(out, &pad, &format!("{} ... }}", head));
				return;
			}
			line(out, &pad, &head);
			for field in record.fields.iter().take(options.max_fields_per_record) {
				if matches!(field.value, NativeValue::List(_) | NativeValue::Record(_)) {
					line(out, &pad, &format!("  {} =", field.name));
					write_native(out, &field.value, indent + 4, depth + 1, options);
				} else {
					let _ = write!(out, "{}  {} = ", pad, field.name);
					write_native(out, &field.value, 0, depth + 1, options);
				}
			}
			if record.fields.len() > options.max_fields_per_record {
				line(out, &pad, &format!("  ... {} more fields", record.fields.len() - options.max_fields_per_record));
			}
			line(out, &pad, "}");
		}
	}
}

fn line(out: &mut String, pad: &str, text: &str) {
	let _ = writeln!(out, "{pad}{text}");
}

fn render_bytes(bytes: &[u8], max_items: usize) -> String {
	let mut out = format!("bytes[{}]", bytes.len());
	for byte in bytes.iter().take(max_items) {
		let _ = write!(out, " {byte:02x}");
	}
	if bytes.len() > max_items {
		out.push_str(" ...");
	}
	out
}
