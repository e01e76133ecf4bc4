use std::path::PathBuf;

use typelib::marshal::{Registry, Result, Type, TypeKind};

use crate::cmd::util::{emit_json, size_label};

#[derive(clap::Args)]
pub struct Args {
	#[arg(long)]
	pub schema: PathBuf,
	#[arg(long = "type")]
	pub type_name: Option<String>,
	#[arg(long)]
	pub json: bool,
}

/// List the types of a schema document, or show one type's layout.
pub fn run(args: Args) -> Result<()> {
	let Args { schema, type_name, json } = args;
	let registry = Registry::from_json_file(&schema)?;

	if let Some(name) = type_name {
		let ty = registry.resolve(&name)?;
		if json {
			emit_json(&describe(&ty));
		} else {
			print_layout(&ty);
		}
		return Ok(());
	}

	if json {
		emit_json(&TypesJson {
			schema: schema.display().to_string(),
			types: registry.iter().map(|ty| summarize(ty)).collect(),
		});
		return Ok(());
	}

	println!("schema: {}", schema.display());
	println!("types: {}", registry.len());
	println!("name\tkind\tsize");
	for ty in registry.iter() {
		println!("{}\t{}\t{}", ty.name(), ty.kind_name(), size_label(ty.byte_size()));
	}
	Ok(())
}

fn print_layout(ty: &Type) {
	println!("type: {}", ty.name());
	println!("kind: {}", ty.kind_name());
	println!("size: {}", size_label(ty.byte_size()));
	println!("min_size: {}", ty.min_size());

	match ty.kind() {
		TypeKind::Numeric(numeric) => {
			let pack = numeric.pack_code();
			println!("category: {}", pack.category().as_str());
			println!("endianness: {}", pack.endianness().as_str());
		}
		TypeKind::Enum(enumeration) => {
			println!("endianness: {}", enumeration.pack_code().endianness().as_str());
			println!("symbols: {}", enumeration.symbols().len());
			for (symbol, value) in enumeration.symbols() {
				println!("  {symbol} = {value}");
			}
		}
		TypeKind::Opaque(_) => {}
		TypeKind::Array(array) => {
			println!("element: {}", array.element.name());
			println!("length: {}", array.length);
		}
		TypeKind::Container(container) => {
			println!("container: {}", container.container_name);
			println!("element: {}", container.element.name());
		}
		TypeKind::Compound(compound) => {
			println!("fields: {}", compound.fields().len());
			println!("offset\tsize\tskip\tname\ttype");
			for field in compound.fields() {
				println!(
					"{}\t{}\t{}\t{}\t{}",
					field.offset,
					size_label(field.ty.byte_size()),
					field.skip,
					field.name,
					field.ty.name()
				);
			}
		}
	}
}

fn summarize(ty: &Type) -> TypeSummaryJson {
	TypeSummaryJson {
		name: ty.name().to_owned(),
		kind: ty.kind_name(),
		size: ty.byte_size(),
	}
}

fn describe(ty: &Type) -> TypeJson {
	let mut out = TypeJson {
		name: ty.name().to_owned(),
		kind: ty.kind_name(),
		size: ty.byte_size(),
		min_size: ty.min_size(),
		element: ty.element_type().map(|element| element.name().to_owned()),
		length: ty.length(),
		fields: Vec::new(),
		symbols: Vec::new(),
	};

	match ty.kind() {
		TypeKind::Compound(compound) => {
			out.fields = compound
				.fields()
				.iter()
				.map(|field| FieldJson {
					name: field.name.to_string(),
					type_name: field.ty.name().to_owned(),
					offset: field.offset,
					size: field.ty.byte_size(),
					skip: field.skip,
				})
				.collect();
		}
		TypeKind::Enum(enumeration) => {
			out.symbols = enumeration.symbols().iter().map(|(symbol, value)| (symbol.to_string(), *value)).collect();
		}
		_ => {}
	}
	out
}

#[derive(serde::Serialize)]
struct TypesJson {
	schema: String,
	types: Vec<TypeSummaryJson>,
}

#[derive(serde::Serialize)]
struct TypeSummaryJson {
	name: String,
	kind: &'static str,
	size: Option<usize>,
}

#[derive(serde::Serialize)]
struct FieldJson {
	name: String,
	#[serde(rename = "type")]
	type_name: String,
	offset: usize,
	size: Option<usize>,
	skip: usize,
}

#[derive(serde::Serialize)]
struct TypeJson {
	name: String,
	kind: &'static str,
	size: Option<usize>,
	min_size: usize,
	element: Option<String>,
	length: Option<usize>,
	#[serde(skip_serializing_if = "Vec::is_empty")]
	fields: Vec<FieldJson>,
	#[serde(skip_serializing_if = "Vec::is_empty")]
	symbols: Vec<(String, i64)>,
}
