use std::path::PathBuf;

use typelib::marshal::{LoadOptions, Result, ValueFile};

use crate::cmd::print::{PrintOptions, print_native};
use crate::cmd::util::{emit_json, load_type};

#[derive(clap::Args)]
pub struct Args {
	pub file: PathBuf,
	#[arg(long)]
	pub schema: PathBuf,
	#[arg(long = "type")]
	pub type_name: String,
	#[arg(long)]
	pub json: bool,
	/// Reject bytes left over after the value.
	#[arg(long)]
	pub strict: bool,
	/// Print fewer fields and list items.
	#[arg(long)]
	pub compact: bool,
}

/// Decode a value file as `--type` and print its native form.
pub fn run(args: Args) -> Result<()> {
	let Args {
		file,
		schema,
		type_name,
		json,
		strict,
		compact,
	} = args;

	let (_registry, ty) = load_type(&schema, &type_name)?;
	let stored = ValueFile::open(&file)?;
	let options = if strict { LoadOptions::strict() } else { LoadOptions::default() };
	let value = stored.load(&ty, &options)?;
	let native = value.to_native()?;

	if json {
		emit_json(&DecodeJson {
			path: file.display().to_string(),
			type_name: ty.name().to_owned(),
			compression: stored.compression.as_str(),
			size: value.byte_size()?,
			value: native.to_json(),
		});
		return Ok(());
	}

	println!("path: {}", file.display());
	println!("type: {}", ty.name());
	println!("compression: {}", stored.compression.as_str());
	println!("size: {}", value.byte_size()?);
	let print_options = if compact { PrintOptions::compact() } else { PrintOptions::default() };
	print_native(&native, 0, 0, print_options);
	Ok(())
}

#[derive(serde::Serialize)]
struct DecodeJson {
	path: String,
	#[serde(rename = "type")]
	type_name: String,
	compression: &'static str,
	size: usize,
	value: serde_json::Value,
}
