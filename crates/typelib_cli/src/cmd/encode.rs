use std::fs;
use std::path::PathBuf;

use tracing::debug;
use typelib::marshal::{NativeValue, Result, Value, ValueFile, WriteOptions};

use crate::cmd::util::load_type;

#[derive(clap::Args)]
#[command(group(clap::ArgGroup::new("source").required(true).args(["value", "input"])))]
pub struct Args {
	#[arg(long)]
	pub schema: PathBuf,
	#[arg(long = "type")]
	pub type_name: String,
	/// Native value as inline JSON.
	#[arg(long)]
	pub value: Option<String>,
	/// File holding the native value as JSON.
	#[arg(long)]
	pub input: Option<PathBuf>,
	#[arg(short = 'o', long)]
	pub output: PathBuf,
	#[arg(long)]
	pub zstd: bool,
}

/// Encode a native JSON value as `--type` and write the serialized bytes.
pub fn run(args: Args) -> Result<()> {
	let Args {
		schema,
		type_name,
		value,
		input,
		output,
		zstd,
	} = args;

	let (_registry, ty) = load_type(&schema, &type_name)?;
	let text = match (value, input) {
		(Some(text), _) => text,
		(None, Some(path)) => fs::read_to_string(path)?,
		(None, None) => "null".to_owned(),
	};
	let native = NativeValue::from_json(&serde_json::from_str(&text)?);
	debug!(type_name = %type_name, "encoding native value");

	let value = Value::from_native(&ty, &native)?;
	let options = if zstd { WriteOptions::zstd() } else { WriteOptions::default() };
	ValueFile::write(&output, &value, options)?;

	println!("type: {}", ty.name());
	println!("bytes: {}", value.byte_size()?);
	println!("compression: {}", options.compression.as_str());
	println!("output: {}", output.display());
	Ok(())
}
