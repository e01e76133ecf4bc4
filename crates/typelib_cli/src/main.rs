#![allow(missing_docs)]

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod cmd;

#[derive(Parser)]
#[command(name = "typelib", about = "Typed binary value tools")]
struct Cli {
	/// Log buffer rebuilds and schema loading.
	#[arg(long, global = true)]
	verbose: bool,
	#[command(subcommand)]
	command: Commands,
}

#[derive(Subcommand)]
enum Commands {
	/// List schema types or show one type's layout.
	Types(cmd::types::Args),
	/// Build a value from native JSON and write its bytes.
	Encode(cmd::encode::Args),
	/// Read a value file and print its native form.
	Decode(cmd::decode::Args),
}

fn main() {
	let cli = Cli::parse();
	init_tracing(cli.verbose);

	if let Err(err) = run(cli.command) {
		eprintln!("error: {err}");
		std::process::exit(1);
	}
}

fn init_tracing(verbose: bool) {
	let filter = if verbose {
		EnvFilter::new("debug")
	} else {
		EnvFilter::try_from_env("TYPELIB_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
	};
	tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn run(command: Commands) -> typelib::marshal::Result<()> {
	match command {
		Commands::Types(args) => cmd::types::run(args),
		Commands::Encode(args) => cmd::encode::run(args),
		Commands::Decode(args) => cmd::decode::run(args),
	}
}
