//! Drives the `typelib` binary against the schema in `<workspace>/fixtures`.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::OnceLock;

use typelib_testkit::{debug_binary, fixture_path};

/// Invocation context bound to one schema document.
pub(crate) struct Session {
	schema: PathBuf,
}

impl Session {
	/// Session over `fixtures/schema.json`.
	pub(crate) fn fixtures() -> Self {
		Self {
			schema: fixture_path("schema.json"),
		}
	}

	/// Run `command --schema <schema> args...`.
	pub(crate) fn run(&self, command: &str, args: &[&str]) -> Output {
		Command::new(typelib_bin())
			.arg(command)
			.arg("--schema")
			.arg(&self.schema)
			.args(args)
			.output()
			.unwrap_or_else(|err| panic!("spawn {command}: {err}"))
	}

	/// Run a command that must succeed, returning its stdout.
	pub(crate) fn stdout(&self, command: &str, args: &[&str]) -> String {
		let output = self.run(command, args);
		assert!(output.status.success(), "typelib {command} exited with {}: {}", output.status, String::from_utf8_lossy(&output.stderr));
		String::from_utf8_lossy(&output.stdout).into_owned()
	}

	/// Run a command with `--json` and parse its stdout.
	pub(crate) fn json(&self, command: &str, args: &[&str]) -> serde_json::Value {
		let mut args = args.to_vec();
		args.push("--json");
		let text = self.stdout(command, &args);
		serde_json::from_str(&text).unwrap_or_else(|err| panic!("typelib {command} printed invalid json: {err}\n{text}"))
	}

	/// Encode a native fixture as `type_name` into `dir`, returning the written file.
	pub(crate) fn encode_fixture(&self, dir: &Path, type_name: &str, input: &str, zstd: bool) -> PathBuf {
		let out = dir.join(format!("{}.bin", input.trim_end_matches(".json")));
		let input = fixture_path(input);
		let mut args = vec!["--type", type_name, "--input", path_arg(&input), "-o", path_arg(&out)];
		if zstd {
			args.push("--zstd");
		}
		self.stdout("encode", &args);
		out
	}

	/// Decode `file` as `type_name` and return the JSON payload.
	pub(crate) fn decode_json(&self, file: &Path, type_name: &str) -> serde_json::Value {
		self.json("decode", &[path_arg(file), "--type", type_name])
	}
}

/// Borrow a UTF-8 path as a command argument.
pub(crate) fn path_arg(path: &Path) -> &str {
	path.to_str().unwrap_or_else(|| panic!("non-utf8 path {}", path.display()))
}

fn typelib_bin() -> &'static Path {
	static BIN: OnceLock<PathBuf> = OnceLock::new();
	BIN.get_or_init(|| match option_env!("CARGO_BIN_EXE_typelib") {
		Some(path) => PathBuf::from(path),
		None => build_typelib(),
	})
}

fn build_typelib() -> PathBuf {
	let status = Command::new(env!("CARGO"))
		.args(["build", "--quiet", "--bin", "typelib", "--manifest-path"])
		.arg(Path::new(env!("CARGO_MANIFEST_DIR")).join("Cargo.toml"))
		.status()
		.unwrap_or_else(|err| panic!("spawn cargo build: {err}"));
	assert!(status.success(), "cargo build --bin typelib failed");
	debug_binary("typelib")
}
