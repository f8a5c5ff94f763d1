//! Node configuration: a TOML file layered with environment overrides and
//! command-line flags (spec §6, SPEC_FULL.md §A), in the shape of the
//! teacher's `engine/src/settings.rs` generalized to the fields this chain
//! needs instead of RPC endpoints.

use std::path::PathBuf;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
	/// Directory holding the append-only block log.
	pub data_dir: PathBuf,
	/// Directory holding the memory-mapped object store.
	pub shared_mem_dir: PathBuf,
	/// Size, in bytes, to reserve for the shared-memory object store file.
	pub shared_file_size: u64,
	/// Account name this node produces blocks as, if any.
	pub producer_name: Option<String>,
	/// Path to a file holding the producer's hex-encoded secp256k1 signing key.
	pub signing_key_file: Option<PathBuf>,
	/// Unix-seconds genesis time used when initializing a fresh data directory.
	pub genesis_time: i64,
	/// Path to a JSON file describing the genesis producer set and balances.
	pub genesis_file: Option<PathBuf>,
}

impl Settings {
	/// Loads defaults, then a TOML file at `config_path` if present, then
	/// `CHAIN_NODE__*` environment overrides (matching the teacher's `__`
	/// section separator convention).
	pub fn load(config_path: Option<&std::path::Path>) -> Result<Self, ConfigError> {
		let mut builder = Config::builder()
			.set_default("data_dir", "./data")?
			.set_default("shared_mem_dir", "./data/shared_memory")?
			.set_default("shared_file_size", 1_u64 << 30)?
			.set_default("genesis_time", 0_i64)?;

		if let Some(path) = config_path {
			builder = builder.add_source(File::from(path).required(false));
		}
		builder = builder.add_source(Environment::with_prefix("CHAIN_NODE").separator("__"));

		builder.build()?.try_deserialize()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn load_applies_defaults_when_no_file_or_env_present() {
		let settings = Settings::load(None).unwrap();
		assert_eq!(settings.data_dir, PathBuf::from("./data"));
		assert_eq!(settings.genesis_time, 0);
	}
}
