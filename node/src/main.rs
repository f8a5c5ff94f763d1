//! Node binary: a thin CLI driver over [`chain_core::Pipeline`] exposing the
//! external interface from spec §6 (`open`/`wipe`/`reindex`/`push-block`/
//! `push-transaction`/`generate-block`), in the shape of the teacher's
//! `api/bin/chainflip-lp` CLI entry points.

mod settings;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use chain_common::crypto::{Sha256Hash, Signature};
use chain_common::{AccountName, TimePoint};
use chain_core::{Block, Pipeline, SkipFlags, Transaction};
use clap::{Parser, Subcommand};
use codec::{Decode, Encode};

use settings::Settings;

#[derive(Parser, Debug, Clone)]
#[clap(about = "Delegated proof-of-stake chain node")]
struct Cli {
	#[clap(long = "config", help = "Path to a node settings TOML file")]
	config: Option<PathBuf>,

	#[clap(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
	/// Replays the persisted block log and reports the resulting head.
	Open,
	/// Deletes the data and shared-memory directories.
	Wipe,
	/// Rebuilds chain state from the block log, skipping everything but the merkle check.
	Reindex,
	/// Applies a single SCALE-encoded block file to the chain.
	PushBlock {
		#[clap(long)]
		block_file: PathBuf,
	},
	/// Validates and applies a single JSON-encoded transaction.
	PushTransaction {
		#[clap(long)]
		transaction_file: PathBuf,
	},
	/// Produces a new block over every pending transaction file in `data_dir/pending`.
	GenerateBlock {
		#[clap(long, help = "Unix-seconds timestamp for the new block")]
		when: i64,
	},
}

fn main() -> anyhow::Result<()> {
	tracing_subscriber::FmtSubscriber::builder()
		.with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
		.try_init()
		.expect("failed to init tracing subscriber");

	let cli = Cli::parse();
	let settings = Settings::load(cli.config.as_deref()).context("failed to load node settings")?;

	match cli.command {
		Command::Open => {
			let pipeline = open_pipeline(&settings, SkipFlags::NONE)?;
			tracing::info!(head = pipeline.db.dynamic_global_properties.head_block_number, "opened chain state");
		}
		Command::Wipe => {
			wipe(&settings)?;
			tracing::info!("wiped data and shared-memory directories");
		}
		Command::Reindex => {
			let pipeline = open_pipeline(&settings, SkipFlags::reindex_default())?;
			tracing::info!(head = pipeline.db.dynamic_global_properties.head_block_number, "reindex complete");
		}
		Command::PushBlock { block_file } => {
			let mut pipeline = open_pipeline(&settings, SkipFlags::NONE)?;
			let bytes = fs::read(&block_file)
				.with_context(|| format!("reading block file {}", block_file.display()))?;
			let block = Block::decode(&mut bytes.as_slice()).context("decoding block")?;
			pipeline.push_block(&block, SkipFlags::NONE)?;
			persist_block(&settings, &block)?;
			tracing::info!(block_number = block.header.block_number, id = %block.id(), "pushed block");
		}
		Command::PushTransaction { transaction_file } => {
			let mut pipeline = open_pipeline(&settings, SkipFlags::NONE)?;
			let bytes = fs::read(&transaction_file)
				.with_context(|| format!("reading transaction file {}", transaction_file.display()))?;
			let tx: Transaction = serde_json::from_slice(&bytes).context("decoding transaction json")?;
			let now = pipeline.db.dynamic_global_properties.head_block_time;
			pipeline.apply_transaction(&tx, now, SkipFlags::NONE)?;
			persist_pending_transaction(&settings, &tx)?;
			tracing::info!(id = %tx.id(), "accepted pending transaction");
		}
		Command::GenerateBlock { when } => {
			let mut pipeline = open_pipeline(&settings, SkipFlags::NONE)?;
			let producer_name = settings
				.producer_name
				.as_deref()
				.context("generate-block requires producer_name to be set")?;
			let producer = AccountName::new(producer_name)?;
			let signing_key_file = settings
				.signing_key_file
				.as_deref()
				.context("generate-block requires signing_key_file to be set")?;
			let secret_key = load_signing_key(signing_key_file)?;
			let pending = load_pending_transactions(&settings)?;

			let block = pipeline.produce_block(&producer, pending, TimePoint::from_unix_seconds(when), |digest| {
				sign_digest(&secret_key, digest)
			})?;

			persist_block(&settings, &block)?;
			clear_pending_transactions(&settings)?;
			tracing::info!(block_number = block.header.block_number, id = %block.id(), "generated block");
		}
	}

	Ok(())
}

/// Replays every block under `data_dir/blocks` in order, starting a fresh
/// [`Pipeline`] at the configured genesis time (spec §6 `open`/`reindex`).
fn open_pipeline(settings: &Settings, skip: SkipFlags) -> anyhow::Result<Pipeline> {
	let mut pipeline = Pipeline::new(TimePoint::from_unix_seconds(settings.genesis_time));

	let blocks_dir = blocks_dir(settings);
	if !blocks_dir.exists() {
		return Ok(pipeline);
	}

	let mut numbered = Vec::new();
	for entry in fs::read_dir(&blocks_dir).with_context(|| format!("reading {}", blocks_dir.display()))? {
		let entry = entry?;
		let path = entry.path();
		let Some(number) = block_number_from_path(&path) else { continue };
		numbered.push((number, path));
	}
	numbered.sort_by_key(|(number, _)| *number);

	for (number, path) in numbered {
		let bytes = fs::read(&path).with_context(|| format!("reading block file {}", path.display()))?;
		let block = Block::decode(&mut bytes.as_slice())
			.with_context(|| format!("decoding block file {}", path.display()))?;
		if block.header.block_number != number {
			bail!("block file {} is misnamed: contains block #{}", path.display(), block.header.block_number);
		}
		pipeline.apply_block(&block, skip)?;
	}

	Ok(pipeline)
}

fn wipe(settings: &Settings) -> anyhow::Result<()> {
	if settings.data_dir.exists() {
		fs::remove_dir_all(&settings.data_dir)
			.with_context(|| format!("removing {}", settings.data_dir.display()))?;
	}
	if settings.shared_mem_dir.exists() {
		fs::remove_dir_all(&settings.shared_mem_dir)
			.with_context(|| format!("removing {}", settings.shared_mem_dir.display()))?;
	}
	Ok(())
}

fn blocks_dir(settings: &Settings) -> PathBuf {
	settings.data_dir.join("blocks")
}

fn pending_dir(settings: &Settings) -> PathBuf {
	settings.data_dir.join("pending")
}

fn block_number_from_path(path: &Path) -> Option<u32> {
	path.file_stem()?.to_str()?.parse().ok()
}

fn persist_block(settings: &Settings, block: &Block) -> anyhow::Result<()> {
	let dir = blocks_dir(settings);
	fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
	let path = dir.join(format!("{:010}.scale", block.header.block_number));
	fs::write(&path, block.encode()).with_context(|| format!("writing {}", path.display()))
}

fn persist_pending_transaction(settings: &Settings, tx: &Transaction) -> anyhow::Result<()> {
	let dir = pending_dir(settings);
	fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
	let path = dir.join(format!("{}.json", tx.id()));
	let json = serde_json::to_vec_pretty(tx)?;
	fs::write(&path, json).with_context(|| format!("writing {}", path.display()))
}

fn load_pending_transactions(settings: &Settings) -> anyhow::Result<Vec<Transaction>> {
	let dir = pending_dir(settings);
	if !dir.exists() {
		return Ok(Vec::new());
	}
	let mut transactions = Vec::new();
	for entry in fs::read_dir(&dir).with_context(|| format!("reading {}", dir.display()))? {
		let path = entry?.path();
		let bytes = fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
		transactions.push(serde_json::from_slice(&bytes).with_context(|| format!("decoding {}", path.display()))?);
	}
	Ok(transactions)
}

fn clear_pending_transactions(settings: &Settings) -> anyhow::Result<()> {
	let dir = pending_dir(settings);
	if dir.exists() {
		fs::remove_dir_all(&dir).with_context(|| format!("clearing {}", dir.display()))?;
	}
	Ok(())
}

fn load_signing_key(path: &Path) -> anyhow::Result<secp256k1::SecretKey> {
	let hex_str = fs::read_to_string(path)
		.with_context(|| format!("reading signing key file {}", path.display()))?;
	let bytes = hex::decode(hex_str.trim()).context("signing key file is not valid hex")?;
	secp256k1::SecretKey::from_slice(&bytes).context("invalid secp256k1 secret key")
}

fn sign_digest(secret_key: &secp256k1::SecretKey, digest: &Sha256Hash) -> Signature {
	let secp = secp256k1::Secp256k1::signing_only();
	let message = secp256k1::Message::from_digest_slice(&digest.0).expect("digest is 32 bytes");
	Signature(secp.sign_ecdsa(&message, secret_key))
}
