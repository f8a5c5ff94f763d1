//! Append-only log of every irreversible block (spec §4.2 "Block log"),
//! indexed by block number so a range of blocks can be served without
//! walking the fork database.

use std::collections::BTreeMap;

use chain_common::crypto::ObjectId160;
use chain_common::error::{ChainError, ChainResult};

/// In-memory stand-in for the on-disk append-only block log. Block bytes
/// are opaque here; the pipeline is responsible for encoding/decoding them.
pub struct BlockLog {
	blocks: BTreeMap<u32, (ObjectId160, Vec<u8>)>,
	head: u32,
}

impl BlockLog {
	pub fn new() -> Self {
		BlockLog { blocks: BTreeMap::new(), head: 0 }
	}

	/// Appends a block, which must be exactly one past the current head.
	pub fn append(&mut self, block_number: u32, block_id: ObjectId160, encoded: Vec<u8>) -> ChainResult<()> {
		if block_number != self.head + 1 && !(self.head == 0 && self.blocks.is_empty() && block_number == 1) {
			return Err(ChainError::InvalidBlock(format!(
				"block log append out of order: head={}, got={}",
				self.head, block_number
			)));
		}
		self.blocks.insert(block_number, (block_id, encoded));
		self.head = block_number;
		Ok(())
	}

	pub fn read_block(&self, block_number: u32) -> ChainResult<&[u8]> {
		self.blocks
			.get(&block_number)
			.map(|(_, bytes)| bytes.as_slice())
			.ok_or_else(|| ChainError::NotFound(format!("block log entry #{block_number}")))
	}

	pub fn read_block_id(&self, block_number: u32) -> ChainResult<ObjectId160> {
		self.blocks
			.get(&block_number)
			.map(|(id, _)| *id)
			.ok_or_else(|| ChainError::NotFound(format!("block log entry #{block_number}")))
	}

	pub fn head(&self) -> u32 {
		self.head
	}

	/// Truncates the log back to `block_number`, discarding everything
	/// after it (used by `reindex`/`wipe` recovery paths, spec §6 Scenario F).
	pub fn truncate(&mut self, block_number: u32) {
		self.blocks.retain(|&n, _| n <= block_number);
		self.head = block_number;
	}
}

impl Default for BlockLog {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn append_rejects_out_of_order_blocks() {
		let mut log = BlockLog::new();
		log.append(1, ObjectId160::zero(), vec![1]).unwrap();
		assert!(log.append(3, ObjectId160::zero(), vec![3]).is_err());
		log.append(2, ObjectId160::zero(), vec![2]).unwrap();
		assert_eq!(log.head(), 2);
	}

	#[test]
	fn truncate_discards_later_blocks() {
		let mut log = BlockLog::new();
		log.append(1, ObjectId160::zero(), vec![1]).unwrap();
		log.append(2, ObjectId160::zero(), vec![2]).unwrap();
		log.truncate(1);
		assert_eq!(log.head(), 1);
		assert!(log.read_block(2).is_err());
	}
}
