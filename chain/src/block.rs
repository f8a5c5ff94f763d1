//! Block headers and blocks (spec §3.1, §4.4).

use codec::{Decode, Encode};
use serde::{Deserialize, Serialize};

use chain_common::crypto::{ObjectId160, Sha256Hash, Signature};
use chain_common::{AccountName, TimePoint};

use crate::operation::Transaction;

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
pub struct BlockHeader {
	pub previous: ObjectId160,
	pub block_number: u32,
	pub timestamp: TimePoint,
	pub producer: AccountName,
	pub transaction_merkle_root: Sha256Hash,
}

impl BlockHeader {
	pub fn digest(&self) -> Sha256Hash {
		Sha256Hash::hash(&self.encode())
	}

	pub fn id(&self) -> ObjectId160 {
		ObjectId160::block_id(&self.digest(), self.block_number)
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
pub struct Block {
	pub header: BlockHeader,
	pub transactions: Vec<Transaction>,
	pub producer_signature: Signature,
}

impl Block {
	pub fn id(&self) -> ObjectId160 {
		self.header.id()
	}

	/// The header's signing digest, which the producer signs over and every
	/// other node re-derives to verify `producer_signature` (spec §4.4.1).
	pub fn digest_for_signing(&self) -> Sha256Hash {
		self.header.digest()
	}

	/// Root of the transaction ids, used as [`BlockHeader::transaction_merkle_root`].
	/// A flat chained hash rather than a binary Merkle tree: this chain's
	/// light clients always fetch full blocks, so the tree's partial-proof
	/// property is not needed, only a cheap binding commitment.
	pub fn compute_transaction_root(transactions: &[Transaction]) -> Sha256Hash {
		let mut bytes = Vec::new();
		for tx in transactions {
			bytes.extend_from_slice(&tx.id().0);
		}
		Sha256Hash::hash(&bytes)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn block_id_embeds_its_header_height() {
		let header = BlockHeader {
			previous: ObjectId160::zero(),
			block_number: 42,
			timestamp: TimePoint(0),
			producer: AccountName::new("alice").unwrap(),
			transaction_merkle_root: Block::compute_transaction_root(&[]),
		};
		assert_eq!(header.id().block_number(), 42);
	}
}
