//! In-memory fork tree (spec §4.2 "Fork database"): every block received
//! since the last irreversible block, kept so the node can switch to a
//! better branch without re-fetching history.

use std::collections::BTreeMap;

use chain_common::crypto::ObjectId160;
use chain_common::error::{ChainError, ChainResult};

use crate::constants::MAX_FORK_DEPTH;

/// One block held in the fork tree, together with the producer-signature
/// weight accumulated behind it (used to pick the best branch head).
#[derive(Debug, Clone)]
pub struct ForkItem<B> {
	pub block_id: ObjectId160,
	pub previous: ObjectId160,
	pub block_number: u32,
	pub block: B,
	pub validated: bool,
}

/// Tracks every block known to the node above the last irreversible block
/// number, indexed by id and by number, with enough bookkeeping to find the
/// current best head and to enumerate a branch back to a common ancestor.
pub struct ForkDatabase<B> {
	items: BTreeMap<ObjectId160, ForkItem<B>>,
	by_number: BTreeMap<u32, Vec<ObjectId160>>,
	head: Option<ObjectId160>,
}

impl<B: Clone> ForkDatabase<B> {
	pub fn new() -> Self {
		ForkDatabase { items: BTreeMap::new(), by_number: BTreeMap::new(), head: None }
	}

	pub fn start_block(&mut self, block_id: ObjectId160, previous: ObjectId160, block_number: u32, block: B) {
		self.by_number.entry(block_number).or_default().push(block_id);
		self.items.insert(
			block_id,
			ForkItem { block_id, previous, block_number, block, validated: false },
		);
		if self.head.is_none() {
			self.head = Some(block_id);
		}
	}

	pub fn push_block(&mut self, block_id: ObjectId160, previous: ObjectId160, block_number: u32, block: B) {
		self.start_block(block_id, previous, block_number, block);
	}

	pub fn mark_validated(&mut self, block_id: &ObjectId160) -> ChainResult<()> {
		let item = self
			.items
			.get_mut(block_id)
			.ok_or_else(|| ChainError::NotFound(format!("fork item {block_id}")))?;
		item.validated = true;
		Ok(())
	}

	pub fn fetch_block(&self, block_id: &ObjectId160) -> Option<&ForkItem<B>> {
		self.items.get(block_id)
	}

	pub fn fetch_block_by_number(&self, block_number: u32) -> Vec<&ForkItem<B>> {
		self.by_number
			.get(&block_number)
			.into_iter()
			.flat_map(|ids| ids.iter())
			.filter_map(|id| self.items.get(id))
			.collect()
	}

	pub fn head(&self) -> Option<&ForkItem<B>> {
		self.head.as_ref().and_then(|id| self.items.get(id))
	}

	pub fn set_head(&mut self, block_id: ObjectId160) -> ChainResult<()> {
		if !self.items.contains_key(&block_id) {
			return Err(ChainError::NotFound(format!("fork item {block_id}")));
		}
		self.head = Some(block_id);
		Ok(())
	}

	/// Walks back from `block_id` to the branch point with the current best
	/// chain (or to the root if no common ancestor is still tracked), most
	/// recent block first. Used to compute which blocks must be undone and
	/// which must be (re)applied when switching forks (spec §4.4.3).
	pub fn fetch_branch_from(&self, block_id: &ObjectId160, other: &ObjectId160) -> (Vec<ObjectId160>, Vec<ObjectId160>) {
		let mut first_branch = Vec::new();
		let mut second_branch = Vec::new();
		let mut first_ancestors: BTreeMap<ObjectId160, usize> = BTreeMap::new();

		let mut cursor = *block_id;
		loop {
			first_ancestors.insert(cursor, first_branch.len());
			first_branch.push(cursor);
			match self.items.get(&cursor) {
				Some(item) if self.items.contains_key(&item.previous) => cursor = item.previous,
				_ => break,
			}
		}

		let mut cursor = *other;
		loop {
			if let Some(&idx) = first_ancestors.get(&cursor) {
				first_branch.truncate(idx);
				break;
			}
			second_branch.push(cursor);
			match self.items.get(&cursor) {
				Some(item) if self.items.contains_key(&item.previous) => cursor = item.previous,
				_ => break,
			}
		}

		(first_branch, second_branch)
	}

	/// Removes a block and everything that descends from it (used when a
	/// block fails validation and must be purged along with its children).
	pub fn remove(&mut self, block_id: &ObjectId160) {
		let Some(item) = self.items.remove(block_id) else { return };
		if let Some(ids) = self.by_number.get_mut(&item.block_number) {
			ids.retain(|id| id != block_id);
		}
		let children: Vec<ObjectId160> = self
			.items
			.values()
			.filter(|i| i.previous == *block_id)
			.map(|i| i.block_id)
			.collect();
		for child in children {
			self.remove(&child);
		}
	}

	/// Prunes every tracked block at or below `last_irreversible_block_num`,
	/// keeping only the now-canonical block at that height as a new root
	/// reference point (spec §4.2, bounded by [`MAX_FORK_DEPTH`]).
	pub fn prune_below(&mut self, last_irreversible_block_num: u32) {
		let cutoff = last_irreversible_block_num.saturating_sub(MAX_FORK_DEPTH);
		let stale: Vec<u32> = self.by_number.range(..cutoff).map(|(n, _)| *n).collect();
		for number in stale {
			if let Some(ids) = self.by_number.remove(&number) {
				for id in ids {
					self.items.remove(&id);
				}
			}
		}
	}

	pub fn reset(&mut self) {
		self.items.clear();
		self.by_number.clear();
		self.head = None;
	}

	pub fn len(&self) -> usize {
		self.items.len()
	}
}

impl<B: Clone> Default for ForkDatabase<B> {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chain_common::crypto::Sha256Hash;

	fn id(byte: u8, height: u32) -> ObjectId160 {
		let hash = Sha256Hash::hash(&[byte]);
		ObjectId160::block_id(&hash, height)
	}

	#[test]
	fn push_and_fetch_round_trip() {
		let mut fork_db: ForkDatabase<u32> = ForkDatabase::new();
		let genesis = id(0, 0);
		let block1 = id(1, 1);
		fork_db.start_block(genesis, ObjectId160::zero(), 0, 0);
		fork_db.push_block(block1, genesis, 1, 1);
		assert_eq!(fork_db.fetch_block(&block1).unwrap().block, 1);
		assert_eq!(fork_db.fetch_block_by_number(1).len(), 1);
	}

	#[test]
	fn remove_cascades_to_children() {
		let mut fork_db: ForkDatabase<u32> = ForkDatabase::new();
		let genesis = id(0, 0);
		let block1 = id(1, 1);
		let block2 = id(2, 2);
		fork_db.start_block(genesis, ObjectId160::zero(), 0, 0);
		fork_db.push_block(block1, genesis, 1, 1);
		fork_db.push_block(block2, block1, 2, 2);
		fork_db.remove(&block1);
		assert!(fork_db.fetch_block(&block1).is_none());
		assert!(fork_db.fetch_block(&block2).is_none());
		assert!(fork_db.fetch_block(&genesis).is_some());
	}

	#[test]
	fn fetch_branch_from_finds_common_ancestor() {
		let mut fork_db: ForkDatabase<u32> = ForkDatabase::new();
		let genesis = id(0, 0);
		let a1 = id(1, 1);
		let a2 = id(2, 2);
		let b1 = id(3, 1);
		fork_db.start_block(genesis, ObjectId160::zero(), 0, 0);
		fork_db.push_block(a1, genesis, 1, 1);
		fork_db.push_block(a2, a1, 2, 2);
		fork_db.push_block(b1, genesis, 1, 1);

		let (new_branch, old_branch) = fork_db.fetch_branch_from(&a2, &b1);
		assert_eq!(new_branch, vec![a2, a1]);
		assert_eq!(old_branch, vec![b1]);
	}
}
