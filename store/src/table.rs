//! A single entity kind's storage: a primary map keyed by a monotonic 64-bit
//! id, any number of secondary indexes over canonical byte-encoded keys, and
//! a stack of undo frames recording every mutation made since the last open
//! session (spec §4.1, §3.4).

use std::collections::{BTreeMap, BTreeSet};

use chain_common::error::{ChainError, ChainResult};

/// A reversible change to one row of a [`Table`]. Replaying these in
/// reverse order restores the table to the state it had when the
/// enclosing session was opened.
enum UndoOp<T> {
	Inserted { id: u64 },
	Removed { id: u64, value: T },
	Modified { id: u64, previous: T },
}

/// Implemented by anything that participates in the object store's session
/// stack (spec §4.1): a [`Table`] implements this directly; [`ChainDb`]
/// (the composition of every table) implements [`crate::SessionHost`] by
/// forwarding to each table's `Checkpoint` impl.
pub trait Checkpoint {
	fn push_session(&mut self);
	fn discard_top_session(&mut self);
	fn squash_top_session(&mut self);
	/// Collapses every open session into permanent state. Called once a
	/// block becomes irreversible (spec §4.4.2 step 7).
	fn commit_all(&mut self);
	/// Permanently forgets the oldest `count` undo frames without replaying
	/// them, leaving every younger frame's undo capability untouched. Used
	/// when only a prefix of open sessions (the blocks up to the new last
	/// irreversible block) becomes permanent while later blocks stay
	/// reversible (spec §4.4.2 step 7).
	fn commit_oldest(&mut self, count: usize);
	fn session_depth(&self) -> usize;
}

/// Typed storage for one entity kind, with a monotonic identifier and any
/// number of secondary indexes declared at construction time.
pub struct Table<T> {
	name: &'static str,
	next_id: u64,
	rows: BTreeMap<u64, T>,
	indexes: Vec<Index<T>>,
	undo_stack: Vec<Vec<UndoOp<T>>>,
}

struct Index<T> {
	name: &'static str,
	unique: bool,
	extract: Box<dyn Fn(&T) -> Vec<u8>>,
	entries: BTreeMap<Vec<u8>, BTreeSet<u64>>,
}

impl<T> Table<T> {
	pub fn new(name: &'static str) -> Self {
		Table { name, next_id: 0, rows: BTreeMap::new(), indexes: Vec::new(), undo_stack: Vec::new() }
	}

	/// Declares a secondary index. Must be called before any rows are
	/// inserted (mirrors chainbase's compile-time-declared multi-index
	/// tables, generalized here to a runtime list since we don't have
	/// boost::multi_index's type-level index declarations).
	pub fn with_index(
		mut self,
		name: &'static str,
		unique: bool,
		extract: impl Fn(&T) -> Vec<u8> + 'static,
	) -> Self {
		self.indexes.push(Index { name, unique, extract: Box::new(extract), entries: BTreeMap::new() });
		self
	}

	pub fn len(&self) -> usize {
		self.rows.len()
	}

	pub fn is_empty(&self) -> bool {
		self.rows.is_empty()
	}

	fn record(&mut self, op: UndoOp<T>) {
		if let Some(frame) = self.undo_stack.last_mut() {
			frame.push(op);
		}
	}

	fn check_unique(&self, skip_id: Option<u64>, row: &T) -> ChainResult<()> {
		for index in &self.indexes {
			if !index.unique {
				continue;
			}
			let key = (index.extract)(row);
			if let Some(existing) = index.entries.get(&key) {
				let collides = existing.iter().any(|&id| Some(id) != skip_id);
				if collides {
					return Err(ChainError::UniqueKeyViolation(format!(
						"{}.{}",
						self.name, index.name
					)));
				}
			}
		}
		Ok(())
	}

	fn index_insert(&mut self, id: u64, row: &T) {
		for index in &mut self.indexes {
			let key = (index.extract)(row);
			index.entries.entry(key).or_default().insert(id);
		}
	}

	fn index_remove(&mut self, id: u64, row: &T) {
		for index in &mut self.indexes {
			let key = (index.extract)(row);
			if let Some(set) = index.entries.get_mut(&key) {
				set.remove(&id);
				if set.is_empty() {
					index.entries.remove(&key);
				}
			}
		}
	}

	/// Allocates the next id, runs `constructor` to build the row, and
	/// inserts it into every index. Fails with `UniqueKeyViolation` if any
	/// unique index would collide.
	pub fn create(&mut self, constructor: impl FnOnce(u64) -> T) -> ChainResult<&T> {
		let id = self.next_id;
		let row = constructor(id);
		self.check_unique(None, &row)?;
		self.index_insert(id, &row);
		self.rows.insert(id, row);
		self.record(UndoOp::Inserted { id });
		self.next_id += 1;
		Ok(self.rows.get(&id).expect("just inserted"))
	}

	pub fn get(&self, id: u64) -> ChainResult<&T> {
		self.rows
			.get(&id)
			.ok_or_else(|| ChainError::NotFound(format!("{}#{}", self.name, id)))
	}

	pub fn find(&self, id: u64) -> Option<&T> {
		self.rows.get(&id)
	}

	pub fn get_by_index(&self, index_name: &str, key: &[u8]) -> ChainResult<&T> {
		self.find_by_index(index_name, key)
			.ok_or_else(|| ChainError::NotFound(format!("{}.{}", self.name, index_name)))
	}

	pub fn find_by_index(&self, index_name: &str, key: &[u8]) -> Option<&T> {
		let index = self.indexes.iter().find(|i| i.name == index_name)?;
		let id = index.entries.get(key)?.iter().next().copied()?;
		self.rows.get(&id)
	}

	pub fn iter_by_index<'a>(&'a self, index_name: &str) -> Box<dyn Iterator<Item = (&'a T)> + 'a> {
		match self.indexes.iter().find(|i| i.name == index_name) {
			Some(index) => Box::new(
				index
					.entries
					.iter()
					.flat_map(|(_, ids)| ids.iter())
					.filter_map(move |id| self.rows.get(id)),
			),
			None => Box::new(std::iter::empty()),
		}
	}

	pub fn iter(&self) -> impl Iterator<Item = (&u64, &T)> {
		self.rows.iter()
	}

	/// Applies `mutator` to a clone of the row, checks uniqueness, and
	/// commits the change, recomputing index positions.
	pub fn modify(&mut self, id: u64, mutator: impl FnOnce(&mut T)) -> ChainResult<()>
	where
		T: Clone,
	{
		let previous = self.get(id)?.clone();
		let mut updated = previous.clone();
		mutator(&mut updated);
		self.check_unique(Some(id), &updated)?;
		self.index_remove(id, &previous);
		self.index_insert(id, &updated);
		self.rows.insert(id, updated);
		self.record(UndoOp::Modified { id, previous });
		Ok(())
	}

	pub fn remove(&mut self, id: u64) -> ChainResult<T>
	where
		T: Clone,
	{
		let row = self
			.rows
			.remove(&id)
			.ok_or_else(|| ChainError::NotFound(format!("{}#{}", self.name, id)))?;
		self.index_remove(id, &row);
		self.record(UndoOp::Removed { id, value: row.clone() });
		Ok(row)
	}
}

impl<T: Clone> Checkpoint for Table<T> {
	fn push_session(&mut self) {
		self.undo_stack.push(Vec::new());
	}

	fn discard_top_session(&mut self) {
		let Some(frame) = self.undo_stack.pop() else { return };
		for op in frame.into_iter().rev() {
			match op {
				UndoOp::Inserted { id } => {
					if let Some(row) = self.rows.remove(&id) {
						self.index_remove(id, &row);
					}
				},
				UndoOp::Removed { id, value } => {
					self.index_insert(id, &value);
					self.rows.insert(id, value);
				},
				UndoOp::Modified { id, previous } => {
					if let Some(current) = self.rows.get(&id).cloned() {
						self.index_remove(id, &current);
					}
					self.index_insert(id, &previous);
					self.rows.insert(id, previous);
				},
			}
		}
	}

	fn squash_top_session(&mut self) {
		let Some(child) = self.undo_stack.pop() else { return };
		match self.undo_stack.last_mut() {
			Some(parent) => parent.extend(child),
			None => self.undo_stack.push(child),
		}
	}

	fn commit_all(&mut self) {
		self.undo_stack.clear();
	}

	fn commit_oldest(&mut self, count: usize) {
		let count = count.min(self.undo_stack.len());
		self.undo_stack.drain(0..count);
	}

	fn session_depth(&self) -> usize {
		self.undo_stack.len()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[derive(Debug, Clone, PartialEq, Eq)]
	struct Row {
		id: u64,
		name: String,
		balance: i64,
	}

	fn table() -> Table<Row> {
		Table::new("row").with_index("by_name", true, |r: &Row| r.name.clone().into_bytes())
	}

	#[test]
	fn create_enforces_unique_index() {
		let mut t = table();
		t.create(|id| Row { id, name: "alice".into(), balance: 0 }).unwrap();
		let err = t.create(|id| Row { id, name: "alice".into(), balance: 5 });
		assert!(matches!(err, Err(ChainError::UniqueKeyViolation(_))));
	}

	#[test]
	fn discard_reverts_insert_modify_and_remove() {
		let mut t = table();
		t.push_session();
		let id = t.create(|id| Row { id, name: "alice".into(), balance: 10 }).unwrap().id;
		t.discard_top_session();
		assert!(t.find(id).is_none());

		t.create(|id| Row { id, name: "bob".into(), balance: 10 }).unwrap();
		t.push_session();
		t.modify(1, |r| r.balance = 99).unwrap();
		t.discard_top_session();
		assert_eq!(t.get(1).unwrap().balance, 10);

		t.push_session();
		t.remove(1).unwrap();
		assert!(t.find(1).is_none());
		t.discard_top_session();
		assert_eq!(t.get(1).unwrap().name, "bob");
	}

	#[test]
	fn squash_merges_child_into_parent_undo() {
		let mut t = table();
		t.push_session(); // parent
		t.create(|id| Row { id, name: "alice".into(), balance: 0 }).unwrap();
		t.push_session(); // child
		t.modify(0, |r| r.balance = 42).unwrap();
		t.squash_top_session();
		assert_eq!(t.session_depth(), 1);
		t.discard_top_session();
		assert!(t.find(0).is_none());
	}

	#[test]
	fn commit_all_makes_state_permanent() {
		let mut t = table();
		t.push_session();
		t.create(|id| Row { id, name: "alice".into(), balance: 0 }).unwrap();
		t.commit_all();
		assert_eq!(t.session_depth(), 0);
		assert!(t.find(0).is_some());
	}

	#[test]
	fn commit_oldest_leaves_younger_sessions_undoable() {
		let mut t = table();
		t.push_session();
		t.create(|id| Row { id, name: "alice".into(), balance: 0 }).unwrap();
		t.push_session();
		t.modify(0, |r| r.balance = 42).unwrap();
		t.commit_oldest(1);
		assert_eq!(t.session_depth(), 1);
		t.discard_top_session();
		assert_eq!(t.get(0).unwrap().balance, 0);
	}

	#[test]
	fn by_index_lookup() {
		let mut t = table();
		t.create(|id| Row { id, name: "alice".into(), balance: 7 }).unwrap();
		let found = t.get_by_index("by_name", b"alice").unwrap();
		assert_eq!(found.balance, 7);
	}
}
