//! The undo-session stack that spans every table in the store (spec §4.1,
//! §3.4). `ChainDb` (in the `chain` crate) implements [`SessionHost`] by
//! forwarding to each of its [`crate::Table`] fields' [`crate::Checkpoint`]
//! implementation, so a single session opened here atomically covers every
//! entity kind touched while it is the topmost frame.

/// Implemented by the object store facade that owns every [`crate::Table`].
pub trait SessionHost {
	fn push_session(&mut self);
	fn discard_top_session(&mut self);
	fn squash_top_session(&mut self);
	/// Permanently collapses all undo history up to and including the
	/// current revision; called when a block becomes irreversible.
	fn commit_up_to(&mut self, revision: u64);
	fn revision(&self) -> u64;
}

/// RAII handle to one undo frame. Dropping it without calling [`push`],
/// [`squash`] or [`commit`] discards every write made while it was the
/// topmost session (spec §4.1: "Dropping a session ... discards it").
///
/// [`push`]: Session::push
/// [`squash`]: Session::squash
/// [`commit`]: Session::commit
pub struct Session<'a, H: SessionHost> {
	host: &'a mut H,
	resolved: bool,
}

impl<'a, H: SessionHost> Session<'a, H> {
	pub fn start(host: &'a mut H) -> Self {
		host.push_session();
		Session { host, resolved: false }
	}

	/// Finalizes this frame as an independent session, held for later undo.
	/// The frame remains on the stack, just no longer the one this handle
	/// controls.
	pub fn push(mut self) {
		self.resolved = true;
	}

	/// Merges this frame into its parent so a single later undo of the
	/// parent reverts both.
	pub fn squash(mut self) {
		self.host.squash_top_session();
		self.resolved = true;
	}

	/// Marks every session up to and including this one as permanent.
	pub fn commit(mut self, revision: u64) {
		self.host.commit_up_to(revision);
		self.resolved = true;
	}

	pub fn revision(&self) -> u64 {
		self.host.revision()
	}
}

impl<'a, H: SessionHost> Drop for Session<'a, H> {
	fn drop(&mut self) {
		if !self.resolved {
			self.host.discard_top_session();
		}
	}
}
