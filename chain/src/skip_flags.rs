//! Skip-flag bitmask controlling which validation layers run during block
//! application (spec §6 "Skip flags"). A production node skips nothing;
//! `reindex` may skip everything except the merkle check.

bitflags::bitflags! {
	#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
	pub struct SkipFlags: u32 {
		const PRODUCER_SIGNATURE   = 1 << 0;
		const TRANSACTION_SIGNATURES = 1 << 1;
		const TRANSACTION_DUPE     = 1 << 2;
		const TAPOS                = 1 << 3;
		const MERKLE               = 1 << 4;
		const SCHEDULE             = 1 << 5;
		const AUTHORITY            = 1 << 6;
		const VALIDATE             = 1 << 7;
		const INVARIANTS           = 1 << 8;
		const UNDO_BLOCK           = 1 << 9;
		const BLOCK_LOG            = 1 << 10;
	}
}

impl SkipFlags {
	pub const NONE: SkipFlags = SkipFlags::empty();

	/// Every layer except the merkle root check, used by `reindex`
	/// (spec §6, Scenario F).
	pub fn reindex_default() -> SkipFlags {
		SkipFlags::all() & !SkipFlags::MERKLE
	}
}
