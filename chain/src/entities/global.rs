//! Chain-wide singleton objects: dynamic properties, hardfork state, and the
//! per-currency reward funds (spec §3.2 "Global objects", §4.7).

use std::collections::BTreeMap;

use chain_common::{AssetSymbol, ShareAmount, TimePoint};
use serde::{Deserialize, Serialize};

use crate::skip_flags::SkipFlags;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynamicGlobalProperties {
	pub head_block_number: u64,
	pub head_block_id: chain_common::crypto::ObjectId160,
	pub head_block_time: TimePoint,
	pub current_producer: chain_common::AccountName,
	pub current_aslot: u64,
	pub last_irreversible_block_num: u64,
	pub total_pow: u64,
	pub num_pow_producers: u32,
	pub recent_slots_filled: u128,
	pub participation_count: u8,
	/// Head time the last time proof-of-work difficulty was retargeted
	/// (spec §4.8); the gap since this mark is the job's `actual_interval`.
	pub last_pow_retarget_time: TimePoint,
}

impl DynamicGlobalProperties {
	pub fn genesis(time: TimePoint) -> Self {
		DynamicGlobalProperties {
			head_block_number: 0,
			head_block_id: chain_common::crypto::ObjectId160::zero(),
			head_block_time: time,
			current_producer: chain_common::AccountName::new("genesis").expect("valid name"),
			current_aslot: 0,
			last_irreversible_block_num: 0,
			total_pow: 0,
			num_pow_producers: 0,
			recent_slots_filled: u128::MAX,
			participation_count: 128,
			last_pow_retarget_time: time,
		}
	}
}

/// Tracks which hardforks have been activated on this chain (spec §C.3: the
/// "buggy getter" question is resolved as a hardfork-gated behavior change,
/// not bug-for-bug emulation).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardforkProperty {
	pub processed_hardforks: Vec<TimePoint>,
	pub last_hardfork: u32,
}

impl HardforkProperty {
	pub fn is_active(&self, hardfork_index: u32) -> bool {
		self.last_hardfork >= hardfork_index
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardFund {
	pub symbol: AssetSymbol,
	pub reward_balance: ShareAmount,
	pub recent_claims: u128,
	pub last_update: TimePoint,
	pub content_constant: u128,
	pub percent_curation_rewards_bps: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainProperties {
	pub account_creation_fee: BTreeMap<AssetSymbol, ShareAmount>,
	pub maximum_block_size: u32,
	pub pow_target_block_interval_secs: u32,
}

/// Non-consensus runtime flags threaded through block application (spec
/// §4.4). Not persisted as an object; carried alongside a pipeline call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyContext {
	pub skip: SkipFlags,
}
