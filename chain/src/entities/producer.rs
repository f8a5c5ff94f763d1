//! Producer scheduling and the network-role objects elected alongside it
//! (spec §3.2 "Network roles", §4.4 "Producer scheduling", §4.7).

use chain_common::{AccountName, AssetSymbol, ShareAmount, TimePoint};
use chain_common::crypto::PublicKey;
use codec::{Decode, Encode};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
pub enum ProducerKind {
	Dpos,
	ProofOfWork,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Producer {
	pub id: u64,
	pub owner: AccountName,
	pub signing_key: PublicKey,
	pub kind: ProducerKind,
	pub url: String,
	pub total_missed: u32,
	pub last_confirmed_block_num: u64,
	pub pow_target: u128,
	pub total_votes: ShareAmount,
	pub running_version: String,
	pub active: bool,
}

impl Producer {
	pub fn new(owner: AccountName, signing_key: PublicKey, kind: ProducerKind) -> Self {
		Producer {
			id: 0,
			owner,
			signing_key,
			kind,
			url: String::new(),
			total_missed: 0,
			last_confirmed_block_num: 0,
			pow_target: 0,
			total_votes: ShareAmount::ZERO,
			running_version: String::new(),
			active: true,
		}
	}
}

/// The ordered list of producers selected to produce the current round
/// (spec §4.4): DPoS winners interleaved with proof-of-work winners.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProducerSchedule {
	pub current_shuffled_producers: Vec<AccountName>,
	pub num_scheduled_producers: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkOfficer {
	pub id: u64,
	pub account: AccountName,
	pub role: String,
	pub total_votes: ShareAmount,
	pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutiveBoard {
	pub id: u64,
	pub members: Vec<AccountName>,
	pub budget: ShareAmount,
	pub symbol: AssetSymbol,
	pub elected: TimePoint,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceAccount {
	pub id: u64,
	pub account: AccountName,
	pub total_votes: ShareAmount,
	pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supernode {
	pub id: u64,
	pub owner: AccountName,
	pub endpoint_url: String,
	pub bandwidth_bps_reported: u64,
	pub total_votes: ShareAmount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interface {
	pub id: u64,
	pub owner: AccountName,
	pub total_fees_earned: ShareAmount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mediator {
	pub id: u64,
	pub account: AccountName,
	pub total_votes: ShareAmount,
	pub active: bool,
}

/// A community-funded proposal competing for the executive board's budget
/// via quadratic funding (spec §B.2, SPEC_FULL supplement).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommunityEnterprise {
	pub id: u64,
	pub creator: AccountName,
	pub title: String,
	pub symbol: AssetSymbol,
	/// `(contributor, amount)` pairs; the payout is a quadratic-funding sum
	/// over these, not a plain total.
	pub contributions: Vec<(AccountName, ShareAmount)>,
	pub total_approved: ShareAmount,
	pub status_open: bool,
}

impl CommunityEnterprise {
	/// Quadratic-funding match weight for this proposal: the square of the
	/// sum of square roots of individual contributions (spec §B.2).
	pub fn quadratic_funding_weight(&self) -> chain_common::error::ChainResult<u128> {
		let mut sum_of_roots: u128 = 0;
		for (_, amount) in &self.contributions {
			let amount_u128 = amount.0.max(0) as u128;
			let root = chain_common::approx_sqrt(amount_u128) as u128;
			sum_of_roots = sum_of_roots
				.checked_add(root)
				.ok_or_else(|| chain_common::error::ChainError::Overflow("quadratic funding sum".into()))?;
		}
		sum_of_roots
			.checked_mul(sum_of_roots)
			.ok_or_else(|| chain_common::error::ChainError::Overflow("quadratic funding square".into()))
	}
}

/// Which elected role table a [`RoleVote`] targets (spec §3.2 "Network
/// roles").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
pub enum NetworkRoleKind {
	Producer,
	NetworkOfficer,
	GovernanceAccount,
	Mediator,
	Supernode,
}

impl NetworkRoleKind {
	pub fn as_byte(self) -> u8 {
		match self {
			NetworkRoleKind::Producer => 0,
			NetworkRoleKind::NetworkOfficer => 1,
			NetworkRoleKind::GovernanceAccount => 2,
			NetworkRoleKind::Mediator => 3,
			NetworkRoleKind::Supernode => 4,
		}
	}
}

/// A single account's vote for a network role seat, weighted by the voter's
/// staked balance at the time the vote was last cast (spec §4.4 "Producer
/// voting", generalized to every elected role).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleVote {
	pub id: u64,
	pub voter: AccountName,
	pub role: NetworkRoleKind,
	pub target_id: u64,
	pub weight: ShareAmount,
}
