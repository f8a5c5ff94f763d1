//! Accounts and weighted authorities (spec §3.2).

use std::collections::BTreeMap;

use chain_common::{AccountName, AssetSymbol, ShareAmount, TimePoint};
use chain_common::crypto::PublicKey;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountType {
	Personal,
	Business,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
	pub id: u64,
	pub name: AccountName,
	pub account_type: AccountType,
	pub membership_tier: u8,
	pub owner_key: PublicKey,
	pub active_key: PublicKey,
	pub posting_key: PublicKey,
	pub secure_key: PublicKey,
	pub proxy: Option<AccountName>,
	pub outstanding_votes: u32,
	pub created: TimePoint,
	pub last_owner_update: TimePoint,
	pub last_active_time: TimePoint,
	/// Last time this account created an asset, for the per-issuer rate
	/// limit (spec §4.5 "Create asset").
	pub last_asset_creation: Option<TimePoint>,
}

/// A weighted key set with a threshold, used for each of owner/active/posting
/// (spec §3.2 "Account authority").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightedAuthority {
	pub threshold: u32,
	pub key_weights: BTreeMap<PublicKey, u32>,
	pub account_weights: BTreeMap<AccountName, u32>,
}

impl WeightedAuthority {
	pub fn single_key(key: PublicKey) -> Self {
		let mut key_weights = BTreeMap::new();
		key_weights.insert(key, 1);
		WeightedAuthority { threshold: 1, key_weights, account_weights: BTreeMap::new() }
	}

	/// `true` iff the weight contributed by `signing_keys` meets the
	/// threshold. Account-weighted sub-authorities are resolved by the
	/// caller (the authority checker walks them recursively).
	pub fn satisfied_by(&self, signing_keys: &[PublicKey], resolved_account_weight: u32) -> bool {
		let key_weight: u32 = signing_keys
			.iter()
			.filter_map(|k| self.key_weights.get(k))
			.sum();
		key_weight + resolved_account_weight >= self.threshold
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountAuthority {
	pub account: AccountName,
	pub owner: WeightedAuthority,
	pub active: WeightedAuthority,
	pub posting: WeightedAuthority,
	pub last_owner_update: TimePoint,
}

/// A pending delegation of stake-weight from one account to another, which
/// cannot be recalled instantly (spec §4.5 "Delegate stake").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delegation {
	pub id: u64,
	pub delegator: AccountName,
	pub delegatee: AccountName,
	pub symbol: AssetSymbol,
	pub amount: ShareAmount,
	pub expiration: Option<TimePoint>,
}

/// Per-`(owner, symbol)` balance across every bucket (spec §3.2).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountBalance {
	pub id: u64,
	pub owner: AccountName,
	pub symbol: AssetSymbol,
	pub liquid: ShareAmount,
	pub staked: ShareAmount,
	pub savings: ShareAmount,
	pub reward: ShareAmount,
	pub delegated_out: ShareAmount,
	pub delegated_in: ShareAmount,
	/// One entry per pending unstake installment: `(amount, release time)`.
	pub unstaking_queue: Vec<(ShareAmount, TimePoint)>,
	/// One entry per pending savings withdrawal: `(amount, release time)`.
	pub savings_withdrawal_queue: Vec<(ShareAmount, TimePoint)>,
}

impl AccountBalance {
	pub fn new(owner: AccountName, symbol: AssetSymbol) -> Self {
		AccountBalance {
			id: 0,
			owner,
			symbol,
			liquid: ShareAmount::ZERO,
			staked: ShareAmount::ZERO,
			savings: ShareAmount::ZERO,
			reward: ShareAmount::ZERO,
			delegated_out: ShareAmount::ZERO,
			delegated_in: ShareAmount::ZERO,
			unstaking_queue: Vec::new(),
			savings_withdrawal_queue: Vec::new(),
		}
	}
}
