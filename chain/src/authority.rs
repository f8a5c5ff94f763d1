//! Weighted-threshold signature checking (spec §3.2 "Account authority",
//! §4.3 "Transactions"). Mirrors the teacher's signature-over-threshold
//! authority graph, generalized from a single owner/active pair to the
//! three-tier owner/active/posting authorities this chain uses.

use std::collections::BTreeSet;

use chain_common::crypto::{PublicKey, Sha256Hash, Signature};
use chain_common::error::{ChainError, ChainResult};
use chain_common::AccountName;

use crate::db::ChainDb;
use crate::entities::{AccountAuthority, WeightedAuthority};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorityLevel {
	Owner,
	Active,
	Posting,
}

/// Recursion depth limit for account-weighted sub-authorities, matching the
/// teacher's guard against authority cycles.
const MAX_AUTHORITY_RECURSION_DEPTH: u32 = 2;

pub struct AuthorityChecker<'a> {
	db: &'a ChainDb,
}

impl<'a> AuthorityChecker<'a> {
	pub fn new(db: &'a ChainDb) -> Self {
		AuthorityChecker { db }
	}

	/// `true` iff `signing_keys` satisfies `account`'s authority at `level`,
	/// recursively resolving any account sub-authorities it delegates to.
	pub fn satisfies(
		&self,
		account: &AccountName,
		level: AuthorityLevel,
		signing_keys: &BTreeSet<PublicKey>,
	) -> ChainResult<bool> {
		self.satisfies_depth(account, level, signing_keys, 0)
	}

	fn satisfies_depth(
		&self,
		account: &AccountName,
		level: AuthorityLevel,
		signing_keys: &BTreeSet<PublicKey>,
		depth: u32,
	) -> ChainResult<bool> {
		let authority = self.authority_for(account)?;
		let weighted = match level {
			AuthorityLevel::Owner => &authority.owner,
			AuthorityLevel::Active => &authority.active,
			AuthorityLevel::Posting => &authority.posting,
		};
		self.weighted_satisfied(weighted, signing_keys, depth)
	}

	fn weighted_satisfied(
		&self,
		weighted: &WeightedAuthority,
		signing_keys: &BTreeSet<PublicKey>,
		depth: u32,
	) -> ChainResult<bool> {
		let key_weight: u32 = weighted
			.key_weights
			.iter()
			.filter(|(k, _)| signing_keys.contains(k))
			.map(|(_, w)| *w)
			.sum();
		if key_weight >= weighted.threshold {
			return Ok(true);
		}
		if depth >= MAX_AUTHORITY_RECURSION_DEPTH {
			return Ok(false);
		}
		let mut account_weight = 0u32;
		for (delegate, weight) in &weighted.account_weights {
			if self.satisfies_depth(delegate, AuthorityLevel::Active, signing_keys, depth + 1)? {
				account_weight += weight;
			}
		}
		Ok(key_weight + account_weight >= weighted.threshold)
	}

	fn authority_for(&self, account: &AccountName) -> ChainResult<&'a AccountAuthority> {
		self
			.db
			.account_authorities
			.find_by_index("by_account", account.as_str().as_bytes())
			.ok_or_else(|| ChainError::NotFound(format!("account authority for {account}")))
	}
}

/// Verifies that each signature in `signatures` is a valid ECDSA signature
/// by some key over `digest`, returning the set of keys that verified.
/// Unmatched or invalid signatures are silently dropped, mirroring the
/// teacher's "collect valid signers, then check the weight" pattern — a
/// transaction with a garbage extra signature is not itself invalid, it is
/// just extra weight that doesn't count.
pub fn recover_signing_keys(
	digest: &Sha256Hash,
	signatures: &[Signature],
	candidate_keys: &[PublicKey],
) -> BTreeSet<PublicKey> {
	let mut verified = BTreeSet::new();
	for signature in signatures {
		for key in candidate_keys {
			if signature.verify(digest, key) {
				verified.insert(*key);
			}
		}
	}
	verified
}
