//! Producer registration/mining and the elected network-role objects (spec
//! §3.2 "Network roles", §4.4, §4.8).

use chain_common::crypto::PublicKey;
use chain_common::error::{ChainError, ChainResult};
use chain_common::{AccountName, AssetSymbol, ShareAmount, TimePoint};

use crate::consensus::{pow_meets_target, pow_summary};
use crate::db::ChainDb;
use crate::entities::{
	CommunityEnterprise, ExecutiveBoard, GovernanceAccount, Mediator, NetworkOfficer,
	NetworkRoleKind, Producer, ProducerKind, RoleVote, Supernode,
};

pub fn create_producer(db: &mut ChainDb, owner: &AccountName, signing_key: PublicKey, kind: ProducerKind, url: &str) -> ChainResult<u64> {
	if db.producers.find_by_index("by_owner", owner.as_str().as_bytes()).is_some() {
		return Err(ChainError::InvariantViolation(format!("{owner} is already registered as a producer")));
	}
	let mut producer = Producer::new(owner.clone(), signing_key, kind);
	producer.url = url.to_string();
	if matches!(kind, ProducerKind::ProofOfWork) {
		producer.pow_target = crate::constants::INITIAL_POW_TARGET;
	}
	Ok(db.producers.create(|id| { let mut p = producer.clone(); p.id = id; p })?.id)
}

/// Submits a proof-of-work solution for `owner`'s registered producer seat;
/// accepted solutions bump the chain's total PoW counter (spec §4.8).
pub fn submit_proof_of_work(db: &mut ChainDb, owner: &AccountName, header_bytes: &[u8], nonce: u64) -> ChainResult<()> {
	let producer = db
		.producers
		.find_by_index("by_owner", owner.as_str().as_bytes())
		.ok_or_else(|| ChainError::NotFound(owner.to_string()))?;
	if !matches!(producer.kind, ProducerKind::ProofOfWork) {
		return Err(ChainError::InvariantViolation(format!("{owner} is not a proof-of-work producer")));
	}
	let target = producer.pow_target;
	let summary = pow_summary(header_bytes, nonce);
	if !pow_meets_target(summary, target) {
		return Err(ChainError::InvariantViolation("proof-of-work solution does not meet the current target".into()));
	}
	db.dynamic_global_properties.total_pow += 1;
	Ok(())
}

fn voter_weight(db: &ChainDb, voter: &AccountName) -> ShareAmount {
	let symbol = AssetSymbol::new("COIN").expect("core currency symbol is valid");
	let mut key = voter.as_str().as_bytes().to_vec();
	key.push(0);
	key.extend(symbol.as_str().as_bytes());
	db.account_balances.find_by_index("by_owner_symbol", &key).map(|b| b.staked).unwrap_or(ShareAmount::ZERO)
}

fn recompute_total_votes(db: &mut ChainDb, role: NetworkRoleKind, target_id: u64) -> ChainResult<ShareAmount> {
	let total = db
		.role_votes
		.iter()
		.filter(|(_, v)| v.role == role && v.target_id == target_id)
		.fold(0i64, |acc, (_, v)| acc.saturating_add(v.weight.0.max(0)));
	let total = ShareAmount(total);
	match role {
		NetworkRoleKind::Producer => db.producers.modify(target_id, |p| p.total_votes = total)?,
		NetworkRoleKind::NetworkOfficer => db.network_officers.modify(target_id, |n| n.total_votes = total)?,
		NetworkRoleKind::GovernanceAccount => db.governance_accounts.modify(target_id, |g| g.total_votes = total)?,
		NetworkRoleKind::Mediator => db.mediators.modify(target_id, |m| m.total_votes = total)?,
		NetworkRoleKind::Supernode => db.supernodes.modify(target_id, |s| s.total_votes = total)?,
	}
	Ok(total)
}

/// Casts (or refreshes) `voter`'s vote for a role seat, weighted by their
/// current staked `COIN` balance (spec §4.4 "Producer voting", generalized
/// to every elected role).
pub fn vote_role(db: &mut ChainDb, voter: &AccountName, role: NetworkRoleKind, target_id: u64) -> ChainResult<()> {
	let weight = voter_weight(db, voter);
	let key = {
		let mut k = voter.as_str().as_bytes().to_vec();
		k.push(role.as_byte());
		k.extend(target_id.to_be_bytes());
		k
	};
	let existing_id = db.role_votes.find_by_index("by_voter_role_target", &key).map(|v| v.id);
	match existing_id {
		Some(id) => db.role_votes.modify(id, |v| v.weight = weight)?,
		None => {
			db.role_votes.create(|id| RoleVote { id, voter: voter.clone(), role, target_id, weight })?;
		},
	}
	recompute_total_votes(db, role, target_id)?;
	Ok(())
}

/// Withdraws `voter`'s vote for a role seat.
pub fn unvote_role(db: &mut ChainDb, voter: &AccountName, role: NetworkRoleKind, target_id: u64) -> ChainResult<()> {
	let key = {
		let mut k = voter.as_str().as_bytes().to_vec();
		k.push(role.as_byte());
		k.extend(target_id.to_be_bytes());
		k
	};
	let Some(id) = db.role_votes.find_by_index("by_voter_role_target", &key).map(|v| v.id) else {
		return Ok(());
	};
	db.role_votes.remove(id)?;
	recompute_total_votes(db, role, target_id)?;
	Ok(())
}

pub fn create_network_officer(db: &mut ChainDb, account: &AccountName, role: &str) -> ChainResult<u64> {
	Ok(db
		.network_officers
		.create(|id| NetworkOfficer { id, account: account.clone(), role: role.to_string(), total_votes: ShareAmount::ZERO, active: true })?
		.id)
}

pub fn create_governance_account(db: &mut ChainDb, account: &AccountName) -> ChainResult<u64> {
	Ok(db
		.governance_accounts
		.create(|id| GovernanceAccount { id, account: account.clone(), total_votes: ShareAmount::ZERO, active: true })?
		.id)
}

pub fn create_supernode(db: &mut ChainDb, owner: &AccountName, endpoint_url: &str) -> ChainResult<u64> {
	Ok(db
		.supernodes
		.create(|id| Supernode { id, owner: owner.clone(), endpoint_url: endpoint_url.to_string(), bandwidth_bps_reported: 0, total_votes: ShareAmount::ZERO })?
		.id)
}

pub fn create_mediator(db: &mut ChainDb, account: &AccountName) -> ChainResult<u64> {
	Ok(db.mediators.create(|id| Mediator { id, account: account.clone(), total_votes: ShareAmount::ZERO, active: true })?.id)
}

/// Elects an executive board, escrowing `budget` out of the member-funded
/// treasury transfer that must already have landed in
/// [`crate::jobs::executive_board_treasury`] before the board can pay out a
/// quadratic-funding round.
pub fn create_executive_board(db: &mut ChainDb, members: Vec<AccountName>, budget: ShareAmount, symbol: AssetSymbol, now: TimePoint) -> ChainResult<u64> {
	Ok(db.executive_boards.create(|id| ExecutiveBoard { id, members: members.clone(), budget, symbol: symbol.clone(), elected: now })?.id)
}

pub fn create_community_enterprise(db: &mut ChainDb, creator: &AccountName, title: &str, symbol: &AssetSymbol) -> ChainResult<u64> {
	Ok(db
		.community_enterprises
		.create(|id| CommunityEnterprise { id, creator: creator.clone(), title: title.to_string(), symbol: symbol.clone(), contributions: Vec::new(), total_approved: ShareAmount::ZERO, status_open: true })?
		.id)
}

/// Contributes to an open community enterprise, debiting the contributor's
/// liquid balance immediately; the quadratic-funding match is paid out by
/// [`crate::jobs::run_quadratic_funding_rounds`] (spec §B.2 supplement).
pub fn contribute_to_enterprise(db: &mut ChainDb, contributor: &AccountName, enterprise_id: u64, amount: ShareAmount) -> ChainResult<()> {
	if amount.0 <= 0 {
		return Err(ChainError::InvariantViolation("contribution must be positive".into()));
	}
	let symbol = {
		let enterprise = db.community_enterprises.get(enterprise_id)?;
		if !enterprise.status_open {
			return Err(ChainError::InvariantViolation(format!("enterprise {enterprise_id} is no longer open")));
		}
		enterprise.symbol.clone()
	};
	crate::evaluator::trading::debit_liquid(db, contributor, &chain_common::AssetAmount { amount, symbol })?;
	db.community_enterprises.modify(enterprise_id, |e| e.contributions.push((contributor.clone(), amount)))
}

#[cfg(test)]
mod tests {
	use super::*;
	use secp256k1::{rand::rngs::OsRng, Secp256k1};

	fn name(s: &str) -> AccountName {
		AccountName::new(s).unwrap()
	}

	fn dummy_key() -> PublicKey {
		let secp = Secp256k1::new();
		let (_, public) = secp.generate_keypair(&mut OsRng);
		PublicKey(public)
	}

	#[test]
	fn vote_role_sums_voter_weights_and_rejects_duplicate_registration() {
		let mut db = ChainDb::new(TimePoint(0));
		let producer_id = create_producer(&mut db, &name("alice"), dummy_key(), ProducerKind::Dpos, "alice.example").unwrap();
		assert!(create_producer(&mut db, &name("alice"), dummy_key(), ProducerKind::Dpos, "dup").is_err());

		db.account_balances
			.create(|id| {
				let mut b = crate::entities::AccountBalance::new(name("bob"), AssetSymbol::new("COIN").unwrap());
				b.id = id;
				b.staked = ShareAmount(500);
				b
			})
			.unwrap();
		vote_role(&mut db, &name("bob"), NetworkRoleKind::Producer, producer_id).unwrap();
		assert_eq!(db.producers.get(producer_id).unwrap().total_votes, ShareAmount(500));

		unvote_role(&mut db, &name("bob"), NetworkRoleKind::Producer, producer_id).unwrap();
		assert_eq!(db.producers.get(producer_id).unwrap().total_votes, ShareAmount::ZERO);
	}

	#[test]
	fn submit_proof_of_work_requires_meeting_the_target() {
		let mut db = ChainDb::new(TimePoint(0));
		create_producer(&mut db, &name("miner"), dummy_key(), ProducerKind::ProofOfWork, "").unwrap();
		db.producers
			.modify(db.producers.find_by_index("by_owner", b"miner").unwrap().id, |p| p.pow_target = u128::MAX)
			.unwrap();
		submit_proof_of_work(&mut db, &name("miner"), b"header", 0).unwrap();
		assert_eq!(db.dynamic_global_properties.total_pow, 1);
	}
}
