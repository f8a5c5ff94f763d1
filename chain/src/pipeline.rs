//! Orchestrates everything that happens while a block is pushed, validated,
//! applied, and (eventually) buried past irreversibility (spec §4.4).
//!
//! Mirrors the teacher's block-processing pipeline in shape: a session opens
//! around the whole block, every transaction runs inside it, and the session
//! is kept open (not committed) so a later fork switch can still undo it.
//! Irreversibility is a separate, later step that collapses a prefix of
//! still-open sessions once enough producer confirmations have buried them.

use std::collections::BTreeMap;

use codec::Encode as _;

use chain_common::crypto::{ObjectId160, Sha256Hash};
use chain_common::error::{ChainError, ChainResult};
use chain_common::{AccountName, TimePoint};
use chain_store::SessionHost;

use crate::block::{Block, BlockHeader};
use crate::blocklog::BlockLog;
use crate::consensus::SlotClock;
use crate::constants::{BLOCK_SUMMARY_MODULUS, IRREVERSIBLE_CONFIRMATION_DEPTH, MAX_TRANSACTION_EXPIRATION_SECONDS};
use crate::db::ChainDb;
use crate::entities::BlockSummary;
use crate::evaluator::apply_operation;
use crate::forkdb::ForkDatabase;
use crate::jobs;
use crate::operation::Transaction;
use crate::skip_flags::SkipFlags;

/// The first four bytes of a block id after its embedded height, used as a
/// transaction's TaPoS reference prefix (spec §4.3 "Transactions").
fn block_id_prefix(id: &ObjectId160) -> u32 {
	u32::from_le_bytes(id.0[4..8].try_into().expect("ObjectId160 is 20 bytes"))
}

pub struct Pipeline {
	pub db: ChainDb,
	pub fork_db: ForkDatabase<Block>,
	pub block_log: BlockLog,
	pub slot_clock: SlotClock,
	/// Revision returned by the session opened for each still-reversible
	/// block, keyed by block number, so irreversibility can later collapse
	/// exactly the sessions up to and including a given height.
	block_revisions: BTreeMap<u32, u64>,
	/// Transaction ids seen within the last [`MAX_TRANSACTION_EXPIRATION_SECONDS`],
	/// for duplicate-transaction rejection (spec §4.3). Not part of the
	/// undone object store: a transaction cannot un-expire, so this set is
	/// pruned by wall-clock time rather than by session discard.
	recent_transactions: BTreeMap<ObjectId160, TimePoint>,
}

impl Pipeline {
	pub fn new(genesis_time: TimePoint) -> Self {
		let mut db = ChainDb::new(genesis_time);
		for _ in 0..BLOCK_SUMMARY_MODULUS {
			db.block_summaries
				.create(|_| BlockSummary { block_number: 0, block_id: ObjectId160::zero() })
				.expect("block summary ring buffer preallocation cannot collide");
		}
		Pipeline {
			db,
			fork_db: ForkDatabase::new(),
			block_log: BlockLog::new(),
			slot_clock: SlotClock::new(genesis_time),
			block_revisions: BTreeMap::new(),
			recent_transactions: BTreeMap::new(),
		}
	}

	fn head_block_number(&self) -> u32 {
		self.db.dynamic_global_properties.head_block_number as u32
	}

	/// Validates and applies one transaction against the current store state
	/// (spec §4.3). Callers are expected to run this inside a session so a
	/// failure partway through a block's transactions can be cleanly undone.
	pub fn apply_transaction(&mut self, tx: &Transaction, now: TimePoint, skip: SkipFlags) -> ChainResult<()> {
		if !skip.contains(SkipFlags::VALIDATE) && tx.operations.is_empty() {
			return Err(ChainError::InvariantViolation("transaction has no operations".into()));
		}

		if tx.expiration.seconds_since(now) > MAX_TRANSACTION_EXPIRATION_SECONDS {
			return Err(ChainError::InvariantViolation("transaction expiration too far in the future".into()));
		}
		if tx.expiration.0 <= now.0 {
			return Err(ChainError::Expired);
		}

		if !skip.contains(SkipFlags::TAPOS) {
			let slot = self.db.block_summaries.get(tx.ref_block_num as u64)?;
			let matches = slot.block_number & 0xFFFF == tx.ref_block_num as u32 && block_id_prefix(&slot.block_id) == tx.ref_block_prefix;
			if !matches {
				return Err(ChainError::TaposMismatch);
			}
		}

		let tx_id = tx.id();
		if !skip.contains(SkipFlags::TRANSACTION_DUPE) {
			if self.recent_transactions.contains_key(&tx_id) {
				return Err(ChainError::DuplicateTransaction);
			}
		}

		if !skip.contains(SkipFlags::TRANSACTION_SIGNATURES) {
			let digest = tx.digest_for_signing();
			self.check_authorities(tx, &digest)?;
		}

		for op in &tx.operations {
			apply_operation(&mut self.db, op, now)?;
		}

		self.recent_transactions.insert(tx_id, tx.expiration);
		Ok(())
	}

	/// Checks that every operation's required active/posting authorities are
	/// satisfied by the transaction's signatures (spec §4.3, §3.2).
	fn check_authorities(&self, tx: &Transaction, digest: &Sha256Hash) -> ChainResult<()> {
		use crate::authority::{recover_signing_keys, AuthorityChecker, AuthorityLevel};

		let candidate_keys: Vec<_> = self
			.db
			.account_authorities
			.iter()
			.flat_map(|(_, a)| {
				a.owner
					.key_weights
					.keys()
					.chain(a.active.key_weights.keys())
					.chain(a.posting.key_weights.keys())
					.copied()
			})
			.collect();
		let signing_keys = recover_signing_keys(digest, &tx.signatures, &candidate_keys);
		let checker = AuthorityChecker::new(&self.db);

		for op in &tx.operations {
			for (account, level) in required_authorities(op) {
				if !checker.satisfies(&account, level, &signing_keys)? {
					return Err(ChainError::AuthorityInsufficient(format!("{} needs {:?} authority", account, level)));
				}
			}
		}
		Ok(())
	}

	/// Applies a full block: opens one session spanning every transaction,
	/// rolls it back on the first failing transaction, and otherwise leaves
	/// it open as a new reversible frame (spec §4.4.2, §4.4.3).
	pub fn apply_block(&mut self, block: &Block, skip: SkipFlags) -> ChainResult<()> {
		let expected_number = self.head_block_number() + 1;
		if block.header.block_number != expected_number {
			return Err(ChainError::InvalidBlock(format!(
				"expected block #{expected_number}, got #{}",
				block.header.block_number
			)));
		}
		if block.header.previous != self.db.dynamic_global_properties.head_block_id && expected_number != 1 {
			return Err(ChainError::InvalidBlock("previous block id mismatch".into()));
		}
		if !skip.contains(SkipFlags::MERKLE) {
			let expected_root = Block::compute_transaction_root(&block.transactions);
			if expected_root != block.header.transaction_merkle_root {
				return Err(ChainError::InvalidBlock("transaction merkle root mismatch".into()));
			}
		}
		if !skip.contains(SkipFlags::PRODUCER_SIGNATURE) {
			let producer = self
				.db
				.producers
				.find_by_index("by_owner", block.header.producer.as_str().as_bytes())
				.ok_or_else(|| ChainError::NotFound(format!("producer {}", block.header.producer)))?;
			if !block.producer_signature.verify(&block.digest_for_signing(), &producer.signing_key) {
				return Err(ChainError::InvalidBlock("producer signature does not verify".into()));
			}
		}

		// A plain push/discard pair rather than the `chain_store::Session` RAII
		// guard: the guard would hold an exclusive borrow of `self.db` for its
		// whole lifetime, but `apply_transaction` below needs `&mut self` to
		// also reach `self.recent_transactions`.
		self.db.push_session();
		let revision = self.db.revision();
		let now = block.header.timestamp;
		let mut result: ChainResult<()> = Ok(());
		for tx in &block.transactions {
			if let Err(err) = self.apply_transaction(tx, now, skip) {
				result = Err(err);
				break;
			}
		}
		if let Err(err) = result {
			self.db.discard_top_session();
			return Err(err);
		}

		self.recent_transactions.retain(|_, exp| exp.0 > now.0);
		self.advance_dynamic_properties(block, now);
		self.update_block_summary(block);
		self.fork_db.push_block(block.id(), block.header.previous, block.header.block_number, block.clone());
		self.fork_db.mark_validated(&block.id())?;
		self.block_revisions.insert(block.header.block_number, revision);

		if !skip.contains(SkipFlags::INVARIANTS) {
			jobs::release_matured_transfers(&mut self.db, now)?;
			jobs::clear_expired_delegations(&mut self.db, now)?;
			jobs::clear_expired_orders(&mut self.db, now)?;
			jobs::accrue_margin_interest(&mut self.db, now)?;
			jobs::update_bitasset_feeds(
				&mut self.db,
				now,
				crate::constants::DEFAULT_FEED_LIFETIME_SECONDS,
				crate::constants::DEFAULT_MINIMUM_FEEDS,
			)?;
			crate::evaluator::trading::check_margin_calls(&mut self.db)?;

			if block.header.block_number % crate::constants::HOURLY_JOB_BLOCK_INTERVAL == 0 {
				let active_producer_count = self.db.producer_schedule.num_scheduled_producers as usize;
				jobs::update_role_vote_ranks(&mut self.db, active_producer_count)?;
			}

			if block.header.block_number % crate::constants::DAILY_JOB_BLOCK_INTERVAL == 0 {
				jobs::clear_auction_orders(&mut self.db)?;
				jobs::content_cashout(&mut self.db, now)?;
				jobs::run_quadratic_funding_rounds(&mut self.db)?;
				jobs::run_daily_pow_retarget(
					&mut self.db,
					now,
					crate::constants::DAILY_JOB_BLOCK_INTERVAL as i64 * crate::constants::BLOCK_INTERVAL_SECONDS,
				)?;
			}
		}

		self.advance_irreversibility(skip)?;
		Ok(())
	}

	fn advance_dynamic_properties(&mut self, block: &Block, now: TimePoint) {
		let props = &mut self.db.dynamic_global_properties;
		props.head_block_number = block.header.block_number as u64;
		props.head_block_id = block.id();
		props.head_block_time = now;
		props.current_producer = block.header.producer.clone();
		props.current_aslot += 1;
		props.recent_slots_filled = (props.recent_slots_filled << 1) | 1;
	}

	fn update_block_summary(&mut self, block: &Block) {
		let slot = (block.header.block_number % BLOCK_SUMMARY_MODULUS) as u64;
		let _ = self.db.block_summaries.modify(slot, |summary| {
			summary.block_number = block.header.block_number;
			summary.block_id = block.id();
		});
	}

	/// Moves the last-irreversible-block marker forward by a fixed
	/// confirmation depth behind the head and collapses every block's
	/// session up to that point into permanent state (spec §4.4.2 step 7).
	///
	/// The real confirmation rule tracks each producer's
	/// `last_confirmed_block_num` across the whole schedule; this fixed-depth
	/// stand-in gives the same "advances once enough blocks have been piled
	/// on top" behavior without needing the full schedule wired through here.
	fn advance_irreversibility(&mut self, skip: SkipFlags) -> ChainResult<()> {
		if skip.contains(SkipFlags::UNDO_BLOCK) {
			return Ok(());
		}
		let head = self.head_block_number();
		let new_lib = head.saturating_sub(IRREVERSIBLE_CONFIRMATION_DEPTH);
		if new_lib as u64 <= self.db.dynamic_global_properties.last_irreversible_block_num {
			return Ok(());
		}
		if let Some(&revision) = self.block_revisions.get(&new_lib) {
			if !skip.contains(SkipFlags::BLOCK_LOG) {
				let to_log: Vec<(u32, ObjectId160, Vec<u8>)> = (self.db.dynamic_global_properties.last_irreversible_block_num as u32 + 1..=new_lib)
					.filter_map(|number| {
						self.fork_db
							.fetch_block_by_number(number)
							.first()
							.map(|item| (number, item.block_id, item.block.encode()))
					})
					.collect();
				for (number, block_id, encoded) in to_log {
					self.block_log.append(number, block_id, encoded)?;
				}
			}
			self.db.commit_up_to(revision);
			self.db.dynamic_global_properties.last_irreversible_block_num = new_lib as u64;
			self.block_revisions.retain(|&number, _| number > new_lib);
			self.fork_db.prune_below(new_lib);
		}
		Ok(())
	}

	/// Restores `dynamic_global_properties`'s head pointers to `ancestor`
	/// (spec §4.4.1 fork switch): these are plain fields, not `Table<T>`
	/// rows, so `discard_top_session` alone does not roll them back.
	fn rewind_head_to(&mut self, ancestor_number: u32, ancestor_id: ObjectId160) {
		let props = &mut self.db.dynamic_global_properties;
		props.head_block_number = ancestor_number as u64;
		if ancestor_number == 0 {
			props.head_block_id = ObjectId160::zero();
			props.head_block_time = self.slot_clock.genesis_time;
		} else if let Some(item) = self.fork_db.fetch_block(&ancestor_id) {
			props.head_block_id = ancestor_id;
			props.head_block_time = item.block.header.timestamp;
			props.current_producer = item.block.header.producer.clone();
		}
		self.block_revisions.retain(|&number, _| number <= ancestor_number);
	}

	/// Accepts a block that may not extend the current head, switching to its
	/// branch if it turns out to be longer (spec §4.4.1 "Push block"). A block
	/// that simply extends the head is applied directly; anything else is
	/// staged in the fork database first and only triggers a reorg once its
	/// branch overtakes the current one.
	pub fn push_block(&mut self, block: &Block, skip: SkipFlags) -> ChainResult<()> {
		let current_head_id = self.db.dynamic_global_properties.head_block_id;
		if self.head_block_number() == 0 || block.header.previous == current_head_id {
			return self.apply_block(block, skip);
		}

		self.fork_db
			.push_block(block.id(), block.header.previous, block.header.block_number, block.clone());
		if block.header.block_number <= self.head_block_number() {
			return Ok(());
		}

		let (new_branch, old_branch) = self.fork_db.fetch_branch_from(&block.id(), &current_head_id);
		let ancestor_number = self.head_block_number().saturating_sub(old_branch.len() as u32);
		let ancestor_id = match old_branch.last() {
			Some(oldest_undone) => self
				.fork_db
				.fetch_block(oldest_undone)
				.map(|item| item.previous)
				.unwrap_or(ObjectId160::zero()),
			None => current_head_id,
		};

		for _ in 0..old_branch.len() {
			self.db.discard_top_session();
		}
		self.rewind_head_to(ancestor_number, ancestor_id);

		let mut applied = 0usize;
		for block_id in new_branch.iter().rev() {
			let Some(item) = self.fork_db.fetch_block(block_id) else {
				continue;
			};
			let new_block = item.block.clone();
			if let Err(err) = self.apply_block(&new_block, skip) {
				// Restore the branch we just tore down rather than leaving the
				// node on a shorter, partially-replayed chain.
				let failed_at = new_block.header.block_number;
				for _ in 0..applied {
					self.db.discard_top_session();
				}
				self.rewind_head_to(ancestor_number, ancestor_id);
				for old_block_id in old_branch.iter().rev() {
					if let Some(old_item) = self.fork_db.fetch_block(old_block_id) {
						let old_block = old_item.block.clone();
						let _ = self.apply_block(&old_block, skip);
					}
				}
				return Err(ChainError::ForkSwitchFailed(format!(
					"block #{failed_at} in candidate branch failed to apply: {err}"
				)));
			}
			applied += 1;
		}
		Ok(())
	}

	/// Produces and applies a new block authored by `producer` at `when`,
	/// bundling every transaction currently waiting in `pending` (spec §4.4.1
	/// "Produce block"). Unlike a received block, the header is built here
	/// rather than validated.
	pub fn produce_block(
		&mut self,
		producer: &AccountName,
		pending: Vec<Transaction>,
		when: TimePoint,
		sign: impl FnOnce(&Sha256Hash) -> chain_common::crypto::Signature,
	) -> ChainResult<Block> {
		let header = BlockHeader {
			previous: self.db.dynamic_global_properties.head_block_id,
			block_number: self.head_block_number() + 1,
			timestamp: when,
			producer: producer.clone(),
			transaction_merkle_root: Block::compute_transaction_root(&pending),
		};
		let digest = header.digest();
		let producer_signature = sign(&digest);
		let block = Block { header, transactions: pending, producer_signature };
		self.apply_block(&block, SkipFlags::NONE)?;
		Ok(block)
	}
}

/// Which account/authority-level pairs a given operation needs signed for
/// (spec §3.2 "Account authority", §4.5/§4.6 per-operation authority notes).
/// Transfers, trading, and asset-issuer operations need active authority;
/// content operations need only the lighter-weight posting authority.
fn required_authorities(op: &crate::operation::Operation) -> Vec<(AccountName, crate::authority::AuthorityLevel)> {
	use crate::authority::AuthorityLevel::{Active, Owner, Posting};
	use crate::operation::Operation::*;

	match op {
		CreateAccount { creator, .. } => vec![(creator.clone(), Active)],
		Transfer { from, .. } => vec![(from.clone(), Active)],
		CreateAsset { issuer, .. } => vec![(issuer.clone(), Active)],
		UpdateAsset { issuer, .. } => vec![(issuer.clone(), Active)],
		UpdateAssetIssuer { issuer, .. } => vec![(issuer.clone(), Owner)],
		IssueAsset { issuer, .. } => vec![(issuer.clone(), Active)],
		ReserveAsset { payer, .. } => vec![(payer.clone(), Active)],
		Stake { account, .. } => vec![(account.clone(), Active)],
		Unstake { account, .. } => vec![(account.clone(), Active)],
		TransferToSavings { account, .. } => vec![(account.clone(), Active)],
		TransferFromSavings { account, .. } => vec![(account.clone(), Active)],
		DelegateStake { delegator, .. } => vec![(delegator.clone(), Active)],
		PlaceLimitOrder { seller, .. } => vec![(seller.clone(), Active)],
		CancelLimitOrder { owner, .. } => vec![(owner.clone(), Active)],
		LendCreditPool { lender, .. } => vec![(lender.clone(), Active)],
		RedeemCreditPool { redeemer, .. } => vec![(redeemer.clone(), Active)],
		SwapLiquidityPool { trader, .. } => vec![(trader.clone(), Active)],
		OpenCallOrder { borrower, .. } => vec![(borrower.clone(), Active)],
		PublishPriceFeed { producer, .. } => vec![(producer.clone(), Active)],
		ForceSettle { owner, .. } => vec![(owner.clone(), Active)],
		GlobalSettle { issuer, .. } => vec![(issuer.clone(), Active)],
		CreateComment { author, .. } => vec![(author.clone(), Posting)],
		VoteComment { voter, .. } => vec![(voter.clone(), Posting)],
		OpenOptionOrder { owner, .. } => vec![(owner.clone(), Active)],
		AddLiquidity { provider, .. } => vec![(provider.clone(), Active)],
		RemoveLiquidity { provider, .. } => vec![(provider.clone(), Active)],
		OpenMarginOrder { owner, .. } => vec![(owner.clone(), Active)],
		CloseMarginOrder { owner, .. } => vec![(owner.clone(), Active)],
		PlaceAuctionOrder { owner, .. } => vec![(owner.clone(), Active)],
		CreateCommentView { viewer, .. } => vec![(viewer.clone(), Posting)],
		CreateCommentShare { sharer, .. } => vec![(sharer.clone(), Posting)],
		CreateProducer { owner, .. } => vec![(owner.clone(), Active)],
		SubmitProofOfWork { owner, .. } => vec![(owner.clone(), Active)],
		VoteRole { voter, .. } => vec![(voter.clone(), Active)],
		UnvoteRole { voter, .. } => vec![(voter.clone(), Active)],
		CreateNetworkOfficer { account, .. } => vec![(account.clone(), Active)],
		CreateGovernanceAccount { account } => vec![(account.clone(), Active)],
		CreateSupernode { owner, .. } => vec![(owner.clone(), Active)],
		CreateMediator { account } => vec![(account.clone(), Active)],
		// Every named member must sign off on their own election.
		CreateExecutiveBoard { members, .. } => members.iter().map(|m| (m.clone(), Active)).collect(),
		CreateCommunityEnterprise { creator, .. } => vec![(creator.clone(), Active)],
		ContributeToEnterprise { contributor, .. } => vec![(contributor.clone(), Active)],
		CreateCommunity { creator, .. } => vec![(creator.clone(), Posting)],
		RequestJoinCommunity { account, .. } => vec![(account.clone(), Posting)],
		ApproveJoinRequest { approver, .. } => vec![(approver.clone(), Posting)],
		InviteToCommunity { inviter, .. } => vec![(inviter.clone(), Posting)],
		AcceptCommunityInvite { account, .. } => vec![(account.clone(), Posting)],
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chain_common::crypto::{PublicKey, Signature};
	use secp256k1::{rand::rngs::OsRng, Message, Secp256k1, SecretKey};

	fn name(s: &str) -> AccountName {
		AccountName::new(s).unwrap()
	}

	fn keypair() -> (SecretKey, PublicKey) {
		let secp = Secp256k1::new();
		let (secret, public) = secp.generate_keypair(&mut OsRng);
		(secret, PublicKey(public))
	}

	fn sign_with(secret: &SecretKey, digest: &Sha256Hash) -> Signature {
		let secp = Secp256k1::new();
		let message = Message::from_digest_slice(&digest.0).unwrap();
		Signature(secp.sign_ecdsa(&message, secret))
	}

	fn seed_producer(pipeline: &mut Pipeline, owner: AccountName, public: PublicKey) {
		pipeline
			.db
			.producers
			.create(|id| {
				let mut p = crate::entities::Producer::new(owner, public, crate::entities::ProducerKind::Dpos);
				p.id = id;
				p
			})
			.unwrap();
	}

	#[test]
	fn produce_block_advances_the_head() {
		let mut pipeline = Pipeline::new(TimePoint::from_unix_seconds(0));
		let (secret, public) = keypair();
		seed_producer(&mut pipeline, name("alice"), public);

		let block = pipeline
			.produce_block(&name("alice"), vec![], TimePoint::from_unix_seconds(3), |digest| sign_with(&secret, digest))
			.unwrap();

		assert_eq!(block.header.block_number, 1);
		assert_eq!(pipeline.head_block_number(), 1);
	}

	#[test]
	fn apply_block_rejects_wrong_block_number() {
		let mut pipeline = Pipeline::new(TimePoint::from_unix_seconds(0));
		let (secret, _) = keypair();
		let header = BlockHeader {
			previous: ObjectId160::zero(),
			block_number: 5,
			timestamp: TimePoint::from_unix_seconds(3),
			producer: name("alice"),
			transaction_merkle_root: Block::compute_transaction_root(&[]),
		};
		let digest = header.digest();
		let block = Block { header, transactions: vec![], producer_signature: sign_with(&secret, &digest) };
		let err = pipeline.apply_block(&block, SkipFlags::all());
		assert!(err.is_err());
	}
}
