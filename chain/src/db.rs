//! The object store: every [`Table`] the chain owns, composed behind a
//! single [`SessionHost`] implementation (spec §4.1, §3.2). One `push`
//! opens an undo frame across every table at once; one `commit` collapses
//! the frames up to a given revision, leaving later ones reversible.

use chain_store::{Checkpoint, SessionHost, Table};

use crate::entities::*;

/// Fans a [`SessionHost`] method call out to every `Table` field.
macro_rules! for_each_table {
	($self:ident, $method:ident $(, $arg:expr)*) => {
		$self.accounts.$method($($arg),*);
		$self.account_authorities.$method($($arg),*);
		$self.account_balances.$method($($arg),*);
		$self.delegations.$method($($arg),*);
		$self.assets.$method($($arg),*);
		$self.asset_dynamic_data.$method($($arg),*);
		$self.bitassets.$method($($arg),*);
		$self.equities.$method($($arg),*);
		$self.credits.$method($($arg),*);
		$self.liquidity_pools.$method($($arg),*);
		$self.credit_pools.$method($($arg),*);
		$self.limit_orders.$method($($arg),*);
		$self.margin_orders.$method($($arg),*);
		$self.auction_orders.$method($($arg),*);
		$self.call_orders.$method($($arg),*);
		$self.option_orders.$method($($arg),*);
		$self.force_settlements.$method($($arg),*);
		$self.comments.$method($($arg),*);
		$self.comment_votes.$method($($arg),*);
		$self.comment_views.$method($($arg),*);
		$self.comment_shares.$method($($arg),*);
		$self.communities.$method($($arg),*);
		$self.community_permissions.$method($($arg),*);
		$self.community_join_requests.$method($($arg),*);
		$self.community_invites.$method($($arg),*);
		$self.activity_events.$method($($arg),*);
		$self.producers.$method($($arg),*);
		$self.network_officers.$method($($arg),*);
		$self.executive_boards.$method($($arg),*);
		$self.governance_accounts.$method($($arg),*);
		$self.supernodes.$method($($arg),*);
		$self.interfaces.$method($($arg),*);
		$self.mediators.$method($($arg),*);
		$self.community_enterprises.$method($($arg),*);
		$self.role_votes.$method($($arg),*);
		$self.block_summaries.$method($($arg),*);
		$self.reward_funds.$method($($arg),*);
	};
}

pub struct ChainDb {
	pub accounts: Table<Account>,
	pub account_authorities: Table<AccountAuthority>,
	pub account_balances: Table<AccountBalance>,
	pub delegations: Table<Delegation>,

	pub assets: Table<Asset>,
	pub asset_dynamic_data: Table<AssetDynamicData>,
	pub bitassets: Table<BitassetData>,
	pub equities: Table<EquityData>,
	pub credits: Table<CreditData>,
	pub liquidity_pools: Table<LiquidityPoolObject>,
	pub credit_pools: Table<CreditPoolObject>,

	pub limit_orders: Table<LimitOrder>,
	pub margin_orders: Table<MarginOrder>,
	pub auction_orders: Table<AuctionOrder>,
	pub call_orders: Table<CallOrder>,
	pub option_orders: Table<OptionOrder>,
	pub force_settlements: Table<ForceSettlement>,

	pub comments: Table<Comment>,
	pub comment_votes: Table<CommentVote>,
	pub comment_views: Table<CommentView>,
	pub comment_shares: Table<CommentShare>,
	pub communities: Table<Community>,
	pub community_permissions: Table<CommunityPermission>,
	pub community_join_requests: Table<CommunityJoinRequest>,
	pub community_invites: Table<CommunityInvite>,
	pub activity_events: Table<ActivityEvent>,

	pub producers: Table<Producer>,
	pub network_officers: Table<NetworkOfficer>,
	pub executive_boards: Table<ExecutiveBoard>,
	pub governance_accounts: Table<GovernanceAccount>,
	pub supernodes: Table<Supernode>,
	pub interfaces: Table<Interface>,
	pub mediators: Table<Mediator>,
	pub community_enterprises: Table<CommunityEnterprise>,
	pub role_votes: Table<RoleVote>,

	pub block_summaries: Table<BlockSummary>,
	pub reward_funds: Table<RewardFund>,

	pub dynamic_global_properties: DynamicGlobalProperties,
	pub hardfork_property: HardforkProperty,
	pub chain_properties: ChainProperties,
	pub producer_schedule: ProducerSchedule,

	/// Revision assigned to each currently open session, oldest first.
	open_session_revisions: Vec<u64>,
	next_revision: u64,
}

impl ChainDb {
	pub fn new(genesis_time: chain_common::TimePoint) -> Self {
		ChainDb {
			accounts: Table::new("account").with_index("by_name", true, |a: &Account| {
				a.name.as_str().as_bytes().to_vec()
			}),
			account_authorities: Table::new("account_authority")
				.with_index("by_account", true, |a: &AccountAuthority| {
					a.account.as_str().as_bytes().to_vec()
				}),
			account_balances: Table::new("account_balance").with_index(
				"by_owner_symbol",
				true,
				|b: &AccountBalance| {
					let mut key = b.owner.as_str().as_bytes().to_vec();
					key.push(0);
					key.extend(b.symbol.as_str().as_bytes());
					key
				},
			),
			delegations: Table::new("delegation").with_index(
				"by_delegator_delegatee",
				true,
				|d: &Delegation| {
					let mut key = d.delegator.as_str().as_bytes().to_vec();
					key.push(0);
					key.extend(d.delegatee.as_str().as_bytes());
					key.push(0);
					key.extend(d.symbol.as_str().as_bytes());
					key
				},
			),

			assets: Table::new("asset")
				.with_index("by_symbol", true, |a: &Asset| a.symbol.as_str().as_bytes().to_vec()),
			asset_dynamic_data: Table::new("asset_dynamic_data").with_index(
				"by_symbol",
				true,
				|d: &AssetDynamicData| d.symbol.as_str().as_bytes().to_vec(),
			),
			bitassets: Table::new("bitasset")
				.with_index("by_symbol", true, |b: &BitassetData| b.symbol.as_str().as_bytes().to_vec()),
			equities: Table::new("equity")
				.with_index("by_symbol", true, |e: &EquityData| e.symbol.as_str().as_bytes().to_vec()),
			credits: Table::new("credit")
				.with_index("by_symbol", true, |c: &CreditData| c.symbol.as_str().as_bytes().to_vec()),
			liquidity_pools: Table::new("liquidity_pool").with_index(
				"by_pair",
				true,
				|p: &LiquidityPoolObject| {
					let mut key = p.symbol_a.as_str().as_bytes().to_vec();
					key.push(0);
					key.extend(p.symbol_b.as_str().as_bytes());
					key
				},
			),
			credit_pools: Table::new("credit_pool").with_index(
				"by_base",
				true,
				|p: &CreditPoolObject| p.base_symbol.as_str().as_bytes().to_vec(),
			),

			limit_orders: Table::new("limit_order"),
			margin_orders: Table::new("margin_order"),
			auction_orders: Table::new("auction_order"),
			call_orders: Table::new("call_order"),
			option_orders: Table::new("option_order"),
			force_settlements: Table::new("force_settlement"),

			comments: Table::new("comment").with_index("by_author_permlink", true, |c: &Comment| {
				let mut key = c.author.as_str().as_bytes().to_vec();
				key.push(0);
				key.extend(c.permlink.as_bytes());
				key
			}),
			comment_votes: Table::new("comment_vote"),
			comment_views: Table::new("comment_view"),
			comment_shares: Table::new("comment_share"),
			communities: Table::new("community")
				.with_index("by_name", true, |c: &Community| c.name.as_str().as_bytes().to_vec()),
			community_permissions: Table::new("community_permission"),
			community_join_requests: Table::new("community_join_request"),
			community_invites: Table::new("community_invite"),
			activity_events: Table::new("activity_event"),

			producers: Table::new("producer")
				.with_index("by_owner", true, |p: &Producer| p.owner.as_str().as_bytes().to_vec()),
			network_officers: Table::new("network_officer"),
			executive_boards: Table::new("executive_board"),
			governance_accounts: Table::new("governance_account"),
			supernodes: Table::new("supernode"),
			interfaces: Table::new("interface"),
			mediators: Table::new("mediator"),
			community_enterprises: Table::new("community_enterprise"),
			role_votes: Table::new("role_vote").with_index("by_voter_role_target", true, |v: &RoleVote| {
				let mut key = v.voter.as_str().as_bytes().to_vec();
				key.push(v.role.as_byte());
				key.extend(v.target_id.to_be_bytes());
				key
			}),

			block_summaries: Table::new("block_summary"),
			reward_funds: Table::new("reward_fund")
				.with_index("by_symbol", true, |r: &RewardFund| r.symbol.as_str().as_bytes().to_vec()),

			dynamic_global_properties: DynamicGlobalProperties::genesis(genesis_time),
			hardfork_property: HardforkProperty::default(),
			chain_properties: ChainProperties::default(),
			producer_schedule: ProducerSchedule::default(),

			open_session_revisions: Vec::new(),
			next_revision: 1,
		}
	}
}

impl SessionHost for ChainDb {
	fn push_session(&mut self) {
		for_each_table!(self, push_session);
		self.open_session_revisions.push(self.next_revision);
		self.next_revision += 1;
	}

	fn discard_top_session(&mut self) {
		for_each_table!(self, discard_top_session);
		self.open_session_revisions.pop();
	}

	fn squash_top_session(&mut self) {
		for_each_table!(self, squash_top_session);
		if let Some(top) = self.open_session_revisions.pop() {
			if let Some(parent) = self.open_session_revisions.last_mut() {
				*parent = top;
			} else {
				self.open_session_revisions.push(top);
			}
		}
	}

	fn commit_up_to(&mut self, revision: u64) {
		let count = self.open_session_revisions.iter().filter(|&&r| r <= revision).count();
		for_each_table!(self, commit_oldest, count);
		self.open_session_revisions.drain(0..count);
	}

	fn revision(&self) -> u64 {
		self.next_revision.saturating_sub(1)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chain_common::{AccountName, AssetSymbol};
	use chain_store::Session;

	fn name(s: &str) -> AccountName {
		AccountName::new(s).unwrap()
	}

	fn symbol(s: &str) -> AssetSymbol {
		AssetSymbol::new(s).unwrap()
	}

	#[test]
	fn session_rolls_back_across_every_table() {
		let mut db = ChainDb::new(chain_common::TimePoint(0));
		{
			let session = Session::start(&mut db);
			session.push();
		}

		db.accounts.create(|id| Account {
			id,
			name: name("alice"),
			account_type: AccountType::Personal,
			membership_tier: 0,
			owner_key: dummy_key(),
			active_key: dummy_key(),
			posting_key: dummy_key(),
			secure_key: dummy_key(),
			proxy: None,
			outstanding_votes: 0,
			created: chain_common::TimePoint(0),
			last_owner_update: chain_common::TimePoint(0),
			last_active_time: chain_common::TimePoint(0),
			last_asset_creation: None,
		}).unwrap();
		db.assets.create(|id| Asset {
			id,
			symbol: symbol("COIN"),
			kind: AssetKind::Standard,
			issuer: name("alice"),
			flags: AssetFlags::empty(),
			market_fee_bps: 0,
			market_fee_share_bps: 0,
			max_supply: chain_common::ShareAmount(1_000_000),
			created: chain_common::TimePoint(0),
		}).unwrap();

		db.push_session();
		db.accounts.modify(0, |a| a.outstanding_votes = 7).unwrap();
		db.discard_top_session();

		assert_eq!(db.accounts.find(0).unwrap().outstanding_votes, 0);
		assert!(db.assets.find(0).is_some());
	}

	fn dummy_key() -> chain_common::crypto::PublicKey {
		use secp256k1::{rand::rngs::OsRng, Secp256k1};
		let secp = Secp256k1::new();
		let (_, public) = secp.generate_keypair(&mut OsRng);
		chain_common::crypto::PublicKey(public)
	}
}
