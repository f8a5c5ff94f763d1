//! Wire-level operations and transactions (spec §4.3, §4.5, §4.6). An
//! `Operation` is the unit of intent a signer authorizes; a `Transaction`
//! bundles one or more of them behind a shared expiration and signature set.

use codec::{Decode, Encode};
use serde::{Deserialize, Serialize};

use chain_common::crypto::{ObjectId160, Signature};
use chain_common::{AccountName, AssetAmount, AssetSymbol, Price, ShareAmount, TimePoint};

use crate::entities::{
	AssetFlags, AssetKind, CommunityKind, CommunityRole, NetworkRoleKind, OptionKind, ProducerKind,
};

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
pub enum Operation {
	CreateAccount {
		creator: AccountName,
		new_account: AccountName,
		owner_key: chain_common::crypto::PublicKey,
		active_key: chain_common::crypto::PublicKey,
		posting_key: chain_common::crypto::PublicKey,
		secure_key: chain_common::crypto::PublicKey,
	},
	Transfer {
		from: AccountName,
		to: AccountName,
		amount: AssetAmount,
		memo: String,
	},
	CreateAsset {
		issuer: AccountName,
		symbol: AssetSymbol,
		kind: AssetKind,
		max_supply: ShareAmount,
		flags: AssetFlags,
		market_fee_bps: u32,
		initial_coin_liquidity: ShareAmount,
		initial_usd_liquidity: ShareAmount,
		initial_credit_base: ShareAmount,
	},
	UpdateAsset {
		issuer: AccountName,
		symbol: AssetSymbol,
		market_fee_bps: u32,
		flags: AssetFlags,
	},
	UpdateAssetIssuer {
		issuer: AccountName,
		symbol: AssetSymbol,
		new_issuer: AccountName,
	},
	IssueAsset {
		issuer: AccountName,
		symbol: AssetSymbol,
		recipient: AccountName,
		amount: ShareAmount,
	},
	ReserveAsset {
		payer: AccountName,
		symbol: AssetSymbol,
		amount: ShareAmount,
	},
	Stake {
		account: AccountName,
		amount: AssetAmount,
	},
	Unstake {
		account: AccountName,
		amount: AssetAmount,
	},
	TransferToSavings {
		account: AccountName,
		amount: AssetAmount,
	},
	TransferFromSavings {
		account: AccountName,
		amount: AssetAmount,
	},
	DelegateStake {
		delegator: AccountName,
		delegatee: AccountName,
		amount: AssetAmount,
	},
	PlaceLimitOrder {
		seller: AccountName,
		amount_for_sale: AssetAmount,
		sell_price: Price,
		expiration: TimePoint,
	},
	CancelLimitOrder {
		owner: AccountName,
		order_id: u64,
	},
	LendCreditPool {
		lender: AccountName,
		base_symbol: AssetSymbol,
		amount: ShareAmount,
	},
	RedeemCreditPool {
		redeemer: AccountName,
		base_symbol: AssetSymbol,
		shares: ShareAmount,
	},
	SwapLiquidityPool {
		trader: AccountName,
		symbol_a: AssetSymbol,
		symbol_b: AssetSymbol,
		amount_in: AssetAmount,
		minimum_out: ShareAmount,
	},
	OpenCallOrder {
		borrower: AccountName,
		collateral: AssetAmount,
		debt: AssetAmount,
		target_collateralization_ratio_bps: Option<u64>,
	},
	PublishPriceFeed {
		producer: AccountName,
		symbol: AssetSymbol,
		settlement_price_num: i64,
		settlement_price_den: i64,
		maintenance_collateral_ratio_bps: u64,
		maximum_short_squeeze_ratio_bps: u64,
	},
	ForceSettle {
		owner: AccountName,
		balance: AssetAmount,
	},
	GlobalSettle {
		issuer: AccountName,
		symbol: AssetSymbol,
		settlement_price_num: i64,
		settlement_price_den: i64,
	},
	CreateComment {
		author: AccountName,
		permlink: String,
		parent_author: Option<AccountName>,
		parent_permlink: Option<String>,
		community: Option<AccountName>,
	},
	VoteComment {
		voter: AccountName,
		comment_id: u64,
		weight: i16,
	},
	OpenOptionOrder {
		owner: AccountName,
		underlying_amount: AssetAmount,
		strike_price: Price,
		kind: OptionKind,
		expiration: TimePoint,
	},
	AddLiquidity {
		provider: AccountName,
		amount_a: AssetAmount,
		amount_b: AssetAmount,
		minimum_shares: ShareAmount,
	},
	RemoveLiquidity {
		provider: AccountName,
		liquidity_asset: AssetSymbol,
		shares: ShareAmount,
	},
	OpenMarginOrder {
		owner: AccountName,
		collateral: AssetAmount,
		debt_symbol: AssetSymbol,
		debt_amount: ShareAmount,
		position: AssetSymbol,
		sell_price: Price,
		stop_loss_price: Option<Price>,
		take_profit_price: Option<Price>,
	},
	CloseMarginOrder {
		owner: AccountName,
		order_id: u64,
	},
	PlaceAuctionOrder {
		owner: AccountName,
		amount_to_sell: AssetAmount,
		limit_close_price: Price,
		expiration: TimePoint,
	},
	CreateCommentView {
		viewer: AccountName,
		comment_id: u64,
	},
	CreateCommentShare {
		sharer: AccountName,
		comment_id: u64,
	},
	CreateProducer {
		owner: AccountName,
		signing_key: chain_common::crypto::PublicKey,
		kind: ProducerKind,
		url: String,
	},
	SubmitProofOfWork {
		owner: AccountName,
		header_bytes: Vec<u8>,
		nonce: u64,
	},
	VoteRole {
		voter: AccountName,
		role: NetworkRoleKind,
		target_id: u64,
	},
	UnvoteRole {
		voter: AccountName,
		role: NetworkRoleKind,
		target_id: u64,
	},
	CreateNetworkOfficer {
		account: AccountName,
		role: String,
	},
	CreateGovernanceAccount {
		account: AccountName,
	},
	CreateSupernode {
		owner: AccountName,
		endpoint_url: String,
	},
	CreateMediator {
		account: AccountName,
	},
	CreateExecutiveBoard {
		members: Vec<AccountName>,
		budget: ShareAmount,
		symbol: AssetSymbol,
	},
	CreateCommunityEnterprise {
		creator: AccountName,
		title: String,
		symbol: AssetSymbol,
	},
	ContributeToEnterprise {
		contributor: AccountName,
		enterprise_id: u64,
		amount: ShareAmount,
	},
	CreateCommunity {
		creator: AccountName,
		name: AccountName,
		kind: CommunityKind,
		title: String,
		about: String,
	},
	RequestJoinCommunity {
		account: AccountName,
		community: AccountName,
	},
	ApproveJoinRequest {
		approver: AccountName,
		request_id: u64,
	},
	InviteToCommunity {
		inviter: AccountName,
		community: AccountName,
		invitee: AccountName,
		role: CommunityRole,
	},
	AcceptCommunityInvite {
		account: AccountName,
		invite_id: u64,
	},
}

impl Operation {
	/// Human-readable tag, used in logs and error messages the way the
	/// teacher's pallets tag dispatched calls.
	pub fn name(&self) -> &'static str {
		match self {
			Operation::CreateAccount { .. } => "create_account",
			Operation::Transfer { .. } => "transfer",
			Operation::CreateAsset { .. } => "create_asset",
			Operation::UpdateAsset { .. } => "update_asset",
			Operation::UpdateAssetIssuer { .. } => "update_asset_issuer",
			Operation::IssueAsset { .. } => "issue_asset",
			Operation::ReserveAsset { .. } => "reserve_asset",
			Operation::Stake { .. } => "stake",
			Operation::Unstake { .. } => "unstake",
			Operation::TransferToSavings { .. } => "transfer_to_savings",
			Operation::TransferFromSavings { .. } => "transfer_from_savings",
			Operation::DelegateStake { .. } => "delegate_stake",
			Operation::PlaceLimitOrder { .. } => "place_limit_order",
			Operation::CancelLimitOrder { .. } => "cancel_limit_order",
			Operation::LendCreditPool { .. } => "lend_credit_pool",
			Operation::RedeemCreditPool { .. } => "redeem_credit_pool",
			Operation::SwapLiquidityPool { .. } => "swap_liquidity_pool",
			Operation::OpenCallOrder { .. } => "open_call_order",
			Operation::PublishPriceFeed { .. } => "publish_price_feed",
			Operation::ForceSettle { .. } => "force_settle",
			Operation::GlobalSettle { .. } => "global_settle",
			Operation::CreateComment { .. } => "create_comment",
			Operation::VoteComment { .. } => "vote_comment",
			Operation::OpenOptionOrder { .. } => "open_option_order",
			Operation::AddLiquidity { .. } => "add_liquidity",
			Operation::RemoveLiquidity { .. } => "remove_liquidity",
			Operation::OpenMarginOrder { .. } => "open_margin_order",
			Operation::CloseMarginOrder { .. } => "close_margin_order",
			Operation::PlaceAuctionOrder { .. } => "place_auction_order",
			Operation::CreateCommentView { .. } => "create_comment_view",
			Operation::CreateCommentShare { .. } => "create_comment_share",
			Operation::CreateProducer { .. } => "create_producer",
			Operation::SubmitProofOfWork { .. } => "submit_proof_of_work",
			Operation::VoteRole { .. } => "vote_role",
			Operation::UnvoteRole { .. } => "unvote_role",
			Operation::CreateNetworkOfficer { .. } => "create_network_officer",
			Operation::CreateGovernanceAccount { .. } => "create_governance_account",
			Operation::CreateSupernode { .. } => "create_supernode",
			Operation::CreateMediator { .. } => "create_mediator",
			Operation::CreateExecutiveBoard { .. } => "create_executive_board",
			Operation::CreateCommunityEnterprise { .. } => "create_community_enterprise",
			Operation::ContributeToEnterprise { .. } => "contribute_to_enterprise",
			Operation::CreateCommunity { .. } => "create_community",
			Operation::RequestJoinCommunity { .. } => "request_join_community",
			Operation::ApproveJoinRequest { .. } => "approve_join_request",
			Operation::InviteToCommunity { .. } => "invite_to_community",
			Operation::AcceptCommunityInvite { .. } => "accept_community_invite",
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
pub struct Transaction {
	pub ref_block_num: u16,
	pub ref_block_prefix: u32,
	pub expiration: TimePoint,
	pub operations: Vec<Operation>,
	pub signatures: Vec<Signature>,
}

impl Transaction {
	/// The id is the truncated hash of the encoded transaction (spec §3.1),
	/// with no height prefix (only blocks embed height in their id).
	pub fn id(&self) -> ObjectId160 {
		let bytes = self.encode();
		let hash = chain_common::crypto::Sha256Hash::hash(&bytes);
		ObjectId160::from_sha256_truncated(&hash)
	}

	pub fn digest_for_signing(&self) -> chain_common::crypto::Sha256Hash {
		let mut unsigned = self.clone();
		unsigned.signatures.clear();
		chain_common::crypto::Sha256Hash::hash(&unsigned.encode())
	}
}
