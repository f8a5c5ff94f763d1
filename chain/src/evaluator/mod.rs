//! Operation dispatch: routes each [`Operation`] variant to the evaluator
//! function that implements it (spec §4.4.3 step 4 "Apply").

pub mod account;
pub mod asset;
pub mod content;
pub mod producer;
pub mod trading;

use chain_common::error::ChainResult;
use chain_common::TimePoint;

use crate::constants::{FORCE_SETTLEMENT_DELAY_SECONDS, SAVINGS_WITHDRAWAL_DELAY_SECONDS};
use crate::db::ChainDb;
use crate::operation::Operation;

/// Unstaking follows the same three-installment schedule as Steem's power
/// down, generalized here to a single release after this delay (tracked per
/// `(amount, release_time)` entry so a future multi-installment split would
/// only need to push several entries instead of one).
const UNSTAKE_DELAY_SECONDS: i64 = 13 * 7 * 24 * 60 * 60;

pub fn apply_operation(db: &mut ChainDb, op: &Operation, now: TimePoint) -> ChainResult<()> {
	match op {
		Operation::CreateAccount { creator, new_account, owner_key, active_key, posting_key, secure_key } => {
			account::create_account(db, creator, new_account, *owner_key, *active_key, *posting_key, *secure_key, now)
		},
		Operation::Transfer { from, to, amount, memo: _ } => account::transfer(db, from, to, amount),
		Operation::CreateAsset {
			issuer,
			symbol,
			kind,
			max_supply,
			flags,
			market_fee_bps,
			initial_coin_liquidity,
			initial_usd_liquidity,
			initial_credit_base,
		} => asset::create_asset(
			db,
			issuer,
			symbol,
			*kind,
			*max_supply,
			*flags,
			*market_fee_bps,
			*initial_coin_liquidity,
			*initial_usd_liquidity,
			*initial_credit_base,
			now,
		),
		Operation::UpdateAsset { issuer, symbol, market_fee_bps, flags } => asset::update_asset(db, issuer, symbol, *market_fee_bps, *flags),
		Operation::UpdateAssetIssuer { issuer, symbol, new_issuer } => asset::update_asset_issuer(db, issuer, symbol, new_issuer),
		Operation::IssueAsset { issuer, symbol, recipient, amount } => asset::issue_asset(db, issuer, symbol, recipient, *amount),
		Operation::ReserveAsset { payer, symbol, amount } => asset::reserve_asset(db, payer, symbol, *amount),
		Operation::Stake { account, amount } => account::stake(db, account, amount),
		Operation::Unstake { account, amount } => account::unstake(db, account, amount, TimePoint(now.0 + UNSTAKE_DELAY_SECONDS)),
		Operation::TransferToSavings { account, amount } => account::transfer_to_savings(db, account, amount),
		Operation::TransferFromSavings { account, amount } => {
			account::transfer_from_savings(db, account, amount, TimePoint(now.0 + SAVINGS_WITHDRAWAL_DELAY_SECONDS))
		},
		Operation::DelegateStake { delegator, delegatee, amount } => account::delegate_stake(db, delegator, delegatee, amount),
		Operation::PlaceLimitOrder { seller, amount_for_sale, sell_price, expiration } => {
			trading::place_limit_order(db, seller, amount_for_sale, sell_price, *expiration).map(|_| ())
		},
		Operation::CancelLimitOrder { owner, order_id } => trading::cancel_limit_order(db, owner, *order_id),
		Operation::LendCreditPool { lender, base_symbol, amount } => trading::lend_credit_pool(db, lender, base_symbol, *amount),
		Operation::RedeemCreditPool { redeemer, base_symbol, shares } => trading::redeem_credit_pool(db, redeemer, base_symbol, *shares),
		Operation::SwapLiquidityPool { trader, symbol_a: _, symbol_b, amount_in, minimum_out } => {
			trading::swap_liquidity_pool(db, trader, symbol_b, amount_in, *minimum_out)
		},
		Operation::OpenCallOrder { borrower, collateral, debt, target_collateralization_ratio_bps } => {
			trading::open_call_order(db, borrower, collateral, debt, *target_collateralization_ratio_bps)
		},
		Operation::PublishPriceFeed {
			producer,
			symbol,
			settlement_price_num,
			settlement_price_den,
			maintenance_collateral_ratio_bps,
			maximum_short_squeeze_ratio_bps,
		} => trading::publish_price_feed(
			db,
			producer,
			symbol,
			*settlement_price_num,
			*settlement_price_den,
			*maintenance_collateral_ratio_bps,
			*maximum_short_squeeze_ratio_bps,
			now,
		),
		Operation::ForceSettle { owner, balance } => {
			trading::force_settle(db, owner, balance, TimePoint(now.0 + FORCE_SETTLEMENT_DELAY_SECONDS))
		},
		Operation::GlobalSettle { issuer, symbol, settlement_price_num, settlement_price_den } => {
			trading::global_settle(db, issuer, symbol, *settlement_price_num, *settlement_price_den)
		},
		Operation::CreateComment { author, permlink, parent_author, parent_permlink, community } => {
			content::create_comment(db, author, permlink, parent_author.clone(), parent_permlink.clone(), community.clone(), now).map(|_| ())
		},
		Operation::VoteComment { voter, comment_id, weight } => content::vote_comment(db, voter, *comment_id, *weight, now),
		Operation::OpenOptionOrder { owner, underlying_amount, strike_price, kind, expiration } => {
			trading::open_option_order(db, owner, underlying_amount, strike_price, *kind, *expiration).map(|_| ())
		},
		Operation::AddLiquidity { provider, amount_a, amount_b, minimum_shares } => {
			trading::add_liquidity(db, provider, amount_a, amount_b, *minimum_shares)
		},
		Operation::RemoveLiquidity { provider, liquidity_asset, shares } => trading::remove_liquidity(db, provider, liquidity_asset, *shares),
		Operation::OpenMarginOrder { owner, collateral, debt_symbol, debt_amount, position, sell_price, stop_loss_price, take_profit_price } => trading::open_margin_order(
			db,
			owner,
			collateral,
			debt_symbol,
			*debt_amount,
			position,
			sell_price.clone(),
			stop_loss_price.clone(),
			take_profit_price.clone(),
			now,
		)
		.map(|_| ()),
		Operation::CloseMarginOrder { owner, order_id } => trading::close_margin_order(db, owner, *order_id),
		Operation::PlaceAuctionOrder { owner, amount_to_sell, limit_close_price, expiration } => {
			trading::place_auction_order(db, owner, amount_to_sell, limit_close_price.clone(), *expiration).map(|_| ())
		},
		Operation::CreateCommentView { viewer, comment_id } => content::create_comment_view(db, viewer, *comment_id, now),
		Operation::CreateCommentShare { sharer, comment_id } => content::create_comment_share(db, sharer, *comment_id, now),
		Operation::CreateProducer { owner, signing_key, kind, url } => {
			producer::create_producer(db, owner, *signing_key, *kind, url).map(|_| ())
		},
		Operation::SubmitProofOfWork { owner, header_bytes, nonce } => producer::submit_proof_of_work(db, owner, header_bytes, *nonce),
		Operation::VoteRole { voter, role, target_id } => producer::vote_role(db, voter, *role, *target_id),
		Operation::UnvoteRole { voter, role, target_id } => producer::unvote_role(db, voter, *role, *target_id),
		Operation::CreateNetworkOfficer { account, role } => producer::create_network_officer(db, account, role).map(|_| ()),
		Operation::CreateGovernanceAccount { account } => producer::create_governance_account(db, account).map(|_| ()),
		Operation::CreateSupernode { owner, endpoint_url } => producer::create_supernode(db, owner, endpoint_url).map(|_| ()),
		Operation::CreateMediator { account } => producer::create_mediator(db, account).map(|_| ()),
		Operation::CreateExecutiveBoard { members, budget, symbol } => {
			producer::create_executive_board(db, members.clone(), *budget, symbol.clone(), now).map(|_| ())
		},
		Operation::CreateCommunityEnterprise { creator, title, symbol } => {
			producer::create_community_enterprise(db, creator, title, symbol).map(|_| ())
		},
		Operation::ContributeToEnterprise { contributor, enterprise_id, amount } => {
			producer::contribute_to_enterprise(db, contributor, *enterprise_id, *amount)
		},
		Operation::CreateCommunity { creator, name, kind, title, about } => {
			content::create_community(db, creator, name, *kind, title, about, now)
		},
		Operation::RequestJoinCommunity { account, community } => content::request_join_community(db, account, community, now),
		Operation::ApproveJoinRequest { approver, request_id } => content::approve_join_request(db, approver, *request_id),
		Operation::InviteToCommunity { inviter, community, invitee, role } => {
			content::invite_to_community(db, inviter, community, invitee, *role, now).map(|_| ())
		},
		Operation::AcceptCommunityInvite { account, invite_id } => content::accept_community_invite(db, account, *invite_id),
	}
}
