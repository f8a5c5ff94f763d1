//! Comments and votes (spec §3.2 "Content & communities", §4.5).

use chain_common::error::{ChainError, ChainResult};
use chain_common::{AccountName, AssetSymbol, ShareAmount, TimePoint};

use crate::db::ChainDb;
use crate::entities::{
	Comment, CommentShare, CommentVote, CommentView, Community, CommunityInvite,
	CommunityJoinRequest, CommunityKind, CommunityPermission, CommunityRole,
};

pub const CASHOUT_WINDOW_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Split of a comment's payout that goes to viewers, sharers, commenters,
/// and moderators respectively; the remainder, after curators' share (taken
/// from `RewardFund::percent_curation_rewards_bps`), goes to the author.
pub const VIEWER_SHARE_BPS: u64 = 500;
pub const SHARER_SHARE_BPS: u64 = 500;
pub const COMMENTER_SHARE_BPS: u64 = 500;
pub const MODERATOR_SHARE_BPS: u64 = 500;

#[allow(clippy::too_many_arguments)]
pub fn create_comment(
	db: &mut ChainDb,
	author: &AccountName,
	permlink: &str,
	parent_author: Option<AccountName>,
	parent_permlink: Option<String>,
	community: Option<AccountName>,
	now: TimePoint,
) -> ChainResult<u64> {
	if let Some(parent) = &parent_author {
		db.accounts
			.find_by_index("by_name", parent.as_str().as_bytes())
			.ok_or_else(|| ChainError::NotFound(parent.to_string()))?;
	}
	let id = db
		.comments
		.create(|id| Comment {
			id,
			author: author.clone(),
			permlink: permlink.to_string(),
			parent_author: parent_author.clone(),
			parent_permlink,
			community,
			created: now,
			last_update: now,
			cashout_time: Some(TimePoint(now.0 + CASHOUT_WINDOW_SECONDS)),
			net_rshares: 0,
			abs_rshares: 0,
			children: 0,
			total_payout_value: chain_common::ShareAmount::ZERO,
			curator_payout_value: chain_common::ShareAmount::ZERO,
			allow_votes: true,
			allow_curation_rewards: true,
			max_accepted_payout: chain_common::ShareAmount(1_000_000_000),
			percent_liquid: 10_000,
		})?
		.id;
	if let Some(parent) = parent_author {
		let key = {
			let mut k = parent.as_str().as_bytes().to_vec();
			k.push(0);
			k.extend(permlink.as_bytes());
			k
		};
		let _ = key;
		if let Some(parent_id) = db.comments.iter().find(|(_, c)| c.author == parent).map(|(&id, _)| id) {
			db.comments.modify(parent_id, |c| c.children += 1)?;
		}
	}
	Ok(id)
}

/// Applies a vote, replacing any previous vote by the same voter on the
/// same comment, and recomputes the comment's `net_rshares`/`abs_rshares`
/// from stake-weighted `rshares` proportional to `weight` (spec §4.5 "Vote
/// comment").
pub fn vote_comment(db: &mut ChainDb, voter: &AccountName, comment_id: u64, weight: i16, now: TimePoint) -> ChainResult<()> {
	let comment = db.comments.get(comment_id)?;
	if !comment.allow_votes {
		return Err(ChainError::InvariantViolation("comment does not allow votes".into()));
	}
	if comment.cashout_time.map(|t| now.0 > t.0).unwrap_or(true) {
		return Err(ChainError::InvariantViolation("comment has already paid out".into()));
	}

	let voter_stake = db
		.account_balances
		.iter()
		.filter(|(_, b)| b.owner == *voter)
		.fold(0i64, |acc, (_, b)| acc + b.staked.0.max(0));
	let rshares = (voter_stake as i128) * (weight as i128) / 10_000;

	let existing_vote_id = db
		.comment_votes
		.iter()
		.find(|(_, v)| v.voter == *voter && v.comment == comment_id)
		.map(|(&id, _)| id);
	let previous_rshares = match existing_vote_id {
		Some(id) => db.comment_votes.get(id)?.rshares,
		None => 0,
	};

	match existing_vote_id {
		Some(id) => db.comment_votes.modify(id, |v| {
			v.weight = weight;
			v.rshares = rshares;
			v.time = now;
		})?,
		None => {
			db.comment_votes.create(|id| CommentVote { id, voter: voter.clone(), comment: comment_id, weight, rshares, time: now })?;
		},
	}

	db.comments.modify(comment_id, |c| {
		c.net_rshares = c.net_rshares - previous_rshares + rshares;
		c.abs_rshares = c.abs_rshares.saturating_sub(previous_rshares.unsigned_abs()).saturating_add(rshares.unsigned_abs());
		c.last_update = now;
	})
}

pub fn create_comment_view(db: &mut ChainDb, viewer: &AccountName, comment_id: u64, now: TimePoint) -> ChainResult<()> {
	db.comments.get(comment_id)?;
	db.comment_views.create(|id| CommentView { id, viewer: viewer.clone(), comment: comment_id, time: now })?;
	Ok(())
}

pub fn create_comment_share(db: &mut ChainDb, sharer: &AccountName, comment_id: u64, now: TimePoint) -> ChainResult<()> {
	db.comments.get(comment_id)?;
	db.comment_shares.create(|id| CommentShare { id, sharer: sharer.clone(), comment: comment_id, time: now })?;
	Ok(())
}

/// Pays out a comment whose `cashout_time` has passed: the reward fund's
/// claim on `abs_rshares` determines the gross reward, capped at
/// `max_accepted_payout`, then split among curators (voters, weighted by
/// `rshares`), viewers, sharers, commenters (repliers), and moderators of the
/// comment's community, with the remainder credited to the author (spec
/// §4.7 "Content rewards").
pub fn cashout_comment(db: &mut ChainDb, comment_id: u64, now: TimePoint) -> ChainResult<()> {
	let comment = db.comments.get(comment_id)?;
	let Some(cashout_time) = comment.cashout_time else { return Ok(()) };
	if now.0 < cashout_time.0 {
		return Ok(());
	}
	if comment.abs_rshares == 0 {
		db.comments.modify(comment_id, |c| c.cashout_time = None)?;
		return Ok(());
	}

	let fund_symbol = AssetSymbol::new("COIN").expect("core currency symbol is valid");
	let Some(fund_row) = db.reward_funds.find_by_index("by_symbol", fund_symbol.as_str().as_bytes()) else {
		db.comments.modify(comment_id, |c| c.cashout_time = None)?;
		return Ok(());
	};
	let fund_id = fund_row.id;
	let fund = db.reward_funds.get(fund_id)?;
	if fund.recent_claims == 0 {
		db.comments.modify(comment_id, |c| c.cashout_time = None)?;
		return Ok(());
	}

	let claim = comment.abs_rshares * fund.content_constant.max(1);
	let gross = (fund.reward_balance.0 as i128) * claim as i128 / fund.recent_claims as i128;
	let reward = ShareAmount(gross.min(comment.max_accepted_payout.0 as i128).max(0) as i64);
	let percent_curation_rewards_bps = fund.percent_curation_rewards_bps;
	let author = comment.author.clone();

	db.reward_funds.modify(fund_id, |f| {
		f.reward_balance = ShareAmount(f.reward_balance.0.saturating_sub(reward.0));
		f.recent_claims = f.recent_claims.saturating_sub(claim);
		f.last_update = now;
	})?;
	if reward.0 == 0 {
		db.comments.modify(comment_id, |c| c.cashout_time = None)?;
		return Ok(());
	}

	let curator_share = (reward.0 as i128) * percent_curation_rewards_bps as i128 / 10_000;
	let community_share = (reward.0 as i128) * (VIEWER_SHARE_BPS + SHARER_SHARE_BPS + COMMENTER_SHARE_BPS + MODERATOR_SHARE_BPS) as i128 / 10_000;
	let author_share = reward.0 as i128 - curator_share - community_share;

	let votes: Vec<CommentVote> = db.comment_votes.iter().filter(|(_, v)| v.comment == comment_id && v.rshares > 0).map(|(_, v)| v.clone()).collect();
	let total_positive_rshares: i128 = votes.iter().map(|v| v.rshares).sum();
	if total_positive_rshares > 0 {
		for vote in &votes {
			let paid = curator_share * vote.rshares / total_positive_rshares;
			if paid > 0 {
				credit_author(db, &vote.voter, &fund_symbol, paid as i64)?;
			}
		}
	}

	let group_total_bps = (VIEWER_SHARE_BPS + SHARER_SHARE_BPS + COMMENTER_SHARE_BPS + MODERATOR_SHARE_BPS) as i128;
	let viewers = community_share_group(db, comment_id, "viewer");
	credit_group_evenly(db, &fund_symbol, &viewers, community_share * VIEWER_SHARE_BPS as i128 / group_total_bps)?;
	let sharers = community_share_group(db, comment_id, "sharer");
	credit_group_evenly(db, &fund_symbol, &sharers, community_share * SHARER_SHARE_BPS as i128 / group_total_bps)?;
	let commenters = community_share_group(db, comment_id, "commenter");
	credit_group_evenly(db, &fund_symbol, &commenters, community_share * COMMENTER_SHARE_BPS as i128 / group_total_bps)?;
	let moderators = community_share_group(db, comment_id, "moderator");
	credit_group_evenly(db, &fund_symbol, &moderators, community_share * MODERATOR_SHARE_BPS as i128 / group_total_bps)?;

	credit_author(db, &author, &fund_symbol, author_share.max(0) as i64)?;

	db.comments.modify(comment_id, |c| {
		c.total_payout_value = ShareAmount(c.total_payout_value.0.saturating_add(reward.0));
		c.curator_payout_value = ShareAmount(c.curator_payout_value.0.saturating_add(curator_share.max(0) as i64));
		c.cashout_time = None;
	})
}

fn community_share_group(db: &ChainDb, comment_id: u64, kind: &str) -> Vec<AccountName> {
	let Ok(comment) = db.comments.get(comment_id) else { return Vec::new() };
	match kind {
		"viewer" => db.comment_views.iter().filter(|(_, v)| v.comment == comment_id).map(|(_, v)| v.viewer.clone()).collect(),
		"sharer" => db.comment_shares.iter().filter(|(_, s)| s.comment == comment_id).map(|(_, s)| s.sharer.clone()).collect(),
		"commenter" => db
			.comments
			.iter()
			.filter(|(_, c)| c.parent_author.as_ref() == Some(&comment.author) && c.parent_permlink.as_deref() == Some(comment.permlink.as_str()))
			.map(|(_, c)| c.author.clone())
			.collect(),
		"moderator" => {
			let Some(community) = &comment.community else { return Vec::new() };
			db.community_permissions
				.iter()
				.filter(|(_, p)| p.community == *community && matches!(p.role, crate::entities::CommunityRole::Moderator | crate::entities::CommunityRole::Admin | crate::entities::CommunityRole::Owner))
				.map(|(_, p)| p.account.clone())
				.collect()
		},
		_ => Vec::new(),
	}
}

fn credit_group_evenly(db: &mut ChainDb, symbol: &AssetSymbol, accounts: &[AccountName], total: i128) -> ChainResult<()> {
	if accounts.is_empty() || total <= 0 {
		return Ok(());
	}
	let per_account = total / accounts.len() as i128;
	if per_account == 0 {
		return Ok(());
	}
	for account in accounts {
		credit_author(db, account, symbol, per_account as i64)?;
	}
	Ok(())
}

fn credit_author(db: &mut ChainDb, account: &AccountName, symbol: &AssetSymbol, amount: i64) -> ChainResult<()> {
	if amount <= 0 {
		return Ok(());
	}
	super::trading::credit_liquid(db, account, &chain_common::AssetAmount { amount: ShareAmount(amount), symbol: symbol.clone() })
}

fn permission_role(db: &ChainDb, community: &AccountName, account: &AccountName) -> Option<CommunityRole> {
	db.community_permissions
		.iter()
		.find(|(_, p)| p.community == *community && p.account == *account)
		.map(|(_, p)| p.role)
}

fn set_permission(db: &mut ChainDb, community: &AccountName, account: &AccountName, role: CommunityRole) -> ChainResult<()> {
	let existing_id = db
		.community_permissions
		.iter()
		.find(|(_, p)| p.community == *community && p.account == *account)
		.map(|(&id, _)| id);
	match existing_id {
		Some(id) => db.community_permissions.modify(id, |p| p.role = role),
		None => {
			db.community_permissions.create(|_| CommunityPermission { community: community.clone(), account: account.clone(), role })?;
			Ok(())
		},
	}
}

/// Creates a community and seats its creator as `Owner` (spec §3.2
/// "Content & communities").
pub fn create_community(db: &mut ChainDb, creator: &AccountName, name: &AccountName, kind: CommunityKind, title: &str, about: &str, now: TimePoint) -> ChainResult<()> {
	db.communities.create(|id| Community {
		id,
		name: name.clone(),
		kind,
		title: title.to_string(),
		about: about.to_string(),
		created: now,
		subscriber_count: 1,
		post_count: 0,
	})?;
	set_permission(db, name, creator, CommunityRole::Owner)
}

/// Requests membership in a community; `Open` communities are joined
/// immediately, `Restricted`/`Closed` ones require a moderator to approve
/// via [`approve_join_request`] (spec §3.2).
pub fn request_join_community(db: &mut ChainDb, account: &AccountName, community: &AccountName, now: TimePoint) -> ChainResult<()> {
	let community_row = db
		.communities
		.find_by_index("by_name", community.as_str().as_bytes())
		.ok_or_else(|| ChainError::NotFound(community.to_string()))?;
	let (community_id, community_kind) = (community_row.id, community_row.kind);
	if permission_role(db, community, account).is_some() {
		return Err(ChainError::InvariantViolation(format!("{account} is already a member of {community}")));
	}
	if community_kind == CommunityKind::Open {
		set_permission(db, community, account, CommunityRole::Member)?;
		db.communities.modify(community_id, |c| c.subscriber_count += 1)?;
		return Ok(());
	}
	db.community_join_requests.create(|id| CommunityJoinRequest { id, community: community.clone(), account: account.clone(), created: now })?;
	Ok(())
}

/// A moderator or above approves a pending join request.
pub fn approve_join_request(db: &mut ChainDb, approver: &AccountName, request_id: u64) -> ChainResult<()> {
	let request = db.community_join_requests.get(request_id)?.clone();
	match permission_role(db, &request.community, approver) {
		Some(CommunityRole::Moderator) | Some(CommunityRole::Admin) | Some(CommunityRole::Owner) => {},
		_ => return Err(ChainError::AuthorityInsufficient(format!("{approver} cannot approve joins in {}", request.community))),
	}
	set_permission(db, &request.community, &request.account, CommunityRole::Member)?;
	let community_id = db
		.communities
		.find_by_index("by_name", request.community.as_str().as_bytes())
		.ok_or_else(|| ChainError::NotFound(request.community.to_string()))?
		.id;
	db.communities.modify(community_id, |c| c.subscriber_count += 1)?;
	db.community_join_requests.remove(request_id)?;
	Ok(())
}

/// An admin or above invites an account directly into a role, bypassing the
/// join-request queue.
pub fn invite_to_community(db: &mut ChainDb, inviter: &AccountName, community: &AccountName, invitee: &AccountName, role: CommunityRole, now: TimePoint) -> ChainResult<u64> {
	match permission_role(db, community, inviter) {
		Some(CommunityRole::Admin) | Some(CommunityRole::Owner) => {},
		_ => return Err(ChainError::AuthorityInsufficient(format!("{inviter} cannot invite into {community}"))),
	}
	Ok(db
		.community_invites
		.create(|id| CommunityInvite { id, community: community.clone(), inviter: inviter.clone(), invitee: invitee.clone(), role, created: now })?
		.id)
}

/// The invitee accepts a pending invite, taking on the invited role.
pub fn accept_community_invite(db: &mut ChainDb, account: &AccountName, invite_id: u64) -> ChainResult<()> {
	let invite = db.community_invites.get(invite_id)?.clone();
	if invite.invitee != *account {
		return Err(ChainError::AuthorityInsufficient(format!("{account} was not invited")));
	}
	set_permission(db, &invite.community, account, invite.role)?;
	if let Some(row) = db.communities.find_by_index("by_name", invite.community.as_str().as_bytes()) {
		let id = row.id;
		db.communities.modify(id, |c| c.subscriber_count += 1)?;
	}
	db.community_invites.remove(invite_id)?;
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use chain_common::AccountName;

	fn name(s: &str) -> AccountName {
		AccountName::new(s).unwrap()
	}

	#[test]
	fn create_comment_increments_parent_children_count() {
		let mut db = ChainDb::new(TimePoint(0));
		let parent_id = create_comment(&mut db, &name("alice"), "post", None, None, None, TimePoint(0)).unwrap();
		create_comment(&mut db, &name("bob"), "reply", Some(name("alice")), Some("post".into()), None, TimePoint(10)).unwrap();
		assert_eq!(db.comments.get(parent_id).unwrap().children, 1);
	}

	#[test]
	fn vote_comment_replaces_the_voters_previous_vote() {
		let mut db = ChainDb::new(TimePoint(0));
		let id = create_comment(&mut db, &name("alice"), "post", None, None, None, TimePoint(0)).unwrap();
		db.account_balances
			.create(|bid| {
				let mut b = crate::entities::AccountBalance::new(name("bob"), chain_common::AssetSymbol::new("COIN").unwrap());
				b.id = bid;
				b.staked = chain_common::ShareAmount(1_000);
				b
			})
			.unwrap();

		vote_comment(&mut db, &name("bob"), id, 10_000, TimePoint(100)).unwrap();
		let rshares_up = db.comments.get(id).unwrap().net_rshares;
		assert!(rshares_up > 0);

		vote_comment(&mut db, &name("bob"), id, -10_000, TimePoint(200)).unwrap();
		let rshares_down = db.comments.get(id).unwrap().net_rshares;
		assert!(rshares_down < 0);
		assert_eq!(db.comment_votes.len(), 1);
	}
}
