//! Social graph entities: posts/comments, votes, and communities (spec §3.2
//! "Content & communities", §4.5).

use chain_common::{AccountName, ShareAmount, TimePoint};
use codec::{Decode, Encode};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
	pub id: u64,
	pub author: AccountName,
	pub permlink: String,
	pub parent_author: Option<AccountName>,
	pub parent_permlink: Option<String>,
	pub community: Option<AccountName>,
	pub created: TimePoint,
	pub last_update: TimePoint,
	pub cashout_time: Option<TimePoint>,
	pub net_rshares: i128,
	pub abs_rshares: u128,
	pub children: u32,
	pub total_payout_value: ShareAmount,
	pub curator_payout_value: ShareAmount,
	pub allow_votes: bool,
	pub allow_curation_rewards: bool,
	pub max_accepted_payout: ShareAmount,
	pub percent_liquid: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentVote {
	pub id: u64,
	pub voter: AccountName,
	pub comment: u64,
	pub weight: i16,
	pub rshares: i128,
	pub time: TimePoint,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentView {
	pub id: u64,
	pub viewer: AccountName,
	pub comment: u64,
	pub time: TimePoint,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentShare {
	pub id: u64,
	pub sharer: AccountName,
	pub comment: u64,
	pub time: TimePoint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
pub enum CommunityKind {
	Open,
	Restricted,
	Closed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Community {
	pub id: u64,
	pub name: AccountName,
	pub kind: CommunityKind,
	pub title: String,
	pub about: String,
	pub created: TimePoint,
	pub subscriber_count: u32,
	pub post_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
pub enum CommunityRole {
	Guest,
	Member,
	Moderator,
	Admin,
	Owner,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommunityPermission {
	pub community: AccountName,
	pub account: AccountName,
	pub role: CommunityRole,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommunityJoinRequest {
	pub id: u64,
	pub community: AccountName,
	pub account: AccountName,
	pub created: TimePoint,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommunityInvite {
	pub id: u64,
	pub community: AccountName,
	pub inviter: AccountName,
	pub invitee: AccountName,
	pub role: CommunityRole,
	pub created: TimePoint,
}

/// A pending reputation/activity event applied by a periodic job rather than
/// immediately on the operation that created it (spec §4.7).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEvent {
	pub id: u64,
	pub account: AccountName,
	pub points: i64,
	pub time: TimePoint,
}
