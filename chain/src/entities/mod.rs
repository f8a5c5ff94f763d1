//! Every persisted object kind kept in the chain's object store (spec §3.2).

pub mod account;
pub mod asset;
pub mod block_summary;
pub mod content;
pub mod global;
pub mod producer;
pub mod trading;

pub use account::{Account, AccountAuthority, AccountBalance, AccountType, Delegation, WeightedAuthority};
pub use asset::{
	Asset, AssetDynamicData, AssetFlags, AssetKind, BitassetData, CreditData, CreditPoolObject,
	EquityData, LiquidityPoolObject, PriceFeed,
};
pub use block_summary::BlockSummary;
pub use content::{
	ActivityEvent, Comment, CommentShare, CommentVote, CommentView, Community, CommunityInvite,
	CommunityJoinRequest, CommunityKind, CommunityPermission, CommunityRole,
};
pub use global::{ApplyContext, ChainProperties, DynamicGlobalProperties, HardforkProperty, RewardFund};
pub use producer::{
	CommunityEnterprise, ExecutiveBoard, GovernanceAccount, Interface, Mediator, NetworkOfficer,
	NetworkRoleKind, Producer, ProducerKind, ProducerSchedule, RoleVote, Supernode,
};
pub use trading::{
	AuctionOrder, CallOrder, ForceSettlement, LimitOrder, MarginOrder, OptionKind, OptionOrder,
};
