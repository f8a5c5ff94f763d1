//! Chain-wide constants (spec §4.7, §4.8, §9).

/// Length of a block production slot.
pub const BLOCK_INTERVAL_SECONDS: i64 = 3;

/// Number of blocks a producer's confirmation buries before it is
/// considered irreversible (spec §4.4.2 step 7).
pub const IRREVERSIBLE_CONFIRMATION_DEPTH: u32 = 15;

/// Forks older than `head - MAX_FORK_DEPTH` are pruned from the fork
/// database (spec §4.2).
pub const MAX_FORK_DEPTH: u32 = 2_000;

/// Size of the recent-slots-filled participation bitmap (spec §3.2).
pub const RECENT_SLOTS_BITMAP_SIZE: u32 = 128;

/// Number of low bits of the block height used as a block-summary index
/// (spec §4.4.2 step 4).
pub const BLOCK_SUMMARY_MODULUS: u32 = 0x10000;

/// Minimum time an asset creator must wait between asset creations
/// (spec §4.5 "Create asset").
pub const ASSET_CREATION_RATE_LIMIT_SECONDS: i64 = 3_600;

/// Minimum time between owner-authority updates on the same account
/// (spec §3.3 invariant 7).
pub const OWNER_UPDATE_RATE_LIMIT_SECONDS: i64 = 3_600;

/// Initial redemption price for a newly created credit pool, in
/// credit-pool shares per unit of the underlying asset.
pub const MIN_CREDIT_POOL_PRICE_RATIO: u64 = chain_amm::credit_pool::INITIAL_SHARES_PER_UNIT;

/// Default maintenance collateral ratio, expressed in basis points
/// (17500 == 1.75x), used when a bitasset's feed has not overridden it.
pub const DEFAULT_MAINTENANCE_COLLATERAL_RATIO_BPS: u64 = 17_500;

/// Minimum number of live price feeds required before a median is valid
/// (spec §4.6.8).
pub const DEFAULT_MINIMUM_FEEDS: usize = 1;

/// How long a published price feed remains valid (spec §4.6.8).
pub const DEFAULT_FEED_LIFETIME_SECONDS: i64 = 86_400;

/// Delay between a force-settlement request maturing (spec §4.6.7).
pub const FORCE_SETTLEMENT_DELAY_SECONDS: i64 = 86_400;

/// Delay used by the buy-side settlement queue recovered from
/// `original_source` (SPEC_FULL.md §B.2).
pub const BUY_SIDE_SETTLEMENT_DELAY_SECONDS: i64 = 600;

/// Delay before a savings withdrawal releases (spec §4.5).
pub const SAVINGS_WITHDRAWAL_DELAY_SECONDS: i64 = 259_200;

/// Maximum serialized size of a block's transaction payload, in bytes.
pub const MAX_BLOCK_SIZE_BYTES: usize = 2 * 1024 * 1024;

/// Maximum allowed delta between a transaction's expiration and head time.
pub const MAX_TRANSACTION_EXPIRATION_SECONDS: i64 = 3_600;

/// Hardfork gating the corrected behavior of price getters that, in the
/// original implementation, fell off the end of a non-void function
/// (spec §9 design note 1; decision recorded in SPEC_FULL.md §C.1). Gates
/// [`crate::evaluator::trading::effective_settlement_price`].
pub const HARDFORK_0_1_PRICE_GETTER_FIX: u32 = 1;

/// Cadence, in blocks, of the hourly maintenance jobs (vote-rank updates)
/// (spec §4.7).
pub const HOURLY_JOB_BLOCK_INTERVAL: u32 = (3_600 / BLOCK_INTERVAL_SECONDS) as u32;

/// Cadence, in blocks, of the daily maintenance jobs (auction clearing,
/// quadratic funding payouts, proof-of-work retargeting) (spec §4.7, §4.8).
pub const DAILY_JOB_BLOCK_INTERVAL: u32 = HOURLY_JOB_BLOCK_INTERVAL * 24;

/// Starting difficulty target for a newly registered proof-of-work
/// producer, before the first daily retarget narrows it (spec §4.8).
pub const INITIAL_POW_TARGET: u128 = u128::MAX >> 8;
