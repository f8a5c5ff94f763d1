//! Assets and the per-kind data records that hang off them (spec §3.2).

use chain_amm::{CreditPool, LiquidityPool};
use chain_common::{AccountName, AssetSymbol, ShareAmount, TimePoint};
use codec::{Decode, Encode};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
pub enum AssetKind {
	Standard,
	Currency,
	Equity,
	Credit,
	Bitasset,
	LiquidityPoolAsset,
	CreditPoolAsset,
}

bitflags::bitflags! {
	#[derive(Serialize, Deserialize)]
	pub struct AssetFlags: u32 {
		const WHITE_LIST     = 1 << 0;
		const MARKET_ISSUED  = 1 << 1;
		const TRANSFER_RESTRICTED = 1 << 2;
	}
}

impl codec::Encode for AssetFlags {
	fn encode(&self) -> Vec<u8> {
		self.bits().encode()
	}
}

impl codec::Decode for AssetFlags {
	fn decode<I: codec::Input>(input: &mut I) -> Result<Self, codec::Error> {
		let bits = u32::decode(input)?;
		Ok(AssetFlags::from_bits_truncate(bits))
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
	pub id: u64,
	pub symbol: AssetSymbol,
	pub kind: AssetKind,
	pub issuer: AccountName,
	pub flags: AssetFlags,
	pub market_fee_bps: u32,
	pub market_fee_share_bps: u32,
	pub max_supply: ShareAmount,
	pub created: TimePoint,
}

impl Asset {
	/// Currency assets are forced to the null account and frozen forever
	/// (spec §3.2).
	pub fn is_currency_locked(&self) -> bool {
		matches!(self.kind, AssetKind::Currency)
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetDynamicData {
	pub id: u64,
	pub symbol: AssetSymbol,
	pub total_supply: ShareAmount,
	pub liquid_supply: ShareAmount,
	pub staked_supply: ShareAmount,
	pub reward_supply: ShareAmount,
	pub savings_supply: ShareAmount,
	pub pending_supply: ShareAmount,
	pub accumulated_fees: ShareAmount,
}

impl AssetDynamicData {
	pub fn new(symbol: AssetSymbol) -> Self {
		AssetDynamicData {
			id: 0,
			symbol,
			total_supply: ShareAmount::ZERO,
			liquid_supply: ShareAmount::ZERO,
			staked_supply: ShareAmount::ZERO,
			reward_supply: ShareAmount::ZERO,
			savings_supply: ShareAmount::ZERO,
			pending_supply: ShareAmount::ZERO,
			accumulated_fees: ShareAmount::ZERO,
		}
	}
}

/// A single producer-submitted price feed (spec §4.6.8).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceFeed {
	pub producer: AccountName,
	pub settlement_price_num: i64,
	pub settlement_price_den: i64,
	pub maintenance_collateral_ratio_bps: u64,
	pub maximum_short_squeeze_ratio_bps: u64,
	pub core_exchange_rate_num: i64,
	pub core_exchange_rate_den: i64,
	pub published: TimePoint,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitassetData {
	pub id: u64,
	pub symbol: AssetSymbol,
	pub backing_symbol: AssetSymbol,
	pub feeds: Vec<PriceFeed>,
	/// The median of `feeds` as of the last time it was recomputed.
	pub effective_feed: Option<PriceFeed>,
	pub settlement_price_num: i64,
	pub settlement_price_den: i64,
	pub has_settlement: bool,
	pub settlement_fund: ShareAmount,
	pub total_debt_at_settlement: ShareAmount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquityData {
	pub id: u64,
	pub symbol: AssetSymbol,
	pub dividend_pool: ShareAmount,
	pub dividend_share_bps: u32,
	pub liquid_fixed_dividend_bps: u32,
	pub staked_fixed_dividend_bps: u32,
	pub boost_rate_bps: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditData {
	pub id: u64,
	pub symbol: AssetSymbol,
	pub buyback_pool: ShareAmount,
	pub buyback_price_num: i64,
	pub buyback_price_den: i64,
	pub fixed_interest_rate_bps: u32,
	pub variable_interest_min_bps: u32,
	pub variable_interest_max_bps: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidityPoolObject {
	pub id: u64,
	pub symbol_a: AssetSymbol,
	pub symbol_b: AssetSymbol,
	pub liquidity_asset: AssetSymbol,
	pub pool: LiquidityPool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditPoolObject {
	pub id: u64,
	pub base_symbol: AssetSymbol,
	pub credit_symbol: AssetSymbol,
	pub pool: CreditPool,
}
