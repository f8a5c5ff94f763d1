//! Order book entities (spec §3.2 "Trading", §4.6).

use chain_common::{AccountName, AssetAmount, AssetSymbol, Price, TimePoint};
use codec::{Decode, Encode};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitOrder {
	pub id: u64,
	pub order_uuid: u128,
	pub seller: AccountName,
	pub amount_for_sale: AssetAmount,
	pub sell_price: Price,
	pub interface: Option<AccountName>,
	pub expiration: TimePoint,
}

impl LimitOrder {
	/// What this order receives if fully filled at its own price.
	pub fn amount_to_receive(&self) -> chain_common::error::ChainResult<AssetAmount> {
		self.sell_price.multiply(&self.amount_for_sale)
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarginOrder {
	pub id: u64,
	pub order_uuid: u128,
	pub owner: AccountName,
	pub sell_price: Price,
	pub collateral: AssetAmount,
	pub debt: AssetAmount,
	pub debt_balance: AssetAmount,
	pub position: AssetSymbol,
	pub position_balance: AssetAmount,
	pub collateralization_ratio_bps: u64,
	pub last_interest_time: TimePoint,
	pub stop_loss_price: Option<Price>,
	pub take_profit_price: Option<Price>,
	pub limit_stop_loss_price: Option<Price>,
	pub limit_take_profit_price: Option<Price>,
	pub liquidating: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionOrder {
	pub id: u64,
	pub order_uuid: u128,
	pub owner: AccountName,
	pub amount_to_sell: AssetAmount,
	pub limit_close_price: Price,
	pub expiration: TimePoint,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallOrder {
	pub id: u64,
	pub borrower: AccountName,
	pub collateral: AssetAmount,
	pub debt: AssetAmount,
	/// `collateral / debt`, recomputed on every mutation.
	pub call_price: Price,
	pub target_collateralization_ratio_bps: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
pub enum OptionKind {
	Call,
	Put,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionOrder {
	pub id: u64,
	pub order_uuid: u128,
	pub owner: AccountName,
	pub underlying_amount: AssetAmount,
	pub position_debt: AssetAmount,
	pub strike_price: Price,
	pub kind: OptionKind,
	pub expiration: TimePoint,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForceSettlement {
	pub id: u64,
	pub owner: AccountName,
	pub balance: AssetAmount,
	pub settlement_due: TimePoint,
}
