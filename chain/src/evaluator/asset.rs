//! Asset lifecycle evaluators (spec §4.5 "Create asset" through "Asset
//! claim fees").

use chain_amm::{CreditPool, LiquidityPool};
use chain_common::error::{ChainError, ChainResult};
use chain_common::{AccountName, AssetAmount, AssetSymbol, ShareAmount, TimePoint};

use crate::constants::ASSET_CREATION_RATE_LIMIT_SECONDS;
use crate::db::ChainDb;
use crate::entities::{Asset, AssetDynamicData, AssetFlags, AssetKind, CreditPoolObject, LiquidityPoolObject};

#[allow(clippy::too_many_arguments)]
pub fn create_asset(
	db: &mut ChainDb,
	issuer: &AccountName,
	symbol: &AssetSymbol,
	kind: AssetKind,
	max_supply: ShareAmount,
	flags: AssetFlags,
	market_fee_bps: u32,
	initial_coin_liquidity: ShareAmount,
	initial_usd_liquidity: ShareAmount,
	initial_credit_base: ShareAmount,
	now: TimePoint,
) -> ChainResult<()> {
	if db.assets.find_by_index("by_symbol", symbol.as_str().as_bytes()).is_some() {
		return Err(ChainError::SymbolInUse(symbol.to_string()));
	}
	let issuer_account_id = db
		.accounts
		.find_by_index("by_name", issuer.as_str().as_bytes())
		.ok_or_else(|| ChainError::NotFound(issuer.to_string()))?
		.id;
	if let Some(last) = db.accounts.get(issuer_account_id)?.last_asset_creation {
		if now.seconds_since(last) < ASSET_CREATION_RATE_LIMIT_SECONDS {
			return Err(ChainError::RateLimited(format!("{issuer} created an asset too recently")));
		}
	}

	db.assets.create(|id| Asset {
		id,
		symbol: symbol.clone(),
		kind,
		issuer: issuer.clone(),
		flags,
		market_fee_bps,
		market_fee_share_bps: 5_000,
		max_supply,
		created: now,
	})?;
	let dynamic_id = db.asset_dynamic_data.create(|id| {
		let mut data = AssetDynamicData::new(symbol.clone());
		data.id = id;
		data
	})?.id;

	let coin = AssetSymbol::new("COIN").expect("core currency symbol is valid");
	let usd = AssetSymbol::new("USD").expect("core currency symbol is valid");

	// The issuer funds the seeded pools out of their own liquid balance; the
	// new symbol's side is minted fresh below, it has no prior holder.
	if initial_coin_liquidity.0 > 0 && *symbol != coin {
		super::trading::debit_liquid(db, issuer, &AssetAmount { amount: initial_coin_liquidity, symbol: coin.clone() })?;
		debit_liquid_supply(db, &coin, initial_coin_liquidity)?;
	}
	if initial_usd_liquidity.0 > 0 && *symbol != usd {
		super::trading::debit_liquid(db, issuer, &AssetAmount { amount: initial_usd_liquidity, symbol: usd.clone() })?;
		debit_liquid_supply(db, &usd, initial_usd_liquidity)?;
	}

	let coin_pool = LiquidityPool::new(
		initial_coin_liquidity.0.max(0) as u64,
		initial_coin_liquidity.0.max(0) as u64,
		market_fee_bps,
		5_000,
	)?;
	let coin_pool_shares = coin_pool.lp_shares_issued;
	let coin_liquidity_asset = AssetSymbol::liquidity_pool_asset(symbol, &coin);
	db.liquidity_pools.create(|id| LiquidityPoolObject {
		id,
		symbol_a: symbol.clone(),
		symbol_b: coin.clone(),
		liquidity_asset: coin_liquidity_asset.clone(),
		pool: coin_pool,
	})?;
	let usd_pool = LiquidityPool::new(
		initial_usd_liquidity.0.max(0) as u64,
		initial_usd_liquidity.0.max(0) as u64,
		market_fee_bps,
		5_000,
	)?;
	let usd_pool_shares = usd_pool.lp_shares_issued;
	let usd_liquidity_asset = AssetSymbol::liquidity_pool_asset(symbol, &usd);
	db.liquidity_pools.create(|id| LiquidityPoolObject {
		id,
		symbol_a: symbol.clone(),
		symbol_b: usd.clone(),
		liquidity_asset: usd_liquidity_asset.clone(),
		pool: usd_pool,
	})?;

	let credit_pool = CreditPool::new(initial_credit_base.0.max(0) as u64, 200, 1_800)?;
	let credit_pool_shares = credit_pool.shares_issued;
	let credit_symbol = AssetSymbol::credit_pool_asset(symbol);
	db.credit_pools.create(|id| CreditPoolObject {
		id,
		base_symbol: symbol.clone(),
		credit_symbol: credit_symbol.clone(),
		pool: credit_pool,
	})?;

	super::trading::credit_liquid(db, issuer, &AssetAmount { amount: ShareAmount(coin_pool_shares as i64), symbol: coin_liquidity_asset })?;
	super::trading::credit_liquid(db, issuer, &AssetAmount { amount: ShareAmount(usd_pool_shares as i64), symbol: usd_liquidity_asset })?;
	super::trading::credit_liquid(db, issuer, &AssetAmount { amount: ShareAmount(credit_pool_shares as i64), symbol: credit_symbol })?;

	let pool_side_minted = initial_coin_liquidity.checked_add(initial_usd_liquidity)?.checked_add(initial_credit_base)?;
	db.asset_dynamic_data.modify(dynamic_id, |d| {
		d.total_supply = d.total_supply.checked_add(pool_side_minted).unwrap_or(d.total_supply);
	})?;

	db.accounts.modify(issuer_account_id, |a| a.last_asset_creation = Some(now))?;
	Ok(())
}

/// Debits `amount` from an existing currency's own `liquid_supply` when it
/// has dynamic data (new symbols being created have none yet).
fn debit_liquid_supply(db: &mut ChainDb, symbol: &AssetSymbol, amount: ShareAmount) -> ChainResult<()> {
	if let Some(row) = db.asset_dynamic_data.find_by_index("by_symbol", symbol.as_str().as_bytes()) {
		let id = row.id;
		db.asset_dynamic_data.modify(id, |d| {
			d.liquid_supply = d.liquid_supply.checked_sub(amount).unwrap_or(d.liquid_supply);
		})?;
	}
	Ok(())
}

pub fn update_asset(db: &mut ChainDb, issuer: &AccountName, symbol: &AssetSymbol, market_fee_bps: u32, flags: AssetFlags) -> ChainResult<()> {
	let id = db
		.assets
		.find_by_index("by_symbol", symbol.as_str().as_bytes())
		.ok_or_else(|| ChainError::NotFound(symbol.to_string()))?
		.id;
	let asset = db.assets.get(id)?;
	if asset.issuer != *issuer {
		return Err(ChainError::AuthorityInsufficient(format!("{issuer} does not issue {symbol}")));
	}
	if asset.is_currency_locked() {
		return Err(ChainError::InvariantViolation("currency assets cannot be updated".into()));
	}
	db.assets.modify(id, |a| {
		a.market_fee_bps = market_fee_bps;
		a.flags = flags;
	})
}

pub fn update_asset_issuer(db: &mut ChainDb, issuer: &AccountName, symbol: &AssetSymbol, new_issuer: &AccountName) -> ChainResult<()> {
	let id = db
		.assets
		.find_by_index("by_symbol", symbol.as_str().as_bytes())
		.ok_or_else(|| ChainError::NotFound(symbol.to_string()))?
		.id;
	let asset = db.assets.get(id)?;
	if asset.issuer != *issuer {
		return Err(ChainError::AuthorityInsufficient(format!("{issuer} does not issue {symbol}")));
	}
	db.assets.modify(id, |a| a.issuer = new_issuer.clone())
}

pub fn issue_asset(db: &mut ChainDb, issuer: &AccountName, symbol: &AssetSymbol, recipient: &AccountName, amount: ShareAmount) -> ChainResult<()> {
	let asset_id = db
		.assets
		.find_by_index("by_symbol", symbol.as_str().as_bytes())
		.ok_or_else(|| ChainError::NotFound(symbol.to_string()))?
		.id;
	let asset = db.assets.get(asset_id)?;
	if asset.issuer != *issuer {
		return Err(ChainError::AuthorityInsufficient(format!("{issuer} does not issue {symbol}")));
	}
	let max_supply = asset.max_supply;

	let dynamic_id = db
		.asset_dynamic_data
		.find_by_index("by_symbol", symbol.as_str().as_bytes())
		.ok_or_else(|| ChainError::NotFound(symbol.to_string()))?
		.id;
	let dynamic = db.asset_dynamic_data.get(dynamic_id)?;
	let new_total = dynamic.total_supply.checked_add(amount)?;
	if new_total.0 > max_supply.0 {
		return Err(ChainError::InvariantViolation(format!("issuing {amount} of {symbol} exceeds max supply")));
	}
	db.asset_dynamic_data.modify(dynamic_id, |d| {
		d.total_supply = new_total;
		d.liquid_supply = d.liquid_supply.checked_add(amount).unwrap_or(d.liquid_supply);
	})?;

	let balance_key = {
		let mut key = recipient.as_str().as_bytes().to_vec();
		key.push(0);
		key.extend(symbol.as_str().as_bytes());
		key
	};
	let balance_id = db.account_balances.find_by_index("by_owner_symbol", &balance_key).map(|b| b.id);
	let balance_id = match balance_id {
		Some(id) => id,
		None => {
			let recipient = recipient.clone();
			let symbol = symbol.clone();
			db.account_balances.create(|id| {
				let mut b = crate::entities::AccountBalance::new(recipient, symbol);
				b.id = id;
				b
			})?.id
		},
	};
	db.account_balances.modify(balance_id, |b| {
		b.liquid = b.liquid.checked_add(amount).unwrap_or(b.liquid);
	})
}

pub fn reserve_asset(db: &mut ChainDb, payer: &AccountName, symbol: &AssetSymbol, amount: ShareAmount) -> ChainResult<()> {
	let balance_key = {
		let mut key = payer.as_str().as_bytes().to_vec();
		key.push(0);
		key.extend(symbol.as_str().as_bytes());
		key
	};
	let balance_id = db
		.account_balances
		.find_by_index("by_owner_symbol", &balance_key)
		.ok_or_else(|| ChainError::InsufficientBalance(format!("{payer} has no {symbol} balance")))?
		.id;
	let balance = db.account_balances.get(balance_id)?;
	if balance.liquid.0 < amount.0 {
		return Err(ChainError::InsufficientBalance(format!("{payer} lacks {amount} {symbol}")));
	}
	db.account_balances.modify(balance_id, |b| {
		b.liquid = b.liquid.checked_sub(amount).unwrap_or(b.liquid);
	})?;

	let dynamic_id = db
		.asset_dynamic_data
		.find_by_index("by_symbol", symbol.as_str().as_bytes())
		.ok_or_else(|| ChainError::NotFound(symbol.to_string()))?
		.id;
	db.asset_dynamic_data.modify(dynamic_id, |d| {
		d.total_supply = d.total_supply.checked_sub(amount).unwrap_or(d.total_supply);
		d.liquid_supply = d.liquid_supply.checked_sub(amount).unwrap_or(d.liquid_supply);
	})
}
