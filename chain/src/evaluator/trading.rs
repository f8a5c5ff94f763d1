//! Order-book, liquidity-pool, credit-pool, and settlement evaluators
//! (spec §4.6).

use chain_amm::{CreditPool, LiquidityPool};
use chain_common::error::{ChainError, ChainResult};
use chain_common::{AccountName, AssetAmount, AssetSymbol, Price, ShareAmount, TimePoint};

use crate::db::ChainDb;
use crate::entities::{AccountBalance, AuctionOrder, CallOrder, ForceSettlement, LimitOrder, MarginOrder, OptionKind, OptionOrder, PriceFeed};

fn balance_key(owner: &AccountName, symbol: &AssetSymbol) -> Vec<u8> {
	let mut key = owner.as_str().as_bytes().to_vec();
	key.push(0);
	key.extend(symbol.as_str().as_bytes());
	key
}

pub(crate) fn debit_liquid(db: &mut ChainDb, owner: &AccountName, amount: &AssetAmount) -> ChainResult<()> {
	let id = db
		.account_balances
		.find_by_index("by_owner_symbol", &balance_key(owner, &amount.symbol))
		.ok_or_else(|| ChainError::InsufficientBalance(format!("{owner} has no {} balance", amount.symbol)))?
		.id;
	let balance = db.account_balances.get(id)?;
	if balance.liquid.0 < amount.amount.0 {
		return Err(ChainError::InsufficientBalance(format!("{owner} lacks {amount}")));
	}
	db.account_balances.modify(id, |b| {
		b.liquid = b.liquid.checked_sub(amount.amount).unwrap_or(b.liquid);
	})
}

pub(crate) fn credit_liquid(db: &mut ChainDb, owner: &AccountName, amount: &AssetAmount) -> ChainResult<()> {
	let existing = db.account_balances.find_by_index("by_owner_symbol", &balance_key(owner, &amount.symbol)).map(|b| b.id);
	let id = match existing {
		Some(id) => id,
		None => {
			let owner = owner.clone();
			let symbol = amount.symbol.clone();
			db.account_balances
				.create(|id| {
					let mut b = AccountBalance::new(owner, symbol);
					b.id = id;
					b
				})?
				.id
		},
	};
	db.account_balances.modify(id, |b| {
		b.liquid = b.liquid.checked_add(amount.amount).unwrap_or(b.liquid);
	})
}

/// Places a limit order, reserving the seller's balance, then attempts to
/// match it against the opposite side of the book (spec §4.6.1).
pub fn place_limit_order(
	db: &mut ChainDb,
	seller: &AccountName,
	amount_for_sale: &AssetAmount,
	sell_price: &Price,
	expiration: TimePoint,
) -> ChainResult<u64> {
	debit_liquid(db, seller, amount_for_sale)?;
	let order_id = db
		.limit_orders
		.create(|id| LimitOrder {
			id,
			order_uuid: u128::from(id),
			seller: seller.clone(),
			amount_for_sale: amount_for_sale.clone(),
			sell_price: sell_price.clone(),
			interface: None,
			expiration,
		})?
		.id;
	match_limit_order(db, order_id)?;
	Ok(order_id)
}

/// Matches the taker order against every crossable maker on the opposite
/// side of the same market, oldest order first, filling each at the
/// maker's own price until either side is exhausted (spec §4.6.1 "Match
/// rule").
fn match_limit_order(db: &mut ChainDb, taker_id: u64) -> ChainResult<()> {
	let taker = db.limit_orders.get(taker_id)?.clone();
	let (base, quote) = taker.sell_price.symbols();
	let (base, quote) = (base.clone(), quote.clone());

	let maker_ids: Vec<u64> = db
		.limit_orders
		.iter()
		.filter(|(&id, o)| id != taker_id && o.amount_for_sale.symbol == quote && o.sell_price.symbols() == (&quote, &base))
		.map(|(&id, _)| id)
		.collect();

	let mut remaining = taker.amount_for_sale.amount;
	for maker_id in maker_ids {
		if remaining.0 <= 0 {
			break;
		}
		let maker = db.limit_orders.get(maker_id)?.clone();
		if !taker.sell_price.inverted().cross_compare_ge(&maker.sell_price)? {
			continue;
		}

		// `maker_capacity` is how much of `base` the maker's remaining
		// `amount_for_sale` (in `quote`) can buy at the maker's own price.
		let maker_capacity = maker.sell_price.multiply(&maker.amount_for_sale)?;
		let fill_base = ShareAmount(remaining.0.min(maker_capacity.amount.0));
		if fill_base.0 <= 0 {
			continue;
		}
		let fill_base_asset = AssetAmount { amount: fill_base, symbol: base.clone() };
		let fill_quote_asset = maker.sell_price.inverted().multiply(&fill_base_asset)?;

		db.limit_orders.modify(maker_id, |m| {
			m.amount_for_sale.amount = m.amount_for_sale.amount.checked_sub(fill_quote_asset.amount).unwrap_or(ShareAmount::ZERO);
		})?;
		if db.limit_orders.get(maker_id)?.amount_for_sale.amount.0 <= 0 {
			db.limit_orders.remove(maker_id)?;
		}

		credit_liquid(db, &taker.seller, &fill_quote_asset)?;
		credit_liquid(db, &maker.seller, &fill_base_asset)?;

		remaining = remaining.checked_sub(fill_base).unwrap_or(ShareAmount::ZERO);
	}

	if remaining.0 <= 0 {
		db.limit_orders.remove(taker_id)?;
	} else {
		db.limit_orders.modify(taker_id, |t| t.amount_for_sale.amount = remaining)?;
	}
	Ok(())
}

pub fn cancel_limit_order(db: &mut ChainDb, owner: &AccountName, order_id: u64) -> ChainResult<()> {
	let order = db.limit_orders.get(order_id)?;
	if order.seller != *owner {
		return Err(ChainError::AuthorityInsufficient(format!("{owner} does not own order #{order_id}")));
	}
	let refund = order.amount_for_sale.clone();
	db.limit_orders.remove(order_id)?;
	credit_liquid(db, owner, &refund)
}

pub fn lend_credit_pool(db: &mut ChainDb, lender: &AccountName, base_symbol: &AssetSymbol, amount: ShareAmount) -> ChainResult<()> {
	let pool_id = db
		.credit_pools
		.find_by_index("by_base", base_symbol.as_str().as_bytes())
		.ok_or_else(|| ChainError::NotFound(format!("credit pool for {base_symbol}")))?
		.id;
	debit_liquid(db, lender, &AssetAmount { amount, symbol: base_symbol.clone() })?;

	let credit_symbol = db.credit_pools.get(pool_id)?.credit_symbol.clone();
	let minted = {
		let object = db.credit_pools.get(pool_id)?;
		let mut pool: CreditPool = object.pool.clone();
		let minted = pool.lend(amount.0.max(0) as u64)?;
		db.credit_pools.modify(pool_id, |o| o.pool = pool.clone())?;
		minted
	};
	credit_liquid(db, lender, &AssetAmount { amount: ShareAmount(minted as i64), symbol: credit_symbol })
}

pub fn redeem_credit_pool(db: &mut ChainDb, redeemer: &AccountName, base_symbol: &AssetSymbol, shares: ShareAmount) -> ChainResult<()> {
	let pool_id = db
		.credit_pools
		.find_by_index("by_base", base_symbol.as_str().as_bytes())
		.ok_or_else(|| ChainError::NotFound(format!("credit pool for {base_symbol}")))?
		.id;
	let credit_symbol = db.credit_pools.get(pool_id)?.credit_symbol.clone();
	debit_liquid(db, redeemer, &AssetAmount { amount: shares, symbol: credit_symbol })?;

	let base_out = {
		let object = db.credit_pools.get(pool_id)?;
		let mut pool: CreditPool = object.pool.clone();
		let base_out = pool.redeem(shares.0.max(0) as u64)?;
		db.credit_pools.modify(pool_id, |o| o.pool = pool.clone())?;
		base_out
	};
	credit_liquid(db, redeemer, &AssetAmount { amount: ShareAmount(base_out as i64), symbol: base_symbol.clone() })
}

pub(crate) fn pair_key(a: &AssetSymbol, b: &AssetSymbol) -> Vec<u8> {
	let mut key = a.as_str().as_bytes().to_vec();
	key.push(0);
	key.extend(b.as_str().as_bytes());
	key
}

/// Looks a pool up under either symbol order (pools are stored under the
/// order they were created in) and reports whether `amount_in` is the
/// pool's `symbol_a` or `symbol_b` side.
pub(crate) fn find_pool(db: &ChainDb, symbol_a: &AssetSymbol, symbol_b: &AssetSymbol) -> ChainResult<(u64, bool)> {
	if let Some(pool) = db.liquidity_pools.find_by_index("by_pair", &pair_key(symbol_a, symbol_b)) {
		return Ok((pool.id, true));
	}
	if let Some(pool) = db.liquidity_pools.find_by_index("by_pair", &pair_key(symbol_b, symbol_a)) {
		return Ok((pool.id, false));
	}
	Err(ChainError::NotFound(format!("liquidity pool {symbol_a}/{symbol_b}")))
}

pub fn swap_liquidity_pool(
	db: &mut ChainDb,
	trader: &AccountName,
	symbol_b: &AssetSymbol,
	amount_in: &AssetAmount,
	minimum_out: ShareAmount,
) -> ChainResult<()> {
	let (pool_id, a_side) = find_pool(db, &amount_in.symbol, symbol_b)?;
	debit_liquid(db, trader, amount_in)?;

	let (out_symbol, result) = {
		let object = db.liquidity_pools.get(pool_id)?;
		let mut pool: LiquidityPool = object.pool.clone();
		let result = if a_side { pool.swap_a_for_b(amount_in.amount.0.max(0) as u64)? } else { pool.swap_b_for_a(amount_in.amount.0.max(0) as u64)? };
		let out_symbol = if a_side { object.symbol_b.clone() } else { object.symbol_a.clone() };
		db.liquidity_pools.modify(pool_id, |o| o.pool = pool.clone())?;
		(out_symbol, result)
	};
	if (result.amount_out as i64) < minimum_out.0 {
		return Err(ChainError::InvariantViolation("swap output below requested minimum".into()));
	}
	credit_liquid(db, trader, &AssetAmount { amount: ShareAmount(result.amount_out as i64), symbol: out_symbol })
}

/// Deposits `amount_a`/`amount_b` into an existing pool in its current
/// ratio, minting LP shares to the provider (spec §4.6.5).
pub fn add_liquidity(db: &mut ChainDb, provider: &AccountName, amount_a: &AssetAmount, amount_b: &AssetAmount, minimum_shares: ShareAmount) -> ChainResult<()> {
	let (pool_id, a_is_first) = find_pool(db, &amount_a.symbol, &amount_b.symbol)?;
	debit_liquid(db, provider, amount_a)?;
	debit_liquid(db, provider, amount_b)?;

	let (minted, liquidity_asset) = {
		let object = db.liquidity_pools.get(pool_id)?;
		let mut pool: LiquidityPool = object.pool.clone();
		let (first, second) = if a_is_first { (amount_a, amount_b) } else { (amount_b, amount_a) };
		let minted = pool.add_liquidity(first.amount.0.max(0) as u64, second.amount.0.max(0) as u64)?;
		let liquidity_asset = object.liquidity_asset.clone();
		db.liquidity_pools.modify(pool_id, |o| o.pool = pool.clone())?;
		(minted, liquidity_asset)
	};
	if (minted as i64) < minimum_shares.0 {
		return Err(ChainError::InvariantViolation("liquidity deposit minted fewer shares than the requested minimum".into()));
	}
	credit_liquid(db, provider, &AssetAmount { amount: ShareAmount(minted as i64), symbol: liquidity_asset })
}

/// Burns `shares` of a pool's LP asset, returning the proportional share of
/// both sides to the provider (spec §4.6.5).
pub fn remove_liquidity(db: &mut ChainDb, provider: &AccountName, liquidity_asset: &AssetSymbol, shares: ShareAmount) -> ChainResult<()> {
	let pool_id = db
		.liquidity_pools
		.iter()
		.find(|(_, p)| p.liquidity_asset == *liquidity_asset)
		.map(|(&id, _)| id)
		.ok_or_else(|| ChainError::NotFound(format!("liquidity pool for {liquidity_asset}")))?;
	debit_liquid(db, provider, &AssetAmount { amount: shares, symbol: liquidity_asset.clone() })?;

	let (amount_a, amount_b, symbol_a, symbol_b) = {
		let object = db.liquidity_pools.get(pool_id)?;
		let mut pool: LiquidityPool = object.pool.clone();
		let (a, b) = pool.remove_liquidity(shares.0.max(0) as u64)?;
		let (symbol_a, symbol_b) = (object.symbol_a.clone(), object.symbol_b.clone());
		db.liquidity_pools.modify(pool_id, |o| o.pool = pool.clone())?;
		(a, b, symbol_a, symbol_b)
	};
	credit_liquid(db, provider, &AssetAmount { amount: ShareAmount(amount_a as i64), symbol: symbol_a })?;
	credit_liquid(db, provider, &AssetAmount { amount: ShareAmount(amount_b as i64), symbol: symbol_b })
}

pub fn open_call_order(
	db: &mut ChainDb,
	borrower: &AccountName,
	collateral: &AssetAmount,
	debt: &AssetAmount,
	target_collateralization_ratio_bps: Option<u64>,
) -> ChainResult<()> {
	debit_liquid(db, borrower, collateral)?;
	if debt.amount.0 <= 0 {
		return Err(ChainError::InvariantViolation("call order debt must be positive".into()));
	}
	let call_price = Price::new(debt.clone(), collateral.clone());
	db.call_orders.create(|id| CallOrder {
		id,
		borrower: borrower.clone(),
		collateral: collateral.clone(),
		debt: debt.clone(),
		call_price,
		target_collateralization_ratio_bps,
	})?;
	credit_liquid(db, borrower, debt)
}

/// Opens a leveraged position: `collateral` is locked, `debt` is borrowed
/// from the position asset's credit pool, and the proceeds are swapped
/// through that pool's paired liquidity pool into `debt_balance.symbol`'s
/// other side to establish `position`/`position_balance` (spec §4.6.6
/// "Margin trading").
#[allow(clippy::too_many_arguments)]
pub fn open_margin_order(
	db: &mut ChainDb,
	owner: &AccountName,
	collateral: &AssetAmount,
	debt_symbol: &AssetSymbol,
	debt_amount: ShareAmount,
	position: &AssetSymbol,
	sell_price: Price,
	stop_loss_price: Option<Price>,
	take_profit_price: Option<Price>,
	now: TimePoint,
) -> ChainResult<u64> {
	debit_liquid(db, owner, collateral)?;

	let pool_id = db
		.credit_pools
		.find_by_index("by_base", debt_symbol.as_str().as_bytes())
		.ok_or_else(|| ChainError::NotFound(format!("credit pool for {debt_symbol}")))?
		.id;
	{
		let object = db.credit_pools.get(pool_id)?;
		let mut pool: CreditPool = object.pool.clone();
		pool.borrow(debt_amount.0.max(0) as u64)?;
		db.credit_pools.modify(pool_id, |o| o.pool = pool.clone())?;
	}
	let debt = AssetAmount { amount: debt_amount, symbol: debt_symbol.clone() };

	let (pool_id, a_side) = find_pool(db, debt_symbol, position)?;
	let (position_balance, result) = {
		let object = db.liquidity_pools.get(pool_id)?;
		let mut pool: LiquidityPool = object.pool.clone();
		let result = if a_side { pool.swap_a_for_b(debt_amount.0.max(0) as u64)? } else { pool.swap_b_for_a(debt_amount.0.max(0) as u64)? };
		db.liquidity_pools.modify(pool_id, |o| o.pool = pool.clone())?;
		(AssetAmount { amount: ShareAmount(result.amount_out as i64), symbol: position.clone() }, result)
	};
	let _ = result;

	let collateralization_ratio_bps = if debt_amount.0 > 0 {
		((collateral.amount.0 as i128) * 10_000 / debt_amount.0 as i128) as u64
	} else {
		u64::MAX
	};

	Ok(db
		.margin_orders
		.create(|id| MarginOrder {
			id,
			order_uuid: u128::from(id),
			owner: owner.clone(),
			sell_price,
			collateral: collateral.clone(),
			debt: debt.clone(),
			debt_balance: debt,
			position: position.clone(),
			position_balance,
			collateralization_ratio_bps,
			last_interest_time: now,
			stop_loss_price,
			take_profit_price,
			limit_stop_loss_price: None,
			limit_take_profit_price: None,
			liquidating: false,
		})?
		.id)
}

/// Unwinds a margin position: `position_balance` is swapped back through the
/// same pool into `debt_balance.symbol`, the credit pool is repaid (the
/// interest leg is zero because periodic accrual already capitalized it into
/// `borrowed_balance`, see `jobs::accrue_margin_interest`), and whatever
/// remains is returned to the owner alongside their original collateral.
pub fn close_margin_order(db: &mut ChainDb, owner: &AccountName, order_id: u64) -> ChainResult<()> {
	let order = db.margin_orders.get(order_id)?;
	if order.owner != *owner {
		return Err(ChainError::AuthorityInsufficient(format!("{owner} does not own margin order {order_id}")));
	}

	let (pool_id, a_side) = find_pool(db, &order.position, &order.debt_balance.symbol)?;
	let proceeds = {
		let object = db.liquidity_pools.get(pool_id)?;
		let mut pool: LiquidityPool = object.pool.clone();
		let result = if a_side {
			pool.swap_a_for_b(order.position_balance.amount.0.max(0) as u64)?
		} else {
			pool.swap_b_for_a(order.position_balance.amount.0.max(0) as u64)?
		};
		db.liquidity_pools.modify(pool_id, |o| o.pool = pool.clone())?;
		result.amount_out
	};

	let owed = order.debt_balance.amount.0.max(0) as u64;
	let credit_pool_id = db
		.credit_pools
		.find_by_index("by_base", order.debt_balance.symbol.as_str().as_bytes())
		.ok_or_else(|| ChainError::NotFound(format!("credit pool for {}", order.debt_balance.symbol)))?
		.id;
	{
		let object = db.credit_pools.get(credit_pool_id)?;
		let mut pool: CreditPool = object.pool.clone();
		pool.repay(owed.min(proceeds), 0)?;
		db.credit_pools.modify(credit_pool_id, |o| o.pool = pool.clone())?;
	}

	if proceeds > owed {
		credit_liquid(db, owner, &AssetAmount { amount: ShareAmount((proceeds - owed) as i64), symbol: order.debt_balance.symbol.clone() })?;
	}
	credit_liquid(db, owner, &order.collateral)?;
	db.margin_orders.remove(order_id)?;
	Ok(())
}

/// Places a margin call's liquidating sale of `amount_to_sell` at or above
/// `limit_close_price`; matching against paired liquidity pools happens in
/// the periodic auction-clearing job, not here (spec §4.6.6 "Auctions").
pub fn place_auction_order(db: &mut ChainDb, owner: &AccountName, amount_to_sell: &AssetAmount, limit_close_price: Price, expiration: TimePoint) -> ChainResult<u64> {
	debit_liquid(db, owner, amount_to_sell)?;
	Ok(db
		.auction_orders
		.create(|id| AuctionOrder {
			id,
			order_uuid: u128::from(id),
			owner: owner.clone(),
			amount_to_sell: amount_to_sell.clone(),
			limit_close_price,
			expiration,
		})?
		.id)
}

#[allow(clippy::too_many_arguments)]
pub fn publish_price_feed(
	db: &mut ChainDb,
	producer: &AccountName,
	symbol: &AssetSymbol,
	settlement_price_num: i64,
	settlement_price_den: i64,
	maintenance_collateral_ratio_bps: u64,
	maximum_short_squeeze_ratio_bps: u64,
	now: TimePoint,
) -> ChainResult<()> {
	let bitasset_id = db
		.bitassets
		.find_by_index("by_symbol", symbol.as_str().as_bytes())
		.ok_or_else(|| ChainError::NotFound(format!("bitasset {symbol}")))?
		.id;
	db.bitassets.modify(bitasset_id, |b| {
		b.feeds.retain(|f| f.producer != *producer);
		b.feeds.push(PriceFeed {
			producer: producer.clone(),
			settlement_price_num,
			settlement_price_den,
			maintenance_collateral_ratio_bps,
			maximum_short_squeeze_ratio_bps,
			core_exchange_rate_num: settlement_price_num,
			core_exchange_rate_den: settlement_price_den,
			published: now,
		});
	})
}

pub fn force_settle(db: &mut ChainDb, owner: &AccountName, balance: &AssetAmount, settlement_due: TimePoint) -> ChainResult<()> {
	debit_liquid(db, owner, balance)?;
	db.force_settlements.create(|id| ForceSettlement { id, owner: owner.clone(), balance: balance.clone(), settlement_due })?;
	Ok(())
}

/// Marks a bitasset globally settled at the triggering price: every open
/// call order on it is closed out and its collateral folded into the
/// settlement fund (spec §4.6.7 "Global settlement").
pub fn global_settle(db: &mut ChainDb, issuer: &AccountName, symbol: &AssetSymbol, settlement_price_num: i64, settlement_price_den: i64) -> ChainResult<()> {
	let asset_id = db
		.assets
		.find_by_index("by_symbol", symbol.as_str().as_bytes())
		.ok_or_else(|| ChainError::NotFound(symbol.to_string()))?
		.id;
	if db.assets.get(asset_id)?.issuer != *issuer {
		return Err(ChainError::AuthorityInsufficient(format!("{issuer} does not issue {symbol}")));
	}
	settle_bitasset(db, symbol, settlement_price_num, settlement_price_den)
}

/// Core of global settlement, shared by the issuer-invoked [`global_settle`]
/// and the automatic black-swan trigger run from the periodic margin-call
/// check (spec §4.6.7).
pub(crate) fn settle_bitasset(db: &mut ChainDb, symbol: &AssetSymbol, settlement_price_num: i64, settlement_price_den: i64) -> ChainResult<()> {
	let bitasset_id = db
		.bitassets
		.find_by_index("by_symbol", symbol.as_str().as_bytes())
		.ok_or_else(|| ChainError::NotFound(format!("bitasset {symbol}")))?
		.id;

	let call_order_ids: Vec<u64> = db.call_orders.iter().filter(|(_, c)| c.debt.symbol == *symbol).map(|(&id, _)| id).collect();
	let mut fund = ShareAmount::ZERO;
	let mut total_debt = ShareAmount::ZERO;
	for id in call_order_ids {
		let order = db.call_orders.remove(id)?;
		fund = fund.checked_add(order.collateral.amount)?;
		total_debt = total_debt.checked_add(order.debt.amount)?;
	}

	db.bitassets.modify(bitasset_id, |b| {
		b.has_settlement = true;
		b.settlement_price_num = settlement_price_num;
		b.settlement_price_den = settlement_price_den;
		b.settlement_fund = fund;
		b.total_debt_at_settlement = total_debt;
	})
}

/// Reads a bitasset's current feed price, gated by
/// [`crate::constants::HARDFORK_0_1_PRICE_GETTER_FIX`]: before the fork, a
/// missing feed silently fell through to a zero price (matching the
/// original implementation's bug); after it, a missing feed correctly
/// reports `None` so callers skip the bitasset instead of margin-calling
/// against a bogus price (spec §9 design note 1).
pub(crate) fn effective_settlement_price(db: &ChainDb, bitasset: &crate::entities::BitassetData) -> Option<Price> {
	match &bitasset.effective_feed {
		Some(feed) => Some(Price::new(
			AssetAmount { amount: ShareAmount(feed.settlement_price_num), symbol: bitasset.symbol.clone() },
			AssetAmount { amount: ShareAmount(feed.settlement_price_den), symbol: bitasset.backing_symbol.clone() },
		)),
		None if db.hardfork_property.is_active(crate::constants::HARDFORK_0_1_PRICE_GETTER_FIX) => None,
		None => Some(Price::new(
			AssetAmount { amount: ShareAmount(0), symbol: bitasset.symbol.clone() },
			AssetAmount { amount: ShareAmount(1), symbol: bitasset.backing_symbol.clone() },
		)),
	}
}

/// Force-closes every call order on `symbol` whose collateral, valued at
/// `feed_price`, has fallen below `maintenance_collateral_ratio_bps` of its
/// debt; any collateral left over after covering the debt at market price is
/// returned to the borrower. If the bitasset's aggregate collateral can no
/// longer cover its aggregate debt even before the per-order check, the
/// whole bitasset is folded into global settlement instead (spec §4.6.7
/// "Margin calls", "Black swan").
pub fn check_margin_calls(db: &mut ChainDb) -> ChainResult<()> {
	let bitasset_ids: Vec<u64> = db.bitassets.iter().map(|(id, _)| *id).collect();
	for bitasset_id in bitasset_ids {
		let bitasset = db.bitassets.get(bitasset_id)?.clone();
		if bitasset.has_settlement {
			continue;
		}
		let Some(feed_price) = effective_settlement_price(db, &bitasset) else { continue };
		let maintenance_ratio_bps = bitasset
			.effective_feed
			.as_ref()
			.map(|f| f.maintenance_collateral_ratio_bps)
			.unwrap_or(crate::constants::DEFAULT_MAINTENANCE_COLLATERAL_RATIO_BPS);

		let call_ids: Vec<u64> = db.call_orders.iter().filter(|(_, c)| c.debt.symbol == bitasset.symbol).map(|(&id, _)| id).collect();
		if call_ids.is_empty() {
			continue;
		}

		let mut total_collateral = ShareAmount::ZERO;
		let mut total_debt = ShareAmount::ZERO;
		for &id in &call_ids {
			let order = db.call_orders.get(id)?;
			total_collateral = total_collateral.checked_add(order.collateral.amount).unwrap_or(total_collateral);
			total_debt = total_debt.checked_add(order.debt.amount).unwrap_or(total_debt);
		}
		let collateral_symbol = db.call_orders.get(call_ids[0])?.collateral.symbol.clone();
		if total_debt.0 > 0 {
			if let Ok(collateral_value) = feed_price.multiply(&AssetAmount { amount: total_collateral, symbol: collateral_symbol }) {
				if collateral_value.amount.0 < total_debt.0 {
					settle_bitasset(db, &bitasset.symbol, feed_price.base.amount.0, feed_price.quote.amount.0)?;
					continue;
				}
			}
		}

		for id in call_ids {
			let order = db.call_orders.get(id)?.clone();
			let Ok(market_value) = feed_price.multiply_and_round_up(&order.debt) else { continue };
			let required_collateral = (market_value.amount.0 as i128) * maintenance_ratio_bps as i128 / 10_000;
			if (order.collateral.amount.0 as i128) >= required_collateral {
				continue;
			}
			let refund = ShareAmount((order.collateral.amount.0 - market_value.amount.0).max(0));
			if refund.0 > 0 {
				credit_liquid(db, &order.borrower, &AssetAmount { amount: refund, symbol: order.collateral.symbol.clone() })?;
			}
			db.call_orders.remove(id)?;
		}
	}
	Ok(())
}

/// Opens a covered option position: the writer locks `underlying_amount`
/// as collateral and receives `position_debt`, the premium-equivalent
/// obligation computed at `strike_price` (spec §4.6.4-adjacent "Options").
pub fn open_option_order(
	db: &mut ChainDb,
	owner: &AccountName,
	underlying_amount: &AssetAmount,
	strike_price: &Price,
	kind: OptionKind,
	expiration: TimePoint,
) -> ChainResult<u64> {
	debit_liquid(db, owner, underlying_amount)?;
	let position_debt = strike_price.multiply(underlying_amount)?;
	let id = db
		.option_orders
		.create(|id| OptionOrder {
			id,
			order_uuid: u128::from(id),
			owner: owner.clone(),
			underlying_amount: underlying_amount.clone(),
			position_debt: position_debt.clone(),
			strike_price: strike_price.clone(),
			kind,
			expiration,
		})?
		.id;
	credit_liquid(db, owner, &position_debt)?;
	Ok(id)
}

#[cfg(test)]
mod tests {
	use super::*;
	use chain_common::{AccountName, AssetSymbol, TimePoint};

	fn name(s: &str) -> AccountName {
		AccountName::new(s).unwrap()
	}

	fn symbol(s: &str) -> AssetSymbol {
		AssetSymbol::new(s).unwrap()
	}

	fn seed_balance(db: &mut ChainDb, owner: &AccountName, symbol: &AssetSymbol, liquid: i64) {
		db.account_balances
			.create(|id| {
				let mut b = AccountBalance::new(owner.clone(), symbol.clone());
				b.id = id;
				b.liquid = ShareAmount(liquid);
				b
			})
			.unwrap();
	}

	#[test]
	fn crossing_limit_orders_fill_at_the_makers_price() {
		let mut db = ChainDb::new(TimePoint(0));
		let (coin, usd) = (symbol("COIN"), symbol("USD"));
		seed_balance(&mut db, &name("alice"), &coin, 100);
		seed_balance(&mut db, &name("bob"), &usd, 100);

		// alice sells 100 COIN for 50 USD (price: 2 COIN/USD)
		place_limit_order(
			&mut db,
			&name("alice"),
			&AssetAmount::new(100, coin.clone()),
			&Price::new(AssetAmount::new(100, coin.clone()), AssetAmount::new(50, usd.clone())),
			TimePoint(1_000),
		)
		.unwrap();
		// bob sells 50 USD for 100 COIN — fully crosses alice's order.
		place_limit_order(
			&mut db,
			&name("bob"),
			&AssetAmount::new(50, usd.clone()),
			&Price::new(AssetAmount::new(50, usd.clone()), AssetAmount::new(100, coin.clone())),
			TimePoint(1_000),
		)
		.unwrap();

		assert_eq!(db.limit_orders.len(), 0);
		let alice_usd = db.account_balances.find_by_index("by_owner_symbol", &balance_key(&name("alice"), &usd)).unwrap();
		assert_eq!(alice_usd.liquid.0, 50);
		let bob_coin = db.account_balances.find_by_index("by_owner_symbol", &balance_key(&name("bob"), &coin)).unwrap();
		assert_eq!(bob_coin.liquid.0, 100);
	}

	#[test]
	fn cancel_limit_order_refunds_the_seller() {
		let mut db = ChainDb::new(TimePoint(0));
		let coin = symbol("COIN");
		seed_balance(&mut db, &name("alice"), &coin, 100);
		let id = place_limit_order(
			&mut db,
			&name("alice"),
			&AssetAmount::new(100, coin.clone()),
			&Price::new(AssetAmount::new(100, coin.clone()), AssetAmount::new(50, symbol("USD"))),
			TimePoint(1_000),
		)
		.unwrap();

		cancel_limit_order(&mut db, &name("alice"), id).unwrap();
		let balance = db.account_balances.find_by_index("by_owner_symbol", &balance_key(&name("alice"), &coin)).unwrap();
		assert_eq!(balance.liquid.0, 100);
	}

	#[test]
	fn lend_and_redeem_credit_pool_round_trips() {
		let mut db = ChainDb::new(TimePoint(0));
		let coin = symbol("COIN");
		crate::evaluator::account::create_account(
			&mut db,
			&name("alice"),
			&name("alice"),
			dummy_key(),
			dummy_key(),
			dummy_key(),
			dummy_key(),
			TimePoint(0),
		)
		.unwrap();
		seed_balance(&mut db, &name("alice"), &symbol("USD"), 10_000);
		crate::evaluator::asset::create_asset(
			&mut db,
			&name("alice"),
			&coin,
			crate::entities::AssetKind::Standard,
			ShareAmount(1_000_000),
			crate::entities::AssetFlags::empty(),
			0,
			ShareAmount(10_000),
			ShareAmount(10_000),
			ShareAmount(1_000),
			TimePoint(0),
		)
		.unwrap();
		seed_balance(&mut db, &name("bob"), &coin, 500);

		lend_credit_pool(&mut db, &name("bob"), &coin, ShareAmount(500)).unwrap();
		let credit_symbol = AssetSymbol::credit_pool_asset(&coin);
		let minted = db.account_balances.find_by_index("by_owner_symbol", &balance_key(&name("bob"), &credit_symbol)).unwrap().liquid;
		assert!(minted.0 > 0);

		redeem_credit_pool(&mut db, &name("bob"), &coin, minted).unwrap();
		let coin_balance = db.account_balances.find_by_index("by_owner_symbol", &balance_key(&name("bob"), &coin)).unwrap().liquid;
		assert_eq!(coin_balance.0, 500);
	}

	fn dummy_key() -> chain_common::crypto::PublicKey {
		use secp256k1::{rand::rngs::OsRng, Secp256k1};
		let secp = Secp256k1::new();
		let (_, public) = secp.generate_keypair(&mut OsRng);
		chain_common::crypto::PublicKey(public)
	}
}
