//! Periodic maintenance jobs run once per block or once per round, as
//! distinct from operation evaluators which run once per transaction
//! (spec §4.7).

use chain_amm::CreditPool;
use chain_common::error::ChainResult;
use chain_common::{AccountName, AssetSymbol, Price, ShareAmount, TimePoint};

use crate::consensus::retarget;
use crate::db::ChainDb;
use crate::entities::ProducerKind;
use crate::evaluator::trading::credit_liquid;

/// Removes every delegation whose `expiration` has passed, returning the
/// stake to the delegator's liquid balance (spec §4.7, "expired delegation
/// cleanup").
pub fn clear_expired_delegations(db: &mut ChainDb, now: TimePoint) -> ChainResult<u32> {
	let expired: Vec<u64> = db
		.delegations
		.iter()
		.filter(|(_, d)| d.expiration.map(|exp| exp <= now).unwrap_or(false))
		.map(|(id, _)| *id)
		.collect();
	for id in &expired {
		let delegation = db.delegations.remove(*id)?;
		let balance_id = db
			.account_balances
			.find_by_index(
				"by_owner_symbol",
				&{
					let mut key = delegation.delegator.as_str().as_bytes().to_vec();
					key.push(0);
					key.extend(delegation.symbol.as_str().as_bytes());
					key
				},
			)
			.map(|b| b.id);
		if let Some(balance_id) = balance_id {
			db.account_balances.modify(balance_id, |b| {
				b.delegated_out = b.delegated_out.checked_sub(delegation.amount).unwrap_or(b.delegated_out);
			})?;
		}
	}
	Ok(expired.len() as u32)
}

/// Cancels every force-settlement request, auction order, and limit order
/// whose expiration has passed (spec §4.7).
pub fn clear_expired_orders(db: &mut ChainDb, now: TimePoint) -> ChainResult<u32> {
	let mut cleared = 0u32;

	let expired_limits: Vec<u64> = db
		.limit_orders
		.iter()
		.filter(|(_, o)| o.expiration <= now)
		.map(|(id, _)| *id)
		.collect();
	for id in expired_limits {
		db.limit_orders.remove(id)?;
		cleared += 1;
	}

	let expired_auctions: Vec<u64> = db
		.auction_orders
		.iter()
		.filter(|(_, o)| o.expiration <= now)
		.map(|(id, _)| *id)
		.collect();
	for id in expired_auctions {
		db.auction_orders.remove(id)?;
		cleared += 1;
	}

	let expired_options: Vec<u64> = db
		.option_orders
		.iter()
		.filter(|(_, o)| o.expiration <= now)
		.map(|(id, _)| *id)
		.collect();
	for id in expired_options {
		db.option_orders.remove(id)?;
		cleared += 1;
	}

	Ok(cleared)
}

/// Releases every matured unstaking and savings-withdrawal installment into
/// its owner's liquid balance (spec §4.5 "Unstake", "Transfer from
/// savings").
pub fn release_matured_transfers(db: &mut ChainDb, now: TimePoint) -> ChainResult<()> {
	let ids: Vec<u64> = db.account_balances.iter().map(|(id, _)| *id).collect();
	for id in ids {
		db.account_balances.modify(id, |b| {
			let (matured, pending): (Vec<_>, Vec<_>) = b.unstaking_queue.drain(..).partition(|(_, release)| *release <= now);
			b.unstaking_queue = pending;
			for (amount, _) in matured {
				b.liquid = b.liquid.checked_add(amount).unwrap_or(b.liquid);
			}

			let (matured, pending): (Vec<_>, Vec<_>) = b.savings_withdrawal_queue.drain(..).partition(|(_, release)| *release <= now);
			b.savings_withdrawal_queue = pending;
			for (amount, _) in matured {
				b.liquid = b.liquid.checked_add(amount).unwrap_or(b.liquid);
			}
		})?;
	}
	Ok(())
}

/// Accrues interest on every open margin order since its
/// `last_interest_time`, at its credit pool's current `borrow_rate_bps`
/// (fixed plus utilization-scaled variable rate), and capitalizes the same
/// amount into that pool's `borrowed_balance` via `accrue_interest` so the
/// pool's claim grows in lockstep with the order's debt (spec §4.6.2). Since
/// the interest is capitalized here, closing the order later only needs to
/// repay the already-grown `debt_balance` with zero additional interest
/// (see `evaluator::trading::close_margin_order`).
pub fn accrue_margin_interest(db: &mut ChainDb, now: TimePoint) -> ChainResult<()> {
	let ids: Vec<u64> = db.margin_orders.iter().map(|(id, _)| *id).collect();
	for id in ids {
		let debt_symbol = db.margin_orders.get(id)?.debt_balance.symbol.clone();
		let Some(pool_row) = db.credit_pools.find_by_index("by_base", debt_symbol.as_str().as_bytes()) else { continue };
		let pool_id = pool_row.id;
		let borrow_rate_bps = db.credit_pools.get(pool_id)?.pool.borrow_rate_bps() as u128;

		let order = db.margin_orders.get(id)?;
		let elapsed_secs = now.seconds_since(order.last_interest_time).max(0) as u128;
		let debt = order.debt_balance.amount.0.max(0) as u128;
		let interest = debt * borrow_rate_bps * elapsed_secs / (10_000 * 365 * 86_400);
		if interest == 0 {
			db.margin_orders.modify(id, |o| o.last_interest_time = now)?;
			continue;
		}

		{
			let object = db.credit_pools.get(pool_id)?;
			let mut pool: CreditPool = object.pool.clone();
			pool.accrue_interest(interest as u64)?;
			db.credit_pools.modify(pool_id, |o| o.pool = pool.clone())?;
		}
		db.margin_orders.modify(id, |o| {
			if let Ok(new_debt) = o.debt_balance.amount.checked_add(ShareAmount(interest as i64)) {
				o.debt_balance.amount = new_debt;
			}
			o.last_interest_time = now;
		})?;
	}
	Ok(())
}

/// Clears every open auction order whose paired liquidity pool currently
/// prices at or above `limit_close_price`, executing the sale at the pool's
/// spot price and crediting the proceeds to the order's owner (spec §4.6.6
/// "Auctions").
pub fn clear_auction_orders(db: &mut ChainDb) -> ChainResult<u32> {
	let ids: Vec<u64> = db.auction_orders.iter().map(|(id, _)| *id).collect();
	let mut cleared = 0u32;
	for id in ids {
		let order = db.auction_orders.get(id)?.clone();
		let sell_symbol = order.amount_to_sell.symbol.clone();
		let quote_symbol = if order.limit_close_price.base.symbol == sell_symbol {
			order.limit_close_price.quote.symbol.clone()
		} else {
			order.limit_close_price.base.symbol.clone()
		};
		let Ok((pool_id, a_side)) = crate::evaluator::trading::find_pool(db, &sell_symbol, &quote_symbol) else { continue };

		let spot = {
			let object = db.liquidity_pools.get(pool_id)?;
			let (reserve_sell, reserve_quote) = if a_side { (object.pool.balance_a, object.pool.balance_b) } else { (object.pool.balance_b, object.pool.balance_a) };
			Price::new(AssetAmountLike(sell_symbol.clone(), reserve_sell).into(), AssetAmountLike(quote_symbol.clone(), reserve_quote).into())
		};
		if !spot.cross_compare_ge(&order.limit_close_price).unwrap_or(false) {
			continue;
		}

		let (out_symbol, result) = {
			let object = db.liquidity_pools.get(pool_id)?;
			let mut pool = object.pool.clone();
			let result = if a_side {
				pool.swap_a_for_b(order.amount_to_sell.amount.0.max(0) as u64)?
			} else {
				pool.swap_b_for_a(order.amount_to_sell.amount.0.max(0) as u64)?
			};
			let out_symbol = if a_side { object.symbol_b.clone() } else { object.symbol_a.clone() };
			db.liquidity_pools.modify(pool_id, |o| o.pool = pool.clone())?;
			(out_symbol, result)
		};
		credit_liquid(db, &order.owner, &chain_common::AssetAmount { amount: ShareAmount(result.amount_out as i64), symbol: out_symbol })?;
		db.auction_orders.remove(id)?;
		cleared += 1;
	}
	Ok(cleared)
}

struct AssetAmountLike(AssetSymbol, u64);
impl From<AssetAmountLike> for chain_common::AssetAmount {
	fn from(v: AssetAmountLike) -> Self {
		chain_common::AssetAmount { amount: ShareAmount(v.1 as i64), symbol: v.0 }
	}
}

/// Pays out every comment whose `cashout_time` has passed (spec §4.7
/// "Content rewards").
pub fn content_cashout(db: &mut ChainDb, now: TimePoint) -> ChainResult<u32> {
	let due: Vec<u64> = db
		.comments
		.iter()
		.filter(|(_, c)| c.cashout_time.map(|t| t.0 <= now.0).unwrap_or(false))
		.map(|(id, _)| *id)
		.collect();
	for &id in &due {
		crate::evaluator::content::cashout_comment(db, id, now)?;
	}
	Ok(due.len() as u32)
}

/// Recomputes each bitasset's effective feed as the median of its live,
/// non-expired producer feeds (spec §4.6.8).
pub fn update_bitasset_feeds(db: &mut ChainDb, now: TimePoint, feed_lifetime_secs: i64, minimum_feeds: usize) -> ChainResult<()> {
	let ids: Vec<u64> = db.bitassets.iter().map(|(id, _)| *id).collect();
	for id in ids {
		db.bitassets.modify(id, |bitasset| {
			let mut live: Vec<_> = bitasset
				.feeds
				.iter()
				.filter(|f| now.seconds_since(f.published) <= feed_lifetime_secs)
				.cloned()
				.collect();
			if live.len() < minimum_feeds {
				bitasset.effective_feed = None;
				return;
			}
			live.sort_by_key(|f| f.settlement_price_num as i128 * f.settlement_price_den.max(1) as i128);
			bitasset.effective_feed = Some(live[live.len() / 2].clone());
		})?;
	}
	Ok(())
}

/// Updates the running vote totals and active flags of every network-role
/// table (producers, officers, executive board, governance accounts,
/// supernodes, mediators) (spec §4.7, producer/role elections).
pub fn update_role_vote_ranks(db: &mut ChainDb, active_producer_count: usize) -> ChainResult<()> {
	let mut producers: Vec<(u64, chain_common::ShareAmount)> = db
		.producers
		.iter()
		.map(|(id, p)| (*id, p.total_votes))
		.collect();
	producers.sort_by(|a, b| b.1.cmp(&a.1));
	for (rank, (id, _)) in producers.iter().enumerate() {
		let should_be_active = rank < active_producer_count;
		db.producers.modify(*id, |p| p.active = should_be_active)?;
	}
	Ok(())
}

/// Pays out `budget` (denominated in `funding_symbol`, debited from
/// `funder`'s liquid balance) across open community enterprises weighted by
/// quadratic funding, crediting each enterprise's creator directly and
/// closing the enterprise out (SPEC_FULL.md §B.2 supplement).
pub fn pay_quadratic_funding_round(db: &mut ChainDb, funder: &AccountName, funding_symbol: &AssetSymbol, budget: ShareAmount) -> ChainResult<()> {
	let open: Vec<u64> = db
		.community_enterprises
		.iter()
		.filter(|(_, e)| e.status_open && e.symbol == *funding_symbol)
		.map(|(id, _)| *id)
		.collect();
	if open.is_empty() {
		return Ok(());
	}
	let mut weights = Vec::with_capacity(open.len());
	let mut total_weight: u128 = 0;
	for &id in &open {
		let weight = db.community_enterprises.get(id)?.quadratic_funding_weight()?;
		weights.push((id, weight));
		total_weight = total_weight.saturating_add(weight);
	}
	if total_weight == 0 {
		return Ok(());
	}

	crate::evaluator::trading::debit_liquid(db, funder, &chain_common::AssetAmount { amount: budget, symbol: funding_symbol.clone() })?;
	for (id, weight) in weights {
		let share = (budget.0.max(0) as u128) * weight / total_weight;
		let creator = db.community_enterprises.get(id)?.creator.clone();
		if share > 0 {
			credit_liquid(db, &creator, &chain_common::AssetAmount { amount: ShareAmount(share as i64), symbol: funding_symbol.clone() })?;
		}
		db.community_enterprises.modify(id, |e| {
			e.total_approved = ShareAmount(share as i64);
			e.status_open = false;
		})?;
	}
	Ok(())
}

/// Synthetic account backing an executive board's escrowed budget; funded by
/// transfers into this account before `status_open` enterprises can be paid.
pub fn executive_board_treasury(board_id: u64) -> AccountName {
	AccountName::new(format!("executive-board-{board_id}")).expect("board id renders to a valid account name")
}

/// Runs a quadratic-funding round for every executive board against its own
/// escrowed treasury, skipping boards whose treasury is not yet funded
/// (SPEC_FULL.md §B.2 supplement).
pub fn run_quadratic_funding_rounds(db: &mut ChainDb) -> ChainResult<()> {
	let boards: Vec<(u64, AssetSymbol, ShareAmount)> = db
		.executive_boards
		.iter()
		.map(|(id, b)| (*id, b.symbol.clone(), b.budget))
		.collect();
	for (id, symbol, budget) in boards {
		if budget.0 <= 0 {
			continue;
		}
		let treasury = executive_board_treasury(id);
		match pay_quadratic_funding_round(db, &treasury, &symbol, budget) {
			Ok(()) | Err(chain_common::error::ChainError::InsufficientBalance(_)) => {}
			Err(err) => return Err(err),
		}
	}
	Ok(())
}

/// Retargets the proof-of-work difficulty based on how long the last
/// PoW-producer interval actually took versus the expected interval
/// (spec §4.8).
pub fn retarget_proof_of_work(db: &mut ChainDb, actual_interval_secs: i64, expected_interval_secs: i64) -> ChainResult<()> {
	let ids: Vec<u64> = db
		.producers
		.iter()
		.filter(|(_, p)| matches!(p.kind, ProducerKind::ProofOfWork))
		.map(|(id, _)| *id)
		.collect();
	for id in ids {
		db.producers.modify(id, |p| {
			p.pow_target = retarget(p.pow_target.max(1), actual_interval_secs, expected_interval_secs);
		})?;
	}
	Ok(())
}

/// Runs [`retarget_proof_of_work`] using the time elapsed since the last
/// retarget as the actual interval, against `expected_interval_secs`
/// (spec §4.8).
pub fn run_daily_pow_retarget(db: &mut ChainDb, now: TimePoint, expected_interval_secs: i64) -> ChainResult<()> {
	let actual_interval_secs = now.seconds_since(db.dynamic_global_properties.last_pow_retarget_time).max(1);
	retarget_proof_of_work(db, actual_interval_secs, expected_interval_secs)?;
	db.dynamic_global_properties.last_pow_retarget_time = now;
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use chain_common::{AccountName, AssetSymbol, ShareAmount};
	use chain_common::crypto::PublicKey;
	use secp256k1::{rand::rngs::OsRng, Secp256k1};

	fn dummy_key() -> PublicKey {
		let secp = Secp256k1::new();
		let (_, public) = secp.generate_keypair(&mut OsRng);
		PublicKey(public)
	}

	fn name(s: &str) -> AccountName {
		AccountName::new(s).unwrap()
	}

	#[test]
	fn clear_expired_delegations_returns_stake() {
		let mut db = ChainDb::new(TimePoint(0));
		let symbol = AssetSymbol::new("COIN").unwrap();
		let balance = db
			.account_balances
			.create(|id| {
				let mut b = crate::entities::AccountBalance::new(name("alice"), symbol.clone());
				b.id = id;
				b.delegated_out = ShareAmount(100);
				b
			})
			.unwrap()
			.id;
		db.delegations
			.create(|id| crate::entities::Delegation {
				id,
				delegator: name("alice"),
				delegatee: name("bob"),
				symbol: symbol.clone(),
				amount: ShareAmount(100),
				expiration: Some(TimePoint::from_unix_seconds(10)),
			})
			.unwrap();

		let cleared = clear_expired_delegations(&mut db, TimePoint::from_unix_seconds(20)).unwrap();
		assert_eq!(cleared, 1);
		assert_eq!(db.account_balances.get(balance).unwrap().delegated_out, ShareAmount(0));
	}

	#[test]
	fn update_role_vote_ranks_marks_top_n_active() {
		let mut db = ChainDb::new(TimePoint(0));
		for (name_str, votes) in [("p1", 300), ("p2", 100), ("p3", 200)] {
			db.producers
				.create(|id| {
					let mut p = crate::entities::Producer::new(name(name_str), dummy_key(), ProducerKind::Dpos);
					p.id = id;
					p.total_votes = ShareAmount(votes);
					p
				})
				.unwrap();
		}
		update_role_vote_ranks(&mut db, 2).unwrap();
		let active: Vec<_> = db.producers.iter().filter(|(_, p)| p.active).map(|(_, p)| p.owner.to_string()).collect();
		assert_eq!(active.len(), 2);
		assert!(active.contains(&"p1".to_string()));
		assert!(active.contains(&"p3".to_string()));
	}
}
