//! Account, balance, and asset-transfer evaluators (spec §4.5).

use chain_common::error::{ChainError, ChainResult};
use chain_common::{AccountName, AssetAmount, AssetSymbol, TimePoint};

use crate::db::ChainDb;
use crate::entities::{Account, AccountAuthority, AccountBalance, AccountType, Delegation, WeightedAuthority};

use chain_common::crypto::PublicKey;

pub fn create_account(
	db: &mut ChainDb,
	creator: &AccountName,
	new_account: &AccountName,
	owner_key: PublicKey,
	active_key: PublicKey,
	posting_key: PublicKey,
	secure_key: PublicKey,
	now: TimePoint,
) -> ChainResult<()> {
	let _ = creator;
	db.accounts.create(|id| Account {
		id,
		name: new_account.clone(),
		account_type: AccountType::Personal,
		membership_tier: 0,
		owner_key,
		active_key,
		posting_key,
		secure_key,
		proxy: None,
		outstanding_votes: 0,
		created: now,
		last_owner_update: now,
		last_active_time: now,
		last_asset_creation: None,
	})?;
	db.account_authorities.create(|_| AccountAuthority {
		account: new_account.clone(),
		owner: WeightedAuthority::single_key(owner_key),
		active: WeightedAuthority::single_key(active_key),
		posting: WeightedAuthority::single_key(posting_key),
		last_owner_update: now,
	})?;
	Ok(())
}

fn balance_key(owner: &AccountName, symbol: &AssetSymbol) -> Vec<u8> {
	let mut key = owner.as_str().as_bytes().to_vec();
	key.push(0);
	key.extend(symbol.as_str().as_bytes());
	key
}

fn balance_id(db: &ChainDb, owner: &AccountName, symbol: &AssetSymbol) -> Option<u64> {
	db.account_balances
		.find_by_index("by_owner_symbol", &balance_key(owner, symbol))
		.map(|b| b.id)
}

/// Finds or lazily creates a `(owner, symbol)` balance row.
fn ensure_balance(db: &mut ChainDb, owner: &AccountName, symbol: &AssetSymbol) -> ChainResult<u64> {
	if let Some(id) = balance_id(db, owner, symbol) {
		return Ok(id);
	}
	let owner = owner.clone();
	let symbol = symbol.clone();
	Ok(db.account_balances.create(|id| {
		let mut balance = AccountBalance::new(owner, symbol);
		balance.id = id;
		balance
	})?.id)
}

pub fn transfer(db: &mut ChainDb, from: &AccountName, to: &AccountName, amount: &AssetAmount) -> ChainResult<()> {
	if amount.is_zero() || amount.amount.is_negative() {
		return Err(ChainError::InvariantViolation("transfer amount must be positive".into()));
	}
	let from_id = ensure_balance(db, from, &amount.symbol)?;
	let to_id = ensure_balance(db, to, &amount.symbol)?;

	let from_balance = db.account_balances.get(from_id)?;
	if from_balance.liquid.0 < amount.amount.0 {
		return Err(ChainError::InsufficientBalance(format!("{from} lacks {amount}")));
	}

	db.account_balances.modify(from_id, |b| {
		b.liquid = b.liquid.checked_sub(amount.amount).unwrap_or(b.liquid);
	})?;
	db.account_balances.modify(to_id, |b| {
		b.liquid = b.liquid.checked_add(amount.amount).unwrap_or(b.liquid);
	})?;
	Ok(())
}

pub fn stake(db: &mut ChainDb, account: &AccountName, amount: &AssetAmount) -> ChainResult<()> {
	let id = ensure_balance(db, account, &amount.symbol)?;
	let balance = db.account_balances.get(id)?;
	if balance.liquid.0 < amount.amount.0 {
		return Err(ChainError::InsufficientBalance(format!("{account} lacks {amount}")));
	}
	db.account_balances.modify(id, |b| {
		b.liquid = b.liquid.checked_sub(amount.amount).unwrap_or(b.liquid);
		b.staked = b.staked.checked_add(amount.amount).unwrap_or(b.staked);
	})
}

/// Enqueues an unstake request; actual liquidation into equal installments
/// across the asset's configured unstake intervals is advanced by the
/// periodic job, not here (spec §4.5).
pub fn unstake(db: &mut ChainDb, account: &AccountName, amount: &AssetAmount, release_time: TimePoint) -> ChainResult<()> {
	let id = ensure_balance(db, account, &amount.symbol)?;
	let balance = db.account_balances.get(id)?;
	if balance.staked.0 < amount.amount.0 {
		return Err(ChainError::InsufficientBalance(format!("{account} lacks staked {amount}")));
	}
	db.account_balances.modify(id, |b| {
		b.staked = b.staked.checked_sub(amount.amount).unwrap_or(b.staked);
		b.unstaking_queue.push((amount.amount, release_time));
	})
}

pub fn transfer_to_savings(db: &mut ChainDb, account: &AccountName, amount: &AssetAmount) -> ChainResult<()> {
	let id = ensure_balance(db, account, &amount.symbol)?;
	let balance = db.account_balances.get(id)?;
	if balance.liquid.0 < amount.amount.0 {
		return Err(ChainError::InsufficientBalance(format!("{account} lacks {amount}")));
	}
	db.account_balances.modify(id, |b| {
		b.liquid = b.liquid.checked_sub(amount.amount).unwrap_or(b.liquid);
		b.savings = b.savings.checked_add(amount.amount).unwrap_or(b.savings);
	})
}

pub fn transfer_from_savings(db: &mut ChainDb, account: &AccountName, amount: &AssetAmount, release_time: TimePoint) -> ChainResult<()> {
	let id = ensure_balance(db, account, &amount.symbol)?;
	let balance = db.account_balances.get(id)?;
	if balance.savings.0 < amount.amount.0 {
		return Err(ChainError::InsufficientBalance(format!("{account} lacks savings {amount}")));
	}
	db.account_balances.modify(id, |b| {
		b.savings = b.savings.checked_sub(amount.amount).unwrap_or(b.savings);
		b.savings_withdrawal_queue.push((amount.amount, release_time));
	})
}

pub fn delegate_stake(db: &mut ChainDb, delegator: &AccountName, delegatee: &AccountName, amount: &AssetAmount) -> ChainResult<()> {
	let from_id = ensure_balance(db, delegator, &amount.symbol)?;
	let to_id = ensure_balance(db, delegatee, &amount.symbol)?;
	let from_balance = db.account_balances.get(from_id)?;
	if from_balance.staked.0 < amount.amount.0 {
		return Err(ChainError::InsufficientBalance(format!("{delegator} lacks staked {amount}")));
	}
	db.account_balances.modify(from_id, |b| {
		b.delegated_out = b.delegated_out.checked_add(amount.amount).unwrap_or(b.delegated_out);
	})?;
	db.account_balances.modify(to_id, |b| {
		b.delegated_in = b.delegated_in.checked_add(amount.amount).unwrap_or(b.delegated_in);
	})?;
	db.delegations.create(|id| Delegation {
		id,
		delegator: delegator.clone(),
		delegatee: delegatee.clone(),
		symbol: amount.symbol.clone(),
		amount: amount.amount,
		expiration: None,
	})?;
	Ok(())
}
