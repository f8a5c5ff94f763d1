//! Interest-bearing credit pool (spec §4.6.6). Holds a base balance lent
//! out and issues credit-pool shares representing a claim on the pool's
//! base holdings including accrued interest; the redemption price only
//! ever moves up.

use chain_common::error::{ChainError, ChainResult};

/// Initial redemption price, in credit-pool shares per unit of the
/// underlying asset (spec §4.5 "Create asset", §C.4 of SPEC_FULL.md).
pub const INITIAL_SHARES_PER_UNIT: u64 = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreditPool {
	/// Base asset sitting idle in the pool, immediately redeemable.
	pub base_balance: u64,
	/// Base asset currently lent out to margin positions.
	pub borrowed_balance: u64,
	pub shares_issued: u64,
	/// Fixed component of the borrow rate, in basis points per accrual period.
	pub fixed_rate_bps: u32,
	/// Variable component of the borrow rate, in basis points per accrual
	/// period, scaled by utilization.
	pub variable_rate_bps: u32,
}

const BPS_DENOMINATOR: u128 = 10_000;

impl CreditPool {
	pub fn new(initial_base: u64, fixed_rate_bps: u32, variable_rate_bps: u32) -> ChainResult<Self> {
		if initial_base == 0 {
			return Err(ChainError::InsufficientBalance("credit pool requires initial base liquidity".into()));
		}
		let shares_issued = initial_base
			.checked_mul(INITIAL_SHARES_PER_UNIT)
			.ok_or_else(|| ChainError::Overflow("credit pool initial shares overflowed".into()))?;
		Ok(CreditPool { base_balance: initial_base, borrowed_balance: 0, shares_issued, fixed_rate_bps, variable_rate_bps })
	}

	/// Total base value the pool claims: what sits idle plus what has been
	/// lent out (and, once interest accrues onto `borrowed_balance`,
	/// including that accrued interest).
	pub fn total_value(&self) -> u128 {
		u128::from(self.base_balance) + u128::from(self.borrowed_balance)
	}

	/// Redemption price: base units per share, scaled by
	/// [`INITIAL_SHARES_PER_UNIT`] so it stays exact in integer arithmetic.
	/// Returns `(numerator, denominator)` such that `price = numerator / denominator`.
	pub fn price(&self) -> (u128, u128) {
		if self.shares_issued == 0 {
			return (1, INITIAL_SHARES_PER_UNIT as u128);
		}
		(self.total_value(), u128::from(self.shares_issued))
	}

	/// `utilization = borrowed / (borrowed + base + ε)`, ε guarding the
	/// divide-by-zero case of an otherwise-empty pool (spec §C.4: the
	/// `1`-unit floor constant, reused here as the epsilon).
	pub fn utilization_bps(&self) -> u64 {
		let denom = u128::from(self.borrowed_balance) + u128::from(self.base_balance) + 1;
		((u128::from(self.borrowed_balance) * BPS_DENOMINATOR) / denom) as u64
	}

	/// `fixed + variable · utilization` (spec §4.6.6).
	pub fn borrow_rate_bps(&self) -> u64 {
		let utilization = self.utilization_bps();
		let variable = (u128::from(self.variable_rate_bps) * u128::from(utilization)) / BPS_DENOMINATOR;
		u64::from(self.fixed_rate_bps) + variable as u64
	}

	/// Deposits `amount` of base and mints shares at the current price.
	pub fn lend(&mut self, amount: u64) -> ChainResult<u64> {
		let (num, den) = self.price();
		let minted = (u128::from(amount) * den / num) as u64;
		self.base_balance = self
			.base_balance
			.checked_add(amount)
			.ok_or_else(|| ChainError::Overflow("credit pool base_balance overflowed".into()))?;
		self.shares_issued = self
			.shares_issued
			.checked_add(minted)
			.ok_or_else(|| ChainError::Overflow("credit pool share supply overflowed".into()))?;
		Ok(minted)
	}

	/// Burns `shares` and pays out `price * shares` of base. Fails if the
	/// pool does not have enough idle base to cover the redemption (the
	/// borrowed portion is not liquid).
	pub fn redeem(&mut self, shares: u64) -> ChainResult<u64> {
		if shares == 0 || shares > self.shares_issued {
			return Err(ChainError::InsufficientBalance("not enough credit pool shares".into()));
		}
		let (num, den) = self.price();
		let payout = (u128::from(shares) * num / den) as u64;
		if payout > self.base_balance {
			return Err(ChainError::InsufficientBalance(
				"credit pool does not have enough idle base to redeem".into(),
			));
		}
		self.base_balance -= payout;
		self.shares_issued -= shares;
		Ok(payout)
	}

	/// Lends `amount` of base out to a borrower (a margin order), increasing
	/// `borrowed_balance` without changing `base_balance` or share supply:
	/// this only moves the claim from "idle" to "receivable", which is why
	/// the price (total claim / shares) is unaffected until interest
	/// accrues on top of it via [`CreditPool::accrue_interest`].
	pub fn borrow(&mut self, amount: u64) -> ChainResult<()> {
		if amount > self.base_balance {
			return Err(ChainError::InsufficientBalance("credit pool has insufficient idle base".into()));
		}
		self.base_balance -= amount;
		self.borrowed_balance = self
			.borrowed_balance
			.checked_add(amount)
			.ok_or_else(|| ChainError::Overflow("credit pool borrowed_balance overflowed".into()))?;
		Ok(())
	}

	/// Repays `amount` plus `interest` of base into the pool. `interest` is
	/// pure upside credited to `base_balance`, which is what makes the
	/// redemption price monotonically increasing.
	pub fn repay(&mut self, amount: u64, interest: u64) -> ChainResult<()> {
		self.borrowed_balance = self
			.borrowed_balance
			.checked_sub(amount)
			.ok_or_else(|| ChainError::Overflow("repay exceeds borrowed_balance".into()))?;
		self.base_balance = self
			.base_balance
			.checked_add(amount)
			.and_then(|b| b.checked_add(interest))
			.ok_or_else(|| ChainError::Overflow("credit pool base_balance overflowed on repay".into()))?;
		Ok(())
	}

	/// Accrues `interest` onto an outstanding loan without repaying
	/// principal: increases `borrowed_balance` (the debt grows) and credits
	/// the pool's claim by crediting the same amount into `base_balance`'s
	/// accounting via `borrowed_balance` itself, since interest capitalizes
	/// into the debt until it is actually repaid (spec §4.6.2 step 5).
	pub fn accrue_interest(&mut self, interest: u64) -> ChainResult<()> {
		self.borrowed_balance = self
			.borrowed_balance
			.checked_add(interest)
			.ok_or_else(|| ChainError::Overflow("credit pool borrowed_balance overflowed accruing interest".into()))?;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn initial_price_is_hundred_to_one() {
		let pool = CreditPool::new(1_000, 500, 1_000).unwrap();
		assert_eq!(pool.shares_issued, 100_000);
		let (num, den) = pool.price();
		assert_eq!(den, 100_000);
		assert_eq!(num, 1_000);
	}

	#[test]
	fn price_only_moves_up_after_interest_accrual() {
		let mut pool = CreditPool::new(1_000, 500, 1_000).unwrap();
		let (num_before, den_before) = pool.price();
		pool.borrow(500).unwrap();
		pool.accrue_interest(50).unwrap();
		let (num_after, den_after) = pool.price();
		// price_before = num_before/den_before, price_after = num_after/den_after
		assert!(num_after as u128 * den_before as u128 > num_before as u128 * den_after as u128);
	}

	#[test]
	fn borrow_rate_increases_with_utilization() {
		let mut pool = CreditPool::new(1_000, 200, 2_000).unwrap();
		let rate_idle = pool.borrow_rate_bps();
		pool.borrow(900).unwrap();
		let rate_busy = pool.borrow_rate_bps();
		assert!(rate_busy > rate_idle);
	}

	#[test]
	fn redeem_fails_when_not_enough_base_is_idle() {
		let mut pool = CreditPool::new(1_000, 0, 0).unwrap();
		pool.borrow(900).unwrap();
		assert!(pool.redeem(50_000).is_err());
		assert!(pool.redeem(5_000).is_ok());
	}
}
