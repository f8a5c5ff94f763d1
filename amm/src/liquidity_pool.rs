//! Constant-product automated market maker (spec §4.6.5).
//!
//! Invariant: `balance_a * balance_b ≈ k`, strictly only before fees are
//! taken into account; a swap's fee is deducted from the input side before
//! the constant-product formula is applied, which is what lets `k` grow
//! slightly (fee retained by the pool/issuer) on every trade.

use chain_common::error::{ChainError, ChainResult};

/// Percentage values here are parts-per-ten-thousand ("basis points of
/// basis points") to keep everything in integer arithmetic: 100 = 1%.
pub type FeeBps = u32;

pub const FEE_BPS_DENOMINATOR: u64 = 10_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiquidityPool {
	pub balance_a: u64,
	pub balance_b: u64,
	pub lp_shares_issued: u64,
	/// Fee charged on the input side of every swap, in [`FeeBps`].
	pub market_fee_bps: FeeBps,
	/// Share of the fee (in [`FeeBps`] of the fee itself) paid to the
	/// issuer rather than retained by the pool.
	pub market_fee_share_bps: FeeBps,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapResult {
	pub amount_out: u64,
	pub fee_to_pool: u64,
	pub fee_to_issuer: u64,
}

impl LiquidityPool {
	pub fn new(initial_a: u64, initial_b: u64, market_fee_bps: FeeBps, market_fee_share_bps: FeeBps) -> ChainResult<Self> {
		if initial_a == 0 || initial_b == 0 {
			return Err(ChainError::InsufficientBalance(
				"liquidity pool requires both initial balances to be positive".into(),
			));
		}
		Ok(LiquidityPool {
			balance_a: initial_a,
			balance_b: initial_b,
			// Initial LP supply is pinned to the `a`-side deposit (see DESIGN.md).
			lp_shares_issued: initial_a,
			market_fee_bps,
			market_fee_share_bps,
		})
	}

	fn k(&self) -> u128 {
		u128::from(self.balance_a) * u128::from(self.balance_b)
	}

	/// Swaps `amount_in` of side A for side B. `Δy = y − k / (x + Δx·(1 − fee))`.
	pub fn swap_a_for_b(&mut self, amount_in: u64) -> ChainResult<SwapResult> {
		let (fee, fee_to_pool, fee_to_issuer) = self.split_fee(amount_in)?;
		let net_in = amount_in.checked_sub(fee).ok_or_else(|| {
			ChainError::Overflow("swap fee exceeds input amount".into())
		})?;

		let k = self.k();
		let new_balance_a = u128::from(self.balance_a) + u128::from(net_in);
		let new_balance_b_floor = k / new_balance_a;
		let new_balance_b = u64::try_from(new_balance_b_floor)
			.map_err(|_| ChainError::Overflow("pool balance overflowed u64".into()))?;

		if new_balance_b >= self.balance_b {
			return Err(ChainError::InvariantViolation(
				"swap produced a non-positive output".into(),
			));
		}
		let amount_out = self.balance_b - new_balance_b;

		self.balance_a = self.balance_a.checked_add(amount_in).ok_or_else(|| {
			ChainError::Overflow("pool balance_a overflowed".into())
		})?;
		// The fee stays on the input side; only the net amount entered the
		// constant-product formula, so credit the fee back onto balance_a
		// for the pool's retained portion (the issuer's portion leaves the
		// pool entirely and is paid out by the caller).
		self.balance_a = self.balance_a.checked_sub(fee_to_issuer).ok_or_else(|| {
			ChainError::Overflow("pool balance_a underflowed paying issuer fee".into())
		})?;
		self.balance_b = new_balance_b;

		Ok(SwapResult { amount_out, fee_to_pool, fee_to_issuer })
	}

	pub fn swap_b_for_a(&mut self, amount_in: u64) -> ChainResult<SwapResult> {
		let mut mirrored = LiquidityPool {
			balance_a: self.balance_b,
			balance_b: self.balance_a,
			lp_shares_issued: self.lp_shares_issued,
			market_fee_bps: self.market_fee_bps,
			market_fee_share_bps: self.market_fee_share_bps,
		};
		let result = mirrored.swap_a_for_b(amount_in)?;
		self.balance_a = mirrored.balance_b;
		self.balance_b = mirrored.balance_a;
		Ok(result)
	}

	fn split_fee(&self, amount_in: u64) -> ChainResult<(u64, u64, u64)> {
		let fee = (u128::from(amount_in) * u128::from(self.market_fee_bps) / u128::from(FEE_BPS_DENOMINATOR))
			as u64;
		let fee_to_issuer =
			(u128::from(fee) * u128::from(self.market_fee_share_bps) / u128::from(FEE_BPS_DENOMINATOR)) as u64;
		let fee_to_pool = fee.saturating_sub(fee_to_issuer);
		Ok((fee, fee_to_pool, fee_to_issuer))
	}

	/// Deposits `(amount_a, amount_b)` in the pool's current ratio and mints
	/// LP shares proportional to the fraction of `k` added. Fails if the
	/// deposit is not (approximately) in ratio.
	pub fn add_liquidity(&mut self, amount_a: u64, amount_b: u64) -> ChainResult<u64> {
		// Deposit must preserve the ratio exactly in integer terms:
		// amount_a / balance_a == amount_b / balance_b.
		let lhs = u128::from(amount_a) * u128::from(self.balance_b);
		let rhs = u128::from(amount_b) * u128::from(self.balance_a);
		if lhs != rhs {
			return Err(ChainError::InvariantViolation(
				"liquidity deposit is not in the pool's current ratio".into(),
			));
		}
		let minted = (u128::from(self.lp_shares_issued) * u128::from(amount_a) / u128::from(self.balance_a))
			as u64;
		self.balance_a = self.balance_a.checked_add(amount_a).ok_or_else(|| {
			ChainError::Overflow("pool balance_a overflowed on deposit".into())
		})?;
		self.balance_b = self.balance_b.checked_add(amount_b).ok_or_else(|| {
			ChainError::Overflow("pool balance_b overflowed on deposit".into())
		})?;
		self.lp_shares_issued = self.lp_shares_issued.checked_add(minted).ok_or_else(|| {
			ChainError::Overflow("lp share supply overflowed".into())
		})?;
		Ok(minted)
	}

	/// Burns `shares` and returns the proportional `(amount_a, amount_b)`.
	pub fn remove_liquidity(&mut self, shares: u64) -> ChainResult<(u64, u64)> {
		if shares == 0 || shares > self.lp_shares_issued {
			return Err(ChainError::InsufficientBalance("not enough LP shares".into()));
		}
		let amount_a =
			(u128::from(self.balance_a) * u128::from(shares) / u128::from(self.lp_shares_issued)) as u64;
		let amount_b =
			(u128::from(self.balance_b) * u128::from(shares) / u128::from(self.lp_shares_issued)) as u64;
		self.balance_a -= amount_a;
		self.balance_b -= amount_b;
		self.lp_shares_issued -= shares;
		Ok((amount_a, amount_b))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn swap_respects_constant_product_within_one_unit() {
		let mut pool = LiquidityPool::new(1_000_000, 1_000_000, 30, 5_000).unwrap(); // 0.3% fee, 50% to issuer
		let k_before = pool.k();
		let result = pool.swap_a_for_b(10_000).unwrap();
		assert!(result.amount_out > 0);
		let k_after = pool.k();
		assert!(k_after >= k_before);
	}

	#[test]
	fn add_liquidity_rejects_out_of_ratio_deposits() {
		let mut pool = LiquidityPool::new(1_000, 2_000, 0, 0).unwrap();
		assert!(pool.add_liquidity(100, 100).is_err());
		assert!(pool.add_liquidity(100, 200).is_ok());
	}

	#[test]
	fn remove_liquidity_returns_proportional_share() {
		let mut pool = LiquidityPool::new(1_000, 2_000, 0, 0).unwrap();
		let minted = pool.add_liquidity(1_000, 2_000).unwrap();
		assert_eq!(minted, pool.lp_shares_issued / 2);
		let (a, b) = pool.remove_liquidity(minted).unwrap();
		assert_eq!(a, 1_000);
		assert_eq!(b, 2_000);
	}
}
