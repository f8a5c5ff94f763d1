//! Prices: a directed ratio of two asset amounts (spec §3.1).
//!
//! A `Price` converts an amount of its `base` asset into an amount of its
//! `quote` asset: `quote_amount = base_amount * (quote.amount / base.amount)`.
//! The direction is significant — `Price { base: COIN, quote: USD }` answers
//! "how much USD per COIN", and is not interchangeable with its inverse
//! without calling [`Price::inverted`].

use codec::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::amount::AssetAmount;
use crate::error::{ChainError, ChainResult};
use crate::ids::AssetSymbol;

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
pub struct Price {
	pub base: AssetAmount,
	pub quote: AssetAmount,
}

impl Price {
	pub fn new(base: AssetAmount, quote: AssetAmount) -> Self {
		Self { base, quote }
	}

	pub fn inverted(&self) -> Price {
		Price { base: self.quote.clone(), quote: self.base.clone() }
	}

	/// Converts `amount` (which must be denominated in `self.base.symbol`)
	/// into `self.quote.symbol`, rounding toward zero.
	pub fn multiply(&self, amount: &AssetAmount) -> ChainResult<AssetAmount> {
		self.convert(amount, Rounding::TowardZero)
	}

	/// As [`Price::multiply`], but rounds the result away from zero. Used
	/// for margin-call bisection and anywhere under-delivering the quote
	/// side would leave an uncollateralized position (spec §9).
	pub fn multiply_and_round_up(&self, amount: &AssetAmount) -> ChainResult<AssetAmount> {
		self.convert(amount, Rounding::AwayFromZero)
	}

	fn convert(&self, amount: &AssetAmount, rounding: Rounding) -> ChainResult<AssetAmount> {
		if amount.symbol != self.base.symbol {
			return Err(ChainError::MismatchedSymbols(
				amount.symbol.to_string(),
				self.base.symbol.to_string(),
			));
		}
		if self.base.amount.0 == 0 {
			return Err(ChainError::Overflow("price has a zero base amount".into()));
		}

		let numerator = i128::from(amount.amount.0) * i128::from(self.quote.amount.0);
		let denominator = i128::from(self.base.amount.0);
		let quotient = numerator / denominator;
		let remainder = numerator % denominator;

		let result = match rounding {
			Rounding::TowardZero => quotient,
			Rounding::AwayFromZero if remainder != 0 => {
				if numerator >= 0 {
					quotient + 1
				} else {
					quotient - 1
				}
			},
			Rounding::AwayFromZero => quotient,
		};

		let result = i64::try_from(result)
			.map_err(|_| ChainError::Overflow("price conversion overflowed i64".into()))?;

		Ok(AssetAmount::new(result, self.quote.symbol.clone()))
	}

	/// `true` iff `self >= other`, compared by cross-multiplication so no
	/// floating point or rounding is ever involved in consensus-critical
	/// price comparisons. Both prices must share the same `(base, quote)`
	/// symbol pair (in either order).
	pub fn cross_compare_ge(&self, other: &Price) -> ChainResult<bool> {
		let (lhs, rhs) = self.as_comparable_pair(other)?;
		Ok(lhs >= rhs)
	}

	pub fn cross_compare_gt(&self, other: &Price) -> ChainResult<bool> {
		let (lhs, rhs) = self.as_comparable_pair(other)?;
		Ok(lhs > rhs)
	}

	fn as_comparable_pair(&self, other: &Price) -> ChainResult<(i128, i128)> {
		let other = if other.base.symbol == self.base.symbol && other.quote.symbol == self.quote.symbol
		{
			other.clone()
		} else if other.base.symbol == self.quote.symbol && other.quote.symbol == self.base.symbol {
			other.inverted()
		} else {
			return Err(ChainError::MismatchedSymbols(
				self.base.symbol.to_string(),
				other.base.symbol.to_string(),
			));
		};
		let lhs = i128::from(self.quote.amount.0) * i128::from(other.base.amount.0);
		let rhs = i128::from(other.quote.amount.0) * i128::from(self.base.amount.0);
		Ok((lhs, rhs))
	}

	pub fn symbols(&self) -> (&AssetSymbol, &AssetSymbol) {
		(&self.base.symbol, &self.quote.symbol)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rounding {
	TowardZero,
	AwayFromZero,
}

#[cfg(test)]
mod tests {
	use super::*;

	fn sym(s: &str) -> AssetSymbol {
		AssetSymbol::new(s).unwrap()
	}

	#[test]
	fn multiply_rounds_toward_zero() {
		// price: 1 COIN = 0.5 USD, i.e. 2 COIN -> 1 USD
		let price = Price::new(AssetAmount::new(2, sym("COIN")), AssetAmount::new(1, sym("USD")));
		let amount = AssetAmount::new(3, sym("COIN"));
		let result = price.multiply(&amount).unwrap();
		assert_eq!(result.amount.0, 1); // 3 * 1 / 2 == 1 (truncated)
	}

	#[test]
	fn multiply_and_round_up_rounds_away_from_zero() {
		let price = Price::new(AssetAmount::new(2, sym("COIN")), AssetAmount::new(1, sym("USD")));
		let amount = AssetAmount::new(3, sym("COIN"));
		let result = price.multiply_and_round_up(&amount).unwrap();
		assert_eq!(result.amount.0, 2); // 3 * 1 / 2 == 1.5 -> rounds up to 2
	}

	#[test]
	fn scenario_b_limit_order_match_prices_are_equivalent() {
		// maker: sell 100 COIN for 50 USD => price 0.5 USD/COIN
		let maker = Price::new(AssetAmount::new(100, sym("COIN")), AssetAmount::new(50, sym("USD")));
		// taker: sell 25 USD for 50 COIN => price 2 COIN/USD, inverted is 0.5 USD/COIN
		let taker = Price::new(AssetAmount::new(25, sym("USD")), AssetAmount::new(50, sym("COIN")));
		assert!(taker.inverted().cross_compare_ge(&maker).unwrap());
	}
}
