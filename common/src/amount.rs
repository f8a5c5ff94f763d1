//! Share amounts and asset amounts (spec §3.1).

use std::fmt;
use std::ops::{Add, Neg, Sub};

use codec::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::error::{ChainError, ChainResult};
use crate::ids::AssetSymbol;

/// A signed 64-bit fixed-point quantity. The precision (number of implied
/// decimal places) is a property of the asset, not of the amount itself.
#[derive(
	Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Encode, Decode, Serialize, Deserialize,
)]
pub struct ShareAmount(pub i64);

impl ShareAmount {
	pub const ZERO: ShareAmount = ShareAmount(0);

	pub fn is_negative(self) -> bool {
		self.0 < 0
	}

	pub fn checked_add(self, rhs: ShareAmount) -> ChainResult<ShareAmount> {
		self.0
			.checked_add(rhs.0)
			.map(ShareAmount)
			.ok_or_else(|| ChainError::Overflow("share amount addition overflowed".into()))
	}

	pub fn checked_sub(self, rhs: ShareAmount) -> ChainResult<ShareAmount> {
		self.0
			.checked_sub(rhs.0)
			.map(ShareAmount)
			.ok_or_else(|| ChainError::Overflow("share amount subtraction overflowed".into()))
	}
}

impl Add for ShareAmount {
	type Output = ShareAmount;
	fn add(self, rhs: ShareAmount) -> ShareAmount {
		ShareAmount(self.0 + rhs.0)
	}
}

impl Sub for ShareAmount {
	type Output = ShareAmount;
	fn sub(self, rhs: ShareAmount) -> ShareAmount {
		ShareAmount(self.0 - rhs.0)
	}
}

impl Neg for ShareAmount {
	type Output = ShareAmount;
	fn neg(self) -> ShareAmount {
		ShareAmount(-self.0)
	}
}

impl fmt::Display for ShareAmount {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// A `(share amount, asset symbol)` pair. Arithmetic between two
/// `AssetAmount`s requires matching symbols (spec §3.1).
#[derive(
	Debug, Clone, PartialEq, Eq, Encode, Decode, Serialize, Deserialize,
)]
pub struct AssetAmount {
	pub amount: ShareAmount,
	pub symbol: AssetSymbol,
}

impl AssetAmount {
	pub fn new(amount: i64, symbol: AssetSymbol) -> Self {
		Self { amount: ShareAmount(amount), symbol }
	}

	pub fn zero(symbol: AssetSymbol) -> Self {
		Self { amount: ShareAmount::ZERO, symbol }
	}

	fn require_same_symbol(&self, other: &AssetAmount) -> ChainResult<()> {
		if self.symbol != other.symbol {
			return Err(ChainError::MismatchedSymbols(
				self.symbol.to_string(),
				other.symbol.to_string(),
			));
		}
		Ok(())
	}

	pub fn checked_add(&self, other: &AssetAmount) -> ChainResult<AssetAmount> {
		self.require_same_symbol(other)?;
		Ok(AssetAmount {
			amount: self.amount.checked_add(other.amount)?,
			symbol: self.symbol.clone(),
		})
	}

	pub fn checked_sub(&self, other: &AssetAmount) -> ChainResult<AssetAmount> {
		self.require_same_symbol(other)?;
		Ok(AssetAmount {
			amount: self.amount.checked_sub(other.amount)?,
			symbol: self.symbol.clone(),
		})
	}

	pub fn is_zero(&self) -> bool {
		self.amount.0 == 0
	}
}

impl fmt::Display for AssetAmount {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} {}", self.amount, self.symbol)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn sym(s: &str) -> AssetSymbol {
		AssetSymbol::new(s).unwrap()
	}

	#[test]
	fn add_requires_matching_symbols() {
		let a = AssetAmount::new(100, sym("COIN"));
		let b = AssetAmount::new(50, sym("USD"));
		assert!(matches!(a.checked_add(&b), Err(ChainError::MismatchedSymbols(_, _))));
	}

	#[test]
	fn add_and_sub_happy_path() {
		let a = AssetAmount::new(100, sym("COIN"));
		let b = AssetAmount::new(50, sym("COIN"));
		assert_eq!(a.checked_add(&b).unwrap().amount.0, 150);
		assert_eq!(a.checked_sub(&b).unwrap().amount.0, 50);
	}
}
