//! Short textual identifiers: account names and asset symbols (spec §3.1).

use std::fmt;

use codec::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::error::{ChainError, ChainResult};

/// Maximum length of an account name, in bytes.
pub const MAX_ACCOUNT_NAME_LEN: usize = 16;
/// Maximum length of a standard asset symbol, in bytes.
pub const MAX_ASSET_SYMBOL_LEN: usize = 8;
/// Prefix used for a liquidity pool's derived share asset, e.g. `LP.COIN.USD`.
pub const LIQUIDITY_POOL_ASSET_PREFIX: &str = "LP.";
/// Prefix used for a credit pool's derived share asset, e.g. `CREDIT.COIN`.
pub const CREDIT_POOL_ASSET_PREFIX: &str = "CREDIT.";

/// An account name: lowercase ASCII letters, digits and `-`, dot-separated
/// segments, at most [`MAX_ACCOUNT_NAME_LEN`] bytes total.
#[derive(
	Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Encode, Decode, Serialize, Deserialize,
)]
pub struct AccountName(String);

impl AccountName {
	pub fn new(name: impl Into<String>) -> ChainResult<Self> {
		let name = name.into();
		if name.is_empty() || name.len() > MAX_ACCOUNT_NAME_LEN {
			return Err(ChainError::InvalidName(name));
		}
		let valid = name
			.split('.')
			.all(|segment| is_valid_name_segment(segment));
		if !valid {
			return Err(ChainError::InvalidName(name));
		}
		Ok(Self(name))
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

fn is_valid_name_segment(segment: &str) -> bool {
	if segment.is_empty() {
		return false;
	}
	let bytes = segment.as_bytes();
	let first_ok = bytes[0].is_ascii_lowercase();
	let last_ok = bytes[bytes.len() - 1] != b'-';
	let body_ok = bytes
		.iter()
		.all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || *b == b'-');
	first_ok && last_ok && body_ok
}

impl fmt::Display for AccountName {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// An asset symbol. Standard assets are bare uppercase tickers (`COIN`,
/// `USD`); derived liquidity-pool and credit-pool assets carry the
/// [`LIQUIDITY_POOL_ASSET_PREFIX`]/[`CREDIT_POOL_ASSET_PREFIX`] prefixes.
#[derive(
	Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Encode, Decode, Serialize, Deserialize,
)]
pub struct AssetSymbol(String);

impl AssetSymbol {
	pub fn new(symbol: impl Into<String>) -> ChainResult<Self> {
		let symbol = symbol.into();
		if symbol.is_empty() {
			return Err(ChainError::InvalidName(symbol));
		}
		let core = symbol
			.strip_prefix(LIQUIDITY_POOL_ASSET_PREFIX)
			.or_else(|| symbol.strip_prefix(CREDIT_POOL_ASSET_PREFIX))
			.unwrap_or(&symbol);
		if core.is_empty()
			|| core.len() > MAX_ASSET_SYMBOL_LEN * 2
			|| !core.chars().all(|c| c.is_ascii_uppercase() || c == '.')
		{
			return Err(ChainError::InvalidName(symbol));
		}
		Ok(Self(symbol))
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}

	pub fn is_liquidity_pool_asset(&self) -> bool {
		self.0.starts_with(LIQUIDITY_POOL_ASSET_PREFIX)
	}

	pub fn is_credit_pool_asset(&self) -> bool {
		self.0.starts_with(CREDIT_POOL_ASSET_PREFIX)
	}

	/// Derives the liquidity-pool share symbol for a `(symbol_a, symbol_b)` pair.
	pub fn liquidity_pool_asset(symbol_a: &AssetSymbol, symbol_b: &AssetSymbol) -> Self {
		Self(format!(
			"{LIQUIDITY_POOL_ASSET_PREFIX}{}.{}",
			symbol_a.as_str(),
			symbol_b.as_str()
		))
	}

	/// Derives the credit-pool share symbol for a base asset.
	pub fn credit_pool_asset(base: &AssetSymbol) -> Self {
		Self(format!("{CREDIT_POOL_ASSET_PREFIX}{}", base.as_str()))
	}
}

impl fmt::Display for AssetSymbol {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn account_name_accepts_dotted_segments() {
		assert!(AccountName::new("alice").is_ok());
		assert!(AccountName::new("alice.witness").is_ok());
		assert!(AccountName::new("a-b-c").is_ok());
	}

	#[test]
	fn account_name_rejects_invalid_forms() {
		assert!(AccountName::new("").is_err());
		assert!(AccountName::new("Alice").is_err());
		assert!(AccountName::new("-alice").is_err());
		assert!(AccountName::new("alice-").is_err());
		assert!(AccountName::new("this-name-is-too-long-for-sure").is_err());
	}

	#[test]
	fn asset_symbol_prefixes_round_trip() {
		let coin = AssetSymbol::new("COIN").unwrap();
		let usd = AssetSymbol::new("USD").unwrap();
		let lp = AssetSymbol::liquidity_pool_asset(&coin, &usd);
		assert!(lp.is_liquidity_pool_asset());
		assert_eq!(lp.as_str(), "LP.COIN.USD");

		let credit = AssetSymbol::credit_pool_asset(&coin);
		assert!(credit.is_credit_pool_asset());
		assert_eq!(credit.as_str(), "CREDIT.COIN");
	}
}
