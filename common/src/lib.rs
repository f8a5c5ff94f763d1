//! Primitive value types shared by every crate in the workspace: fixed-point
//! share amounts, asset symbols and amounts, price ratios, account names,
//! time points, wide unsigned integers, and the cryptographic wrappers used
//! to identify blocks, transactions and accounts.

#[macro_use]
pub mod error;

pub mod amount;
pub mod crypto;
pub mod ids;
pub mod math;
pub mod price;
pub mod time;

pub use amount::{AssetAmount, ShareAmount};
pub use error::{ChainError, ChainResult};
pub use ids::{AccountName, AssetSymbol};
pub use math::{approx_sqrt, Uint256};
pub use price::Price;
pub use time::TimePoint;
