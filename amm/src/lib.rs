//! Automated-market-maker math: constant-product liquidity pools and
//! interest-bearing credit pools (spec §4.6.5, §4.6.6). Kept as a separate,
//! pure crate from chain state the way the teacher's `state-chain/amm` crate
//! is kept separate from pallet storage — both for unit-testability and
//! because this math is consensus critical and must stay deterministic.

pub mod credit_pool;
pub mod liquidity_pool;

pub use credit_pool::CreditPool;
pub use liquidity_pool::LiquidityPool;
