//! The error kinds enumerated in the core's error handling design (spec §7).
//!
//! Every fallible operation in the workspace returns [`ChainResult`]. A
//! failure at any point inside a write session aborts the current operation
//! and is expected to be matched by the caller to discard the session that
//! was open when it occurred (see `chain_store::Session`).

/// Tags an error with the file/line it was raised at, in the spirit of the
/// teacher's `here!()` macro (`engine/src/errors.rs`), generalized from a
/// bare string literal into a constructor for [`ChainError::detail`].
#[macro_export]
macro_rules! here {
    () => {
        concat!("at ", file!(), " line ", line!())
    };
}

pub type ChainResult<T> = Result<T, ChainError>;

#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("invalid encoding: {0}")]
    InvalidEncoding(String),

    #[error("transaction expired")]
    Expired,

    #[error("tapos mismatch: ref_block_num/prefix do not match a known block summary")]
    TaposMismatch,

    #[error("duplicate transaction")]
    DuplicateTransaction,

    #[error("transaction would exceed the current maximum block size")]
    ExceedsBlockSize,

    #[error("authority insufficient: {0}")]
    AuthorityInsufficient(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unique key violation: {0}")]
    UniqueKeyViolation(String),

    #[error("insufficient balance: {0}")]
    InsufficientBalance(String),

    #[error("insufficient collateral: {0}")]
    InsufficientCollateral(String),

    #[error("operation would trigger black swan settlement")]
    WouldTriggerBlackSwan,

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("fork switch failed, previous branch restored: {0}")]
    ForkSwitchFailed(String),

    #[error("unknown hardfork: {0}")]
    UnknownHardfork(u32),

    #[error("mismatched asset symbols: {0} vs {1}")]
    MismatchedSymbols(String, String),

    #[error("symbol already in use: {0}")]
    SymbolInUse(String),

    #[error("invalid name: {0}")]
    InvalidName(String),

    #[error("arithmetic overflow: {0}")]
    Overflow(String),

    #[error("invalid block: {0}")]
    InvalidBlock(String),
}
