//! The chain core: object store, evaluators, consensus, and the block
//! pipeline that ties them together (spec §3, §4).

pub mod authority;
pub mod block;
pub mod blocklog;
pub mod consensus;
pub mod constants;
pub mod db;
pub mod entities;
pub mod evaluator;
pub mod forkdb;
pub mod jobs;
pub mod operation;
pub mod pipeline;
pub mod skip_flags;

pub use block::{Block, BlockHeader};
pub use db::ChainDb;
pub use operation::{Operation, Transaction};
pub use pipeline::Pipeline;
pub use skip_flags::SkipFlags;
