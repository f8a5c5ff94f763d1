//! Recent-block-hash index used for transaction-expiration and
//! reference-block checks (spec §3.2, §4.3 "Transactions").

use chain_common::crypto::ObjectId160;
use serde::{Deserialize, Serialize};

/// One slot of a ring buffer keyed by `block_number % HISTORY_LEN`, recording
/// the id of the block at that height so a transaction's `ref_block_num` /
/// `ref_block_prefix` can be checked without scanning the full block log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSummary {
	pub block_number: u32,
	pub block_id: ObjectId160,
}
