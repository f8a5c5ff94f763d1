//! Typed object store with multi-index access and reversible write sessions
//! (spec §4.1). Each entity kind lives in its own [`Table`]; the enclosing
//! [`ChainDb`] (defined in the `chain` crate, which composes many tables)
//! implements [`SessionHost`] to open/commit/discard sessions across every
//! table atomically.

pub mod session;
pub mod table;

pub use session::{Session, SessionHost};
pub use table::{Checkpoint, Table};
