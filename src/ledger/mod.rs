//! Version Ledger Module
//!
//! Keeps a durable `filename -> version` table for every non-hidden file in the
//! served directory. Versions start at 1 and only ever move forward on this node's
//! commit path; a missing entry means the file was purged or never tracked.
//!
//! ## Persistence
//! - **Format**: one `name|version` line per tracked file in a hidden `.versions`
//!   file inside the served directory.
//! - **Durability**: the whole table is rewritten on every mutation. The table is
//!   small and mutations are rare relative to reads, so wholesale rewrites are
//!   acceptable; a crash mid-rewrite can corrupt the file (documented risk).

pub mod store;

pub use store::{is_hidden, is_valid_filename, VersionLedger, LEDGER_FILE, VERSION_REMOVED};
