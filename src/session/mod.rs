//! Checkout Session Module
//!
//! Tracks open-for-edit claims on byte ranges of served files. A client obtains a
//! monotonically increasing session id, opens a range `[start, end)` of one file
//! (capturing the file's version at that instant), edits the bytes externally,
//! and submits the replacement under the same id. The session is consumed by the
//! commit whether it succeeds or not; a rejected commit requires a fresh checkout.
//!
//! The splice that folds committed bytes back into the file writes to a temp path
//! and renames over the original, so readers never observe a half-written file.

pub mod manager;
pub mod types;

pub use manager::SessionManager;
pub use types::CheckoutSession;

#[cfg(test)]
mod tests;
