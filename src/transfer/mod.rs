//! Bulk Transfer Module
//!
//! Implements the one-shot raw-socket channel used to copy a whole file between
//! two nodes. The serving node reserves a port from a bounded pool, binds an
//! ephemeral listener, and streams an 8-byte big-endian length header followed by
//! the file bytes to exactly one consumer. The requester verifies the received
//! byte count against the header, so a dropped connection surfaces as an explicit
//! failure instead of a silently truncated file.
//!
//! ## Lifecycle
//! A listener lives until the requester releases it via `closeSocket`, or until an
//! idle timeout fires, whichever comes first. Ports are reserved for the lifetime
//! of their transfer; allocation fails when the pool is exhausted rather than
//! wrapping around onto a still-open port.

pub mod client;
pub mod listener;

pub use client::fetch_file;
pub use listener::{TransferRegistry, PORT_POOL_SIZE};

#[cfg(test)]
mod tests;
