//! Peer Membership Module
//!
//! Maintains the set of peer nodes known to this node and grows it through
//! transitive gossip: joining one peer pulls in every address that peer knows,
//! and makes the relation symmetric by announcing this node back to any peer
//! that had not seen it yet.
//!
//! ## Core Mechanisms
//! - **Work-queue join**: discovery is an explicit visited-set traversal, never
//!   call-stack recursion, so large peer graphs cannot blow the stack. Each
//!   address is joined at most once.
//! - **Best-effort fan-out**: an unreachable address is logged and skipped; only
//!   failure to reach the seed itself surfaces to the caller.
//! - **Latency probing**: peers can be ranked by measured `testResponse` round
//!   trips, remeasured on demand and never cached.

pub mod client;
pub mod registry;

pub use client::PeerClient;
pub use registry::PeerRegistry;
