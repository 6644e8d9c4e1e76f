//! Networked Peer File Server Library
//!
//! This library crate defines the core modules that make up one file-serving node.
//! It serves as the foundation for the binary executable (`main.rs`).
//!
//! ## Architecture Modules
//! The system is composed of five loosely coupled subsystems:
//!
//! - **`ledger`**: The durable per-file version table. Seeded from a directory scan
//!   at startup and rewritten on every mutation, it is the single source of truth
//!   for "which copy of a file is newest".
//! - **`transfer`**: The raw-socket bulk copy channel. Serves one file to exactly one
//!   consumer per ephemeral listener, framed with an 8-byte length header.
//! - **`peers`**: The membership layer. Grows the peer set through transitive
//!   work-queue joins until every reachable node knows every other.
//! - **`session`**: The checkout bookkeeping. Tracks open byte-range edits and
//!   performs the splice that folds committed bytes back into a file.
//! - **`node`**: The externally callable surface. Composes the other subsystems and
//!   exposes the full file-server method table over HTTP.

pub mod ledger;
pub mod node;
pub mod peers;
pub mod session;
pub mod transfer;
