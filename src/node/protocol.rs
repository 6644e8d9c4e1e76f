//! File Server Network Protocol
//!
//! Defines the API endpoints and Data Transfer Objects (DTOs) for the
//! remote-callable file-server surface (listings, version queries, checkout
//! commits, replica purge/pull, transfer negotiation).
//!
//! These structures are serialized via JSON and sent over HTTP; the same method
//! table is used by clients and by peer nodes, so every node speaks exactly the
//! protocol it serves.

use serde::{Deserialize, Serialize};

// --- API Endpoints ---

/// Node identity (host:port string).
pub const ENDPOINT_ADDRESS: &str = "/address";
/// Liveness probe; also used for round-trip latency measurement.
pub const ENDPOINT_PING: &str = "/ping";
/// Non-hidden files in this node's served directory.
pub const ENDPOINT_LOCAL_FILES: &str = "/files/local";
/// Union of local listings across this node and every known peer.
pub const ENDPOINT_ALL_FILES: &str = "/files/all";
/// Known peer addresses.
pub const ENDPOINT_PEERS: &str = "/peers";
/// Gossip join entry point.
pub const ENDPOINT_JOIN: &str = "/peers/join";
/// Local filesystem check for one file.
pub const ENDPOINT_HAS_FILE: &str = "/file/has";
/// Tracked ledger version for one file.
pub const ENDPOINT_FILE_VERSION: &str = "/file/version";
/// Exact version match check used by the commit protocol.
pub const ENDPOINT_CHECK_VERSION: &str = "/file/check";
/// Size in bytes of a locally held file.
pub const ENDPOINT_FILE_SIZE: &str = "/file/size";
/// Delete the local copy and drop its ledger entry.
pub const ENDPOINT_PURGE_FILE: &str = "/file/purge";
/// Ensure a local copy exists, pulling from the best peer if necessary.
pub const ENDPOINT_PULL_FILE: &str = "/file/pull";
/// Issue a fresh checkout session id.
pub const ENDPOINT_NEW_SESSION: &str = "/session/new";
/// Open a byte range for edit under a session id.
pub const ENDPOINT_OPEN_FILE: &str = "/file/open";
/// Commit edited bytes for a session.
pub const ENDPOINT_CLOSE_FILE: &str = "/file/close";
/// Start a bulk-transfer listener for one file.
pub const ENDPOINT_OPEN_TRANSFER: &str = "/transfer/open";
/// Release a bulk-transfer listener.
pub const ENDPOINT_CLOSE_TRANSFER: &str = "/transfer/close";

// --- Data Transfer Objects ---

#[derive(Debug, Serialize, Deserialize)]
pub struct AddressResponse {
    pub address: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PingResponse {
    pub alive: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FileListResponse {
    pub files: Vec<String>,
}

/// One `(origin, filename)` pair in the cluster-wide listing. The same filename
/// may appear under several origins; callers disambiguate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileOrigin {
    pub origin: String,
    pub filename: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AllFilesResponse {
    pub entries: Vec<FileOrigin>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PeerListResponse {
    pub peers: Vec<String>,
}

/// Sent by a node announcing itself (or a transitively discovered address) to a
/// peer. The receiving node runs its own gossip join against `addr`.
#[derive(Debug, Serialize, Deserialize)]
pub struct JoinRequest {
    pub addr: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JoinResponse {
    pub success: bool,
}

/// Request naming a single file, used by the has/version/size/purge/pull calls.
#[derive(Debug, Serialize, Deserialize)]
pub struct FileRequest {
    pub filename: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HasFileResponse {
    pub present: bool,
}

/// `version` is `None` when the file is purged or untracked on that node.
#[derive(Debug, Serialize, Deserialize)]
pub struct VersionResponse {
    pub version: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckVersionRequest {
    pub filename: String,
    pub version: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckVersionResponse {
    pub matches: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FileSizeResponse {
    pub size: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PurgeResponse {
    pub purged: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PullResponse {
    pub fetched: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NewSessionResponse {
    pub session_id: i64,
}

/// Checkout request: read `[start, end)` of `filename` under `session_id`.
#[derive(Debug, Serialize, Deserialize)]
pub struct OpenFileRequest {
    pub filename: String,
    pub start: u64,
    pub end: u64,
    pub session_id: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OpenFileResponse {
    pub data: Vec<u8>,
}

/// Commit request: splice `data` over the range recorded for `session_id`.
#[derive(Debug, Serialize, Deserialize)]
pub struct CloseFileRequest {
    pub data: Vec<u8>,
    pub session_id: i64,
}

/// `committed` is false on a version conflict; the client must re-open.
#[derive(Debug, Serialize, Deserialize)]
pub struct CloseFileResponse {
    pub committed: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OpenTransferRequest {
    pub filename: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OpenTransferResponse {
    pub port: u16,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CloseTransferRequest {
    pub port: u16,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CloseTransferResponse {
    pub success: bool,
}
