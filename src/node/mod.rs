//! Node Service Module
//!
//! The externally callable surface of one file-serving node. Composes the
//! version ledger, checkout sessions, peer registry, and bulk-transfer channel,
//! and exposes the full method table over HTTP/JSON.
//!
//! ## Commit cycle
//! The commit path (`closeFile`) is the most failure-sensitive operation: it
//! revalidates the session's version against this node and every peer currently
//! holding the file, purges the holders, splices the edited bytes in, bumps the
//! version, and triggers a re-pull on each purged peer, so no peer is left
//! serving stale bytes once a commit succeeds.
//!
//! Purge and re-pull are best effort: a holder whose purge RPC fails keeps its
//! superseded copy until it next purges or pulls on its own. The failure is
//! logged at error severity since it breaks freshness for that peer.

pub mod handlers;
pub mod protocol;
pub mod service;

pub use handlers::router;
pub use service::NodeService;
