use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;
use tokio::sync::Mutex;

use crate::ledger::{is_hidden, is_valid_filename, VersionLedger, VERSION_REMOVED};
use crate::node::protocol::FileOrigin;
use crate::peers::{PeerClient, PeerRegistry};
use crate::session::SessionManager;
use crate::transfer::{self, TransferRegistry, PORT_POOL_SIZE};

/// Offset from the RPC port where this node's transfer port pool begins.
const TRANSFER_POOL_OFFSET: u16 = 1000;
/// Pool base used when the RPC port is too high to offset safely.
const TRANSFER_POOL_FALLBACK: u16 = 17_800;

/// One running file-server node: the composition of ledger, sessions, peers, and
/// transfer channel, exposing the externally callable surface.
pub struct NodeService {
    address: String,
    dir: PathBuf,
    pub ledger: VersionLedger,
    pub sessions: SessionManager,
    pub peers: PeerRegistry,
    pub transfers: Arc<TransferRegistry>,
    /// Serializes the check-then-increment commit sequence on this node.
    commit_lock: Mutex<()>,
}

impl NodeService {
    pub async fn new(dir: PathBuf, address: String) -> Result<Arc<Self>> {
        let ledger = VersionLedger::load(&dir).await?;

        let rpc_port: Option<u16> = address
            .rsplit_once(':')
            .and_then(|(_, port)| port.parse().ok());
        let pool_start = rpc_port
            .and_then(|port| port.checked_add(TRANSFER_POOL_OFFSET))
            .filter(|start| start.checked_add(PORT_POOL_SIZE).is_some())
            .unwrap_or(TRANSFER_POOL_FALLBACK);

        Ok(Arc::new(Self {
            sessions: SessionManager::new(dir.clone()),
            peers: PeerRegistry::new(address.clone()),
            transfers: TransferRegistry::new(dir.clone(), pool_start),
            ledger,
            address,
            dir,
            commit_lock: Mutex::new(()),
        }))
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Non-hidden regular files in the served directory, sorted by name.
    pub async fn list_local_files(&self) -> Result<Vec<String>> {
        let mut files = Vec::new();
        let mut entries = fs::read_dir(&self.dir)
            .await
            .with_context(|| format!("failed to list {}", self.dir.display()))?;

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if is_hidden(&name) || !entry.file_type().await?.is_file() {
                continue;
            }
            files.push(name);
        }

        files.sort();
        Ok(files)
    }

    /// Every `(origin, filename)` pair across this node and all known peers.
    /// Duplicate filenames are preserved under each origin; unreachable peers
    /// are skipped with a warning.
    pub async fn list_all_files(&self) -> Vec<FileOrigin> {
        let mut entries = Vec::new();

        match self.list_local_files().await {
            Ok(files) => entries.extend(files.into_iter().map(|filename| FileOrigin {
                origin: self.address.clone(),
                filename,
            })),
            Err(e) => tracing::error!("Failed to list local files: {}", e),
        }

        for client in self.peers.clients() {
            match client.list_local_files().await {
                Ok(files) => entries.extend(files.into_iter().map(|filename| FileOrigin {
                    origin: client.addr().to_string(),
                    filename,
                })),
                Err(e) => {
                    tracing::warn!("Peer {} listing failed: {}", client.addr(), e);
                }
            }
        }

        entries
    }

    /// Filesystem check: does this node currently hold a servable copy?
    pub async fn has_file(&self, filename: &str) -> bool {
        if !is_valid_filename(filename) {
            return false;
        }
        match fs::metadata(self.dir.join(filename)).await {
            Ok(meta) => meta.is_file(),
            Err(_) => false,
        }
    }

    /// Size in bytes of a locally held file, or `None` when absent.
    pub async fn file_size(&self, filename: &str) -> Option<u64> {
        if !is_valid_filename(filename) {
            return None;
        }
        match fs::metadata(self.dir.join(filename)).await {
            Ok(meta) if meta.is_file() => Some(meta.len()),
            _ => None,
        }
    }

    /// Deletes the local copy and drops its ledger entry. Returns true when a
    /// file was actually removed.
    pub async fn purge_file(&self, filename: &str) -> Result<bool> {
        if !self.has_file(filename).await {
            // Keep the ledger consistent even if only the entry lingers.
            self.ledger.set_version(filename, VERSION_REMOVED).await?;
            return Ok(false);
        }

        fs::remove_file(self.dir.join(filename))
            .await
            .with_context(|| format!("failed to remove {}", filename))?;
        self.ledger.set_version(filename, VERSION_REMOVED).await?;
        tracing::info!("Purged local copy of {}", filename);
        Ok(true)
    }

    /// Ensures a local copy of `filename` exists.
    ///
    /// When absent, scans all known peers for holders, picks the one reporting
    /// the strictly highest version (ties go to the first in iteration order,
    /// since replicas converge at a given version number), and bulk-transfers
    /// from it. Returns false when no peer holds the file.
    pub async fn get_file(&self, filename: &str) -> Result<bool> {
        if !is_valid_filename(filename) {
            return Ok(false);
        }
        if self.has_file(filename).await {
            return Ok(true);
        }

        let mut best: Option<(PeerClient, i64)> = None;
        for client in self.peers.clients() {
            match client.has_file(filename).await {
                Ok(true) => match client.get_version(filename).await {
                    Ok(Some(version)) => {
                        if best.as_ref().map_or(true, |(_, b)| version > *b) {
                            best = Some((client, version));
                        }
                    }
                    Ok(None) => {
                        // Holder without a ledger entry: purged mid-scan, skip.
                    }
                    Err(e) => {
                        tracing::warn!("Version query on {} failed: {}", client.addr(), e);
                    }
                },
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!("hasFile probe on {} failed: {}", client.addr(), e);
                }
            }
        }

        let Some((source, version)) = best else {
            tracing::info!("No peer holds {}", filename);
            return Ok(false);
        };

        let port = source
            .open_socket_file(filename)
            .await
            .with_context(|| format!("peer {} refused transfer of {}", source.addr(), filename))?;

        let dest = self.dir.join(filename);
        let pulled = transfer::fetch_file(source.host(), port, &dest).await;

        if let Err(e) = source.close_socket(port).await {
            tracing::warn!("Failed to release transfer port {} on {}: {}", port, source.addr(), e);
        }

        let received = pulled
            .with_context(|| format!("bulk transfer of {} from {} failed", filename, source.addr()))?;
        self.ledger.set_version(filename, version).await?;

        tracing::info!(
            "Pulled {} ({} byte(s)) at version {} from {}",
            filename,
            received,
            version,
            source.addr()
        );
        Ok(true)
    }

    /// Opens `[start, end)` of `filename` for edit under `session_id`, pulling
    /// the file from a peer first when it is not held locally. Returns `None`
    /// when the file exists nowhere in the cluster.
    pub async fn open_file(
        &self,
        filename: &str,
        start: u64,
        end: u64,
        session_id: i64,
    ) -> Result<Option<Vec<u8>>> {
        if !self.has_file(filename).await && !self.get_file(filename).await? {
            return Ok(None);
        }

        let version = self.ledger.ensure_tracked(filename).await?;
        let data = self
            .sessions
            .open(filename, start, end, session_id, version)
            .await?;
        Ok(Some(data))
    }

    /// Commit path: revalidates the session's version locally and on every peer
    /// currently holding the file, purges the holders, splices the new bytes in,
    /// bumps the version, and triggers a re-pull on each purged peer.
    ///
    /// Returns `Ok(false)` on a version conflict or unknown session; the caller
    /// must check out again. I/O failures surface as errors.
    pub async fn close_file(&self, data: &[u8], session_id: i64) -> Result<bool> {
        let _commit = self.commit_lock.lock().await;

        let Some(session) = self.sessions.take(session_id) else {
            tracing::warn!("Commit for unknown session {}", session_id);
            return Ok(false);
        };
        let filename = session.filename.as_str();

        // Local revalidation first; the ledger lock is released before any
        // network traffic below.
        if !self.ledger.check_version(filename, session.version_at_open).await {
            tracing::info!(
                "Commit rejected: {} moved past version {} locally",
                filename,
                session.version_at_open
            );
            return Ok(false);
        }

        // Cross-peer revalidation. Peers that do not answer hasFile are treated
        // as not holding a copy; a holder that cannot confirm the version aborts
        // the commit, since it could be left serving stale bytes.
        let mut holders = Vec::new();
        for client in self.peers.clients() {
            match client.has_file(filename).await {
                Ok(true) => match client.check_version(filename, session.version_at_open).await {
                    Ok(true) => holders.push(client),
                    Ok(false) => {
                        tracing::info!(
                            "Commit rejected: {} at different version on {}",
                            filename,
                            client.addr()
                        );
                        return Ok(false);
                    }
                    Err(e) => {
                        tracing::warn!(
                            "Version check on holder {} failed, aborting commit: {}",
                            client.addr(),
                            e
                        );
                        return Ok(false);
                    }
                },
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!("hasFile probe on {} failed: {}", client.addr(), e);
                }
            }
        }

        // Purge every confirmed holder so no peer can serve the old bytes. A
        // holder whose purge fails is left serving the superseded version
        // until it purges or re-pulls on its own, so escalate the log.
        let mut purged = Vec::new();
        for client in holders {
            match client.purge_file(filename).await {
                Ok(_) => purged.push(client),
                Err(e) => {
                    tracing::error!(
                        "Purge of {} on {} failed, peer keeps a stale copy: {}",
                        filename,
                        client.addr(),
                        e
                    );
                }
            }
        }

        self.sessions.splice(&session, data).await?;
        let new_version = session.version_at_open + 1;
        self.ledger.set_version(filename, new_version).await?;
        tracing::info!("Committed {} at version {}", filename, new_version);

        // Purged peers pull the fresh copy back; best effort, they can also
        // recover lazily through their own getFile path.
        for client in purged {
            if let Err(e) = client.pull_file(filename).await {
                tracing::warn!(
                    "Re-sync pull of {} on {} failed: {}",
                    filename,
                    client.addr(),
                    e
                );
            }
        }

        Ok(true)
    }
}
