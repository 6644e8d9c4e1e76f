use anyhow::{bail, Context, Result};
use dashmap::DashMap;
use std::io::SeekFrom;
use std::path::PathBuf;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use uuid::Uuid;

use super::types::CheckoutSession;

/// Issues session ids and tracks every outstanding checkout for one node.
pub struct SessionManager {
    dir: PathBuf,
    sessions: DashMap<i64, CheckoutSession>,
    next_id: AtomicI64,
}

impl SessionManager {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            sessions: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }

    /// Next monotonic session id. Ids are single-use per checkout.
    pub fn new_session_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Opens `[start, end)` of `filename` under `session_id`, pinning `version`,
    /// and returns exactly `end - start` bytes read from offset `start`.
    pub async fn open(
        &self,
        filename: &str,
        start: u64,
        end: u64,
        session_id: i64,
        version: i64,
    ) -> Result<Vec<u8>> {
        if self.sessions.contains_key(&session_id) {
            bail!("session {} already has an open checkout", session_id);
        }

        let path = self.dir.join(filename);
        let size = fs::metadata(&path)
            .await
            .with_context(|| format!("cannot stat {} for checkout", filename))?
            .len();

        if start >= end || end > size {
            bail!(
                "byte range [{}, {}) is invalid for {} ({} bytes)",
                start,
                end,
                filename,
                size
            );
        }

        let mut file = fs::File::open(&path)
            .await
            .with_context(|| format!("cannot open {} for random access", filename))?;
        file.seek(SeekFrom::Start(start)).await?;

        let mut data = vec![0u8; (end - start) as usize];
        file.read_exact(&mut data)
            .await
            .with_context(|| format!("short read on {} range [{}, {})", filename, start, end))?;

        self.sessions.insert(
            session_id,
            CheckoutSession {
                filename: filename.to_string(),
                start,
                end,
                version_at_open: version,
            },
        );

        tracing::debug!(
            "Session {} opened {} [{}, {}) at version {}",
            session_id,
            filename,
            start,
            end,
            version
        );

        Ok(data)
    }

    /// Removes and returns the checkout for `session_id`. Called once per
    /// commit attempt; the session does not survive a failed commit.
    pub fn take(&self, session_id: i64) -> Option<CheckoutSession> {
        self.sessions.remove(&session_id).map(|(_, session)| session)
    }

    /// Number of outstanding checkouts.
    pub fn open_count(&self) -> usize {
        self.sessions.len()
    }

    /// Replaces bytes `[start, end)` of the session's file with `new_bytes`,
    /// which may grow or shrink the file. Writes to a temp path and atomically
    /// renames over the original on success.
    pub async fn splice(&self, session: &CheckoutSession, new_bytes: &[u8]) -> Result<()> {
        let path = self.dir.join(&session.filename);
        let original = fs::read(&path)
            .await
            .with_context(|| format!("cannot read {} for splice", session.filename))?;

        let start = session.start as usize;
        let end = session.end as usize;
        if end > original.len() {
            bail!(
                "splice range [{}, {}) exceeds current size of {} ({} bytes)",
                start,
                end,
                session.filename,
                original.len()
            );
        }

        let mut spliced = Vec::with_capacity(original.len() - (end - start) + new_bytes.len());
        spliced.extend_from_slice(&original[..start]);
        spliced.extend_from_slice(new_bytes);
        spliced.extend_from_slice(&original[end..]);

        let tmp = self.dir.join(format!(".splice-{}", Uuid::new_v4()));
        fs::write(&tmp, &spliced)
            .await
            .with_context(|| format!("failed to write splice temp for {}", session.filename))?;

        match fs::rename(&tmp, &path).await {
            Ok(()) => Ok(()),
            Err(e) => {
                let _ = fs::remove_file(&tmp).await;
                Err(e).with_context(|| format!("failed to replace {}", session.filename))
            }
        }
    }
}
