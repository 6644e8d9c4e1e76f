use anyhow::{bail, Context, Result};
use dashmap::DashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

/// How long an unreleased listener may linger before it is reclaimed.
const LISTENER_TTL: Duration = Duration::from_secs(30);

/// Number of ports reserved for concurrent outbound transfers.
pub const PORT_POOL_SIZE: u16 = 16;

/// Serving side of the bulk-transfer protocol: owns the transfer port pool and
/// the currently live listeners.
pub struct TransferRegistry {
    dir: PathBuf,
    pool_start: u16,
    active: DashMap<u16, oneshot::Sender<()>>,
}

impl TransferRegistry {
    pub fn new(dir: PathBuf, pool_start: u16) -> Arc<Self> {
        Arc::new(Self {
            dir,
            pool_start,
            active: DashMap::new(),
        })
    }

    /// Reserves a free port, binds a listener on it, and returns the port number
    /// immediately. A spawned task accepts exactly one connection and streams the
    /// file to it. Fails when the pool is exhausted or the file is unreadable.
    pub async fn open_socket_file(self: &Arc<Self>, filename: &str) -> Result<u16> {
        let path = self.dir.join(filename);
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            bail!("cannot serve {}: file does not exist", filename);
        }

        // Clip the pool at the top of the port space instead of wrapping.
        let pool_end = self.pool_start.saturating_add(PORT_POOL_SIZE);
        for port in self.pool_start..pool_end {
            if self.active.contains_key(&port) {
                continue;
            }
            let listener = match TcpListener::bind(("0.0.0.0", port)).await {
                Ok(listener) => listener,
                // Port taken by another process; try the next one in the pool.
                Err(_) => continue,
            };

            let (close_tx, close_rx) = oneshot::channel();
            self.active.insert(port, close_tx);

            let registry = self.clone();
            let path = path.clone();
            tokio::spawn(async move {
                registry.run_listener(listener, path, port, close_rx).await;
            });

            tracing::debug!("Transfer listener for {:?} opened on port {}", filename, port);
            return Ok(port);
        }

        bail!("transfer port pool exhausted ({} ports in use)", PORT_POOL_SIZE)
    }

    /// Releases the listener on `port`. Safe to call for a port that already
    /// expired or was never allocated.
    pub fn close_socket(&self, port: u16) {
        if let Some((_, close_tx)) = self.active.remove(&port) {
            let _ = close_tx.send(());
            tracing::debug!("Transfer listener on port {} released", port);
        }
    }

    /// Number of listeners currently holding a reserved port.
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    async fn run_listener(
        self: Arc<Self>,
        listener: TcpListener,
        path: PathBuf,
        port: u16,
        mut close_rx: oneshot::Receiver<()>,
    ) {
        let ttl = tokio::time::sleep(LISTENER_TTL);
        tokio::pin!(ttl);
        let mut served = false;

        loop {
            tokio::select! {
                _ = &mut close_rx => break,
                _ = &mut ttl => {
                    if !served {
                        tracing::warn!("Transfer listener on port {} expired unused", port);
                    }
                    break;
                }
                accepted = listener.accept(), if !served => {
                    match accepted {
                        Ok((mut stream, remote)) => {
                            served = true;
                            match stream_file(&mut stream, &path).await {
                                Ok(sent) => tracing::info!(
                                    "Served {} byte(s) of {} to {}",
                                    sent,
                                    path.display(),
                                    remote
                                ),
                                Err(e) => tracing::warn!(
                                    "Transfer of {} to {} failed: {}",
                                    path.display(),
                                    remote,
                                    e
                                ),
                            }
                        }
                        Err(e) => {
                            tracing::warn!("Accept failed on transfer port {}: {}", port, e);
                            break;
                        }
                    }
                }
            }
        }

        self.active.remove(&port);
    }
}

/// Writes the length header and the file bytes to one connected consumer.
async fn stream_file(stream: &mut TcpStream, path: &std::path::Path) -> Result<u64> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;

    let len = bytes.len() as u64;
    stream.write_all(&len.to_be_bytes()).await?;
    stream.write_all(&bytes).await?;
    stream.flush().await?;
    stream.shutdown().await?;
    Ok(len)
}
