use anyhow::{anyhow, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

use crate::node::protocol::*;

/// Timeout for quick control calls (probes, version checks, listings).
const CONTROL_TIMEOUT: Duration = Duration::from_secs(2);
/// Timeout for calls that may move file bytes on the remote side.
const SYNC_TIMEOUT: Duration = Duration::from_secs(10);
/// Attempts for calls that tolerate retries.
const RETRY_ATTEMPTS: usize = 3;

/// Live handle to one remote node: a thin typed wrapper over its HTTP surface.
///
/// Every address in the peer set has exactly one of these; the registry hands
/// out clones (cheap, the inner client is reference-counted).
#[derive(Clone)]
pub struct PeerClient {
    addr: String,
    http: reqwest::Client,
}

impl PeerClient {
    pub fn new(addr: &str) -> Self {
        Self {
            addr: addr.to_string(),
            http: reqwest::Client::new(),
        }
    }

    /// The peer's `host:port` address.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// The host part of the address, used for bulk-transfer connections.
    pub fn host(&self) -> &str {
        self.addr.rsplit_once(':').map(|(host, _)| host).unwrap_or(&self.addr)
    }

    pub async fn test_response(&self) -> Result<bool> {
        let resp: PingResponse = self.get_json(ENDPOINT_PING, CONTROL_TIMEOUT, 1).await?;
        Ok(resp.alive)
    }

    pub async fn get_ip_address(&self) -> Result<String> {
        let resp: AddressResponse = self.get_json(ENDPOINT_ADDRESS, CONTROL_TIMEOUT, 1).await?;
        Ok(resp.address)
    }

    pub async fn list_local_files(&self) -> Result<Vec<String>> {
        let resp: FileListResponse = self
            .get_json(ENDPOINT_LOCAL_FILES, CONTROL_TIMEOUT, 1)
            .await?;
        Ok(resp.files)
    }

    pub async fn list_connected(&self) -> Result<Vec<String>> {
        let resp: PeerListResponse = self.get_json(ENDPOINT_PEERS, CONTROL_TIMEOUT, 1).await?;
        Ok(resp.peers)
    }

    pub async fn join(&self, addr: &str) -> Result<bool> {
        let resp: JoinResponse = self
            .post_json(
                ENDPOINT_JOIN,
                &JoinRequest {
                    addr: addr.to_string(),
                },
                CONTROL_TIMEOUT,
                RETRY_ATTEMPTS,
            )
            .await?;
        Ok(resp.success)
    }

    pub async fn has_file(&self, filename: &str) -> Result<bool> {
        let resp: HasFileResponse = self
            .post_json(
                ENDPOINT_HAS_FILE,
                &FileRequest {
                    filename: filename.to_string(),
                },
                CONTROL_TIMEOUT,
                1,
            )
            .await?;
        Ok(resp.present)
    }

    pub async fn get_version(&self, filename: &str) -> Result<Option<i64>> {
        let resp: VersionResponse = self
            .post_json(
                ENDPOINT_FILE_VERSION,
                &FileRequest {
                    filename: filename.to_string(),
                },
                CONTROL_TIMEOUT,
                1,
            )
            .await?;
        Ok(resp.version)
    }

    pub async fn check_version(&self, filename: &str, version: i64) -> Result<bool> {
        let resp: CheckVersionResponse = self
            .post_json(
                ENDPOINT_CHECK_VERSION,
                &CheckVersionRequest {
                    filename: filename.to_string(),
                    version,
                },
                CONTROL_TIMEOUT,
                1,
            )
            .await?;
        Ok(resp.matches)
    }

    pub async fn purge_file(&self, filename: &str) -> Result<bool> {
        let resp: PurgeResponse = self
            .post_json(
                ENDPOINT_PURGE_FILE,
                &FileRequest {
                    filename: filename.to_string(),
                },
                CONTROL_TIMEOUT,
                RETRY_ATTEMPTS,
            )
            .await?;
        Ok(resp.purged)
    }

    /// Asks the peer to ensure it holds a current copy (the re-sync pull after a
    /// commit). The peer may bulk-transfer from anyone, so allow it time.
    pub async fn pull_file(&self, filename: &str) -> Result<bool> {
        let resp: PullResponse = self
            .post_json(
                ENDPOINT_PULL_FILE,
                &FileRequest {
                    filename: filename.to_string(),
                },
                SYNC_TIMEOUT,
                RETRY_ATTEMPTS,
            )
            .await?;
        Ok(resp.fetched)
    }

    pub async fn open_socket_file(&self, filename: &str) -> Result<u16> {
        let resp: OpenTransferResponse = self
            .post_json(
                ENDPOINT_OPEN_TRANSFER,
                &OpenTransferRequest {
                    filename: filename.to_string(),
                },
                CONTROL_TIMEOUT,
                1,
            )
            .await?;
        Ok(resp.port)
    }

    pub async fn close_socket(&self, port: u16) -> Result<()> {
        let _: CloseTransferResponse = self
            .post_json(
                ENDPOINT_CLOSE_TRANSFER,
                &CloseTransferRequest { port },
                CONTROL_TIMEOUT,
                RETRY_ATTEMPTS,
            )
            .await?;
        Ok(())
    }

    fn url(&self, endpoint: &str) -> String {
        format!("http://{}{}", self.addr, endpoint)
    }

    async fn post_json<T: Serialize, R: DeserializeOwned>(
        &self,
        endpoint: &str,
        payload: &T,
        timeout: Duration,
        attempts: usize,
    ) -> Result<R> {
        let mut delay_ms = 150u64;

        for attempt in 0..attempts {
            let response = self
                .http
                .post(self.url(endpoint))
                .json(payload)
                .timeout(timeout)
                .send()
                .await;

            match response {
                Ok(resp) => {
                    if !resp.status().is_success() {
                        return Err(anyhow!(
                            "{} on {} returned {}",
                            endpoint,
                            self.addr,
                            resp.status()
                        ));
                    }
                    return Ok(resp.json::<R>().await?);
                }
                Err(e) => {
                    if attempt + 1 == attempts {
                        return Err(anyhow!(e));
                    }
                    let jitter = rand::random::<u64>() % 50;
                    tokio::time::sleep(Duration::from_millis(delay_ms + jitter)).await;
                    delay_ms = (delay_ms * 2).min(1200);
                }
            }
        }

        Err(anyhow!("retry attempts exhausted"))
    }

    async fn get_json<R: DeserializeOwned>(
        &self,
        endpoint: &str,
        timeout: Duration,
        attempts: usize,
    ) -> Result<R> {
        let mut delay_ms = 150u64;

        for attempt in 0..attempts {
            let response = self
                .http
                .get(self.url(endpoint))
                .timeout(timeout)
                .send()
                .await;

            match response {
                Ok(resp) => {
                    if !resp.status().is_success() {
                        return Err(anyhow!(
                            "{} on {} returned {}",
                            endpoint,
                            self.addr,
                            resp.status()
                        ));
                    }
                    return Ok(resp.json::<R>().await?);
                }
                Err(e) => {
                    if attempt + 1 == attempts {
                        return Err(anyhow!(e));
                    }
                    let jitter = rand::random::<u64>() % 50;
                    tokio::time::sleep(Duration::from_millis(delay_ms + jitter)).await;
                    delay_ms = (delay_ms * 2).min(1200);
                }
            }
        }

        Err(anyhow!("retry attempts exhausted"))
    }
}
