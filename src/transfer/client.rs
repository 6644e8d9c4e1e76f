use anyhow::{bail, Context, Result};
use std::path::Path;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use uuid::Uuid;

const COPY_BUF_SIZE: usize = 64 * 1024;

/// Requesting side of the bulk-transfer protocol.
///
/// Connects to `host:port`, reads the 8-byte big-endian length header, then reads
/// exactly that many bytes into `dest`. The bytes land in a hidden temp file that
/// is renamed over `dest` only on success, so a dropped connection never leaves a
/// partial file behind. Returns the number of bytes received.
pub async fn fetch_file(host: &str, port: u16, dest: &Path) -> Result<u64> {
    let mut stream = TcpStream::connect((host, port))
        .await
        .with_context(|| format!("failed to connect to transfer socket {}:{}", host, port))?;

    let mut header = [0u8; 8];
    stream
        .read_exact(&mut header)
        .await
        .context("failed to read transfer length header")?;
    let declared = u64::from_be_bytes(header);

    let parent = dest
        .parent()
        .context("destination path has no parent directory")?;
    let tmp = parent.join(format!(".pull-{}", Uuid::new_v4()));

    let result = copy_exact(&mut stream, &tmp, declared).await;
    match result {
        Ok(()) => {
            tokio::fs::rename(&tmp, dest)
                .await
                .with_context(|| format!("failed to move pulled file into {}", dest.display()))?;
            Ok(declared)
        }
        Err(e) => {
            let _ = tokio::fs::remove_file(&tmp).await;
            Err(e)
        }
    }
}

async fn copy_exact(stream: &mut TcpStream, tmp: &Path, declared: u64) -> Result<()> {
    let mut file = tokio::fs::File::create(tmp)
        .await
        .with_context(|| format!("failed to create temp file {}", tmp.display()))?;

    let mut remaining = declared;
    let mut buf = vec![0u8; COPY_BUF_SIZE];
    while remaining > 0 {
        let want = remaining.min(buf.len() as u64) as usize;
        let read = stream.read(&mut buf[..want]).await?;
        if read == 0 {
            bail!(
                "partial transfer: peer declared {} byte(s) but closed after {}",
                declared,
                declared - remaining
            );
        }
        file.write_all(&buf[..read]).await?;
        remaining -= read as u64;
    }
    file.flush().await?;
    Ok(())
}
