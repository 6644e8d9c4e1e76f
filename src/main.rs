use npfs::node::{router, NodeService};
use std::net::SocketAddr;
use std::path::PathBuf;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args: Vec<String> = std::env::args().collect();

    let mut port: u16 = 1050;
    let mut host = "127.0.0.1".to_string();
    let mut dir = ".".to_string();
    let mut remotes: Vec<String> = vec![];

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-port" | "--port" => {
                port = args
                    .get(i + 1)
                    .ok_or_else(|| anyhow::anyhow!("-port requires a value"))?
                    .parse()?;
                i += 2;
            }
            "-host" | "--host" => {
                host = args
                    .get(i + 1)
                    .ok_or_else(|| anyhow::anyhow!("-host requires a value"))?
                    .clone();
                i += 2;
            }
            "-dir" | "--dir" => {
                dir = args
                    .get(i + 1)
                    .ok_or_else(|| anyhow::anyhow!("-dir requires a value"))?
                    .clone();
                i += 2;
            }
            "-remote" | "--remote" => {
                let hosts = args
                    .get(i + 1)
                    .ok_or_else(|| anyhow::anyhow!("-remote requires a value"))?;
                remotes.extend(hosts.split(',').map(str::to_string));
                i += 2;
            }
            "-h" | "--help" => {
                eprintln!(
                    "Usage: {} [-port <n>] [-host <name>] [-dir <path>] [-remote host:port[,host:port...]]",
                    args[0]
                );
                return Ok(());
            }
            _ => {
                i += 1;
            }
        }
    }

    let address = format!("{}:{}", host, port);
    let node = NodeService::new(PathBuf::from(&dir), address).await?;

    tracing::info!("Starting node {} serving directory {}", node.address(), dir);

    for remote in &remotes {
        tracing::info!("Connecting to {}", remote);
        if let Err(e) = node.peers.join(remote).await {
            tracing::error!("Failed to join {}: {}", remote, e);
        }
    }

    if !remotes.is_empty() {
        for (addr, elapsed) in node.peers.probe_latencies().await {
            tracing::info!("Peer {} round-trip {:?}", addr, elapsed);
        }
    }

    let app = router(node.clone());
    let bind_addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;

    tracing::info!("File server listening on {}", bind_addr);
    tracing::info!("Press Ctrl+C to shutdown");

    axum::serve(listener, app).await?;

    Ok(())
}
