use axum::{
    extract::Extension,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;

use super::protocol::*;
use super::service::NodeService;
use crate::ledger::is_valid_filename;

/// Builds the full remote-callable surface for one node.
pub fn router(node: Arc<NodeService>) -> Router {
    Router::new()
        .route(ENDPOINT_ADDRESS, get(handle_address))
        .route(ENDPOINT_PING, get(handle_ping))
        .route(ENDPOINT_LOCAL_FILES, get(handle_local_files))
        .route(ENDPOINT_ALL_FILES, get(handle_all_files))
        .route(ENDPOINT_PEERS, get(handle_peers))
        .route(ENDPOINT_JOIN, post(handle_join))
        .route(ENDPOINT_HAS_FILE, post(handle_has_file))
        .route(ENDPOINT_FILE_VERSION, post(handle_file_version))
        .route(ENDPOINT_CHECK_VERSION, post(handle_check_version))
        .route(ENDPOINT_FILE_SIZE, post(handle_file_size))
        .route(ENDPOINT_PURGE_FILE, post(handle_purge_file))
        .route(ENDPOINT_PULL_FILE, post(handle_pull_file))
        .route(ENDPOINT_NEW_SESSION, get(handle_new_session))
        .route(ENDPOINT_OPEN_FILE, post(handle_open_file))
        .route(ENDPOINT_CLOSE_FILE, post(handle_close_file))
        .route(ENDPOINT_OPEN_TRANSFER, post(handle_open_transfer))
        .route(ENDPOINT_CLOSE_TRANSFER, post(handle_close_transfer))
        .layer(Extension(node))
}

async fn handle_address(
    Extension(node): Extension<Arc<NodeService>>,
) -> Json<AddressResponse> {
    Json(AddressResponse {
        address: node.address().to_string(),
    })
}

async fn handle_ping() -> Json<PingResponse> {
    Json(PingResponse { alive: true })
}

async fn handle_local_files(
    Extension(node): Extension<Arc<NodeService>>,
) -> (StatusCode, Json<FileListResponse>) {
    match node.list_local_files().await {
        Ok(files) => (StatusCode::OK, Json(FileListResponse { files })),
        Err(e) => {
            tracing::error!("Failed to list local files: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(FileListResponse { files: vec![] }),
            )
        }
    }
}

async fn handle_all_files(
    Extension(node): Extension<Arc<NodeService>>,
) -> Json<AllFilesResponse> {
    Json(AllFilesResponse {
        entries: node.list_all_files().await,
    })
}

async fn handle_peers(Extension(node): Extension<Arc<NodeService>>) -> Json<PeerListResponse> {
    Json(PeerListResponse {
        peers: node.peers.list_connected(),
    })
}

async fn handle_join(
    Extension(node): Extension<Arc<NodeService>>,
    Json(req): Json<JoinRequest>,
) -> (StatusCode, Json<JoinResponse>) {
    match node.peers.join(&req.addr).await {
        Ok(()) => (StatusCode::OK, Json(JoinResponse { success: true })),
        Err(e) => {
            tracing::error!("Join of {} failed: {}", req.addr, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(JoinResponse { success: false }),
            )
        }
    }
}

async fn handle_has_file(
    Extension(node): Extension<Arc<NodeService>>,
    Json(req): Json<FileRequest>,
) -> Json<HasFileResponse> {
    Json(HasFileResponse {
        present: node.has_file(&req.filename).await,
    })
}

async fn handle_file_version(
    Extension(node): Extension<Arc<NodeService>>,
    Json(req): Json<FileRequest>,
) -> Json<VersionResponse> {
    Json(VersionResponse {
        version: node.ledger.version(&req.filename).await,
    })
}

async fn handle_check_version(
    Extension(node): Extension<Arc<NodeService>>,
    Json(req): Json<CheckVersionRequest>,
) -> Json<CheckVersionResponse> {
    Json(CheckVersionResponse {
        matches: node.ledger.check_version(&req.filename, req.version).await,
    })
}

async fn handle_file_size(
    Extension(node): Extension<Arc<NodeService>>,
    Json(req): Json<FileRequest>,
) -> Json<FileSizeResponse> {
    Json(FileSizeResponse {
        size: node.file_size(&req.filename).await,
    })
}

async fn handle_purge_file(
    Extension(node): Extension<Arc<NodeService>>,
    Json(req): Json<FileRequest>,
) -> (StatusCode, Json<PurgeResponse>) {
    if !is_valid_filename(&req.filename) {
        return (StatusCode::BAD_REQUEST, Json(PurgeResponse { purged: false }));
    }
    match node.purge_file(&req.filename).await {
        Ok(purged) => (StatusCode::OK, Json(PurgeResponse { purged })),
        Err(e) => {
            tracing::error!("Failed to purge {}: {}", req.filename, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(PurgeResponse { purged: false }),
            )
        }
    }
}

async fn handle_pull_file(
    Extension(node): Extension<Arc<NodeService>>,
    Json(req): Json<FileRequest>,
) -> (StatusCode, Json<PullResponse>) {
    match node.get_file(&req.filename).await {
        Ok(fetched) => (StatusCode::OK, Json(PullResponse { fetched })),
        Err(e) => {
            tracing::error!("Pull of {} failed: {}", req.filename, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(PullResponse { fetched: false }),
            )
        }
    }
}

async fn handle_new_session(
    Extension(node): Extension<Arc<NodeService>>,
) -> Json<NewSessionResponse> {
    Json(NewSessionResponse {
        session_id: node.sessions.new_session_id(),
    })
}

async fn handle_open_file(
    Extension(node): Extension<Arc<NodeService>>,
    Json(req): Json<OpenFileRequest>,
) -> (StatusCode, Json<OpenFileResponse>) {
    if !is_valid_filename(&req.filename) {
        return (
            StatusCode::BAD_REQUEST,
            Json(OpenFileResponse { data: vec![] }),
        );
    }
    match node
        .open_file(&req.filename, req.start, req.end, req.session_id)
        .await
    {
        Ok(Some(data)) => (StatusCode::OK, Json(OpenFileResponse { data })),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(OpenFileResponse { data: vec![] }),
        ),
        Err(e) => {
            tracing::error!("Failed to open {} for session {}: {}", req.filename, req.session_id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(OpenFileResponse { data: vec![] }),
            )
        }
    }
}

async fn handle_close_file(
    Extension(node): Extension<Arc<NodeService>>,
    Json(req): Json<CloseFileRequest>,
) -> (StatusCode, Json<CloseFileResponse>) {
    match node.close_file(&req.data, req.session_id).await {
        Ok(true) => (StatusCode::OK, Json(CloseFileResponse { committed: true })),
        Ok(false) => (
            StatusCode::CONFLICT,
            Json(CloseFileResponse { committed: false }),
        ),
        Err(e) => {
            tracing::error!("Commit for session {} failed: {}", req.session_id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(CloseFileResponse { committed: false }),
            )
        }
    }
}

async fn handle_open_transfer(
    Extension(node): Extension<Arc<NodeService>>,
    Json(req): Json<OpenTransferRequest>,
) -> (StatusCode, Json<OpenTransferResponse>) {
    if !is_valid_filename(&req.filename) {
        return (
            StatusCode::BAD_REQUEST,
            Json(OpenTransferResponse { port: 0 }),
        );
    }
    match node.transfers.open_socket_file(&req.filename).await {
        Ok(port) => (StatusCode::OK, Json(OpenTransferResponse { port })),
        Err(e) => {
            tracing::error!("Failed to open transfer for {}: {}", req.filename, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(OpenTransferResponse { port: 0 }),
            )
        }
    }
}

async fn handle_close_transfer(
    Extension(node): Extension<Arc<NodeService>>,
    Json(req): Json<CloseTransferRequest>,
) -> Json<CloseTransferResponse> {
    node.transfers.close_socket(req.port);
    Json(CloseTransferResponse { success: true })
}
