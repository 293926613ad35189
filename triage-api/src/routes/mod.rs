pub(crate) mod batch;
pub(crate) mod costs;
pub(crate) mod error;
pub(crate) mod triage;

pub(crate) use error::ApiError;

use std::net::SocketAddr;

use axum::extract::ConnectInfo;

/// Rate-limit key for a request; falls back to a shared bucket without connection info.
pub(crate) fn client_key(connect_info: Option<ConnectInfo<SocketAddr>>) -> String {
    connect_info
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
