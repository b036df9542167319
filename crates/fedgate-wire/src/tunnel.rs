//! HTTP tunnel transport.
//!
//! A unary call is wrapped in a [`TunnelInbound`] JSON envelope and POSTed to
//! the destination's `/v1/tunnel/invoke` endpoint, which answers with a
//! [`TunnelOutbound`]. [`HttpTunnelClient`] is the sending side and
//! [`tunnel_router`] the receiving side.

use crate::error::WireError;
use crate::server::UnaryHandler;
use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use fedgate_types::envelope::{OutboundEnvelope, StatusCode};
use fedgate_types::route::TUNNEL_PATH;
use fedgate_types::serde_compat::{base64_bytes, base64_bytes_opt};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Metadata key naming the tunneled action.
pub const META_ACTION: &str = "x-fedgate-action";

/// Request envelope POSTed to a tunnel endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TunnelInbound {
    /// Free-form string headers (action, trace id, ...).
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    /// Serialized packet bytes.
    #[serde(with = "base64_bytes", default)]
    pub payload: Vec<u8>,
}

impl TunnelInbound {
    pub fn new(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            metadata: HashMap::new(),
            payload: payload.into(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Reply envelope returned by a tunnel endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TunnelOutbound {
    /// `"0"` on success, otherwise an error code.
    pub code: String,
    #[serde(default)]
    pub message: String,
    #[serde(default, with = "base64_bytes_opt", skip_serializing_if = "Option::is_none")]
    pub payload: Option<Vec<u8>>,
}

impl TunnelOutbound {
    pub fn is_success(&self) -> bool {
        self.code == StatusCode::Success.as_str()
    }
}

impl From<OutboundEnvelope> for TunnelOutbound {
    fn from(env: OutboundEnvelope) -> Self {
        Self {
            code: env.code.as_str().to_string(),
            message: env.message,
            payload: env.payload,
        }
    }
}

/// Sends tunnel envelopes. Implementations own connection reuse and timeouts.
#[async_trait]
pub trait TunnelClient: Send + Sync {
    /// POST `inbound` to `url`.
    ///
    /// `Ok(None)` means the peer answered with an empty body.
    async fn post(
        &self,
        url: &str,
        inbound: &TunnelInbound,
    ) -> Result<Option<TunnelOutbound>, WireError>;
}

/// [`TunnelClient`] backed by reqwest.
pub struct HttpTunnelClient {
    client: reqwest::Client,
}

impl HttpTunnelClient {
    /// Create a client whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, WireError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| WireError::Http(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl TunnelClient for HttpTunnelClient {
    async fn post(
        &self,
        url: &str,
        inbound: &TunnelInbound,
    ) -> Result<Option<TunnelOutbound>, WireError> {
        debug!(url = %url, bytes = inbound.payload.len(), "Posting tunnel envelope");

        let response = self
            .client
            .post(url)
            .header("User-Agent", "FedGate/0.2 tunnel")
            .json(inbound)
            .send()
            .await
            .map_err(|e| WireError::Http(e.to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| WireError::Http(e.to_string()))?;

        if !status.is_success() {
            return Err(WireError::Http(format!("tunnel endpoint returned {status}")));
        }
        if body.is_empty() {
            return Ok(None);
        }

        serde_json::from_slice(&body)
            .map(Some)
            .map_err(|e| WireError::MalformedReply(e.to_string()))
    }
}

/// Router serving the tunnel endpoint and feeding it to `handler`.
pub fn tunnel_router(handler: Arc<dyn UnaryHandler>) -> Router {
    Router::new()
        .route(TUNNEL_PATH, post(invoke))
        .with_state(handler)
}

async fn invoke(
    State(handler): State<Arc<dyn UnaryHandler>>,
    body: Bytes,
) -> Json<TunnelOutbound> {
    let inbound: TunnelInbound = match serde_json::from_slice(&body) {
        Ok(i) => i,
        Err(e) => {
            warn!(error = %e, "Rejected malformed tunnel envelope");
            return Json(TunnelOutbound::from(OutboundEnvelope::failure(
                StatusCode::ParameterError,
                format!("invalid tunnel envelope: {e}"),
            )));
        }
    };

    if let Some(action) = inbound.metadata.get(META_ACTION) {
        debug!(action = %action, "Tunnel call received");
    }

    Json(TunnelOutbound::from(handler.handle_unary(inbound.payload).await))
}

/// Bind `addr` and serve the tunnel endpoint in a background task.
pub async fn serve_tunnel(
    addr: SocketAddr,
    handler: Arc<dyn UnaryHandler>,
) -> Result<(SocketAddr, tokio::task::JoinHandle<()>), WireError> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;
    info!("Tunnel: listening on {}", local_addr);

    let app = tunnel_router(handler);
    let task = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Tunnel: server error: {}", e);
        }
    });

    Ok((local_addr, task))
}
