//! RpcServer: TCP listener for framed unary calls.
//!
//! An [`RpcServer`] binds a local TCP listener and accepts connections from
//! other gateways and local callers. Each connection is a loop of
//! request/reply exchanges; every `unary_request` frame is handed to the
//! [`UnaryHandler`] and answered on the same connection.

use crate::error::WireError;
use crate::message::{read_frame, write_frame, RpcFrame, RpcFrameKind, MAX_MESSAGE_SIZE};

use async_trait::async_trait;
use fedgate_types::envelope::OutboundEnvelope;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

/// Error code sent back for frames that are not requests.
pub const UNEXPECTED_FRAME_CODE: &str = "E_UNEXPECTED_FRAME";

/// Configuration for an RpcServer.
#[derive(Debug, Clone)]
pub struct RpcServerConfig {
    /// Address to bind the listener on.
    pub listen_addr: SocketAddr,
    /// Largest request frame accepted.
    pub max_message_size: u32,
}

impl Default for RpcServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            max_message_size: MAX_MESSAGE_SIZE,
        }
    }
}

/// Handles unary calls arriving on any ingress.
///
/// The gateway implements this; both the RPC listener and the HTTP tunnel
/// ingress call it with the raw packet bytes they received.
#[async_trait]
pub trait UnaryHandler: Send + Sync + 'static {
    async fn handle_unary(&self, payload: Vec<u8>) -> OutboundEnvelope;
}

/// The local RPC listener.
pub struct RpcServer {
    config: RpcServerConfig,
    /// Actual bound address (useful when binding to port 0).
    local_addr: SocketAddr,
}

impl RpcServer {
    /// Create and start listening on the configured address.
    pub async fn start(
        config: RpcServerConfig,
        handler: Arc<dyn UnaryHandler>,
    ) -> Result<(Arc<Self>, tokio::task::JoinHandle<()>), WireError> {
        let listener = TcpListener::bind(config.listen_addr).await?;
        let local_addr = listener.local_addr()?;

        info!("RPC: listening on {}", local_addr);

        let server = Arc::new(Self { config, local_addr });

        let server_clone = Arc::clone(&server);
        let accept_handle = tokio::spawn(async move {
            Self::accept_loop(listener, server_clone, handler).await;
        });

        Ok((server, accept_handle))
    }

    /// Get the actual bound address.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Internal accept loop. Runs in a spawned task.
    async fn accept_loop(
        listener: TcpListener,
        server: Arc<RpcServer>,
        handler: Arc<dyn UnaryHandler>,
    ) {
        loop {
            match listener.accept().await {
                Ok((stream, addr)) => {
                    debug!("RPC: accepted connection from {}", addr);
                    let server = Arc::clone(&server);
                    let handler = Arc::clone(&handler);
                    tokio::spawn(async move {
                        if let Err(e) = server.handle_connection(stream, &*handler).await {
                            debug!("RPC: connection from {} ended: {}", addr, e);
                        }
                    });
                }
                Err(e) => {
                    error!("RPC: accept error: {}", e);
                    tokio::time::sleep(std::time::Duration::from_secs(1)).await;
                }
            }
        }
    }

    /// Serve request/reply exchanges on one connection until the peer hangs up.
    async fn handle_connection(
        &self,
        mut stream: TcpStream,
        handler: &dyn UnaryHandler,
    ) -> Result<(), WireError> {
        loop {
            let frame = match read_frame(&mut stream, self.config.max_message_size).await {
                Ok(f) => f,
                Err(WireError::ConnectionClosed) => return Ok(()),
                Err(e) => return Err(e),
            };

            let reply = match frame.kind {
                RpcFrameKind::Request { payload } => {
                    let outbound = handler.handle_unary(payload).await;
                    reply_frame(frame.id, outbound)
                }
                _ => {
                    warn!("RPC: unexpected non-request frame {}", frame.id);
                    RpcFrame::error(
                        frame.id,
                        UNEXPECTED_FRAME_CODE,
                        "Expected a unary_request frame",
                    )
                }
            };
            write_frame(&mut stream, &reply).await?;
        }
    }
}

/// Translate the handler's envelope into the reply frame for `id`.
fn reply_frame(id: String, outbound: OutboundEnvelope) -> RpcFrame {
    if outbound.is_success() {
        RpcFrame::response(id, outbound.payload.unwrap_or_default())
    } else {
        RpcFrame::error(id, outbound.code.as_str(), outbound.message)
    }
}
