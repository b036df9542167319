//! Outbound RPC channels and the connection pool that owns them.
//!
//! [`ConnectionProvider::open_or_reuse`] returns a shared [`RpcChannel`] for
//! an address. A [`TcpChannel`] keeps a small set of idle TCP streams. Each
//! call checks one out for the duration of its exchange, so concurrent calls
//! never share a stream. A stream goes back to the idle set only after a
//! reply with the matching id; a failed or cancelled exchange drops it.

use crate::error::WireError;
use crate::message::{read_frame, write_frame, RpcFrame, RpcFrameKind};
use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::debug;

/// Idle streams kept per address. Extra streams are closed on return.
pub const MAX_IDLE_STREAMS: usize = 8;

/// A channel able to carry unary calls.
#[async_trait]
pub trait RpcChannel: Send + Sync {
    /// Send `payload` and wait for the reply payload.
    async fn unary_call(&self, payload: Bytes) -> Result<Bytes, WireError>;
}

/// Hands out channels by address. Implementations own pooling and must be
/// safe to share between concurrent calls.
#[async_trait]
pub trait ConnectionProvider: Send + Sync {
    async fn open_or_reuse(&self, address: &str) -> Result<Arc<dyn RpcChannel>, WireError>;
}

/// RPC channel over lazily-opened TCP streams to one address.
pub struct TcpChannel {
    address: String,
    timeout: Duration,
    max_message_size: u32,
    idle: Mutex<Vec<TcpStream>>,
}

impl TcpChannel {
    pub fn new(address: impl Into<String>, timeout: Duration, max_message_size: u32) -> Self {
        Self {
            address: address.into(),
            timeout,
            max_message_size,
            idle: Mutex::new(Vec::new()),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Number of idle streams ready for reuse.
    pub fn idle_streams(&self) -> usize {
        self.idle.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Whether at least one stream is held open.
    pub fn is_connected(&self) -> bool {
        self.idle_streams() > 0
    }

    fn checkout(&self) -> Option<TcpStream> {
        self.idle.lock().unwrap_or_else(|e| e.into_inner()).pop()
    }

    fn checkin(&self, stream: TcpStream) {
        let mut idle = self.idle.lock().unwrap_or_else(|e| e.into_inner());
        if idle.len() < MAX_IDLE_STREAMS {
            idle.push(stream);
        }
    }

    /// Run one exchange on an owned stream. The stream is returned only when
    /// the reply id matches; any other outcome, including the caller dropping
    /// this future, closes it.
    async fn exchange(&self, request: &RpcFrame) -> Result<(TcpStream, RpcFrame), WireError> {
        let mut stream = match self.checkout() {
            Some(stream) => stream,
            None => {
                debug!(address = %self.address, "opening RPC connection");
                TcpStream::connect(self.address.as_str()).await?
            }
        };
        write_frame(&mut stream, request).await?;
        let reply = read_frame(&mut stream, self.max_message_size).await?;
        if reply.id != request.id {
            return Err(WireError::UnexpectedFrame(format!(
                "reply id {} does not match request id {}",
                reply.id, request.id
            )));
        }
        Ok((stream, reply))
    }
}

#[async_trait]
impl RpcChannel for TcpChannel {
    async fn unary_call(&self, payload: Bytes) -> Result<Bytes, WireError> {
        let request = RpcFrame::request(payload.to_vec());

        let (stream, reply) = match tokio::time::timeout(self.timeout, self.exchange(&request)).await {
            Ok(result) => result?,
            Err(_) => return Err(WireError::Timeout(self.timeout)),
        };

        match reply.kind {
            RpcFrameKind::Response { payload } => {
                self.checkin(stream);
                Ok(Bytes::from(payload))
            }
            RpcFrameKind::Error { code, message } => {
                self.checkin(stream);
                Err(WireError::Remote { code, message })
            }
            RpcFrameKind::Request { .. } => Err(WireError::UnexpectedFrame(
                "peer answered a request with a request".to_string(),
            )),
        }
    }
}

/// Pool of [`TcpChannel`]s, one per address.
pub struct TcpConnectionPool {
    channels: DashMap<String, Arc<TcpChannel>>,
    timeout: Duration,
    max_message_size: u32,
}

impl TcpConnectionPool {
    pub fn new(timeout: Duration, max_message_size: u32) -> Self {
        Self {
            channels: DashMap::new(),
            timeout,
            max_message_size,
        }
    }

    /// Number of addresses with a pooled channel.
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Forget the channel for `address`.
    pub fn evict(&self, address: &str) -> bool {
        self.channels.remove(address).is_some()
    }
}

#[async_trait]
impl ConnectionProvider for TcpConnectionPool {
    async fn open_or_reuse(&self, address: &str) -> Result<Arc<dyn RpcChannel>, WireError> {
        let channel = self
            .channels
            .entry(address.to_string())
            .or_insert_with(|| {
                Arc::new(TcpChannel::new(address, self.timeout, self.max_message_size))
            })
            .clone();
        Ok(channel)
    }
}
