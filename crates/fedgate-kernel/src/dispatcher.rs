//! Protocol dispatcher: one forwarding attempt per call.
//!
//! Both transports follow the same shape: attempt the exchange, then
//! classify the outcome as empty, malformed, transport failure, or a usable
//! response. Callers only see [`DispatchFailure`], never which transport
//! produced it.

use crate::gateway::ACTION_UNARY_CALL;
use bytes::Bytes;
use fedgate_types::error::DispatchFailure;
use fedgate_types::packet::Packet;
use fedgate_types::route::{RouteTarget, TransportKind};
use fedgate_wire::tunnel::META_ACTION;
use fedgate_wire::{ConnectionProvider, TunnelClient, TunnelInbound, WireError};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Forwards payloads to resolved targets.
pub struct Dispatcher {
    connections: Arc<dyn ConnectionProvider>,
    tunnel: Arc<dyn TunnelClient>,
}

impl Dispatcher {
    pub fn new(connections: Arc<dyn ConnectionProvider>, tunnel: Arc<dyn TunnelClient>) -> Self {
        Self {
            connections,
            tunnel,
        }
    }

    /// Send `payload` to `target` and return the remote response bytes.
    ///
    /// The returned bytes are exactly what the remote sent and are known to
    /// decode as a [`Packet`].
    pub async fn dispatch(
        &self,
        target: &RouteTarget,
        payload: Bytes,
    ) -> Result<Bytes, DispatchFailure> {
        match target.transport() {
            TransportKind::HttpTunneled => self.dispatch_tunneled(target, payload).await,
            TransportKind::Rpc => self.dispatch_rpc(target, payload).await,
        }
    }

    async fn dispatch_tunneled(
        &self,
        target: &RouteTarget,
        payload: Bytes,
    ) -> Result<Bytes, DispatchFailure> {
        let url = target.tunnel_url();
        let inbound = TunnelInbound::new(payload.to_vec()).with_metadata(META_ACTION, ACTION_UNARY_CALL);

        let reply = match self.tunnel.post(&url, &inbound).await {
            Ok(reply) => reply,
            Err(WireError::MalformedReply(reason)) => {
                warn!(url = %url, reason = %reason, "Tunnel reply is not an envelope");
                return Err(DispatchFailure::MalformedRemoteResponse {
                    address: target.address().to_string(),
                    reason,
                });
            }
            Err(e) => {
                error!(url = %url, error = %e, "HTTP tunnel call failed");
                return Err(DispatchFailure::Transport(format!(
                    "http tunnel call to {url} failed: {e}"
                )));
            }
        };

        let payload = match reply {
            Some(outbound) if !outbound.is_success() => {
                warn!(url = %url, code = %outbound.code, "Remote returned an error");
                return Err(DispatchFailure::Transport(format!(
                    "remote {} returned {}: {}",
                    target.address(),
                    outbound.code,
                    outbound.message
                )));
            }
            Some(outbound) => outbound.payload.unwrap_or_default(),
            None => Vec::new(),
        };

        decode_reply(target, Bytes::from(payload))
    }

    async fn dispatch_rpc(
        &self,
        target: &RouteTarget,
        payload: Bytes,
    ) -> Result<Bytes, DispatchFailure> {
        let reply = match self.call_rpc(target.address(), payload).await {
            Ok(reply) => reply,
            Err(e) => {
                error!(address = %target.address(), error = %e, "Unary call over RPC failed");
                return Err(DispatchFailure::Transport(format!("unary call rpc error: {e}")));
            }
        };

        decode_reply(target, reply)
    }

    async fn call_rpc(&self, address: &str, payload: Bytes) -> Result<Bytes, WireError> {
        let channel = self.connections.open_or_reuse(address).await?;
        channel.unary_call(payload).await
    }
}

/// Classify a raw reply: empty, not a packet, or usable.
fn decode_reply(target: &RouteTarget, reply: Bytes) -> Result<Bytes, DispatchFailure> {
    if reply.is_empty() {
        return Err(DispatchFailure::EmptyRemoteResponse {
            address: target.address().to_string(),
        });
    }
    match Packet::from_bytes(&reply) {
        Ok(packet) => {
            debug!(
                route = %target,
                task = %packet.header.task_id,
                bytes = reply.len(),
                "Remote reply decoded"
            );
            Ok(reply)
        }
        Err(e) => Err(DispatchFailure::MalformedRemoteResponse {
            address: target.address().to_string(),
            reason: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use fedgate_types::packet::Endpoint;
    use fedgate_wire::{RpcChannel, TunnelOutbound};
    use std::sync::Mutex;

    fn reply_packet() -> Vec<u8> {
        Packet::new(Endpoint::new("B", "guest"), Endpoint::new("A", "host"))
            .with_body("k", b"pong".to_vec())
            .to_bytes()
            .unwrap()
    }

    /// Channel that answers every call with a fixed result.
    struct FixedChannel(Result<Bytes, String>);

    #[async_trait]
    impl RpcChannel for FixedChannel {
        async fn unary_call(&self, _payload: Bytes) -> Result<Bytes, WireError> {
            self.0.clone().map_err(WireError::Http)
        }
    }

    /// Connection provider recording the addresses it was asked for.
    struct FakeConnections {
        channel: Arc<FixedChannel>,
        opened: Mutex<Vec<String>>,
    }

    impl FakeConnections {
        fn answering(result: Result<Bytes, String>) -> Arc<Self> {
            Arc::new(Self {
                channel: Arc::new(FixedChannel(result)),
                opened: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ConnectionProvider for FakeConnections {
        async fn open_or_reuse(&self, address: &str) -> Result<Arc<dyn RpcChannel>, WireError> {
            self.opened.lock().unwrap().push(address.to_string());
            Ok(self.channel.clone())
        }
    }

    /// Tunnel client returning a fixed reply and recording requests.
    struct FakeTunnel {
        reply: Mutex<Option<Result<Option<TunnelOutbound>, WireError>>>,
        posted: Mutex<Vec<(String, TunnelInbound)>>,
    }

    impl FakeTunnel {
        fn answering(reply: Result<Option<TunnelOutbound>, WireError>) -> Arc<Self> {
            Arc::new(Self {
                reply: Mutex::new(Some(reply)),
                posted: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl TunnelClient for FakeTunnel {
        async fn post(
            &self,
            url: &str,
            inbound: &TunnelInbound,
        ) -> Result<Option<TunnelOutbound>, WireError> {
            self.posted
                .lock()
                .unwrap()
                .push((url.to_string(), inbound.clone()));
            self.reply
                .lock()
                .unwrap()
                .take()
                .unwrap_or(Err(WireError::ConnectionClosed))
        }
    }

    fn ok_outbound(payload: Option<Vec<u8>>) -> TunnelOutbound {
        TunnelOutbound {
            code: "0".to_string(),
            message: String::new(),
            payload,
        }
    }

    fn unused_tunnel() -> Arc<FakeTunnel> {
        FakeTunnel::answering(Err(WireError::ConnectionClosed))
    }

    #[tokio::test]
    async fn test_rpc_success_returns_remote_bytes() {
        let connections = FakeConnections::answering(Ok(Bytes::from(reply_packet())));
        let dispatcher = Dispatcher::new(connections.clone(), unused_tunnel());

        let reply = dispatcher
            .dispatch(&RouteTarget::rpc("10.0.0.5:9370"), Bytes::from_static(b"ping"))
            .await
            .unwrap();
        assert_eq!(&reply[..], &reply_packet()[..]);
        assert_eq!(*connections.opened.lock().unwrap(), vec!["10.0.0.5:9370".to_string()]);
    }

    #[tokio::test]
    async fn test_rpc_transport_error() {
        let connections = FakeConnections::answering(Err("connection reset".to_string()));
        let dispatcher = Dispatcher::new(connections, unused_tunnel());

        let err = dispatcher
            .dispatch(&RouteTarget::rpc("10.0.0.5:9370"), Bytes::from_static(b"ping"))
            .await
            .unwrap_err();
        match err {
            DispatchFailure::Transport(msg) => {
                assert!(msg.starts_with("unary call rpc error:"), "got {msg}");
                assert!(msg.contains("connection reset"));
            }
            other => panic!("Expected Transport, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_rpc_empty_reply() {
        let connections = FakeConnections::answering(Ok(Bytes::new()));
        let dispatcher = Dispatcher::new(connections, unused_tunnel());
        let err = dispatcher
            .dispatch(&RouteTarget::rpc("10.0.0.5:9370"), Bytes::from_static(b"ping"))
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchFailure::EmptyRemoteResponse { .. }));
    }

    #[tokio::test]
    async fn test_rpc_malformed_reply() {
        let connections = FakeConnections::answering(Ok(Bytes::from_static(b"not a packet")));
        let dispatcher = Dispatcher::new(connections, unused_tunnel());
        let err = dispatcher
            .dispatch(&RouteTarget::rpc("10.0.0.5:9370"), Bytes::from_static(b"ping"))
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchFailure::MalformedRemoteResponse { .. }));
    }

    #[tokio::test]
    async fn test_tunnel_success_posts_envelope() {
        let tunnel = FakeTunnel::answering(Ok(Some(ok_outbound(Some(reply_packet())))));
        let dispatcher = Dispatcher::new(FakeConnections::answering(Ok(Bytes::new())), tunnel.clone());

        let reply = dispatcher
            .dispatch(&RouteTarget::http("10.0.0.6:8087"), Bytes::from_static(b"ping"))
            .await
            .unwrap();
        assert_eq!(&reply[..], &reply_packet()[..]);

        let posted = tunnel.posted.lock().unwrap();
        assert_eq!(posted.len(), 1);
        assert_eq!(posted[0].0, "http://10.0.0.6:8087/v1/tunnel/invoke");
        assert_eq!(posted[0].1.payload, b"ping");
        assert_eq!(
            posted[0].1.metadata.get(META_ACTION).map(String::as_str),
            Some(ACTION_UNARY_CALL)
        );
    }

    #[tokio::test]
    async fn test_tunnel_empty_payload_never_succeeds() {
        for reply in [
            Ok(None),
            Ok(Some(ok_outbound(None))),
            Ok(Some(ok_outbound(Some(Vec::new())))),
        ] {
            let dispatcher = Dispatcher::new(
                FakeConnections::answering(Ok(Bytes::new())),
                FakeTunnel::answering(reply),
            );
            let err = dispatcher
                .dispatch(&RouteTarget::http("10.0.0.6:8087"), Bytes::from_static(b"ping"))
                .await
                .unwrap_err();
            assert_eq!(
                err,
                DispatchFailure::EmptyRemoteResponse {
                    address: "10.0.0.6:8087".to_string()
                }
            );
        }
    }

    #[tokio::test]
    async fn test_tunnel_remote_error_code() {
        let reply = TunnelOutbound {
            code: "E_NO_ROUTE".to_string(),
            message: "B to C found no router info".to_string(),
            payload: None,
        };
        let dispatcher = Dispatcher::new(
            FakeConnections::answering(Ok(Bytes::new())),
            FakeTunnel::answering(Ok(Some(reply))),
        );
        let err = dispatcher
            .dispatch(&RouteTarget::http("10.0.0.6:8087"), Bytes::from_static(b"ping"))
            .await
            .unwrap_err();
        match err {
            DispatchFailure::Transport(msg) => {
                assert!(msg.contains("E_NO_ROUTE"), "got {msg}");
                assert!(msg.contains("found no router info"));
            }
            other => panic!("Expected Transport, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_tunnel_malformed_reply() {
        let dispatcher = Dispatcher::new(
            FakeConnections::answering(Ok(Bytes::new())),
            FakeTunnel::answering(Err(WireError::MalformedReply("expected value".to_string()))),
        );
        let err = dispatcher
            .dispatch(&RouteTarget::http("10.0.0.6:8087"), Bytes::from_static(b"ping"))
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchFailure::MalformedRemoteResponse { .. }));

        let dispatcher = Dispatcher::new(
            FakeConnections::answering(Ok(Bytes::new())),
            FakeTunnel::answering(Ok(Some(ok_outbound(Some(b"{}garbage".to_vec()))))),
        );
        let err = dispatcher
            .dispatch(&RouteTarget::http("10.0.0.6:8087"), Bytes::from_static(b"ping"))
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchFailure::MalformedRemoteResponse { .. }));
    }

    #[tokio::test]
    async fn test_tunnel_transport_error() {
        let dispatcher = Dispatcher::new(
            FakeConnections::answering(Ok(Bytes::new())),
            FakeTunnel::answering(Err(WireError::Http("connect refused".to_string()))),
        );
        let err = dispatcher
            .dispatch(&RouteTarget::http("10.0.0.6:8087"), Bytes::from_static(b"ping"))
            .await
            .unwrap_err();
        match err {
            DispatchFailure::Transport(msg) => assert!(msg.contains("connect refused"), "got {msg}"),
            other => panic!("Expected Transport, got {other:?}"),
        }
    }
}
