//! FedGate transports.
//!
//! Two ways of carrying a unary call to another party:
//!
//! - **Framed RPC**: JSON frames with a 4-byte big-endian length prefix over
//!   TCP. [`TcpConnectionPool`] hands out reusable [`RpcChannel`]s and
//!   [`RpcServer`] accepts calls from other gateways.
//! - **HTTP tunnel**: the call is wrapped in a [`TunnelInbound`] and POSTed
//!   to the destination's tunnel endpoint; [`tunnel_router`] serves that
//!   endpoint locally.
//!
//! Both ingresses feed a [`UnaryHandler`].

pub mod channel;
pub mod error;
pub mod message;
pub mod server;
pub mod tunnel;

pub use channel::{ConnectionProvider, RpcChannel, TcpChannel, TcpConnectionPool};
pub use error::WireError;
pub use message::{RpcFrame, RpcFrameKind};
pub use server::{RpcServer, RpcServerConfig, UnaryHandler};
pub use tunnel::{serve_tunnel, tunnel_router, HttpTunnelClient, TunnelClient, TunnelInbound, TunnelOutbound};
