//! Resolved routes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Path served by the HTTP tunnel ingress.
pub const TUNNEL_PATH: &str = "/v1/tunnel/invoke";

/// The transport a destination speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    /// Length-framed RPC over a raw TCP channel.
    Rpc,
    /// Call wrapped in a JSON envelope and POSTed over HTTP.
    HttpTunneled,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportKind::Rpc => write!(f, "rpc"),
            TransportKind::HttpTunneled => write!(f, "http"),
        }
    }
}

impl FromStr for TransportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "rpc" | "grpc" => Ok(TransportKind::Rpc),
            "http" | "https" | "http_tunneled" => Ok(TransportKind::HttpTunneled),
            other => Err(format!("unknown transport protocol '{other}'")),
        }
    }
}

/// Transport-specific extras for a route.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolMetadata {
    /// Whether the destination expects TLS.
    #[serde(default)]
    pub use_tls: bool,
    /// Path prefix placed in front of the tunnel path (HTTP only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_prefix: Option<String>,
}

/// How to reach a destination. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteTarget {
    transport: TransportKind,
    address: String,
    #[serde(default)]
    metadata: ProtocolMetadata,
}

impl RouteTarget {
    /// Build a target with explicit metadata.
    pub fn new(
        transport: TransportKind,
        address: impl Into<String>,
        metadata: ProtocolMetadata,
    ) -> Self {
        Self {
            transport,
            address: address.into(),
            metadata,
        }
    }

    /// A plain RPC target.
    pub fn rpc(address: impl Into<String>) -> Self {
        Self::new(TransportKind::Rpc, address, ProtocolMetadata::default())
    }

    /// A plain HTTP-tunneled target.
    pub fn http(address: impl Into<String>) -> Self {
        Self::new(
            TransportKind::HttpTunneled,
            address,
            ProtocolMetadata::default(),
        )
    }

    pub fn transport(&self) -> TransportKind {
        self.transport
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn metadata(&self) -> &ProtocolMetadata {
        &self.metadata
    }

    /// Full URL of the destination's tunnel endpoint.
    ///
    /// An address without a scheme gets `https://` when TLS is requested and
    /// `http://` otherwise.
    pub fn tunnel_url(&self) -> String {
        let base = if self.address.starts_with("http://") || self.address.starts_with("https://")
        {
            self.address.trim_end_matches('/').to_string()
        } else {
            let scheme = if self.metadata.use_tls { "https" } else { "http" };
            format!("{scheme}://{}", self.address.trim_end_matches('/'))
        };

        let prefix = self
            .metadata
            .path_prefix
            .as_deref()
            .map(|p| p.trim_matches('/'))
            .unwrap_or("");

        if prefix.is_empty() {
            format!("{base}{TUNNEL_PATH}")
        } else {
            format!("{base}/{prefix}{TUNNEL_PATH}")
        }
    }
}

impl fmt::Display for RouteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.transport, self.address)
    }
}
