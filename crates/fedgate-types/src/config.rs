//! Gateway configuration types.
//!
//! Loaded from `~/.fedgate/config.toml` by the kernel. Every field has a
//! default so a partial file (or no file at all) yields a usable config.

use crate::route::{ProtocolMetadata, RouteTarget, TransportKind};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Role key that matches any destination role of a party.
pub const DEFAULT_ROLE: &str = "default";

/// Top-level gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Identifier of this gateway node (used in logs).
    pub node_id: String,
    /// Address the framed RPC listener binds.
    pub rpc_listen_addr: SocketAddr,
    /// Address the HTTP tunnel ingress binds.
    pub http_listen_addr: SocketAddr,
    /// Outbound transport settings.
    pub transport: TransportConfig,
    /// Static routing table.
    pub routes: Vec<RouteEntry>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            node_id: "fedgate-node".to_string(),
            rpc_listen_addr: SocketAddr::from(([0, 0, 0, 0], 9370)),
            http_listen_addr: SocketAddr::from(([0, 0, 0, 0], 8087)),
            transport: TransportConfig::default(),
            routes: Vec::new(),
        }
    }
}

/// Outbound transport settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Deadline for a whole RPC exchange (connect + request + reply).
    pub rpc_timeout_secs: u64,
    /// Deadline for an HTTP tunnel request.
    pub http_timeout_secs: u64,
    /// Largest frame accepted on the RPC channel.
    pub max_message_bytes: u32,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            rpc_timeout_secs: 30,
            http_timeout_secs: 30,
            max_message_bytes: 16 * 1024 * 1024,
        }
    }
}

/// One row of the static routing table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteEntry {
    /// Destination party.
    pub party_id: String,
    /// Destination role, or `"default"` to match any role.
    #[serde(default = "default_role")]
    pub role: String,
    /// `"rpc"` or `"http"`.
    #[serde(default = "default_protocol")]
    pub protocol: String,
    /// `host:port`, or a base URL for HTTP routes.
    pub address: String,
    #[serde(default)]
    pub use_tls: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_prefix: Option<String>,
}

fn default_role() -> String {
    DEFAULT_ROLE.to_string()
}

fn default_protocol() -> String {
    "rpc".to_string()
}

impl RouteEntry {
    /// Convert to a resolved target. Fails on an unknown protocol or an empty address.
    pub fn to_target(&self) -> Result<RouteTarget, String> {
        let transport: TransportKind = self.protocol.parse()?;
        if self.address.trim().is_empty() {
            return Err(format!("route for party '{}' has no address", self.party_id));
        }
        Ok(RouteTarget::new(
            transport,
            self.address.trim(),
            ProtocolMetadata {
                use_tls: self.use_tls,
                path_prefix: self.path_prefix.clone(),
            },
        ))
    }
}
