//! The RPC packet being forwarded between parties.
//!
//! Packets are serialized as JSON. Byte fields are base64 strings so the
//! packet survives both the framed RPC channel and the HTTP tunnel unchanged.

use crate::addressing::AddressingContext;
use crate::serde_compat::{base64_bytes, string_lenient};
use serde::{Deserialize, Serialize};

/// One side of a call: a party and the role it plays.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    #[serde(default, deserialize_with = "string_lenient")]
    pub party_id: String,
    #[serde(default, deserialize_with = "string_lenient")]
    pub role: String,
}

impl Endpoint {
    pub fn new(party_id: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            party_id: party_id.into(),
            role: role.into(),
        }
    }
}

/// Packet metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PacketHeader {
    #[serde(default)]
    pub src: Endpoint,
    #[serde(default)]
    pub dst: Endpoint,
    #[serde(default)]
    pub task_id: String,
    #[serde(default)]
    pub command: String,
    /// Opaque extension bytes; may hold a routing header override.
    #[serde(default, with = "base64_bytes", skip_serializing_if = "Vec::is_empty")]
    pub ext: Vec<u8>,
}

/// Packet payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacketBody {
    #[serde(default)]
    pub key: String,
    #[serde(default, with = "base64_bytes")]
    pub value: Vec<u8>,
}

/// A unary RPC message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Packet {
    pub header: PacketHeader,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<PacketBody>,
}

impl Packet {
    /// Create a packet with no body.
    pub fn new(src: Endpoint, dst: Endpoint) -> Self {
        Self {
            header: PacketHeader {
                src,
                dst,
                ..Default::default()
            },
            body: None,
        }
    }

    /// Attach a body.
    pub fn with_body(mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.body = Some(PacketBody {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    /// Attach header-override bytes.
    pub fn with_ext(mut self, ext: impl Into<Vec<u8>>) -> Self {
        self.header.ext = ext.into();
        self
    }

    /// Serialize to wire bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Parse wire bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Extract the addressing context. Empty `ext` means no override.
    pub fn addressing(&self) -> AddressingContext {
        AddressingContext {
            src_party_id: self.header.src.party_id.clone(),
            src_role: self.header.src.role.clone(),
            dst_party_id: self.header.dst.party_id.clone(),
            dst_role: self.header.dst.role.clone(),
            header_override: if self.header.ext.is_empty() {
                None
            } else {
                Some(self.header.ext.clone())
            },
        }
    }
}
