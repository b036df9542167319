//! Inbound and outbound call envelopes.

use crate::serde_compat::base64_bytes_opt;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Outcome code carried by an outbound envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    Success,
    /// Malformed inbound request.
    ParameterError,
    /// The routing table has no entry for the destination.
    NoRouteError,
    /// Forwarding to the remote party failed.
    RemoteCallError,
}

impl StatusCode {
    /// Wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusCode::Success => "0",
            StatusCode::ParameterError => "E_PARAMETER",
            StatusCode::NoRouteError => "E_NO_ROUTE",
            StatusCode::RemoteCallError => "E_REMOTE_RPC",
        }
    }

    /// Parse a wire code.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "0" => Some(StatusCode::Success),
            "E_PARAMETER" => Some(StatusCode::ParameterError),
            "E_NO_ROUTE" => Some(StatusCode::NoRouteError),
            "E_REMOTE_RPC" => Some(StatusCode::RemoteCallError),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, StatusCode::Success)
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for StatusCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for StatusCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = String::deserialize(deserializer)?;
        StatusCode::from_code(&code)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown status code '{code}'")))
    }
}

/// A request as it arrives at the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEnvelope {
    /// A unary invocation whose body holds serialized packet bytes.
    Invoke { payload: Vec<u8> },
    /// Any other request shape; always rejected.
    Unrecognized { kind: String },
}

/// The gateway's answer to the original caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundEnvelope {
    pub code: StatusCode,
    #[serde(default)]
    pub message: String,
    /// Response packet bytes. Present only on success.
    #[serde(default, with = "base64_bytes_opt", skip_serializing_if = "Option::is_none")]
    pub payload: Option<Vec<u8>>,
}

impl OutboundEnvelope {
    /// Successful response: OK code, empty message.
    pub fn success(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            code: StatusCode::Success,
            message: String::new(),
            payload: Some(payload.into()),
        }
    }

    /// Failed response: never carries a payload.
    pub fn failure(code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            payload: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.code.is_success()
    }
}
