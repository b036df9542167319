//! Failure taxonomy for a single gateway call.

use crate::envelope::StatusCode;
use thiserror::Error;

/// The routing table has no entry for this pair of endpoints.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{src_party_id} to {dst_party_id} found no router info")]
pub struct RouteNotFound {
    pub src_party_id: String,
    pub src_role: String,
    pub dst_party_id: String,
    pub dst_role: String,
}

/// A single forwarding attempt failed or produced nothing usable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchFailure {
    /// The remote answered, but without a payload.
    #[error("remote {address} returned an empty response")]
    EmptyRemoteResponse { address: String },

    /// The remote payload is not a packet.
    #[error("remote {address} returned a malformed response: {reason}")]
    MalformedRemoteResponse { address: String, reason: String },

    /// Connection, timeout, TLS or remote-side error.
    #[error("{0}")]
    Transport(String),
}

/// Gateway-level error returned to the original caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// Malformed inbound request. Caller's fault.
    #[error("invalid request data: {0}")]
    Parameter(String),

    /// Destination unknown to the routing table.
    #[error(transparent)]
    NoRoute(#[from] RouteNotFound),

    /// Forwarding failed.
    #[error("remote call failed: {0}")]
    RemoteCall(#[from] DispatchFailure),
}

impl GatewayError {
    /// Status code reported in the outbound envelope.
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::Parameter(_) => StatusCode::ParameterError,
            GatewayError::NoRoute(_) => StatusCode::NoRouteError,
            GatewayError::RemoteCall(_) => StatusCode::RemoteCallError,
        }
    }
}

/// Alias for Result with GatewayError.
pub type GatewayResult<T> = Result<T, GatewayError>;
