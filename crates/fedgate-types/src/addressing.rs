//! Addressing context: who is calling whom.

use serde::{Deserialize, Serialize};

/// Identifies the two endpoints of a unary call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressingContext {
    /// Calling party.
    pub src_party_id: String,
    /// Role of the calling party (e.g. "host", "guest", "arbiter").
    pub src_role: String,
    /// Destination party as written in the packet header.
    pub dst_party_id: String,
    /// Role of the destination party.
    pub dst_role: String,
    /// Raw routing header carried out-of-band. When it parses, its
    /// destination party takes precedence over `dst_party_id`.
    pub header_override: Option<Vec<u8>>,
}

impl AddressingContext {
    /// Build a context without a header override.
    pub fn new(
        src_party_id: impl Into<String>,
        src_role: impl Into<String>,
        dst_party_id: impl Into<String>,
        dst_role: impl Into<String>,
    ) -> Self {
        Self {
            src_party_id: src_party_id.into(),
            src_role: src_role.into(),
            dst_party_id: dst_party_id.into(),
            dst_role: dst_role.into(),
            header_override: None,
        }
    }

    /// Attach raw header-override bytes.
    pub fn with_header_override(mut self, raw: impl Into<Vec<u8>>) -> Self {
        self.header_override = Some(raw.into());
        self
    }
}

/// Structured routing header that may ride along in a packet's `ext` field.
///
/// Older senders put the real destination here while the packet metadata
/// carries a generic one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteHeader {
    #[serde(default, deserialize_with = "crate::serde_compat::string_lenient")]
    pub src_party_id: String,
    #[serde(default, deserialize_with = "crate::serde_compat::string_lenient")]
    pub src_role: String,
    #[serde(default, deserialize_with = "crate::serde_compat::string_lenient")]
    pub dst_party_id: String,
    #[serde(default, deserialize_with = "crate::serde_compat::string_lenient")]
    pub dst_role: String,
    #[serde(default)]
    pub roll_site_session_id: String,
}

/// Outcome of interpreting a header-override blob.
///
/// `Unparsable` is a compatibility fallback, not an error: the caller keeps
/// the primary destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderOverride {
    /// No override bytes were supplied.
    Absent,
    /// The bytes parsed into a routing header.
    Parsed(RouteHeader),
    /// The bytes were present but not a routing header. Carries the parse error.
    Unparsable(String),
}

impl HeaderOverride {
    /// Interpret optional raw header bytes.
    pub fn parse(raw: Option<&[u8]>) -> Self {
        match raw {
            None => HeaderOverride::Absent,
            Some(bytes) => match serde_json::from_slice::<RouteHeader>(bytes) {
                Ok(header) => HeaderOverride::Parsed(header),
                Err(e) => HeaderOverride::Unparsable(e.to_string()),
            },
        }
    }

    /// The overriding destination party, if the header supplied a non-empty one.
    pub fn dst_party_id(&self) -> Option<&str> {
        match self {
            HeaderOverride::Parsed(header) if !header.dst_party_id.is_empty() => {
                Some(&header.dst_party_id)
            }
            _ => None,
        }
    }
}
