//! Framed RPC message types.
//!
//! Every frame is JSON prefixed with a 4-byte big-endian length header.
//! A unary call is one `unary_request` frame answered by exactly one
//! `unary_response` or `error` frame carrying the same id.

use crate::error::WireError;
use fedgate_types::serde_compat::base64_bytes;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Maximum single frame size (16 MB).
pub const MAX_MESSAGE_SIZE: u32 = 16 * 1024 * 1024;

/// A framed RPC message (envelope).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcFrame {
    /// Correlates a response with its request.
    pub id: String,
    #[serde(flatten)]
    pub kind: RpcFrameKind,
}

/// The different kinds of frames.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RpcFrameKind {
    /// Unary call carrying serialized packet bytes.
    #[serde(rename = "unary_request")]
    Request {
        #[serde(with = "base64_bytes")]
        payload: Vec<u8>,
    },
    /// Successful reply carrying serialized packet bytes.
    #[serde(rename = "unary_response")]
    Response {
        #[serde(with = "base64_bytes", default)]
        payload: Vec<u8>,
    },
    /// Failed reply.
    #[serde(rename = "error")]
    Error { code: String, message: String },
}

impl RpcFrame {
    /// New request frame with a fresh id.
    pub fn request(payload: Vec<u8>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind: RpcFrameKind::Request { payload },
        }
    }

    /// Reply frame for `id`.
    pub fn response(id: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            id: id.into(),
            kind: RpcFrameKind::Response { payload },
        }
    }

    /// Error frame for `id`.
    pub fn error(id: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: RpcFrameKind::Error {
                code: code.into(),
                message: message.into(),
            },
        }
    }
}

/// Encode a frame to bytes (4-byte big-endian length + JSON).
pub fn encode_frame(frame: &RpcFrame) -> Result<Vec<u8>, serde_json::Error> {
    let json = serde_json::to_vec(frame)?;
    let len = json.len() as u32;
    let mut bytes = Vec::with_capacity(4 + json.len());
    bytes.extend_from_slice(&len.to_be_bytes());
    bytes.extend_from_slice(&json);
    Ok(bytes)
}

/// Decode the length prefix from a 4-byte header.
pub fn decode_length(header: &[u8; 4]) -> u32 {
    u32::from_be_bytes(*header)
}

/// Parse a JSON body into a frame.
pub fn decode_frame(body: &[u8]) -> Result<RpcFrame, serde_json::Error> {
    serde_json::from_slice(body)
}

/// Write a frame to a stream.
pub async fn write_frame<W>(writer: &mut W, frame: &RpcFrame) -> Result<(), WireError>
where
    W: AsyncWrite + Unpin,
{
    let bytes = encode_frame(frame)?;
    writer.write_all(&bytes).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one frame from a stream, rejecting frames larger than `max_size`.
pub async fn read_frame<R>(reader: &mut R, max_size: u32) -> Result<RpcFrame, WireError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; 4];
    match reader.read_exact(&mut header).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(WireError::ConnectionClosed);
        }
        Err(e) => return Err(WireError::Io(e)),
    }

    let len = decode_length(&header);
    if len > max_size {
        return Err(WireError::MessageTooLarge {
            size: len,
            max: max_size,
        });
    }

    let mut body = vec![0u8; len as usize];
    reader.read_exact(&mut body).await?;

    Ok(decode_frame(&body)?)
}
