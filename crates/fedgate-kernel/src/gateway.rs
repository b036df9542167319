//! Call gateway: decode, resolve, dispatch, encode.
//!
//! Every failure is terminal for its call and ends up as a status code plus
//! message in the [`OutboundEnvelope`]. Nothing is retried here.

use crate::dispatcher::Dispatcher;
use crate::resolver::Resolver;
use async_trait::async_trait;
use bytes::Bytes;
use fedgate_types::addressing::AddressingContext;
use fedgate_types::envelope::{InboundEnvelope, OutboundEnvelope};
use fedgate_types::error::{GatewayError, GatewayResult};
use fedgate_types::packet::Packet;
use fedgate_wire::UnaryHandler;
use std::fmt;
use std::time::Instant;
use tracing::{debug, info, info_span, trace, warn, Instrument};

/// Action name recorded for every unary call.
pub const ACTION_UNARY_CALL: &str = "UNARY_CALL";

/// Progress of one call through the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallStage {
    Received,
    Decoded,
    Routed,
    Dispatched,
    Encoded,
    /// Terminal. Entered from any stage before `Encoded`.
    Errored,
}

impl fmt::Display for CallStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CallStage::Received => "received",
            CallStage::Decoded => "decoded",
            CallStage::Routed => "routed",
            CallStage::Dispatched => "dispatched",
            CallStage::Encoded => "encoded",
            CallStage::Errored => "errored",
        };
        f.write_str(name)
    }
}

/// Entry point for unary calls from any ingress.
pub struct Gateway {
    resolver: Resolver,
    dispatcher: Dispatcher,
}

impl Gateway {
    pub fn new(resolver: Resolver, dispatcher: Dispatcher) -> Self {
        Self {
            resolver,
            dispatcher,
        }
    }

    /// Validate the inbound envelope and extract addressing plus payload.
    pub fn decode(inbound: InboundEnvelope) -> GatewayResult<(AddressingContext, Bytes)> {
        let payload = match inbound {
            InboundEnvelope::Invoke { payload } => payload,
            InboundEnvelope::Unrecognized { kind } => {
                return Err(GatewayError::Parameter(format!(
                    "unrecognized request kind '{kind}'"
                )));
            }
        };
        if payload.is_empty() {
            return Err(GatewayError::Parameter("empty payload".to_string()));
        }
        let packet = Packet::from_bytes(&payload)
            .map_err(|e| GatewayError::Parameter(format!("payload is not a packet: {e}")))?;
        Ok((packet.addressing(), Bytes::from(payload)))
    }

    /// Run one call and return the remote response bytes.
    pub async fn call(&self, inbound: InboundEnvelope) -> GatewayResult<Bytes> {
        trace!(stage = %CallStage::Received);

        let (ctx, payload) = Self::decode(inbound)?;
        trace!(stage = %CallStage::Decoded, src = %ctx.src_party_id, dst = %ctx.dst_party_id);

        let target = self.resolver.resolve(&ctx)?;
        debug!(stage = %CallStage::Routed, route = %target, "Route resolved");

        let response = self.dispatcher.dispatch(&target, payload).await?;
        trace!(stage = %CallStage::Dispatched, bytes = response.len());

        Ok(response)
    }

    /// Run one call and encode the outcome. Never fails.
    pub async fn handle(&self, inbound: InboundEnvelope) -> OutboundEnvelope {
        let trace_id = uuid::Uuid::new_v4();
        let span = info_span!("call", trace_id = %trace_id, action = ACTION_UNARY_CALL);

        async {
            let started = Instant::now();
            let result = self.call(inbound).await;
            let outbound = Self::encode(result);
            let elapsed_ms = started.elapsed().as_millis() as u64;

            if outbound.is_success() {
                info!(stage = %CallStage::Encoded, elapsed_ms, "Call completed");
            } else {
                warn!(
                    stage = %CallStage::Errored,
                    code = %outbound.code,
                    message = %outbound.message,
                    elapsed_ms,
                    "Call failed"
                );
            }
            outbound
        }
        .instrument(span)
        .await
    }

    /// Turn a call result into the caller-facing envelope.
    pub fn encode(result: GatewayResult<Bytes>) -> OutboundEnvelope {
        match result {
            Ok(payload) => OutboundEnvelope::success(payload.to_vec()),
            Err(e) => OutboundEnvelope::failure(e.status_code(), e.to_string()),
        }
    }
}

#[async_trait]
impl UnaryHandler for Gateway {
    async fn handle_unary(&self, payload: Vec<u8>) -> OutboundEnvelope {
        self.handle(InboundEnvelope::Invoke { payload }).await
    }
}
