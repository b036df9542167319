//! `fedgate route` and `fedgate call`: single-shot use of an in-process gateway.

use crate::cli::AddressArgs;
use crate::{boot_kernel, ui};
use fedgate_kernel::resolver::{effective_destination, Resolver};
use fedgate_types::addressing::AddressingContext;
use fedgate_types::envelope::{InboundEnvelope, OutboundEnvelope};
use fedgate_types::packet::{Endpoint, Packet};
use std::path::PathBuf;

impl AddressArgs {
    pub fn to_context(&self) -> AddressingContext {
        let ctx = AddressingContext::new(
            &self.src_party,
            &self.src_role,
            &self.dst_party,
            &self.dst_role,
        );
        match &self.route_header {
            Some(raw) => ctx.with_header_override(raw.as_bytes().to_vec()),
            None => ctx,
        }
    }

    /// Packet addressed like this call, carrying `key = data` in its body.
    pub fn to_packet(&self, key: &str, data: &str, task_id: &str) -> Packet {
        let mut packet = Packet::new(
            Endpoint::new(&self.src_party, &self.src_role),
            Endpoint::new(&self.dst_party, &self.dst_role),
        )
        .with_body(key, data.as_bytes().to_vec());
        packet.header.task_id = task_id.to_string();
        if let Some(raw) = &self.route_header {
            packet = packet.with_ext(raw.as_bytes().to_vec());
        }
        packet
    }
}

pub fn cmd_route(config: Option<PathBuf>, addr: AddressArgs, json: bool) {
    let kernel = boot_kernel(config);
    let resolver = Resolver::new(kernel.route_table().clone());
    let ctx = addr.to_context();

    match resolver.resolve(&ctx) {
        Ok(target) => {
            if json {
                match serde_json::to_string_pretty(&target) {
                    Ok(s) => println!("{s}"),
                    Err(e) => {
                        ui::error(&format!("Failed to serialize route: {e}"));
                        std::process::exit(1);
                    }
                }
                return;
            }
            ui::section("Route");
            ui::kv("From", &format!("{}/{}", ctx.src_party_id, ctx.src_role));
            ui::kv(
                "To",
                &format!("{}/{}", effective_destination(&ctx), ctx.dst_role),
            );
            ui::kv_ok("Transport", &target.transport().to_string());
            ui::kv_ok("Address", target.address());
            if target.transport() == fedgate_types::route::TransportKind::HttpTunneled {
                ui::kv("URL", &target.tunnel_url());
            }
        }
        Err(e) => {
            ui::error_with_fix(
                &e.to_string(),
                "Add a [[routes]] entry for the destination party: fedgate config routes",
            );
            std::process::exit(1);
        }
    }
}

pub fn cmd_call(
    config: Option<PathBuf>,
    addr: AddressArgs,
    key: &str,
    data: &str,
    task_id: &str,
) {
    let kernel = boot_kernel(config);
    let payload = match addr.to_packet(key, data, task_id).to_bytes() {
        Ok(bytes) => bytes,
        Err(e) => {
            ui::error(&format!("Failed to encode packet: {e}"));
            std::process::exit(1);
        }
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            ui::error(&format!("Failed to create Tokio runtime: {e}"));
            std::process::exit(1);
        }
    };
    let outbound = rt.block_on(kernel.gateway().handle(InboundEnvelope::Invoke { payload }));

    println!("{}", render_outbound(&outbound));
    if !outbound.is_success() {
        std::process::exit(1);
    }
}

/// JSON view of an outbound envelope, with the reply packet decoded when possible.
pub fn render_outbound(outbound: &OutboundEnvelope) -> String {
    let reply = outbound
        .payload
        .as_deref()
        .and_then(|bytes| Packet::from_bytes(bytes).ok());
    let view = serde_json::json!({
        "code": outbound.code,
        "message": outbound.message,
        "reply": reply,
    });
    serde_json::to_string_pretty(&view).unwrap_or_else(|_| view.to_string())
}
