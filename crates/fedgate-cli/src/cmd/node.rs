//! `fedgate start`: run the gateway node until interrupted.

use crate::{boot_kernel, ui};
use std::path::PathBuf;
use tracing::info;

pub fn cmd_start(config: Option<PathBuf>) {
    let kernel = boot_kernel(config);

    ui::banner();
    ui::blank();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            ui::error(&format!("Failed to create Tokio runtime: {e}"));
            std::process::exit(1);
        }
    };

    rt.block_on(async {
        let node = match kernel.start().await {
            Ok(node) => node,
            Err(e) => {
                ui::error_with_fix(
                    &format!("Failed to start listeners: {e}"),
                    "Check that rpc_listen_addr and http_listen_addr are free: fedgate config show",
                );
                std::process::exit(1);
            }
        };

        ui::success(&format!("Node '{}' started", kernel.config().node_id));
        ui::kv_ok("RPC", &node.rpc_addr.to_string());
        ui::kv_ok("HTTP tunnel", &node.http_addr.to_string());
        ui::kv("Routes", &kernel.route_table().len().to_string());
        ui::blank();
        ui::hint("Press Ctrl+C to stop");

        // Dropping the runtime on return stops both listeners.
        tokio::select! {
            _ = tokio::signal::ctrl_c() => info!("Shutdown requested"),
            _ = node.wait() => {}
        }
    });
}
