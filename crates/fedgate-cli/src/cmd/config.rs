//! Config inspection commands.

use crate::{boot_kernel, ui};
use fedgate_kernel::config::{default_config_path, load_config};
use std::path::PathBuf;

pub fn cmd_config_show(config: Option<PathBuf>) {
    let effective = load_config(config.as_deref());
    match toml::to_string_pretty(&effective) {
        Ok(s) => print!("{s}"),
        Err(e) => {
            ui::error(&format!("Failed to render config: {e}"));
            std::process::exit(1);
        }
    }
}

pub fn cmd_config_path(config: Option<PathBuf>) {
    let path = config.unwrap_or_else(default_config_path);
    println!("{}", path.display());
    if !path.exists() {
        ui::hint("File does not exist yet; defaults are in effect");
    }
}

pub fn cmd_config_routes(config: Option<PathBuf>, json: bool) {
    let kernel = boot_kernel(config);
    let entries = kernel.route_table().entries();

    if json {
        let rows: Vec<serde_json::Value> = entries
            .iter()
            .map(|(party, role, target)| {
                serde_json::json!({
                    "party_id": party,
                    "role": role,
                    "transport": target.transport(),
                    "address": target.address(),
                })
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&rows).unwrap_or_else(|_| "[]".to_string())
        );
        return;
    }

    if entries.is_empty() {
        ui::hint("No routes configured. Add [[routes]] entries to config.toml");
        return;
    }
    ui::section(&format!("Routes ({})", entries.len()));
    for (party, role, target) in entries {
        ui::kv(&format!("{party}/{role}"), &target.to_string());
    }
}
