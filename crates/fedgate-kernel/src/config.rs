//! Configuration loading from `~/.fedgate/config.toml` with defaults.
//!
//! Large routing tables are usually kept in their own files: the `include`
//! field lists additional TOML files (relative to the config directory) that
//! are merged before the root config. Tables merge key by key with the root
//! winning; `routes` arrays are concatenated, included rows first.

use fedgate_types::config::GatewayConfig;
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use tracing::{info, warn};

/// Maximum include nesting depth.
const MAX_INCLUDE_DEPTH: u32 = 10;

/// Key whose arrays are concatenated instead of replaced during merges.
const ROUTES_KEY: &str = "routes";

/// Load gateway configuration from a TOML file, with defaults.
///
/// Any read, parse or include failure is logged and the defaults are used;
/// a gateway with no routes still boots and answers every call with a
/// no-route status.
pub fn load_config(path: Option<&Path>) -> GatewayConfig {
    let config_path = path
        .map(|p| p.to_path_buf())
        .unwrap_or_else(default_config_path);

    if !config_path.exists() {
        info!(path = %config_path.display(), "Config file not found, using defaults");
        return GatewayConfig::default();
    }

    match try_load_config(&config_path) {
        Ok(config) => {
            info!(
                path = %config_path.display(),
                routes = config.routes.len(),
                "Loaded configuration"
            );
            config
        }
        Err(e) => {
            warn!(
                error = %e,
                path = %config_path.display(),
                "Failed to load config, using defaults"
            );
            GatewayConfig::default()
        }
    }
}

/// Strict variant of [`load_config`]: every failure is returned.
pub fn try_load_config(config_path: &Path) -> Result<GatewayConfig, String> {
    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));
    let mut loader = IncludeLoader::new(base_dir)?;
    let merged = loader.load(config_path, 0)?;
    merged
        .try_into::<GatewayConfig>()
        .map_err(|e| format!("Failed to deserialize config: {e}"))
}

/// Loads a TOML file and everything it includes, merged into one value.
///
/// Includes must stay inside the directory of the root config: absolute
/// paths, `..` components and symlinks pointing outside are rejected, as is
/// any file reached twice.
struct IncludeLoader {
    root_dir: PathBuf,
    seen: HashSet<PathBuf>,
}

impl IncludeLoader {
    fn new(root_dir: &Path) -> Result<Self, String> {
        let root_dir = std::fs::canonicalize(root_dir)
            .map_err(|e| format!("Config directory {} is not accessible: {e}", root_dir.display()))?;
        Ok(Self {
            root_dir,
            seen: HashSet::new(),
        })
    }

    fn load(&mut self, path: &Path, depth: u32) -> Result<toml::Value, String> {
        if depth > MAX_INCLUDE_DEPTH {
            return Err(format!("Includes nested deeper than {MAX_INCLUDE_DEPTH} levels"));
        }
        let canonical = std::fs::canonicalize(path)
            .map_err(|e| format!("Cannot resolve {}: {e}", path.display()))?;
        if !self.seen.insert(canonical.clone()) {
            return Err(format!("Circular config include: {}", path.display()));
        }

        let text = std::fs::read_to_string(&canonical)
            .map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
        let mut value: toml::Value = toml::from_str(&text)
            .map_err(|e| format!("Failed to parse {}: {e}", path.display()))?;

        let includes = take_includes(&mut value);
        if includes.is_empty() {
            return Ok(value);
        }

        let dir = canonical.parent().unwrap_or(&self.root_dir).to_path_buf();
        let mut merged = toml::Value::Table(toml::map::Map::new());
        for include in includes {
            let target = self.check_include(&dir, &include)?;
            info!(include = %include, "Loading config include");
            let included = self.load(&target, depth + 1)?;
            deep_merge_toml(&mut merged, &included);
        }
        // The including file wins over what it includes
        deep_merge_toml(&mut merged, &value);
        Ok(merged)
    }

    fn check_include(&self, dir: &Path, include: &str) -> Result<PathBuf, String> {
        let relative = Path::new(include);
        if relative.is_absolute() {
            return Err(format!("Config include rejects absolute path: {include}"));
        }
        if relative.components().any(|c| c == Component::ParentDir) {
            return Err(format!("Config include rejects path traversal: {include}"));
        }
        let resolved = std::fs::canonicalize(dir.join(relative))
            .map_err(|e| format!("Config include '{include}' cannot be resolved: {e}"))?;
        if !resolved.starts_with(&self.root_dir) {
            return Err(format!("Config include '{include}' escapes the config directory"));
        }
        Ok(resolved)
    }
}

/// Remove and return the `include` list of a parsed file.
fn take_includes(value: &mut toml::Value) -> Vec<String> {
    let Some(table) = value.as_table_mut() else {
        return Vec::new();
    };
    match table.remove("include") {
        Some(toml::Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                toml::Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        Some(toml::Value::String(single)) => vec![single],
        _ => Vec::new(),
    }
}

/// Deep-merge two TOML values. `overlay` values override `base` values,
/// except `routes` arrays, which are appended.
pub fn deep_merge_toml(base: &mut toml::Value, overlay: &toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_tbl), toml::Value::Table(overlay_tbl)) => {
            for (key, overlay_val) in overlay_tbl {
                match (base_tbl.get_mut(key), overlay_val) {
                    (Some(toml::Value::Array(base_arr)), toml::Value::Array(overlay_arr))
                        if key == ROUTES_KEY =>
                    {
                        base_arr.extend(overlay_arr.iter().cloned());
                    }
                    (Some(base_val), _) => deep_merge_toml(base_val, overlay_val),
                    (None, _) => {
                        base_tbl.insert(key.clone(), overlay_val.clone());
                    }
                }
            }
        }
        (base, overlay) => {
            *base = overlay.clone();
        }
    }
}

/// Get the default FedGate home directory.
pub fn fedgate_home() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(".fedgate")
}

/// Get the default config file path.
pub fn default_config_path() -> PathBuf {
    fedgate_home().join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(path: &Path, lines: &[&str]) {
        let mut f = std::fs::File::create(path).unwrap();
        for line in lines {
            writeln!(f, "{line}").unwrap();
        }
    }

    #[test]
    fn test_load_config_missing_file() {
        let config = load_config(Some(Path::new("/nonexistent/fedgate.toml")));
        assert_eq!(config.node_id, "fedgate-node");
        assert!(config.routes.is_empty());
    }

    #[test]
    fn test_load_config_invalid_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        write_file(&path, &["rpc_listen_addr = \"not an address\""]);
        let config = load_config(Some(&path));
        assert_eq!(config.rpc_listen_addr.port(), 9370);
        assert!(try_load_config(&path).is_err());
    }

    #[test]
    fn test_load_config_with_routes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        write_file(
            &path,
            &[
                "node_id = \"gw-10000\"",
                "rpc_listen_addr = \"127.0.0.1:19370\"",
                "[[routes]]",
                "party_id = \"9999\"",
                "address = \"10.0.0.5:9370\"",
            ],
        );
        let config = load_config(Some(&path));
        assert_eq!(config.node_id, "gw-10000");
        assert_eq!(config.rpc_listen_addr.port(), 19370);
        assert_eq!(config.routes.len(), 1);
        assert_eq!(config.routes[0].party_id, "9999");
    }

    #[test]
    fn test_deep_merge_nested_tables() {
        let mut base: toml::Value = toml::from_str(
            r#"
            [transport]
            rpc_timeout_secs = 10
            http_timeout_secs = 20
        "#,
        )
        .unwrap();
        let overlay: toml::Value = toml::from_str(
            r#"
            [transport]
            rpc_timeout_secs = 3
        "#,
        )
        .unwrap();
        deep_merge_toml(&mut base, &overlay);
        let transport = base["transport"].as_table().unwrap();
        assert_eq!(transport["rpc_timeout_secs"].as_integer(), Some(3));
        assert_eq!(transport["http_timeout_secs"].as_integer(), Some(20));
    }

    #[test]
    fn test_deep_merge_appends_routes() {
        let mut base: toml::Value = toml::from_str(
            r#"
            [[routes]]
            party_id = "1"
            address = "a:1"
        "#,
        )
        .unwrap();
        let overlay: toml::Value = toml::from_str(
            r#"
            [[routes]]
            party_id = "2"
            address = "b:2"
        "#,
        )
        .unwrap();
        deep_merge_toml(&mut base, &overlay);
        assert_eq!(base["routes"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_routes_from_include() {
        let dir = tempfile::tempdir().unwrap();
        let routes_path = dir.path().join("routes.toml");
        let root_path = dir.path().join("config.toml");

        write_file(
            &routes_path,
            &[
                "node_id = \"from-include\"",
                "[[routes]]",
                "party_id = \"9999\"",
                "address = \"10.0.0.5:9370\"",
            ],
        );
        write_file(
            &root_path,
            &[
                "include = [\"routes.toml\"]",
                "node_id = \"root\"",
                "[[routes]]",
                "party_id = \"8888\"",
                "protocol = \"http\"",
                "address = \"gw.example.org\"",
            ],
        );

        let config = load_config(Some(&root_path));
        assert_eq!(config.node_id, "root");
        let parties: Vec<&str> = config.routes.iter().map(|r| r.party_id.as_str()).collect();
        assert_eq!(parties, vec!["9999", "8888"]);
    }

    #[test]
    fn test_circular_include_detected() {
        let dir = tempfile::tempdir().unwrap();
        let a_path = dir.path().join("a.toml");
        let b_path = dir.path().join("b.toml");
        write_file(&a_path, &["include = [\"b.toml\"]", "node_id = \"a\""]);
        write_file(&b_path, &["include = [\"a.toml\"]"]);

        let err = try_load_config(&a_path).unwrap_err();
        assert!(err.contains("Circular"), "got {err}");
        // The lenient loader falls back to defaults
        assert_eq!(load_config(Some(&a_path)).node_id, "fedgate-node");
    }

    #[test]
    fn test_path_traversal_blocked() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("config.toml");
        write_file(&root, &["include = [\"../etc/passwd\"]"]);

        let err = try_load_config(&root).unwrap_err();
        assert!(err.contains("traversal"), "got {err}");
    }

    #[test]
    fn test_absolute_include_blocked() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("config.toml");
        write_file(&root, &["include = [\"/etc/fedgate/routes.toml\"]"]);

        let err = try_load_config(&root).unwrap_err();
        assert!(err.contains("absolute"), "got {err}");
    }

    #[test]
    fn test_default_config_path() {
        assert!(default_config_path().ends_with(".fedgate/config.toml"));
    }
}
