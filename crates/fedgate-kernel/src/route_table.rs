//! Routing table: destination party to network target.
//!
//! The table is keyed by destination party. Each party maps roles to
//! targets; a role-specific entry wins over the party's `default` entry.

use fedgate_types::config::{RouteEntry, DEFAULT_ROLE};
use fedgate_types::route::RouteTarget;
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::{debug, info, warn};

/// Source of routing decisions.
pub trait RouteTable: Send + Sync {
    /// Target for a call from `src` to `dst`, if any.
    fn lookup(
        &self,
        src_party_id: &str,
        src_role: &str,
        dst_party_id: &str,
        dst_role: &str,
    ) -> Option<RouteTarget>;
}

type PartyRoutes = HashMap<String, HashMap<String, RouteTarget>>;

/// In-memory table built from `[[routes]]` config entries.
#[derive(Default)]
pub struct StaticRouteTable {
    routes: RwLock<PartyRoutes>,
}

impl StaticRouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from config entries. Invalid entries are logged and skipped.
    pub fn from_entries(entries: &[RouteEntry]) -> Self {
        let table = Self::new();
        table.replace(entries);
        table
    }

    /// Add or overwrite the target for one party and role.
    pub fn insert(&self, party_id: impl Into<String>, role: impl Into<String>, target: RouteTarget) {
        let mut routes = self.routes.write().unwrap_or_else(|e| e.into_inner());
        routes
            .entry(party_id.into())
            .or_default()
            .insert(role.into(), target);
    }

    /// Swap the whole table for the valid subset of `entries`.
    ///
    /// Returns the number of routes installed.
    pub fn replace(&self, entries: &[RouteEntry]) -> usize {
        let mut fresh = PartyRoutes::new();
        let mut installed = 0;
        for entry in entries {
            match entry.to_target() {
                Ok(target) => {
                    let role = if entry.role.trim().is_empty() {
                        DEFAULT_ROLE.to_string()
                    } else {
                        entry.role.clone()
                    };
                    fresh
                        .entry(entry.party_id.clone())
                        .or_default()
                        .insert(role, target);
                    installed += 1;
                }
                Err(e) => {
                    warn!(party = %entry.party_id, error = %e, "Skipping invalid route entry");
                }
            }
        }
        *self.routes.write().unwrap_or_else(|e| e.into_inner()) = fresh;
        info!(routes = installed, "Route table loaded");
        installed
    }

    /// Total number of (party, role) routes.
    pub fn len(&self) -> usize {
        self.routes
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .map(HashMap::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All routes as `(party, role, target)`, sorted by party then role.
    pub fn entries(&self) -> Vec<(String, String, RouteTarget)> {
        let routes = self.routes.read().unwrap_or_else(|e| e.into_inner());
        let mut out: Vec<_> = routes
            .iter()
            .flat_map(|(party, roles)| {
                roles
                    .iter()
                    .map(move |(role, target)| (party.clone(), role.clone(), target.clone()))
            })
            .collect();
        out.sort_by(|a, b| (&a.0, &a.1).cmp(&(&b.0, &b.1)));
        out
    }
}

impl RouteTable for StaticRouteTable {
    fn lookup(
        &self,
        src_party_id: &str,
        _src_role: &str,
        dst_party_id: &str,
        dst_role: &str,
    ) -> Option<RouteTarget> {
        let routes = self.routes.read().unwrap_or_else(|e| e.into_inner());
        let roles = routes.get(dst_party_id)?;
        let target = roles.get(dst_role).or_else(|| roles.get(DEFAULT_ROLE))?;
        debug!(src = %src_party_id, dst = %dst_party_id, role = %dst_role, route = %target, "Route lookup hit");
        Some(target.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fedgate_types::route::TransportKind;

    fn entry(party: &str, role: &str, protocol: &str, address: &str) -> RouteEntry {
        RouteEntry {
            party_id: party.to_string(),
            role: role.to_string(),
            protocol: protocol.to_string(),
            address: address.to_string(),
            use_tls: false,
            path_prefix: None,
        }
    }

    #[test]
    fn test_lookup_default_role() {
        let table = StaticRouteTable::from_entries(&[entry("B", "default", "rpc", "10.0.0.5:9370")]);
        let target = table.lookup("A", "host", "B", "guest").unwrap();
        assert_eq!(target.transport(), TransportKind::Rpc);
        assert_eq!(target.address(), "10.0.0.5:9370");
    }

    #[test]
    fn test_role_specific_entry_wins() {
        let table = StaticRouteTable::from_entries(&[
            entry("B", "default", "rpc", "10.0.0.5:9370"),
            entry("B", "arbiter", "http", "10.0.0.6:8087"),
        ]);
        let arbiter = table.lookup("A", "host", "B", "arbiter").unwrap();
        assert_eq!(arbiter.transport(), TransportKind::HttpTunneled);
        let guest = table.lookup("A", "host", "B", "guest").unwrap();
        assert_eq!(guest.address(), "10.0.0.5:9370");
    }

    #[test]
    fn test_unknown_party_misses() {
        let table = StaticRouteTable::from_entries(&[entry("B", "default", "rpc", "10.0.0.5:9370")]);
        assert!(table.lookup("A", "host", "C", "guest").is_none());
    }

    #[test]
    fn test_role_without_default_misses() {
        let table = StaticRouteTable::from_entries(&[entry("B", "arbiter", "rpc", "10.0.0.5:9370")]);
        assert!(table.lookup("A", "host", "B", "guest").is_none());
    }

    #[test]
    fn test_invalid_entries_skipped() {
        let table = StaticRouteTable::from_entries(&[
            entry("B", "default", "carrier-pigeon", "10.0.0.5:9370"),
            entry("C", "default", "rpc", "  "),
            entry("D", "", "grpc", "10.0.0.7:9370"),
        ]);
        assert_eq!(table.len(), 1);
        assert!(table.lookup("A", "host", "D", "guest").is_some());
    }

    #[test]
    fn test_replace_swaps_everything() {
        let table = StaticRouteTable::from_entries(&[entry("B", "default", "rpc", "10.0.0.5:9370")]);
        let installed = table.replace(&[entry("C", "default", "http", "gw.example.org")]);
        assert_eq!(installed, 1);
        assert!(table.lookup("A", "host", "B", "guest").is_none());
        assert!(table.lookup("A", "host", "C", "guest").is_some());
    }

    #[test]
    fn test_insert_and_entries() {
        let table = StaticRouteTable::new();
        assert!(table.is_empty());
        table.insert("B", "guest", RouteTarget::rpc("10.0.0.5:9370"));
        table.insert("A", "default", RouteTarget::http("10.0.0.1:8087"));
        let entries = table.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].0, "A");
        assert_eq!(entries[1].1, "guest");
    }
}
