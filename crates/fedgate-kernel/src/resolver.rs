//! Routing resolver: addressing context to route target.

use crate::route_table::RouteTable;
use fedgate_types::addressing::{AddressingContext, HeaderOverride};
use fedgate_types::error::RouteNotFound;
use fedgate_types::route::RouteTarget;
use std::sync::Arc;
use tracing::debug;

/// Resolves where a call should be forwarded.
///
/// Holds no per-call state; one resolver serves all concurrent calls.
pub struct Resolver {
    table: Arc<dyn RouteTable>,
}

impl Resolver {
    pub fn new(table: Arc<dyn RouteTable>) -> Self {
        Self { table }
    }

    /// Look up the target for `ctx`.
    ///
    /// A parsable header override with a destination party replaces
    /// `ctx.dst_party_id`; an unparsable one is ignored.
    pub fn resolve(&self, ctx: &AddressingContext) -> Result<RouteTarget, RouteNotFound> {
        let dst_party_id = effective_destination(ctx);

        self.table
            .lookup(&ctx.src_party_id, &ctx.src_role, &dst_party_id, &ctx.dst_role)
            .ok_or_else(|| RouteNotFound {
                src_party_id: ctx.src_party_id.clone(),
                src_role: ctx.src_role.clone(),
                dst_party_id,
                dst_role: ctx.dst_role.clone(),
            })
    }
}

/// Destination party after applying the header override, if any.
pub fn effective_destination(ctx: &AddressingContext) -> String {
    let header = HeaderOverride::parse(ctx.header_override.as_deref());
    if let HeaderOverride::Unparsable(reason) = &header {
        debug!(
            src = %ctx.src_party_id,
            dst = %ctx.dst_party_id,
            reason = %reason,
            "Ignoring unparsable route header"
        );
    }
    header
        .dst_party_id()
        .unwrap_or(&ctx.dst_party_id)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use fedgate_types::route::TransportKind;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Table keyed by destination party that records every lookup.
    #[derive(Default)]
    struct FakeTable {
        targets: HashMap<String, RouteTarget>,
        lookups: Mutex<Vec<String>>,
    }

    impl FakeTable {
        fn with(mut self, party: &str, target: RouteTarget) -> Self {
            self.targets.insert(party.to_string(), target);
            self
        }
    }

    impl RouteTable for FakeTable {
        fn lookup(
            &self,
            _src_party_id: &str,
            _src_role: &str,
            dst_party_id: &str,
            _dst_role: &str,
        ) -> Option<RouteTarget> {
            self.lookups.lock().unwrap().push(dst_party_id.to_string());
            self.targets.get(dst_party_id).cloned()
        }
    }

    fn resolver(table: FakeTable) -> (Resolver, Arc<FakeTable>) {
        let table = Arc::new(table);
        (Resolver::new(table.clone()), table)
    }

    #[test]
    fn test_resolve_returns_table_transport() {
        let (resolver, _) = resolver(
            FakeTable::default()
                .with("B", RouteTarget::rpc("10.0.0.5:9370"))
                .with("C", RouteTarget::http("10.0.0.6:8087")),
        );

        let rpc = resolver
            .resolve(&AddressingContext::new("A", "host", "B", "guest"))
            .unwrap();
        assert_eq!(rpc.transport(), TransportKind::Rpc);

        let http = resolver
            .resolve(&AddressingContext::new("A", "host", "C", "guest"))
            .unwrap();
        assert_eq!(http.transport(), TransportKind::HttpTunneled);
    }

    #[test]
    fn test_resolve_does_not_mutate_context() {
        let (resolver, _) = resolver(FakeTable::default().with("C", RouteTarget::rpc("c:1")));
        let ctx = AddressingContext::new("A", "host", "B", "guest")
            .with_header_override(br#"{"dstPartyId":"C"}"#.to_vec());
        let before = ctx.clone();
        resolver.resolve(&ctx).unwrap();
        assert_eq!(ctx, before);
    }

    #[test]
    fn test_header_override_wins() {
        let (resolver, table) = resolver(
            FakeTable::default()
                .with("B", RouteTarget::rpc("b:1"))
                .with("C", RouteTarget::rpc("c:1")),
        );
        let ctx = AddressingContext::new("A", "host", "B", "guest")
            .with_header_override(br#"{"dstPartyId":"C"}"#.to_vec());
        let target = resolver.resolve(&ctx).unwrap();
        assert_eq!(target.address(), "c:1");
        assert_eq!(*table.lookups.lock().unwrap(), vec!["C".to_string()]);
    }

    #[test]
    fn test_unparsable_override_behaves_as_absent() {
        let (resolver, _) = resolver(FakeTable::default().with("B", RouteTarget::rpc("b:1")));
        let plain = AddressingContext::new("A", "host", "B", "guest");
        let garbled = plain.clone().with_header_override(vec![0xde, 0xad, 0xbe, 0xef]);

        assert_eq!(resolver.resolve(&plain), resolver.resolve(&garbled));
        assert_eq!(effective_destination(&garbled), "B");
    }

    #[test]
    fn test_override_without_destination_falls_back() {
        let ctx = AddressingContext::new("A", "host", "B", "guest")
            .with_header_override(br#"{"srcPartyId":"A"}"#.to_vec());
        assert_eq!(effective_destination(&ctx), "B");
    }

    #[test]
    fn test_route_not_found_names_both_parties() {
        let (resolver, _) = resolver(FakeTable::default());
        let err = resolver
            .resolve(&AddressingContext::new("A", "host", "B", "guest"))
            .unwrap_err();
        assert_eq!(err.src_party_id, "A");
        assert_eq!(err.dst_party_id, "B");
        assert_eq!(err.to_string(), "A to B found no router info");
    }
}
