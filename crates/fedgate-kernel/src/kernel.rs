//! FedGateKernel: assembles the gateway from configuration and runs it.

use crate::config::load_config;
use crate::dispatcher::Dispatcher;
use crate::error::{KernelError, KernelResult};
use crate::gateway::Gateway;
use crate::resolver::Resolver;
use crate::route_table::StaticRouteTable;
use fedgate_types::config::GatewayConfig;
use fedgate_wire::{serve_tunnel, HttpTunnelClient, RpcServer, RpcServerConfig, TcpConnectionPool};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// The assembled gateway node.
pub struct FedGateKernel {
    config: GatewayConfig,
    route_table: Arc<StaticRouteTable>,
    pool: Arc<TcpConnectionPool>,
    gateway: Arc<Gateway>,
}

/// Handles for a running node's two listeners.
pub struct RunningNode {
    pub rpc_addr: SocketAddr,
    pub http_addr: SocketAddr,
    rpc_task: JoinHandle<()>,
    http_task: JoinHandle<()>,
}

impl RunningNode {
    /// Wait until either listener exits, then stop the other.
    pub async fn wait(mut self) {
        tokio::select! {
            _ = &mut self.rpc_task => {
                warn!("RPC listener exited");
                self.http_task.abort();
            }
            _ = &mut self.http_task => {
                warn!("Tunnel listener exited");
                self.rpc_task.abort();
            }
        }
    }

    /// Stop both listeners.
    pub fn shutdown(&self) {
        self.rpc_task.abort();
        self.http_task.abort();
    }
}

impl FedGateKernel {
    /// Boot from the config file at `config_path` (or the default path).
    pub fn boot(config_path: Option<&Path>) -> KernelResult<Self> {
        let config = load_config(config_path);
        Self::boot_with_config(config)
    }

    /// Boot from an already-loaded configuration.
    pub fn boot_with_config(config: GatewayConfig) -> KernelResult<Self> {
        let transport = &config.transport;
        for (key, value) in [
            ("max_message_bytes", u64::from(transport.max_message_bytes)),
            ("rpc_timeout_secs", transport.rpc_timeout_secs),
            ("http_timeout_secs", transport.http_timeout_secs),
        ] {
            if value == 0 {
                return Err(KernelError::Config(format!(
                    "transport.{key} must be greater than zero"
                )));
            }
        }

        let route_table = Arc::new(StaticRouteTable::from_entries(&config.routes));
        let pool = Arc::new(TcpConnectionPool::new(
            Duration::from_secs(config.transport.rpc_timeout_secs),
            config.transport.max_message_bytes,
        ));
        let tunnel = HttpTunnelClient::new(Duration::from_secs(config.transport.http_timeout_secs))
            .map_err(|e| KernelError::BootFailed(e.to_string()))?;

        let resolver = Resolver::new(route_table.clone());
        let dispatcher = Dispatcher::new(pool.clone(), Arc::new(tunnel));
        let gateway = Arc::new(Gateway::new(resolver, dispatcher));

        info!(
            node = %config.node_id,
            routes = route_table.len(),
            "FedGate kernel booted"
        );

        Ok(Self {
            config,
            route_table,
            pool,
            gateway,
        })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn route_table(&self) -> &Arc<StaticRouteTable> {
        &self.route_table
    }

    pub fn gateway(&self) -> &Arc<Gateway> {
        &self.gateway
    }

    /// Number of remote addresses with a pooled RPC channel.
    pub fn pooled_connections(&self) -> usize {
        self.pool.len()
    }

    /// Reload routes from config entries, swapping the table in place.
    pub fn reload_routes(&self, config: &GatewayConfig) -> usize {
        self.route_table.replace(&config.routes)
    }

    /// Start the RPC listener and the HTTP tunnel ingress.
    pub async fn start(&self) -> KernelResult<RunningNode> {
        let rpc_config = RpcServerConfig {
            listen_addr: self.config.rpc_listen_addr,
            max_message_size: self.config.transport.max_message_bytes,
        };
        let (server, rpc_task) = RpcServer::start(rpc_config, self.gateway.clone()).await?;
        let (http_addr, http_task) =
            match serve_tunnel(self.config.http_listen_addr, self.gateway.clone()).await {
                Ok(bound) => bound,
                Err(e) => {
                    rpc_task.abort();
                    return Err(e.into());
                }
            };

        info!(
            node = %self.config.node_id,
            rpc = %server.local_addr(),
            http = %http_addr,
            "FedGate node started"
        );

        Ok(RunningNode {
            rpc_addr: server.local_addr(),
            http_addr,
            rpc_task,
            http_task,
        })
    }
}
