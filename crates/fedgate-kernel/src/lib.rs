//! Routing and dispatch core for the FedGate RPC gateway.
//!
//! A unary call flows strictly downward:
//!
//! - [`gateway::Gateway`] decodes the inbound envelope,
//! - [`resolver::Resolver`] turns the addressing context into a
//!   [`RouteTarget`](fedgate_types::route::RouteTarget),
//! - [`dispatcher::Dispatcher`] makes exactly one forwarding attempt,
//! - and the gateway encodes the outcome into an outbound envelope.
//!
//! [`kernel::FedGateKernel`] wires the concrete collaborators together from
//! configuration and starts the RPC and HTTP tunnel ingresses.

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod gateway;
pub mod kernel;
pub mod resolver;
pub mod route_table;

pub use kernel::FedGateKernel;
