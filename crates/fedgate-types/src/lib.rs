//! Core types for the FedGate cross-party RPC gateway.
//!
//! This crate defines the data structures shared by the wire layer, the
//! routing/dispatch kernel and the CLI. It contains no business logic.

pub mod addressing;
pub mod config;
pub mod envelope;
pub mod error;
pub mod packet;
pub mod route;
pub mod serde_compat;
