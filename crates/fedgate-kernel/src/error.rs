//! Kernel-specific error types.

use fedgate_types::error::GatewayError;
use fedgate_wire::WireError;
use thiserror::Error;

/// Kernel error type wrapping gateway and wire errors with boot context.
#[derive(Error, Debug)]
pub enum KernelError {
    /// A wrapped gateway call error.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// A transport error (bind, client construction).
    #[error(transparent)]
    Wire(#[from] WireError),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The kernel failed to boot.
    #[error("Boot failed: {0}")]
    BootFailed(String),
}

/// Alias for kernel results.
pub type KernelResult<T> = Result<T, KernelError>;
