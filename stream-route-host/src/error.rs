use stream_route_core::RouteError;
use thiserror::Error;

/// Errors raised by the host harness around the policy engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HostError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("invalid script: {0}")]
    Script(String),

    #[error("device not found: {0}")]
    UnknownDevice(String),

    #[error(transparent)]
    Policy(#[from] RouteError),
}
