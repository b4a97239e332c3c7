use thiserror::Error;

/// Errors that can occur while applying routing policy.
///
/// Most of these are recoverable: the engine logs them and keeps going with
/// best-effort state. Only caller mistakes (unknown handles, bad restriction
/// names) are surfaced from the public operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RouteError {
    /// Malformed or missing role-table / policy configuration.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("device not available: {0}")]
    DeviceUnavailable(String),

    /// The HAL rejected a routing command.
    #[error("route command failed: {0}")]
    RouteCommandFailed(String),

    /// An arbitration invariant was violated. Indicates a defect.
    #[error("inconsistent state: {0}")]
    InconsistentState(String),

    #[error("unknown stream: {0}")]
    UnknownStream(String),

    #[error("unknown parent group: {0}")]
    UnknownGroup(u32),

    #[error("invalid restriction: {0}")]
    InvalidRestriction(String),

    #[error("invalid transition: {0}")]
    InvalidTransition(String),
}
