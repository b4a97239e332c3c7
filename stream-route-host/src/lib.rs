//! # stream-route-host
//!
//! In-memory host backend for stream-route-core.
//!
//! Provides:
//! - `MemoryDeviceRegistry` — device registry with plug/unplug and activation state
//! - `RecordingHal` — HAL executor that records every call, with failure injection
//! - `SignalLog` — delegate that queues policy notifications
//! - `Replay` — drives `RoutePolicy` from a JSON event script
//! - `stream_map` — the built-in role → policy table
//!
//! ## Usage
//! ```ignore
//! use stream_route_core::{PolicyConfig, RoutePolicy, StreamRequest};
//! use stream_route_host::{stream_map, MemoryDeviceRegistry, RecordingHal};
//!
//! let roles = stream_map::default_role_table()?;
//! let mut policy = RoutePolicy::new(MemoryDeviceRegistry::new(), RecordingHal::new(), roles, PolicyConfig::default())?;
//! let id = policy.prepare(StreamRequest::playback("media"))?;
//! policy.started(id)?;
//! ```

pub mod device_registry;
pub mod error;
pub mod recording_hal;
pub mod replay;
pub mod signals;
pub mod stream_map;

pub use device_registry::MemoryDeviceRegistry;
pub use error::HostError;
pub use recording_hal::{HalCall, RecordingHal};
pub use replay::{Replay, Script, Step};
pub use signals::{Signal, SignalLog};
