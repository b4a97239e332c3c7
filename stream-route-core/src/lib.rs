//! # stream-route-core
//!
//! Platform-agnostic stream routing policy.
//!
//! Decides, for every playback and capture stream, which physical device it
//! is attached to, and which single stream per direction (the winner) drives
//! the internal codec. Reacts to device hot-plug, focus changes, manual
//! device assignment and recording restrictions. Backends implement the
//! `DeviceRegistry` and `HalExecutor` traits and plug into the generic
//! `RoutePolicy`.
//!
//! ## Architecture
//!
//! ```text
//! stream-route-core (this crate)
//! ├── traits/       ← DeviceRegistry, HalExecutor, PolicyDelegate
//! ├── models/       ← RouteError, PolicyConfig, RoleTable, devices, routes, streams, events
//! ├── processing/   ← RouteSelector, combined devices, arbitration rules
//! ├── registry/     ← StreamRegistry arena, GroupTracker, RestrictionGate
//! └── session/      ← RoutePolicy (generic orchestrator, connectivity reactor)
//! ```

pub mod models;
pub mod processing;
pub mod registry;
pub mod session;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use models::config::PolicyConfig;
pub use models::device::{DeviceId, DeviceInfo, DeviceType, Direction, EndpointHandle};
pub use models::error::RouteError;
pub use models::events::{ConnectivityReport, MuteEventId, PolicyEvent, PolicyOutcome, StreamMove};
pub use models::role_table::{RoleTable, RouteTypeDefinition, VolumeTypes};
pub use models::route::{CombinedId, RouteChange, RouteCommand, RouteDevice, RouteTarget, RouteType};
pub use models::stream::{FocusMask, GroupId, Stream, StreamId, StreamRequest, StreamState};
pub use processing::combined::{CombinePool, CombinedDevice};
pub use processing::selector::{RouteSelector, Selection};
pub use session::engine::RoutePolicy;
pub use traits::device_registry::DeviceRegistry;
pub use traits::hal_executor::HalExecutor;
pub use traits::policy_delegate::PolicyDelegate;
