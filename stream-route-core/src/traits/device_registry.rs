use crate::models::device::{DeviceId, DeviceInfo, EndpointHandle};
use crate::models::error::RouteError;

/// Read access to the physical/virtual endpoint registry.
///
/// The registry owns device state; the policy engine only reads it and asks
/// for activation changes. Connectivity events must be delivered after the
/// registry already reflects them. Implemented by:
/// - `MemoryDeviceRegistry` (stream-route-host)
pub trait DeviceRegistry: Send {
    /// All known devices, connected or not.
    fn devices(&self) -> Vec<DeviceInfo>;

    fn device(&self, id: DeviceId) -> Option<DeviceInfo>;

    /// Request an activation transition. Only called for internal-codec devices.
    fn set_activated(&mut self, id: DeviceId, activated: bool) -> Result<(), RouteError>;

    /// Sink/source name a stream of `role` should attach to on this device.
    fn endpoint(&self, id: DeviceId, role: &str) -> Option<EndpointHandle>;
}
