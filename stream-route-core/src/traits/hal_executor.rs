use crate::models::device::Direction;
use crate::models::error::RouteError;
use crate::models::route::{CombinedId, RouteCommand};
use crate::models::stream::StreamId;
use crate::processing::combined::CombinedDevice;

/// Commands the policy engine sends to the hardware abstraction layer.
///
/// Calls are fire-and-forget from the engine's point of view: a returned
/// error is logged and never retried inline. Implementations must not block
/// the control thread on PCM I/O.
pub trait HalExecutor: Send {
    /// Program the codec path for one direction.
    fn apply_route(&mut self, command: &RouteCommand) -> Result<(), RouteError>;

    fn apply_route_option(&mut self, role: &str, name: &str, value: i32) -> Result<(), RouteError>;

    /// Tell the HAL a stream of `role` attached to / detached from the codec.
    fn notify_stream_connection(
        &mut self,
        role: &str,
        direction: Direction,
        index: u32,
        connected: bool,
    ) -> Result<(), RouteError>;

    /// Apply or remove a zero-gain modifier on a stream.
    fn set_stream_muted(&mut self, stream: StreamId, muted: bool) -> Result<(), RouteError>;

    /// Instantiate the mixing endpoint behind a freshly created combined device.
    fn instantiate_combined(&mut self, combined: &CombinedDevice) -> Result<(), RouteError>;

    fn release_combined(&mut self, id: CombinedId) -> Result<(), RouteError>;
}
