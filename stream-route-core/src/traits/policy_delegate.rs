use crate::models::device::{DeviceId, Direction};
use crate::models::events::MuteEventId;
use crate::models::route::RouteTarget;
use crate::models::stream::StreamId;

/// Observer for routing decisions, typically bridged to IPC signals.
///
/// All methods are called on the control thread while the triggering event
/// is being processed. Implementations should hand off anything slow.
pub trait PolicyDelegate: Send + Sync {
    /// The highest-priority stream for `direction` changed.
    fn on_winner_changed(&self, direction: Direction, winner: Option<StreamId>);

    fn on_stream_moved(&self, stream: StreamId, target: &RouteTarget);

    /// Streams muted while `device` is being disconnected. Observers
    /// acknowledge through `RoutePolicy::acknowledge_mute`.
    fn on_streams_muted(&self, event: MuteEventId, device: DeviceId, streams: &[StreamId]);

    /// A stream was forcibly ended by a restriction.
    fn on_stream_terminated(&self, stream: StreamId, restriction: &str);

    fn on_device_activation_changed(&self, device: DeviceId, activated: bool);
}
