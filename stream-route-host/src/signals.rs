use parking_lot::Mutex;
use serde::Serialize;

use stream_route_core::{DeviceId, Direction, MuteEventId, PolicyDelegate, RouteTarget, StreamId};

/// A delegate notification, in the shape an IPC bridge would emit it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "signal", rename_all = "kebab-case")]
pub enum Signal {
    WinnerChanged {
        direction: Direction,
        winner: Option<StreamId>,
    },
    StreamMoved {
        stream: StreamId,
        target: RouteTarget,
    },
    StreamsMuted {
        event: MuteEventId,
        device: DeviceId,
        streams: Vec<StreamId>,
    },
    StreamTerminated {
        stream: StreamId,
        restriction: String,
    },
    DeviceActivation {
        device: DeviceId,
        activated: bool,
    },
}

/// PolicyDelegate that logs and queues every notification.
#[derive(Debug, Default)]
pub struct SignalLog {
    signals: Mutex<Vec<Signal>>,
}

impl SignalLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&self) -> Vec<Signal> {
        std::mem::take(&mut *self.signals.lock())
    }

    fn push(&self, signal: Signal) {
        log::debug!("signal {:?}", signal);
        self.signals.lock().push(signal);
    }
}

impl PolicyDelegate for SignalLog {
    fn on_winner_changed(&self, direction: Direction, winner: Option<StreamId>) {
        self.push(Signal::WinnerChanged { direction, winner });
    }

    fn on_stream_moved(&self, stream: StreamId, target: &RouteTarget) {
        self.push(Signal::StreamMoved {
            stream,
            target: target.clone(),
        });
    }

    fn on_streams_muted(&self, event: MuteEventId, device: DeviceId, streams: &[StreamId]) {
        self.push(Signal::StreamsMuted {
            event,
            device,
            streams: streams.to_vec(),
        });
    }

    fn on_stream_terminated(&self, stream: StreamId, restriction: &str) {
        log::warn!("{} terminated by {}", stream, restriction);
        self.push(Signal::StreamTerminated {
            stream,
            restriction: restriction.to_string(),
        });
    }

    fn on_device_activation_changed(&self, device: DeviceId, activated: bool) {
        self.push(Signal::DeviceActivation { device, activated });
    }
}
