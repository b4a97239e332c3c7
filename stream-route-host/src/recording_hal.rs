//! HAL executor that records every call instead of touching hardware.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

use stream_route_core::{
    CombinedDevice, CombinedId, Direction, HalExecutor, RouteCommand, RouteError, StreamId,
};

/// One recorded HAL call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "call", rename_all = "kebab-case")]
pub enum HalCall {
    Route {
        command: RouteCommand,
    },
    RouteOption {
        role: String,
        name: String,
        value: i32,
    },
    StreamConnection {
        role: String,
        direction: Direction,
        index: u32,
        connected: bool,
    },
    StreamMuted {
        stream: StreamId,
        muted: bool,
    },
    CombinedCreated {
        id: CombinedId,
        name: String,
    },
    CombinedReleased {
        id: CombinedId,
    },
}

#[derive(Debug, Default)]
struct HalState {
    calls: Vec<HalCall>,
    failing_routes: usize,
}

/// Clones share one call log.
#[derive(Debug, Clone, Default)]
pub struct RecordingHal {
    state: Arc<Mutex<HalState>>,
}

impl RecordingHal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject the next `count` route commands.
    pub fn fail_next_routes(&self, count: usize) {
        self.state.lock().failing_routes = count;
    }

    pub fn calls(&self) -> Vec<HalCall> {
        self.state.lock().calls.clone()
    }

    /// Remove and return everything recorded so far.
    pub fn take_calls(&self) -> Vec<HalCall> {
        std::mem::take(&mut self.state.lock().calls)
    }

    /// Route commands accepted so far, oldest first.
    pub fn routes(&self) -> Vec<RouteCommand> {
        self.state
            .lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                HalCall::Route { command } => Some(command.clone()),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: HalCall) {
        self.state.lock().calls.push(call);
    }
}

impl HalExecutor for RecordingHal {
    fn apply_route(&mut self, command: &RouteCommand) -> Result<(), RouteError> {
        {
            let mut state = self.state.lock();
            if state.failing_routes > 0 {
                state.failing_routes -= 1;
                return Err(RouteError::RouteCommandFailed(format!(
                    "{} {:?} rejected",
                    command.direction, command.change
                )));
            }
        }
        log::info!(
            "HAL route {:?} {} role={} devices={}",
            command.change,
            command.direction,
            command.role,
            command.devices.len()
        );
        self.record(HalCall::Route {
            command: command.clone(),
        });
        Ok(())
    }

    fn apply_route_option(&mut self, role: &str, name: &str, value: i32) -> Result<(), RouteError> {
        log::info!("HAL option {}={} role={}", name, value, role);
        self.record(HalCall::RouteOption {
            role: role.to_string(),
            name: name.to_string(),
            value,
        });
        Ok(())
    }

    fn notify_stream_connection(
        &mut self,
        role: &str,
        direction: Direction,
        index: u32,
        connected: bool,
    ) -> Result<(), RouteError> {
        self.record(HalCall::StreamConnection {
            role: role.to_string(),
            direction,
            index,
            connected,
        });
        Ok(())
    }

    fn set_stream_muted(&mut self, stream: StreamId, muted: bool) -> Result<(), RouteError> {
        self.record(HalCall::StreamMuted { stream, muted });
        Ok(())
    }

    fn instantiate_combined(&mut self, combined: &CombinedDevice) -> Result<(), RouteError> {
        log::info!("HAL combined device {} created", combined.name());
        self.record(HalCall::CombinedCreated {
            id: combined.id,
            name: combined.name(),
        });
        Ok(())
    }

    fn release_combined(&mut self, id: CombinedId) -> Result<(), RouteError> {
        log::info!("HAL combined device {} released", id);
        self.record(HalCall::CombinedReleased { id });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_injection_is_consumed() {
        let mut hal = RecordingHal::new();
        hal.fail_next_routes(1);

        let command = RouteCommand::reset("media", Direction::Playback);
        assert!(hal.apply_route(&command).is_err());
        assert!(hal.apply_route(&command).is_ok());
        assert_eq!(hal.routes(), vec![command]);
    }

    #[test]
    fn take_calls_drains_the_log() {
        let mut hal = RecordingHal::new();
        let shared = hal.clone();
        hal.apply_route_option("voip", "bypass", 1).unwrap();

        assert_eq!(shared.take_calls().len(), 1);
        assert!(shared.calls().is_empty());
    }
}
