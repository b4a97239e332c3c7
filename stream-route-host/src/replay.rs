//! Scripted replay of policy events against the in-memory backends.
//!
//! A script lists the devices present at boot and a sequence of tagged
//! [`PolicyEvent`]s. Connectivity events update the registry first, then
//! reach the engine, mirroring how a device manager delivers them.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use stream_route_core::{DeviceInfo, PolicyConfig, PolicyEvent, PolicyOutcome, RoleTable, RoutePolicy};

use crate::device_registry::MemoryDeviceRegistry;
use crate::error::HostError;
use crate::recording_hal::{HalCall, RecordingHal};
use crate::signals::{Signal, SignalLog};

#[derive(Debug, Clone, Deserialize)]
pub struct Script {
    #[serde(default)]
    pub devices: Vec<DeviceInfo>,
    pub events: Vec<PolicyEvent>,
}

impl Script {
    pub fn from_json(json: &str) -> Result<Self, HostError> {
        serde_json::from_str(json).map_err(|e| HostError::Script(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self, HostError> {
        let json = fs::read_to_string(path).map_err(|e| HostError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }
}

/// What one event did.
#[derive(Debug, Clone, Serialize)]
pub struct Step {
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<PolicyOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub signals: Vec<Signal>,
    pub hal: Vec<HalCall>,
}

pub struct Replay {
    policy: RoutePolicy<MemoryDeviceRegistry, RecordingHal>,
    registry: MemoryDeviceRegistry,
    hal: RecordingHal,
    signals: Arc<SignalLog>,
    steps: usize,
}

impl Replay {
    pub fn new(roles: RoleTable, config: PolicyConfig, devices: Vec<DeviceInfo>) -> Result<Self, HostError> {
        let registry = MemoryDeviceRegistry::with_devices(devices);
        let hal = RecordingHal::new();
        let signals = Arc::new(SignalLog::new());
        let mut policy = RoutePolicy::new(registry.clone(), hal.clone(), roles, config)?;
        policy.set_delegate(signals.clone());

        Ok(Self {
            policy,
            registry,
            hal,
            signals,
            steps: 0,
        })
    }

    /// Apply one event. Engine errors are captured in the step, not returned.
    pub fn step(&mut self, event: PolicyEvent) -> Step {
        let index = self.steps;
        self.steps += 1;

        let event = match self.sync_registry(event) {
            Ok(event) => event,
            Err(e) => return self.finish(index, Err(e)),
        };
        let result = self.policy.handle(event).map_err(HostError::from);
        self.finish(index, result)
    }

    pub fn run(&mut self, events: impl IntoIterator<Item = PolicyEvent>) -> Vec<Step> {
        events.into_iter().map(|event| self.step(event)).collect()
    }

    pub fn policy(&self) -> &RoutePolicy<MemoryDeviceRegistry, RecordingHal> {
        &self.policy
    }

    pub fn registry(&self) -> &MemoryDeviceRegistry {
        &self.registry
    }

    /// Reflect connectivity in the registry and hand the engine its snapshot.
    fn sync_registry(&self, event: PolicyEvent) -> Result<PolicyEvent, HostError> {
        Ok(match event {
            PolicyEvent::DeviceConnected { device } => PolicyEvent::DeviceConnected {
                device: self.registry.plug(device),
            },
            PolicyEvent::DeviceDisconnected { device } => PolicyEvent::DeviceDisconnected {
                device: self.registry.unplug(device.id)?,
            },
            other => other,
        })
    }

    fn finish(&mut self, index: usize, result: Result<PolicyOutcome, HostError>) -> Step {
        let (outcome, error) = match result {
            Ok(outcome) => (Some(outcome), None),
            Err(e) => {
                log::warn!("step {} failed: {}", index, e);
                (None, Some(e.to_string()))
            }
        };
        Step {
            index,
            outcome,
            error,
            signals: self.signals.drain(),
            hal: self.hal.take_calls(),
        }
    }
}
