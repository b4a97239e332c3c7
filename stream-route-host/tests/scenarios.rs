use chrono::{DateTime, Duration, Utc};

use stream_route_core::{
    DeviceId, DeviceInfo, DeviceType, Direction, FocusMask, GroupId, PolicyConfig, PolicyEvent, PolicyOutcome,
    RouteChange, RoutePolicy, RouteTarget, StreamId, StreamRequest,
};
use stream_route_host::{stream_map, HalCall, HostError, MemoryDeviceRegistry, RecordingHal, Replay, Script, Signal};

const BT_HANDOVER: &str = include_str!("../scripts/bt-handover.json");

fn at(seconds: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap() + Duration::seconds(seconds)
}

fn policy(devices: Vec<DeviceInfo>) -> (RoutePolicy<MemoryDeviceRegistry, RecordingHal>, MemoryDeviceRegistry, RecordingHal) {
    let registry = MemoryDeviceRegistry::with_devices(devices);
    let hal = RecordingHal::new();
    let roles = stream_map::default_role_table().unwrap();
    let policy = RoutePolicy::new(registry.clone(), hal.clone(), roles, PolicyConfig::default()).unwrap();
    (policy, registry, hal)
}

fn sid(index: u32) -> StreamId {
    StreamId { index, generation: 0 }
}

fn route_changes(calls: &[HalCall]) -> Vec<(RouteChange, Vec<DeviceId>)> {
    calls
        .iter()
        .filter_map(|c| match c {
            HalCall::Route { command } => Some((command.change, command.devices.iter().map(|d| d.id).collect())),
            _ => None,
        })
        .collect()
}

#[test]
fn bt_handover_script_replays() {
    let script = Script::from_json(BT_HANDOVER).unwrap();
    let roles = stream_map::default_role_table().unwrap();
    let mut replay = Replay::new(roles, PolicyConfig::default(), script.devices).unwrap();
    let steps = replay.run(script.events);

    assert_eq!(steps.len(), 8);
    assert!(steps.iter().all(|s| s.error.is_none()));
    assert_eq!(steps[0].outcome, Some(PolicyOutcome::Prepared { stream: sid(0) }));

    // Speaker carries media until the headset shows up.
    assert_eq!(route_changes(&steps[1].hal), vec![(RouteChange::Start, vec![DeviceId(1)])]);
    assert!(steps[1].signals.contains(&Signal::WinnerChanged {
        direction: Direction::Playback,
        winner: Some(sid(0)),
    }));

    let Some(PolicyOutcome::Connectivity { report }) = &steps[2].outcome else {
        panic!("unexpected outcome {:?}", steps[2].outcome);
    };
    assert_eq!(report.moved.len(), 1);
    assert_eq!(report.moved[0].to, RouteTarget::Device { id: DeviceId(3) });
    assert_eq!(route_changes(&steps[2].hal), vec![(RouteChange::End, vec![])]);

    let Some(PolicyOutcome::Connectivity { report }) = &steps[3].outcome else {
        panic!("unexpected outcome {:?}", steps[3].outcome);
    };
    assert_eq!(report.muted, vec![sid(0)]);
    assert!(steps[3].hal.contains(&HalCall::StreamMuted {
        stream: sid(0),
        muted: true,
    }));
    assert_eq!(route_changes(&steps[3].hal), vec![(RouteChange::Start, vec![DeviceId(1)])]);

    assert_eq!(route_changes(&steps[5].hal), vec![(RouteChange::Start, vec![DeviceId(10)])]);
    assert_eq!(steps[6].outcome, Some(PolicyOutcome::Terminated { streams: vec![sid(1)] }));

    assert_eq!(replay.policy().winner(Direction::Playback), None);
    assert_eq!(replay.policy().winner(Direction::Capture), None);
    assert!(replay.registry().activated().is_empty());
}

#[test]
fn replay_records_errors_and_continues() {
    let roles = stream_map::default_role_table().unwrap();
    let mut replay = Replay::new(roles, PolicyConfig::default(), vec![]).unwrap();

    let failed = replay.step(PolicyEvent::Started { stream: sid(5) });
    assert!(failed.outcome.is_none());
    assert!(failed.error.unwrap().contains("stream#5.0"));

    let unknown_device = replay.step(PolicyEvent::DeviceDisconnected {
        device: DeviceInfo::new(9, DeviceType::Hdmi, Direction::Playback, true),
    });
    assert!(unknown_device.error.is_some());

    let ok = replay.step(PolicyEvent::Prepare {
        request: StreamRequest::playback("media"),
    });
    assert_eq!(ok.index, 2);
    assert!(matches!(ok.outcome, Some(PolicyOutcome::Prepared { .. })));
}

#[test]
fn malformed_script_is_rejected() {
    assert!(matches!(
        Script::from_json(r#"{"events": [{"event": "explode"}]}"#),
        Err(HostError::Script(_))
    ));
}

#[test]
fn alarm_combines_and_degrades_when_a_member_leaves() {
    let speaker = DeviceInfo::new(1, DeviceType::Speaker, Direction::Playback, true).connected_at(at(0));
    let jack = DeviceInfo::new(2, DeviceType::AudioJack, Direction::Playback, true).connected_at(at(1));
    let (mut policy, registry, hal) = policy(vec![speaker, jack]);

    let alarm = policy.prepare(StreamRequest::playback("alarm")).unwrap();
    policy.started(alarm).unwrap();
    let target = policy.stream(alarm).unwrap().target().clone();
    assert!(matches!(target, RouteTarget::Combined { .. }));
    assert_eq!(policy.stream(alarm).unwrap().endpoint().0, "combined-auto-all-1-2");
    assert!(registry.is_activated(DeviceId(1)));
    assert!(registry.is_activated(DeviceId(2)));

    let gone = registry.unplug(DeviceId(2)).unwrap();
    let report = policy.device_disconnected(&gone).unwrap();
    assert_eq!(report.muted, vec![alarm]);
    assert_eq!(policy.stream(alarm).unwrap().target(), &RouteTarget::Device { id: DeviceId(1) });
    assert_eq!(policy.combined_devices().count(), 0);
    assert!(hal.calls().iter().any(|c| matches!(c, HalCall::CombinedReleased { .. })));

    let last = hal.routes().pop().unwrap();
    assert_eq!(last.change, RouteChange::Start);
    assert_eq!(last.devices.iter().map(|d| d.id).collect::<Vec<_>>(), vec![DeviceId(1)]);

    let event = report.mute_event.unwrap();
    assert_eq!(policy.acknowledge_mute(event), vec![alarm]);
}

#[test]
fn voip_call_routes_to_receiver_under_focus() {
    let speaker = DeviceInfo::new(1, DeviceType::Speaker, Direction::Playback, true);
    let receiver = DeviceInfo::new(4, DeviceType::Receiver, Direction::Playback, true);
    let mic = DeviceInfo::new(10, DeviceType::Mic, Direction::Capture, true);
    let (mut policy, registry, hal) = policy(vec![speaker, receiver, mic]);

    let media = policy.prepare(StreamRequest::playback("media")).unwrap();
    policy.started(media).unwrap();

    let call = GroupId(1);
    policy.register_group(call);
    policy
        .assign_devices(call, vec![DeviceId(10)], vec![DeviceId(4)])
        .unwrap();
    policy.set_route_option(call, "call-mode", 1).unwrap();

    let out = policy.prepare(StreamRequest::playback("voip").group(call)).unwrap();
    let input = policy.prepare(StreamRequest::capture("voip").group(call)).unwrap();
    policy.started(out).unwrap();
    policy.started(input).unwrap();

    // Playback stays with media until the call session gains focus.
    assert_eq!(policy.winner(Direction::Playback), Some(media));
    assert_eq!(policy.winner(Direction::Capture), Some(input));

    policy.update_focus(call, FocusMask::BOTH).unwrap();
    assert_eq!(policy.winner(Direction::Playback), Some(out));
    assert_eq!(policy.current_volume_type(Direction::Playback), Some("voip"));
    assert!(registry.is_activated(DeviceId(4)));
    assert!(registry.is_activated(DeviceId(1)));
    assert!(registry.is_activated(DeviceId(10)));

    let options: Vec<HalCall> = hal
        .calls()
        .into_iter()
        .filter(|c| matches!(c, HalCall::RouteOption { .. }))
        .collect();
    assert!(options.contains(&HalCall::RouteOption {
        role: "voip".into(),
        name: "call-mode".into(),
        value: 1,
    }));

    policy.ended(out).unwrap();
    policy.ended(input).unwrap();
    assert_eq!(policy.winner(Direction::Playback), Some(media));
    assert_eq!(policy.winner(Direction::Capture), None);
    assert!(!registry.is_activated(DeviceId(4)));
    assert!(!registry.is_activated(DeviceId(10)));
}
