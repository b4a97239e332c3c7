use crate::models::device::DeviceInfo;
use crate::models::route::{RouteTarget, RouteType};
use crate::models::stream::{Stream, StreamId};

/// The attributes arbitration compares, detached from the stream arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contender {
    pub id: StreamId,
    pub priority: i32,
    /// Focus acquired for the stream's own direction.
    pub focus: bool,
    pub route_type: RouteType,
    pub start_seq: u64,
}

impl Contender {
    pub fn of(stream: &Stream) -> Self {
        Self {
            id: stream.id(),
            priority: stream.priority(),
            focus: stream.focus_acquired(),
            route_type: stream.route_type(),
            start_seq: stream.start_seq(),
        }
    }
}

/// Whether `challenger` should take the winner slot from `incumbent`.
///
/// Focus dominates priority. With focus on both sides a strictly higher
/// priority is needed. Without focus on either side `>=` switches, ties going
/// to the more recently started stream, but a MANUAL stream never preempts by
/// priority alone.
pub fn outranks(challenger: &Contender, incumbent: &Contender) -> bool {
    match (challenger.focus, incumbent.focus) {
        (true, false) => true,
        (false, true) => false,
        (true, true) => challenger.priority > incumbent.priority,
        (false, false) => {
            if challenger.route_type == RouteType::Manual {
                return false;
            }
            challenger.priority > incumbent.priority
                || (challenger.priority == incumbent.priority && challenger.start_seq >= incumbent.start_seq)
        }
    }
}

/// Full rescan: fold `candidates` over the incumbent (if still eligible) in
/// start order using [`outranks`].
pub fn pick_winner(
    incumbent: Option<Contender>,
    candidates: impl IntoIterator<Item = Contender>,
) -> Option<StreamId> {
    let mut candidates: Vec<Contender> = candidates.into_iter().collect();
    candidates.sort_by_key(|c| c.start_seq);

    let mut best = incumbent;
    for candidate in candidates {
        if best.map(|b| b.id) == Some(candidate.id) {
            continue;
        }
        best = match best {
            None => Some(candidate),
            Some(current) if outranks(&candidate, &current) => Some(candidate),
            keep => keep,
        };
    }
    best.map(|b| b.id)
}

/// True when the target only reaches devices that do their own decode.
///
/// Devices missing from `devices` count as external: nothing on the internal
/// codec can reach them anymore.
pub fn is_external_only(target: &RouteTarget, devices: &[DeviceInfo]) -> bool {
    let ids = target.device_ids();
    if ids.is_empty() {
        return false;
    }
    ids.iter().all(|id| {
        devices
            .iter()
            .find(|d| d.id == *id)
            .map_or(true, |d| !d.uses_internal_codec)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::device::{DeviceId, DeviceType, Direction};

    fn contender(index: u32, priority: i32, focus: bool, start_seq: u64) -> Contender {
        Contender {
            id: StreamId { index, generation: 0 },
            priority,
            focus,
            route_type: RouteType::Auto,
            start_seq,
        }
    }

    #[test]
    fn focus_beats_priority() {
        let low_focused = contender(1, 1, true, 2);
        let high = contender(2, 100, false, 1);
        assert!(outranks(&low_focused, &high));
        assert!(!outranks(&high, &low_focused));
    }

    #[test]
    fn unfocused_ties_go_to_newer_stream() {
        let old = contender(1, 10, false, 1);
        let new = contender(2, 10, false, 2);
        assert!(outranks(&new, &old));
        assert!(!outranks(&old, &new));
    }

    #[test]
    fn focused_ties_keep_incumbent() {
        let incumbent = contender(1, 10, true, 1);
        let challenger = contender(2, 10, true, 2);
        assert!(!outranks(&challenger, &incumbent));
        let higher = contender(3, 11, true, 3);
        assert!(outranks(&higher, &incumbent));
    }

    #[test]
    fn manual_needs_focus_to_preempt() {
        let incumbent = contender(1, 10, false, 1);
        let mut manual = contender(2, 20, false, 2);
        manual.route_type = RouteType::Manual;
        assert!(!outranks(&manual, &incumbent));

        manual.focus = true;
        assert!(outranks(&manual, &incumbent));
    }

    #[test]
    fn rescan_picks_highest() {
        let a = contender(1, 5, false, 1);
        let b = contender(2, 30, false, 2);
        let c = contender(3, 10, false, 3);
        assert_eq!(pick_winner(None, [c, a, b]), Some(b.id));
        assert_eq!(pick_winner(None, Vec::new()), None);
    }

    #[test]
    fn rescan_keeps_focused_incumbent() {
        let incumbent = contender(1, 1, true, 1);
        let other = contender(2, 50, false, 2);
        assert_eq!(pick_winner(Some(incumbent), [incumbent, other]), Some(incumbent.id));
    }

    #[test]
    fn external_only_targets() {
        let devices = vec![
            DeviceInfo::new(1, DeviceType::Speaker, Direction::Playback, true),
            DeviceInfo::new(2, DeviceType::BtA2dp, Direction::Playback, false),
        ];
        assert!(is_external_only(&RouteTarget::Device { id: DeviceId(2) }, &devices));
        assert!(!is_external_only(&RouteTarget::Device { id: DeviceId(1) }, &devices));
        assert!(!is_external_only(&RouteTarget::Null, &devices));
        assert!(!is_external_only(
            &RouteTarget::Devices {
                ids: vec![DeviceId(1), DeviceId(2)]
            },
            &devices
        ));
    }
}
