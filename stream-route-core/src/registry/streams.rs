use crate::models::stream::{Stream, StreamId};

#[derive(Debug)]
struct Slot {
    generation: u32,
    stream: Option<Stream>,
}

/// Arena of live streams addressed by generation-checked [`StreamId`]s.
///
/// Removed slots are recycled with a bumped generation, so a stale handle
/// held by an in-flight decision can never reach a newer stream.
#[derive(Debug, Default)]
pub struct StreamRegistry {
    slots: Vec<Slot>,
    free: Vec<u32>,
    len: usize,
    start_counter: u64,
}

impl StreamRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a slot and build the stream with its final id.
    pub fn insert_with(&mut self, build: impl FnOnce(StreamId) -> Stream) -> StreamId {
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    stream: None,
                });
                (self.slots.len() - 1) as u32
            }
        };
        let slot = &mut self.slots[index as usize];
        let id = StreamId {
            index,
            generation: slot.generation,
        };
        slot.stream = Some(build(id));
        self.len += 1;
        id
    }

    pub fn get(&self, id: StreamId) -> Option<&Stream> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.stream.as_ref())
    }

    pub fn get_mut(&mut self, id: StreamId) -> Option<&mut Stream> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.stream.as_mut())
    }

    pub fn contains(&self, id: StreamId) -> bool {
        self.get(id).is_some()
    }

    pub fn remove(&mut self, id: StreamId) -> Option<Stream> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let stream = slot.stream.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.len -= 1;
        Some(stream)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Stream> {
        self.slots.iter().filter_map(|slot| slot.stream.as_ref())
    }

    /// Next value of the monotonic start counter.
    pub fn next_start_seq(&mut self) -> u64 {
        self.start_counter += 1;
        self.start_counter
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::models::device::Direction;
    use crate::models::device::EndpointHandle;
    use crate::models::route::{RouteTarget, RouteType};
    use crate::models::stream::StreamState;

    fn stream(id: StreamId, direction: Direction) -> Stream {
        Stream {
            id,
            direction,
            role: "media".into(),
            name: None,
            priority: 1,
            route_type: RouteType::Auto,
            volume_type: None,
            avail_devices: Vec::new(),
            parent_group: None,
            focus_acquired: false,
            active_device: None,
            target: RouteTarget::Null,
            endpoint: EndpointHandle::null(),
            state: StreamState::Prepared,
            skipped: false,
            restricted: false,
            created_at: Utc::now(),
            start_seq: 0,
        }
    }

    #[test]
    fn insert_and_lookup() {
        let mut reg = StreamRegistry::new();
        let a = reg.insert_with(|id| stream(id, Direction::Playback));
        let b = reg.insert_with(|id| stream(id, Direction::Capture));

        assert_eq!(reg.len(), 2);
        assert_eq!(reg.get(a).unwrap().id(), a);
        assert_eq!(reg.get(b).unwrap().direction(), Direction::Capture);
    }

    #[test]
    fn stale_handles_do_not_resolve() {
        let mut reg = StreamRegistry::new();
        let a = reg.insert_with(|id| stream(id, Direction::Playback));
        assert!(reg.remove(a).is_some());
        assert!(reg.remove(a).is_none());

        let b = reg.insert_with(|id| stream(id, Direction::Playback));
        assert_eq!(a.index, b.index);
        assert_ne!(a.generation, b.generation);
        assert!(reg.get(a).is_none());
        assert!(reg.get(b).is_some());
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn start_sequence_is_monotonic() {
        let mut reg = StreamRegistry::new();
        let first = reg.next_start_seq();
        let second = reg.next_start_seq();
        assert!(second > first);
        assert!(reg.is_empty());
    }
}
