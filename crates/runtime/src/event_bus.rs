use std::collections::BTreeMap;

use crate::frame::Frame;
use crate::progressive::BuildSummary;

/// Events kept before the oldest are evicted.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BuildEventKind {
    Progress { processed: usize, total: usize },
    Finished(BuildSummary),
    Cancelled(BuildSummary),
}

impl BuildEventKind {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, BuildEventKind::Progress { .. })
    }
}

/// Progress record for one build slot, stamped with the frame it happened in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildEvent {
    pub frame_index: u64,
    pub slot: &'static str,
    pub kind: BuildEventKind,
}

/// Bounded log of build events.
///
/// Holds at most `capacity` events, oldest first. The latest terminal event
/// of every slot is tracked separately so [`EventBus::last_outcome`] survives
/// both eviction and [`EventBus::drain`].
#[derive(Debug)]
pub struct EventBus {
    events: Vec<BuildEvent>,
    capacity: usize,
    evicted: u64,
    outcomes: BTreeMap<&'static str, BuildEventKind>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_EVENT_CAPACITY)
    }

    /// A zero capacity is treated as one.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: Vec::with_capacity(capacity),
            capacity,
            evicted: 0,
            outcomes: BTreeMap::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn emit(&mut self, frame: Frame, slot: &'static str, kind: BuildEventKind) {
        if kind.is_terminal() {
            self.outcomes.insert(slot, kind);
        }
        if self.events.len() == self.capacity {
            self.events.remove(0);
            self.evicted += 1;
        }
        self.events.push(BuildEvent {
            frame_index: frame.index,
            slot,
            kind,
        });
    }

    pub fn events(&self) -> &[BuildEvent] {
        &self.events
    }

    /// Number of events dropped to stay within capacity.
    pub fn evicted(&self) -> u64 {
        self.evicted
    }

    pub fn drain(&mut self) -> Vec<BuildEvent> {
        std::mem::take(&mut self.events)
    }

    /// Most recent terminal event for `slot`, if any.
    pub fn last_outcome(&self, slot: &str) -> Option<BuildEventKind> {
        self.outcomes.get(slot).copied()
    }
}
