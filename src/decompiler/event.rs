//! Per-slice channel events

use std::collections::BTreeMap;

/// A note or chord struck at one tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Playable {
    /// Note name, chord name or inline percussion list
    pub name: String,
    /// Sorted note numbers
    pub notes: Vec<u8>,
    pub velocity: u8,
    pub off_tick: u64,
    /// Attached syllable
    pub lyrics: Option<String>,
}

impl Playable {
    pub fn lowest(&self) -> u8 {
        self.notes.first().copied().unwrap_or(0)
    }
}

/// What happens in a channel at one tick
#[derive(Debug, Clone, Default)]
pub struct TickEvents {
    pub instrument_change: bool,
    pub playables: Vec<Playable>,
}

/// Tick-sorted events of one channel within a slice
#[derive(Debug, Default)]
pub struct ChannelTimeline {
    events: BTreeMap<u64, TickEvents>,
}

impl ChannelTimeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_instrument_change(&mut self, tick: u64) {
        self.events.entry(tick).or_default().instrument_change = true;
    }

    pub fn add_playables(&mut self, tick: u64, playables: Vec<Playable>) {
        self.events
            .entry(tick)
            .or_default()
            .playables
            .extend(playables);
    }

    /// Events in tick order
    pub fn iter(&self) -> impl Iterator<Item = (u64, &TickEvents)> {
        self.events.iter().map(|(tick, events)| (*tick, events))
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
