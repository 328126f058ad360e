//! JSON serialization types for MIDI sequences

use super::reader::{EventKind, SeqEvent, Sequence};
use crate::timeline::{self, Timeline};
use serde::Serialize;

/// Top-level JSON structure for a MIDI file
#[derive(Debug, Clone, Serialize)]
pub struct MidiJson {
    /// Ticks per quarter note
    pub resolution: u16,
    /// Last tick of any track
    pub end_tick: u64,
    pub tracks: Vec<TrackJson>,
    /// Extracted per-channel histories
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeline: Option<Timeline>,
}

/// JSON representation of one track
#[derive(Debug, Clone, Serialize)]
pub struct TrackJson {
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub events: Vec<SeqEvent>,
}

impl MidiJson {
    pub fn new(sequence: &Sequence, with_timeline: bool) -> Self {
        let tracks = sequence
            .tracks
            .iter()
            .enumerate()
            .map(|(index, events)| TrackJson {
                index,
                name: events.iter().find_map(|e| match &e.kind {
                    EventKind::TrackName { text } => Some(text.clone()),
                    _ => None,
                }),
                events: events.clone(),
            })
            .collect();

        Self {
            resolution: sequence.resolution,
            end_tick: sequence.end_tick(),
            tracks,
            timeline: with_timeline.then(|| timeline::extract(sequence)),
        }
    }
}
