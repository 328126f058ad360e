//! Timeline extraction - per-channel histories built in one pass over the sequence

use crate::midi::{EventKind, Sequence};
use crate::names;
use crate::syntax::sep;
use crate::CHANNEL_COUNT;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Bank select controller numbers
const CC_BANK_MSB: u8 = 0;
const CC_BANK_LSB: u8 = 32;

/// Instrument configuration set by a program change
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BankProgram {
    pub bank_msb: u8,
    pub bank_lsb: u8,
    pub program: u8,
}

/// Kind of a global command; the order is the emission order inside a slice
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GlobalKind {
    Tempo,
    Key,
    Time,
}

/// Global commands at one tick, one value per kind
pub type GlobalCommands = BTreeMap<GlobalKind, String>;

/// Everything that happened in one channel
#[derive(Debug, Clone, Default, Serialize)]
pub struct ChannelHistory {
    /// tick -> instrument
    pub instruments: BTreeMap<u64, BankProgram>,
    /// tick -> note -> velocity
    pub notes: BTreeMap<u64, BTreeMap<u8, u8>>,
    /// note -> tick -> pressed
    pub on_off: BTreeMap<u8, BTreeMap<u64, bool>>,
    /// note -> ticks where a release and a new press of the note coincide
    pub retriggers: BTreeMap<u8, BTreeSet<u64>>,
    /// tick -> channel label
    pub comments: BTreeMap<u64, String>,
}

impl ChannelHistory {
    /// Whether the channel plays any note
    pub fn is_used(&self) -> bool {
        !self.notes.is_empty()
    }

    /// First note-on strictly after the given tick
    pub fn next_note_on(&self, tick: u64) -> Option<u64> {
        self.notes.range(tick + 1..).next().map(|(t, _)| *t)
    }

    /// First press or release of the note strictly after its onset, and
    /// whether it is a press
    pub fn next_entry(&self, note: u8, on_tick: u64) -> Option<(u64, bool)> {
        self.on_off
            .get(&note)?
            .range(on_tick + 1..)
            .next()
            .map(|(t, pressed)| (*t, *pressed))
    }

    /// Release tick of a note pressed at `on_tick`, if a note-off exists
    pub fn release_tick(&self, note: u8, on_tick: u64) -> Option<u64> {
        match self.next_entry(note, on_tick)? {
            (tick, false) => Some(tick),
            (tick, true) if self.is_retrigger(note, tick) => Some(tick),
            (_, true) => None,
        }
    }

    fn is_retrigger(&self, note: u8, tick: u64) -> bool {
        self.retriggers
            .get(&note)
            .is_some_and(|ticks| ticks.contains(&tick))
    }

    /// Channel label in effect at the tick
    pub fn label_at(&self, tick: u64) -> Option<&str> {
        self.comments
            .range(..=tick)
            .next_back()
            .map(|(_, label)| label.as_str())
    }

    fn press(&mut self, tick: u64, note: u8, velocity: u8) {
        let on_off = self.on_off.entry(note).or_default();
        match on_off.insert(tick, true) {
            Some(true) => {
                // redundant press from the device
                debug!(tick, note, "ignoring repeated note-on");
                return;
            }
            // the previous press ends where this one starts
            Some(false) => {
                self.retriggers.entry(note).or_default().insert(tick);
            }
            None => {}
        }
        self.notes.entry(tick).or_default().insert(note, velocity);
    }

    fn release(&mut self, tick: u64, note: u8) -> bool {
        let on_off = self.on_off.entry(note).or_default();
        let pressed = on_off
            .range(..=tick)
            .next_back()
            .map(|(t, pressed)| (*t, *pressed));
        match pressed {
            Some((press_tick, true)) if press_tick == tick => {
                // zero-length press, keep at least one tick
                on_off.entry(tick + 1).or_insert(false);
                true
            }
            Some((_, true)) => {
                on_off.insert(tick, false);
                true
            }
            _ => false,
        }
    }
}

/// META block information
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetaInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub copyright: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub composer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lyricist: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
}

impl MetaInfo {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Read `{#key=value}` tags from a text event
    fn add_tags(&mut self, text: &str) {
        let mut rest = text;
        while let Some(start) = rest.find("{#") {
            let body = &rest[start + 2..];
            let Some(end) = body.find('}') else {
                break;
            };
            if let Some((key, value)) = body[..end].split_once('=') {
                let value = value.trim();
                if !value.is_empty() {
                    let slot = match key.trim() {
                        "title" => Some(&mut self.title),
                        "composer" => Some(&mut self.composer),
                        "lyrics" => Some(&mut self.lyricist),
                        "artist" => Some(&mut self.artist),
                        "copyright" => Some(&mut self.copyright),
                        _ => None,
                    };
                    if let Some(slot) = slot {
                        slot.get_or_insert_with(|| value.to_string());
                    }
                }
            }
            rest = &body[end + 1..];
        }
    }
}

/// Extracted histories of a whole sequence
#[derive(Debug, Clone, Serialize)]
pub struct Timeline {
    /// Ticks per quarter note of the source
    pub resolution: u16,
    /// Last tick of the sequence
    pub end_tick: u64,
    pub channels: [ChannelHistory; CHANNEL_COUNT],
    /// tick -> global commands
    pub globals: BTreeMap<u64, GlobalCommands>,
    /// tick -> syllable
    pub lyrics: BTreeMap<u64, String>,
    pub meta: MetaInfo,
}

impl Timeline {
    pub fn channel(&self, channel: u8) -> &ChannelHistory {
        &self.channels[channel as usize]
    }

    fn add_global(&mut self, tick: u64, kind: GlobalKind, value: String) {
        self.globals.entry(tick).or_default().insert(kind, value);
    }
}

/// Build the timeline of a sequence
pub fn extract(sequence: &Sequence) -> Timeline {
    let mut timeline = Timeline {
        resolution: sequence.resolution,
        end_tick: sequence.end_tick(),
        channels: std::array::from_fn(|_| ChannelHistory::default()),
        globals: BTreeMap::new(),
        lyrics: BTreeMap::new(),
        meta: MetaInfo::default(),
    };
    let mut track_title = None;

    // Meta events are read track by track, channel events are merged
    let mut channel_events = Vec::new();
    for (track_idx, track) in sequence.tracks.iter().enumerate() {
        let first_channel = track.iter().find_map(|e| e.kind.channel());
        let mut prefix: Option<u8> = None;

        for event in track {
            let tick = event.tick;
            match &event.kind {
                EventKind::ChannelPrefix { channel } => prefix = Some(*channel & 0x0F),
                EventKind::TrackName { text } | EventKind::InstrumentName { text } => {
                    let label = text.trim();
                    if label.is_empty() {
                        continue;
                    }
                    if let Some(channel) = prefix.or(first_channel) {
                        timeline.channels[channel as usize]
                            .comments
                            .insert(tick, label.to_string());
                    } else if track_idx == 0
                        && sequence.tracks.len() > 1
                        && matches!(event.kind, EventKind::TrackName { .. })
                    {
                        track_title.get_or_insert_with(|| label.to_string());
                    }
                }
                EventKind::Copyright { text } => {
                    if !text.trim().is_empty() {
                        timeline
                            .meta
                            .copyright
                            .get_or_insert_with(|| text.trim().to_string());
                    }
                }
                EventKind::Text { text } => timeline.meta.add_tags(text),
                EventKind::Lyric { text } => {
                    timeline.lyrics.entry(tick).or_default().push_str(text);
                }
                EventKind::Tempo { mpq } => {
                    let bpm = if *mpq == 0 { 0 } else { 60_000_000 / *mpq };
                    timeline.add_global(tick, GlobalKind::Tempo, bpm.to_string());
                }
                EventKind::KeySignature {
                    sharps_flats,
                    minor,
                } => {
                    let key = names::key_signature(*sharps_flats, *minor);
                    timeline.add_global(tick, GlobalKind::Key, key);
                }
                EventKind::TimeSignature {
                    numerator,
                    denominator_exp,
                } => {
                    let denominator = 1u64 << (*denominator_exp).min(31);
                    let time = format!("{}{}{}", numerator, sep::TIME_SIG_SLASH, denominator);
                    timeline.add_global(tick, GlobalKind::Time, time);
                }
                kind if kind.channel().is_some() => channel_events.push((tick, kind)),
                _ => {}
            }
        }
    }
    if timeline.meta.title.is_none() {
        timeline.meta.title = track_title;
    }

    // Stable: equal ticks keep track order and in-track order
    channel_events.sort_by_key(|(tick, _)| *tick);

    let mut pending_bank = [(0u8, 0u8); CHANNEL_COUNT];
    for (tick, kind) in channel_events {
        match *kind {
            EventKind::NoteOn {
                channel,
                key,
                velocity,
            } => timeline.channels[channel as usize].press(tick, key, velocity),
            EventKind::NoteOff { channel, key } => {
                if !timeline.channels[channel as usize].release(tick, key) {
                    debug!(tick, channel, note = key, "ignoring note-off without press");
                }
            }
            EventKind::Controller {
                channel,
                controller,
                value,
            } => match controller {
                CC_BANK_MSB => pending_bank[channel as usize].0 = value,
                CC_BANK_LSB => pending_bank[channel as usize].1 = value,
                _ => {}
            },
            EventKind::ProgramChange { channel, program } => {
                let (bank_msb, bank_lsb) = pending_bank[channel as usize];
                timeline.channels[channel as usize].instruments.insert(
                    tick,
                    BankProgram {
                        bank_msb,
                        bank_lsb,
                        program,
                    },
                );
            }
            _ => {}
        }
    }

    timeline
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::midi::SeqEvent;

    fn on(tick: u64, channel: u8, key: u8, velocity: u8) -> SeqEvent {
        SeqEvent::new(
            tick,
            EventKind::NoteOn {
                channel,
                key,
                velocity,
            },
        )
    }

    fn off(tick: u64, channel: u8, key: u8) -> SeqEvent {
        SeqEvent::new(tick, EventKind::NoteOff { channel, key })
    }

    #[test]
    fn test_note_pairing() {
        let mut seq = Sequence::new(480);
        seq.add_track(vec![on(0, 0, 60, 64), off(480, 0, 60), on(480, 0, 62, 70)]);
        let timeline = extract(&seq);
        let ch = timeline.channel(0);

        assert_eq!(ch.notes[&0][&60], 64);
        assert_eq!(ch.notes[&480][&62], 70);
        assert_eq!(ch.release_tick(60, 0), Some(480));
        assert_eq!(ch.release_tick(62, 480), None);
        assert_eq!(ch.next_note_on(0), Some(480));
    }

    #[test]
    fn test_press_without_release() {
        let mut seq = Sequence::new(480);
        seq.add_track(vec![on(0, 0, 60, 64), on(240, 0, 60, 64), off(480, 0, 60)]);
        let timeline = extract(&seq);
        let ch = timeline.channel(0);

        assert_eq!(ch.release_tick(60, 0), None);
        assert_eq!(ch.next_entry(60, 0), Some((240, true)));
        assert_eq!(ch.release_tick(60, 240), Some(480));
    }

    #[test]
    fn test_redundant_press_is_ignored() {
        let mut seq = Sequence::new(480);
        seq.add_track(vec![on(0, 1, 60, 64), on(0, 1, 60, 100), off(240, 1, 60)]);
        let timeline = extract(&seq);
        let ch = timeline.channel(1);

        assert_eq!(ch.notes[&0][&60], 64);
        assert_eq!(ch.on_off[&60].len(), 2);
    }

    #[test]
    fn test_stray_note_off_is_ignored() {
        let mut seq = Sequence::new(480);
        seq.add_track(vec![off(10, 0, 60), on(20, 0, 60, 64), off(40, 0, 60)]);
        let timeline = extract(&seq);
        let ch = timeline.channel(0);

        assert!(!ch.on_off[&60].contains_key(&10));
        assert_eq!(ch.release_tick(60, 20), Some(40));
    }

    #[test]
    fn test_zero_length_press() {
        let mut seq = Sequence::new(480);
        seq.add_track(vec![on(100, 9, 36, 90), off(100, 9, 36)]);
        let timeline = extract(&seq);

        assert_eq!(timeline.channel(9).release_tick(36, 100), Some(101));
    }

    #[test]
    fn test_press_right_after_zero_length_press() {
        let mut seq = Sequence::new(480);
        seq.add_track(vec![
            on(100, 9, 36, 90),
            off(100, 9, 36),
            on(101, 9, 36, 90),
            off(200, 9, 36),
        ]);
        let timeline = extract(&seq);
        let ch = timeline.channel(9);

        assert_eq!(ch.release_tick(36, 100), Some(101));
        assert_eq!(ch.release_tick(36, 101), Some(200));
    }

    #[test]
    fn test_release_and_press_at_same_tick() {
        let mut seq = Sequence::new(480);
        seq.add_track(vec![
            on(0, 0, 60, 64),
            off(480, 0, 60),
            on(480, 0, 60, 64),
            off(960, 0, 60),
        ]);
        let timeline = extract(&seq);
        let ch = timeline.channel(0);

        assert_eq!(ch.release_tick(60, 0), Some(480));
        assert_eq!(ch.release_tick(60, 480), Some(960));
    }

    #[test]
    fn test_bank_and_program() {
        let mut seq = Sequence::new(480);
        seq.add_track(vec![
            SeqEvent::new(
                0,
                EventKind::Controller {
                    channel: 3,
                    controller: 0,
                    value: 2,
                },
            ),
            SeqEvent::new(
                0,
                EventKind::ProgramChange {
                    channel: 3,
                    program: 40,
                },
            ),
        ]);
        let timeline = extract(&seq);

        assert_eq!(
            timeline.channel(3).instruments[&0],
            BankProgram {
                bank_msb: 2,
                bank_lsb: 0,
                program: 40
            }
        );
    }

    #[test]
    fn test_globals_merge_per_tick() {
        let mut seq = Sequence::new(480);
        seq.add_track(vec![
            SeqEvent::new(960, EventKind::Tempo { mpq: 500_000 }),
            SeqEvent::new(
                960,
                EventKind::KeySignature {
                    sharps_flats: 1,
                    minor: false,
                },
            ),
            SeqEvent::new(
                1920,
                EventKind::TimeSignature {
                    numerator: 3,
                    denominator_exp: 2,
                },
            ),
        ]);
        let timeline = extract(&seq);

        assert_eq!(timeline.globals.len(), 2);
        assert_eq!(timeline.globals[&960][&GlobalKind::Tempo], "120");
        assert_eq!(timeline.globals[&960][&GlobalKind::Key], "g/maj");
        assert_eq!(timeline.globals[&1920][&GlobalKind::Time], "3/4");
    }

    #[test]
    fn test_labels_and_meta() {
        let mut seq = Sequence::new(480);
        seq.add_track(vec![
            SeqEvent::new(
                0,
                EventKind::TrackName {
                    text: "My Song".into(),
                },
            ),
            SeqEvent::new(
                0,
                EventKind::Text {
                    text: "{#composer=Someone}{#artist=Band}".into(),
                },
            ),
        ]);
        seq.add_track(vec![
            SeqEvent::new(
                0,
                EventKind::TrackName {
                    text: "Bass".into(),
                },
            ),
            on(0, 4, 40, 64),
            off(100, 4, 40),
        ]);
        let timeline = extract(&seq);

        assert_eq!(timeline.meta.title.as_deref(), Some("My Song"));
        assert_eq!(timeline.meta.composer.as_deref(), Some("Someone"));
        assert_eq!(timeline.meta.artist.as_deref(), Some("Band"));
        assert_eq!(timeline.channel(4).label_at(50), Some("Bass"));
    }
}
