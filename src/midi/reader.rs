//! Standard MIDI file loading

use crate::error::{Error, Result};
use flate2::read::GzDecoder;
use midly::{MetaMessage, MidiMessage, Smf, Timing, TrackEventKind};
use serde::Serialize;
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::Path;

/// Decoded event kinds that matter for decompilation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    NoteOn { channel: u8, key: u8, velocity: u8 },
    /// Includes note-on with velocity 0
    NoteOff { channel: u8, key: u8 },
    ProgramChange { channel: u8, program: u8 },
    Controller { channel: u8, controller: u8, value: u8 },
    /// Microseconds per quarter note
    Tempo { mpq: u32 },
    KeySignature { sharps_flats: i8, minor: bool },
    TimeSignature { numerator: u8, denominator_exp: u8 },
    TrackName { text: String },
    InstrumentName { text: String },
    Copyright { text: String },
    Text { text: String },
    Lyric { text: String },
    /// MIDI channel prefix for the following meta events of the track
    ChannelPrefix { channel: u8 },
}

impl EventKind {
    /// Channel of a channel voice message
    pub fn channel(&self) -> Option<u8> {
        match *self {
            EventKind::NoteOn { channel, .. }
            | EventKind::NoteOff { channel, .. }
            | EventKind::ProgramChange { channel, .. }
            | EventKind::Controller { channel, .. } => Some(channel),
            _ => None,
        }
    }
}

/// Event with absolute tick
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeqEvent {
    pub tick: u64,
    #[serde(flatten)]
    pub kind: EventKind,
}

impl SeqEvent {
    pub fn new(tick: u64, kind: EventKind) -> Self {
        Self { tick, kind }
    }
}

/// Owned, absolute-tick view of a standard MIDI file
#[derive(Debug, Clone, Default)]
pub struct Sequence {
    /// Ticks per quarter note
    pub resolution: u16,
    /// Events per track, in file order
    pub tracks: Vec<Vec<SeqEvent>>,
}

impl Sequence {
    pub fn new(resolution: u16) -> Self {
        Self {
            resolution,
            tracks: Vec::new(),
        }
    }

    /// Append a track, sorting its events by tick (stable)
    pub fn add_track(&mut self, mut events: Vec<SeqEvent>) {
        events.sort_by_key(|e| e.tick);
        self.tracks.push(events);
    }

    /// Parse raw SMF bytes
    pub fn parse(data: &[u8]) -> Result<Self> {
        let smf = Smf::parse(data).map_err(|e| Error::MidiParse(e.to_string()))?;
        Self::from_smf(&smf)
    }

    /// Read a MIDI file, decompressing it if it is gzipped
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = read_midi_file(path)?;
        Self::parse(&data)
    }

    /// Read SMF bytes from any reader (e.g. stdin)
    pub fn from_reader<R: Read>(mut input: R) -> Result<Self> {
        let mut data = Vec::new();
        input.read_to_end(&mut data)?;
        Self::parse(&maybe_gunzip(data)?)
    }

    /// Convert a parsed SMF
    pub fn from_smf(smf: &Smf) -> Result<Self> {
        let resolution = match smf.header.timing {
            Timing::Metrical(tpq) => tpq.as_int(),
            Timing::Timecode(_, _) => return Err(Error::UnsupportedTiming),
        };
        if resolution == 0 {
            return Err(Error::MidiParse("resolution is 0".into()));
        }

        let mut sequence = Self::new(resolution);
        for track in &smf.tracks {
            let mut tick = 0u64;
            let mut events = Vec::new();
            for event in track {
                tick += event.delta.as_int() as u64;
                if let Some(kind) = convert_event(&event.kind) {
                    events.push(SeqEvent::new(tick, kind));
                }
            }
            sequence.tracks.push(events);
        }
        Ok(sequence)
    }

    /// Highest tick of any event
    pub fn end_tick(&self) -> u64 {
        self.tracks
            .iter()
            .filter_map(|t| t.last())
            .map(|e| e.tick)
            .max()
            .unwrap_or(0)
    }
}

fn convert_event(kind: &TrackEventKind) -> Option<EventKind> {
    match *kind {
        TrackEventKind::Midi { channel, message } => {
            let channel = channel.as_int();
            match message {
                MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => Some(EventKind::NoteOn {
                    channel,
                    key: key.as_int(),
                    velocity: vel.as_int(),
                }),
                MidiMessage::NoteOn { key, .. } | MidiMessage::NoteOff { key, .. } => {
                    Some(EventKind::NoteOff {
                        channel,
                        key: key.as_int(),
                    })
                }
                MidiMessage::ProgramChange { program } => Some(EventKind::ProgramChange {
                    channel,
                    program: program.as_int(),
                }),
                MidiMessage::Controller { controller, value } => Some(EventKind::Controller {
                    channel,
                    controller: controller.as_int(),
                    value: value.as_int(),
                }),
                _ => None,
            }
        }
        TrackEventKind::Meta(meta) => match meta {
            MetaMessage::Tempo(mpq) => Some(EventKind::Tempo { mpq: mpq.as_int() }),
            MetaMessage::KeySignature(sharps_flats, minor) => {
                Some(EventKind::KeySignature { sharps_flats, minor })
            }
            MetaMessage::TimeSignature(numerator, denominator_exp, _, _) => {
                Some(EventKind::TimeSignature {
                    numerator,
                    denominator_exp,
                })
            }
            MetaMessage::TrackName(b) => Some(EventKind::TrackName { text: decode_text(b) }),
            MetaMessage::InstrumentName(b) => {
                Some(EventKind::InstrumentName { text: decode_text(b) })
            }
            MetaMessage::Copyright(b) => Some(EventKind::Copyright { text: decode_text(b) }),
            MetaMessage::Text(b) => Some(EventKind::Text { text: decode_text(b) }),
            MetaMessage::Lyric(b) => Some(EventKind::Lyric { text: decode_text(b) }),
            MetaMessage::MidiChannel(channel) => Some(EventKind::ChannelPrefix {
                channel: channel.as_int(),
            }),
            _ => None,
        },
        _ => None,
    }
}

/// Decode meta text, dropping trailing NUL padding
fn decode_text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_end_matches('\0')
        .to_string()
}

/// Read a MIDI file, decompressing if necessary
pub fn read_midi_file(path: &Path) -> Result<Vec<u8>> {
    let mut file = File::open(path)?;

    // Check if it's a gzip file by extension or magic
    let is_gzip = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("gz") || ext.eq_ignore_ascii_case("midz"))
        .unwrap_or(false);

    if is_gzip {
        let mut decoder = GzDecoder::new(file);
        let mut data = Vec::new();
        decoder.read_to_end(&mut data)?;
        Ok(data)
    } else {
        let mut data = Vec::new();
        file.read_to_end(&mut data)?;
        maybe_gunzip(data)
    }
}

/// Decompress the data if it starts with the gzip magic (0x1f 0x8b)
fn maybe_gunzip(data: Vec<u8>) -> Result<Vec<u8>> {
    if data.len() >= 2 && data[0] == 0x1f && data[1] == 0x8b {
        let mut decoder = GzDecoder::new(Cursor::new(data));
        let mut decompressed = Vec::new();
        decoder.read_to_end(&mut decompressed)?;
        Ok(decompressed)
    } else {
        Ok(data)
    }
}
