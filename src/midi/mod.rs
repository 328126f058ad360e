//! MIDI input: SMF loading and JSON dumps

pub mod json;
pub mod reader;

pub use json::MidiJson;
pub use reader::{read_midi_file, EventKind, SeqEvent, Sequence};
