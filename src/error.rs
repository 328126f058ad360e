use std::io;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("MIDI parse error: {0}")]
    MidiParse(String),

    #[error("Unsupported timing: SMPTE time code sequences have no tick resolution")]
    UnsupportedTiming,

    #[error("Character {character:?} cannot be encoded as {charset}")]
    Encoding { charset: &'static str, character: char },

    #[error("Slice order violated at tick {tick}")]
    SliceOrder { tick: u64 },

    #[error("Chord table corrupt at channel {channel}, tick {tick}")]
    ChordTable { channel: u8, tick: u64 },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
