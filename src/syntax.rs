//! MidicaPL token vocabulary
//!
//! These are the keywords understood by the MidicaPL interpreter. The
//! decompiler only ever writes them.

/// Block keywords
pub mod block {
    pub const META: &str = "META";
    pub const INSTRUMENTS: &str = "INSTRUMENTS";
    pub const END: &str = "END";
}

/// META block entries
pub mod meta {
    pub const COPYRIGHT: &str = "copyright";
    pub const TITLE: &str = "title";
    pub const COMPOSER: &str = "composer";
    pub const LYRICIST: &str = "lyrics";
    pub const ARTIST: &str = "artist";
}

/// Single-line commands
pub mod cmd {
    /// Instrument change after tick 0
    pub const INSTRUMENT: &str = "INSTRUMENT";
    pub const CHORD: &str = "CHORD";
    /// Global command prefix; alone it synchronizes all channels
    pub const GLOBAL: &str = "*";
    pub const TEMPO: &str = "tempo";
    pub const KEY_SIG: &str = "key";
    pub const TIME_SIG: &str = "time";
    pub const REST: &str = "-";
    /// Percussion channel identifier
    pub const PERCUSSION: &str = "p";
    pub const COMMENT: &str = "//";
}

/// Separators and assigners
pub mod sep {
    pub const CHORD_ASSIGNER: &str = "=";
    pub const CHORD_SEPARATOR: &str = ",";
    pub const PROG_BANK: &str = ",";
    pub const BANK: &str = "/";
    pub const KEY: &str = "/";
    pub const TIME_SIG_SLASH: &str = "/";
    pub const LENGTH_PLUS: &str = "+";
    pub const OPT_ASSIGNER: &str = "=";
    pub const OPT_SEPARATOR: &str = ",";
}

/// Note length tokens
pub mod length {
    pub const WHOLE: &str = "1";
    pub const HALF: &str = "2";
    pub const QUARTER: &str = "4";
    pub const EIGHTH: &str = "8";
    pub const SIXTEENTH: &str = "16";
    pub const THIRTY_SECOND: &str = "32";
    pub const M2: &str = "*2";
    pub const M4: &str = "*4";
    pub const M8: &str = "*8";
    pub const M16: &str = "*16";
    pub const M32: &str = "*32";
    pub const DOT: &str = ".";
    pub const TRIPLET: &str = "t";
}

/// Channel command options
pub mod opt {
    pub const MULTIPLE: &str = "m";
    pub const DURATION: &str = "d";
    pub const VELOCITY: &str = "v";
    pub const LYRICS: &str = "l";
    pub const DURATION_PERCENT: &str = "%";
}

/// Word used in tick comments
pub const TICK_WORD: &str = "tick";
