pub mod config;
pub mod decompiler;
pub mod error;
pub mod midi;
pub mod names;
pub mod syntax;
pub mod timeline;

pub use config::DecompileConfig;
pub use decompiler::{Decompiler, ExportResult, Warning};
pub use error::Error;
pub use midi::Sequence;

/// Number of MIDI channels
pub const CHANNEL_COUNT: usize = 16;

/// General MIDI percussion channel (channel 10, zero-based)
pub const PERCUSSION_CHANNEL: u8 = 9;
