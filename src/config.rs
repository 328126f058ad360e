//! Decompiler configuration

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// Resolution the tick comments are translated to by default
pub const DEFAULT_TARGET_RESOLUTION: u16 = 480;
/// Ticks subtracted from a predicted note length before snapping
pub const DEFAULT_DURATION_TICK_TOLERANCE: u64 = 2;
/// Maximum difference between the current and a new duration ratio
pub const DEFAULT_DURATION_RATIO_TOLERANCE: f64 = 0.014;
/// Ticks subtracted from the distance to the next note-on
pub const DEFAULT_NEXT_NOTE_ON_TOLERANCE: u64 = 3;

/// Which length strategy is tried first
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum LengthStrategy {
    /// Keep the current duration ratio if possible
    #[default]
    DurationRatioFirst,
    /// Measure up to the next note-on of the channel first
    NextNoteOnFirst,
}

/// Output character set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum Charset {
    #[default]
    #[serde(rename = "utf-8", alias = "utf8")]
    #[value(name = "utf-8", alias = "utf8")]
    Utf8,
    #[serde(rename = "iso-8859-1", alias = "latin1")]
    #[value(name = "iso-8859-1", alias = "latin1")]
    Latin1,
}

impl Charset {
    pub fn name(self) -> &'static str {
        match self {
            Charset::Utf8 => "UTF-8",
            Charset::Latin1 => "ISO-8859-1",
        }
    }

    /// Encode the script text
    pub fn encode(self, text: &str) -> Result<Vec<u8>> {
        match self {
            Charset::Utf8 => Ok(text.as_bytes().to_vec()),
            Charset::Latin1 => text
                .chars()
                .map(|c| {
                    u8::try_from(u32::from(c)).map_err(|_| Error::Encoding {
                        charset: self.name(),
                        character: c,
                    })
                })
                .collect(),
        }
    }
}

/// Evenly spaced forced sync ticks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SyncRange {
    pub start: u64,
    pub each: u64,
    /// Inclusive
    pub stop: u64,
}

/// Options of a decompilation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DecompileConfig {
    /// Annotate note, rest and global lines with their source tick
    pub add_tick_comments: bool,
    /// Append the statistics block
    pub add_statistics: bool,
    /// Resolution used for the target side of tick comments
    pub target_resolution: u16,
    pub duration_tick_tolerance: u64,
    pub duration_ratio_tolerance: f64,
    pub next_note_on_tolerance: u64,
    pub length_strategy: LengthStrategy,
    /// Forced slice boundaries
    pub extra_sync_ticks: BTreeSet<u64>,
    pub extra_sync_range: Option<SyncRange>,
    pub charset: Charset,
}

impl Default for DecompileConfig {
    fn default() -> Self {
        Self {
            add_tick_comments: false,
            add_statistics: true,
            target_resolution: DEFAULT_TARGET_RESOLUTION,
            duration_tick_tolerance: DEFAULT_DURATION_TICK_TOLERANCE,
            duration_ratio_tolerance: DEFAULT_DURATION_RATIO_TOLERANCE,
            next_note_on_tolerance: DEFAULT_NEXT_NOTE_ON_TOLERANCE,
            length_strategy: LengthStrategy::default(),
            extra_sync_ticks: BTreeSet::new(),
            extra_sync_range: None,
            charset: Charset::default(),
        }
    }
}

impl DecompileConfig {
    /// Parse a JSON configuration; missing fields keep their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if self.target_resolution == 0 {
            return Err(Error::Config("target_resolution must be positive".into()));
        }
        if !self.duration_ratio_tolerance.is_finite() || self.duration_ratio_tolerance < 0.0 {
            return Err(Error::Config(format!(
                "duration_ratio_tolerance must be a non-negative number, got {}",
                self.duration_ratio_tolerance
            )));
        }
        if let Some(range) = self.extra_sync_range {
            if range.each == 0 {
                return Err(Error::Config("extra_sync_range.each must be positive".into()));
            }
            if range.stop < range.start {
                return Err(Error::Config(format!(
                    "extra_sync_range ends at {} before its start {}",
                    range.stop, range.start
                )));
            }
        }
        Ok(())
    }

    /// All forced sync ticks, explicit and from the range
    pub fn sync_ticks(&self) -> BTreeSet<u64> {
        let mut ticks = self.extra_sync_ticks.clone();
        if let Some(range) = self.extra_sync_range {
            if range.each > 0 {
                ticks.extend((range.start..=range.stop).step_by(range.each as usize));
            }
        }
        ticks
    }
}
