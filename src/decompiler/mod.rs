//! Decompiler - turns a MIDI sequence into a MidicaPL script
//!
//! The pipeline runs in stages: timeline extraction, slice planning,
//! chord consolidation while the slices are filled, then script emission
//! with length resolution and statistics.

pub mod channel;
pub mod chord;
mod emitter;
pub mod event;
pub mod length;
pub mod slice;
pub mod stats;

use crate::config::{Charset, DecompileConfig};
use crate::error::Result;
use crate::midi::Sequence;
use crate::timeline::{self, Timeline};
use crate::CHANNEL_COUNT;
use channel::InstrumentState;
use chord::{ChordTable, StruckNote};
use length::{LengthResolver, LengthTable};
use serde::Serialize;
use slice::Slice;
use stats::{QualityReport, Statistics};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Structural anomaly found while decompiling
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    pub tick: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<u8>,
    pub message: String,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.channel {
            Some(channel) => write!(f, "tick {}, channel {}: {}", self.tick, channel, self.message),
            None => write!(f, "tick {}: {}", self.tick, self.message),
        }
    }
}

/// Output of a successful run
#[derive(Debug, Clone)]
pub struct ExportResult {
    pub script: String,
    pub warnings: Vec<Warning>,
    pub statistics: QualityReport,
}

/// MIDI to MidicaPL decompiler
#[derive(Debug, Clone, Default)]
pub struct Decompiler {
    config: DecompileConfig,
}

impl Decompiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: DecompileConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &DecompileConfig {
        &self.config
    }

    /// Decompile a sequence into script text
    pub fn decompile(&self, sequence: &Sequence) -> Result<ExportResult> {
        let timeline = timeline::extract(sequence);
        info!(
            resolution = timeline.resolution,
            end_tick = timeline.end_tick,
            "timeline extracted"
        );
        DecompilationContext::new(&self.config, &timeline)?.run()
    }

    /// Decompile a MIDI file and write the script
    ///
    /// Nothing is written if decompilation or encoding fails.
    pub fn decompile_file(&self, input: &Path, output: &Path) -> Result<ExportResult> {
        let sequence = Sequence::from_file(input)?;
        let result = self.decompile(&sequence)?;
        write_script(output, &result.script, self.config.charset)?;
        Ok(result)
    }
}

/// Encode the script and write it through a temporary file
pub fn write_script(path: &Path, script: &str, charset: Charset) -> Result<()> {
    let bytes = charset.encode(script)?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    if let Err(e) = fs::write(&tmp, &bytes).and_then(|_| fs::rename(&tmp, path)) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }

    info!(path = %path.display(), bytes = bytes.len(), "script written");
    Ok(())
}

/// State of one decompilation run
pub struct DecompilationContext<'a> {
    config: &'a DecompileConfig,
    timeline: &'a Timeline,
    slices: Vec<Slice>,
    chords: ChordTable,
    states: Vec<InstrumentState>,
    stats: Statistics,
    warnings: Vec<Warning>,
    resolver: LengthResolver,
    rests: LengthTable,
}

impl<'a> DecompilationContext<'a> {
    pub fn new(config: &'a DecompileConfig, timeline: &'a Timeline) -> Result<Self> {
        config.validate()?;
        let slices = slice::plan(&timeline.globals, &config.sync_ticks())?;
        debug!(count = slices.len(), "slices planned");

        Ok(Self {
            config,
            timeline,
            slices,
            chords: ChordTable::new(),
            states: channel::init_states(&timeline.channels),
            stats: Statistics::new(),
            warnings: Vec::new(),
            resolver: LengthResolver::new(timeline.resolution, config),
            rests: LengthTable::rests(timeline.resolution),
        })
    }

    /// Fill the slices and emit the script
    pub fn run(mut self) -> Result<ExportResult> {
        self.add_instruments_to_slices();
        self.add_notes_to_slices()?;
        let script = self.emit_script();

        Ok(ExportResult {
            script,
            warnings: self.warnings,
            statistics: self.stats.report(),
        })
    }

    fn warn(&mut self, tick: u64, channel: Option<u8>, message: String) {
        warn!(tick, channel = ?channel, "{}", message);
        self.warnings.push(Warning {
            tick,
            channel,
            message,
        });
    }

    fn add_instruments_to_slices(&mut self) {
        let timeline = self.timeline;
        for channel in 0..CHANNEL_COUNT as u8 {
            let history = timeline.channel(channel);
            if !history.is_used() {
                continue;
            }
            for &tick in history.instruments.keys().filter(|t| **t > 0) {
                let idx = slice::index_of(&self.slices, tick);
                self.slices[idx]
                    .timeline_mut(channel)
                    .add_instrument_change(tick);
            }
        }
    }

    /// Lowest channel with a note starting at each lyrics tick
    fn lyrics_channels(&mut self) -> BTreeMap<u64, u8> {
        let timeline = self.timeline;
        let mut channels = BTreeMap::new();
        for (&tick, syllable) in &timeline.lyrics {
            let owner = (0..CHANNEL_COUNT as u8)
                .find(|ch| timeline.channel(*ch).notes.contains_key(&tick));
            match owner {
                Some(channel) => {
                    channels.insert(tick, channel);
                }
                None => self.warn(
                    tick,
                    None,
                    format!("no note found for lyrics {:?}", syllable),
                ),
            }
        }
        channels
    }

    fn add_notes_to_slices(&mut self) -> Result<()> {
        let timeline = self.timeline;
        let lyrics_channels = self.lyrics_channels();

        for channel in 0..CHANNEL_COUNT as u8 {
            let history = timeline.channel(channel);
            for (&tick, notes) in &history.notes {
                let mut struck = Vec::with_capacity(notes.len());
                for (&note, &velocity) in notes {
                    let off_tick = match history.release_tick(note, tick) {
                        Some(off) => off,
                        None => {
                            let fallback = match history.next_entry(note, tick) {
                                Some((next_press, _)) => next_press,
                                None => timeline.end_tick.max(tick + 1),
                            };
                            self.warn(
                                tick,
                                Some(channel),
                                format!(
                                    "note-off not found for channel {}, note {}, tick {}",
                                    channel, note, tick
                                ),
                            );
                            fallback
                        }
                    };
                    struck.push(StruckNote {
                        note,
                        velocity,
                        off_tick,
                    });
                }

                let mut playables = chord::consolidate(channel, tick, &struck, &mut self.chords)?;
                if lyrics_channels.get(&tick) == Some(&channel) {
                    if let Some(first) = playables.first_mut() {
                        first.lyrics = timeline.lyrics.get(&tick).cloned();
                    }
                }
                let idx = slice::index_of(&self.slices, tick);
                self.slices[idx]
                    .timeline_mut(channel)
                    .add_playables(tick, playables);
            }
        }
        debug!(chords = self.chords.len(), "notes added to slices");
        Ok(())
    }
}
