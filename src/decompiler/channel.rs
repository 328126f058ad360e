//! Running per-channel state of the emitter

use super::length::DurationRatio;
use crate::timeline::{BankProgram, ChannelHistory};
use crate::CHANNEL_COUNT;

/// Velocity assumed before the first note of a channel
pub const DEFAULT_VELOCITY: u8 = 64;

/// What the emitted script has told the interpreter about a channel so far
#[derive(Debug, Clone)]
pub struct InstrumentState {
    pub channel: u8,
    pub instrument: BankProgram,
    /// No program change at tick 0
    pub automatic: bool,
    /// Has notes
    pub used: bool,
    pub velocity: u8,
    pub duration: DurationRatio,
    /// Tick the script has advanced this channel to
    pub current_tick: u64,
    /// Rest ticks too small to be written yet
    pub rest_carry: u64,
}

impl InstrumentState {
    pub fn new(channel: u8, history: &ChannelHistory) -> Self {
        let at_start = history.instruments.get(&0).copied();
        let used = history.is_used();
        Self {
            channel,
            instrument: at_start.unwrap_or_default(),
            automatic: at_start.is_none() || !used,
            used,
            velocity: DEFAULT_VELOCITY,
            duration: DurationRatio::FULL,
            current_tick: 0,
            rest_carry: 0,
        }
    }
}

/// States of all channels
pub fn init_states(channels: &[ChannelHistory; CHANNEL_COUNT]) -> Vec<InstrumentState> {
    channels
        .iter()
        .enumerate()
        .map(|(ch, history)| InstrumentState::new(ch as u8, history))
        .collect()
}

/// Highest tick any channel has been advanced to
pub fn max_current_tick(states: &[InstrumentState]) -> u64 {
    states.iter().map(|s| s.current_tick).max().unwrap_or(0)
}

/// Furthest tick the written script has advanced any channel to
pub fn max_script_tick(states: &[InstrumentState]) -> u64 {
    states
        .iter()
        .map(|s| s.current_tick.saturating_sub(s.rest_carry))
        .max()
        .unwrap_or(0)
}

/// Channel to carry the rest before a slice: the first non-automatic
/// channel among the most advanced ones, else the first used one
pub fn resync_channel(states: &[InstrumentState]) -> Option<u8> {
    let max = max_current_tick(states);
    let leading = || {
        states
            .iter()
            .filter(move |s| s.used && s.current_tick == max)
    };
    leading()
        .find(|s| !s.automatic)
        .or_else(|| leading().next())
        .map(|s| s.channel)
}
