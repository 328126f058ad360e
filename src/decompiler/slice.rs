//! Slices: tick ranges between global commands

use super::event::ChannelTimeline;
use crate::error::{Error, Result};
use crate::timeline::GlobalCommands;
use crate::CHANNEL_COUNT;
use std::collections::{BTreeMap, BTreeSet};

/// A tick range in which no global command occurs
#[derive(Debug)]
pub struct Slice {
    pub begin_tick: u64,
    /// Exclusive; `None` for the last slice
    pub end_tick: Option<u64>,
    /// Global commands at the begin tick
    pub globals: GlobalCommands,
    /// Boundary requested by configuration
    pub forced_sync: bool,
    timelines: [ChannelTimeline; CHANNEL_COUNT],
}

impl Slice {
    pub fn new(begin_tick: u64) -> Self {
        Self {
            begin_tick,
            end_tick: None,
            globals: GlobalCommands::new(),
            forced_sync: false,
            timelines: std::array::from_fn(|_| ChannelTimeline::new()),
        }
    }

    pub fn timeline(&self, channel: u8) -> &ChannelTimeline {
        &self.timelines[channel as usize]
    }

    pub fn timeline_mut(&mut self, channel: u8) -> &mut ChannelTimeline {
        &mut self.timelines[channel as usize]
    }
}

/// Split the sequence at global command ticks and forced sync ticks
pub fn plan(
    globals: &BTreeMap<u64, GlobalCommands>,
    sync_ticks: &BTreeSet<u64>,
) -> Result<Vec<Slice>> {
    let boundaries: BTreeSet<u64> = globals.keys().chain(sync_ticks).copied().collect();

    let mut slices = vec![Slice::new(0)];
    for tick in boundaries {
        if tick > 0 {
            if let Some(current) = slices.last_mut() {
                current.end_tick = Some(tick);
            }
            slices.push(Slice::new(tick));
        }
        if let Some(current) = slices.last_mut() {
            match globals.get(&tick) {
                Some(commands) => current.globals = commands.clone(),
                None => current.forced_sync = true,
            }
        }
    }

    check_order(&slices)?;
    Ok(slices)
}

/// Slices must be contiguous and strictly increasing
fn check_order(slices: &[Slice]) -> Result<()> {
    for pair in slices.windows(2) {
        let (prev, next) = (&pair[0], &pair[1]);
        if prev.end_tick != Some(next.begin_tick) || prev.begin_tick >= next.begin_tick {
            return Err(Error::SliceOrder {
                tick: next.begin_tick,
            });
        }
    }
    match slices.last() {
        Some(last) if last.end_tick.is_some() => Err(Error::SliceOrder {
            tick: last.begin_tick,
        }),
        _ => Ok(()),
    }
}

/// Index of the slice containing the tick
pub fn index_of(slices: &[Slice], tick: u64) -> usize {
    slices
        .partition_point(|slice| slice.begin_tick <= tick)
        .saturating_sub(1)
}
