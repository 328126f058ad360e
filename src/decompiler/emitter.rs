//! Script emission
//!
//! Only properties that differ from the running channel state are written.

use super::channel;
use super::event::Playable;
use super::length::NoteLength;
use super::slice::Slice;
use super::stats::Stat;
use super::DecompilationContext;
use crate::names;
use crate::syntax::{block, cmd, meta, opt, sep, TICK_WORD};
use crate::timeline::GlobalKind;
use crate::{CHANNEL_COUNT, PERCUSSION_CHANNEL};
use std::fmt::Write;
use tracing::debug;

/// Channel identifier as written in the script
fn channel_id(channel: u8) -> String {
    if channel == PERCUSSION_CHANNEL {
        cmd::PERCUSSION.to_string()
    } else {
        channel.to_string()
    }
}

fn global_keyword(kind: GlobalKind) -> &'static str {
    match kind {
        GlobalKind::Tempo => cmd::TEMPO,
        GlobalKind::Key => cmd::KEY_SIG,
        GlobalKind::Time => cmd::TIME_SIG,
    }
}

/// Make a syllable safe for an option value
fn escape_lyrics(syllable: &str) -> String {
    let mut escaped = String::with_capacity(syllable.len());
    for c in syllable.chars() {
        match c {
            ' ' => escaped.push('_'),
            ',' => escaped.push_str("\\c"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            c => escaped.push(c),
        }
    }
    escaped
}

impl DecompilationContext<'_> {
    pub(super) fn emit_script(&mut self) -> String {
        let mut out = String::new();
        self.emit_meta(&mut out);
        self.emit_instruments(&mut out);
        self.emit_chords(&mut out);

        let slices = std::mem::take(&mut self.slices);
        for slice in &slices {
            self.emit_rest_before_slice(slice, &mut out);
            self.emit_globals(slice, &mut out);
            for channel in 0..CHANNEL_COUNT as u8 {
                self.emit_channel(slice, channel, &mut out);
            }
        }
        self.slices = slices;

        if self.config.add_statistics {
            out.push_str(&self.stats.report().render());
        }
        out
    }

    /// `// tick <src> ==> <target>`, as its own line or appended to one
    fn tick_comment(&self, tick: u64, own_line: bool) -> String {
        if !self.config.add_tick_comments {
            return String::new();
        }
        let src = self.timeline.resolution as u128;
        let target_res = self.config.target_resolution as u128;
        let target = (tick as u128 * target_res * 2 + src) / (src * 2);
        let text = format!("{} {} {} ==> {}", cmd::COMMENT, TICK_WORD, tick, target);
        if own_line {
            text + "\n"
        } else {
            format!("\t\t\t\t{}", text)
        }
    }

    fn emit_meta(&self, out: &mut String) {
        let info = &self.timeline.meta;
        if info.is_empty() {
            return;
        }
        let _ = writeln!(out, "{}", block::META);
        let entries = [
            (meta::COPYRIGHT, &info.copyright),
            (meta::TITLE, &info.title),
            (meta::COMPOSER, &info.composer),
            (meta::LYRICIST, &info.lyricist),
            (meta::ARTIST, &info.artist),
        ];
        for (key, value) in entries {
            if let Some(value) = value {
                let _ = writeln!(out, "\t{}\t{}", key, value.replace(['\r', '\n'], " "));
            }
        }
        let _ = writeln!(out, "{}\n", block::END);
    }

    fn emit_instruments(&mut self, out: &mut String) {
        let _ = writeln!(out, "{}", block::INSTRUMENTS);
        for channel in 0..CHANNEL_COUNT as u8 {
            if let Some(line) = self.instrument_line(channel, 0) {
                out.push_str(&line);
            }
        }
        let _ = writeln!(out, "{}\n", block::END);
    }

    /// Instrument declaration or change of a used channel
    fn instrument_line(&mut self, channel: u8, tick: u64) -> Option<String> {
        let state = &self.states[channel as usize];
        if !state.used {
            return None;
        }
        let history = self.timeline.channel(channel);
        let (instrument, prefix) = if tick == 0 {
            (history.instruments.get(&0).copied().unwrap_or_default(), "")
        } else {
            (*history.instruments.get(&tick)?, cmd::INSTRUMENT)
        };

        let program = instrument.program;
        let mut program_text = if channel == PERCUSSION_CHANNEL {
            names::drumkit_id(program)
                .map(str::to_string)
                .unwrap_or_else(|| program.to_string())
        } else {
            names::instrument_id(program)
        };
        if instrument.bank_msb != 0 || instrument.bank_lsb != 0 {
            let _ = write!(program_text, "{}{}", sep::PROG_BANK, instrument.bank_msb);
            if instrument.bank_lsb != 0 {
                let _ = write!(program_text, "{}{}", sep::BANK, instrument.bank_lsb);
            }
        }
        let label = match history.label_at(tick) {
            Some(label) => label.to_string(),
            None if channel == PERCUSSION_CHANNEL => program_text.clone(),
            None => names::instrument_name(program).to_string(),
        };

        self.states[channel as usize].instrument = instrument;
        Some(format!(
            "{}\t{}\t{}\t\t{}\n",
            prefix,
            channel_id(channel),
            program_text,
            label
        ))
    }

    fn emit_chords(&self, out: &mut String) {
        if self.chords.is_empty() {
            return;
        }
        for (name, notes) in self.chords.definitions() {
            let notes: Vec<String> = notes.iter().map(|n| names::note_name(*n)).collect();
            let _ = writeln!(
                out,
                "{}\t{}{}{}",
                cmd::CHORD,
                name,
                sep::CHORD_ASSIGNER,
                notes.join(sep::CHORD_SEPARATOR)
            );
        }
        out.push('\n');
    }

    /// Move the leading channel to the slice begin if no channel reached it
    fn emit_rest_before_slice(&mut self, slice: &Slice, out: &mut String) {
        let Some(channel) = channel::resync_channel(&self.states) else {
            return;
        };
        let current = self.states[channel as usize].current_tick;
        if slice.begin_tick <= current {
            return;
        }
        let rest = self.rest_line(channel, slice.begin_tick - current, current);
        out.push_str(&rest);
        self.states[channel as usize].current_tick = slice.begin_tick;
    }

    /// Synchronize all channels, then write the global commands
    ///
    /// The interpreter moves every channel to the furthest position the
    /// script has reached, which lags behind the tick by the carried rest.
    fn emit_globals(&mut self, slice: &Slice, out: &mut String) {
        let max = channel::max_current_tick(&self.states);
        let carry = max - channel::max_script_tick(&self.states);
        for state in &mut self.states {
            state.current_tick = max;
            state.rest_carry = carry;
        }

        if !slice.globals.is_empty() {
            out.push_str(&self.tick_comment(slice.begin_tick, true));
            for (kind, value) in &slice.globals {
                let _ = writeln!(out, "{}\t{}\t{}", cmd::GLOBAL, global_keyword(*kind), value);
            }
            out.push('\n');
        } else if slice.forced_sync && slice.begin_tick > 0 {
            out.push_str(&self.tick_comment(slice.begin_tick, true));
            let _ = writeln!(out, "{}\n", cmd::GLOBAL);
        }
    }

    fn emit_channel(&mut self, slice: &Slice, channel: u8, out: &mut String) {
        let timeline = slice.timeline(channel);
        if timeline.is_empty() {
            return;
        }
        for (tick, events) in timeline.iter() {
            if events.instrument_change {
                self.emit_instrument_change(channel, tick, out);
            }
            if !events.playables.is_empty() {
                self.emit_playables(slice, channel, tick, &events.playables, out);
            }
        }
        out.push('\n');
    }

    fn emit_instrument_change(&mut self, channel: u8, tick: u64, out: &mut String) {
        let current = self.states[channel as usize].current_tick;
        if tick > current {
            let rest = self.rest_line(channel, tick - current, current);
            out.push_str(&rest);
            self.states[channel as usize].current_tick = tick;
        }
        if let Some(line) = self.instrument_line(channel, tick) {
            out.push_str(&self.tick_comment(tick, true));
            out.push_str(&line);
        }
    }

    /// Lines of all playables starting at one tick
    ///
    /// The playable chosen to advance the channel is written last; the
    /// others get the multiple option.
    fn emit_playables(
        &mut self,
        slice: &Slice,
        channel: u8,
        tick: u64,
        playables: &[Playable],
        out: &mut String,
    ) {
        let history = self.timeline.channel(channel);
        let next_on = history.next_note_on(tick);
        let duration = self.states[channel as usize].duration;
        let lengths: Vec<NoteLength> = playables
            .iter()
            .map(|p| self.resolver.resolve(tick, p.off_tick, duration, next_on))
            .collect();

        let current = self.states[channel as usize].current_tick;
        if tick > current {
            let rest = self.rest_line(channel, tick - current, current);
            out.push_str(&rest);
            self.states[channel as usize].current_tick = tick;
        }

        // the clock may only advance up to the next onset and the slice end
        let limit = match (next_on, slice.end_tick) {
            (Some(next), Some(end)) => Some(next.min(end)),
            (next, end) => next.or(end),
        };
        let mut chosen: Option<(usize, u64)> = None;
        for (idx, length) in lengths.iter().enumerate() {
            let end = tick + length.ticks();
            if limit.is_some_and(|limit| end > limit) {
                continue;
            }
            if chosen.map_or(true, |(_, best)| end > best) {
                chosen = Some((idx, end));
            }
        }
        if chosen.is_none() {
            debug!(tick, channel, "no playable fits before the next onset");
        }

        let chosen_idx = chosen.map(|(idx, _)| idx);
        let order = (0..playables.len())
            .filter(|idx| Some(*idx) != chosen_idx)
            .chain(chosen_idx);
        for idx in order {
            let multiple = Some(idx) != chosen_idx;
            let line = self.note_line(channel, tick, &playables[idx], &lengths[idx], multiple);
            out.push_str(&line);
        }
        if let Some((_, end)) = chosen {
            self.states[channel as usize].current_tick = end;
        }
    }

    fn note_line(
        &mut self,
        channel: u8,
        tick: u64,
        playable: &Playable,
        length: &NoteLength,
        multiple: bool,
    ) -> String {
        let table = self.resolver.table();
        let length_text = table.format(&length.summands);
        let triplets = table.triplets(&length.summands) as u32;
        self.stats.increment(Stat::Notes, channel);
        self.stats
            .add(Stat::NoteSummands, channel, length.summands.len() as u32);
        self.stats.add(Stat::NoteTriplets, channel, triplets);

        let mut options = Vec::new();
        if multiple {
            options.push(opt::MULTIPLE.to_string());
            self.stats.increment(Stat::Multiple, channel);
        }
        let state = &mut self.states[channel as usize];
        let duration = length.duration();
        if duration != state.duration {
            options.push(format!(
                "{}{}{}{}",
                opt::DURATION,
                sep::OPT_ASSIGNER,
                duration,
                opt::DURATION_PERCENT
            ));
            state.duration = duration;
            self.stats.increment(Stat::DurationChanges, channel);
        }
        let state = &mut self.states[channel as usize];
        if playable.velocity != state.velocity {
            options.push(format!(
                "{}{}{}",
                opt::VELOCITY,
                sep::OPT_ASSIGNER,
                playable.velocity
            ));
            state.velocity = playable.velocity;
            self.stats.increment(Stat::VelocityChanges, channel);
        }
        if let Some(syllable) = &playable.lyrics {
            options.push(format!(
                "{}{}{}",
                opt::LYRICS,
                sep::OPT_ASSIGNER,
                escape_lyrics(syllable)
            ));
        }

        let mut line = format!("{}\t{}\t{}", channel_id(channel), playable.name, length_text);
        if !options.is_empty() {
            line.push('\t');
            line.push_str(&options.join(&format!("{} ", sep::OPT_SEPARATOR)));
        }
        line.push_str(&self.tick_comment(tick, false));
        line.push('\n');
        line
    }

    /// Rest line of the given length, starting at `tick`
    ///
    /// Ticks too small for any rest token are carried to the next rest of
    /// the channel.
    fn rest_line(&mut self, channel: u8, ticks: u64, tick: u64) -> String {
        let state = &mut self.states[channel as usize];
        let total = ticks + state.rest_carry;
        let parts = self.rests.decompose(total);
        state.rest_carry = parts.remainder;

        if parts.tokens.is_empty() {
            self.stats.increment(Stat::RestsSkipped, channel);
            let message = format!("rest too small to be handled: {} ticks", total);
            let line = format!(
                "{} {}{}\n",
                cmd::COMMENT,
                message,
                self.tick_comment(tick, false)
            );
            self.warn(tick, Some(channel), message);
            return line;
        }
        if parts.remainder > 0 {
            debug!(tick, channel, remainder = parts.remainder, "carrying rest remainder");
        }

        self.stats.increment(Stat::Rests, channel);
        self.stats
            .add(Stat::RestSummands, channel, parts.tokens.len() as u32);
        let triplets = self.rests.triplets(&parts.tokens) as u32;
        self.stats.add(Stat::RestTriplets, channel, triplets);
        format!(
            "{}\t{}\t{}{}\n",
            channel_id(channel),
            cmd::REST,
            self.rests.format(&parts.tokens),
            self.tick_comment(tick, false)
        )
    }
}
