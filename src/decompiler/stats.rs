//! Decompilation statistics and quality score

use crate::syntax::cmd;
use crate::CHANNEL_COUNT;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write;

/// Counted event types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stat {
    Rests,
    RestsSkipped,
    RestSummands,
    RestTriplets,
    Notes,
    NoteSummands,
    NoteTriplets,
    VelocityChanges,
    DurationChanges,
    Multiple,
}

/// Counters of one channel or of all channels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counters {
    pub rests: u32,
    pub rests_skipped: u32,
    pub rest_summands: u32,
    pub rest_triplets: u32,
    pub notes: u32,
    pub note_summands: u32,
    pub note_triplets: u32,
    pub velocity_changes: u32,
    pub duration_changes: u32,
    pub multiple: u32,
}

impl Counters {
    fn get_mut(&mut self, stat: Stat) -> &mut u32 {
        match stat {
            Stat::Rests => &mut self.rests,
            Stat::RestsSkipped => &mut self.rests_skipped,
            Stat::RestSummands => &mut self.rest_summands,
            Stat::RestTriplets => &mut self.rest_triplets,
            Stat::Notes => &mut self.notes,
            Stat::NoteSummands => &mut self.note_summands,
            Stat::NoteTriplets => &mut self.note_triplets,
            Stat::VelocityChanges => &mut self.velocity_changes,
            Stat::DurationChanges => &mut self.duration_changes,
            Stat::Multiple => &mut self.multiple,
        }
    }

    fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Counters per channel and in total
#[derive(Debug, Clone, Default)]
pub struct Statistics {
    channels: [Counters; CHANNEL_COUNT],
    total: Counters,
}

impl Statistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&mut self, stat: Stat, channel: u8) {
        self.add(stat, channel, 1);
    }

    pub fn add(&mut self, stat: Stat, channel: u8, count: u32) {
        *self.channels[channel as usize].get_mut(stat) += count;
        *self.total.get_mut(stat) += count;
    }

    pub fn channel(&self, channel: u8) -> &Counters {
        &self.channels[channel as usize]
    }

    pub fn total(&self) -> &Counters {
        &self.total
    }

    /// Compute ratios and the quality score
    pub fn report(&self) -> QualityReport {
        let channels = (0..CHANNEL_COUNT as u8)
            .filter(|ch| !self.channels[*ch as usize].is_empty())
            .map(|ch| (ch, PartReport::new(self.channels[ch as usize])))
            .collect();
        let total = PartReport::new(self.total);
        QualityReport {
            quality_score: total.score,
            channels,
            total,
        }
    }
}

/// Ratios of one channel or of all channels, in percent
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartReport {
    pub counters: Counters,
    pub rests_per_note: Option<f64>,
    pub rests_skipped: Option<f64>,
    pub rest_summands: Option<f64>,
    pub rest_triplets: Option<f64>,
    pub note_summands: Option<f64>,
    pub note_triplets: Option<f64>,
    pub velocity_changes: Option<f64>,
    pub duration_changes: Option<f64>,
    pub multiple: Option<f64>,
    /// Mean of the markers
    pub score: Option<f64>,
}

fn percent(count: u32, base: u32) -> Option<f64> {
    (base > 0).then(|| count as f64 * 100.0 / base as f64)
}

impl PartReport {
    fn new(c: Counters) -> Self {
        // `rests` counts written rests only; skipped ones are measured
        // against all rests the channel needed
        let rests_per_note = percent(c.rests, c.notes);
        let rests_skipped = percent(c.rests_skipped, c.rests + c.rests_skipped);
        let rest_summands = percent(c.rest_summands, c.rests);
        let rest_triplets = percent(c.rest_triplets, c.rest_summands);
        let note_summands = percent(c.note_summands, c.notes);
        let note_triplets = percent(c.note_triplets, c.note_summands);
        let velocity_changes = percent(c.velocity_changes, c.notes);
        let duration_changes = percent(c.duration_changes, c.notes);
        let multiple = percent(c.multiple, c.notes);

        // each marker is 100 for a perfect part; summands are at least 100%
        let mut markers = Vec::new();
        markers.extend(rests_per_note.map(|p| 100.0 - p));
        markers.extend(rests_skipped.map(|p| 100.0 - p));
        markers.extend(rest_summands.map(|p| 100.0 - (p - 100.0)));
        markers.extend(rest_triplets.map(|p| 100.0 - p));
        markers.extend(note_summands.map(|p| 100.0 - (p - 100.0)));
        markers.extend(note_triplets.map(|p| 100.0 - p));
        markers.extend(velocity_changes.map(|p| 100.0 - p));
        markers.extend(duration_changes.map(|p| 100.0 - p));
        markers.extend(multiple.map(|p| 100.0 - p));
        let score =
            (!markers.is_empty()).then(|| markers.iter().sum::<f64>() / markers.len() as f64);

        Self {
            counters: c,
            rests_per_note,
            rests_skipped,
            rest_summands,
            rest_triplets,
            note_summands,
            note_triplets,
            velocity_changes,
            duration_changes,
            multiple,
            score,
        }
    }

    fn render(&self, out: &mut String) {
        let c = &self.counters;
        let com = cmd::COMMENT;
        let line = |out: &mut String, label: &str, count: u32, ratio: Option<f64>| {
            let _ = match ratio {
                Some(r) => writeln!(out, "{com}\t\t{label}: {count} ({r:.2}%)"),
                None => writeln!(out, "{com}\t\t{label}: {count}"),
            };
        };

        let _ = writeln!(out, "{com}\tRests: {}", c.rests);
        line(out, "Rests/Notes", c.rests, self.rests_per_note);
        line(out, "Skipped", c.rests_skipped, self.rests_skipped);
        line(out, "Summands", c.rest_summands, self.rest_summands);
        line(out, "Triplets", c.rest_triplets, self.rest_triplets);
        let _ = writeln!(out, "{com}\tNotes: {}", c.notes);
        line(out, "Summands", c.note_summands, self.note_summands);
        line(out, "Triplets", c.note_triplets, self.note_triplets);
        line(out, "Velocity changes", c.velocity_changes, self.velocity_changes);
        line(out, "Duration changes", c.duration_changes, self.duration_changes);
        line(out, "Multiple option", c.multiple, self.multiple);
    }
}

/// Statistics of a finished decompilation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityReport {
    /// Used channels only
    pub channels: BTreeMap<u8, PartReport>,
    pub total: PartReport,
    /// 100 is best; `None` if nothing was emitted
    pub quality_score: Option<f64>,
}

impl QualityReport {
    /// The statistics block as script comments
    pub fn render(&self) -> String {
        let com = cmd::COMMENT;
        let mut out = String::new();
        let _ = writeln!(out, "{com} STATISTICS:");
        for (channel, part) in &self.channels {
            let _ = writeln!(out, "{com}  Channel {channel}:");
            part.render(&mut out);
        }
        let _ = writeln!(out, "{com}  TOTAL:");
        self.total.render(&mut out);
        let _ = writeln!(out, "{com}");
        if let Some(score) = self.quality_score {
            let _ = writeln!(out, "{com} QUALITY SCORE: {score:.2}");
        }
        out
    }
}
