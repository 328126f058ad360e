//! Note and rest lengths
//!
//! Length tokens are precomputed for the source resolution. Note lengths
//! are snapped upwards to the nearest token, rests are decomposed into a
//! greedy sum of tokens.

use crate::config::{DecompileConfig, LengthStrategy};
use crate::syntax::{length, sep};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Ticks of `factor / divisor` quarter notes, rounded
fn calculate_ticks(resolution: u16, factor: u64, divisor: u64) -> u64 {
    (resolution as u64 * factor * 10 + 5) / (divisor * 10)
}

/// Tick count -> length token for one resolution
#[derive(Debug, Clone)]
pub struct LengthTable {
    lengths: BTreeMap<u64, String>,
}

impl LengthTable {
    /// Tokens usable for notes
    pub fn notes(resolution: u16) -> Self {
        let mut lengths = BTreeMap::new();
        let mut add = |factor, divisor, token: String| {
            let ticks = calculate_ticks(resolution, factor, divisor);
            if ticks > 0 {
                lengths.insert(ticks, token);
            }
        };

        let triplet = length::TRIPLET;
        let dot = length::DOT;
        let basic = [
            (length::THIRTY_SECOND, 1, 8),
            (length::SIXTEENTH, 1, 4),
            (length::EIGHTH, 1, 2),
            (length::QUARTER, 1, 1),
            (length::HALF, 2, 1),
            (length::WHOLE, 4, 1),
        ];
        for (token, factor, divisor) in basic {
            // triplet = 2/3, dotted = 3/2
            add(factor * 2, divisor * 3, format!("{token}{triplet}"));
            add(factor, divisor, token.to_string());
            add(factor * 3, divisor * 2, format!("{token}{dot}"));
        }
        let multiple = [
            (length::M2, 8),
            (length::M4, 16),
            (length::M8, 32),
            (length::M16, 64),
            (length::M32, 128),
        ];
        for (token, factor) in multiple {
            add(factor, 1, token.to_string());
            add(factor * 3, 2, format!("{token}{dot}"));
        }

        Self { lengths }
    }

    /// Tokens usable for rests: the note tokens plus shorter ones
    pub fn rests(resolution: u16) -> Self {
        let mut table = Self::notes(resolution);
        for (divisor, token) in [(16, "64"), (32, "128"), (64, "256"), (128, "512")] {
            let ticks = calculate_ticks(resolution, 1, divisor);
            if ticks > 0 {
                table.lengths.insert(ticks, token.to_string());
            }
        }
        table
    }

    pub fn token(&self, ticks: u64) -> Option<&str> {
        self.lengths.get(&ticks).map(String::as_str)
    }

    pub fn largest(&self) -> Option<u64> {
        self.lengths.keys().next_back().copied()
    }

    /// Snap a predicted length to tokens: the smallest token reaching the
    /// remaining ticks, or the largest one while it does not
    pub fn snap(&self, ticks: i64) -> Vec<u64> {
        let mut summands = Vec::new();
        let Some(largest) = self.largest() else {
            return summands;
        };
        let mut remaining = ticks;
        loop {
            let wanted = remaining.max(0) as u64;
            let token = self
                .lengths
                .range(wanted..)
                .next()
                .map(|(t, _)| *t)
                .unwrap_or(largest);
            summands.push(token);
            remaining -= token as i64;
            if remaining <= 0 {
                return summands;
            }
        }
    }

    /// Greedy decomposition into the largest tokens not exceeding the rest
    pub fn decompose(&self, ticks: u64) -> Decomposition {
        let mut tokens = Vec::new();
        let mut remaining = ticks;
        while let Some((token, _)) = self.lengths.range(..=remaining).next_back() {
            tokens.push(*token);
            remaining -= *token;
        }
        Decomposition {
            tokens,
            remainder: remaining,
        }
    }

    /// Join the tokens of the summands with `+`
    pub fn format(&self, summands: &[u64]) -> String {
        summands
            .iter()
            .filter_map(|ticks| self.token(*ticks))
            .collect::<Vec<_>>()
            .join(sep::LENGTH_PLUS)
    }

    /// Number of triplet tokens among the summands
    pub fn triplets(&self, summands: &[u64]) -> usize {
        summands
            .iter()
            .filter_map(|ticks| self.token(*ticks))
            .filter(|token| token.ends_with(length::TRIPLET))
            .count()
    }
}

/// Result of a greedy decomposition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decomposition {
    /// Token tick counts, largest first
    pub tokens: Vec<u64>,
    /// Ticks too small for any token
    pub remainder: u64,
}

/// Press length relative to the notated length, in tenths of a percent
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct DurationRatio(u32);

impl DurationRatio {
    pub const FULL: Self = Self(1000);
    pub const MIN: Self = Self(5);

    pub fn from_ratio(ratio: f64) -> Self {
        let per_mille = (ratio * 1000.0).round();
        if per_mille.is_finite() && per_mille > 0.0 {
            Self((per_mille.min(u32::MAX as f64) as u32).max(Self::MIN.0))
        } else {
            Self::MIN
        }
    }

    pub fn ratio(self) -> f64 {
        self.0 as f64 / 1000.0
    }

    pub fn per_mille(self) -> u32 {
        self.0
    }
}

impl fmt::Display for DurationRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 % 10 == 0 {
            write!(f, "{}", self.0 / 10)
        } else {
            write!(f, "{}.{}", self.0 / 10, self.0 % 10)
        }
    }
}

/// Notated length of one playable
#[derive(Debug, Clone, PartialEq)]
pub struct NoteLength {
    /// Summand tick counts
    pub summands: Vec<u64>,
    /// Press length divided by notated length
    pub ratio: f64,
}

impl NoteLength {
    pub fn ticks(&self) -> u64 {
        self.summands.iter().sum()
    }

    pub fn duration(&self) -> DurationRatio {
        DurationRatio::from_ratio(self.ratio)
    }
}

/// Chooses notated lengths for pressed notes
#[derive(Debug, Clone)]
pub struct LengthResolver {
    table: LengthTable,
    tick_tolerance: u64,
    ratio_tolerance: f64,
    next_on_tolerance: u64,
    strategy: LengthStrategy,
}

impl LengthResolver {
    pub fn new(resolution: u16, config: &DecompileConfig) -> Self {
        Self {
            table: LengthTable::notes(resolution),
            tick_tolerance: config.duration_tick_tolerance,
            ratio_tolerance: config.duration_ratio_tolerance,
            next_on_tolerance: config.next_note_on_tolerance,
            strategy: config.length_strategy,
        }
    }

    pub fn table(&self) -> &LengthTable {
        &self.table
    }

    /// Resolve the length of a note pressed from `on_tick` to `off_tick`
    ///
    /// `current` is the channel's duration ratio, `next_on` the channel's
    /// next note-on after `on_tick`.
    pub fn resolve(
        &self,
        on_tick: u64,
        off_tick: u64,
        current: DurationRatio,
        next_on: Option<u64>,
    ) -> NoteLength {
        let press = off_tick.saturating_sub(on_tick).max(1);

        let keep_ratio = || {
            let predicted = (press as f64 / current.ratio()) as i64 - self.tick_tolerance as i64;
            let length = self.length_for(press, predicted)?;
            ((current.ratio() - length.ratio).abs() < self.ratio_tolerance).then_some(length)
        };
        let until_next_on = || {
            let next = next_on?;
            let predicted = next as i64 - on_tick as i64 - self.next_on_tolerance as i64;
            self.length_for(press, predicted)
        };

        let found = match self.strategy {
            LengthStrategy::DurationRatioFirst => keep_ratio().or_else(until_next_on),
            LengthStrategy::NextNoteOnFirst => until_next_on().or_else(keep_ratio),
        };
        found
            .or_else(|| self.length_for(press, press as i64))
            .unwrap_or(NoteLength {
                summands: vec![press],
                ratio: 1.0,
            })
    }

    fn length_for(&self, press: u64, predicted: i64) -> Option<NoteLength> {
        let summands = self.table.snap(predicted);
        let ticks: u64 = summands.iter().sum();
        (ticks > 0).then(|| NoteLength {
            summands,
            ratio: press as f64 / ticks as f64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn smallest(table: &LengthTable) -> Option<u64> {
        table.lengths.keys().next().copied()
    }

    #[test]
    fn test_note_table_480() {
        let table = LengthTable::notes(480);
        assert_eq!(table.token(480), Some("4"));
        assert_eq!(table.token(320), Some("4t"));
        assert_eq!(table.token(720), Some("4."));
        assert_eq!(table.token(1920), Some("1"));
        assert_eq!(table.token(60), Some("32"));
        assert_eq!(table.token(40), Some("32t"));
        assert_eq!(table.token(3840), Some("*2"));
        assert_eq!(table.token(92160), Some("*32."));
        assert_eq!(smallest(&table), Some(40));
    }

    #[test]
    fn test_rest_table_480() {
        let table = LengthTable::rests(480);
        assert_eq!(table.token(30), Some("64"));
        assert_eq!(table.token(15), Some("128"));
        assert_eq!(table.token(7), Some("256"));
        assert_eq!(table.token(3), Some("512"));
        assert_eq!(smallest(&table), Some(3));
    }

    #[test]
    fn test_low_resolution_drops_zero_ticks() {
        let table = LengthTable::notes(4);
        assert_eq!(table.token(0), None);
        assert_eq!(smallest(&table), Some(1));
    }

    #[test]
    fn test_snap() {
        let table = LengthTable::notes(480);
        assert_eq!(table.snap(478), vec![480]);
        assert_eq!(table.snap(481), vec![640]);
        assert_eq!(table.snap(0), vec![40]);
        assert_eq!(table.snap(-5), vec![40]);
        assert_eq!(table.snap(100_000), vec![92160, 11520]);
    }

    #[test]
    fn test_decompose() {
        let table = LengthTable::rests(480);
        let d = table.decompose(960 + 240 + 2);
        assert_eq!(d.tokens, vec![960, 240]);
        assert_eq!(d.remainder, 2);
        assert_eq!(table.format(&d.tokens), "2+8");

        let d = table.decompose(2);
        assert!(d.tokens.is_empty());
        assert_eq!(d.remainder, 2);

        let d = table.decompose(480 + 60);
        assert_eq!(table.format(&d.tokens), "4+32");
    }

    #[test]
    fn test_decompose_sums_to_span() {
        for resolution in [1, 2, 3, 7, 24, 96, 120, 192, 384, 480, 960, 1000] {
            for table in [LengthTable::notes(resolution), LengthTable::rests(resolution)] {
                let min = smallest(&table).unwrap();
                for ticks in 0..20_000 {
                    let d = table.decompose(ticks);
                    assert_eq!(
                        d.tokens.iter().sum::<u64>() + d.remainder,
                        ticks,
                        "resolution {resolution}, {ticks} ticks"
                    );
                    assert!(d.remainder < min);
                    assert!(d.tokens.iter().all(|t| table.token(*t).is_some()));
                }
            }
        }
    }

    #[test]
    fn test_duration_ratio_display() {
        assert_eq!(DurationRatio::FULL.to_string(), "100");
        assert_eq!(DurationRatio::from_ratio(0.875).to_string(), "87.5");
        assert_eq!(DurationRatio::from_ratio(0.0001), DurationRatio::MIN);
        assert_eq!(DurationRatio::MIN.to_string(), "0.5");
    }

    #[test]
    fn test_resolve_keeps_ratio() {
        let resolver = LengthResolver::new(480, &DecompileConfig::default());
        let length = resolver.resolve(0, 478, DurationRatio::FULL, None);
        assert_eq!(length.summands, vec![480]);
        assert_eq!(length.duration(), DurationRatio::from_ratio(478.0 / 480.0));
    }

    #[test]
    fn test_resolve_uses_next_note_on() {
        let resolver = LengthResolver::new(480, &DecompileConfig::default());
        // 470/480 is too far from 100%
        let length = resolver.resolve(0, 470, DurationRatio::FULL, Some(960));
        assert_eq!(length.summands, vec![960]);
        assert_eq!(length.duration().per_mille(), 490);
    }

    #[test]
    fn test_resolve_press_fallback() {
        let resolver = LengthResolver::new(480, &DecompileConfig::default());
        let length = resolver.resolve(0, 470, DurationRatio::FULL, None);
        assert_eq!(length.summands, vec![480]);
        assert_eq!(length.duration().per_mille(), 979);
    }

    #[test]
    fn test_next_note_on_first() {
        let config = DecompileConfig {
            length_strategy: LengthStrategy::NextNoteOnFirst,
            ..DecompileConfig::default()
        };
        let resolver = LengthResolver::new(480, &config);
        let length = resolver.resolve(0, 478, DurationRatio::FULL, Some(960));
        assert_eq!(length.summands, vec![960]);

        let default = LengthResolver::new(480, &DecompileConfig::default());
        assert_eq!(
            default.resolve(0, 478, DurationRatio::FULL, Some(960)).summands,
            vec![480]
        );
    }
}
