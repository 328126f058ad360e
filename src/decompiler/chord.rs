//! Chord consolidation
//!
//! Notes of one channel that start at the same tick and carry the same
//! velocity and release tick are merged into a named chord.

use super::event::Playable;
use crate::error::{Error, Result};
use crate::names;
use std::collections::{BTreeMap, BTreeSet};

/// A note struck at some tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StruckNote {
    pub note: u8,
    pub velocity: u8,
    pub off_tick: u64,
}

/// Named chords, assigned in order of first use
#[derive(Debug, Default)]
pub struct ChordTable {
    names: BTreeMap<Vec<u8>, String>,
    /// pitch class of the lowest note -> chords in order of first use
    by_base: BTreeMap<u8, Vec<Vec<u8>>>,
}

impl ChordTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Name of a chord, registering it on first use
    ///
    /// Returns `None` for less than two notes or an inconsistent table.
    pub fn name_for(&mut self, notes: &BTreeSet<u8>) -> Option<String> {
        if notes.len() < 2 {
            return None;
        }
        let key: Vec<u8> = notes.iter().copied().collect();
        let pitch_class = key[0] % 12;

        if let Some(name) = self.names.get(&key) {
            let listed = self
                .by_base
                .get(&pitch_class)
                .is_some_and(|chords| chords.contains(&key));
            return listed.then(|| name.clone());
        }

        let chords = self.by_base.entry(pitch_class).or_default();
        chords.push(key.clone());
        let name = format!("crd_{}_{}", names::base_note_name(key[0]), chords.len());
        self.names.insert(key, name.clone());
        Some(name)
    }

    /// Chord definitions ordered by pitch class, then by first use
    pub fn definitions(&self) -> impl Iterator<Item = (&str, &[u8])> + '_ {
        self.by_base.values().flatten().filter_map(move |notes| {
            self.names
                .get(notes)
                .map(|name| (name.as_str(), notes.as_slice()))
        })
    }
}

/// Group the notes struck at one tick into playables, sorted by lowest note
pub fn consolidate(
    channel: u8,
    tick: u64,
    notes: &[StruckNote],
    table: &mut ChordTable,
) -> Result<Vec<Playable>> {
    let mut groups: BTreeMap<(u8, u64), BTreeSet<u8>> = BTreeMap::new();
    for struck in notes {
        groups
            .entry((struck.velocity, struck.off_tick))
            .or_default()
            .insert(struck.note);
    }

    let mut playables = Vec::with_capacity(groups.len());
    for ((velocity, off_tick), group) in groups {
        let notes: Vec<u8> = group.iter().copied().collect();
        let name = if notes.len() == 1 {
            names::channel_note_name(channel, notes[0])
        } else if channel == crate::PERCUSSION_CHANNEL {
            // percussion chords are written inline
            notes
                .iter()
                .map(|n| names::percussion_name(*n))
                .collect::<Vec<_>>()
                .join(crate::syntax::sep::CHORD_SEPARATOR)
        } else {
            table
                .name_for(&group)
                .ok_or(Error::ChordTable { channel, tick })?
        };
        playables.push(Playable {
            name,
            notes,
            velocity,
            off_tick,
            lyrics: None,
        });
    }
    playables.sort_by_key(Playable::lowest);
    Ok(playables)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn struck(note: u8, velocity: u8, off_tick: u64) -> StruckNote {
        StruckNote {
            note,
            velocity,
            off_tick,
        }
    }

    #[test]
    fn test_chord_names() {
        let mut table = ChordTable::new();
        let c_major: BTreeSet<u8> = [60, 64, 67].into();
        let c_minor: BTreeSet<u8> = [60, 63, 67].into();
        let a_minor: BTreeSet<u8> = [57, 60, 64].into();

        assert_eq!(table.name_for(&c_major).as_deref(), Some("crd_c_1"));
        assert_eq!(table.name_for(&a_minor).as_deref(), Some("crd_a_1"));
        assert_eq!(table.name_for(&c_minor).as_deref(), Some("crd_c_2"));
        assert_eq!(table.name_for(&c_major).as_deref(), Some("crd_c_1"));
        assert_eq!(table.name_for(&[60].into()), None);

        let defs: Vec<_> = table.definitions().map(|(name, _)| name).collect();
        assert_eq!(defs, vec!["crd_c_1", "crd_c_2", "crd_a_1"]);
    }

    #[test]
    fn test_consolidate_groups_by_velocity_and_release() {
        let mut table = ChordTable::new();
        let notes = [
            struck(67, 80, 480),
            struck(60, 80, 480),
            struck(64, 80, 480),
            struck(48, 100, 960),
        ];
        let playables = consolidate(0, 0, &notes, &mut table).unwrap();

        assert_eq!(playables.len(), 2);
        assert_eq!(playables[0].name, "c-1");
        assert_eq!(playables[1].name, "crd_c_1");
        assert_eq!(playables[1].notes, vec![60, 64, 67]);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_percussion_inline() {
        let mut table = ChordTable::new();
        let notes = [struck(42, 90, 120), struck(36, 90, 120)];
        let playables = consolidate(9, 0, &notes, &mut table).unwrap();

        assert_eq!(playables.len(), 1);
        assert_eq!(playables[0].name, "bd1,hhc");
        assert!(table.is_empty());
    }
}
