//! Integration tests for MIDI decompilation
//!
//! These tests build standard MIDI files with midly, run the whole pipeline
//! and check the emitted MidicaPL script

use midi2mpl::{DecompileConfig, Decompiler, ExportResult, Sequence};
use midly::num::{u15, u24, u28, u4, u7};
use midly::{Format, Header, MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind};
use pretty_assertions::assert_eq;
use std::io::Write;
use tempfile::tempdir;

type Event = (u64, TrackEventKind<'static>);

fn midi(channel: u8, message: MidiMessage) -> TrackEventKind<'static> {
    TrackEventKind::Midi {
        channel: u4::new(channel),
        message,
    }
}

/// Note-on and note-off events of one note
fn note(channel: u8, key: u8, velocity: u8, on: u64, off: u64) -> Vec<Event> {
    vec![
        (
            on,
            midi(
                channel,
                MidiMessage::NoteOn {
                    key: u7::new(key),
                    vel: u7::new(velocity),
                },
            ),
        ),
        (
            off,
            midi(
                channel,
                MidiMessage::NoteOff {
                    key: u7::new(key),
                    vel: u7::new(0),
                },
            ),
        ),
    ]
}

fn program(channel: u8, program: u8, tick: u64) -> Event {
    (
        tick,
        midi(
            channel,
            MidiMessage::ProgramChange {
                program: u7::new(program),
            },
        ),
    )
}

fn meta(tick: u64, message: MetaMessage<'static>) -> Event {
    (tick, TrackEventKind::Meta(message))
}

/// Helper to encode tracks of absolute-tick events as SMF bytes
fn build_smf(resolution: u16, tracks: Vec<Vec<Event>>) -> Vec<u8> {
    let mut smf = Smf::new(Header::new(
        Format::Parallel,
        Timing::Metrical(u15::new(resolution)),
    ));
    for mut events in tracks {
        events.sort_by_key(|(tick, _)| *tick);
        let mut last = 0;
        let mut track = Vec::new();
        for (tick, kind) in events {
            track.push(TrackEvent {
                delta: u28::new((tick - last) as u32),
                kind,
            });
            last = tick;
        }
        track.push(TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
        });
        smf.tracks.push(track);
    }
    let mut data = Vec::new();
    smf.write_std(&mut data).expect("Failed to write SMF");
    data
}

/// Helper to decompile SMF bytes with a configuration
fn decompile_with(data: &[u8], config: DecompileConfig) -> ExportResult {
    let sequence = Sequence::parse(data).expect("Failed to parse SMF");
    Decompiler::with_config(config)
        .expect("Invalid configuration")
        .decompile(&sequence)
        .expect("Decompilation failed")
}

fn decompile(data: &[u8]) -> ExportResult {
    decompile_with(data, DecompileConfig::default())
}

fn without_statistics() -> DecompileConfig {
    DecompileConfig {
        add_statistics: false,
        ..DecompileConfig::default()
    }
}

#[test]
fn test_two_note_chord() {
    let mut track = note(0, 60, 64, 0, 480);
    track.extend(note(0, 64, 64, 0, 480));
    let data = build_smf(480, vec![track]);

    let result = decompile(&data);

    assert!(result.script.contains("CHORD\tcrd_c_1=c,e\n"));
    assert!(result.script.contains("\n0\tcrd_c_1\t4\n"));
    assert!(!result.script.contains("d="));
    assert!(result.warnings.is_empty());
}

#[test]
fn test_same_chord_twice_has_one_name() {
    let mut track = note(0, 60, 64, 0, 480);
    track.extend(note(0, 64, 64, 0, 480));
    track.extend(note(0, 62, 64, 480, 960));
    track.extend(note(0, 65, 64, 480, 960));
    track.extend(note(0, 60, 64, 960, 1440));
    track.extend(note(0, 64, 64, 960, 1440));
    let data = build_smf(480, vec![track]);

    let script = decompile_with(&data, without_statistics()).script;

    assert_eq!(script.matches("CHORD\t").count(), 2);
    assert!(script.contains("CHORD\tcrd_c_1=c,e\nCHORD\tcrd_d_1=d,f\n"));
    assert_eq!(script.matches("0\tcrd_c_1\t4\n").count(), 2);
}

#[test]
fn test_skipped_rest_is_reported() {
    let mut track = note(0, 60, 64, 0, 480);
    track.extend(note(0, 62, 64, 482, 962));
    let data = build_smf(480, vec![track]);

    let result = decompile(&data);

    assert_eq!(result.warnings.len(), 1);
    assert!(result.warnings[0].message.contains("rest too small"));
    assert_eq!(result.warnings[0].tick, 480);
    assert_eq!(result.statistics.total.counters.rests_skipped, 1);
    assert!(result
        .script
        .contains("// rest too small to be handled: 2 ticks\n"));
}

#[test]
fn test_tempo_and_key_open_one_slice() {
    let globals = vec![
        meta(960, MetaMessage::Tempo(u24::new(600_000))),
        meta(960, MetaMessage::KeySignature(2, false)),
    ];
    let mut track = note(0, 60, 64, 0, 960);
    track.extend(note(0, 62, 64, 960, 1920));
    let data = build_smf(480, vec![globals, track]);

    let script = decompile_with(&data, without_statistics()).script;

    assert!(script.contains("0\tc\t2\n\n*\ttempo\t100\n*\tkey\td/maj\n\n0\td\t2\n"));
    assert_eq!(script.lines().filter(|l| l.starts_with('*')).count(), 2);
}

#[test]
fn test_percussion_is_inline() {
    let mut track = note(9, 36, 100, 0, 240);
    track.extend(note(9, 42, 100, 0, 240));
    let data = build_smf(480, vec![track]);

    let script = decompile_with(&data, without_statistics()).script;

    assert!(script.contains("\tp\tSTANDARD\t\tSTANDARD\n"));
    assert!(script.contains("p\tbd1,hhc\t8\tv=100\n"));
    assert!(!script.contains("CHORD"));
}

#[test]
fn test_full_script() {
    let conductor = vec![
        meta(0, MetaMessage::TrackName(b"Song")),
        meta(0, MetaMessage::Copyright(b"(c) Me")),
        meta(0, MetaMessage::Text(b"{#composer=Someone}")),
        meta(0, MetaMessage::Tempo(u24::new(500_000))),
    ];
    let mut piano = vec![meta(0, MetaMessage::TrackName(b"Piano")), program(0, 0, 0)];
    piano.extend(note(0, 60, 64, 0, 480));
    piano.extend(note(0, 64, 64, 480, 960));
    let data = build_smf(480, vec![conductor, piano]);

    let script = decompile_with(&data, without_statistics()).script;

    let expected = "\
META
\tcopyright\t(c) Me
\ttitle\tSong
\tcomposer\tSomeone
END

INSTRUMENTS
\t0\tACOUSTIC_GRAND_PIANO\t\tPiano
END

*\ttempo\t120

0\tc\t4
0\te\t4

";
    assert_eq!(script, expected);
}

#[test]
fn test_statistics_block() {
    let data = build_smf(480, vec![note(0, 60, 64, 0, 480)]);

    let result = decompile(&data);

    assert!(result.script.contains("// STATISTICS:\n"));
    assert!(result.script.ends_with("// QUALITY SCORE: 100.00\n"));
    assert_eq!(result.statistics.quality_score, Some(100.0));

    let json = serde_json::to_value(&result.statistics).unwrap();
    assert_eq!(json["total"]["counters"]["notes"], 1);
}

#[test]
fn test_decompilation_is_idempotent() {
    let mut track = note(0, 60, 64, 0, 470);
    track.extend(note(0, 67, 90, 0, 700));
    track.extend(note(1, 40, 64, 100, 1000));
    track.extend(note(9, 38, 127, 240, 250));
    let data = build_smf(96, vec![track]);

    let first = decompile(&data);
    let second = decompile(&data);

    assert_eq!(first.script, second.script);
    assert_eq!(first.warnings, second.warnings);
}

#[test]
fn test_file_round_trip() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("song.mid");
    let output = dir.path().join("song.midica");
    std::fs::write(&input, build_smf(480, vec![note(3, 57, 64, 0, 480)])).unwrap();

    let result = Decompiler::new()
        .decompile_file(&input, &output)
        .expect("Decompilation failed");

    let written = std::fs::read_to_string(&output).expect("Failed to read output script");
    assert_eq!(written, result.script);
    assert!(written.contains("3\ta-1\t4\n"));
    assert!(!dir.path().join("song.midica.tmp").exists());
}

#[test]
fn test_gzipped_input() {
    use flate2::write::GzEncoder;
    use flate2::Compression;

    let dir = tempdir().unwrap();
    let input = dir.path().join("song.mid.gz");
    let output = dir.path().join("song.midica");
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(&build_smf(480, vec![note(0, 72, 64, 0, 480)]))
        .unwrap();
    std::fs::write(&input, encoder.finish().unwrap()).unwrap();

    let result = Decompiler::new()
        .decompile_file(&input, &output)
        .expect("Decompilation failed");

    assert!(result.script.contains("0\tc+1\t4\n"));
}

#[test]
fn test_timecode_is_rejected() {
    use midly::Fps;

    let mut smf = Smf::new(Header::new(Format::SingleTrack, Timing::Timecode(Fps::Fps25, 40)));
    smf.tracks.push(vec![TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    }]);
    let mut data = Vec::new();
    smf.write_std(&mut data).unwrap();

    assert!(matches!(
        Sequence::parse(&data),
        Err(midi2mpl::Error::UnsupportedTiming)
    ));
}
