//! Note, percussion and instrument naming tables

/// Pitch class names, starting with C
const BASE_NOTES: [&str; 12] = [
    "c", "c#", "d", "d#", "e", "f", "f#", "g", "g#", "a", "a#", "b",
];

/// Note number of the unsuffixed octave (middle C)
const MIDDLE_C: u8 = 60;

/// General MIDI level 1 program names
const GM_INSTRUMENTS: [&str; 128] = [
    // Piano
    "Acoustic Grand Piano", "Bright Acoustic Piano", "Electric Grand Piano", "Honky-tonk Piano",
    "Electric Piano 1", "Electric Piano 2", "Harpsichord", "Clavinet",
    // Chromatic percussion
    "Celesta", "Glockenspiel", "Music Box", "Vibraphone",
    "Marimba", "Xylophone", "Tubular Bells", "Dulcimer",
    // Organ
    "Drawbar Organ", "Percussive Organ", "Rock Organ", "Church Organ",
    "Reed Organ", "Accordion", "Harmonica", "Tango Accordion",
    // Guitar
    "Acoustic Guitar Nylon", "Acoustic Guitar Steel", "Electric Guitar Jazz", "Electric Guitar Clean",
    "Electric Guitar Muted", "Overdriven Guitar", "Distortion Guitar", "Guitar Harmonics",
    // Bass
    "Acoustic Bass", "Electric Bass Finger", "Electric Bass Pick", "Fretless Bass",
    "Slap Bass 1", "Slap Bass 2", "Synth Bass 1", "Synth Bass 2",
    // Strings
    "Violin", "Viola", "Cello", "Contrabass",
    "Tremolo Strings", "Pizzicato Strings", "Orchestral Harp", "Timpani",
    // Ensemble
    "String Ensemble 1", "String Ensemble 2", "Synth Strings 1", "Synth Strings 2",
    "Choir Aahs", "Voice Oohs", "Synth Voice", "Orchestra Hit",
    // Brass
    "Trumpet", "Trombone", "Tuba", "Muted Trumpet",
    "French Horn", "Brass Section", "Synth Brass 1", "Synth Brass 2",
    // Reed
    "Soprano Sax", "Alto Sax", "Tenor Sax", "Baritone Sax",
    "Oboe", "English Horn", "Bassoon", "Clarinet",
    // Pipe
    "Piccolo", "Flute", "Recorder", "Pan Flute",
    "Blown Bottle", "Shakuhachi", "Whistle", "Ocarina",
    // Synth lead
    "Lead Square", "Lead Sawtooth", "Lead Calliope", "Lead Chiff",
    "Lead Charang", "Lead Voice", "Lead Fifths", "Lead Bass",
    // Synth pad
    "Pad New Age", "Pad Warm", "Pad Polysynth", "Pad Choir",
    "Pad Bowed", "Pad Metallic", "Pad Halo", "Pad Sweep",
    // Synth effects
    "FX Rain", "FX Soundtrack", "FX Crystal", "FX Atmosphere",
    "FX Brightness", "FX Goblins", "FX Echoes", "FX Sci-fi",
    // Ethnic
    "Sitar", "Banjo", "Shamisen", "Koto",
    "Kalimba", "Bagpipe", "Fiddle", "Shanai",
    // Percussive
    "Tinkle Bell", "Agogo", "Steel Drums", "Woodblock",
    "Taiko Drum", "Melodic Tom", "Synth Drum", "Reverse Cymbal",
    // Sound effects
    "Guitar Fret Noise", "Breath Noise", "Seashore", "Bird Tweet",
    "Telephone Ring", "Helicopter", "Applause", "Gunshot",
];

/// Name of a note number, e.g. 60 -> `c`, 73 -> `c#+1`, 47 -> `b-1`
pub fn note_name(note: u8) -> String {
    let base = base_note_name(note);
    let octave = (note / 12) as i32 - (MIDDLE_C / 12) as i32;
    match octave {
        0 => base.to_string(),
        o if o > 0 => format!("{}+{}", base, o),
        o => format!("{}{}", base, o),
    }
}

/// Pitch class name of a note, without octave
pub fn base_note_name(note: u8) -> &'static str {
    BASE_NOTES[(note % 12) as usize]
}

/// Short identifier of a GM percussion instrument
pub fn percussion_short_id(note: u8) -> Option<&'static str> {
    let id = match note {
        27 => "hq",
        28 => "slap",
        29 => "sps",
        30 => "spl",
        31 => "sst",
        32 => "mclk",
        33 => "mbel",
        34 => "bbel",
        35 => "bd2",
        36 => "bd1",
        37 => "stk",
        38 => "sn1",
        39 => "clp",
        40 => "sn2",
        41 => "tl2",
        42 => "hhc",
        43 => "tl1",
        44 => "hhp",
        45 => "tm2",
        46 => "hho",
        47 => "tm1",
        48 => "th2",
        49 => "cr1",
        50 => "th1",
        51 => "rd1",
        52 => "ch",
        53 => "rb",
        54 => "tam",
        55 => "sp",
        56 => "cb",
        57 => "cr2",
        58 => "vs",
        59 => "rd2",
        60 => "bgh",
        61 => "bgl",
        62 => "cgh",
        63 => "cgo",
        64 => "cgl",
        65 => "tih",
        66 => "til",
        67 => "agh",
        68 => "agl",
        69 => "cab",
        70 => "mar",
        71 => "wsh",
        72 => "wlg",
        73 => "gsh",
        74 => "glg",
        75 => "cla",
        76 => "wbh",
        77 => "wbl",
        78 => "cum",
        79 => "cuo",
        80 => "trm",
        81 => "tro",
        82 => "shk",
        83 => "jbl",
        84 => "bt",
        85 => "cst",
        86 => "sum",
        87 => "suo",
        _ => return None,
    };
    Some(id)
}

/// Percussion name, or the raw note number if the instrument is unmapped
pub fn percussion_name(note: u8) -> String {
    percussion_short_id(note)
        .map(str::to_string)
        .unwrap_or_else(|| note.to_string())
}

/// Name of a note on the given channel
pub fn channel_note_name(channel: u8, note: u8) -> String {
    if channel == crate::PERCUSSION_CHANNEL {
        percussion_name(note)
    } else {
        note_name(note)
    }
}

/// Display name of a GM program
pub fn instrument_name(program: u8) -> &'static str {
    GM_INSTRUMENTS[(program & 0x7F) as usize]
}

/// Identifier of a GM program, e.g. `ACOUSTIC_GRAND_PIANO`
pub fn instrument_id(program: u8) -> String {
    let mut id = String::new();
    for c in instrument_name(program).chars() {
        if c.is_ascii_alphanumeric() {
            id.push(c.to_ascii_uppercase());
        } else if !id.ends_with('_') {
            id.push('_');
        }
    }
    id
}

/// Identifier of a GS/GM2 drum kit program
pub fn drumkit_id(program: u8) -> Option<&'static str> {
    let id = match program {
        0 => "STANDARD",
        8 => "ROOM",
        16 => "POWER",
        24 => "ELECTRONIC",
        25 => "TR808",
        32 => "JAZZ",
        40 => "BRUSH",
        48 => "ORCHESTRA",
        56 => "SOUND_FX",
        127 => "CM64_CM32L",
        _ => return None,
    };
    Some(id)
}

/// Key signature as `<tonic>/<maj|min>` from the sharps (positive) or flats (negative) count
pub fn key_signature(sharps_flats: i8, minor: bool) -> String {
    const MAJOR: [&str; 15] = [
        "cb", "gb", "db", "ab", "eb", "bb", "f", "c", "g", "d", "a", "e", "b", "f#", "c#",
    ];
    const MINOR: [&str; 15] = [
        "ab", "eb", "bb", "f", "c", "g", "d", "a", "e", "b", "f#", "c#", "g#", "d#", "a#",
    ];
    let idx = (sharps_flats.clamp(-7, 7) + 7) as usize;
    if minor {
        format!("{}{}min", MINOR[idx], crate::syntax::sep::KEY)
    } else {
        format!("{}{}maj", MAJOR[idx], crate::syntax::sep::KEY)
    }
}
