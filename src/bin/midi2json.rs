//! MIDI to JSON converter

use clap::Parser;
use midi2mpl::midi::{MidiJson, Sequence};
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "midi2json")]
#[command(version = "0.1.0")]
#[command(about = "Dump MIDI files and their extracted timelines as JSON", long_about = None)]
struct Args {
    /// Input MIDI file, optionally gzipped
    input: PathBuf,

    /// Output JSON file (writes to stdout if not specified)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output compact JSON (default is pretty-printed)
    #[arg(short, long)]
    compact: bool,

    /// Include the per-channel histories used by the decompiler
    #[arg(short, long)]
    timeline: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let sequence = Sequence::from_file(&args.input)?;
    let midi_json = MidiJson::new(&sequence, args.timeline);

    let json_string = if args.compact {
        serde_json::to_string(&midi_json)?
    } else {
        serde_json::to_string_pretty(&midi_json)?
    };

    match args.output {
        Some(path) => {
            let mut file = File::create(path)?;
            file.write_all(json_string.as_bytes())?;
            file.write_all(b"\n")?;
        }
        None => {
            println!("{}", json_string);
        }
    }

    Ok(())
}
