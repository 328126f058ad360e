use clap::Parser;
use midi2mpl::config::{Charset, LengthStrategy};
use midi2mpl::decompiler::write_script;
use midi2mpl::{DecompileConfig, Decompiler, Sequence};
use std::io::Write;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "midi2mpl")]
#[command(version = "0.1.0")]
#[command(about = "MIDI to MidicaPL decompiler", long_about = None)]
struct Args {
    /// Input MIDI file, optionally gzipped (reads from stdin if not specified)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output script file (writes to stdout if not specified)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Annotate lines with source and target ticks
    #[arg(long)]
    tick_comments: bool,

    /// Omit the statistics block
    #[arg(long)]
    no_statistics: bool,

    /// Resolution used in tick comments
    #[arg(long)]
    target_resolution: Option<u16>,

    /// Note length strategy tried first
    #[arg(long, value_enum)]
    strategy: Option<LengthStrategy>,

    /// Force a synchronization point at this tick (repeatable)
    #[arg(long = "sync-at", value_name = "TICK")]
    sync_at: Vec<u64>,

    /// Output character set
    #[arg(long, value_enum)]
    charset: Option<Charset>,

    /// Write the statistics as JSON to this file
    #[arg(long)]
    stats_json: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn build_config(&self) -> Result<DecompileConfig, midi2mpl::Error> {
        let mut config = match &self.config {
            Some(path) => DecompileConfig::from_file(path)?,
            None => DecompileConfig::default(),
        };
        if self.tick_comments {
            config.add_tick_comments = true;
        }
        if self.no_statistics {
            config.add_statistics = false;
        }
        if let Some(resolution) = self.target_resolution {
            config.target_resolution = resolution;
        }
        if let Some(strategy) = self.strategy {
            config.length_strategy = strategy;
        }
        if let Some(charset) = self.charset {
            config.charset = charset;
        }
        config.extra_sync_ticks.extend(&self.sync_at);
        Ok(config)
    }
}

fn main() -> Result<(), midi2mpl::Error> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let decompiler = Decompiler::with_config(args.build_config()?)?;

    let result = match (&args.input, &args.output) {
        (Some(input), Some(output)) => decompiler.decompile_file(input, output)?,
        (input, output) => {
            let sequence = match input {
                Some(path) => Sequence::from_file(path)?,
                None => Sequence::from_reader(std::io::stdin().lock())?,
            };
            let result = decompiler.decompile(&sequence)?;
            match output {
                Some(path) => write_script(path, &result.script, decompiler.config().charset)?,
                None => {
                    let bytes = decompiler.config().charset.encode(&result.script)?;
                    std::io::stdout().lock().write_all(&bytes)?;
                }
            }
            result
        }
    };

    if let Some(path) = &args.stats_json {
        let json = serde_json::to_string_pretty(&result.statistics)?;
        std::fs::write(path, json + "\n")?;
    }

    Ok(())
}
