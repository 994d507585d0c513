use anyhow::{Context, Result};
use clap::Parser;
use hps_tuner::audio::load_wav;
use hps_tuner::settings::{TunerSettings, default_settings_path};
use hps_tuner::{PitchProcessor, PitchReading};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Prints the nearest tempered note for each block of a WAV recording.
#[derive(Debug, Parser)]
#[command(name = "hps-tuner", version)]
struct Args {
    /// WAV file to analyze.
    file: PathBuf,
    /// Settings file; defaults to $XDG_CONFIG_HOME/hps-tuner/settings.json.
    #[arg(long)]
    settings: Option<PathBuf>,
    /// Emit one JSON object per block instead of text.
    #[arg(long)]
    json: bool,
    /// Qualify note names with their octave number.
    #[arg(long)]
    octaves: bool,
    /// Frequency of A4 in Hz.
    #[arg(long)]
    concert_pitch: Option<f32>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    run(Args::parse())
}

fn run(args: Args) -> Result<()> {
    let mut settings = match &args.settings {
        Some(path) => TunerSettings::load(path)?,
        None => TunerSettings::load_or_default(&default_settings_path()),
    };
    if args.octaves {
        settings.pitch.octave_numbers = true;
    }
    if let Some(concert_pitch) = args.concert_pitch {
        settings.pitch.concert_pitch = concert_pitch;
    }

    let audio = load_wav(&args.file)?;
    let file_rate = audio.sample_rate() as f32;
    if (settings.pitch.sample_rate - file_rate).abs() > f32::EPSILON {
        info!(
            "[tuner] using file sample rate {file_rate} Hz instead of {} Hz",
            settings.pitch.sample_rate
        );
        settings.pitch.sample_rate = file_rate;
    }

    let hop = settings.pitch.hop_size;
    let mut processor =
        PitchProcessor::new(settings.pitch).context("cannot start pitch session")?;
    info!(
        "[tuner] {}: {:.2} s, {} channel(s)",
        args.file.display(),
        audio.duration_secs(),
        audio.source_channels()
    );

    let mut offset = 0usize;
    for block in audio.blocks(hop) {
        let time_secs = offset as f32 / file_rate;
        offset += block.len();
        match processor.process(block) {
            Ok(reading) => print_reading(time_secs, &reading, args.json)?,
            Err(err) => warn!("[tuner] skipping block at {time_secs:.2} s: {err}"),
        }
    }
    Ok(())
}

fn print_reading(time_secs: f32, reading: &PitchReading, json: bool) -> Result<()> {
    if !json {
        println!("{time_secs:>8.2}s  {reading}");
        return Ok(());
    }

    let mut value = serde_json::to_value(reading)?;
    if let Some(object) = value.as_object_mut() {
        object.insert("timeSecs".into(), serde_json::json!(time_secs));
    }
    println!("{}", serde_json::to_string(&value)?);
    Ok(())
}
