//! beatloop CLI: loop playback and WAV export.
//!
//! Usage:
//!   bl-cli                                  play the demo loop
//!   bl-cli --config session.toml --tempo 96
//!   bl-cli --wav out.wav --seconds 20

use std::io::Write;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use bl_master::{Controller, SessionConfig, SynthKind, BLOCK_SIZE};
use clap::Parser;

/// Seconds rendered to WAV when `--seconds` is not given.
const DEFAULT_RENDER_SECONDS: f64 = 10.0;

#[derive(Parser, Debug)]
#[command(name = "bl-cli", version, about = "Sample-accurate loop player")]
struct Args {
    /// Session file (TOML); the demo loop is used when omitted
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the session tempo (BPM)
    #[arg(short, long)]
    tempo: Option<f64>,

    /// Override the loop length in beats
    #[arg(long)]
    loop_beats: Option<f64>,

    /// Render offline to this WAV file instead of playing
    #[arg(long, value_name = "OUT")]
    wav: Option<PathBuf>,

    /// Stop after this many seconds
    #[arg(short, long)]
    seconds: Option<f64>,

    /// Sample rate for offline rendering
    #[arg(long, default_value_t = 44_100)]
    sample_rate: u32,

    /// Frames pulled per block when rendering offline
    #[arg(long, default_value_t = BLOCK_SIZE)]
    block_size: usize,

    /// Schedule notes without producing sound
    #[arg(long)]
    silent: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let args = Args::parse();
    let session = session_from_args(&args)?;

    let mut ctrl = Controller::new(session).context("invalid session")?;
    let table = ctrl.table();
    println!("Notes:  {}", table.len());
    println!("Loop:   {} beats", table.loop_beats());
    println!("Tempo:  {} BPM", ctrl.session().tempo_bpm);
    println!();

    match &args.wav {
        Some(path) => {
            let seconds = args.seconds.unwrap_or(DEFAULT_RENDER_SECONDS);
            println!("Rendering {seconds} s to {} at {} Hz...", path.display(), args.sample_rate);
            let frames = ctrl
                .render_to_wav(path, args.sample_rate, seconds, args.block_size)
                .with_context(|| format!("failed to render {}", path.display()))?;
            println!("Wrote {frames} frames.");
        }
        None => play(&mut ctrl, args.seconds)?,
    }
    Ok(())
}

fn session_from_args(args: &Args) -> Result<SessionConfig> {
    let mut session = match &args.config {
        Some(path) => SessionConfig::load(path)?,
        None => SessionConfig::default(),
    };
    if let Some(tempo) = args.tempo {
        session.tempo_bpm = tempo;
    }
    if let Some(loop_beats) = args.loop_beats {
        session.loop_beats = loop_beats;
    }
    if args.silent {
        session.synth = SynthKind::Silence;
    }
    log::debug!("session: {:?}", session);
    Ok(session)
}

fn play(ctrl: &mut Controller, seconds: Option<f64>) -> Result<()> {
    let info = ctrl.play().context("failed to start playback")?;
    println!(
        "Playing on {} Hz / {} channels (Ctrl+C to quit)",
        info.sample_rate, info.channels
    );

    let limit = seconds.and_then(|s| Duration::try_from_secs_f64(s).ok());
    let started = Instant::now();
    while ctrl.is_playing() {
        if limit.is_some_and(|l| started.elapsed() >= l) {
            break;
        }
        if let Some(pos) = ctrl.position() {
            print!("\rCycle: {:4} | Beat: {:5.2}", pos.cycle, pos.beat);
            let _ = std::io::stdout().flush();
        }
        std::thread::sleep(Duration::from_millis(10));
    }

    ctrl.stop();
    println!("\rDone.                       ");
    Ok(())
}
