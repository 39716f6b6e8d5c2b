// midibox - command-line MIDI jukebox
// Scan the library, start the synthesizer, then take commands on stdin until quit

use anyhow::{Context, Result};
use clap::Parser;
use midibox::{
    config::Config,
    library::LibraryScanner,
    notify,
    playback::{self, Orchestrator},
    synth::FluidSynth,
};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "midibox")]
#[command(about = "Plays a directory of MIDI tracks and albums; commands: n, a, p, p <name>, q")]
struct Args {
    /// Library root (default: ~/music/midi)
    #[arg(long)]
    root: Option<PathBuf>,

    /// Synthesizer audio driver, e.g. alsa or pulseaudio
    #[arg(long)]
    driver: Option<String>,

    /// Soundfont (.sf2) used for every track
    #[arg(long)]
    soundfont: Option<PathBuf>,

    /// Config file (default: <config dir>/midibox/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Wait for `p <name>` instead of picking tracks at random
    #[arg(long)]
    no_autoplay: bool,

    /// Load the first track paused
    #[arg(long)]
    paused: bool,

    /// Enable developer logging (stderr + debug output)
    #[arg(long)]
    dev: bool,
}

impl Args {
    fn apply(&self, config: &mut Config) {
        if let Some(root) = &self.root {
            config.library_root = Some(root.clone());
        }
        if let Some(driver) = &self.driver {
            config.synth.audio_driver = driver.clone();
        }
        if let Some(soundfont) = &self.soundfont {
            config.synth.soundfont = soundfont.clone();
        }
        if self.no_autoplay {
            config.playback.autoplay = false;
        }
        if self.paused {
            config.playback.start_paused = true;
        }
    }
}

fn init_logging(log_dir: &Path, dev: bool) -> Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("creating log directory {}", log_dir.display()))?;

    // Daily rotating file appender; stdout belongs to notifications
    let file_appender = tracing_appender::rolling::daily(log_dir, "midibox.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,midibox=debug"));

    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_target(true)
        .with_level(true)
        .with_ansi(false);

    // Dev mode mirrors everything to stderr as well
    let stderr_layer = dev.then(|| fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init()?;

    Ok(guard)
}

async fn run(config: Config) -> Result<()> {
    let root = config.library_root()?;
    let library = LibraryScanner::new()
        .scan(&root)
        .with_context(|| format!("scanning library at {}", root.display()))?;

    if library.is_empty() {
        info!("Nothing to play in {}", root.display());
        eprintln!("No tracks found in {}", root.display());
        return Ok(());
    }

    let synth = FluidSynth::new(&config.synth).context("initializing synthesizer")?;
    let notifier = notify::notifier_for(config.notifications.desktop);

    let mut orchestrator = Orchestrator::new(library, synth, notifier)
        .with_autoplay(config.playback.autoplay)
        .with_start_paused(config.playback.start_paused)
        .with_stop_timeout(Duration::from_millis(config.synth.stop_timeout_ms));

    orchestrator.run(playback::stdin_lines()).await;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load config - falls back to defaults if missing
    let mut config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    args.apply(&mut config);

    let _guard = init_logging(&config.log_dir()?, args.dev)?;
    info!("midibox starting up");

    if let Err(e) = run(config).await {
        error!("Fatal: {:#}", e);
        return Err(e);
    }

    info!("midibox shutting down");
    Ok(())
}
