use std::{sync::Arc, thread, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use sequence_clicker::cli::{ClickArgs, Cli, Command, PlayArgs, RecordArgs, RunArgs};
use sequence_clicker::color::{ColorCache, ColorMatcher, PixelScanMatcher};
use sequence_clicker::desktop::EnigoPlatform;
use sequence_clicker::events::TracingSink;
use sequence_clicker::overlay::LogOverlay;
use sequence_clicker::recording::{MouseRecording, Player, Recorder, POLL_INTERVAL};
use sequence_clicker::{Collaborators, EngineConfig, LoopMode, MemorySettings, Platform, Runner, Sequence, SequenceEngine};

const COLOR_PREFETCH_INTERVAL: Duration = Duration::from_millis(250);

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Run(args) => run(args),
        Command::Record(args) => record(args),
        Command::Play(args) => play(args),
        Command::Click(args) => click(args),
    }
}

fn run(args: RunArgs) -> Result<()> {
    let mut sequence = Sequence::load(&args.sequence)
        .with_context(|| format!("loading sequence {}", args.sequence.display()))?;
    if let Some(loops) = args.loops {
        sequence.loop_mode = LoopMode::Count;
        sequence.loop_count = loops;
    }
    if args.forever {
        sequence.loop_mode = LoopMode::Forever;
    }

    let settings = match &args.settings {
        Some(path) => MemorySettings::load(path).with_context(|| format!("loading settings {}", path.display()))?,
        None => MemorySettings::new(),
    };
    let mut config = EngineConfig::from_settings(&settings);
    config.validation_enabled |= args.validate;

    run_sequence(sequence, config, args.max_seconds)
}

fn click(args: ClickArgs) -> Result<()> {
    let sequence = args.to_sequence().context("invalid click settings")?;
    match args.area {
        Some(area) => info!("clicking in {area:?} every {}ms", args.interval_ms),
        None => info!("clicking at the cursor every {}ms", args.interval_ms),
    }
    run_sequence(sequence, EngineConfig::default(), args.max_seconds)
}

fn run_sequence(sequence: Sequence, config: EngineConfig, max_seconds: Option<u64>) -> Result<()> {
    let platform: Arc<dyn Platform> = Arc::new(EnigoPlatform);
    let colors: Arc<dyn ColorMatcher> = Arc::new(PixelScanMatcher::new(Arc::clone(&platform)));
    let cache = Arc::new(ColorCache::spawn(Arc::clone(&colors), COLOR_PREFETCH_INTERVAL));
    let engine = SequenceEngine::new(
        Collaborators {
            platform,
            colors,
            overlay: Arc::new(LogOverlay),
            events: Arc::new(TracingSink),
            color_cache: Some(Arc::clone(&cache)),
        },
        config,
    );

    let runner = Runner::spawn(engine);
    runner.start(Arc::new(sequence)).context("sequence cannot start")?;

    let limit = max_seconds.map(Duration::from_secs).unwrap_or(Duration::MAX);
    if !runner.wait_idle(limit) {
        info!("time limit reached");
        runner.stop();
    }
    cache.stop();
    Ok(())
}

fn record(args: RecordArgs) -> Result<()> {
    let platform: Arc<dyn Platform> = Arc::new(EnigoPlatform);
    let name = args.output.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    let recorder = Recorder::spawn(platform, name, POLL_INTERVAL);

    #[cfg(feature = "hooks")]
    sequence_clicker::hooks::spawn_listener(recorder.clone());
    #[cfg(not(feature = "hooks"))]
    warn!("built without the hooks feature, only movement is recorded");

    info!("recording for {}s", args.seconds);
    thread::sleep(Duration::from_secs(args.seconds));

    let Some(recording) = recorder.stop() else {
        warn!("nothing was recorded");
        return Ok(());
    };
    recording.save(&args.output).with_context(|| format!("saving {}", args.output.display()))?;
    info!("saved {} actions to {}", recording.actions.len(), args.output.display());
    Ok(())
}

fn play(args: PlayArgs) -> Result<()> {
    let recording = MouseRecording::load(&args.recording)
        .with_context(|| format!("loading recording {}", args.recording.display()))?;
    info!("playing {} ({} actions) at {}x", recording.name, recording.actions.len(), args.speed);
    let done = Player::spawn(Arc::new(EnigoPlatform), recording, args.speed).join();
    info!("played {done} actions");
    Ok(())
}
