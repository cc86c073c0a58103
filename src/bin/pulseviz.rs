use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use pulseviz::config::presets::{PRESET_NAMES, preset};
use pulseviz::{
    AspectRatio, ConfigHandle, ExportController, ExportFormat, ExportOutcome, FfmpegCapabilities,
    FfmpegEncoder, Fps, FrameLoop, RenderConfig, SceneAssets, Visualizer, VisualizerOpts,
    load_audio_file, load_image,
};

/// Seconds of audio analysed before a still frame, so smoothing has settled.
const STILL_WARMUP_SECS: f64 = 0.5;

#[derive(Parser, Debug)]
#[command(name = "pulseviz", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Export the visualization plus the audio as a video (requires `ffmpeg` on PATH).
    Export(ExportArgs),
    /// Render a single frame at a playback time as a PNG.
    Frame(FrameArgs),
    /// Run the real-time frame loop for a while.
    Live(LiveArgs),
    /// List the built-in presets.
    Presets(PresetsArgs),
}

#[derive(clap::Args, Debug)]
struct SceneArgs {
    /// Input audio (WAV natively, anything else through ffmpeg).
    #[arg(long)]
    audio: PathBuf,

    /// Logo image drawn at the center.
    #[arg(long)]
    logo: Option<PathBuf>,

    /// Background image.
    #[arg(long)]
    background: Option<PathBuf>,

    /// Render configuration JSON.
    #[arg(long, conflicts_with = "preset")]
    config: Option<PathBuf>,

    /// Built-in preset name.
    #[arg(long)]
    preset: Option<String>,

    /// Aspect ratio: 16:9 or 9:16.
    #[arg(long, default_value = "16:9")]
    aspect: String,

    /// Pixels on the short edge.
    #[arg(long, default_value_t = pulseviz::session::visualizer::DEFAULT_SHORT_SIDE)]
    short_side: u32,

    /// Fixed random seed.
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(clap::Args, Debug)]
struct ExportArgs {
    #[command(flatten)]
    scene: SceneArgs,

    /// Requested container: webm or mp4.
    #[arg(long, default_value = "webm")]
    format: String,

    /// Output directory for `visualizer-video.<ext>`.
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,
}

#[derive(clap::Args, Debug)]
struct FrameArgs {
    #[command(flatten)]
    scene: SceneArgs,

    /// Playback time in seconds.
    #[arg(long)]
    time: f64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(clap::Args, Debug)]
struct LiveArgs {
    #[command(flatten)]
    scene: SceneArgs,

    /// Wall-clock seconds to run.
    #[arg(long, default_value_t = 5.0)]
    seconds: f64,

    /// Target frames per second.
    #[arg(long, default_value_t = 60)]
    fps: u32,

    /// Write the last frame as a PNG.
    #[arg(long)]
    snapshot: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
struct PresetsArgs {
    /// Print this preset as JSON instead of listing names.
    #[arg(long)]
    dump: Option<String>,
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.cmd {
        Command::Export(args) => cmd_export(args),
        Command::Frame(args) => cmd_frame(args),
        Command::Live(args) => cmd_live(args),
        Command::Presets(args) => cmd_presets(args),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(args: &SceneArgs) -> anyhow::Result<RenderConfig> {
    if let Some(path) = args.config.as_ref() {
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("read config '{}'", path.display()))?;
        return Ok(RenderConfig::from_json(&s)?);
    }
    match args.preset.as_deref() {
        Some(name) => Ok(preset(name)?),
        None => Ok(RenderConfig::default()),
    }
}

fn load_optional_image(path: Option<&Path>) -> anyhow::Result<Option<pulseviz::PreparedImage>> {
    path.map(|p| load_image(p).map_err(anyhow::Error::from))
        .transpose()
}

fn build_visualizer(args: &SceneArgs) -> anyhow::Result<Visualizer> {
    let config = ConfigHandle::new(load_config(args)?)?;
    let assets = SceneAssets {
        logo: load_optional_image(args.logo.as_deref())?,
        background: load_optional_image(args.background.as_deref())?,
    };
    let opts = VisualizerOpts {
        aspect: AspectRatio::parse(&args.aspect)?,
        short_side: args.short_side,
        seed: args.seed,
    };
    let mut vis = Visualizer::new(config, assets, opts)?;
    vis.load_audio(load_audio_file(&args.audio)?)?;
    Ok(vis)
}

fn cmd_export(args: ExportArgs) -> anyhow::Result<()> {
    let mut vis = build_visualizer(&args.scene)?;
    let requested = ExportFormat::parse(&args.format)?;

    let mut last_decile = -1i64;
    let mut controller = ExportController::new(
        FfmpegEncoder::new(),
        FfmpegCapabilities::probe(),
        requested,
        &args.out_dir,
    )
    .with_progress(move |percent| {
        let decile = (percent / 10.0).floor() as i64;
        if decile != last_decile {
            last_decile = decile;
            tracing::info!(percent = percent.round() as u64, "export progress");
        }
    });

    match controller.run(&mut vis)? {
        ExportOutcome::Completed { path, bytes, .. } => {
            eprintln!("wrote {} ({bytes} bytes)", path.display());
            Ok(())
        }
        ExportOutcome::Failed { reason } => anyhow::bail!("export failed: {reason}"),
    }
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let mut vis = build_visualizer(&args.scene)?;
    let time = args.time.max(0.0);
    let dt = Fps::new(30, 1)?.frame_duration_secs();

    vis.seek((time - STILL_WARMUP_SECS).max(0.0));
    vis.play()?;
    loop {
        vis.tick(dt)?;
        let media = vis.media().context("audio source vanished")?;
        if media.is_ended() || media.current_time() + dt > time {
            break;
        }
    }

    let frame = vis.frame().context("no raster surface attached")?;
    frame.save_png(&args.out)?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_live(args: LiveArgs) -> anyhow::Result<()> {
    let run_for = Duration::try_from_secs_f64(args.seconds)
        .with_context(|| format!("invalid --seconds {}", args.seconds))?;
    let mut vis = build_visualizer(&args.scene)?;
    vis.play()?;

    let frame_loop = FrameLoop::spawn(vis, Fps::new(args.fps, 1)?)?;
    std::thread::sleep(run_for);
    let (vis, stats) = frame_loop.stop()?;
    eprintln!(
        "drawn {} skipped {} failed {}",
        stats.drawn, stats.skipped, stats.failed
    );

    if let Some(path) = args.snapshot.as_ref() {
        let frame = vis.frame().context("no raster surface attached")?;
        frame.save_png(path)?;
        eprintln!("wrote {}", path.display());
    }
    Ok(())
}

fn cmd_presets(args: PresetsArgs) -> anyhow::Result<()> {
    match args.dump {
        Some(name) => println!("{}", preset(&name)?.to_json_pretty()?),
        None => {
            for name in PRESET_NAMES {
                println!("{name}");
            }
        }
    }
    Ok(())
}
