use std::{io::IsTerminal as _, path::PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "stillcut", version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Encode images into an H.264 video (requires `ffmpeg` on PATH).
    Encode(EncodeArgs),
    /// Print the resolved video settings for a frame size.
    Settings(SettingsArgs),
}

#[derive(Parser, Debug)]
struct EncodeArgs {
    /// JSON job manifest; replaces the size, output and image arguments.
    #[arg(long, conflicts_with_all = ["width", "height", "out", "frames"])]
    manifest: Option<PathBuf>,

    /// Frame width in pixels (a multiple of 16 is recommended).
    #[arg(long, required_unless_present = "manifest")]
    width: Option<u32>,

    /// Frame height in pixels.
    #[arg(long, required_unless_present = "manifest")]
    height: Option<u32>,

    /// Output video path (.mov, .mp4 or .m4v).
    #[arg(long, required_unless_present = "manifest")]
    out: Option<PathBuf>,

    /// Duration of one frame as `value/timescale` seconds.
    #[arg(long, default_value = "1/5")]
    frame_duration: stillcut::MediaTime,

    /// Image placement inside the frame.
    #[arg(long, value_enum, default_value_t = FitChoice::Native)]
    fit: FitChoice,

    /// ffmpeg H.264 encoder.
    #[arg(long)]
    encoder: Option<String>,

    /// ffmpeg executable.
    #[arg(long, default_value = "ffmpeg")]
    ffmpeg: PathBuf,

    /// Input images in presentation order.
    frames: Vec<PathBuf>,
}

#[derive(Parser, Debug)]
struct SettingsArgs {
    /// Frame width in pixels.
    #[arg(long)]
    width: u32,

    /// Frame height in pixels.
    #[arg(long)]
    height: u32,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FitChoice {
    Native,
    Stretch,
    Contain,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.cmd {
        Command::Encode(args) => cmd_encode(args),
        Command::Settings(args) => cmd_settings(args),
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .init();
}

fn cmd_encode(args: EncodeArgs) -> anyhow::Result<()> {
    let (settings, config, frames, encoder) = match &args.manifest {
        Some(path) => {
            let manifest = stillcut::JobManifest::load(path)?;
            (
                manifest.settings()?,
                manifest.session_config(),
                manifest.frame_sources(),
                manifest.encoder.clone(),
            )
        }
        None => {
            let width = args.width.context("--width is required")?;
            let height = args.height.context("--height is required")?;
            let out = args.out.clone().context("--out is required")?;
            let fit = match args.fit {
                FitChoice::Native => stillcut::FrameFit::Native,
                FitChoice::Stretch => stillcut::FrameFit::Stretch,
                FitChoice::Contain => stillcut::FrameFit::Contain,
            };
            (
                stillcut::EncodingSettings::new(width, height)?,
                stillcut::SessionConfig::new(out)
                    .with_frame_duration(args.frame_duration)
                    .with_fit(fit),
                args.frames
                    .iter()
                    .cloned()
                    .map(stillcut::FrameSource::File)
                    .collect(),
                None,
            )
        }
    };

    let mut opts = stillcut::FfmpegWriterOpts {
        program: args.ffmpeg.clone(),
        ..stillcut::FfmpegWriterOpts::default()
    };
    if let Some(encoder) = args.encoder.clone().or(encoder) {
        opts.encoder = encoder;
    }

    let writer = stillcut::FfmpegWriter::new(opts);
    let encoder = stillcut::ImageSequenceEncoder::with_writer(settings, config, writer)?;
    let report = encoder.convert_blocking(frames)?;

    if report.frames_written == 0 {
        eprintln!("no frames could be read; nothing written");
    } else {
        eprintln!("wrote {} ({} s)", report.destination.display(), report.duration);
    }
    if !report.skipped.is_empty() {
        let skipped: Vec<String> = report.skipped.iter().map(|i| i.0.to_string()).collect();
        eprintln!(
            "skipped {} of {} frames: {}",
            report.skipped.len(),
            report.frames_total,
            skipped.join(", ")
        );
    }
    Ok(())
}

fn cmd_settings(args: SettingsArgs) -> anyhow::Result<()> {
    let settings = stillcut::EncodingSettings::new(args.width, args.height)?;
    println!("{settings}");
    println!(
        "macroblock_aligned: {}",
        if settings.is_macroblock_aligned() {
            "yes"
        } else {
            "no"
        }
    );
    Ok(())
}
