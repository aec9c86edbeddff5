use clap::{Args, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rforge_frame::ParserMode;

use crate::exit::{CliError, CliResult, INTERNAL};
use crate::output::OutputFormat;

pub mod decode;
pub mod encode;
pub mod export;
pub mod play;
pub mod replay;
pub mod stats;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Decode a capture of raw link bytes and print the frames.
    Decode(DecodeArgs),
    /// Encode one command frame.
    Encode(EncodeArgs),
    /// Print the data frames stored in a record file.
    Replay(ReplayArgs),
    /// Export a record file to CSV.
    Export(ExportArgs),
    /// Channel statistics over the tail of a record file.
    Stats(StatsArgs),
    /// Play a record file back in real time.
    Play(PlayArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Decode(args) => decode::run(args, format),
        Command::Encode(args) => encode::run(args, format),
        Command::Replay(args) => replay::run(args, format),
        Command::Export(args) => export::run(args, format),
        Command::Stats(args) => stats::run(args, format),
        Command::Play(args) => play::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// `--mode` values for commands that parse link bytes.
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum ModeArg {
    #[default]
    Auto,
    Binary,
    Text,
}

impl From<ModeArg> for ParserMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Auto => ParserMode::Auto,
            ModeArg::Binary => ParserMode::Binary,
            ModeArg::Text => ParserMode::Text,
        }
    }
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// File holding raw bytes captured from the link.
    pub capture: PathBuf,
    /// Wire format to expect.
    #[arg(long, value_enum, default_value = "auto", env = "RFORGE_MODE")]
    pub mode: ModeArg,
    /// Largest accepted binary payload.
    #[arg(long, default_value_t = rforge_frame::DEFAULT_MAX_PAYLOAD, env = "RFORGE_MAX_PAYLOAD")]
    pub max_payload: usize,
    /// Print only the first N frames.
    #[arg(long)]
    pub count: Option<usize>,
    /// Print link-quality counters instead of frames.
    #[arg(long)]
    pub summary: bool,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Command name (e.g. PING, stream-start) or numeric code.
    #[arg(long, short = 'c')]
    pub command: String,
    /// Payload given as a string.
    #[arg(long, conflicts_with = "hex")]
    pub data: Option<String>,
    /// Payload given as hex digits.
    #[arg(long, conflicts_with = "data")]
    pub hex: Option<String>,
    /// Encode as a text line instead of a binary frame.
    #[arg(long)]
    pub text: bool,
    /// Write the encoded bytes to a file instead of stdout.
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Record file to read.
    pub record: PathBuf,
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Record file to read.
    pub record: PathBuf,
    /// CSV file to write.
    pub csv: PathBuf,
}

#[derive(Args, Debug)]
pub struct StatsArgs {
    /// Record file to read.
    pub record: PathBuf,
    /// Channel id.
    #[arg(long, short = 'c', default_value = "0")]
    pub channel: u16,
    /// Number of most recent frames to include.
    #[arg(
        long,
        short = 'w',
        default_value_t = rforge_stream::DEFAULT_CAPACITY,
        env = "RFORGE_WINDOW"
    )]
    pub window: usize,
}

#[derive(Args, Debug)]
pub struct PlayArgs {
    /// Record file to play.
    pub record: PathBuf,
    /// Playback speed factor (0.01 to 1000).
    #[arg(long, short = 's', default_value = "1.0", env = "RFORGE_SPEED")]
    pub speed: f64,
    /// Timer tick in milliseconds.
    #[arg(long, default_value = "10", env = "RFORGE_TICK_MS")]
    pub tick_ms: u64,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build information.
    #[arg(long)]
    pub extended: bool,
}

/// Build the runtime for commands that touch record files.
pub(crate) fn runtime() -> CliResult<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| CliError::new(INTERNAL, format!("runtime setup failed: {err}")))
}

/// Flag cleared by Ctrl-C.
pub(crate) fn install_ctrlc_handler() -> CliResult<Arc<AtomicBool>> {
    let running = Arc::new(AtomicBool::new(true));
    let flag = running.clone();
    ctrlc::set_handler(move || {
        flag.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))?;
    Ok(running)
}
