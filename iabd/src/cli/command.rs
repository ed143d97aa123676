use std::path::PathBuf;

use clap::{Args, Parser as ClapParser, Subcommand, ValueEnum};

#[derive(Debug, ClapParser)]
#[command(
    name       = env!("CARGO_PKG_NAME"),
    version    = env!("CARGO_PKG_VERSION"),
    author     = env!("CARGO_PKG_AUTHORS"),
    about      = "Tools for inspecting, packing and rendering Immersive Audio Bitstreams",
    long_about = None,
)]
pub struct Cli {
    /// Set the log level.
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Info)]
    pub loglevel: LogLevel,

    /// Treat warnings as fatal errors (fail on first warning).
    #[arg(long, global = true)]
    pub strict: bool,

    /// Choose an operation to perform.
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Parse one or more frames from a bitstream and print a structural summary.
    Parse(ParseArgs),

    /// Wrap a mono PCM WAV file into a sequence of IAB frames.
    Pack(PackArgs),

    /// Render an IAB bitstream against a loudspeaker configuration to a WAV file.
    Render(RenderArgs),
}

#[derive(Debug, Args)]
pub struct ParseArgs {
    /// Input IAB bitstream (one or more concatenated frames).
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,
}

#[derive(Debug, Args)]
pub struct PackArgs {
    /// Input mono PCM WAV file.
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Output IAB bitstream.
    #[arg(value_name = "OUTPUT")]
    pub output: PathBuf,

    /// Frame rate of the packed stream.
    #[arg(long, value_enum, default_value_t = PackFrameRate::Fps24)]
    pub frame_rate: PackFrameRate,

    /// Wrap the essence in an `ObjectDefinition` instead of a single-channel `BedDefinition`.
    #[arg(long)]
    pub as_object: bool,

    /// Channel label to use when packing as a bed (ignored with `--as-object`).
    #[arg(long, default_value = "L")]
    pub channel: String,
}

#[derive(Debug, Args)]
pub struct RenderArgs {
    /// Input IAB bitstream (one or more concatenated frames).
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Renderer configuration (YAML, §6 `physical_speakers`/`virtual_speakers`/...).
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Output PCM WAV file.
    #[arg(value_name = "OUTPUT")]
    pub output: PathBuf,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum PackFrameRate {
    Fps24,
    Fps25,
    Fps30,
    Fps48,
    Fps50,
    Fps60,
}

impl PackFrameRate {
    pub fn to_frame_rate(self) -> iab::structs::frame::FrameRate {
        use iab::structs::frame::FrameRate;
        match self {
            PackFrameRate::Fps24 => FrameRate::Fps24,
            PackFrameRate::Fps25 => FrameRate::Fps25,
            PackFrameRate::Fps30 => FrameRate::Fps30,
            PackFrameRate::Fps48 => FrameRate::Fps48,
            PackFrameRate::Fps50 => FrameRate::Fps50,
            PackFrameRate::Fps60 => FrameRate::Fps60,
        }
    }
}
