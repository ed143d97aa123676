use clap::Parser as ClapParser;
use iab::utils::errors::IabError;

mod cli;
mod wav;

use cli::command::{Cli, Commands};

/// Exit-code taxonomy (§6): 0 ok, 1 usage, 2 bitstream malformed, 3 configuration error.
#[derive(Debug)]
pub enum CliError {
    Usage(String),
    Bitstream(IabError),
    Config(anyhow::Error),
}

impl CliError {
    fn exit_code(&self) -> i32 {
        match self {
            CliError::Usage(_) => 1,
            CliError::Bitstream(_) => 2,
            CliError::Config(_) => 3,
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Usage(message) => write!(f, "{message}"),
            CliError::Bitstream(err) => write!(f, "{err}"),
            CliError::Config(err) => write!(f, "{err:#}"),
        }
    }
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            std::process::exit(1);
        }
    };

    let mut builder = env_logger::Builder::from_default_env();
    builder.filter_level(cli.loglevel.to_level_filter());
    builder.format_timestamp_secs();
    let _ = builder.try_init();

    if let Err(err) = run(&cli) {
        log::error!("{err}");
        std::process::exit(err.exit_code());
    }
}

fn run(cli: &Cli) -> Result<(), CliError> {
    match &cli.command {
        Commands::Parse(args) => cli::parse::cmd_parse(args, cli.strict),
        Commands::Pack(args) => cli::pack::cmd_pack(args),
        Commands::Render(args) => cli::render::cmd_render(args, cli.strict),
    }
}
