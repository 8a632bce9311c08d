//! Command line surface; subcommands live here.

use clap::{Args, CommandFactory, Parser, Subcommand};

use crate::logging::LogFormat;
use crate::page::{Lsn, PageConfig, DEFAULT_PAGE_SIZE};
use crate::{Error, Result};

pub mod apply;
pub mod increment;
pub mod locations;

#[derive(Debug, Clone)]
pub enum Command {
    Increment(increment::IncrementArgs),
    Apply(apply::ApplyArgs),
    Locations(locations::LocationsArgs),
    None,
}

#[derive(Debug, Clone)]
pub struct CliArgs {
    pub command: Command,
    pub log_format: LogFormat,
}

impl Default for CliArgs {
    fn default() -> Self {
        Self {
            command: Command::None,
            log_format: LogFormat::Human,
        }
    }
}

pub fn dispatch(args: CliArgs) -> Result<()> {
    match args.command {
        Command::Increment(a) => increment::execute(a),
        Command::Apply(a) => apply::execute(a),
        Command::Locations(a) => locations::execute(a),
        Command::None => Ok(()),
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "pginc",
    version,
    about = "Incremental page backup for PostgreSQL data files"
)]
struct Cli {
    /// Log output format.
    #[arg(long = "log-format", value_enum, default_value = "human", global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Option<Subcommands>,
}

#[derive(Subcommand, Debug)]
enum Subcommands {
    /// Write an increment with the pages of a data file changed since an LSN.
    Increment(increment::IncrementArgs),
    /// Patch a data file in place from an increment.
    Apply(apply::ApplyArgs),
    /// List relation block locations changed since an LSN.
    Locations(locations::LocationsArgs),
}

/// Page geometry flags shared by subcommands.
#[derive(Debug, Clone, Args)]
pub struct PageArgs {
    /// Page size of relation files (BLCKSZ).
    #[arg(long = "page-size", default_value_t = DEFAULT_PAGE_SIZE)]
    pub page_size: u32,

    /// Page size of OrioleDB data files; defaults to --page-size.
    #[arg(long = "variable-page-size")]
    pub variable_page_size: Option<u32>,
}

impl PageArgs {
    pub fn config(&self) -> Result<PageConfig> {
        let config = PageConfig::new(self.page_size)?;
        match self.variable_page_size {
            Some(size) => config.with_variable_page_size(size),
            None => Ok(config),
        }
    }
}

pub(crate) fn required<T>(value: Option<T>, name: &str) -> Result<T> {
    value.ok_or_else(|| Error::Cli(format!("{name} is required")).into())
}

pub(crate) fn parse_lsn(raw: Option<String>) -> Result<Lsn> {
    required(raw, "lsn")?.parse()
}

/// Parse CLI arguments into internal representation.
pub fn parse_args<I, S>(args: I) -> Result<CliArgs>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let argv: Vec<String> = args.into_iter().map(Into::into).collect();
    let cli = Cli::parse_from(argv);
    let command = match cli.command {
        Some(Subcommands::Increment(args)) => Command::Increment(args),
        Some(Subcommands::Apply(args)) => Command::Apply(args),
        Some(Subcommands::Locations(args)) => Command::Locations(args),
        None => Command::None,
    };

    Ok(CliArgs {
        command,
        log_format: cli.log_format,
    })
}

/// Build the underlying clap `Command` (useful for help/usage contract tests).
pub fn clap_command() -> clap::Command {
    Cli::command()
}
