use thiserror::Error;

pub mod cli;
pub mod increment;
pub mod logging;
pub mod page;

pub type Result<T> = anyhow::Result<T>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid increment file header")]
    InvalidHeader,
    #[error("unknown increment file header version {version:?}")]
    UnknownVersion { version: char },
    #[error("unexpected trailing data after increment")]
    UnexpectedTrailingData,
    #[error("incremented file should always exist: {0}")]
    TargetMissing(String),
    #[error("short read while reading {context}")]
    ShortRead { context: String },
    #[error("cannot resolve relation identity of {path}: {reason}")]
    PathResolution { path: String, reason: String },
    #[error("invalid lsn: {0}")]
    InvalidLsn(String),
    #[error("invalid page size: {0}")]
    InvalidPageSize(u64),
    #[error("page reader misuse: {0}")]
    ScannerState(&'static str),
    #[error("serialization error")]
    Serde(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("cli error: {0}")]
    Cli(String),
}

impl Error {
    /// Map an I/O error from a fixed-size read, turning EOF into `ShortRead`.
    pub(crate) fn from_read(err: std::io::Error, context: impl Into<String>) -> Self {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            Error::ShortRead {
                context: context.into(),
            }
        } else {
            Error::Io(err)
        }
    }
}

/// Entry point for the library, called by the CLI thin wrapper.
pub fn run<I, S>(args: I) -> Result<()>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let cli_args = cli::parse_args(args.into_iter().map(Into::into))?;
    logging::init_logging(cli_args.log_format)?;
    cli::dispatch(cli_args)
}
