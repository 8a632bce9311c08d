//! Implementation of `pginc increment` subcommand.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use clap::Args;
use tracing::info;

use super::{parse_lsn, required, PageArgs};
use crate::increment::{read_incremental_file, DeltaBitmap};
use crate::{Error, Result};

#[derive(Debug, Clone, Args)]
pub struct IncrementArgs {
    /// Relation data file to scan.
    #[arg(short = 'f', long = "file")]
    pub file: Option<PathBuf>,

    /// Reference LSN (`X/Y`, `0x...` or decimal); pages newer than it are included.
    #[arg(long = "lsn")]
    pub lsn: Option<String>,

    /// Size to record for the file; defaults to its current length.
    #[arg(long = "file-size")]
    pub file_size: Option<u64>,

    /// Blocks already known to have changed (comma separated).
    #[arg(long = "changed-blocks", value_delimiter = ',')]
    pub changed_blocks: Vec<u32>,

    /// Output file; stdout when omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub page: PageArgs,
}

pub fn execute(args: IncrementArgs) -> Result<()> {
    let file = required(args.file, "file")?;
    let lsn = parse_lsn(args.lsn)?;
    let config = args.page.config()?;
    let file_size = match args.file_size {
        Some(size) => size,
        None => fs::metadata(&file)?.len(),
    };

    let bitmap = (!args.changed_blocks.is_empty())
        .then(|| args.changed_blocks.iter().copied().collect::<DeltaBitmap>());

    let (mut reader, size) =
        read_incremental_file(&file, file_size, lsn, bitmap.as_ref(), &config)?;

    let written = match &args.output {
        Some(path) => {
            let mut out = BufWriter::new(File::create(path)?);
            let n = io::copy(&mut reader, &mut out)?;
            out.flush()?;
            n
        }
        None => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            let n = io::copy(&mut reader, &mut out)?;
            out.flush()?;
            n
        }
    };

    if written != size {
        return Err(Error::Io(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("increment size mismatch: expected {size} bytes, wrote {written}"),
        ))
        .into());
    }

    info!(file = %file.display(), lsn = %lsn, bytes = written, "increment written");
    Ok(())
}
