//! Implementation of `pginc apply` subcommand.

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use clap::Args;

use super::{required, PageArgs};
use crate::increment::apply_file_increment;
use crate::Result;

#[derive(Debug, Clone, Args)]
pub struct ApplyArgs {
    /// Data file to patch.
    #[arg(short = 't', long = "target")]
    pub target: Option<PathBuf>,

    /// Increment produced by `pginc increment`.
    #[arg(short = 'i', long = "increment")]
    pub increment: Option<PathBuf>,

    /// Create the target when it does not exist.
    #[arg(long = "create", default_value_t = false)]
    pub create: bool,

    /// Sync the target to disk before closing it.
    #[arg(long = "fsync", default_value_t = false)]
    pub fsync: bool,

    #[command(flatten)]
    pub page: PageArgs,
}

pub fn execute(args: ApplyArgs) -> Result<()> {
    let target = required(args.target, "target")?;
    let increment = required(args.increment, "increment")?;
    let config = args.page.config()?;

    let reader = BufReader::new(File::open(&increment)?);
    apply_file_increment(&target, reader, args.create, args.fsync, &config)?;
    Ok(())
}
