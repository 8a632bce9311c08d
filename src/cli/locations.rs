//! Implementation of `pginc locations` subcommand.

use std::fs;
use std::path::PathBuf;

use clap::{Args, ValueEnum};

use super::{parse_lsn, required, PageArgs};
use crate::increment::{read_increment_locations, BlockLocation};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum LocationsFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Args)]
pub struct LocationsArgs {
    /// Relation data file to scan.
    #[arg(short = 'f', long = "file")]
    pub file: Option<PathBuf>,

    /// Reference LSN (`X/Y`, `0x...` or decimal).
    #[arg(long = "lsn")]
    pub lsn: Option<String>,

    /// Bytes of the file to scan; defaults to its current length.
    #[arg(long = "file-size")]
    pub file_size: Option<u64>,

    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: LocationsFormat,

    #[command(flatten)]
    pub page: PageArgs,
}

pub fn execute(args: LocationsArgs) -> Result<()> {
    let file = required(args.file, "file")?;
    let lsn = parse_lsn(args.lsn)?;
    let config = args.page.config()?;
    let file_size = match args.file_size {
        Some(size) => size,
        None => fs::metadata(&file)?.len(),
    };

    let locations = read_increment_locations(&file, file_size, lsn, &config)?;
    println!("{}", render(&locations, args.format)?);
    Ok(())
}

pub fn render(locations: &[BlockLocation], format: LocationsFormat) -> Result<String> {
    match format {
        LocationsFormat::Json => {
            Ok(serde_json::to_string_pretty(locations).map_err(Error::from)?)
        }
        LocationsFormat::Text => Ok(locations
            .iter()
            .map(|loc| {
                format!(
                    "{}/{}/{} {}",
                    loc.rel.spc_node, loc.rel.db_node, loc.rel.rel_node, loc.block_no
                )
            })
            .collect::<Vec<_>>()
            .join("\n")),
    }
}
