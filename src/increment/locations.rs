//! Map changed blocks of a relation file to cluster-wide block locations.

use std::fs::File;
use std::path::{Component, Path};

use serde::Serialize;

use super::IncrementalPageReader;
use crate::page::classify::{
    parse_relation_file_name, DEFAULT_TABLESPACE, GLOBAL_TABLESPACE, NON_DEFAULT_TABLESPACE,
};
use crate::page::{FileLayout, Lsn, PageConfig};
use crate::{Error, Result};

/// OID of `pg_default`.
pub const DEFAULT_SPC_NODE: u32 = 1663;
/// OID of `pg_global`.
pub const GLOBAL_SPC_NODE: u32 = 1664;
/// Relation segment files are cut at 1 GiB (`RELSEG_SIZE * BLCKSZ`).
pub const SEGMENT_SIZE: u64 = 1 << 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct RelFileNode {
    pub spc_node: u32,
    pub db_node: u32,
    pub rel_node: u32,
}

/// Relation identity and segment number parsed from a data file path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationFile {
    pub node: RelFileNode,
    pub segment: u32,
}

impl RelFileNode {
    /// Parse `base/<db>/<rel>`, `global/<rel>` or
    /// `pg_tblspc/<spc>/<version>/<db>/<rel>`, each optionally with a `.<segment>`
    /// suffix.
    pub fn from_path(path: &Path) -> Result<RelationFile> {
        let fail = |reason: &str| -> anyhow::Error {
            Error::PathResolution {
                path: path.display().to_string(),
                reason: reason.to_string(),
            }
            .into()
        };

        let parts: Vec<&str> = path
            .components()
            .filter_map(|c| match c {
                Component::Normal(name) => name.to_str(),
                _ => None,
            })
            .collect();
        let (name, dirs) = parts
            .split_last()
            .ok_or_else(|| fail("empty path"))?;
        let (rel_node, segment) =
            parse_relation_file_name(name).ok_or_else(|| fail("not a relation file name"))?;

        let oid = |s: &str| s.parse::<u32>().ok();
        let at = |back: usize| dirs.len().checked_sub(back).map(|i| dirs[i]);

        let node = if at(1) == Some(GLOBAL_TABLESPACE) {
            RelFileNode {
                spc_node: GLOBAL_SPC_NODE,
                db_node: 0,
                rel_node,
            }
        } else if at(2) == Some(DEFAULT_TABLESPACE) {
            let db_node = at(1).and_then(oid).ok_or_else(|| fail("bad database oid"))?;
            RelFileNode {
                spc_node: DEFAULT_SPC_NODE,
                db_node,
                rel_node,
            }
        } else if at(4) == Some(NON_DEFAULT_TABLESPACE) {
            let spc_node = at(3).and_then(oid).ok_or_else(|| fail("bad tablespace oid"))?;
            let db_node = at(1).and_then(oid).ok_or_else(|| fail("bad database oid"))?;
            RelFileNode {
                spc_node,
                db_node,
                rel_node,
            }
        } else {
            return Err(fail("unknown tablespace"));
        };

        Ok(RelationFile { node, segment })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct BlockLocation {
    pub rel: RelFileNode,
    pub block_no: u32,
}

/// Full-scan `path` and report every changed block as a relation location.
pub fn read_increment_locations(
    path: &Path,
    file_size: u64,
    lsn: Lsn,
    config: &PageConfig,
) -> Result<Vec<BlockLocation>> {
    let layout = config.layout_for(path);
    let file = File::open(path)?;
    let mut reader = IncrementalPageReader::new(file, file_size, lsn, layout);
    reader.full_scan_initialize()?;
    convert_blocks_to_locations(path, &reader.into_blocks(), layout)
}

/// Block numbers in `blocks` are relative to the segment file at `path`.
pub fn convert_blocks_to_locations(
    path: &Path,
    blocks: &[u32],
    layout: FileLayout,
) -> Result<Vec<BlockLocation>> {
    let relation = RelFileNode::from_path(path)?;
    let blocks_per_segment = SEGMENT_SIZE / layout.page_size_u64();
    let first_block = relation.segment as u64 * blocks_per_segment;

    blocks
        .iter()
        .map(|&block| -> Result<BlockLocation> {
            let block_no = u32::try_from(first_block + block as u64).map_err(|_| {
                Error::PathResolution {
                    path: path.display().to_string(),
                    reason: format!("block {block} of segment {} overflows", relation.segment),
                }
            })?;
            Ok(BlockLocation {
                rel: relation.node,
                block_no,
            })
        })
        .collect()
}
