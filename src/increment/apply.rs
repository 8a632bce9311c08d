//! Apply an increment container to a data file in place.

use std::fs::{File, OpenOptions};
use std::io::{self, Read};
use std::os::unix::fs::FileExt;
use std::path::Path;

use tracing::{debug, warn};

use super::{read_increment_header, IncrementMetadata, SIZEOF_U32};
use crate::logging::{self, ApplySummary};
use crate::page::{validate_page_size, PageConfig};
use crate::{Error, Result};

/// Target file handle held for the duration of an apply. Dropping it syncs
/// (when requested) and closes the file on every exit path.
struct IncrementTarget<'a> {
    file: File,
    path: &'a Path,
    fsync: bool,
}

impl Drop for IncrementTarget<'_> {
    fn drop(&mut self) {
        if !self.fsync {
            return;
        }
        if let Err(err) = self.file.sync_all() {
            warn!(path = %self.path.display(), error = %err, "failed to sync incremented file");
        }
    }
}

/// Patch `path` with the pages recorded in `increment`.
///
/// The header is validated before the target is opened. A failure after
/// that point may leave the target partially patched.
pub fn apply_file_increment<R: Read>(
    path: &Path,
    mut increment: R,
    create_if_missing: bool,
    fsync: bool,
    config: &PageConfig,
) -> Result<ApplySummary> {
    debug!(path = %path.display(), "incrementing file");
    read_increment_header(&mut increment)?;

    let layout = config.layout_for(path);
    let meta = IncrementMetadata::read_from(&mut increment, layout)?;
    let page_size = meta.page_size.map_or(layout.page_size, u32::from);
    validate_page_size(page_size)?;
    let page_size = page_size as u64;

    let block_numbers = read_block_numbers(&mut increment, meta.block_count)?;

    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(create_if_missing)
        .open(path)
        .map_err(|err| {
            if err.kind() == io::ErrorKind::NotFound {
                Error::TargetMissing(path.display().to_string())
            } else {
                Error::Io(err)
            }
        })?;
    let target = IncrementTarget { file, path, fsync };

    target.file.set_len(meta.file_size)?;

    let mut page = vec![0u8; page_size as usize];
    for &block in &block_numbers {
        increment
            .read_exact(&mut page)
            .map_err(|e| Error::from_read(e, format!("page data for block {block}")))?;
        target.file.write_all_at(&page, block as u64 * page_size)?;
    }

    let mut probe = [0u8; 1];
    if increment.read(&mut probe)? > 0 {
        return Err(Error::UnexpectedTrailingData.into());
    }

    let summary = ApplySummary {
        blocks_written: block_numbers.len() as u64,
        file_size: meta.file_size,
        page_size,
    };
    logging::log_apply_summary(&path.display().to_string(), summary);
    Ok(summary)
}

/// Read the block number array without trusting `count` for the allocation.
fn read_block_numbers<R: Read>(increment: &mut R, count: u32) -> Result<Vec<u32>> {
    let expected = count as u64 * SIZEOF_U32;
    let mut raw = Vec::new();
    increment.by_ref().take(expected).read_to_end(&mut raw)?;
    if raw.len() as u64 != expected {
        return Err(Error::ShortRead {
            context: "diff block numbers".into(),
        }
        .into());
    }

    Ok(raw
        .chunks_exact(SIZEOF_U32 as usize)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}
