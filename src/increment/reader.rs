//! Changed-page scanner producing increment containers.
//!
//! The reader inspects a data file once during initialization, remembers
//! which blocks changed since the reference LSN and then acts as an
//! [`io::Read`] source that streams the container without holding more than
//! one page in memory.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use tracing::debug;

use super::{container_size, DeltaBitmap, IncrementMetadata};
use crate::logging::{self, ScanSummary};
use crate::page::{classify_page, FileLayout, Lsn, PageConfig, PageDecision};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReaderState {
    Fresh,
    /// Full scan done, only the block list is available.
    BlockList,
    Streaming(Stage),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Metadata,
    BlockNumbers,
    Pages { next_block: usize },
    Done,
}

pub struct IncrementalPageReader<R> {
    source: R,
    file_size: u64,
    lsn: Lsn,
    layout: FileLayout,
    blocks: Vec<u32>,
    decisions: Vec<(u32, PageDecision)>,
    summary: ScanSummary,
    state: ReaderState,
    next: Vec<u8>,
    next_pos: usize,
}

impl<R: Read + Seek> IncrementalPageReader<R> {
    pub fn new(source: R, file_size: u64, lsn: Lsn, layout: FileLayout) -> Self {
        Self {
            source,
            file_size,
            lsn,
            layout,
            blocks: Vec::new(),
            decisions: Vec::new(),
            summary: ScanSummary::default(),
            state: ReaderState::Fresh,
            next: Vec::new(),
            next_pos: 0,
        }
    }

    /// Select changed blocks and prepare the container stream. Blocks set in
    /// `bitmap` are taken as changed without reading them; every other page
    /// is inspected. Without a bitmap every page is inspected.
    ///
    /// Returns the exact number of bytes the stream will produce.
    pub fn initialize(&mut self, bitmap: Option<&DeltaBitmap>) -> Result<u64> {
        self.ensure_fresh()?;
        self.scan(bitmap)?;

        let size = container_size(self.blocks.len() as u64, self.layout);
        self.summary.increment_size = size;
        self.state = ReaderState::Streaming(Stage::Metadata);
        Ok(size)
    }

    /// Inspect every page and collect the changed block list. The reader
    /// cannot stream a container afterwards.
    pub fn full_scan_initialize(&mut self) -> Result<()> {
        self.ensure_fresh()?;
        self.scan(None)?;
        self.state = ReaderState::BlockList;
        Ok(())
    }

    fn ensure_fresh(&self) -> Result<()> {
        if self.state != ReaderState::Fresh {
            return Err(Error::ScannerState("page reader already initialized").into());
        }
        Ok(())
    }

    fn page_count(&self) -> Result<u32> {
        let pages = self.file_size / self.layout.page_size_u64();
        u32::try_from(pages).map_err(|_| {
            Error::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("file of {} bytes has too many pages", self.file_size),
            ))
            .into()
        })
    }

    fn scan(&mut self, bitmap: Option<&DeltaBitmap>) -> Result<()> {
        let page_size = self.layout.page_size as usize;
        let pages = self.page_count()?;
        let mut page = vec![0u8; page_size];

        self.summary = ScanSummary {
            pages_total: pages as u64,
            ..ScanSummary::default()
        };
        self.blocks = Vec::with_capacity(pages.min(1024) as usize);
        self.decisions.clear();

        if let Some(bitmap) = bitmap {
            let beyond = bitmap.iter_from(pages).count();
            if beyond > 0 {
                // Blocks past the end were truncated away; nothing to copy.
                debug!(beyond, pages, "delta bitmap blocks beyond file end ignored");
            }
        }

        self.source.seek(SeekFrom::Start(0))?;
        let mut positioned = true;
        for block in 0..pages {
            if bitmap.is_some_and(|bm| bm.contains(block)) {
                self.summary.bitmap_blocks += 1;
                self.blocks.push(block);
                positioned = false;
                continue;
            }

            if !positioned {
                self.source
                    .seek(SeekFrom::Start(block as u64 * page_size as u64))?;
                positioned = true;
            }
            self.source
                .read_exact(&mut page)
                .map_err(|e| Error::from_read(e, format!("page {block}")))?;

            let decision = classify_page(&page, self.lsn);
            self.record(block, decision);
        }

        debug!(
            pages,
            changed = self.blocks.len(),
            lsn = %self.lsn,
            "changed page scan finished"
        );
        Ok(())
    }

    fn record(&mut self, block: u32, decision: PageDecision) {
        self.summary.pages_inspected += 1;
        match decision {
            PageDecision::Unchanged => {}
            PageDecision::Changed => self.summary.changed_lsn += 1,
            PageDecision::ChangedCorruptHeader => self.summary.changed_corrupt += 1,
            PageDecision::ChangedZeroPage => self.summary.changed_zero += 1,
        }
        if decision.is_changed() {
            self.blocks.push(block);
        }
        self.decisions.push((block, decision));
    }

    /// Changed blocks in ascending order.
    pub fn blocks(&self) -> &[u32] {
        &self.blocks
    }

    pub fn into_blocks(self) -> Vec<u32> {
        self.blocks
    }

    /// Verdicts for the pages read during the scan. Blocks taken from the
    /// delta bitmap were never read and are absent.
    pub fn decisions(&self) -> &[(u32, PageDecision)] {
        &self.decisions
    }

    pub fn summary(&self) -> ScanSummary {
        self.summary
    }

    pub fn layout(&self) -> FileLayout {
        self.layout
    }

    /// Load the next chunk of the container into `self.next`. Returns false
    /// once the stream is exhausted.
    fn advance(&mut self) -> io::Result<bool> {
        let stage = match self.state {
            ReaderState::Streaming(stage) => stage,
            ReaderState::Fresh => {
                return Err(io::Error::new(
                    io::ErrorKind::Other,
                    Error::ScannerState("page reader is not initialized"),
                ))
            }
            ReaderState::BlockList => {
                return Err(io::Error::new(
                    io::ErrorKind::Other,
                    Error::ScannerState("full scan reader cannot stream an increment"),
                ))
            }
        };

        self.next_pos = 0;
        let next_stage = match stage {
            Stage::Metadata => {
                let meta =
                    IncrementMetadata::new(self.file_size, self.blocks.len() as u32, self.layout);
                self.next = meta.encode()?;
                Stage::BlockNumbers
            }
            Stage::BlockNumbers => {
                self.next.clear();
                for block in &self.blocks {
                    self.next.extend_from_slice(&block.to_le_bytes());
                }
                Stage::Pages { next_block: 0 }
            }
            Stage::Pages { next_block } if next_block < self.blocks.len() => {
                self.read_page(self.blocks[next_block])?;
                Stage::Pages {
                    next_block: next_block + 1,
                }
            }
            Stage::Pages { .. } | Stage::Done => {
                self.next.clear();
                self.state = ReaderState::Streaming(Stage::Done);
                return Ok(false);
            }
        };
        self.state = ReaderState::Streaming(next_stage);
        Ok(true)
    }

    fn read_page(&mut self, block: u32) -> io::Result<()> {
        let page_size = self.layout.page_size as usize;
        self.next.resize(page_size, 0);
        self.source
            .seek(SeekFrom::Start(block as u64 * page_size as u64))?;
        self.source.read_exact(&mut self.next).map_err(|e| {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    Error::ShortRead {
                        context: format!("page {block}"),
                    },
                )
            } else {
                e
            }
        })
    }
}

impl<R: Read + Seek> Read for IncrementalPageReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        loop {
            let pending = &self.next[self.next_pos..];
            if !pending.is_empty() {
                let n = pending.len().min(buf.len());
                buf[..n].copy_from_slice(&pending[..n]);
                self.next_pos += n;
                return Ok(n);
            }
            if !self.advance()? {
                return Ok(0);
            }
        }
    }
}

/// Open `path` and prepare an increment stream relative to `lsn`.
///
/// Returns the reader together with the exact container size. The file is
/// closed when the reader is dropped.
pub fn read_incremental_file(
    path: &Path,
    file_size: u64,
    lsn: Lsn,
    bitmap: Option<&DeltaBitmap>,
    config: &PageConfig,
) -> Result<(IncrementalPageReader<File>, u64)> {
    let file = File::open(path)?;
    let layout = config.layout_for(path);

    let mut reader = IncrementalPageReader::new(file, file_size, lsn, layout);
    let size = reader.initialize(bitmap)?;
    logging::log_scan_summary(&path.display().to_string(), reader.summary());
    Ok((reader, size))
}
