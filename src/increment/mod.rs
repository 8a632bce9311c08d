//! Increment container format.
//!
//! An increment describes the changed pages of one data file:
//!
//! ```text
//! 4 bytes   header: 'w' 'i' <version digit> 0x55
//! 8 bytes   u64 target file size
//! 2 bytes   u16 page size (variable page-size storage only)
//! 4 bytes   u32 changed page count N
//! N*4 bytes u32 block numbers, ascending
//! N*page    page images, same order as the block numbers
//! ```
//!
//! All integers are little-endian.

use std::io::{self, Read, Write};

use crate::page::FileLayout;
use crate::{Error, Result};

pub mod apply;
pub mod bitmap;
pub mod locations;
pub mod reader;

pub use apply::apply_file_increment;
pub use bitmap::DeltaBitmap;
pub use locations::{
    convert_blocks_to_locations, read_increment_locations, BlockLocation, RelFileNode,
};
pub use reader::{read_incremental_file, IncrementalPageReader};

pub const SIGNATURE_MAGIC: u8 = 0x55;
pub const FORMAT_VERSION: u8 = b'1';
pub const INCREMENT_HEADER: [u8; 4] = [b'w', b'i', FORMAT_VERSION, SIGNATURE_MAGIC];

pub(crate) const SIZEOF_U16: u64 = 2;
pub(crate) const SIZEOF_U32: u64 = 4;
pub(crate) const SIZEOF_U64: u64 = 8;

/// Validate the 4-byte container header. Reads nothing past it.
pub fn read_increment_header<R: Read + ?Sized>(reader: &mut R) -> Result<()> {
    let mut header = [0u8; INCREMENT_HEADER.len()];
    reader
        .read_exact(&mut header)
        .map_err(|e| Error::from_read(e, "increment header"))?;

    if header[0] != b'w' || header[1] != b'i' || header[3] != SIGNATURE_MAGIC {
        return Err(Error::InvalidHeader.into());
    }
    if header[2] != FORMAT_VERSION {
        return Err(Error::UnknownVersion {
            version: header[2] as char,
        }
        .into());
    }
    Ok(())
}

pub fn write_increment_header<W: Write + ?Sized>(writer: &mut W) -> io::Result<()> {
    writer.write_all(&INCREMENT_HEADER)
}

/// Fixed-size fields that follow the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IncrementMetadata {
    pub file_size: u64,
    /// Present only for variable page-size storage.
    pub page_size: Option<u16>,
    pub block_count: u32,
}

impl IncrementMetadata {
    pub fn new(file_size: u64, block_count: u32, layout: FileLayout) -> Self {
        let page_size = layout
            .variant
            .has_variable_page_size()
            .then_some(layout.page_size as u16);
        Self {
            file_size,
            page_size,
            block_count,
        }
    }

    /// Write the header followed by the metadata fields.
    pub fn write_to<W: Write + ?Sized>(&self, writer: &mut W) -> io::Result<()> {
        write_increment_header(writer)?;
        writer.write_all(&self.file_size.to_le_bytes())?;
        if let Some(page_size) = self.page_size {
            writer.write_all(&page_size.to_le_bytes())?;
        }
        writer.write_all(&self.block_count.to_le_bytes())
    }

    /// Header plus metadata, ready to be streamed.
    pub fn encode(&self) -> io::Result<Vec<u8>> {
        let mut out = Vec::with_capacity(metadata_len(self.page_size.is_some()) as usize);
        self.write_to(&mut out)?;
        Ok(out)
    }

    /// Parse the fields after an already validated header. `layout` decides
    /// whether the page size field is present.
    pub fn read_from<R: Read + ?Sized>(reader: &mut R, layout: FileLayout) -> Result<Self> {
        let mut u64_buf = [0u8; 8];
        reader
            .read_exact(&mut u64_buf)
            .map_err(|e| Error::from_read(e, "fileSize"))?;
        let file_size = u64::from_le_bytes(u64_buf);

        let page_size = if layout.variant.has_variable_page_size() {
            let mut u16_buf = [0u8; 2];
            reader
                .read_exact(&mut u16_buf)
                .map_err(|e| Error::from_read(e, "pageSize"))?;
            Some(u16::from_le_bytes(u16_buf))
        } else {
            None
        };

        let mut u32_buf = [0u8; 4];
        reader
            .read_exact(&mut u32_buf)
            .map_err(|e| Error::from_read(e, "diffBlockCount"))?;

        Ok(Self {
            file_size,
            page_size,
            block_count: u32::from_le_bytes(u32_buf),
        })
    }
}

fn metadata_len(with_page_size: bool) -> u64 {
    let page_size = if with_page_size { SIZEOF_U16 } else { 0 };
    INCREMENT_HEADER.len() as u64 + SIZEOF_U64 + page_size + SIZEOF_U32
}

/// Total container length for `block_count` changed pages.
pub fn container_size(block_count: u64, layout: FileLayout) -> u64 {
    metadata_len(layout.variant.has_variable_page_size())
        + block_count * (SIZEOF_U32 + layout.page_size_u64())
}
