//! PostgreSQL page geometry shared by the classifier, scanner and applier.
//!
//! Page size is carried explicitly through [`PageConfig`]; the process-wide
//! default only seeds `PageConfig::default()`.

use std::fmt;
use std::path::{Component, Path};
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

pub mod classify;
pub mod header;

pub use header::{classify_page, PageDecision, PageHeader, PAGE_HEADER_SIZE};

/// PostgreSQL page size (matches `BLCKSZ`, 8 KiB).
pub const DEFAULT_PAGE_SIZE: u32 = 8192;
/// Largest page size PostgreSQL can be built with; also bounds the 2-byte
/// `PageSize` container field.
pub const MAX_PAGE_SIZE: u32 = 32768;
/// Directory component marking OrioleDB data files.
pub const ORIOLEDB_DATA_DIR: &str = "orioledb_data";

static DEFAULT_PAGE_SIZE_SETTING: AtomicU32 = AtomicU32::new(DEFAULT_PAGE_SIZE);

/// Set the page size returned by `PageConfig::default()`. Last write wins.
pub fn set_default_page_size(page_size: u32) -> Result<()> {
    validate_page_size(page_size)?;
    DEFAULT_PAGE_SIZE_SETTING.store(page_size, Ordering::Relaxed);
    Ok(())
}

pub fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE_SETTING.load(Ordering::Relaxed)
}

pub(crate) fn validate_page_size(page_size: u32) -> Result<()> {
    if !page_size.is_power_of_two()
        || (page_size as usize) < PAGE_HEADER_SIZE
        || page_size > MAX_PAGE_SIZE
    {
        return Err(Error::InvalidPageSize(page_size as u64).into());
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageConfig {
    /// Page size of regular heap/index relation files.
    pub page_size: u32,
    /// Page size used for files of the variable page-size storage variant.
    pub variable_page_size: u32,
}

impl Default for PageConfig {
    fn default() -> Self {
        let page_size = default_page_size();
        Self {
            page_size,
            variable_page_size: page_size,
        }
    }
}

impl PageConfig {
    pub fn new(page_size: u32) -> Result<Self> {
        validate_page_size(page_size)?;
        Ok(Self {
            page_size,
            variable_page_size: page_size,
        })
    }

    pub fn with_variable_page_size(mut self, page_size: u32) -> Result<Self> {
        validate_page_size(page_size)?;
        self.variable_page_size = page_size;
        Ok(self)
    }

    pub fn layout_for(&self, path: &Path) -> FileLayout {
        let variant = StorageVariant::detect(path);
        let page_size = match variant {
            StorageVariant::Heap => self.page_size,
            StorageVariant::Orioledb => self.variable_page_size,
        };
        FileLayout { variant, page_size }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageVariant {
    Heap,
    /// Page size is recorded in every increment container.
    Orioledb,
}

impl StorageVariant {
    pub fn detect(path: &Path) -> Self {
        let oriole = path
            .components()
            .any(|c| matches!(c, Component::Normal(name) if name == ORIOLEDB_DATA_DIR));
        if oriole {
            StorageVariant::Orioledb
        } else {
            StorageVariant::Heap
        }
    }

    pub fn has_variable_page_size(self) -> bool {
        matches!(self, StorageVariant::Orioledb)
    }
}

/// Page geometry resolved for one concrete file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileLayout {
    pub variant: StorageVariant,
    pub page_size: u32,
}

impl FileLayout {
    pub fn heap(page_size: u32) -> Self {
        Self {
            variant: StorageVariant::Heap,
            page_size,
        }
    }

    pub fn page_size_u64(&self) -> u64 {
        self.page_size as u64
    }
}

/// Write-ahead log position, as stored in `pd_lsn`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Lsn(pub u64);

impl Lsn {
    pub const INVALID: Lsn = Lsn(0);

    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

impl From<u64> for Lsn {
    fn from(value: u64) -> Self {
        Lsn(value)
    }
}

impl fmt::Display for Lsn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:X}/{:X}", self.0 >> 32, self.0 & 0xffff_ffff)
    }
}

impl FromStr for Lsn {
    type Err = anyhow::Error;

    /// Accepts `16/B374D848`, `0x16B374D848` or a plain decimal value.
    fn from_str(s: &str) -> Result<Self> {
        let raw = s.trim();
        let invalid = || Error::InvalidLsn(s.to_string());

        if let Some((hi, lo)) = raw.split_once('/') {
            let hi = u32::from_str_radix(hi, 16).map_err(|_| invalid())?;
            let lo = u32::from_str_radix(lo, 16).map_err(|_| invalid())?;
            return Ok(Lsn(((hi as u64) << 32) | lo as u64));
        }
        if let Some(hex) = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
            return u64::from_str_radix(hex, 16)
                .map(Lsn)
                .map_err(|_| invalid().into());
        }
        raw.parse::<u64>().map(Lsn).map_err(|_| invalid().into())
    }
}
