//! PostgreSQL page header (`PageHeaderData`) and the changed-page decision.

use super::Lsn;

pub const PAGE_HEADER_SIZE: usize = 24;
/// `PD_HAS_FREE_LINES | PD_PAGE_FULL | PD_ALL_VISIBLE`.
pub const VALID_FLAGS: u16 = 0x7;
/// `PG_PAGE_LAYOUT_VERSION`.
pub const LAYOUT_VERSION: u16 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageHeader {
    pub lsn: Lsn,
    pub checksum: u16,
    pub flags: u16,
    pub lower: u16,
    pub upper: u16,
    pub special: u16,
    pub pagesize_version: u16,
    pub prune_xid: u32,
}

impl PageHeader {
    /// Parse the first 24 bytes of a page. Returns `None` for shorter input.
    pub fn parse(page: &[u8]) -> Option<Self> {
        let hdr = page.get(..PAGE_HEADER_SIZE)?;
        let u16_at = |off: usize| u16::from_le_bytes([hdr[off], hdr[off + 1]]);
        let u32_at =
            |off: usize| u32::from_le_bytes([hdr[off], hdr[off + 1], hdr[off + 2], hdr[off + 3]]);

        // pd_lsn is stored as {xlogid, xrecoff}, high half first.
        let lsn = ((u32_at(0) as u64) << 32) | u32_at(4) as u64;
        Some(Self {
            lsn: Lsn(lsn),
            checksum: u16_at(8),
            flags: u16_at(10),
            lower: u16_at(12),
            upper: u16_at(14),
            special: u16_at(16),
            pagesize_version: u16_at(18),
            prune_xid: u32_at(20),
        })
    }

    /// Serialize back into the on-disk 24-byte form.
    pub fn to_bytes(&self) -> [u8; PAGE_HEADER_SIZE] {
        let mut out = [0u8; PAGE_HEADER_SIZE];
        out[0..4].copy_from_slice(&((self.lsn.0 >> 32) as u32).to_le_bytes());
        out[4..8].copy_from_slice(&(self.lsn.0 as u32).to_le_bytes());
        out[8..10].copy_from_slice(&self.checksum.to_le_bytes());
        out[10..12].copy_from_slice(&self.flags.to_le_bytes());
        out[12..14].copy_from_slice(&self.lower.to_le_bytes());
        out[14..16].copy_from_slice(&self.upper.to_le_bytes());
        out[16..18].copy_from_slice(&self.special.to_le_bytes());
        out[18..20].copy_from_slice(&self.pagesize_version.to_le_bytes());
        out[20..24].copy_from_slice(&self.prune_xid.to_le_bytes());
        out
    }

    pub fn layout_version(&self) -> u16 {
        self.pagesize_version & 0x00ff
    }

    /// Whether the header can be trusted to report the page's LSN.
    pub fn is_valid(&self, page_size: usize) -> bool {
        self.flags & !VALID_FLAGS == 0
            && self.layout_version() == LAYOUT_VERSION
            && self.lower as usize >= PAGE_HEADER_SIZE
            && self.lower <= self.upper
            && self.upper <= self.special
            && self.special as usize <= page_size
    }
}

/// Per-page verdict of the changed-page scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageDecision {
    Unchanged,
    /// Page LSN is past the reference position.
    Changed,
    /// Header failed validation, so its LSN is not trusted.
    ChangedCorruptHeader,
    /// Never written or truncated page.
    ChangedZeroPage,
}

impl PageDecision {
    pub fn is_changed(self) -> bool {
        !matches!(self, PageDecision::Unchanged)
    }
}

/// Decide whether `page` changed since `reference`.
pub fn classify_page(page: &[u8], reference: Lsn) -> PageDecision {
    if page.iter().all(|b| *b == 0) {
        return PageDecision::ChangedZeroPage;
    }
    let header = match PageHeader::parse(page) {
        Some(h) if h.is_valid(page.len()) => h,
        _ => return PageDecision::ChangedCorruptHeader,
    };
    if !reference.is_valid() || header.lsn > reference {
        PageDecision::Changed
    } else {
        PageDecision::Unchanged
    }
}
