//! Logging initialization using `tracing` and `tracing-subscriber`.

use clap::ValueEnum;
use tracing::info;
use tracing_subscriber::{fmt, util::SubscriberInitExt, EnvFilter};

use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    #[default]
    Human,
    Json,
}

/// Outcome of one changed-page scan, emitted once per file.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScanSummary {
    pub pages_total: u64,
    pub pages_inspected: u64,
    pub bitmap_blocks: u64,
    pub changed_lsn: u64,
    pub changed_zero: u64,
    pub changed_corrupt: u64,
    pub increment_size: u64,
}

/// Outcome of applying one increment container to a target file.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApplySummary {
    pub blocks_written: u64,
    pub file_size: u64,
    pub page_size: u64,
}

/// Initialize global tracing subscriber. Safe to call multiple times; subsequent
/// calls will no-op.
pub fn init_logging(format: LogFormat) -> Result<()> {
    if tracing::dispatcher::has_been_set() {
        return Ok(());
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    match format {
        LogFormat::Human => {
            let _ = builder.finish().try_init();
        }
        LogFormat::Json => {
            let _ = builder.json().finish().try_init();
        }
    };

    Ok(())
}

pub fn log_scan_summary(path: &str, summary: ScanSummary) {
    info!(
        target: "pginc::scan",
        path,
        pages_total = summary.pages_total,
        pages_inspected = summary.pages_inspected,
        bitmap_blocks = summary.bitmap_blocks,
        changed_lsn = summary.changed_lsn,
        changed_zero = summary.changed_zero,
        changed_corrupt = summary.changed_corrupt,
        increment_size = summary.increment_size,
        "increment_scan_summary"
    );
}

pub fn log_apply_summary(path: &str, summary: ApplySummary) {
    info!(
        target: "pginc::apply",
        path,
        blocks_written = summary.blocks_written,
        file_size = summary.file_size,
        page_size = summary.page_size,
        "increment_apply_summary"
    );
}
