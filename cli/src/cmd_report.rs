//! `wrapindex report` and the periodic report that runs alongside `run`.
//!
//! Rows are printed to stdout, largest balance first, either as
//! `Address: 0x…, Balance: …` lines or as one JSON object per line.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use wrapindex_core::error::IndexerError;
use wrapindex_core::report::{HolderRow, ReportSummary};
use wrapindex_core::SnapshotReporter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Text,
    JsonLines,
}

impl Format {
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            Self::JsonLines
        } else {
            Self::Text
        }
    }
}

/// Render one row in `format`.
pub fn render(row: &HolderRow, format: Format) -> String {
    match format {
        Format::Text => format!("Address: {}, Balance: {}", row.address, row.balance),
        Format::JsonLines => serde_json::to_string(row)
            .unwrap_or_else(|e| format!(r#"{{"error":"{e}"}}"#)),
    }
}

/// Page through the whole ledger once, printing every row.
pub async fn print_snapshot(
    reporter: &SnapshotReporter,
    format: Format,
) -> Result<ReportSummary, IndexerError> {
    let summary = reporter
        .for_each_page(|_, rows| {
            for holder in rows {
                println!("{}", render(&HolderRow::from(holder), format));
            }
        })
        .await?;

    info!(
        pages = summary.pages,
        holders = summary.rows,
        total = %summary.total,
        "snapshot printed"
    );
    Ok(summary)
}

/// Print a snapshot now, then every `every` until cancelled.
///
/// Failures are logged and do not stop the scanner.
pub async fn report_loop(
    reporter: SnapshotReporter,
    format: Format,
    every: Option<Duration>,
    cancel: CancellationToken,
) {
    loop {
        if let Err(e) = print_snapshot(&reporter, format).await {
            warn!(error = %e, "snapshot report failed");
        }
        let Some(every) = every else { break };
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(every) => {}
        }
    }
}
