//! The chunked chain scanner — drives the ledger from the cursor to the head.
//!
//! # Bootstrap
//! Load the cursor (seeding it from `starting_block` on a fresh store) and
//! read the chain height once.
//!
//! # Scan
//! While `cursor + 1 <= head`, take the window `[cursor + 1, min(cursor + W, head)]`:
//!   - Fetch its logs, retrying the same window on RPC failure
//!   - Decode and apply each log in the order returned; undecodable logs are
//!     skipped and logged
//!   - Commit `cursor = to`, strictly after every ledger write of the window
//!
//! # Idle
//! Once caught up, sleep `poll_interval`, re-read the chain height, and scan
//! again.
//!
//! A ledger or cursor write failure leaves the cursor where it was; after a
//! backoff the same window is scanned again. With the ledger in idempotent
//! mode the events it already applied are skipped on the second pass.

use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use wrapindex_core::checkpoint::{CursorManager, CursorStore};
use wrapindex_core::clock::{sleep_or_cancel, Sleeper, TokioSleeper};
use wrapindex_core::error::IndexerError;
use wrapindex_core::events::{DecodedEvent, EventDecoder};
use wrapindex_core::indexer::{ScannerConfig, ScannerState};
use wrapindex_core::ledger::{ApplyOutcome, BurnPolicy, Ledger, LedgerStore};
use wrapindex_core::retry::RetryPolicy;
use wrapindex_core::types::{BlockRange, LogEntry, LogFilter};

use crate::fetcher::EvmRpcClient;

/// Counters accumulated over the scanner's lifetime.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    pub windows_committed: u64,
    pub logs_seen: u64,
    pub transfers_applied: u64,
    pub burns_observed: u64,
    pub duplicates_skipped: u64,
    pub ignored_logs: u64,
    pub decode_failures: u64,
    /// Windows abandoned before commit because a ledger write failed.
    pub failed_windows: u64,
    pub failed_commits: u64,
    pub rpc_retries: u64,
}

/// What happened to one committed window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WindowReport {
    pub from: u64,
    pub to: u64,
    pub logs: u64,
    pub transfers: u64,
    pub burns: u64,
    pub duplicates: u64,
    pub ignored: u64,
    pub decode_failures: u64,
}

/// Outcome of a single [`ChainScanner::step`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// A window was applied and the cursor moved to its end.
    Committed(WindowReport),
    /// The cursor has reached the last known chain height.
    CaughtUp { head: u64 },
    /// Cancelled while waiting on the RPC endpoint; nothing was applied.
    Cancelled,
}

/// Scans one token contract's logs into a ledger.
pub struct ChainScanner<C: EvmRpcClient> {
    config: ScannerConfig,
    client: C,
    filter: LogFilter,
    decoder: EventDecoder,
    cursor: CursorManager,
    ledger: Ledger,
    retry: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
    state: ScannerState,
    stats: ScanStats,
    head: Option<u64>,
}

impl<C: EvmRpcClient> ChainScanner<C> {
    pub fn new(
        config: ScannerConfig,
        client: C,
        cursor_store: Arc<dyn CursorStore>,
        ledger_store: Arc<dyn LedgerStore>,
    ) -> Result<Self, IndexerError> {
        config.validate()?;
        let decoder = EventDecoder::new();
        Ok(Self {
            filter: LogFilter::new(config.contract, decoder.topics()),
            decoder,
            cursor: CursorManager::new(cursor_store),
            ledger: Ledger::new(ledger_store, config.ledger_policy()),
            retry: config.retry_policy(),
            sleeper: Arc::new(TokioSleeper),
            state: ScannerState::Created,
            stats: ScanStats::default(),
            head: None,
            client,
            config,
        })
    }

    /// Replace the timer used for idle polls and backoffs.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    pub fn state(&self) -> ScannerState {
        self.state
    }

    pub fn stats(&self) -> &ScanStats {
        &self.stats
    }

    /// Last committed block, once bootstrapped.
    pub fn cursor(&self) -> Option<u64> {
        self.cursor.current().map(|c| c.block_number)
    }

    /// Chain height as last read.
    pub fn head(&self) -> Option<u64> {
        self.head
    }

    // ─── Bootstrap ────────────────────────────────────────────────────────────

    /// Load or seed the cursor and read the chain height.
    ///
    /// Returns `Ok(false)` if cancelled while waiting for the RPC endpoint.
    /// Cursor problems are configuration errors and are returned as-is.
    pub async fn bootstrap(&mut self, cancel: &CancellationToken) -> Result<bool, IndexerError> {
        self.state = ScannerState::Bootstrapping;

        let cursor = match self.cursor.bootstrap(self.config.starting_block).await {
            Ok(c) => c,
            Err(e) => {
                self.state = ScannerState::Error;
                error!(error = %e, "bootstrap failed");
                return Err(e);
            }
        };

        match self.refresh_head(cancel).await? {
            Some(head) => {
                info!(
                    cursor = cursor.block_number,
                    head,
                    contract = %self.config.contract,
                    burn_policy = %self.config.burn_policy,
                    "scanner bootstrapped"
                );
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Re-read the chain height, retrying per the retry policy.
    async fn refresh_head(&mut self, cancel: &CancellationToken) -> Result<Option<u64>, IndexerError> {
        let client = &self.client;
        let head = retrying(
            &self.retry,
            self.sleeper.as_ref(),
            &mut self.stats,
            cancel,
            "eth_blockNumber",
            || client.block_number(),
        )
        .await?;

        let Some(h) = head else {
            return Ok(None);
        };
        // A lagging node must not pull the head below what we already saw.
        let h = self.head.map_or(h, |prev| prev.max(h));
        self.head = Some(h);
        Ok(Some(h))
    }

    // ─── Scan ─────────────────────────────────────────────────────────────────

    /// Process the next window, or report that the cursor is caught up.
    pub async fn step(&mut self, cancel: &CancellationToken) -> Result<Step, IndexerError> {
        let cursor = self
            .cursor
            .current()
            .ok_or_else(|| IndexerError::Other("scanner stepped before bootstrap".into()))?;
        let head = self.head.unwrap_or(cursor.block_number);

        match cursor.next_window(self.config.window_width, head) {
            Some(range) => match self.scan_window(range, cancel).await? {
                Some(report) => Ok(Step::Committed(report)),
                None => Ok(Step::Cancelled),
            },
            None => Ok(Step::CaughtUp { head }),
        }
    }

    /// Fetch, apply, and commit one window.
    ///
    /// Returns `Ok(None)` if cancelled while fetching. Once logs are in hand
    /// the window always runs to commit (or fails).
    pub async fn scan_window(
        &mut self,
        range: BlockRange,
        cancel: &CancellationToken,
    ) -> Result<Option<WindowReport>, IndexerError> {
        self.state = ScannerState::Scanning;

        let client = &self.client;
        let filter = &self.filter;
        let logs = match retrying(
            &self.retry,
            self.sleeper.as_ref(),
            &mut self.stats,
            cancel,
            "eth_getLogs",
            || client.get_logs(filter, range),
        )
        .await?
        {
            Some(logs) => logs,
            None => return Ok(None),
        };

        let report = match self.apply_logs(range, &logs).await {
            Ok(r) => r,
            Err(e) => {
                self.stats.failed_windows += 1;
                warn!(from = range.from, to = range.to, error = %e, "window not applied; cursor unchanged");
                return Err(e);
            }
        };

        if let Err(e) = self.cursor.commit(range.to).await {
            self.stats.failed_commits += 1;
            warn!(block = range.to, error = %e, "cursor commit failed; window will be re-scanned");
            return Err(e);
        }
        self.stats.windows_committed += 1;

        match self.ledger.prune(range.to).await {
            Ok(0) => {}
            Ok(pruned) => debug!(pruned, up_to = range.to, "pruned applied-event ids"),
            Err(e) => warn!(error = %e, "failed to prune applied-event ids"),
        }

        info!(
            from = range.from,
            to = range.to,
            blocks = range.block_count(),
            logs = report.logs,
            transfers = report.transfers,
            burns = report.burns,
            skipped = report.decode_failures,
            "window committed"
        );
        Ok(Some(report))
    }

    /// Decode and apply `logs` in the order given.
    ///
    /// Decode failures skip the single log. A ledger store error aborts the
    /// window so the cursor is not committed past unapplied events.
    async fn apply_logs(
        &mut self,
        range: BlockRange,
        logs: &[LogEntry],
    ) -> Result<WindowReport, IndexerError> {
        let mut report = WindowReport {
            from: range.from,
            to: range.to,
            ..Default::default()
        };

        for log in logs {
            report.logs += 1;
            self.stats.logs_seen += 1;

            if !range.contains(log.block_number) {
                warn!(
                    block = log.block_number,
                    log_index = log.log_index,
                    from = range.from,
                    to = range.to,
                    "log outside requested window; ignoring"
                );
                report.ignored += 1;
                self.stats.ignored_logs += 1;
                continue;
            }

            let event = match self.decoder.decode(log) {
                Ok(Some(event)) => event,
                Ok(None) => {
                    debug!(block = log.block_number, log_index = log.log_index, "unknown event; ignoring");
                    report.ignored += 1;
                    self.stats.ignored_logs += 1;
                    continue;
                }
                Err(e) => {
                    warn!(
                        block = log.block_number,
                        log_index = log.log_index,
                        field = e.field(),
                        error = %e,
                        "skipping undecodable log"
                    );
                    report.decode_failures += 1;
                    self.stats.decode_failures += 1;
                    continue;
                }
            };

            let outcome = self.ledger.apply(log.id(), &event).await?;

            if outcome == ApplyOutcome::Duplicate {
                report.duplicates += 1;
                self.stats.duplicates_skipped += 1;
                continue;
            }

            match &event {
                DecodedEvent::Transfer { from, to, value } => {
                    debug!(
                        block = log.block_number,
                        log_index = log.log_index,
                        %from,
                        %to,
                        %value,
                        "transfer applied"
                    );
                    report.transfers += 1;
                    self.stats.transfers_applied += 1;
                }
                DecodedEvent::Burn { from, amount, .. } => {
                    let applied = self.ledger.policy().burn == BurnPolicy::Subtract;
                    info!(
                        block = log.block_number,
                        log_index = log.log_index,
                        %from,
                        %amount,
                        applied,
                        "burn observed"
                    );
                    report.burns += 1;
                    self.stats.burns_observed += 1;
                }
            }
        }

        Ok(report)
    }

    // ─── Drivers ──────────────────────────────────────────────────────────────

    /// Bootstrap if needed, then scan until the cursor reaches the head as
    /// read at bootstrap. Returns the final cursor.
    ///
    /// Errors are returned rather than backed off; use [`run`](Self::run) for
    /// the long-lived loop.
    pub async fn run_until_caught_up(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<Option<u64>, IndexerError> {
        if self.cursor.current().is_none() && !self.bootstrap(cancel).await? {
            return Ok(self.cursor());
        }
        loop {
            match self.step(cancel).await? {
                Step::Committed(_) => {
                    if cancel.is_cancelled() {
                        break;
                    }
                }
                Step::CaughtUp { .. } => {
                    self.state = ScannerState::Idle;
                    break;
                }
                Step::Cancelled => break,
            }
        }
        Ok(self.cursor())
    }

    /// Run until `cancel` fires.
    ///
    /// Only bootstrap failures and exhausted bounded retries are returned as
    /// errors; store write failures are logged and the window retried after
    /// a backoff.
    pub async fn run(&mut self, cancel: CancellationToken) -> Result<(), IndexerError> {
        if cancel.is_cancelled() {
            self.state = ScannerState::Stopped;
            return Ok(());
        }
        if !self.bootstrap(&cancel).await? {
            self.state = ScannerState::Stopped;
            return Ok(());
        }

        let backoff = self.retry.backoff;
        let poll = self.config.poll_interval();

        while !cancel.is_cancelled() {
            match self.step(&cancel).await {
                Ok(Step::Committed(_)) => {}
                Ok(Step::Cancelled) => break,
                Ok(Step::CaughtUp { head }) => {
                    self.state = ScannerState::Idle;
                    debug!(head, poll_ms = poll.as_millis() as u64, "caught up; waiting for new blocks");
                    if !sleep_or_cancel(self.sleeper.as_ref(), poll, &cancel).await {
                        break;
                    }
                    match self.refresh_head(&cancel).await {
                        Ok(Some(_)) => {}
                        Ok(None) => break,
                        Err(e) => return Err(self.fail(e)),
                    }
                }
                Err(IndexerError::Storage(reason)) => {
                    self.state = ScannerState::Backoff;
                    warn!(%reason, backoff_ms = backoff.as_millis() as u64, "store write failed; backing off");
                    if !sleep_or_cancel(self.sleeper.as_ref(), backoff, &cancel).await {
                        break;
                    }
                }
                Err(e) => return Err(self.fail(e)),
            }
        }

        self.state = ScannerState::Stopped;
        info!(cursor = ?self.cursor(), stats = ?self.stats, "scanner stopped");
        Ok(())
    }

    fn fail(&mut self, e: IndexerError) -> IndexerError {
        self.state = ScannerState::Error;
        error!(error = %e, "scanner stopped on error");
        e
    }
}

/// Call `op` until it succeeds, sleeping per `policy` on transient errors.
///
/// Returns `Ok(None)` if `cancel` fires while waiting.
async fn retrying<T, F, Fut>(
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    stats: &mut ScanStats,
    cancel: &CancellationToken,
    what: &'static str,
    mut op: F,
) -> Result<Option<T>, IndexerError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, IndexerError>>,
{
    let mut attempt = 0u32;
    loop {
        if cancel.is_cancelled() {
            return Ok(None);
        }
        match op().await {
            Ok(value) => return Ok(Some(value)),
            Err(e) if e.is_transient() => {
                attempt += 1;
                match policy.next_delay(attempt) {
                    Some(delay) => {
                        stats.rpc_retries += 1;
                        warn!(
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            error = %e,
                            call = what,
                            "RPC call failed; retrying"
                        );
                        if !sleep_or_cancel(sleeper, delay, cancel).await {
                            return Ok(None);
                        }
                    }
                    None => {
                        error!(attempt, error = %e, call = what, "max retries exceeded");
                        return Err(e);
                    }
                }
            }
            Err(e) => return Err(e),
        }
    }
}
