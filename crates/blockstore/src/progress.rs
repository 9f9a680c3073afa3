//! Per-cycle timings and progress reporting.

use std::fmt;
use std::time::Duration;

use crate::error::BoxError;
use crate::proto::{Block, BlockHeader};

/// Wall time of each phase of one `process()` cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timings {
    pub fetch: Duration,
    pub process: Duration,
    pub commit: Duration,
}

impl Timings {
    pub fn fetch_ms(&self) -> u128 {
        self.fetch.as_millis()
    }

    pub fn process_ms(&self) -> u128 {
        self.process.as_millis()
    }

    pub fn commit_ms(&self) -> u128 {
        self.commit.as_millis()
    }

    pub fn total(&self) -> Duration {
        self.fetch + self.process + self.commit
    }
}

/// What a reporter sees after a batch has been committed.
#[derive(Debug, Clone, Copy)]
pub struct Progress<'a> {
    pub blocks: &'a [Block],
    pub is_reorg: bool,
    pub timings: &'a Timings,
    /// `latest.block_height - commit.block_height`.
    pub lag: u64,
    pub latest: &'a BlockHeader,
}

impl fmt::Display for Progress<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reorg = if self.is_reorg { "reorged " } else { "" };
        write!(
            f,
            "processed {} {}blocks, lag is {} blocks, fetched in {} ms, processed in {} ms, committed in {} ms",
            self.blocks.len(),
            reorg,
            self.lag,
            self.timings.fetch_ms(),
            self.timings.process_ms(),
            self.timings.commit_ms(),
        )
    }
}

/// Receives progress after every committed batch. An error aborts the cycle, but the
/// checkpoint has already advanced by then.
pub trait ProgressReporter: Send {
    fn report(&mut self, progress: &Progress<'_>) -> Result<(), BoxError>;
}

impl<F> ProgressReporter for F
where
    F: FnMut(&Progress<'_>) -> Result<(), BoxError> + Send,
{
    fn report(&mut self, progress: &Progress<'_>) -> Result<(), BoxError> {
        self(progress)
    }
}

/// Logs each committed batch at info level.
#[derive(Debug, Clone, Default)]
pub struct TracingReporter {
    blockchain: String,
}

impl TracingReporter {
    pub fn new(blockchain: impl Into<String>) -> Self {
        Self {
            blockchain: blockchain.into(),
        }
    }
}

impl ProgressReporter for TracingReporter {
    fn report(&mut self, progress: &Progress<'_>) -> Result<(), BoxError> {
        tracing::info!(
            chain = %self.blockchain,
            blocks = progress.blocks.len(),
            reorg = progress.is_reorg,
            lag = progress.lag,
            tip = progress.latest.block_height,
            total_ms = progress.timings.total().as_millis() as u64,
            "{}",
            progress
        );
        Ok(())
    }
}
