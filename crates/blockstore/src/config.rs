//! Consumer configuration.

use std::fmt;
use std::str::FromStr;

use crate::consumer::BlockProcessor;
use crate::error::{BlockStoreError, Result};
use crate::progress::ProgressReporter;
use crate::transport::TransportMode;

/// Batch size used when none is configured.
pub const DEFAULT_BATCH_SIZE: u64 = 50;

/// Where a consumer without a checkpoint starts reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StartBlock {
    /// Genesis (height 0).
    Origin,
    /// One block below the chain tip at initialization time.
    #[default]
    Latest,
    /// An explicit height.
    Height(u64),
}

impl StartBlock {
    /// Sentinel for [StartBlock::Origin] in numeric form.
    pub const ORIGIN: u64 = 0;
    /// Sentinel for [StartBlock::Latest] in numeric form.
    pub const LATEST: u64 = u64::MAX;
}

impl From<u64> for StartBlock {
    fn from(height: u64) -> Self {
        match height {
            Self::ORIGIN => Self::Origin,
            Self::LATEST => Self::Latest,
            h => Self::Height(h),
        }
    }
}

impl FromStr for StartBlock {
    type Err = BlockStoreError;

    /// `origin`, `latest` or a decimal height.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "origin" => Ok(Self::Origin),
            "latest" => Ok(Self::Latest),
            other => other
                .parse::<u64>()
                .map(Self::from)
                .map_err(|_| BlockStoreError::Config(format!("invalid start block {:?}", s))),
        }
    }
}

impl FromStr for TransportMode {
    type Err = BlockStoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "grpc" | "native" => Ok(Self::Native),
            "http" | "https" | "json" => Ok(Self::Http),
            _ => Err(BlockStoreError::Config(format!("unknown transport mode {:?}", s))),
        }
    }
}

/// Consumer configuration. Read-only for the consumer's lifetime.
pub struct ConsumerConfig {
    /// Name of the server-side cursor.
    pub consumer_id: String,
    /// Chain to consume (e.g. "eth").
    pub blockchain_id: String,
    /// Max blocks per `Next` call.
    pub batch_size: u64,
    /// Used only when the block store has no checkpoint for this consumer.
    pub start_block: StartBlock,
    pub processor: Box<dyn BlockProcessor>,
    pub reporter: Option<Box<dyn ProgressReporter>>,
}

impl ConsumerConfig {
    pub fn new(
        consumer_id: impl Into<String>,
        blockchain_id: impl Into<String>,
        processor: impl BlockProcessor + 'static,
    ) -> Self {
        Self {
            consumer_id: consumer_id.into(),
            blockchain_id: blockchain_id.into(),
            batch_size: DEFAULT_BATCH_SIZE,
            start_block: StartBlock::default(),
            processor: Box::new(processor),
            reporter: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.consumer_id.is_empty() {
            return Err(BlockStoreError::Config("consumer_id required".into()));
        }
        if self.blockchain_id.is_empty() {
            return Err(BlockStoreError::Config("blockchain_id required".into()));
        }
        if self.batch_size == 0 {
            return Err(BlockStoreError::Config("batch_size must be positive".into()));
        }
        Ok(())
    }
}

impl fmt::Debug for ConsumerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsumerConfig")
            .field("consumer_id", &self.consumer_id)
            .field("blockchain_id", &self.blockchain_id)
            .field("batch_size", &self.batch_size)
            .field("start_block", &self.start_block)
            .field("reporter", &self.reporter.is_some())
            .finish_non_exhaustive()
    }
}
