//! Consumer: a server-tracked cursor over one chain.
//!
//! On first use the consumer makes sure its cursor exists on the block store (resume from the
//! remote checkpoint, or seek to the configured start block). After that each
//! [Consumer::process] call runs one cycle: fetch a batch, hand it to the [BlockProcessor],
//! commit the batch's header, report progress. The remote checkpoint is the only state that
//! survives a restart, so a batch whose commit failed is delivered again.
//!
//! `process` takes `&mut self`: one caller per consumer, cycles strictly sequential.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;

use crate::checkpoint::Checkpoint;
use crate::config::{ConsumerConfig, StartBlock, DEFAULT_BATCH_SIZE};
use crate::connection::{BlockStore, ConnectionManager};
use crate::error::{BlockStoreError, BoxError, Result};
use crate::progress::{Progress, ProgressReporter, Timings};
use crate::proto::{Block, BlockConsumer, BlockHeader, NextReply};

/// Pause after an empty batch before `process` returns.
pub const EMPTY_BATCH_PAUSE: Duration = Duration::from_secs(1);

/// Handles each delivered batch. With `is_reorg` the blocks replace previously delivered
/// blocks at the same heights and the processor must reconcile (e.g. revert what it applied).
/// A batch can be delivered twice if its commit failed, so processing must be idempotent.
pub trait BlockProcessor: Send {
    fn process(&mut self, blocks: &[Block], is_reorg: bool) -> Result<(), BoxError>;
}

impl<F> BlockProcessor for F
where
    F: FnMut(&[Block], bool) -> Result<(), BoxError> + Send,
{
    fn process(&mut self, blocks: &[Block], is_reorg: bool) -> Result<(), BoxError> {
        self(blocks, is_reorg)
    }
}

/// Identifies one server-side cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerIdentity {
    pub consumer_id: String,
    pub blockchain_id: String,
    pub user_token: String,
}

impl From<&ConsumerIdentity> for BlockConsumer {
    fn from(id: &ConsumerIdentity) -> Self {
        BlockConsumer {
            consumer_name: id.consumer_id.clone(),
            user_id: id.user_token.clone(),
            blockchain_name: id.blockchain_id.clone(),
        }
    }
}

/// Cursor initialization state. Moves to `Active` once and never back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    Active,
}

pub struct Consumer<S = ConnectionManager> {
    store: Arc<S>,
    identity: ConsumerIdentity,
    config: ConsumerConfig,
    phase: Phase,
    uncommitted: Option<BlockHeader>,
}

impl<S: BlockStore> Consumer<S> {
    pub fn new(store: Arc<S>, config: ConsumerConfig) -> Result<Self> {
        config.validate()?;
        let identity = ConsumerIdentity {
            consumer_id: config.consumer_id.clone(),
            blockchain_id: config.blockchain_id.clone(),
            user_token: store.token().to_string(),
        };
        Ok(Self {
            store,
            identity,
            config,
            phase: Phase::Uninitialized,
            uncommitted: None,
        })
    }

    pub fn identity(&self) -> &ConsumerIdentity {
        &self.identity
    }

    pub fn config(&self) -> &ConsumerConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_initialized(&self) -> bool {
        self.phase == Phase::Active
    }

    /// Header of the latest batch if it was processed but its commit failed. Cleared when the
    /// next non-empty batch arrives.
    pub fn uncommitted(&self) -> Option<&BlockHeader> {
        self.uncommitted.as_ref()
    }

    pub async fn last_commit(&self) -> Result<Checkpoint> {
        self.store.last_commit(&self.identity).await
    }

    /// Whether the block store has a checkpoint for this consumer.
    pub async fn exists(&self) -> Result<bool> {
        Ok(self.last_commit().await?.exists)
    }

    /// Move the remote cursor to `block_height`.
    pub async fn seek(&self, block_height: u64) -> Result<()> {
        self.store.seek(&self.identity, block_height).await
    }

    pub async fn commit(&self, block: &BlockHeader) -> Result<()> {
        self.store.commit(&self.identity, block.clone()).await
    }

    /// Fetch the next batch, initializing the cursor first if needed.
    pub async fn next(&mut self) -> Result<NextReply> {
        self.initialize().await?;
        self.store.next(&self.identity, self.config.batch_size).await
    }

    async fn initialize(&mut self) -> Result<()> {
        if self.phase == Phase::Active {
            return Ok(());
        }
        let checkpoint = self.last_commit().await?;
        if checkpoint.exists {
            tracing::debug!(
                consumer = %self.identity.consumer_id,
                height = checkpoint.block_height,
                "resuming from remote checkpoint"
            );
        } else {
            let height = match self.config.start_block {
                StartBlock::Origin => 0,
                StartBlock::Height(h) => h,
                StartBlock::Latest => {
                    let tip = self
                        .store
                        .latest_block_header(&self.identity.blockchain_id)
                        .await?;
                    tip.block_height.saturating_sub(1)
                }
            };
            tracing::info!(
                consumer = %self.identity.consumer_id,
                chain = %self.identity.blockchain_id,
                height,
                "no checkpoint, seeking"
            );
            self.seek(height).await?;
        }
        self.phase = Phase::Active;
        Ok(())
    }

    /// One fetch → process → commit → report cycle. Returns the delivered blocks (empty after
    /// the empty-batch pause). Cancelling `cancel` aborts any in-flight call with
    /// [BlockStoreError::Cancelled].
    pub async fn process(&mut self, cancel: &CancellationToken) -> Result<Vec<Block>> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(BlockStoreError::Cancelled),
            result = self.cycle() => result,
        }
    }

    /// Repeat [Consumer::process] in the caller's task until `cancel` fires (`Ok`) or a cycle
    /// fails (that error).
    pub async fn run_until_cancelled(&mut self, cancel: &CancellationToken) -> Result<()> {
        loop {
            match self.process(cancel).await {
                Ok(_) => {}
                Err(BlockStoreError::Cancelled) if cancel.is_cancelled() => return Ok(()),
                Err(e) => return Err(e),
            }
        }
    }

    async fn cycle(&mut self) -> Result<Vec<Block>> {
        let mut timings = Timings::default();
        let started = Instant::now();
        let batch = self.next().await?;
        if batch.blocks.is_empty() {
            tracing::debug!(consumer = %self.identity.consumer_id, "empty batch, pausing");
            sleep(EMPTY_BATCH_PAUSE).await;
            return Ok(batch.blocks);
        }
        timings.fetch = started.elapsed();

        let NextReply {
            blocks,
            is_reorg,
            commit,
            latest,
        } = batch;
        let commit = commit
            .ok_or_else(|| BlockStoreError::Decode("next reply has no commit header".into()))?;
        let latest = latest
            .ok_or_else(|| BlockStoreError::Decode("next reply has no latest header".into()))?;

        // A new batch supersedes whatever an earlier failed commit left behind.
        self.uncommitted = None;
        let started = Instant::now();
        self.config
            .processor
            .process(&blocks, is_reorg)
            .map_err(BlockStoreError::Processor)?;
        timings.process = started.elapsed();

        self.uncommitted = Some(commit.clone());
        let started = Instant::now();
        if let Err(e) = self.commit(&commit).await {
            tracing::warn!(
                reason = %e,
                consumer = %self.identity.consumer_id,
                height = commit.block_height,
                "batch processed but not committed"
            );
            return Err(e);
        }
        self.uncommitted = None;
        timings.commit = started.elapsed();

        if let Some(reporter) = self.config.reporter.as_mut() {
            let progress = Progress {
                blocks: &blocks,
                is_reorg,
                timings: &timings,
                lag: latest.block_height.saturating_sub(commit.block_height),
                latest: &latest,
            };
            reporter
                .report(&progress)
                .map_err(BlockStoreError::Reporter)?;
        }
        Ok(blocks)
    }
}

/// Builder for a consumer.
pub struct ConsumerBuilder {
    consumer_id: Option<String>,
    blockchain_id: Option<String>,
    batch_size: u64,
    start_block: StartBlock,
    processor: Option<Box<dyn BlockProcessor>>,
    reporter: Option<Box<dyn ProgressReporter>>,
}

impl ConsumerBuilder {
    pub fn new() -> Self {
        Self {
            consumer_id: None,
            blockchain_id: None,
            batch_size: DEFAULT_BATCH_SIZE,
            start_block: StartBlock::default(),
            processor: None,
            reporter: None,
        }
    }

    pub fn consumer_id(mut self, id: impl Into<String>) -> Self {
        self.consumer_id = Some(id.into());
        self
    }

    pub fn blockchain_id(mut self, id: impl Into<String>) -> Self {
        self.blockchain_id = Some(id.into());
        self
    }

    pub fn batch_size(mut self, n: u64) -> Self {
        self.batch_size = n;
        self
    }

    /// Accepts a [StartBlock] or a numeric height (`0` = origin, `u64::MAX` = latest).
    pub fn start_block(mut self, start: impl Into<StartBlock>) -> Self {
        self.start_block = start.into();
        self
    }

    pub fn processor(mut self, p: impl BlockProcessor + 'static) -> Self {
        self.processor = Some(Box::new(p));
        self
    }

    pub fn reporter(mut self, r: impl ProgressReporter + 'static) -> Self {
        self.reporter = Some(Box::new(r));
        self
    }

    pub fn config(self) -> Result<ConsumerConfig> {
        let consumer_id = self
            .consumer_id
            .ok_or_else(|| BlockStoreError::Config("consumer_id required".into()))?;
        let blockchain_id = self
            .blockchain_id
            .ok_or_else(|| BlockStoreError::Config("blockchain_id required".into()))?;
        let processor = self
            .processor
            .ok_or_else(|| BlockStoreError::Config("processor required".into()))?;
        let config = ConsumerConfig {
            consumer_id,
            blockchain_id,
            batch_size: self.batch_size,
            start_block: self.start_block,
            processor,
            reporter: self.reporter,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn build<S: BlockStore>(self, store: Arc<S>) -> Result<Consumer<S>> {
        Consumer::new(store, self.config()?)
    }
}

impl Default for ConsumerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
