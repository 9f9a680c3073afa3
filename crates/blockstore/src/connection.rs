//! Connection manager: endpoint, access token and the lazily dialled transport.
//!
//! The transport is dialled on first use and cached for the manager's lifetime. A failed
//! dial is not cached; the next call dials again. Concurrent first calls are serialized by
//! the cell, so at most one transport is ever stored.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::OnceCell;
use url::Url;

use crate::checkpoint::Checkpoint;
use crate::config::ConsumerConfig;
use crate::consumer::{Consumer, ConsumerIdentity};
use crate::error::{BlockStoreError, Result};
use crate::proto::{
    Block, BlockHeader, BlockRangeContinuousReply, BlockRangeContinuousRequest,
    BlocksByNumberReply, BlocksByNumberRequest, CommitReply, CommitRequest, LastCommitReply,
    LastCommitRequest, LatestBlockHeaderReply, LatestBlockHeaderRequest, NextReply, NextRequest,
    SeekReply, SeekRequest,
};
use crate::transport::{method, Transport, TransportMode};

/// The cursor operations a [Consumer] needs from the block store.
#[async_trait]
pub trait BlockStore: Send + Sync {
    /// Access token identifying the user to the block store.
    fn token(&self) -> &str;

    async fn next(&self, consumer: &ConsumerIdentity, batch_size: u64) -> Result<NextReply>;

    async fn commit(&self, consumer: &ConsumerIdentity, block: BlockHeader) -> Result<()>;

    async fn seek(&self, consumer: &ConsumerIdentity, block_height: u64) -> Result<()>;

    async fn last_commit(&self, consumer: &ConsumerIdentity) -> Result<Checkpoint>;

    async fn latest_block_header(&self, blockchain_id: &str) -> Result<BlockHeader>;
}

#[derive(Debug)]
pub struct ConnectionManager {
    url: String,
    token: String,
    mode: TransportMode,
    transport: OnceCell<Transport>,
}

impl ConnectionManager {
    /// Manager for `url`. A non-empty last path segment is taken as the access token, so
    /// `https://host/<token>` carries both address and token.
    pub fn new(url: impl Into<String>, mode: TransportMode) -> Result<Self> {
        let url = url.into();
        let token = token_from_url(&url)?;
        Ok(Self::with_token(url, token, mode))
    }

    /// Manager with an explicit token; the URL is not parsed (use for bare `host:port`).
    pub fn with_token(url: impl Into<String>, token: impl Into<String>, mode: TransportMode) -> Self {
        Self {
            url: url.into(),
            token: token.into(),
            mode,
            transport: OnceCell::new(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn mode(&self) -> TransportMode {
        self.mode
    }

    /// The cached transport, dialled on first call.
    pub async fn transport(&self) -> Result<&Transport> {
        self.transport
            .get_or_try_init(|| async {
                tracing::debug!(url = %self.url, mode = ?self.mode, "connecting to block store");
                Transport::dial(self.mode, &self.url).await.map_err(|e| match e {
                    BlockStoreError::Connection(_) => e,
                    other => BlockStoreError::Connection(other.to_string()),
                })
            })
            .await
    }

    /// Consumer sharing this manager.
    pub fn consumer(self: &Arc<Self>, config: ConsumerConfig) -> Result<Consumer<ConnectionManager>> {
        Consumer::new(Arc::clone(self), config)
    }

    pub async fn next(&self, consumer: &ConsumerIdentity, batch_size: u64) -> Result<NextReply> {
        let request = NextRequest {
            consumer: Some(consumer.into()),
            batch_size,
        };
        self.transport().await?.invoke(method::NEXT, request).await
    }

    pub async fn commit(&self, consumer: &ConsumerIdentity, block: BlockHeader) -> Result<()> {
        let request = CommitRequest {
            consumer: Some(consumer.into()),
            block: Some(block),
        };
        let _: CommitReply = self.transport().await?.invoke(method::COMMIT, request).await?;
        Ok(())
    }

    pub async fn seek(&self, consumer: &ConsumerIdentity, block_height: u64) -> Result<()> {
        let request = SeekRequest {
            consumer: Some(consumer.into()),
            block_height,
        };
        let _: SeekReply = self.transport().await?.invoke(method::SEEK, request).await?;
        Ok(())
    }

    pub async fn last_commit(&self, consumer: &ConsumerIdentity) -> Result<Checkpoint> {
        let request = LastCommitRequest {
            consumer: Some(consumer.into()),
        };
        let reply: LastCommitReply = self
            .transport()
            .await?
            .invoke(method::LAST_COMMIT, request)
            .await?;
        Ok(reply.into())
    }

    /// Current chain tip of `blockchain_id`.
    pub async fn latest_block_header(&self, blockchain_id: &str) -> Result<BlockHeader> {
        let request = LatestBlockHeaderRequest {
            blockchain_name: blockchain_id.to_string(),
        };
        let reply: LatestBlockHeaderReply = self
            .transport()
            .await?
            .invoke(method::LATEST_BLOCK_HEADER, request)
            .await?;
        reply.block.ok_or_else(|| {
            BlockStoreError::Decode(format!("latest block header of {} missing", blockchain_id))
        })
    }

    /// Historical blocks by height, outside any cursor.
    pub async fn blocks_by_number(
        &self,
        blockchain_id: &str,
        block_numbers: Vec<u64>,
    ) -> Result<Vec<Block>> {
        let request = BlocksByNumberRequest {
            blockchain_name: blockchain_id.to_string(),
            block_numbers,
        };
        let reply: BlocksByNumberReply = self
            .transport()
            .await?
            .invoke(method::BLOCKS_BY_NUMBER, request)
            .await?;
        Ok(reply.blocks)
    }

    /// Historical blocks in `[from_block, to_block]`, outside any cursor.
    pub async fn block_range_continuous(
        &self,
        blockchain_id: &str,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<Block>> {
        let request = BlockRangeContinuousRequest {
            blockchain_name: blockchain_id.to_string(),
            from_block,
            to_block,
        };
        let reply: BlockRangeContinuousReply = self
            .transport()
            .await?
            .invoke(method::BLOCK_RANGE_CONTINUOUS, request)
            .await?;
        Ok(reply.blocks)
    }
}

#[async_trait]
impl BlockStore for ConnectionManager {
    fn token(&self) -> &str {
        ConnectionManager::token(self)
    }

    async fn next(&self, consumer: &ConsumerIdentity, batch_size: u64) -> Result<NextReply> {
        ConnectionManager::next(self, consumer, batch_size).await
    }

    async fn commit(&self, consumer: &ConsumerIdentity, block: BlockHeader) -> Result<()> {
        ConnectionManager::commit(self, consumer, block).await
    }

    async fn seek(&self, consumer: &ConsumerIdentity, block_height: u64) -> Result<()> {
        ConnectionManager::seek(self, consumer, block_height).await
    }

    async fn last_commit(&self, consumer: &ConsumerIdentity) -> Result<Checkpoint> {
        ConnectionManager::last_commit(self, consumer).await
    }

    async fn latest_block_header(&self, blockchain_id: &str) -> Result<BlockHeader> {
        ConnectionManager::latest_block_header(self, blockchain_id).await
    }
}

/// Last path segment of `url`, empty when the path ends in `/`, has no segments, or the URL
/// cannot be a base (`host:port` parses as scheme `host` with an opaque path).
fn token_from_url(url: &str) -> Result<String> {
    let parsed = Url::parse(url)?;
    let token = parsed
        .path_segments()
        .and_then(|segments| segments.last())
        .unwrap_or_default();
    Ok(token.to_string())
}
