//! Server-owned checkpoint of a consumer (no local persistence).
//!
//! The block store is the only source of truth for the last committed position; a
//! [Checkpoint] is the answer to one `LastCommit` call and is never cached.

use crate::proto::LastCommitReply;

/// Last committed position of a consumer, as reported by the block store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Checkpoint {
    pub exists: bool,
    pub block_height: u64,
    pub block_hash: Vec<u8>,
}

impl Checkpoint {
    pub fn new(block_height: u64, block_hash: Vec<u8>) -> Self {
        Self {
            exists: true,
            block_height,
            block_hash,
        }
    }

    /// The cursor has never been committed or seeked.
    pub fn absent() -> Self {
        Self::default()
    }
}

impl From<LastCommitReply> for Checkpoint {
    fn from(reply: LastCommitReply) -> Self {
        Self {
            exists: reply.exists,
            block_height: reply.block_height,
            block_hash: reply.block_hash,
        }
    }
}
