//! Client for consuming a remote block store as a server-tracked stream.
//!
//! - **ConnectionManager**: endpoint + access token, lazily dials and caches one [Transport]
//!   (native gRPC or the HTTP/JSON gateway).
//! - **Consumer**: named cursor on one chain. Initializes the cursor once (resume from the
//!   remote checkpoint, or seek to the configured [StartBlock]), then runs fetch → process →
//!   commit → report cycles with at-least-once delivery.

pub mod checkpoint;
pub mod config;
pub mod connection;
pub mod consumer;
pub mod error;
pub mod progress;
pub mod proto;
pub mod transport;

pub use checkpoint::Checkpoint;
pub use config::{ConsumerConfig, StartBlock, DEFAULT_BATCH_SIZE};
pub use connection::{BlockStore, ConnectionManager};
pub use consumer::{
    BlockProcessor, Consumer, ConsumerBuilder, ConsumerIdentity, Phase, EMPTY_BATCH_PAUSE,
};
pub use error::{BlockStoreError, BoxError, Result};
pub use progress::{Progress, ProgressReporter, Timings, TracingReporter};
pub use proto::{Block, BlockHeader, NextReply};
pub use transport::{http_route, method, HttpTransport, NativeTransport, Transport, TransportMode};

pub use tokio_util::sync::CancellationToken;
