//! Example: follow a chain through the block store and count delivered blocks.
//!
//! Usage: cargo run -p blockstore --example consume -- --url https://host/TOKEN --chain eth
//!
//! Options:
//!   --token TOKEN       Access token (required when --url has no token path, e.g. host:port)
//!   --mode http|grpc    Transport (default http)
//!   --consumer NAME     Cursor name (default example-consumer)
//!   --batch-size N      Blocks per fetch (default 50)
//!   --start S           origin | latest | HEIGHT, used only without a checkpoint (default latest)
//!
//! Ctrl-C stops after the in-flight call is aborted.

use std::sync::Arc;

use anyhow::Context;
use blockstore::{
    Block, BoxError, BlockProcessor, CancellationToken, ConnectionManager, ConsumerBuilder,
    StartBlock, TracingReporter, TransportMode, DEFAULT_BATCH_SIZE,
};

/// Keeps a running count of blocks; a reorged batch replaces as many blocks as it carries.
struct Counter {
    total: u64,
}

impl BlockProcessor for Counter {
    fn process(&mut self, blocks: &[Block], is_reorg: bool) -> Result<(), BoxError> {
        let n = blocks.len() as u64;
        if is_reorg {
            tracing::warn!(blocks = n, "reorg");
        } else {
            self.total += n;
        }
        if let (Some(first), Some(last)) = (blocks.first(), blocks.last()) {
            println!(
                "blocks {}..={} total={} reorg={}",
                first.height(),
                last.height(),
                self.total,
                is_reorg
            );
        }
        Ok(())
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let args: Vec<String> = std::env::args().collect();
    let mut url = String::new();
    let mut token: Option<String> = None;
    let mut mode = TransportMode::Http;
    let mut consumer_id = "example-consumer".to_string();
    let mut chain = String::new();
    let mut batch_size = DEFAULT_BATCH_SIZE;
    let mut start = StartBlock::Latest;
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--url" => {
                i += 1;
                url = args.get(i).cloned().unwrap_or_default();
            }
            "--token" => {
                i += 1;
                token = args.get(i).cloned();
            }
            "--mode" => {
                i += 1;
                mode = args
                    .get(i)
                    .map(String::as_str)
                    .unwrap_or_default()
                    .parse::<TransportMode>()
                    .context("--mode")?;
            }
            "--consumer" => {
                i += 1;
                consumer_id = args.get(i).cloned().unwrap_or_default();
            }
            "--chain" => {
                i += 1;
                chain = args.get(i).cloned().unwrap_or_default();
            }
            "--batch-size" => {
                i += 1;
                batch_size = args
                    .get(i)
                    .map(String::as_str)
                    .unwrap_or_default()
                    .parse::<u64>()
                    .context("--batch-size")?;
            }
            "--start" => {
                i += 1;
                start = args
                    .get(i)
                    .map(String::as_str)
                    .unwrap_or_default()
                    .parse::<StartBlock>()
                    .context("--start")?;
            }
            _ => {}
        }
        i += 1;
    }
    if url.is_empty() || chain.is_empty() {
        eprintln!("Usage: consume --url URL --chain CHAIN [--token T] [--mode http|grpc] [--consumer NAME] [--batch-size N] [--start origin|latest|HEIGHT]");
        std::process::exit(1);
    }

    let manager = match token {
        Some(token) => ConnectionManager::with_token(url, token, mode),
        None => ConnectionManager::new(url, mode)?,
    };
    let manager = Arc::new(manager);
    let mut consumer = ConsumerBuilder::new()
        .consumer_id(consumer_id)
        .blockchain_id(chain.clone())
        .batch_size(batch_size)
        .start_block(start)
        .processor(Counter { total: 0 })
        .reporter(TracingReporter::new(chain))
        .build(manager)?;

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                trigger.cancel();
            }
        });
        consumer.run_until_cancelled(&cancel).await
    })?;
    Ok(())
}
