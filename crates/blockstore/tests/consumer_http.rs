//! End-to-end consumer cycles through the connection manager and a mocked HTTP gateway.

mod common;

use std::sync::{Arc, Mutex};

use blockstore::{
    Block, BlockProcessor, BlockStoreError, BoxError, CancellationToken, ConsumerBuilder,
    ConsumerConfig, StartBlock,
};
use mockito::{Mock, ServerGuard};
use serde_json::json;

const NEXT: &str = "/v1/multichain/consumer/next";
const COMMIT: &str = "/v1/multichain/consumer/commit";
const SEEK: &str = "/v1/multichain/consumer/seek";
const LAST_COMMIT: &str = "/v1/multichain/consumer/latest";
const LATEST_BLOCK: &str = "/v1/multichain/block/latest";

#[derive(Clone, Default)]
struct Heights(Arc<Mutex<Vec<u64>>>);

impl BlockProcessor for Heights {
    fn process(&mut self, blocks: &[Block], _is_reorg: bool) -> Result<(), BoxError> {
        self.0.lock().unwrap().extend(blocks.iter().map(Block::height));
        Ok(())
    }
}

async fn last_commit(server: &mut ServerGuard, reply: serde_json::Value) -> Mock {
    common::mock_json(
        server,
        LAST_COMMIT,
        json!({ "consumer": common::consumer_json("filtering-consumer-0") }),
        reply,
    )
    .await
}

async fn next_batch(server: &mut ServerGuard, from: u64, to: u64, tip: u64) -> Mock {
    common::mock_json(
        server,
        NEXT,
        json!({ "consumer": common::consumer_json("filtering-consumer-0"), "batchSize": "50" }),
        json!({
            "blocks": (from..=to).map(common::block).collect::<Vec<_>>(),
            "isReorg": false,
            "commit": common::header(to),
            "latest": common::header(tip),
        }),
    )
    .await
}

async fn commit(server: &mut ServerGuard, height: u64) -> Mock {
    common::mock_json(
        server,
        COMMIT,
        json!({
            "consumer": common::consumer_json("filtering-consumer-0"),
            "block": { "blockHeight": height.to_string() },
        }),
        json!({}),
    )
    .await
}

#[tokio::test]
async fn origin_consumer_seeks_genesis_then_commits_batch() {
    common::init_tracing();
    let mut server = mockito::Server::new_async().await;
    let lc = last_commit(&mut server, json!({})).await;
    let seek = common::mock_json(
        &mut server,
        SEEK,
        json!({ "consumer": common::consumer_json("filtering-consumer-0"), "blockHeight": "0" }),
        json!({}),
    )
    .await;
    let next = next_batch(&mut server, 0, 2, 10).await;
    let cm = commit(&mut server, 2).await;

    let seen = Heights::default();
    let mut consumer = ConsumerBuilder::new()
        .consumer_id("filtering-consumer-0")
        .blockchain_id("eth")
        .start_block(StartBlock::Origin)
        .processor(seen.clone())
        .build(common::manager(&server))
        .unwrap();
    let blocks = consumer.process(&CancellationToken::new()).await.unwrap();

    assert_eq!(blocks.len(), 3);
    assert_eq!(*seen.0.lock().unwrap(), vec![0, 1, 2]);
    assert!(consumer.uncommitted().is_none());
    lc.assert_async().await;
    seek.assert_async().await;
    next.assert_async().await;
    cm.assert_async().await;
}

#[tokio::test]
async fn latest_consumer_seeks_one_below_tip() {
    let mut server = mockito::Server::new_async().await;
    last_commit(&mut server, json!({ "exists": false })).await;
    let tip = common::mock_json(
        &mut server,
        LATEST_BLOCK,
        json!({ "blockchainName": "eth" }),
        json!({ "block": common::header(1000) }),
    )
    .await;
    let seek = common::mock_json(
        &mut server,
        SEEK,
        json!({ "blockHeight": "999" }),
        json!({}),
    )
    .await;
    next_batch(&mut server, 999, 1000, 1000).await;
    commit(&mut server, 1000).await;

    let manager = common::manager(&server);
    let mut consumer = manager
        .consumer(ConsumerConfig::new("filtering-consumer-0", "eth", Heights::default()))
        .unwrap();
    consumer.process(&CancellationToken::new()).await.unwrap();
    tip.assert_async().await;
    seek.assert_async().await;
}

#[tokio::test]
async fn existing_checkpoint_resumes_without_seek() {
    let mut server = mockito::Server::new_async().await;
    last_commit(
        &mut server,
        json!({ "exists": true, "blockHeight": "500", "blockHash": "q80=" }),
    )
    .await;
    let seek = server
        .mock("POST", common::path(SEEK).as_str())
        .expect(0)
        .create_async()
        .await;
    let tip = server
        .mock("POST", common::path(LATEST_BLOCK).as_str())
        .expect(0)
        .create_async()
        .await;
    next_batch(&mut server, 501, 510, 520).await;
    commit(&mut server, 510).await;

    let mut consumer = common::manager(&server)
        .consumer(ConsumerConfig::new("filtering-consumer-0", "eth", Heights::default()))
        .unwrap();
    let checkpoint = consumer.last_commit().await.unwrap();
    assert!(checkpoint.exists);
    assert_eq!(checkpoint.block_height, 500);
    assert!(consumer.exists().await.unwrap());

    consumer.process(&CancellationToken::new()).await.unwrap();
    seek.assert_async().await;
    tip.assert_async().await;
}

#[tokio::test]
async fn rejected_commit_surfaces_gateway_failure() {
    let mut server = mockito::Server::new_async().await;
    last_commit(&mut server, json!({ "exists": true, "blockHeight": "0" })).await;
    next_batch(&mut server, 1, 3, 3).await;
    server
        .mock("POST", common::path(COMMIT).as_str())
        .with_status(500)
        .with_body("not found")
        .create_async()
        .await;

    let seen = Heights::default();
    let mut consumer = common::manager(&server)
        .consumer(ConsumerConfig::new("filtering-consumer-0", "eth", seen.clone()))
        .unwrap();
    let err = consumer.process(&CancellationToken::new()).await.unwrap_err();
    match err {
        BlockStoreError::Remote(m) => {
            assert!(m.contains("500"), "{m}");
            assert!(m.contains("not found"), "{m}");
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(*seen.0.lock().unwrap(), vec![1, 2, 3]);
    assert_eq!(consumer.uncommitted().map(|h| h.block_height), Some(3));
}

#[tokio::test]
async fn historical_queries_bypass_the_cursor() {
    let mut server = mockito::Server::new_async().await;
    let by_number = common::mock_json(
        &mut server,
        "/v1/multichain/block/byNumber",
        json!({ "blockchainName": "eth", "blockNumbers": ["7", "9"] }),
        json!({ "blocks": [common::block(7), common::block(9)] }),
    )
    .await;
    let range = common::mock_json(
        &mut server,
        "/v1/multichain/block/range",
        json!({ "blockchainName": "eth", "fromBlock": "10", "toBlock": "12" }),
        json!({ "blocks": [common::block(10), common::block(11), common::block(12)] }),
    )
    .await;

    let manager = common::manager(&server);
    let blocks = manager.blocks_by_number("eth", vec![7, 9]).await.unwrap();
    assert_eq!(blocks.iter().map(Block::height).collect::<Vec<_>>(), vec![7, 9]);
    let blocks = manager.block_range_continuous("eth", 10, 12).await.unwrap();
    assert_eq!(blocks.len(), 3);
    by_number.assert_async().await;
    range.assert_async().await;
}

#[tokio::test]
async fn latest_block_header_without_block_is_a_decode_error() {
    let mut server = mockito::Server::new_async().await;
    common::mock_json(&mut server, LATEST_BLOCK, json!({}), json!({})).await;

    let res = common::manager(&server).latest_block_header("eth").await;
    assert!(matches!(res, Err(BlockStoreError::Decode(_))), "{res:?}");
}
