//! Wire messages of the BlockStore service.
//!
//! Each message has two encodings: protobuf (via `prost`, used by the native gRPC transport)
//! and the canonical protobuf JSON mapping (via `serde`, used by the HTTP transport):
//! lowerCamelCase field names, 64-bit integers as decimal strings, bytes as base64.
//! Decoding accepts 64-bit integers as either strings or numbers and tolerates missing fields.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A message that can travel over either transport.
pub trait WireMessage:
    prost::Message + Default + Serialize + DeserializeOwned + Send + Sync + 'static
{
}

impl<T> WireMessage for T where
    T: prost::Message + Default + Serialize + DeserializeOwned + Send + Sync + 'static
{
}

/// Server-side cursor identity.
#[derive(Clone, PartialEq, Eq, ::prost::Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BlockConsumer {
    #[prost(string, tag = "1")]
    pub consumer_name: String,
    #[prost(string, tag = "2")]
    pub user_id: String,
    #[prost(string, tag = "3")]
    pub blockchain_name: String,
}

#[derive(Clone, PartialEq, Eq, ::prost::Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BlockHeader {
    #[prost(string, tag = "1")]
    pub blockchain_name: String,
    #[prost(uint64, tag = "2")]
    #[serde(with = "json_u64")]
    pub block_height: u64,
    #[prost(bytes = "vec", tag = "3")]
    #[serde(with = "json_bytes")]
    pub block_hash: Vec<u8>,
    #[prost(bytes = "vec", tag = "4")]
    #[serde(with = "json_bytes")]
    pub parent_hash: Vec<u8>,
    #[prost(uint64, tag = "5")]
    #[serde(with = "json_u64")]
    pub timestamp: u64,
}

impl BlockHeader {
    pub fn hash_hex(&self) -> String {
        hex::encode(&self.block_hash)
    }
}

#[derive(Clone, PartialEq, Eq, ::prost::Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Block {
    #[prost(message, optional, tag = "1")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<BlockHeader>,
    /// Raw chain-specific transactions.
    #[prost(bytes = "vec", repeated, tag = "2")]
    #[serde(with = "json_bytes_vec")]
    pub transactions: Vec<Vec<u8>>,
}

impl Block {
    /// Height of the block, 0 when the header is absent.
    pub fn height(&self) -> u64 {
        self.header.as_ref().map_or(0, |h| h.block_height)
    }
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NextRequest {
    #[prost(message, optional, tag = "1")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consumer: Option<BlockConsumer>,
    #[prost(uint64, tag = "2")]
    #[serde(with = "json_u64")]
    pub batch_size: u64,
}

/// One batch from the consumer's cursor.
#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NextReply {
    #[prost(message, repeated, tag = "1")]
    pub blocks: Vec<Block>,
    /// The blocks replace previously delivered blocks at overlapping heights.
    #[prost(bool, tag = "2")]
    pub is_reorg: bool,
    /// Header to commit once the batch is processed.
    #[prost(message, optional, tag = "3")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit: Option<BlockHeader>,
    /// Chain tip at the time of the reply.
    #[prost(message, optional, tag = "4")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest: Option<BlockHeader>,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CommitRequest {
    #[prost(message, optional, tag = "1")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consumer: Option<BlockConsumer>,
    #[prost(message, optional, tag = "2")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block: Option<BlockHeader>,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
pub struct CommitReply {}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SeekRequest {
    #[prost(message, optional, tag = "1")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consumer: Option<BlockConsumer>,
    #[prost(uint64, tag = "2")]
    #[serde(with = "json_u64")]
    pub block_height: u64,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
pub struct SeekReply {}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LastCommitRequest {
    #[prost(message, optional, tag = "1")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consumer: Option<BlockConsumer>,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LastCommitReply {
    #[prost(bool, tag = "1")]
    pub exists: bool,
    #[prost(uint64, tag = "2")]
    #[serde(with = "json_u64")]
    pub block_height: u64,
    #[prost(bytes = "vec", tag = "3")]
    #[serde(with = "json_bytes")]
    pub block_hash: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LatestBlockHeaderRequest {
    #[prost(string, tag = "1")]
    pub blockchain_name: String,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LatestBlockHeaderReply {
    #[prost(message, optional, tag = "1")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block: Option<BlockHeader>,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BlocksByNumberRequest {
    #[prost(string, tag = "1")]
    pub blockchain_name: String,
    #[prost(uint64, repeated, tag = "2")]
    #[serde(with = "json_u64_vec")]
    pub block_numbers: Vec<u64>,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BlocksByNumberReply {
    #[prost(message, repeated, tag = "1")]
    pub blocks: Vec<Block>,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BlockRangeContinuousRequest {
    #[prost(string, tag = "1")]
    pub blockchain_name: String,
    #[prost(uint64, tag = "2")]
    #[serde(with = "json_u64")]
    pub from_block: u64,
    #[prost(uint64, tag = "3")]
    #[serde(with = "json_u64")]
    pub to_block: u64,
}

#[derive(Clone, PartialEq, ::prost::Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BlockRangeContinuousReply {
    #[prost(message, repeated, tag = "1")]
    pub blocks: Vec<Block>,
}

/// Error envelope of the HTTP gateway.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorMessage {
    pub message: String,
}

/// 64-bit integers are strings in protobuf JSON; numbers are accepted on input.
#[derive(Deserialize)]
#[serde(untagged)]
enum U64Repr {
    Text(String),
    Number(u64),
}

impl U64Repr {
    fn into_u64<E: serde::de::Error>(self) -> Result<u64, E> {
        match self {
            U64Repr::Text(s) => s.parse().map_err(E::custom),
            U64Repr::Number(n) => Ok(n),
        }
    }
}

fn decode_base64<E: serde::de::Error>(s: &str) -> Result<Vec<u8>, E> {
    use base64::engine::general_purpose::{STANDARD, URL_SAFE};
    use base64::Engine as _;
    STANDARD
        .decode(s)
        .or_else(|_| URL_SAFE.decode(s))
        .map_err(E::custom)
}

fn encode_base64(bytes: &[u8]) -> String {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    STANDARD.encode(bytes)
}

mod json_u64 {
    use super::U64Repr;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        U64Repr::deserialize(deserializer)?.into_u64()
    }
}

mod json_u64_vec {
    use super::U64Repr;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(values: &[u64], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(values.iter().map(u64::to_string))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u64>, D::Error> {
        Vec::<U64Repr>::deserialize(deserializer)?
            .into_iter()
            .map(U64Repr::into_u64)
            .collect()
    }
}

mod json_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::encode_base64(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        super::decode_base64(&s)
    }
}

mod json_bytes_vec {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(values: &[Vec<u8>], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(values.iter().map(|v| super::encode_base64(v)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<Vec<u8>>, D::Error> {
        Vec::<String>::deserialize(deserializer)?
            .iter()
            .map(|s| super::decode_base64(s))
            .collect()
    }
}
