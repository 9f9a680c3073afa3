//! Transports: one call contract, two wire styles.
//!
//! - [NativeTransport] forwards calls unchanged to a gRPC channel.
//! - [HttpTransport] translates each method into a POST against the HTTP/JSON gateway.
//!
//! Method names are the canonical gRPC paths in [method]; the HTTP transport maps them to
//! gateway paths with [http_route].

mod http;
mod native;

pub use self::http::HttpTransport;
pub use self::native::NativeTransport;

use crate::error::Result;
use crate::proto::WireMessage;

/// Canonical method names of the BlockStore service.
pub mod method {
    pub const NEXT: &str = "/ankrscan.blockstore.BlockStore/Next";
    pub const COMMIT: &str = "/ankrscan.blockstore.BlockStore/Commit";
    pub const SEEK: &str = "/ankrscan.blockstore.BlockStore/Seek";
    pub const LAST_COMMIT: &str = "/ankrscan.blockstore.BlockStore/LastCommit";
    pub const BLOCKS_BY_NUMBER: &str = "/ankrscan.blockstore.BlockStore/BlocksByNumber";
    pub const LATEST_BLOCK_HEADER: &str = "/ankrscan.blockstore.BlockStore/LatestBlockHeader";
    pub const BLOCK_RANGE_CONTINUOUS: &str =
        "/ankrscan.blockstore.BlockStore/BlockRangeContinuous";
}

/// Method → HTTP gateway path. Exhaustive for every method the client issues.
const HTTP_ROUTES: [(&str, &str); 7] = [
    (method::NEXT, "/v1/multichain/consumer/next"),
    (method::COMMIT, "/v1/multichain/consumer/commit"),
    (method::SEEK, "/v1/multichain/consumer/seek"),
    (method::LAST_COMMIT, "/v1/multichain/consumer/latest"),
    (method::BLOCKS_BY_NUMBER, "/v1/multichain/block/byNumber"),
    (method::LATEST_BLOCK_HEADER, "/v1/multichain/block/latest"),
    (method::BLOCK_RANGE_CONTINUOUS, "/v1/multichain/block/range"),
];

/// HTTP gateway path for a method, `None` if the gateway does not expose it.
pub fn http_route(method: &str) -> Option<&'static str> {
    HTTP_ROUTES
        .iter()
        .find(|(name, _)| *name == method)
        .map(|(_, path)| *path)
}

/// Which transport the connection manager dials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportMode {
    /// gRPC straight to the block store.
    Native,
    /// JSON over HTTP through the gateway.
    #[default]
    Http,
}

/// A dialled transport. Selected once by [TransportMode]; reused for every call.
#[derive(Debug, Clone)]
pub enum Transport {
    Native(NativeTransport),
    Http(HttpTransport),
}

impl Transport {
    /// Dial the endpoint for the given mode.
    pub async fn dial(mode: TransportMode, url: &str) -> Result<Self> {
        match mode {
            TransportMode::Native => Ok(Self::Native(NativeTransport::dial(url).await?)),
            TransportMode::Http => Ok(Self::Http(HttpTransport::new(url)?)),
        }
    }

    pub fn mode(&self) -> TransportMode {
        match self {
            Self::Native(_) => TransportMode::Native,
            Self::Http(_) => TransportMode::Http,
        }
    }

    /// Invoke `method` with `request`, decoding the reply as `Rep`.
    pub async fn invoke<Req, Rep>(&self, method: &str, request: Req) -> Result<Rep>
    where
        Req: WireMessage,
        Rep: WireMessage,
    {
        match self {
            Self::Native(t) => t.invoke(method, request).await,
            Self::Http(t) => t.invoke(method, &request).await,
        }
    }
}
