//! Native gRPC transport: method names are gRPC paths, requests go out unchanged.

use http::uri::PathAndQuery;
use tonic::client::Grpc;
use tonic::codec::ProstCodec;
use tonic::transport::{Channel, Endpoint};

use crate::error::{BlockStoreError, Result};
use crate::proto::WireMessage;

/// Largest reply the client accepts (100 MiB): batches of full blocks get big.
pub const MAX_DECODING_MESSAGE_SIZE: usize = 104_857_600;

#[derive(Debug, Clone)]
pub struct NativeTransport {
    channel: Channel,
}

impl NativeTransport {
    /// Connect to `url`. A bare `host:port` is dialled as plaintext `http://host:port`.
    pub async fn dial(url: &str) -> Result<Self> {
        let uri = if url.contains("://") {
            url.to_string()
        } else {
            format!("http://{}", url)
        };
        let endpoint = Endpoint::from_shared(uri)
            .map_err(|e| BlockStoreError::Connection(format!("{}: {}", url, e)))?;
        tracing::debug!(%url, "dialing block store over gRPC");
        let channel = endpoint
            .connect()
            .await
            .map_err(|e| BlockStoreError::Connection(format!("{}: {}", url, e)))?;
        Ok(Self { channel })
    }

    /// Wrap an existing channel.
    pub fn from_channel(channel: Channel) -> Self {
        Self { channel }
    }

    pub async fn invoke<Req, Rep>(&self, method: &str, request: Req) -> Result<Rep>
    where
        Req: WireMessage,
        Rep: WireMessage,
    {
        let path = PathAndQuery::try_from(method)
            .map_err(|_| BlockStoreError::UnsupportedMethod(method.to_string()))?;
        tracing::debug!(method, "grpc invoke");

        let mut grpc =
            Grpc::new(self.channel.clone()).max_decoding_message_size(MAX_DECODING_MESSAGE_SIZE);
        grpc.ready().await?;
        let codec: ProstCodec<Req, Rep> = ProstCodec::default();
        let response = grpc
            .unary(tonic::Request::new(request), path, codec)
            .await?;
        Ok(response.into_inner())
    }
}
