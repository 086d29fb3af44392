//! gRPC transport to the query agent
//!
//! Wraps the generated service client behind the [`AgentTransport`] trait so
//! connection pooling and the backend itself can be exercised against an
//! in-memory fake. TLS is enabled for `https` addresses and port 443.

use async_trait::async_trait;
use tonic::metadata::AsciiMetadataValue;
use tonic::transport::{Channel, ClientTlsConfig, Endpoint};
use url::Url;

use crate::backend::BackendError;

use super::pb;
use super::pb::query_agent_client::QueryAgentClient;

/// Metadata key carrying the bearer token on every agent call.
const AUTH_METADATA_KEY: &str = "quarry-auth-token";

/// The unary calls the query agent service exposes.
#[async_trait]
pub trait AgentTransport: Send + Sync {
    async fn create_connection(
        &self,
        request: pb::ConnectionRequest,
    ) -> Result<pb::ConnectionResponse, BackendError>;

    async fn execute_query(&self, query: pb::Query) -> Result<pb::QueryResult, BackendError>;

    async fn disconnect_connection(
        &self,
        request: pb::DisconnectRequest,
    ) -> Result<(), BackendError>;
}

/// Channel-backed transport talking to a real query agent.
pub struct GrpcAgentClient {
    client: QueryAgentClient<Channel>,
    auth_token: Option<AsciiMetadataValue>,
}

impl GrpcAgentClient {
    /// Connect to the agent at `address`, negotiating TLS when the address
    /// uses `https` or port 443.
    pub async fn connect(address: &str, auth_token: Option<&str>) -> Result<Self, BackendError> {
        let auth_token = auth_token
            .map(|token| {
                token
                    .parse::<AsciiMetadataValue>()
                    .map_err(|_| BackendError::InvalidAuthToken)
            })
            .transpose()?;

        let mut endpoint = Endpoint::from_shared(address.to_owned())?;
        if wants_tls(address) {
            endpoint = endpoint.tls_config(ClientTlsConfig::new().with_native_roots())?;
        }
        let channel = endpoint.connect().await?;
        tracing::debug!(address, "connected to query agent");
        Ok(GrpcAgentClient {
            client: QueryAgentClient::new(channel),
            auth_token,
        })
    }

    fn request<T>(&self, message: T) -> tonic::Request<T> {
        let mut request = tonic::Request::new(message);
        if let Some(token) = &self.auth_token {
            request.metadata_mut().insert(AUTH_METADATA_KEY, token.clone());
        }
        request
    }
}

fn wants_tls(address: &str) -> bool {
    match Url::parse(address) {
        Ok(url) => url.scheme() == "https" || url.port() == Some(443),
        Err(_) => false,
    }
}

#[async_trait]
impl AgentTransport for GrpcAgentClient {
    async fn create_connection(
        &self,
        request: pb::ConnectionRequest,
    ) -> Result<pb::ConnectionResponse, BackendError> {
        let mut client = self.client.clone();
        let response = client.create_connection(self.request(request)).await?;
        Ok(response.into_inner())
    }

    async fn execute_query(&self, query: pb::Query) -> Result<pb::QueryResult, BackendError> {
        let mut client = self.client.clone();
        let response = client.execute_query(self.request(query)).await?;
        Ok(response.into_inner())
    }

    async fn disconnect_connection(
        &self,
        request: pb::DisconnectRequest,
    ) -> Result<(), BackendError> {
        let mut client = self.client.clone();
        client.disconnect_connection(self.request(request)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wants_tls() {
        assert!(wants_tls("https://agent.quarry.dev"));
        assert!(wants_tls("http://agent.internal:443"));
        assert!(!wants_tls("http://localhost:50051"));
        assert!(!wants_tls("not a url"));
    }
}
