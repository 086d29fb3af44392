//! Agent connection pooling
//!
//! Two memoizing registries: [`AgentPool`] caches one transport per agent
//! address, and [`AgentConnections`] caches one remote connection id per
//! connection-request fingerprint. Both use per-key create-once guards so a
//! concurrent first use cannot open duplicate channels or remote
//! connections.

use std::collections::HashMap;
use std::sync::Arc;

use prost::Message;
use tokio::sync::{Mutex, OnceCell};

use crate::backend::BackendError;

use super::client::{AgentTransport, GrpcAgentClient};
use super::pb;

/// Transport pool keyed by agent address.
///
/// Create one per process, share it by reference, and call
/// [`close_all`](AgentPool::close_all) on shutdown.
#[derive(Default)]
pub struct AgentPool {
    clients: Mutex<HashMap<String, Arc<OnceCell<Arc<AgentConnections>>>>>,
}

impl AgentPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// The connection registry for the agent at `address`, connecting on
    /// first use.
    pub async fn connections(
        &self,
        address: &str,
        auth_token: Option<&str>,
    ) -> Result<Arc<AgentConnections>, BackendError> {
        let cell = {
            let mut clients = self.clients.lock().await;
            clients
                .entry(address.to_owned())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };
        // Initialize outside the map lock so a slow dial does not stall
        // lookups for other addresses.
        cell.get_or_try_init(|| async {
            let transport = GrpcAgentClient::connect(address, auth_token).await?;
            Ok(Arc::new(AgentConnections::new(Arc::new(transport))))
        })
        .await
        .cloned()
    }

    /// Close every remote connection in the pool, collecting the ids that
    /// failed to disconnect.
    pub async fn close_all(&self) -> Result<(), BackendError> {
        let cells: Vec<_> = self.clients.lock().await.drain().map(|(_, c)| c).collect();
        let mut failed = Vec::new();
        for cell in cells {
            if let Some(connections) = cell.get() {
                if let Err(BackendError::Disconnect { connection_ids }) =
                    connections.close_all().await
                {
                    failed.extend(connection_ids);
                }
            }
        }
        if failed.is_empty() {
            Ok(())
        } else {
            Err(BackendError::Disconnect {
                connection_ids: failed,
            })
        }
    }
}

/// Remote connections on a single agent, keyed by the encoded connection
/// request so identical credentials share one connection.
pub struct AgentConnections {
    transport: Arc<dyn AgentTransport>,
    connections: Mutex<HashMap<Vec<u8>, Arc<OnceCell<String>>>>,
}

impl AgentConnections {
    pub fn new(transport: Arc<dyn AgentTransport>) -> Self {
        AgentConnections {
            transport,
            connections: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn transport(&self) -> Arc<dyn AgentTransport> {
        self.transport.clone()
    }

    /// The remote connection id for `request`, creating the connection on
    /// first use.
    pub async fn connect(&self, request: pb::ConnectionRequest) -> Result<String, BackendError> {
        let key = request.encode_to_vec();
        let cell = {
            let mut connections = self.connections.lock().await;
            connections
                .entry(key)
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };
        cell.get_or_try_init(|| async {
            let response = self.transport.create_connection(request.clone()).await?;
            tracing::debug!(connection_id = %response.connection_id, "opened agent connection");
            Ok(response.connection_id)
        })
        .await
        .cloned()
    }

    /// Disconnect every open connection, collecting the ids that failed.
    pub async fn close_all(&self) -> Result<(), BackendError> {
        let cells: Vec<_> = self
            .connections
            .lock()
            .await
            .drain()
            .map(|(_, c)| c)
            .collect();
        let mut failed = Vec::new();
        for cell in cells {
            if let Some(id) = cell.get() {
                let request = pb::DisconnectRequest {
                    connection_id: id.clone(),
                };
                if let Err(e) = self.transport.disconnect_connection(request).await {
                    tracing::warn!(connection_id = %id, error = %e, "failed to disconnect");
                    failed.push(id.clone());
                }
            }
        }
        if failed.is_empty() {
            Ok(())
        } else {
            Err(BackendError::Disconnect {
                connection_ids: failed,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeTransport {
        created: AtomicUsize,
        disconnected: AtomicUsize,
        fail_disconnect: bool,
    }

    impl FakeTransport {
        fn new() -> Self {
            FakeTransport {
                created: AtomicUsize::new(0),
                disconnected: AtomicUsize::new(0),
                fail_disconnect: false,
            }
        }
    }

    #[async_trait]
    impl AgentTransport for FakeTransport {
        async fn create_connection(
            &self,
            _request: pb::ConnectionRequest,
        ) -> Result<pb::ConnectionResponse, BackendError> {
            let n = self.created.fetch_add(1, Ordering::SeqCst);
            Ok(pb::ConnectionResponse {
                connection_id: format!("conn-{n}"),
            })
        }

        async fn execute_query(&self, _query: pb::Query) -> Result<pb::QueryResult, BackendError> {
            Ok(pb::QueryResult::default())
        }

        async fn disconnect_connection(
            &self,
            request: pb::DisconnectRequest,
        ) -> Result<(), BackendError> {
            if self.fail_disconnect {
                return Err(BackendError::Disconnect {
                    connection_ids: vec![request.connection_id],
                });
            }
            self.disconnected.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn snowflake_request(user: &str) -> pb::ConnectionRequest {
        pb::ConnectionRequest {
            connection_params: Some(
                pb::connection_request::ConnectionParams::SnowflakeConnectionParams(
                    pb::SnowflakeConnectionParams {
                        account: "acct".into(),
                        user: user.into(),
                        password: "pw".into(),
                        database: "db".into(),
                        schema: "public".into(),
                    },
                ),
            ),
        }
    }

    #[tokio::test]
    async fn test_identical_requests_share_a_connection() {
        let transport = Arc::new(FakeTransport::new());
        let connections = AgentConnections::new(transport.clone());

        let a = connections.connect(snowflake_request("alice")).await.unwrap();
        let b = connections.connect(snowflake_request("alice")).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(transport.created.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_distinct_requests_get_distinct_connections() {
        let transport = Arc::new(FakeTransport::new());
        let connections = AgentConnections::new(transport.clone());

        let a = connections.connect(snowflake_request("alice")).await.unwrap();
        let b = connections.connect(snowflake_request("bob")).await.unwrap();
        assert_ne!(a, b);
        assert_eq!(transport.created.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_concurrent_first_use_connects_once() {
        let transport = Arc::new(FakeTransport::new());
        let connections = Arc::new(AgentConnections::new(transport.clone()));

        let (a, b) = tokio::join!(
            connections.connect(snowflake_request("alice")),
            connections.connect(snowflake_request("alice")),
        );
        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(transport.created.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_close_all_disconnects_every_connection() {
        let transport = Arc::new(FakeTransport::new());
        let connections = AgentConnections::new(transport.clone());

        connections.connect(snowflake_request("alice")).await.unwrap();
        connections.connect(snowflake_request("bob")).await.unwrap();
        connections.close_all().await.unwrap();
        assert_eq!(transport.disconnected.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_close_all_collects_failed_ids() {
        let transport = Arc::new(FakeTransport {
            created: AtomicUsize::new(0),
            disconnected: AtomicUsize::new(0),
            fail_disconnect: true,
        });
        let connections = AgentConnections::new(transport);

        connections.connect(snowflake_request("alice")).await.unwrap();
        let err = connections.close_all().await;
        match err {
            Err(BackendError::Disconnect { connection_ids }) => {
                assert_eq!(connection_ids, vec!["conn-0".to_owned()]);
            }
            other => panic!("expected disconnect error, got {other:?}"),
        }
    }
}
