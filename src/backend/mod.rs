//! Query backends
//!
//! A backend turns a [`Table`](crate::table::Table) descriptor into a query
//! it can ship somewhere: the gRPC query agent or a GraphQL endpoint. The
//! [`BackendResolver`] picks one by classifying the table's source locator.

pub mod agent;
pub mod graphql;

use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use crate::config::{Config, ConfigError};
use crate::expr::Operator;
use crate::table::Table;

use agent::pb;
use agent::pool::AgentPool;
use agent::AgentBackend;
use graphql::GraphqlBackend;

/// A single result row, keyed by output field name.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Errors raised while translating an expression tree for a backend.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    /// The table has no selection to compile.
    #[error("table `{table}` has no selected fields")]
    EmptySelection { table: String },

    /// The backend has no representation for this operation at all.
    #[error("unsupported operation `{op}`")]
    UnsupportedOperation { op: Operator },

    /// The operator tag exists but this backend does not translate it.
    #[error("operator `{op}` is not handled by this backend")]
    UnhandledOperator { op: Operator },

    /// The expression shape cannot be expressed in the target query form.
    #[error("unsupported expression: {reason}")]
    UnsupportedExpression { reason: String },

    /// An operator received operands of the wrong shape.
    #[error("invalid argument to `{op}`: {reason}")]
    InvalidArgument { op: Operator, reason: String },
}

/// Errors raised while resolving, compiling against or talking to a backend.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("table `{table}` has no source locator")]
    MissingSource { table: String },

    // `source` would be picked up as the error's source by thiserror, so the
    // field carries the URL under a different name.
    #[error("no backend matches source `{source_url}`")]
    UnresolvedSource { source_url: String },

    #[error("table `{table}` has no backend resolver")]
    NoResolver { table: String },

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("auth token contains characters that cannot be sent as metadata")]
    InvalidAuthToken,

    #[error("transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    #[error("query agent call failed: {0}")]
    Rpc(#[from] tonic::Status),

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to parse backend result: {0}")]
    ResultParse(#[from] serde_json::Error),

    #[error("response carried no data for query `{query_name}`")]
    MissingData { query_name: String },

    #[error("failed to close agent connections: {connection_ids:?}")]
    Disconnect { connection_ids: Vec<String> },
}

/// A query backend: compiles and executes table queries.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Compile the query and return the backend's textual form of it
    /// without executing anything.
    async fn compile(&self, table: &Table) -> Result<String, BackendError>;

    /// Execute the query and return the result rows.
    async fn execute(&self, table: &Table) -> Result<Vec<Row>, BackendError>;
}

/// Picks a [`Backend`] for a table.
#[async_trait]
pub trait ResolveBackend: Send + Sync {
    async fn resolve(&self, table: &Table) -> Result<Arc<dyn Backend>, BackendError>;
}

/// The backend family a source locator maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceKind {
    Agent,
    Graphql,
}

/// Classify a source locator. Snowflake hosts go through the query agent;
/// `/graphql` paths go to the GraphQL backend.
fn classify(source: &str) -> Option<SourceKind> {
    let url = Url::parse(source).ok()?;
    if let Some(host) = url.host_str() {
        if host.ends_with("snowflakecomputing.com") {
            return Some(SourceKind::Agent);
        }
    }
    if url.path().ends_with("/graphql") {
        return Some(SourceKind::Graphql);
    }
    None
}

/// Standard resolver: classifies the table source and wires up the matching
/// backend from configuration, reusing agent channels through a shared pool.
pub struct BackendResolver {
    config: Config,
    pool: Arc<AgentPool>,
}

impl BackendResolver {
    pub fn new(config: Config, pool: Arc<AgentPool>) -> Self {
        BackendResolver { config, pool }
    }

    async fn resolve_agent(&self, source: &str) -> Result<Arc<dyn Backend>, BackendError> {
        let snowflake = self.config.snowflake_credentials()?;
        let token = self.config.agent_auth_token()?;
        let connections = self
            .pool
            .connections(self.config.agent_url(), Some(token.as_str()))
            .await?;
        let request = pb::ConnectionRequest {
            connection_params: Some(pb::connection_request::ConnectionParams::SnowflakeConnectionParams(
                pb::SnowflakeConnectionParams {
                    account: snowflake.account.clone(),
                    user: snowflake.user.clone(),
                    password: snowflake.password.clone(),
                    database: snowflake.database.clone(),
                    schema: snowflake.schema.clone(),
                },
            )),
        };
        let connection_id = connections.connect(request).await?;
        tracing::debug!(source, connection_id = %connection_id, "resolved agent backend");
        Ok(Arc::new(AgentBackend::new(connections, connection_id)))
    }

    fn resolve_graphql(&self, source: &str) -> Result<Arc<dyn Backend>, BackendError> {
        let token = self.config.graphql_auth_token()?;
        tracing::debug!(source, "resolved graphql backend");
        Ok(Arc::new(GraphqlBackend::new(
            source,
            token,
            self.config.graphql_timeout(),
        )))
    }
}

#[async_trait]
impl ResolveBackend for BackendResolver {
    async fn resolve(&self, table: &Table) -> Result<Arc<dyn Backend>, BackendError> {
        let source = table.source().ok_or_else(|| BackendError::MissingSource {
            table: table.name().to_owned(),
        })?;
        match classify(source) {
            Some(SourceKind::Agent) => self.resolve_agent(source).await,
            Some(SourceKind::Graphql) => self.resolve_graphql(source),
            None => Err(BackendError::UnresolvedSource {
                source_url: source.to_owned(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_snowflake_source() {
        assert_eq!(
            classify("https://org-account.snowflakecomputing.com"),
            Some(SourceKind::Agent)
        );
    }

    #[test]
    fn test_classify_graphql_source() {
        assert_eq!(
            classify("https://data.example.com/api/graphql"),
            Some(SourceKind::Graphql)
        );
    }

    #[test]
    fn test_classify_unknown_source() {
        assert_eq!(classify("https://example.com/api/rest"), None);
        assert_eq!(classify("not a url"), None);
    }

    #[test]
    fn test_unresolved_source_reports_the_url() {
        let err = BackendError::UnresolvedSource {
            source_url: "https://example.com/api/rest".to_owned(),
        };
        assert_eq!(
            err.to_string(),
            "no backend matches source `https://example.com/api/rest`"
        );
    }
}
