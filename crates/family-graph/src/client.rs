//! Neo4j connection management and shared graph client.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use family_core::Settings;
use neo4rs::{ConfigBuilder, Graph, Query};

/// Errors from graph operations.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("Neo4j connection error: {0}")]
    Connection(String),

    #[error("Neo4j query error: {0}")]
    Query(neo4rs::Error),

    #[error("Person not found: {id}")]
    NotFound { id: String },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<neo4rs::Error> for GraphError {
    fn from(e: neo4rs::Error) -> Self {
        match e {
            neo4rs::Error::IOError { .. }
            | neo4rs::Error::ConnectionError
            | neo4rs::Error::AuthenticationError(_) => Self::Connection(e.to_string()),
            other => Self::Query(other),
        }
    }
}

/// Configuration for connecting to Neo4j.
#[derive(Debug, Clone)]
pub struct GraphConfig {
    /// One URI per replica; operations are spread across them round-robin.
    pub uris: Vec<String>,
    pub user: String,
    pub password: String,
    pub max_connections: u32,
    pub fetch_size: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            uris: vec!["bolt://localhost:7687".to_string()],
            user: "neo4j".to_string(),
            password: "family-dev".to_string(),
            max_connections: 16,
            fetch_size: 256,
        }
    }
}

impl GraphConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            uris: settings.graph_hosts(),
            user: settings.graph_user.clone(),
            password: settings.graph_password.clone(),
            ..Default::default()
        }
    }
}

/// Thread-safe Neo4j graph client with connection pooling.
///
/// Clone is cheap (inner Arc). Each operation runs in its own
/// auto-committed transaction or an explicit one scoped to the call.
#[derive(Clone)]
pub struct GraphClient {
    graphs: Arc<Vec<Graph>>,
    next: Arc<AtomicUsize>,
}

impl GraphClient {
    /// Connect to every configured Neo4j host and verify the first one answers.
    pub async fn connect(config: &GraphConfig) -> Result<Self, GraphError> {
        if config.uris.is_empty() {
            return Err(GraphError::Connection("no graph hosts configured".to_string()));
        }

        let mut graphs = Vec::with_capacity(config.uris.len());
        for uri in &config.uris {
            let neo_config = ConfigBuilder::default()
                .uri(uri)
                .user(&config.user)
                .password(&config.password)
                .max_connections(config.max_connections as usize)
                .fetch_size(config.fetch_size)
                .build()
                .map_err(|e| GraphError::Connection(e.to_string()))?;

            let graph = Graph::connect(neo_config).await.map_err(|e| {
                tracing::error!(uri = %uri, error = %e, "Unable to create connection");
                GraphError::Connection(e.to_string())
            })?;
            graphs.push(graph);
        }

        let client = Self {
            graphs: Arc::new(graphs),
            next: Arc::new(AtomicUsize::new(0)),
        };

        let row = client
            .query_one(neo4rs::query("CALL db.labels() YIELD label RETURN collect(label) AS labels"))
            .await
            .map_err(|e| GraphError::Connection(e.to_string()))?;
        let labels: Vec<String> = row
            .and_then(|r| r.get::<Vec<String>>("labels").ok())
            .unwrap_or_default();
        tracing::debug!(?labels, "Received schema labels from Neo4j");

        tracing::info!(hosts = config.uris.len(), "Connected to Neo4j");
        Ok(client)
    }

    /// The graph handle for the next operation.
    fn graph(&self) -> &Graph {
        let i = self.next.fetch_add(1, Ordering::Relaxed) % self.graphs.len();
        &self.graphs[i]
    }

    /// Execute a write-only query (CREATE, MERGE, DELETE, SET).
    pub async fn run(&self, query: Query) -> Result<(), GraphError> {
        self.graph().run(query).await?;
        Ok(())
    }

    /// Execute a read query and collect all rows.
    pub async fn query_rows(&self, query: Query) -> Result<Vec<neo4rs::Row>, GraphError> {
        let mut stream = self.graph().execute(query).await?;
        let mut rows = Vec::new();
        while let Some(row) = stream.next().await? {
            rows.push(row);
        }
        Ok(rows)
    }

    /// Execute a read query and return the first row, if any.
    pub async fn query_one(&self, query: Query) -> Result<Option<neo4rs::Row>, GraphError> {
        let mut stream = self.graph().execute(query).await?;
        Ok(stream.next().await?)
    }

    /// Begin a transaction.
    pub async fn start_txn(&self) -> Result<neo4rs::Txn, GraphError> {
        Ok(self.graph().start_txn().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_settings_splits_hosts() {
        let settings = Settings {
            graph_hosts: "bolt://a:7687,bolt://b:7687".to_string(),
            graph_user: "family".to_string(),
            ..Settings::default()
        };
        let config = GraphConfig::from_settings(&settings);
        assert_eq!(config.uris, vec!["bolt://a:7687", "bolt://b:7687"]);
        assert_eq!(config.user, "family");
        assert_eq!(config.max_connections, 16);
    }

    #[test]
    fn test_driver_errors_classified() {
        let io = neo4rs::Error::IOError {
            detail: std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by peer"),
        };
        assert!(matches!(GraphError::from(io), GraphError::Connection(_)));
        assert!(matches!(
            GraphError::from(neo4rs::Error::ConnectionError),
            GraphError::Connection(_)
        ));
        assert!(matches!(
            GraphError::from(neo4rs::Error::UnexpectedMessage("FAILURE".to_string())),
            GraphError::Query(_)
        ));
    }

    #[tokio::test]
    async fn test_connect_without_hosts_fails() {
        let config = GraphConfig {
            uris: Vec::new(),
            ..Default::default()
        };
        let err = GraphClient::connect(&config).await.err().unwrap();
        assert!(matches!(err, GraphError::Connection(_)));
    }
}
