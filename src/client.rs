use crate::config::SessionConfig;
use crate::error::Result;
use crate::metrics::Metrics;
use crate::session::Session;
use crate::transport::Response;
use crate::v1::ClientV1;
use crate::v2::ClientV2;
use async_trait::async_trait;
use serde_json::Value;

/// Operations available on every API version
#[async_trait]
pub trait CalamariApi: Send + Sync {
    /// The session this client sends through
    fn session(&self) -> &Session;

    /// Server and version information
    async fn info(&self) -> Result<Value>;

    /// All clusters managed by this Calamari instance
    async fn cluster_list(&self) -> Result<Value>;

    /// Log in explicitly instead of waiting for the first 403
    async fn authenticate(&self) -> Result<Response> {
        self.session().authenticate().await
    }

    /// End the server-side session
    async fn logout(&self) -> Result<Response> {
        self.session().logout().await
    }
}

/// Access to the Graphite metrics behind the same login
pub trait MetricsQuerying {
    fn metrics(&self) -> Metrics<'_>;
}

/// Client for either API version
#[derive(Debug)]
pub enum CalamariClient {
    V1(ClientV1),
    V2(ClientV2),
}

impl CalamariClient {
    /// Create a v1 client
    pub fn v1(config: SessionConfig) -> Result<Self> {
        Ok(CalamariClient::V1(ClientV1::new(config)?))
    }

    /// Create a v2 client
    pub fn v2(config: SessionConfig) -> Result<Self> {
        Ok(CalamariClient::V2(ClientV2::new(config)?))
    }

    pub fn as_v1(&self) -> Option<&ClientV1> {
        match self {
            CalamariClient::V1(client) => Some(client),
            CalamariClient::V2(_) => None,
        }
    }

    pub fn as_v2(&self) -> Option<&ClientV2> {
        match self {
            CalamariClient::V2(client) => Some(client),
            CalamariClient::V1(_) => None,
        }
    }

    pub fn api_version(&self) -> &str {
        self.session().api_version()
    }
}

#[async_trait]
impl CalamariApi for CalamariClient {
    fn session(&self) -> &Session {
        match self {
            CalamariClient::V1(client) => client.session(),
            CalamariClient::V2(client) => client.session(),
        }
    }

    async fn info(&self) -> Result<Value> {
        match self {
            CalamariClient::V1(client) => client.info().await,
            CalamariClient::V2(client) => client.info().await,
        }
    }

    async fn cluster_list(&self) -> Result<Value> {
        match self {
            CalamariClient::V1(client) => client.cluster_list().await,
            CalamariClient::V2(client) => client.cluster_list().await,
        }
    }
}

impl MetricsQuerying for CalamariClient {
    fn metrics(&self) -> Metrics<'_> {
        match self {
            CalamariClient::V1(client) => client.metrics(),
            CalamariClient::V2(client) => client.metrics(),
        }
    }
}
