//! Calamari v1 API: the small read-only cluster/osd/pool/server surface.

use crate::config::SessionConfig;
use crate::error::Result;
use crate::metrics::Metrics;
use crate::path::segment;
use crate::session::Session;
use crate::transport::HttpTransport;
use crate::client::MetricsQuerying;
use serde_json::Value;
use std::fmt::Display;
use std::sync::Arc;

pub const API_VERSION: &str = "v1";

/// Client for `api/v1/`.
#[derive(Debug)]
pub struct ClientV1 {
    session: Session,
}

impl ClientV1 {
    /// Create a v1 client backed by reqwest
    pub fn new(config: SessionConfig) -> Result<Self> {
        Ok(Self {
            session: Session::new(config, API_VERSION)?,
        })
    }

    /// Create a v1 client over a custom transport
    pub fn with_transport(
        host: &str,
        username: impl Into<String>,
        password: impl Into<String>,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        Self {
            session: Session::with_transport(host, username, password, API_VERSION, transport),
        }
    }

    /// The underlying session
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Server and version information
    pub async fn info(&self) -> Result<Value> {
        self.get("info").await
    }

    /// All clusters known to the server
    pub async fn cluster_list(&self) -> Result<Value> {
        self.get("cluster").await
    }

    /// Health report of a cluster
    pub async fn cluster_health(&self, fsid: &str) -> Result<Value> {
        self.get(&format!("cluster/{}/health", segment(fsid))).await
    }

    /// Health counters of a cluster
    pub async fn cluster_health_counters(&self, fsid: &str) -> Result<Value> {
        self.get(&format!("cluster/{}/health_counters", segment(fsid))).await
    }

    /// Capacity usage of a cluster
    pub async fn cluster_space(&self, fsid: &str) -> Result<Value> {
        self.get(&format!("cluster/{}/space", segment(fsid))).await
    }

    /// OSDs of a cluster
    pub async fn osd_list(&self, fsid: &str) -> Result<Value> {
        self.get(&format!("cluster/{}/osd", segment(fsid))).await
    }

    /// One OSD; `osd_id` is the uuid as listed by [`ClientV1::osd_list`].
    pub async fn osd_get(&self, fsid: &str, osd_id: impl Display) -> Result<Value> {
        self.get(&format!("cluster/{}/osd/{}", segment(fsid), segment(osd_id)))
            .await
    }

    /// Pools of a cluster
    pub async fn pool_list(&self, fsid: &str) -> Result<Value> {
        self.get(&format!("cluster/{}/pool", segment(fsid))).await
    }

    /// One pool
    pub async fn pool_get(&self, fsid: &str, pool_id: impl Display) -> Result<Value> {
        self.get(&format!("cluster/{}/pool/{}", segment(fsid), segment(pool_id)))
            .await
    }

    /// Servers of a cluster
    pub async fn server_list(&self, fsid: &str) -> Result<Value> {
        self.get(&format!("cluster/{}/server", segment(fsid))).await
    }

    async fn get(&self, path: &str) -> Result<Value> {
        self.session.api_get(path, Vec::new()).await
    }
}

impl MetricsQuerying for ClientV1 {
    fn metrics(&self) -> Metrics<'_> {
        Metrics::new(&self.session)
    }
}
