//! Calamari v2 API.
//!
//! Resources: clusters and their config, CLI execution, CRUSH topology,
//! events, logs, monitors, OSDs, pools, asynchronous requests, salt keys,
//! servers and grains, sync objects and users. Every method returns the
//! backend JSON unchanged.

use crate::client::MetricsQuerying;
use crate::config::SessionConfig;
use crate::error::Result;
use crate::metrics::Metrics;
use crate::path::segment;
use crate::session::Session;
use crate::transport::{HttpTransport, RequestBody};
use crate::types::RequestState;
use serde::Serialize;
use serde_json::Value;
use std::fmt::Display;
use std::sync::Arc;

pub const API_VERSION: &str = "v2";

/// Lines returned by the log tail endpoints when none are requested.
pub const DEFAULT_LOG_LINES: u32 = 10;

#[derive(Serialize)]
struct CliRequest<'a, C: ?Sized> {
    command: &'a C,
}

/// Client for `api/v2/`.
#[derive(Debug)]
pub struct ClientV2 {
    session: Session,
}

impl ClientV2 {
    /// Create a v2 client backed by reqwest
    pub fn new(config: SessionConfig) -> Result<Self> {
        Ok(Self {
            session: Session::new(config, API_VERSION)?,
        })
    }

    /// Create a v2 client over a custom transport
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

    /// Run a ceph CLI command on the cluster. `command` is either a single
    /// string (`"status"`) or an argv list (`["osd", "tree"]`).
    pub async fn cli<C: Serialize + ?Sized>(&self, fsid: &str, command: &C) -> Result<Value> {
        let body = RequestBody::json(&CliRequest { command })?;
        self.session
            .api_post(&format!("cluster/{}/cli", segment(fsid)), Some(body))
            .await
    }

    // Clusters

    /// All clusters known to the server
    pub async fn cluster_list(&self) -> Result<Value> {
        self.get("cluster").await
    }

    /// One cluster by fsid
    pub async fn cluster_get(&self, fsid: &str) -> Result<Value> {
        self.get(&format!("cluster/{}", segment(fsid))).await
    }

    /// Ceph configuration of a cluster
    pub async fn cluster_config_list(&self, fsid: &str) -> Result<Value> {
        self.get(&format!("cluster/{}/config", segment(fsid))).await
    }

    /// One configuration value
    pub async fn cluster_config_get(&self, fsid: &str, key: &str) -> Result<Value> {
        self.get(&format!("cluster/{}/config/{}", segment(fsid), segment(key)))
            .await
    }

    // CRUSH

    /// The raw CRUSH map text
    pub async fn cluster_crush_map(&self, fsid: &str) -> Result<Value> {
        self.get(&format!("cluster/{}/crush_map", segment(fsid))).await
    }

    /// All CRUSH nodes
    pub async fn cluster_crush_node_list(&self, fsid: &str) -> Result<Value> {
        self.get(&format!("cluster/{}/crush_node", segment(fsid))).await
    }

    /// One CRUSH node
    pub async fn cluster_crush_node_get(&self, fsid: &str, node_id: impl Display) -> Result<Value> {
        self.get(&format!("cluster/{}/crush_node/{}", segment(fsid), segment(node_id)))
            .await
    }

    /// CRUSH rule sets
    pub async fn cluster_crush_rule_set(&self, fsid: &str) -> Result<Value> {
        self.get(&format!("cluster/{}/crush_rule_set", segment(fsid))).await
    }

    /// CRUSH rules
    pub async fn cluster_crush_rule(&self, fsid: &str) -> Result<Value> {
        self.get(&format!("cluster/{}/crush_rule", segment(fsid))).await
    }

    /// CRUSH bucket types
    pub async fn cluster_crush_type_list(&self, fsid: &str) -> Result<Value> {
        self.get(&format!("cluster/{}/crush_type", segment(fsid))).await
    }

    /// One CRUSH bucket type
    pub async fn cluster_crush_type_get(&self, fsid: &str, type_id: impl Display) -> Result<Value> {
        self.get(&format!("cluster/{}/crush_type/{}", segment(fsid), segment(type_id)))
            .await
    }

    // Events

    /// Events across all clusters
    pub async fn event_list(&self) -> Result<Value> {
        self.get("event").await
    }

    /// Events of one cluster
    pub async fn cluster_event_list(&self, fsid: &str) -> Result<Value> {
        self.get(&format!("cluster/{}/event", segment(fsid))).await
    }

    /// Events of one server
    pub async fn server_event_list(&self, fqdn: &str) -> Result<Value> {
        self.get(&format!("server/{}/event", segment(fqdn))).await
    }

    /// Server and version information
    pub async fn info(&self) -> Result<Value> {
        self.get("info").await
    }

    // Logs

    /// Tail of the cluster log, `lines` defaulting to 10
    pub async fn cluster_log_tail(&self, fsid: &str, lines: Option<u32>) -> Result<Value> {
        self.session
            .api_get(&format!("cluster/{}/log", segment(fsid)), lines_query(lines))
            .await
    }

    /// Log files available on a server
    pub async fn server_log_file_list(&self, fqdn: &str) -> Result<Value> {
        self.get(&format!("server/{}/log", segment(fqdn))).await
    }

    /// `log_path` is relative to the server's log directory (as returned by
    /// [`ClientV2::server_log_file_list`]) and may contain `/`.
    pub async fn server_log_file_tail(
        &self,
        fqdn: &str,
        log_path: &str,
        lines: Option<u32>,
    ) -> Result<Value> {
        self.session
            .api_get(
                &format!("server/{}/log/{}", segment(fqdn), log_path),
                lines_query(lines),
            )
            .await
    }

    // Monitors

    /// Monitors of a cluster
    pub async fn cluster_mon_list(&self, fsid: &str) -> Result<Value> {
        self.get(&format!("cluster/{}/mon", segment(fsid))).await
    }

    /// One monitor
    pub async fn cluster_mon_get(&self, fsid: &str, mon_id: &str) -> Result<Value> {
        self.get(&format!("cluster/{}/mon/{}", segment(fsid), segment(mon_id)))
            .await
    }

    /// Status report of one monitor
    pub async fn cluster_mon_status(&self, fsid: &str, mon_id: &str) -> Result<Value> {
        self.get(&format!("cluster/{}/mon/{}/status", segment(fsid), segment(mon_id)))
            .await
    }

    // OSDs

    /// Cluster-wide OSD flags
    pub async fn cluster_osd_config(&self, fsid: &str) -> Result<Value> {
        self.get(&format!("cluster/{}/osd_config", segment(fsid))).await
    }

    /// OSDs of a cluster
    pub async fn cluster_osd_list(&self, fsid: &str) -> Result<Value> {
        self.get(&format!("cluster/{}/osd", segment(fsid))).await
    }

    /// One OSD
    pub async fn cluster_osd_get(&self, fsid: &str, osd_id: impl Display) -> Result<Value> {
        self.get(&format!("cluster/{}/osd/{}", segment(fsid), segment(osd_id)))
            .await
    }

    // Pools

    /// Pools of a cluster
    pub async fn cluster_pool_list(&self, fsid: &str) -> Result<Value> {
        self.get(&format!("cluster/{}/pool", segment(fsid))).await
    }

    /// One pool
    pub async fn cluster_pool_get(&self, fsid: &str, pool_id: impl Display) -> Result<Value> {
        self.get(&format!("cluster/{}/pool/{}", segment(fsid), segment(pool_id)))
            .await
    }

    // Asynchronous requests

    /// Asynchronous requests, optionally filtered by state
    pub async fn request_list(&self, state: Option<RequestState>) -> Result<Value> {
        self.session.api_get("request", state_query(state)).await
    }

    /// One asynchronous request
    pub async fn request_get(&self, request_id: &str) -> Result<Value> {
        self.get(&format!("request/{}", segment(request_id))).await
    }

    /// Cancel a running request
    pub async fn request_cancel(&self, request_id: &str) -> Result<Value> {
        self.session
            .api_post(&format!("request/{}/cancel", segment(request_id)), None)
            .await
    }

    /// Asynchronous requests of one cluster
    pub async fn cluster_request_list(&self, fsid: &str, state: Option<RequestState>) -> Result<Value> {
        self.session
            .api_get(&format!("cluster/{}/request", segment(fsid)), state_query(state))
            .await
    }

    /// One asynchronous request of a cluster
    pub async fn cluster_request_get(&self, fsid: &str, request_id: &str) -> Result<Value> {
        self.get(&format!("cluster/{}/request/{}", segment(fsid), segment(request_id)))
            .await
    }

    // Salt keys

    /// Salt minion keys
    pub async fn key_list(&self) -> Result<Value> {
        self.get("key").await
    }

    /// One salt minion key
    pub async fn key_get(&self, minion_id: &str) -> Result<Value> {
        self.get(&format!("key/{}", segment(minion_id))).await
    }

    // Servers

    /// Servers of a cluster
    pub async fn cluster_server_list(&self, fsid: &str) -> Result<Value> {
        self.get(&format!("cluster/{}/server", segment(fsid))).await
    }

    /// One server of a cluster
    pub async fn cluster_server_get(&self, fsid: &str, fqdn: &str) -> Result<Value> {
        self.get(&format!("cluster/{}/server/{}", segment(fsid), segment(fqdn)))
            .await
    }

    /// All managed servers
    pub async fn server_list(&self) -> Result<Value> {
        self.get("server").await
    }

    /// One server by FQDN
    pub async fn server_get(&self, fqdn: &str) -> Result<Value> {
        self.get(&format!("server/{}", segment(fqdn))).await
    }

    /// Salt grains of a server
    pub async fn server_grains(&self, fqdn: &str) -> Result<Value> {
        self.get(&format!("server/{}/grains", segment(fqdn))).await
    }

    // Sync objects

    /// Sync object types of a cluster
    pub async fn cluster_sync_object_list(&self, fsid: &str) -> Result<Value> {
        self.get(&format!("cluster/{}/sync_object", segment(fsid))).await
    }

    /// One sync object (e.g. `osd_map`, `health`)
    pub async fn cluster_sync_object_get(&self, fsid: &str, sync_type: &str) -> Result<Value> {
        self.get(&format!("cluster/{}/sync_object/{}", segment(fsid), segment(sync_type)))
            .await
    }

    // Users

    /// Calamari users
    pub async fn user_list(&self) -> Result<Value> {
        self.get("user").await
    }

    /// One user by primary key
    pub async fn user_get(&self, pk: impl Display) -> Result<Value> {
        self.get(&format!("user/{}", segment(pk))).await
    }

    /// Salt grains of the Calamari host
    pub async fn grains(&self) -> Result<Value> {
        self.get("grains").await
    }

    async fn get(&self, path: &str) -> Result<Value> {
        self.session.api_get(path, Vec::new()).await
    }
}

impl MetricsQuerying for ClientV2 {
    fn metrics(&self) -> Metrics<'_> {
        Metrics::new(&self.session)
    }
}

fn lines_query(lines: Option<u32>) -> Vec<(String, String)> {
    vec![(
        "lines".to_string(),
        lines.unwrap_or(DEFAULT_LOG_LINES).to_string(),
    )]
}

fn state_query(state: Option<RequestState>) -> Vec<(String, String)> {
    state
        .map(|s| vec![("state".to_string(), s.as_str().to_string())])
        .unwrap_or_default()
}
