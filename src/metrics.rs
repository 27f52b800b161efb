//! Graphite metrics served next to the Calamari API.
//!
//! [`MetricsQuery`] builds the ordered parameter list for `graphite/render/`:
//! every `target` in declaration order, then `from`, then `format=json-array`.
//! [`Metrics`] borrows a [`Session`] and runs those queries; both versioned
//! clients hand one out through [`crate::MetricsQuerying`].

use crate::error::Result;
use crate::retry::RetryPolicy;
use crate::session::Session;
use crate::transport::Request;
use crate::path::join_url;
use crate::types::{MetricNode, RenderedSeries};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

pub const RENDER_PATH: &str = "graphite/render/";
pub const FIND_PATH: &str = "graphite/metrics/find";

/// Default time range: the last day. Graphite returns 1-minute points for
/// ranges up to 24h and 15-minute points beyond that.
pub const DEFAULT_RANGE: &str = "-1d";

const CPU_DETAIL_FIELDS: [&str; 8] = [
    "system", "user", "nice", "idle", "iowait", "irq", "softirq", "steal",
];

const DISK_DETAIL_FIELDS: [&str; 5] = [
    "read_byte_per_second",
    "write_byte_per_second",
    "read_await",
    "write_await",
    "iops",
];

const NIC_DETAIL_FIELDS: [&str; 8] = [
    "tx_byte", "rx_byte", "tx_packets", "rx_packets", "tx_errors", "rx_errors", "tx_drops",
    "rx_drops",
];

/// Ordered Graphite render query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsQuery {
    targets: Vec<String>,
    from: String,
}

impl MetricsQuery {
    pub fn new() -> Self {
        Self {
            targets: Vec::new(),
            from: DEFAULT_RANGE.to_string(),
        }
    }

    pub fn target(mut self, expression: impl Into<String>) -> Self {
        self.targets.push(expression.into());
        self
    }

    /// Time range, e.g. `-1hour`, `-12hour`, `-1d`, `-3d`, `-7d`.
    pub fn from(mut self, range: impl Into<String>) -> Self {
        self.from = range.into();
        self
    }

    pub fn targets(&self) -> &[String] {
        &self.targets
    }

    pub fn range(&self) -> &str {
        &self.from
    }

    /// Query pairs in wire order.
    pub fn into_params(self) -> Vec<(String, String)> {
        let mut params: Vec<(String, String)> = self
            .targets
            .into_iter()
            .map(|t| ("target".to_string(), t))
            .collect();
        params.push(("from".to_string(), self.from));
        params.push(("format".to_string(), "json-array".to_string()));
        params
    }

    /// Read and write ops of one pool, or of all pools with `"all"`.
    pub fn iops(cluster_id: &str, pool_id: &str) -> Self {
        Self::new()
            .target(format!("ceph.cluster.{}.pool.{}.num_read", cluster_id, pool_id))
            .target(format!("ceph.cluster.{}.pool.{}.num_write", cluster_id, pool_id))
    }

    /// Available and used capacity of the whole cluster, in bytes. Older
    /// collectors report KiB, newer ones bytes; both are summed.
    pub fn disk_usage(cluster_id: &str) -> Self {
        let c = cluster_id;
        Self::new()
            .target(format!(
                "sumSeries(scale(ceph.cluster.{c}.df.total_avail,1024), ceph.cluster.{c}.df.total_avail_bytes)"
            ))
            .target(format!(
                "sumSeries(scale(ceph.cluster.{c}.df.total_used,1024), ceph.cluster.{c}.df.total_used_bytes)"
            ))
    }

    pub fn server_cpu(fqdn: &str) -> Self {
        Self::with_fields(&format!("servers.{}.cpu.total", fqdn), &["system", "user", "idle"])
    }

    pub fn server_loadavg(fqdn: &str) -> Self {
        Self::with_fields(&format!("servers.{}.loadavg", fqdn), &["01", "05", "15"])
    }

    pub fn server_memory(fqdn: &str) -> Self {
        Self::with_fields(
            &format!("servers.{}.memory", fqdn),
            &["Active", "Buffers", "Cached", "MemFree"],
        )
    }

    /// `cpu_id` is a metric id from [`Metrics::server_cpus`], which also
    /// lists a `total` pseudo-CPU.
    pub fn server_cpu_detail(cpu_id: &str) -> Self {
        Self::with_fields(cpu_id, &CPU_DETAIL_FIELDS)
    }

    /// `disk_id` is a metric id from [`Metrics::server_disks`]; disks and
    /// their partitions (vda, vda1) both show up there.
    pub fn server_disk_detail(disk_id: &str) -> Self {
        Self::with_fields(disk_id, &DISK_DETAIL_FIELDS)
    }

    pub fn server_network_detail(nic_id: &str) -> Self {
        Self::with_fields(nic_id, &NIC_DETAIL_FIELDS)
    }

    fn with_fields(prefix: &str, fields: &[&str]) -> Self {
        fields
            .iter()
            .fold(Self::new(), |query, field| query.target(format!("{}.{}", prefix, field)))
    }
}

impl Default for MetricsQuery {
    fn default() -> Self {
        Self::new()
    }
}

/// Metrics view over a session.
#[derive(Debug, Clone, Copy)]
pub struct Metrics<'a> {
    session: &'a Session,
}

impl<'a> Metrics<'a> {
    pub fn new(session: &'a Session) -> Self {
        Self { session }
    }

    /// Run a render query.
    pub async fn render(&self, query: MetricsQuery) -> Result<RenderedSeries> {
        debug!(targets = query.targets().len(), from = query.range(), "Rendering metrics");
        let response = self.session.get(RENDER_PATH, query.into_params()).await?;
        response.error_for_status()?.json()
    }

    /// Search metric names with a Graphite glob such as `servers.node1.cpu.*`.
    ///
    /// The body is returned as the backend sent it. A body that is not JSON
    /// (the login page) counts as an expired session: one re-authentication
    /// and resend, then a hard failure.
    pub async fn graphite_metrics_find(&self, query: &str) -> Result<Value> {
        self.graphite_metrics_find_as(query).await
    }

    /// Like [`Metrics::graphite_metrics_find`], decoding into `T`.
    pub async fn graphite_metrics_find_as<T: DeserializeOwned>(&self, query: &str) -> Result<T> {
        let request = Request::get(
            join_url(self.session.host(), FIND_PATH),
            vec![("query".to_string(), query.to_string())],
        );
        let response = self
            .session
            .execute(request, RetryPolicy::METRICS_DISCOVERY)
            .await?;
        response.json()
    }

    /// CPUs of a server, plus the `total` pseudo-CPU.
    pub async fn server_cpus(&self, fqdn: &str) -> Result<Vec<MetricNode>> {
        self.graphite_metrics_find_as(&format!("servers.{}.cpu.*", fqdn)).await
    }

    /// Disks and partitions of a server.
    pub async fn server_disks(&self, fqdn: &str) -> Result<Vec<MetricNode>> {
        self.graphite_metrics_find_as(&format!("servers.{}.iostat.*", fqdn)).await
    }

    /// Network interfaces of a server.
    pub async fn server_nics(&self, fqdn: &str) -> Result<Vec<MetricNode>> {
        self.graphite_metrics_find_as(&format!("servers.{}.network.*", fqdn)).await
    }

    /// Pool IOPS; `pool_id` of `None` aggregates all pools.
    pub async fn iops_data(&self, cluster_id: &str, pool_id: Option<&str>, time_from: &str) -> Result<RenderedSeries> {
        self.render(MetricsQuery::iops(cluster_id, pool_id.unwrap_or("all")).from(time_from))
            .await
    }

    pub async fn disk_usage_data(&self, cluster_id: &str, time_from: &str) -> Result<RenderedSeries> {
        self.render(MetricsQuery::disk_usage(cluster_id).from(time_from)).await
    }

    pub async fn server_cpu_data(&self, fqdn: &str, time_from: &str) -> Result<RenderedSeries> {
        self.render(MetricsQuery::server_cpu(fqdn).from(time_from)).await
    }

    pub async fn server_loadavg_data(&self, fqdn: &str, time_from: &str) -> Result<RenderedSeries> {
        self.render(MetricsQuery::server_loadavg(fqdn).from(time_from)).await
    }

    pub async fn server_memory_data(&self, fqdn: &str, time_from: &str) -> Result<RenderedSeries> {
        self.render(MetricsQuery::server_memory(fqdn).from(time_from)).await
    }

    pub async fn server_cpu_detail_data(&self, cpu_id: &str, time_from: &str) -> Result<RenderedSeries> {
        self.render(MetricsQuery::server_cpu_detail(cpu_id).from(time_from)).await
    }

    pub async fn server_disk_detail_data(&self, disk_id: &str, time_from: &str) -> Result<RenderedSeries> {
        self.render(MetricsQuery::server_disk_detail(disk_id).from(time_from)).await
    }

    pub async fn server_network_detail_data(&self, nic_id: &str, time_from: &str) -> Result<RenderedSeries> {
        self.render(MetricsQuery::server_network_detail(nic_id).from(time_from)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::session::testing::*;

    fn targets(params: &[(String, String)]) -> Vec<&str> {
        params
            .iter()
            .filter(|(k, _)| k == "target")
            .map(|(_, v)| v.as_str())
            .collect()
    }

    #[test]
    fn test_params_order_targets_then_from_then_format() {
        let params = MetricsQuery::server_cpu_detail("servers.n1.cpu.cpu0")
            .from("-12hour")
            .into_params();

        assert_eq!(params.len(), 10);
        assert_eq!(
            targets(&params),
            vec![
                "servers.n1.cpu.cpu0.system",
                "servers.n1.cpu.cpu0.user",
                "servers.n1.cpu.cpu0.nice",
                "servers.n1.cpu.cpu0.idle",
                "servers.n1.cpu.cpu0.iowait",
                "servers.n1.cpu.cpu0.irq",
                "servers.n1.cpu.cpu0.softirq",
                "servers.n1.cpu.cpu0.steal",
            ]
        );
        assert_eq!(params[8], ("from".to_string(), "-12hour".to_string()));
        assert_eq!(params[9], ("format".to_string(), "json-array".to_string()));
    }

    #[test]
    fn test_default_range() {
        let params = MetricsQuery::server_loadavg("n1").into_params();
        assert_eq!(
            targets(&params),
            vec!["servers.n1.loadavg.01", "servers.n1.loadavg.05", "servers.n1.loadavg.15"]
        );
        assert_eq!(params[3].1, DEFAULT_RANGE);
        assert_eq!(params.iter().filter(|(k, _)| k == "from").count(), 1);
        assert_eq!(params.iter().filter(|(k, _)| k == "format").count(), 1);
    }

    #[test]
    fn test_cluster_level_targets() {
        let iops = MetricsQuery::iops("fsid1", "all").into_params();
        assert_eq!(
            targets(&iops),
            vec!["ceph.cluster.fsid1.pool.all.num_read", "ceph.cluster.fsid1.pool.all.num_write"]
        );

        let usage = MetricsQuery::disk_usage("fsid1").into_params();
        assert_eq!(
            targets(&usage),
            vec![
                "sumSeries(scale(ceph.cluster.fsid1.df.total_avail,1024), ceph.cluster.fsid1.df.total_avail_bytes)",
                "sumSeries(scale(ceph.cluster.fsid1.df.total_used,1024), ceph.cluster.fsid1.df.total_used_bytes)",
            ]
        );
    }

    #[test]
    fn test_server_level_targets() {
        assert_eq!(
            MetricsQuery::server_cpu("n1").targets(),
            ["servers.n1.cpu.total.system", "servers.n1.cpu.total.user", "servers.n1.cpu.total.idle"]
        );
        assert_eq!(
            MetricsQuery::server_memory("n1").targets(),
            [
                "servers.n1.memory.Active",
                "servers.n1.memory.Buffers",
                "servers.n1.memory.Cached",
                "servers.n1.memory.MemFree",
            ]
        );
        assert_eq!(
            MetricsQuery::server_disk_detail("servers.n1.iostat.vda").targets(),
            [
                "servers.n1.iostat.vda.read_byte_per_second",
                "servers.n1.iostat.vda.write_byte_per_second",
                "servers.n1.iostat.vda.read_await",
                "servers.n1.iostat.vda.write_await",
                "servers.n1.iostat.vda.iops",
            ]
        );
        let nic = MetricsQuery::server_network_detail("servers.n1.network.eth0");
        assert_eq!(nic.targets().len(), 8);
        assert_eq!(nic.targets()[0], "servers.n1.network.eth0.tx_byte");
        assert_eq!(nic.targets()[7], "servers.n1.network.eth0.rx_drops");
    }

    #[tokio::test]
    async fn test_render_is_not_api_prefixed() {
        let transport = RecordingTransport::new(|_, _| {
            Ok((200, r#"{"targets":["a"],"datapoints":[[1453947000,1]]}"#.to_string()))
        });
        let session = session(transport.clone(), "v2");

        let series = Metrics::new(&session).iops_data("fsid1", None, "-1hour").await.unwrap();

        assert_eq!(series.targets, vec!["a"]);
        let sent = transport.requests();
        assert_eq!(sent[0].url, "http://calamari/graphite/render/");
        assert_eq!(sent[0].query.last().unwrap().1, "json-array");
        assert_eq!(sent[0].query[2], ("from".to_string(), "-1hour".to_string()));
    }

    #[tokio::test]
    async fn test_render_non_2xx_is_error() {
        let transport = RecordingTransport::new(|_, _| Ok((500, "{}".to_string())));
        let session = session(transport, "v1");

        let err = Metrics::new(&session).server_cpu_data("n1", "-1d").await.unwrap_err();
        assert!(matches!(err, Error::Status { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_find_retries_once_on_login_page() {
        let transport = RecordingTransport::new(|request, history| {
            if is_login(request) {
                return Ok((200, "{}".to_string()));
            }
            if history.iter().any(is_login) {
                Ok((200, r#"[{"id":"servers.n1.cpu.cpu0","text":"cpu0"}]"#.to_string()))
            } else {
                Ok((200, "<html>login</html>".to_string()))
            }
        });
        let session = session(transport.clone(), "v2");

        let nodes = Metrics::new(&session).server_cpus("n1").await.unwrap();

        assert_eq!(nodes[0].id, "servers.n1.cpu.cpu0");
        assert_eq!(transport.logins(), 1);
        let sent = transport.requests();
        assert_eq!(sent.len(), 3);
        assert_eq!(sent[0].url, "http://calamari/graphite/metrics/find");
        assert_eq!(sent[2].query, vec![("query".to_string(), "servers.n1.cpu.*".to_string())]);
    }

    #[tokio::test]
    async fn test_find_gives_up_after_one_retry() {
        let transport = RecordingTransport::new(|request, _| {
            if is_login(request) {
                Ok((200, "{}".to_string()))
            } else {
                Ok((200, "<html>login</html>".to_string()))
            }
        });
        let session = session(transport.clone(), "v2");

        let err = Metrics::new(&session).graphite_metrics_find("servers.*").await.unwrap_err();

        assert!(matches!(err, Error::Decode { .. }));
        assert_eq!(transport.logins(), 1);
        assert_eq!(transport.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_find_returns_unexpected_shape_unchanged() {
        let transport = RecordingTransport::new(|_, _| {
            Ok((200, r#"{"metrics":[{"path":"servers.n1.cpu.cpu0"}]}"#.to_string()))
        });
        let session = session(transport.clone(), "v2");

        let body = Metrics::new(&session).graphite_metrics_find("servers.n1.cpu.*").await.unwrap();

        assert_eq!(body["metrics"][0]["path"], "servers.n1.cpu.cpu0");
        assert_eq!(transport.logins(), 0);
        assert_eq!(transport.requests().len(), 1);
    }
}
