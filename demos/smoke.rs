//! Smoke run against a Calamari server.
//!
//! ```text
//! CALAMARI_HOST=http://calamari.example.com CALAMARI_USERNAME=admin \
//!     CALAMARI_PASSWORD=admin RUST_LOG=calamari_client=debug cargo run --example smoke
//! ```

use anyhow::{Context, Result};
use calamari_client::{CalamariApi, CalamariClient, MetricsQuerying, SessionConfig};
use std::env;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let host = env::var("CALAMARI_HOST").context("CALAMARI_HOST is not set")?;
    let username = env::var("CALAMARI_USERNAME").unwrap_or_else(|_| "admin".to_string());
    let password = env::var("CALAMARI_PASSWORD").unwrap_or_else(|_| "admin".to_string());

    let config = SessionConfig::builder(host, username, password)
        .timeout(Duration::from_secs(30))
        .build()?;
    let client = CalamariClient::v2(config)?;
    println!("==> {}", client.session());

    let info = client.info().await?;
    println!("✓ Calamari {}", info["version"]);

    let clusters = client.cluster_list().await?;
    let clusters = clusters.as_array().cloned().unwrap_or_default();
    println!("✓ {} cluster(s)", clusters.len());

    let v2 = client.as_v2().context("expected a v2 client")?;
    for cluster in &clusters {
        let fsid = cluster["id"].as_str().unwrap_or_default();
        println!("  {} ({})", cluster["name"], fsid);

        let iops = client.metrics().iops_data(fsid, None, "-1hour").await?;
        println!(
            "    read/write IOPS: {:?}/{:?}",
            iops.latest(0),
            iops.latest(1)
        );

        let usage = client.metrics().disk_usage_data(fsid, "-1d").await?;
        println!("    avail/used bytes: {:?}/{:?}", usage.latest(0), usage.latest(1));
    }

    let servers = v2.server_list().await?;
    for server in servers.as_array().into_iter().flatten() {
        let fqdn = server["fqdn"].as_str().unwrap_or_default();
        let nics = client.metrics().server_nics(fqdn).await?;
        let load = client.metrics().server_loadavg_data(fqdn, "-1hour").await?;
        println!(
            "  server {}: {} nic(s), load {:?}",
            fqdn,
            nics.len(),
            load.latest(0)
        );
    }

    client.logout().await?;
    println!("✓ Logged out");
    Ok(())
}
