//! # calamari-client
//!
//! Async Rust client for the Calamari Ceph management REST API (v1 and v2)
//! and the Graphite metrics it serves.
//!
//! ## Features
//!
//! - **Both API versions**: [`ClientV1`] and [`ClientV2`], or [`CalamariClient`] over either
//! - **Session handling**: cookies are kept across calls and an expired session
//!   (HTTP 403) is refreshed with one login and one resend of the original request
//! - **Metrics**: ordered Graphite render queries and metric discovery
//! - **Type-safe errors**: every failure is an [`Error`]
//!
//! ## Quick Start
//!
//! ```no_run
//! use calamari_client::{ClientV2, MetricsQuerying, SessionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SessionConfig::builder("http://calamari.example.com", "admin", "admin").build()?;
//!     let client = ClientV2::new(config)?;
//!
//!     // The first call gets a 403, logs in and is replayed transparently.
//!     let clusters = client.cluster_list().await?;
//!     let fsid = clusters[0]["id"].as_str().unwrap_or_default();
//!
//!     let iops = client.metrics().iops_data(fsid, None, "-12hour").await?;
//!     println!("{} IOPS samples", iops.datapoints.len());
//!
//!     client.session().logout().await?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod metrics;
pub mod path;
pub mod retry;
pub mod session;
pub mod transport;
pub mod types;
pub mod v1;
pub mod v2;

// Re-export main types for convenience
pub use client::{CalamariApi, CalamariClient, MetricsQuerying};
pub use config::{SessionConfig, SessionConfigBuilder};
pub use error::{Error, Result};
pub use metrics::{Metrics, MetricsQuery};
pub use retry::{RetryPolicy, RetryTrigger};
pub use session::Session;
pub use transport::{HttpTransport, Method, ReqwestTransport, Request, RequestBody, Response};
pub use types::*;

// Re-export the versioned clients
pub use v1::ClientV1;
pub use v2::ClientV2;
