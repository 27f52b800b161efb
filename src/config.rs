//! Session configuration and builder.

use crate::error::{Error, Result};
use std::fmt;
use std::time::Duration;

/// Connection settings for one Calamari session.
///
/// The `Debug` implementation masks the password.
#[derive(Clone)]
pub struct SessionConfig {
    /// Base URL of the Calamari server (e.g. "http://calamari.example.com")
    pub host: String,
    pub username: String,
    pub password: String,
    /// Per-request timeout. `None` keeps reqwest's default (no timeout).
    pub timeout: Option<Duration>,
    /// Whether to verify TLS certificates (default: true)
    pub tls_verify: bool,
    /// User-Agent header value
    pub user_agent: String,
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"***REDACTED***")
            .field("timeout", &self.timeout)
            .field("tls_verify", &self.tls_verify)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl SessionConfig {
    /// Start building a configuration; host and credentials are mandatory.
    pub fn builder(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> SessionConfigBuilder {
        SessionConfigBuilder::new(host, username, password)
    }

    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(Error::Configuration("host cannot be empty".to_string()));
        }

        let parsed = url::Url::parse(&self.host)?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::Configuration(format!(
                "unsupported scheme '{}' in host",
                parsed.scheme()
            )));
        }

        if self.username.is_empty() {
            return Err(Error::Configuration("username cannot be empty".to_string()));
        }

        if let Some(timeout) = self.timeout {
            if timeout.is_zero() {
                return Err(Error::Configuration("timeout must be non-zero".to_string()));
            }
        }

        Ok(())
    }
}

#[derive(Debug)]
pub struct SessionConfigBuilder {
    config: SessionConfig,
}

impl SessionConfigBuilder {
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            config: SessionConfig {
                host: host.into(),
                username: username.into(),
                password: password.into(),
                timeout: None,
                tls_verify: true,
                user_agent: format!("calamari-client/{}", env!("CARGO_PKG_VERSION")),
            },
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    /// Accept self-signed certificates. Only for lab clusters.
    pub fn danger_accept_invalid_certs(mut self) -> Self {
        self.config.tls_verify = false;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Validate and return the configuration.
    pub fn build(self) -> Result<SessionConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
