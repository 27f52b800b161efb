//! Authenticated HTTP session against a Calamari server.
//!
//! A [`Session`] owns the host, credentials and API version, plus the
//! transport whose cookie store carries the server-side session. Requests
//! that come back as "session expired" (see [`RetryPolicy`]) cause one login
//! and one verbatim resend; whatever the resend returns goes to the caller.
//!
//! Re-authentication is single-flight. Every completed login bumps a
//! generation counter; a request remembers the generation it was sent under
//! and, on rejection, only logs in if nobody else has done so since.

use crate::config::SessionConfig;
use crate::error::Result;
use crate::path::{api_path, join_url, normalize_host, normalize_version};
use crate::retry::RetryPolicy;
use crate::transport::{HttpTransport, ReqwestTransport, Request, RequestBody, Response};
use crate::types::AuthState;
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

const LOGIN_PATH: &str = "auth/login";
const LOGOUT_PATH: &str = "auth/logout";

#[derive(Debug)]
struct AuthTracker {
    state: AuthState,
    generation: u64,
}

pub struct Session {
    host: String,
    username: String,
    password: String,
    api_version: String,
    transport: Arc<dyn HttpTransport>,
    auth: Mutex<AuthTracker>,
}

impl Session {
    /// Create a session backed by reqwest. No request is sent until the
    /// first call; login happens lazily on the first 403 or explicitly via
    /// [`Session::authenticate`].
    pub fn new(config: SessionConfig, api_version: &str) -> Result<Self> {
        config.validate()?;
        let transport = ReqwestTransport::new(&config)?;
        Ok(Self::with_transport(
            &config.host,
            config.username,
            config.password,
            api_version,
            Arc::new(transport),
        ))
    }

    /// Create a session over any transport.
    pub fn with_transport(
        host: &str,
        username: impl Into<String>,
        password: impl Into<String>,
        api_version: &str,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        Self {
            host: normalize_host(host),
            username: username.into(),
            password: password.into(),
            api_version: normalize_version(api_version),
            transport,
            auth: Mutex::new(AuthTracker {
                state: AuthState::Unauthenticated,
                generation: 0,
            }),
        }
    }

    /// Base URL without a trailing slash
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Login name sent to `auth/login`
    pub fn username(&self) -> &str {
        &self.username
    }

    /// API version such as `v2`
    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    /// Whether the last login was accepted
    pub async fn auth_state(&self) -> AuthState {
        self.auth.lock().await.state
    }

    /// `api/<version>/<url>` for this session.
    pub fn api_path(&self, url: &str) -> String {
        api_path(&self.api_version, url)
    }

    /// Log in with the configured credentials.
    ///
    /// The raw login response is returned without inspecting its status; a
    /// rejected login leaves the session [`AuthState::Unauthenticated`].
    pub async fn authenticate(&self) -> Result<Response> {
        let mut tracker = self.auth.lock().await;
        self.login(&mut tracker).await
    }

    /// Invalidate the server-side session.
    pub async fn logout(&self) -> Result<Response> {
        let mut tracker = self.auth.lock().await;
        info!(api_version = %self.api_version, "Calamari connection logout");

        let url = join_url(&self.host, &self.api_path(LOGOUT_PATH));
        let response = self.transport.send(&Request::post(url, None)).await?;
        tracker.state = AuthState::Unauthenticated;
        Ok(response)
    }

    /// GET a host-relative URL, re-authenticating once on 403.
    pub async fn get(&self, url: &str, query: Vec<(String, String)>) -> Result<Response> {
        let request = Request::get(join_url(&self.host, url), query);
        self.execute(request, RetryPolicy::SESSION_EXPIRY).await
    }

    /// POST to a host-relative URL, re-authenticating once on 403.
    pub async fn post(&self, url: &str, body: Option<RequestBody>) -> Result<Response> {
        let request = Request::post(join_url(&self.host, url), body);
        self.execute(request, RetryPolicy::SESSION_EXPIRY).await
    }

    /// GET a versioned API endpoint and decode the JSON body.
    pub async fn api_get(&self, url: &str, query: Vec<(String, String)>) -> Result<serde_json::Value> {
        self.api_get_as(url, query).await
    }

    /// POST to a versioned API endpoint and decode the JSON body.
    pub async fn api_post(&self, url: &str, body: Option<RequestBody>) -> Result<serde_json::Value> {
        self.api_post_as(url, body).await
    }

    /// GET a versioned API endpoint and decode the body into `T`.
    pub async fn api_get_as<T: DeserializeOwned>(
        &self,
        url: &str,
        query: Vec<(String, String)>,
    ) -> Result<T> {
        let response = self.get(&self.api_path(url), query).await?;
        response.error_for_status()?.json()
    }

    /// POST to a versioned API endpoint and decode the body into `T`.
    pub async fn api_post_as<T: DeserializeOwned>(
        &self,
        url: &str,
        body: Option<RequestBody>,
    ) -> Result<T> {
        let response = self.post(&self.api_path(url), body).await?;
        response.error_for_status()?.json()
    }

    /// Send `request`; if `policy` flags the response, log in (unless a
    /// concurrent request already did) and send the identical request once more.
    pub async fn execute(&self, request: Request, policy: RetryPolicy) -> Result<Response> {
        let generation = self.auth.lock().await.generation;

        let response = self.send(&request).await?;
        let Some(trigger) = policy.trigger(&response) else {
            return Ok(response);
        };

        warn!(
            method = request.method.as_str(),
            url = %request.url,
            status = response.status,
            ?trigger,
            "Session rejected, re-authenticating"
        );

        {
            let mut tracker = self.auth.lock().await;
            if tracker.generation == generation {
                tracker.state = AuthState::Unauthenticated;
                self.login(&mut tracker).await?;
            } else {
                debug!(url = %request.url, "Session already refreshed by a concurrent request");
            }
        }

        self.send(&request).await
    }

    async fn send(&self, request: &Request) -> Result<Response> {
        let response = self.transport.send(request).await?;
        debug!(
            method = request.method.as_str(),
            url = %request.url,
            status = response.status,
            "Request completed"
        );
        Ok(response)
    }

    async fn login(&self, tracker: &mut AuthTracker) -> Result<Response> {
        info!(api_version = %self.api_version, "Calamari connection re-authenticated");

        let url = join_url(&self.host, &self.api_path(LOGIN_PATH));
        let body = RequestBody::form([
            ("username", self.username.as_str()),
            ("password", self.password.as_str()),
        ]);
        let response = self.transport.send(&Request::post(url, Some(body))).await?;

        tracker.generation += 1;
        if response.is_success() {
            tracker.state = AuthState::Authenticated;
        } else {
            tracker.state = AuthState::Unauthenticated;
            warn!(
                api_version = %self.api_version,
                username = %self.username,
                status = response.status,
                "Calamari rejected login"
            );
        }

        Ok(response)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"***REDACTED***")
            .field("api_version", &self.api_version)
            .finish()
    }
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Session {}: {}>", self.api_version, self.host)
    }
}
