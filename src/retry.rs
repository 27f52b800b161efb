//! When a response means "log in again and resend".
//!
//! Calamari signals an expired session with 403 on API endpoints. The Graphite
//! endpoints are served behind the same login but answer with an HTML login
//! page instead, so for metrics discovery an undecodable body is treated the
//! same way. Both cases go through [`RetryPolicy`] and allow one resend.

use crate::transport::Response;

/// Why a response asked for re-authentication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryTrigger {
    Forbidden,
    UndecodableJson,
}

/// Set of triggers that cause a single re-authenticate-and-resend cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    on_forbidden: bool,
    on_undecodable_json: bool,
}

impl RetryPolicy {
    /// Used by `get`/`post`: only HTTP 403 triggers.
    pub const SESSION_EXPIRY: RetryPolicy = RetryPolicy {
        on_forbidden: true,
        on_undecodable_json: false,
    };

    /// Used by metrics discovery: 403 or a body that is not JSON.
    pub const METRICS_DISCOVERY: RetryPolicy = RetryPolicy {
        on_forbidden: true,
        on_undecodable_json: true,
    };

    /// Never resend.
    pub const NEVER: RetryPolicy = RetryPolicy {
        on_forbidden: false,
        on_undecodable_json: false,
    };

    pub fn trigger(&self, response: &Response) -> Option<RetryTrigger> {
        if self.on_forbidden && response.status == 403 {
            return Some(RetryTrigger::Forbidden);
        }
        if self.on_undecodable_json
            && serde_json::from_slice::<serde::de::IgnoredAny>(&response.body).is_err()
        {
            return Some(RetryTrigger::UndecodableJson);
        }
        None
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::SESSION_EXPIRY
    }
}
