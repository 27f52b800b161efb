//! URL helpers shared by the session and the endpoint catalogues.

/// Versioned API path for a relative endpoint URL.
///
/// `api_path("v2", "/cluster")` is `api/v2/cluster`. Leading slashes of `url`
/// are dropped, anything after them is kept as given (including a trailing
/// slash).
pub fn api_path(api_version: &str, url: &str) -> String {
    format!("api/{}/{}", api_version, url.trim_start_matches('/'))
}

/// Absolute URL for a host-relative path. Exactly one leading slash of `url`
/// is removed so `host` and `url` never join with a double slash.
pub fn join_url(host: &str, url: &str) -> String {
    let relative = url.strip_prefix('/').unwrap_or(url);
    format!("{}/{}", host, relative)
}

/// Percent-encode a single identifier used as one path segment.
pub fn segment(id: impl ToString) -> String {
    urlencoding::encode(&id.to_string()).into_owned()
}

pub(crate) fn normalize_host(host: &str) -> String {
    host.trim_end_matches('/').to_string()
}

pub(crate) fn normalize_version(api_version: &str) -> String {
    api_version.trim_matches('/').to_string()
}
