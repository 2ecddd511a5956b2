//! Target model: one endpoint plus every per-request knob.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_URL: &str = "http://localhost";
pub const DEFAULT_TIMEOUT: &str = "10s";
pub const DEFAULT_METHOD: &str = "GET";
pub const DEFAULT_USER_AGENT: &str = "pewpew";
pub const DEFAULT_COUNT: u64 = 10;
pub const DEFAULT_CONCURRENCY: u64 = 1;
pub const DEFAULT_RPS: u64 = 10;
pub const DEFAULT_DURATION: u64 = 15;

/// Where to send requests and how to send them.
///
/// A target is built once from configuration and stays immutable for the
/// whole run; workers only ever read it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Target {
    pub url: String,
    /// Interpret `url` as a regular expression and generate a concrete URL
    /// from it for each request.
    pub regex_url: bool,
    pub options: TargetOptions,
}

/// Per-request options for a single target.
///
/// String fields follow an "empty means unset" convention so that the whole
/// struct can be bound directly from flat configuration sources.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TargetOptions {
    /// Maximum time for the whole request-response exchange, as a duration
    /// string such as `"10s"`. Empty means no deadline.
    pub timeout: String,
    /// HTTP method token: GET, HEAD, POST, ...
    pub method: String,
    /// Inline request body. Empty means no body.
    pub body: String,
    /// Path of a file to read the request body from. Takes precedence over
    /// `body` when non-empty.
    pub body_filename: String,
    /// Interpret `body` as a regular expression and generate a concrete body
    /// from it for each request.
    pub regex_body: bool,
    /// Extra headers as a `k1:v1,k2:v2` list.
    pub headers: String,
    /// Cookies as a `k1=v1;k2=v2` list.
    pub cookies: String,
    pub user_agent: String,
    /// Credentials as a single `user:password` pair.
    pub basic_auth: String,
    pub compress: bool,
    pub keep_alive: bool,
    pub follow_redirects: bool,
    pub no_http2: bool,
    /// Verify TLS certificates and hostnames. Note that combining this with
    /// `dns_prefetch` makes verification run against the substituted IP
    /// address, which fails for virtually all certificates.
    pub enforce_ssl: bool,
    /// Resolve the hostname once while building the request and substitute
    /// the first returned address, keeping the port.
    pub dns_prefetch: bool,
}

impl Default for Target {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            regex_url: false,
            options: TargetOptions::default(),
        }
    }
}

impl Default for TargetOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT.to_string(),
            method: DEFAULT_METHOD.to_string(),
            body: String::new(),
            body_filename: String::new(),
            regex_body: false,
            headers: String::new(),
            cookies: String::new(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            basic_auth: String::new(),
            compress: false,
            keep_alive: false,
            follow_redirects: true,
            no_http2: false,
            enforce_ssl: false,
            dns_prefetch: false,
        }
    }
}

impl TargetOptions {
    /// The parsed timeout, or `None` when unset.
    ///
    /// Unparseable values also come back as `None`; validation has already
    /// rejected them for any target that reaches a worker.
    pub(crate) fn parsed_timeout(&self) -> Option<Duration> {
        if self.timeout.is_empty() {
            return None;
        }
        humantime::parse_duration(&self.timeout).ok()
    }
}

/// Check the field preconditions of a single target.
///
/// Performs no network access: the URL is not parsed, resolved or connected
/// here. An empty timeout is explicitly valid and means "no deadline".
pub fn validate_target(target: &Target) -> Result<(), ConfigError> {
    if target.url.is_empty() {
        return Err(ConfigError::EmptyUrl);
    }
    if target.options.method.is_empty() {
        return Err(ConfigError::EmptyMethod);
    }
    if !target.options.timeout.is_empty() {
        let timeout = humantime::parse_duration(&target.options.timeout).map_err(|source| {
            ConfigError::InvalidTimeout {
                value: target.options.timeout.clone(),
                source,
            }
        })?;
        if timeout <= Duration::from_millis(1) {
            return Err(ConfigError::TimeoutTooSmall);
        }
    }
    Ok(())
}
