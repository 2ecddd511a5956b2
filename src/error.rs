//! Typed errors for pre-flight validation and request synthesis.
//!
//! Everything here is surfaced before any worker starts. Transport failures
//! during a run are never errors at this level; they are recorded in the
//! per-request [`RequestStat`](crate::stats::RequestStat) instead.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure to parse a delimited `key:value` list.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyValError {
    #[error("delimiters cannot be equal")]
    EqualDelimiters,

    #[error("failed to parse {0:?} into a key and a value")]
    Malformed(String),

    #[error("key or value is empty in {0:?}")]
    EmptyKeyOrVal(String),
}

/// Configuration rejected before the run starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("zero targets")]
    NoTargets,

    #[error("request count must be greater than zero")]
    InvalidCount,

    #[error("concurrency must be greater than zero")]
    InvalidConcurrency,

    #[error("concurrency cannot exceed request count")]
    ConcurrencyExceedsCount,

    #[error("requests per second must be greater than zero")]
    InvalidRps,

    #[error("duration must be greater than zero")]
    InvalidDuration,

    #[error("empty URL")]
    EmptyUrl,

    #[error("method cannot be an empty string")]
    EmptyMethod,

    #[error("failed to parse timeout {value:?}")]
    InvalidTimeout {
        value: String,
        source: humantime::DurationError,
    },

    #[error("timeout must be greater than one millisecond")]
    TimeoutTooSmall,
}

/// A target could not be turned into a concrete request.
///
/// These surface when the request queue probes the target configuration,
/// which aborts the whole run before any worker starts.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("empty URL")]
    EmptyUrl,

    #[error("URL {0:?} is too short")]
    UrlTooShort(String),

    #[error("failed to generate from pattern {pattern:?}")]
    Regex {
        pattern: String,
        source: rand_regex::Error,
    },

    #[error("failed to parse URL {url:?}")]
    ParseUrl {
        url: String,
        source: url::ParseError,
    },

    #[error("empty hostname in {0:?}")]
    EmptyHost(String),

    #[error("failed to resolve host {host:?}")]
    DnsLookup { host: String, source: io::Error },

    #[error("no addresses found for {0:?}")]
    NoAddresses(String),

    #[error("invalid method {0:?}")]
    InvalidMethod(String),

    #[error("failed to read body file {path:?}")]
    BodyFile { path: PathBuf, source: io::Error },

    #[error("could not parse headers")]
    Headers(#[source] KeyValError),

    #[error("invalid header {name:?}: {value:?}")]
    InvalidHeader { name: String, value: String },

    #[error("could not parse cookies")]
    Cookies(#[source] KeyValError),

    #[error("invalid cookie value {0:?}")]
    InvalidCookie(String),

    #[error("could not parse basic auth")]
    BasicAuth(#[source] KeyValError),
}
