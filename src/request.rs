//! Request synthesis: turn a [`Target`] into a concrete HTTP request.

use std::path::PathBuf;

use bytes::Bytes;
use itertools::Itertools;
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, COOKIE, USER_AGENT};
use reqwest::{Client, Method, Request, Url};
use tokio::net::lookup_host;

use crate::error::RequestError;
use crate::target::Target;
use crate::util::parse_key_val;

/// Upper bound on repetitions when generating from a regex pattern, so that
/// unbounded quantifiers like `[a-z]+` still produce short strings.
const MAX_REGEX_REPEAT: u32 = 10;

/// A request synthesized from a target, ready to hand to a worker.
///
/// The body is kept as [`Bytes`] so a worker can materialize a fresh wire
/// request per attempt without consuming anything; basic-auth credentials are
/// applied when the wire request is built.
#[derive(Clone, Debug)]
pub(crate) struct PreparedRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
    pub basic_auth: Option<(String, String)>,
}

impl PreparedRequest {
    /// Build the concrete wire request for one attempt.
    pub(crate) fn to_request(&self, client: &Client) -> reqwest::Result<Request> {
        let mut builder = client
            .request(self.method.clone(), self.url.clone())
            .headers(self.headers.clone());
        if let Some((user, password)) = &self.basic_auth {
            builder = builder.basic_auth(user, Some(password));
        }
        if let Some(body) = &self.body {
            builder = builder.body(body.clone());
        }
        builder.build()
    }
}

/// Build a request out of the target's config.
///
/// Each call re-runs every per-request side effect: regex expansion of URL
/// and body, DNS pre-resolution and body-file reads. Identical targets
/// without those options produce identical requests on every call.
pub(crate) async fn build_request(target: &Target) -> Result<PreparedRequest, RequestError> {
    if target.url.is_empty() {
        return Err(RequestError::EmptyUrl);
    }
    if target.url.len() < 8 {
        return Err(RequestError::UrlTooShort(target.url.clone()));
    }

    // Default to http when no scheme is given.
    let mut url_str = target.url.clone();
    if !url_str.starts_with("http://") && !url_str.starts_with("https://") {
        url_str = format!("http://{url_str}");
    }
    if target.regex_url {
        url_str = generate(&url_str)?;
    }

    let mut url = Url::parse(&url_str).map_err(|source| RequestError::ParseUrl {
        url: url_str.clone(),
        source,
    })?;
    let host = match url.host_str() {
        Some(host) if !host.is_empty() => host.to_string(),
        _ => return Err(RequestError::EmptyHost(url_str.clone())),
    };

    if target.options.dns_prefetch {
        let port = url.port_or_known_default().unwrap_or(80);
        let mut addrs = lookup_host((host.as_str(), port))
            .await
            .map_err(|source| RequestError::DnsLookup { host: host.clone(), source })?;
        let addr = addrs.next().ok_or_else(|| RequestError::NoAddresses(host.clone()))?;
        // Only cannot-be-a-base URLs reject a host, and http(s) URLs never are.
        let _ = url.set_ip_host(addr.ip());
    }

    let method = Method::from_bytes(target.options.method.as_bytes())
        .map_err(|_| RequestError::InvalidMethod(target.options.method.clone()))?;

    let body = if !target.options.body_filename.is_empty() {
        let path = PathBuf::from(&target.options.body_filename);
        let contents = tokio::fs::read(&path)
            .await
            .map_err(|source| RequestError::BodyFile { path, source })?;
        Some(Bytes::from(contents))
    } else if !target.options.body.is_empty() {
        let body = if target.options.regex_body {
            generate(&target.options.body)?
        } else {
            target.options.body.clone()
        };
        Some(Bytes::from(body))
    } else {
        None
    };

    let mut headers = HeaderMap::new();
    if !target.options.headers.is_empty() {
        for (key, val) in
            parse_key_val(&target.options.headers, ",", ":").map_err(RequestError::Headers)?
        {
            let name = HeaderName::from_bytes(key.as_bytes())
                .map_err(|_| RequestError::InvalidHeader { name: key.clone(), value: val.clone() })?;
            let value = HeaderValue::from_str(&val)
                .map_err(|_| RequestError::InvalidHeader { name: key.clone(), value: val.clone() })?;
            headers.append(name, value);
        }
    }

    if !target.options.cookies.is_empty() {
        let pairs =
            parse_key_val(&target.options.cookies, ";", "=").map_err(RequestError::Cookies)?;
        let cookie = pairs.iter().map(|(k, v)| format!("{k}={v}")).join("; ");
        let value = HeaderValue::from_str(&cookie)
            .map_err(|_| RequestError::InvalidCookie(cookie.clone()))?;
        headers.insert(COOKIE, value);
    }

    // The configured user agent always wins, even over an explicit header.
    let user_agent = HeaderValue::from_str(&target.options.user_agent).map_err(|_| {
        RequestError::InvalidHeader {
            name: "User-Agent".to_string(),
            value: target.options.user_agent.clone(),
        }
    })?;
    headers.insert(USER_AGENT, user_agent);

    let basic_auth = if target.options.basic_auth.is_empty() {
        None
    } else {
        parse_key_val(&target.options.basic_auth, ",", ":")
            .map_err(RequestError::BasicAuth)?
            .into_iter()
            .next()
    };

    Ok(PreparedRequest { method, url, headers, body, basic_auth })
}

/// Generate one concrete string from a regular expression pattern.
fn generate(pattern: &str) -> Result<String, RequestError> {
    let generator = rand_regex::Regex::compile(pattern, MAX_REGEX_REPEAT).map_err(|source| {
        RequestError::Regex { pattern: pattern.to_string(), source }
    })?;
    let generated: String = rand::thread_rng().sample(&generator);
    Ok(generated)
}
