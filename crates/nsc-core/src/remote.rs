//! Bounded HTTP fetches for tokens and keys published by URL.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::Url;

use crate::error::{NscError, Result};

/// Default bound on a whole request, connect through body.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// True for `http://` and `https://` sources.
pub fn is_url(source: &str) -> bool {
    let s = source.trim();
    s.starts_with("http://") || s.starts_with("https://")
}

/// Fetch `url` with the default timeout.
pub fn load_from_url(url: &str) -> Result<Vec<u8>> {
    load_from_url_with_timeout(url, DEFAULT_TIMEOUT)
}

/// Fetch `url`, failing with `NscError::Timeout` if the request does not
/// complete within `timeout`.
///
/// # Errors
///
/// Returns `NscError::Timeout` on timeout, and `NscError::Remote` for an
/// invalid URL, a transport failure or a non-success status.
pub fn load_from_url_with_timeout(url: &str, timeout: Duration) -> Result<Vec<u8>> {
    let parsed = Url::parse(url.trim()).map_err(|e| NscError::Remote(format!("{url}: {e}")))?;

    let mut builder = Client::builder().timeout(timeout);
    if matches!(parsed.host_str(), Some("localhost" | "127.0.0.1" | "[::1]")) {
        builder = builder.no_proxy();
    }
    let client = builder
        .build()
        .map_err(|e| NscError::Remote(format!("building http client: {e}")))?;

    log::debug!("fetching {parsed}");
    let classify = |e: reqwest::Error| {
        if e.is_timeout() {
            NscError::Timeout(parsed.to_string())
        } else {
            NscError::Remote(format!("{parsed}: {e}"))
        }
    };

    let response = client
        .get(parsed.clone())
        .send()
        .map_err(classify)?
        .error_for_status()
        .map_err(classify)?;
    let body = response.bytes().map_err(classify)?;
    Ok(body.to_vec())
}
