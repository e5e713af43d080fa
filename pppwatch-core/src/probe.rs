//! Captive-portal interception probe
//!
//! The carrier answers plain HTTP with a `302` to its registration host
//! until the session is re-authenticated. One `HEAD` request with redirects
//! disabled is enough to tell: intercepted iff the status is exactly 302 and
//! `Location` starts with the carrier's prefix.

use crate::config::{Jitter, ProbeConfig, TimingPolicy};
use crate::error::ProbeError;
use crate::progress::Progress;
use reqwest::header::LOCATION;
use reqwest::{redirect, Client};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Classification of one probe response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeResult {
    /// The carrier redirected the request to its registration page
    Intercepted,

    /// Anything else, including other redirects and error statuses
    Clear,
}

impl ProbeResult {
    pub fn is_intercepted(&self) -> bool {
        matches!(self, ProbeResult::Intercepted)
    }
}

/// Classify a response by status code and raw `Location` header bytes
///
/// The prefix comparison is byte-exact, scheme included. Header values are
/// not required to be ASCII, so they are never decoded first.
pub fn classify(status: u16, location: Option<&[u8]>, redirect_prefix: &str) -> ProbeResult {
    match location {
        Some(location) if status == 302 && location.starts_with(redirect_prefix.as_bytes()) => {
            ProbeResult::Intercepted
        }
        _ => ProbeResult::Clear,
    }
}

/// Something that can tell whether the link is intercepted
pub trait Probe {
    /// Probe until a response is classified
    ///
    /// Never fails: connection faults are retried without limit.
    fn probe(&self) -> impl Future<Output = ProbeResult> + Send;
}

/// HTTP `HEAD` probe against a fixed URL
#[derive(Debug)]
pub struct InterceptionProbe {
    client: Client,
    url: String,
    redirect_prefix: String,
    retry: Jitter,
}

impl InterceptionProbe {
    /// Create a new probe
    ///
    /// # Arguments
    /// * `url` - HTTP/HTTPS URL to probe
    /// * `redirect_prefix` - `Location` prefix of the carrier's portal
    /// * `timeout` - Per-request timeout; a timeout counts as a connection fault
    /// * `retry` - Sleep range between attempts after a connection fault
    #[tracing::instrument(skip(timeout, retry), fields(timeout_ms = timeout.as_millis() as u64))]
    pub fn new(
        url: &str,
        redirect_prefix: &str,
        timeout: Duration,
        retry: Jitter,
    ) -> Result<Self, ProbeError> {
        let parsed = Url::parse(url)
            .map_err(|e| ProbeError::InvalidUrl(format!("Failed to parse URL: {}", e)))?;

        match parsed.scheme() {
            "http" | "https" => {}
            scheme => {
                return Err(ProbeError::InvalidUrl(format!(
                    "Only HTTP/HTTPS schemes are supported, got: {}",
                    scheme
                )));
            }
        }

        // The redirect itself is the signal, so it must not be followed
        let client = Client::builder()
            .timeout(timeout)
            .redirect(redirect::Policy::none())
            .use_rustls_tls()
            .build()
            .map_err(|e| ProbeError::ClientCreationFailed(e.to_string()))?;

        Ok(Self {
            client,
            url: url.to_string(),
            redirect_prefix: redirect_prefix.to_string(),
            retry,
        })
    }

    /// Create a probe from the configuration file sections
    pub fn from_config(probe: &ProbeConfig, timing: &TimingPolicy) -> Result<Self, ProbeError> {
        Self::new(
            &probe.url,
            &probe.redirect_prefix,
            Duration::from_secs(probe.timeout_secs),
            timing.probe_retry_jitter(),
        )
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Issue a single request
    ///
    /// Returns the transport error on connection faults so the caller can
    /// decide whether to retry.
    pub async fn probe_once(&self) -> Result<ProbeResult, reqwest::Error> {
        let response = self.client.head(&self.url).send().await?;
        let status = response.status();
        let location = response.headers().get(LOCATION).map(|value| value.as_bytes());

        let result = classify(status.as_u16(), location, &self.redirect_prefix);
        let shown = location.map(String::from_utf8_lossy);
        debug!(
            status = %status,
            location = shown.as_deref().unwrap_or("-"),
            ?result,
            "Probe response"
        );
        Ok(result)
    }
}

impl Probe for InterceptionProbe {
    #[tracing::instrument(skip(self), fields(url = %self.url))]
    async fn probe(&self) -> ProbeResult {
        let mut progress = Progress::start("Probing for interception");
        loop {
            match self.probe_once().await {
                Ok(result) => {
                    progress.done_with(if result.is_intercepted() {
                        "intercepted"
                    } else {
                        "clear"
                    });
                    return result;
                }
                Err(e) => {
                    let reason = if e.is_timeout() {
                        "timeout".to_string()
                    } else if e.is_connect() {
                        "connection refused or unreachable".to_string()
                    } else {
                        e.to_string()
                    };
                    warn!(error = %reason, "Probe inconclusive, retrying");
                    progress.ping();
                    self.retry.sleep().await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PREFIX: &str = "http://bdi.";

    #[test]
    fn test_ok_status_is_clear() {
        assert_eq!(classify(200, None, PREFIX), ProbeResult::Clear);
        assert_eq!(
            classify(200, Some(b"http://bdi.example.net/x".as_slice()), PREFIX),
            ProbeResult::Clear
        );
    }

    #[test]
    fn test_portal_redirect_is_intercepted() {
        assert_eq!(
            classify(302, Some(b"http://bdi.example.net/x".as_slice()), PREFIX),
            ProbeResult::Intercepted
        );
    }

    #[test]
    fn test_prefix_is_scheme_sensitive() {
        assert_eq!(
            classify(302, Some(b"https://bdi.example.net/x".as_slice()), PREFIX),
            ProbeResult::Clear
        );
    }

    #[test]
    fn test_other_redirect_codes_are_clear() {
        for status in [301, 303, 307, 308] {
            assert_eq!(
                classify(status, Some(b"http://bdi.example.net/x".as_slice()), PREFIX),
                ProbeResult::Clear
            );
        }
    }

    #[test]
    fn test_non_ascii_location_still_matches_prefix() {
        let location: &[u8] = b"http://bdi.example.net/r\xe9gister";
        assert_eq!(classify(302, Some(location), PREFIX), ProbeResult::Intercepted);

        let elsewhere: &[u8] = b"http://\xe9bdi.example.net/";
        assert_eq!(classify(302, Some(elsewhere), PREFIX), ProbeResult::Clear);
    }

    #[test]
    fn test_redirect_without_location_is_clear() {
        assert_eq!(classify(302, None, PREFIX), ProbeResult::Clear);
    }

    #[test]
    fn test_classification_is_stable() {
        let first = classify(302, Some(b"http://bdi.example.net/login".as_slice()), PREFIX);
        let second = classify(302, Some(b"http://bdi.example.net/login".as_slice()), PREFIX);
        assert_eq!(first, second);
    }

    #[test]
    fn test_probe_rejects_non_http_scheme() {
        let result = InterceptionProbe::new(
            "ftp://example.com/",
            PREFIX,
            Duration::from_secs(5),
            Jitter::from_millis(1, 2),
        );
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Only HTTP/HTTPS schemes"));
    }

    #[test]
    fn test_probe_rejects_unparsable_url() {
        let result = InterceptionProbe::new(
            "not a url",
            PREFIX,
            Duration::from_secs(5),
            Jitter::from_millis(1, 2),
        );
        assert!(result.unwrap_err().to_string().contains("parse URL"));
    }
}
