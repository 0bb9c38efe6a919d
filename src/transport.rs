//! HTTP transport
//!
//! Blocking retrieval of remote documents and artifacts. Everything that
//! touches the network goes through the [`Transport`] trait.

use std::io::Read;
use std::time::Duration;

use reqwest::blocking::Client;

use crate::config;
use crate::error::{Error, Result};
use crate::{log_debug, log_error, log_info};

const MODULE: &str = "transport";

/// An open response body
pub struct Download {
    /// Size announced by the server, if any
    pub content_length: Option<u64>,
    pub body: Box<dyn Read>,
}

/// Source of remote bytes
pub trait Transport {
    /// Start retrieving `url`. Fails with [`Error::FetchFailed`] on
    /// transport errors and non-success statuses.
    fn open(&self, url: &str) -> Result<Download>;
}

/// Whether a locator is already an absolute network location
pub fn is_absolute_url(locator: &str) -> bool {
    locator.starts_with("http://") || locator.starts_with("https://")
}

/// Join a locator onto the base URL, accepting both `/rooted` and
/// `relative` forms. Absolute URLs are returned unchanged.
pub fn resolve_url(base_url: &str, locator: &str) -> String {
    if is_absolute_url(locator) {
        return locator.to_string();
    }

    let base = base_url.trim_end_matches('/');
    if locator.starts_with('/') {
        format!("{}{}", base, locator)
    } else {
        format!("{}/{}", base, locator)
    }
}

/// reqwest-backed transport
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(config::app::USER_AGENT)
            .connect_timeout(Duration::from_secs(30))
            // downloads may legitimately take minutes
            .timeout(None)
            .build()
            .map_err(|e| Error::FetchFailed {
                url: String::new(),
                reason: format!("failed to create HTTP client: {}", e),
            })?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn open(&self, url: &str) -> Result<Download> {
        log_info!(MODULE, "GET {}", url);

        let response = self.client.get(url).send().map_err(|e| {
            log_error!(MODULE, "Request failed: {}", e);
            Error::FetchFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        })?;

        if !response.status().is_success() {
            log_error!(MODULE, "Request failed with status: {}", response.status());
            return Err(Error::FetchFailed {
                url: url.to_string(),
                reason: format!("server returned {}", response.status()),
            });
        }

        let content_length = response.content_length();
        log_debug!(MODULE, "Content length: {:?}", content_length);

        Ok(Download {
            content_length,
            body: Box::new(response),
        })
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_relative_locator() {
        assert_eq!(
            resolve_url("https://host/root", "fw/A/25w47a.bin"),
            "https://host/root/fw/A/25w47a.bin"
        );
    }

    #[test]
    fn test_resolve_rooted_locator() {
        assert_eq!(
            resolve_url("https://host/root", "/fw/A/25w47a.bin"),
            "https://host/root/fw/A/25w47a.bin"
        );
    }

    #[test]
    fn test_resolve_with_trailing_slash_base() {
        assert_eq!(
            resolve_url("https://host/root/", "fw/a.bin"),
            "https://host/root/fw/a.bin"
        );
    }

    #[test]
    fn test_absolute_locator_unchanged() {
        let url = "http://mirror.example/a.bin";
        assert!(is_absolute_url(url));
        assert_eq!(resolve_url("https://host/root", url), url);
        assert!(!is_absolute_url("fw/a.bin"));
    }

    #[test]
    fn test_memory_transport_records_requests() {
        let transport = testing::MemoryTransport::new().with("https://h/a", b"abc".to_vec());
        let mut body = String::new();
        transport
            .open("https://h/a")
            .unwrap()
            .body
            .read_to_string(&mut body)
            .unwrap();
        assert_eq!(body, "abc");
        assert!(transport.open("https://h/missing").is_err());
        assert_eq!(transport.request_count(), 2);
    }
}
