//! Content fetching from URLs, files, and stdin.
//!
//! Two strategies share the [`PageFetcher`] seam: [`StaticFetcher`] performs a
//! plain HTTP GET (and retries once without certificate verification when the
//! server's certificate is rejected), while `BrowserSession` in the
//! `browser` module renders pages in headless Chromium.

use std::collections::HashMap;
use std::error::Error as StdError;
use std::fs;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::Client;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use url::Url;

use crate::{C2mdError, Result};

/// Browser-like User-Agent sent by the static fetcher.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// HTTP client configuration for fetching web pages.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Request timeout in seconds.
    pub timeout: u64,
    /// Custom User-Agent string.
    pub user_agent: String,
    /// Skip TLS certificate verification.
    pub accept_invalid_certs: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self { timeout: 30, user_agent: DEFAULT_USER_AGENT.to_string(), accept_invalid_certs: false }
    }
}

/// Optional artifacts a fetch should capture alongside the HTML.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capture {
    pub screenshot: bool,
    pub pdf: bool,
}

impl Capture {
    pub fn none() -> Self {
        Self::default()
    }
}

/// A fetched page.
#[derive(Debug, Clone, Default)]
pub struct FetchResult {
    /// Page HTML (rendered DOM for browser fetches).
    pub html: String,
    /// Final URL after redirects.
    pub url: String,
    /// HTTP status, when the strategy can observe it.
    pub status: Option<u16>,
    /// Response headers (static fetches only).
    pub headers: HashMap<String, String>,
    /// PNG screenshot bytes.
    pub screenshot: Option<Vec<u8>>,
    /// PDF bytes.
    pub pdf: Option<Vec<u8>>,
}

impl FetchResult {
    /// Whether the page came back with a usable status.
    ///
    /// Pages whose status could not be observed count as successful.
    pub fn is_success(&self) -> bool {
        self.status.is_none_or(|status| status < 400)
    }
}

/// A strategy for retrieving pages.
pub trait PageFetcher {
    /// Fetches `url`, capturing whatever `capture` asks for when supported.
    fn fetch(&self, url: &str, capture: Capture) -> impl Future<Output = Result<FetchResult>> + Send;
}

/// Plain HTTP fetcher with certificate-failure fallback.
#[derive(Debug, Clone, Default)]
pub struct StaticFetcher {
    config: FetchConfig,
}

impl StaticFetcher {
    pub fn new(config: FetchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

impl PageFetcher for StaticFetcher {
    async fn fetch(&self, url: &str, _capture: Capture) -> Result<FetchResult> {
        match fetch_static(url, &self.config).await {
            Err(C2mdError::HttpError(err)) if !self.config.accept_invalid_certs && is_certificate_error(&err) => {
                tracing::warn!(url, "SSL verification failed, retrying without verification");
                let insecure = FetchConfig { accept_invalid_certs: true, ..self.config.clone() };
                fetch_static(url, &insecure).await
            }
            other => other,
        }
    }
}

/// Parses `url` and requires an http(s) scheme.
pub fn parse_http_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url).map_err(|e| C2mdError::InvalidUrl(format!("{}: {}", url, e)))?;

    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        scheme => Err(C2mdError::InvalidUrl(format!(
            "unsupported scheme `{}` (expected http:// or https://)",
            scheme
        ))),
    }
}

/// Fetches HTML content from a URL with a single HTTP GET.
///
/// Redirects are followed; the returned [`FetchResult::url`] is the final
/// location. Non-2xx responses are returned as-is so callers can decide what
/// to do with them.
pub async fn fetch_static(url: &str, config: &FetchConfig) -> Result<FetchResult> {
    let parsed_url = parse_http_url(url)?;

    let client = Client::builder()
        .timeout(Duration::from_secs(config.timeout))
        .redirect(reqwest::redirect::Policy::limited(10))
        .danger_accept_invalid_certs(config.accept_invalid_certs)
        .build()
        .map_err(C2mdError::HttpError)?;

    tracing::debug!(%parsed_url, insecure = config.accept_invalid_certs, "fetching");

    let response = client
        .get(parsed_url)
        .header(USER_AGENT, &config.user_agent)
        .header(ACCEPT, "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
        .header(ACCEPT_LANGUAGE, "en-US,en;q=0.9")
        .send()
        .await
        .map_err(|e| {
            if e.is_timeout() {
                C2mdError::Timeout { timeout: config.timeout }
            } else {
                C2mdError::HttpError(e)
            }
        })?;

    let status = response.status().as_u16();
    let final_url = response.url().to_string();
    let headers = response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();

    let html = response.text().await?;

    tracing::debug!(url = %final_url, status, bytes = html.len(), "fetched");

    Ok(FetchResult { html, url: final_url, status: Some(status), headers, screenshot: None, pdf: None })
}

/// Reports whether an error (or anything in its source chain) is a TLS
/// certificate verification failure.
pub fn is_certificate_error(err: &(dyn StdError + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        let message = e.to_string().to_lowercase();
        if message.contains("certificate") || message.contains("unknownissuer") {
            return true;
        }
        current = e.source();
    }
    false
}

/// Reads content from a local file.
pub fn fetch_file(path: &str) -> Result<String> {
    let path_buf = PathBuf::from(path);

    if !path_buf.exists() {
        Err(C2mdError::FileNotFound(path_buf))
    } else {
        fs::read_to_string(&path_buf).map_err(C2mdError::from)
    }
}

/// Reads HTML content from standard input until EOF.
pub fn fetch_stdin() -> Result<String> {
    use std::io::{self, Read};

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer).map_err(C2mdError::from)?;

    Ok(buffer)
}
