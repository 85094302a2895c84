//! One-level, same-host crawler.
//!
//! [`deep_crawl`] fetches a start page, discovers the links on it and
//! visits them in discovery order until the page budget runs out. Only the
//! start page's links are followed.

use std::collections::HashSet;
use std::sync::LazyLock;

use glob::Pattern;
use regex::Regex;
use url::Url;

use crate::fetch::{Capture, FetchResult, PageFetcher};
use crate::metadata::{NON_PAGE_PREFIXES, host_with_port};
use crate::parse::Document;
use crate::{C2mdError, Result};

static STATIC_FILE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.(jpg|jpeg|png|gif|svg|pdf|zip|tar|gz|css|js|xml)$").unwrap());

/// Crawl limits and capture settings.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Maximum pages fetched, start page included.
    pub max_pages: usize,
    /// Glob applied to discovered absolute URLs.
    pub url_pattern: Option<String>,
    /// Captures requested for every page.
    pub capture: Capture,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self { max_pages: 10, url_pattern: None, capture: Capture::none() }
    }
}

impl CrawlConfig {
    pub fn builder() -> CrawlConfigBuilder {
        CrawlConfigBuilder::default()
    }
}

/// Builder for [`CrawlConfig`].
#[derive(Debug, Default)]
pub struct CrawlConfigBuilder {
    config: CrawlConfig,
}

impl CrawlConfigBuilder {
    pub fn max_pages(mut self, value: usize) -> Self {
        self.config.max_pages = value;
        self
    }

    pub fn url_pattern(mut self, value: impl Into<String>) -> Self {
        self.config.url_pattern = Some(value.into());
        self
    }

    pub fn capture(mut self, value: Capture) -> Self {
        self.config.capture = value;
        self
    }

    pub fn build(self) -> CrawlConfig {
        self.config
    }
}

/// Compile a shell-style URL filter.
///
/// `*` already crosses `/`, so runs of stars are folded into one; `glob`
/// would otherwise reject `**` that is not a whole path component.
fn compile_url_pattern(pattern: &str) -> Result<Pattern> {
    let mut folded = pattern.to_string();
    while folded.contains("**") {
        folded = folded.replace("**", "*");
    }
    Pattern::new(&folded).map_err(|e| C2mdError::InvalidUrl(format!("invalid URL pattern `{}`: {}", pattern, e)))
}

/// Crawl `start_url` and the same-host pages it links to.
///
/// The start page's fetch error is returned; failures on discovered pages
/// and responses with status >= 400 are skipped.
pub async fn deep_crawl<F: PageFetcher>(start_url: &str, fetcher: &F, config: &CrawlConfig) -> Result<Vec<FetchResult>> {
    let pattern = config.url_pattern.as_deref().map(compile_url_pattern).transpose()?;

    let start = fetcher.fetch(start_url, config.capture).await?;
    let mut visited = HashSet::from([normalize_url(start_url)]);

    let mut discovered = extract_links(&start.html, start_url);
    if let Some(pattern) = &pattern {
        discovered.retain(|url| pattern.matches(url));
    }
    tracing::debug!(start = start_url, discovered = discovered.len(), "links discovered");

    let mut results = vec![start];

    for url in discovered {
        if results.len() >= config.max_pages {
            break;
        }

        if !visited.insert(normalize_url(&url)) {
            continue;
        }

        match fetcher.fetch(&url, config.capture).await {
            Ok(page) if page.is_success() => {
                tracing::debug!(url = %url, "crawled");
                results.push(page);
            }
            Ok(page) => tracing::warn!(url = %url, status = ?page.status, "skipping page"),
            Err(e) => tracing::warn!(url = %url, error = %e, "skipping page"),
        }
    }

    Ok(results)
}

/// Extract same-host page links from HTML, resolved against `base_url`.
///
/// Fragments, `javascript:`, `mailto:` and `tel:` links, other hosts,
/// non-http(s) schemes and static files are skipped. The result is
/// deduplicated by [`normalize_url`], keeping first-seen order.
pub fn extract_links(html: &str, base_url: &str) -> Vec<String> {
    let Ok(base) = Url::parse(base_url) else {
        return Vec::new();
    };
    let base_host = host_with_port(&base);

    let doc = Document::parse(html);
    let Ok(anchors) = doc.select("a[href]") else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for anchor in anchors {
        let Some(href) = anchor.attr("href").map(str::trim) else {
            continue;
        };
        if NON_PAGE_PREFIXES.iter().any(|prefix| href.starts_with(prefix)) {
            continue;
        }

        let Ok(absolute) = base.join(href) else {
            continue;
        };
        if host_with_port(&absolute) != base_host {
            continue;
        }
        if !matches!(absolute.scheme(), "http" | "https") {
            continue;
        }
        if STATIC_FILE.is_match(absolute.path()) {
            continue;
        }

        let absolute = absolute.to_string();
        if seen.insert(normalize_url(&absolute)) {
            links.push(absolute);
        }
    }

    links
}

/// Normalize a URL for deduplication.
///
/// Keeps scheme, host and path; trailing slashes are removed (the root stays
/// `/`), and query and fragment are dropped.
pub fn normalize_url(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => {
            let trimmed = parsed.path().trim_end_matches('/');
            let path = if trimmed.is_empty() { "/" } else { trimmed };
            format!("{}://{}{}", parsed.scheme(), host_with_port(&parsed), path)
        }
        Err(_) => url.trim_end_matches('/').to_string(),
    }
}

/// Keep the first item for each distinct fingerprint.
pub fn dedupe_by_fingerprint<T, F>(items: Vec<T>, mut fingerprint: F) -> Vec<T>
where
    F: FnMut(&T) -> u64,
{
    let mut seen = HashSet::new();
    items.into_iter().filter(|item| seen.insert(fingerprint(item))).collect()
}

/// Content fingerprint used for crawl deduplication.
pub fn content_fingerprint(content: &str) -> u64 {
    xxhash_rust::xxh3::xxh3_64(content.as_bytes())
}
