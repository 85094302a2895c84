//! Page metadata, publication dates and link analysis.

use std::collections::HashMap;
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::Serialize;
use url::Url;

use crate::Document;

/// Average adult reading speed used for reading time.
const WORDS_PER_MINUTE: f64 = 238.0;

/// How many external domains are reported.
const TOP_DOMAINS: usize = 10;

/// How much visible text is scanned for a date.
const DATE_SCAN_CHARS: usize = 1000;

/// Meta names checked for a publication date, in priority order.
const DATE_META_NAMES: [&str; 9] = [
    "date",
    "published",
    "datePublished",
    "article:published_time",
    "og:article:published_time",
    "pubdate",
    "publish_date",
    "DC.date.issued",
    "sailthru.date",
];

/// Link prefixes that never point at a page.
pub(crate) const NON_PAGE_PREFIXES: [&str; 4] = ["#", "javascript:", "mailto:", "tel:"];

static ISO_DATE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"([0-9]{4}-[0-9]{2}-[0-9]{2})").unwrap());

static ISO_DATE_PREFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}").unwrap());

static MONTH_DAY_YEAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)((?:January|February|March|April|May|June|July|August|September|October|November|December|Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)[a-z]*\.?\s+[0-9]{1,2},?\s+[0-9]{4})",
    )
    .unwrap()
});

static DAY_MONTH_YEAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)([0-9]{1,2}\s+(?:January|February|March|April|May|June|July|August|September|October|November|December)\s+[0-9]{4})",
    )
    .unwrap()
});

/// Everything the metadata mode reports about a page.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PageMetadata {
    pub url: String,
    pub title: String,
    pub description: String,
    pub author: String,
    pub published_date: Option<String>,
    pub word_count: usize,
    pub reading_time_minutes: u64,
    pub internal_link_count: usize,
    pub external_link_count: usize,
    pub top_external_domains: Vec<String>,
    pub image_count: usize,
    pub video_count: usize,
    pub canonical_url: String,
    pub og_image: String,
    pub og_type: String,
    pub og_site_name: String,
}

impl PageMetadata {
    /// Pretty-printed JSON.
    pub fn to_json_pretty(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Extract page metadata from HTML.
pub fn extract_metadata(html: &str, url: &str) -> PageMetadata {
    let doc = Document::parse_with_url(html, url);

    let title = doc
        .meta_content("og:title")
        .or_else(|| doc.title())
        .unwrap_or_default();
    let description = doc
        .meta_content("og:description")
        .or_else(|| doc.meta_content("description"))
        .unwrap_or_default();
    let author = doc
        .meta_content("author")
        .or_else(|| doc.meta_content("article:author"))
        .unwrap_or_default();

    let text = doc.text_content();
    let word_count = text.split_whitespace().count();
    let reading_time_minutes = reading_time(word_count);

    let links = analyze_links(&doc);

    let canonical_url = doc
        .select("link[rel=\"canonical\"]")
        .ok()
        .and_then(|els| els.first().and_then(|el| el.attr("href")).map(str::to_string))
        .unwrap_or_default();

    PageMetadata {
        url: url.to_string(),
        title,
        description,
        author,
        published_date: published_date(&doc, &text),
        word_count,
        reading_time_minutes,
        internal_link_count: links.internal,
        external_link_count: links.external,
        top_external_domains: links.top_domains,
        image_count: count(&doc, "img"),
        video_count: count(&doc, "video, iframe"),
        canonical_url,
        og_image: doc.meta_content("og:image").unwrap_or_default(),
        og_type: doc.meta_content("og:type").unwrap_or_default(),
        og_site_name: doc.meta_content("og:site_name").unwrap_or_default(),
    }
}

/// Minutes to read `words`, at least one. Halves round to even.
fn reading_time(words: usize) -> u64 {
    ((words as f64 / WORDS_PER_MINUTE).round_ties_even() as u64).max(1)
}

fn count(doc: &Document, selector: &str) -> usize {
    doc.select(selector).map(|els| els.len()).unwrap_or(0)
}

#[derive(Debug, Default)]
struct LinkStats {
    internal: usize,
    external: usize,
    top_domains: Vec<String>,
}

fn analyze_links(doc: &Document) -> LinkStats {
    let mut stats = LinkStats::default();
    let mut domain_counts: Vec<(String, usize)> = Vec::new();
    let mut domain_index: HashMap<String, usize> = HashMap::new();
    let page_host = doc.base_url().map(host_with_port);

    let Ok(anchors) = doc.select("a[href]") else {
        return stats;
    };

    for anchor in anchors {
        let Some(href) = anchor.attr("href") else {
            continue;
        };
        if NON_PAGE_PREFIXES.iter().any(|prefix| href.starts_with(prefix)) {
            continue;
        }

        let link_host = absolute_url(doc.base_url(), href)
            .map(|u| host_with_port(&u))
            .filter(|host| !host.is_empty());

        match link_host {
            Some(host) if Some(&host) != page_host.as_ref() => {
                stats.external += 1;
                match domain_index.get(&host) {
                    Some(&i) => domain_counts[i].1 += 1,
                    None => {
                        domain_index.insert(host.clone(), domain_counts.len());
                        domain_counts.push((host, 1));
                    }
                }
            }
            _ => stats.internal += 1,
        }
    }

    // Stable sort keeps first-seen order among equal counts.
    domain_counts.sort_by(|a, b| b.1.cmp(&a.1));
    stats.top_domains = domain_counts
        .into_iter()
        .take(TOP_DOMAINS)
        .map(|(domain, _)| domain)
        .collect();

    stats
}

fn absolute_url(base: Option<&Url>, href: &str) -> Option<Url> {
    match base {
        Some(base) => base.join(href).ok(),
        None => Url::parse(href).ok(),
    }
}

/// `host[:port]` of a URL; empty for URLs without a host.
pub(crate) fn host_with_port(url: &Url) -> String {
    match (url.host_str(), url.port()) {
        (Some(host), Some(port)) => format!("{}:{}", host, port),
        (Some(host), None) => host.to_string(),
        _ => String::new(),
    }
}

/// Find the publication date of an HTML page as `YYYY-MM-DD`.
///
/// Checks date meta tags, then `<time datetime>`, then scans the start of
/// the visible text.
pub fn extract_published_date(html: &str) -> Option<String> {
    let doc = Document::parse(html);
    let text = doc.text_content();
    published_date(&doc, &text)
}

fn published_date(doc: &Document, text: &str) -> Option<String> {
    for name in DATE_META_NAMES {
        if let Some(content) = doc.meta_content(name)
            && let Some(date) = parse_date_string(&content)
        {
            return Some(date);
        }
    }

    if let Ok(elements) = doc.select("time[datetime]")
        && let Some(datetime) = elements.first().and_then(|el| el.attr("datetime"))
        && let Some(date) = parse_date_string(datetime)
    {
        return Some(date);
    }

    find_date_in_text(truncate_chars(text, DATE_SCAN_CHARS))
}

/// Find a date in the opening text of Markdown content.
pub fn extract_date_from_markdown(markdown: &str) -> Option<String> {
    if markdown.is_empty() {
        return None;
    }
    find_date_in_text(truncate_chars(markdown, DATE_SCAN_CHARS))
}

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Normalize a machine-readable date string to `YYYY-MM-DD`.
fn parse_date_string(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if value.contains('T') {
        return parse_iso_datetime(value).map(|date| date.format("%Y-%m-%d").to_string());
    }

    if ISO_DATE_PREFIX.is_match(value) {
        return value.get(..10).map(str::to_string);
    }

    None
}

fn parse_iso_datetime(value: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.date_naive());
    }

    ["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| {
            DateTime::parse_from_str(value, fmt)
                .map(|dt| dt.date_naive())
                .or_else(|_| NaiveDateTime::parse_from_str(value, fmt).map(|dt| dt.date()))
                .ok()
        })
}

/// Scan free text for the first recognizable date.
fn find_date_in_text(text: &str) -> Option<String> {
    if let Some(caps) = ISO_DATE.captures(text)
        && let Ok(date) = NaiveDate::parse_from_str(&caps[1], "%Y-%m-%d")
    {
        return Some(date.format("%Y-%m-%d").to_string());
    }

    for pattern in [&*MONTH_DAY_YEAR, &*DAY_MONTH_YEAR] {
        if let Some(caps) = pattern.captures(text) {
            let cleaned = caps[1].replace([',', '.'], "");
            let parsed = ["%B %d %Y", "%b %d %Y", "%d %B %Y"]
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(&cleaned, fmt).ok());
            if let Some(date) = parsed {
                return Some(date.format("%Y-%m-%d").to_string());
            }
        }
    }

    None
}

/// Something that can be ordered by publication date.
pub trait Dated {
    fn published_date(&self) -> Option<&str>;
    fn url(&self) -> &str;
}

/// Sort items by publication date.
///
/// Dated items come first (newest first when `descending`), ties broken by
/// URL; undated items always go last, ordered by URL.
pub fn sort_by_date<T: Dated>(items: &mut [T], descending: bool) {
    items.sort_by(|a, b| match (a.published_date(), b.published_date()) {
        (Some(da), Some(db)) => {
            let by_date = if descending { db.cmp(da) } else { da.cmp(db) };
            by_date.then_with(|| a.url().cmp(b.url()))
        }
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.url().cmp(b.url()),
    });
}
