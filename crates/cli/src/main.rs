use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, bail};
use c2md_core::fetch::DEFAULT_USER_AGENT;
use c2md_core::{
    BrowserConfig, BrowserSession, Capture, ConvertConfig, CrawlConfig, Dated, DocumentKind, FetchConfig,
    FetchResult, PageFetcher, StaticFetcher, content_fingerprint, convert_file, dedupe_by_fingerprint, deep_crawl,
    extract_published_date, fetch_file, fetch_stdin, html_to_markdown, resolve_output_path, save_markdown,
    sort_by_date, url_to_slug,
};
use clap::Parser;
use owo_colors::OwoColorize;
use tracing_subscriber::EnvFilter;

mod echo;
mod process;

use echo::{print_banner, print_detail, print_info, print_step, print_success, print_warning};
use process::process_page;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Directory deep crawls write to when no output is given.
const DEFAULT_CRAWL_OUTPUT: &str = "./output";

/// What to produce for each page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Markdown,
    Screenshot,
    Pdf,
    Metadata,
    Archive,
}

impl OutputMode {
    /// Modes that can only be served by the browser.
    fn needs_browser(self) -> bool {
        matches!(self, Self::Screenshot | Self::Pdf | Self::Archive)
    }

    fn capture(self) -> Capture {
        Capture {
            screenshot: matches!(self, Self::Screenshot | Self::Archive),
            pdf: matches!(self, Self::Pdf | Self::Archive),
        }
    }
}

impl FromStr for OutputMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "markdown" | "md" => Ok(Self::Markdown),
            "screenshot" => Ok(Self::Screenshot),
            "pdf" => Ok(Self::Pdf),
            "metadata" => Ok(Self::Metadata),
            "archive" => Ok(Self::Archive),
            _ => Err(format!(
                "Invalid mode: {}. Valid options: markdown, screenshot, pdf, metadata, archive",
                s
            )),
        }
    }
}

/// Convert URLs and local documents to clean Markdown
#[derive(Parser, Debug)]
#[command(name = "c2md")]
#[command(version)]
#[command(about = "Convert URLs and documents to clean Markdown", long_about = None)]
struct Args {
    /// URL (http/https), local file, or "-" for HTML on stdin
    #[arg(value_name = "SOURCE")]
    source: String,

    /// Output mode (markdown, screenshot, pdf, metadata, archive)
    #[arg(short, long, default_value = "markdown", value_name = "MODE")]
    mode: OutputMode,

    /// Output file or directory (default: stdout)
    #[arg(short, long, value_name = "PATH")]
    output: Option<String>,

    /// Custom file name, without extension
    #[arg(short, long, value_name = "NAME")]
    filename: Option<String>,

    /// Disable boilerplate removal
    #[arg(long)]
    raw: bool,

    /// CSS selector for the content to convert
    #[arg(long, value_name = "CSS")]
    selector: Option<String>,

    /// Render pages in headless Chromium (for JS-rendered sites)
    #[arg(long)]
    browser: bool,

    /// Show the browser window
    #[arg(long)]
    no_headless: bool,

    /// CSS selector the browser waits for before reading the page
    #[arg(long, value_name = "CSS")]
    wait_for: Option<String>,

    /// Verbose progress output
    #[arg(short, long)]
    verbose: bool,

    /// Page timeout in seconds
    #[arg(long, default_value = "30", value_name = "SECS")]
    timeout: u64,

    /// Custom User-Agent for HTTP requests
    #[arg(long, value_name = "UA")]
    user_agent: Option<String>,

    /// Replace links with numbered citation references
    #[arg(long)]
    refs: bool,

    /// Follow same-site links one level deep
    #[arg(long)]
    deep: bool,

    /// Maximum pages in deep mode
    #[arg(long, default_value = "10", value_name = "N")]
    max_pages: usize,

    /// Sort deep crawl results by publication date (newest first)
    #[arg(long)]
    sort_by_date: bool,

    /// Keep at most N deep crawl results
    #[arg(long, value_name = "N")]
    limit: Option<usize>,

    /// Glob filter for deep crawl URLs (`*` also matches `/`)
    #[arg(long, value_name = "GLOB")]
    url_pattern: Option<String>,

    /// Strip images from Markdown
    #[arg(long)]
    no_images: bool,

    /// Embed images as base64 data URIs
    #[arg(long)]
    embed_images: bool,

    /// Download and compress images next to the output
    #[arg(long)]
    download_images: bool,

    /// Maximum width for downloaded or embedded images
    #[arg(long, default_value = "800", value_name = "PX")]
    image_width: u32,

    /// JPEG quality for screenshots (1-100)
    #[arg(long, default_value = "85", value_name = "Q", value_parser = clap::value_parser!(u8).range(1..=100))]
    screenshot_quality: u8,

    /// Maximum screenshot width; larger screenshots are resized and saved as JPEG
    #[arg(long, value_name = "PX")]
    screenshot_width: Option<u32>,

    /// Drop deep crawl pages with identical content
    #[arg(long)]
    dedupe: bool,
}

impl Args {
    fn needs_browser(&self) -> bool {
        self.browser || self.deep || self.wait_for.is_some() || self.mode.needs_browser()
    }

    fn mode_label(&self) -> String {
        let mut label = format!("{:?}", self.mode).to_lowercase();
        if self.deep {
            label.push_str(" (deep)");
        }
        if !self.raw {
            label.push_str(" [readability]");
        }
        label
    }
}

/// Where the content comes from
enum Source {
    Url(String),
    Stdin,
    File(PathBuf),
}

impl Source {
    fn classify(source: &str) -> anyhow::Result<Self> {
        let path = Path::new(source);
        if source == "-" {
            Ok(Self::Stdin)
        } else if path.is_file() {
            Ok(Self::File(path.to_path_buf()))
        } else if source.starts_with("http://") || source.starts_with("https://") {
            Ok(Self::Url(source.to_string()))
        } else {
            bail!("Source must be a URL (http/https), an existing file, or '-': {}", source)
        }
    }
}

/// Static or browser fetching, chosen once per run
enum Fetcher {
    Static(StaticFetcher),
    Browser(BrowserSession),
}

impl Fetcher {
    fn for_args(args: &Args) -> anyhow::Result<Self> {
        if args.needs_browser() {
            let config = BrowserConfig {
                headless: !args.no_headless,
                timeout: args.timeout,
                wait_for: args.wait_for.clone(),
                ..Default::default()
            };
            tracing::debug!(headless = config.headless, "using browser fetcher");
            let session = BrowserSession::launch(config).context("Failed to start the browser")?;
            Ok(Self::Browser(session))
        } else {
            let config = FetchConfig {
                timeout: args.timeout,
                user_agent: args.user_agent.clone().unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
                ..Default::default()
            };
            tracing::debug!(timeout = config.timeout, "using static fetcher");
            Ok(Self::Static(StaticFetcher::new(config)))
        }
    }
}

impl PageFetcher for Fetcher {
    async fn fetch(&self, url: &str, capture: Capture) -> c2md_core::Result<FetchResult> {
        match self {
            Self::Static(fetcher) => fetcher.fetch(url, capture).await,
            Self::Browser(session) => session.fetch(url, capture).await,
        }
    }
}

/// A crawled page tagged with its publication date
struct DatedPage {
    page: FetchResult,
    date: Option<String>,
}

impl Dated for DatedPage {
    fn published_date(&self) -> Option<&str> {
        self.date.as_deref()
    }

    fn url(&self) -> &str {
        &self.page.url
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "warn,c2md=debug,c2md_core=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    if args.verbose {
        print_banner(&args.source, &args.mode_label());
    }

    match Source::classify(&args.source)? {
        Source::Url(url) if args.deep => run_deep(&args, &url).await,
        Source::Url(url) => run_single(&args, &url).await,
        Source::Stdin => {
            let html = fetch_stdin().context("Failed to read from stdin")?;
            run_local_html(&args, html, "stdin").await
        }
        Source::File(path) => run_file(&args, &path).await,
    }
}

/// Validate options that must hold before anything is fetched.
fn check_output_requirements(args: &Args) -> anyhow::Result<()> {
    if args.output.is_none() && !args.deep {
        match args.mode {
            OutputMode::Screenshot => bail!("Screenshot mode requires -o/--output"),
            OutputMode::Pdf => bail!("PDF mode requires -o/--output"),
            OutputMode::Archive => bail!("Archive mode requires -o/--output"),
            OutputMode::Markdown | OutputMode::Metadata => {}
        }
    }
    Ok(())
}

async fn run_single(args: &Args, url: &str) -> anyhow::Result<()> {
    check_output_requirements(args)?;

    let slug = args.filename.clone().unwrap_or_else(|| url_to_slug(url));
    let fetcher = Fetcher::for_args(args)?;

    if args.verbose {
        let strategy = match fetcher {
            Fetcher::Static(_) => "static",
            Fetcher::Browser(_) => "browser",
        };
        print_step(1, 2, &format!("Fetching {} ({})", url.bright_white().underline(), strategy));
    }

    let page = fetcher
        .fetch(url, args.mode.capture())
        .await
        .with_context(|| format!("Failed to fetch {}", url))?;

    if let Some(status) = page.status
        && !page.is_success()
    {
        print_warning(&format!("Server responded with HTTP {}", status));
    }

    if args.verbose {
        print_detail("Size", &echo::format_size(page.html.len() as u64));
        print_step(2, 2, "Writing output");
    }

    // Slugs come from the requested URL so names stay stable across redirects.
    let page = FetchResult { url: url.to_string(), ..page };
    process_page(args, &page, &slug, args.output.as_deref()).await
}

/// Fingerprint of a page's converted Markdown, or of its raw HTML when
/// conversion failed.
fn page_fingerprint(url: &str, html: &str, converted: c2md_core::Result<String>) -> u64 {
    match converted {
        Ok(markdown) => content_fingerprint(&markdown),
        Err(e) => {
            tracing::warn!(url, error = %e, "conversion failed, fingerprinting raw HTML");
            content_fingerprint(html)
        }
    }
}

async fn run_deep(args: &Args, url: &str) -> anyhow::Result<()> {
    let fetcher = Fetcher::for_args(args)?;

    let mut config = CrawlConfig::builder().max_pages(args.max_pages).capture(args.mode.capture());
    if let Some(pattern) = &args.url_pattern {
        config = config.url_pattern(pattern.clone());
    }
    let config = config.build();

    if args.verbose {
        print_step(1, 2, &format!("Deep crawling (max {} pages)", args.max_pages));
    }

    let mut pages = deep_crawl(url, &fetcher, &config).await.context("Deep crawl failed")?;

    if args.verbose {
        print_info(&format!("Crawled {} pages", pages.len()));
    }

    if args.dedupe && pages.len() > 1 {
        let before = pages.len();
        pages = dedupe_by_fingerprint(pages, |page| {
            let convert = ConvertConfig { url: Some(page.url.clone()), strip_boilerplate: !args.raw, selector: None };
            page_fingerprint(&page.url, &page.html, html_to_markdown(&page.html, &convert))
        });
        if args.verbose && pages.len() < before {
            print_info(&format!("Deduplication: {} -> {} unique", before, pages.len()));
        }
    }

    if args.sort_by_date && pages.len() > 1 {
        pages = sort_pages_by_date(args, pages);
    }

    if let Some(limit) = args.limit
        && limit > 0
        && pages.len() > limit
    {
        if args.verbose {
            print_info(&format!("Limiting to {} results", limit));
        }
        pages.truncate(limit);
    }

    let output = args.output.as_deref().unwrap_or(DEFAULT_CRAWL_OUTPUT);
    let trimmed = output.trim_end_matches('/');
    let output_dir = if trimmed.is_empty() { output } else { trimmed };
    fs::create_dir_all(output_dir).with_context(|| format!("Failed to create {}", output_dir))?;

    if args.verbose {
        print_step(2, 2, &format!("Writing {} pages to {}", pages.len(), output_dir));
    }

    let total = pages.len();
    let mut failed = 0;
    for (i, page) in pages.iter().enumerate() {
        if args.verbose {
            eprintln!("\n{} {}", format!("Page {}/{}:", i + 1, total).bold(), page.url);
        }
        let slug = url_to_slug(&page.url);
        if let Err(e) = process_page(args, page, &slug, Some(output_dir)).await {
            failed += 1;
            print_warning(&format!("{}: {:#}", page.url, e));
        }
    }

    if failed == total && total > 0 {
        bail!("No pages could be written");
    }

    if args.verbose {
        print_success(&format!("Done! Processed {} pages", total - failed));
    }

    Ok(())
}

fn sort_pages_by_date(args: &Args, pages: Vec<FetchResult>) -> Vec<FetchResult> {
    let mut dated: Vec<DatedPage> = pages
        .into_iter()
        .map(|page| DatedPage { date: extract_published_date(&page.html), page })
        .collect();
    sort_by_date(&mut dated, true);

    if args.verbose {
        for entry in dated.iter().take(5) {
            print_detail(entry.date.as_deref().unwrap_or("no date"), &entry.page.url);
        }
        if dated.len() > 5 {
            print_detail("...", &format!("and {} more", dated.len() - 5));
        }
    }

    dated.into_iter().map(|entry| entry.page).collect()
}

async fn run_file(args: &Args, path: &Path) -> anyhow::Result<()> {
    if args.deep {
        bail!("--deep needs a URL source");
    }

    if DocumentKind::from_path(path) == Some(DocumentKind::Html) {
        let html = fetch_file(&path.to_string_lossy()).with_context(|| format!("Failed to read {}", path.display()))?;
        let stem = file_stem(path);
        return run_local_html(args, html, &stem).await;
    }

    if args.mode != OutputMode::Markdown {
        bail!("{:?} mode is not available for {}", args.mode, path.display());
    }

    if args.verbose {
        print_step(1, 1, &format!("Converting file {}", path.display().bright_white()));
    }

    let markdown = convert_file(path).with_context(|| format!("Failed to convert {}", path.display()))?;

    match args.output.as_deref() {
        Some(output) => {
            let name = args.filename.clone().unwrap_or_else(|| file_stem(path));
            let out = resolve_output_path(output, &format!("{}.md", name))?;
            save_markdown(&markdown, &out).with_context(|| format!("Failed to write {}", out.display()))?;
            print_success(&format!("Saved: {}", out.display()));
        }
        None => println!("{}", markdown),
    }

    Ok(())
}

/// HTML read from a file or stdin: no fetch, so only text modes apply.
async fn run_local_html(args: &Args, html: String, default_slug: &str) -> anyhow::Result<()> {
    if args.deep {
        bail!("--deep needs a URL source");
    }
    if args.mode.needs_browser() {
        bail!("{:?} mode needs a URL source", args.mode);
    }
    if args.browser || args.wait_for.is_some() {
        print_warning("Browser options are ignored for local input");
    }

    let slug = args.filename.clone().unwrap_or_else(|| default_slug.to_string());
    let page = FetchResult { html, ..Default::default() };
    process_page(args, &page, &slug, args.output.as_deref()).await
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "page".to_string())
}
