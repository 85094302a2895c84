//! Headless Chromium fetching for JavaScript-rendered pages.
//!
//! A [`BrowserSession`] owns one Chromium process for the whole run; each
//! fetch opens a fresh tab, waits for navigation to settle, snapshots the
//! rendered DOM and optionally captures a screenshot and a PDF.

use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use headless_chrome::protocol::cdp::Page;
use headless_chrome::protocol::cdp::Page::CaptureScreenshotFormatOption;
use headless_chrome::types::PrintToPdfOptions;
use headless_chrome::{Browser, LaunchOptions, Tab};

use crate::fetch::{Capture, FetchResult, PageFetcher, parse_http_url};
use crate::{C2mdError, Result};

/// A4 paper size in inches.
const A4_WIDTH_IN: f64 = 8.27;
const A4_HEIGHT_IN: f64 = 11.69;

/// Tallest screenshot Chromium can render in one surface.
const MAX_SCREENSHOT_HEIGHT: f64 = 16384.0;

const DOCUMENT_WIDTH_JS: &str =
    "Math.max(document.documentElement.scrollWidth, document.body ? document.body.scrollWidth : 0)";
const DOCUMENT_HEIGHT_JS: &str =
    "Math.max(document.documentElement.scrollHeight, document.body ? document.body.scrollHeight : 0)";

/// Browser launch and navigation settings.
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    /// Run Chromium without a visible window.
    pub headless: bool,
    /// Navigation timeout in seconds.
    pub timeout: u64,
    /// Viewport width in pixels.
    pub viewport_width: u32,
    /// Viewport height in pixels.
    pub viewport_height: u32,
    /// CSS selector to wait for after navigation.
    pub wait_for: Option<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self { headless: true, timeout: 30, viewport_width: 1280, viewport_height: 720, wait_for: None }
    }
}

/// A running Chromium instance shared by every fetch of a run.
#[derive(Clone)]
pub struct BrowserSession {
    browser: Arc<Browser>,
    config: BrowserConfig,
}

impl BrowserSession {
    /// Launches Chromium with the given configuration.
    pub fn launch(config: BrowserConfig) -> Result<Self> {
        let options = LaunchOptions {
            headless: config.headless,
            window_size: Some((config.viewport_width, config.viewport_height)),
            idle_browser_timeout: Duration::from_secs(config.timeout.max(30) * 4),
            ..Default::default()
        };

        let browser = Browser::new(options).map_err(|e| browser_error("failed to launch browser", e))?;
        tracing::debug!(headless = config.headless, "browser launched");

        Ok(Self { browser: Arc::new(browser), config })
    }

    pub fn config(&self) -> &BrowserConfig {
        &self.config
    }

    fn fetch_blocking(&self, url: &str, capture: Capture) -> Result<FetchResult> {
        let tab = self.browser.new_tab().map_err(|e| browser_error("failed to open tab", e))?;
        let result = self.render(&tab, url, capture);

        if let Err(e) = tab.close(true) {
            tracing::debug!(error = %e, "failed to close tab");
        }

        result
    }

    fn render(&self, tab: &Arc<Tab>, url: &str, capture: Capture) -> Result<FetchResult> {
        tab.set_default_timeout(Duration::from_secs(self.config.timeout));

        tab.navigate_to(url)
            .map_err(|e| browser_error("failed to navigate", e))?
            .wait_until_navigated()
            .map_err(|e| browser_error("navigation did not complete", e))?;

        if let Some(selector) = &self.config.wait_for {
            tab.wait_for_element(selector)
                .map_err(|e| browser_error(&format!("timed out waiting for `{}`", selector), e))?;
        }

        let html = tab.get_content().map_err(|e| browser_error("failed to read page content", e))?;

        let screenshot = if capture.screenshot { Some(self.capture_full_page(tab)?) } else { None };

        // Chromium only prints to PDF in headless mode.
        let pdf = if capture.pdf && self.config.headless {
            let options = PrintToPdfOptions {
                print_background: Some(true),
                paper_width: Some(A4_WIDTH_IN),
                paper_height: Some(A4_HEIGHT_IN),
                ..Default::default()
            };
            Some(
                tab.print_to_pdf(Some(options))
                    .map_err(|e| browser_error("failed to print PDF", e))?,
            )
        } else {
            None
        };

        Ok(FetchResult { html, url: tab.get_url(), status: None, screenshot, pdf, ..Default::default() })
    }

    /// PNG of the whole scrollable document, not just the viewport.
    fn capture_full_page(&self, tab: &Tab) -> Result<Vec<u8>> {
        let clip = full_page_clip(
            document_extent(tab, DOCUMENT_WIDTH_JS),
            document_extent(tab, DOCUMENT_HEIGHT_JS),
            (self.config.viewport_width, self.config.viewport_height),
        );
        tracing::debug!(width = clip.width, height = clip.height, "capturing full page");

        let data = tab
            .call_method(Page::CaptureScreenshot {
                format: Some(CaptureScreenshotFormatOption::Png),
                quality: None,
                clip: Some(clip),
                from_surface: Some(true),
                capture_beyond_viewport: Some(true),
                optimize_for_speed: None,
            })
            .map_err(|e| browser_error("failed to capture screenshot", e))?
            .data;

        STANDARD
            .decode(data)
            .map_err(|e| browser_error("invalid screenshot data", e))
    }
}

fn document_extent(tab: &Tab, expression: &str) -> Option<f64> {
    match tab.evaluate(expression, false) {
        Ok(object) => object.value.and_then(|value| value.as_f64()),
        Err(e) => {
            tracing::debug!(error = %e, "failed to measure document");
            None
        }
    }
}

/// Clip covering the document, never smaller than the viewport.
fn full_page_clip(width: Option<f64>, height: Option<f64>, viewport: (u32, u32)) -> Page::Viewport {
    let (viewport_width, viewport_height) = (f64::from(viewport.0), f64::from(viewport.1));
    Page::Viewport {
        x: 0.0,
        y: 0.0,
        width: width.unwrap_or(viewport_width).max(viewport_width).ceil(),
        height: height
            .unwrap_or(viewport_height)
            .max(viewport_height)
            .min(MAX_SCREENSHOT_HEIGHT)
            .ceil(),
        scale: 1.0,
    }
}

impl PageFetcher for BrowserSession {
    async fn fetch(&self, url: &str, capture: Capture) -> Result<FetchResult> {
        parse_http_url(url)?;

        let session = self.clone();
        let target = url.to_string();

        tracing::debug!(url, ?capture, "rendering in browser");

        tokio::task::spawn_blocking(move || session.fetch_blocking(&target, capture))
            .await
            .map_err(|e| C2mdError::BrowserError(format!("browser task failed: {}", e)))?
    }
}

fn browser_error(context: &str, err: impl std::fmt::Display) -> C2mdError {
    C2mdError::BrowserError(format!("{}: {}", context, err))
}
