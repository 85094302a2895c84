#[cfg(feature = "browser")]
pub mod browser;
pub mod citations;
pub mod convert;
#[cfg(feature = "fetch")]
pub mod crawl;
pub mod documents;
pub mod error;
#[cfg(feature = "fetch")]
pub mod fetch;
pub mod media;
pub mod metadata;
pub mod output;
pub mod parse;
pub mod pipeline;
pub mod postprocess;

#[cfg(feature = "browser")]
pub use browser::{BrowserConfig, BrowserSession};
pub use citations::{Citations, add_citations};
pub use convert::{ConvertConfig, html_to_markdown};
#[cfg(feature = "fetch")]
pub use crawl::{CrawlConfig, CrawlConfigBuilder, content_fingerprint, dedupe_by_fingerprint, deep_crawl, extract_links};
pub use documents::{DocumentKind, convert_file};
pub use error::{C2mdError, Result};
#[cfg(feature = "fetch")]
pub use fetch::{Capture, FetchConfig, FetchResult, PageFetcher, StaticFetcher};
#[cfg(feature = "fetch")]
pub use fetch::{fetch_file, fetch_static, fetch_stdin};
#[cfg(feature = "fetch")]
pub use media::{download_and_compress_images, download_images_as_base64};
pub use media::{MediaConfig, compress_image, embed_images, find_image_urls, relink_images};
pub use metadata::{Dated, PageMetadata, extract_date_from_markdown, extract_metadata, extract_published_date, sort_by_date};
pub use output::{ArchiveContents, resolve_output_path, save_archive, save_markdown, save_pdf, save_screenshot, url_to_slug};
pub use parse::Document;
pub use pipeline::{MarkdownOptions, Rendered, render_markdown};
pub use postprocess::clean_markdown;
