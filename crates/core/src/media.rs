//! Image download, compression and embedding.

use std::collections::HashMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
#[cfg(feature = "fetch")]
use std::time::Duration;

#[cfg(feature = "fetch")]
use base64::Engine;
#[cfg(feature = "fetch")]
use base64::engine::general_purpose::STANDARD;
#[cfg(feature = "fetch")]
use futures::stream::{self, StreamExt};
use image::DynamicImage;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use regex::Regex;
#[cfg(feature = "fetch")]
use reqwest::Client;
use sha2::{Digest, Sha256};

#[cfg(feature = "fetch")]
use crate::C2mdError;
use crate::Result;

static IMAGE_URL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"!\[[^\]]*\]\(([^)]+)\)").unwrap());

/// Downloads in flight at once.
#[cfg(feature = "fetch")]
const MAX_CONCURRENT_DOWNLOADS: usize = 4;

/// Image processing settings.
#[derive(Debug, Clone)]
pub struct MediaConfig {
    /// Images wider than this are downscaled.
    pub max_width: u32,
    /// JPEG quality (1-100).
    pub quality: u8,
    /// Per-image download timeout in seconds.
    pub timeout: u64,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self { max_width: 800, quality: 80, timeout: 10 }
    }
}

/// Collect absolute image URLs referenced by Markdown image syntax.
pub fn find_image_urls(markdown: &str) -> Vec<String> {
    IMAGE_URL
        .captures_iter(markdown)
        .map(|caps| caps[1].to_string())
        .filter(|url| url.starts_with("http"))
        .collect()
}

/// Downscale an image to at most `max_width` pixels wide (keeping aspect
/// ratio). Images already narrow enough are returned unchanged.
pub fn downscale(img: DynamicImage, max_width: Option<u32>) -> DynamicImage {
    match max_width {
        Some(max_width) if max_width > 0 && img.width() > max_width => {
            let ratio = max_width as f64 / img.width() as f64;
            let height = ((img.height() as f64 * ratio) as u32).max(1);
            img.resize_exact(max_width, height, FilterType::Lanczos3)
        }
        _ => img,
    }
}

/// Encode an image as RGB JPEG.
pub fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
    let mut buffer = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100));
    rgb.write_with_encoder(encoder)?;
    Ok(buffer.into_inner())
}

/// Decode, downscale and re-encode image bytes as JPEG.
pub fn compress_image(bytes: &[u8], max_width: u32, quality: u8) -> Result<Vec<u8>> {
    let img = image::load_from_memory(bytes)?;
    encode_jpeg(&downscale(img, Some(max_width)), quality)
}

/// Download images and return them as base64 `data:` URIs keyed by URL.
///
/// Images that fail to download or decode are skipped.
#[cfg(feature = "fetch")]
pub async fn download_images_as_base64(urls: &[String], config: &MediaConfig) -> Result<HashMap<String, String>> {
    if urls.is_empty() {
        return Ok(HashMap::new());
    }

    let client = image_client(config)?;
    let results = stream::iter(urls.iter().cloned())
        .map(|url| {
            let client = client.clone();
            async move {
                let encoded = download_compressed(&client, &url, config)
                    .await
                    .map(|jpeg| format!("data:image/jpeg;base64,{}", STANDARD.encode(jpeg)));
                (url, encoded)
            }
        })
        .buffered(MAX_CONCURRENT_DOWNLOADS)
        .collect::<Vec<_>>()
        .await;

    Ok(keep_successes(results))
}

/// Download images into `output_dir` as compressed JPEGs, keyed by URL.
///
/// File names are derived from the URL hash, so files already present are
/// reused without downloading. Failures are skipped.
#[cfg(feature = "fetch")]
pub async fn download_and_compress_images(
    urls: &[String], output_dir: &Path, config: &MediaConfig,
) -> Result<HashMap<String, PathBuf>> {
    if urls.is_empty() {
        return Ok(HashMap::new());
    }

    std::fs::create_dir_all(output_dir)?;
    let client = image_client(config)?;

    let results = stream::iter(urls.iter().cloned())
        .map(|url| {
            let client = client.clone();
            let local_path = output_dir.join(image_file_name(&url));
            async move {
                if local_path.exists() {
                    return (url, Ok(local_path));
                }
                let saved = match download_compressed(&client, &url, config).await {
                    Ok(jpeg) => tokio::fs::write(&local_path, jpeg)
                        .await
                        .map(|_| local_path)
                        .map_err(C2mdError::from),
                    Err(e) => Err(e),
                };
                (url, saved)
            }
        })
        .buffered(MAX_CONCURRENT_DOWNLOADS)
        .collect::<Vec<_>>()
        .await;

    Ok(keep_successes(results))
}

/// Local file name for an image URL: 12 hex chars of its SHA-256.
pub fn image_file_name(url: &str) -> String {
    let digest = format!("{:x}", Sha256::digest(url.as_bytes()));
    format!("{}.jpg", &digest[..12])
}

/// Replace image URLs with their `data:` URIs.
pub fn embed_images(markdown: &str, data_uris: &HashMap<String, String>) -> String {
    replace_urls(markdown, data_uris.iter().map(|(url, uri)| (url.as_str(), uri.clone())))
}

/// Point image URLs at downloaded files, written relative to `base_dir`.
pub fn relink_images(markdown: &str, local_paths: &HashMap<String, PathBuf>, base_dir: &Path) -> String {
    replace_urls(
        markdown,
        local_paths.iter().map(|(url, path)| {
            let relative = path.strip_prefix(base_dir).unwrap_or(path);
            (url.as_str(), relative.to_string_lossy().replace('\\', "/"))
        }),
    )
}

fn replace_urls<'a>(markdown: &str, replacements: impl Iterator<Item = (&'a str, String)>) -> String {
    // Longest URLs first so a URL that prefixes another is not replaced inside it.
    let mut replacements: Vec<_> = replacements.collect();
    replacements.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

    replacements
        .into_iter()
        .fold(markdown.to_string(), |acc, (url, replacement)| acc.replace(url, &replacement))
}

#[cfg(feature = "fetch")]
fn image_client(config: &MediaConfig) -> Result<Client> {
    Ok(Client::builder()
        .timeout(Duration::from_secs(config.timeout))
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()?)
}

#[cfg(feature = "fetch")]
async fn download_compressed(client: &Client, url: &str, config: &MediaConfig) -> Result<Vec<u8>> {
    let bytes = client
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .bytes()
        .await?;
    compress_image(&bytes, config.max_width, config.quality)
}

#[cfg(feature = "fetch")]
fn keep_successes<T>(results: Vec<(String, Result<T>)>) -> HashMap<String, T> {
    results
        .into_iter()
        .filter_map(|(url, result)| match result {
            Ok(value) => Some((url, value)),
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "skipping image");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, ImageFormat, RgbaImage};

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, image::Rgba([10, 20, 30, 128])));
        let mut buffer = Cursor::new(Vec::new());
        img.write_to(&mut buffer, ImageFormat::Png).unwrap();
        buffer.into_inner()
    }

    #[test]
    fn test_find_image_urls() {
        let md = "![a](https://x.com/a.png) ![b](/relative.png) [link](https://x.com) ![](http://y.org/c.jpg)";
        assert_eq!(find_image_urls(md), vec!["https://x.com/a.png", "http://y.org/c.jpg"]);
    }

    #[test]
    fn test_compress_image_downscales() {
        let jpeg = compress_image(&png_bytes(1600, 400), 800, 80).unwrap();
        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!(decoded.dimensions(), (800, 200));
        assert_eq!(image::guess_format(&jpeg).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn test_compress_image_keeps_small_images() {
        let jpeg = compress_image(&png_bytes(100, 50), 800, 80).unwrap();
        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!(decoded.dimensions(), (100, 50));
    }

    #[test]
    fn test_compress_image_rejects_garbage() {
        assert!(matches!(compress_image(b"not an image", 800, 80), Err(crate::C2mdError::ImageError(_))));
    }

    #[test]
    fn test_image_file_name_is_stable() {
        let name = image_file_name("https://example.com/a.png");
        assert_eq!(name.len(), 16);
        assert!(name.ends_with(".jpg"));
        assert_eq!(name, image_file_name("https://example.com/a.png"));
        assert_ne!(name, image_file_name("https://example.com/b.png"));
    }

    #[test]
    fn test_embed_images() {
        let md = "![a](https://x.com/a.png)\n![b](https://x.com/a.png.large)";
        let uris = HashMap::from([
            ("https://x.com/a.png".to_string(), "data:image/jpeg;base64,AAA".to_string()),
            ("https://x.com/a.png.large".to_string(), "data:image/jpeg;base64,BBB".to_string()),
        ]);
        let result = embed_images(md, &uris);
        assert_eq!(result, "![a](data:image/jpeg;base64,AAA)\n![b](data:image/jpeg;base64,BBB)");
    }

    #[test]
    fn test_relink_images() {
        let base = Path::new("/out");
        let paths = HashMap::from([("https://x.com/a.png".to_string(), PathBuf::from("/out/page_images/abc.jpg"))]);
        let result = relink_images("![a](https://x.com/a.png)", &paths, base);
        assert_eq!(result, "![a](page_images/abc.jpg)");
    }

    #[cfg(feature = "fetch")]
    #[tokio::test]
    async fn test_download_empty_list() {
        let result = download_images_as_base64(&[], &MediaConfig::default()).await.unwrap();
        assert!(result.is_empty());
    }
}
