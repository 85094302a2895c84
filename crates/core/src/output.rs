//! Output file writers.

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use image::ImageFormat;
use regex::Regex;
use url::Url;

use crate::Result;
use crate::media::{downscale, encode_jpeg};

static NON_ALPHANUMERIC: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9]+").unwrap());

const MAX_SLUG_LEN: usize = 100;

/// Filesystem-safe file stem derived from a URL's host and path.
///
/// ```rust
/// use c2md_core::output::url_to_slug;
///
/// assert_eq!(url_to_slug("https://example.com/blog/post-1"), "example_com_blog_post_1");
/// assert_eq!(url_to_slug(""), "page");
/// ```
pub fn url_to_slug(url: &str) -> String {
    let raw = match Url::parse(url) {
        Ok(parsed) => {
            let host = parsed.host_str().unwrap_or_default();
            match parsed.port() {
                Some(port) => format!("{}:{}{}", host, port, parsed.path()),
                None => format!("{}{}", host, parsed.path()),
            }
        }
        Err(_) => url.to_string(),
    };

    let slug = NON_ALPHANUMERIC.replace_all(&raw, "_");
    let slug: String = slug.trim_matches('_').chars().take(MAX_SLUG_LEN).collect();

    if slug.is_empty() { "page".to_string() } else { slug }
}

/// Resolve where a file named `file_name` goes for the `-o` value `output`.
///
/// An existing directory, or a path ending in `/`, is treated as a directory
/// (created if needed) and `file_name` is joined onto it. Anything else is
/// used as the file path itself.
pub fn resolve_output_path(output: &str, file_name: &str) -> Result<PathBuf> {
    let path = PathBuf::from(output);
    if path.is_dir() || output.ends_with('/') {
        fs::create_dir_all(&path)?;
        Ok(path.join(file_name))
    } else {
        Ok(path)
    }
}

/// Write text, creating parent directories.
pub fn save_markdown(content: &str, path: &Path) -> Result<()> {
    create_parent(path)?;
    fs::write(path, content)?;
    Ok(())
}

/// Write PDF bytes, creating parent directories.
pub fn save_pdf(bytes: &[u8], path: &Path) -> Result<()> {
    create_parent(path)?;
    fs::write(path, bytes)?;
    Ok(())
}

/// Save a screenshot, downscaling to `max_width` when wider.
///
/// `.jpg`/`.jpeg` paths are written as JPEG at `quality`, anything else as
/// PNG. Returns the written file size in bytes.
pub fn save_screenshot(bytes: &[u8], path: &Path, quality: u8, max_width: Option<u32>) -> Result<u64> {
    create_parent(path)?;
    let img = downscale(image::load_from_memory(bytes)?, max_width);

    let is_jpeg = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg"));

    let encoded = if is_jpeg {
        encode_jpeg(&img, quality)?
    } else {
        let mut buffer = Cursor::new(Vec::new());
        img.write_to(&mut buffer, ImageFormat::Png)?;
        buffer.into_inner()
    };

    fs::write(path, &encoded)?;
    Ok(encoded.len() as u64)
}

/// Everything an archive directory can hold.
#[derive(Debug, Clone, Default)]
pub struct ArchiveContents {
    pub markdown: String,
    pub references: Option<String>,
    pub screenshot: Option<Vec<u8>>,
    pub pdf: Option<Vec<u8>>,
    pub metadata_json: Option<String>,
    /// JPEG quality passed through to [`save_screenshot`].
    pub screenshot_quality: u8,
}

/// Write an archive directory.
///
/// Produces `article.md`, then `references.md`, `screenshot.png`,
/// `article.pdf` and `metadata.json` for whichever parts are present and
/// non-empty. Returns the written paths in that order.
pub fn save_archive(dir: &Path, contents: &ArchiveContents) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;
    let mut saved = Vec::new();

    let article = dir.join("article.md");
    fs::write(&article, &contents.markdown)?;
    saved.push(article);

    if let Some(references) = contents.references.as_deref().filter(|r| !r.is_empty()) {
        let path = dir.join("references.md");
        fs::write(&path, references)?;
        saved.push(path);
    }

    if let Some(screenshot) = contents.screenshot.as_deref().filter(|s| !s.is_empty()) {
        let path = dir.join("screenshot.png");
        save_screenshot(screenshot, &path, contents.screenshot_quality, None)?;
        saved.push(path);
    }

    if let Some(pdf) = contents.pdf.as_deref().filter(|p| !p.is_empty()) {
        let path = dir.join("article.pdf");
        fs::write(&path, pdf)?;
        saved.push(path);
    }

    if let Some(metadata) = contents.metadata_json.as_deref().filter(|m| !m.is_empty()) {
        let path = dir.join("metadata.json");
        fs::write(&path, metadata)?;
        saved.push(path);
    }

    Ok(saved)
}

fn create_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, GenericImageView, RgbaImage};
    use rstest::rstest;
    use tempfile::TempDir;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, image::Rgba([200, 100, 50, 255])));
        let mut buffer = Cursor::new(Vec::new());
        img.write_to(&mut buffer, ImageFormat::Png).unwrap();
        buffer.into_inner()
    }

    #[rstest]
    #[case("https://example.com/blog/my-post", "example_com_blog_my_post")]
    #[case("https://example.com/", "example_com")]
    #[case("https://example.com/a?b=c", "example_com_a")]
    #[case("http://localhost:8080/docs", "localhost_8080_docs")]
    #[case("https://example.com/path//with///slashes/", "example_com_path_with_slashes")]
    #[case("", "page")]
    #[case("///", "page")]
    fn test_url_to_slug(#[case] url: &str, #[case] expected: &str) {
        assert_eq!(url_to_slug(url), expected);
    }

    #[test]
    fn test_url_to_slug_truncates() {
        let url = format!("https://example.com/{}", "a".repeat(300));
        assert_eq!(url_to_slug(&url).len(), 100);
    }

    #[test]
    fn test_resolve_output_path_existing_dir() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().to_str().unwrap();
        assert_eq!(resolve_output_path(output, "page.md").unwrap(), dir.path().join("page.md"));
    }

    #[test]
    fn test_resolve_output_path_trailing_slash_creates_dir() {
        let dir = TempDir::new().unwrap();
        let output = format!("{}/new/", dir.path().display());
        let resolved = resolve_output_path(&output, "page.md").unwrap();
        assert!(dir.path().join("new").is_dir());
        assert_eq!(resolved.file_name().unwrap(), "page.md");
    }

    #[test]
    fn test_resolve_output_path_file() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("custom.md");
        let resolved = resolve_output_path(output.to_str().unwrap(), "page.md").unwrap();
        assert_eq!(resolved, output);
    }

    #[test]
    fn test_save_markdown_creates_parents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a/b/out.md");
        save_markdown("# Hi", &path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "# Hi");
    }

    #[test]
    fn test_save_pdf() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.pdf");
        save_pdf(b"%PDF-1.4", &path).unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"%PDF-1.4");
    }

    #[test]
    fn test_save_screenshot_png() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("shot.png");
        let size = save_screenshot(&png_bytes(40, 20), &path, 85, None).unwrap();
        assert_eq!(size, fs::metadata(&path).unwrap().len());
        let saved = image::open(&path).unwrap();
        assert_eq!(saved.dimensions(), (40, 20));
    }

    #[test]
    fn test_save_screenshot_jpeg_resized() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("shot.jpg");
        save_screenshot(&png_bytes(400, 200), &path, 70, Some(100)).unwrap();
        let bytes = fs::read(&path).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Jpeg);
        assert_eq!(image::load_from_memory(&bytes).unwrap().dimensions(), (100, 50));
    }

    #[test]
    fn test_save_archive_minimal() {
        let dir = TempDir::new().unwrap();
        let contents = ArchiveContents { markdown: "# Article".to_string(), ..Default::default() };
        let saved = save_archive(dir.path(), &contents).unwrap();
        assert_eq!(saved, vec![dir.path().join("article.md")]);
    }

    #[test]
    fn test_save_archive_full() {
        let dir = TempDir::new().unwrap();
        let contents = ArchiveContents {
            markdown: "# Article".to_string(),
            references: Some("\n## References\n\n[1] https://a.com".to_string()),
            screenshot: Some(png_bytes(10, 10)),
            pdf: Some(b"%PDF-1.4".to_vec()),
            metadata_json: Some("{}".to_string()),
            screenshot_quality: 85,
        };
        let saved = save_archive(dir.path(), &contents).unwrap();
        let names: Vec<_> = saved.iter().map(|p| p.file_name().unwrap().to_str().unwrap()).collect();
        assert_eq!(names, vec!["article.md", "references.md", "screenshot.png", "article.pdf", "metadata.json"]);
    }
}
