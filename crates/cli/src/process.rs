//! Turning a fetched page into the requested output.

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use c2md_core::{
    ArchiveContents, C2mdError, ConvertConfig, FetchResult, MarkdownOptions, MediaConfig, Rendered,
    download_and_compress_images, download_images_as_base64, embed_images, extract_metadata, find_image_urls,
    relink_images, render_markdown, resolve_output_path, save_archive, save_markdown, save_pdf, save_screenshot,
};

use crate::echo::{format_size, print_detail, print_info, print_success, print_warning};
use crate::{Args, OutputMode};

/// Markdown options for a page at `url`.
pub fn markdown_options(args: &Args, url: &str) -> MarkdownOptions {
    MarkdownOptions {
        convert: ConvertConfig {
            url: (!url.is_empty()).then(|| url.to_string()),
            strip_boilerplate: !args.raw,
            selector: args.selector.clone(),
        },
        strip_images: args.no_images,
        citations: args.refs,
    }
}

/// Write one page in the selected mode.
///
/// `output` is the `-o` value; `None` means stdout where the mode allows it.
pub async fn process_page(args: &Args, page: &FetchResult, slug: &str, output: Option<&str>) -> anyhow::Result<()> {
    match args.mode {
        OutputMode::Markdown => write_markdown(args, page, slug, output).await,
        OutputMode::Screenshot => write_screenshot(args, page, slug, output),
        OutputMode::Pdf => write_pdf(page, slug, output),
        OutputMode::Metadata => write_metadata(page, slug, output),
        OutputMode::Archive => write_archive(args, page, slug, output),
    }
}

async fn write_markdown(args: &Args, page: &FetchResult, slug: &str, output: Option<&str>) -> anyhow::Result<()> {
    let mut rendered = render_markdown(&page.html, &markdown_options(args, &page.url))
        .with_context(|| format!("Failed to convert {} to Markdown", display_name(page)))?;

    let out_path = output
        .map(|out| resolve_output_path(out, &format!("{}.md", slug)))
        .transpose()
        .context("Failed to prepare output path")?;

    let media = MediaConfig { max_width: args.image_width, ..Default::default() };

    if args.embed_images {
        embed_page_images(args, &mut rendered, &media).await?;
    } else if args.download_images {
        match &out_path {
            Some(path) => download_page_images(args, &mut rendered, path, slug, &media).await?,
            None => print_warning("--download-images needs -o/--output, leaving image links as they are"),
        }
    }

    match out_path {
        Some(path) => {
            save_markdown(&rendered.markdown, &path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            print_success(&format!("Saved: {}", path.display()));

            if !rendered.references.is_empty() {
                let refs_path = references_path(&path);
                save_markdown(&rendered.references, &refs_path)
                    .with_context(|| format!("Failed to write {}", refs_path.display()))?;
                print_success(&format!("Saved: {}", refs_path.display()));
            }
        }
        None => println!("{}", rendered.combined()),
    }

    Ok(())
}

async fn embed_page_images(args: &Args, rendered: &mut Rendered, media: &MediaConfig) -> anyhow::Result<()> {
    let urls = find_image_urls(&rendered.markdown);
    if urls.is_empty() {
        return Ok(());
    }

    if args.verbose {
        print_info(&format!("Embedding {} images", urls.len()));
    }

    let data_uris = download_images_as_base64(&urls, media)
        .await
        .context("Failed to embed images")?;
    rendered.markdown = embed_images(&rendered.markdown, &data_uris);
    rendered.references = embed_images(&rendered.references, &data_uris);

    Ok(())
}

async fn download_page_images(
    args: &Args, rendered: &mut Rendered, markdown_path: &Path, slug: &str, media: &MediaConfig,
) -> anyhow::Result<()> {
    let urls = find_image_urls(&rendered.markdown);
    if urls.is_empty() {
        return Ok(());
    }

    let base_dir = markdown_path.parent().unwrap_or_else(|| Path::new(""));
    let images_dir = base_dir.join(format!("{}_images", slug));

    let saved = download_and_compress_images(&urls, &images_dir, media)
        .await
        .with_context(|| format!("Failed to download images into {}", images_dir.display()))?;
    rendered.markdown = relink_images(&rendered.markdown, &saved, base_dir);

    if args.verbose && !saved.is_empty() {
        let total: u64 = saved
            .values()
            .filter_map(|path| std::fs::metadata(path).ok())
            .map(|meta| meta.len())
            .sum();
        print_success(&format!(
            "Downloaded: {} images ({}) to {}/",
            saved.len(),
            format_size(total),
            images_dir.display()
        ));
    }

    Ok(())
}

fn write_screenshot(args: &Args, page: &FetchResult, slug: &str, output: Option<&str>) -> anyhow::Result<()> {
    let bytes = page
        .screenshot
        .as_deref()
        .filter(|bytes| !bytes.is_empty())
        .ok_or(C2mdError::MissingCapture { kind: "screenshot" })?;
    let Some(output) = output else {
        bail!("Screenshot mode requires -o/--output");
    };

    let extension = if args.screenshot_width.is_some() { "jpg" } else { "png" };
    let path = resolve_output_path(output, &format!("{}.{}", slug, extension))?;
    let size = save_screenshot(bytes, &path, args.screenshot_quality, args.screenshot_width)
        .with_context(|| format!("Failed to save screenshot to {}", path.display()))?;

    if args.verbose {
        print_success(&format!("Saved: {} ({})", path.display(), format_size(size)));
    } else {
        print_success(&format!("Saved: {}", path.display()));
    }

    Ok(())
}

fn write_pdf(page: &FetchResult, slug: &str, output: Option<&str>) -> anyhow::Result<()> {
    let bytes = page
        .pdf
        .as_deref()
        .filter(|bytes| !bytes.is_empty())
        .ok_or(C2mdError::MissingCapture { kind: "PDF" })?;
    let Some(output) = output else {
        bail!("PDF mode requires -o/--output");
    };

    let path = resolve_output_path(output, &format!("{}.pdf", slug))?;
    save_pdf(bytes, &path).with_context(|| format!("Failed to save PDF to {}", path.display()))?;
    print_success(&format!("Saved: {}", path.display()));

    Ok(())
}

fn write_metadata(page: &FetchResult, slug: &str, output: Option<&str>) -> anyhow::Result<()> {
    let json = extract_metadata(&page.html, &page.url)
        .to_json_pretty()
        .context("Failed to serialize metadata")?;

    match output {
        Some(output) => {
            let path = resolve_output_path(output, &format!("{}_meta.json", slug))?;
            save_markdown(&json, &path).with_context(|| format!("Failed to write {}", path.display()))?;
            print_success(&format!("Saved: {}", path.display()));
        }
        None => println!("{}", json),
    }

    Ok(())
}

fn write_archive(args: &Args, page: &FetchResult, slug: &str, output: Option<&str>) -> anyhow::Result<()> {
    let Some(output) = output else {
        bail!("Archive mode requires -o/--output");
    };

    let dir = if output.ends_with('/') { PathBuf::from(output) } else { Path::new(output).join(slug) };

    let rendered = render_markdown(&page.html, &markdown_options(args, &page.url))
        .with_context(|| format!("Failed to convert {} to Markdown", display_name(page)))?;
    let metadata = extract_metadata(&page.html, &page.url);

    let contents = ArchiveContents {
        markdown: rendered.markdown,
        references: Some(rendered.references),
        screenshot: page.screenshot.clone(),
        pdf: page.pdf.clone(),
        metadata_json: Some(metadata.to_json_pretty().context("Failed to serialize metadata")?),
        screenshot_quality: args.screenshot_quality,
    };

    let saved = save_archive(&dir, &contents).with_context(|| format!("Failed to write archive {}", dir.display()))?;

    print_success(&format!("Archive created: {}/", dir.display()));
    for path in saved {
        if let Some(name) = path.file_name() {
            print_detail("file", &name.to_string_lossy());
        }
    }

    Ok(())
}

/// `<stem>_refs.md` next to the Markdown file.
fn references_path(markdown_path: &Path) -> PathBuf {
    let stem = markdown_path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "page".to_string());
    markdown_path.with_file_name(format!("{}_refs.md", stem))
}

fn display_name(page: &FetchResult) -> &str {
    if page.url.is_empty() { "input" } else { &page.url }
}
