//! Single-page Markdown rendering.
//!
//! Chains conversion, cleanup, optional image stripping and optional
//! citations into one call.

use crate::Result;
use crate::citations::add_citations;
use crate::convert::{ConvertConfig, html_to_markdown};
use crate::postprocess::{clean_markdown, strip_markdown_images};

/// Options for [`render_markdown`].
#[derive(Debug, Clone, Default)]
pub struct MarkdownOptions {
    pub convert: ConvertConfig,
    /// Remove `![..](..)` images from the result.
    pub strip_images: bool,
    /// Replace inline links with numbered references.
    pub citations: bool,
}

/// Rendered Markdown and its reference list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rendered {
    pub markdown: String,
    /// Empty unless citations were requested and links were found.
    pub references: String,
}

impl Rendered {
    /// Markdown followed by the references, as printed to stdout.
    pub fn combined(&self) -> String {
        if self.references.is_empty() {
            self.markdown.clone()
        } else {
            format!("{}\n{}", self.markdown, self.references)
        }
    }
}

/// Convert HTML to cleaned Markdown.
pub fn render_markdown(html: &str, options: &MarkdownOptions) -> Result<Rendered> {
    let converted = html_to_markdown(html, &options.convert)?;
    let mut markdown = clean_markdown(&converted);

    if options.strip_images {
        markdown = strip_markdown_images(&markdown);
    }

    if options.citations {
        let cited = add_citations(&markdown);
        return Ok(Rendered { markdown: cited.body, references: cited.references });
    }

    Ok(Rendered { markdown, references: String::new() })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
            <h1>Title</h1>
            <p>Read <a href="https://example.com/docs">the docs</a> first.</p>
            <p><img src="https://example.com/photo.jpg" alt="Photo"></p>
        </body></html>
    "#;

    fn raw_options() -> MarkdownOptions {
        MarkdownOptions { convert: ConvertConfig::raw(), ..Default::default() }
    }

    #[test]
    fn test_render_plain() {
        let rendered = render_markdown(PAGE, &raw_options()).unwrap();
        assert!(rendered.markdown.contains("# Title"));
        assert!(rendered.markdown.contains("[the docs](https://example.com/docs)"));
        assert!(rendered.markdown.contains("![Photo](https://example.com/photo.jpg)"));
        assert!(rendered.references.is_empty());
    }

    #[test]
    fn test_render_without_images() {
        let options = MarkdownOptions { strip_images: true, ..raw_options() };
        let rendered = render_markdown(PAGE, &options).unwrap();
        assert!(!rendered.markdown.contains("photo.jpg"));
        assert!(rendered.markdown.contains("the docs"));
    }

    #[test]
    fn test_render_with_citations() {
        let options = MarkdownOptions { citations: true, ..raw_options() };
        let rendered = render_markdown(PAGE, &options).unwrap();
        assert!(rendered.markdown.contains("the docs [1]"));
        assert!(rendered.references.contains("[1] https://example.com/docs"));
        assert!(rendered.markdown.contains("![Photo](https://example.com/photo.jpg)"));
    }

    #[test]
    fn test_combined() {
        let rendered = Rendered { markdown: "Body [1]".to_string(), references: "\n## References\n\n[1] u".to_string() };
        assert_eq!(rendered.combined(), "Body [1]\n\n## References\n\n[1] u");

        let plain = Rendered { markdown: "Body".to_string(), references: String::new() };
        assert_eq!(plain.combined(), "Body");
    }

    #[test]
    fn test_empty_html() {
        assert_eq!(render_markdown("", &MarkdownOptions::default()).unwrap(), Rendered::default());
    }
}
