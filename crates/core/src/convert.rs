//! HTML to Markdown conversion.
//!
//! Pipeline:
//! 1. a CSS selector picks the content when one is given and matches,
//! 2. otherwise readability isolates the article body (unless raw),
//! 3. page chrome (`script`, `style`, `nav`, `footer`, `header`, `aside`)
//!    is removed,
//! 4. htmd converts the remainder with ATX headings and `-` bullets.

use dom_smoothie::Readability;

use crate::parse::Document;
use crate::postprocess::tidy_converted;
use crate::{C2mdError, Result};

/// Elements dropped from the content before conversion.
pub const CHROME_TAGS: [&str; 6] = ["script", "style", "nav", "footer", "header", "aside"];

/// Configuration for a single HTML to Markdown conversion.
#[derive(Debug, Clone)]
pub struct ConvertConfig {
    /// Page URL, used by readability to resolve relative links.
    pub url: Option<String>,
    /// Run readability to isolate the main content.
    pub strip_boilerplate: bool,
    /// CSS selector that takes priority over readability when it matches.
    pub selector: Option<String>,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self { url: None, strip_boilerplate: true, selector: None }
    }
}

impl ConvertConfig {
    /// Conversion of the whole document, without boilerplate removal.
    pub fn raw() -> Self {
        Self { strip_boilerplate: false, ..Default::default() }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

/// Convert an HTML page to Markdown.
///
/// Empty or whitespace-only input yields an empty string.
pub fn html_to_markdown(html: &str, config: &ConvertConfig) -> Result<String> {
    if html.trim().is_empty() {
        return Ok(String::new());
    }

    let content_html = select_content(html, config)?;
    let stripped = strip_tags(&content_html, &CHROME_TAGS)?;
    let markdown = convert_html(&stripped);

    Ok(tidy_converted(&markdown))
}

/// Pick the HTML that should be converted.
fn select_content(html: &str, config: &ConvertConfig) -> Result<String> {
    if let Some(selector) = &config.selector {
        let doc = Document::parse(html);
        let selected = doc.select(selector)?;

        if !selected.is_empty() {
            tracing::debug!(selector, matches = selected.len(), "using selector content");
            return Ok(selected
                .iter()
                .map(|el| el.outer_html())
                .collect::<Vec<_>>()
                .join("\n"));
        }

        tracing::debug!(selector, "selector matched nothing");
    }

    if config.strip_boilerplate
        && let Some(article) = readability_extract(html, config.url.as_deref())
    {
        return Ok(article);
    }

    Ok(html.to_string())
}

/// Extract the main content with readability.
///
/// Returns `None` when no article could be identified.
pub fn readability_extract(html: &str, url: Option<&str>) -> Option<String> {
    let mut readability = match Readability::new(html, url, None) {
        Ok(readability) => readability,
        Err(e) => {
            tracing::debug!(error = %e, "readability setup failed, using full document");
            return None;
        }
    };

    match readability.parse() {
        Ok(article) => {
            let content = article.content.to_string();
            if content.trim().is_empty() { None } else { Some(content) }
        }
        Err(e) => {
            tracing::debug!(error = %e, "no article found, using full document");
            None
        }
    }
}

/// Remove every element named in `tags`, including its content.
pub fn strip_tags(html: &str, tags: &[&str]) -> Result<String> {
    let mut output = Vec::new();
    let handlers = tags
        .iter()
        .map(|tag| {
            lol_html::element!(*tag, |el| {
                el.remove();
                Ok(())
            })
        })
        .collect();

    let mut rewriter = lol_html::HtmlRewriter::new(
        lol_html::Settings { element_content_handlers: handlers, ..Default::default() },
        |c: &[u8]| output.extend_from_slice(c),
    );

    rewriter
        .write(html.as_bytes())
        .map_err(|e| C2mdError::HtmlParseError(e.to_string()))?;
    rewriter.end().map_err(|e| C2mdError::HtmlParseError(e.to_string()))?;

    String::from_utf8(output).map_err(|e| C2mdError::HtmlParseError(e.to_string()))
}

/// Convert HTML to Markdown using the htmd crate.
#[cfg(feature = "markdown")]
fn convert_html(html: &str) -> String {
    use htmd::HtmlToMarkdown;
    use htmd::options::{BulletListMarker, HeadingStyle, Options};

    let converter = HtmlToMarkdown::builder()
        .options(Options {
            heading_style: HeadingStyle::Atx,
            bullet_list_marker: BulletListMarker::Dash,
            ul_bullet_spacing: 1,
            ol_number_spacing: 1,
            ..Default::default()
        })
        .build();

    converter.convert(html).unwrap_or_default()
}

/// Fallback HTML to text conversion when the markdown feature is disabled.
#[cfg(not(feature = "markdown"))]
fn convert_html(html: &str) -> String {
    Document::parse(html).text_content()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(html: &str) -> String {
        html_to_markdown(html, &ConvertConfig::raw()).unwrap()
    }

    #[test]
    fn test_basic_html() {
        let result = raw("<html><body><h1>Title</h1><p>Hello world.</p></body></html>");
        assert!(result.contains("Title"));
        assert!(result.contains("Hello world."));
    }

    #[test]
    fn test_empty_html() {
        assert_eq!(html_to_markdown("", &ConvertConfig::default()).unwrap(), "");
        assert_eq!(html_to_markdown("   ", &ConvertConfig::default()).unwrap(), "");
    }

    #[test]
    fn test_heading_levels() {
        let result = raw("<h1>H1</h1><h2>H2</h2><h3>H3</h3>");
        assert!(result.contains("# H1"));
        assert!(result.contains("## H2"));
        assert!(result.contains("### H3"));
    }

    #[cfg(feature = "markdown")]
    #[test]
    fn test_dash_bullets() {
        let result = raw("<ul><li>One</li><li>Two</li></ul>");
        assert_eq!(result, "- One\n- Two");
    }

    #[cfg(feature = "markdown")]
    #[test]
    fn test_ordered_list_spacing() {
        let result = raw("<ol><li>First</li><li>Second</li></ol>");
        assert_eq!(result, "1. First\n2. Second");
    }

    #[test]
    fn test_strips_nav_footer() {
        let html = r#"
            <html><body>
                <nav><a href="/">Home</a></nav>
                <article><p>Main content</p></article>
                <footer><p>Copyright 2026</p></footer>
            </body></html>
        "#;
        let result = raw(html);
        assert!(result.contains("Main content"));
        assert!(!result.contains("Copyright 2026"));
        assert!(!result.contains("Home"));
    }

    #[test]
    fn test_css_selector() {
        let html = r#"
            <html><body>
                <div class="sidebar">Sidebar stuff</div>
                <article class="post">Important content here</article>
            </body></html>
        "#;
        let config = ConvertConfig { selector: Some("article.post".to_string()), ..ConvertConfig::raw() };
        let result = html_to_markdown(html, &config).unwrap();
        assert!(result.contains("Important content"));
        assert!(!result.contains("Sidebar"));
    }

    #[test]
    fn test_selector_without_match_uses_document() {
        let html = "<div>Everything</div>";
        let config = ConvertConfig { selector: Some("article".to_string()), ..ConvertConfig::raw() };
        assert!(html_to_markdown(html, &config).unwrap().contains("Everything"));
    }

    #[test]
    fn test_invalid_selector() {
        let config = ConvertConfig { selector: Some("[[bad".to_string()), ..ConvertConfig::raw() };
        let result = html_to_markdown("<p>x</p>", &config);
        assert!(matches!(result, Err(C2mdError::InvalidSelector { .. })));
    }

    #[test]
    fn test_links_preserved() {
        let result = raw(r#"<p>Visit <a href="https://example.com">Example</a></p>"#);
        assert!(result.contains("[Example](https://example.com)"));
    }

    #[test]
    fn test_code_blocks() {
        let result = raw("<pre><code>def hello():\n    print('hi')</code></pre>");
        assert!(result.contains("def hello():"));
    }

    #[test]
    fn test_readability_extracts_main_content() {
        let html = r#"
            <html><head><title>Article Title</title></head><body>
                <nav><ul><li>Menu 1</li><li>Menu 2</li></ul></nav>
                <article>
                    <h1>Article Title</h1>
                    <p>This is the main article content with enough text to be recognized as the
                    primary content by readability. It needs to be reasonably long to be identified,
                    so it keeps going for a while with more words about the subject at hand.</p>
                    <p>Another paragraph of real content that helps readability determine this is the
                    main content area of the page, adding sentences, commas, and more detail.</p>
                </article>
                <aside>Related links sidebar</aside>
            </body></html>
        "#;
        let result = html_to_markdown(html, &ConvertConfig::default()).unwrap();
        assert!(result.contains("main article content"));
        assert!(!result.contains("Related links sidebar"));
        assert!(!result.contains("Menu 1"));
    }

    #[test]
    fn test_strip_tags() {
        let html = "<div><script>alert(1)</script><p>Keep</p><style>p{}</style></div>";
        let result = strip_tags(html, &["script", "style"]).unwrap();
        assert_eq!(result, "<div><p>Keep</p></div>");
    }

    #[test]
    fn test_no_trailing_whitespace() {
        let result = raw("<p>Line one</p><p>Line two</p>");
        for line in result.lines() {
            assert_eq!(line, line.trim_end());
        }
    }
}
