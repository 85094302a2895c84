//! Inline links to numbered references.
//!
//! ```text
//! [text](url)   ->   text [1]
//!                    ...
//!                    ## References
//!                    [1] url
//! ```

use std::collections::HashMap;
use std::sync::LazyLock;

use fancy_regex::Regex;

/// `[text](url)` not preceded by `!`, so images are left alone.
static INLINE_LINK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?<!!)\[([^\]]*)\]\(([^)]+)\)").unwrap());

/// Markdown with links replaced by citation markers, plus the reference list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Citations {
    /// Markdown body with `[N]` markers.
    pub body: String,
    /// `## References` block, empty when nothing was cited.
    pub references: String,
}

/// Convert inline links to numbered citations.
///
/// Numbers follow first appearance and a repeated URL reuses its number.
/// Anchor links (`#...`) and images are kept as they are.
pub fn add_citations(markdown: &str) -> Citations {
    if markdown.is_empty() {
        return Citations::default();
    }

    let mut numbers: HashMap<&str, usize> = HashMap::new();
    let mut urls: Vec<&str> = Vec::new();
    let mut body = String::with_capacity(markdown.len());
    let mut last = 0;

    for caps in INLINE_LINK.captures_iter(markdown) {
        let caps = match caps {
            Ok(caps) => caps,
            Err(e) => {
                tracing::debug!(error = %e, "link scan stopped early");
                break;
            }
        };
        let (Some(whole), Some(text), Some(url)) = (caps.get(0), caps.get(1), caps.get(2)) else {
            continue;
        };
        let url = url.as_str();

        if url.starts_with('#') {
            continue;
        }

        let number = *numbers.entry(url).or_insert_with(|| {
            urls.push(url);
            urls.len()
        });

        body.push_str(&markdown[last..whole.start()]);
        let text = text.as_str();
        if text.trim().is_empty() {
            body.push_str(&format!("[{}]", number));
        } else {
            body.push_str(&format!("{} [{}]", text, number));
        }
        last = whole.end();
    }

    if urls.is_empty() {
        return Citations { body: markdown.to_string(), references: String::new() };
    }

    body.push_str(&markdown[last..]);

    let mut lines = vec![String::new(), "## References".to_string(), String::new()];
    lines.extend(urls.iter().enumerate().map(|(i, url)| format!("[{}] {}", i + 1, url)));

    Citations { body, references: lines.join("\n") }
}
