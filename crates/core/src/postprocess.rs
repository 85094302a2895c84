//! Markdown cleanup pipeline.
//!
//! Fixes common HTML-to-Markdown conversion artifacts. [`clean_markdown`]
//! runs the stages in a fixed order:
//!
//! 1. [`fix_heading_linebreaks`] (structural; relies on blank lines still
//!    separating blocks, so it runs before blank lines are collapsed)
//! 2. [`fix_citation_duplication`]
//! 3. [`strip_empty_image_links`]
//! 4. [`collapse_blank_lines`]

use std::sync::LazyLock;

use fancy_regex::Regex as FancyRegex;
use regex::Regex;

static ORPHAN_HEADING: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(#{1,6})\s*$").unwrap());

static DUPLICATED_CITATION: LazyLock<FancyRegex> =
    LazyLock::new(|| FancyRegex::new(r"([\w][^\[\]]{0,60}?)\s*\[(\d+)\]\s*\1").unwrap());

static EMPTY_IMAGE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"!\[\]\([^)]+\)\s*").unwrap());

static EMPTY_LINK: LazyLock<FancyRegex> = LazyLock::new(|| FancyRegex::new(r"(?<!!)\[\]\([^)]+\)\s*").unwrap());

static EXCESS_BLANK_LINES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{4,}").unwrap());

static MARKDOWN_IMAGE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"!\[[^\]]*\]\([^)]+\)\s*").unwrap());

/// Line prefixes that end an orphaned heading's fragment run.
const BLOCK_MARKERS: [&str; 7] = ["#", "-", "*", "[", "|", ">", "```"];

/// Longest line (in words) still treated as a heading fragment.
const MAX_FRAGMENT_WORDS: usize = 3;

/// Run every cleanup stage over converted Markdown.
pub fn clean_markdown(markdown: &str) -> String {
    if markdown.is_empty() {
        return String::new();
    }

    let markdown = fix_heading_linebreaks(markdown);
    let markdown = fix_citation_duplication(&markdown);
    let markdown = strip_empty_image_links(&markdown);
    let markdown = collapse_blank_lines(&markdown);

    markdown.trim().to_string()
}

/// Join single-word lines that follow an orphaned heading marker.
///
/// Animated headings that wrap each word in its own element convert to
///
/// ```text
/// #
/// Complete
/// Guide
/// ```
///
/// which this folds back into `# Complete Guide`.
pub fn fix_heading_linebreaks(markdown: &str) -> String {
    let lines: Vec<&str> = markdown.split('\n').collect();
    let mut result: Vec<String> = Vec::with_capacity(lines.len());
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];

        if let Some(caps) = ORPHAN_HEADING.captures(line) {
            let level = &caps[1];
            let mut fragments = Vec::new();
            let mut j = i + 1;

            while j < lines.len() {
                let next = lines[j].trim();
                if !is_heading_fragment(next) {
                    break;
                }
                fragments.push(next);
                j += 1;
            }

            if !fragments.is_empty() {
                result.push(format!("{} {}", level, fragments.join(" ")));
                i = j;
                continue;
            }
        }

        result.push(line.to_string());
        i += 1;
    }

    result.join("\n")
}

fn is_heading_fragment(line: &str) -> bool {
    !line.is_empty()
        && !BLOCK_MARKERS.iter().any(|marker| line.starts_with(marker))
        && line.split_whitespace().count() <= MAX_FRAGMENT_WORDS
}

/// Collapse `text[N]text` into `text[N]` when link text was emitted on both
/// sides of a citation marker.
pub fn fix_citation_duplication(markdown: &str) -> String {
    DUPLICATED_CITATION.replace_all(markdown, "${1}[${2}]").into_owned()
}

/// Remove empty image and link syntax such as `![](url)` and `[](url)`.
pub fn strip_empty_image_links(markdown: &str) -> String {
    let without_images = EMPTY_IMAGE.replace_all(markdown, "");
    EMPTY_LINK.replace_all(&without_images, "").into_owned()
}

/// Collapse runs of four or more newlines down to three.
pub fn collapse_blank_lines(markdown: &str) -> String {
    EXCESS_BLANK_LINES.replace_all(markdown, "\n\n\n").into_owned()
}

/// Remove every Markdown image, including its alt text.
pub fn strip_markdown_images(markdown: &str) -> String {
    MARKDOWN_IMAGE.replace_all(markdown, "").into_owned()
}

/// Collapse excess blank lines and strip trailing whitespace from each line.
///
/// Applied to raw converter output before the cleanup stages.
pub fn tidy_converted(markdown: &str) -> String {
    let collapsed = collapse_blank_lines(markdown);
    let lines: Vec<&str> = collapsed.split('\n').map(str::trim_end).collect();
    lines.join("\n").trim().to_string()
}
