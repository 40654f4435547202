//! Fenced code block extraction and rendering.

use pulldown_cmark::{CodeBlockKind, Event, Parser, Tag, TagEnd};

use crate::render::markdown_options;
use crate::text::escape_html;

/// A code block found in a markdown body.
#[derive(Debug, Clone, PartialEq)]
pub struct CodeBlock {
    /// Language tag from the fence info string (e.g. `rust`)
    pub language: Option<String>,

    /// Full info string after the opening fence
    pub info: String,

    /// Source code content
    pub source: String,

    /// Line number where the block starts (1-indexed, relative to the body)
    pub line_number: usize,

    /// Optional filename hint from info string
    pub filename: Option<String>,
}

/// Language tag from a code fence info string.
///
/// Accepts both `rust` and the attribute form `{.rust}`.
pub fn language_from_info(info: &str) -> Option<String> {
    let lang = info.split_whitespace().next()?;
    let lang = lang.trim_start_matches('{').trim_end_matches('}');
    let lang = lang.trim_start_matches('.').trim_end_matches(',');
    if lang.is_empty() || lang.contains('=') {
        None
    } else {
        Some(lang.to_lowercase())
    }
}

/// Extract filename from code fence info string if present.
///
/// Supports formats like:
/// - `rust filename="main.rs"`
/// - `rust file=main.rs`
pub fn extract_filename(info: &str) -> Option<String> {
    // Try filename="..." format
    if let Some(start) = info.find("filename=\"") {
        let rest = &info[start + 10..];
        if let Some(end) = rest.find('"') {
            return Some(rest[..end].to_string());
        }
    }

    // Try file=... format (without quotes)
    if let Some(start) = info.find("file=") {
        let rest = &info[start + 5..];
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        let filename = rest[..end].trim_matches('"');
        if !filename.is_empty() {
            return Some(filename.to_string());
        }
    }

    None
}

/// Render a code block as HTML.
///
/// The contents are escaped and never interpreted as markup. The language
/// tag is passed through as a `language-*` class for client-side
/// highlighting.
pub fn code_block_html(info: &str, source: &str) -> String {
    let mut html = String::from("<pre");
    if let Some(filename) = extract_filename(info) {
        html.push_str(" data-filename=\"");
        html.push_str(&escape_html(&filename));
        html.push('"');
    }
    html.push_str("><code");
    if let Some(lang) = language_from_info(info) {
        html.push_str(" class=\"language-");
        html.push_str(&escape_html(&lang));
        html.push('"');
    }
    html.push('>');
    html.push_str(&escape_html(source));
    html.push_str("</code></pre>\n");
    html
}

/// Extract every code block from a markdown body, in document order.
pub fn extract_code_blocks(body: &str) -> Vec<CodeBlock> {
    let mut blocks = Vec::new();
    let mut current: Option<CodeBlock> = None;

    for (event, range) in Parser::new_ext(body, markdown_options()).into_offset_iter() {
        match event {
            Event::Start(Tag::CodeBlock(kind)) => {
                let info = match kind {
                    CodeBlockKind::Fenced(info) => info.to_string(),
                    CodeBlockKind::Indented => String::new(),
                };
                current = Some(CodeBlock {
                    language: language_from_info(&info),
                    filename: extract_filename(&info),
                    info,
                    source: String::new(),
                    line_number: body[..range.start].matches('\n').count() + 1,
                });
            }
            Event::Text(text) => {
                if let Some(block) = current.as_mut() {
                    block.source.push_str(&text);
                }
            }
            Event::End(TagEnd::CodeBlock) => {
                if let Some(block) = current.take() {
                    blocks.push(block);
                }
            }
            _ => {}
        }
    }

    blocks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_language() {
        assert_eq!(language_from_info("rust"), Some("rust".to_string()));
        assert_eq!(language_from_info("Python title"), Some("python".to_string()));
        assert_eq!(language_from_info("{.toml}"), Some("toml".to_string()));
        assert_eq!(language_from_info(""), None);
        assert_eq!(language_from_info("file=main.rs"), None);
    }

    #[test]
    fn extracts_filename() {
        assert_eq!(
            extract_filename("rust filename=\"main.rs\""),
            Some("main.rs".to_string())
        );
        assert_eq!(
            extract_filename("rust file=lib.rs"),
            Some("lib.rs".to_string())
        );
        assert_eq!(extract_filename("rust"), None);
    }

    #[test]
    fn renders_escaped_code() {
        let html = code_block_html("html", "<b>bold</b> & more\n");

        assert_eq!(
            html,
            "<pre><code class=\"language-html\">&lt;b&gt;bold&lt;/b&gt; &amp; more\n</code></pre>\n"
        );
    }

    #[test]
    fn renders_filename_attribute() {
        let html = code_block_html("rust file=main.rs", "fn main() {}\n");

        assert!(html.starts_with("<pre data-filename=\"main.rs\"><code class=\"language-rust\">"));
    }

    #[test]
    fn extracts_blocks_with_line_numbers() {
        let body = "# Title\n\n```rust\nfn main() {}\n```\n\ntext\n\n```\nplain\n```\n";

        let blocks = extract_code_blocks(body);

        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].language.as_deref(), Some("rust"));
        assert_eq!(blocks[0].source, "fn main() {}\n");
        assert_eq!(blocks[0].line_number, 3);
        assert_eq!(blocks[1].language, None);
        assert_eq!(blocks[1].line_number, 9);
    }
}
