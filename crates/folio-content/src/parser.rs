//! Content document parser.

use crate::codeblock::{extract_code_blocks, CodeBlock};
use crate::frontmatter::{extract_frontmatter, Frontmatter, FrontmatterError};
use crate::render::{render_markdown, Rendered};

/// A parsed content document.
#[derive(Debug, Clone)]
pub struct ParsedDoc {
    /// Parsed front matter (empty when the document has none)
    pub frontmatter: Frontmatter,

    /// Markdown body (without front matter)
    pub body: String,

    /// Rendered body
    pub rendered: Rendered,

    /// Extracted code blocks
    pub code_blocks: Vec<CodeBlock>,
}

impl ParsedDoc {
    /// Distinct code block languages, sorted.
    pub fn languages(&self) -> Vec<String> {
        let mut languages: Vec<String> = self
            .code_blocks
            .iter()
            .filter_map(|b| b.language.clone())
            .collect();
        languages.sort();
        languages.dedup();
        languages
    }
}

/// Errors that can occur when parsing a document.
///
/// Rendering itself never fails, so only the front matter can be rejected.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Frontmatter error: {0}")]
    Frontmatter(#[from] FrontmatterError),
}

/// Parse a content document.
///
/// Extracts front matter, renders the body and collects its code blocks.
pub fn parse_document(source: &str) -> Result<ParsedDoc, ParseError> {
    let (frontmatter, body) = extract_frontmatter(source)?;

    Ok(ParsedDoc {
        frontmatter,
        body: body.to_string(),
        rendered: render_markdown(body),
        code_blocks: extract_code_blocks(body),
    })
}
