//! Content parsing for folio sites.
//!
//! This crate extracts front matter from content documents and renders their
//! markdown bodies to HTML. Everything here is a pure function of its input;
//! reading and writing files is the site builder's job.

pub mod codeblock;
pub mod frontmatter;
pub mod parser;
pub mod render;
pub mod text;

pub use codeblock::CodeBlock;
pub use frontmatter::{format_date, FieldValue, Frontmatter, FrontmatterError};
pub use parser::{parse_document, ParseError, ParsedDoc};
pub use render::{render_markdown, Rendered, TocEntry};
