//! Markdown to HTML rendering.

use std::collections::HashSet;

use pulldown_cmark::{html, CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd};
use serde::Serialize;

use crate::codeblock::code_block_html;

/// A table of contents entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TocEntry {
    /// Heading text
    pub title: String,
    /// Anchor ID
    pub id: String,
    /// Heading level (1-6)
    pub level: u8,
}

/// Output of rendering a markdown body.
#[derive(Debug, Clone, Default)]
pub struct Rendered {
    /// Rendered HTML
    pub html: String,

    /// Headings in document order
    pub toc: Vec<TocEntry>,

    /// Link destinations in document order (images excluded)
    pub links: Vec<String>,
}

/// Markdown dialect shared by rendering and code block extraction.
pub fn markdown_options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_HEADING_ATTRIBUTES
}

/// Render a markdown body to HTML.
///
/// Never fails: markup pulldown-cmark cannot interpret is emitted as text.
pub fn render_markdown(body: &str) -> Rendered {
    let events: Vec<Event> = Parser::new_ext(body, markdown_options()).collect();

    let toc = collect_headings(&events);
    let mut ids = toc.iter().map(|entry| entry.id.clone());

    let mut links = Vec::new();
    let mut code: Option<(String, String)> = None; // (info, source)
    let mut output = Vec::with_capacity(events.len());

    for event in events {
        match event {
            Event::Start(Tag::Heading {
                level,
                classes,
                attrs,
                ..
            }) => {
                output.push(Event::Start(Tag::Heading {
                    level,
                    id: ids.next().map(CowStr::from),
                    classes,
                    attrs,
                }));
            }

            Event::Start(Tag::CodeBlock(kind)) => {
                let info = match kind {
                    CodeBlockKind::Fenced(info) => info.to_string(),
                    CodeBlockKind::Indented => String::new(),
                };
                code = Some((info, String::new()));
            }

            Event::Text(text) if code.is_some() => {
                if let Some((_, source)) = code.as_mut() {
                    source.push_str(&text);
                }
            }

            Event::End(TagEnd::CodeBlock) => {
                if let Some((info, source)) = code.take() {
                    output.push(Event::Html(code_block_html(&info, &source).into()));
                }
            }

            Event::Start(Tag::Link {
                link_type,
                dest_url,
                title,
                id,
            }) => {
                links.push(dest_url.to_string());
                output.push(Event::Start(Tag::Link {
                    link_type,
                    dest_url,
                    title,
                    id,
                }));
            }

            other => output.push(other),
        }
    }

    let mut html_output = String::with_capacity(body.len() * 3 / 2);
    html::push_html(&mut html_output, output.into_iter());

    Rendered {
        html: html_output,
        toc,
        links,
    }
}

/// Assign every heading a unique anchor.
///
/// Explicit `{#id}` anchors are reserved first, so a generated slug never
/// takes an id a later heading asks for.
fn collect_headings(events: &[Event]) -> Vec<TocEntry> {
    let mut toc = Vec::new();
    let mut issued: HashSet<String> = events
        .iter()
        .filter_map(|event| match event {
            Event::Start(Tag::Heading { id: Some(id), .. }) => Some(id.to_string()),
            _ => None,
        })
        .collect();
    let mut current: Option<(u8, Option<String>, String)> = None; // (level, explicit id, text)

    for event in events {
        match event {
            Event::Start(Tag::Heading { level, id, .. }) => {
                current = Some((*level as u8, id.as_ref().map(|s| s.to_string()), String::new()));
            }
            Event::Text(text) | Event::Code(text) => {
                if let Some((_, _, ref mut title)) = current {
                    title.push_str(text);
                }
            }
            Event::End(TagEnd::Heading(_)) => {
                if let Some((level, explicit, title)) = current.take() {
                    let id = explicit.unwrap_or_else(|| unique_slug(&title, &mut issued));
                    toc.push(TocEntry { title, id, level });
                }
            }
            _ => {}
        }
    }

    toc
}

/// Slug for a heading, suffixed `-1`, `-2`… until it is unused.
fn unique_slug(title: &str, issued: &mut HashSet<String>) -> String {
    let mut base = slugify(title);
    if base.is_empty() {
        base = "section".to_string();
    }

    let mut id = base.clone();
    let mut n = 1;
    while issued.contains(&id) {
        id = format!("{}-{}", base, n);
        n += 1;
    }
    issued.insert(id.clone());
    id
}

/// Convert a heading to a URL-safe slug.
pub fn slugify(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c
            } else if c.is_whitespace() || c == '-' || c == '_' {
                '-'
            } else {
                '\0'
            }
        })
        .filter(|c| *c != '\0')
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn renders_headings_with_anchors() {
        let rendered = render_markdown("# Hello World\n\n## Details\n\n## Details\n");

        assert!(rendered.html.contains("<h1 id=\"hello-world\">Hello World</h1>"));
        assert!(rendered.html.contains("<h2 id=\"details\">Details</h2>"));
        assert!(rendered.html.contains("<h2 id=\"details-1\">Details</h2>"));
        assert_eq!(
            rendered.toc,
            vec![
                TocEntry {
                    title: "Hello World".to_string(),
                    id: "hello-world".to_string(),
                    level: 1
                },
                TocEntry {
                    title: "Details".to_string(),
                    id: "details".to_string(),
                    level: 2
                },
                TocEntry {
                    title: "Details".to_string(),
                    id: "details-1".to_string(),
                    level: 2
                },
            ]
        );
    }

    #[test]
    fn suffixed_ids_never_repeat() {
        let rendered = render_markdown("## Details\n\n## Details 1\n\n## Details\n\n## Custom {#details-2}\n");

        let ids: Vec<&str> = rendered.toc.iter().map(|e| e.id.as_str()).collect();

        assert_eq!(ids, vec!["details", "details-1", "details-3", "details-2"]);
        assert!(rendered.html.contains("<h2 id=\"details-3\">Details</h2>"));
    }

    #[test]
    fn keeps_explicit_heading_ids() {
        let rendered = render_markdown("## Setup {#install}\n");

        assert_eq!(rendered.toc[0].id, "install");
        assert!(rendered.html.contains("id=\"install\""));
    }

    #[test]
    fn fenced_code_is_never_markup() {
        let rendered = render_markdown("```markdown\n# not a heading\n**not bold**\n```\n");

        assert!(!rendered.html.contains("<h1"));
        assert!(!rendered.html.contains("<strong>"));
        assert!(rendered.html.contains("# not a heading"));
        assert!(rendered.html.contains("class=\"language-markdown\""));
        assert!(rendered.toc.is_empty());
    }

    #[test]
    fn renders_block_elements() {
        let body = "> quoted\n\n---\n\n- one\n- two\n\n1. first\n2. second\n\n*em* and **strong** and `code`\n";

        let html = render_markdown(body).html;

        assert!(html.contains("<blockquote>"));
        assert!(html.contains("<hr />"));
        assert!(html.contains("<ul>"));
        assert!(html.contains("<ol>"));
        assert!(html.contains("<em>em</em>"));
        assert!(html.contains("<strong>strong</strong>"));
        assert!(html.contains("<code>code</code>"));
    }

    #[test]
    fn renders_tables_with_alignment() {
        let body = "| Name | Score |\n|:-----|------:|\n| a    | 1     |\n";

        let html = render_markdown(body).html;

        assert!(html.contains("<table>"));
        assert!(html.contains("<th style=\"text-align: left\">Name</th>"));
        assert!(html.contains("<td style=\"text-align: right\">1</td>"));
    }

    #[test]
    fn collects_links_but_not_images() {
        let body = "[Work](/work/) and ![pic](/img/a.png) and [ext](https://example.com)\n";

        let rendered = render_markdown(body);

        assert_eq!(rendered.links, vec!["/work/", "https://example.com"]);
        assert!(rendered.html.contains("<img src=\"/img/a.png\" alt=\"pic\" />"));
    }

    #[test]
    fn passes_raw_html_through() {
        let body = "<div class=\"hero\">\n<p>Hi</p>\n</div>\n";

        let html = render_markdown(body).html;

        assert!(html.contains("<div class=\"hero\">"));
    }

    #[test]
    fn malformed_markup_degrades_to_text() {
        let html = render_markdown("**unclosed emphasis and [broken link(\n").html;

        assert!(html.contains("**unclosed emphasis and [broken link("));
    }

    #[test]
    fn slugify_works() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("API Reference"), "api-reference");
        assert_eq!(slugify("Button (Primary)"), "button-primary");
        assert_eq!(slugify("  Multiple   Spaces  "), "multiple-spaces");
    }
}
