//! Small HTML text helpers.

/// Escape text for use in HTML content and attribute values.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Tags whose boundaries separate words in the visible text.
const BLOCK_TAGS: &[&str] = &[
    "p", "div", "br", "hr", "h1", "h2", "h3", "h4", "h5", "h6", "li", "ul", "ol", "pre",
    "blockquote", "table", "thead", "tbody", "tr", "td", "th", "section", "article", "figure",
    "figcaption",
];

/// Reduce rendered HTML to its visible text.
///
/// Tags are removed, the common entities are decoded and runs of whitespace
/// collapse to a single space. Block-level boundaries become spaces so
/// adjacent paragraphs do not run together.
pub fn strip_tags(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut tag: Option<String> = None;

    for ch in html.chars() {
        if let Some(name) = tag.as_mut() {
            if ch == '>' {
                let block = is_block_tag(name);
                tag = None;
                if block {
                    text.push(' ');
                }
            } else {
                name.push(ch);
            }
        } else if ch == '<' {
            tag = Some(String::new());
        } else {
            text.push(ch);
        }
    }

    collapse_whitespace(&decode_entities(&text))
}

fn is_block_tag(tag: &str) -> bool {
    let name = tag
        .trim_start_matches('/')
        .split(|c: char| c.is_whitespace() || c == '/')
        .next()
        .unwrap_or("");
    BLOCK_TAGS.iter().any(|t| t.eq_ignore_ascii_case(name))
}

/// Decode the entities pulldown-cmark emits for escaped text.
pub fn decode_entities(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncate text to at most `max_chars` characters.
///
/// Prefers to cut at the last word boundary inside the limit. Returns the
/// text and whether anything was cut.
pub fn truncate_chars(text: &str, max_chars: usize) -> (String, bool) {
    if text.chars().count() <= max_chars {
        return (text.to_string(), false);
    }

    let cut: String = text.chars().take(max_chars).collect();
    let at_boundary = text
        .chars()
        .nth(max_chars)
        .is_some_and(char::is_whitespace);
    let cut = match cut.rfind(' ') {
        Some(pos) if pos > 0 && !at_boundary => cut[..pos].to_string(),
        _ => cut,
    };

    (cut.trim_end().to_string(), true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & Jerry's</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; Jerry&#39;s&lt;/a&gt;"
        );
    }

    #[test]
    fn strips_tags_and_decodes() {
        let html = "<h1 id=\"t\">Title</h1>\n<p>Fish &amp; <em>chips</em> &lt;3</p>";

        assert_eq!(strip_tags(html), "Title Fish & chips <3");
    }

    #[test]
    fn adjacent_blocks_do_not_merge() {
        assert_eq!(strip_tags("<p>one</p><p>two</p>"), "one two");
    }

    #[test]
    fn truncates_on_word_boundary() {
        let (text, cut) = truncate_chars("the quick brown fox", 12);

        assert_eq!(text, "the quick");
        assert!(cut);
    }

    #[test]
    fn keeps_word_ending_at_limit() {
        let (text, cut) = truncate_chars("the quick brown fox", 9);

        assert_eq!(text, "the quick");
        assert!(cut);
    }

    #[test]
    fn inline_tags_do_not_split_words() {
        assert_eq!(strip_tags("<p><strong>bold</strong>, then</p>"), "bold, then");
    }

    #[test]
    fn short_text_is_untouched() {
        let (text, cut) = truncate_chars("short", 10);

        assert_eq!(text, "short");
        assert!(!cut);
    }

    #[test]
    fn truncates_multibyte_text_by_chars() {
        let (text, cut) = truncate_chars("ééééé", 3);

        assert_eq!(text, "ééé");
        assert!(cut);
    }
}
