//! Collection membership, ordering and listing views.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::Path;

use folio_content::format_date;
use folio_content::text::{strip_tags, truncate_chars};
use glob::{MatchOptions, Pattern, PatternError};
use serde::Serialize;

use crate::config::{BuildConfig, CollectionRule};
use crate::page::Page;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// Compiled collection membership rules.
#[derive(Debug, Clone)]
pub struct CollectionRules {
    rules: Vec<(Pattern, String)>,
}

impl CollectionRules {
    /// Compile the glob of every rule.
    pub fn compile(rules: &[CollectionRule]) -> Result<Self, PatternError> {
        let rules = rules
            .iter()
            .map(|rule| Ok((Pattern::new(&rule.pattern)?, rule.name.clone())))
            .collect::<Result<Vec<_>, PatternError>>()?;
        Ok(Self { rules })
    }

    /// Distinct collection names, in rule order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for (_, name) in &self.rules {
            if !names.contains(&name.as_str()) {
                names.push(name);
            }
        }
        names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.rules.iter().any(|(_, n)| n == name)
    }

    /// Collections a page belongs to.
    ///
    /// Section indexes, listing pages and generated pages never join a
    /// collection. A page joins each collection at most once.
    pub fn memberships(&self, page: &Page) -> Vec<String> {
        if page.generated || page.lists.is_some() || page.is_section_index() {
            return Vec::new();
        }

        let path = slash_path(&page.relative_path);
        let mut names: Vec<String> = Vec::new();
        for (pattern, name) in &self.rules {
            if pattern.matches_with(&path, MATCH_OPTIONS) && !names.contains(name) {
                names.push(name.clone());
            }
        }
        names
    }
}

/// Relative path with `/` separators on every platform.
fn slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// A collection member as seen by listing templates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntryView {
    /// Route of the page
    pub route: String,
    /// URL including the site base URL
    pub url: String,
    pub title: String,
    pub description: Option<String>,
    /// Formatted date
    pub date: Option<String>,
    pub tags: Vec<String>,
    /// Tag-stripped preview of the rendered body
    pub excerpt: String,
    /// Whether the excerpt was cut short
    pub truncated: bool,
}

impl EntryView {
    fn from_page(page: &Page, config: &BuildConfig) -> Self {
        let (excerpt, truncated) = excerpt(&page.content, config.excerpt_length);

        Self {
            route: page.route.clone(),
            url: config.url_for(&page.route),
            title: page.title(),
            description: page.frontmatter.description().map(str::to_string),
            date: page.date().as_ref().map(format_date),
            tags: page.frontmatter.tags(),
            excerpt,
            truncated,
        }
    }
}

/// Excerpt of rendered HTML: tags stripped, then truncated.
///
/// Tags are removed before truncating, so a cut can never land inside one.
pub fn excerpt(html: &str, length: usize) -> (String, bool) {
    truncate_chars(&strip_tags(html), length)
}

/// All collections of one build, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct CollectionIndex {
    collections: BTreeMap<String, Vec<EntryView>>,
}

impl CollectionIndex {
    /// Group pages by their memberships and sort every collection.
    ///
    /// Order is `date` descending, undated pages last, ties broken by
    /// source path so the result never depends on discovery order.
    pub fn build(pages: &[Page], rules: &CollectionRules, config: &BuildConfig) -> Self {
        let mut grouped: BTreeMap<String, Vec<&Page>> = rules
            .names()
            .into_iter()
            .map(|name| (name.to_string(), Vec::new()))
            .collect();

        for page in pages {
            for name in &page.collections {
                grouped.entry(name.clone()).or_default().push(page);
            }
        }

        let collections = grouped
            .into_iter()
            .map(|(name, mut members)| {
                members.sort_by(|a, b| compare_entries(a, b));
                let entries = members
                    .iter()
                    .map(|page| EntryView::from_page(page, config))
                    .collect();
                (name, entries)
            })
            .collect();

        Self { collections }
    }

    pub fn get(&self, name: &str) -> Option<&[EntryView]> {
        self.collections.get(name).map(Vec::as_slice)
    }

    /// Every collection, keyed by name.
    pub fn all(&self) -> &BTreeMap<String, Vec<EntryView>> {
        &self.collections
    }
}

fn compare_entries(a: &Page, b: &Page) -> Ordering {
    let by_date = match (a.date(), b.date()) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_date.then_with(|| a.relative_path.cmp(&b.relative_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_content::parse_document;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn page(relative: &str, source: &str, rules: &CollectionRules) -> Page {
        let config = BuildConfig::default();
        let doc = parse_document(source).unwrap();
        let mut page = Page::new(
            PathBuf::from("content").join(relative),
            PathBuf::from(relative),
            doc,
            &config,
        );
        page.collections = rules.memberships(&page);
        page
    }

    fn blog_rules() -> CollectionRules {
        CollectionRules::compile(&[CollectionRule::new("blog/*", "blog")]).unwrap()
    }

    #[test]
    fn sorts_by_date_descending() {
        let rules = blog_rules();
        let pages = vec![
            page("blog/a.md", "---\ndate: 2023-08-15\n---\nA", &rules),
            page("blog/c.md", "---\ndate: 2026-01-29\n---\nC", &rules),
            page("blog/b.md", "---\ndate: 2025-12-07\n---\nB", &rules),
        ];

        let index = CollectionIndex::build(&pages, &rules, &BuildConfig::default());
        let dates: Vec<_> = index
            .get("blog")
            .unwrap()
            .iter()
            .map(|e| e.date.clone().unwrap())
            .collect();

        assert_eq!(dates, vec!["2026-01-29", "2025-12-07", "2023-08-15"]);
    }

    #[test]
    fn ties_break_by_source_path() {
        let rules = blog_rules();
        let pages = vec![
            page("blog/zeta.md", "Z", &rules),
            page("blog/same-b.md", "---\ndate: 2024-01-01\n---\n", &rules),
            page("blog/alpha.md", "A", &rules),
            page("blog/same-a.md", "---\ndate: 2024-01-01\n---\n", &rules),
        ];

        let index = CollectionIndex::build(&pages, &rules, &BuildConfig::default());
        let routes: Vec<_> = index
            .get("blog")
            .unwrap()
            .iter()
            .map(|e| e.route.as_str())
            .collect();

        assert_eq!(
            routes,
            vec![
                "/blog/same-a/",
                "/blog/same-b/",
                "/blog/alpha/",
                "/blog/zeta/"
            ]
        );
    }

    #[test]
    fn index_pages_are_not_members() {
        let rules = blog_rules();

        let index_page = page("blog/index.md", "# Blog", &rules);
        let post = page("blog/post.md", "# Post", &rules);
        let about = page("about.md", "# About", &rules);

        assert!(index_page.collections.is_empty());
        assert_eq!(post.collections, vec!["blog"]);
        assert!(about.collections.is_empty());
    }

    #[test]
    fn page_joins_collection_once() {
        let rules = CollectionRules::compile(&[
            CollectionRule::new("blog/*", "blog"),
            CollectionRule::new("blog/*.md", "blog"),
            CollectionRule::new("**/*.md", "everything"),
        ])
        .unwrap();

        let post = page("blog/post.md", "# Post", &rules);

        assert_eq!(post.collections, vec!["blog", "everything"]);
        assert_eq!(rules.names(), vec!["blog", "everything"]);
    }

    #[test]
    fn empty_collections_still_exist() {
        let rules = blog_rules();

        let index = CollectionIndex::build(&[], &rules, &BuildConfig::default());

        assert_eq!(index.get("blog"), Some(&[][..]));
        assert_eq!(index.get("missing"), None);
    }

    #[test]
    fn entries_carry_excerpts() {
        let rules = blog_rules();
        let config = BuildConfig {
            excerpt_length: 20,
            ..Default::default()
        };
        let pages = vec![page(
            "blog/post.md",
            "---\ntitle: Post\ndescription: About things\ntags: [a, b]\n---\nSome **bold** words that go on for quite a while.",
            &rules,
        )];

        let index = CollectionIndex::build(&pages, &rules, &config);
        let entry = &index.get("blog").unwrap()[0];

        assert_eq!(entry.title, "Post");
        assert_eq!(entry.description.as_deref(), Some("About things"));
        assert_eq!(entry.tags, vec!["a", "b"]);
        assert_eq!(entry.excerpt, "Some bold words that");
        assert!(entry.truncated);
        assert!(!entry.excerpt.contains('<'));
    }

    #[test]
    fn excerpt_strips_tags_before_truncating() {
        let html = "<p><a href=\"/a-very-long-target/\">link</a> text</p>";

        let (text, truncated) = excerpt(html, 6);

        assert_eq!(text, "link");
        assert!(truncated);
    }

    #[test]
    fn rejects_invalid_patterns() {
        assert!(CollectionRules::compile(&[CollectionRule::new("blog/[", "blog")]).is_err());
    }
}
