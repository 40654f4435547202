//! Site build configuration.

use std::path::PathBuf;

use serde::Deserialize;

/// Maps source paths matching a glob to a named collection.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CollectionRule {
    /// Glob matched against the path relative to the source root (e.g. `blog/*`)
    pub pattern: String,

    /// Collection name (e.g. `blog`)
    pub name: String,
}

impl CollectionRule {
    pub fn new(pattern: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            name: name.into(),
        }
    }
}

/// A site-wide navigation link.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NavLink {
    /// Display title
    pub title: String,

    /// Route the link points at (e.g. `/about/`)
    pub route: String,
}

/// Configuration for building a site.
///
/// Threaded explicitly into [`crate::SiteBuilder`]; nothing reads global
/// state.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Content source directory
    pub source_dir: PathBuf,

    /// Output directory
    pub output_dir: PathBuf,

    /// Directory with custom layouts and partials
    pub layouts_dir: Option<PathBuf>,

    /// Site title, used when a page has none
    pub title: String,

    /// Site description, used when a page has none
    pub description: Option<String>,

    /// Base URL for the site
    pub base_url: String,

    /// Value of the `lang` attribute on generated documents
    pub language: String,

    /// Header navigation
    pub nav: Vec<NavLink>,

    /// Collection membership rules, checked in order
    pub collections: Vec<CollectionRule>,

    /// Maximum excerpt length in characters
    pub excerpt_length: usize,

    /// Layout used when front matter names none
    pub default_layout: String,

    /// Treat broken internal links as errors
    pub strict_links: bool,

    /// Build pages marked `draft: true`
    pub include_drafts: bool,

    /// File extensions treated as content documents
    pub extensions: Vec<String>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("content"),
            output_dir: PathBuf::from("public"),
            layouts_dir: None,
            title: "My Site".to_string(),
            description: None,
            base_url: "/".to_string(),
            language: "en".to_string(),
            nav: vec![],
            collections: vec![CollectionRule::new("blog/*", "blog")],
            excerpt_length: 200,
            default_layout: "default".to_string(),
            strict_links: false,
            include_drafts: false,
            extensions: vec!["md".to_string(), "markdown".to_string()],
        }
    }
}

impl BuildConfig {
    /// Whether a file extension marks a content document.
    pub fn is_content_extension(&self, ext: &str) -> bool {
        self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext))
    }

    /// Absolute-or-rooted URL for a route, honouring the base URL.
    pub fn url_for(&self, route: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), route)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_blog_collection() {
        let config = BuildConfig::default();

        assert_eq!(config.collections, vec![CollectionRule::new("blog/*", "blog")]);
        assert!(config.is_content_extension("md"));
        assert!(config.is_content_extension("Markdown"));
        assert!(!config.is_content_extension("html"));
    }

    #[test]
    fn url_for_joins_base_url() {
        let mut config = BuildConfig::default();
        assert_eq!(config.url_for("/about/"), "/about/");

        config.base_url = "https://example.com/".to_string();
        assert_eq!(config.url_for("/about/"), "https://example.com/about/");
    }
}
