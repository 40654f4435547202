//! Page model and route resolution.

use std::path::{Component, Path, PathBuf};

use chrono::NaiveDateTime;
use folio_content::{Frontmatter, ParsedDoc, TocEntry};

use crate::config::BuildConfig;

/// A page to be built.
#[derive(Debug, Clone)]
pub struct Page {
    /// Source file path (or a placeholder for generated pages)
    pub source_path: PathBuf,

    /// Relative path from the source root
    pub relative_path: PathBuf,

    /// Route the page is served at (e.g. `/blog/post/`)
    pub route: String,

    /// Output file, relative to the output root
    pub output_path: PathBuf,

    /// Layout name
    pub layout: String,

    /// Parsed front matter
    pub frontmatter: Frontmatter,

    /// Rendered body HTML
    pub content: String,

    /// Table of contents
    pub toc: Vec<TocEntry>,

    /// Link destinations found in the body
    pub links: Vec<String>,

    /// Code block languages used in the body
    pub languages: Vec<String>,

    /// Collections this page belongs to
    pub collections: Vec<String>,

    /// Collection this page lists, for listing pages
    pub lists: Option<String>,

    /// Whether the builder synthesised this page
    pub generated: bool,
}

impl Page {
    /// Create a page from a parsed document.
    pub fn new(
        source_path: PathBuf,
        relative_path: PathBuf,
        doc: ParsedDoc,
        config: &BuildConfig,
    ) -> Self {
        let route = resolve_route(&relative_path, &doc.frontmatter);
        let output_path = output_path_for(&route);
        let layout = doc
            .frontmatter
            .layout()
            .unwrap_or(&config.default_layout)
            .to_string();
        let lists = doc.frontmatter.list().map(str::to_string);
        let languages = doc.languages();

        Self {
            source_path,
            relative_path,
            route,
            output_path,
            layout,
            content: doc.rendered.html,
            toc: doc.rendered.toc,
            links: doc.rendered.links,
            languages,
            frontmatter: doc.frontmatter,
            collections: Vec::new(),
            lists,
            generated: false,
        }
    }

    /// Create the listing page for a collection no document lists.
    pub fn listing(collection: &str) -> Self {
        let route = format!("/{}/", collection.trim_matches('/'));
        let mut frontmatter = Frontmatter::new();
        frontmatter.insert(
            "title",
            folio_content::FieldValue::Text(capitalize(collection)),
        );

        Self {
            source_path: PathBuf::from(format!("<{} listing>", collection)),
            relative_path: PathBuf::new(),
            output_path: output_path_for(&route),
            route,
            layout: "listing".to_string(),
            frontmatter,
            content: String::new(),
            toc: Vec::new(),
            links: Vec::new(),
            languages: Vec::new(),
            collections: Vec::new(),
            lists: Some(collection.to_string()),
            generated: true,
        }
    }

    /// Title from front matter, falling back to the file stem.
    pub fn title(&self) -> String {
        self.frontmatter
            .title()
            .map(str::to_string)
            .unwrap_or_else(|| {
                self.relative_path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("Untitled")
                    .to_string()
            })
    }

    pub fn date(&self) -> Option<NaiveDateTime> {
        self.frontmatter.date()
    }

    /// Whether this page is a section index (`index.md`).
    pub fn is_section_index(&self) -> bool {
        self.relative_path
            .file_stem()
            .and_then(|s| s.to_str())
            .is_some_and(|stem| stem == "index")
    }
}

/// Resolve the route for a document.
///
/// `permalink` is used verbatim, `slug` becomes `/<slug>/`, and otherwise
/// the route follows the source path.
pub fn resolve_route(relative: &Path, frontmatter: &Frontmatter) -> String {
    if let Some(permalink) = frontmatter.permalink().filter(|p| !p.trim().is_empty()) {
        let permalink = permalink.trim();
        return if permalink.starts_with('/') {
            permalink.to_string()
        } else {
            format!("/{}", permalink)
        };
    }

    if let Some(slug) = frontmatter.slug().filter(|s| !s.trim().is_empty()) {
        return format!("/{}/", slug.trim().trim_matches('/'));
    }

    derive_route(relative)
}

/// Derive a clean URL from a path relative to the source root.
///
/// `about.md` -> `/about/`, `blog/index.md` -> `/blog/`, `index.md` -> `/`.
pub fn derive_route(relative: &Path) -> String {
    let mut segments: Vec<String> = relative
        .parent()
        .map(|p| {
            p.components()
                .filter_map(|c| match c {
                    Component::Normal(s) => Some(s.to_string_lossy().to_string()),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default();

    let stem = relative
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("index");
    if stem != "index" {
        segments.push(stem.to_string());
    }

    if segments.is_empty() {
        "/".to_string()
    } else {
        format!("/{}/", segments.join("/"))
    }
}

/// Output file for a route, relative to the output root.
///
/// Routes ending in `/` (or without an extension) write `index.html`
/// inside the route's directory. `.` and `..` segments are dropped so a
/// route can never escape the output root.
pub fn output_path_for(route: &str) -> PathBuf {
    let segments: Vec<&str> = route
        .split('/')
        .filter(|s| !s.is_empty() && *s != "." && *s != "..")
        .collect();

    let mut path: PathBuf = segments.iter().collect();
    let names_file = !route.ends_with('/')
        && segments.last().is_some_and(|last| last.contains('.'));
    if !names_file {
        path.push("index.html");
    }
    path
}

/// Capitalize first letter of a string.
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
