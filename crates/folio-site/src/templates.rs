//! Template engine for composing pages into layouts.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use folio_content::{FieldValue, TocEntry};
use minijinja::{context, Environment};
use walkdir::WalkDir;

use crate::collection::EntryView;

/// A navigation item.
#[derive(Debug, Clone, serde::Serialize)]
pub struct NavItem {
    /// Display title
    pub title: String,
    /// URL path
    pub path: String,
    /// Whether this is the active page
    pub active: bool,
}

/// Site-wide values available to every layout as `site`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SiteMeta {
    pub title: String,
    pub description: Option<String>,
    pub base_url: String,
    pub language: String,
}

/// Per-page values available to layouts as `page`.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct PageMeta {
    pub title: Option<String>,
    pub description: Option<String>,
    /// Formatted date
    pub date: Option<String>,
    pub route: String,
    /// Route prefixed with the site base URL
    pub url: String,
    pub tags: Vec<String>,
    pub categories: Vec<String>,
    pub collections: Vec<String>,
    /// Code block languages, for loading highlighters
    pub languages: Vec<String>,
    /// Front matter keys without a dedicated field
    pub extra: BTreeMap<String, FieldValue>,
}

/// Context for composing one page.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Context<'a> {
    pub site: &'a SiteMeta,
    pub page: PageMeta,
    /// Rendered content HTML
    pub content: &'a str,
    /// Table of contents
    pub toc: &'a [TocEntry],
    /// Navigation items
    pub nav: Vec<NavItem>,
    /// Entries of the collection a listing page lists
    pub entries: &'a [EntryView],
    /// Every collection, keyed by name
    pub collections: &'a BTreeMap<String, Vec<EntryView>>,
}

/// Errors from loading custom layouts.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("Failed to read layout {path}: {message}")]
    Read { path: String, message: String },

    #[error("Invalid layout {name}: {source}")]
    Invalid {
        name: String,
        #[source]
        source: minijinja::Error,
    },
}

/// Template engine using minijinja.
///
/// Layouts are registered as `<name>.html`; partials live under
/// `partials/` and can only be included, never used as a layout.
pub struct TemplateEngine {
    env: Environment<'static>,
}

impl TemplateEngine {
    /// Create a new template engine with the built-in layouts.
    pub fn new() -> Self {
        let mut env = Environment::new();

        for &(name, source) in BUILTIN_TEMPLATES {
            env.add_template(name, source)
                .expect("built-in templates are valid");
        }

        Self { env }
    }

    /// Register every `.html` file under `dir`, overriding built-ins with the
    /// same name.
    ///
    /// Returns the number of templates loaded.
    pub fn load_dir(&mut self, dir: &Path) -> Result<usize, TemplateError> {
        let mut count = 0;

        for entry in WalkDir::new(dir)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("html") {
                continue;
            }

            let name = path
                .strip_prefix(dir)
                .unwrap_or(path)
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");

            let source = fs::read_to_string(path).map_err(|e| TemplateError::Read {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

            self.env
                .add_template_owned(name.clone(), source)
                .map_err(|source| TemplateError::Invalid { name, source })?;
            count += 1;
        }

        Ok(count)
    }

    /// Whether a layout with this name is registered.
    pub fn has_layout(&self, layout: &str) -> bool {
        !layout.is_empty()
            && !layout.contains('/')
            && self.env.get_template(&template_name(layout)).is_ok()
    }

    /// Render a page using the specified layout.
    pub fn render_page(&self, layout: &str, context: &Context) -> Result<String, minijinja::Error> {
        let tmpl = self.env.get_template(&template_name(layout))?;

        tmpl.render(context! {
            site => context.site,
            page => &context.page,
            content => context.content,
            toc => context.toc,
            nav => &context.nav,
            entries => context.entries,
            collections => context.collections,
        })
    }
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn template_name(layout: &str) -> String {
    format!("{}.html", layout)
}

const BUILTIN_TEMPLATES: &[(&str, &str)] = &[
    ("default.html", DEFAULT_TEMPLATE),
    ("post.html", POST_TEMPLATE),
    ("listing.html", LISTING_TEMPLATE),
    ("partials/head.html", HEAD_PARTIAL),
    ("partials/header.html", HEADER_PARTIAL),
    ("partials/footer.html", FOOTER_PARTIAL),
];

const HEAD_PARTIAL: &str = r##"<meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>{% if page.title %}{{ page.title }} | {{ site.title }}{% else %}{{ site.title }}{% endif %}</title>
  {% set description = page.description or site.description %}{% if description %}<meta name="description" content="{{ description }}">
  <meta property="og:description" content="{{ description }}">
  {% endif %}<meta property="og:title" content="{{ page.title or site.title }}">
  <link rel="canonical" href="{{ page.url }}">"##;

const HEADER_PARTIAL: &str = r##"<header class="site-header">
  <a href="{{ site.base_url }}" class="site-title">{{ site.title }}</a>
  {% if nav %}<nav>
    <ul class="nav-list">
    {% for item in nav %}
      <li class="nav-item{% if item.active %} active{% endif %}"><a href="{{ item.path }}">{{ item.title }}</a></li>
    {% endfor %}
    </ul>
  </nav>{% endif %}
</header>"##;

const FOOTER_PARTIAL: &str = r##"<footer class="site-footer">
  <p>{{ site.title }}</p>
</footer>"##;

const DEFAULT_TEMPLATE: &str = r##"<!DOCTYPE html>
<html lang="{{ site.language }}">
<head>
  {% include "partials/head.html" %}
</head>
<body>
  {% include "partials/header.html" %}
  <main class="page">
    {{ content | safe }}
  </main>
  {% include "partials/footer.html" %}
</body>
</html>
"##;

const POST_TEMPLATE: &str = r##"<!DOCTYPE html>
<html lang="{{ site.language }}">
<head>
  {% include "partials/head.html" %}
</head>
<body>
  {% include "partials/header.html" %}
  <main class="post">
    <article>
      <header class="post-meta">
        {% if page.date %}<time datetime="{{ page.date }}">{{ page.date }}</time>{% endif %}
        {% if page.tags %}<ul class="tags">{% for tag in page.tags %}<li>{{ tag }}</li>{% endfor %}</ul>{% endif %}
      </header>
      {{ content | safe }}
    </article>
    {% if toc | length > 1 %}
    <aside class="toc">
      <h2>On this page</h2>
      <ul>
      {% for entry in toc %}
        <li class="toc-level-{{ entry.level }}"><a href="#{{ entry.id }}">{{ entry.title }}</a></li>
      {% endfor %}
      </ul>
    </aside>
    {% endif %}
  </main>
  {% include "partials/footer.html" %}
</body>
</html>
"##;

const LISTING_TEMPLATE: &str = r##"<!DOCTYPE html>
<html lang="{{ site.language }}">
<head>
  {% include "partials/head.html" %}
</head>
<body>
  {% include "partials/header.html" %}
  <main class="listing">
    {% if content %}{{ content | safe }}{% else %}<h1>{{ page.title }}</h1>{% endif %}
    <ul class="entries">
    {% for entry in entries %}
      <li class="entry">
        <a href="{{ entry.url }}">{{ entry.title }}</a>
        {% if entry.date %}<time datetime="{{ entry.date }}">{{ entry.date }}</time>{% endif %}
        {% if entry.description %}<p class="description">{{ entry.description }}</p>
        {% elif entry.excerpt %}<p class="excerpt">{{ entry.excerpt }}{% if entry.truncated %}&hellip;{% endif %}</p>{% endif %}
      </li>
    {% endfor %}
    </ul>
  </main>
  {% include "partials/footer.html" %}
</body>
</html>
"##;

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn site() -> SiteMeta {
        SiteMeta {
            title: "My Site".to_string(),
            description: Some("Portfolio and notes".to_string()),
            base_url: "/".to_string(),
            language: "en".to_string(),
        }
    }

    fn context<'a>(
        site: &'a SiteMeta,
        page: PageMeta,
        content: &'a str,
        entries: &'a [EntryView],
        collections: &'a BTreeMap<String, Vec<EntryView>>,
    ) -> Context<'a> {
        Context {
            site,
            page,
            content,
            toc: &[],
            nav: vec![],
            entries,
            collections,
        }
    }

    #[test]
    fn renders_basic_page() {
        let engine = TemplateEngine::new();
        let site = site();
        let collections = BTreeMap::new();
        let page = PageMeta {
            title: Some("About".to_string()),
            description: Some("Who I am".to_string()),
            route: "/about/".to_string(),
            url: "/about/".to_string(),
            ..Default::default()
        };

        let html = engine
            .render_page(
                "default",
                &context(&site, page, "<p>Hello world</p>", &[], &collections),
            )
            .unwrap();

        assert!(html.contains("<title>About | My Site</title>"));
        assert!(html.contains("<meta name=\"description\" content=\"Who I am\">"));
        assert!(html.contains("<p>Hello world</p>"));
    }

    #[test]
    fn falls_back_to_site_metadata() {
        let engine = TemplateEngine::new();
        let site = site();
        let collections = BTreeMap::new();

        let html = engine
            .render_page(
                "default",
                &context(&site, PageMeta::default(), "", &[], &collections),
            )
            .unwrap();

        assert!(html.contains("<title>My Site</title>"));
        assert!(html.contains("content=\"Portfolio and notes\""));
    }

    #[test]
    fn escapes_front_matter_values() {
        let engine = TemplateEngine::new();
        let site = site();
        let collections = BTreeMap::new();
        let page = PageMeta {
            title: Some("<script>".to_string()),
            ..Default::default()
        };

        let html = engine
            .render_page("default", &context(&site, page, "", &[], &collections))
            .unwrap();

        assert!(html.contains("&lt;script&gt; | My Site"));
    }

    #[test]
    fn renders_listing_entries() {
        let engine = TemplateEngine::new();
        let site = site();
        let collections = BTreeMap::new();
        let entries = vec![EntryView {
            route: "/blog/post/".to_string(),
            url: "/blog/post/".to_string(),
            title: "A Post".to_string(),
            description: None,
            date: Some("2026-01-29".to_string()),
            tags: vec![],
            excerpt: "Opening words".to_string(),
            truncated: true,
        }];
        let page = PageMeta {
            title: Some("Blog".to_string()),
            ..Default::default()
        };

        let html = engine
            .render_page("listing", &context(&site, page, "", &entries, &collections))
            .unwrap();

        assert!(html.contains("<h1>Blog</h1>"));
        assert!(html.contains(">A Post</a>"));
        assert!(html.contains("<time datetime=\"2026-01-29\">"));
        assert!(html.contains("Opening words&hellip;"));
    }

    #[test]
    fn renders_navigation() {
        let engine = TemplateEngine::new();
        let site = site();
        let collections = BTreeMap::new();
        let mut ctx = context(&site, PageMeta::default(), "", &[], &collections);
        ctx.nav = vec![
            NavItem {
                title: "Work".to_string(),
                path: "/work/".to_string(),
                active: true,
            },
            NavItem {
                title: "Blog".to_string(),
                path: "/blog/".to_string(),
                active: false,
            },
        ];

        let html = engine.render_page("default", &ctx).unwrap();

        assert!(html.contains("<li class=\"nav-item active\">"));
        assert!(html.contains(">Work</a>"));
        assert!(html.contains(">Blog</a>"));
    }

    #[test]
    fn knows_builtin_layouts() {
        let engine = TemplateEngine::new();

        assert!(engine.has_layout("default"));
        assert!(engine.has_layout("post"));
        assert!(engine.has_layout("listing"));
        assert!(!engine.has_layout("gallery"));
        assert!(!engine.has_layout("partials/head"));
        assert!(!engine.has_layout(""));
    }

    #[test]
    fn loads_custom_layouts_and_partials() {
        let temp = tempdir().unwrap();
        fs::create_dir_all(temp.path().join("partials")).unwrap();
        fs::write(
            temp.path().join("gallery.html"),
            "<div>{% include \"partials/footer.html\" %}</div>",
        )
        .unwrap();
        fs::write(
            temp.path().join("partials/footer.html"),
            "<footer>custom {{ site.title }}</footer>",
        )
        .unwrap();

        let mut engine = TemplateEngine::new();
        let count = engine.load_dir(temp.path()).unwrap();
        let site = site();
        let collections = BTreeMap::new();

        let html = engine
            .render_page(
                "gallery",
                &context(&site, PageMeta::default(), "", &[], &collections),
            )
            .unwrap();

        assert_eq!(count, 2);
        assert!(engine.has_layout("gallery"));
        assert_eq!(html, "<div><footer>custom My Site</footer></div>");
    }

    #[test]
    fn reports_invalid_custom_layout() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("broken.html"), "{% if %}").unwrap();

        let mut engine = TemplateEngine::new();

        assert!(matches!(
            engine.load_dir(temp.path()),
            Err(TemplateError::Invalid { .. })
        ));
    }
}
