//! Static site builder.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use rayon::prelude::*;
use walkdir::WalkDir;

use folio_content::{format_date, parse_document, ParseError};
use folio_content::text::strip_tags;

use crate::collection::{CollectionIndex, CollectionRules};
use crate::config::BuildConfig;
use crate::page::Page;
use crate::templates::{Context, NavItem, PageMeta, SiteMeta, TemplateEngine};

const SITEMAP: &str = "sitemap.xml";
const SEARCH_INDEX: &str = "search-index.json";

/// Result of a build operation.
#[derive(Debug)]
pub struct BuildResult {
    /// Number of content pages generated
    pub pages: usize,

    /// Number of listing pages synthesised for collections
    pub listings: usize,

    /// Number of static files copied
    pub static_files: usize,

    /// Non-fatal problems found during the build
    pub warnings: Vec<BuildError>,

    /// Total build time in milliseconds
    pub duration_ms: u64,

    /// Output directory
    pub output_dir: PathBuf,
}

/// Errors that can occur during build.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Malformed front matter in {path}: {source}")]
    MalformedFrontmatter {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    #[error("Unknown layout '{layout}' in {path}")]
    UnknownLayout { path: PathBuf, layout: String },

    #[error("Unknown collection '{collection}' listed in {path}")]
    UnknownCollection { path: PathBuf, collection: String },

    #[error(
        "{path} takes {route}, the route of the generated {collection} listing; \
         add `list: {collection}` to its front matter to make it the listing"
    )]
    ListingCollision {
        path: PathBuf,
        collection: String,
        route: String,
    },

    #[error("Route collision at {route}: {first} and {second}")]
    RouteCollision {
        first: PathBuf,
        second: PathBuf,
        route: String,
    },

    #[error("Broken internal link in {path}: {target}")]
    BrokenInternalLink { path: PathBuf, target: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to read {path}: {message}")]
    Read { path: PathBuf, message: String },

    #[error("Failed to render template for {path}: {message}")]
    Template { path: PathBuf, message: String },

    #[error("Failed to write output: {0}")]
    Write(String),
}

/// Every fatal error found in one build pass.
#[derive(Debug, thiserror::Error)]
#[error("Build failed with {} error(s)", .errors.len())]
pub struct BuildFailure {
    pub errors: Vec<BuildError>,
}

impl From<BuildError> for BuildFailure {
    fn from(error: BuildError) -> Self {
        Self {
            errors: vec![error],
        }
    }
}

/// A content document found in the source tree.
#[derive(Debug)]
struct SourceFile {
    path: PathBuf,
    relative_path: PathBuf,
}

/// One file of the finished output tree.
#[derive(Debug)]
enum OutputFile {
    Rendered { path: PathBuf, contents: String },
    Copied { path: PathBuf, source: PathBuf },
}

impl OutputFile {
    fn path(&self) -> &Path {
        match self {
            Self::Rendered { path, .. } | Self::Copied { path, .. } => path,
        }
    }
}

/// A fully assembled site, ready to be written.
#[derive(Debug)]
struct Assembled {
    files: Vec<OutputFile>,
    pages: usize,
    listings: usize,
    static_files: usize,
    warnings: Vec<BuildError>,
}

/// Static site builder.
pub struct SiteBuilder {
    config: BuildConfig,
    rules: CollectionRules,
    templates: TemplateEngine,
}

impl SiteBuilder {
    /// Create a new site builder.
    ///
    /// Compiles collection rules and loads custom layouts up front so a bad
    /// configuration fails before any content is read.
    pub fn new(config: BuildConfig) -> Result<Self, BuildError> {
        check_output_dir(&config)?;

        let rules = CollectionRules::compile(&config.collections)
            .map_err(|e| BuildError::Config(format!("invalid collection pattern: {}", e)))?;

        let mut templates = TemplateEngine::new();
        if let Some(ref layouts_dir) = config.layouts_dir {
            if layouts_dir.exists() {
                let count = templates
                    .load_dir(layouts_dir)
                    .map_err(|e| BuildError::Config(e.to_string()))?;
                tracing::info!("Loaded {} layouts from {}", count, layouts_dir.display());
            } else {
                tracing::warn!("Layouts directory not found: {}", layouts_dir.display());
            }
        }

        Ok(Self {
            config,
            rules,
            templates,
        })
    }

    /// Build the site and replace the output directory with the result.
    ///
    /// Nothing is written unless the whole site assembles without a fatal
    /// error.
    pub fn build(&self) -> Result<BuildResult, BuildFailure> {
        let start = Instant::now();

        let site = self.assemble()?;
        self.write_output(&site.files)?;

        Ok(self.finish(site, start))
    }

    /// Run the full pipeline without writing anything.
    pub fn check(&self) -> Result<BuildResult, BuildFailure> {
        let start = Instant::now();
        let site = self.assemble()?;
        Ok(self.finish(site, start))
    }

    fn finish(&self, site: Assembled, start: Instant) -> BuildResult {
        for warning in &site.warnings {
            tracing::warn!("{}", warning);
        }

        BuildResult {
            pages: site.pages,
            listings: site.listings,
            static_files: site.static_files,
            warnings: site.warnings,
            duration_ms: start.elapsed().as_millis() as u64,
            output_dir: self.config.output_dir.clone(),
        }
    }

    /// Parse, index and compose every page into memory.
    fn assemble(&self) -> Result<Assembled, BuildFailure> {
        let (documents, static_files) = self.discover()?;
        tracing::debug!(
            "Found {} documents and {} static files",
            documents.len(),
            static_files.len()
        );

        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        // Documents are independent until collections are indexed
        let loaded: Vec<Result<Option<Page>, BuildError>> = documents
            .par_iter()
            .map(|doc| self.load_page(doc))
            .collect();

        let mut pages = Vec::new();
        for result in loaded {
            match result {
                Ok(Some(page)) => pages.push(page),
                Ok(None) => {}
                Err(e) => errors.push(e),
            }
        }

        for page in &pages {
            if !self.templates.has_layout(&page.layout) {
                errors.push(BuildError::UnknownLayout {
                    path: page.source_path.clone(),
                    layout: page.layout.clone(),
                });
            }
            if let Some(ref collection) = page.lists {
                if !self.rules.contains(collection) {
                    errors.push(BuildError::UnknownCollection {
                        path: page.source_path.clone(),
                        collection: collection.clone(),
                    });
                }
            }
        }

        let listed: HashSet<&str> = pages.iter().filter_map(|p| p.lists.as_deref()).collect();
        let mut listings = Vec::new();
        for name in self.rules.names() {
            if listed.contains(name) {
                continue;
            }
            let listing = Page::listing(name);
            match pages.iter().find(|p| p.output_path == listing.output_path) {
                Some(page) => errors.push(BuildError::ListingCollision {
                    path: page.source_path.clone(),
                    collection: name.to_string(),
                    route: listing.route,
                }),
                None => listings.push(listing),
            }
        }
        let listing_count = listings.len();
        pages.extend(listings);

        errors.extend(self.detect_collisions(&pages, &static_files));

        for problem in self.check_links(&pages, &static_files) {
            if self.config.strict_links {
                errors.push(problem);
            } else {
                warnings.push(problem);
            }
        }

        if !errors.is_empty() {
            return Err(BuildFailure { errors });
        }

        // Listing pages need every collection fully indexed
        let index = CollectionIndex::build(&pages, &self.rules, &self.config);
        let site_meta = self.site_meta();

        let composed: Vec<Result<OutputFile, BuildError>> = pages
            .par_iter()
            .map(|page| self.compose_page(page, &index, &site_meta))
            .collect();

        let mut files = Vec::with_capacity(composed.len() + static_files.len() + 2);
        for result in composed {
            match result {
                Ok(file) => files.push(file),
                Err(e) => errors.push(e),
            }
        }

        if !errors.is_empty() {
            return Err(BuildFailure { errors });
        }

        files.push(self.generate_sitemap(&pages, &static_files));
        files.push(self.generate_search_index(&pages)?);

        let static_count = static_files.len();
        files.extend(static_files.into_iter().map(|f| OutputFile::Copied {
            path: f.relative_path,
            source: f.path,
        }));

        Ok(Assembled {
            files,
            pages: pages.len() - listing_count,
            listings: listing_count,
            static_files: static_count,
            warnings,
        })
    }

    /// Walk the source tree, splitting content documents from static files.
    ///
    /// Hidden entries and entries starting with `_` are skipped, as are the
    /// layouts and output directories when they live inside the source root.
    fn discover(&self) -> Result<(Vec<SourceFile>, Vec<SourceFile>), BuildError> {
        let source_dir = &self.config.source_dir;
        if !source_dir.is_dir() {
            return Err(BuildError::Read {
                path: source_dir.clone(),
                message: "source directory not found".to_string(),
            });
        }

        let excluded: Vec<&Path> = [
            self.config.layouts_dir.as_deref(),
            Some(self.config.output_dir.as_path()),
        ]
        .into_iter()
        .flatten()
        .collect();

        let mut documents = Vec::new();
        let mut static_files = Vec::new();

        let walker = WalkDir::new(source_dir)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                if entry.depth() == 0 {
                    return true;
                }
                let name = entry.file_name().to_string_lossy();
                !name.starts_with('.')
                    && !name.starts_with('_')
                    && !excluded.iter().any(|dir| entry.path() == *dir)
            });

        for entry in walker {
            let entry = entry.map_err(|e| BuildError::Read {
                path: e.path().map(Path::to_path_buf).unwrap_or_else(|| source_dir.clone()),
                message: e.to_string(),
            })?;

            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            let relative_path = path.strip_prefix(source_dir).unwrap_or(path).to_path_buf();
            let file = SourceFile {
                path: path.to_path_buf(),
                relative_path,
            };

            let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
            if self.config.is_content_extension(ext) {
                documents.push(file);
            } else {
                static_files.push(file);
            }
        }

        documents.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
        static_files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));

        Ok((documents, static_files))
    }

    /// Read and parse one document. Drafts yield `None` unless enabled.
    fn load_page(&self, source: &SourceFile) -> Result<Option<Page>, BuildError> {
        let content = fs::read_to_string(&source.path).map_err(|e| BuildError::Read {
            path: source.path.clone(),
            message: e.to_string(),
        })?;

        let doc = parse_document(&content).map_err(|e| BuildError::MalformedFrontmatter {
            path: source.path.clone(),
            source: e,
        })?;

        if doc.frontmatter.is_draft() && !self.config.include_drafts {
            tracing::debug!("Skipping draft {}", source.path.display());
            return Ok(None);
        }

        let mut page = Page::new(
            source.path.clone(),
            source.relative_path.clone(),
            doc,
            &self.config,
        );
        page.collections = self.rules.memberships(&page);

        Ok(Some(page))
    }

    /// Report every pair of sources that would write the same output file.
    fn detect_collisions(&self, pages: &[Page], static_files: &[SourceFile]) -> Vec<BuildError> {
        let mut errors = Vec::new();
        let mut claimed: BTreeMap<PathBuf, PathBuf> = BTreeMap::new();

        for generated in [SITEMAP, SEARCH_INDEX] {
            claimed.insert(PathBuf::from(generated), PathBuf::from(format!("<{}>", generated)));
        }

        let outputs = pages
            .iter()
            .map(|p| (p.output_path.clone(), p.source_path.clone(), p.route.clone()))
            .chain(static_files.iter().map(|f| {
                (
                    f.relative_path.clone(),
                    f.path.clone(),
                    static_route(&f.relative_path),
                )
            }));

        for (output, source, route) in outputs {
            if let Some(first) = claimed.get(&output) {
                errors.push(BuildError::RouteCollision {
                    first: first.clone(),
                    second: source,
                    route,
                });
            } else {
                claimed.insert(output, source);
            }
        }

        errors
    }

    /// Find internal links that resolve to no page or static file.
    fn check_links(&self, pages: &[Page], static_files: &[SourceFile]) -> Vec<BuildError> {
        let mut routes: HashSet<String> = pages.iter().map(|p| p.route.clone()).collect();
        routes.extend(static_files.iter().map(|f| static_route(&f.relative_path)));
        routes.insert(format!("/{}", SITEMAP));
        routes.insert(format!("/{}", SEARCH_INDEX));

        let mut problems = Vec::new();
        for page in pages {
            let mut reported = BTreeSet::new();
            for target in &page.links {
                if is_internal_link(target)
                    && !link_resolves(target, &routes)
                    && reported.insert(target.as_str())
                {
                    problems.push(BuildError::BrokenInternalLink {
                        path: page.source_path.clone(),
                        target: target.clone(),
                    });
                }
            }
        }
        problems
    }

    fn site_meta(&self) -> SiteMeta {
        SiteMeta {
            title: self.config.title.clone(),
            description: self.config.description.clone(),
            base_url: self.config.base_url.clone(),
            language: self.config.language.clone(),
        }
    }

    /// Compose a page into its layout.
    fn compose_page(
        &self,
        page: &Page,
        index: &CollectionIndex,
        site: &SiteMeta,
    ) -> Result<OutputFile, BuildError> {
        let fm = &page.frontmatter;

        let meta = PageMeta {
            title: fm.title().map(str::to_string),
            description: fm.description().map(str::to_string),
            date: page.date().as_ref().map(format_date),
            route: page.route.clone(),
            url: self.config.url_for(&page.route),
            tags: fm.tags(),
            categories: fm.categories(),
            collections: page.collections.clone(),
            languages: page.languages.clone(),
            extra: fm
                .extra()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        };

        let entries = page
            .lists
            .as_deref()
            .and_then(|name| index.get(name))
            .unwrap_or(&[]);

        let context = Context {
            site,
            page: meta,
            content: &page.content,
            toc: &page.toc,
            nav: self.navigation(&page.route),
            entries,
            collections: index.all(),
        };

        let html = self
            .templates
            .render_page(&page.layout, &context)
            .map_err(|e| BuildError::Template {
                path: page.source_path.clone(),
                message: e.to_string(),
            })?;

        Ok(OutputFile::Rendered {
            path: page.output_path.clone(),
            contents: html,
        })
    }

    /// Navigation with the entry for the current section marked active.
    fn navigation(&self, route: &str) -> Vec<NavItem> {
        self.config
            .nav
            .iter()
            .map(|link| {
                let active = in_section(route, &link.route);
                NavItem {
                    title: link.title.clone(),
                    path: self.config.url_for(&link.route),
                    active,
                }
            })
            .collect()
    }

    /// Generate sitemap.
    fn generate_sitemap(&self, pages: &[Page], static_files: &[SourceFile]) -> OutputFile {
        let routes: BTreeSet<String> = pages
            .iter()
            .map(|p| p.route.clone())
            .chain(
                static_files
                    .iter()
                    .filter(|f| f.relative_path.extension().and_then(|e| e.to_str()) == Some("html"))
                    .map(|f| static_route(&f.relative_path)),
            )
            .collect();

        let urls: Vec<String> = routes
            .iter()
            .map(|route| format!("  <url>\n    <loc>{}</loc>\n  </url>", self.config.url_for(route)))
            .collect();

        let sitemap = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
{}
</urlset>
"#,
            urls.join("\n")
        );

        OutputFile::Rendered {
            path: PathBuf::from(SITEMAP),
            contents: sitemap,
        }
    }

    /// Generate search index.
    fn generate_search_index(&self, pages: &[Page]) -> Result<OutputFile, BuildError> {
        let index: Vec<serde_json::Value> = pages
            .iter()
            .filter(|page| !page.generated)
            .map(|page| {
                serde_json::json!({
                    "title": page.title(),
                    "description": page.frontmatter.description().unwrap_or_default(),
                    "url": self.config.url_for(&page.route),
                    "date": page.date().as_ref().map(format_date),
                    "tags": page.frontmatter.tags(),
                    "content": strip_tags(&page.content),
                })
            })
            .collect();

        let json = serde_json::to_string_pretty(&index)
            .map_err(|e| BuildError::Write(e.to_string()))?;

        Ok(OutputFile::Rendered {
            path: PathBuf::from(SEARCH_INDEX),
            contents: json,
        })
    }

    /// Write the site into a staging directory, then swap it into place.
    ///
    /// A failure while writing leaves the previous output untouched.
    fn write_output(&self, files: &[OutputFile]) -> Result<(), BuildError> {
        let output_dir = &self.config.output_dir;
        let parent = match output_dir.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let name = output_dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| {
                BuildError::Write(format!("invalid output directory: {}", output_dir.display()))
            })?;

        let staging = parent.join(format!(".{}.staging", name));
        let previous = parent.join(format!(".{}.previous", name));

        fs::create_dir_all(&parent).map_err(|e| BuildError::Write(e.to_string()))?;
        remove_dir_if_exists(&staging)?;

        if let Err(e) = files.par_iter().try_for_each(|file| write_file(&staging, file)) {
            let _ = fs::remove_dir_all(&staging);
            return Err(e);
        }

        remove_dir_if_exists(&previous)?;
        if output_dir.exists() {
            fs::rename(output_dir, &previous).map_err(|e| BuildError::Write(e.to_string()))?;
        }
        if let Err(e) = fs::rename(&staging, output_dir) {
            if previous.exists() {
                let _ = fs::rename(&previous, output_dir);
            }
            let _ = fs::remove_dir_all(&staging);
            return Err(BuildError::Write(e.to_string()));
        }
        discard_previous(&previous);

        tracing::debug!("Wrote {} files to {}", files.len(), output_dir.display());
        Ok(())
    }
}

/// Refuse output locations that a build would wipe out along with sources.
///
/// The output directory is replaced wholesale on every build, so it must not
/// be, or contain, the source or layouts directory.
fn check_output_dir(config: &BuildConfig) -> Result<(), BuildError> {
    let output = resolve_path(&config.output_dir);

    let inputs = [
        Some(("source", config.source_dir.as_path())),
        config.layouts_dir.as_deref().map(|dir| ("layouts", dir)),
    ];
    for (kind, dir) in inputs.into_iter().flatten() {
        if resolve_path(dir).starts_with(&output) {
            return Err(BuildError::Config(format!(
                "output directory {} would overwrite the {} directory {}",
                config.output_dir.display(),
                kind,
                dir.display()
            )));
        }
    }
    Ok(())
}

/// Absolute form of a path that may not exist yet.
///
/// The deepest existing ancestor is canonicalized so symlinks and `..`
/// resolve the same way for both sides of a comparison.
fn resolve_path(path: &Path) -> PathBuf {
    let full = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };

    let mut existing = full.as_path();
    let mut missing = Vec::new();
    while !existing.exists() {
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_os_string());
                existing = parent;
            }
            _ => break,
        }
    }

    let mut resolved = existing
        .canonicalize()
        .unwrap_or_else(|_| existing.to_path_buf());
    resolved.extend(missing.iter().rev());
    resolved
}

/// Whether `route` is `section` or lies below it, on whole path segments.
fn in_section(route: &str, section: &str) -> bool {
    let section = section.trim_end_matches('/');
    if section.is_empty() {
        return route == "/";
    }
    match route.strip_prefix(section) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

fn write_file(root: &Path, file: &OutputFile) -> Result<(), BuildError> {
    let target = root.join(file.path());
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|e| BuildError::Write(e.to_string()))?;
    }

    match file {
        OutputFile::Rendered { contents, .. } => fs::write(&target, contents)
            .map_err(|e| BuildError::Write(format!("{}: {}", target.display(), e))),
        OutputFile::Copied { source, .. } => fs::copy(source, &target)
            .map(|_| ())
            .map_err(|e| BuildError::Write(format!("{}: {}", source.display(), e))),
    }
}

/// Remove the replaced output once the new site is in place.
///
/// Failing here leaves a stale directory behind but the build succeeded.
fn discard_previous(previous: &Path) {
    if let Err(e) = remove_dir_if_exists(previous) {
        tracing::warn!("Failed to remove {}: {}", previous.display(), e);
    }
}

fn remove_dir_if_exists(dir: &Path) -> Result<(), BuildError> {
    if dir.exists() {
        fs::remove_dir_all(dir).map_err(|e| BuildError::Write(e.to_string()))?;
    }
    Ok(())
}

/// Route of a static file: its relative path with `/` separators.
fn static_route(relative: &Path) -> String {
    let joined = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    format!("/{}", joined)
}

fn is_internal_link(target: &str) -> bool {
    target.starts_with('/') && !target.starts_with("//")
}

/// Whether an internal link points at a known route.
///
/// Fragments and queries are ignored; `/about` also matches `/about/` and
/// `/about/index.html` matches `/about/`.
fn link_resolves(target: &str, routes: &HashSet<String>) -> bool {
    let path = target.split(['#', '?']).next().unwrap_or(target);
    if path.is_empty() || routes.contains(path) {
        return true;
    }
    if !path.ends_with('/') && routes.contains(&format!("{}/", path)) {
        return true;
    }
    path.strip_suffix("index.html")
        .is_some_and(|dir| routes.contains(dir))
}
