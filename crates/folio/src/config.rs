//! Configuration file (folio.toml).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use folio_site::{BuildConfig, CollectionRule, NavLink};
use serde::Deserialize;

/// Configuration file structure (folio.toml).
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    #[serde(default)]
    pub site: SiteSection,
    #[serde(default)]
    pub build: BuildSection,
    /// Collection rules; the built-in `blog/*` rule applies when omitted
    pub collections: Option<Vec<CollectionRule>>,
}

#[derive(Debug, Deserialize)]
pub struct SiteSection {
    #[serde(default = "default_title")]
    pub title: String,
    pub description: Option<String>,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub nav: Vec<NavLink>,
}

#[derive(Debug, Deserialize)]
pub struct BuildSection {
    #[serde(default = "default_source")]
    pub source: String,
    #[serde(default = "default_output")]
    pub output: String,
    /// Directory with custom layouts and partials
    pub layouts: Option<String>,
    #[serde(default = "default_excerpt_length")]
    pub excerpt_length: usize,
    #[serde(default = "default_layout")]
    pub default_layout: String,
    #[serde(default)]
    pub strict_links: bool,
    #[serde(default)]
    pub drafts: bool,
}

impl Default for SiteSection {
    fn default() -> Self {
        Self {
            title: default_title(),
            description: None,
            base_url: default_base_url(),
            language: default_language(),
            nav: Vec::new(),
        }
    }
}

impl Default for BuildSection {
    fn default() -> Self {
        Self {
            source: default_source(),
            output: default_output(),
            layouts: None,
            excerpt_length: default_excerpt_length(),
            default_layout: default_layout(),
            strict_links: false,
            drafts: false,
        }
    }
}

fn default_title() -> String {
    "My Site".to_string()
}
fn default_base_url() -> String {
    "/".to_string()
}
fn default_language() -> String {
    "en".to_string()
}
fn default_source() -> String {
    "content".to_string()
}
fn default_output() -> String {
    "public".to_string()
}
fn default_excerpt_length() -> usize {
    200
}
fn default_layout() -> String {
    "default".to_string()
}

/// Command-line flags that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub output: Option<PathBuf>,
    pub strict_links: bool,
    pub drafts: bool,
}

/// Load configuration from `path` if it exists.
/// Returns an error if the config file exists but is malformed.
pub fn load_config(path: &Path) -> Result<ConfigFile> {
    if !path.exists() {
        tracing::debug!("No {} found, using defaults", path.display());
        return Ok(ConfigFile::default());
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    tracing::debug!("Loaded config from {}", path.display());

    Ok(config)
}

/// Directory relative paths in the config file are resolved against.
pub fn project_root(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

impl ConfigFile {
    /// Resolve into a build configuration rooted at `root`.
    pub fn into_build_config(self, root: &Path, overrides: &Overrides) -> BuildConfig {
        let defaults = BuildConfig::default();

        BuildConfig {
            source_dir: root.join(&self.build.source),
            output_dir: overrides
                .output
                .clone()
                .unwrap_or_else(|| root.join(&self.build.output)),
            layouts_dir: self.build.layouts.map(|dir| root.join(dir)),
            title: self.site.title,
            description: self.site.description,
            base_url: self.site.base_url,
            language: self.site.language,
            nav: self.site.nav,
            collections: self.collections.unwrap_or(defaults.collections),
            excerpt_length: self.build.excerpt_length,
            default_layout: self.build.default_layout,
            strict_links: self.build.strict_links || overrides.strict_links,
            include_drafts: self.build.drafts || overrides.drafts,
            extensions: defaults.extensions,
        }
    }
}

/// Load the config file and resolve it into a build configuration.
pub fn resolve(config_path: &Path, overrides: &Overrides) -> Result<BuildConfig> {
    let file = load_config(config_path)?;
    Ok(file.into_build_config(&project_root(config_path), overrides))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_uses_defaults() {
        let temp = tempdir().unwrap();

        let config = resolve(&temp.path().join("folio.toml"), &Overrides::default()).unwrap();

        assert_eq!(config.title, "My Site");
        assert_eq!(config.source_dir, temp.path().join("content"));
        assert_eq!(config.output_dir, temp.path().join("public"));
        assert_eq!(config.collections, vec![CollectionRule::new("blog/*", "blog")]);
        assert_eq!(config.excerpt_length, 200);
        assert!(!config.strict_links);
    }

    #[test]
    fn parses_full_config() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("folio.toml");
        fs::write(
            &path,
            r#"
[site]
title = "Jane Doe"
description = "Engineer"
base_url = "https://jane.dev/"

[[site.nav]]
title = "Blog"
route = "/blog/"

[build]
source = "src"
layouts = "layouts"
excerpt_length = 120
strict_links = true

[[collections]]
pattern = "notes/**/*.md"
name = "notes"
"#,
        )
        .unwrap();

        let config = resolve(&path, &Overrides::default()).unwrap();

        assert_eq!(config.title, "Jane Doe");
        assert_eq!(config.description.as_deref(), Some("Engineer"));
        assert_eq!(config.url_for("/blog/"), "https://jane.dev/blog/");
        assert_eq!(config.nav.len(), 1);
        assert_eq!(config.source_dir, temp.path().join("src"));
        assert_eq!(config.layouts_dir, Some(temp.path().join("layouts")));
        assert_eq!(config.excerpt_length, 120);
        assert!(config.strict_links);
        assert_eq!(
            config.collections,
            vec![CollectionRule::new("notes/**/*.md", "notes")]
        );
    }

    #[test]
    fn flags_override_file() {
        let temp = tempdir().unwrap();
        let overrides = Overrides {
            output: Some(PathBuf::from("/tmp/site")),
            strict_links: true,
            drafts: true,
        };

        let config = resolve(&temp.path().join("folio.toml"), &overrides).unwrap();

        assert_eq!(config.output_dir, PathBuf::from("/tmp/site"));
        assert!(config.strict_links);
        assert!(config.include_drafts);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("folio.toml");
        fs::write(&path, "[site\ntitle = ").unwrap();

        assert!(load_config(&path).is_err());
    }

    #[test]
    fn empty_collections_disable_default_rule() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("folio.toml");
        fs::write(&path, "collections = []\n").unwrap();

        let config = resolve(&path, &Overrides::default()).unwrap();

        assert!(config.collections.is_empty());
    }
}
