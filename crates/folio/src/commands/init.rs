//! Scaffold a new site.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::config;

/// Run the init command.
///
/// Creates the config file and a starter content tree next to it. Existing
/// files are left alone unless `yes` is set.
pub async fn run(config_path: &Path, yes: bool) -> Result<()> {
    tracing::info!("Initializing folio site...");

    let root = config::project_root(config_path);
    let content_dir = root.join("content");

    if content_dir.exists() && !yes {
        tracing::warn!("content/ directory already exists. Use --yes to overwrite.");
        return Ok(());
    }

    let files = [
        (config_path.to_path_buf(), DEFAULT_CONFIG),
        (content_dir.join("index.md"), DEFAULT_INDEX),
        (content_dir.join("about.md"), DEFAULT_ABOUT),
        (content_dir.join("blog/index.md"), DEFAULT_BLOG_INDEX),
        (content_dir.join("blog/hello-world.md"), DEFAULT_FIRST_POST),
    ];

    for (path, contents) in files {
        if path.exists() && !yes {
            continue;
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(&path, contents)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::info!("Created {}", path.display());
    }

    tracing::info!("Initialization complete!");
    tracing::info!("Run 'folio build' to generate the site.");

    Ok(())
}

const DEFAULT_CONFIG: &str = r#"# Folio Configuration

[site]
title = "My Site"
description = "Projects, writing and notes"
base_url = "/"

[[site.nav]]
title = "About"
route = "/about/"

[[site.nav]]
title = "Blog"
route = "/blog/"

[build]
# Source directory for content
source = "content"

# Output directory for the built site
output = "public"

# Directory with custom layouts and partials
# layouts = "layouts"

# Fail the build on broken internal links
strict_links = false

[[collections]]
pattern = "blog/*"
name = "blog"
"#;

const DEFAULT_INDEX: &str = r#"---
title: Home
---

# Welcome

This site is built with **folio**. Read [about me](/about/) or browse the
[blog](/blog/).
"#;

const DEFAULT_ABOUT: &str = r#"---
title: About
description: Who I am and what I work on
---

# About

Write a short introduction here.
"#;

const DEFAULT_BLOG_INDEX: &str = r#"---
title: Blog
layout: listing
list: blog
---

# Blog
"#;

const DEFAULT_FIRST_POST: &str = r#"---
title: Hello, World
layout: post
date: 2026-01-01
tags: [meta]
---

# Hello, World

Posts in `content/blog/` are listed on the blog page, newest first.

```rust
fn main() {
    println!("Hello, world!");
}
```
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{run_builder, Mode};
    use crate::config::Overrides;
    use tempfile::tempdir;

    #[tokio::test]
    async fn scaffolds_a_buildable_site() {
        let temp = tempdir().unwrap();
        let config_path = temp.path().join("folio.toml");

        run(&config_path, false).await.unwrap();

        assert!(config_path.exists());
        assert!(temp.path().join("content/blog/hello-world.md").exists());

        let config = config::resolve(&config_path, &Overrides::default()).unwrap();
        let result = run_builder(config, Mode::Write).await.unwrap();

        assert_eq!(result.pages, 4);
        assert_eq!(result.listings, 0);
        assert!(result.warnings.is_empty());
        assert!(temp.path().join("public/blog/hello-world/index.html").exists());
    }

    #[tokio::test]
    async fn keeps_existing_content() {
        let temp = tempdir().unwrap();
        let config_path = temp.path().join("folio.toml");
        fs::create_dir_all(temp.path().join("content")).unwrap();
        fs::write(temp.path().join("content/index.md"), "mine").unwrap();

        run(&config_path, false).await.unwrap();

        assert_eq!(
            fs::read_to_string(temp.path().join("content/index.md")).unwrap(),
            "mine"
        );
        assert!(!config_path.exists());
    }
}
