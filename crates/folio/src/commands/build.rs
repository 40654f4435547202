//! Static site build command.

use std::path::{Path, PathBuf};

use anyhow::Result;

use super::{run_builder, Mode};
use crate::config::{self, Overrides};

/// Run the build command.
pub async fn run(
    config_path: &Path,
    output: Option<PathBuf>,
    strict: bool,
    drafts: bool,
) -> Result<()> {
    tracing::info!("Building site...");

    let overrides = Overrides {
        output,
        strict_links: strict,
        drafts,
    };
    let config = config::resolve(config_path, &overrides)?;

    let result = run_builder(config, Mode::Write).await?;

    tracing::info!(
        "Built {} pages, {} listings and {} static files in {}ms",
        result.pages,
        result.listings,
        result.static_files,
        result.duration_ms
    );
    if !result.warnings.is_empty() {
        tracing::warn!("{} warning(s)", result.warnings.len());
    }

    tracing::info!("Output: {}", result.output_dir.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[tokio::test]
    async fn builds_from_config_file() {
        let temp = tempdir().unwrap();
        fs::create_dir_all(temp.path().join("pages")).unwrap();
        fs::write(temp.path().join("pages/index.md"), "# Home\n").unwrap();
        fs::write(
            temp.path().join("folio.toml"),
            "[build]\nsource = \"pages\"\noutput = \"site\"\n",
        )
        .unwrap();

        run(&temp.path().join("folio.toml"), None, false, false)
            .await
            .unwrap();

        assert!(temp.path().join("site/index.html").exists());
    }

    #[tokio::test]
    async fn strict_flag_fails_on_broken_links() {
        let temp = tempdir().unwrap();
        fs::create_dir_all(temp.path().join("content")).unwrap();
        fs::write(temp.path().join("content/index.md"), "[x](/nowhere/)\n").unwrap();
        let config_path = temp.path().join("folio.toml");

        assert!(run(&config_path, None, true, false).await.is_err());
        assert!(!temp.path().join("public").exists());

        run(&config_path, None, false, false).await.unwrap();
        assert!(temp.path().join("public/index.html").exists());
    }
}
