//! Validate a site without writing output.

use std::path::Path;

use anyhow::Result;

use super::{run_builder, Mode};
use crate::config::{self, Overrides};

/// Run the check command.
pub async fn run(config_path: &Path, strict: bool, drafts: bool) -> Result<()> {
    let overrides = Overrides {
        output: None,
        strict_links: strict,
        drafts,
    };
    let config = config::resolve(config_path, &overrides)?;

    let result = run_builder(config, Mode::CheckOnly).await?;

    tracing::info!(
        "Checked {} pages and {} listings: {} warning(s)",
        result.pages,
        result.listings,
        result.warnings.len()
    );

    Ok(())
}
