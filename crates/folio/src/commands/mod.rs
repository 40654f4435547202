pub mod build;
pub mod check;
pub mod init;
pub mod watch;

use anyhow::Result;
use folio_site::{BuildConfig, BuildFailure, BuildResult, SiteBuilder};

/// What a build pass should do with its output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Write,
    CheckOnly,
}

/// Run the builder on the blocking pool.
///
/// Each fatal error is logged before the failure is returned.
pub async fn run_builder(config: BuildConfig, mode: Mode) -> Result<BuildResult> {
    let outcome = tokio::task::spawn_blocking(move || -> Result<Result<BuildResult, BuildFailure>> {
        let builder = SiteBuilder::new(config)?;
        Ok(match mode {
            Mode::Write => builder.build(),
            Mode::CheckOnly => builder.check(),
        })
    })
    .await??;

    match outcome {
        Ok(result) => Ok(result),
        Err(failure) => {
            for error in &failure.errors {
                tracing::error!("{}", error);
            }
            Err(failure.into())
        }
    }
}
