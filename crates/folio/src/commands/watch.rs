//! Rebuild the site whenever its sources change.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use folio_site::BuildConfig;

use super::{run_builder, Mode};
use crate::config::{self, Overrides};
use crate::watcher::{FileWatcher, WatchEvent};

/// Quiet period after a change before rebuilding.
const DEBOUNCE: Duration = Duration::from_millis(150);

/// Run the watch command.
pub async fn run(config_path: &Path, drafts: bool) -> Result<()> {
    let overrides = Overrides {
        drafts,
        ..Default::default()
    };
    let mut config = config::resolve(config_path, &overrides)?;

    let roots = watch_roots(config_path, &config);
    let ignored = ignored_paths(&config.output_dir);
    let (_watcher, mut rx) =
        FileWatcher::new(&roots, ignored).context("Failed to start file watcher")?;

    rebuild(config.clone()).await;
    tracing::info!("Watching {} for changes (Ctrl+C to stop)", roots[0].display());

    loop {
        tokio::select! {
            event = rx.recv() => {
                let Some(event) = event else { break };

                // Let a burst of saves settle into one rebuild
                tokio::time::sleep(DEBOUNCE).await;
                let mut batch = vec![event];
                while let Ok(event) = rx.try_recv() {
                    batch.push(event);
                }
                for event in &batch {
                    tracing::info!("{} changed: {}", event.kind(), event.path().display());
                }

                if needs_reload(&batch) {
                    match config::resolve(config_path, &overrides) {
                        Ok(reloaded) => config = reloaded,
                        Err(e) => {
                            tracing::error!("{:#}", e);
                            continue;
                        }
                    }
                }
                rebuild(config.clone()).await;
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Stopping watcher");
                break;
            }
        }
    }

    Ok(())
}

/// Whether a batch of events touched a config file.
fn needs_reload(events: &[WatchEvent]) -> bool {
    events.iter().any(|event| match event {
        WatchEvent::ConfigModified(_) => true,
        WatchEvent::Created(path) | WatchEvent::Deleted(path) => {
            path.extension().and_then(|e| e.to_str()) == Some("toml")
        }
        _ => false,
    })
}

async fn rebuild(config: BuildConfig) {
    match run_builder(config, Mode::Write).await {
        Ok(result) => tracing::info!(
            "Rebuilt {} pages in {}ms",
            result.pages + result.listings,
            result.duration_ms
        ),
        Err(e) => tracing::error!("{}", e),
    }
}

/// Source, layouts and the config file, made absolute so event paths
/// can be compared against them.
fn watch_roots(config_path: &Path, config: &BuildConfig) -> Vec<PathBuf> {
    [
        Some(config.source_dir.as_path()),
        config.layouts_dir.as_deref(),
        Some(config_path),
    ]
    .into_iter()
    .flatten()
    .map(absolute)
    .collect()
}

/// The output directory and its staging siblings.
fn ignored_paths(output_dir: &Path) -> Vec<PathBuf> {
    let output = absolute(output_dir);
    let mut ignored = vec![output.clone()];
    if let (Some(parent), Some(name)) = (output.parent(), output.file_name()) {
        let name = name.to_string_lossy();
        ignored.push(parent.join(format!(".{}.staging", name)));
        ignored.push(parent.join(format!(".{}.previous", name)));
    }
    ignored
}

fn absolute(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    })
}
