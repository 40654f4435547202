//! File watching for rebuilds.

use std::path::{Component, Path, PathBuf};
use std::sync::mpsc;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc as async_mpsc;

/// Events emitted by the file watcher.
#[derive(Debug, Clone, PartialEq)]
pub enum WatchEvent {
    /// Content document was modified
    ContentModified(PathBuf),

    /// Layout or partial was modified
    LayoutModified(PathBuf),

    /// Config file was modified
    ConfigModified(PathBuf),

    /// File was created
    Created(PathBuf),

    /// File was deleted
    Deleted(PathBuf),

    /// Generic modification
    Modified(PathBuf),
}

impl WatchEvent {
    pub fn path(&self) -> &Path {
        match self {
            Self::ContentModified(p)
            | Self::LayoutModified(p)
            | Self::ConfigModified(p)
            | Self::Created(p)
            | Self::Deleted(p)
            | Self::Modified(p) => p,
        }
    }

    /// Short label for log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ContentModified(_) => "Content",
            Self::LayoutModified(_) => "Layout",
            Self::ConfigModified(_) => "Config",
            Self::Created(_) => "New file",
            Self::Deleted(_) => "Removed file",
            Self::Modified(_) => "File",
        }
    }
}

/// File watcher for detecting changes.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
}

impl FileWatcher {
    /// Create a new file watcher for the given paths.
    ///
    /// Events under any of the `ignored` prefixes, and events for entries
    /// hidden below a watched root, are dropped. Returns the watcher and a
    /// channel to receive events.
    pub fn new(
        paths: &[PathBuf],
        ignored: Vec<PathBuf>,
    ) -> Result<(Self, async_mpsc::Receiver<WatchEvent>), std::io::Error> {
        let (sync_tx, sync_rx) = mpsc::channel();
        let (async_tx, async_rx) = async_mpsc::channel(100);

        let mut watcher = notify::recommended_watcher(move |res: Result<notify::Event, _>| {
            if let Ok(event) = res {
                let _ = sync_tx.send(event);
            }
        })
        .map_err(std::io::Error::other)?;

        for path in paths {
            if path.is_dir() {
                watcher
                    .watch(path, RecursiveMode::Recursive)
                    .map_err(std::io::Error::other)?;
            } else if path.exists() {
                watcher
                    .watch(path, RecursiveMode::NonRecursive)
                    .map_err(std::io::Error::other)?;
            }
        }

        let roots = paths.to_vec();

        // Forward events from notify's thread into the async channel
        std::thread::spawn(move || {
            while let Ok(event) = sync_rx.recv() {
                for path in event.paths {
                    if is_hidden(&path, &roots) || ignored.iter().any(|dir| path.starts_with(dir)) {
                        continue;
                    }
                    if let Some(e) = classify_event(&path, &event.kind) {
                        if async_tx.blocking_send(e).is_err() {
                            return;
                        }
                    }
                }
            }
        });

        Ok((Self { _watcher: watcher }, async_rx))
    }
}

/// Whether any component below the watched root starts with a dot.
fn is_hidden(path: &Path, roots: &[PathBuf]) -> bool {
    let Some(relative) = roots.iter().find_map(|root| path.strip_prefix(root).ok()) else {
        return path
            .file_name()
            .is_some_and(|name| name.to_string_lossy().starts_with('.'));
    };
    relative.components().any(|c| match c {
        Component::Normal(name) => name.to_string_lossy().starts_with('.'),
        _ => false,
    })
}

/// Classify a notify event into a WatchEvent.
fn classify_event(path: &Path, kind: &notify::EventKind) -> Option<WatchEvent> {
    use notify::EventKind;

    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    match kind {
        EventKind::Create(_) => Some(WatchEvent::Created(path.to_path_buf())),
        EventKind::Remove(_) => Some(WatchEvent::Deleted(path.to_path_buf())),
        EventKind::Modify(_) => match ext {
            "md" | "markdown" => Some(WatchEvent::ContentModified(path.to_path_buf())),
            "html" => Some(WatchEvent::LayoutModified(path.to_path_buf())),
            "toml" => Some(WatchEvent::ConfigModified(path.to_path_buf())),
            _ => Some(WatchEvent::Modified(path.to_path_buf())),
        },
        _ => None,
    }
}
